//! Compilation errors and their terminal rendering.
//!
//! This module provides:
//! - `CompileError`, wrapping the error of whichever stage failed
//! - ANSI color support
//! - Source snippet formatting with a caret under the failing column

use thiserror::Error;

use crate::ast::Position;
use crate::codegen::convert::ConversionError;
use crate::codegen::cps_transform::TransformationError;
use crate::parser::ParserError;

/// Error from any stage of the pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Transformation(#[from] TransformationError),
}

impl CompileError {
    pub fn position(&self) -> Position {
        match self {
            CompileError::Parse(e) => e.pos(),
            CompileError::Conversion(e) => e.pos(),
            CompileError::Transformation(e) => e.pos(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Parse(e) => &e.message,
            CompileError::Conversion(e) => &e.message,
            CompileError::Transformation(e) => &e.message,
        }
    }

    /// Heading used when rendering the error
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Parse(_) => "SYNTAX ERROR",
            CompileError::Conversion(_) => "CONVERSION ERROR",
            CompileError::Transformation(_) => "TRANSFORMATION ERROR",
        }
    }
}

/// ANSI escapes for the parts of a rendered error; empty when disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct Colors {
    pub enabled: bool,
}

impl Colors {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn escape(&self, code: &'static str) -> &'static str {
        if self.enabled {
            code
        } else {
            ""
        }
    }

    /// The caret under the failing column
    pub fn red(&self) -> &'static str {
        self.escape("\x1b[31m")
    }

    /// Header rule and line-number gutter
    pub fn cyan(&self) -> &'static str {
        self.escape("\x1b[36m")
    }

    pub fn bold(&self) -> &'static str {
        self.escape("\x1b[1m")
    }

    pub fn reset(&self) -> &'static str {
        self.escape("\x1b[0m")
    }
}

/// How `render_error` decorates a diagnostic
#[derive(Debug, Clone, Default)]
pub struct ErrorConfig {
    pub colors: Colors,
    /// Shown in the location line; `<input>` when absent
    pub filename: Option<String>,
}

impl ErrorConfig {
    pub fn new(use_color: bool) -> Self {
        Self {
            colors: Colors::new(use_color),
            filename: None,
        }
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }
}

// ============================================================================
// Source Snippet Formatting
// ============================================================================

/// Format a source line with its line number and a caret under `pos`.
///
/// Example output:
/// ```text
/// 1 | {|a,b,c:3,d:4,q(opt)| 0}
///                    ^
/// ```
pub fn format_snippet(source: &str, pos: Position, colors: &Colors) -> String {
    let line_text = source
        .lines()
        .nth(pos.line.saturating_sub(1))
        .unwrap_or("");
    let gutter = pos.line.to_string();

    let mut out = format!(
        "{}{} |{} {}\n",
        colors.cyan(),
        gutter,
        colors.reset(),
        line_text
    );
    // Pad to align with content after "N | "
    let padding = " ".repeat(gutter.len() + 3 + pos.col.saturating_sub(1));
    out.push_str(&format!("{}{}^{}", padding, colors.red(), colors.reset()));
    out
}

/// Format the error header line.
///
/// Example: "-- SYNTAX ERROR ----------------------------------------------------"
pub fn format_header(error_kind: &str, colors: &Colors) -> String {
    let dashes = "-".repeat(60usize.saturating_sub(error_kind.len() + 4));
    format!(
        "{}-- {} {}{}",
        colors.cyan(),
        error_kind,
        dashes,
        colors.reset()
    )
}

/// Format the location line.
///
/// Example: "program.pants:12:15"
pub fn format_location(filename: Option<&str>, pos: Position, colors: &Colors) -> String {
    let file = filename.unwrap_or("<input>");
    format!("{}{}:{}{}", colors.bold(), file, pos, colors.reset())
}

/// Render a compile error for a terminal: header, location, message and
/// source snippet.
pub fn render_error(error: &CompileError, source: &str, config: &ErrorConfig) -> String {
    let pos = error.position();
    format!(
        "{}\n\n{}\n\n{}\n\n{}",
        format_header(error.kind(), &config.colors),
        format_location(config.filename.as_deref(), pos, &config.colors),
        error,
        format_snippet(source, pos, &config.colors)
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_header() {
        let colors = Colors::new(false);
        let header = format_header("SYNTAX ERROR", &colors);
        assert!(header.starts_with("-- SYNTAX ERROR --"));
    }

    #[test]
    fn test_format_snippet_points_at_column() {
        let colors = Colors::new(false);
        let snippet = format_snippet("x = 1\ny = (2", Position::new(2, 7), &colors);
        assert_eq!(snippet, "2 | y = (2\n          ^");
    }

    #[test]
    fn test_format_location_defaults_to_input() {
        let colors = Colors::new(false);
        assert_eq!(format_location(None, Position::new(3, 4), &colors), "<input>:3:4");
    }

    #[test]
    fn test_render_error() {
        let error = CompileError::from(ParserError::new(Position::new(1, 4), "unexpected input"));
        let config = ErrorConfig::default().with_filename("main.pants");
        let rendered = render_error(&error, ".x := 3", &config);
        assert!(rendered.contains("SYNTAX ERROR"));
        assert!(rendered.contains("main.pants:1:4"));
        assert!(rendered.contains("Error at line 1, column 4: unexpected input"));
        assert!(rendered.ends_with("1 | .x := 3\n       ^"));
    }

    #[test]
    fn test_colors_disabled_are_empty() {
        let colors = Colors::default();
        assert_eq!(colors.red(), "");
        assert_eq!(Colors::new(true).reset(), "\x1b[0m");
    }

    #[test]
    fn test_colored_snippet_marks_caret() {
        let snippet = format_snippet("x = (2", Position::new(1, 7), &Colors::new(true));
        assert_eq!(
            snippet,
            "\x1b[36m1 |\x1b[0m x = (2\n          \x1b[31m^\x1b[0m"
        );
    }
}
