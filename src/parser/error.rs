//! Parser error type with source location

use crate::ast::Position;
use thiserror::Error;

/// A syntax error. Parsing stops at the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error at line {line}, column {col}: {message}")]
pub struct ParserError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl ParserError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        ParserError {
            line: pos.line,
            col: pos.col,
            message: message.into(),
        }
    }

    /// Get the position associated with this error
    pub fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }
}

pub type ParseResult<T> = Result<T, ParserError>;
