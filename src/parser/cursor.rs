//! Character cursor with lookahead, position tracking and checkpoints

use crate::ast::Position;

use super::error::ParserError;

/// Characters that can never appear inside an identifier
pub const NON_ID_CHARS: &[char] = &[
    ' ', '\n', '\r', '\t', ';', ',', '(', ')', '[', ']', '{', '}', '|', '\'', '"', '.', ':', '@',
    '#',
];

pub fn is_id_char(c: char) -> bool {
    !NON_ID_CHARS.contains(&c)
}

/// A saved cursor state. Restoring one rewinds offset, line and column
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    offset: usize,
    line: usize,
    col: usize,
}

impl Checkpoint {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }
}

/// Cursor over the characters of a source text
pub struct CharCursor {
    chars: Vec<char>,
    offset: usize,
    line: usize,
    col: usize,
}

impl CharCursor {
    /// Create a new cursor at line 1, column 1
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            offset: 0,
            line: 1,
            col: 1,
        }
    }

    // ========================================================================
    // Position and lookahead
    // ========================================================================

    /// Get the current character without consuming it
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    /// Peek at a character n positions ahead (0 = current)
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.get(self.offset + n).copied()
    }

    /// Check if the current character matches
    pub fn check(&self, c: char) -> bool {
        self.peek() == Some(c)
    }

    /// Check if the current character is one of `set`
    pub fn check_any(&self, set: &[char]) -> bool {
        self.peek().is_some_and(|c| set.contains(&c))
    }

    /// Check if the character n positions ahead is a non-identifier character
    /// (end of input does not count)
    pub fn is_non_id_at(&self, n: usize) -> bool {
        self.peek_nth(n).is_some_and(|c| !is_id_char(c))
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.chars.len()
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    /// Save the current state (for backtracking)
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            offset: self.offset,
            line: self.line,
            col: self.col,
        }
    }

    /// Restore a previously saved state (for backtracking)
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.offset = checkpoint.offset;
        self.line = checkpoint.line;
        self.col = checkpoint.col;
    }

    // ========================================================================
    // Consumption
    // ========================================================================

    /// Advance past the current character. A newline moves to the first
    /// column of the next line.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// If the current character matches, consume it and return true
    pub fn match_char(&mut self, c: char) -> bool {
        if self.check(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Create an error at the current position
    pub fn error(&self, message: impl Into<String>) -> ParserError {
        ParserError::new(self.pos(), message)
    }
}
