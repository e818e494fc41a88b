//! Lexical productions: whitespace, comments, identifiers, numbers, strings
//!
//! These never depend on the surrounding grammar, so they live on the cursor
//! itself rather than on the parser.

use super::cursor::{is_id_char, CharCursor};
use super::error::{ParseResult, ParserError};

/// Digit characters accepted in each supported base
pub fn safe_digits(base: u32) -> &'static str {
    match base {
        2 => "01",
        8 => "01234567",
        12 => "0123456789abAB",
        16 => "0123456789abcdefABCDEF",
        _ => "0123456789",
    }
}

/// Base selected by the letter following a leading `0`
pub fn integer_base(letter: char) -> Option<u32> {
    match letter {
        'b' => Some(2),
        'o' => Some(8),
        'd' => Some(12),
        'x' => Some(16),
        _ => None,
    }
}

fn named_escape(c: char) -> Option<&'static str> {
    match c {
        '"' => Some("\""),
        'n' => Some("\n"),
        't' => Some("\t"),
        'r' => Some("\r"),
        '\n' => Some(""),
        '\\' => Some("\\"),
        '\'' => Some("'"),
        'a' => Some("\x07"),
        'b' => Some("\x08"),
        'f' => Some("\x0c"),
        'v' => Some("\x0b"),
        _ => None,
    }
}

/// The digits of an integer literal, before interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerDigits {
    pub digits: String,
    pub base: u32,
}

impl IntegerDigits {
    /// Number of digits written
    pub fn log(&self) -> usize {
        self.digits.chars().count()
    }

    pub fn to_u64(&self) -> Option<u64> {
        u64::from_str_radix(&self.digits, self.base).ok()
    }

    pub fn to_f64(&self) -> f64 {
        let base = f64::from(self.base);
        self.digits.chars().fold(0.0, |acc, c| {
            acc * base + f64::from(c.to_digit(self.base).unwrap_or(0))
        })
    }
}

/// A string literal as read from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub byte_oriented: bool,
    pub value: String,
}

/// Extension trait for lexical parsing
pub trait LexicalParser {
    /// Skip one comment, if present
    fn skip_comment(&mut self) -> ParseResult<bool>;

    /// Skip one comment, blank (space, tab, carriage return) or one of `other_skips`
    fn skip_whitespace(&mut self, other_skips: &[char]) -> ParseResult<bool>;

    /// Skip as much whitespace as possible
    fn skip_all_whitespace(&mut self, other_skips: &[char]) -> ParseResult<bool>;

    fn parse_identifier(&mut self) -> Option<String>;

    /// Parse the digits of an integer in `base`
    fn parse_integer_in_base(&mut self, base: u32) -> ParseResult<Option<IntegerDigits>>;

    /// Parse an integer with an optional `0b`/`0o`/`0d`/`0x` base prefix
    fn parse_integer(&mut self) -> ParseResult<Option<IntegerDigits>>;

    fn parse_string(&mut self) -> ParseResult<Option<StringLiteral>>;

    /// Parse the escape sequence starting at a backslash. Leaves the cursor
    /// after the sequence.
    fn parse_string_escape(&mut self) -> ParseResult<String>;
}

impl LexicalParser for CharCursor {
    fn skip_comment(&mut self) -> ParseResult<bool> {
        if !self.check('#') {
            return Ok(false);
        }
        self.advance();
        if self.parse_string()?.is_some() {
            return Ok(true);
        }
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        Ok(true)
    }

    fn skip_whitespace(&mut self, other_skips: &[char]) -> ParseResult<bool> {
        if self.is_at_end() {
            return Ok(false);
        }
        if self.skip_comment()? {
            return Ok(true);
        }
        if self.check_any(&[' ', '\t', '\r']) || self.check_any(other_skips) {
            self.advance();
            return Ok(true);
        }
        Ok(false)
    }

    fn skip_all_whitespace(&mut self, other_skips: &[char]) -> ParseResult<bool> {
        let mut any_skipped = false;
        while self.skip_whitespace(other_skips)? {
            any_skipped = true;
        }
        Ok(any_skipped)
    }

    fn parse_identifier(&mut self) -> Option<String> {
        let first = self.peek()?;
        if first.is_ascii_digit() || !is_id_char(first) {
            return None;
        }
        if first == '-' && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !is_id_char(c) {
                break;
            }
            name.push(c);
            self.advance();
        }
        Some(name)
    }

    fn parse_integer_in_base(&mut self, base: u32) -> ParseResult<Option<IntegerDigits>> {
        let allowed = safe_digits(base);
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !allowed.contains(c) {
                if digits.is_empty() {
                    return Ok(None);
                }
                if is_id_char(c) {
                    return Err(self.error(format!("invalid value in base {}", base)));
                }
                break;
            }
            digits.push(c);
            self.advance();
        }
        if digits.is_empty() {
            return Ok(None);
        }
        Ok(Some(IntegerDigits { digits, base }))
    }

    fn parse_integer(&mut self) -> ParseResult<Option<IntegerDigits>> {
        if self.check('0') {
            if let Some(base) = self.peek_nth(1).and_then(integer_base) {
                self.advance();
                self.advance();
                return match self.parse_integer_in_base(base)? {
                    Some(digits) => Ok(Some(digits)),
                    None => Err(self.error(format!("invalid value in base {}", base))),
                };
            }
        }
        self.parse_integer_in_base(10)
    }

    fn parse_string(&mut self) -> ParseResult<Option<StringLiteral>> {
        let start = self.checkpoint();
        let byte_oriented = self.match_char('b');
        if !self.match_char('"') {
            self.restore(start);
            return Ok(None);
        }
        let mut fence = 1;
        if self.peek().is_none() {
            return Err(self.error("end of input unexpected"));
        }
        if self.check('"') && self.peek_nth(1) != Some('"') {
            self.advance();
            return Ok(Some(StringLiteral {
                byte_oriented,
                value: String::new(),
            }));
        }
        while self.match_char('"') {
            fence += 1;
        }

        let mut value = String::new();
        loop {
            let mut found_ending = true;
            for i in 0..fence {
                match self.peek_nth(i) {
                    None => return Err(self.error("end of input unexpected")),
                    Some('"') => {}
                    Some(_) => {
                        found_ending = false;
                        break;
                    }
                }
            }
            if found_ending {
                break;
            }
            if fence == 1 && self.check('\\') {
                value.push_str(&self.parse_string_escape()?);
                continue;
            }
            if let Some(c) = self.advance() {
                value.push(c);
            }
        }
        for _ in 0..fence {
            self.advance();
        }
        Ok(Some(StringLiteral {
            byte_oriented,
            value,
        }))
    }

    fn parse_string_escape(&mut self) -> ParseResult<String> {
        self.advance();
        let c = self
            .peek()
            .ok_or_else(|| self.error("end of input unexpected"))?;
        if let Some(replacement) = named_escape(c) {
            self.advance();
            return Ok(replacement.to_string());
        }
        if c.is_ascii_digit() {
            let escape_start = self.checkpoint();
            let digits = self.parse_escape_digits()?;
            let code = digits.to_u64().filter(|code| *code < 256).ok_or_else(|| {
                ParserError::new(
                    escape_start.pos(),
                    "byte escape sequence represents more than one byte",
                )
            })?;
            // codes below 256 are always valid scalar values
            return Ok(char::from_u32(code as u32).map(String::from).unwrap_or_default());
        }
        if matches!(c, 'U' | 'u' | 'N') {
            return Err(self.error("unicode escape sequences are not supported"));
        }
        Err(self.error("unknown escape sequence"))
    }
}

impl CharCursor {
    /// Digits of a numeric escape: like an integer literal, but it simply
    /// ends at the first character that is not a digit of its base.
    fn parse_escape_digits(&mut self) -> ParseResult<IntegerDigits> {
        let mut base = 10;
        if self.check('0') {
            if let Some(prefixed) = self.peek_nth(1).and_then(integer_base) {
                self.advance();
                self.advance();
                base = prefixed;
            }
        }
        let allowed = safe_digits(base);
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !allowed.contains(c) {
                break;
            }
            digits.push(c);
            self.advance();
        }
        if digits.is_empty() {
            return Err(self.error(format!("invalid value in base {}", base)));
        }
        Ok(IntegerDigits { digits, base })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;

    fn string(source: &str) -> ParseResult<Option<StringLiteral>> {
        CharCursor::new(source).parse_string()
    }

    #[test]
    fn test_identifier_stops_at_delimiters() {
        let mut c = CharCursor::new("foo-bar.baz");
        assert_eq!(c.parse_identifier().as_deref(), Some("foo-bar"));
        assert_eq!(c.peek(), Some('.'));
    }

    #[test]
    fn test_identifier_rejects_numbers() {
        assert_eq!(CharCursor::new("3x").parse_identifier(), None);
        assert_eq!(CharCursor::new("-3").parse_identifier(), None);
        assert_eq!(CharCursor::new("-x").parse_identifier().as_deref(), Some("-x"));
        assert_eq!(CharCursor::new("").parse_identifier(), None);
    }

    #[test]
    fn test_integer_prefixes() {
        let digits = CharCursor::new("0x1F").parse_integer().unwrap().unwrap();
        assert_eq!(digits.to_u64(), Some(31));
        let digits = CharCursor::new("0dab").parse_integer().unwrap().unwrap();
        assert_eq!(digits.to_u64(), Some(131));
        let digits = CharCursor::new("0b101").parse_integer().unwrap().unwrap();
        assert_eq!(digits.to_u64(), Some(5));
    }

    #[test]
    fn test_integer_invalid_digit() {
        let err = CharCursor::new("0b102").parse_integer().unwrap_err();
        assert_eq!(err.message, "invalid value in base 2");
        assert_eq!(err.pos(), Position::new(1, 5));
        let err = CharCursor::new("12a").parse_integer().unwrap_err();
        assert_eq!(err.message, "invalid value in base 10");
        let err = CharCursor::new("0x").parse_integer().unwrap_err();
        assert_eq!(err.message, "invalid value in base 16");
    }

    #[test]
    fn test_simple_strings() {
        let lit = string("\"hi\"").unwrap().unwrap();
        assert_eq!(lit.value, "hi");
        assert!(!lit.byte_oriented);
        let lit = string("b\"hi\"").unwrap().unwrap();
        assert!(lit.byte_oriented);
        assert_eq!(string("bob").unwrap(), None);
    }

    #[test]
    fn test_empty_and_fenced_strings() {
        assert_eq!(string("\"\"").unwrap().unwrap().value, "");
        let lit = string("\"\"\"a \"quoted\" \\n\"\"\"").unwrap().unwrap();
        assert_eq!(lit.value, "a \"quoted\" \\n");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(string("\"a\\tb\"").unwrap().unwrap().value, "a\tb");
        assert_eq!(string("\"a\\\nb\"").unwrap().unwrap().value, "ab");
        assert_eq!(string("\"\\65\"").unwrap().unwrap().value, "A");
        assert_eq!(string("\"\\0x41z\"").unwrap().unwrap().value, "Az");
    }

    #[test]
    fn test_escape_errors() {
        assert_eq!(
            string("\"\\256\"").unwrap_err().message,
            "byte escape sequence represents more than one byte"
        );
        assert_eq!(string("\"\\q\"").unwrap_err().message, "unknown escape sequence");
        assert_eq!(
            string("\"\\u1234\"").unwrap_err().message,
            "unicode escape sequences are not supported"
        );
        assert_eq!(string("\"abc").unwrap_err().message, "end of input unexpected");
    }

    #[test]
    fn test_comments() {
        let mut c = CharCursor::new("# note\nx");
        assert!(c.skip_all_whitespace(&[]).unwrap());
        assert_eq!(c.peek(), Some('\n'));
        let mut c = CharCursor::new("#\"inline\"x");
        assert!(c.skip_all_whitespace(&[]).unwrap());
        assert_eq!(c.peek(), Some('x'));
    }
}
