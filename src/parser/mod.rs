//! Recursive descent parser for Pants
//!
//! The parser works directly on characters: there is no separate lexer.
//! Productions that may not apply return `Ok(None)` after restoring the
//! cursor; productions that have committed report a `ParserError`.
//! Backtracking happens through cursor checkpoints, and terms are memoized
//! by start offset so that retrying an alternative never re-parses a term.
//!
//! # Module Structure
//!
//! - `cursor` - Character navigation, lookahead and checkpoints
//! - `literals` - Whitespace, comments, identifiers, numbers and strings
//! - `arguments` - Argument lists for calls and function headers
//! - `error` - Error type with source location

pub mod arguments;
pub mod cursor;
pub mod error;
pub mod literals;

pub use cursor::{CharCursor, Checkpoint};
pub use error::{ParseResult, ParserError};

use std::collections::HashMap;

use log::{debug, trace};

use crate::ast::*;
use cursor::is_id_char;
use literals::LexicalParser;

/// Parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Remember the outcome of every term parse by start offset
    pub memoize_terms: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            memoize_terms: true,
        }
    }
}

/// The Pants parser
pub struct Parser {
    cursor: CharCursor,
    options: ParserOptions,
    /// Term parse results by start offset, with the state to resume from
    term_memo: HashMap<usize, (Option<Term>, Checkpoint)>,
    memo_hits: usize,
}

/// Parse a complete program with default options
pub fn parse(source: &str) -> ParseResult<Program> {
    Parser::new(source).parse()
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self::with_options(source, ParserOptions::default())
    }

    pub fn with_options(source: &str, options: ParserOptions) -> Self {
        Self {
            cursor: CharCursor::new(source),
            options,
            term_memo: HashMap::new(),
            memo_hits: 0,
        }
    }

    // ========================================================================
    // Cursor delegation
    // ========================================================================

    fn check(&self, c: char) -> bool {
        self.cursor.check(c)
    }

    fn advance(&mut self) -> Option<char> {
        self.cursor.advance()
    }

    fn checkpoint(&self) -> Checkpoint {
        self.cursor.checkpoint()
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor.restore(checkpoint)
    }

    fn pos(&self) -> Position {
        self.cursor.pos()
    }

    fn error(&self, message: impl Into<String>) -> ParserError {
        self.cursor.error(message)
    }

    fn skip_all_whitespace(&mut self, other_skips: &[char]) -> ParseResult<bool> {
        self.cursor.skip_all_whitespace(other_skips)
    }

    // ========================================================================
    // Program parsing
    // ========================================================================

    /// Parse the whole input. Anything left over is an error.
    pub fn parse(mut self) -> ParseResult<Program> {
        self.skip_all_whitespace(&[';', '\n'])?;
        let expressions = self.parse_expression_list(true)?;
        if !self.cursor.is_at_end() {
            return Err(self.error("unexpected input"));
        }
        trace!(
            "term memo: {} entries, {} hits",
            self.term_memo.len(),
            self.memo_hits
        );
        debug!("parsed {} top-level expressions", expressions.len());
        Ok(Program {
            expressions,
            pos: Position::new(1, 1),
        })
    }

    /// Expressions separated by `;` or (unless inside brackets) newlines
    fn parse_expression_list(&mut self, newline_sep: bool) -> ParseResult<Vec<Expression>> {
        let mut expressions = Vec::new();
        while let Some(expression) = self.parse_expression(newline_sep)? {
            expressions.push(expression);
            self.skip_all_whitespace(&[';', '\n'])?;
        }
        Ok(expressions)
    }

    fn parse_expression(&mut self, newline_sep: bool) -> ParseResult<Option<Expression>> {
        if let Some(assignment) = self.parse_assignment(newline_sep)? {
            return Ok(Some(Expression::Assignment(assignment)));
        }
        Ok(self
            .parse_application(newline_sep)?
            .map(Expression::Application))
    }

    fn parse_assignment(&mut self, newline_sep: bool) -> ParseResult<Option<Assignment>> {
        let skips: &[char] = if newline_sep { &[] } else { &['\n'] };
        let start = self.checkpoint();
        let Some(assignee) = self.parse_assignee()? else {
            self.restore(start);
            return Ok(None);
        };
        self.skip_all_whitespace(skips)?;
        let mutation = self.cursor.match_char(':');
        // `=` only counts when a non-identifier character follows, so `==`
        // and `=>` stay ordinary identifiers
        if !self.check('=') || !self.cursor.is_non_id_at(1) {
            self.restore(start);
            return Ok(None);
        }
        self.advance();
        self.skip_all_whitespace(skips)?;
        let Some(expression) = self.parse_expression(newline_sep)? else {
            return Err(self.error("unexpected input"));
        };
        Ok(Some(Assignment {
            mutation,
            assignee,
            expression: Box::new(expression),
            pos: start.pos(),
        }))
    }

    fn parse_assignee(&mut self) -> ParseResult<Option<Assignee>> {
        let Some(mut term) = self.parse_term()? else {
            return Ok(None);
        };
        let pos = term.pos;
        match term.modifiers.pop() {
            Some(Modifier::Index(index)) => Ok(Some(Assignee::Index { term, index, pos })),
            Some(Modifier::Field(field)) => Ok(Some(Assignee::Field { term, field, pos })),
            Some(_) => Ok(None),
            None => match term.value {
                Value::Variable(variable) => Ok(Some(Assignee::Variable(variable))),
                _ => Ok(None),
            },
        }
    }

    pub(crate) fn parse_application(
        &mut self,
        newline_sep: bool,
    ) -> ParseResult<Option<Application>> {
        let skips: &[char] = if newline_sep { &[] } else { &['\n'] };
        let pos = self.pos();
        let mut terms = Vec::new();
        loop {
            self.skip_all_whitespace(skips)?;
            match self.parse_term()? {
                Some(term) => terms.push(term),
                None => break,
            }
        }
        if terms.is_empty() {
            return Ok(None);
        }
        Ok(Some(Application { terms, pos }))
    }

    // ========================================================================
    // Terms
    // ========================================================================

    fn parse_term(&mut self) -> ParseResult<Option<Term>> {
        let start = self.checkpoint();
        if self.options.memoize_terms {
            if let Some((term, resume)) = self.term_memo.get(&start.offset()) {
                let (term, resume) = (term.clone(), *resume);
                self.memo_hits += 1;
                self.restore(resume);
                return Ok(term);
            }
        }

        let mut headers = Vec::new();
        while let Some(header) = self.parse_left_open_call() {
            headers.push(header);
        }
        headers.reverse();

        let Some(value) = self.parse_value()? else {
            self.restore(start);
            if self.options.memoize_terms {
                self.term_memo.insert(start.offset(), (None, start));
            }
            return Ok(None);
        };

        let mut modifiers = Vec::new();
        while let Some(trailer) = self.parse_trailer()? {
            modifiers.push(trailer);
        }
        modifiers.extend(headers);

        let term = Term {
            value,
            modifiers,
            pos: start.pos(),
        };
        if self.options.memoize_terms {
            self.term_memo
                .insert(start.offset(), (Some(term.clone()), self.checkpoint()));
        }
        Ok(Some(term))
    }

    fn parse_left_open_call(&mut self) -> Option<Modifier> {
        if self.check('@') || self.check('.') {
            let pos = self.pos();
            self.advance();
            return Some(Modifier::OpenCall(pos));
        }
        None
    }

    fn parse_trailer(&mut self) -> ParseResult<Option<Modifier>> {
        if let Some(open_call) = self.parse_right_open_call() {
            return Ok(Some(open_call));
        }
        if let Some(index) = self.parse_index()? {
            return Ok(Some(Modifier::Index(index)));
        }
        if let Some(field) = self.parse_field() {
            return Ok(Some(Modifier::Field(field)));
        }
        Ok(self.parse_closed_call()?.map(Modifier::ClosedCall))
    }

    /// A `.` followed by a non-identifier character or the end of input
    fn parse_right_open_call(&mut self) -> Option<Modifier> {
        if self.check('.') && (self.cursor.is_non_id_at(1) || self.cursor.peek_nth(1).is_none()) {
            let pos = self.pos();
            self.advance();
            return Some(Modifier::OpenCall(pos));
        }
        None
    }

    fn parse_field(&mut self) -> Option<Field> {
        if !self.check('.') {
            return None;
        }
        let start = self.checkpoint();
        self.advance();
        match self.cursor.parse_identifier() {
            Some(name) => Some(Field {
                name,
                pos: start.pos(),
            }),
            None => {
                self.restore(start);
                None
            }
        }
    }

    fn parse_index(&mut self) -> ParseResult<Option<Index>> {
        if !self.check('[') {
            return Ok(None);
        }
        let pos = self.pos();
        self.advance();
        self.skip_all_whitespace(&['\n', ';'])?;
        let expressions = self.parse_expression_list(false)?;
        if !self.check(']') {
            return Err(self.error("unexpected input for index lookup"));
        }
        if expressions.is_empty() {
            return Err(self.error("expected expression for index lookup"));
        }
        self.advance();
        Ok(Some(Index { expressions, pos }))
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn parse_value(&mut self) -> ParseResult<Option<Value>> {
        if let Some(value) = self.parse_subexpression()? {
            return Ok(Some(value));
        }
        if let Some(function) = self.parse_function()? {
            return Ok(Some(Value::Function(function)));
        }
        let pos = self.pos();
        if let Some(literal) = self.cursor.parse_string()? {
            return Ok(Some(Value::String {
                byte_oriented: literal.byte_oriented,
                value: literal.value,
                pos,
            }));
        }
        if let Some(name) = self.cursor.parse_identifier() {
            return Ok(Some(Value::Variable(Variable { name, pos })));
        }
        if let Some(number) = self.parse_number()? {
            return Ok(Some(number));
        }
        if let Some(dict) = self.parse_dict()? {
            return Ok(Some(dict));
        }
        self.parse_array()
    }

    fn parse_subexpression(&mut self) -> ParseResult<Option<Value>> {
        if !self.check('(') {
            return Ok(None);
        }
        let pos = self.pos();
        self.advance();
        self.skip_all_whitespace(&['\n', ';'])?;
        let expressions = self.parse_expression_list(false)?;
        if !self.check(')') {
            return Err(self.error("unexpected input at end of subexpression"));
        }
        if expressions.is_empty() {
            return Err(self.error("expression list expected in subexpression"));
        }
        self.advance();
        Ok(Some(Value::Subexpression { expressions, pos }))
    }

    /// Parse `{...}` as a function. Gives up (restoring the cursor) when the
    /// braces may still hold a dictionary.
    fn parse_function(&mut self) -> ParseResult<Option<Function>> {
        if !self.check('{') {
            return Ok(None);
        }
        let start = self.checkpoint();
        self.advance();
        self.skip_all_whitespace(&['\n'])?;
        if self.check('}') {
            // empty dictionary
            self.restore(start);
            return Ok(None);
        }

        let mut maybe_a_dict = true;
        let mut left_args = Vec::new();
        let mut right_args = Vec::new();
        if self.cursor.match_char('|') {
            maybe_a_dict = false;
            self.skip_all_whitespace(&['\n'])?;
            right_args = self.parse_in_arg_list()?;
            if self.cursor.match_char(';') {
                self.skip_all_whitespace(&['\n'])?;
                left_args = std::mem::replace(&mut right_args, self.parse_in_arg_list()?);
            }
            if !self.check('|') {
                return Err(self.error("unexpected input for argument list"));
            }
            self.advance();
            arguments::check_left_in_args(&left_args)?;
            arguments::check_right_in_args(&right_args)?;
        }

        self.skip_all_whitespace(&['\n', ';'])?;
        let expressions = self.parse_expression_list(true)?;
        if !self.check('}') {
            if maybe_a_dict {
                self.restore(start);
                return Ok(None);
            }
            return Err(self.error("unexpected input at close of function"));
        }
        self.advance();
        Ok(Some(Function {
            expressions,
            left_args,
            right_args,
            pos: start.pos(),
        }))
    }

    fn parse_number(&mut self) -> ParseResult<Option<Value>> {
        let start = self.checkpoint();
        let negative = self.cursor.match_char('-');
        let Some(integer) = self.cursor.parse_integer()? else {
            self.restore(start);
            return Ok(None);
        };
        let pos = start.pos();

        if !self.cursor.match_char('.') {
            let value = integer
                .to_u64()
                .and_then(|magnitude| {
                    let magnitude = i128::from(magnitude);
                    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
                })
                .ok_or_else(|| ParserError::new(pos, "integer literal out of range"))?;
            return Ok(Some(Value::Integer { value, pos }));
        }

        let Some(fraction) = self.cursor.parse_integer_in_base(integer.base)? else {
            if self.cursor.peek().is_some_and(is_id_char) {
                return Err(self.error(format!("invalid value in base {}", integer.base)));
            }
            return Err(self.error("invalid floating point number"));
        };
        let magnitude = if integer.base == 10 {
            // correctly rounded, so rendered floats read back exactly
            format!("{}.{}", integer.digits, fraction.digits)
                .parse::<f64>()
                .map_err(|_| ParserError::new(pos, "invalid floating point number"))?
        } else {
            let scale = f64::from(integer.base).powi(fraction.log() as i32);
            integer.to_f64() + fraction.to_f64() / scale
        };
        if !magnitude.is_finite() {
            return Err(ParserError::new(pos, "floating point number out of range"));
        }
        Ok(Some(Value::Float {
            value: if negative { -magnitude } else { magnitude },
            pos,
        }))
    }

    fn parse_dict(&mut self) -> ParseResult<Option<Value>> {
        if !self.check('{') {
            return Ok(None);
        }
        let pos = self.pos();
        self.advance();
        let mut definitions = Vec::new();
        loop {
            self.skip_all_whitespace(&['\n'])?;
            let Some(definition) = self.parse_dict_definition()? else {
                break;
            };
            definitions.push(definition);
            if !self.cursor.match_char(',') {
                break;
            }
        }
        self.skip_all_whitespace(&['\n', ','])?;
        if !self.check('}') {
            return Err(self.error("unexpected input for dictionary close ('}')"));
        }
        self.advance();
        Ok(Some(Value::Dict { definitions, pos }))
    }

    fn parse_dict_definition(&mut self) -> ParseResult<Option<DictDefinition>> {
        let pos = self.pos();
        let Some(key) = self.parse_application(false)? else {
            return Ok(None);
        };
        if !self.cursor.match_char(':') {
            return Err(self.error("unexpected input while parsing dictionary"));
        }
        self.skip_all_whitespace(&['\n'])?;
        let Some(value) = self.parse_application(false)? else {
            return Err(self.error("expected dictionary value"));
        };
        Ok(Some(DictDefinition { key, value, pos }))
    }

    fn parse_array(&mut self) -> ParseResult<Option<Value>> {
        if !self.check('[') {
            return Ok(None);
        }
        let pos = self.pos();
        self.advance();
        let mut elements = Vec::new();
        loop {
            self.skip_all_whitespace(&['\n'])?;
            let Some(element) = self.parse_application(false)? else {
                break;
            };
            elements.push(element);
            if !self.cursor.match_char(',') {
                break;
            }
        }
        self.skip_all_whitespace(&['\n', ','])?;
        if !self.check(']') {
            return Err(self.error("unexpected input for list close (']')"));
        }
        self.advance();
        Ok(Some(Value::Array { elements, pos }))
    }
}
