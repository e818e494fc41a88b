//! Argument list parsing for closed calls and function headers
//!
//! Both lists may be split by a `;` into left and right arguments. The kinds
//! allowed on each side, and their order, are checked once the whole list
//! has been read.

use crate::ast::{ClosedCall, Expression, InArgument, OutArgument};

use super::error::{ParseResult, ParserError};
use super::literals::LexicalParser;
use super::Parser;

impl Parser {
    // ========================================================================
    // Call sites
    // ========================================================================

    pub(super) fn parse_closed_call(&mut self) -> ParseResult<Option<ClosedCall>> {
        if !self.check('(') {
            return Ok(None);
        }
        let pos = self.pos();
        self.advance();
        self.skip_all_whitespace(&['\n'])?;
        let mut left_args = Vec::new();
        let mut right_args = self.parse_out_arg_list()?;
        if self.cursor.match_char(';') {
            self.skip_all_whitespace(&['\n'])?;
            left_args = std::mem::replace(&mut right_args, self.parse_out_arg_list()?);
        }
        if !self.check(')') {
            return Err(self.error("unexpected input for function call"));
        }
        self.advance();
        check_left_out_args(&left_args)?;
        check_right_out_args(&right_args)?;
        Ok(Some(ClosedCall {
            left_args,
            right_args,
            pos,
        }))
    }

    fn parse_out_arg_list(&mut self) -> ParseResult<Vec<OutArgument>> {
        let mut args = Vec::new();
        while let Some(arg) = self.parse_out_arg()? {
            args.push(arg);
            if !self.cursor.match_char(',') {
                break;
            }
            self.skip_all_whitespace(&['\n'])?;
        }
        Ok(args)
    }

    fn parse_out_arg(&mut self) -> ParseResult<Option<OutArgument>> {
        let pos = self.pos();
        if self.check_sequence("::(") {
            let expressions = self.parse_bracketed_out_arg(3, "keyword")?;
            return Ok(Some(OutArgument::Keyword { expressions, pos }));
        }
        if self.check_sequence(":(") {
            let expressions = self.parse_bracketed_out_arg(2, "list")?;
            return Ok(Some(OutArgument::Splat { expressions, pos }));
        }
        if let Some(name) = self.parse_argument_label()? {
            let Some(value) = self.parse_application(false)? else {
                return Err(self.error("expected value for named argument"));
            };
            return Ok(Some(OutArgument::Named { name, value, pos }));
        }
        Ok(self
            .parse_application(false)?
            .map(|value| OutArgument::Positional { value, pos }))
    }

    /// The expression list of a `:(...)` or `::(...)` argument, after an
    /// opening of `opener_len` characters
    fn parse_bracketed_out_arg(
        &mut self,
        opener_len: usize,
        kind: &str,
    ) -> ParseResult<Vec<Expression>> {
        for _ in 0..opener_len {
            self.advance();
        }
        self.skip_all_whitespace(&['\n', ';'])?;
        let expressions = self.parse_expression_list(false)?;
        if !self.check(')') {
            return Err(self.error(format!("unexpected input for {} argument", kind)));
        }
        if expressions.is_empty() {
            return Err(self.error(format!("{} argument expected", kind)));
        }
        self.advance();
        Ok(expressions)
    }

    // ========================================================================
    // Function headers
    // ========================================================================

    pub(super) fn parse_in_arg_list(&mut self) -> ParseResult<Vec<InArgument>> {
        let mut args = Vec::new();
        while let Some(arg) = self.parse_in_arg()? {
            args.push(arg);
            if !self.cursor.match_char(',') {
                break;
            }
            self.skip_all_whitespace(&['\n'])?;
        }
        Ok(args)
    }

    fn parse_in_arg(&mut self) -> ParseResult<Option<InArgument>> {
        let pos = self.pos();
        if self.check_sequence("::(") {
            let name = self.parse_bracketed_in_arg(3, "keyword")?;
            return Ok(Some(InArgument::Keyword { name, pos }));
        }
        if self.check_sequence(":(") {
            let name = self.parse_bracketed_in_arg(2, "list")?;
            return Ok(Some(InArgument::Splat { name, pos }));
        }
        if let Some(name) = self.parse_argument_label()? {
            let Some(value) = self.parse_application(false)? else {
                return Err(self.error("expected value for default argument"));
            };
            return Ok(Some(InArgument::Default { name, value, pos }));
        }
        Ok(self
            .cursor
            .parse_identifier()
            .map(|name| InArgument::Required { name, pos }))
    }

    fn parse_bracketed_in_arg(&mut self, opener_len: usize, kind: &str) -> ParseResult<String> {
        for _ in 0..opener_len {
            self.advance();
        }
        self.skip_all_whitespace(&['\n'])?;
        let Some(name) = self.cursor.parse_identifier() else {
            return Err(self.error(format!("expected {} argument identifier", kind)));
        };
        self.skip_all_whitespace(&['\n'])?;
        if !self.check(')') {
            return Err(self.error(format!("unexpected input for {} argument", kind)));
        }
        self.advance();
        Ok(name)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Parse `identifier :` and skip the whitespace after the colon. Restores
    /// the cursor when the label is not there.
    fn parse_argument_label(&mut self) -> ParseResult<Option<String>> {
        let start = self.checkpoint();
        let Some(name) = self.cursor.parse_identifier() else {
            return Ok(None);
        };
        self.skip_all_whitespace(&['\n'])?;
        if !self.cursor.match_char(':') {
            self.restore(start);
            return Ok(None);
        }
        self.skip_all_whitespace(&['\n'])?;
        Ok(Some(name))
    }

    fn check_sequence(&self, expected: &str) -> bool {
        expected
            .chars()
            .enumerate()
            .all(|(i, c)| self.cursor.peek_nth(i) == Some(c))
    }
}

// ============================================================================
// Order validation
// ============================================================================

fn unexpected_argument(pos: crate::ast::Position) -> ParserError {
    ParserError::new(pos, "unexpected argument type")
}

/// Left call arguments: positional or splat only
pub fn check_left_out_args(args: &[OutArgument]) -> ParseResult<()> {
    match args
        .iter()
        .find(|arg| !matches!(arg, OutArgument::Positional { .. } | OutArgument::Splat { .. }))
    {
        Some(arg) => Err(unexpected_argument(arg.pos())),
        None => Ok(()),
    }
}

/// Right call arguments: `(positional | splat)* named* keyword?`
pub fn check_right_out_args(args: &[OutArgument]) -> ParseResult<()> {
    let mut rest = args;
    while let [OutArgument::Positional { .. } | OutArgument::Splat { .. }, tail @ ..] = rest {
        rest = tail;
    }
    while let [OutArgument::Named { .. }, tail @ ..] = rest {
        rest = tail;
    }
    if let [OutArgument::Keyword { .. }, tail @ ..] = rest {
        rest = tail;
    }
    match rest.first() {
        Some(arg) => Err(unexpected_argument(arg.pos())),
        None => Ok(()),
    }
}

/// Left parameters: `splat? default* required*`
pub fn check_left_in_args(args: &[InArgument]) -> ParseResult<()> {
    let mut rest = args;
    if let [InArgument::Splat { .. }, tail @ ..] = rest {
        rest = tail;
    }
    while let [InArgument::Default { .. }, tail @ ..] = rest {
        rest = tail;
    }
    while let [InArgument::Required { .. }, tail @ ..] = rest {
        rest = tail;
    }
    match rest.first() {
        Some(arg) => Err(unexpected_argument(arg.pos())),
        None => Ok(()),
    }
}

/// Right parameters: `required* default* splat? keyword?`
pub fn check_right_in_args(args: &[InArgument]) -> ParseResult<()> {
    let mut rest = args;
    while let [InArgument::Required { .. }, tail @ ..] = rest {
        rest = tail;
    }
    while let [InArgument::Default { .. }, tail @ ..] = rest {
        rest = tail;
    }
    if let [InArgument::Splat { .. }, tail @ ..] = rest {
        rest = tail;
    }
    if let [InArgument::Keyword { .. }, tail @ ..] = rest {
        rest = tail;
    }
    match rest.first() {
        Some(arg) => Err(unexpected_argument(arg.pos())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;

    fn required(name: &str, col: usize) -> InArgument {
        InArgument::Required {
            name: name.to_string(),
            pos: Position::new(1, col),
        }
    }

    fn splat(name: &str, col: usize) -> InArgument {
        InArgument::Splat {
            name: name.to_string(),
            pos: Position::new(1, col),
        }
    }

    #[test]
    fn test_right_in_args_order() {
        assert!(check_right_in_args(&[required("a", 1), splat("b", 3)]).is_ok());
        let err = check_right_in_args(&[splat("b", 1), required("a", 5)]).unwrap_err();
        assert_eq!(err.pos(), Position::new(1, 5));
        assert_eq!(err.message, "unexpected argument type");
    }

    #[test]
    fn test_left_in_args_order() {
        assert!(check_left_in_args(&[splat("a", 1), required("b", 3)]).is_ok());
        assert!(check_left_in_args(&[required("b", 1), splat("a", 3)]).is_err());
    }
}
