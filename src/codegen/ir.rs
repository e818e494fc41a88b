//! Flat intermediate representation
//!
//! Every intermediate result is named: a program is a list of assignments,
//! field mutations and calls whose results are bound to identifiers, plus the
//! value of the whole list. Functions nest their own statement lists.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ast::{render_float, Position};

// ============================================================================
// Identifiers
// ============================================================================

/// A variable name. Synthesized names never collide with user names because
/// identity includes the `user_provided` flag; the position is informational.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub user_provided: bool,
    pub pos: Position,
}

impl Identifier {
    pub fn new(name: impl Into<String>, user_provided: bool, pos: Position) -> Self {
        Identifier {
            name: name.into(),
            user_provided,
            pos,
        }
    }

    pub fn user(name: impl Into<String>, pos: Position) -> Self {
        Self::new(name, true, pos)
    }

    pub fn synthesized(name: impl Into<String>, pos: Position) -> Self {
        Self::new(name, false, pos)
    }

    /// The placeholder value of an empty statement list
    pub fn null(pos: Position) -> Self {
        Self::synthesized("null", pos)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.user_provided == other.user_provided
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.user_provided.hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.name, self.user_provided).cmp(&(&other.name, other.user_provided))
    }
}

impl fmt::Display for Identifier {
    /// Synthesized names render with a trailing `_`; user names that already
    /// end in `_` get one more, so the two never print alike.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.user_provided || self.name.ends_with('_') {
            write!(f, "{}_", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Generator for fresh synthesized identifiers (`<prefix>_<hex>`)
#[derive(Debug, Clone)]
pub struct NameGen {
    prefix: &'static str,
    count: u32,
}

impl NameGen {
    pub fn new(prefix: &'static str) -> Self {
        NameGen { prefix, count: 0 }
    }

    pub fn fresh(&mut self, pos: Position) -> Identifier {
        self.count += 1;
        Identifier::synthesized(format!("{}_{:x}", self.prefix, self.count), pos)
    }

    /// Number of names generated so far
    pub fn count(&self) -> u32 {
        self.count
    }
}

// ============================================================================
// Program structure
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub expressions: Vec<Expression>,
    pub lastval: Value,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `assignee = value` (new local binding) or `assignee := value`
    Assignment {
        assignee: Identifier,
        value: Value,
        local: bool,
        pos: Position,
    },
    /// `object.field = value`
    ObjectMutation {
        object: Value,
        field: Identifier,
        value: Value,
        pos: Position,
    },
    /// `assignee = callee(left_args; right_args)`
    ReturnValue {
        assignee: Identifier,
        callee: Value,
        left_args: Vec<OutArgument>,
        right_args: Vec<OutArgument>,
        pos: Position,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Field {
        object: Box<Value>,
        field: Identifier,
        pos: Position,
    },
    Variable {
        identifier: Identifier,
        pos: Position,
    },
    Integer {
        value: i64,
        pos: Position,
    },
    Float {
        value: f64,
        pos: Position,
    },
    String {
        byte_oriented: bool,
        value: String,
        pos: Position,
    },
    Function(Function),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub expressions: Vec<Expression>,
    pub lastval: Box<Value>,
    pub left_args: Vec<InArgument>,
    pub right_args: Vec<InArgument>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutArgument {
    Positional { value: Value, pos: Position },
    Named { name: Identifier, value: Value, pos: Position },
    Splat { value: Value, pos: Position },
    Keyword { value: Value, pos: Position },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InArgument {
    Required { name: Identifier, pos: Position },
    Default { name: Identifier, value: Value, pos: Position },
    Splat { name: Identifier, pos: Position },
    Keyword { name: Identifier, pos: Position },
}

impl Value {
    pub fn variable(identifier: Identifier) -> Self {
        let pos = identifier.pos;
        Value::Variable { identifier, pos }
    }

    pub fn null(pos: Position) -> Self {
        Value::variable(Identifier::null(pos))
    }

    pub fn pos(&self) -> Position {
        match self {
            Value::Function(f) => f.pos,
            Value::Field { pos, .. }
            | Value::Variable { pos, .. }
            | Value::Integer { pos, .. }
            | Value::Float { pos, .. }
            | Value::String { pos, .. } => *pos,
        }
    }

    /// The identifier, when this value is a plain variable
    pub fn as_variable(&self) -> Option<&Identifier> {
        match self {
            Value::Variable { identifier, .. } => Some(identifier),
            _ => None,
        }
    }
}

impl Expression {
    pub fn pos(&self) -> Position {
        match self {
            Expression::Assignment { pos, .. }
            | Expression::ObjectMutation { pos, .. }
            | Expression::ReturnValue { pos, .. } => *pos,
        }
    }
}

impl InArgument {
    pub fn name(&self) -> &Identifier {
        match self {
            InArgument::Required { name, .. }
            | InArgument::Default { name, .. }
            | InArgument::Splat { name, .. }
            | InArgument::Keyword { name, .. } => name,
        }
    }
}

// ============================================================================
// Pretty printing
// ============================================================================

fn join<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(", ")
}

/// Render `(left; right)` argument lists shared by IR and CPS calls
pub(crate) fn render_call_args(left: &str, has_left: bool, right: &str, has_right: bool) -> String {
    let mut out = String::from("(");
    out.push_str(left);
    if has_left {
        out.push_str(if has_right { "; " } else { ";" });
    }
    if has_right {
        out.push_str(right);
    }
    out.push(')');
    out
}

/// Render a `|left; right|` parameter header (empty when there are no
/// parameters)
pub(crate) fn render_params(left: &[String], right: &[String]) -> String {
    if left.is_empty() && right.is_empty() {
        return String::new();
    }
    let mut out = String::from("|");
    if !left.is_empty() {
        out.push_str(&left.join(", "));
        out.push(';');
    }
    if !left.is_empty() && !right.is_empty() {
        out.push(' ');
    }
    out.push_str(&right.join(", "));
    out.push('|');
    out
}

impl Program {
    pub fn pretty(&self, indent: usize) -> String {
        self.expressions
            .iter()
            .map(|e| e.pretty(indent))
            .collect::<Vec<_>>()
            .join(";\n")
    }
}

impl Expression {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            Expression::Assignment {
                assignee,
                value,
                local,
                ..
            } => format!(
                "{} {} {}",
                assignee,
                if *local { "=" } else { ":=" },
                value.pretty(indent)
            ),
            Expression::ObjectMutation {
                object,
                field,
                value,
                ..
            } => format!("{}.{} = {}", object.pretty(indent), field, value.pretty(indent)),
            Expression::ReturnValue {
                assignee,
                callee,
                left_args,
                right_args,
                ..
            } => format!(
                "{} = {}{}",
                assignee,
                callee.pretty(indent),
                render_call_args(
                    &join(left_args, |a| a.pretty(indent)),
                    !left_args.is_empty(),
                    &join(right_args, |a| a.pretty(indent)),
                    !right_args.is_empty(),
                )
            ),
        }
    }
}

impl Value {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            Value::Field { object, field, .. } => format!("{}.{}", object.pretty(indent), field),
            Value::Variable { identifier, .. } => identifier.to_string(),
            Value::Integer { value, .. } => value.to_string(),
            Value::Float { value, .. } => render_float(*value),
            Value::String {
                byte_oriented,
                value,
                ..
            } => crate::ast::render_string(*byte_oriented, value),
            Value::Function(function) => function.pretty(indent),
        }
    }
}

impl Function {
    pub fn pretty(&self, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        let left: Vec<String> = self.left_args.iter().map(|a| a.pretty(indent + 1)).collect();
        let right: Vec<String> = self.right_args.iter().map(|a| a.pretty(indent + 1)).collect();
        let mut out = format!("{{{}", render_params(&left, &right));
        for expression in &self.expressions {
            out.push_str(&format!("\n{}  {};", pad, expression.pretty(indent + 1)));
        }
        if self.expressions.is_empty() {
            out.push_str(&format!("{}}}", self.lastval.pretty(indent)));
        } else {
            out.push_str(&format!(
                "\n{}  {};\n{}}}",
                pad,
                self.lastval.pretty(indent + 1),
                pad
            ));
        }
        out
    }
}

impl OutArgument {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            OutArgument::Positional { value, .. } => value.pretty(indent),
            OutArgument::Named { name, value, .. } => format!("{}:{}", name, value.pretty(indent)),
            OutArgument::Splat { value, .. } => format!(":({})", value.pretty(indent)),
            OutArgument::Keyword { value, .. } => format!("::({})", value.pretty(indent)),
        }
    }
}

impl InArgument {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            InArgument::Required { name, .. } => name.to_string(),
            InArgument::Default { name, value, .. } => format!("{}:{}", name, value.pretty(indent)),
            InArgument::Splat { name, .. } => format!(":({})", name),
            InArgument::Keyword { name, .. } => format!("::({})", name),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(0))
    }
}
