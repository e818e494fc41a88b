//! Continuation-passing style representation
//!
//! A CPS program is a single expression: a chain of bindings ending in a
//! call. Every call carries two continuation slots: the computation
//! continuation receiving the result, and the delimited continuation marking
//! the innermost reset. Continuations themselves are called with an empty
//! computation slot.

use std::fmt;

use crate::ast::{render_float, Position};

use super::ir::{render_call_args, render_params};
pub use super::ir::Identifier;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Call {
        callee: Value,
        left_args: Vec<OutArgument>,
        right_args: Vec<OutArgument>,
        comp_cont: Option<Value>,
        delim_cont: Option<Value>,
        pos: Position,
    },
    Assignment {
        assignee: Identifier,
        value: Value,
        local: bool,
        next: Box<Expression>,
        pos: Position,
    },
    ObjectMutation {
        object: Value,
        field: Identifier,
        value: Value,
        next: Box<Expression>,
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
    Callable(Callable),
}

/// A function value. `comp_cont` and `delim_cont` name the continuation
/// parameters; continuations that take none leave them empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    pub body: Box<Expression>,
    pub left_args: Vec<InArgument>,
    pub right_args: Vec<InArgument>,
    pub comp_cont: Option<Identifier>,
    pub delim_cont: Option<Identifier>,
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

// ============================================================================
// Constructors and accessors
// ============================================================================

impl Value {
    pub fn variable(identifier: Identifier) -> Self {
        let pos = identifier.pos;
        Value::Variable { identifier, pos }
    }

    pub fn pos(&self) -> Position {
        match self {
            Value::Callable(c) => c.pos,
            Value::Field { pos, .. }
            | Value::Variable { pos, .. }
            | Value::Integer { pos, .. }
            | Value::Float { pos, .. }
            | Value::String { pos, .. } => *pos,
        }
    }
}

impl OutArgument {
    pub fn positional(value: Value) -> Self {
        let pos = value.pos();
        OutArgument::Positional { value, pos }
    }

    pub fn value(&self) -> &Value {
        match self {
            OutArgument::Positional { value, .. }
            | OutArgument::Named { value, .. }
            | OutArgument::Splat { value, .. }
            | OutArgument::Keyword { value, .. } => value,
        }
    }
}

impl InArgument {
    pub fn required(name: Identifier) -> Self {
        let pos = name.pos;
        InArgument::Required { name, pos }
    }

    pub fn name(&self) -> &Identifier {
        match self {
            InArgument::Required { name, .. }
            | InArgument::Default { name, .. }
            | InArgument::Splat { name, .. }
            | InArgument::Keyword { name, .. } => name,
        }
    }
}

impl Expression {
    pub fn pos(&self) -> Position {
        match self {
            Expression::Call { pos, .. }
            | Expression::Assignment { pos, .. }
            | Expression::ObjectMutation { pos, .. } => *pos,
        }
    }
}

// ============================================================================
// Scoping
// ============================================================================

impl Expression {
    /// Whether evaluating this expression can observe the binding of
    /// `identifier` that is live before it
    pub fn references(&self, identifier: &Identifier) -> bool {
        match self {
            Expression::Call {
                callee,
                left_args,
                right_args,
                comp_cont,
                delim_cont,
                ..
            } => {
                callee.references(identifier)
                    || left_args
                        .iter()
                        .chain(right_args)
                        .any(|arg| arg.value().references(identifier))
                    || comp_cont.iter().chain(delim_cont).any(|c| c.references(identifier))
            }
            Expression::Assignment {
                assignee,
                value,
                local,
                next,
                ..
            } => {
                if value.references(identifier) {
                    return true;
                }
                if assignee == identifier {
                    // a local binding shadows; a mutation reaches the binding
                    return !*local;
                }
                next.references(identifier)
            }
            Expression::ObjectMutation {
                object, value, next, ..
            } => {
                object.references(identifier)
                    || value.references(identifier)
                    || next.references(identifier)
            }
        }
    }
}

impl Value {
    pub fn references(&self, identifier: &Identifier) -> bool {
        match self {
            Value::Field { object, .. } => object.references(identifier),
            Value::Variable { identifier: name, .. } => name == identifier,
            Value::Integer { .. } | Value::Float { .. } | Value::String { .. } => false,
            Value::Callable(callable) => callable.references(identifier),
        }
    }
}

impl Callable {
    /// Parameters (including continuation parameters) shadow; default values
    /// are evaluated outside the callable.
    pub fn references(&self, identifier: &Identifier) -> bool {
        let args = || self.left_args.iter().chain(&self.right_args);
        if args().any(|arg| matches!(arg, InArgument::Default { value, .. } if value.references(identifier)))
        {
            return true;
        }
        let bound = args().any(|arg| arg.name() == identifier)
            || self.comp_cont.as_ref() == Some(identifier)
            || self.delim_cont.as_ref() == Some(identifier);
        !bound && self.body.references(identifier)
    }
}

// ============================================================================
// Pretty printing
// ============================================================================

fn render_cont<T: fmt::Display>(cont: Option<&T>) -> String {
    cont.map_or_else(|| "-".to_string(), |c| c.to_string())
}

fn join(items: &[OutArgument], indent: usize) -> String {
    items
        .iter()
        .map(|a| a.pretty(indent))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Expression {
    pub fn pretty(&self, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        match self {
            Expression::Call {
                callee,
                left_args,
                right_args,
                comp_cont,
                delim_cont,
                ..
            } => format!(
                "{}{} (k: {}, d: {})",
                callee.pretty(indent),
                render_call_args(
                    &join(left_args, indent),
                    !left_args.is_empty(),
                    &join(right_args, indent),
                    !right_args.is_empty(),
                ),
                comp_cont.as_ref().map_or_else(|| "-".to_string(), |c| c.pretty(indent)),
                delim_cont.as_ref().map_or_else(|| "-".to_string(), |c| c.pretty(indent)),
            ),
            Expression::Assignment {
                assignee,
                value,
                local,
                next,
                ..
            } => format!(
                "{} {} {};\n{}{}",
                assignee,
                if *local { "=" } else { ":=" },
                value.pretty(indent),
                pad,
                next.pretty(indent)
            ),
            Expression::ObjectMutation {
                object,
                field,
                value,
                next,
                ..
            } => format!(
                "{}.{} = {};\n{}{}",
                object.pretty(indent),
                field,
                value.pretty(indent),
                pad,
                next.pretty(indent)
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
            Value::Callable(callable) => callable.pretty(indent),
        }
    }
}

impl Callable {
    pub fn pretty(&self, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        let left: Vec<String> = self.left_args.iter().map(|a| a.pretty(indent + 1)).collect();
        let right: Vec<String> = self.right_args.iter().map(|a| a.pretty(indent + 1)).collect();
        format!(
            "{{{} (k: {}, d: {})\n{}  {}\n{}}}",
            render_params(&left, &right),
            render_cont(self.comp_cont.as_ref()),
            render_cont(self.delim_cont.as_ref()),
            pad,
            self.body.pretty(indent + 1),
            pad
        )
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

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::user(name, Position::new(1, 1))
    }

    fn var(name: &str) -> Value {
        Value::variable(id(name))
    }

    fn call(callee: &str, args: &[&str]) -> Expression {
        Expression::Call {
            callee: var(callee),
            left_args: vec![],
            right_args: args.iter().map(|a| OutArgument::positional(var(a))).collect(),
            comp_cont: None,
            delim_cont: None,
            pos: Position::new(1, 1),
        }
    }

    fn assign(name: &str, value: Value, local: bool, next: Expression) -> Expression {
        Expression::Assignment {
            assignee: id(name),
            value,
            local,
            next: Box::new(next),
            pos: Position::new(1, 1),
        }
    }

    #[test]
    fn test_local_binding_shadows() {
        let exp = assign("x", var("y"), true, call("f", &["x"]));
        assert!(!exp.references(&id("x")));
        assert!(exp.references(&id("y")));
        assert!(exp.references(&id("f")));
    }

    #[test]
    fn test_mutation_references_target() {
        let exp = assign("x", var("y"), false, call("f", &[]));
        assert!(exp.references(&id("x")));
    }

    #[test]
    fn test_callable_parameters_shadow() {
        let callable = Callable {
            body: Box::new(call("k", &["a", "b"])),
            left_args: vec![],
            right_args: vec![InArgument::required(id("a"))],
            comp_cont: Some(id("k")),
            delim_cont: None,
            pos: Position::new(1, 1),
        };
        assert!(!callable.references(&id("a")));
        assert!(!callable.references(&id("k")));
        assert!(callable.references(&id("b")));
    }

    #[test]
    fn test_continuation_slots_count_as_references() {
        let exp = Expression::Call {
            callee: var("f"),
            left_args: vec![],
            right_args: vec![],
            comp_cont: Some(var("k")),
            delim_cont: Some(var("d")),
            pos: Position::new(1, 1),
        };
        assert!(exp.references(&id("k")));
        assert!(exp.references(&id("d")));
        assert_eq!(exp.pretty(0), "f() (k: k, d: d)");
    }
}
