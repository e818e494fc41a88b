//! Abstract Syntax Tree for Pants
//!
//! The AST is produced once by the parser and consumed (moved) by the
//! converter. Every node carries the position it started at.

use std::fmt;

pub type Ident = String;

/// Human-readable source position (1-indexed line and column)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// 1-indexed line number
    pub line: usize,
    /// 1-indexed column number (in characters, not bytes)
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub expressions: Vec<Expression>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Assignment(Assignment),
    Application(Application),
}

/// `assignee = expression` (introducing) or `assignee := expression` (mutating)
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub mutation: bool,
    pub assignee: Assignee,
    pub expression: Box<Expression>,
    pub pos: Position,
}

/// Whitespace-separated terms
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub terms: Vec<Term>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignee {
    Variable(Variable),
    Field { term: Term, field: Field, pos: Position },
    Index { term: Term, index: Index, pos: Position },
}

/// A value followed by its modifiers, applied left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub value: Value,
    pub modifiers: Vec<Modifier>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    OpenCall(Position),
    Index(Index),
    Field(Field),
    ClosedCall(ClosedCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub expressions: Vec<Expression>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Ident,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedCall {
    pub left_args: Vec<OutArgument>,
    pub right_args: Vec<OutArgument>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: Ident,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(Variable),
    Subexpression {
        expressions: Vec<Expression>,
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
    Array {
        elements: Vec<Application>,
        pos: Position,
    },
    Dict {
        definitions: Vec<DictDefinition>,
        pos: Position,
    },
    Function(Function),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictDefinition {
    pub key: Application,
    pub value: Application,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub expressions: Vec<Expression>,
    pub left_args: Vec<InArgument>,
    pub right_args: Vec<InArgument>,
    pub pos: Position,
}

/// Binding positions of a function
#[derive(Debug, Clone, PartialEq)]
pub enum InArgument {
    Required { name: Ident, pos: Position },
    Default { name: Ident, value: Application, pos: Position },
    /// Collects remaining positional arguments
    Splat { name: Ident, pos: Position },
    /// Collects remaining named arguments
    Keyword { name: Ident, pos: Position },
}

/// Call-site arguments
#[derive(Debug, Clone, PartialEq)]
pub enum OutArgument {
    Positional { value: Application, pos: Position },
    Named { name: Ident, value: Application, pos: Position },
    Splat { expressions: Vec<Expression>, pos: Position },
    Keyword { expressions: Vec<Expression>, pos: Position },
}

// ============================================================================
// Accessors
// ============================================================================

impl Expression {
    pub fn pos(&self) -> Position {
        match self {
            Expression::Assignment(a) => a.pos,
            Expression::Application(a) => a.pos,
        }
    }
}

impl Assignee {
    pub fn pos(&self) -> Position {
        match self {
            Assignee::Variable(v) => v.pos,
            Assignee::Field { pos, .. } | Assignee::Index { pos, .. } => *pos,
        }
    }
}

impl Modifier {
    pub fn pos(&self) -> Position {
        match self {
            Modifier::OpenCall(pos) => *pos,
            Modifier::Index(i) => i.pos,
            Modifier::Field(f) => f.pos,
            Modifier::ClosedCall(c) => c.pos,
        }
    }
}

impl Value {
    pub fn pos(&self) -> Position {
        match self {
            Value::Variable(v) => v.pos,
            Value::Function(f) => f.pos,
            Value::Subexpression { pos, .. }
            | Value::Integer { pos, .. }
            | Value::Float { pos, .. }
            | Value::String { pos, .. }
            | Value::Array { pos, .. }
            | Value::Dict { pos, .. } => *pos,
        }
    }
}

impl InArgument {
    pub fn name(&self) -> &str {
        match self {
            InArgument::Required { name, .. }
            | InArgument::Default { name, .. }
            | InArgument::Splat { name, .. }
            | InArgument::Keyword { name, .. } => name,
        }
    }

    pub fn pos(&self) -> Position {
        match self {
            InArgument::Required { pos, .. }
            | InArgument::Default { pos, .. }
            | InArgument::Splat { pos, .. }
            | InArgument::Keyword { pos, .. } => *pos,
        }
    }
}

impl OutArgument {
    pub fn pos(&self) -> Position {
        match self {
            OutArgument::Positional { pos, .. }
            | OutArgument::Named { pos, .. }
            | OutArgument::Splat { pos, .. }
            | OutArgument::Keyword { pos, .. } => *pos,
        }
    }
}

// ============================================================================
// Scoping queries
//
// `references` answers whether evaluating a node can observe the binding of
// `name` that is live before the node runs. A later rebinding of the same
// name in an expression list hides everything after it.
// ============================================================================

pub fn references_in_expressions(expressions: &[Expression], name: &str) -> bool {
    for expression in expressions {
        if expression.references(name) {
            return true;
        }
        if expression.binds(name) {
            return false;
        }
    }
    false
}

impl Expression {
    pub fn references(&self, name: &str) -> bool {
        match self {
            Expression::Assignment(a) => a.references(name),
            Expression::Application(a) => a.references(name),
        }
    }

    pub fn binds(&self, name: &str) -> bool {
        match self {
            Expression::Assignment(a) => a.binds(name),
            Expression::Application(_) => false,
        }
    }

    /// Whether evaluating this expression may introduce a new binding
    pub fn binds_anything(&self) -> bool {
        match self {
            Expression::Assignment(a) => !a.mutation || a.expression.binds_anything(),
            Expression::Application(_) => false,
        }
    }
}

impl Assignment {
    pub fn references(&self, name: &str) -> bool {
        match &self.assignee {
            Assignee::Variable(variable) => {
                if !self.mutation {
                    if variable.name == name {
                        return false;
                    }
                    return self.expression.references(name);
                }
                if self.expression.references(name) {
                    return true;
                }
                if self.expression.binds(name) {
                    return false;
                }
                variable.name == name
            }
            Assignee::Field { term, .. } => {
                self.expression.references(name) || term.references(name)
            }
            Assignee::Index { term, index, .. } => {
                self.expression.references(name)
                    || term.references(name)
                    || references_in_expressions(&index.expressions, name)
            }
        }
    }

    pub fn binds(&self, name: &str) -> bool {
        match &self.assignee {
            Assignee::Variable(variable) => {
                (!self.mutation && variable.name == name) || self.expression.binds(name)
            }
            Assignee::Field { .. } | Assignee::Index { .. } => false,
        }
    }
}

impl Application {
    pub fn references(&self, name: &str) -> bool {
        self.terms.iter().any(|t| t.references(name))
    }
}

impl Term {
    pub fn references(&self, name: &str) -> bool {
        self.value.references(name) || self.modifiers.iter().any(|m| m.references(name))
    }
}

impl Modifier {
    pub fn references(&self, name: &str) -> bool {
        match self {
            Modifier::OpenCall(_) | Modifier::Field(_) => false,
            Modifier::Index(index) => references_in_expressions(&index.expressions, name),
            Modifier::ClosedCall(call) => call
                .left_args
                .iter()
                .chain(&call.right_args)
                .any(|arg| arg.references(name)),
        }
    }
}

impl Value {
    pub fn references(&self, name: &str) -> bool {
        match self {
            Value::Variable(v) => v.name == name,
            Value::Subexpression { expressions, .. } => {
                references_in_expressions(expressions, name)
            }
            Value::Integer { .. } | Value::Float { .. } | Value::String { .. } => false,
            Value::Array { elements, .. } => elements.iter().any(|e| e.references(name)),
            Value::Dict { definitions, .. } => definitions
                .iter()
                .any(|d| d.key.references(name) || d.value.references(name)),
            Value::Function(function) => function.references(name),
        }
    }
}

impl Function {
    pub fn references(&self, name: &str) -> bool {
        let mut is_bound = false;
        for arg in self.left_args.iter().chain(&self.right_args) {
            if arg.references(name) {
                return true;
            }
            if arg.binds(name) {
                is_bound = true;
            }
        }
        if is_bound {
            return false;
        }
        references_in_expressions(&self.expressions, name)
    }
}

impl InArgument {
    pub fn references(&self, name: &str) -> bool {
        match self {
            InArgument::Default { value, .. } => value.references(name),
            _ => false,
        }
    }

    pub fn binds(&self, name: &str) -> bool {
        self.name() == name
    }
}

impl OutArgument {
    pub fn references(&self, name: &str) -> bool {
        match self {
            OutArgument::Positional { value, .. } | OutArgument::Named { value, .. } => {
                value.references(name)
            }
            OutArgument::Splat { expressions, .. } | OutArgument::Keyword { expressions, .. } => {
                references_in_expressions(expressions, name)
            }
        }
    }
}

// ============================================================================
// Position erasure (structural comparison ignoring source locations)
// ============================================================================

impl Program {
    /// Reset every position in the tree, so that two programs can be compared
    /// structurally with `==`.
    pub fn erase_positions(mut self) -> Self {
        self.pos = Position::default();
        erase_expressions(&mut self.expressions);
        self
    }
}

fn erase_expressions(expressions: &mut [Expression]) {
    for expression in expressions {
        erase_expression(expression);
    }
}

fn erase_expression(expression: &mut Expression) {
    match expression {
        Expression::Assignment(a) => {
            a.pos = Position::default();
            match &mut a.assignee {
                Assignee::Variable(v) => v.pos = Position::default(),
                Assignee::Field { term, field, pos } => {
                    *pos = Position::default();
                    field.pos = Position::default();
                    erase_term(term);
                }
                Assignee::Index { term, index, pos } => {
                    *pos = Position::default();
                    index.pos = Position::default();
                    erase_expressions(&mut index.expressions);
                    erase_term(term);
                }
            }
            erase_expression(&mut a.expression);
        }
        Expression::Application(a) => erase_application(a),
    }
}

fn erase_application(application: &mut Application) {
    application.pos = Position::default();
    for term in &mut application.terms {
        erase_term(term);
    }
}

fn erase_term(term: &mut Term) {
    term.pos = Position::default();
    erase_value(&mut term.value);
    for modifier in &mut term.modifiers {
        match modifier {
            Modifier::OpenCall(pos) => *pos = Position::default(),
            Modifier::Field(f) => f.pos = Position::default(),
            Modifier::Index(i) => {
                i.pos = Position::default();
                erase_expressions(&mut i.expressions);
            }
            Modifier::ClosedCall(c) => {
                c.pos = Position::default();
                c.left_args.iter_mut().for_each(erase_out_argument);
                c.right_args.iter_mut().for_each(erase_out_argument);
            }
        }
    }
}

fn erase_value(value: &mut Value) {
    match value {
        Value::Variable(v) => v.pos = Position::default(),
        Value::Subexpression { expressions, pos } => {
            *pos = Position::default();
            erase_expressions(expressions);
        }
        Value::Integer { pos, .. } | Value::Float { pos, .. } | Value::String { pos, .. } => {
            *pos = Position::default();
        }
        Value::Array { elements, pos } => {
            *pos = Position::default();
            elements.iter_mut().for_each(erase_application);
        }
        Value::Dict { definitions, pos } => {
            *pos = Position::default();
            for definition in definitions {
                definition.pos = Position::default();
                erase_application(&mut definition.key);
                erase_application(&mut definition.value);
            }
        }
        Value::Function(function) => {
            function.pos = Position::default();
            erase_expressions(&mut function.expressions);
            for arg in function.left_args.iter_mut().chain(function.right_args.iter_mut()) {
                match arg {
                    InArgument::Default { value, pos, .. } => {
                        *pos = Position::default();
                        erase_application(value);
                    }
                    InArgument::Required { pos, .. }
                    | InArgument::Splat { pos, .. }
                    | InArgument::Keyword { pos, .. } => *pos = Position::default(),
                }
            }
        }
    }
}

fn erase_out_argument(arg: &mut OutArgument) {
    match arg {
        OutArgument::Positional { value, pos } | OutArgument::Named { value, pos, .. } => {
            *pos = Position::default();
            erase_application(value);
        }
        OutArgument::Splat { expressions, pos } | OutArgument::Keyword { expressions, pos } => {
            *pos = Position::default();
            erase_expressions(expressions);
        }
    }
}

// ============================================================================
// Pretty printing
//
// The rendering is valid surface syntax: parsing it again yields the same
// tree up to positions.
// ============================================================================

fn join<T>(items: &[T], sep: &str, render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(sep)
}

impl Program {
    pub fn pretty(&self, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        join(&self.expressions, &format!(";\n{}", pad), |e| e.pretty(indent))
    }
}

impl Expression {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            Expression::Assignment(a) => format!(
                "{} {} {}",
                a.assignee.pretty(indent),
                if a.mutation { ":=" } else { "=" },
                a.expression.pretty(indent)
            ),
            Expression::Application(a) => a.pretty(indent),
        }
    }
}

impl Application {
    pub fn pretty(&self, indent: usize) -> String {
        join(&self.terms, " ", |t| t.pretty(indent))
    }
}

impl Assignee {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            Assignee::Variable(v) => v.name.clone(),
            Assignee::Field { term, field, .. } => format!("{}.{}", term.pretty(indent), field.name),
            Assignee::Index { term, index, .. } => {
                format!("{}{}", term.pretty(indent), index.pretty(indent))
            }
        }
    }
}

impl Term {
    pub fn pretty(&self, indent: usize) -> String {
        let mut out = self.value.pretty(indent);
        for modifier in &self.modifiers {
            out.push_str(&modifier.pretty(indent));
        }
        out
    }
}

impl Index {
    pub fn pretty(&self, indent: usize) -> String {
        format!("[{}]", join(&self.expressions, "; ", |e| e.pretty(indent)))
    }
}

impl Modifier {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            Modifier::OpenCall(_) => ".".to_string(),
            Modifier::Index(index) => index.pretty(indent),
            Modifier::Field(field) => format!(".{}", field.name),
            Modifier::ClosedCall(call) => {
                let right = join(&call.right_args, ", ", |a| a.pretty(indent));
                if call.left_args.is_empty() {
                    format!("({})", right)
                } else {
                    let left = join(&call.left_args, ", ", |a| a.pretty(indent));
                    format!("({}; {})", left, right)
                }
            }
        }
    }
}

impl Value {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            Value::Variable(v) => v.name.clone(),
            Value::Subexpression { expressions, .. } => {
                format!("({})", join(expressions, "; ", |e| e.pretty(indent)))
            }
            Value::Integer { value, .. } => value.to_string(),
            Value::Float { value, .. } => render_float(*value),
            Value::String {
                byte_oriented,
                value,
                ..
            } => render_string(*byte_oriented, value),
            Value::Array { elements, .. } => {
                format!("[{}]", join(elements, ", ", |e| e.pretty(indent)))
            }
            Value::Dict { definitions, .. } => format!(
                "{{{}}}",
                join(definitions, ", ", |d| format!(
                    "{}: {}",
                    d.key.pretty(indent),
                    d.value.pretty(indent)
                ))
            ),
            Value::Function(function) => function.pretty(indent),
        }
    }
}

impl Function {
    pub fn pretty(&self, indent: usize) -> String {
        let has_args = !self.left_args.is_empty() || !self.right_args.is_empty();
        if !has_args && self.expressions.is_empty() {
            // `{}` would read back as an empty dictionary
            return "{||}".to_string();
        }
        let pad = "  ".repeat(indent);
        let mut out = String::from("{");
        if has_args {
            out.push('|');
        }
        if !self.left_args.is_empty() {
            out.push_str(&join(&self.left_args, ", ", |a| a.pretty(indent + 1)));
            out.push(';');
        }
        if !self.left_args.is_empty() && !self.right_args.is_empty() {
            out.push(' ');
        }
        if !self.right_args.is_empty() {
            out.push_str(&join(&self.right_args, ", ", |a| a.pretty(indent + 1)));
        }
        if has_args {
            out.push('|');
        }
        for expression in &self.expressions {
            out.push_str(&format!("\n{}  {};", pad, expression.pretty(indent + 1)));
        }
        if !self.expressions.is_empty() {
            out.push('\n');
            out.push_str(&pad);
        }
        out.push('}');
        out
    }
}

impl InArgument {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            InArgument::Required { name, .. } => name.clone(),
            InArgument::Default { name, value, .. } => format!("{}:{}", name, value.pretty(indent)),
            InArgument::Splat { name, .. } => format!(":({})", name),
            InArgument::Keyword { name, .. } => format!("::({})", name),
        }
    }
}

impl OutArgument {
    pub fn pretty(&self, indent: usize) -> String {
        match self {
            OutArgument::Positional { value, .. } => value.pretty(indent),
            OutArgument::Named { name, value, .. } => format!("{}:{}", name, value.pretty(indent)),
            OutArgument::Splat { expressions, .. } => {
                format!(":({})", join(expressions, "; ", |e| e.pretty(indent)))
            }
            OutArgument::Keyword { expressions, .. } => {
                format!("::({})", join(expressions, "; ", |e| e.pretty(indent)))
            }
        }
    }
}

/// Render a float as a decimal literal with a `.`, without exponent notation.
/// The digits are the shortest that read back as the same value.
pub fn render_float(value: f64) -> String {
    let mut out = value.to_string();
    if value.is_finite() && !out.contains('.') {
        out.push_str(".0");
    }
    out
}

/// Render a string literal with escapes, so that it reads back unchanged.
pub fn render_string(byte_oriented: bool, value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 3);
    if byte_oriented {
        out.push('b');
    }
    out.push('"');
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || (0x7f..0x100).contains(&(c as u32)) => {
                out.push_str(&format!("\\{}", c as u32));
                // a digit or base letter right after would extend the escape
                if chars.get(i + 1).is_some_and(|next| next.is_ascii_alphanumeric()) {
                    out.push_str("\\\n");
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(0))
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

    fn var(name: &str) -> Term {
        Term {
            value: Value::Variable(Variable {
                name: name.to_string(),
                pos: Position::new(1, 1),
            }),
            modifiers: vec![],
            pos: Position::new(1, 1),
        }
    }

    fn app(terms: Vec<Term>) -> Expression {
        Expression::Application(Application {
            terms,
            pos: Position::new(1, 1),
        })
    }

    fn assign(mutation: bool, name: &str, expression: Expression) -> Expression {
        Expression::Assignment(Assignment {
            mutation,
            assignee: Assignee::Variable(Variable {
                name: name.to_string(),
                pos: Position::new(1, 1),
            }),
            expression: Box::new(expression),
            pos: Position::new(1, 1),
        })
    }

    #[test]
    fn test_introducing_assignment_hides_later_references() {
        let exprs = vec![assign(false, "x", app(vec![var("y")])), app(vec![var("x")])];
        assert!(!references_in_expressions(&exprs, "x"));
        assert!(references_in_expressions(&exprs, "y"));
    }

    #[test]
    fn test_self_referencing_assignment() {
        let exp = assign(false, "x", app(vec![var("f"), var("x")]));
        // the right-hand side sees the previous x, but `x = ...` itself
        // hides it from the enclosing scope
        assert!(!exp.references("x"));
        if let Expression::Assignment(a) = &exp {
            assert!(a.expression.references("x"));
        }
    }

    #[test]
    fn test_mutation_references_assignee() {
        let exp = assign(true, "x", app(vec![var("y")]));
        assert!(exp.references("x"));
        assert!(!exp.binds("x"));
        assert!(!exp.binds_anything());
    }

    #[test]
    fn test_function_parameters_shadow() {
        let function = Function {
            expressions: vec![app(vec![var("a"), var("b")])],
            left_args: vec![],
            right_args: vec![InArgument::Required {
                name: "a".to_string(),
                pos: Position::new(1, 3),
            }],
            pos: Position::new(1, 1),
        };
        assert!(!function.references("a"));
        assert!(function.references("b"));
    }

    #[test]
    fn test_render_string_escapes() {
        assert_eq!(render_string(false, "hi\n"), "\"hi\\n\"");
        assert_eq!(render_string(true, "q\"q"), "b\"q\\\"q\"");
        assert_eq!(render_string(false, "\u{1}x"), "\"\\1\\\nx\"");
        assert_eq!(render_string(false, "\u{1} "), "\"\\1 \"");
    }

    #[test]
    fn test_render_float_has_no_exponent() {
        assert_eq!(render_float(3.0), "3.0");
        assert_eq!(render_float(1.25), "1.25");
        assert_eq!(render_float(-2.5), "-2.5");
        assert_eq!(render_float(1e-7), "0.0000001");
        assert_eq!(render_float(1e20), "100000000000000000000.0");
    }

    #[test]
    fn test_empty_function_renders_distinct_from_dict() {
        let function = Value::Function(Function {
            expressions: vec![],
            left_args: vec![],
            right_args: vec![],
            pos: Position::new(1, 1),
        });
        assert_eq!(function.pretty(0), "{||}");
    }
}
