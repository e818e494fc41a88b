//! AST → IR conversion
//!
//! Converts nested expressions into a flat list of named statements.
//! Conversion functions take the list of identifiers ("targets") the result
//! should be bound to; a producer that has to name its result anyway takes
//! the last target for it, and every remaining target is bound by a plain
//! local assignment afterwards. This avoids a temporary for `x = f.`.

use log::debug;
use thiserror::Error;

use crate::ast;
use crate::ast::Position;

use super::ir::{Expression, Function, Identifier, InArgument, NameGen, OutArgument, Program, Value};

/// Field called to look up `e[k]`
pub const LOOKUP_FIELD: &str = "~index";
/// Field called to store `e[k] = v` and to fill dictionaries
pub const UPDATE_FIELD: &str = "~update";
pub const ARRAY_CONSTRUCTOR: &str = "Array";
pub const DICT_CONSTRUCTOR: &str = "Dictionary";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error at line {line}, column {col}: {message}")]
pub struct ConversionError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl ConversionError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        ConversionError {
            line: pos.line,
            col: pos.col,
            message: message.into(),
        }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }
}

pub type ConvertResult<T> = Result<T, ConversionError>;

/// Convert a parsed program into IR
pub fn convert(program: ast::Program) -> ConvertResult<Program> {
    let mut names = NameGen::new("ir");
    let pos = program.pos;
    let (expressions, lastval) = Converter::new(&mut names).convert_body(program.expressions, pos)?;
    debug!(
        "converted program into {} statements ({} fresh names)",
        expressions.len(),
        names.count()
    );
    Ok(Program {
        expressions,
        lastval,
        pos,
    })
}

/// Converts one statement list. Nested function bodies get their own
/// converter sharing the same name generator.
struct Converter<'a> {
    names: &'a mut NameGen,
    ir: Vec<Expression>,
}

impl<'a> Converter<'a> {
    fn new(names: &'a mut NameGen) -> Self {
        Converter {
            names,
            ir: Vec::new(),
        }
    }

    fn convert_body(
        mut self,
        expressions: Vec<ast::Expression>,
        pos: Position,
    ) -> ConvertResult<(Vec<Expression>, Value)> {
        let mut lastval = Value::null(pos);
        for expression in expressions {
            lastval = self.convert_expression(expression, Vec::new())?;
        }
        Ok((self.ir, lastval))
    }

    /// Convert a statement list in a fresh converter
    fn convert_nested(
        &mut self,
        expressions: Vec<ast::Expression>,
        pos: Position,
    ) -> ConvertResult<(Vec<Expression>, Value)> {
        Converter::new(&mut *self.names).convert_body(expressions, pos)
    }

    // ========================================================================
    // Targets
    // ========================================================================

    fn pop_target(&mut self, targets: &mut Vec<Identifier>, pos: Position) -> Identifier {
        targets.pop().unwrap_or_else(|| self.names.fresh(pos))
    }

    fn sync_targets(&mut self, target: Identifier, targets: Vec<Identifier>) -> Value {
        self.set_targets(Value::variable(target), targets)
    }

    fn set_targets(&mut self, value: Value, targets: Vec<Identifier>) -> Value {
        for target in targets {
            let pos = target.pos;
            self.ir.push(Expression::Assignment {
                assignee: target,
                value: value.clone(),
                local: true,
                pos,
            });
        }
        value
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn convert_expression(
        &mut self,
        expression: ast::Expression,
        targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        match expression {
            ast::Expression::Application(app) => self.convert_application(app, targets),
            ast::Expression::Assignment(assignment) => self.convert_assignment(assignment, targets),
        }
    }

    fn convert_application(
        &mut self,
        app: ast::Application,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let mut terms = app.terms;
        if terms.len() == 1 {
            if let Some(term) = terms.pop() {
                return self.convert_term(term, targets);
            }
        }

        let target = self.pop_target(&mut targets, app.pos);
        let mut callee_index = 0;
        let mut found = false;
        for (i, term) in terms.iter_mut().enumerate() {
            if matches!(term.modifiers.last(), Some(ast::Modifier::OpenCall(_))) {
                if found {
                    return Err(ConversionError::new(
                        term.pos,
                        "application has more than one open calls",
                    ));
                }
                term.modifiers.pop();
                callee_index = i;
                found = true;
            }
        }

        let mut left_args = Vec::new();
        let mut right_args = Vec::new();
        let mut callee = None;
        for (i, term) in terms.into_iter().enumerate() {
            let pos = term.pos;
            let value = self.convert_term(term, Vec::new())?;
            match i.cmp(&callee_index) {
                std::cmp::Ordering::Less => left_args.push(OutArgument::Positional { value, pos }),
                std::cmp::Ordering::Equal => callee = Some(value),
                std::cmp::Ordering::Greater => {
                    right_args.push(OutArgument::Positional { value, pos })
                }
            }
        }
        let callee = callee.ok_or_else(|| ConversionError::new(app.pos, "empty application"))?;

        self.ir.push(Expression::ReturnValue {
            assignee: target.clone(),
            callee,
            left_args,
            right_args,
            pos: app.pos,
        });
        Ok(self.sync_targets(target, targets))
    }

    fn convert_assignment(
        &mut self,
        assignment: ast::Assignment,
        targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let ast::Assignment {
            mutation,
            assignee,
            expression,
            pos,
        } = assignment;
        match assignee {
            ast::Assignee::Variable(variable) => {
                self.convert_variable_assignment(mutation, variable.name, *expression, pos, targets)
            }
            ast::Assignee::Field { term, field, pos: assignee_pos } => {
                let rhs = self.convert_expression(*expression, targets)?;
                let object = self.convert_term(term, Vec::new())?;
                self.ir.push(Expression::ObjectMutation {
                    object,
                    field: Identifier::user(field.name, assignee_pos),
                    value: rhs.clone(),
                    pos,
                });
                Ok(rhs)
            }
            ast::Assignee::Index { term, index, .. } => {
                self.convert_index_assignment(term, index, *expression, pos, targets)
            }
        }
    }

    fn convert_variable_assignment(
        &mut self,
        mutation: bool,
        name: String,
        expression: ast::Expression,
        pos: Position,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let new_target = Identifier::user(name, pos);
        if !mutation {
            if !expression.references(&new_target.name) {
                targets.push(new_target);
                return self.convert_expression(expression, targets);
            }
            // the right-hand side sees the new binding, still unset
            self.ir.push(Expression::Assignment {
                assignee: new_target.clone(),
                value: Value::null(pos),
                local: true,
                pos,
            });
        }
        let real_value = self.convert_expression(expression, targets)?;
        self.ir.push(Expression::Assignment {
            assignee: new_target,
            value: real_value.clone(),
            local: false,
            pos,
        });
        Ok(real_value)
    }

    fn convert_index_assignment(
        &mut self,
        mut term: ast::Term,
        index: ast::Index,
        expression: ast::Expression,
        pos: Position,
        targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let expression_pos = expression.pos();
        let rhs = self.convert_expression(expression, targets)?;
        term.modifiers.push(ast::Modifier::Field(ast::Field {
            name: UPDATE_FIELD.to_string(),
            pos: index.pos,
        }));
        let call = self.convert_term(term, Vec::new())?;
        let location = self.convert_subexpression(index.expressions, index.pos, Vec::new())?;
        let assignee = self.names.fresh(pos);
        self.ir.push(Expression::ReturnValue {
            assignee,
            callee: call,
            left_args: Vec::new(),
            right_args: vec![
                OutArgument::Positional {
                    value: location,
                    pos: index.pos,
                },
                OutArgument::Positional {
                    value: rhs.clone(),
                    pos: expression_pos,
                },
            ],
            pos,
        });
        Ok(rhs)
    }

    // ========================================================================
    // Terms
    // ========================================================================

    /// Apply the modifiers left to right. Only the outermost one binds the
    /// targets.
    fn convert_term(&mut self, term: ast::Term, mut targets: Vec<Identifier>) -> ConvertResult<Value> {
        if term.modifiers.is_empty() {
            return self.convert_value(term.value, targets);
        }
        let mut value = self.convert_value(term.value, Vec::new())?;
        let count = term.modifiers.len();
        for (i, modifier) in term.modifiers.into_iter().enumerate() {
            let sub_targets = if i + 1 == count {
                std::mem::take(&mut targets)
            } else {
                Vec::new()
            };
            value = match modifier {
                ast::Modifier::OpenCall(pos) => {
                    self.convert_closed_call(value, Vec::new(), Vec::new(), pos, sub_targets)?
                }
                ast::Modifier::Index(index) => self.convert_index(value, index, sub_targets)?,
                ast::Modifier::Field(field) => {
                    self.convert_field(value, field.name, field.pos, sub_targets)
                }
                ast::Modifier::ClosedCall(call) => self.convert_closed_call(
                    value,
                    call.left_args,
                    call.right_args,
                    call.pos,
                    sub_targets,
                )?,
            };
        }
        Ok(value)
    }

    fn convert_closed_call(
        &mut self,
        callee: Value,
        left_args: Vec<ast::OutArgument>,
        right_args: Vec<ast::OutArgument>,
        pos: Position,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let target = self.pop_target(&mut targets, pos);
        let left_args = left_args
            .into_iter()
            .map(|arg| self.translate_out_arg(arg))
            .collect::<ConvertResult<Vec<_>>>()?;
        let right_args = right_args
            .into_iter()
            .map(|arg| self.translate_out_arg(arg))
            .collect::<ConvertResult<Vec<_>>>()?;
        self.ir.push(Expression::ReturnValue {
            assignee: target.clone(),
            callee,
            left_args,
            right_args,
            pos,
        });
        Ok(self.sync_targets(target, targets))
    }

    fn convert_index(
        &mut self,
        object: Value,
        index: ast::Index,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let target = self.pop_target(&mut targets, index.pos);
        let lookup = self.convert_field(object, LOOKUP_FIELD.to_string(), index.pos, Vec::new());
        let location = self.convert_subexpression(index.expressions, index.pos, Vec::new())?;
        self.ir.push(Expression::ReturnValue {
            assignee: target.clone(),
            callee: lookup,
            left_args: Vec::new(),
            right_args: vec![OutArgument::Positional {
                value: location,
                pos: index.pos,
            }],
            pos: index.pos,
        });
        Ok(self.sync_targets(target, targets))
    }

    fn convert_field(
        &mut self,
        object: Value,
        name: String,
        pos: Position,
        mut targets: Vec<Identifier>,
    ) -> Value {
        let target = self.pop_target(&mut targets, pos);
        self.ir.push(Expression::Assignment {
            assignee: target.clone(),
            value: Value::Field {
                object: Box::new(object),
                field: Identifier::user(name, pos),
                pos,
            },
            local: true,
            pos,
        });
        self.sync_targets(target, targets)
    }

    fn translate_out_arg(&mut self, arg: ast::OutArgument) -> ConvertResult<OutArgument> {
        Ok(match arg {
            ast::OutArgument::Positional { value, pos } => OutArgument::Positional {
                value: self.convert_application(value, Vec::new())?,
                pos,
            },
            ast::OutArgument::Named { name, value, pos } => OutArgument::Named {
                name: Identifier::user(name, pos),
                value: self.convert_application(value, Vec::new())?,
                pos,
            },
            ast::OutArgument::Splat { expressions, pos } => OutArgument::Splat {
                value: self.convert_subexpression(expressions, pos, Vec::new())?,
                pos,
            },
            ast::OutArgument::Keyword { expressions, pos } => OutArgument::Keyword {
                value: self.convert_subexpression(expressions, pos, Vec::new())?,
                pos,
            },
        })
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn convert_value(&mut self, value: ast::Value, mut targets: Vec<Identifier>) -> ConvertResult<Value> {
        match value {
            ast::Value::Variable(variable) => {
                let identifier = Identifier::user(variable.name, variable.pos);
                Ok(self.set_targets(Value::variable(identifier), targets))
            }
            ast::Value::Function(function) => self.convert_function(function, targets),
            ast::Value::Subexpression { expressions, pos } => {
                self.convert_subexpression(expressions, pos, targets)
            }
            ast::Value::Integer { value, pos } => {
                Ok(self.set_targets(Value::Integer { value, pos }, targets))
            }
            ast::Value::Float { value, pos } => {
                Ok(self.set_targets(Value::Float { value, pos }, targets))
            }
            ast::Value::String {
                byte_oriented,
                value,
                pos,
            } => {
                let target = self.pop_target(&mut targets, pos);
                self.ir.push(Expression::Assignment {
                    assignee: target.clone(),
                    value: Value::String {
                        byte_oriented,
                        value,
                        pos,
                    },
                    local: true,
                    pos,
                });
                Ok(self.sync_targets(target, targets))
            }
            ast::Value::Array { elements, pos } => self.convert_array(elements, pos, targets),
            ast::Value::Dict { definitions, pos } => self.convert_dict(definitions, pos, targets),
        }
    }

    fn convert_array(
        &mut self,
        elements: Vec<ast::Application>,
        pos: Position,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let target = self.pop_target(&mut targets, pos);
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            let element_pos = element.pos;
            values.push(OutArgument::Positional {
                value: self.convert_application(element, Vec::new())?,
                pos: element_pos,
            });
        }
        self.ir.push(Expression::ReturnValue {
            assignee: target.clone(),
            callee: Value::variable(Identifier::user(ARRAY_CONSTRUCTOR, pos)),
            left_args: Vec::new(),
            right_args: values,
            pos,
        });
        Ok(self.sync_targets(target, targets))
    }

    /// Build an empty dictionary, then store each pair through its update
    /// field in source order
    fn convert_dict(
        &mut self,
        definitions: Vec<ast::DictDefinition>,
        pos: Position,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let target = self.pop_target(&mut targets, pos);
        self.ir.push(Expression::ReturnValue {
            assignee: target.clone(),
            callee: Value::variable(Identifier::user(DICT_CONSTRUCTOR, pos)),
            left_args: Vec::new(),
            right_args: Vec::new(),
            pos,
        });
        let new_dict = self.sync_targets(target, targets);
        if definitions.is_empty() {
            return Ok(new_dict);
        }

        let update_field = self.names.fresh(pos);
        self.ir.push(Expression::Assignment {
            assignee: update_field.clone(),
            value: Value::Field {
                object: Box::new(new_dict.clone()),
                field: Identifier::user(UPDATE_FIELD, pos),
                pos,
            },
            local: true,
            pos,
        });
        let result_target = self.names.fresh(pos);
        for definition in definitions {
            let (key_pos, value_pos) = (definition.key.pos, definition.value.pos);
            let key = self.convert_application(definition.key, Vec::new())?;
            let value = self.convert_application(definition.value, Vec::new())?;
            self.ir.push(Expression::ReturnValue {
                assignee: result_target.clone(),
                callee: Value::variable(update_field.clone()),
                left_args: Vec::new(),
                right_args: vec![
                    OutArgument::Positional { value: key, pos: key_pos },
                    OutArgument::Positional { value, pos: value_pos },
                ],
                pos: definition.pos,
            });
        }
        Ok(new_dict)
    }

    /// Inline the statements when they bind nothing; otherwise they get their
    /// own scope as a zero-argument function that is called right away.
    fn convert_subexpression(
        &mut self,
        expressions: Vec<ast::Expression>,
        pos: Position,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        if !expressions.iter().any(ast::Expression::binds_anything) {
            let mut lastval = Value::null(pos);
            let count = expressions.len();
            for (i, expression) in expressions.into_iter().enumerate() {
                let sub_targets = if i + 1 == count {
                    std::mem::take(&mut targets)
                } else {
                    Vec::new()
                };
                lastval = self.convert_expression(expression, sub_targets)?;
            }
            // `()` still binds its targets
            return Ok(self.set_targets(lastval, targets));
        }

        let func = self.names.fresh(pos);
        let (body, lastval) = self.convert_nested(expressions, pos)?;
        self.ir.push(Expression::Assignment {
            assignee: func.clone(),
            value: Value::Function(Function {
                expressions: body,
                lastval: Box::new(lastval),
                left_args: Vec::new(),
                right_args: Vec::new(),
                pos,
            }),
            local: true,
            pos,
        });
        let target = self.pop_target(&mut targets, pos);
        self.ir.push(Expression::ReturnValue {
            assignee: target.clone(),
            callee: Value::variable(func),
            left_args: Vec::new(),
            right_args: Vec::new(),
            pos,
        });
        Ok(self.sync_targets(target, targets))
    }

    fn convert_function(
        &mut self,
        function: ast::Function,
        mut targets: Vec<Identifier>,
    ) -> ConvertResult<Value> {
        let pos = function.pos;
        let target = self.pop_target(&mut targets, pos);
        let (body, lastval) = self.convert_nested(function.expressions, pos)?;
        let left_args = function
            .left_args
            .into_iter()
            .map(|arg| self.translate_in_arg(arg))
            .collect::<ConvertResult<Vec<_>>>()?;
        let right_args = function
            .right_args
            .into_iter()
            .map(|arg| self.translate_in_arg(arg))
            .collect::<ConvertResult<Vec<_>>>()?;
        self.ir.push(Expression::Assignment {
            assignee: target.clone(),
            value: Value::Function(Function {
                expressions: body,
                lastval: Box::new(lastval),
                left_args,
                right_args,
                pos,
            }),
            local: true,
            pos,
        });
        Ok(self.sync_targets(target, targets))
    }

    /// Parameter defaults are evaluated in the enclosing scope
    fn translate_in_arg(&mut self, arg: ast::InArgument) -> ConvertResult<InArgument> {
        Ok(match arg {
            ast::InArgument::Required { name, pos } => InArgument::Required {
                name: Identifier::user(name, pos),
                pos,
            },
            ast::InArgument::Default { name, value, pos } => InArgument::Default {
                name: Identifier::user(name, pos),
                value: self.convert_application(value, Vec::new())?,
                pos,
            },
            ast::InArgument::Splat { name, pos } => InArgument::Splat {
                name: Identifier::user(name, pos),
                pos,
            },
            ast::InArgument::Keyword { name, pos } => InArgument::Keyword {
                name: Identifier::user(name, pos),
                pos,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn convert_source(source: &str) -> Program {
        convert(parse(source).unwrap()).unwrap()
    }

    #[test]
    fn test_named_result_needs_no_temporary() {
        let program = convert_source("x = f.");
        assert_eq!(program.expressions.len(), 1);
        assert!(matches!(
            &program.expressions[0],
            Expression::ReturnValue { assignee, .. } if assignee.name == "x" && assignee.user_provided
        ));
    }

    #[test]
    fn test_extra_targets_are_synced() {
        let program = convert_source("a = b = f.");
        assert_eq!(program.pretty(0), "b = f();\na = b");
    }

    #[test]
    fn test_empty_program_value_is_null() {
        let program = convert_source("");
        assert!(program.expressions.is_empty());
        assert_eq!(program.lastval, Value::null(Position::new(1, 1)));
    }
}
