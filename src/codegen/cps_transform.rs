//! IR → CPS transformation with delimited continuations
//!
//! Single pass over each statement list, last statement first. Every
//! function gains two continuation parameters:
//!
//! ```text
//! M({|args| body})  => {|args| (k, d) T(body, k, d)}
//! T(x = f(a); e)    => kx = {|x| (-, d) T(e)}; f(a) (k: kx, d: d')
//! ```
//!
//! `d'` is a fresh delimited continuation that becomes the entry delimiter
//! of the statements before the call. `reset` and `shift` are defined only
//! when the program mentions them:
//!
//! ```text
//! reset = {|lam| (ec, mc) rd = {|v| ec(v) (-, mc)}; lam() (identity_cont, rd)}
//! shift = {|lam| (ec, mc) u = {|x| (vc, vm) rd = {|v| vc(v) (-, vm)}; ec(x) (-, rd)};
//!                          lam(u) (identity_cont, mc)}
//! ```

use log::debug;
use thiserror::Error;

use crate::ast::Position;

use super::cps::{Callable, Expression, InArgument, OutArgument, Value};
use super::ir::{self, Identifier, NameGen};

pub const IDENTITY_CONT: &str = "identity_cont";
/// Outermost delimited continuation, supplied by the runtime
pub const HALT_CONT: &str = "halt_cont";
pub const RESET: &str = "reset";
pub const SHIFT: &str = "shift";
/// User-visible name of the current function's undelimited continuation
pub const CONT: &str = "cont";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error at line {line}, column {col}: {message}")]
pub struct TransformationError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl TransformationError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        TransformationError {
            line: pos.line,
            col: pos.col,
            message: message.into(),
        }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }
}

pub type TransformResult<T> = Result<T, TransformationError>;

/// Transform an IR program with a fresh transformer
pub fn transform(program: ir::Program) -> TransformResult<Expression> {
    CPSTransformer::new().transform(program)
}

fn synthesized(name: &str) -> Identifier {
    Identifier::synthesized(name, Position::default())
}

fn builtin(name: &str) -> Identifier {
    Identifier::user(name, Position::default())
}

fn var(identifier: &Identifier) -> Value {
    Value::variable(identifier.clone())
}

/// A continuation-style call `callee(arg)` with the given continuation slots
fn call1(
    callee: &Identifier,
    arg: &Identifier,
    comp_cont: Option<Value>,
    delim_cont: Option<Value>,
    pos: Position,
) -> Expression {
    Expression::Call {
        callee: var(callee),
        left_args: Vec::new(),
        right_args: vec![OutArgument::positional(var(arg))],
        comp_cont,
        delim_cont,
        pos,
    }
}

fn bind(assignee: Identifier, value: Value, next: Expression, pos: Position) -> Expression {
    Expression::Assignment {
        assignee,
        value,
        local: true,
        next: Box::new(next),
        pos,
    }
}

fn callable(
    body: Expression,
    param: &Identifier,
    comp_cont: Option<Identifier>,
    delim_cont: Option<Identifier>,
    pos: Position,
) -> Value {
    Value::Callable(Callable {
        body: Box::new(body),
        left_args: Vec::new(),
        right_args: vec![InArgument::required(param.clone())],
        comp_cont,
        delim_cont,
        pos,
    })
}

/// CPS transformation context. Owns the fresh-name counter, so each
/// compilation uses its own transformer.
pub struct CPSTransformer {
    names: NameGen,
}

impl Default for CPSTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl CPSTransformer {
    pub fn new() -> Self {
        Self {
            names: NameGen::new("cps"),
        }
    }

    fn fresh(&mut self, pos: Position) -> Identifier {
        self.names.fresh(pos)
    }

    /// Transform a whole program and bind the continuations it starts with
    pub fn transform(mut self, program: ir::Program) -> TransformResult<Expression> {
        let (mut exp, comp_cont, delim_cont) =
            self.transform_body(program.expressions, program.lastval, program.pos)?;

        exp = self.define_reset(exp);
        exp = self.define_shift(exp);
        let origin = Position::default();
        exp = bind(delim_cont, var(&synthesized(HALT_CONT)), exp, origin);
        exp = bind(comp_cont, var(&synthesized(IDENTITY_CONT)), exp, origin);
        exp = self.define_identity_cont(exp);

        debug!("cps transform used {} fresh names", self.names.count());
        Ok(exp)
    }

    /// Transform one statement list. Returns the expression with the
    /// computation and delimited continuation parameters it expects.
    fn transform_body(
        &mut self,
        mut expressions: Vec<ir::Expression>,
        lastval: ir::Value,
        pos: Position,
    ) -> TransformResult<(Expression, Identifier, Identifier)> {
        let comp_cont = self.fresh(pos);
        let mut delim_cont = self.fresh(pos);

        let is_tail_call = matches!(
            (expressions.last(), lastval.as_variable()),
            (Some(ir::Expression::ReturnValue { assignee, .. }), Some(result)) if assignee == result
        );
        let mut exp = match expressions.pop() {
            Some(ir::Expression::ReturnValue {
                callee,
                left_args,
                right_args,
                pos,
                ..
            }) if is_tail_call => Expression::Call {
                callee: self.operand(callee)?,
                left_args: self.out_args(left_args)?,
                right_args: self.out_args(right_args)?,
                comp_cont: Some(var(&comp_cont)),
                delim_cont: Some(var(&delim_cont)),
                pos,
            },
            other => {
                expressions.extend(other);
                let value_pos = lastval.pos();
                Expression::Call {
                    callee: var(&comp_cont),
                    left_args: Vec::new(),
                    right_args: vec![OutArgument::Positional {
                        value: self.operand(lastval)?,
                        pos: value_pos,
                    }],
                    comp_cont: None,
                    delim_cont: Some(var(&delim_cont)),
                    pos,
                }
            }
        };

        for ir_exp in expressions.into_iter().rev() {
            exp = match ir_exp {
                ir::Expression::Assignment {
                    assignee,
                    value,
                    local,
                    pos,
                } => Expression::Assignment {
                    assignee,
                    value: self.transform_value(value)?,
                    local,
                    next: Box::new(exp),
                    pos,
                },
                ir::Expression::ObjectMutation {
                    object,
                    field,
                    value,
                    pos,
                } => Expression::ObjectMutation {
                    object: self.operand(object)?,
                    field,
                    value: self.transform_value(value)?,
                    next: Box::new(exp),
                    pos,
                },
                ir::Expression::ReturnValue {
                    assignee,
                    callee,
                    left_args,
                    right_args,
                    pos,
                } => {
                    let child = Value::Callable(Callable {
                        body: Box::new(exp),
                        left_args: Vec::new(),
                        right_args: vec![InArgument::Required {
                            name: assignee,
                            pos,
                        }],
                        comp_cont: None,
                        delim_cont: Some(delim_cont.clone()),
                        pos,
                    });
                    let child_sym = self.fresh(pos);
                    let new_delim = self.fresh(pos);
                    let call = Expression::Call {
                        callee: self.operand(callee)?,
                        left_args: self.out_args(left_args)?,
                        right_args: self.out_args(right_args)?,
                        comp_cont: Some(Value::Variable {
                            identifier: child_sym.clone(),
                            pos,
                        }),
                        delim_cont: Some(Value::Variable {
                            identifier: new_delim.clone(),
                            pos,
                        }),
                        pos,
                    };
                    delim_cont = new_delim;
                    bind(child_sym, child, call, pos)
                }
            };
        }

        // `cont` gives the body access to its undelimited continuation
        let exp_pos = exp.pos();
        let cont = Identifier::user(CONT, exp_pos);
        if exp.references(&cont) {
            let arg = self.fresh(exp_pos);
            let forward = call1(
                &comp_cont,
                &arg,
                Some(var(&comp_cont)),
                Some(var(&delim_cont)),
                exp_pos,
            );
            let wrapper = callable(forward, &arg, None, None, exp_pos);
            exp = bind(cont, wrapper, exp, exp_pos);
        }

        Ok((exp, comp_cont, delim_cont))
    }

    /// Functions become callables with their own continuation parameters;
    /// everything else is an operand
    fn transform_value(&mut self, value: ir::Value) -> TransformResult<Value> {
        let ir::Value::Function(function) = value else {
            return self.operand(value);
        };
        let (body, comp_cont, delim_cont) =
            self.transform_body(function.expressions, *function.lastval, function.pos)?;
        Ok(Value::Callable(Callable {
            body: Box::new(body),
            left_args: self.in_args(function.left_args)?,
            right_args: self.in_args(function.right_args)?,
            comp_cont: Some(comp_cont),
            delim_cont: Some(delim_cont),
            pos: function.pos,
        }))
    }

    /// Values in operand position are always named by the converter; a
    /// function literal here means the IR is malformed
    fn operand(&self, value: ir::Value) -> TransformResult<Value> {
        Ok(match value {
            ir::Value::Field { object, field, pos } => Value::Field {
                object: Box::new(self.operand(*object)?),
                field,
                pos,
            },
            ir::Value::Variable { identifier, pos } => Value::Variable { identifier, pos },
            ir::Value::Integer { value, pos } => Value::Integer { value, pos },
            ir::Value::Float { value, pos } => Value::Float { value, pos },
            ir::Value::String {
                byte_oriented,
                value,
                pos,
            } => Value::String {
                byte_oriented,
                value,
                pos,
            },
            ir::Value::Function(function) => {
                return Err(TransformationError::new(
                    function.pos,
                    "function value in operand position",
                ))
            }
        })
    }

    fn out_args(&self, args: Vec<ir::OutArgument>) -> TransformResult<Vec<OutArgument>> {
        args.into_iter()
            .map(|arg| {
                Ok(match arg {
                    ir::OutArgument::Positional { value, pos } => OutArgument::Positional {
                        value: self.operand(value)?,
                        pos,
                    },
                    ir::OutArgument::Named { name, value, pos } => OutArgument::Named {
                        name,
                        value: self.operand(value)?,
                        pos,
                    },
                    ir::OutArgument::Splat { value, pos } => OutArgument::Splat {
                        value: self.operand(value)?,
                        pos,
                    },
                    ir::OutArgument::Keyword { value, pos } => OutArgument::Keyword {
                        value: self.operand(value)?,
                        pos,
                    },
                })
            })
            .collect()
    }

    fn in_args(&self, args: Vec<ir::InArgument>) -> TransformResult<Vec<InArgument>> {
        args.into_iter()
            .map(|arg| {
                Ok(match arg {
                    ir::InArgument::Required { name, pos } => InArgument::Required { name, pos },
                    ir::InArgument::Default { name, value, pos } => InArgument::Default {
                        name,
                        value: self.operand(value)?,
                        pos,
                    },
                    ir::InArgument::Splat { name, pos } => InArgument::Splat { name, pos },
                    ir::InArgument::Keyword { name, pos } => InArgument::Keyword { name, pos },
                })
            })
            .collect()
    }

    // ========================================================================
    // Program prelude
    // ========================================================================

    fn define_identity_cont(&mut self, exp: Expression) -> Expression {
        let origin = Position::default();
        let val = self.fresh(origin);
        let delim = self.fresh(origin);
        let body = call1(&delim, &val, None, None, origin);
        let identity = callable(body, &val, None, Some(delim), origin);
        bind(synthesized(IDENTITY_CONT), identity, exp, origin)
    }

    fn define_reset(&mut self, exp: Expression) -> Expression {
        let reset = builtin(RESET);
        if !exp.references(&reset) {
            return exp;
        }
        let origin = Position::default();
        let lam = self.fresh(origin);
        let ec = self.fresh(origin);
        let mc = self.fresh(origin);
        let vd = self.fresh(origin);
        let reset_delim = self.fresh(origin);

        let delim_body = call1(&ec, &vd, None, Some(var(&mc)), origin);
        let delim_cont = callable(delim_body, &vd, None, None, origin);
        let body = Expression::Call {
            callee: var(&lam),
            left_args: Vec::new(),
            right_args: Vec::new(),
            comp_cont: Some(var(&synthesized(IDENTITY_CONT))),
            delim_cont: Some(var(&reset_delim)),
            pos: origin,
        };
        let body = bind(reset_delim, delim_cont, body, origin);
        bind(reset, callable(body, &lam, Some(ec), Some(mc), origin), exp, origin)
    }

    fn define_shift(&mut self, exp: Expression) -> Expression {
        let shift = builtin(SHIFT);
        if !exp.references(&shift) {
            return exp;
        }
        let origin = Position::default();
        let lam = self.fresh(origin);
        let ec = self.fresh(origin);
        let mc = self.fresh(origin);
        let x = self.fresh(origin);
        let vc = self.fresh(origin);
        let vm = self.fresh(origin);
        let vd = self.fresh(origin);
        let reset_delim = self.fresh(origin);
        let user_sym = self.fresh(origin);

        // the continuation handed to the user function: resumes the captured
        // computation under a fresh delimiter
        let delim_body = call1(&vc, &vd, None, Some(var(&vm)), origin);
        let delim_cont = callable(delim_body, &vd, None, None, origin);
        let user_body = call1(&ec, &x, None, Some(var(&reset_delim)), origin);
        let user_body = bind(reset_delim, delim_cont, user_body, origin);
        let user_cont = callable(user_body, &x, Some(vc), Some(vm), origin);

        let body = call1(
            &lam,
            &user_sym,
            Some(var(&synthesized(IDENTITY_CONT))),
            Some(var(&mc)),
            origin,
        );
        let body = bind(user_sym, user_cont, body, origin);
        bind(shift, callable(body, &lam, Some(ec), Some(mc), origin), exp, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::convert::convert;
    use crate::parser::parse;

    fn transform_source(source: &str) -> Expression {
        transform(convert(parse(source).unwrap()).unwrap()).unwrap()
    }

    fn mentions(exp: &Expression, name: &str) -> bool {
        exp.pretty(0).contains(name)
    }

    #[test]
    fn test_prelude_without_control_operators() {
        let exp = transform_source("f.");
        let Expression::Assignment { assignee, .. } = &exp else {
            panic!("expected prelude binding, got {}", exp);
        };
        assert_eq!(assignee, &synthesized(IDENTITY_CONT));
        assert!(!exp.references(&builtin(RESET)));
        assert!(!mentions(&exp, "reset"));
        assert!(!mentions(&exp, "shift"));
    }

    #[test]
    fn test_reset_defined_on_demand() {
        let exp = transform_source("reset {|| 1}");
        assert!(mentions(&exp, "reset = {|"));
        assert!(!mentions(&exp, "shift = {|"));
    }

    #[test]
    fn test_function_literal_operand_is_rejected() {
        let pos = Position::new(1, 1);
        let program = ir::Program {
            expressions: vec![],
            lastval: ir::Value::Function(ir::Function {
                expressions: vec![],
                lastval: Box::new(ir::Value::null(pos)),
                left_args: vec![],
                right_args: vec![],
                pos,
            }),
            pos,
        };
        let err = transform(program).unwrap_err();
        assert_eq!(err.message, "function value in operand position");
    }
}
