//! Removal of unused local bindings from a CPS expression

use log::info;

use crate::ast::Position;

use super::cps::{Expression, Identifier, Value};

/// A binding dropped by the cleanup pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedDefinition {
    pub name: Identifier,
    pub pos: Position,
}

/// Bottom-up cleanup pass. Remembers what it removed.
#[derive(Debug, Default)]
pub struct Cleanup {
    removed: Vec<RemovedDefinition>,
}

/// Clean an expression, discarding the report
pub fn cleanup(exp: Expression) -> Expression {
    Cleanup::new().run(exp)
}

impl Cleanup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings removed so far, innermost first
    pub fn removed(&self) -> &[RemovedDefinition] {
        &self.removed
    }

    pub fn run(&mut self, exp: Expression) -> Expression {
        match exp {
            Expression::Call { .. } | Expression::ObjectMutation { .. } => exp,
            Expression::Assignment {
                assignee,
                value,
                local,
                next,
                pos,
            } => {
                let value = match value {
                    Value::Callable(mut callable) => {
                        callable.body = Box::new(self.run(*callable.body));
                        Value::Callable(callable)
                    }
                    other => other,
                };
                let next = self.run(*next);
                if !local || next.references(&assignee) {
                    return Expression::Assignment {
                        assignee,
                        value,
                        local,
                        next: Box::new(next),
                        pos,
                    };
                }
                info!(
                    "unnecessary definition: {}, line {} col {}",
                    assignee, pos.line, pos.col
                );
                self.removed.push(RemovedDefinition {
                    name: assignee,
                    pos,
                });
                next
            }
        }
    }
}
