//! Tree-walking evaluator.
//!
//! Statements execute directly against a closure and a context; there is no
//! bytecode stage. Every node evaluates to an [`ExecResult`] so that a
//! `return` threads unambiguously through `Compound` sequences and stops at
//! the `MethodBody` wrapper of the invoked method.

use std::io;

use crate::ast::{BinaryOperator, Comparator, Statement};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::runtime::{
    self, ADD_METHOD, Closure, Context, Object, ObjectHolder, RuntimeError, render,
};

/// Control-flow marker produced by every executed node.
#[derive(Debug)]
pub enum ExecResult {
    /// The node evaluated to a value (possibly the empty holder).
    Value(ObjectHolder),
    /// A `return` is travelling up to the nearest enclosing method body.
    Return(ObjectHolder),
}

impl ExecResult {
    pub fn into_value(self) -> ObjectHolder {
        match self {
            Self::Value(holder) | Self::Return(holder) => holder,
        }
    }
}

impl Statement {
    /// Executes the node against `closure` and `context`.
    pub fn execute(
        &self,
        closure: &mut Closure,
        context: &mut Context<'_>,
    ) -> Result<ExecResult, RuntimeError> {
        match self {
            Statement::Number(value) => Ok(ExecResult::Value(ObjectHolder::own(Object::Number(
                *value,
            )))),
            Statement::Str(value) => Ok(ExecResult::Value(ObjectHolder::own(Object::Str(
                value.clone(),
            )))),
            Statement::Bool(value) => {
                Ok(ExecResult::Value(ObjectHolder::own(Object::Bool(*value))))
            }
            Statement::None => Ok(ExecResult::Value(ObjectHolder::none())),

            Statement::Assignment { name, rhs } => {
                let value = rhs.evaluate(closure, context)?;
                closure.insert(name.clone(), value.share());
                Ok(ExecResult::Value(value))
            }

            Statement::VariableValue { dotted_ids } => {
                let Some((first, rest)) = dotted_ids.split_first() else {
                    return Err(RuntimeError::NameError {
                        name: String::new(),
                    });
                };
                let mut value = closure
                    .get(first)
                    .map(ObjectHolder::share)
                    .ok_or_else(|| RuntimeError::NameError {
                        name: first.clone(),
                    })?;
                for id in rest {
                    value = value.get_field(id).ok_or_else(|| RuntimeError::NameError {
                        name: id.clone(),
                    })?;
                }
                Ok(ExecResult::Value(value))
            }

            Statement::Print { args } => {
                let mut first = true;
                for arg in args {
                    let value = arg.evaluate(closure, context)?;
                    let text = render(&value, context)?;
                    if !first {
                        write_output(context, " ")?;
                    }
                    first = false;
                    write_output(context, &text)?;
                }
                write_output(context, "\n")?;
                Ok(ExecResult::Value(ObjectHolder::none()))
            }

            Statement::MethodCall {
                object,
                method,
                args,
            } => {
                let receiver = object.evaluate(closure, context)?;
                let mut actual_args = Vec::with_capacity(args.len());
                for arg in args {
                    actual_args.push(arg.evaluate(closure, context)?);
                }
                runtime::call_method(&receiver, method, actual_args, context)
                    .map(ExecResult::Value)
            }

            Statement::Stringify { argument } => {
                let value = argument.evaluate(closure, context)?;
                let text = render(&value, context)?;
                Ok(ExecResult::Value(ObjectHolder::own(Object::Str(text))))
            }

            Statement::BinaryOp { op, lhs, rhs } => {
                let left = lhs.evaluate(closure, context)?;
                let right = rhs.evaluate(closure, context)?;
                apply_binary_op(*op, &left, &right, context).map(ExecResult::Value)
            }

            Statement::Compound { statements } => {
                for statement in statements {
                    if let ExecResult::Return(value) = statement.execute(closure, context)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Value(ObjectHolder::none()))
            }

            Statement::Return { statement } => {
                let value = statement.evaluate(closure, context)?;
                Ok(ExecResult::Return(value))
            }

            Statement::ClassDefinition { class } => {
                let holder = ObjectHolder::own(Object::Class(class.clone()));
                closure.insert(class.name().to_string(), holder.share());
                Ok(ExecResult::Value(holder))
            }

            Statement::FieldAssignment {
                object,
                field_name,
                rhs,
            } => {
                let target = object.evaluate(closure, context)?;
                let value = rhs.evaluate(closure, context)?;
                if !target.set_field(field_name, value.share()) {
                    return Err(RuntimeError::TypeMismatch {
                        operation: "field assignment",
                        lhs: target.type_name(),
                        rhs: value.type_name(),
                    });
                }
                Ok(ExecResult::Value(value))
            }

            Statement::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                if condition.evaluate(closure, context)?.is_true() {
                    if_body.execute(closure, context)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, context)
                } else {
                    Ok(ExecResult::Value(ObjectHolder::none()))
                }
            }

            Statement::Or { lhs, rhs } => {
                let value = lhs.evaluate(closure, context)?.is_true()
                    || rhs.evaluate(closure, context)?.is_true();
                Ok(ExecResult::Value(ObjectHolder::own(Object::Bool(value))))
            }

            Statement::And { lhs, rhs } => {
                let value = lhs.evaluate(closure, context)?.is_true()
                    && rhs.evaluate(closure, context)?.is_true();
                Ok(ExecResult::Value(ObjectHolder::own(Object::Bool(value))))
            }

            Statement::Not { argument } => {
                let value = !argument.evaluate(closure, context)?.is_true();
                Ok(ExecResult::Value(ObjectHolder::own(Object::Bool(value))))
            }

            Statement::Comparison { cmp, lhs, rhs } => {
                let left = lhs.evaluate(closure, context)?;
                let right = rhs.evaluate(closure, context)?;
                let result = match cmp {
                    Comparator::Equal => runtime::equal(&left, &right, context)?,
                    Comparator::NotEqual => runtime::not_equal(&left, &right, context)?,
                    Comparator::Less => runtime::less(&left, &right, context)?,
                    Comparator::Greater => runtime::greater(&left, &right, context)?,
                    Comparator::LessOrEqual => runtime::less_or_equal(&left, &right, context)?,
                    Comparator::GreaterOrEqual => {
                        runtime::greater_or_equal(&left, &right, context)?
                    }
                };
                Ok(ExecResult::Value(ObjectHolder::own(Object::Bool(result))))
            }

            Statement::NewInstance {
                class_name,
                class,
                args,
            } => {
                let class = class.upgrade().ok_or_else(|| RuntimeError::NameError {
                    name: class_name.clone(),
                })?;
                let mut actual_args = Vec::with_capacity(args.len());
                for arg in args {
                    actual_args.push(arg.evaluate(closure, context)?);
                }
                runtime::new_instance(&class, actual_args, context).map(ExecResult::Value)
            }

            Statement::MethodBody { body } => match body.execute(closure, context)? {
                ExecResult::Return(value) => Ok(ExecResult::Value(value)),
                ExecResult::Value(_) => Ok(ExecResult::Value(ObjectHolder::none())),
            },
        }
    }

    /// Executes the node and collapses the control-flow marker to the plain
    /// value. Expression positions never see a travelling `return`.
    pub fn evaluate(
        &self,
        closure: &mut Closure,
        context: &mut Context<'_>,
    ) -> Result<ObjectHolder, RuntimeError> {
        Ok(self.execute(closure, context)?.into_value())
    }
}

fn apply_binary_op(
    op: BinaryOperator,
    left: &ObjectHolder,
    right: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<ObjectHolder, RuntimeError> {
    if let (Some(lhs), Some(rhs)) = (left.as_number(), right.as_number()) {
        let value = match op {
            BinaryOperator::Add => lhs.wrapping_add(rhs),
            BinaryOperator::Sub => lhs.wrapping_sub(rhs),
            BinaryOperator::Mult => lhs.wrapping_mul(rhs),
            BinaryOperator::Div => {
                if rhs == 0 {
                    return Err(RuntimeError::ZeroDivision);
                }
                lhs.wrapping_div(rhs)
            }
        };
        return Ok(ObjectHolder::own(Object::Number(value)));
    }

    if op == BinaryOperator::Add {
        if let (Some(lhs), Some(rhs)) = (left.as_str(), right.as_str()) {
            return Ok(ObjectHolder::own(Object::Str(lhs + &rhs)));
        }
        if left.has_method(ADD_METHOD, 1) {
            return runtime::call_method(left, ADD_METHOD, vec![right.share()], context);
        }
    }

    Err(RuntimeError::TypeMismatch {
        operation: op.symbol(),
        lhs: left.type_name(),
        rhs: right.type_name(),
    })
}

fn write_output(context: &mut Context<'_>, text: &str) -> Result<(), RuntimeError> {
    context
        .output_stream()
        .write_all(text.as_bytes())
        .map_err(|error| RuntimeError::OutputStream {
            message: error.to_string(),
        })
}

/// Executes a parsed program against a fresh top-level closure.
pub fn run(program: &Statement, output: &mut dyn io::Write) -> Result<(), RuntimeError> {
    let mut closure = Closure::new();
    let mut context = Context::new(output);
    program.execute(&mut closure, &mut context)?;
    Ok(())
}

/// Full pipeline: tokenize, parse, execute.
pub fn run_source(source: &str, output: &mut dyn io::Write) -> anyhow::Result<()> {
    let lexer = Lexer::new(source)?;
    let program = Parser::new(lexer).parse_program()?;
    run(&program, output)?;
    Ok(())
}
