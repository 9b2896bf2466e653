use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use brook_core::ast::{BoolOp, Expr, Literal, UnaryOp};
use brook_core::{EvalError, Result, Scope, Value};

use super::{ops, Evaluator};

impl Evaluator {
    #[async_recursion::async_recursion]
    pub(crate) async fn eval_expr(&self, expr: &Expr, scope: Arc<Scope>) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(eval_literal(lit)),

            Expr::Name(name) => {
                scope.get(name).await.ok_or_else(|| EvalError::NameError {
                    name: name.clone(),
                })
            }

            Expr::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scope.clone()).await?);
                }
                Ok(Value::Tuple(Arc::new(values)))
            }

            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scope.clone()).await?);
                }
                Ok(Value::List(Arc::new(RwLock::new(values))))
            }

            Expr::Dict(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval_expr(key, scope.clone()).await?.as_dict_key()?;
                    let value = self.eval_expr(value, scope.clone()).await?;
                    map.insert(key, value);
                }
                Ok(Value::Dict(Arc::new(RwLock::new(map))))
            }

            Expr::Unary { op, operand } => {
                let value = self.eval_expr(operand, scope).await?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy().await)),
                    UnaryOp::Neg => ops::eval_unary_minus(value),
                    UnaryOp::Pos => ops::eval_unary_plus(value),
                }
            }

            Expr::Binary { left, op, right } => {
                let left = self.eval_expr(left, scope.clone()).await?;
                let right = self.eval_expr(right, scope).await?;
                ops::eval_binary_op(left, *op, right).await
            }

            // Short-circuit, yielding the deciding operand itself.
            Expr::Bool { left, op, right } => {
                let left = self.eval_expr(left, scope.clone()).await?;
                match op {
                    BoolOp::And => {
                        if left.is_truthy().await {
                            self.eval_expr(right, scope).await
                        } else {
                            Ok(left)
                        }
                    }
                    BoolOp::Or => {
                        if left.is_truthy().await {
                            Ok(left)
                        } else {
                            self.eval_expr(right, scope).await
                        }
                    }
                }
            }

            Expr::Compare { left, op, right } => {
                let left = self.eval_expr(left, scope.clone()).await?;
                let right = self.eval_expr(right, scope).await?;
                ops::eval_compare(left, *op, right).await
            }

            Expr::Call {
                callee,
                args,
                kwargs,
            } => {
                let callee = self.eval_expr(callee, scope.clone()).await?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg, scope.clone()).await?);
                }
                let mut kwarg_values = std::collections::HashMap::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    let value = self.eval_expr(value, scope.clone()).await?;
                    kwarg_values.insert(name.clone(), value);
                }
                self.call_function(callee, arg_values, kwarg_values).await
            }

            Expr::Attribute { value, attr } => {
                let value = self.eval_expr(value, scope).await?;
                self.eval_attribute(&value, attr).await
            }

            Expr::Index { value, index } => {
                let value = self.eval_expr(value, scope.clone()).await?;
                let index = self.eval_expr(index, scope).await?;
                self.eval_index(value, index).await
            }

            Expr::Conditional { cond, then, orelse } => {
                let cond = self.eval_expr(cond, scope.clone()).await?;
                if cond.is_truthy().await {
                    self.eval_expr(then, scope).await
                } else {
                    self.eval_expr(orelse, scope).await
                }
            }

            Expr::Await(operand) => {
                let value = self.eval_expr(operand, scope).await?;
                self.await_value(value).await
            }
        }
    }

    /// Attribute access. Instances check their own attribute table before
    /// the class table; a plain function found in the class table comes
    /// back bound to the receiver.
    pub(crate) async fn eval_attribute(&self, value: &Value, attr: &str) -> Result<Value> {
        if let Value::Instance(instance) = value {
            if let Some(found) = instance.get(attr).await {
                return Ok(match found {
                    Value::Function(function) => {
                        Value::BoundMethod(Arc::new(brook_core::BoundMethod {
                            receiver: value.clone(),
                            function,
                        }))
                    }
                    other => other,
                });
            }
            return Err(EvalError::AttributeError {
                type_name: instance.class.name.clone(),
                attr: attr.into(),
            });
        }

        // Dict attribute sugar: d.key reads the entry when no method of
        // that name exists.
        if let Some(found) = value.get_attr(attr) {
            return Ok(found);
        }
        if let Value::Dict(d) = value {
            if let Some(entry) = d.read().await.get(attr) {
                return Ok(entry.clone());
            }
        }
        Err(EvalError::AttributeError {
            type_name: value.type_name().into(),
            attr: attr.into(),
        })
    }

    pub(crate) async fn eval_index(&self, value: Value, index: Value) -> Result<Value> {
        match value {
            Value::List(l) => {
                let idx = index.as_int()?;
                let items = l.read().await;
                let len = items.len() as i64;
                let actual = if idx < 0 { len + idx } else { idx };
                items
                    .get(actual.max(-1) as usize)
                    .cloned()
                    .ok_or_else(|| EvalError::IndexError {
                        message: format!("list index {idx} out of range"),
                    })
            }
            Value::Tuple(t) => {
                let idx = index.as_int()?;
                let len = t.len() as i64;
                let actual = if idx < 0 { len + idx } else { idx };
                t.get(actual.max(-1) as usize)
                    .cloned()
                    .ok_or_else(|| EvalError::IndexError {
                        message: format!("tuple index {idx} out of range"),
                    })
            }
            Value::Str(s) => {
                let idx = index.as_int()?;
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let actual = if idx < 0 { len + idx } else { idx };
                if actual < 0 || actual >= len {
                    return Err(EvalError::IndexError {
                        message: format!("string index {idx} out of range"),
                    });
                }
                Ok(Value::Str(Arc::new(chars[actual as usize].to_string())))
            }
            Value::Dict(d) => {
                let key = index.as_dict_key()?;
                d.read()
                    .await
                    .get(&key)
                    .cloned()
                    .ok_or(EvalError::KeyError { key })
            }
            other => Err(EvalError::TypeError {
                expected: "indexable value".into(),
                actual: other.type_name().into(),
            }),
        }
    }
}

fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::None => Value::None,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(Arc::new(s.clone())),
    }
}
