use std::sync::Arc;

use tracing::trace;

use brook_core::ast::{ImportName, Stmt, Target, WithItem};
use brook_core::{
    ClassObject, ContextManager, EvalError, Protocol, Result, Scope, ScopeKind, Value,
};

use super::protocols;
use super::{ops, Evaluator};

impl Evaluator {
    /// Executes statements in order. Side effects of statement N are fully
    /// committed to the scope before statement N+1 begins. Returns the last
    /// statement's value (`Value::None` for non-expression statements).
    #[async_recursion::async_recursion]
    pub async fn eval_block(&self, stmts: &[Stmt], scope: Arc<Scope>) -> Result<Value> {
        let mut result = Value::None;
        for stmt in stmts {
            result = self.eval_stmt(stmt, scope.clone()).await?;
        }
        Ok(result)
    }

    #[async_recursion::async_recursion]
    pub(crate) async fn eval_stmt(&self, stmt: &Stmt, scope: Arc<Scope>) -> Result<Value> {
        self.checkpoint()?;

        match stmt {
            Stmt::Expr(expr) => self.eval_expr(expr, scope).await,

            Stmt::Assign { targets, value } => {
                let value = self.eval_expr(value, scope.clone()).await?;
                for target in targets {
                    self.assign_target(target, value.clone(), scope.clone()).await?;
                }
                Ok(Value::None)
            }

            // The place resolves once; side effects in the target's
            // container or index expressions run once for the read and
            // the write together.
            Stmt::AugAssign { target, op, value } => {
                let place = self.resolve_place(target, scope.clone()).await?;
                let current = self.read_place(&place, &scope).await?;
                let rhs = self.eval_expr(value, scope.clone()).await?;
                let combined = ops::eval_binary_op(current, *op, rhs).await?;
                self.write_place(place, combined, &scope).await?;
                Ok(Value::None)
            }

            // A bare annotation binds nothing. Only a class namespace
            // tracks annotations; elsewhere the statement is a no-op
            // unless it carries a value.
            Stmt::AnnAssign {
                name,
                annotation,
                value,
            } => {
                if scope.kind() == ScopeKind::Class {
                    let annotation = self.eval_expr(annotation, scope.clone()).await?;
                    scope.annotate(name, annotation).await;
                }
                if let Some(value) = value {
                    let value = self.eval_expr(value, scope.clone()).await?;
                    scope.set(name, value).await;
                }
                Ok(Value::None)
            }

            Stmt::Delete(targets) => {
                for target in targets {
                    self.delete_target(target, scope.clone()).await?;
                }
                Ok(Value::None)
            }

            Stmt::If { cond, then, orelse } => {
                let cond = self.eval_expr(cond, scope.clone()).await?;
                if cond.is_truthy().await {
                    self.eval_block(then, scope).await?;
                } else {
                    self.eval_block(orelse, scope).await?;
                }
                Ok(Value::None)
            }

            Stmt::While { cond, body } => {
                loop {
                    let cond = self.eval_expr(cond, scope.clone()).await?;
                    if !cond.is_truthy().await {
                        break;
                    }
                    match self.eval_block(body, scope.clone()).await {
                        Err(EvalError::Break) => break,
                        Err(EvalError::Continue) => continue,
                        Err(e) => return Err(e),
                        Ok(_) => {}
                    }
                }
                Ok(Value::None)
            }

            Stmt::For {
                target,
                iter,
                body,
                is_async,
            } => self.eval_for(target, iter, body, *is_async, scope).await,

            Stmt::With {
                items,
                body,
                is_async,
            } => self.eval_with(items, body, *is_async, scope).await,

            Stmt::FunctionDef {
                name,
                params,
                body,
                is_async,
            } => {
                let func = self
                    .build_function(name, params, body, *is_async, scope.clone())
                    .await?;
                scope.set(name, func).await;
                Ok(Value::None)
            }

            Stmt::ClassDef { name, body } => self.eval_class(name, body, scope).await,

            Stmt::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval_expr(e, scope).await?,
                    None => Value::None,
                };
                Err(EvalError::Return {
                    value: Arc::new(value),
                })
            }

            Stmt::Raise(expr) => {
                let value = self.eval_expr(expr, scope).await?;
                Err(EvalError::Raised {
                    value: Arc::new(value),
                })
            }

            Stmt::Import(names) => {
                for ImportName { name, alias } in names {
                    trace!(module = %name, "resolving import");
                    let module = self.guarded(self.resolver.resolve(name)).await?;
                    let bound = alias.as_deref().unwrap_or(name);
                    scope.set(bound, module).await;
                }
                Ok(Value::None)
            }

            Stmt::ImportFrom { module, names } => {
                trace!(module = %module, "resolving import");
                let module_value = self.guarded(self.resolver.resolve(module)).await?;
                for ImportName { name, alias } in names {
                    let value = self
                        .eval_attribute(&module_value, name)
                        .await
                        .map_err(|_| EvalError::ImportError {
                            message: format!("cannot import '{name}' from '{module}'"),
                        })?;
                    let bound = alias.as_deref().unwrap_or(name);
                    scope.set(bound, value).await;
                }
                Ok(Value::None)
            }

            Stmt::Pass => Ok(Value::None),
            Stmt::Break => Err(EvalError::Break),
            Stmt::Continue => Err(EvalError::Continue),
        }
    }

    /// `for` and `async for`. The body runs in the enclosing scope (loops
    /// introduce no scope of their own), so bindings made inside a
    /// top-level loop are visible in the caller's scope. The body may
    /// suspend regardless of which protocol produced the element.
    async fn eval_for(
        &self,
        target: &Target,
        iter: &brook_core::ast::Expr,
        body: &[Stmt],
        is_async: bool,
        scope: Arc<Scope>,
    ) -> Result<Value> {
        let iterable = self.eval_expr(iter, scope.clone()).await?;
        let protocol = if is_async {
            Protocol::Async
        } else {
            Protocol::Sync
        };
        let mut elements = protocols::iterate(&iterable, protocol).await?;

        loop {
            self.checkpoint()?;
            let item = match self.guarded(elements.next()).await? {
                Some(item) => item,
                None => break,
            };
            self.assign_target(target, item, scope.clone()).await?;

            match self.eval_block(body, scope.clone()).await {
                Err(EvalError::Break) => break,
                Err(EvalError::Continue) => continue,
                Err(e) => return Err(e),
                Ok(_) => {}
            }
        }
        Ok(Value::None)
    }

    /// `with` and `async with`. Resources are acquired left to right and
    /// pushed onto a pending stack; on exit, success or failure, they are
    /// released in reverse order. A failure during acquisition or target
    /// binding releases what was already acquired before propagating.
    async fn eval_with(
        &self,
        items: &[WithItem],
        body: &[Stmt],
        is_async: bool,
        scope: Arc<Scope>,
    ) -> Result<Value> {
        let protocol = if is_async {
            Protocol::Async
        } else {
            Protocol::Sync
        };

        let mut pending: Vec<Arc<ContextManager>> = Vec::with_capacity(items.len());

        for item in items {
            let outcome: Result<()> = async {
                let value = self.eval_expr(&item.context, scope.clone()).await?;
                let manager = protocols::resource(&value, protocol)?;
                trace!(resource = %manager.name(), "acquiring resource");
                let acquired = self.guarded(manager.acquire()).await?;
                pending.push(manager);
                if let Some(target) = &item.target {
                    self.assign_target(target, acquired, scope.clone()).await?;
                }
                Ok(())
            }
            .await;

            if let Err(e) = outcome {
                return self.release_pending(pending, Err(e)).await.map(|_| Value::None);
            }
        }

        let body_result = self.eval_block(body, scope.clone()).await;
        self.release_pending(pending, body_result)
            .await
            .map(|_| Value::None)
    }

    /// Releases in LIFO order. A release failure supersedes the in-flight
    /// outcome but keeps it chained in `ReleaseError::body`. Release hooks
    /// observe genuine body errors, not control-flow unwinds.
    async fn release_pending(
        &self,
        pending: Vec<Arc<ContextManager>>,
        mut outcome: Result<Value>,
    ) -> Result<Value> {
        for manager in pending.into_iter().rev() {
            trace!(resource = %manager.name(), "releasing resource");
            let body_error = outcome
                .as_ref()
                .err()
                .filter(|e| !e.is_control_flow())
                .cloned();
            if let Err(release) = manager.release(body_error.as_ref()).await {
                outcome = Err(EvalError::ReleaseError {
                    release: Box::new(release),
                    body: outcome.err().map(Box::new),
                });
            }
        }
        outcome
    }

    /// Executes a class body against a fresh ephemeral namespace, then
    /// freezes the namespace into a class object bound in the enclosing
    /// scope. Assignments and annotations inside the body never leak out
    /// except through the constructed class.
    async fn eval_class(&self, name: &str, body: &[Stmt], scope: Arc<Scope>) -> Result<Value> {
        let namespace = Scope::new_child(scope.clone(), ScopeKind::Class);
        self.eval_block(body, namespace.clone()).await?;

        let class = ClassObject {
            name: name.to_string(),
            attrs: namespace.snapshot().await,
            annotations: namespace.annotations().await,
        };
        scope.set(name, Value::Class(Arc::new(class))).await;
        Ok(Value::None)
    }

    #[async_recursion::async_recursion]
    pub(crate) async fn assign_target(
        &self,
        target: &Target,
        value: Value,
        scope: Arc<Scope>,
    ) -> Result<()> {
        match target {
            Target::Name(name) => {
                scope.set(name, value).await;
                Ok(())
            }
            Target::Tuple(targets) => {
                let values = protocols::unpack(&value).await?;
                if values.len() != targets.len() {
                    return Err(EvalError::ValueError {
                        message: format!(
                            "cannot unpack {} values into {} targets",
                            values.len(),
                            targets.len()
                        ),
                    });
                }
                for (t, v) in targets.iter().zip(values) {
                    self.assign_target(t, v, scope.clone()).await?;
                }
                Ok(())
            }
            Target::Index { value: container, index } => {
                let container = self.eval_expr(container, scope.clone()).await?;
                let index = self.eval_expr(index, scope).await?;
                store_index(container, index, value).await
            }
            Target::Attribute { value: object, attr } => {
                let object = self.eval_expr(object, scope).await?;
                store_attribute(object, attr, value).await
            }
        }
    }

    async fn resolve_place(&self, target: &Target, scope: Arc<Scope>) -> Result<Place> {
        match target {
            Target::Name(name) => Ok(Place::Name(name.clone())),
            Target::Index { value, index } => Ok(Place::Index {
                container: self.eval_expr(value, scope.clone()).await?,
                index: self.eval_expr(index, scope).await?,
            }),
            Target::Attribute { value, attr } => Ok(Place::Attribute {
                object: self.eval_expr(value, scope).await?,
                attr: attr.clone(),
            }),
            Target::Tuple(_) => Err(EvalError::TypeError {
                expected: "single assignment target".into(),
                actual: "tuple".into(),
            }),
        }
    }

    async fn read_place(&self, place: &Place, scope: &Arc<Scope>) -> Result<Value> {
        match place {
            Place::Name(name) => {
                scope.get(name).await.ok_or_else(|| EvalError::NameError {
                    name: name.clone(),
                })
            }
            Place::Index { container, index } => {
                self.eval_index(container.clone(), index.clone()).await
            }
            Place::Attribute { object, attr } => self.eval_attribute(object, attr).await,
        }
    }

    async fn write_place(&self, place: Place, value: Value, scope: &Arc<Scope>) -> Result<()> {
        match place {
            Place::Name(name) => {
                scope.set(&name, value).await;
                Ok(())
            }
            Place::Index { container, index } => store_index(container, index, value).await,
            Place::Attribute { object, attr } => store_attribute(object, &attr, value).await,
        }
    }

    #[async_recursion::async_recursion]
    async fn delete_target(&self, target: &Target, scope: Arc<Scope>) -> Result<()> {
        match target {
            Target::Name(name) => scope.delete(name).await,
            Target::Index { value, index } => {
                let container = self.eval_expr(value, scope.clone()).await?;
                let index = self.eval_expr(index, scope).await?;
                match container {
                    Value::List(l) => {
                        let idx = index.as_int()?;
                        let mut items = l.write().await;
                        let len = items.len() as i64;
                        let actual = if idx < 0 { len + idx } else { idx };
                        if actual < 0 || actual >= len {
                            return Err(EvalError::IndexError {
                                message: format!("list index {idx} out of range"),
                            });
                        }
                        items.remove(actual as usize);
                        Ok(())
                    }
                    Value::Dict(d) => {
                        let key = index.as_dict_key()?;
                        if d.write().await.shift_remove(&key).is_some() {
                            Ok(())
                        } else {
                            Err(EvalError::KeyError { key })
                        }
                    }
                    other => Err(EvalError::TypeError {
                        expected: "list or dict".into(),
                        actual: other.type_name().into(),
                    }),
                }
            }
            Target::Attribute { value, attr } => {
                let object = self.eval_expr(value, scope).await?;
                match object {
                    Value::Instance(instance) => {
                        if instance.attrs.write().await.shift_remove(attr).is_some() {
                            Ok(())
                        } else {
                            Err(EvalError::AttributeError {
                                type_name: instance.class.name.clone(),
                                attr: attr.clone(),
                            })
                        }
                    }
                    other => Err(EvalError::TypeError {
                        expected: "object with deletable attributes".into(),
                        actual: other.type_name().into(),
                    }),
                }
            }
            Target::Tuple(targets) => {
                for t in targets {
                    self.delete_target(t, scope.clone()).await?;
                }
                Ok(())
            }
        }
    }
}

/// An assignment destination with its subexpressions already evaluated.
enum Place {
    Name(String),
    Index { container: Value, index: Value },
    Attribute { object: Value, attr: String },
}

async fn store_index(container: Value, index: Value, value: Value) -> Result<()> {
    match container {
        Value::List(l) => {
            let idx = index.as_int()?;
            let mut items = l.write().await;
            let len = items.len() as i64;
            let actual = if idx < 0 { len + idx } else { idx };
            if actual < 0 || actual >= len {
                return Err(EvalError::IndexError {
                    message: format!("list index {idx} out of range"),
                });
            }
            items[actual as usize] = value;
            Ok(())
        }
        Value::Dict(d) => {
            let key = index.as_dict_key()?;
            d.write().await.insert(key, value);
            Ok(())
        }
        other => Err(EvalError::TypeError {
            expected: "list or dict".into(),
            actual: other.type_name().into(),
        }),
    }
}

async fn store_attribute(object: Value, attr: &str, value: Value) -> Result<()> {
    match object {
        Value::Instance(instance) => {
            instance.set(attr, value).await;
            Ok(())
        }
        other => Err(EvalError::TypeError {
            expected: "object with assignable attributes".into(),
            actual: other.type_name().into(),
        }),
    }
}
