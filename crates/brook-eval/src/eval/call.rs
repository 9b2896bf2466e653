use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use brook_core::ast::{Parameter, Stmt};
use brook_core::{
    Coroutine, CoroutineBody, EvalError, Function, Instance, Param, Result, Scope, ScopeKind,
    Value,
};

use super::Evaluator;

impl Evaluator {
    pub(crate) async fn call_function(
        &self,
        callee: Value,
        args: Vec<Value>,
        kwargs: HashMap<String, Value>,
    ) -> Result<Value> {
        match callee {
            Value::Function(function) => self.call_script_function(function, args, kwargs).await,

            Value::BoundMethod(method) => {
                let mut bound_args = Vec::with_capacity(args.len() + 1);
                bound_args.push(method.receiver.clone());
                bound_args.extend(args);
                self.call_script_function(method.function.clone(), bound_args, kwargs)
                    .await
            }

            Value::NativeFunction(native) => {
                trace!(function = %native.name, "calling native function");
                self.guarded(native.call(args, kwargs)).await
            }

            Value::Class(class) => self.instantiate(class, args, kwargs).await,

            other => Err(EvalError::NotCallable {
                type_name: other.type_name().into(),
            }),
        }
    }

    /// Calling a script function. Arguments bind into a fresh call scope
    /// either way; a synchronous function runs its body now, an async one
    /// packages body and scope into a coroutine for a later `await`.
    pub(crate) async fn call_script_function(
        &self,
        function: Arc<Function>,
        args: Vec<Value>,
        kwargs: HashMap<String, Value>,
    ) -> Result<Value> {
        trace!(function = %function.name, is_async = function.is_async, "calling function");
        let call_scope = Scope::new_child(function.closure.clone(), ScopeKind::Function);
        bind_parameters(&function, args, kwargs, &call_scope).await?;

        if function.is_async {
            Ok(Value::Coroutine(Arc::new(Coroutine::script(
                function, call_scope,
            ))))
        } else {
            self.run_function_body(&function, call_scope).await
        }
    }

    async fn run_function_body(&self, function: &Function, scope: Arc<Scope>) -> Result<Value> {
        match self.eval_block(&function.body, scope).await {
            Ok(_) => Ok(Value::None),
            Err(EvalError::Return { value }) => Ok(value.as_ref().clone()),
            Err(e) => Err(e),
        }
    }

    /// Drives an awaitable to completion. Anything that is not a coroutine
    /// fails here; awaiting does not coerce plain values.
    pub(crate) async fn await_value(&self, value: Value) -> Result<Value> {
        let coroutine = match value {
            Value::Coroutine(c) => c,
            other => {
                return Err(EvalError::TypeError {
                    expected: "awaitable".into(),
                    actual: other.type_name().into(),
                })
            }
        };

        match coroutine.take().await? {
            CoroutineBody::Script { function, scope } => {
                self.run_function_body(&function, scope).await
            }
            CoroutineBody::Native(fut) => self.guarded(fut).await,
        }
    }

    /// Calling a class constructs an instance. A class-table `__init__`
    /// runs synchronously against the new instance; a constructor that
    /// must suspend belongs in a native factory instead.
    async fn instantiate(
        &self,
        class: Arc<brook_core::ClassObject>,
        args: Vec<Value>,
        kwargs: HashMap<String, Value>,
    ) -> Result<Value> {
        let instance = Value::Instance(Arc::new(Instance::new(class.clone())));

        if let Some(Value::Function(init)) = class.attrs.get("__init__") {
            if init.is_async {
                return Err(EvalError::TypeError {
                    expected: "synchronous __init__".into(),
                    actual: "async function".into(),
                });
            }
            let mut bound_args = Vec::with_capacity(args.len() + 1);
            bound_args.push(instance.clone());
            bound_args.extend(args);
            self.call_script_function(init.clone(), bound_args, kwargs)
                .await?;
        } else if !args.is_empty() || !kwargs.is_empty() {
            return Err(EvalError::ArgumentError {
                message: format!("{}() takes no arguments", class.name),
            });
        }

        Ok(instance)
    }

    /// Turns a definition into a closure value. Defaults are evaluated
    /// once, here, in the defining scope.
    pub(crate) async fn build_function(
        &self,
        name: &str,
        params: &[Parameter],
        body: &Arc<[Stmt]>,
        is_async: bool,
        scope: Arc<Scope>,
    ) -> Result<Value> {
        let mut resolved = Vec::with_capacity(params.len());
        for param in params {
            let default = match &param.default {
                Some(expr) => Some(self.eval_expr(expr, scope.clone()).await?),
                None => None,
            };
            resolved.push(Param {
                name: param.name.clone(),
                default,
            });
        }

        Ok(Value::Function(Arc::new(Function {
            name: name.to_string(),
            params: resolved,
            body: body.clone(),
            closure: scope,
            is_async,
        })))
    }
}

/// Positional arguments first, then keyword arguments, then defaults.
/// Every parameter must end up bound exactly once.
async fn bind_parameters(
    function: &Function,
    args: Vec<Value>,
    mut kwargs: HashMap<String, Value>,
    scope: &Arc<Scope>,
) -> Result<()> {
    if args.len() > function.params.len() {
        return Err(EvalError::ArgumentError {
            message: format!(
                "{}() takes {} arguments but {} were given",
                function.name,
                function.params.len(),
                args.len()
            ),
        });
    }

    let mut args = args.into_iter();
    for param in &function.params {
        if let Some(value) = args.next() {
            if kwargs.contains_key(&param.name) {
                return Err(EvalError::ArgumentError {
                    message: format!(
                        "{}() got multiple values for argument '{}'",
                        function.name, param.name
                    ),
                });
            }
            scope.set(&param.name, value).await;
        } else if let Some(value) = kwargs.remove(&param.name) {
            scope.set(&param.name, value).await;
        } else if let Some(default) = &param.default {
            scope.set(&param.name, default.clone()).await;
        } else {
            return Err(EvalError::ArgumentError {
                message: format!(
                    "{}() missing required argument '{}'",
                    function.name, param.name
                ),
            });
        }
    }

    if let Some(unexpected) = kwargs.keys().next() {
        return Err(EvalError::ArgumentError {
            message: format!(
                "{}() got an unexpected keyword argument '{unexpected}'",
                function.name
            ),
        });
    }
    Ok(())
}
