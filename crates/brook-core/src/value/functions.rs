use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::ast::Stmt;
use crate::error::Result;
use crate::scope::Scope;

use super::Value;

pub type NativeFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;
pub type NativeFn = Arc<dyn Fn(Vec<Value>, HashMap<String, Value>) -> NativeFuture + Send + Sync>;

/// Runtime parameter of a script function. Defaults were evaluated when the
/// definition executed, in the defining scope.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// A closure: the unexecuted body of a `def`/`async def` plus a shared
/// reference to its defining scope. Every invocation chains a fresh call
/// scope onto `closure`, so free-variable mutations are visible across
/// calls.
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Arc<[Stmt]>,
    pub closure: Arc<Scope>,
    pub is_async: bool,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("is_async", &self.is_async)
            .finish()
    }
}

/// A function retrieved through an instance attribute, with the receiver
/// already bound as the first argument.
pub struct BoundMethod {
    pub receiver: Value,
    pub function: Arc<Function>,
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<bound method {}>", self.function.name)
    }
}

pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish()
    }
}

impl NativeFunction {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>, HashMap<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        NativeFunction {
            name: name.into(),
            func: Arc::new(move |args, kwargs| Box::pin(f(args, kwargs))),
        }
    }

    pub fn new_with_state<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>, HashMap<String, Value>) -> NativeFuture + Send + Sync + 'static,
    {
        NativeFunction {
            name: name.into(),
            func: Arc::new(f),
        }
    }

    pub async fn call(&self, args: Vec<Value>, kwargs: HashMap<String, Value>) -> Result<Value> {
        (self.func)(args, kwargs).await
    }
}
