use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{EvalError, Result};
use crate::scope::Scope;

use super::functions::{Function, NativeFuture};
use super::Value;

/// What an awaitable does when driven. Script coroutines carry the bound
/// call scope so argument binding errors surface at the call site, not at
/// the await.
pub enum CoroutineBody {
    Script {
        function: Arc<Function>,
        scope: Arc<Scope>,
    },
    Native(NativeFuture),
}

/// A one-shot awaitable. Produced by calling an async function (script or
/// native); nothing runs until an `await` claims the body. Awaiting a
/// second time is a `ValueError`.
pub struct Coroutine {
    name: String,
    body: Mutex<Option<CoroutineBody>>,
}

impl Coroutine {
    pub fn script(function: Arc<Function>, scope: Arc<Scope>) -> Self {
        Self {
            name: function.name.clone(),
            body: Mutex::new(Some(CoroutineBody::Script { function, scope })),
        }
    }

    pub fn native<F>(name: impl Into<String>, fut: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            body: Mutex::new(Some(CoroutineBody::Native(Box::pin(fut)))),
        }
    }

    /// Claims the body for driving. The caller (the await machinery) is
    /// responsible for actually running it.
    pub async fn take(&self) -> Result<CoroutineBody> {
        self.body.lock().await.take().ok_or_else(|| EvalError::ValueError {
            message: format!("coroutine '{}' was already awaited", self.name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<coroutine {}>", self.name)
    }
}
