use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{EvalError, Result};

use super::functions::NativeFuture;
use super::Value;

/// Which script-level construct a capability serves. A value exposing only
/// the `Sync` variant of a protocol cannot be used from the `Async`
/// construct, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Sync,
    Async,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Sync => "synchronous",
            Protocol::Async => "asynchronous",
        }
    }
}

pub type ReleaseFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type AcquireFn = Arc<dyn Fn() -> NativeFuture + Send + Sync>;
type ReleaseFn = Arc<dyn Fn(Option<EvalError>) -> ReleaseFuture + Send + Sync>;

/// A resource with acquire/release hooks, the value form a `with` /
/// `async with` item must evaluate to. The protocol tag records which of
/// the two constructs the manager implements; the hooks themselves are
/// host futures either way. Release observes the body's error (if any) but
/// cannot suppress it.
pub struct ContextManager {
    name: String,
    protocol: Protocol,
    acquire: AcquireFn,
    release: ReleaseFn,
}

impl ContextManager {
    pub fn new<A, AF, R, RF>(
        name: impl Into<String>,
        protocol: Protocol,
        acquire: A,
        release: R,
    ) -> Self
    where
        A: Fn() -> AF + Send + Sync + 'static,
        AF: Future<Output = Result<Value>> + Send + 'static,
        R: Fn(Option<EvalError>) -> RF + Send + Sync + 'static,
        RF: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            protocol,
            acquire: Arc::new(move || Box::pin(acquire())),
            release: Arc::new(move |err| Box::pin(release(err))),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn acquire(&self) -> Result<Value> {
        (self.acquire)().await
    }

    pub async fn release(&self, body_error: Option<&EvalError>) -> Result<()> {
        (self.release)(body_error.cloned()).await
    }
}

impl fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} context manager {}>", self.protocol.as_str(), self.name)
    }
}
