mod call;
mod expr;
mod ops;
mod protocols;
mod stmt;

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use brook_core::ast::Stmt;
use brook_core::{EvalError, Result, Scope, Value};

use crate::resolver::{ModuleResolver, NoModules};

/// The evaluation driver. Holds the collaborators the statement and
/// expression evaluators consult: the import resolver and the cancellation
/// token. All per-run state lives in the scope chain and on the async call
/// stack, so one `Evaluator` can be reused across runs.
pub struct Evaluator {
    pub(crate) resolver: Arc<dyn ModuleResolver>,
    pub(crate) cancel: CancellationToken,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(NoModules),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs a program to completion. Returns the value of the last
    /// statement when it was an expression statement, `Value::None`
    /// otherwise. Control-flow statements that escape the top level are
    /// reported as argument errors rather than leaking internal variants.
    pub async fn eval(&self, program: &[Stmt], scope: Arc<Scope>) -> Result<Value> {
        debug!(statements = program.len(), "evaluation started");
        let result = self.eval_block(program, scope).await;
        match &result {
            Ok(value) => debug!(result = %value.repr(), "evaluation finished"),
            Err(err) => debug!(error = %err, "evaluation failed"),
        }
        result.map_err(|e| match e {
            EvalError::Break => EvalError::ArgumentError {
                message: "'break' outside loop".into(),
            },
            EvalError::Continue => EvalError::ArgumentError {
                message: "'continue' outside loop".into(),
            },
            EvalError::Return { .. } => EvalError::ArgumentError {
                message: "'return' outside function".into(),
            },
            other => other,
        })
    }

    /// Cancellation check, consulted at statement boundaries and before
    /// every suspension point.
    pub(crate) fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(EvalError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Races a suspension point against cancellation, so a long-pending
    /// await or iterator advance does not outlive a triggered token.
    pub(crate) async fn guarded<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(EvalError::Cancelled),
            result = fut => result,
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
