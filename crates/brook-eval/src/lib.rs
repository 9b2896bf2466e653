//! The brook evaluator: executes a block of statements against a
//! caller-owned scope, suspension-capable at every point.
//!
//! The whole evaluator is an async call tree, so any expression or
//! statement may suspend (an `await` node, an async iterator advance, a
//! resource acquire/release) and resume exactly where it left off with all
//! partially evaluated operands intact. A single logical thread of control
//! runs per evaluation; the host scheduler decides when a suspended
//! evaluation resumes.

pub mod builtins;
mod eval;
mod resolver;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use brook_core::{
    ast, ClassObject, ContextManager, Coroutine, EvalError, Function, Instance, NativeFunction,
    NativeFuture, Protocol, Result, Scope, ScopeKind, Value, ValueStream,
};
pub use eval::Evaluator;
pub use resolver::{MapResolver, ModuleResolver, NoModules};

/// Evaluates `program` against `scope`, returning the value of the last
/// top-level expression statement (or `Value::None` when the body ends in
/// a non-expression statement).
///
/// The scope is the caller's object: every top-level binding side effect is
/// visible through it after the call returns. A cancellation token, when
/// supplied, is observed at suspension points; pending resource releases
/// run before `EvalError::Cancelled` propagates.
pub async fn eval(
    program: &[ast::Stmt],
    scope: Arc<Scope>,
    cancel: Option<CancellationToken>,
) -> Result<Value> {
    let mut evaluator = Evaluator::new();
    if let Some(token) = cancel {
        evaluator = evaluator.with_cancellation(token);
    }
    evaluator.eval(program, scope).await
}
