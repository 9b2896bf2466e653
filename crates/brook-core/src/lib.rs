//! Core types for the brook evaluator: the syntax tree consumed by the
//! evaluator, the runtime value model, the scope chain and the error
//! taxonomy. The evaluator itself lives in `brook-eval`.

pub mod ast;
mod error;
mod scope;
mod value;

pub use error::{EvalError, Result};
pub use scope::{Scope, ScopeKind};
pub use value::{
    BoundMethod, ClassObject, ContextManager, Coroutine, CoroutineBody, Function, Instance,
    NativeFn, NativeFunction, NativeFuture, Param, Protocol, ReleaseFuture, Value, ValueStream,
};
