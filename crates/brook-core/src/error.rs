use std::sync::Arc;

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("name '{name}' is not defined")]
    NameError { name: String },

    #[error("type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    #[error("'{type_name}' object has no attribute '{attr}'")]
    AttributeError { type_name: String, attr: String },

    #[error("index error: {message}")]
    IndexError { message: String },

    #[error("key error: {key}")]
    KeyError { key: String },

    #[error("value error: {message}")]
    ValueError { message: String },

    #[error("argument error: {message}")]
    ArgumentError { message: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("not callable: {type_name}")]
    NotCallable { type_name: String },

    #[error("import error: {message}")]
    ImportError { message: String },

    /// A script-level `raise`. Carries the raised value unmodified.
    #[error("uncaught exception: {}", .value.repr())]
    Raised { value: Arc<Value> },

    /// A resource release step failed. When the block body had already
    /// failed, that error rides along in `body` so neither is dropped.
    #[error("resource release failed: {release}{}", .body.as_ref().map(|b| format!(" (while unwinding: {b})")).unwrap_or_default())]
    ReleaseError {
        release: Box<EvalError>,
        body: Option<Box<EvalError>>,
    },

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("internal error: {message}")]
    InternalError { message: String },

    // Control flow, intercepted by the loop and call machinery. Never
    // surfaced to the caller by a well-formed program.
    #[error("break outside loop")]
    Break,

    #[error("continue outside loop")]
    Continue,

    #[error("return outside function")]
    Return { value: Arc<Value> },
}

impl EvalError {
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            EvalError::Break | EvalError::Continue | EvalError::Return { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
