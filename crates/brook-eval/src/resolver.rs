use std::collections::HashMap;

use brook_core::{EvalError, NativeFuture, Value};

/// External name-resolution collaborator for `import` statements. The
/// evaluator binds whatever value the resolver returns; it never inspects
/// module contents itself.
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, module: &str) -> NativeFuture;
}

/// The default resolver: every import fails.
pub struct NoModules;

impl ModuleResolver for NoModules {
    fn resolve(&self, module: &str) -> NativeFuture {
        let module = module.to_string();
        Box::pin(async move {
            Err(EvalError::ImportError {
                message: format!("no module named '{module}'"),
            })
        })
    }
}

/// A fixed table of module values, enough for hosts that expose a closed
/// set of modules to scripts.
#[derive(Default)]
pub struct MapResolver {
    modules: HashMap<String, Value>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, value: Value) -> Self {
        self.modules.insert(name.into(), value);
        self
    }
}

impl ModuleResolver for MapResolver {
    fn resolve(&self, module: &str) -> NativeFuture {
        let found = self.modules.get(module).cloned();
        let module = module.to_string();
        Box::pin(async move {
            found.ok_or_else(|| EvalError::ImportError {
                message: format!("no module named '{module}'"),
            })
        })
    }
}
