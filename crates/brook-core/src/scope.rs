use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::{EvalError, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The caller-owned top-level scope. Mutated in place by top-level
    /// statements; loop and resource-block bodies at this level do not
    /// introduce a child scope.
    Module,
    /// Fresh per function invocation, chained to the closure's scope.
    Function,
    /// Ephemeral class-body namespace; frozen into a class object on exit.
    Class,
}

/// A mutable name-to-value binding store with an explicit parent link.
///
/// Lookups walk the chain outward; assignment and deletion always target
/// this scope. Shared by reference (`Arc`), so every invocation of a
/// closure sees mutations made through any other reference.
pub struct Scope {
    bindings: RwLock<IndexMap<String, Value>>,
    annotations: RwLock<IndexMap<String, Value>>,
    parent: Option<Arc<Scope>>,
    kind: ScopeKind,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Scope {
    pub fn new_module() -> Arc<Self> {
        Arc::new(Self {
            bindings: RwLock::new(IndexMap::new()),
            annotations: RwLock::new(IndexMap::new()),
            parent: None,
            kind: ScopeKind::Module,
        })
    }

    pub fn new_child(parent: Arc<Scope>, kind: ScopeKind) -> Arc<Self> {
        Arc::new(Self {
            bindings: RwLock::new(IndexMap::new()),
            annotations: RwLock::new(IndexMap::new()),
            parent: Some(parent),
            kind,
        })
    }

    #[async_recursion::async_recursion]
    pub async fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.read().await.get(name) {
            return Some(value.clone());
        }

        if let Some(ref parent) = self.parent {
            return parent.get(name).await;
        }

        None
    }

    /// Binds in this scope. Assignment never targets an enclosing scope.
    pub async fn set(&self, name: &str, value: Value) {
        self.bindings.write().await.insert(name.to_string(), value);
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        if self.bindings.write().await.shift_remove(name).is_some() {
            Ok(())
        } else {
            Err(EvalError::NameError {
                name: name.to_string(),
            })
        }
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.bindings.read().await.contains_key(name)
    }

    /// Records an annotation. Only consulted for `Class` scopes; the class
    /// builder freezes the table into the class object's annotations.
    pub async fn annotate(&self, name: &str, annotation: Value) {
        self.annotations
            .write()
            .await
            .insert(name.to_string(), annotation);
    }

    pub async fn annotations(&self) -> IndexMap<String, Value> {
        self.annotations.read().await.clone()
    }

    /// This scope's own bindings, without the parent chain.
    pub async fn snapshot(&self) -> IndexMap<String, Value> {
        self.bindings.read().await.clone()
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn module_scope_roundtrip() {
        let scope = Scope::new_module();
        scope.set("x", Value::Int(42)).await;
        assert_eq!(scope.get("x").await, Some(Value::Int(42)));
    }

    #[tokio::test]
    async fn child_scope_reads_through_writes_locally() {
        let module = Scope::new_module();
        module.set("x", Value::Int(1)).await;

        let child = Scope::new_child(module.clone(), ScopeKind::Function);
        child.set("y", Value::Int(2)).await;

        assert_eq!(child.get("x").await, Some(Value::Int(1)));
        assert_eq!(child.get("y").await, Some(Value::Int(2)));
        assert_eq!(module.get("y").await, None);
    }

    #[tokio::test]
    async fn assignment_shadows_instead_of_updating_parent() {
        let module = Scope::new_module();
        module.set("x", Value::Int(1)).await;

        let child = Scope::new_child(module.clone(), ScopeKind::Function);
        child.set("x", Value::Int(2)).await;

        assert_eq!(child.get("x").await, Some(Value::Int(2)));
        assert_eq!(module.get("x").await, Some(Value::Int(1)));
    }

    #[tokio::test]
    async fn delete_absent_name_is_a_name_error() {
        let scope = Scope::new_module();
        scope.set("x", Value::Int(1)).await;
        scope.delete("x").await.unwrap();
        assert!(matches!(
            scope.delete("x").await,
            Err(EvalError::NameError { .. })
        ));
    }
}
