use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::Value;

/// A class object: the frozen contents of a class-body namespace plus the
/// annotation records accumulated while that body executed. Neither table
/// changes after construction.
pub struct ClassObject {
    pub name: String,
    pub attrs: IndexMap<String, Value>,
    pub annotations: IndexMap<String, Value>,
}

impl ClassObject {
    pub fn attr(&self, name: &str) -> Option<Value> {
        match name {
            "__annotations__" => {
                let map = self.annotations.clone();
                Some(Value::Dict(Arc::new(RwLock::new(map))))
            }
            "__name__" => Some(Value::Str(Arc::new(self.name.clone()))),
            _ => self.attrs.get(name).cloned(),
        }
    }
}

impl fmt::Debug for ClassObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

pub struct Instance {
    pub class: Arc<ClassObject>,
    pub attrs: RwLock<IndexMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Arc<ClassObject>) -> Self {
        Self {
            class,
            attrs: RwLock::new(IndexMap::new()),
        }
    }

    /// Own attributes first, then the class table.
    pub async fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attrs.read().await.get(name) {
            return Some(value.clone());
        }
        self.class.attr(name)
    }

    pub async fn set(&self, name: &str, value: Value) {
        self.attrs.write().await.insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}
