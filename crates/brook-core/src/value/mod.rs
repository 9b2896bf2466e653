mod class;
mod coroutine;
mod functions;
mod methods;
mod resource;
mod stream;

pub use class::{ClassObject, Instance};
pub use coroutine::{Coroutine, CoroutineBody};
pub use functions::{BoundMethod, Function, NativeFn, NativeFunction, NativeFuture, Param};
pub use resource::{ContextManager, Protocol, ReleaseFuture};
pub use stream::ValueStream;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::{EvalError, Result};

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<String>),
    Tuple(Arc<Vec<Value>>),
    List(Arc<RwLock<Vec<Value>>>),
    Dict(Arc<RwLock<IndexMap<String, Value>>>),
    Function(Arc<Function>),
    BoundMethod(Arc<BoundMethod>),
    NativeFunction(Arc<NativeFunction>),
    Class(Arc<ClassObject>),
    Instance(Arc<Instance>),
    Coroutine(Arc<Coroutine>),
    /// Synchronous iteration protocol; element production may still suspend.
    Iterator(Arc<ValueStream>),
    /// Asynchronous iteration protocol, consumed by `async for` only.
    AsyncIterator(Arc<ValueStream>),
    ContextManager(Arc<ContextManager>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(fl) => write!(f, "Float({fl})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Tuple(t) => write!(f, "Tuple({:?})", t.as_ref()),
            Value::List(_) => write!(f, "List([...])"),
            Value::Dict(_) => write!(f, "Dict({{...}})"),
            Value::Function(func) => write!(f, "Function({})", func.name),
            Value::BoundMethod(m) => write!(f, "{m:?}"),
            Value::NativeFunction(func) => write!(f, "NativeFunction({})", func.name),
            Value::Class(c) => write!(f, "Class({})", c.name),
            Value::Instance(i) => write!(f, "{i:?}"),
            Value::Coroutine(c) => write!(f, "{c:?}"),
            Value::Iterator(s) => write!(f, "Iterator({})", s.name()),
            Value::AsyncIterator(s) => write!(f, "AsyncIterator({})", s.name()),
            Value::ContextManager(c) => write!(f, "{c:?}"),
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Function(_) => "function",
            Value::BoundMethod(_) => "method",
            Value::NativeFunction(_) => "builtin_function",
            Value::Class(_) => "type",
            Value::Instance(_) => "object",
            Value::Coroutine(_) => "coroutine",
            Value::Iterator(_) => "iterator",
            Value::AsyncIterator(_) => "async_iterator",
            Value::ContextManager(_) => "context_manager",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_)
                | Value::BoundMethod(_)
                | Value::NativeFunction(_)
                | Value::Class(_)
        )
    }

    pub async fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::List(l) => !l.read().await.is_empty(),
            Value::Dict(d) => !d.read().await.is_empty(),
            _ => true,
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            _ => Err(EvalError::TypeError {
                expected: "int".into(),
                actual: self.type_name().into(),
            }),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(EvalError::TypeError {
                expected: "float".into(),
                actual: self.type_name().into(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s.as_ref()),
            _ => Err(EvalError::TypeError {
                expected: "str".into(),
                actual: self.type_name().into(),
            }),
        }
    }

    pub fn as_dict_key(&self) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s.as_ref().clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::None => Ok("None".to_string()),
            _ => Err(EvalError::TypeError {
                expected: "hashable".into(),
                actual: self.type_name().into(),
            }),
        }
    }

    /// Attribute lookup that needs no await: container/string methods and
    /// class tables. Instance attributes go through `Instance::get` in the
    /// evaluator because they take the attribute lock.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Str(s) => methods::get_str_method(s.clone(), name),
            Value::List(l) => methods::get_list_method(l.clone(), name),
            Value::Dict(d) => methods::get_dict_method(d.clone(), name),
            Value::Class(c) => c.attr(name),
            _ => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Value::None => "None".into(),
            Value::Bool(b) => if *b { "True" } else { "False" }.into(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::Str(s) => s.as_ref().clone(),
            Value::Tuple(t) => {
                let items: Vec<String> = t.iter().map(|v| v.repr()).collect();
                if t.len() == 1 {
                    format!("({},)", items[0])
                } else {
                    format!("({})", items.join(", "))
                }
            }
            Value::List(l) => match l.try_read() {
                Ok(guard) => {
                    let items: Vec<String> = guard.iter().map(|v| v.repr()).collect();
                    format!("[{}]", items.join(", "))
                }
                Err(_) => "[<locked>]".into(),
            },
            Value::Dict(d) => match d.try_read() {
                Ok(guard) => {
                    let items: Vec<String> = guard
                        .iter()
                        .map(|(k, v)| format!("{:?}: {}", k, v.repr()))
                        .collect();
                    format!("{{{}}}", items.join(", "))
                }
                Err(_) => "{<locked>}".into(),
            },
            Value::Function(func) => format!("<function {}>", func.name),
            Value::BoundMethod(m) => format!("<bound method {}>", m.function.name),
            Value::NativeFunction(func) => format!("<builtin_function {}>", func.name),
            Value::Class(c) => format!("<class {}>", c.name),
            Value::Instance(i) => format!("<{} instance>", i.class.name),
            Value::Coroutine(c) => format!("<coroutine {}>", c.name()),
            Value::Iterator(s) => format!("<iterator {}>", s.name()),
            Value::AsyncIterator(s) => format!("<async iterator {}>", s.name()),
            Value::ContextManager(c) => format!("<context manager {}>", c.name()),
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s.as_ref()),
            _ => self.to_display_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::List(a), Value::List(b)) => match (a.try_read(), b.try_read()) {
                (Ok(a), Ok(b)) => *a == *b,
                _ => Arc::ptr_eq(a, b),
            },
            (Value::Dict(a), Value::Dict(b)) => match (a.try_read(), b.try_read()) {
                (Ok(a), Ok(b)) => *a == *b,
                _ => Arc::ptr_eq(a, b),
            },
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Arc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
