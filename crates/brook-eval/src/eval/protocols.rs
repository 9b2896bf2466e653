//! Iteration and resource adapters: uniform access to the synchronous and
//! asynchronous variants of each protocol. Dispatch picks the variant the
//! value exposes at the point of use; a value exposing neither fails with a
//! type error naming the missing capability.

use std::sync::Arc;

use brook_core::{ContextManager, EvalError, Protocol, Result, Value, ValueStream};

/// Element source for a `for` / `async for` loop. Container snapshots are
/// drained eagerly; stream-backed sources advance lazily and may suspend on
/// every `next`.
pub(crate) enum Elements {
    Eager(std::vec::IntoIter<Value>),
    Stream(Arc<ValueStream>),
}

impl Elements {
    pub(crate) async fn next(&mut self) -> Result<Option<Value>> {
        match self {
            Elements::Eager(items) => Ok(items.next()),
            Elements::Stream(stream) => stream.next().await,
        }
    }
}

pub(crate) async fn iterate(value: &Value, protocol: Protocol) -> Result<Elements> {
    match protocol {
        Protocol::Sync => match value {
            Value::List(l) => Ok(Elements::Eager(l.read().await.clone().into_iter())),
            Value::Tuple(t) => Ok(Elements::Eager(t.as_ref().clone().into_iter())),
            Value::Str(s) => {
                let chars: Vec<Value> = s
                    .chars()
                    .map(|c| Value::Str(Arc::new(c.to_string())))
                    .collect();
                Ok(Elements::Eager(chars.into_iter()))
            }
            Value::Dict(d) => {
                let keys: Vec<Value> = d
                    .read()
                    .await
                    .keys()
                    .map(|k| Value::Str(Arc::new(k.clone())))
                    .collect();
                Ok(Elements::Eager(keys.into_iter()))
            }
            Value::Iterator(stream) => Ok(Elements::Stream(stream.clone())),
            Value::AsyncIterator(_) => Err(EvalError::TypeError {
                expected: "a value supporting synchronous iteration".into(),
                actual: "async_iterator (use 'async for')".into(),
            }),
            other => Err(EvalError::TypeError {
                expected: "a value supporting synchronous iteration".into(),
                actual: other.type_name().into(),
            }),
        },
        Protocol::Async => match value {
            Value::AsyncIterator(stream) => Ok(Elements::Stream(stream.clone())),
            other => Err(EvalError::TypeError {
                expected: "a value supporting asynchronous iteration".into(),
                actual: other.type_name().into(),
            }),
        },
    }
}

/// Eager unpacking for multiple-assignment targets.
pub(crate) async fn unpack(value: &Value) -> Result<Vec<Value>> {
    let mut elements = iterate(value, Protocol::Sync).await?;
    let mut items = Vec::new();
    while let Some(item) = elements.next().await? {
        items.push(item);
    }
    Ok(items)
}

pub(crate) fn resource(value: &Value, protocol: Protocol) -> Result<Arc<ContextManager>> {
    match value {
        Value::ContextManager(mgr) if mgr.protocol() == protocol => Ok(mgr.clone()),
        Value::ContextManager(mgr) => Err(EvalError::TypeError {
            expected: expected_manager(protocol),
            actual: format!("{} context manager", mgr.protocol().as_str()),
        }),
        other => Err(EvalError::TypeError {
            expected: expected_manager(protocol),
            actual: other.type_name().into(),
        }),
    }
}

fn expected_manager(protocol: Protocol) -> String {
    match protocol {
        Protocol::Sync => "a synchronous context manager".into(),
        Protocol::Async => "an asynchronous context manager".into(),
    }
}
