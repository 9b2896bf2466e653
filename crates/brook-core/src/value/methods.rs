//! Built-in methods on container and string values, surfaced through
//! attribute access. Each method is a native closure capturing the shared
//! container, so mutations are visible through every reference.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::EvalError;

use super::{NativeFunction, Value};

pub fn get_list_method(l: Arc<RwLock<Vec<Value>>>, name: &str) -> Option<Value> {
    match name {
        "append" => {
            let l = l.clone();
            Some(native("append", move |args| {
                let l = l.clone();
                async move {
                    expect_arity("append", &args, 1)?;
                    l.write().await.push(args[0].clone());
                    Ok(Value::None)
                }
            }))
        }
        "extend" => {
            let l = l.clone();
            Some(native("extend", move |args| {
                let l = l.clone();
                async move {
                    expect_arity("extend", &args, 1)?;
                    let items = match &args[0] {
                        Value::List(other) => other.read().await.clone(),
                        Value::Tuple(t) => t.as_ref().clone(),
                        other => {
                            return Err(EvalError::TypeError {
                                expected: "list or tuple".into(),
                                actual: other.type_name().into(),
                            })
                        }
                    };
                    l.write().await.extend(items);
                    Ok(Value::None)
                }
            }))
        }
        "pop" => {
            let l = l.clone();
            Some(native("pop", move |args| {
                let l = l.clone();
                async move {
                    expect_arity("pop", &args, 0)?;
                    l.write().await.pop().ok_or_else(|| EvalError::IndexError {
                        message: "pop from empty list".into(),
                    })
                }
            }))
        }
        "clear" => {
            let l = l.clone();
            Some(native("clear", move |args| {
                let l = l.clone();
                async move {
                    expect_arity("clear", &args, 0)?;
                    l.write().await.clear();
                    Ok(Value::None)
                }
            }))
        }
        _ => None,
    }
}

pub fn get_dict_method(d: Arc<RwLock<IndexMap<String, Value>>>, name: &str) -> Option<Value> {
    match name {
        "get" => {
            let d = d.clone();
            Some(native("get", move |args| {
                let d = d.clone();
                async move {
                    if args.is_empty() || args.len() > 2 {
                        return Err(EvalError::ArgumentError {
                            message: format!("get() takes 1 or 2 arguments ({} given)", args.len()),
                        });
                    }
                    let key = args[0].as_dict_key()?;
                    let map = d.read().await;
                    Ok(map
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
                }
            }))
        }
        "keys" => {
            let d = d.clone();
            Some(native("keys", move |args| {
                let d = d.clone();
                async move {
                    expect_arity("keys", &args, 0)?;
                    let keys = d
                        .read()
                        .await
                        .keys()
                        .map(|k| Value::Str(Arc::new(k.clone())))
                        .collect();
                    Ok(Value::List(Arc::new(RwLock::new(keys))))
                }
            }))
        }
        "values" => {
            let d = d.clone();
            Some(native("values", move |args| {
                let d = d.clone();
                async move {
                    expect_arity("values", &args, 0)?;
                    let values = d.read().await.values().cloned().collect();
                    Ok(Value::List(Arc::new(RwLock::new(values))))
                }
            }))
        }
        "items" => {
            let d = d.clone();
            Some(native("items", move |args| {
                let d = d.clone();
                async move {
                    expect_arity("items", &args, 0)?;
                    let items = d
                        .read()
                        .await
                        .iter()
                        .map(|(k, v)| {
                            Value::Tuple(Arc::new(vec![
                                Value::Str(Arc::new(k.clone())),
                                v.clone(),
                            ]))
                        })
                        .collect();
                    Ok(Value::List(Arc::new(RwLock::new(items))))
                }
            }))
        }
        _ => None,
    }
}

pub fn get_str_method(s: Arc<String>, name: &str) -> Option<Value> {
    match name {
        "upper" => {
            let s = s.clone();
            Some(native("upper", move |args| {
                let s = s.clone();
                async move {
                    expect_arity("upper", &args, 0)?;
                    Ok(Value::Str(Arc::new(s.to_uppercase())))
                }
            }))
        }
        "lower" => {
            let s = s.clone();
            Some(native("lower", move |args| {
                let s = s.clone();
                async move {
                    expect_arity("lower", &args, 0)?;
                    Ok(Value::Str(Arc::new(s.to_lowercase())))
                }
            }))
        }
        "strip" => {
            let s = s.clone();
            Some(native("strip", move |args| {
                let s = s.clone();
                async move {
                    expect_arity("strip", &args, 0)?;
                    Ok(Value::Str(Arc::new(s.trim().to_string())))
                }
            }))
        }
        "split" => {
            let s = s.clone();
            Some(native("split", move |args| {
                let s = s.clone();
                async move {
                    let parts: Vec<Value> = match args.first() {
                        None => s
                            .split_whitespace()
                            .map(|p| Value::Str(Arc::new(p.to_string())))
                            .collect(),
                        Some(sep) => {
                            let sep = sep.as_str()?.to_string();
                            s.split(&sep)
                                .map(|p| Value::Str(Arc::new(p.to_string())))
                                .collect()
                        }
                    };
                    Ok(Value::List(Arc::new(RwLock::new(parts))))
                }
            }))
        }
        "join" => {
            let s = s.clone();
            Some(native("join", move |args| {
                let s = s.clone();
                async move {
                    expect_arity("join", &args, 1)?;
                    let items = match &args[0] {
                        Value::List(l) => l.read().await.clone(),
                        Value::Tuple(t) => t.as_ref().clone(),
                        other => {
                            return Err(EvalError::TypeError {
                                expected: "list or tuple".into(),
                                actual: other.type_name().into(),
                            })
                        }
                    };
                    let mut parts = Vec::with_capacity(items.len());
                    for item in &items {
                        parts.push(item.as_str()?.to_string());
                    }
                    Ok(Value::Str(Arc::new(parts.join(&s))))
                }
            }))
        }
        _ => None,
    }
}

fn native<F, Fut>(name: &'static str, f: F) -> Value
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = crate::error::Result<Value>> + Send + 'static,
{
    Value::NativeFunction(Arc::new(NativeFunction::new(name, move |args, _kwargs| {
        f(args)
    })))
}

fn expect_arity(name: &str, args: &[Value], want: usize) -> crate::error::Result<()> {
    if args.len() != want {
        return Err(EvalError::ArgumentError {
            message: format!(
                "{}() takes exactly {} argument{} ({} given)",
                name,
                want,
                if want == 1 { "" } else { "s" },
                args.len()
            ),
        });
    }
    Ok(())
}
