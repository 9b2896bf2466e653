//! The default global environment. Hosts call [`install`] on a fresh module
//! scope; everything here is a plain binding, so hosts can shadow or omit
//! any of it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use brook_core::{
    Coroutine, EvalError, NativeFunction, Result, Scope, Value, ValueStream,
};

type Builtin = fn(Vec<Value>) -> Result<Value>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("print", print),
    ("len", len),
    ("range", range),
    ("sleep", sleep),
    ("iter", make_iter),
    ("aiter", make_aiter),
    ("int", to_int),
    ("float", to_float),
    ("str", to_str),
    ("bool", to_bool),
];

pub async fn install(scope: &Arc<Scope>) {
    for (name, f) in BUILTINS.iter().copied() {
        scope.set(name, native(name, f)).await;
    }
}

/// A stand-in for the usual async-runtime module: a dict exposing `sleep`,
/// suitable for registering with a module resolver.
pub fn asyncio_module() -> Value {
    let mut entries = IndexMap::new();
    entries.insert("sleep".to_string(), native("sleep", sleep));
    Value::Dict(Arc::new(RwLock::new(entries)))
}

fn native(
    name: &'static str,
    f: fn(Vec<Value>) -> Result<Value>,
) -> Value {
    Value::NativeFunction(Arc::new(NativeFunction::new(
        name,
        move |args, kwargs: HashMap<String, Value>| async move {
            if let Some(unexpected) = kwargs.keys().next() {
                return Err(EvalError::ArgumentError {
                    message: format!("{name}() got an unexpected keyword argument '{unexpected}'"),
                });
            }
            f(args)
        },
    )))
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::ArgumentError {
            message: format!(
                "{name}() takes {expected} argument{} but {} were given",
                if expected == 1 { "" } else { "s" },
                args.len()
            ),
        })
    }
}

fn print(args: Vec<Value>) -> Result<Value> {
    let parts: Vec<String> = args.iter().map(|v| v.to_display_string()).collect();
    println!("{}", parts.join(" "));
    Ok(Value::None)
}

fn len(args: Vec<Value>) -> Result<Value> {
    expect_arity("len", &args, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::Tuple(t) => t.len(),
        Value::List(l) => match l.try_read() {
            Ok(items) => items.len(),
            Err(_) => {
                return Err(EvalError::ValueError {
                    message: "list is locked".into(),
                })
            }
        },
        Value::Dict(d) => match d.try_read() {
            Ok(entries) => entries.len(),
            Err(_) => {
                return Err(EvalError::ValueError {
                    message: "dict is locked".into(),
                })
            }
        },
        other => {
            return Err(EvalError::TypeError {
                expected: "sized value".into(),
                actual: other.type_name().into(),
            })
        }
    };
    Ok(Value::Int(n as i64))
}

/// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`,
/// exposed through the synchronous iteration protocol.
fn range(args: Vec<Value>) -> Result<Value> {
    let (start, stop, step) = match args.len() {
        1 => (0, args[0].as_int()?, 1),
        2 => (args[0].as_int()?, args[1].as_int()?, 1),
        3 => (args[0].as_int()?, args[1].as_int()?, args[2].as_int()?),
        n => {
            return Err(EvalError::ArgumentError {
                message: format!("range() takes 1 to 3 arguments but {n} were given"),
            })
        }
    };
    if step == 0 {
        return Err(EvalError::ValueError {
            message: "range() step must not be zero".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        values.push(Value::Int(current));
        current += step;
    }
    Ok(Value::Iterator(Arc::new(ValueStream::from_values(
        "range", values,
    ))))
}

/// Returns an awaitable that sleeps for the given number of seconds.
fn sleep(args: Vec<Value>) -> Result<Value> {
    expect_arity("sleep", &args, 1)?;
    let seconds = args[0].as_float()?;
    if seconds < 0.0 {
        return Err(EvalError::ValueError {
            message: "sleep() duration must not be negative".into(),
        });
    }
    Ok(Value::Coroutine(Arc::new(Coroutine::native(
        "sleep",
        async move {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            Ok(Value::None)
        },
    ))))
}

/// Snapshots a container into an explicit iterator value.
fn make_iter(args: Vec<Value>) -> Result<Value> {
    expect_arity("iter", &args, 1)?;
    let values = match &args[0] {
        Value::List(l) => match l.try_read() {
            Ok(items) => items.clone(),
            Err(_) => {
                return Err(EvalError::ValueError {
                    message: "list is locked".into(),
                })
            }
        },
        Value::Tuple(t) => t.as_ref().clone(),
        Value::Str(s) => s
            .chars()
            .map(|c| Value::Str(Arc::new(c.to_string())))
            .collect(),
        Value::Iterator(_) => return Ok(args[0].clone()),
        other => {
            return Err(EvalError::TypeError {
                expected: "a value supporting synchronous iteration".into(),
                actual: other.type_name().into(),
            })
        }
    };
    Ok(Value::Iterator(Arc::new(ValueStream::from_values(
        "iter", values,
    ))))
}

/// Snapshots a container into an async iterator, for exercising
/// `async for` without a host-provided stream.
fn make_aiter(args: Vec<Value>) -> Result<Value> {
    expect_arity("aiter", &args, 1)?;
    match make_iter(args)? {
        Value::Iterator(stream) => Ok(Value::AsyncIterator(stream)),
        other => Ok(other),
    }
}

fn to_int(args: Vec<Value>) -> Result<Value> {
    expect_arity("int", &args, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            EvalError::ValueError {
                message: format!("invalid literal for int(): {s:?}"),
            }
        }),
        other => Err(EvalError::TypeError {
            expected: "number or str".into(),
            actual: other.type_name().into(),
        }),
    }
}

fn to_float(args: Vec<Value>) -> Result<Value> {
    expect_arity("float", &args, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            EvalError::ValueError {
                message: format!("could not convert string to float: {s:?}"),
            }
        }),
        other => Err(EvalError::TypeError {
            expected: "number or str".into(),
            actual: other.type_name().into(),
        }),
    }
}

fn to_str(args: Vec<Value>) -> Result<Value> {
    expect_arity("str", &args, 1)?;
    Ok(Value::Str(Arc::new(args[0].to_display_string())))
}

fn to_bool(args: Vec<Value>) -> Result<Value> {
    expect_arity("bool", &args, 1)?;
    // Container truthiness needs the lock; builtins stay lock-free, so this
    // handles the scalar cases and treats the rest as truthy.
    let truthy = match &args[0] {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Tuple(t) => !t.is_empty(),
        Value::List(l) => l.try_read().map(|v| !v.is_empty()).unwrap_or(true),
        Value::Dict(d) => d.try_read().map(|v| !v.is_empty()).unwrap_or(true),
        _ => true,
    };
    Ok(Value::Bool(truthy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_binds_every_default_name() {
        let scope = Scope::new_module();
        install(&scope).await;
        for (name, _) in BUILTINS.iter().copied() {
            assert!(scope.get(name).await.is_some(), "'{name}' not installed");
        }
    }

    #[tokio::test]
    async fn range_produces_the_expected_sequence() {
        let value = range(vec![Value::Int(1), Value::Int(7), Value::Int(2)]).unwrap();
        let Value::Iterator(stream) = value else {
            panic!("range did not return an iterator");
        };
        let mut seen = Vec::new();
        while let Some(v) = stream.next().await.unwrap() {
            seen.push(v.as_int().unwrap());
        }
        assert_eq!(seen, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn len_counts_characters_not_bytes() {
        let value = len(vec![Value::Str(Arc::new("héllo".into()))]).unwrap();
        assert_eq!(value, Value::Int(5));
    }

    #[tokio::test]
    async fn int_rejects_garbage() {
        let err = to_int(vec![Value::Str(Arc::new("abc".into()))]).unwrap_err();
        assert!(matches!(err, EvalError::ValueError { .. }));
    }

    #[tokio::test]
    async fn sleep_returns_an_unstarted_awaitable() {
        let value = sleep(vec![Value::Float(0.0)]).unwrap();
        assert!(matches!(value, Value::Coroutine(_)));
    }
}
