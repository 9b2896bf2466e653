use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::RwLock;

use brook_core::ast::{BinOp, CmpOp};
use brook_core::{EvalError, Result, Value};

pub fn eval_unary_minus(value: Value) -> Result<Value> {
    match value {
        Value::Int(i) => Ok(Value::Int(-i)),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(EvalError::TypeError {
            expected: "number".into(),
            actual: value.type_name().into(),
        }),
    }
}

pub fn eval_unary_plus(value: Value) -> Result<Value> {
    match &value {
        Value::Int(_) | Value::Float(_) => Ok(value),
        _ => Err(EvalError::TypeError {
            expected: "number".into(),
            actual: value.type_name().into(),
        }),
    }
}

pub async fn eval_binary_op(left: Value, op: BinOp, right: Value) -> Result<Value> {
    match op {
        BinOp::Add => eval_add(left, right).await,
        BinOp::Sub => eval_sub(left, right),
        BinOp::Mul => eval_mul(left, right).await,
        BinOp::Div => eval_div(left, right),
        BinOp::FloorDiv => eval_floor_div(left, right),
        BinOp::Mod => eval_mod(left, right),
        BinOp::BitAnd => eval_bits(left, right, "&", |a, b| a & b),
        BinOp::BitOr => eval_bits(left, right, "|", |a, b| a | b),
        BinOp::BitXor => eval_bits(left, right, "^", |a, b| a ^ b),
        BinOp::Shl => eval_shift(left, right, "<<", |a, b| a << b),
        BinOp::Shr => eval_shift(left, right, ">>", |a, b| a >> b),
    }
}

pub async fn eval_compare(left: Value, op: CmpOp, right: Value) -> Result<Value> {
    let result = match op {
        CmpOp::Eq => left == right,
        CmpOp::Ne => left != right,
        CmpOp::Lt => ordering(&left, &right)?.is_lt(),
        CmpOp::Le => ordering(&left, &right)?.is_le(),
        CmpOp::Gt => ordering(&left, &right)?.is_gt(),
        CmpOp::Ge => ordering(&left, &right)?.is_ge(),
        CmpOp::In => contains(&right, &left).await?,
        CmpOp::NotIn => !contains(&right, &left).await?,
    };
    Ok(Value::Bool(result))
}

async fn eval_add(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Arc::new(format!("{a}{b}")))),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.read().await.clone();
            items.extend(b.read().await.iter().cloned());
            Ok(Value::List(Arc::new(RwLock::new(items))))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.as_ref().clone();
            items.extend(b.iter().cloned());
            Ok(Value::Tuple(Arc::new(items)))
        }
        _ => Err(binary_type_error("+", &left, &right)),
    }
}

fn eval_sub(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 - b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a - *b as f64)),
        _ => Err(binary_type_error("-", &left, &right)),
    }
}

async fn eval_mul(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 * b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a * *b as f64)),
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            if *n <= 0 {
                Ok(Value::Str(Arc::new(String::new())))
            } else {
                Ok(Value::Str(Arc::new(s.repeat(*n as usize))))
            }
        }
        (Value::List(l), Value::Int(n)) | (Value::Int(n), Value::List(l)) => {
            let items = l.read().await;
            let mut result = Vec::new();
            for _ in 0..(*n).max(0) {
                result.extend(items.iter().cloned());
            }
            Ok(Value::List(Arc::new(RwLock::new(result))))
        }
        _ => Err(binary_type_error("*", &left, &right)),
    }
}

fn eval_div(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Float(*a as f64 / *b as f64))
            }
        }
        _ => {
            let (a, b) = (left.as_float()?, right.as_float()?);
            if b == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Float(a / b))
            }
        }
    }
}

fn eval_floor_div(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Int(a.div_euclid(*b)))
            }
        }
        _ => {
            let (a, b) = (left.as_float()?, right.as_float()?);
            if b == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Float((a / b).floor()))
            }
        }
    }
}

fn eval_mod(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Int(a.rem_euclid(*b)))
            }
        }
        _ => {
            let (a, b) = (left.as_float()?, right.as_float()?);
            if b == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Float(a.rem_euclid(b)))
            }
        }
    }
}

fn eval_bits(left: Value, right: Value, op: &str, f: impl Fn(i64, i64) -> i64) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(f(*a, *b))),
        _ => Err(binary_type_error(op, &left, &right)),
    }
}

fn eval_shift(left: Value, right: Value, op: &str, f: impl Fn(i64, u32) -> i64) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b < 0 {
                return Err(EvalError::ValueError {
                    message: "negative shift count".into(),
                });
            }
            if *b >= i64::BITS as i64 {
                return Err(EvalError::ValueError {
                    message: format!("shift count too large: {b}"),
                });
            }
            Ok(Value::Int(f(*a, *b as u32)))
        }
        _ => Err(binary_type_error(op, &left, &right)),
    }
}

fn ordering(left: &Value, right: &Value) -> Result<Ordering> {
    let ord = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            left.as_float()?.partial_cmp(&right.as_float()?)
        }
        _ => None,
    };
    ord.ok_or_else(|| binary_type_error("comparison", left, right))
}

async fn contains(container: &Value, needle: &Value) -> Result<bool> {
    match container {
        Value::List(l) => Ok(l.read().await.iter().any(|v| v == needle)),
        Value::Tuple(t) => Ok(t.iter().any(|v| v == needle)),
        Value::Str(s) => Ok(s.contains(needle.as_str()?)),
        Value::Dict(d) => Ok(d.read().await.contains_key(&needle.as_dict_key()?)),
        _ => Err(EvalError::TypeError {
            expected: "container".into(),
            actual: container.type_name().into(),
        }),
    }
}

fn binary_type_error(op: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeError {
        expected: format!("compatible operands for {op}"),
        actual: format!("{} and {}", left.type_name(), right.type_name()),
    }
}
