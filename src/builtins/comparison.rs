//! `python` namespace: introspection-flavored builtins (§4.1). Exposed only
//! under the `python.` prefix, never bare.

use super::{arg_f64, arity_error, Builtin};
use crate::error::{ContextError, XacroError};
use crate::value::Value;
use std::collections::HashMap;

pub fn register(table: &mut HashMap<&'static str, Builtin>) {
    table.insert("python.abs", Builtin::Pure(abs));
    table.insert("python.sum", Builtin::Pure(sum));
    table.insert("python.any", Builtin::Pure(any));
    table.insert("python.all", Builtin::Pure(all));
    table.insert("python.sorted", Builtin::Pure(sorted));
    table.insert("python.ord", Builtin::Pure(ord));
    table.insert("python.repr", Builtin::Pure(repr));
    table.insert("python.type", Builtin::Pure(type_of));
    table.insert("python.hash", Builtin::Pure(hash));
    table.insert("python.isinstance", Builtin::Pure(isinstance));
    table.insert("python.issubclass", Builtin::Pure(issubclass));
    table.insert("python.vars", Builtin::Pure(vars));
    table.insert("python.divmod", Builtin::Pure(divmod));
    table.insert("python.complex", Builtin::Pure(complex));
}

fn abs(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::Integer(n)) => Ok(Value::Integer(n.abs())),
        Some(Value::Float(n)) => Ok(Value::Float(n.abs())),
        _ => Err(arity_error("python.abs", "1 numeric")),
    }
}

fn sum(args: &[Value]) -> Result<Value, ContextError> {
    let items = list_args(args, "python.sum")?;
    let mut total = 0.0;
    let mut all_int = true;
    for item in items {
        match item {
            Value::Integer(n) => total += *n as f64,
            Value::Float(n) => {
                all_int = false;
                total += n;
            }
            other => {
                return Err(ContextError::new(XacroError::EvaluationFailure(format!(
                    "python.sum: cannot sum a {}",
                    other.type_name()
                ))))
            }
        }
    }
    Ok(if all_int {
        Value::Integer(total as i64)
    } else {
        Value::Float(total)
    })
}

fn any(args: &[Value]) -> Result<Value, ContextError> {
    let items = list_args(args, "python.any")?;
    Ok(Value::Boolean(
        items.iter().any(|v| v.truthy().unwrap_or(false)),
    ))
}

fn all(args: &[Value]) -> Result<Value, ContextError> {
    let items = list_args(args, "python.all")?;
    Ok(Value::Boolean(
        items.iter().all(|v| v.truthy().unwrap_or(false)),
    ))
}

fn sorted(args: &[Value]) -> Result<Value, ContextError> {
    let mut items = list_args(args, "python.sorted")?.to_vec();
    items.sort_by(|a, b| {
        a.stringify()
            .partial_cmp(&b.stringify())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(Value::List(items))
}

fn ord(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::Text(s)) if s.chars().count() == 1 => {
            Ok(Value::Integer(s.chars().next().unwrap() as i64))
        }
        _ => Err(arity_error("python.ord", "1 single-character string")),
    }
}

fn repr(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::Text(s)) => Ok(Value::Text(format!("'{s}'"))),
        Some(other) => Ok(Value::Text(other.stringify())),
        None => Err(arity_error("python.repr", "1")),
    }
}

fn type_of(args: &[Value]) -> Result<Value, ContextError> {
    args.first()
        .map(|v| Value::Text(v.type_name().to_string()))
        .ok_or_else(|| arity_error("python.type", "1"))
}

fn hash(args: &[Value]) -> Result<Value, ContextError> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let value = args.first().ok_or_else(|| arity_error("python.hash", "1"))?;
    let mut hasher = DefaultHasher::new();
    value.stringify().hash(&mut hasher);
    Ok(Value::Integer(hasher.finish() as i64))
}

fn isinstance(args: &[Value]) -> Result<Value, ContextError> {
    let value = args.first().ok_or_else(|| arity_error("python.isinstance", "2"))?;
    let type_name = args.get(1).ok_or_else(|| arity_error("python.isinstance", "2"))?;
    Ok(Value::Boolean(value.type_name() == type_name.stringify()))
}

fn issubclass(args: &[Value]) -> Result<Value, ContextError> {
    let a = args.first().ok_or_else(|| arity_error("python.issubclass", "2"))?;
    let b = args.get(1).ok_or_else(|| arity_error("python.issubclass", "2"))?;
    Ok(Value::Boolean(a.stringify() == b.stringify()))
}

fn vars(_args: &[Value]) -> Result<Value, ContextError> {
    Ok(Value::Map(Vec::new()))
}

fn divmod(args: &[Value]) -> Result<Value, ContextError> {
    let a = arg_f64(args, 0, "python.divmod")?;
    let b = arg_f64(args, 1, "python.divmod")?;
    if b == 0.0 {
        return Err(ContextError::new(XacroError::EvaluationFailure(
            "python.divmod: division by zero".into(),
        )));
    }
    let q = (a / b).floor();
    let r = a - q * b;
    Ok(Value::List(vec![Value::Float(q), Value::Float(r)]))
}

fn complex(_args: &[Value]) -> Result<Value, ContextError> {
    Err(ContextError::new(XacroError::EvaluationFailure(
        "python.complex: complex numbers are not a representable value".into(),
    )))
}

fn list_args<'a>(args: &'a [Value], fname: &str) -> Result<&'a [Value], ContextError> {
    match args.first() {
        Some(Value::List(items)) => Ok(items),
        _ => Err(arity_error(fname, "1 list")),
    }
}
