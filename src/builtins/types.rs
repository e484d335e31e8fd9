//! Numeric primitives exposed bare at the top level (§4.1):
//! `list, dict, map, len, str, float, int, min, max, round`.

use super::{arg_f64, arity_error, Builtin};
use crate::error::{ContextError, XacroError};
use crate::value::Value;
use std::collections::HashMap;

pub fn register(table: &mut HashMap<&'static str, Builtin>) {
    table.insert("list", Builtin::Pure(list));
    table.insert("dict", Builtin::Pure(dict));
    table.insert("map", Builtin::Pure(map));
    table.insert("len", Builtin::Pure(len));
    table.insert("str", Builtin::Pure(str_fn));
    table.insert("float", Builtin::Pure(float_fn));
    table.insert("int", Builtin::Pure(int_fn));
    table.insert("min", Builtin::Pure(min));
    table.insert("max", Builtin::Pure(max));
    table.insert("round", Builtin::Pure(round));
}

fn list(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        None => Ok(Value::List(Vec::new())),
        Some(Value::List(items)) => Ok(Value::List(items.clone())),
        Some(other) => Ok(Value::List(vec![other.clone()])),
    }
}

/// `dict()` builds a map from `(key, value)` pairs, mirroring the
/// two-argument call form most `${...}` expressions actually use.
fn dict(args: &[Value]) -> Result<Value, ContextError> {
    if args.is_empty() {
        return Ok(Value::Map(Vec::new()));
    }
    if let Some(Value::List(pairs)) = args.first() {
        let mut entries = Vec::new();
        for pair in pairs {
            if let Value::List(kv) = pair {
                if let [k, v] = kv.as_slice() {
                    entries.push((k.stringify(), v.clone()));
                    continue;
                }
            }
            return Err(arity_error("dict", "a list of (key, value) pairs"));
        }
        return Ok(Value::Map(entries));
    }
    Err(arity_error("dict", "0 or 1 (pair list)"))
}

/// `map()` has no callable `Value` to apply (§3 has no function type), so
/// with a single iterable it is the identity — kept for call-site
/// compatibility with code migrated from the original expression grammar.
fn map(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::List(items)) => Ok(Value::List(items.clone())),
        _ => Err(arity_error("map", "1 list")),
    }
}

fn len(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::List(items)) => Ok(Value::Integer(items.len() as i64)),
        Some(Value::Map(entries)) => Ok(Value::Integer(entries.len() as i64)),
        Some(Value::Text(s)) => Ok(Value::Integer(s.chars().count() as i64)),
        _ => Err(arity_error("len", "1 list, dict, or str")),
    }
}

fn str_fn(args: &[Value]) -> Result<Value, ContextError> {
    args.first()
        .map(|v| Value::Text(v.stringify()))
        .ok_or_else(|| arity_error("str", "1"))
}

fn float_fn(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::Integer(n)) => Ok(Value::Float(*n as f64)),
        Some(Value::Float(n)) => Ok(Value::Float(*n)),
        Some(Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ContextError::new(XacroError::EvaluationFailure(format!(
                "float: cannot parse `{s}`"
            )))),
        _ => Err(arity_error("float", "1 numeric or numeric string")),
    }
}

fn int_fn(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::Integer(n)) => Ok(Value::Integer(*n)),
        Some(Value::Float(n)) => Ok(Value::Integer(*n as i64)),
        Some(Value::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| ContextError::new(XacroError::EvaluationFailure(format!(
                "int: cannot parse `{s}`"
            )))),
        Some(Value::Boolean(b)) => Ok(Value::Integer(if *b { 1 } else { 0 })),
        _ => Err(arity_error("int", "1 numeric, boolean, or numeric string")),
    }
}

fn min(args: &[Value]) -> Result<Value, ContextError> {
    extremum(args, "min", |a, b| a < b)
}

fn max(args: &[Value]) -> Result<Value, ContextError> {
    extremum(args, "max", |a, b| a > b)
}

fn extremum(
    args: &[Value],
    fname: &str,
    better: impl Fn(f64, f64) -> bool,
) -> Result<Value, ContextError> {
    let values: Vec<&Value> = match args {
        [Value::List(items)] => items.iter().collect(),
        many => many.iter().collect(),
    };
    if values.is_empty() {
        return Err(arity_error(fname, "at least 1"));
    }
    let mut best = values[0];
    let mut best_f = arg_f64(std::slice::from_ref(best), 0, fname)?;
    for v in &values[1..] {
        let f = arg_f64(std::slice::from_ref(*v), 0, fname)?;
        if better(f, best_f) {
            best = v;
            best_f = f;
        }
    }
    Ok(best.clone())
}

fn round(args: &[Value]) -> Result<Value, ContextError> {
    let x = arg_f64(args, 0, "round")?;
    match args.get(1) {
        Some(v) => {
            let digits = match v {
                Value::Integer(n) => *n,
                _ => return Err(arity_error("round", "(number, int) or (number)")),
            };
            let factor = 10f64.powi(digits as i32);
            Ok(Value::Float((x * factor).round() / factor))
        }
        None => Ok(Value::Integer(x.round() as i64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_of_text() {
        assert_eq!(len(&[Value::Text("hello".into())]).unwrap(), Value::Integer(5));
    }

    #[test]
    fn min_max_over_varargs() {
        let args = vec![Value::Integer(3), Value::Integer(1), Value::Integer(2)];
        assert_eq!(min(&args).unwrap(), Value::Integer(1));
        assert_eq!(max(&args).unwrap(), Value::Integer(3));
    }

    #[test]
    fn round_with_precision() {
        let args = vec![Value::Float(3.14159), Value::Integer(2)];
        assert_eq!(round(&args).unwrap(), Value::Float(3.14));
    }

    #[test]
    fn int_parses_numeric_text() {
        assert_eq!(int_fn(&[Value::Text("42".into())]).unwrap(), Value::Integer(42));
    }
}
