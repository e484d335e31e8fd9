//! `python` namespace: collection-flavored builtins (§4.1). `Value` has no
//! distinct tuple/set/slice variants, so `tuple`, `set`, `frozenset`, and
//! `slice` all resolve to `List` — documented in the grounding ledger.

use super::{arity_error, Builtin};
use crate::error::ContextError;
use crate::value::Value;
use std::collections::HashMap;

pub fn register(table: &mut HashMap<&'static str, Builtin>) {
    table.insert("python.range", Builtin::Pure(range));
    table.insert("python.zip", Builtin::Pure(zip));
    table.insert("python.enumerate", Builtin::Pure(enumerate));
    table.insert("python.reversed", Builtin::Pure(reversed));
    table.insert("python.filter", Builtin::Pure(filter));
    table.insert("python.tuple", Builtin::Pure(to_list));
    table.insert("python.set", Builtin::Pure(set));
    table.insert("python.frozenset", Builtin::Pure(set));
    table.insert("python.slice", Builtin::Pure(slice));
}

fn range(args: &[Value]) -> Result<Value, ContextError> {
    let as_int = |v: &Value| match v {
        Value::Integer(n) => Some(*n),
        _ => None,
    };
    let (start, stop, step) = match args {
        [stop] => (0, as_int(stop).ok_or_else(|| arity_error("python.range", "int"))?, 1),
        [start, stop] => (
            as_int(start).ok_or_else(|| arity_error("python.range", "int, int"))?,
            as_int(stop).ok_or_else(|| arity_error("python.range", "int, int"))?,
            1,
        ),
        [start, stop, step] => (
            as_int(start).ok_or_else(|| arity_error("python.range", "int, int, int"))?,
            as_int(stop).ok_or_else(|| arity_error("python.range", "int, int, int"))?,
            as_int(step).ok_or_else(|| arity_error("python.range", "int, int, int"))?,
        ),
        _ => return Err(arity_error("python.range", "1, 2, or 3")),
    };
    if step == 0 {
        return Err(arity_error("python.range", "a nonzero step"));
    }
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(Value::Integer(i));
        i += step;
    }
    Ok(Value::List(out))
}

fn zip(args: &[Value]) -> Result<Value, ContextError> {
    let lists: Vec<&[Value]> = args
        .iter()
        .map(|a| match a {
            Value::List(items) => Ok(items.as_slice()),
            _ => Err(arity_error("python.zip", "lists")),
        })
        .collect::<Result<_, _>>()?;
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(Value::List(lists.iter().map(|l| l[i].clone()).collect()));
    }
    Ok(Value::List(out))
}

fn enumerate(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::List(items)) => Ok(Value::List(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| Value::List(vec![Value::Integer(i as i64), v.clone()]))
                .collect(),
        )),
        _ => Err(arity_error("python.enumerate", "1 list")),
    }
}

fn reversed(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::List(items)) => {
            let mut items = items.clone();
            items.reverse();
            Ok(Value::List(items))
        }
        _ => Err(arity_error("python.reversed", "1 list")),
    }
}

/// No callable `Value` exists to filter by (§3), so this accepts a single
/// list and drops its falsy elements — the common case of `filter(None, xs)`.
fn filter(args: &[Value]) -> Result<Value, ContextError> {
    match args.last() {
        Some(Value::List(items)) => Ok(Value::List(
            items
                .iter()
                .filter(|v| v.truthy().unwrap_or(true))
                .cloned()
                .collect(),
        )),
        _ => Err(arity_error("python.filter", "(None, list)")),
    }
}

fn to_list(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::List(items)) => Ok(Value::List(items.clone())),
        Some(other) => Ok(Value::List(vec![other.clone()])),
        None => Ok(Value::List(Vec::new())),
    }
}

fn set(args: &[Value]) -> Result<Value, ContextError> {
    match args.first() {
        Some(Value::List(items)) => {
            let mut seen = Vec::new();
            for item in items {
                if !seen.iter().any(|s: &Value| s.stringify() == item.stringify()) {
                    seen.push(item.clone());
                }
            }
            Ok(Value::List(seen))
        }
        None => Ok(Value::List(Vec::new())),
        _ => Err(arity_error("python.set", "0 or 1 list")),
    }
}

fn slice(args: &[Value]) -> Result<Value, ContextError> {
    to_list(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_with_stop_only() {
        let v = range(&[Value::Integer(3)]).unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn zip_truncates_to_shortest() {
        let a = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::List(vec![Value::Integer(9)]);
        let v = zip(&[a, b]).unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::List(vec![Value::Integer(1), Value::Integer(9)])])
        );
    }

    #[test]
    fn set_deduplicates_preserving_first_seen_order() {
        let items = Value::List(vec![Value::Integer(1), Value::Integer(1), Value::Integer(2)]);
        let v = set(&[items]).unwrap();
        assert_eq!(v, Value::List(vec![Value::Integer(1), Value::Integer(2)]));
    }
}
