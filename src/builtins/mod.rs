//! Symbols reachable from `${...}` expressions (§4.1): the numeric
//! primitives exposed at the top level, the `math` namespace (also
//! aliased bare for backward compatibility), the `python` namespace of
//! additional builtins, and the `xacro` namespace of processor hooks.
//!
//! Functions are registered into one flat table keyed by their exposed
//! name (`"sqrt"`, `"math.sqrt"`, `"python.sorted"`, `"xacro.arg"`, ...)
//! rather than nested per-namespace maps, since `expr.rs` already resolves
//! `ns.name` into a single qualified string before lookup.

use crate::context::SharedContext;
use crate::error::ContextError;
use crate::value::Value;
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub mod arithmetic;
pub mod comparison;
pub mod lists;
pub mod types;
pub mod xacro_ns;

#[derive(Clone)]
pub enum Builtin {
    Pure(fn(&[Value]) -> Result<Value, ContextError>),
    Ctx(fn(&[Value], &SharedContext) -> Result<Value, ContextError>),
    Const(Value),
}

static TABLE: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    let mut table = HashMap::new();
    types::register(&mut table);
    arithmetic::register(&mut table);
    comparison::register(&mut table);
    lists::register(&mut table);
    xacro_ns::register(&mut table);
    table
});

pub fn lookup_builtin(name: &str) -> Option<Builtin> {
    TABLE.get(name).cloned()
}

pub(crate) fn arg_f64(args: &[Value], idx: usize, fname: &str) -> Result<f64, ContextError> {
    args.get(idx)
        .and_then(|v| match v {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        })
        .ok_or_else(|| {
            ContextError::new(crate::error::XacroError::EvaluationFailure(format!(
                "{fname}: expected a numeric argument at position {idx}"
            )))
        })
}

pub(crate) fn arity_error(fname: &str, expected: &str) -> ContextError {
    ContextError::new(crate::error::XacroError::BadArity(format!(
        "{fname}: expected {expected} argument(s)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_and_namespaced_math_agree() {
        assert!(matches!(lookup_builtin("sqrt"), Some(Builtin::Pure(_))));
        assert!(matches!(lookup_builtin("math.sqrt"), Some(Builtin::Pure(_))));
    }

    #[test]
    fn python_namespace_functions_are_not_exposed_bare() {
        assert!(lookup_builtin("sorted").is_none());
        assert!(lookup_builtin("python.sorted").is_some());
    }

    #[test]
    fn unknown_symbol_is_none() {
        assert!(lookup_builtin("__class__").is_none());
    }
}
