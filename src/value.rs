// ABOUTME: Value type produced by expression evaluation and property binding

use crate::xmltree::NodeId;
use std::fmt;

/// The tagged sum from §3: `Integer | Float | Boolean | Text | NodeRef`,
/// plus the `List`/`Map` collections the `python`/builtin namespaces need to
/// represent `list(...)`, `dict(...)`, `range(...)`, `zip(...)` results.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    NodeRef(NodeId),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Boolean(_) => "bool",
            Value::Text(_) => "str",
            Value::NodeRef(_) => "node",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
        }
    }

    /// The `bool(int(x))` coercion used by `if`/`unless` (§4.3) once the
    /// `"true"/"false"` literal forms have been ruled out.
    pub fn truthy(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Integer(n) => Some(*n != 0),
            Value::Float(n) => Some(*n != 0.0),
            Value::Text(s) => s.parse::<i64>().ok().map(|n| n != 0),
            Value::List(items) => Some(!items.is_empty()),
            Value::Map(entries) => Some(!entries.is_empty()),
            Value::NodeRef(_) => Some(true),
        }
    }

    /// Stringifies a Value the way text-evaluation joins multiple tokens
    /// (§4.1): every tag uses its own display, never a debug repr.
    pub fn stringify(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{n:.1}")
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Text(s) => write!(f, "{s}"),
            Value::NodeRef(id) => write!(f, "<node#{}>", id.index()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Literal-coercion ladder from §3: "int -> float -> boolean -> keep-as-text,
/// in that order", except that a literal containing an underscore is never
/// coerced (it would otherwise be silently accepted by numeric parsing and
/// the underscore stripped).
pub fn coerce_literal(raw: &str) -> Value {
    if raw.contains('_') {
        return Value::Text(raw.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    match raw {
        "true" | "True" => return Value::Boolean(true),
        "false" | "False" => return Value::Boolean(false),
        _ => {}
    }
    Value::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_coerces() {
        assert_eq!(coerce_literal("42"), Value::Integer(42));
    }

    #[test]
    fn float_coerces() {
        assert_eq!(coerce_literal("0.5"), Value::Float(0.5));
    }

    #[test]
    fn boolean_coerces() {
        assert_eq!(coerce_literal("true"), Value::Boolean(true));
        assert_eq!(coerce_literal("False"), Value::Boolean(false));
    }

    #[test]
    fn underscore_literal_is_not_coerced() {
        assert_eq!(coerce_literal("1_000"), Value::Text("1_000".to_string()));
    }

    #[test]
    fn plain_text_falls_through() {
        assert_eq!(coerce_literal("hello"), Value::Text("hello".to_string()));
    }

    #[test]
    fn display_formats_whole_floats_with_one_decimal() {
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }
}
