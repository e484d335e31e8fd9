// ABOUTME: YAML loading for xacro.load_yaml, with unit-tag conversion (§4.7)

use crate::error::{ContextError, XacroError};
use crate::value::Value;
use std::path::Path;

/// Multiplier applied to a scalar carrying one of the six recognized unit
/// tags. `radians` and `meters` are the identity (the expression language's
/// own base units); the rest convert into them.
fn unit_factor(tag: &str) -> Option<f64> {
    match tag.trim_start_matches('!') {
        "radians" => Some(1.0),
        "degrees" => Some(std::f64::consts::PI / 180.0),
        "meters" => Some(1.0),
        "millimeters" => Some(0.001),
        "foot" => Some(0.3048),
        "inches" => Some(0.0254),
        _ => None,
    }
}

/// Loads and converts the YAML document at `path` into a `Value`, applying
/// §4.7's unit-tag conversions before falling back to plain literal
/// coercion for untagged scalars.
pub fn load_yaml(path: &Path) -> Result<Value, ContextError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ContextError::new(XacroError::IncludeFailure(format!(
            "{}: {e}",
            path.display()
        )))
    })?;
    let parsed: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| {
        ContextError::new(XacroError::ParseFailure(format!(
            "{}: {e}",
            path.display()
        )))
    })?;
    convert(&parsed)
}

fn convert(node: &serde_yaml::Value) -> Result<Value, ContextError> {
    match node {
        serde_yaml::Value::Null => Ok(Value::Text(String::new())),
        serde_yaml::Value::Bool(b) => Ok(Value::Boolean(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else {
                Ok(Value::Float(n.as_f64().unwrap_or(0.0)))
            }
        }
        serde_yaml::Value::String(s) => Ok(crate::value::coerce_literal(s)),
        serde_yaml::Value::Sequence(items) => {
            let values = items.iter().map(convert).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => convert(other)?.stringify(),
                };
                entries.push((key, convert(v)?));
            }
            Ok(Value::Map(entries))
        }
        serde_yaml::Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            match unit_factor(&tag) {
                Some(factor) => {
                    let inner = convert(&tagged.value)?;
                    let scalar = match inner {
                        Value::Integer(n) => n as f64,
                        Value::Float(n) => n,
                        _ => {
                            return Err(ContextError::new(XacroError::ParseFailure(format!(
                                "unit tag `{tag}` applied to a non-numeric value"
                            ))))
                        }
                    };
                    Ok(Value::Float(scalar * factor))
                }
                None => convert(&tagged.value),
            }
        }
    }
}
