// ABOUTME: Macro registry with namespace-scoped tables and parameter parsing (§3, §4.3)

use crate::error::{ContextError, Diagnostic, XacroError};
use crate::xmltree::NodeId;
use std::collections::HashMap;

/// Whether a parameter captures its caller's element content rather than
/// binding a text/expression value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Ordinary scalar parameter.
    None,
    /// `*name`: binds the single block content as `**name` in the body scope.
    Single,
    /// `**name`: binds zero or more named block arguments.
    Multi,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// Raw default-expression text (§4.3's grammar: `${…}`, `$(…)`, quoted
    /// strings, bare tokens), evaluated lazily like a property.
    pub default: Option<String>,
    /// `name:=^` / `name:=^|default`: forwarded from the caller's scope
    /// under the same name when present there.
    pub forward: bool,
    pub block: BlockKind,
}

/// Parses a macro's `params` attribute text into an ordered parameter list.
pub fn parse_params(spec: &str) -> Result<Vec<Param>, ContextError> {
    let mut params = Vec::new();
    for token in spec.split_whitespace() {
        if let Some(name) = token.strip_prefix("**") {
            validate_name(name)?;
            params.push(Param {
                name: name.to_string(),
                default: None,
                forward: false,
                block: BlockKind::Multi,
            });
            continue;
        }
        if let Some(name) = token.strip_prefix('*') {
            validate_name(name)?;
            params.push(Param {
                name: name.to_string(),
                default: None,
                forward: false,
                block: BlockKind::Single,
            });
            continue;
        }
        if let Some((name, fallback)) = token.split_once(":=^|") {
            validate_name(name)?;
            params.push(Param {
                name: name.to_string(),
                default: Some(fallback.to_string()),
                forward: true,
                block: BlockKind::None,
            });
            continue;
        }
        if let Some(name) = token.strip_suffix(":=^") {
            validate_name(name)?;
            params.push(Param {
                name: name.to_string(),
                default: None,
                forward: true,
                block: BlockKind::None,
            });
            continue;
        }
        if let Some((name, default)) = token.split_once(":=") {
            validate_name(name)?;
            params.push(Param {
                name: name.to_string(),
                default: Some(default.to_string()),
                forward: false,
                block: BlockKind::None,
            });
            continue;
        }
        if let Some((name, default)) = token.split_once('=') {
            validate_name(name)?;
            params.push(Param {
                name: name.to_string(),
                default: Some(default.to_string()),
                forward: false,
                block: BlockKind::None,
            });
            continue;
        }
        validate_name(token)?;
        params.push(Param {
            name: token.to_string(),
            default: None,
            forward: false,
            block: BlockKind::None,
        });
    }
    Ok(params)
}

fn validate_name(name: &str) -> Result<(), ContextError> {
    let ok = !name.is_empty()
        && !name.contains('.')
        && name.starts_with(|c: char| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !name.starts_with("__")
        && name != "call";
    if ok {
        Ok(())
    } else {
        Err(ContextError::new(XacroError::BadName(name.to_string())))
    }
}

#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub params: Vec<Param>,
    pub body: NodeId,
}

/// A map from qualified macro name to definition, chained into scopes and
/// supporting dotted namespace traversal (§3 "Macro table").
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
    namespaces: HashMap<String, MacroTable>,
}

impl MacroTable {
    pub fn new() -> Self {
        MacroTable::default()
    }

    /// Defines `name` in this table, warning (but not failing) on
    /// redefinition — per §7's recoverable-diagnostics policy.
    pub fn define(&mut self, name: String, macro_def: Macro, diagnostics: &mut Vec<Diagnostic>) {
        if self.macros.contains_key(&name) {
            diagnostics.push(Diagnostic {
                message: format!("macro `{name}` redefined"),
                file_stack: Vec::new(),
            });
        }
        self.macros.insert(name, macro_def);
    }

    /// Creates (or returns) the namespace sub-table for `ns`, used when an
    /// `<xacro:include ns="...">` wants a fresh macro/symbol scope.
    pub fn namespace(&mut self, ns: &str) -> &mut MacroTable {
        self.namespaces.entry(ns.to_string()).or_default()
    }

    /// Resolution per §4.3's invocation rule: try the whole tag name first;
    /// on miss, split at dots and traverse namespace tables.
    pub fn resolve(&self, qualified: &str) -> Option<&Macro> {
        if let Some(m) = self.macros.get(qualified) {
            return Some(m);
        }
        let (head, rest) = qualified.split_once('.')?;
        self.namespaces.get(head)?.resolve(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmltree::{Document, Node, QName};

    fn dummy_body() -> NodeId {
        let mut doc = Document::new();
        doc.push(Node::element(QName::new("link")))
    }

    #[test]
    fn parses_bare_and_default_params() {
        let params = parse_params("a b:=1 c=2").unwrap();
        assert_eq!(params[0].name, "a");
        assert_eq!(params[0].default, None);
        assert_eq!(params[1].default.as_deref(), Some("1"));
        assert_eq!(params[2].default.as_deref(), Some("2"));
    }

    #[test]
    fn parses_forwarded_and_block_params() {
        let params = parse_params("x:=^ y:=^|9 *block **multi").unwrap();
        assert!(params[0].forward && params[0].default.is_none());
        assert!(params[1].forward && params[1].default.as_deref() == Some("9"));
        assert_eq!(params[2].block, BlockKind::Single);
        assert_eq!(params[3].block, BlockKind::Multi);
    }

    #[test]
    fn rejects_call_as_a_param_name() {
        assert!(parse_params("call").is_err());
    }

    #[test]
    fn dotted_lookup_traverses_namespaces() {
        let mut table = MacroTable::new();
        let mut diags = Vec::new();
        table.namespace("wheels").define(
            "front".to_string(),
            Macro {
                name: "front".to_string(),
                params: vec![],
                body: dummy_body(),
            },
            &mut diags,
        );
        assert!(table.resolve("wheels.front").is_some());
        assert!(table.resolve("wheels.back").is_none());
    }

    #[test]
    fn redefinition_emits_a_diagnostic() {
        let mut table = MacroTable::new();
        let mut diags = Vec::new();
        let m = Macro {
            name: "foo".to_string(),
            params: vec![],
            body: dummy_body(),
        };
        table.define("foo".to_string(), m.clone(), &mut diags);
        table.define("foo".to_string(), m, &mut diags);
        assert_eq!(diags.len(), 1);
    }
}
