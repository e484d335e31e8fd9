// ABOUTME: Scoped symbol table with lazy evaluation and cycle detection (§4.2)

use crate::context::{new_shared, SharedContext};
use crate::error::{ContextError, Diagnostic, XacroError};
use crate::value::{coerce_literal, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct Inner {
    bindings: RefCell<HashMap<String, Value>>,
    /// Raw text awaiting re-evaluation; see `Resolve` in §4.2.
    unevaluated: RefCell<HashMap<String, String>>,
    /// Identifiers currently being resolved on this scope, used for cycle
    /// detection. A chain of scopes shares one `resolving` list only through
    /// the root (see `Scope::resolving_path`); each scope otherwise tracks
    /// its own in-flight resolutions, which is sufficient because a cycle
    /// must eventually revisit a name on the scope where it is bound.
    resolving: RefCell<Vec<String>>,
    parent: Option<Scope>,
    is_root: bool,
    /// Shared process-wide state (§5, §9), reachable from lazy resolution
    /// so `${xacro.arg(...)}` and friends work inside property values.
    ctx: SharedContext,
}

/// A chain of scopes (§3 `Scope`). Cheaply cloneable — clones share the same
/// underlying bindings via `Rc`, matching the teacher's `Rc<Environment>`
/// pattern for the macro body's dynamic-scoping parent pointer (§4.3, §9).
#[derive(Clone)]
pub struct Scope(Rc<Inner>);

impl Scope {
    /// Creates a new root (globals) scope with its own default context.
    /// Production code should use `root_with_context` so the scope chain
    /// shares the orchestrator's single `Context`.
    pub fn root() -> Self {
        Scope::root_with_context(new_shared())
    }

    pub fn root_with_context(ctx: SharedContext) -> Self {
        Scope(Rc::new(Inner {
            bindings: RefCell::new(HashMap::new()),
            unevaluated: RefCell::new(HashMap::new()),
            resolving: RefCell::new(Vec::new()),
            parent: None,
            is_root: true,
            ctx,
        }))
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(Inner {
            bindings: RefCell::new(HashMap::new()),
            unevaluated: RefCell::new(HashMap::new()),
            resolving: RefCell::new(Vec::new()),
            parent: Some(self.clone()),
            is_root: false,
            ctx: self.0.ctx.clone(),
        }))
    }

    pub fn context(&self) -> &SharedContext {
        &self.0.ctx
    }

    pub fn is_root(&self) -> bool {
        self.0.is_root
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Lookup (§4.2): walk the chain until `key` is found locally, resolving
    /// lazily-bound text on the scope that owns it.
    pub fn get(&self, key: &str) -> Result<Value, ContextError> {
        if self.0.bindings.borrow().contains_key(key) || self.0.unevaluated.borrow().contains_key(key) {
            return self.resolve(key);
        }
        match &self.0.parent {
            Some(parent) => parent.get(key),
            None => Err(ContextError::new(XacroError::UnknownSymbol(key.to_string()))),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        if self.0.bindings.borrow().contains_key(key) || self.0.unevaluated.borrow().contains_key(key) {
            return true;
        }
        self.0.parent.as_ref().is_some_and(|p| p.has(key))
    }

    /// Resolve (§4.2): re-evaluate unevaluated text in place, with cycle
    /// detection via the `resolving` stack.
    fn resolve(&self, key: &str) -> Result<Value, ContextError> {
        if let Some(raw) = self.0.unevaluated.borrow().get(key).cloned() {
            if self.0.resolving.borrow().contains(&key.to_string()) {
                let mut chain = self.0.resolving.borrow().clone();
                chain.push(key.to_string());
                return Err(ContextError::new(XacroError::CircularDefinition(
                    chain.join(" -> "),
                )));
            }
            self.0.resolving.borrow_mut().push(key.to_string());
            let evaluated = crate::lexer::evaluate_text(&raw, self);
            self.0.resolving.borrow_mut().pop();
            let value = match evaluated? {
                Value::Text(s) => coerce_literal(&s),
                other => other,
            };
            self.0.unevaluated.borrow_mut().remove(key);
            self.0.bindings.borrow_mut().insert(key.to_string(), value.clone());
            return Ok(value);
        }
        Ok(self.0.bindings.borrow().get(key).cloned().unwrap())
    }

    /// Insert (§4.2). `lazy` marks the binding unevaluated when `raw` is
    /// still textual; a write that shadows a root-scope entry from a
    /// non-root scope is allowed but recorded as a diagnostic.
    pub fn insert(&self, key: &str, raw: &str, lazy: bool, diagnostics: &mut Vec<Diagnostic>) {
        if !self.0.is_root && self.shadows_root(key) {
            diagnostics.push(Diagnostic {
                message: format!("property `{key}` shadows a root-scope symbol"),
                file_stack: Vec::new(),
            });
        }
        self.0.bindings.borrow_mut().remove(key);
        self.0.unevaluated.borrow_mut().remove(key);
        // a literal that already coerces to a typed value (e.g. a bare
        // number) is stored directly even when lazy was requested — only a
        // value that's still text after coercion (an expression, or real
        // text) needs deferred re-evaluation.
        match coerce_literal(raw) {
            Value::Text(_) if lazy => {
                self.0.unevaluated.borrow_mut().insert(key.to_string(), raw.to_string());
            }
            value => {
                self.0.bindings.borrow_mut().insert(key.to_string(), value);
            }
        }
    }

    pub fn insert_value(&self, key: &str, value: Value) {
        self.0.unevaluated.borrow_mut().remove(key);
        self.0.bindings.borrow_mut().insert(key.to_string(), value);
    }

    fn shadows_root(&self, key: &str) -> bool {
        let root = self.root_scope();
        root.0.bindings.borrow().contains_key(key) || root.0.unevaluated.borrow().contains_key(key)
    }

    /// Delete (§4.2): removes `key` up the chain but never from the root.
    pub fn delete(&self, key: &str, diagnostics: &mut Vec<Diagnostic>) {
        if self.0.is_root {
            diagnostics.push(Diagnostic {
                message: format!("cannot delete root-scope symbol `{key}`"),
                file_stack: Vec::new(),
            });
            return;
        }
        self.0.bindings.borrow_mut().remove(key);
        self.0.unevaluated.borrow_mut().remove(key);
        if let Some(parent) = &self.0.parent {
            if !parent.0.is_root {
                parent.delete(key, diagnostics);
            }
        }
    }

    /// Top (§4.2): the direct child of root, used by `scope="global"`.
    pub fn top_non_root(&self) -> Scope {
        let mut current = self.clone();
        loop {
            match &current.0.parent {
                Some(parent) if !parent.0.is_root => current = parent.clone(),
                Some(parent) if parent.0.is_root => return current,
                _ => return current,
            }
        }
    }

    fn root_scope(&self) -> Scope {
        let mut current = self.clone();
        while let Some(parent) = current.0.parent.clone() {
            current = parent;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let root = Scope::root();
        let mut diags = Vec::new();
        root.insert("a", "1", false, &mut diags);
        let child = root.child();
        assert_eq!(child.get("a").unwrap(), Value::Integer(1));
    }

    #[test]
    fn missing_symbol_is_an_error() {
        let root = Scope::root();
        assert!(matches!(
            root.get("nope").unwrap_err().kind,
            XacroError::UnknownSymbol(_)
        ));
    }

    #[test]
    fn lazy_property_resolves_on_first_read() {
        let root = Scope::root();
        let mut diags = Vec::new();
        root.insert("w", "0.5", true, &mut diags);
        let value = root.get("w").unwrap();
        assert_eq!(value, Value::Float(0.5));
    }

    #[test]
    fn direct_self_reference_cycle_is_detected() {
        let root = Scope::root();
        let mut diags = Vec::new();
        root.insert("a", "${a}", true, &mut diags);
        let err = root.get("a").unwrap_err();
        assert!(matches!(err.kind, XacroError::CircularDefinition(_)));
    }

    #[test]
    fn two_cycle_is_detected() {
        let root = Scope::root();
        let mut diags = Vec::new();
        root.insert("a", "${b}", true, &mut diags);
        root.insert("b", "${a}", true, &mut diags);
        let err = root.get("a").unwrap_err();
        match err.kind {
            XacroError::CircularDefinition(chain) => {
                assert!(chain.contains('a') && chain.contains('b'));
            }
            other => panic!("expected CircularDefinition, got {other:?}"),
        }
    }

    #[test]
    fn delete_cannot_remove_root_binding() {
        let root = Scope::root();
        let mut diags = Vec::new();
        root.insert("a", "1", false, &mut diags);
        root.delete("a", &mut diags);
        assert!(root.get("a").is_ok());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn delete_removes_through_chain_but_not_root() {
        let root = Scope::root();
        let mut diags = Vec::new();
        root.insert("a", "1", false, &mut diags);
        let child = root.child();
        child.insert("a", "2", false, &mut diags);
        child.delete("a", &mut diags);
        // child's own binding is gone, falls through to root's.
        assert_eq!(child.get("a").unwrap(), Value::Integer(1));
    }

    #[test]
    fn top_non_root_returns_direct_child_of_root() {
        let root = Scope::root();
        let first = root.child();
        let second = first.child();
        let top = second.top_non_root();
        assert!(top.parent().unwrap().is_root());
    }
}
