// ABOUTME: Handlers for the ten macro-namespace directive elements (§4.3)

use crate::error::{ContextError, Diagnostic, XacroError};
use crate::lexer::evaluate_text;
use crate::macros::{BlockKind, Macro, MacroTable};
use crate::scope::Scope;
use crate::value::Value;
use crate::xmltree::{Document, Element, Node, NodeId, QName};

pub fn is_macro_tag(doc: &Document, el: NodeId) -> bool {
    matches!(doc.get(el), Node::Element(e) if e.tag.prefix.as_deref() == Some("xacro"))
}

fn local_name(doc: &Document, el: NodeId) -> Option<String> {
    match doc.get(el) {
        Node::Element(e) if e.tag.prefix.as_deref() == Some("xacro") => Some(e.tag.local.clone()),
        _ => None,
    }
}

pub fn get_attr(doc: &Document, el: NodeId, name: &str) -> Option<String> {
    doc.get(el).as_element().and_then(|e| {
        e.attrs
            .iter()
            .find(|(q, _)| q.prefix.is_none() && q.local == name)
            .map(|(_, v)| v.clone())
    })
}

fn take_attr(doc: &mut Document, el: NodeId, name: &str) -> Option<String> {
    let element = doc.get_mut(el).as_element_mut()?;
    let pos = element
        .attrs
        .iter()
        .position(|(q, _)| q.prefix.is_none() && q.local == name)?;
    Some(element.attrs.remove(pos).1)
}

fn set_attr(doc: &mut Document, el: NodeId, name: &str, value: String) {
    if let Some(element) = doc.get_mut(el).as_element_mut() {
        if let Some(existing) = element.attrs.iter_mut().find(|(q, _)| q.prefix.is_none() && q.local == name) {
            existing.1 = value;
        } else {
            element.attrs.push((QName::new(name.to_string()), value));
        }
    }
}

pub(crate) fn strip_namespace_decls(doc: &mut Document, el: NodeId) {
    if let Some(element) = doc.get_mut(el).as_element_mut() {
        element.namespaces.retain(|(p, _)| p.as_deref() != Some("xacro"));
    }
}

fn valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.starts_with(|c: char| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !name.starts_with("__")
}

fn boolean_of(text: &str) -> Result<bool, ContextError> {
    match text {
        "true" | "True" => Ok(true),
        "false" | "False" => Ok(false),
        other => other
            .parse::<i64>()
            .map(|n| n != 0)
            .map_err(|_| ContextError::new(XacroError::BadConditional(text.to_string()))),
    }
}

/// Dispatches a single child element of the macro namespace. Returns the
/// nodes that should replace it in the parent's child list (empty for
/// directives that bind state and vanish).
#[allow(clippy::too_many_arguments)]
pub fn dispatch(
    doc: &mut Document,
    el: NodeId,
    parent: NodeId,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<Vec<NodeId>, ContextError> {
    let Some(local) = local_name(doc, el) else {
        // Only called by the walker on `xacro:`-prefixed elements.
        return Ok(vec![el]);
    };

    match local.as_str() {
        "property" => {
            property(doc, el, scope, diagnostics)?;
            Ok(Vec::new())
        }
        "macro" => {
            define_macro(doc, el, macros, diagnostics)?;
            Ok(Vec::new())
        }
        "include" => {
            let filename = get_attr(doc, el, "filename")
                .ok_or_else(|| ContextError::new(XacroError::BadAttribute {
                    directive: "include".into(),
                    attribute: "filename".into(),
                }))?;
            let ns = get_attr(doc, el, "ns");
            let optional = get_attr(doc, el, "optional")
                .map(|v| boolean_of(&v))
                .transpose()?
                .unwrap_or(false);
            crate::include::process_include(
                doc,
                parent,
                &filename,
                ns.as_deref(),
                optional,
                scope,
                macros,
                diagnostics,
                depth,
            )
        }
        "if" | "unless" => conditional(doc, el, scope, macros, diagnostics, depth, local == "unless"),
        "insert_block" => insert_block(doc, el, scope, macros, diagnostics, depth),
        "arg" => {
            arg_directive(doc, el, scope)?;
            Ok(Vec::new())
        }
        "element" => rename_element(doc, el, parent, scope, macros, diagnostics, depth),
        "attribute" => {
            attribute_directive(doc, el, parent, scope)?;
            Ok(Vec::new())
        }
        "call" => call_directive(doc, el, parent, scope, macros, diagnostics, depth),
        name => invoke_macro(doc, el, name, scope, macros, diagnostics, depth),
    }
}

fn property(doc: &mut Document, el: NodeId, scope: &Scope, diagnostics: &mut Vec<Diagnostic>) -> Result<(), ContextError> {
    let raw_name = get_attr(doc, el, "name")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "property".into(), attribute: "name".into() }))?;
    let name = evaluate_text(&raw_name, scope)?.stringify();
    if !valid_identifier(&name) {
        return Err(ContextError::new(XacroError::BadName(name)));
    }

    let value_attr = get_attr(doc, el, "value");
    let default_attr = get_attr(doc, el, "default");
    let remove_attr = get_attr(doc, el, "remove").unwrap_or_else(|| "false".to_string());
    let remove = boolean_of(&evaluate_text(&remove_attr, scope)?.stringify())?;
    let scope_attr = get_attr(doc, el, "scope");
    let lazy_raw = get_attr(doc, el, "lazy_eval").unwrap_or_else(|| "true".to_string());
    let mut lazy = boolean_of(&evaluate_text(&lazy_raw, scope)?.stringify())?;

    if [value_attr.is_some(), default_attr.is_some(), remove].iter().filter(|b| **b).count() > 1 {
        return Err(ContextError::new(XacroError::BadAttribute {
            directive: "property".into(),
            attribute: "value/default/remove".into(),
        }));
    }

    let target = match scope_attr.as_deref() {
        Some("global") => {
            lazy = false;
            scope.top_non_root()
        }
        Some("parent") => {
            lazy = false;
            match scope.parent() {
                Some(p) => p.clone(),
                None => {
                    diagnostics.push(Diagnostic { message: format!("{name}: no parent scope"), file_stack: Vec::new() });
                    return Ok(());
                }
            }
        }
        _ => scope.clone(),
    };

    if remove {
        target.delete(&name, diagnostics);
        return Ok(());
    }

    if let Some(default) = &default_attr {
        if target.has(&name) {
            return Ok(());
        }
        target.insert(&name, default, lazy, diagnostics);
        return Ok(());
    }

    if let Some(value) = &value_attr {
        target.insert(&name, value, lazy, diagnostics);
        return Ok(());
    }

    // Block binding: `**name` holds the element itself for `insert_block`.
    target.insert_value(&format!("**{name}"), Value::NodeRef(el));
    Ok(())
}

fn define_macro(doc: &mut Document, el: NodeId, macros: &mut MacroTable, diagnostics: &mut Vec<Diagnostic>) -> Result<(), ContextError> {
    let name = get_attr(doc, el, "name")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "macro".into(), attribute: "name".into() }))?;
    if name == "call" {
        return Err(ContextError::new(XacroError::BadName(name)));
    }
    if name.contains('.') {
        return Err(ContextError::new(XacroError::BadName(name)));
    }
    let name = name.strip_prefix("xacro:").map(str::to_string).unwrap_or(name);

    let params_attr = get_attr(doc, el, "params").unwrap_or_default();
    let params = crate::macros::parse_params(&params_attr)?;

    macros.define(name.clone(), Macro { name, params, body: el }, diagnostics);
    Ok(())
}

fn conditional(
    doc: &mut Document,
    el: NodeId,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
    is_unless: bool,
) -> Result<Vec<NodeId>, ContextError> {
    let raw = get_attr(doc, el, "value")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "if".into(), attribute: "value".into() }))?;
    let evaluated = evaluate_text(&raw, scope)?.stringify();
    let mut keep = boolean_of(&evaluated)?;
    if is_unless {
        keep = !keep;
    }
    if !keep {
        return Ok(Vec::new());
    }
    crate::walker::walk_children(doc, el, scope, macros, diagnostics, depth + 1)?;
    Ok(doc.children_of(el).to_vec())
}

fn insert_block(
    doc: &mut Document,
    el: NodeId,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<Vec<NodeId>, ContextError> {
    let name = get_attr(doc, el, "name")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "insert_block".into(), attribute: "name".into() }))?;

    if let Ok(Value::NodeRef(block)) = scope.get(&format!("**{name}")) {
        let clone = doc.clone_subtree(block);
        crate::walker::walk_element(doc, clone, scope, macros, diagnostics, depth + 1)?;
        return Ok(doc.children_of(clone).to_vec());
    }
    if let Ok(Value::NodeRef(block)) = scope.get(&format!("*{name}")) {
        let clone = doc.clone_subtree(block);
        crate::walker::walk_element(doc, clone, scope, macros, diagnostics, depth + 1)?;
        return Ok(vec![clone]);
    }
    Err(ContextError::new(XacroError::EvaluationFailure(format!(
        "undefined block \"{name}\""
    ))))
}

fn arg_directive(doc: &mut Document, el: NodeId, scope: &Scope) -> Result<(), ContextError> {
    let name = get_attr(doc, el, "name")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "arg".into(), attribute: "name".into() }))?;
    let default = get_attr(doc, el, "default").unwrap_or_default();
    let ctx = scope.context().clone();
    let already_set = ctx.borrow().subst_args.contains_key(&name);
    if !already_set {
        let value = evaluate_text(&default, scope)?.stringify();
        ctx.borrow_mut().subst_args.insert(name, value);
    }
    Ok(())
}

fn rename_element(
    doc: &mut Document,
    el: NodeId,
    parent: NodeId,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<Vec<NodeId>, ContextError> {
    let raw = take_attr(doc, el, "xacro:name")
        .or_else(|| get_attr(doc, el, "name"))
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "element".into(), attribute: "xacro:name".into() }))?;
    let new_name = evaluate_text(&raw, scope)?.stringify();
    if new_name.is_empty() {
        return Err(ContextError::new(XacroError::EvaluationFailure(
            "xacro:element: empty name".into(),
        )));
    }
    if let Some(element) = doc.get_mut(el).as_element_mut() {
        element.tag = QName::parse(&new_name);
    }
    dispatch(doc, el, parent, scope, macros, diagnostics, depth)
}

fn attribute_directive(doc: &mut Document, el: NodeId, parent: NodeId, scope: &Scope) -> Result<(), ContextError> {
    let name_raw = get_attr(doc, el, "name")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "attribute".into(), attribute: "name".into() }))?;
    let value_raw = get_attr(doc, el, "value")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "attribute".into(), attribute: "value".into() }))?;
    let name = evaluate_text(&name_raw, scope)?.stringify();
    if name.is_empty() {
        return Err(ContextError::new(XacroError::EvaluationFailure(
            "xacro:attribute: empty name".into(),
        )));
    }
    let value = evaluate_text(&value_raw, scope)?.stringify();
    set_attr(doc, parent, &name, value);
    Ok(())
}

fn call_directive(
    doc: &mut Document,
    el: NodeId,
    parent: NodeId,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<Vec<NodeId>, ContextError> {
    let raw = take_attr(doc, el, "macro")
        .ok_or_else(|| ContextError::new(XacroError::BadAttribute { directive: "call".into(), attribute: "macro".into() }))?;
    let name = evaluate_text(&raw, scope)?.stringify();
    if let Some(element) = doc.get_mut(el).as_element_mut() {
        element.tag = QName::with_prefix("xacro", name.clone());
    }
    invoke_macro(doc, el, &name, scope, macros, diagnostics, depth)
}

fn invoke_macro(
    doc: &mut Document,
    el: NodeId,
    name: &str,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<Vec<NodeId>, ContextError> {
    let definition = macros
        .resolve(name)
        .cloned()
        .ok_or_else(|| ContextError::new(XacroError::UnknownMacro(name.to_string())))?;

    scope.context().borrow_mut().push_macro(definition.name.clone());
    let result = invoke_macro_inner(doc, el, &definition, scope, macros, diagnostics, depth);
    scope.context().borrow_mut().pop_macro();
    result.map_err(|e| e.push_frame(definition.name.clone()))
}

fn invoke_macro_inner(
    doc: &mut Document,
    el: NodeId,
    definition: &Macro,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<Vec<NodeId>, ContextError> {
    let call_scope = scope.child();
    let mut remaining: Vec<&str> = definition.params.iter().map(|p| p.name.as_str()).collect();

    // (i) eager binding of caller attributes.
    let call_attrs: Vec<(String, String)> = doc
        .get(el)
        .as_element()
        .map(|e| e.attrs.iter().map(|(q, v)| (q.local.clone(), v.clone())).collect())
        .unwrap_or_default();
    for (attr_name, attr_value) in &call_attrs {
        if !remaining.contains(&attr_name.as_str()) {
            return Err(ContextError::new(XacroError::BadArity(format!(
                "{}: unknown parameter \"{attr_name}\"",
                definition.name
            ))));
        }
        remaining.retain(|p| p != attr_name);
        // attribute text is evaluated against the caller's scope, not the
        // macro body's scope, then stored as an already-evaluated value.
        let evaluated = evaluate_text(attr_value, scope)?;
        call_scope.insert_value(attr_name, evaluated);
    }

    // (ii) the call site's own content is evaluated in the caller's scope
    // before block parameters are bound.
    crate::walker::walk_children(doc, el, scope, macros, diagnostics, depth + 1)?;

    // (iii) remaining block parameters consume the call site's children in order.
    let mut call_children = doc.children_of(el).to_vec();
    let mut child_cursor = 0usize;
    let block_params: Vec<usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            definition
                .params
                .iter()
                .find(|p| &p.name.as_str() == name)
                .map(|p| p.block != BlockKind::None)
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();
    let mut consumed_names = Vec::new();
    for idx in block_params {
        let param_name = remaining[idx];
        let param_def = definition.params.iter().find(|p| p.name == param_name).unwrap();
        match param_def.block {
            BlockKind::Single => {
                let next = (child_cursor..call_children.len())
                    .find(|&i| matches!(doc.get(call_children[i]), Node::Element(_)));
                let Some(i) = next else {
                    return Err(ContextError::new(XacroError::BadArity(format!(
                        "{}: not enough blocks for \"{param_name}\"",
                        definition.name
                    ))));
                };
                call_scope.insert_value(&format!("*{param_name}"), Value::NodeRef(call_children[i]));
                child_cursor = i + 1;
                consumed_names.push(param_name.to_string());
            }
            BlockKind::Multi => {
                let wrapper = doc.push(Node::Element(Element {
                    tag: QName::new("content"),
                    attrs: Vec::new(),
                    namespaces: Vec::new(),
                    children: call_children[child_cursor..].to_vec(),
                }));
                call_scope.insert_value(&format!("**{param_name}"), Value::NodeRef(wrapper));
                child_cursor = call_children.len();
                consumed_names.push(param_name.to_string());
            }
            BlockKind::None => unreachable!(),
        }
    }
    remaining.retain(|p| !consumed_names.contains(&p.to_string()));

    if child_cursor < call_children.len()
        && call_children[child_cursor..].iter().any(|&c| matches!(doc.get(c), Node::Element(_)))
    {
        return Err(ContextError::new(XacroError::BadArity(format!(
            "{}: unused block content",
            definition.name
        ))));
    }
    call_children.clear();

    // (iv) remaining non-block parameters receive their defaults.
    for param_name in remaining.clone() {
        let param_def = definition.params.iter().find(|p| p.name == param_name).unwrap();
        if param_def.block != BlockKind::None {
            return Err(ContextError::new(XacroError::BadArity(format!(
                "{}: missing required block \"{param_name}\"",
                definition.name
            ))));
        }
        let value = if param_def.forward && scope.has(param_name) {
            scope.get(param_name)?
        } else if let Some(default) = &param_def.default {
            evaluate_text(default, scope)?
        } else {
            return Err(ContextError::new(XacroError::BadArity(format!(
                "{}: missing required parameter \"{param_name}\"",
                definition.name
            ))));
        };
        call_scope.insert_value(param_name, value);
    }

    let mut body_macros = macros.clone();
    let body = doc.clone_subtree(definition.body);
    crate::walker::walk_children(doc, body, &call_scope, &mut body_macros, diagnostics, depth + 1)?;
    strip_namespace_decls(doc, body);
    Ok(doc.children_of(body).to_vec())
}
