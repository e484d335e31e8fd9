// ABOUTME: Recursive in-place tree walker implementing the six evaluation steps (§4.4)

use crate::directives;
use crate::error::{ContextError, Diagnostic, XacroError};
use crate::lexer::evaluate_text;
use crate::macros::MacroTable;
use crate::scope::Scope;
use crate::xmltree::{Document, Node, NodeId};

fn check_depth(scope: &Scope, depth: usize) -> Result<(), ContextError> {
    let max_depth = scope.context().borrow().max_depth;
    if depth > max_depth {
        Err(ContextError::new(XacroError::RecursionLimit(max_depth)))
    } else {
        Ok(())
    }
}

fn evaluate_attrs(doc: &mut Document, element: NodeId, scope: &Scope) -> Result<(), ContextError> {
    let attrs = doc
        .get(element)
        .as_element()
        .map(|e| e.attrs.clone())
        .unwrap_or_default();

    let mut kept = Vec::with_capacity(attrs.len());
    for (name, value) in attrs {
        if name.prefix.as_deref() == Some("xacro") {
            continue; // consumed by the directive that owns this attribute
        }
        let evaluated = evaluate_text(&value, scope)
            .map_err(|e| e.with_suffix(format!("@{name}=\"{value}\"")))?
            .stringify();
        kept.push((name, evaluated));
    }
    if let Some(element) = doc.get_mut(element).as_element_mut() {
        element.attrs = kept;
    }
    Ok(())
}

/// Evaluates `element`'s own attributes and namespace declarations, then
/// recurses into its children. The entry point for both the top-level
/// document root and every plain (non-directive) element encountered while
/// walking children.
pub fn walk_element(
    doc: &mut Document,
    element: NodeId,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<(), ContextError> {
    check_depth(scope, depth)?;
    evaluate_attrs(doc, element, scope)?;
    directives::strip_namespace_decls(doc, element);
    walk_children(doc, element, scope, macros, diagnostics, depth)
}

/// Walks `parent`'s existing children in order, evaluating text and
/// comments, dispatching directive elements, and recursing into plain
/// elements — then installs the rebuilt child list on `parent`.
pub fn walk_children(
    doc: &mut Document,
    parent: NodeId,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<(), ContextError> {
    check_depth(scope, depth)?;
    let children = doc.children_of(parent).to_vec();
    let mut eval_comments = false;
    let mut result: Vec<NodeId> = Vec::with_capacity(children.len());

    for child in children {
        match doc.get(child) {
            Node::Text(_) => {
                let text = match doc.get(child) {
                    Node::Text(t) => t.clone(),
                    _ => unreachable!(),
                };
                let evaluated = evaluate_text(&text, scope)?.stringify();
                if !evaluated.trim().is_empty() {
                    eval_comments = false;
                }
                *doc.get_mut(child) = Node::Text(evaluated);
                result.push(child);
            }
            Node::Comment(_) => {
                let text = match doc.get(child) {
                    Node::Comment(t) => t.clone(),
                    _ => unreachable!(),
                };
                if text.contains("xacro:eval-comments") {
                    eval_comments = !text.contains("xacro:eval-comments:off");
                    // the pragma comment itself is dropped from the output.
                } else if eval_comments {
                    let evaluated = evaluate_text(&text, scope)?.stringify();
                    *doc.get_mut(child) = Node::Comment(evaluated);
                    result.push(child);
                } else {
                    result.push(child);
                }
            }
            Node::CData(_) => {
                eval_comments = false;
                result.push(child);
            }
            Node::Element(_) => {
                eval_comments = false;
                if directives::is_macro_tag(doc, child) {
                    splice_housekeeping(doc, &mut result);
                    let replacement =
                        directives::dispatch(doc, child, parent, scope, macros, diagnostics, depth)?;
                    result.extend(replacement);
                } else {
                    walk_element(doc, child, scope, macros, diagnostics, depth + 1)?;
                    result.push(child);
                }
            }
        }
    }

    if let Node::Element(element) = doc.get_mut(parent) {
        element.children = result;
    }
    Ok(())
}

fn is_single_newline_whitespace(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_whitespace) && text.matches('\n').count() <= 1
}

/// Before splicing a directive's expansion into place, walks backward over
/// the already-finalized siblings removing any run of comment nodes
/// (optionally separated by a single-newline whitespace text node), then
/// appends a two-newline sentinel text node so a later splice's backward
/// scan stops here instead of reaching past this point (§4.4 step 6).
fn splice_housekeeping(doc: &mut Document, result: &mut Vec<NodeId>) {
    loop {
        if result.is_empty() {
            break;
        }
        let mut idx = result.len() - 1;
        if let Node::Text(t) = doc.get(result[idx]) {
            if is_single_newline_whitespace(t) {
                if idx == 0 {
                    break;
                }
                idx -= 1;
            } else {
                break;
            }
        }
        if matches!(doc.get(result[idx]), Node::Comment(_)) {
            result.remove(idx);
        } else {
            break;
        }
    }
    let sentinel = doc.push(Node::Text("\n\n".to_string()));
    result.push(sentinel);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::new_shared;
    use crate::xmltree::{Element, QName};

    fn push_text(doc: &mut Document, text: &str) -> NodeId {
        doc.push(Node::Text(text.to_string()))
    }

    fn push_comment(doc: &mut Document, text: &str) -> NodeId {
        doc.push(Node::Comment(text.to_string()))
    }

    fn push_element(doc: &mut Document, tag: &str, children: Vec<NodeId>) -> NodeId {
        doc.push(Node::Element(Element {
            tag: QName::parse(tag),
            attrs: Vec::new(),
            namespaces: Vec::new(),
            children,
        }))
    }

    #[test]
    fn plain_text_is_evaluated_in_place() {
        let mut doc = Document::new();
        let text = push_text(&mut doc, "n=${n}");
        let root = push_element(&mut doc, "robot", vec![text]);
        let scope = Scope::root_with_context(new_shared());
        let mut diags = Vec::new();
        scope.insert("n", "3", true, &mut diags);
        let mut macros = MacroTable::new();
        walk_element(&mut doc, root, &scope, &mut macros, &mut diags, 0).unwrap();
        match doc.get(text) {
            Node::Text(t) => assert_eq!(t, "n=3"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn eval_comments_pragma_toggles_and_is_dropped() {
        let mut doc = Document::new();
        let pragma_on = push_comment(&mut doc, "xacro:eval-comments");
        let live = push_comment(&mut doc, "value is ${n}");
        let pragma_off = push_comment(&mut doc, "xacro:eval-comments:off");
        let frozen = push_comment(&mut doc, "value is ${n}");
        let root = push_element(&mut doc, "robot", vec![pragma_on, live, pragma_off, frozen]);
        let scope = Scope::root_with_context(new_shared());
        let mut diags = Vec::new();
        scope.insert("n", "7", true, &mut diags);
        let mut macros = MacroTable::new();
        walk_element(&mut doc, root, &scope, &mut macros, &mut diags, 0).unwrap();
        let remaining = doc.children_of(root).to_vec();
        assert_eq!(remaining.len(), 2);
        match doc.get(remaining[0]) {
            Node::Comment(t) => assert_eq!(t, "value is 7"),
            other => panic!("expected evaluated comment, got {other:?}"),
        }
        match doc.get(remaining[1]) {
            Node::Comment(t) => assert_eq!(t, "value is ${n}"),
            other => panic!("expected frozen comment, got {other:?}"),
        }
    }

    #[test]
    fn splice_housekeeping_removes_adjacent_comment_run() {
        let mut doc = Document::new();
        let c1 = push_comment(&mut doc, "doc comment one");
        let ws = push_text(&mut doc, "\n");
        let c2 = push_comment(&mut doc, "doc comment two");
        let mut result = vec![c1, ws, c2];
        splice_housekeeping(&mut doc, &mut result);
        assert!(result.iter().all(|&id| !matches!(doc.get(id), Node::Comment(_))));
        match doc.get(*result.last().unwrap()) {
            Node::Text(t) => assert_eq!(t, "\n\n"),
            other => panic!("expected sentinel text node, got {other:?}"),
        }
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let ctx = new_shared();
        ctx.borrow_mut().max_depth = 2;
        let scope = Scope::root_with_context(ctx);
        let mut doc = Document::new();
        let root = push_element(&mut doc, "robot", vec![]);
        let mut macros = MacroTable::new();
        let mut diags = Vec::new();
        let err = walk_element(&mut doc, root, &scope, &mut macros, &mut diags, 3).unwrap_err();
        assert!(matches!(err.kind, XacroError::RecursionLimit(2)));
    }
}
