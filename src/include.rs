// ABOUTME: Resolves xacro:include filenames (with optional globbing) and splices results (§4.3)

use crate::error::{ContextError, Diagnostic, XacroError};
use crate::lexer::evaluate_text;
use crate::macros::MacroTable;
use crate::scope::Scope;
use crate::xmltree::{Document, Node, NodeId};
use std::path::{Path, PathBuf};

const GLOB_METACHARS: &[char] = &['*', '?', '['];

/// Resolves `filename` (already raw attribute text) against `base_dir`,
/// expanding and sorting if it contains glob metacharacters, otherwise
/// treating it as a single path (§4.3).
fn resolve_paths(pattern: &str, base_dir: &Path) -> Result<Vec<PathBuf>, ContextError> {
    let candidate = if Path::new(pattern).is_absolute() {
        PathBuf::from(pattern)
    } else {
        base_dir.join(pattern)
    };

    if has_glob_chars(pattern) {
        let pattern_str = candidate.to_string_lossy().into_owned();
        let mut matches: Vec<PathBuf> = glob::glob(&pattern_str)
            .map_err(|e| ContextError::new(XacroError::IncludeFailure(e.to_string())))?
            .filter_map(Result::ok)
            .collect();
        matches.sort();
        Ok(matches)
    } else {
        Ok(vec![candidate])
    }
}

fn has_glob_chars(s: &str) -> bool {
    s.chars().any(|c| GLOB_METACHARS.contains(&c))
}

/// Processes one `xacro:include` element: resolves its files, evaluates
/// each included document's root into freshly parsed nodes, and returns the
/// flat list of top-level children to splice at the include element's
/// position. Namespace declarations on each included root are lifted onto
/// `splice_target` (the include element's parent), warning on conflicts.
#[allow(clippy::too_many_arguments)]
pub fn process_include(
    doc: &mut Document,
    splice_target: NodeId,
    filename_raw: &str,
    ns: Option<&str>,
    optional: bool,
    scope: &Scope,
    macros: &mut MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
    depth: usize,
) -> Result<Vec<NodeId>, ContextError> {
    let resolved_name = evaluate_text(filename_raw, scope)?.stringify();
    let base_dir = scope
        .context()
        .borrow()
        .current_file()
        .and_then(|f| Path::new(f).parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let paths = resolve_paths(&resolved_name, &base_dir)?;
    let mut spliced = Vec::new();

    for path in paths {
        if !path.is_file() {
            if optional {
                continue;
            }
            return Err(ContextError::new(XacroError::IncludeFailure(format!(
                "{}: not found",
                path.display()
            ))));
        }

        let source = std::fs::read_to_string(&path).map_err(|e| {
            ContextError::new(XacroError::IncludeFailure(format!("{}: {e}", path.display())))
        })?;
        let mut included = crate::xmlio::parse(&source)?;
        let root = included.root.ok_or_else(|| {
            ContextError::new(XacroError::IncludeFailure(format!(
                "{}: empty document",
                path.display()
            )))
        })?;

        scope.context().borrow_mut().push_file(path.display().to_string());
        scope.context().borrow_mut().record_include(path.clone());

        let (eval_scope, eval_macros): (Scope, &mut MacroTable) = match ns {
            Some(ns) => (scope.child(), macros.namespace(ns)),
            None => (scope.child(), macros),
        };

        let result = crate::walker::walk_element(&mut included, root, &eval_scope, eval_macros, diagnostics, depth + 1);
        scope.context().borrow_mut().pop_file();
        result?;

        lift_namespaces(doc, splice_target, &included, root, scope);

        let children = included.children_of(root).to_vec();
        for child in children {
            let moved = move_subtree(doc, &included, child);
            spliced.push(moved);
        }
    }

    Ok(spliced)
}

/// Copies `id` (and its descendants) from `src` into `dst`, since the two
/// documents have independent arenas.
fn move_subtree(dst: &mut Document, src: &Document, id: NodeId) -> NodeId {
    match src.get(id) {
        Node::Text(t) => dst.push(Node::Text(t.clone())),
        Node::Comment(t) => dst.push(Node::Comment(t.clone())),
        Node::CData(t) => dst.push(Node::CData(t.clone())),
        Node::Element(el) => {
            let children: Vec<NodeId> = el
                .children
                .iter()
                .map(|&c| move_subtree(dst, src, c))
                .collect();
            dst.push(Node::Element(crate::xmltree::Element {
                tag: el.tag.clone(),
                attrs: el.attrs.clone(),
                namespaces: el.namespaces.clone(),
                children,
            }))
        }
    }
}

/// Lifts the included root's namespace declarations onto `target`'s parent
/// element, warning (first definition wins) on a conflicting redeclaration
/// of the same prefix (§4.3, §9).
fn lift_namespaces(
    doc: &mut Document,
    target: NodeId,
    included: &Document,
    included_root: NodeId,
    scope: &Scope,
) {
    let decls = match included.get(included_root) {
        Node::Element(e) => e.namespaces.clone(),
        _ => return,
    };
    if decls.is_empty() {
        return;
    }
    let mut warnings = Vec::new();
    if let Node::Element(target_el) = doc.get_mut(target) {
        for (prefix, uri) in decls {
            match target_el.namespaces.iter().find(|(p, _)| *p == prefix) {
                Some((_, existing_uri)) if *existing_uri != uri => {
                    warnings.push(format!(
                        "conflicting xmlns{} declaration: keeping `{existing_uri}`, dropping `{uri}`",
                        prefix.as_deref().map(|p| format!(":{p}")).unwrap_or_default()
                    ));
                }
                Some(_) => {}
                None => target_el.namespaces.push((prefix, uri)),
            }
        }
    }
    for warning in warnings {
        scope.context().borrow_mut().warn(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_pattern_is_detected() {
        assert!(has_glob_chars("parts/*.xacro"));
        assert!(!has_glob_chars("parts/wheel.xacro"));
    }
}
