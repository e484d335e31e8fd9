// ABOUTME: Top-level entry point tying the parser, walker, and serializer together (§4.5)

use crate::context::{new_shared, Verbosity};
use crate::error::{ContextError, Diagnostic, XacroError};
use crate::macros::MacroTable;
use crate::scope::Scope;
use crate::xmltree::{Document, NodeId};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct ProcessOptions {
    pub mappings: HashMap<String, String>,
    pub verbosity: Verbosity,
    pub launch_mode: bool,
    pub banner: bool,
}

pub struct ProcessOutput {
    pub xml: String,
    pub diagnostics: Vec<Diagnostic>,
    pub includes: BTreeSet<PathBuf>,
}

/// Runs the full pipeline on `source` (already read from the input path or
/// stdin): parse, `xacro:targetNamespace` rewrite, walk, serialize. `label`
/// is the name pushed onto the file stack (the input path, or `"<stdin>"`).
pub fn process(source: &str, label: &str, options: ProcessOptions) -> Result<ProcessOutput, ContextError> {
    let ctx = new_shared();
    {
        let mut c = ctx.borrow_mut();
        c.push_file(label.to_string());
        c.verbosity = options.verbosity;
        c.launch_mode = options.launch_mode;
        c.subst_args = options.mappings;
    }

    let mut doc = crate::xmlio::parse(source)?;
    let root = doc
        .root
        .ok_or_else(|| ContextError::new(XacroError::ParseFailure("document has no root element".into())))?;

    rewrite_target_namespace(&mut doc, root);

    let scope = Scope::root_with_context(ctx.clone());
    let mut macros = MacroTable::new();
    let mut diagnostics = Vec::new();

    crate::walker::walk_element(&mut doc, root, &scope, &mut macros, &mut diagnostics, 0)?;

    ctx.borrow_mut().subst_args.clear();

    let mut xml = crate::xmlio::serialize(&doc)?;
    if options.banner {
        xml = format!("{}{}", crate::config::AUTOGENERATED_BANNER, xml);
    }

    let carried = std::mem::take(&mut ctx.borrow_mut().diagnostics);
    diagnostics.extend(carried);
    let includes = ctx.borrow().all_includes.clone();

    Ok(ProcessOutput { xml, diagnostics, includes })
}

/// Moves a root-level `xacro:targetNamespace` attribute onto `xmlns` (§4.5).
fn rewrite_target_namespace(doc: &mut Document, root: NodeId) {
    let value = doc.get(root).as_element().and_then(|e| {
        e.attrs
            .iter()
            .find(|(q, _)| q.prefix.as_deref() == Some("xacro") && q.local == "targetNamespace")
            .map(|(_, v)| v.clone())
    });
    let Some(value) = value else { return };
    if let Some(element) = doc.get_mut(root).as_element_mut() {
        element
            .attrs
            .retain(|(q, _)| !(q.prefix.as_deref() == Some("xacro") && q.local == "targetNamespace"));
        element.namespaces.push((None, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_a_property_substitution() {
        let source = r#"<robot xmlns:xacro="http://ros.org/wiki/xacro">
            <xacro:property name="w" value="0.5"/>
            <link size="${w*2}"/>
        </robot>"#;
        let out = process(source, "test.xacro", ProcessOptions::default()).unwrap();
        assert!(out.xml.contains(r#"size="1.0""#));
    }

    #[test]
    fn target_namespace_is_rewritten_to_xmlns() {
        let source = r#"<robot xmlns:xacro="http://ros.org/wiki/xacro" xacro:targetNamespace="http://example/ns"><link/></robot>"#;
        let out = process(source, "test.xacro", ProcessOptions::default()).unwrap();
        assert!(out.xml.contains(r#"xmlns="http://example/ns""#));
        assert!(!out.xml.contains("targetNamespace"));
    }

    #[test]
    fn substitution_arg_mappings_are_available_to_arg_extension() {
        let source = r#"<robot xmlns:xacro="http://ros.org/wiki/xacro">
            <xacro:arg name="size" default="10"/>
            <link s="$(arg size)"/>
        </robot>"#;
        let mut options = ProcessOptions::default();
        options.mappings.insert("size".to_string(), "42".to_string());
        let out = process(source, "test.xacro", options).unwrap();
        assert!(out.xml.contains(r#"s="42""#));
    }

    #[test]
    fn banner_is_prepended_when_requested() {
        let source = r#"<robot xmlns:xacro="http://ros.org/wiki/xacro"><link/></robot>"#;
        let mut options = ProcessOptions::default();
        options.banner = true;
        let out = process(source, "test.xacro", options).unwrap();
        assert!(out.xml.starts_with("<!--"));
    }
}
