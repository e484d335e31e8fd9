// ABOUTME: Owned, arena-indexed XML document model mutated in place by the walker

use std::fmt;

/// Index into `Document::nodes`. Stable across splices: removing or
/// inserting children never invalidates another node's id, only its
/// position within a parent's `children` vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A qualified name: an optional namespace prefix plus the local part.
/// `xacro:property` is `QName { prefix: Some("xacro"), local: "property" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(local: impl Into<String>) -> Self {
        QName {
            prefix: None,
            local: local.into(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        QName {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, local)) => QName::with_prefix(prefix, local),
            None => QName::new(qualified),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{p}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: QName,
    pub attrs: Vec<(QName, String)>,
    /// `xmlns` / `xmlns:prefix` declarations carried on this element,
    /// separated from `attrs` so the walker can strip or hoist them
    /// independently (§4.4 point 2, §9 namespace hoisting).
    pub namespaces: Vec<(Option<String>, String)>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    /// A `<![CDATA[...]]>` section, kept distinct from `Text` so its content
    /// round-trips verbatim on serialization instead of being entity-escaped.
    CData(String),
}

impl Node {
    pub fn element(tag: QName) -> Self {
        Node::Element(Element {
            tag,
            attrs: Vec::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        })
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.is_empty())
    }
}

/// An owned document. Nodes are never physically removed from the arena —
/// only unlinked from a parent's `children` — so every `NodeId` issued
/// during parsing or macro expansion remains valid for the lifetime of the
/// document, even across the destructive splices §4.4 describes.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    pub root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Deep-clones the subtree rooted at `id`, returning the id of the
    /// clone. Used for macro body instantiation and `insert_block`, both of
    /// which require independent copies per §4.3.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        match self.get(id).clone() {
            Node::Element(el) => {
                let cloned_children: Vec<NodeId> =
                    el.children.iter().map(|&c| self.clone_subtree(c)).collect();
                self.push(Node::Element(Element {
                    tag: el.tag,
                    attrs: el.attrs,
                    namespaces: el.namespaces,
                    children: cloned_children,
                }))
            }
            leaf => self.push(leaf),
        }
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Node::Element(e) => &e.children,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_parses_prefix() {
        let q = QName::parse("xacro:property");
        assert_eq!(q.prefix.as_deref(), Some("xacro"));
        assert_eq!(q.local, "property");
    }

    #[test]
    fn qname_parses_bare_name() {
        let q = QName::parse("link");
        assert_eq!(q.prefix, None);
        assert_eq!(q.local, "link");
    }

    #[test]
    fn clone_subtree_is_independent() {
        let mut doc = Document::new();
        let child = doc.push(Node::Text("x".into()));
        let mut parent_el = Element {
            tag: QName::new("p"),
            attrs: vec![],
            namespaces: vec![],
            children: vec![child],
        };
        let parent = doc.push(Node::Element(parent_el.clone()));
        if let Node::Element(e) = doc.get_mut(parent) {
            parent_el = e.clone();
        }
        let _ = parent_el;

        let clone = doc.clone_subtree(parent);
        assert_ne!(clone, parent);
        let clone_children = doc.children_of(clone).to_vec();
        assert_eq!(clone_children.len(), 1);
        assert_ne!(clone_children[0], child);
    }
}
