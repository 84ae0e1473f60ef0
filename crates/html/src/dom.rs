//! Mutable arena document.
//!
//! Invariants:
//! - Key 1 is always the `Document` node; it never has a parent.
//! - A node has at most one parent and appears exactly once in that parent's
//!   `children`.
//! - Detached nodes stay allocated and keep their own subtree, so a removed
//!   node can still be inspected after it left the tree.
//! - HTML element and attribute names are stored ASCII-lowercase; SVG names
//!   keep their case.

use std::borrow::Cow;
use std::fmt;

/// Stable handle for a node inside one `Document`. Keys are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    /// Reserved sentinel; no node ever has this key.
    pub const INVALID: NodeKey = NodeKey(0);

    fn index(self) -> usize {
        self.0 as usize - 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Html,
    Svg,
}

impl Namespace {
    pub const HTML_URI: &'static str = "http://www.w3.org/1999/xhtml";
    pub const SVG_URI: &'static str = "http://www.w3.org/2000/svg";

    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Html => Self::HTML_URI,
            Namespace::Svg => Self::SVG_URI,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            Self::HTML_URI => Some(Namespace::Html),
            Self::SVG_URI => Some(Namespace::Svg),
            _ => None,
        }
    }
}

/// DOM node type, numbered like `Node.nodeType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype {
        name: String,
    },
    Element {
        name: String,
        namespace: Namespace,
        attributes: Vec<(String, String)>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::Document => NodeType::Document,
            NodeData::Doctype { .. } => NodeType::DocumentType,
            NodeData::Element { .. } => NodeType::Element,
            NodeData::Text { .. } => NodeType::Text,
            NodeData::Comment { .. } => NodeType::Comment,
        }
    }

    fn can_have_children(&self) -> bool {
        matches!(self, NodeData::Document | NodeData::Element { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomError {
    UnknownNode(NodeKey),
    /// Children can only be attached to documents and elements.
    NotAContainer(NodeKey),
    NotAChild { parent: NodeKey, child: NodeKey },
    /// The child is the parent or one of its ancestors.
    HierarchyCycle { parent: NodeKey, child: NodeKey },
    NotAnElement(NodeKey),
    /// The document node cannot be moved.
    DocumentNode,
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::UnknownNode(key) => write!(f, "unknown node {}", key.0),
            DomError::NotAContainer(key) => write!(f, "node {} cannot have children", key.0),
            DomError::NotAChild { parent, child } => {
                write!(f, "node {} is not a child of node {}", child.0, parent.0)
            }
            DomError::HierarchyCycle { parent, child } => write!(
                f,
                "inserting node {} under node {} would create a cycle",
                child.0, parent.0
            ),
            DomError::NotAnElement(key) => write!(f, "node {} is not an element", key.0),
            DomError::DocumentNode => f.write_str("the document node cannot be moved"),
        }
    }
}

impl std::error::Error for DomError {}

#[derive(Clone, Debug)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// Arena of nodes addressed by [`NodeKey`].
///
/// Slots are never reused: detached and replaced nodes stay allocated so
/// their keys remain valid. Long-lived documents should call
/// [`Document::compact`] at a point where no keys are held.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeEntry>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: just the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeEntry {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeKey {
        NodeKey(1)
    }

    fn entry(&self, key: NodeKey) -> Result<&NodeEntry, DomError> {
        if key == NodeKey::INVALID {
            return Err(DomError::UnknownNode(key));
        }
        self.nodes
            .get(key.index())
            .ok_or(DomError::UnknownNode(key))
    }

    fn entry_mut(&mut self, key: NodeKey) -> Result<&mut NodeEntry, DomError> {
        if key == NodeKey::INVALID {
            return Err(DomError::UnknownNode(key));
        }
        self.nodes
            .get_mut(key.index())
            .ok_or(DomError::UnknownNode(key))
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.entry(key).is_ok()
    }

    pub fn node(&self, key: NodeKey) -> Option<&NodeData> {
        self.entry(key).ok().map(|e| &e.data)
    }

    pub fn node_type(&self, key: NodeKey) -> Option<NodeType> {
        self.node(key).map(NodeData::node_type)
    }

    fn push(&mut self, data: NodeData) -> NodeKey {
        self.nodes.push(NodeEntry {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeKey(self.nodes.len() as u32)
    }

    /// Creates a detached HTML element; the name is folded to lowercase.
    pub fn create_element(&mut self, name: &str) -> NodeKey {
        self.create_element_ns(Namespace::Html, name)
    }

    pub fn create_element_ns(&mut self, namespace: Namespace, name: &str) -> NodeKey {
        let name = match namespace {
            Namespace::Html => name.to_ascii_lowercase(),
            Namespace::Svg => name.to_string(),
        };
        self.push(NodeData::Element {
            name,
            namespace,
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.push(NodeData::Text {
            text: text.to_string(),
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        self.push(NodeData::Comment {
            text: text.to_string(),
        })
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeKey {
        self.push(NodeData::Doctype {
            name: name.to_string(),
        })
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.entry(key).ok().and_then(|e| e.parent)
    }

    /// Children in order; empty for leaves and unknown keys.
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.entry(key).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).first().copied()
    }

    pub fn last_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).last().copied()
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|c| *c == key)
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        index
            .checked_sub(1)
            .map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn preceding_siblings(&self, key: NodeKey) -> &[NodeKey] {
        match (self.parent(key), self.index_in_parent(key)) {
            (Some(parent), Some(index)) => &self.children(parent)[..index],
            _ => &[],
        }
    }

    pub fn following_siblings(&self, key: NodeKey) -> &[NodeKey] {
        match (self.parent(key), self.index_in_parent(key)) {
            (Some(parent), Some(index)) => &self.children(parent)[index + 1..],
            _ => &[],
        }
    }

    /// True if `ancestor` is `key` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// True if the node is connected to the document node.
    pub fn is_attached(&self, key: NodeKey) -> bool {
        self.is_inclusive_ancestor(self.root(), key)
    }

    fn check_insertion(&self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        if !self.entry(parent)?.data.can_have_children() {
            return Err(DomError::NotAContainer(parent));
        }
        self.entry(child)?;
        if child == self.root() {
            return Err(DomError::DocumentNode);
        }
        // A childless node can only be its own ancestor.
        let cycle = if self.children(child).is_empty() {
            child == parent
        } else {
            self.is_inclusive_ancestor(child, parent)
        };
        if cycle {
            return Err(DomError::HierarchyCycle { parent, child });
        }
        Ok(())
    }

    /// Runs every check `insert_before` would, without changing the tree.
    pub fn check_insert_before(
        &self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        match reference {
            Some(reference) if self.parent(reference) != Some(parent) => Err(DomError::NotAChild {
                parent,
                child: reference,
            }),
            _ => Ok(()),
        }
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        self.detach(child)?;
        self.entry_mut(parent)?.children.push(child);
        self.entry_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Inserts `child` before `reference`, or appends when `reference` is `None`.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<(), DomError> {
        self.check_insert_before(parent, child, reference)?;
        let Some(mut reference) = reference else {
            return self.append_child(parent, child);
        };
        if reference == child {
            match self.next_sibling(child) {
                Some(next) => reference = next,
                None => return self.append_child(parent, child),
            }
        }
        self.detach(child)?;
        let position = self
            .children(parent)
            .iter()
            .position(|c| *c == reference)
            .ok_or(DomError::NotAChild {
                parent,
                child: reference,
            })?;
        self.entry_mut(parent)?.children.insert(position, child);
        self.entry_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlinks the node from its parent. Detached nodes are left as they are.
    pub fn detach(&mut self, key: NodeKey) -> Result<(), DomError> {
        let Some(parent) = self.entry(key)?.parent else {
            return Ok(());
        };
        self.entry_mut(parent)?.children.retain(|c| *c != key);
        self.entry_mut(key)?.parent = None;
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    pub fn remove_all_children(&mut self, key: NodeKey) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.entry_mut(key)?.children);
        for child in children {
            self.entry_mut(child)?.parent = None;
        }
        Ok(())
    }

    pub fn local_name(&self, key: NodeKey) -> Option<&str> {
        match self.node(key)? {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn namespace(&self, key: NodeKey) -> Option<Namespace> {
        match self.node(key)? {
            NodeData::Element { namespace, .. } => Some(*namespace),
            _ => None,
        }
    }

    pub fn is_element_named(&self, key: NodeKey, name: &str) -> bool {
        self.local_name(key)
            .is_some_and(|local| local.eq_ignore_ascii_case(name))
    }

    /// `Node.nodeName`: upper-case tag for HTML elements.
    pub fn node_name(&self, key: NodeKey) -> Option<Cow<'_, str>> {
        let name = match self.node(key)? {
            NodeData::Document => Cow::Borrowed("#document"),
            NodeData::Doctype { name } => Cow::Borrowed(name.as_str()),
            NodeData::Element {
                name,
                namespace: Namespace::Html,
                ..
            } => Cow::Owned(name.to_ascii_uppercase()),
            NodeData::Element { name, .. } => Cow::Borrowed(name.as_str()),
            NodeData::Text { .. } => Cow::Borrowed("#text"),
            NodeData::Comment { .. } => Cow::Borrowed("#comment"),
        };
        Some(name)
    }

    pub fn attributes(&self, key: NodeKey) -> &[(String, String)] {
        match self.node(key) {
            Some(NodeData::Element { attributes, .. }) => attributes.as_slice(),
            _ => &[],
        }
    }

    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.attributes(key)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn element_attributes_mut(
        &mut self,
        key: NodeKey,
    ) -> Result<(&mut Vec<(String, String)>, Namespace), DomError> {
        match &mut self.entry_mut(key)?.data {
            NodeData::Element {
                attributes,
                namespace,
                ..
            } => Ok((attributes, *namespace)),
            _ => Err(DomError::NotAnElement(key)),
        }
    }

    /// Sets or replaces an attribute, keeping its original position.
    pub fn set_attribute(&mut self, key: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        let (attributes, namespace) = self.element_attributes_mut(key)?;
        let name = match namespace {
            Namespace::Html => name.to_ascii_lowercase(),
            Namespace::Svg => name.to_string(),
        };
        match attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    /// Returns whether an attribute was present.
    pub fn remove_attribute(&mut self, key: NodeKey, name: &str) -> Result<bool, DomError> {
        let (attributes, namespace) = self.element_attributes_mut(key)?;
        let name: Cow<'_, str> = match namespace {
            Namespace::Html => Cow::Owned(name.to_ascii_lowercase()),
            Namespace::Svg => Cow::Borrowed(name),
        };
        let before = attributes.len();
        attributes.retain(|(k, _)| *k != name);
        Ok(attributes.len() != before)
    }

    /// Character data of a text or comment node.
    pub fn text(&self, key: NodeKey) -> Option<&str> {
        match self.node(key)? {
            NodeData::Text { text } | NodeData::Comment { text } => Some(text.as_str()),
            _ => None,
        }
    }

    /// `Node.textContent` for reading: concatenated descendant text.
    pub fn text_content(&self, key: NodeKey) -> String {
        if let Some(NodeData::Comment { text }) = self.node(key) {
            return text.clone();
        }
        self.descendants(key)
            .into_iter()
            .filter_map(|node| match self.node(node) {
                Some(NodeData::Text { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `Node.textContent` for writing: character data is replaced in place,
    /// element content is replaced by a single text node (none when empty).
    pub fn set_text_content(&mut self, key: NodeKey, value: &str) -> Result<(), DomError> {
        let node_type = self.entry(key)?.data.node_type();
        match node_type {
            NodeType::Text | NodeType::Comment => {
                if let NodeData::Text { text } | NodeData::Comment { text } =
                    &mut self.entry_mut(key)?.data
                {
                    *text = value.to_string();
                }
                Ok(())
            }
            NodeType::Element | NodeType::Document => {
                self.remove_all_children(key)?;
                if !value.is_empty() {
                    let text = self.create_text(value);
                    self.append_child(key, text)?;
                }
                Ok(())
            }
            NodeType::DocumentType => Ok(()),
        }
    }

    pub fn document_element(&self) -> Option<NodeKey> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|c| self.node_type(*c) == Some(NodeType::Element))
    }

    fn child_element_named(&self, parent: NodeKey, name: &str) -> Option<NodeKey> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.is_element_named(*c, name))
    }

    pub fn head(&self) -> Option<NodeKey> {
        self.child_element_named(self.document_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeKey> {
        self.child_element_named(self.document_element()?, "body")
    }

    /// `Node.isEqualNode`: same kind, names, namespace, attribute set (order
    /// ignored), character data and recursively equal children.
    pub fn is_equal_node(&self, a: NodeKey, b: NodeKey) -> bool {
        self.is_equal_across(a, self, b)
    }

    /// `is_equal_node` between a node of this document and one of `other`.
    pub fn is_equal_across(&self, a: NodeKey, other: &Document, b: NodeKey) -> bool {
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            let (Some(left), Some(right)) = (self.node(a), other.node(b)) else {
                return false;
            };
            let (lc, rc) = (self.children(a), other.children(b));
            if !shallow_equal(left, right) || lc.len() != rc.len() {
                return false;
            }
            pending.extend(lc.iter().copied().zip(rc.iter().copied()));
        }
        true
    }

    /// Drops every node not connected to the document node and renumbers the
    /// rest in document order. All keys obtained before the call are
    /// invalidated. Returns the number of nodes dropped.
    pub fn compact(&mut self) -> usize {
        let live = self.descendants(self.root());
        let mut remap = vec![NodeKey::INVALID; self.nodes.len() + 1];
        for (i, key) in live.iter().enumerate() {
            remap[key.0 as usize] = NodeKey(i as u32 + 1);
        }
        let dropped = self.nodes.len() - live.len();
        let mut old: Vec<Option<NodeEntry>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        self.nodes = live
            .iter()
            .filter_map(|key| old[key.index()].take())
            .map(|entry| NodeEntry {
                parent: entry.parent.map(|p| remap[p.0 as usize]),
                children: entry.children.iter().map(|c| remap[c.0 as usize]).collect(),
                data: entry.data,
            })
            .collect();
        log::debug!(target: "html.dom", "compacted document: {dropped} nodes dropped");
        dropped
    }

    /// Pre-order walk of the subtree rooted at `key`, including `key`.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(node) = stack.pop() {
            if !self.contains(node) {
                continue;
            }
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }
}

/// Node-local part of `is_equal_node`; children are compared by the caller.
fn shallow_equal(left: &NodeData, right: &NodeData) -> bool {
    match (left, right) {
        (NodeData::Document, NodeData::Document) => true,
        (NodeData::Doctype { name: l }, NodeData::Doctype { name: r }) => l == r,
        (
            NodeData::Element {
                name: ln,
                namespace: lns,
                attributes: la,
            },
            NodeData::Element {
                name: rn,
                namespace: rns,
                attributes: ra,
            },
        ) => {
            ln == rn
                && lns == rns
                && la.len() == ra.len()
                && la.iter().all(|attr| ra.contains(attr))
        }
        (NodeData::Text { text: l }, NodeData::Text { text: r })
        | (NodeData::Comment { text: l }, NodeData::Comment { text: r }) => l == r,
        _ => false,
    }
}
