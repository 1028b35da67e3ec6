//! Arena storage for the document tree.
//!
//! Every node of a [`Document`] lives in one contiguous vector; links between
//! nodes are indices into it. Detached nodes stay allocated until the document
//! is dropped, so a [`NodeId`] never dangles.

use html5ever::{LocalName, QualName, ns};

use super::Document;

/// Unique identifier for a node in a document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel value for no node.
    pub(crate) const NONE: NodeId = NodeId(u32::MAX);

    pub(crate) fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    pub(crate) fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    fn opt(self) -> Option<NodeId> {
        self.is_some().then_some(self)
    }

    /// Raw arena index, mostly useful in log output.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Document root.
    Document,
    /// Detached container, the equivalent of a DOM `DocumentFragment`.
    Fragment,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// HTML attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// Attribute in the null namespace, which is what the HTML parser produces.
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.into(),
        }
    }

    /// Attribute name as written in markup.
    pub fn local_name(&self) -> &str {
        self.name.local.as_ref()
    }
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub(crate) parent: NodeId,
    pub(crate) first_child: NodeId,
    pub(crate) last_child: NodeId,
    pub(crate) prev_sibling: NodeId,
    pub(crate) next_sibling: NodeId,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

// ============================================================================
// Allocation and linking
// ============================================================================

impl Document {
    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a detached HTML element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        self.create_element_with(name, Vec::new())
    }

    /// Create a detached element with a fully qualified name.
    pub fn create_element_with(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.alloc(NodeKind::Element { name, attrs })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    /// Create an empty detached fragment.
    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    pub(crate) fn create_doctype(
        &mut self,
        name: String,
        public_id: String,
        system_id: String,
    ) -> NodeId {
        self.alloc(NodeKind::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);

        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`, detaching it first.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        self.detach(new_node);

        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Unlink a node from its parent and siblings. Its subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Append text to the last child if it is a text node, else add a new one.
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeKind::Text(existing) = &mut last.kind
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }

    /// Move all children of `from` to the end of `to`, preserving order.
    pub fn migrate_children(&mut self, from: NodeId, to: NodeId) {
        let children: Vec<_> = self.children(from).collect();
        for child in children {
            self.append(to, child);
        }
    }
}

// ============================================================================
// Navigation
// ============================================================================

impl Document {
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.opt())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.opt())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.opt())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.opt())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.opt())
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            doc: self,
            current: self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE),
        }
    }

    /// Pre-order walk over `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root,
            next: root,
        }
    }

    /// Live pre-order walk over `root` and everything below it.
    ///
    /// The next node is looked up after `f` returns, so `f` may rewrite the
    /// node it is given, including replacing its children.
    pub fn visit<E>(
        &mut self,
        root: NodeId,
        mut f: impl FnMut(&mut Document, NodeId) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut current = Some(root);
        while let Some(node) = current {
            f(self, node)?;
            current = self.first_child(node).or_else(|| {
                let mut cursor = node;
                loop {
                    if cursor == root {
                        break None;
                    }
                    if let Some(next) = self.next_sibling(cursor) {
                        break Some(next);
                    }
                    cursor = self.parent(cursor)?;
                }
            });
        }
        Ok(())
    }
}

/// Iterator over children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .doc
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Pre-order iterator over a subtree, root included.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next;
        let node = self.doc.get(current)?;

        self.next = if node.first_child.is_some() {
            node.first_child
        } else {
            let mut cursor = current;
            loop {
                if cursor == self.root {
                    break NodeId::NONE;
                }
                let Some(n) = self.doc.get(cursor) else {
                    break NodeId::NONE;
                };
                if n.next_sibling.is_some() {
                    break n.next_sibling;
                }
                cursor = n.parent;
            }
        };
        Some(current)
    }
}

// ============================================================================
// Node inspection
// ============================================================================

impl Document {
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.kind, NodeKind::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.kind, NodeKind::Text(_)))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.kind, NodeKind::Comment(_)))
    }

    pub fn is_fragment(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.kind, NodeKind::Fragment))
    }

    /// Element's local name (tag), `None` for other node kinds.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.kind {
            NodeKind::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        })
    }

    /// Check whether the node is an element with the given tag.
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    /// Value of a text or comment node.
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.kind {
            NodeKind::Text(s) | NodeKind::Comment(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of all text nodes in the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(s)) = self.get(node).map(|n| &n.kind) {
                out.push_str(s);
            }
        }
        out
    }
}

// ============================================================================
// Attributes
// ============================================================================

impl Document {
    /// All attributes of an element, empty for other node kinds.
    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.local_name() == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute, replacing any existing value. No-op on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(node) = self.get_mut(id)
            && let NodeKind::Element { attrs, .. } = &mut node.kind
        {
            match attrs.iter_mut().find(|a| a.local_name() == name) {
                Some(existing) => existing.value = value,
                None => attrs.push(Attribute::new(name, value)),
            }
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let node = self.get_mut(id)?;
        let NodeKind::Element { attrs, .. } = &mut node.kind else {
            return None;
        };
        let pos = attrs.iter().position(|a| a.local_name() == name)?;
        Some(attrs.remove(pos).value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_children() {
        let mut doc = Document::new();

        let parent = doc.create_element("div");
        let child1 = doc.create_element("p");
        let child2 = doc.create_element("p");

        doc.append(doc.root(), parent);
        doc.append(parent, child1);
        doc.append(parent, child2);

        let children: Vec<_> = doc.children(parent).collect();
        assert_eq!(children, vec![child1, child2]);
        assert_eq!(doc.parent(child2), Some(parent));
        assert_eq!(doc.prev_sibling(child2), Some(child1));
    }

    #[test]
    fn test_visit_sees_rewritten_children() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.append(doc.root(), div);
        let mut seen = Vec::new();
        doc.visit(div, |doc, node| {
            seen.push(doc.tag_name(node).map(str::to_string));
            if doc.is_tag(node, "div") {
                let p = doc.create_element("p");
                doc.append(node, p);
            }
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(seen, vec![Some("div".to_string()), Some("p".to_string())]);
    }

    #[test]
    fn test_append_moves_attached_node() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let p = doc.create_element("p");
        doc.append(a, p);
        doc.append(b, p);

        assert!(!doc.has_children(a));
        assert_eq!(doc.first_child(b), Some(p));
        assert_eq!(doc.parent(p), Some(b));
    }

    #[test]
    fn test_insert_before_first_child() {
        let mut doc = Document::new();
        let parent = doc.create_element("div");
        let second = doc.create_element("b");
        let first = doc.create_element("i");
        doc.append(parent, second);
        doc.insert_before(second, first);

        assert_eq!(doc.first_child(parent), Some(first));
        assert_eq!(doc.next_sibling(first), Some(second));
        assert_eq!(doc.last_child(parent), Some(second));
    }

    #[test]
    fn test_detach_middle_child() {
        let mut doc = Document::new();
        let parent = doc.create_element("ul");
        let items: Vec<_> = (0..3).map(|_| doc.create_element("li")).collect();
        for &li in &items {
            doc.append(parent, li);
        }
        doc.detach(items[1]);

        let children: Vec<_> = doc.children(parent).collect();
        assert_eq!(children, vec![items[0], items[2]]);
        assert_eq!(doc.prev_sibling(items[2]), Some(items[0]));
        assert_eq!(doc.parent(items[1]), None);
    }

    #[test]
    fn test_text_merging() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append_text(p, "Hello, ");
        doc.append_text(p, "World!");

        let children: Vec<_> = doc.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.node_value(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_descendants_stay_in_subtree() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        let text = doc.create_text("x");
        let after = doc.create_element("p");
        doc.append(outer, inner);
        doc.append(inner, text);
        doc.append(doc.root(), outer);
        doc.append(doc.root(), after);

        let walked: Vec<_> = doc.descendants(outer).collect();
        assert_eq!(walked, vec![outer, inner, text]);
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attr(div, "id", "main");
        doc.set_attr(div, "id", "other");

        assert_eq!(doc.attr(div, "id"), Some("other"));
        assert_eq!(doc.attrs(div).len(), 1);
        assert_eq!(doc.remove_attr(div, "id"), Some("other".to_string()));
        assert!(!doc.has_attr(div, "id"));
        assert_eq!(doc.remove_attr(div, "id"), None);
    }
}
