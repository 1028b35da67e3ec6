//! Arena DOM built by html5ever.
//!
//! A [`Document`] owns its node arena and the [`DataBag`] holding the
//! out-of-band node data for its elements. Nodes are addressed by [`NodeId`];
//! every id is only meaningful for the document that created it.

mod arena;
mod serialize;
mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;

use crate::data_bag::DataBag;
use crate::util::{decode_text, sniff_charset};

pub use arena::{Attribute, Children, Descendants, Node, NodeId, NodeKind};
pub use serialize::SerializableNode;
pub use tree_sink::DocumentSink;

/// An HTML document.
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    bag: DataBag,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("records", &self.bag.len())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with only a root node.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
            bag: DataBag::new(),
        };
        doc.root = doc.alloc(NodeKind::Document);
        doc
    }

    /// Parse a complete HTML document.
    pub fn parse(html: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                drop_doctype: false,
                ..Default::default()
            },
            ..Default::default()
        };

        parse_document(DocumentSink::new(), opts)
            .from_utf8()
            .one(html.as_bytes())
            .into_document()
    }

    /// Parse a document read as raw bytes, honoring a `<meta charset>`
    /// declaration when the bytes are not UTF-8.
    pub fn parse_bytes(bytes: &[u8]) -> Self {
        let html = decode_text(bytes, sniff_charset(bytes));
        Self::parse(&html)
    }

    /// Parse an HTML fragment into a new detached fragment node of this
    /// document.
    ///
    /// The markup is parsed as the content of `<body>`, then imported.
    pub fn parse_fragment(&mut self, html: &str) -> NodeId {
        let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
        let parsed = Document::parse(&wrapped);

        let fragment = self.create_fragment();
        if let Some(body) = parsed.body() {
            for child in parsed.children(body) {
                let imported = self.import_node(&parsed, child);
                self.append(fragment, imported);
            }
        }
        fragment
    }

    /// The document root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&c| self.is_element(c))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html).find(|&c| self.is_tag(c, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html).find(|&c| self.is_tag(c, "body"))
    }

    /// Node data store for this document.
    pub fn bag(&self) -> &DataBag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut DataBag {
        &mut self.bag
    }

    /// First element in tree order whose `id` attribute equals `id`.
    ///
    /// Only nodes attached to the document are searched.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&n| self.is_element(n) && self.attr(n, "id") == Some(id))
    }

    /// Check whether `ancestor` contains `node` (a node contains itself).
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            if n == ancestor {
                return true;
            }
            cursor = self.parent(n);
        }
        false
    }

    /// Deep-copy a node from another document into this one, detached.
    ///
    /// Only markup is copied; node data records stay with the source.
    pub fn import_node(&mut self, src: &Document, node: NodeId) -> NodeId {
        let Some(kind) = src.get(node).map(|n| n.kind.clone()) else {
            return self.create_fragment();
        };
        let copy = self.alloc(kind);
        for child in src.children(node) {
            let child_copy = self.import_node(src, child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Deep-copy a subtree of this document, returning the detached copy.
    ///
    /// Attributes are copied verbatim, including node data handles; use
    /// [`crate::dom_data::clone_node`] to give the copy its own records.
    pub fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let Some(kind) = self.get(node).map(|n| n.kind.clone()) else {
            return self.create_fragment();
        };
        let copy = self.alloc(kind);
        let children: Vec<_> = self.children(node).collect();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.append(copy, child_copy);
        }
        copy
    }
}
