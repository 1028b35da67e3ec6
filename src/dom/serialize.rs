//! HTML serialization through html5ever's serializer.

use std::io;

use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};

use super::Document;
use super::arena::{NodeId, NodeKind};

/// A node paired with its document so html5ever can walk it.
pub struct SerializableNode<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> SerializableNode<'a> {
    pub fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    fn write_node<S: Serializer>(&self, serializer: &mut S, id: NodeId) -> io::Result<()> {
        let Some(node) = self.doc.get(id) else {
            return Ok(());
        };
        match &node.kind {
            NodeKind::Element { name, attrs } => {
                serializer.start_elem(
                    name.clone(),
                    attrs.iter().map(|a| (&a.name, a.value.as_str())),
                )?;
                self.write_children(serializer, id)?;
                serializer.end_elem(name.clone())
            }
            NodeKind::Text(text) => serializer.write_text(text),
            NodeKind::Comment(text) => serializer.write_comment(text),
            NodeKind::Doctype { name, .. } => serializer.write_doctype(name),
            NodeKind::Document | NodeKind::Fragment => self.write_children(serializer, id),
        }
    }

    fn write_children<S: Serializer>(&self, serializer: &mut S, id: NodeId) -> io::Result<()> {
        for child in self.doc.children(id) {
            self.write_node(serializer, child)?;
        }
        Ok(())
    }
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        match traversal_scope {
            TraversalScope::IncludeNode => self.write_node(serializer, self.id),
            TraversalScope::ChildrenOnly(_) => self.write_children(serializer, self.id),
        }
    }
}

fn to_html(doc: &Document, id: NodeId, traversal_scope: TraversalScope) -> String {
    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    serialize(&mut bytes, &SerializableNode::new(doc, id), opts)
        .expect("serializing into a Vec cannot fail");
    String::from_utf8(bytes).unwrap_or_default()
}

impl Document {
    /// Serialize a node including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let scope = match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Document | NodeKind::Fragment) => TraversalScope::ChildrenOnly(None),
            _ => TraversalScope::IncludeNode,
        };
        to_html(self, id, scope)
    }

    /// Serialize only the children of a node.
    pub fn inner_html(&self, id: NodeId) -> String {
        let parent = match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element { name, .. }) => Some(name.clone()),
            _ => None,
        };
        to_html(self, id, TraversalScope::ChildrenOnly(parent))
    }

    /// Serialize the whole document, doctype included.
    pub fn to_html(&self) -> String {
        self.outer_html(self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_and_inner_html() {
        let doc = Document::parse(r#"<p class="a">x &amp; <b>y</b></p>"#);
        let p = doc.first_child(doc.body().unwrap()).unwrap();

        assert_eq!(doc.outer_html(p), r#"<p class="a">x &amp; <b>y</b></p>"#);
        assert_eq!(doc.inner_html(p), "x &amp; <b>y</b>");
    }

    #[test]
    fn test_attribute_json_is_escaped() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.set_attr(span, "data-mw", r#"{"a":"<b>"}"#);

        let html = doc.outer_html(span);
        assert!(html.contains("&quot;a&quot;"));

        let reparsed = Document::parse(&html);
        let span = reparsed.first_child(reparsed.body().unwrap()).unwrap();
        assert_eq!(reparsed.attr(span, "data-mw"), Some(r#"{"a":"<b>"}"#));
    }

    #[test]
    fn test_void_elements() {
        let doc = Document::parse("<p>a<br>b<meta typeof=\"mw:DiffMarker/deleted\"></p>");
        let p = doc.first_child(doc.body().unwrap()).unwrap();

        assert_eq!(
            doc.inner_html(p),
            r#"a<br>b<meta typeof="mw:DiffMarker/deleted">"#
        );
    }

    #[test]
    fn test_document_round_trip() {
        let html = "<!DOCTYPE html><html><head></head><body><p>hi</p></body></html>";
        let doc = Document::parse(html);
        assert_eq!(doc.to_html(), html);
    }
}
