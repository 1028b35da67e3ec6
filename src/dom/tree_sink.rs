//! html5ever TreeSink implementation that builds a [`Document`].

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, LocalName, Namespace, QualName};

use super::Document;
use super::arena::{Attribute, NodeId, NodeKind};

/// Handle used by the tree builder to reference nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

/// Owned element name handed back to the tree builder.
///
/// Names live behind the sink's `RefCell`, so a borrowed `&QualName` cannot
/// outlive the borrow guard; atoms make the clone cheap.
#[derive(Debug)]
pub struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// TreeSink that parses straight into a document arena.
///
/// html5ever's TreeSink methods take `&self`, hence the interior mutability.
pub struct DocumentSink {
    doc: RefCell<Document>,
    quirks_mode: Cell<QuirksMode>,
}

impl Default for DocumentSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSink {
    pub fn new() -> Self {
        Self {
            doc: RefCell::new(Document::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
        }
    }

    /// Consume the sink and return the document.
    pub fn into_document(self) -> Document {
        self.doc.into_inner()
    }
}

fn convert_attrs(attrs: Vec<Html5Attribute>) -> Vec<Attribute> {
    attrs
        .into_iter()
        .map(|a| Attribute {
            name: a.name,
            value: a.value.to_string(),
        })
        .collect()
}

impl TreeSink for DocumentSink {
    type Handle = NodeHandle;
    type Output = Self;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // Browsers recover from every parse error; so do we.
    }

    fn get_document(&self) -> Self::Handle {
        NodeHandle(self.doc.borrow().root())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        let doc = self.doc.borrow();
        match doc.get(target.0).map(|n| &n.kind) {
            Some(NodeKind::Element { name, .. }) => OwnedElemName(name.clone()),
            _ => OwnedElemName(QualName::new(
                None,
                html5ever::ns!(),
                html5ever::local_name!(""),
            )),
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let id = self
            .doc
            .borrow_mut()
            .create_element_with(name, convert_attrs(attrs));
        NodeHandle(id)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        NodeHandle(self.doc.borrow_mut().create_comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        // HTML has no processing instructions; keep a placeholder comment.
        NodeHandle(self.doc.borrow_mut().create_comment(String::new()))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut doc = self.doc.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => doc.append(parent.0, node.0),
            NodeOrText::AppendText(text) => doc.append_text(parent.0, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let parent = self.doc.borrow().parent(element.0);
        // Foster-parented content goes in front of the table.
        match parent {
            Some(_) => self.append_before_sibling(element, child),
            None => self.append(prev_element, child),
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let mut doc = self.doc.borrow_mut();
        let root = doc.root();
        let doctype = doc.create_doctype(
            name.to_string(),
            public_id.to_string(),
            system_id.to_string(),
        );
        doc.append(root, doctype);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Template contents are kept as ordinary children of the <template>.
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.0 == y.0
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut doc = self.doc.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => doc.insert_before(sibling.0, node.0),
            NodeOrText::AppendText(text) => {
                let prev = doc.prev_sibling(sibling.0);
                if let Some(node) = prev.and_then(|p| doc.get_mut(p))
                    && let NodeKind::Text(existing) = &mut node.kind
                {
                    existing.push_str(&text);
                    return;
                }
                let text_node = doc.create_text(text.to_string());
                doc.insert_before(sibling.0, text_node);
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        let mut doc = self.doc.borrow_mut();
        if let Some(node) = doc.get_mut(target.0)
            && let NodeKind::Element {
                attrs: existing, ..
            } = &mut node.kind
        {
            for attr in convert_attrs(attrs) {
                if !existing.iter().any(|a| a.name == attr.name) {
                    existing.push(attr);
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.doc.borrow_mut().detach(target.0);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        self.doc.borrow_mut().migrate_children(node.0, new_parent.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let doc = Document::parse("<html><body><p>Hello</p></body></html>");

        let body = doc.body().expect("should have body");
        let p = doc.first_child(body).expect("body should have child");
        assert_eq!(doc.tag_name(p), Some("p"));

        let text = doc.first_child(p).expect("p should have child");
        assert_eq!(doc.node_value(text), Some("Hello"));
    }

    #[test]
    fn test_attributes() {
        let doc = Document::parse(r#"<div id="main" typeof="mw:Transclusion">Content</div>"#);

        let div = doc.get_element_by_id("main").expect("should find div");
        assert_eq!(doc.attr(div, "typeof"), Some("mw:Transclusion"));
    }

    #[test]
    fn test_foster_parented_text() {
        // Text inside <table> is foster-parented before the table.
        let doc = Document::parse("<table>oops<tr><td>x</td></tr></table>");

        let body = doc.body().unwrap();
        let first = doc.first_child(body).unwrap();
        assert_eq!(doc.node_value(first), Some("oops"));
        let table = doc.next_sibling(first).unwrap();
        assert_eq!(doc.tag_name(table), Some("table"));
    }

    #[test]
    fn test_foster_parented_content_keeps_order() {
        let doc = Document::parse("<p>lead</p><table><tr><td>x</td></tr>a<b>bold</b>b</table>");

        let body = doc.body().unwrap();
        let html = doc.inner_html(body);
        assert_eq!(
            html,
            "<p>lead</p>a<b>bold</b>b<table><tbody><tr><td>x</td></tr></tbody></table>"
        );
        let tail = doc.last_child(body).unwrap();
        assert_eq!(doc.tag_name(tail), Some("table"));
    }

    #[test]
    fn test_template_children_are_kept() {
        let doc = Document::parse(
            "<html><head><template data-tid=\"abc\"><b>x</b></template></head><body></body></html>",
        );

        let head = doc.head().unwrap();
        let template = doc.first_child(head).unwrap();
        assert_eq!(doc.tag_name(template), Some("template"));
        assert_eq!(doc.text_content(template), "x");
    }
}
