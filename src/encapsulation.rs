//! Recognizing encapsulated content: the forests of sibling elements that
//! together render one transclusion, extension or similar construct.
//!
//! A forest is a run of adjacent elements sharing one `about` id. Its
//! first element carries the encapsulation type in `typeof`.

use std::sync::LazyLock;

use regex::Regex;

use crate::diff::previous_non_deleted_sibling;
use crate::dom::{Document, NodeId};

static FIRST_ENCAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^mw:(?:Transclusion|Param|LanguageVariant|Extension/\S+)$")
        .expect("valid regex")
});

/// Parents under which the tree builder may foster whitespace out of place.
const FOSTERABLE_PARENTS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr"];

/// Check whether `about` is a Parsoid transclusion about-id.
///
/// Only the `#mwt` prefix is checked; the counter after it may be anything.
pub fn is_parsoid_object_id(about: &str) -> bool {
    about.starts_with("#mwt")
}

/// Check whether the element has a Parsoid about-id.
pub fn has_parsoid_about_id(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node) && doc.attr(node, "about").is_some_and(is_parsoid_object_id)
}

/// Whitespace-only text. Only ASCII whitespace counts, so a lone NBSP is
/// content.
pub fn is_iew(doc: &Document, node: NodeId) -> bool {
    doc.is_text(node)
        && doc.node_value(node).is_some_and(|s| {
            s.chars()
                .all(|c| matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r'))
        })
}

pub fn is_fosterable_position(doc: &Document, node: NodeId) -> bool {
    doc.parent(node)
        .and_then(|p| doc.tag_name(p))
        .is_some_and(|tag| FOSTERABLE_PARENTS.contains(&tag))
}

/// Check whether the node's first `typeof` token names an encapsulation
/// type.
pub fn is_first_encapsulation_wrapper_node(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node)
        && doc
            .attr(node, "typeof")
            .and_then(|t| t.split_ascii_whitespace().next())
            .is_some_and(|first| FIRST_ENCAP.is_match(first))
}

/// Walk back over the contiguous run of siblings sharing the node's
/// about-id and return the run's first element, if it is a forest root.
pub fn find_first_encapsulation_wrapper_node(doc: &Document, node: NodeId) -> Option<NodeId> {
    if !has_parsoid_about_id(doc, node) {
        return None;
    }
    let about = doc.attr(node, "about");
    let mut first = node;
    while let Some(prev) = previous_non_deleted_sibling(doc, first) {
        if !doc.is_element(prev) || doc.attr(prev, "about") != about {
            break;
        }
        first = prev;
    }
    is_first_encapsulation_wrapper_node(doc, first).then_some(first)
}

/// Check whether the node belongs to a forest.
pub fn is_encapsulation_wrapper(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node) && find_first_encapsulation_wrapper_node(doc, node).is_some()
}

/// The node followed by the siblings of its forest.
///
/// Whitespace in fosterable positions may sit between forest members;
/// trailing whitespace is not part of the result.
pub fn get_about_siblings(doc: &Document, node: NodeId, about: &str) -> Vec<NodeId> {
    let mut nodes = vec![node];
    if about.is_empty() {
        return nodes;
    }

    let mut next = doc.next_sibling(node);
    while let Some(n) = next {
        let same_about = doc.is_element(n) && doc.attr(n, "about") == Some(about);
        let fostered_ws = !doc.is_element(n) && is_fosterable_position(doc, n) && is_iew(doc, n);
        if !same_about && !fostered_ws {
            break;
        }
        nodes.push(n);
        next = doc.next_sibling(n);
    }

    while nodes.last().is_some_and(|&n| is_iew(doc, n)) {
        nodes.pop();
    }
    nodes
}

/// The first sibling after the node's forest.
pub fn skip_over_encapsulated_content(doc: &Document, node: NodeId) -> Option<NodeId> {
    match doc.attr(node, "about") {
        Some(about) => {
            let siblings = get_about_siblings(doc, node, about);
            siblings.last().and_then(|&last| doc.next_sibling(last))
        }
        None => doc.next_sibling(node),
    }
}

/// A `<section>` generated for a heading.
pub fn is_parsoid_section_tag(doc: &Document, node: NodeId) -> bool {
    doc.is_tag(node, "section") && doc.has_attr(node, "data-mw-section-id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn body_children(doc: &Document) -> Vec<NodeId> {
        doc.children(doc.body().unwrap()).collect()
    }

    #[test]
    fn test_first_wrapper_uses_first_token() {
        let doc = Document::parse(
            r#"<span typeof="mw:Transclusion mw:Error"></span><span typeof="mw:Error mw:Transclusion"></span><span typeof="mw:Extension/ref"></span><span typeof="mw:Extension/"></span>"#,
        );
        let spans = body_children(&doc);
        assert!(is_first_encapsulation_wrapper_node(&doc, spans[0]));
        assert!(!is_first_encapsulation_wrapper_node(&doc, spans[1]));
        assert!(is_first_encapsulation_wrapper_node(&doc, spans[2]));
        assert!(!is_first_encapsulation_wrapper_node(&doc, spans[3]));
    }

    #[test]
    fn test_parsoid_object_ids() {
        assert!(is_parsoid_object_id("#mwt1"));
        assert!(!is_parsoid_object_id("mwt1"));
        assert!(!is_parsoid_object_id("#mwa1"));
        // Hand-edited counters still mark a forest.
        assert!(is_parsoid_object_id("#mwt01"));
        assert!(is_parsoid_object_id("#mwtx"));
    }

    #[test]
    fn test_find_first_stops_at_different_about() {
        let doc = Document::parse(concat!(
            r##"<p about="#mwt1" typeof="mw:Transclusion">a</p>"##,
            r##"<p about="#mwt2">b</p>"##,
            r##"<p about="#mwt1">c</p>"##,
        ));
        let ps = body_children(&doc);
        assert_eq!(find_first_encapsulation_wrapper_node(&doc, ps[0]), Some(ps[0]));
        assert_eq!(find_first_encapsulation_wrapper_node(&doc, ps[2]), None);
        assert!(!is_encapsulation_wrapper(&doc, ps[1]));
    }

    #[test]
    fn test_find_first_walks_the_run() {
        let doc = Document::parse(concat!(
            r##"<p about="#mwt1" typeof="mw:Transclusion">a</p>"##,
            r##"<p about="#mwt1">b</p>"##,
            r##"<p about="#mwt1">c</p>"##,
        ));
        let ps = body_children(&doc);
        assert_eq!(find_first_encapsulation_wrapper_node(&doc, ps[2]), Some(ps[0]));
        assert_eq!(skip_over_encapsulated_content(&doc, ps[0]), None);
    }

    #[test]
    fn test_about_siblings_in_table() {
        let doc = Document::parse(concat!(
            "<table>",
            r##"<tbody about="#mwt3" typeof="mw:Transclusion"><tr><td>a</td></tr></tbody>"##,
            " ",
            r##"<tbody about="#mwt3"><tr><td>b</td></tr></tbody>"##,
            " ",
            "</table>",
        ));
        let table = body_children(&doc)[0];
        let first = doc.first_child(table).unwrap();
        let siblings = get_about_siblings(&doc, first, "#mwt3");
        assert_eq!(siblings.len(), 3);
        assert!(is_iew(&doc, siblings[1]));
        assert!(doc.is_tag(siblings[2], "tbody"));
    }

    #[test]
    fn test_nbsp_is_not_iew() {
        let mut doc = Document::parse(concat!(
            "<table>",
            r##"<tbody about="#mwt3" typeof="mw:Transclusion"><tr><td>a</td></tr></tbody>"##,
            r##"<tbody about="#mwt3"><tr><td>b</td></tr></tbody>"##,
            "</table>",
        ));
        let table = body_children(&doc)[0];
        let first = doc.first_child(table).unwrap();
        let second = doc.next_sibling(first).unwrap();
        let nbsp = doc.create_text("\u{00A0}");
        doc.insert_before(second, nbsp);

        assert!(!is_iew(&doc, nbsp));
        assert!(crate::diff::is_content_node(&doc, nbsp));
        // The NBSP is content, so it ends the forest instead of joining it.
        assert_eq!(get_about_siblings(&doc, first, "#mwt3"), vec![first]);

        let tab = doc.create_text(" \t\r\n");
        assert!(is_iew(&doc, tab));
    }

    #[test]
    fn test_section_tag() {
        let doc = Document::parse(r#"<section data-mw-section-id="1"></section><section></section>"#);
        let sections = body_children(&doc);
        assert!(is_parsoid_section_tag(&doc, sections[0]));
        assert!(!is_parsoid_section_tag(&doc, sections[1]));
    }

    proptest! {
        #[test]
        fn prop_forest_is_contiguous(abouts in proptest::collection::vec(0u8..3, 1..12), pick in 0usize..12) {
            let html: String = abouts
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    let ty = if i == 0 || abouts[i - 1] != *a { r#" typeof="mw:Transclusion""# } else { "" };
                    format!(r##"<span about="#mwt{a}"{ty}>{i}</span>"##)
                })
                .collect();
            let doc = Document::parse(&html);
            let spans = body_children(&doc);
            let node = spans[pick % spans.len()];

            let first = find_first_encapsulation_wrapper_node(&doc, node).unwrap();
            let about = doc.attr(first, "about").unwrap();
            let siblings = get_about_siblings(&doc, first, about);
            prop_assert!(siblings.contains(&node));
            for s in &siblings {
                prop_assert_eq!(doc.attr(*s, "about"), Some(about));
            }
        }
    }
}
