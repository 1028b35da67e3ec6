//! Reading and writing the change markers left by [`super::DomDiff`].
//!
//! Elements carry their marks in `data-parsoid-diff`. Deletions, moves and
//! changes to text or comments are recorded with a
//! `<meta typeof="mw:DiffMarker/...">` placed before the affected node.

use tracing::error;

use crate::dom::{Document, NodeId};
use crate::dom_data::{add_type_of, get_node_data};
use crate::encapsulation::is_iew;
use crate::error::Result;
use crate::node_data::{DataParsoidDiff, DiffMark};

const DIFF_MARKER_PREFIX: &str = "mw:DiffMarker/";

/// The element's diff marks, if any. Non-elements never have any.
pub fn get_diff_mark(doc: &mut Document, node: NodeId) -> Result<Option<DataParsoidDiff>> {
    if !doc.is_element(node) {
        return Ok(None);
    }
    Ok(get_node_data(doc, node)?.parsoid_diff.clone())
}

/// Check whether the node has marks or is a marker meta itself.
pub fn has_diff_markers(doc: &mut Document, node: NodeId) -> Result<bool> {
    Ok(get_diff_mark(doc, node)?.is_some() || is_diff_marker(doc, Some(node), None))
}

pub fn has_diff_mark(doc: &mut Document, node: NodeId, mark: DiffMark) -> Result<bool> {
    // Deletions, and insertions of text or comments, live on a preceding meta.
    if mark == DiffMark::Deleted || (mark == DiffMark::Inserted && !doc.is_element(node)) {
        return Ok(is_diff_marker(doc, doc.prev_sibling(node), Some(mark)));
    }
    Ok(get_diff_mark(doc, node)?.is_some_and(|d| d.has(mark)))
}

pub fn has_inserted_diff_mark(doc: &mut Document, node: NodeId) -> Result<bool> {
    has_diff_mark(doc, node, DiffMark::Inserted)
}

pub fn directly_children_changed(doc: &mut Document, node: NodeId) -> Result<bool> {
    has_diff_mark(doc, node, DiffMark::ChildrenChanged)
}

/// Check whether the node is marked, with nothing but subtree or children
/// changes.
pub fn only_subtree_changed(doc: &mut Document, node: NodeId) -> Result<bool> {
    Ok(get_diff_mark(doc, node)?.is_some_and(|d| {
        d.diff
            .iter()
            .all(|m| matches!(m, DiffMark::SubtreeChanged | DiffMark::ChildrenChanged))
    }))
}

/// Check whether nothing below the node changed.
///
/// An element that is only a modified wrapper counts as unchanged.
pub fn subtree_unchanged(doc: &mut Document, node: NodeId) -> Result<bool> {
    Ok(get_diff_mark(doc, node)?
        .is_none_or(|d| d.diff.iter().all(|&m| m == DiffMark::ModifiedWrapper)))
}

pub fn maybe_deleted_node(doc: &Document, node: Option<NodeId>) -> bool {
    node.is_some_and(|n| doc.is_element(n)) && is_diff_marker(doc, node, Some(DiffMark::Deleted))
}

/// Check whether the node is a deletion marker standing in for a block.
pub fn is_deleted_block_node(doc: &Document, node: Option<NodeId>) -> bool {
    maybe_deleted_node(doc, node) && node.is_some_and(|n| doc.has_attr(n, "data-is-block"))
}

/// Record `mark` on an element. Non-elements are left alone.
pub fn set_diff_mark(doc: &mut Document, node: NodeId, mark: DiffMark) -> Result<()> {
    if !doc.is_element(node) {
        return Ok(());
    }
    get_node_data(doc, node)?
        .parsoid_diff
        .get_or_insert_with(DataParsoidDiff::default)
        .add(mark);
    Ok(())
}

/// Record `mark` on any node, using a marker meta where the node cannot
/// carry the mark itself.
pub fn add_diff_mark(doc: &mut Document, node: NodeId, mark: DiffMark) -> Result<()> {
    if matches!(mark, DiffMark::Deleted | DiffMark::Moved) {
        prepend_typed_meta(doc, node, &format!("{DIFF_MARKER_PREFIX}{}", mark.as_str()));
    } else if doc.is_text(node) || doc.is_comment(node) {
        if mark != DiffMark::Inserted {
            error!(mark = mark.as_str(), "change marker on a text or comment node");
        }
        prepend_typed_meta(doc, node, &format!("{DIFF_MARKER_PREFIX}{}", mark.as_str()));
    } else {
        set_diff_mark(doc, node, mark)?;
    }
    Ok(())
}

/// Insert `<meta typeof="ty">` before `node`.
pub fn prepend_typed_meta(doc: &mut Document, node: NodeId, ty: &str) -> NodeId {
    let meta = doc.create_element("meta");
    add_type_of(doc, meta, ty);
    doc.insert_before(node, meta);
    meta
}

/// Check whether the node is a diff marker meta, of kind `mark` if given.
pub fn is_diff_marker(doc: &Document, node: Option<NodeId>, mark: Option<DiffMark>) -> bool {
    let Some(node) = node else {
        return false;
    };
    if !doc.is_tag(node, "meta") {
        return false;
    }
    let mut types = doc.attr(node, "typeof").unwrap_or_default().split_ascii_whitespace();
    match mark {
        Some(mark) => types.any(|t| {
            t.strip_prefix(DIFF_MARKER_PREFIX) == Some(mark.as_str())
        }),
        None => types.any(|t| t.starts_with(DIFF_MARKER_PREFIX)),
    }
}

/// Anything but comments, whitespace-only text and diff markers.
pub fn is_content_node(doc: &Document, node: NodeId) -> bool {
    !doc.is_comment(node) && !is_iew(doc, node) && !is_diff_marker(doc, Some(node), None)
}

// ============================================================================
// Navigation skipping diff markers
// ============================================================================

pub fn first_non_deleted_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.children(node)
        .find(|&c| !is_diff_marker(doc, Some(c), None))
}

pub fn last_non_deleted_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut child = doc.last_child(node);
    while let Some(c) = child {
        if !is_diff_marker(doc, Some(c), None) {
            return Some(c);
        }
        child = doc.prev_sibling(c);
    }
    None
}

pub fn next_non_deleted_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut next = doc.next_sibling(node);
    while let Some(n) = next {
        if !is_diff_marker(doc, Some(n), None) {
            return Some(n);
        }
        next = doc.next_sibling(n);
    }
    None
}

pub fn previous_non_deleted_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut prev = doc.prev_sibling(node);
    while let Some(p) = prev {
        if !is_diff_marker(doc, Some(p), None) {
            return Some(p);
        }
        prev = doc.prev_sibling(p);
    }
    None
}

pub fn num_non_deleted_child_nodes(doc: &Document, node: NodeId) -> usize {
    doc.children(node)
        .filter(|&c| !is_diff_marker(doc, Some(c), None))
        .count()
}

/// The `n`th (zero-based) child that is not a diff marker.
pub fn nth_non_deleted_child(doc: &Document, node: NodeId, n: usize) -> Option<NodeId> {
    doc.children(node)
        .filter(|&c| !is_diff_marker(doc, Some(c), None))
        .nth(n)
}

pub fn first_non_sep_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.children(node).find(|&c| is_content_node(doc, c))
}

pub fn last_non_sep_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut child = doc.last_child(node);
    while let Some(c) = child {
        if is_content_node(doc, c) {
            return Some(c);
        }
        child = doc.prev_sibling(c);
    }
    None
}

pub fn next_non_sep_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut next = doc.next_sibling(node);
    while let Some(n) = next {
        if is_content_node(doc, n) {
            return Some(n);
        }
        next = doc.next_sibling(n);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_children(doc: &Document) -> Vec<NodeId> {
        doc.children(doc.body().unwrap()).collect()
    }

    #[test]
    fn test_element_marks() {
        let mut doc = Document::parse("<p>a</p>");
        let p = body_children(&doc)[0];
        assert!(subtree_unchanged(&mut doc, p).unwrap());

        add_diff_mark(&mut doc, p, DiffMark::ModifiedWrapper).unwrap();
        assert!(subtree_unchanged(&mut doc, p).unwrap());
        assert!(!only_subtree_changed(&mut doc, p).unwrap());

        add_diff_mark(&mut doc, p, DiffMark::SubtreeChanged).unwrap();
        assert!(!subtree_unchanged(&mut doc, p).unwrap());
        assert!(has_diff_mark(&mut doc, p, DiffMark::SubtreeChanged).unwrap());
        assert!(!directly_children_changed(&mut doc, p).unwrap());
    }

    #[test]
    fn test_only_subtree_changed() {
        let mut doc = Document::parse("<p>a</p>");
        let p = body_children(&doc)[0];
        assert!(!only_subtree_changed(&mut doc, p).unwrap());
        set_diff_mark(&mut doc, p, DiffMark::ChildrenChanged).unwrap();
        set_diff_mark(&mut doc, p, DiffMark::SubtreeChanged).unwrap();
        assert!(only_subtree_changed(&mut doc, p).unwrap());
    }

    #[test]
    fn test_deleted_marker_meta() {
        let mut doc = Document::parse("<p>a</p><p>b</p>");
        let second = body_children(&doc)[1];
        add_diff_mark(&mut doc, second, DiffMark::Deleted).unwrap();

        let children = body_children(&doc);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.attr(children[1], "typeof"), Some("mw:DiffMarker/deleted"));
        assert!(has_diff_mark(&mut doc, second, DiffMark::Deleted).unwrap());
        assert!(maybe_deleted_node(&doc, Some(children[1])));
        assert!(!is_deleted_block_node(&doc, Some(children[1])));

        doc.set_attr(children[1], "data-is-block", "true");
        assert!(is_deleted_block_node(&doc, Some(children[1])));
    }

    #[test]
    fn test_inserted_text_uses_meta() {
        let mut doc = Document::parse("<p>a</p>");
        let p = body_children(&doc)[0];
        let text = doc.first_child(p).unwrap();
        add_diff_mark(&mut doc, text, DiffMark::Inserted).unwrap();
        assert!(has_inserted_diff_mark(&mut doc, text).unwrap());
        assert_eq!(num_non_deleted_child_nodes(&doc, p), 1);
        assert_eq!(first_non_deleted_child(&doc, p), Some(text));
    }

    #[test]
    fn test_navigation_skips_markers() {
        let mut doc = Document::parse("<div><b>1</b> <!--c--><i>2</i></div>");
        let div = body_children(&doc)[0];
        let b = doc.first_child(div).unwrap();
        let i = doc.last_child(div).unwrap();
        prepend_typed_meta(&mut doc, i, "mw:DiffMarker/deleted");
        prepend_typed_meta(&mut doc, b, "mw:DiffMarker/moved");

        assert_eq!(first_non_deleted_child(&doc, div), Some(b));
        assert_eq!(last_non_deleted_child(&doc, div), Some(i));
        assert_eq!(previous_non_deleted_sibling(&doc, i).map(|n| doc.is_comment(n)), Some(true));
        assert_eq!(nth_non_deleted_child(&doc, div, 3), Some(i));
        assert_eq!(first_non_sep_child(&doc, div), Some(b));
        assert_eq!(next_non_sep_sibling(&doc, b), Some(i));
        assert_eq!(last_non_sep_child(&doc, div), Some(i));
        assert!(next_non_deleted_sibling(&doc, i).is_none());
    }
}
