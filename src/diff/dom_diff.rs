//! Relaxed structural diff between two DOMs.
//!
//! The diff walks both trees in parallel and annotates the *new* tree with
//! change markers (see [`super::markers`]). Mismatches are resolved with a
//! single level of sibling look-ahead: a base node found further along the
//! new siblings means the skipped nodes were inserted, a new node found
//! further along the base siblings means the skipped nodes were deleted.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::{debug, error, trace};

use super::markers::{prepend_typed_meta, set_diff_mark};
use crate::codec::{LoadOptions, visit_and_load_data_attribs};
use crate::dom::{Document, NodeId, NodeKind};
use crate::dom_data::{
    DATA_OBJECT_ATTR_NAME, add_type_of, get_data_parsoid, get_node_data, match_type_of,
};
use crate::encapsulation::{is_encapsulation_wrapper, skip_over_encapsulated_content};
use crate::error::Result;
use crate::node_data::{DataMw, DataParsoid, DiffMark};

/// Attributes that never count as a difference.
const IGNORE_ATTRIBUTES: &[&str] = &["data-parsoid-diff", "about", DATA_OBJECT_ATTR_NAME];

const DATA_PARSOID: &str = "data-parsoid";
const DATA_MW: &str = "data-mw";

static EXTENSION_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mw:Extension/").expect("valid regex"));

/// An attribute value as seen by the comparator.
///
/// `data-parsoid` and `data-mw` are compared as the loaded records, every
/// other attribute as its string value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    DataParsoid(DataParsoid),
    DataMw(DataMw),
}

impl AttrValue {
    /// Only empty strings count as missing; records never do.
    fn is_empty(&self) -> bool {
        matches!(self, AttrValue::Text(s) if s.is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Custom equality for one attribute name.
pub type AttribHandler = Box<dyn Fn(&AttrValue, &AttrValue) -> bool>;

/// Outcome of [`DomDiff::diff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffResult {
    /// No difference was found.
    pub is_empty: bool,
}

/// DOM differ.
pub struct DomDiff {
    /// Treat each encapsulated forest as an opaque unit: its members are
    /// stepped over as one and never recursed into.
    pub skip_encapsulated_content: bool,
    handlers: HashMap<String, AttribHandler>,
}

impl Default for DomDiff {
    fn default() -> Self {
        Self::new()
    }
}

impl DomDiff {
    pub fn new() -> Self {
        let mut handlers: HashMap<String, AttribHandler> = HashMap::new();
        handlers.insert(DATA_PARSOID.to_string(), Box::new(|a, b| a == b));
        Self {
            skip_encapsulated_content: true,
            handlers,
        }
    }

    /// Compare attribute `name` with `handler` instead of string equality.
    ///
    /// A handler for `data-mw` replaces the built-in comparison, which
    /// parses embedded HTML and follows `body.id` references.
    pub fn set_attrib_handler(
        &mut self,
        name: &str,
        handler: impl Fn(&AttrValue, &AttrValue) -> bool + 'static,
    ) {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    /// Diff the children of `a` against the children of `b`, marking changes
    /// in `b_doc`.
    pub fn diff(
        &self,
        a_doc: &mut Document,
        a: NodeId,
        b_doc: &mut Document,
        b: NodeId,
    ) -> Result<DiffResult> {
        trace!(orig = %a_doc.outer_html(a), new = %b_doc.outer_html(b), "domdiff");
        let found_change = self.do_dom_diff(a_doc, a, b_doc, b)?;
        Ok(DiffResult {
            is_empty: !found_change,
        })
    }

    fn next_non_template_sibling(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        if self.skip_encapsulated_content && is_encapsulation_wrapper(doc, node) {
            return skip_over_encapsulated_content(doc, node);
        }
        doc.next_sibling(node)
    }

    fn is_opaque(&self, doc: &Document, node: NodeId) -> bool {
        self.skip_encapsulated_content && is_encapsulation_wrapper(doc, node)
    }

    // ------------------------------------------------------------------------
    // Equality
    // ------------------------------------------------------------------------

    /// Test whether two nodes are equal, comparing children if `deep`.
    pub fn tree_equals(
        &self,
        a_doc: &mut Document,
        a: NodeId,
        b_doc: &mut Document,
        b: NodeId,
        deep: bool,
    ) -> Result<bool> {
        if a_doc.is_text(a) && b_doc.is_text(b) {
            return Ok(a_doc.node_value(a) == b_doc.node_value(b));
        }
        if a_doc.is_comment(a) && b_doc.is_comment(b) {
            let comment_a = decode_comment(a_doc.node_value(a).unwrap_or_default());
            let comment_b = decode_comment(b_doc.node_value(b).unwrap_or_default());
            return Ok(comment_a == comment_b);
        }
        if a_doc.is_element(a) && b_doc.is_element(b) {
            if a_doc.tag_name(a) != b_doc.tag_name(b) || !self.attribs_equal(a_doc, a, b_doc, b)? {
                return Ok(false);
            }
        } else if !(is_container(a_doc, a) && is_container(b_doc, b)) {
            return Ok(false);
        }

        if deep {
            self.children_equal(a_doc, a, b_doc, b)
        } else {
            Ok(true)
        }
    }

    fn children_equal(
        &self,
        a_doc: &mut Document,
        a: NodeId,
        b_doc: &mut Document,
        b: NodeId,
    ) -> Result<bool> {
        let children_a: Vec<_> = a_doc.children(a).collect();
        let children_b: Vec<_> = b_doc.children(b).collect();
        if children_a.len() != children_b.len() {
            return Ok(false);
        }
        for (ca, cb) in children_a.into_iter().zip(children_b) {
            if !self.tree_equals(a_doc, ca, b_doc, cb, true)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn attrib_map(doc: &mut Document, node: NodeId) -> Result<BTreeMap<String, AttrValue>> {
        let mut map: BTreeMap<String, AttrValue> = doc
            .attrs(node)
            .iter()
            .filter(|a| !IGNORE_ATTRIBUTES.contains(&a.local_name()))
            .map(|a| (a.local_name().to_string(), AttrValue::Text(a.value.clone())))
            .collect();

        let data = get_node_data(doc, node)?;
        let dp = data.parsoid.get_or_insert_with(DataParsoid::default).clone();
        map.insert(DATA_PARSOID.to_string(), AttrValue::DataParsoid(dp));
        if let Some(mw) = data.mw.as_ref().filter(|m| !m.is_empty()) {
            map.insert(DATA_MW.to_string(), AttrValue::DataMw(mw.clone()));
        }
        Ok(map)
    }

    fn attribs_equal(
        &self,
        a_doc: &mut Document,
        a: NodeId,
        b_doc: &mut Document,
        b: NodeId,
    ) -> Result<bool> {
        let attrs_a = Self::attrib_map(a_doc, a)?;
        let attrs_b = Self::attrib_map(b_doc, b)?;
        if attrs_a.len() != attrs_b.len() {
            return Ok(false);
        }

        for ((ka, va), (kb, vb)) in attrs_a.iter().zip(&attrs_b) {
            if ka != kb {
                return Ok(false);
            }
            let equal = match (self.handlers.get(ka.as_str()), va, vb) {
                (Some(handler), _, _) => !va.is_empty() && !vb.is_empty() && handler(va, vb),
                (None, AttrValue::DataMw(x), AttrValue::DataMw(y)) => {
                    self.data_mw_equals(a_doc, a, &x.0, b_doc, b, &y.0, true, false)?
                }
                (None, _, _) => va == vb,
            };
            if !equal {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Compare two `data-mw` objects independent of key order.
    ///
    /// Inside `body`, an `html` string is compared as parsed DOM and an `id`
    /// as the element it references.
    #[allow(clippy::too_many_arguments)]
    fn data_mw_equals(
        &self,
        a_doc: &mut Document,
        a: NodeId,
        dmw_a: &Map<String, Value>,
        b_doc: &mut Document,
        b: NodeId,
        dmw_b: &Map<String, Value>,
        top_level: bool,
        in_body: bool,
    ) -> Result<bool> {
        if dmw_a.len() != dmw_b.len() {
            return Ok(false);
        }

        let mut keys_a: Vec<_> = dmw_a.keys().collect();
        let mut keys_b: Vec<_> = dmw_b.keys().collect();
        keys_a.sort();
        keys_b.sort();

        for (ka, kb) in keys_a.into_iter().zip(keys_b) {
            if ka != kb {
                return Ok(false);
            }
            let va = &dmw_a[ka];
            let vb = &dmw_b[ka];

            let equal = if is_falsy(va) || is_falsy(vb) {
                va == vb
            } else if !same_json_type(va, vb) {
                false
            } else if ka == "id" && in_body {
                self.body_ids_equal(a_doc, a, va, b_doc, b, vb)?
            } else if ka == "html" && in_body {
                match (va.as_str(), vb.as_str()) {
                    (Some(html_a), Some(html_b)) => self.html_equals(html_a, html_b)?,
                    _ => va == vb,
                }
            } else if va.is_object() || va.is_array() {
                let (ma, mb) = (as_map(va), as_map(vb));
                self.data_mw_equals(a_doc, a, &ma, b_doc, b, &mb, false, top_level && ka == "body")?
            } else {
                va == vb
            };

            if !equal {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn body_ids_equal(
        &self,
        a_doc: &mut Document,
        a: NodeId,
        va: &Value,
        b_doc: &mut Document,
        b: NodeId,
        vb: &Value,
    ) -> Result<bool> {
        let html_a = va.as_str().and_then(|id| a_doc.get_element_by_id(id));
        let html_b = vb.as_str().and_then(|id| b_doc.get_element_by_id(id));
        if let (Some(ea), Some(eb)) = (html_a, html_b) {
            return self.tree_equals(a_doc, ea, b_doc, eb, true);
        }

        let ext = match_type_of(a_doc, a, &EXTENSION_TYPE)
            .map(|t| t["mw:Extension/".len()..].to_string())
            .unwrap_or_else(|| "---".to_string());
        if html_a.is_none() {
            error!(ext = %ext, id = %va, node = %a_doc.outer_html(a), "orig: extension src id points to non-existent element");
        }
        if html_b.is_none() {
            error!(ext = %ext, id = %vb, node = %b_doc.outer_html(b), "edited: extension src id points to non-existent element");
        }
        Ok(va == vb)
    }

    fn html_equals(&self, html_a: &str, html_b: &str) -> Result<bool> {
        let load = LoadOptions { mark_new: true };
        let mut doc_a = Document::new();
        let frag_a = doc_a.parse_fragment(html_a);
        visit_and_load_data_attribs(&mut doc_a, frag_a, load)?;
        let mut doc_b = Document::new();
        let frag_b = doc_b.parse_fragment(html_b);
        visit_and_load_data_attribs(&mut doc_b, frag_b, load)?;
        self.tree_equals(&mut doc_a, frag_a, &mut doc_b, frag_b, true)
    }

    // ------------------------------------------------------------------------
    // Diff
    // ------------------------------------------------------------------------

    fn debug_out(a_doc: &Document, a: NodeId, b_doc: &Document, b: NodeId, prefix: &str) {
        let describe = |doc: &Document, n: NodeId| {
            if doc.is_element(n) {
                doc.outer_html(n)
            } else {
                format!("{:?}", doc.node_value(n).unwrap_or_default())
            }
        };
        trace!("--> A{prefix}: {}", describe(a_doc, a));
        trace!("--> B{prefix}: {}", describe(b_doc, b));
    }

    /// Diff the children of two nodes, returning whether anything changed.
    fn do_dom_diff(
        &self,
        a_doc: &mut Document,
        base_parent: NodeId,
        b_doc: &mut Document,
        new_parent: NodeId,
    ) -> Result<bool> {
        let mut base_node = a_doc.first_child(base_parent);
        let mut new_node = b_doc.first_child(new_parent);
        let mut found_diff_overall = false;

        while let (Some(base), Some(new)) = (base_node, new_node) {
            let mut dont_advance_new_node = false;
            let mut next_base = base;
            let mut next_new = new;
            Self::debug_out(a_doc, base, b_doc, new, "");

            if !self.tree_equals(a_doc, base, b_doc, new, false)? {
                trace!("-- not equal --");
                let saved_new = new;
                let mut found_diff = false;

                // Look ahead in the new DOM for insertions.
                if is_content_node(a_doc, base) {
                    trace!("--lookahead in new dom--");
                    let mut lookahead = b_doc.next_sibling(new);
                    while let Some(la) = lookahead {
                        Self::debug_out(a_doc, base, b_doc, la, "new");
                        if is_content_node(b_doc, la) && self.tree_equals(a_doc, base, b_doc, la, true)? {
                            let mut mark = Some(new);
                            while let Some(m) = mark.filter(|&m| m != la) {
                                trace!("--found diff: inserted--");
                                mark_node(b_doc, m, DiffMark::Inserted, false)?;
                                mark = b_doc.next_sibling(m);
                            }
                            found_diff = true;
                            next_new = la;
                            break;
                        }
                        lookahead = self.next_non_template_sibling(b_doc, la);
                    }
                }

                // Look ahead in the base DOM for deletions.
                if !found_diff && is_content_node(b_doc, new) {
                    let mut is_block = is_block_node_with_visible_wt(a_doc, base)?;
                    trace!("--lookahead in old dom--");
                    let mut lookahead = a_doc.next_sibling(base);
                    while let Some(la) = lookahead {
                        Self::debug_out(a_doc, la, b_doc, new, "old");
                        if is_content_node(a_doc, la) && self.tree_equals(a_doc, la, b_doc, new, true)? {
                            trace!("--found diff: deleted--");
                            mark_node(b_doc, new, DiffMark::Deleted, is_block)?;
                            next_base = la;
                            found_diff = true;
                            break;
                        } else if !emits_sol_transparent_single_line_wt(a_doc, la)? {
                            // Only the deletion right before the match matters.
                            is_block = is_block_node_with_visible_wt(a_doc, la)?;
                        }
                        lookahead = self.next_non_template_sibling(a_doc, la);
                    }
                }

                if !found_diff {
                    if !b_doc.is_element(saved_new) {
                        debug!("--found diff: modified text/comment--");
                        let is_block = is_block_node_with_visible_wt(a_doc, base)?;
                        mark_node(b_doc, saved_new, DiffMark::Deleted, is_block)?;
                    } else if a_doc.tag_name(base) == b_doc.tag_name(saved_new)
                        && get_data_parsoid(b_doc, saved_new)?.stx == get_data_parsoid(a_doc, base)?.stx
                    {
                        debug!("--found diff: modified-wrapper--");
                        mark_node(b_doc, saved_new, DiffMark::ModifiedWrapper, false)?;
                        if !self.is_opaque(a_doc, base) && !self.is_opaque(b_doc, saved_new) {
                            if self.do_dom_diff(a_doc, base, b_doc, saved_new)? {
                                debug!("--found diff: subtree-changed--");
                                mark_node(b_doc, saved_new, DiffMark::SubtreeChanged, false)?;
                            }
                        }
                    } else {
                        // Compare this new node against the next base node.
                        dont_advance_new_node = true;
                        let is_block = is_block_node_with_visible_wt(a_doc, base)?;
                        mark_node(b_doc, saved_new, DiffMark::Deleted, is_block)?;
                    }
                }

                debug!("--found diff: children-changed--");
                mark_node(b_doc, new_parent, DiffMark::ChildrenChanged, false)?;
                found_diff_overall = true;
            } else if !self.is_opaque(a_doc, base) && !self.is_opaque(b_doc, new) {
                trace!("--shallow equal: recursing--");
                let subtree_differs = self.do_dom_diff(a_doc, base, b_doc, new)?;
                if subtree_differs {
                    debug!("--found diff: subtree-changed--");
                    mark_node(b_doc, new, DiffMark::SubtreeChanged, false)?;
                }
                found_diff_overall |= subtree_differs;
            }

            base_node = self.next_non_template_sibling(a_doc, next_base);
            new_node = if dont_advance_new_node {
                Some(next_new)
            } else {
                self.next_non_template_sibling(b_doc, next_new)
            };
        }

        while let Some(new) = new_node {
            debug!("--found trailing new node: inserted--");
            mark_node(b_doc, new, DiffMark::Inserted, false)?;
            found_diff_overall = true;
            new_node = self.next_non_template_sibling(b_doc, new);
        }

        if let Some(base) = base_node {
            debug!("--found trailing base nodes: deleted--");
            mark_node(b_doc, new_parent, DiffMark::ChildrenChanged, false)?;
            if b_doc.has_children(new_parent) {
                let meta = b_doc.create_element("meta");
                add_type_of(b_doc, meta, "mw:DiffMarker/deleted");
                if is_block_node_with_visible_wt(a_doc, base)? {
                    b_doc.set_attr(meta, "data-is-block", "true");
                }
                b_doc.append(new_parent, meta);
            }
            found_diff_overall = true;
        }

        Ok(found_diff_overall)
    }
}

/// Record a change on `node`, bubbling insertions and deletions up to the
/// parent as a children change.
fn mark_node(doc: &mut Document, node: NodeId, mark: DiffMark, block_deleted: bool) -> Result<()> {
    let meta = if mark == DiffMark::Deleted {
        Some(prepend_typed_meta(doc, node, "mw:DiffMarker/deleted"))
    } else if doc.is_element(node) {
        set_diff_mark(doc, node, mark)?;
        None
    } else if doc.is_text(node) || doc.is_comment(node) {
        if mark != DiffMark::Inserted {
            error!(mark = mark.as_str(), "change marker on a text or comment node");
        }
        Some(prepend_typed_meta(doc, node, &format!("mw:DiffMarker/{}", mark.as_str())))
    } else {
        None
    };

    if let Some(meta) = meta.filter(|_| block_deleted) {
        doc.set_attr(meta, "data-is-block", "true");
    }

    if matches!(mark, DiffMark::Deleted | DiffMark::Inserted) {
        if let Some(parent) = doc.parent(node) {
            mark_node(doc, parent, DiffMark::ChildrenChanged, false)?;
        }
    }
    Ok(())
}

fn is_content_node(doc: &Document, node: NodeId) -> bool {
    super::markers::is_content_node(doc, node)
}

fn is_container(doc: &Document, node: NodeId) -> bool {
    doc.get(node)
        .is_some_and(|n| matches!(n.kind, NodeKind::Document | NodeKind::Fragment))
}

fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(_) => false,
    }
}

fn same_json_type(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Arrays compare like objects keyed by index.
fn as_map(v: &Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item.clone()))
            .collect(),
        _ => Map::new(),
    }
}

// ============================================================================
// Wikitext rendering properties
// ============================================================================

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "table", "tbody", "thead", "tfoot", "caption", "th", "tr", "td", "ul", "ol", "li",
    "dl", "dt", "dd", "h1", "h2", "h3", "h4", "h5", "h6", "hgroup", "article", "aside", "nav",
    "section", "footer", "header", "figure", "figcaption", "fieldset", "details", "blockquote",
    "hr", "button", "canvas", "center", "col", "colgroup", "embed", "map", "object", "pre",
    "progress",
];

/// Tags whose wikitext form takes no characters.
const ZERO_WIDTH_WIKITEXT_TAGS: &[&str] = &[
    "p", "meta", "ol", "ul", "dl", "tbody", "thead", "tfoot", "br", "figcaption",
];

static SOL_TRANSPARENT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)mw:PageProp/(?:Category|redirect|Language)(?:$|\s)").expect("valid regex")
});

static START_OR_END_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mw:(?:StartTag|EndTag)$").expect("valid regex"));

pub fn is_block_node(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node).is_some_and(|t| BLOCK_TAGS.contains(&t))
}

fn is_literal_html_node(doc: &mut Document, node: NodeId) -> Result<bool> {
    Ok(doc.is_element(node) && get_data_parsoid(doc, node)?.stx.as_deref() == Some("html"))
}

pub fn is_zero_width_wikitext_elt(doc: &mut Document, node: NodeId) -> Result<bool> {
    Ok(doc.tag_name(node).is_some_and(|t| ZERO_WIDTH_WIKITEXT_TAGS.contains(&t))
        && !is_literal_html_node(doc, node)?)
}

/// A block element that shows up in wikitext. Parser-generated `<p>` and
/// list wrappers do not.
pub fn is_block_node_with_visible_wt(doc: &mut Document, node: NodeId) -> Result<bool> {
    Ok(is_block_node(doc, node) && !is_zero_width_wikitext_elt(doc, node)?)
}

/// Check whether the node's wikitext fits on the current line without
/// affecting start-of-line state: blank text, comments, category and
/// redirect links, behavior switches.
pub fn emits_sol_transparent_single_line_wt(doc: &mut Document, node: NodeId) -> Result<bool> {
    if doc.is_text(node) {
        return Ok(doc
            .node_value(node)
            .is_some_and(|s| s.chars().all(|c| c == ' ' || c == '\t')));
    }
    if doc.is_comment(node) {
        return Ok(true);
    }
    if doc.is_tag(node, "link") {
        return Ok(doc.attr(node, "rel").is_some_and(|r| SOL_TRANSPARENT_LINK.is_match(r)));
    }
    if doc.is_tag(node, "meta") {
        if match_type_of(doc, node, &START_OR_END_TAG).is_some() {
            return Ok(true);
        }
        return Ok(get_data_parsoid(doc, node)?.stx.as_deref() != Some("html"));
    }
    Ok(false)
}

// ============================================================================
// Comments
// ============================================================================

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]+)|#([0-9]+)|(amp|lt|gt|quot|apos|nbsp));").expect("valid regex")
});

static ESCAPED_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--(?:&(?:amp;)*gt;|>)").expect("valid regex"));

fn decode_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &Captures| {
            let code = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok()
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse().ok()
            } else {
                None
            };
            if let Some(c) = code.and_then(char::from_u32) {
                return c.to_string();
            }
            match caps.get(3).map(|m| m.as_str()) {
                Some("amp") => "&".to_string(),
                Some("lt") => "<".to_string(),
                Some("gt") => ">".to_string(),
                Some("quot") => "\"".to_string(),
                Some("apos") => "'".to_string(),
                Some("nbsp") => "\u{a0}".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Canonical form of a comment's value, in which `-->` never appears.
pub fn decode_comment(comment: &str) -> String {
    let value = decode_entities(comment);
    ESCAPED_CLOSE
        .replace_all(&value, |caps: &Captures| {
            let s = &caps[0];
            if s == "-->" {
                "--&gt;".to_string()
            } else {
                format!("--&amp;{}", &s[3..])
            }
        })
        .into_owned()
}
