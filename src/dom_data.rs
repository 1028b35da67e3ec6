//! Typed access to the data records bound to DOM elements.
//!
//! Records are created lazily: reading a field that was never set yields a
//! default value that is persisted, so repeated reads observe the same
//! record.

use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::codec::DomDataCodec;
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::node_data::{
    DataMw, DataMwI18n, DataParsoid, DataParsoidDiff, I18nInfo, NodeData,
};

/// Attribute carrying an element's node data handle.
pub const DATA_OBJECT_ATTR_NAME: &str = "data-object-id";

fn handle_of(doc: &Document, node: NodeId) -> Option<u32> {
    doc.attr(node, DATA_OBJECT_ATTR_NAME)
        .and_then(|v| v.parse().ok())
}

// ============================================================================
// Records
// ============================================================================

/// Get the data record for an element, creating an empty one if needed.
///
/// Fails if the element's record has already been stored and the element
/// was not reloaded since.
pub fn get_node_data(doc: &mut Document, node: NodeId) -> Result<&mut NodeData> {
    if !doc.is_element(node) {
        return Err(Error::NotAnElement);
    }

    let handle = handle_of(doc, node).filter(|&h| doc.bag().get(h).is_some());
    let id = match handle {
        Some(h) => {
            if let Some(stored) = doc.bag().get(h).and_then(|d| d.stored_id) {
                return Err(Error::StaleNodeData(Some(stored)));
            }
            h
        }
        None => {
            match doc.attr(node, DATA_OBJECT_ATTR_NAME) {
                Some(raw) => warn!(handle = raw, "node data handle resolves to no record"),
                None => {
                    if let Some(flushed) = doc.bag().flushed_handle(node) {
                        return Err(Error::StaleNodeData(Some(flushed)));
                    }
                }
            }
            let id = doc.bag_mut().stash(NodeData::default());
            doc.set_attr(node, DATA_OBJECT_ATTR_NAME, id.to_string());
            id
        }
    };

    doc.bag_mut()
        .get_mut(id)
        .ok_or(Error::StaleNodeData(None))
}

/// Replace an element's record.
///
/// The record always gets a new handle, so other elements still pointing at
/// the old handle never alias the new record.
pub fn set_node_data(doc: &mut Document, node: NodeId, data: NodeData) -> Result<()> {
    if !doc.is_element(node) {
        return Err(Error::NotAnElement);
    }
    let id = doc.bag_mut().stash(data);
    doc.set_attr(node, DATA_OBJECT_ATTR_NAME, id.to_string());
    doc.bag_mut().clear_flushed(node);
    Ok(())
}

pub fn get_data_parsoid(doc: &mut Document, node: NodeId) -> Result<&mut DataParsoid> {
    Ok(get_node_data(doc, node)?
        .parsoid
        .get_or_insert_with(DataParsoid::default))
}

pub fn set_data_parsoid(doc: &mut Document, node: NodeId, dp: DataParsoid) -> Result<()> {
    get_node_data(doc, node)?.parsoid = Some(dp);
    Ok(())
}

pub fn get_data_mw(doc: &mut Document, node: NodeId) -> Result<&mut DataMw> {
    Ok(get_node_data(doc, node)?.mw.get_or_insert_with(DataMw::default))
}

/// Set or clear `data-mw`.
pub fn set_data_mw(doc: &mut Document, node: NodeId, dmw: Option<DataMw>) -> Result<()> {
    get_node_data(doc, node)?.mw = dmw;
    Ok(())
}

/// Check whether the element has a non-empty `data-mw`.
pub fn valid_data_mw(doc: &mut Document, node: NodeId) -> Result<bool> {
    Ok(get_node_data(doc, node)?
        .mw
        .as_ref()
        .is_some_and(|m| !m.is_empty()))
}

pub fn get_data_mw_i18n(doc: &mut Document, node: NodeId) -> Result<&mut DataMwI18n> {
    Ok(get_node_data(doc, node)?
        .i18n
        .get_or_insert_with(DataMwI18n::default))
}

/// Message localizing the element itself.
pub fn get_data_node_i18n(doc: &mut Document, node: NodeId) -> Result<Option<I18nInfo>> {
    Ok(get_data_mw_i18n(doc, node)?.span_info().cloned())
}

pub fn set_data_node_i18n(doc: &mut Document, node: NodeId, info: I18nInfo) -> Result<()> {
    get_data_mw_i18n(doc, node)?.set_span_info(info);
    Ok(())
}

/// Message localizing one of the element's attributes.
pub fn get_data_attr_i18n(doc: &mut Document, node: NodeId, name: &str) -> Result<Option<I18nInfo>> {
    Ok(get_data_mw_i18n(doc, node)?.attribute_info(name).cloned())
}

pub fn set_data_attr_i18n(
    doc: &mut Document,
    node: NodeId,
    name: &str,
    info: I18nInfo,
) -> Result<()> {
    get_data_mw_i18n(doc, node)?.set_attribute_info(name, info);
    Ok(())
}

/// Names of the attributes that carry a localized message.
pub fn get_data_attr_i18n_names(doc: &mut Document, node: NodeId) -> Result<Vec<String>> {
    Ok(get_data_mw_i18n(doc, node)?
        .attribute_names()
        .map(str::to_string)
        .collect())
}

/// Diff marker, if the element has one. Never created implicitly.
pub fn get_data_parsoid_diff(
    doc: &mut Document,
    node: NodeId,
) -> Result<Option<&mut DataParsoidDiff>> {
    Ok(get_node_data(doc, node)?.parsoid_diff.as_mut())
}

pub fn set_data_parsoid_diff(
    doc: &mut Document,
    node: NodeId,
    diff: Option<DataParsoidDiff>,
) -> Result<()> {
    get_node_data(doc, node)?.parsoid_diff = diff;
    Ok(())
}

// ============================================================================
// Attributes
// ============================================================================

/// Check whether the element has no attributes besides its node data
/// handle. A plain `xmlns` attribute does not count either.
pub fn has_no_attributes(doc: &Document, node: NodeId) -> bool {
    doc.attrs(node).iter().all(|a| {
        a.name.prefix.is_none()
            && (a.local_name() == DATA_OBJECT_ATTR_NAME || a.local_name() == "xmlns")
    })
}

/// Decode a JSON-valued attribute.
///
/// A missing attribute yields `default`; so does a malformed one, after a
/// warning.
pub fn get_json_attribute<T: DeserializeOwned>(
    doc: &Document,
    node: NodeId,
    name: &str,
    default: T,
) -> T {
    let Some(raw) = doc.attr(node, name) else {
        return default;
    };
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(attribute = name, error = %e, "could not decode attribute JSON");
            default
        }
    }
}

pub fn set_json_attribute<T: Serialize + ?Sized>(
    doc: &mut Document,
    node: NodeId,
    name: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    doc.set_attr(node, name, json);
    Ok(())
}

/// Record that attribute `name` was normalized from `orig` to `val`.
///
/// Existing shadow info for `name` keeps its original source value.
pub fn set_shadow_info(
    doc: &mut Document,
    node: NodeId,
    name: &str,
    val: &str,
    orig: Option<&str>,
) -> Result<()> {
    let Some(orig) = orig else {
        return Ok(());
    };
    if val == orig {
        return Ok(());
    }
    let dp = get_data_parsoid(doc, node)?;
    let a = dp.a.get_or_insert_with(Default::default);
    let sa = dp.sa.get_or_insert_with(Default::default);
    if !a.contains_key(name) {
        sa.insert(name.to_string(), Some(orig.to_string()));
    }
    a.insert(name.to_string(), Some(val.to_string()));
    Ok(())
}

/// Set an attribute and remember its pre-normalization value.
pub fn add_normalized_attribute(
    doc: &mut Document,
    node: NodeId,
    name: &str,
    val: &str,
    orig: Option<&str>,
) -> Result<()> {
    doc.set_attr(node, name, val);
    set_shadow_info(doc, node, name, val, orig)
}

// ============================================================================
// typeof
// ============================================================================

fn type_of_tokens(doc: &Document, node: NodeId) -> impl Iterator<Item = &str> {
    doc.attr(node, "typeof")
        .unwrap_or_default()
        .split_ascii_whitespace()
}

/// Check whether `ty` is one of the element's `typeof` tokens.
pub fn has_type_of(doc: &Document, node: NodeId, ty: &str) -> bool {
    type_of_tokens(doc, node).any(|t| t == ty)
}

/// First `typeof` token matching `re`.
pub fn match_type_of(doc: &Document, node: NodeId, re: &Regex) -> Option<String> {
    type_of_tokens(doc, node)
        .find(|t| re.is_match(t))
        .map(str::to_string)
}

pub fn add_type_of(doc: &mut Document, node: NodeId, ty: &str) {
    let mut types: Vec<String> = type_of_tokens(doc, node).map(str::to_string).collect();
    if !types.iter().any(|t| t == ty) {
        types.push(ty.to_string());
    }
    doc.set_attr(node, "typeof", types.join(" "));
}

/// Remove `ty` from `typeof`, dropping the attribute once it is empty.
pub fn remove_type_of(doc: &mut Document, node: NodeId, ty: &str) {
    let types: Vec<String> = type_of_tokens(doc, node)
        .filter(|t| *t != ty)
        .map(str::to_string)
        .collect();
    if types.is_empty() {
        doc.remove_attr(node, "typeof");
    } else {
        doc.set_attr(node, "typeof", types.join(" "));
    }
}

// ============================================================================
// Cloning and rich attributes
// ============================================================================

/// Clone a node, giving every cloned element its own copy of the source's
/// data record under a fresh handle.
pub fn clone_node(doc: &mut Document, node: NodeId, deep: bool) -> Result<NodeId> {
    let copy = if deep {
        doc.clone_subtree(node)
    } else {
        let kind = doc.get(node).map(|n| n.kind.clone()).ok_or(Error::NotAnElement)?;
        doc.alloc(kind)
    };

    let elements: Vec<_> = doc
        .descendants(copy)
        .filter(|&n| doc.is_element(n) && doc.has_attr(n, DATA_OBJECT_ATTR_NAME))
        .collect();
    for element in elements {
        let mut data = get_node_data(doc, element)?.clone();
        for fragment in data.fragments.values_mut() {
            *fragment = clone_node(doc, *fragment, true)?;
        }
        set_node_data(doc, element, data)?;
    }
    Ok(copy)
}

/// Attach a rich (fragment-valued) attribute to an element.
///
/// The fragment is written out as JSON by the next store pass.
pub fn set_attribute_fragment(
    doc: &mut Document,
    node: NodeId,
    name: &str,
    fragment: NodeId,
) -> Result<()> {
    get_node_data(doc, node)?
        .fragments
        .insert(name.to_string(), fragment);
    doc.remove_attr(node, name);
    Ok(())
}

/// Get a rich attribute, decoding its JSON form on first access.
pub fn get_attribute_fragment(
    doc: &mut Document,
    codec: &mut DomDataCodec,
    node: NodeId,
    name: &str,
) -> Result<Option<NodeId>> {
    if let Some(&fragment) = get_node_data(doc, node)?.fragments.get(name) {
        return Ok(Some(fragment));
    }
    let Some(raw) = doc.remove_attr(node, name) else {
        return Ok(None);
    };
    let fragment = codec.decode_fragment(doc, &raw)?;
    get_node_data(doc, node)?
        .fragments
        .insert(name.to_string(), fragment);
    Ok(Some(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_data::TempData;

    fn doc_with_span() -> (Document, NodeId) {
        let mut doc = Document::parse("<span>x</span>");
        let span = doc.first_child(doc.body().unwrap()).unwrap();
        (doc, span)
    }

    #[test]
    fn test_lazy_record_creation() {
        let (mut doc, span) = doc_with_span();
        assert!(!doc.has_attr(span, DATA_OBJECT_ATTR_NAME));

        get_data_parsoid(&mut doc, span).unwrap().stx = Some("html".into());
        let handle = doc.attr(span, DATA_OBJECT_ATTR_NAME).unwrap().to_string();

        assert_eq!(get_data_parsoid(&mut doc, span).unwrap().stx.as_deref(), Some("html"));
        assert_eq!(doc.attr(span, DATA_OBJECT_ATTR_NAME), Some(handle.as_str()));
    }

    #[test]
    fn test_set_node_data_mints_new_handle() {
        let (mut doc, span) = doc_with_span();
        get_node_data(&mut doc, span).unwrap();
        let before = doc.attr(span, DATA_OBJECT_ATTR_NAME).unwrap().to_string();

        let mut data = NodeData::default();
        data.parsoid = Some(DataParsoid {
            stx: Some("piped".into()),
            ..Default::default()
        });
        set_node_data(&mut doc, span, data).unwrap();

        assert_ne!(doc.attr(span, DATA_OBJECT_ATTR_NAME), Some(before.as_str()));
        assert_eq!(
            get_data_parsoid(&mut doc, span).unwrap().stx.as_deref(),
            Some("piped")
        );
    }

    #[test]
    fn test_stale_record_is_an_error() {
        let (mut doc, span) = doc_with_span();
        get_node_data(&mut doc, span).unwrap().stored_id = Some(0);
        assert!(matches!(
            get_node_data(&mut doc, span),
            Err(Error::StaleNodeData(Some(0)))
        ));
    }

    #[test]
    fn test_unknown_handle_gets_fresh_record() {
        let (mut doc, span) = doc_with_span();
        doc.set_attr(span, DATA_OBJECT_ATTR_NAME, "999");
        get_node_data(&mut doc, span).unwrap();
        assert_eq!(doc.attr(span, DATA_OBJECT_ATTR_NAME), Some("0"));
    }

    #[test]
    fn test_non_element_is_rejected() {
        let (mut doc, span) = doc_with_span();
        let text = doc.first_child(span).unwrap();
        assert!(matches!(get_node_data(&mut doc, text), Err(Error::NotAnElement)));
    }

    #[test]
    fn test_has_no_attributes() {
        let mut doc = Document::new();
        let el = doc.create_element("span");
        assert!(has_no_attributes(&doc, el));

        get_node_data(&mut doc, el).unwrap();
        assert!(has_no_attributes(&doc, el));

        doc.set_attr(el, "xmlns", "http://www.w3.org/1999/xhtml");
        assert!(has_no_attributes(&doc, el));

        doc.set_attr(el, "xmlns:foo", "urn:x");
        assert!(!has_no_attributes(&doc, el));
    }

    #[test]
    fn test_json_attribute_falls_back_on_garbage() {
        let (mut doc, span) = doc_with_span();
        doc.set_attr(span, "data-parsoid", "{not json");
        let dp: DataParsoid = get_json_attribute(&doc, span, "data-parsoid", DataParsoid::default());
        assert_eq!(dp, DataParsoid::default());

        set_json_attribute(&mut doc, span, "data-parsoid", &serde_json::json!({"stx": "html"})).unwrap();
        let dp: DataParsoid = get_json_attribute(&doc, span, "data-parsoid", DataParsoid::default());
        assert_eq!(dp.stx.as_deref(), Some("html"));
    }

    #[test]
    fn test_shadow_info_keeps_first_original() {
        let (mut doc, span) = doc_with_span();
        add_normalized_attribute(&mut doc, span, "id", "mwAA", Some("dup")).unwrap();
        set_shadow_info(&mut doc, span, "id", "mwAQ", Some("other")).unwrap();

        let dp = get_data_parsoid(&mut doc, span).unwrap();
        assert_eq!(dp.a.as_ref().unwrap()["id"].as_deref(), Some("mwAQ"));
        assert_eq!(dp.sa.as_ref().unwrap()["id"].as_deref(), Some("dup"));
        assert_eq!(doc.attr(span, "id"), Some("mwAA"));
    }

    #[test]
    fn test_shadow_info_ignores_unchanged_values() {
        let (mut doc, span) = doc_with_span();
        set_shadow_info(&mut doc, span, "id", "same", Some("same")).unwrap();
        set_shadow_info(&mut doc, span, "id", "new", None).unwrap();
        assert!(get_data_parsoid(&mut doc, span).unwrap().a.is_none());
    }

    #[test]
    fn test_type_of_helpers() {
        let (mut doc, span) = doc_with_span();
        add_type_of(&mut doc, span, "mw:Transclusion");
        add_type_of(&mut doc, span, "mw:Error");
        add_type_of(&mut doc, span, "mw:Error");
        assert_eq!(doc.attr(span, "typeof"), Some("mw:Transclusion mw:Error"));
        assert!(has_type_of(&doc, span, "mw:Error"));

        let re = Regex::new("^mw:Trans").unwrap();
        assert_eq!(match_type_of(&doc, span, &re).as_deref(), Some("mw:Transclusion"));

        remove_type_of(&mut doc, span, "mw:Transclusion");
        remove_type_of(&mut doc, span, "mw:Error");
        assert!(!doc.has_attr(span, "typeof"));
    }

    #[test]
    fn test_clone_node_does_not_share_records() {
        let mut doc = Document::parse("<div><span>x</span></div>");
        let div = doc.first_child(doc.body().unwrap()).unwrap();
        let span = doc.first_child(div).unwrap();
        get_data_parsoid(&mut doc, span)
            .unwrap()
            .set_temp_flag(TempData::IS_NEW, true);

        let copy = clone_node(&mut doc, div, true).unwrap();
        let span_copy = doc.first_child(copy).unwrap();
        assert_ne!(
            doc.attr(span, DATA_OBJECT_ATTR_NAME),
            doc.attr(span_copy, DATA_OBJECT_ATTR_NAME)
        );

        get_data_parsoid(&mut doc, span_copy)
            .unwrap()
            .set_temp_flag(TempData::IS_NEW, false);
        assert!(get_data_parsoid(&mut doc, span).unwrap().get_temp_flag(TempData::IS_NEW));
    }

    #[test]
    fn test_i18n_accessors() {
        let (mut doc, span) = doc_with_span();
        assert_eq!(get_data_node_i18n(&mut doc, span).unwrap(), None);

        set_data_node_i18n(&mut doc, span, I18nInfo::page_message("a", None)).unwrap();
        set_data_attr_i18n(&mut doc, span, "title", I18nInfo::user_message("b", None)).unwrap();

        assert_eq!(get_data_node_i18n(&mut doc, span).unwrap().unwrap().key, "a");
        assert_eq!(get_data_attr_i18n(&mut doc, span, "title").unwrap().unwrap().key, "b");
        assert_eq!(get_data_attr_i18n_names(&mut doc, span).unwrap(), vec!["title"]);
    }
}
