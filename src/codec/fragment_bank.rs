//! Encoding of fragment-valued attributes.
//!
//! A fragment is written either inline as `{"_h": "<html>"}` or, with the
//! fragment bank enabled, as a `<template data-tid>` in `<head>` referenced
//! by `{"_t": "<tid>"}`. Banked fragments are popped on decode, so each
//! reference resolves once.

use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::DomDataCodec;
use crate::dom::{Document, NodeId};
use crate::dom_data::clone_node;
use crate::error::{Error, Result};

const TID_ATTR: &str = "data-tid";

fn make_tid(base: &str, count: u32) -> String {
    if count == 0 {
        base.to_string()
    } else {
        format!("{base}-{count}")
    }
}

fn split_tid(tid: &str) -> (&str, u32) {
    match tid.split_once('-') {
        Some((base, count)) => (base, count.parse().unwrap_or(0)),
        None => (tid, 0),
    }
}

impl DomDataCodec {
    fn ensure_fragment_index(&mut self, doc: &Document) {
        if self.fragment_index.is_some() {
            return;
        }
        let mut index: HashMap<String, BTreeMap<u32, NodeId>> = HashMap::new();
        if let Some(head) = doc.head() {
            for template in doc.children(head).filter(|&c| doc.is_tag(c, "template")) {
                if let Some(tid) = doc.attr(template, TID_ATTR) {
                    let (base, count) = split_tid(tid);
                    index.entry(base.to_string()).or_default().insert(count, template);
                }
            }
        }
        self.fragment_index = Some(index);
    }

    /// Tag `template` with an unused id derived from `base`.
    pub(crate) fn set_unique_tid(&mut self, doc: &mut Document, base: &str, template: NodeId) -> String {
        self.ensure_fragment_index(doc);
        let index = self.fragment_index.get_or_insert_with(Default::default);
        let entries = index.entry(base.to_string()).or_default();
        let count = match self.fragment_max.get(base) {
            Some(&max) => max + 1,
            None => entries.keys().next_back().map_or(0, |&max| max + 1),
        };
        self.fragment_max.insert(base.to_string(), count);
        entries.insert(count, template);

        let tid = make_tid(base, count);
        doc.set_attr(template, TID_ATTR, tid.as_str());
        tid
    }

    /// Remove a banked template from the document and return it.
    pub(crate) fn pop_tid(&mut self, doc: &mut Document, tid: &str) -> Result<NodeId> {
        let (base, count) = split_tid(tid);
        self.ensure_fragment_index(doc);
        let template = self
            .fragment_index
            .as_mut()
            .and_then(|index| index.get_mut(base))
            .and_then(|entries| entries.remove(&count))
            .ok_or_else(|| Error::MissingFragment(tid.to_string()))?;
        // The recorded max may now overshoot.
        self.fragment_max.remove(base);
        doc.detach(template);
        Ok(template)
    }

    /// Encode a fragment as the JSON value of a rich attribute.
    ///
    /// Elements inside the fragment are stored with this codec's options,
    /// so banked fragments share one numbering.
    pub fn encode_fragment(&mut self, doc: &mut Document, fragment: NodeId) -> Result<Value> {
        if self.store.use_fragment_bank {
            self.store_subtree(doc, fragment)?;
            let head = doc.head().ok_or(Error::MissingElement("head"))?;
            let template = doc.create_element("template");
            doc.migrate_children(fragment, template);
            doc.append(head, template);

            let hash = Sha256::digest(doc.text_content(template).as_bytes());
            let base = STANDARD.encode(&hash[..6]);
            let tid = self.set_unique_tid(doc, &base, template);
            debug!(tid = %tid, "banked fragment");
            Ok(json!({ "_t": tid }))
        } else if self.store.no_side_effects {
            let copy = clone_node(doc, fragment, true)?;
            self.store_subtree(doc, copy)?;
            Ok(json!({ "_h": doc.inner_html(copy) }))
        } else {
            self.store_subtree(doc, fragment)?;
            Ok(json!({ "_h": doc.inner_html(fragment) }))
        }
    }

    /// Decode a rich attribute's JSON into a fresh, loaded fragment.
    pub fn decode_fragment(&mut self, doc: &mut Document, json: &str) -> Result<NodeId> {
        let value: Value = serde_json::from_str(json)?;
        let fragment = if let Some(tid) = value.get("_t").and_then(Value::as_str) {
            let template = self.pop_tid(doc, tid)?;
            let fragment = doc.create_fragment();
            doc.migrate_children(template, fragment);
            fragment
        } else if let Some(html) = value.get("_h").and_then(Value::as_str) {
            doc.parse_fragment(html)
        } else {
            return Err(Error::InvalidFragment(json.to_string()));
        };

        let children: Vec<_> = doc.children(fragment).collect();
        for child in children {
            self.visit_and_load(doc, child)?;
        }
        Ok(fragment)
    }
}
