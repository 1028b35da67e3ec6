//! Load and store passes over `data-*` attributes.

use std::collections::HashSet;

use tracing::{info, trace};

use super::{CounterType, DomDataCodec};
use crate::dom::{Document, NodeId};
use crate::dom_data::{
    DATA_OBJECT_ATTR_NAME, add_normalized_attribute, get_json_attribute, get_node_data,
    set_json_attribute, set_node_data,
};
use crate::error::Result;
use crate::node_data::{DataMw, DataMwI18n, DataParsoid, DataParsoidDiff, NodeData, TempData};

const DATA_PARSOID: &str = "data-parsoid";
const DATA_MW: &str = "data-mw";
const DATA_MW_I18N: &str = "data-mw-i18n";
const DATA_PARSOID_DIFF: &str = "data-parsoid-diff";

impl DomDataCodec {
    /// Load every element under `root` (inclusive).
    pub fn visit_and_load(&mut self, doc: &mut Document, root: NodeId) -> Result<()> {
        let elements: Vec<_> = doc
            .descendants(root)
            .filter(|&n| doc.is_element(n))
            .collect();
        for element in elements {
            self.load_data_attribs(doc, element)?;
        }
        Ok(())
    }

    /// Replace an element's record with one decoded from its inline
    /// attributes, consuming the attributes.
    pub fn load_data_attribs(&mut self, doc: &mut Document, node: NodeId) -> Result<()> {
        if !doc.is_element(node) {
            return Ok(());
        }

        let had_data_parsoid = doc.has_attr(node, DATA_PARSOID);
        let mut dp: DataParsoid = get_json_attribute(doc, node, DATA_PARSOID, DataParsoid::default());
        if self.load.mark_new && !had_data_parsoid {
            dp.set_temp_flag(TempData::IS_NEW, true);
        }

        let mw = doc
            .has_attr(node, DATA_MW)
            .then(|| get_json_attribute(doc, node, DATA_MW, DataMw::default()));
        let i18n = doc
            .has_attr(node, DATA_MW_I18N)
            .then(|| get_json_attribute(doc, node, DATA_MW_I18N, DataMwI18n::default()));
        let parsoid_diff = doc
            .has_attr(node, DATA_PARSOID_DIFF)
            .then(|| get_json_attribute(doc, node, DATA_PARSOID_DIFF, DataParsoidDiff::default()));

        for name in [DATA_PARSOID, DATA_MW, DATA_MW_I18N, DATA_PARSOID_DIFF] {
            doc.remove_attr(node, name);
        }

        set_node_data(
            doc,
            node,
            NodeData {
                parsoid: Some(dp),
                mw,
                i18n,
                parsoid_diff,
                ..Default::default()
            },
        )
    }

    /// Store every element under `root` (inclusive).
    ///
    /// Starts a new pass: the document's id index is rebuilt on demand.
    pub fn visit_and_store(&mut self, doc: &mut Document, root: NodeId) -> Result<()> {
        self.id_index = None;
        self.store_subtree(doc, root)
    }

    pub(super) fn store_subtree(&mut self, doc: &mut Document, root: NodeId) -> Result<()> {
        let elements: Vec<_> = doc
            .descendants(root)
            .filter(|&n| doc.is_element(n))
            .collect();
        for element in elements {
            self.store_data_attribs(doc, element)?;
        }
        Ok(())
    }

    /// Write an element's record out and strip its handle.
    ///
    /// The record stays in the bag marked as stored; reading it again
    /// without reloading the element fails.
    pub fn store_data_attribs(&mut self, doc: &mut Document, node: NodeId) -> Result<()> {
        if !doc.is_element(node) {
            return Ok(());
        }
        debug_assert!(
            !(self.store.discard_data_parsoid && self.store.keep_tmp),
            "discard_data_parsoid and keep_tmp are mutually exclusive"
        );

        let (discard, has_mw) = {
            let record = get_node_data(doc, node)?;
            let is_new = record
                .parsoid
                .as_ref()
                .is_some_and(|dp| dp.get_temp_flag(TempData::IS_NEW));
            let has_mw = record.mw.as_ref().is_some_and(|m| !m.is_empty());
            (self.store.discard_data_parsoid || is_new, has_mw)
        };

        let bundle_id = if self.store.store_in_page_bundle && (!discard || has_mw) {
            Some(self.page_bundle_id(doc, node)?)
        } else {
            None
        };

        let record = get_node_data(doc, node)?.clone();
        let dp = (!discard).then(|| {
            let mut dp = record.parsoid.unwrap_or_default();
            if !self.store.keep_tmp {
                dp.tmp = None;
            }
            dp
        });
        let mw = record.mw.filter(|m| !m.is_empty());

        for (name, fragment) in &record.fragments {
            let encoded = self.encode_fragment(doc, *fragment)?;
            set_json_attribute(doc, node, name, &encoded)?;
        }

        match bundle_id {
            Some(uid) => {
                let bundle = doc.bag_mut().page_bundle_mut();
                if let Some(dp) = dp {
                    bundle.parsoid.ids.insert(uid.clone(), serde_json::to_value(dp)?);
                }
                if let Some(mw) = mw {
                    bundle.mw.ids.insert(uid, serde_json::to_value(mw)?);
                }
            }
            None if !self.store.store_in_page_bundle => {
                if let Some(dp) = &dp {
                    set_json_attribute(doc, node, DATA_PARSOID, dp)?;
                }
                if let Some(mw) = &mw {
                    set_json_attribute(doc, node, DATA_MW, mw)?;
                }
            }
            None => {}
        }

        if let Some(i18n) = record.i18n.filter(|i| !i.is_empty()) {
            set_json_attribute(doc, node, DATA_MW_I18N, &i18n)?;
        }
        if self.store.store_diff_mark {
            if let Some(diff) = &record.parsoid_diff {
                set_json_attribute(doc, node, DATA_PARSOID_DIFF, diff)?;
            }
        }

        let handle = doc
            .remove_attr(node, DATA_OBJECT_ATTR_NAME)
            .and_then(|h| h.parse().ok());
        if let Some(handle) = handle {
            if let Some(stored) = doc.bag_mut().get_mut(handle) {
                stored.stored_id = Some(handle);
            }
            doc.bag_mut().mark_flushed(node, handle);
        }
        Ok(())
    }

    /// Pick the page-bundle key for an element, minting a fresh `id` when
    /// it has none or its id is already in the bundle.
    fn page_bundle_id(&mut self, doc: &mut Document, node: NodeId) -> Result<String> {
        let orig = doc.attr(node, "id").map(str::to_string);
        if let Some(id) = &orig {
            let bundle = doc.bag().page_bundle();
            if !bundle.parsoid.ids.contains_key(id) && !bundle.mw.ids.contains_key(id) {
                return Ok(id.clone());
            }
            info!(id = %id, "wikitext for this page has duplicate ids");
        }

        let mut index = self.id_index.take().unwrap_or_else(|| collect_ids(doc));

        let bundle = doc.bag_mut().page_bundle_mut();
        let uid = loop {
            let next = match u64::try_from(bundle.parsoid.counter) {
                Ok(counter) => CounterType::NodeData.next_mintable(counter),
                Err(_) => 0,
            };
            bundle.parsoid.counter = next as i64;
            let uid = CounterType::NodeData.counter_to_id(next);
            if !index.contains(&uid)
                && !bundle.parsoid.ids.contains_key(&uid)
                && !bundle.mw.ids.contains_key(&uid)
            {
                break uid;
            }
        };
        trace!(id = %uid, "minted page bundle id");
        index.insert(uid.clone());
        self.id_index = Some(index);

        add_normalized_attribute(doc, node, "id", &uid, orig.as_deref())?;
        Ok(uid)
    }
}

fn collect_ids(doc: &Document) -> HashSet<String> {
    doc.descendants(doc.root())
        .filter_map(|n| doc.attr(n, "id"))
        .map(str::to_string)
        .collect()
}
