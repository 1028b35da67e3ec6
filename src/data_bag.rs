//! Per-document store of node data records.

use std::collections::HashMap;

use crate::codec::CounterType;
use crate::dom::NodeId;
use crate::node_data::NodeData;
use crate::page_bundle::BundleData;

/// Registry mapping small integer handles to [`NodeData`] records.
///
/// Handles are handed out by a monotonic counter and never reused. There is
/// no removal: records that are no longer referenced stay until the owning
/// document is dropped.
#[derive(Debug, Default)]
pub struct DataBag {
    records: Vec<NodeData>,
    /// Elements whose record was flushed and whose handle was stripped.
    flushed: HashMap<NodeId, u32>,
    /// Target for data stored in page-bundle form.
    page_bundle: BundleData,
    transclusion_counter: u64,
    annotation_counter: u64,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record and return its fresh handle.
    pub fn stash(&mut self, data: NodeData) -> u32 {
        let id = self.records.len() as u32;
        self.records.push(data);
        id
    }

    /// Look up a record. `None` means nothing was ever stashed under `id`.
    pub fn get(&self, id: u32) -> Option<&NodeData> {
        self.records.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut NodeData> {
        self.records.get_mut(id as usize)
    }

    /// Number of handles issued so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn mark_flushed(&mut self, node: NodeId, handle: u32) {
        self.flushed.insert(node, handle);
    }

    pub(crate) fn clear_flushed(&mut self, node: NodeId) {
        self.flushed.remove(&node);
    }

    /// Handle under which `node`'s record was flushed, if it was.
    pub(crate) fn flushed_handle(&self, node: NodeId) -> Option<u32> {
        self.flushed.get(&node).copied()
    }

    /// Page bundle receiving data flushed in page-bundle mode.
    pub fn page_bundle(&self) -> &BundleData {
        &self.page_bundle
    }

    pub fn page_bundle_mut(&mut self) -> &mut BundleData {
        &mut self.page_bundle
    }

    /// Take the page bundle out, leaving an empty one behind.
    pub fn take_page_bundle(&mut self) -> BundleData {
        std::mem::take(&mut self.page_bundle)
    }

    /// Mint a fresh transclusion about-id, e.g. `#mwt3`.
    pub fn new_about_id(&mut self) -> String {
        let id = CounterType::TransclusionAbout.counter_to_id(self.transclusion_counter);
        self.transclusion_counter += 1;
        format!("#{id}")
    }

    /// Mint a fresh annotation about-id, e.g. `#mwa0`.
    pub fn new_annotation_id(&mut self) -> String {
        let id = CounterType::AnnotationAbout.counter_to_id(self.annotation_counter);
        self.annotation_counter += 1;
        format!("#{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_data::DataMw;

    #[test]
    fn test_stash_is_monotonic() {
        let mut bag = DataBag::new();
        let a = bag.stash(NodeData::default());
        let b = bag.stash(NodeData::default());
        assert_eq!((a, b), (0, 1));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let bag = DataBag::new();
        assert!(bag.get(0).is_none());
        assert!(bag.get(u32::MAX).is_none());
    }

    #[test]
    fn test_get_returns_stashed_record() {
        let mut bag = DataBag::new();
        let data = NodeData {
            mw: Some(DataMw::new()),
            ..Default::default()
        };
        let id = bag.stash(data);
        assert!(bag.get(id).unwrap().mw.is_some());

        bag.get_mut(id).unwrap().mw = None;
        assert!(bag.get(id).unwrap().mw.is_none());
    }

    #[test]
    fn test_about_ids() {
        let mut bag = DataBag::new();
        assert_eq!(bag.new_about_id(), "#mwt0");
        assert_eq!(bag.new_about_id(), "#mwt1");
        assert_eq!(bag.new_annotation_id(), "#mwa0");
    }
}
