//! Out-of-band data attached to DOM elements.
//!
//! Each element touched by the parser owns one [`NodeData`] record, held in
//! the document's [`crate::data_bag::DataBag`] and referenced from the
//! element through the `data-object-id` handle attribute.

mod data_mw;
mod data_parsoid;
mod diff_mark;
mod i18n;
mod source_range;

use std::collections::BTreeMap;

use crate::dom::NodeId;

pub use data_mw::{DataMw, TemplateInfo, TemplateKind};
pub use data_parsoid::{DataParsoid, ParamInfo, ShadowAttrs, TempData};
pub use diff_mark::{DataParsoidDiff, DiffMark};
pub use i18n::{DataMwI18n, I18nInfo, I18nLang, SPAN_KEY};
pub use source_range::{DomSourceRange, SourceRange};

/// The data record bound to one element.
///
/// Fields are filled lazily by the accessors in [`crate::dom_data`].
#[derive(Debug, Clone, Default)]
pub struct NodeData {
    pub parsoid: Option<DataParsoid>,
    pub mw: Option<DataMw>,
    pub i18n: Option<DataMwI18n>,
    pub parsoid_diff: Option<DataParsoidDiff>,
    /// Rich attribute values held as detached fragments, keyed by attribute.
    pub fragments: BTreeMap<String, NodeId>,
    /// Handle this record was flushed under. Set once the record has been
    /// written out; the in-memory copy is stale from then on.
    pub stored_id: Option<u32>,
}

impl NodeData {
    pub fn is_stored(&self) -> bool {
        self.stored_id.is_some()
    }
}
