//! Parser metadata carried in `data-parsoid`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::source_range::{DomSourceRange, SourceRange};

/// Shadowed attribute values, keyed by attribute name.
pub type ShadowAttrs = BTreeMap<String, Option<String>>;

/// Per-element parser metadata.
///
/// Known fields are typed; anything else round-trips through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataParsoid {
    /// Token source range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsr: Option<SourceRange>,

    /// DOM source range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsr: Option<DomSourceRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_tag_offsets: Option<DomSourceRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_link_content_offsets: Option<SourceRange>,

    /// Normalized attribute values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<ShadowAttrs>,

    /// Source (pre-normalization) attribute values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sa: Option<ShadowAttrs>,

    /// Parameter info, one list per template part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pi: Option<Vec<Vec<ParamInfo>>>,

    /// Syntax variant the node was written with (`html`, `piped`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stx: Option<String>,

    /// Scratch space; never leaves process memory unless explicitly kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp: Option<TempData>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataParsoid {
    pub fn get_temp_flag(&self, flag: u32) -> bool {
        self.tmp.as_ref().is_some_and(|t| t.bits & flag != 0)
    }

    pub fn set_temp_flag(&mut self, flag: u32, value: bool) {
        let tmp = self.tmp.get_or_insert_with(TempData::default);
        if value {
            tmp.bits |= flag;
        } else {
            tmp.bits &= !flag;
        }
    }

    /// Scratch data, created on first access.
    pub fn tmp_mut(&mut self) -> &mut TempData {
        self.tmp.get_or_insert_with(TempData::default)
    }

    /// Copy without the fields that vary between any two parses of the same
    /// source: scratch data and every source offset.
    pub fn without_offsets(&self) -> DataParsoid {
        DataParsoid {
            tmp: None,
            tsr: None,
            dsr: None,
            ext_tag_offsets: None,
            ext_link_content_offsets: None,
            ..self.clone()
        }
    }
}

/// Transient per-node data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TempData {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub bits: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl TempData {
    /// Element was synthesized rather than parsed from source.
    pub const IS_NEW: u32 = 1 << 0;
    /// Element content was reused from a cached render.
    pub const FROM_CACHE: u32 = 1 << 1;
}

/// Template parameter source info.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    /// Parameter key.
    pub k: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub named: bool,

    /// Whitespace around the key and value: `[before key, after key, before value, after value]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spc: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
