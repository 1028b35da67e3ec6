//! Moving node data between in-memory records and the serialized DOM.
//!
//! [`DomDataCodec`] loads inline `data-*` attributes into records and stores
//! records back out, either inline or into the document's page bundle. It
//! also owns the fragment bank used for fragment-valued attributes.

mod attribs;
mod counter;
mod fragment_bank;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::error::Result;

pub use counter::CounterType;

/// Options for a load pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadOptions {
    /// Flag elements that had no `data-parsoid` before loading as new.
    pub mark_new: bool,
}

/// Options for a store pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreOptions {
    /// Drop `data-parsoid` instead of writing it.
    pub discard_data_parsoid: bool,
    /// Keep the `tmp` scratch field. Incompatible with `discard_data_parsoid`.
    pub keep_tmp: bool,
    /// Write `data-parsoid`/`data-mw` into the page bundle, keyed by `id`.
    pub store_in_page_bundle: bool,
    /// Also write `data-parsoid-diff`.
    pub store_diff_mark: bool,
    /// Bank fragment-valued attributes as `<template>`s in `<head>`.
    pub use_fragment_bank: bool,
    /// Encode fragments from a stored copy, leaving the originals loaded.
    pub no_side_effects: bool,
}

/// Codec for one document's node data.
///
/// A codec is meant to live for one serialization pass; its fragment bank
/// numbering and id index are scoped to it.
#[derive(Debug, Default)]
pub struct DomDataCodec {
    load: LoadOptions,
    store: StoreOptions,
    /// Banked templates by hash base, then by disambiguating count.
    fragment_index: Option<HashMap<String, BTreeMap<u32, NodeId>>>,
    /// Highest count handed out per base since the last pop.
    fragment_max: HashMap<String, u32>,
    /// All `id` attributes in the document, for page-bundle id minting.
    id_index: Option<HashSet<String>>,
}

impl DomDataCodec {
    pub fn new(load: LoadOptions, store: StoreOptions) -> Self {
        Self {
            load,
            store,
            ..Default::default()
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        self.load
    }

    pub fn store_options(&self) -> StoreOptions {
        self.store
    }

    /// Replace the load options, returning the previous ones.
    pub fn set_load_options(&mut self, options: LoadOptions) -> LoadOptions {
        std::mem::replace(&mut self.load, options)
    }

    /// Replace the store options, returning the previous ones.
    pub fn set_store_options(&mut self, options: StoreOptions) -> StoreOptions {
        std::mem::replace(&mut self.store, options)
    }
}

/// Load data attributes for every element under `root` (inclusive).
pub fn visit_and_load_data_attribs(
    doc: &mut Document,
    root: NodeId,
    options: LoadOptions,
) -> Result<()> {
    DomDataCodec::new(options, StoreOptions::default()).visit_and_load(doc, root)
}

/// Store data attributes for every element under `root` (inclusive).
pub fn visit_and_store_data_attribs(
    doc: &mut Document,
    root: NodeId,
    options: StoreOptions,
) -> Result<()> {
    DomDataCodec::new(LoadOptions::default(), options).visit_and_store(doc, root)
}
