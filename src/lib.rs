//! # wikidom
//!
//! Data binding for annotated wiki HTML: the out-of-band node data behind
//! `data-parsoid`/`data-mw`, page bundles, encapsulated template output,
//! and a DOM diff that classifies edits for selective update.
//!
//! ## Features
//!
//! - Arena DOM parsed and serialized with html5ever
//! - Lazy per-element node data, loaded from and stored to `data-*` attributes
//! - Page bundles, inline or embedded as a `<script>`, and a fragment bank for
//!   HTML-valued attributes
//! - Encapsulation helpers for template and extension forests
//! - DOM diff with change markers, and a selective-update classifier on top
//!
//! ## Quick Start
//!
//! ```
//! use wikidom::{Document, LoadOptions, dom_data, visit_and_load_data_attribs};
//!
//! let mut doc = Document::parse(r#"<p data-parsoid='{"stx":"html"}'>hi</p>"#);
//! let body = doc.body().unwrap();
//! visit_and_load_data_attribs(&mut doc, body, LoadOptions::default()).unwrap();
//!
//! let p = doc.first_child(body).unwrap();
//! assert_eq!(dom_data::get_data_parsoid(&mut doc, p).unwrap().stx.as_deref(), Some("html"));
//! ```
//!
//! ## Classifying an edit
//!
//! ```
//! use wikidom::{PageBundle, StaticPageConfig, classify};
//!
//! let old = StaticPageConfig::new("Foo", "hello").with_revision(1, None);
//! let new = StaticPageConfig::new("Foo", "hello!").with_revision(2, Some(1));
//! let old_pb = PageBundle { html: "<p>hello</p>".into(), ..Default::default() };
//! let new_pb = PageBundle { html: "<p>hello!</p>".into(), ..Default::default() };
//!
//! let labels = classify(Some((&old, &old_pb)), &new, &new_pb).unwrap();
//! assert_eq!(labels.kind, "page-update");
//! assert_eq!(labels.rev_diff, "1");
//! ```

pub mod codec;
pub mod config;
pub mod data_bag;
pub mod diff;
pub mod dom;
pub mod dom_data;
pub mod encapsulation;
pub mod error;
pub mod node_data;
pub mod page_bundle;
pub mod selective_stats;
pub mod traverser;
pub(crate) mod util;

pub use codec::{
    DomDataCodec, LoadOptions, StoreOptions, visit_and_load_data_attribs,
    visit_and_store_data_attribs,
};
pub use config::{PageConfig, SiteConfig, StaticPageConfig, Title, TitleError, TitleNamespace};
pub use data_bag::DataBag;
pub use diff::{DiffResult, DomDiff};
pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use node_data::{DataMw, DataParsoid, NodeData};
pub use page_bundle::{DomPageBundle, PageBundle};
pub use selective_stats::{SelectiveUpdateLabels, classify, filter_user_agent};
