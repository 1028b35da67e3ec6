//! Error types for wikidom operations.

use thiserror::Error;

use crate::config::TitleError;

/// Errors that can occur while binding, encoding or diffing node data.
#[derive(Error, Debug)]
pub enum Error {
    /// A node's data was read after it had been stored without reloading.
    #[error("node data {0:?} was fetched after being stored; reload data attributes first")]
    StaleNodeData(Option<u32>),

    #[error("node is not an element")]
    NotAnElement,

    /// A banked fragment id that is no longer (or never was) in the bank.
    #[error("no banked fragment with id {0:?}")]
    MissingFragment(String),

    #[error("invalid fragment encoding: {0}")]
    InvalidFragment(String),

    #[error("no page bundle found in document")]
    MissingPageBundle,

    #[error("conflicting page bundle found in document")]
    ConflictingPageBundle,

    #[error("invalid page bundle: {0}")]
    InvalidPageBundle(String),

    #[error("document has no <{0}> element")]
    MissingElement(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid title: {0}")]
    Title(#[from] TitleError),
}

pub type Result<T> = std::result::Result<T, Error>;
