//! Small configuration helpers.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// One entry of the interwiki map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterwikiEntry {
    pub prefix: String,
    /// Target URL with a `$1` placeholder for the title.
    pub url: String,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub localinterwiki: bool,
    #[serde(default)]
    pub language: bool,
    #[serde(default)]
    pub protorel: bool,
}

impl InterwikiEntry {
    pub fn new(prefix: &str, url: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            url: url.to_string(),
            local: false,
            localinterwiki: false,
            language: false,
            protorel: false,
        }
    }
}

/// Key interwiki entries by lowercase prefix.
///
/// URLs without a `$1` placeholder get one appended, so every entry links
/// the title the same way.
pub fn compute_interwiki_map(entries: Vec<InterwikiEntry>) -> BTreeMap<String, InterwikiEntry> {
    entries
        .into_iter()
        .map(|mut entry| {
            if !entry.url.contains("$1") {
                entry.url.push_str("$1");
            }
            (entry.prefix.to_lowercase(), entry)
        })
        .collect()
}

/// Lowercase, with spaces as underscores.
pub fn normalize_namespace_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Title text of a relative wiki link: `./Template:Foo_bar` and
/// `./Template:Foo%20bar` both give `Template:Foo bar`.
pub fn href_to_title_text(href: &str) -> String {
    let path = href.strip_prefix("./").unwrap_or(href);
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    decoded.replace('_', " ")
}
