//! Id minting domains.
//!
//! Node-data ids are `mw` followed by the URL-safe, unpadded base64 of the
//! counter's big-endian bytes. About-ids are `mwt`/`mwa` followed by the
//! counter in decimal. Each domain only accepts its own canonical ids.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// A numbering domain for minted ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterType {
    /// Synthetic `id` attributes minted for page-bundle storage.
    NodeData,
    /// About-ids grouping transclusion forests.
    TransclusionAbout,
    /// About-ids grouping annotation ranges.
    AnnotationAbout,
}

impl CounterType {
    pub fn prefix(self) -> &'static str {
        match self {
            CounterType::NodeData => "mw",
            CounterType::TransclusionAbout => "mwt",
            CounterType::AnnotationAbout => "mwa",
        }
    }

    /// Encode `counter` in this domain.
    pub fn counter_to_id(self, counter: u64) -> String {
        match self {
            CounterType::NodeData => {
                let bytes = counter.to_be_bytes();
                let skip = bytes.iter().take(7).take_while(|&&b| b == 0).count();
                format!("mw{}", URL_SAFE_NO_PAD.encode(&bytes[skip..]))
            }
            _ => format!("{}{}", self.prefix(), counter),
        }
    }

    /// Decode an id of this domain back to its counter.
    ///
    /// Returns `None` unless `id` is exactly what [`Self::counter_to_id`]
    /// produces for some counter. Node-data ids that read as an about-id
    /// are never produced by minting and are rejected as well.
    pub fn id_to_counter(self, id: &str) -> Option<u64> {
        let rest = id.strip_prefix(self.prefix())?;
        let counter = match self {
            CounterType::NodeData => {
                if is_about_like(id) {
                    return None;
                }
                let bytes = URL_SAFE_NO_PAD.decode(rest).ok()?;
                if bytes.is_empty() || bytes.len() > 8 {
                    return None;
                }
                bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
            }
            _ => {
                if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                rest.parse().ok()?
            }
        };
        // Rejects leading zeros and non-canonical trailing bits.
        (self.counter_to_id(counter) == id).then_some(counter)
    }

    /// Check whether `id` belongs to this domain.
    pub fn matches(self, id: &str) -> bool {
        self.id_to_counter(id).is_some()
    }

    /// Next counter after `counter` whose node-data id is unambiguous.
    pub(crate) fn next_mintable(self, mut counter: u64) -> u64 {
        loop {
            counter += 1;
            if self != CounterType::NodeData || !is_about_like(&self.counter_to_id(counter)) {
                return counter;
            }
        }
    }
}

/// `mwt<digits>` or `mwa<digits>`.
fn is_about_like(id: &str) -> bool {
    id.strip_prefix("mwt")
        .or_else(|| id.strip_prefix("mwa"))
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}
