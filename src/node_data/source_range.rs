//! Source offsets into the original wikitext.

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Plain `(start, end)` offsets, serialized as a two element array.
///
/// Used for token source ranges (`tsr`) and `extLinkContentOffsets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slice the range out of `source`, if it is in bounds.
    pub fn substr<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

impl From<(usize, usize)> for SourceRange {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}

impl From<SourceRange> for (usize, usize) {
    fn from(r: SourceRange) -> Self {
        (r.start, r.end)
    }
}

/// DOM source range: outer offsets plus the widths of the opening and
/// closing wikitext syntax, and optionally the whitespace trimmed around
/// the node.
///
/// Serialized as an array of 2, 4 or 6 entries:
/// `[start, end, openWidth, closeWidth, leadingWS, trailingWS]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomSourceRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub open_width: Option<usize>,
    pub close_width: Option<usize>,
    /// `-1` means unknown.
    pub leading_ws: i64,
    /// `-1` means unknown.
    pub trailing_ws: i64,
}

impl DomSourceRange {
    pub fn new(
        start: Option<usize>,
        end: Option<usize>,
        open_width: Option<usize>,
        close_width: Option<usize>,
    ) -> Self {
        Self {
            start,
            end,
            open_width,
            close_width,
            leading_ws: 0,
            trailing_ws: 0,
        }
    }

    /// Offset where the node's content starts, after its opening syntax.
    pub fn inner_start(&self) -> Option<usize> {
        Some(self.start? + self.open_width?)
    }

    /// Offset where the node's content ends, before its closing syntax.
    pub fn inner_end(&self) -> Option<usize> {
        self.end?.checked_sub(self.close_width?)
    }

    pub fn inner_range(&self) -> Option<SourceRange> {
        Some(SourceRange::new(self.inner_start()?, self.inner_end()?))
    }

    /// Both outer offsets are known and ordered.
    pub fn is_valid(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s <= e)
    }
}

impl Serialize for DomSourceRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let has_ws = self.leading_ws != 0 || self.trailing_ws != 0;
        let has_widths = has_ws || self.open_width.is_some() || self.close_width.is_some();
        let len = match (has_widths, has_ws) {
            (_, true) => 6,
            (true, false) => 4,
            _ => 2,
        };

        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.start)?;
        seq.serialize_element(&self.end)?;
        if has_widths {
            seq.serialize_element(&self.open_width)?;
            seq.serialize_element(&self.close_width)?;
        }
        if has_ws {
            seq.serialize_element(&self.leading_ws)?;
            seq.serialize_element(&self.trailing_ws)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for DomSourceRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<Option<i64>>::deserialize(deserializer)?;
        let offset = |i: usize| {
            raw.get(i)
                .copied()
                .flatten()
                .and_then(|v| usize::try_from(v).ok())
        };
        Ok(Self {
            start: offset(0),
            end: offset(1),
            open_width: offset(2),
            close_width: offset(3),
            leading_ws: raw.get(4).copied().flatten().unwrap_or(0),
            trailing_ws: raw.get(5).copied().flatten().unwrap_or(0),
        })
    }
}
