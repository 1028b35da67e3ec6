//! Change markers left on elements by the DOM diff.

use serde::{Deserialize, Serialize};

/// A single kind of change recorded on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffMark {
    Inserted,
    Deleted,
    Moved,
    /// Direct children were added, removed or replaced.
    ChildrenChanged,
    /// Something below the element changed.
    SubtreeChanged,
    /// The element itself changed but kept its tag and syntax.
    ModifiedWrapper,
}

impl DiffMark {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffMark::Inserted => "inserted",
            DiffMark::Deleted => "deleted",
            DiffMark::Moved => "moved",
            DiffMark::ChildrenChanged => "children-changed",
            DiffMark::SubtreeChanged => "subtree-changed",
            DiffMark::ModifiedWrapper => "modified-wrapper",
        }
    }
}

/// Contents of `data-parsoid-diff`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataParsoidDiff {
    pub diff: Vec<DiffMark>,
}

impl DataParsoidDiff {
    pub fn has(&self, mark: DiffMark) -> bool {
        self.diff.contains(&mark)
    }

    /// Record a mark once.
    pub fn add(&mut self, mark: DiffMark) {
        if !self.has(mark) {
            self.diff.push(mark);
        }
    }
}
