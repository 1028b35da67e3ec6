//! Per-revision page configuration.

use serde::{Deserialize, Serialize};

/// What the classifier needs to know about one revision of a page.
pub trait PageConfig {
    /// Wikitext of the revision's main slot.
    fn revision_content(&self) -> &str;

    fn revision_id(&self) -> Option<u64>;

    fn parent_revision_id(&self) -> Option<u64>;

    fn page_id(&self) -> Option<u64>;

    /// Prefixed title text of the page.
    fn title(&self) -> &str;
}

/// A [`PageConfig`] with every value given up front, as read from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticPageConfig {
    pub title: String,
    pub page_id: Option<u64>,
    pub revision_id: Option<u64>,
    pub parent_revision_id: Option<u64>,
    pub content: String,
}

impl StaticPageConfig {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    pub fn with_revision(mut self, revision_id: u64, parent_revision_id: Option<u64>) -> Self {
        self.revision_id = Some(revision_id);
        self.parent_revision_id = parent_revision_id;
        self
    }
}

impl PageConfig for StaticPageConfig {
    fn revision_content(&self) -> &str {
        &self.content
    }

    fn revision_id(&self) -> Option<u64> {
        self.revision_id
    }

    fn parent_revision_id(&self) -> Option<u64> {
        self.parent_revision_id
    }

    fn page_id(&self) -> Option<u64> {
        self.page_id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial() {
        let page: StaticPageConfig =
            serde_json::from_str(r#"{"title":"Foo","revisionId":5,"content":"''hi''"}"#).unwrap();
        assert_eq!(page.revision_id(), Some(5));
        assert_eq!(page.parent_revision_id(), None);
        assert_eq!(page.revision_content(), "''hi''");
    }
}
