//! Template and extension provenance carried in `data-mw`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form MediaWiki metadata.
///
/// The contents are opaque here except for `parts`, which describes the
/// template invocations an encapsulated forest was generated from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataMw(pub Map<String, Value>);

impl DataMw {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty `data-mw` is never serialized.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Template-shaped entries of `parts`, in order. String parts (literal
    /// wikitext between invocations) are skipped.
    pub fn templates(&self) -> Vec<TemplateInfo> {
        let Some(Value::Array(parts)) = self.0.get("parts") else {
            return Vec::new();
        };
        parts.iter().filter_map(TemplateInfo::from_part).collect()
    }

    /// Link target of the first template part that has one.
    pub fn primary_template_href(&self) -> Option<String> {
        self.templates().into_iter().find_map(|t| t.href)
    }
}

/// What kind of invocation a template part records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Template,
    TemplateArg,
    ParserFunction,
}

impl TemplateKind {
    fn key(self) -> &'static str {
        match self {
            TemplateKind::Template => "template",
            TemplateKind::TemplateArg => "templatearg",
            TemplateKind::ParserFunction => "parserfunction",
        }
    }
}

/// One template invocation from `data-mw.parts`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInfo {
    pub kind: TemplateKind,
    /// Target as written in wikitext.
    pub target_wt: Option<String>,
    /// Resolved link target, e.g. `./Template:Foo`.
    pub href: Option<String>,
    pub params: Map<String, Value>,
    /// Index of the part in the transclusion.
    pub index: Option<u64>,
}

impl TemplateInfo {
    fn from_part(part: &Value) -> Option<Self> {
        let obj = part.as_object()?;
        let (kind, info) = [
            TemplateKind::Template,
            TemplateKind::TemplateArg,
            TemplateKind::ParserFunction,
        ]
        .into_iter()
        .find_map(|k| obj.get(k.key()).and_then(Value::as_object).map(|v| (k, v)))?;

        let target = info.get("target").and_then(Value::as_object);
        let target_str = |key: &str| {
            target
                .and_then(|t| t.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            kind,
            target_wt: target_str("wt"),
            href: target_str("href"),
            params: info
                .get("params")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            index: info.get("i").and_then(Value::as_u64),
        })
    }
}
