//! Localization info carried in `data-mw-i18n`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key used for the span-level message.
pub const SPAN_KEY: &str = "/";

/// Which language a message should be rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum I18nLang {
    /// The page content language (`x-page`).
    Page,
    /// The user interface language (`x-user`).
    User,
    /// An explicit language code.
    Explicit(String),
}

impl From<String> for I18nLang {
    fn from(s: String) -> Self {
        match s.as_str() {
            "x-page" => I18nLang::Page,
            "x-user" => I18nLang::User,
            _ => I18nLang::Explicit(s),
        }
    }
}

impl From<I18nLang> for String {
    fn from(lang: I18nLang) -> Self {
        match lang {
            I18nLang::Page => "x-page".to_string(),
            I18nLang::User => "x-user".to_string(),
            I18nLang::Explicit(code) => code,
        }
    }
}

/// One localizable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct I18nInfo {
    pub lang: I18nLang,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl I18nInfo {
    /// Message in the page content language.
    pub fn page_message(key: impl Into<String>, params: Option<Vec<Value>>) -> Self {
        Self {
            lang: I18nLang::Page,
            key: key.into(),
            params,
        }
    }

    /// Message in the user interface language.
    pub fn user_message(key: impl Into<String>, params: Option<Vec<Value>>) -> Self {
        Self {
            lang: I18nLang::User,
            key: key.into(),
            params,
        }
    }
}

/// Messages attached to a node: one for the node itself and one per
/// attribute, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataMwI18n(BTreeMap<String, I18nInfo>);

impl DataMwI18n {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn span_info(&self) -> Option<&I18nInfo> {
        self.0.get(SPAN_KEY)
    }

    pub fn set_span_info(&mut self, info: I18nInfo) {
        self.0.insert(SPAN_KEY.to_string(), info);
    }

    pub fn attribute_info(&self, name: &str) -> Option<&I18nInfo> {
        self.0.get(name)
    }

    pub fn set_attribute_info(&mut self, name: &str, info: I18nInfo) {
        self.0.insert(name.to_string(), info);
    }

    /// Names of attributes that carry a message.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str).filter(|k| *k != SPAN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_and_attribute_messages() {
        let json = r#"{"/":{"lang":"x-page","key":"cite-error","params":["a"]},"title":{"lang":"de","key":"tooltip"}}"#;
        let i18n: DataMwI18n = serde_json::from_str(json).unwrap();

        let span = i18n.span_info().unwrap();
        assert_eq!(span.lang, I18nLang::Page);
        assert_eq!(span.params.as_deref(), Some(&[Value::from("a")][..]));

        let title = i18n.attribute_info("title").unwrap();
        assert_eq!(title.lang, I18nLang::Explicit("de".to_string()));
        assert_eq!(title.params, None);
        assert_eq!(i18n.attribute_names().collect::<Vec<_>>(), vec!["title"]);

        assert_eq!(serde_json::to_string(&i18n).unwrap(), json);
    }

    #[test]
    fn test_user_lang_round_trip() {
        let mut i18n = DataMwI18n::default();
        i18n.set_span_info(I18nInfo::user_message("ok", None));
        assert_eq!(
            serde_json::to_string(&i18n).unwrap(),
            r#"{"/":{"lang":"x-user","key":"ok"}}"#
        );
    }
}
