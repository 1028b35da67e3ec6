//! Wiki-wide configuration: namespaces, title rules, interwiki prefixes.

use std::collections::BTreeMap;
use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use super::namespace::TitleNamespace;
use super::utils::{InterwikiEntry, compute_interwiki_map, normalize_namespace_name};

/// Characters allowed in titles, as the body of a regex character class.
pub const DEFAULT_LEGAL_TITLE_CHARS: &str = r#" %!"$&'()*,\-./0-9:;=?@A-Z\\^_`a-z~\x{80}-\x{10FFFF}+"#;

fn illegal_chars_pattern(legal: &str) -> String {
    // Percent escapes and character references do not round-trip either.
    format!(r"[^{legal}]|%[0-9A-Fa-f]{{2}}|&[A-Za-z0-9\x{{80}}-\x{{10FFFF}}]+;")
}

static DEFAULT_ILLEGAL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&illegal_chars_pattern(DEFAULT_LEGAL_TITLE_CHARS)).expect("valid regex")
});

/// How the first letter of titles in a namespace is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceCase {
    /// The first letter is always uppercased.
    #[default]
    FirstLetter,
    CaseSensitive,
}

/// One namespace and the names it goes by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceInfo {
    pub id: TitleNamespace,
    /// Canonical name, lowercase with underscores.
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub case: NamespaceCase,
}

impl NamespaceInfo {
    fn new(id: TitleNamespace, name: &str, aliases: &[&str]) -> Self {
        Self {
            id,
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            case: NamespaceCase::FirstLetter,
        }
    }
}

/// Site configuration.
///
/// The default is a small English wiki, enough for tests and the command
/// line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub lang: String,
    pub namespaces: Vec<NamespaceInfo>,
    pub legal_title_chars: String,
    #[serde(
        rename = "interwikimap",
        serialize_with = "serialize_interwiki_map",
        deserialize_with = "deserialize_interwiki_map"
    )]
    pub interwiki_map: BTreeMap<String, InterwikiEntry>,
    /// Special page aliases (lowercase) to their local names.
    pub special_page_aliases: BTreeMap<String, String>,
    #[serde(skip)]
    illegal_chars: OnceLock<Regex>,
}

fn serialize_interwiki_map<S: Serializer>(
    map: &BTreeMap<String, InterwikiEntry>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(map.values())
}

fn deserialize_interwiki_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, InterwikiEntry>, D::Error> {
    Vec::<InterwikiEntry>::deserialize(deserializer).map(compute_interwiki_map)
}

impl Default for SiteConfig {
    fn default() -> Self {
        let ns = |id, name, aliases| NamespaceInfo::new(id, name, aliases);
        Self {
            lang: "en".to_string(),
            namespaces: vec![
                ns(TitleNamespace::MEDIA, "media", &[]),
                ns(TitleNamespace::SPECIAL, "special", &[]),
                ns(TitleNamespace::MAIN, "", &[]),
                ns(TitleNamespace::TALK, "talk", &[]),
                ns(TitleNamespace::USER, "user", &[]),
                ns(TitleNamespace::USER_TALK, "user_talk", &[]),
                ns(TitleNamespace::PROJECT, "project", &["wp", "wikipedia"]),
                ns(TitleNamespace::PROJECT_TALK, "project_talk", &["wt", "wikipedia_talk"]),
                ns(TitleNamespace::FILE, "file", &["image"]),
                ns(TitleNamespace::FILE_TALK, "file_talk", &["image_talk"]),
                ns(TitleNamespace::TEMPLATE, "template", &[]),
                ns(TitleNamespace::TEMPLATE_TALK, "template_talk", &[]),
                ns(TitleNamespace::CATEGORY, "category", &[]),
                ns(TitleNamespace::CATEGORY_TALK, "category_talk", &[]),
            ],
            legal_title_chars: DEFAULT_LEGAL_TITLE_CHARS.to_string(),
            interwiki_map: compute_interwiki_map(vec![
                InterwikiEntry::new("wikipedia", "http://en.wikipedia.org/wiki/$1"),
                InterwikiEntry::new("meatball", "http://www.usemod.com/cgi-bin/mb.pl?$1"),
                InterwikiEntry::new("memoryalpha", "http://www.memory-alpha.org/en/index.php/$1"),
            ]),
            special_page_aliases: BTreeMap::new(),
            illegal_chars: OnceLock::new(),
        }
    }
}

impl SiteConfig {
    fn namespace(&self, id: TitleNamespace) -> Option<&NamespaceInfo> {
        self.namespaces.iter().find(|n| n.id == id)
    }

    /// Look up a namespace by its exact canonical name.
    pub fn canonical_namespace_id(&self, name: &str) -> Option<TitleNamespace> {
        self.namespaces.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Look up a namespace by any of its names, ignoring case and treating
    /// spaces as underscores.
    pub fn namespace_id(&self, name: &str) -> Option<TitleNamespace> {
        let name = normalize_namespace_name(name);
        self.namespaces
            .iter()
            .find(|n| n.name == name || n.aliases.iter().any(|a| *a == name))
            .map(|n| n.id)
    }

    /// Display name of a namespace: words capitalized, spaces for
    /// underscores. Empty for the main namespace.
    pub fn namespace_name(&self, id: TitleNamespace) -> Option<String> {
        let info = self.namespace(id)?;
        let words: Vec<String> = info.name.split('_').map(capitalize).collect();
        Some(words.join(" "))
    }

    pub fn namespace_case(&self, id: TitleNamespace) -> NamespaceCase {
        self.namespace(id).map(|n| n.case).unwrap_or_default()
    }

    /// Check whether `prefix` (lowercase) is an interwiki prefix that is not
    /// also a namespace name.
    pub fn is_interwiki_prefix(&self, prefix: &str) -> bool {
        self.interwiki_map.contains_key(prefix) && self.namespace_id(prefix).is_none()
    }

    pub fn special_page_local_name(&self, alias: &str) -> Option<&str> {
        self.special_page_aliases
            .get(&alias.to_lowercase())
            .map(String::as_str)
    }

    /// Uppercase the first character, honoring the dotted capital I of
    /// Turkic languages.
    pub fn ucfirst(&self, s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            Some('i') if matches!(self.lang.as_str(), "az" | "tr" | "kaa" | "kk") => {
                format!("\u{130}{}", chars.as_str())
            }
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Matches anything that may not appear in a title.
    pub fn illegal_title_chars(&self) -> &Regex {
        self.illegal_chars.get_or_init(|| {
            Regex::new(&illegal_chars_pattern(&self.legal_title_chars)).unwrap_or_else(|e| {
                warn!(error = %e, "invalid legal title characters, using defaults");
                DEFAULT_ILLEGAL_CHARS.clone()
            })
        })
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_lookup() {
        let site = SiteConfig::default();
        assert_eq!(site.namespace_id("Template"), Some(TitleNamespace::TEMPLATE));
        assert_eq!(site.namespace_id("User talk"), Some(TitleNamespace::USER_TALK));
        assert_eq!(site.namespace_id("WP"), Some(TitleNamespace::PROJECT));
        assert_eq!(site.canonical_namespace_id("WP"), None);
        assert_eq!(site.namespace_name(TitleNamespace::USER_TALK).as_deref(), Some("User Talk"));
        assert_eq!(site.namespace_name(TitleNamespace::MAIN).as_deref(), Some(""));
    }

    #[test]
    fn test_interwiki_prefixes() {
        let site = SiteConfig::default();
        assert!(site.is_interwiki_prefix("meatball"));
        // Also a namespace alias.
        assert!(!site.is_interwiki_prefix("wikipedia"));
        assert!(!site.is_interwiki_prefix("nope"));
    }

    #[test]
    fn test_ucfirst() {
        let mut site = SiteConfig::default();
        assert_eq!(site.ucfirst("foo"), "Foo");
        assert_eq!(site.ucfirst("éa"), "Éa");
        site.lang = "tr".to_string();
        assert_eq!(site.ucfirst("istanbul"), "\u{130}stanbul");
    }

    #[test]
    fn test_illegal_chars() {
        let site = SiteConfig::default();
        let re = site.illegal_title_chars();
        assert!(re.is_match("a<b"));
        assert!(re.is_match("a%20b"));
        assert!(re.is_match("a&amp;b"));
        assert!(!re.is_match("Foo_(bar)"));
        assert!(!re.is_match("Ünïcödé"));
    }

    #[test]
    fn test_deserialize_interwiki_list() {
        let site: SiteConfig = serde_json::from_str(
            r#"{"interwikimap":[{"prefix":"Wiki","url":"https://example.org/"}]}"#,
        )
        .unwrap();
        assert_eq!(site.interwiki_map["wiki"].url, "https://example.org/$1");
        assert_eq!(site.lang, "en");
    }
}
