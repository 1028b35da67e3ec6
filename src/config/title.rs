//! Page titles.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::namespace::TitleNamespace;
use super::site::{NamespaceCase, SiteConfig};

static BIDI_OVERRIDES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{200E}\x{200F}\x{202A}-\x{202E}]+").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ _\x{00A0}\x{1680}\x{180E}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}]+")
        .expect("valid regex")
});

static PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?)_*:_*(.*)$").expect("valid regex"));

const MAX_LENGTH: usize = 255;
const MAX_SPECIAL_LENGTH: usize = 512;

/// Why a string is not a valid title.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TitleError {
    #[error("bad UTF-8 in title {0:?}")]
    InvalidUtf8(String),

    #[error("empty title")]
    Empty,

    #[error("invalid talk namespace title {0:?}")]
    InvalidTalkNamespace(String),

    #[error("invalid characters in title {0:?}")]
    InvalidCharacters(String),

    #[error("title {0:?} contains relative path components")]
    RelativePath(String),

    #[error("title {0:?} contains ~~~")]
    MagicTilde(String),

    #[error("title {0:?} is too long")]
    TooLong(String),

    #[error("leading colon in title {0:?}")]
    LeadingColon(String),
}

impl TitleError {
    /// Message key for the error.
    pub fn code(&self) -> &'static str {
        match self {
            TitleError::InvalidUtf8(_) => "title-invalid-utf8",
            TitleError::Empty => "title-invalid-empty",
            TitleError::InvalidTalkNamespace(_) => "title-invalid-talk-namespace",
            TitleError::InvalidCharacters(_) => "title-invalid-characters",
            TitleError::RelativePath(_) => "title-invalid-relative",
            TitleError::MagicTilde(_) => "title-invalid-magic-tilde",
            TitleError::TooLong(_) => "title-invalid-too-long",
            TitleError::LeadingColon(_) => "title-invalid-leading-colon",
        }
    }
}

fn is_relative_path(title: &str) -> bool {
    title.contains('.')
        && (title == "."
            || title == ".."
            || title.starts_with("./")
            || title.starts_with("../")
            || title.contains("/./")
            || title.contains("/../")
            || title.ends_with("/.")
            || title.ends_with("/.."))
}

/// A normalized page title.
#[derive(Debug, Clone)]
pub struct Title {
    interwiki: String,
    db_key: String,
    namespace: TitleNamespace,
    namespace_name: String,
    fragment: String,
}

impl Title {
    /// Parse user-supplied title text.
    ///
    /// `default_ns` applies when the text has no namespace prefix; a leading
    /// colon forces the main namespace.
    pub fn new_from_text(
        text: &str,
        site: &SiteConfig,
        default_ns: Option<TitleNamespace>,
    ) -> Result<Title, TitleError> {
        let orig = text;
        let mut ns = default_ns.unwrap_or(TitleNamespace::MAIN);

        let title = BIDI_OVERRIDES.replace_all(text, "");
        let title = WHITESPACE.replace_all(&title, "_");
        let mut title = title.trim_matches('_').to_string();

        if title.contains('\u{FFFD}') {
            return Err(TitleError::InvalidUtf8(title));
        }

        if let Some(rest) = title.strip_prefix(':') {
            title = rest.trim_start_matches('_').to_string();
            ns = TitleNamespace::MAIN;
        }
        if title.is_empty() {
            return Err(TitleError::Empty);
        }

        let mut interwiki = None;
        if let Some(caps) = PREFIX.captures(&title) {
            let prefix = caps[1].to_lowercase();
            let rest = caps[2].to_string();
            let ns_id = site
                .canonical_namespace_id(&prefix)
                .or_else(|| site.namespace_id(&prefix));
            if let Some(ns_id) = ns_id {
                ns = ns_id;
                // Talk:File:X and Talk:Interwiki:X are not valid.
                if ns_id == TitleNamespace::TALK {
                    if let Some(inner) = PREFIX.captures(&rest) {
                        let inner_prefix = inner[1].to_lowercase();
                        let inner_ns = site.namespace_id(&inner_prefix);
                        if inner_ns.is_some_and(|n| n != TitleNamespace::MAIN)
                            || site.is_interwiki_prefix(&inner_prefix)
                        {
                            return Err(TitleError::InvalidTalkNamespace(orig.to_string()));
                        }
                    }
                }
                title = rest;
            } else if site.is_interwiki_prefix(&prefix) {
                title = rest;
                interwiki = Some(prefix);
                if let Some(after) = title.strip_prefix(':') {
                    title = after.trim_matches('_').to_string();
                    ns = TitleNamespace::MAIN;
                }
            }
        }

        let mut fragment = None;
        if let Some(idx) = title.find('#') {
            fragment = Some(title[idx + 1..].to_string());
            title.truncate(idx);
            let trimmed = title.trim_end_matches('_').len();
            title.truncate(trimmed);
        }

        if site.illegal_title_chars().is_match(&title) {
            return Err(TitleError::InvalidCharacters(orig.to_string()));
        }
        if is_relative_path(&title) {
            return Err(TitleError::RelativePath(orig.to_string()));
        }
        if title.contains("~~~") {
            return Err(TitleError::MagicTilde(orig.to_string()));
        }
        let max_length = if ns.is_special() { MAX_SPECIAL_LENGTH } else { MAX_LENGTH };
        if title.len() > max_length {
            return Err(TitleError::TooLong(orig.to_string()));
        }

        if interwiki.is_none() && site.namespace_case(ns) == NamespaceCase::FirstLetter {
            title = site.ucfirst(&title);
        }

        // Only self-links with a fragment may have an empty local title.
        if title.is_empty() && interwiki.is_none() && !ns.is_main() {
            return Err(TitleError::Empty);
        }
        if title.starts_with(':') {
            return Err(TitleError::LeadingColon(title));
        }

        if ns.is_special() {
            title = fix_special_name(site, &title);
        }

        Ok(Title {
            interwiki: interwiki.unwrap_or_default(),
            db_key: title,
            namespace: ns,
            namespace_name: site.namespace_name(ns).unwrap_or_default(),
            fragment: fragment.unwrap_or_default(),
        })
    }

    /// Interwiki prefix, empty if none.
    pub fn interwiki(&self) -> &str {
        &self.interwiki
    }

    /// The db key prefixed with the interwiki, if any.
    pub fn key(&self) -> String {
        if self.interwiki.is_empty() {
            self.db_key.clone()
        } else {
            format!("{}:{}", self.interwiki, self.db_key)
        }
    }

    /// Title without namespace or fragment, underscores for spaces.
    pub fn db_key(&self) -> &str {
        &self.db_key
    }

    /// Title without namespace or fragment, with spaces.
    pub fn text(&self) -> String {
        self.db_key.replace('_', " ")
    }

    pub fn prefixed_db_key(&self) -> String {
        let mut out = self.prefix();
        if !self.namespace_name.is_empty() {
            out.push_str(&self.namespace_name.replace(' ', "_"));
            out.push(':');
        }
        out.push_str(&self.db_key);
        out
    }

    pub fn prefixed_text(&self) -> String {
        let mut out = self.prefix();
        if !self.namespace_name.is_empty() {
            out.push_str(&self.namespace_name);
            out.push(':');
        }
        out.push_str(&self.text());
        out
    }

    fn prefix(&self) -> String {
        if self.interwiki.is_empty() {
            String::new()
        } else {
            format!("{}:", self.interwiki)
        }
    }

    /// Prefixed text plus `#fragment`, if there is one.
    pub fn full_text(&self) -> String {
        let mut text = self.prefixed_text();
        if self.has_fragment() {
            text.push('#');
            text.push_str(&self.fragment);
        }
        text
    }

    pub fn namespace(&self) -> TitleNamespace {
        self.namespace
    }

    pub fn namespace_name(&self) -> &str {
        &self.namespace_name
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn has_fragment(&self) -> bool {
        !self.fragment.is_empty()
    }

    pub fn is_special_page(&self) -> bool {
        self.namespace.is_special()
    }

    /// Same page, different fragment. An empty fragment removes it.
    pub fn create_fragment_target(&self, fragment: &str) -> Title {
        Title {
            fragment: fragment.to_string(),
            ..self.clone()
        }
    }
}

/// Titles are equal when they name the same page; fragments are ignored.
impl PartialEq for Title {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.interwiki == other.interwiki
            && self.db_key == other.db_key
    }
}

impl Eq for Title {}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed_text())
    }
}

/// Replace a special page alias with its local name.
fn fix_special_name(site: &SiteConfig, title: &str) -> String {
    let (name, sub) = match title.split_once('/') {
        Some((name, sub)) => (name, Some(sub)),
        None => (title, None),
    };
    match (site.special_page_local_name(name), sub) {
        (Some(local), Some(sub)) => format!("{local}/{sub}"),
        (Some(local), None) => local.to_string(),
        (None, _) => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(text: &str) -> Result<Title, TitleError> {
        Title::new_from_text(text, &SiteConfig::default(), None)
    }

    #[test]
    fn test_namespace_prefix() {
        let t = title("template:foo  bar").unwrap();
        assert_eq!(t.namespace(), TitleNamespace::TEMPLATE);
        assert_eq!(t.db_key(), "Foo_bar");
        assert_eq!(t.prefixed_text(), "Template:Foo bar");
        assert_eq!(t.prefixed_db_key(), "Template:Foo_bar");
    }

    #[test]
    fn test_default_namespace_and_leading_colon() {
        let site = SiteConfig::default();
        let t = Title::new_from_text("Foo", &site, Some(TitleNamespace::TEMPLATE)).unwrap();
        assert_eq!(t.prefixed_text(), "Template:Foo");
        let t = Title::new_from_text(":Foo", &site, Some(TitleNamespace::TEMPLATE)).unwrap();
        assert!(t.namespace().is_main());
        assert_eq!(t.prefixed_text(), "Foo");
    }

    #[test]
    fn test_unknown_prefix_stays_in_title() {
        let t = title("Foo:bar").unwrap();
        assert!(t.namespace().is_main());
        assert_eq!(t.db_key(), "Foo:bar");
    }

    #[test]
    fn test_interwiki() {
        let t = title("meatball:Some_page").unwrap();
        assert_eq!(t.interwiki(), "meatball");
        assert_eq!(t.key(), "meatball:Some_page");
        assert_eq!(t.prefixed_text(), "meatball:Some page");
    }

    #[test]
    fn test_fragment() {
        let t = title("Foo_#Bar").unwrap();
        assert_eq!(t.db_key(), "Foo");
        assert_eq!(t.fragment(), "Bar");
        assert_eq!(t.full_text(), "Foo#Bar");
        assert_eq!(t, title("Foo").unwrap());
        assert!(!t.create_fragment_target("").has_fragment());
    }

    #[test]
    fn test_bidi_and_whitespace() {
        let t = title("\u{200E}Foo\u{00A0}\u{3000}bar_").unwrap();
        assert_eq!(t.db_key(), "Foo_bar");
    }

    #[test]
    fn test_invalid_titles() {
        assert_eq!(title(""), Err(TitleError::Empty));
        assert_eq!(title("_:_"), Err(TitleError::Empty));
        assert_eq!(title("Template:").map_err(|e| e.code()), Err("title-invalid-empty"));
        assert_eq!(title("a<b").map_err(|e| e.code()), Err("title-invalid-characters"));
        assert_eq!(title("a%20b").map_err(|e| e.code()), Err("title-invalid-characters"));
        assert_eq!(title("../x").map_err(|e| e.code()), Err("title-invalid-relative"));
        assert_eq!(title("a/./b").map_err(|e| e.code()), Err("title-invalid-relative"));
        assert_eq!(title("x~~~").map_err(|e| e.code()), Err("title-invalid-magic-tilde"));
        assert_eq!(title(&"x".repeat(256)).map_err(|e| e.code()), Err("title-invalid-too-long"));
        assert_eq!(title("Talk:File:x").map_err(|e| e.code()), Err("title-invalid-talk-namespace"));
        assert_eq!(title("Talk:meatball:x").map_err(|e| e.code()), Err("title-invalid-talk-namespace"));
        assert_eq!(title("Talk:Foo:x").map(|t| t.db_key().to_string()), Ok("Foo:x".to_string()));
    }

    #[test]
    fn test_special_pages_allow_longer_titles() {
        let t = title(&format!("Special:{}", "x".repeat(300))).unwrap();
        assert!(t.is_special_page());
    }

    #[test]
    fn test_special_alias() {
        let mut site = SiteConfig::default();
        site.special_page_aliases.insert("mypage".into(), "MyPage".into());
        let t = Title::new_from_text("Special:mypage/sub", &site, None).unwrap();
        assert_eq!(t.db_key(), "MyPage/sub");

        let t = Title::new_from_text("Special:Mypage", &site, None).unwrap();
        assert_eq!(t.db_key(), "MyPage");
    }
}
