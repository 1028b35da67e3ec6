//! Classifying opportunities for selective update.
//!
//! [`classify`] diffs the rendered output of two revisions of a page and
//! reports whether the change came from the page's own wikitext or from
//! templates, and how many sections and template sites changed. Every label
//! value comes from a small fixed set so the labels can be aggregated
//! without blowing up metric cardinality.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PageConfig;
use crate::diff::{AttrValue, DomDiff, subtree_unchanged};
use crate::dom::Document;
use crate::dom_data::{get_data_mw, has_type_of};
use crate::encapsulation::{get_about_siblings, is_parsoid_section_tag};
use crate::error::{Error, Result};
use crate::page_bundle::{DomPageBundle, PageBundle};
use crate::traverser::{Action, DomTraverser};

const UNKNOWN: &str = "unknown";

/// Labels describing the difference between two renders of a page.
///
/// Fields serialize in a fixed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectiveUpdateLabels {
    /// `missing-prev`, `no-op`, `template-update` or `page-update`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `true`, `false` or `unknown`.
    pub same_wt: String,
    /// `0`, `1`, `minus1` or `unknown`.
    pub rev_diff: String,
    /// `0`, `1`, `2plus` or `unknown`.
    pub changed_sections: String,
    pub changed_template_sites: String,
    pub changed_template_names: String,
}

impl Default for SelectiveUpdateLabels {
    fn default() -> Self {
        Self {
            kind: "missing-prev".to_string(),
            same_wt: UNKNOWN.to_string(),
            rev_diff: UNKNOWN.to_string(),
            changed_sections: UNKNOWN.to_string(),
            changed_template_sites: UNKNOWN.to_string(),
            changed_template_names: UNKNOWN.to_string(),
        }
    }
}

impl SelectiveUpdateLabels {
    /// The labels as `(key, value)` pairs, in serialization order.
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("type", &self.kind),
            ("same-wt", &self.same_wt),
            ("rev-diff", &self.rev_diff),
            ("changed-sections", &self.changed_sections),
            ("changed-template-sites", &self.changed_template_sites),
            ("changed-template-names", &self.changed_template_names),
        ]
    }
}

/// Classify the change from `old` to `new`.
///
/// Without an old revision the result is the default `missing-prev` set.
/// Errors from turning either page bundle into a document are returned as
/// is.
pub fn classify(
    old: Option<(&dyn PageConfig, &PageBundle)>,
    new_page: &dyn PageConfig,
    new_pb: &PageBundle,
) -> Result<SelectiveUpdateLabels> {
    let mut labels = SelectiveUpdateLabels::default();
    let Some((old_page, old_pb)) = old else {
        return Ok(labels);
    };

    let same_wt = old_page.revision_content() == new_page.revision_content();
    labels.same_wt = bool2str(Some(same_wt)).to_string();
    labels.rev_diff = rev_diff(old_page, new_page).to_string();

    let mut old_doc = DomPageBundle::from_page_bundle(old_pb.clone())?.to_dom(true, None)?;
    let mut new_doc = DomPageBundle::from_page_bundle(new_pb.clone())?.to_dom(true, None)?;
    let old_body = old_doc.body().ok_or(Error::MissingElement("body"))?;
    let new_body = new_doc.body().ok_or(Error::MissingElement("body"))?;

    let empty_diff = classifier_diff()
        .diff(&mut old_doc, old_body, &mut new_doc, new_body)?
        .is_empty;
    labels.kind = match (same_wt, empty_diff) {
        (true, true) => "no-op",
        (true, false) => "template-update",
        (false, _) => "page-update",
    }
    .to_string();

    let counts = count_changes(&mut new_doc)?;
    debug!(
        sections = counts.sections,
        template_sites = counts.template_sites,
        template_names = ?counts.template_names,
        "selective update stats"
    );
    labels.changed_sections = int2str(Some(counts.sections), Some(2));
    labels.changed_template_sites = int2str(Some(counts.template_sites), Some(2));
    labels.changed_template_names = int2str(Some(counts.template_names.len()), Some(2));

    Ok(labels)
}

fn rev_diff(old_page: &dyn PageConfig, new_page: &dyn PageConfig) -> &'static str {
    let old_rev = old_page.revision_id();
    let new_rev = new_page.revision_id();
    if old_rev == new_rev {
        "0"
    } else if old_rev == new_page.parent_revision_id() {
        "1"
    } else if new_rev == old_page.parent_revision_id() {
        // The new render is of the revision before the old one, as happens
        // when a cached render of the latest revision races an older one.
        "minus1"
    } else {
        UNKNOWN
    }
}

/// A differ that descends into template output and ignores what varies
/// between any two parses.
fn classifier_diff() -> DomDiff {
    let mut dd = DomDiff::new();
    dd.skip_encapsulated_content = false;
    dd.set_attrib_handler("data-parsoid", |a, b| match (a, b) {
        (AttrValue::DataParsoid(a), AttrValue::DataParsoid(b)) => {
            a.without_offsets() == b.without_offsets()
        }
        _ => a == b,
    });
    // Synthetic ids minted for the page bundle all start with "mw". Real
    // ids that happen to start with "mw" are treated the same.
    dd.set_attrib_handler("id", |a, b| match (a.as_text(), b.as_text()) {
        (Some(a), Some(b)) if a.starts_with("mw") && b.starts_with("mw") => true,
        _ => a == b,
    });
    dd
}

#[derive(Debug, Default)]
struct ChangeCounts {
    sections: usize,
    template_sites: usize,
    template_names: BTreeSet<String>,
}

/// Count changed sections and template sites in a diffed document.
fn count_changes(doc: &mut Document) -> Result<ChangeCounts> {
    let body = doc.body().ok_or(Error::MissingElement("body"))?;
    let mut sections = 0;
    let mut template_sites = 0;
    let mut template_names = BTreeSet::new();
    {
        let mut traverser = DomTraverser::new(true);
        traverser.add_handler(Some("section"), |doc, node, _| {
            if is_parsoid_section_tag(doc, node) && !subtree_unchanged(doc, node)? {
                sections += 1;
            }
            Ok(Action::Continue)
        });
        traverser.add_handler(None, |doc, node, state| {
            let Some(tpl_info) = state.tpl_info.as_mut() else {
                return Ok(Action::Continue);
            };
            if tpl_info.first != node || !has_type_of(doc, node, "mw:Transclusion") {
                return Ok(Action::Continue);
            }

            let about = doc.attr(node, "about").unwrap_or_default().to_string();
            let mut changed = false;
            // Changes confined to fostered whitespace go unnoticed.
            for sib in get_about_siblings(doc, node, &about) {
                if doc.is_element(sib) && !subtree_unchanged(doc, sib)? {
                    changed = true;
                    break;
                }
            }
            if changed {
                template_sites += 1;
                // Keyed on the link as written, so spelling variants of one
                // target count separately.
                let name = get_data_mw(doc, node)?
                    .primary_template_href()
                    .unwrap_or_else(|| UNKNOWN.to_string());
                template_names.insert(name);
            }

            // Only top-level templates are counted.
            tpl_info.clear = true;
            Ok(Action::Next(doc.next_sibling(tpl_info.last)))
        });
        traverser.traverse(doc, body)?;
    }
    Ok(ChangeCounts {
        sections,
        template_sites,
        template_names,
    })
}

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]+").expect("valid regex"));

const ACCEPTABLE_AGENTS: &[&str] = &[
    "ChangePropagation_JobQueue_WMF",
    "ChangePropagation_WMF",
    "Mobileapps_WMF",
    "RESTBase_WMF",
    "C_WikiAPI",
    "Java_7_0_for_MediaWikiAPI",
];

// Checked in order; the bare prefixes come after the longer ones.
const AGENT_PREFIXES: &[&str] = &[
    "MediaWiki_API",
    "MediaWiki_Bot",
    "Mozilla_4_0",
    "Mozilla_5_0",
    "Mozilla",
    "REST_API_Crawler_Google",
    "IABot",
    "Rust_mediawiki_API",
    "ChangePropagation",
];

/// Reduce a user agent to one of a small set of label values.
pub fn filter_user_agent(user_agent: Option<&str>) -> String {
    let Some(user_agent) = user_agent else {
        return UNKNOWN.to_string();
    };
    let normalized = NON_WORD.replace_all(user_agent, "_");
    let normalized = normalized.trim_matches('_');
    if ACCEPTABLE_AGENTS.contains(&normalized) {
        return normalized.to_string();
    }
    AGENT_PREFIXES
        .iter()
        .find(|prefix| normalized.starts_with(*prefix))
        .map_or_else(|| "other".to_string(), |prefix| prefix.to_string())
}

fn bool2str(val: Option<bool>) -> &'static str {
    match val {
        Some(true) => "true",
        Some(false) => "false",
        None => UNKNOWN,
    }
}

/// Format a count, folding everything from `limit` up into `{limit}plus`.
fn int2str(val: Option<usize>, limit: Option<usize>) -> String {
    match (val, limit) {
        (None, _) => UNKNOWN.to_string(),
        (Some(v), Some(limit)) if v >= limit => format!("{limit}plus"),
        (Some(v), _) => v.to_string(),
    }
}
