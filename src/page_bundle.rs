//! Page bundles: HTML with `data-parsoid` and `data-mw` held out of line.
//!
//! The out-of-line data is keyed by element `id`. A [`PageBundle`] carries
//! the HTML as a string, a [`DomPageBundle`] as a parsed [`Document`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::codec::{DomDataCodec, LoadOptions, StoreOptions};
use crate::dom::{Document, NodeId};
use crate::dom_data::set_json_attribute;
use crate::error::{Error, Result};

/// Id of the `<script>` carrying an embedded page bundle.
pub const PAGE_BUNDLE_SCRIPT_ID: &str = "mw-pagebundle";
const PAGE_BUNDLE_SCRIPT_TYPE: &str = "application/x-mw-pagebundle";

/// `data-parsoid` entries by element id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsoidBundle {
    /// Last counter used to mint an id; -1 when none was minted yet.
    #[serde(default = "initial_counter")]
    pub counter: i64,
    #[serde(default)]
    pub ids: BTreeMap<String, Value>,
}

fn initial_counter() -> i64 {
    -1
}

impl Default for ParsoidBundle {
    fn default() -> Self {
        Self {
            counter: initial_counter(),
            ids: BTreeMap::new(),
        }
    }
}

/// `data-mw` entries by element id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MwBundle {
    #[serde(default)]
    pub ids: BTreeMap<String, Value>,
}

/// The out-of-line halves of a page bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleData {
    #[serde(default)]
    pub parsoid: ParsoidBundle,
    #[serde(default)]
    pub mw: MwBundle,
}

/// A page bundle as exchanged over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageBundle {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub parsoid: Option<ParsoidBundle>,
    #[serde(default)]
    pub mw: Option<MwBundle>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub contentmodel: Option<String>,
}

impl PageBundle {
    /// Check that the bundle carries the data a document of
    /// `content_version` needs.
    ///
    /// `data-parsoid` is always required. `data-mw` is required from
    /// content version 999 on, when it stopped being inlined.
    pub fn validate(&self, content_version: &str) -> Result<()> {
        if self.parsoid.is_none() {
            return Err(Error::InvalidPageBundle(
                "Invalid data-parsoid was provided.".into(),
            ));
        }
        let major = content_version
            .split('.')
            .next()
            .and_then(|m| m.parse::<u64>().ok());
        if major == Some(999) && self.mw.is_none() {
            return Err(Error::InvalidPageBundle("Invalid data-mw was provided.".into()));
        }
        Ok(())
    }

    pub fn from_dom_page_bundle(dpb: DomPageBundle) -> Self {
        PageBundle {
            html: dpb.doc.to_html(),
            parsoid: dpb.parsoid,
            mw: dpb.mw,
            version: dpb.version,
            headers: dpb.headers,
            contentmodel: dpb.contentmodel,
        }
    }

    /// Merge the bundle into the HTML as inline attributes.
    pub fn to_inline_attribute_html(&self, body_only: bool) -> Result<String> {
        DomPageBundle::from_page_bundle(self.clone())?.to_inline_attribute_html(body_only)
    }
}

/// A page bundle whose HTML has been parsed.
///
/// Conversions consume the bundle, so its document can only be taken once.
#[derive(Debug)]
pub struct DomPageBundle {
    pub doc: Document,
    pub parsoid: Option<ParsoidBundle>,
    pub mw: Option<MwBundle>,
    pub version: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub contentmodel: Option<String>,
}

impl DomPageBundle {
    /// Wrap a document with empty bundle data.
    ///
    /// Fails if the document still embeds its own page bundle.
    pub fn new_empty(doc: Document) -> Result<Self> {
        if Self::is_single_document(&doc) {
            return Err(Error::ConflictingPageBundle);
        }
        Ok(DomPageBundle {
            doc,
            parsoid: Some(ParsoidBundle::default()),
            mw: Some(MwBundle::default()),
            version: None,
            headers: None,
            contentmodel: None,
        })
    }

    /// Parse the HTML of a [`PageBundle`].
    pub fn from_page_bundle(pb: PageBundle) -> Result<Self> {
        let doc = Document::parse(&pb.html);
        if Self::is_single_document(&doc) {
            return Err(Error::ConflictingPageBundle);
        }
        Ok(DomPageBundle {
            doc,
            parsoid: pb.parsoid,
            mw: pb.mw,
            version: pb.version,
            headers: pb.headers,
            contentmodel: pb.contentmodel,
        })
    }

    /// Turn the bundle back into a document.
    ///
    /// Bundle entries are first applied as inline attributes. With `load`,
    /// the body is then loaded with `options` (new content is marked when
    /// `options` is `None`).
    pub fn to_dom(self, load: bool, options: Option<LoadOptions>) -> Result<Document> {
        let mut doc = self.doc;
        apply(&mut doc, self.parsoid.as_ref(), self.mw.as_ref())?;
        if load {
            let body = doc.body().ok_or(Error::MissingElement("body"))?;
            let options = options.unwrap_or(LoadOptions { mark_new: true });
            DomDataCodec::new(options, StoreOptions::default()).visit_and_load(&mut doc, body)?;
        }
        Ok(doc)
    }

    /// Store a loaded document's body into a fresh bundle.
    pub fn from_loaded_document(mut doc: Document, options: StoreOptions) -> Result<Self> {
        if Self::is_single_document(&doc) {
            return Err(Error::ConflictingPageBundle);
        }
        let body = doc.body().ok_or(Error::MissingElement("body"))?;
        doc.bag_mut().take_page_bundle();

        let options = StoreOptions {
            store_in_page_bundle: true,
            ..options
        };
        DomDataCodec::new(LoadOptions::default(), options).visit_and_store(&mut doc, body)?;

        let data = doc.bag_mut().take_page_bundle();
        Ok(DomPageBundle {
            doc,
            parsoid: Some(data.parsoid),
            mw: Some(data.mw),
            version: None,
            headers: None,
            contentmodel: None,
        })
    }

    /// Embed the bundle data in a `<script>` in `<head>`.
    pub fn to_single_document(self) -> Result<Document> {
        let mut doc = self.doc;
        let head = doc.head().ok_or(Error::MissingElement("head"))?;
        let parsoid = match self.parsoid {
            Some(p) => serde_json::to_value(p)?,
            None => json!({}),
        };
        let mw = match self.mw {
            Some(m) => serde_json::to_value(m)?,
            None => json!({}),
        };
        let payload = json!({ "parsoid": parsoid, "mw": mw });

        let script = doc.create_element("script");
        doc.set_attr(script, "id", PAGE_BUNDLE_SCRIPT_ID);
        doc.set_attr(script, "type", PAGE_BUNDLE_SCRIPT_TYPE);
        let text = doc.create_text(serde_json::to_string(&payload)?);
        doc.append(script, text);
        doc.append(head, script);
        Ok(doc)
    }

    pub fn to_single_document_html(self) -> Result<String> {
        Ok(self.to_single_document()?.to_html())
    }

    /// Unpack a document produced by [`Self::to_single_document`], removing
    /// the embedded script.
    pub fn from_single_document(mut doc: Document) -> Result<Self> {
        let script = doc
            .get_element_by_id(PAGE_BUNDLE_SCRIPT_ID)
            .ok_or(Error::MissingPageBundle)?;
        doc.detach(script);
        let json = doc.text_content(script);

        #[derive(Deserialize)]
        struct Embedded {
            #[serde(default)]
            parsoid: Option<ParsoidBundle>,
            #[serde(default)]
            mw: Option<MwBundle>,
        }
        let embedded: Embedded = serde_json::from_str(&json)?;

        Ok(DomPageBundle {
            doc,
            parsoid: embedded.parsoid,
            mw: embedded.mw,
            version: None,
            headers: None,
            contentmodel: None,
        })
    }

    /// Check whether the document embeds a page bundle script.
    pub fn is_single_document(doc: &Document) -> bool {
        doc.get_element_by_id(PAGE_BUNDLE_SCRIPT_ID).is_some()
    }

    /// Serialize with the bundle data merged back as inline attributes.
    pub fn to_inline_attribute_html(self, body_only: bool) -> Result<String> {
        let doc = self.to_dom(false, None)?;
        if body_only {
            let body = doc.body().ok_or(Error::MissingElement("body"))?;
            Ok(doc.inner_html(body))
        } else {
            Ok(doc.to_html())
        }
    }
}

/// Copy bundle entries onto the elements carrying their ids.
///
/// The body is visited before `<head>`, which holds banked fragments. An
/// existing `data-mw` wins over the bundle's.
fn apply(doc: &mut Document, parsoid: Option<&ParsoidBundle>, mw: Option<&MwBundle>) -> Result<()> {
    if DomPageBundle::is_single_document(doc) {
        return Err(Error::ConflictingPageBundle);
    }
    let roots = [doc.body(), doc.head()];
    for root in roots.into_iter().flatten() {
        let elements: Vec<NodeId> = doc
            .descendants(root)
            .filter(|&n| doc.is_element(n))
            .collect();
        for element in elements {
            let Some(id) = doc.attr(element, "id").map(str::to_string) else {
                continue;
            };
            if let Some(dp) = parsoid.and_then(|p| p.ids.get(&id)) {
                set_json_attribute(doc, element, "data-parsoid", dp)?;
            }
            if let Some(dmw) = mw.and_then(|m| m.ids.get(&id)) {
                if !doc.has_attr(element, "data-mw") {
                    set_json_attribute(doc, element, "data-mw", dmw)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_data::{get_data_mw, get_data_parsoid};
    use crate::node_data::TempData;

    fn sample() -> PageBundle {
        serde_json::from_value(json!({
            "html": "<p id=\"mwAA\">a</p><p id=\"mwAQ\" data-mw='{\"inline\":true}'>b</p><p>c</p>",
            "parsoid": {"counter": 1, "ids": {"mwAA": {"stx": "html"}, "mwAQ": {}}},
            "mw": {"ids": {"mwAQ": {"bundled": true}}},
            "version": "2.8.0"
        }))
        .unwrap()
    }

    #[test]
    fn test_json_defaults() {
        let pb: PageBundle = serde_json::from_str(r#"{"html":"x","parsoid":{"ids":{}}}"#).unwrap();
        assert_eq!(pb.parsoid.unwrap().counter, -1);
        assert_eq!(pb.mw, None);
    }

    #[test]
    fn test_validate() {
        let mut pb = sample();
        assert!(pb.validate("2.8.0").is_ok());
        pb.mw = None;
        assert!(pb.validate("2.8.0").is_ok());
        assert!(matches!(pb.validate("999.0.0"), Err(Error::InvalidPageBundle(_))));
        pb.parsoid = None;
        assert!(matches!(pb.validate("2.8.0"), Err(Error::InvalidPageBundle(_))));
    }

    #[test]
    fn test_to_dom_applies_and_loads() {
        let mut doc = DomPageBundle::from_page_bundle(sample())
            .unwrap()
            .to_dom(true, None)
            .unwrap();
        let body = doc.body().unwrap();
        let ps: Vec<_> = doc.children(body).collect();

        assert_eq!(get_data_parsoid(&mut doc, ps[0]).unwrap().stx.as_deref(), Some("html"));
        // Inline data-mw takes precedence over the bundle.
        assert_eq!(get_data_mw(&mut doc, ps[1]).unwrap().get("inline"), Some(&json!(true)));
        // No bundle entry: the element is new content.
        assert!(get_data_parsoid(&mut doc, ps[2]).unwrap().get_temp_flag(TempData::IS_NEW));
        assert!(!get_data_parsoid(&mut doc, ps[0]).unwrap().get_temp_flag(TempData::IS_NEW));
    }

    #[test]
    fn test_single_document_round_trip() {
        let dpb = DomPageBundle::from_page_bundle(sample()).unwrap();
        let html = dpb.to_single_document_html().unwrap();
        assert!(html.contains(r#"<script id="mw-pagebundle" type="application/x-mw-pagebundle">"#));

        let doc = Document::parse(&html);
        assert!(DomPageBundle::is_single_document(&doc));
        assert!(matches!(
            DomPageBundle::new_empty(Document::parse(&html)),
            Err(Error::ConflictingPageBundle)
        ));

        let dpb = DomPageBundle::from_single_document(doc).unwrap();
        assert!(!DomPageBundle::is_single_document(&dpb.doc));
        assert_eq!(dpb.parsoid.as_ref().unwrap().counter, 1);
        assert!(dpb.mw.as_ref().unwrap().ids.contains_key("mwAQ"));
    }

    #[test]
    fn test_from_single_document_requires_script() {
        let doc = Document::parse("<p>x</p>");
        assert!(matches!(
            DomPageBundle::from_single_document(doc),
            Err(Error::MissingPageBundle)
        ));
    }

    #[test]
    fn test_loaded_document_round_trip() {
        let doc = DomPageBundle::from_page_bundle(sample())
            .unwrap()
            .to_dom(true, Some(LoadOptions::default()))
            .unwrap();
        let dpb = DomPageBundle::from_loaded_document(doc, StoreOptions::default()).unwrap();

        let parsoid = dpb.parsoid.as_ref().unwrap();
        assert_eq!(parsoid.ids["mwAA"], json!({"stx": "html"}));
        // The body and the third paragraph got minted ids.
        assert_eq!(parsoid.ids.len(), 4);
        assert_eq!(dpb.mw.as_ref().unwrap().ids["mwAQ"], json!({"inline": true}));

        let pb = PageBundle::from_dom_page_bundle(dpb);
        assert!(!pb.html.contains("data-parsoid"));
        assert!(!pb.html.contains("data-mw"));
    }

    #[test]
    fn test_inline_attribute_html() {
        let html = sample().to_inline_attribute_html(true).unwrap();
        assert!(html.contains(r#"data-parsoid="{&quot;stx&quot;:&quot;html&quot;}""#));
        assert!(html.contains("<p>c</p>"));
    }
}
