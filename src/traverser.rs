//! Pre-order DOM traversal with per-tag handlers.
//!
//! While walking, the traverser tracks the encapsulated forest the current
//! node belongs to, so handlers can treat a forest as a unit.

use tracing::error;

use crate::dom::{Document, NodeId};
use crate::dom_data::get_data_parsoid;
use crate::encapsulation::{get_about_siblings, is_first_encapsulation_wrapper_node, is_parsoid_section_tag};
use crate::error::Result;
use crate::node_data::DomSourceRange;

/// What to do after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the remaining handlers, then descend into the node's children.
    Continue,
    /// Skip the remaining handlers and the node's children and resume at the
    /// given node, processing it and its following siblings. With `None`,
    /// resume after the parent.
    Next(Option<NodeId>),
}

/// The forest being traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TplInfo {
    pub first: NodeId,
    pub last: NodeId,
    pub dsr: Option<DomSourceRange>,
    /// Set by a handler to stop tracking this forest.
    pub clear: bool,
}

/// State handed to every handler.
#[derive(Debug, Default)]
pub struct TraverserState {
    pub tpl_info: Option<TplInfo>,
}

type Handler<'a> = Box<dyn FnMut(&mut Document, NodeId, &mut TraverserState) -> Result<Action> + 'a>;

pub struct DomTraverser<'a> {
    handlers: Vec<(Option<String>, Handler<'a>)>,
    check_if_attached: bool,
}

impl<'a> DomTraverser<'a> {
    /// Create a traverser. Unless `skip_check_if_attached`, every handler
    /// that continues is checked for having left its node in the document.
    pub fn new(skip_check_if_attached: bool) -> Self {
        Self {
            handlers: Vec::new(),
            check_if_attached: !skip_check_if_attached,
        }
    }

    /// Register a handler, for elements named `tag` only if given.
    pub fn add_handler(
        &mut self,
        tag: Option<&str>,
        handler: impl FnMut(&mut Document, NodeId, &mut TraverserState) -> Result<Action> + 'a,
    ) {
        self.handlers.push((tag.map(str::to_string), Box::new(handler)));
    }

    fn call_handlers(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        state: &mut TraverserState,
    ) -> Result<Action> {
        let name = doc.tag_name(node).map(str::to_string);
        for (tag, handler) in &mut self.handlers {
            if tag.is_some() && *tag != name {
                continue;
            }
            let action = handler(doc, node, state)?;
            if action != Action::Continue {
                return Ok(action);
            }
            if self.check_if_attached && !doc.contains(doc.root(), node) {
                error!(node = %doc.outer_html(node), "traverse: handler detached the node");
            }
        }
        Ok(Action::Continue)
    }

    /// Traverse `node`, its following siblings, and all their descendants.
    pub fn traverse(&mut self, doc: &mut Document, node: NodeId) -> Result<()> {
        self.traverse_from(doc, Some(node), None)
    }

    fn traverse_from(
        &mut self,
        doc: &mut Document,
        mut work: Option<NodeId>,
        mut tpl_info: Option<TplInfo>,
    ) -> Result<()> {
        while let Some(node) = work {
            // Section wrappers carry encapsulation info that is not meant
            // to be traversed with.
            if tpl_info.is_none()
                && is_first_encapsulation_wrapper_node(doc, node)
                && !is_parsoid_section_tag(doc, node)
            {
                let about = doc.attr(node, "about").unwrap_or_default().to_string();
                let last = get_about_siblings(doc, node, &about).last().copied().unwrap_or(node);
                let dsr = get_data_parsoid(doc, node)?.dsr;
                tpl_info = Some(TplInfo {
                    first: node,
                    last,
                    dsr,
                    clear: false,
                });
            }

            let mut state = TraverserState { tpl_info };
            let action = self.call_handlers(doc, node, &mut state)?;
            tpl_info = state.tpl_info.filter(|t| !t.clear);

            let next = match action {
                Action::Continue => {
                    if doc.is_element(node) && doc.has_children(node) {
                        self.traverse_from(doc, doc.first_child(node), tpl_info)?;
                    }
                    doc.next_sibling(node)
                }
                Action::Next(next) => next,
            };

            if tpl_info.is_some_and(|t| t.last == node) {
                tpl_info = None;
            }
            work = next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visits_in_pre_order() {
        let mut doc = Document::parse("<div><p>a</p><p>b</p></div><span>c</span>");
        let body = doc.body().unwrap();
        let mut seen = Vec::new();
        {
            let mut traverser = DomTraverser::new(false);
            traverser.add_handler(None, |doc, node, _| {
                if let Some(tag) = doc.tag_name(node) {
                    seen.push(tag.to_string());
                }
                Ok(Action::Continue)
            });
            traverser.traverse(&mut doc, body).unwrap();
        }
        assert_eq!(seen, ["body", "div", "p", "p", "span"]);
    }

    #[test]
    fn test_tag_filter_and_skip() {
        let mut doc = Document::parse("<div><p>a</p></div><p>b</p>");
        let body = doc.body().unwrap();
        let mut paragraphs = 0;
        {
            let mut traverser = DomTraverser::new(true);
            traverser.add_handler(Some("div"), |doc, node, _| Ok(Action::Next(doc.next_sibling(node))));
            traverser.add_handler(Some("p"), |_, _, _| {
                paragraphs += 1;
                Ok(Action::Continue)
            });
            traverser.traverse(&mut doc, body).unwrap();
        }
        assert_eq!(paragraphs, 1);
    }

    #[test]
    fn test_tracks_forest() {
        let mut doc = Document::parse(concat!(
            r##"<p about="#mwt1" typeof="mw:Transclusion">a</p>"##,
            r##"<p about="#mwt1">b</p>"##,
            "<p>c</p>",
        ));
        let body = doc.body().unwrap();
        let children: Vec<_> = doc.children(body).collect();
        let mut firsts = Vec::new();
        {
            let mut traverser = DomTraverser::new(false);
            traverser.add_handler(Some("p"), |_, node, state| {
                firsts.push((node, state.tpl_info.map(|t| (t.first, t.last))));
                Ok(Action::Continue)
            });
            traverser.traverse(&mut doc, body).unwrap();
        }
        let forest = Some((children[0], children[1]));
        assert_eq!(firsts, vec![(children[0], forest), (children[1], forest), (children[2], None)]);
    }

    #[test]
    fn test_sections_are_not_forests() {
        let mut doc = Document::parse(
            r##"<section data-mw-section-id="1" about="#mwt1" typeof="mw:Transclusion"><p>a</p></section>"##,
        );
        let body = doc.body().unwrap();
        let mut tracked = false;
        {
            let mut traverser = DomTraverser::new(false);
            traverser.add_handler(None, |_, _, state| {
                tracked |= state.tpl_info.is_some();
                Ok(Action::Continue)
            });
            traverser.traverse(&mut doc, body).unwrap();
        }
        assert!(!tracked);
    }
}
