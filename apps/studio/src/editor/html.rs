//! HTML fragment reader for editor content.
//!
//! Tokenizing is done by `lol_html`: element and end-tag handlers open and
//! close arena nodes, the document text handler collects text. Character
//! references are resolved with quick-xml's HTML5 entity table. Comments are
//! dropped. Elements left open at the end of input stay open.

use std::cell::RefCell;
use std::rc::Rc;

use lol_html::{doc_text, element, rewrite_str, RewriteStrSettings};
use quick_xml::escape::unescape;
use thiserror::Error;

use crate::editor::dom::{Document, NodeId, VOID_TAGS};

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("HTML parse failed: {0}")]
    Rewrite(String),
}

/// Arena under construction. Owns the document while the rewriter runs
/// because end-tag handlers must be `'static`.
struct TreeBuilder {
    doc: Document,
    stack: Vec<NodeId>,
    pending: String,
}

impl TreeBuilder {
    fn top(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn flush_text(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.pending);
        let text = decode(&raw);
        let node = self.doc.create_text(&text);
        let top = self.top();
        self.doc.append_child(top, node);
    }

    fn open(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.flush_text();
        let el = self.doc.create_element(tag);
        for (k, v) in attrs {
            self.doc.set_attr(el, &k, &v);
        }
        let top = self.top();
        self.doc.append_child(top, el);
        el
    }

    /// Pops `el` and anything opened inside it that never closed.
    fn close(&mut self, el: NodeId) {
        self.flush_text();
        if let Some(pos) = self.stack.iter().rposition(|&n| n == el) {
            self.stack.truncate(pos);
        }
    }
}

/// Parses `html` and appends the resulting nodes to `parent`.
pub fn parse_into(doc: &mut Document, parent: NodeId, html: &str) -> Result<(), HtmlError> {
    let builder = Rc::new(RefCell::new(TreeBuilder {
        doc: std::mem::take(doc),
        stack: vec![parent],
        pending: String::new(),
    }));
    let on_element = Rc::clone(&builder);
    let on_text = Rc::clone(&builder);

    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", move |el| {
                let tag = el.tag_name().to_ascii_lowercase();
                let attrs = el
                    .attributes()
                    .iter()
                    .map(|a| (a.name().to_ascii_lowercase(), decode(&a.value())))
                    .collect();
                let node = on_element.borrow_mut().open(&tag, attrs);

                if VOID_TAGS.contains(&tag.as_str()) || el.is_self_closing() {
                    return Ok(());
                }
                if let Some(handlers) = el.end_tag_handlers() {
                    on_element.borrow_mut().stack.push(node);
                    let on_end = Rc::clone(&on_element);
                    let handler: lol_html::EndTagHandler<'static> = Box::new(move |_end| {
                        on_end.borrow_mut().close(node);
                        Ok(())
                    });
                    handlers.push(handler);
                }
                Ok(())
            })],
            document_content_handlers: vec![doc_text!(move |chunk| {
                on_text.borrow_mut().pending.push_str(chunk.as_str());
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    );

    let mut built = builder.borrow_mut();
    built.flush_text();
    *doc = std::mem::take(&mut built.doc);
    result
        .map(|_| ())
        .map_err(|e| HtmlError::Rewrite(e.to_string()))
}

/// Resolves character references. Text with a stray `&` is kept verbatim.
fn decode(raw: &str) -> String {
    unescape(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        parse_into(&mut doc, root, html).expect("parse");
        doc
    }

    #[test]
    fn test_round_trips_editor_markup() {
        let html = r#"<p style="margin-left: 20px">one<br>two</p><ul><li>a</li><li>b &amp; c</li></ul>"#;
        let doc = parse(html);
        assert_eq!(doc.inner_html(doc.root()), html);
    }

    #[test]
    fn test_attributes_quoted_and_bare() {
        let doc = parse(r#"<a href='x.com' target=_blank data-x>t</a>"#);
        let a = doc.children(doc.root())[0];
        assert_eq!(doc.attr(a, "href"), Some("x.com"));
        assert_eq!(doc.attr(a, "target"), Some("_blank"));
        assert_eq!(doc.attr(a, "data-x"), Some(""));
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let doc = parse(r#"<span title="a > b">x</span>"#);
        let span = doc.children(doc.root())[0];
        assert_eq!(doc.attr(span, "title"), Some("a > b"));
        assert_eq!(doc.text_content(span), "x");
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let doc = parse("<p>open</div>tail");
        assert_eq!(doc.inner_html(doc.root()), "<p>opentail</p>");
    }

    #[test]
    fn test_comments_dropped() {
        let doc = parse("a<!-- note -->b");
        assert_eq!(doc.text_content(doc.root()), "ab");
    }

    #[test]
    fn test_character_references_decoded() {
        let doc = parse("<p>a&#8212;b &mdash; it&#x27;s&nbsp;x</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.text_content(p), "a\u{2014}b \u{2014} it's\u{a0}x");
        assert_eq!(doc.inner_html(p), "a\u{2014}b \u{2014} it's\u{a0}x");
    }

    #[test]
    fn test_stray_ampersand_kept() {
        let doc = parse("<p>fish & chips</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.text_content(p), "fish & chips");
        assert_eq!(doc.inner_html(p), "fish &amp; chips");
    }

    #[test]
    fn test_nested_elements_close_in_order() {
        let doc = parse("<ul><li>one <b>two</b></li><li>three</li></ul>tail");
        assert_eq!(
            doc.inner_html(doc.root()),
            "<ul><li>one <b>two</b></li><li>three</li></ul>tail"
        );
    }
}
