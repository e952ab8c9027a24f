use std::cell::{Cell, RefCell};
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Node as DomNode, NodeData};
use tracing::trace;

use crate::node::{name_matches, Node};

impl Node {
    /// Replaces the element's text.
    ///
    /// A leading text child is overwritten in place. Otherwise a new text node
    /// is appended after the existing children, which are left untouched.
    /// Does nothing for non-elements.
    pub fn set_text(&self, text: &str) {
        if !self.is_element() {
            return;
        }

        let handle = self.handle();
        let first = handle.children.borrow().first().cloned();
        if let Some(child) = first {
            if let NodeData::Text { contents } = &child.data {
                *contents.borrow_mut() = StrTendril::from(text);
                trace!(tag = ?self.tag_name(), "replaced leading text node");
                return;
            }
        }

        let text_node = Rc::new(DomNode {
            parent: Cell::new(Some(Rc::downgrade(handle))),
            children: RefCell::new(Vec::new()),
            data: NodeData::Text {
                contents: RefCell::new(StrTendril::from(text)),
            },
        });
        handle.children.borrow_mut().push(text_node);
        trace!(tag = ?self.tag_name(), "appended text node");
    }

    /// Sets attribute `name` to `value`, returning the value it replaced.
    ///
    /// New attributes go after existing ones. Does nothing (and returns
    /// `None`) for non-elements.
    pub fn set_attr(&self, name: &str, value: &str) -> Option<String> {
        let NodeData::Element { attrs, .. } = &self.handle().data else {
            return None;
        };
        let mut attrs = attrs.borrow_mut();

        if let Some(existing) = attrs.iter_mut().find(|attr| name_matches(&attr.name, name)) {
            let previous = std::mem::replace(&mut existing.value, StrTendril::from(value));
            trace!(attr = name, "replaced attribute value");
            return Some(previous.to_string());
        }

        attrs.push(Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
            value: StrTendril::from(value),
        });
        trace!(attr = name, "appended attribute");
        None
    }

    /// Removes attribute `name`, returning its value if it was present.
    pub fn remove_attr(&self, name: &str) -> Option<String> {
        let NodeData::Element { attrs, .. } = &self.handle().data else {
            return None;
        };
        let mut attrs = attrs.borrow_mut();
        let position = attrs
            .iter()
            .position(|attr| name_matches(&attr.name, name))?;
        let removed = attrs.remove(position);
        trace!(attr = name, "removed attribute");
        Some(removed.value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn set_text_overwrites_leading_text_child() {
        let doc = Document::load_html("<p>old<b>bold</b></p>").unwrap();
        let p = doc.find_by_tag("p").remove(0);
        p.set_text("new");
        assert_eq!(p.children().len(), 2);
        assert_eq!(p.first_child().unwrap().text().as_deref(), Some("new"));
    }

    #[test]
    fn set_text_appends_after_element_children() {
        let doc = Document::load_html("<p><b>bold</b></p>").unwrap();
        let p = doc.find_by_tag("p").remove(0);
        p.set_text("tail");
        let children = p.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].tag_name().as_deref(), Some("b"));
        assert_eq!(children[1].text().as_deref(), Some("tail"));
        assert_eq!(children[1].parent(), Some(p.clone()));
    }

    #[test]
    fn set_text_ignores_non_elements() {
        let doc = Document::load_html("<p>text</p>").unwrap();
        let text = doc.find_by_tag("p")[0].first_child().unwrap();
        text.set_text("changed");
        assert_eq!(text.text().as_deref(), Some("text"));
    }

    #[test]
    fn set_attr_reports_previous_value() {
        let doc = Document::load_html(r#"<a href="/old">x</a>"#).unwrap();
        let a = doc.find_by_tag("a").remove(0);
        assert_eq!(a.set_attr("href", "/new").as_deref(), Some("/old"));
        assert_eq!(a.set_attr("rel", "next"), None);
        assert_eq!(
            a.attributes(),
            vec![
                ("href".to_string(), "/new".to_string()),
                ("rel".to_string(), "next".to_string())
            ]
        );
    }

    #[test]
    fn remove_attr_is_idempotent() {
        let doc = Document::load_html(r#"<a href="/x" rel="next">x</a>"#).unwrap();
        let a = doc.find_by_tag("a").remove(0);
        assert_eq!(a.remove_attr("rel").as_deref(), Some("next"));
        assert_eq!(a.remove_attr("rel"), None);
        assert_eq!(a.attributes().len(), 1);
    }
}
