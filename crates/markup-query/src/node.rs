use std::fmt;
use std::rc::{Rc, Weak};

use html5ever::QualName;
use markup5ever_rcdom::{Handle, NodeData};

use crate::parse::Format;

/// The kind of a tree node, carrying only the fields that kind has.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype { name: String },
    Element { tag: String },
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, contents: String },
}

/// A handle to one node of a loaded [`crate::Document`].
///
/// Handles are cheap to clone and compare by identity. Mutations made through
/// any handle are visible to every other handle and to the owning document.
#[derive(Clone)]
pub struct Node {
    handle: Handle,
    format: Format,
}

impl Node {
    pub(crate) fn new(handle: Handle, format: Format) -> Self {
        Self { handle, format }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    pub(crate) fn format(&self) -> Format {
        self.format
    }

    pub fn kind(&self) -> NodeKind {
        match &self.handle.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Doctype { name, .. } => NodeKind::Doctype {
                name: name.to_string(),
            },
            NodeData::Element { name, .. } => NodeKind::Element {
                tag: qualified_name(name),
            },
            NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
            NodeData::Comment { contents } => NodeKind::Comment(contents.to_string()),
            NodeData::ProcessingInstruction { target, contents } => {
                NodeKind::ProcessingInstruction {
                    target: target.to_string(),
                    contents: contents.to_string(),
                }
            }
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.handle.data, NodeData::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.handle.data, NodeData::Text { .. })
    }

    /// Element name as written in the tree, `prefix:local` when prefixed.
    pub fn tag_name(&self) -> Option<String> {
        match &self.handle.data {
            NodeData::Element { name, .. } => Some(qualified_name(name)),
            _ => None,
        }
    }

    /// Exact, case-sensitive comparison against the element name.
    pub fn has_tag(&self, tag: &str) -> bool {
        match &self.handle.data {
            NodeData::Element { name, .. } => name_matches(name, tag),
            _ => false,
        }
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        let NodeData::Element { attrs, .. } = &self.handle.data else {
            return None;
        };
        attrs
            .borrow()
            .iter()
            .find(|attr| name_matches(&attr.name, name))
            .map(|attr| attr.value.to_string())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Attributes in source order. Empty for anything but elements.
    pub fn attributes(&self) -> Vec<(String, String)> {
        let NodeData::Element { attrs, .. } = &self.handle.data else {
            return Vec::new();
        };
        attrs
            .borrow()
            .iter()
            .map(|attr| (qualified_name(&attr.name), attr.value.to_string()))
            .collect()
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn class_list(&self) -> Vec<String> {
        self.attr("class")
            .map(|value| value.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .is_some_and(|value| contains_class(&value, class_name))
    }

    /// Character data of a text node; `None` for every other kind.
    pub fn text(&self) -> Option<String> {
        match &self.handle.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes, in document order.
    pub fn inner_text(&self) -> String {
        let mut output = String::new();
        let mut stack = vec![self.handle.clone()];
        while let Some(handle) = stack.pop() {
            if let NodeData::Text { contents } = &handle.data {
                output.push_str(&contents.borrow());
            }
            stack.extend(handle.children.borrow().iter().rev().cloned());
        }
        output
    }

    pub fn children(&self) -> Vec<Node> {
        self.handle
            .children
            .borrow()
            .iter()
            .map(|child| Node::new(child.clone(), self.format))
            .collect()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.handle
            .children
            .borrow()
            .first()
            .map(|child| Node::new(child.clone(), self.format))
    }

    pub fn parent(&self) -> Option<Node> {
        // The parent link lives in a `Cell`, so it has to be taken and put back.
        let weak = self.handle.parent.take();
        let parent = weak.as_ref().and_then(Weak::upgrade);
        self.handle.parent.set(weak);
        parent.map(|handle| Node::new(handle, self.format))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node").field(&self.kind()).finish()
    }
}

/// Returns true when `class_list`, split on whitespace, holds `class_name`
/// as a whole token.
pub fn contains_class(class_list: &str, class_name: &str) -> bool {
    class_list
        .split_whitespace()
        .any(|token| token == class_name)
}

pub(crate) fn qualified_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", &**prefix, &*name.local),
        None => name.local.to_string(),
    }
}

pub(crate) fn name_matches(name: &QualName, wanted: &str) -> bool {
    match &name.prefix {
        Some(prefix) => wanted.split_once(':') == Some((&**prefix, &*name.local)),
        None => &*name.local == wanted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_tokens_match_whole_words_only() {
        assert!(contains_class("intro lead", "lead"));
        assert!(contains_class("  intro\tlead\n", "intro"));
        assert!(!contains_class("a-b", "a"));
        assert!(!contains_class("intro", "Intro"));
        assert!(!contains_class("", ""));
    }

    #[test]
    fn class_list_splits_on_any_whitespace() {
        let doc = crate::Document::load_html("<p class=\" lead\tintro  \">x</p><b>y</b>").unwrap();
        let p = doc.find_by_tag("p").remove(0);
        assert_eq!(p.class_list(), ["lead", "intro"]);
        assert!(doc.find_by_tag("b")[0].class_list().is_empty());
    }

    #[test]
    fn text_nodes_are_not_elements() {
        let doc = crate::Document::load_html("<p>x</p>").unwrap();
        let p = doc.find_by_tag("p").remove(0);
        let text = p.first_child().unwrap();
        assert!(p.is_element() && !p.is_text());
        assert!(text.is_text() && !text.is_element());
        assert_eq!(text.tag_name(), None);
    }
}
