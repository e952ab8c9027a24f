use std::fs;
use std::io::Read;
use std::path::Path;

use html5ever::serialize::TraversalScope;
use markup5ever_rcdom::RcDom;
use tracing::debug;

use crate::error::{LoadError, LoadResult, ParseError};
use crate::node::Node;
use crate::parse::{parse_dom, Format, ParseOptions};
use crate::query::{collect, Matcher};
use crate::render::serialize;

/// A parsed markup tree and the operations over it.
///
/// The tree is built eagerly on load and owned exclusively by the document.
pub struct Document {
    dom: RcDom,
    format: Format,
}

impl Document {
    pub fn parse(content: &str, options: &ParseOptions) -> LoadResult<Self> {
        let dom = parse_dom(content, options)?;
        Ok(Self {
            dom,
            format: options.format,
        })
    }

    pub fn load_html(content: &str) -> LoadResult<Self> {
        Self::parse(content, &ParseOptions::html())
    }

    /// XML input goes through the lenient HTML tree builder; use
    /// [`Format::StrictXml`] with [`Document::parse`] for a real XML parse.
    pub fn load_xml(content: &str) -> LoadResult<Self> {
        Self::parse(content, &ParseOptions::xml())
    }

    pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> LoadResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "read markup file");
        Self::parse_bytes(bytes, options)
    }

    pub fn load_html_file(path: impl AsRef<Path>) -> LoadResult<Self> {
        Self::parse_file(path, &ParseOptions::html())
    }

    pub fn load_xml_file(path: impl AsRef<Path>) -> LoadResult<Self> {
        Self::parse_file(path, &ParseOptions::xml())
    }

    pub fn parse_reader<R: Read>(reader: &mut R, options: &ParseOptions) -> LoadResult<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(LoadError::Read)?;
        Self::parse_bytes(bytes, options)
    }

    fn parse_bytes(bytes: Vec<u8>, options: &ParseOptions) -> LoadResult<Self> {
        let content = String::from_utf8(bytes).map_err(ParseError::from)?;
        Self::parse(&content, options)
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn root(&self) -> Node {
        Node::new(self.dom.document.clone(), self.format)
    }

    /// Every node accepted by `predicate`, in document order.
    pub fn find<F>(&self, predicate: F) -> Vec<Node>
    where
        F: FnMut(&Node) -> bool,
    {
        collect(&self.root(), predicate)
    }

    pub fn select(&self, matcher: Matcher<'_>) -> Vec<Node> {
        self.find(|node| matcher.matches(node))
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<Node> {
        self.select(Matcher::Tag(tag))
    }

    pub fn find_by_class(&self, class_name: &str) -> Vec<Node> {
        self.select(Matcher::Class(class_name))
    }

    /// Sets the text of every element named `tag`. See [`Node::set_text`].
    pub fn set_text(&mut self, tag: &str, text: &str) {
        for node in self.find_by_tag(tag) {
            node.set_text(text);
        }
    }

    /// Sets attribute `name` on every element named `tag`.
    pub fn add_attr(&mut self, tag: &str, name: &str, value: &str) {
        for node in self.find_by_tag(tag) {
            node.set_attr(name, value);
        }
    }

    /// Removes attribute `name` from every element named `tag`, if present.
    pub fn remove_attr(&mut self, tag: &str, name: &str) {
        for node in self.find_by_tag(tag) {
            node.remove_attr(name);
        }
    }

    /// Serializes the whole tree.
    pub fn render(&self) -> String {
        serialize(
            &self.dom.document,
            self.format,
            TraversalScope::ChildrenOnly(None),
        )
    }

    /// Messages the parser reported while recovering from malformed input.
    pub fn parse_errors(&self) -> Vec<String> {
        self.dom
            .errors
            .borrow()
            .iter()
            .map(|err| err.to_string())
            .collect()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
