use std::fmt;
use std::str::FromStr;

use std::rc::Rc;

use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{NodeData, RcDom};
use tracing::debug;
use xml5ever::driver::XmlParseOpts;

use crate::error::ParseError;

/// Which tree builder (and matching serializer) a document goes through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// HTML5 tree builder; implied `html`/`head`/`body` elements are inserted.
    #[default]
    Html,
    /// XML-looking input routed through the lenient HTML tree builder.
    Xml,
    /// A real XML tree builder; no HTML-specific tag insertion.
    StrictXml,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Xml => "xml",
            Format::StrictXml => "strict-xml",
        }
    }

    pub(crate) fn is_strict_xml(self) -> bool {
        matches!(self, Format::StrictXml)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Format::Html),
            "xml" => Ok(Format::Xml),
            "strict-xml" | "strict_xml" => Ok(Format::StrictXml),
            other => Err(format!(
                "unknown format '{other}' (expected html, xml or strict-xml)"
            )),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub format: Format,
    /// Reject the document when the parser reports any error instead of
    /// silently accepting its recovered tree.
    pub strict: bool,
}

impl ParseOptions {
    pub fn html() -> Self {
        Self::default()
    }

    pub fn xml() -> Self {
        Self::default().with_format(Format::Xml)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

pub(crate) fn parse_dom(content: &str, options: &ParseOptions) -> Result<RcDom, ParseError> {
    let dom = match options.format {
        Format::Html | Format::Xml => {
            html5ever::parse_document(RcDom::default(), html5ever::ParseOpts::default())
                .one(content)
        }
        Format::StrictXml => {
            xml5ever::driver::parse_document(RcDom::default(), XmlParseOpts::default())
                .one(content)
        }
    };

    let errors: Vec<String> = dom
        .errors
        .borrow()
        .iter()
        .map(|err| err.to_string())
        .collect();

    debug!(
        format = %options.format,
        bytes = content.len(),
        parse_errors = errors.len(),
        "parsed document"
    );

    if options.strict && !errors.is_empty() {
        return Err(ParseError::Rejected { errors });
    }

    adopt_template_contents(&dom);
    Ok(dom)
}

/// Moves the children of every `<template>` content fragment under the
/// template element itself, so the walk and the serializer see them like
/// any other children.
fn adopt_template_contents(dom: &RcDom) {
    let mut stack = vec![dom.document.clone()];
    while let Some(handle) = stack.pop() {
        if let NodeData::Element {
            template_contents, ..
        } = &handle.data
        {
            let fragment = template_contents.borrow_mut().take();
            if let Some(fragment) = fragment {
                let adopted: Vec<_> = fragment.children.take();
                for child in &adopted {
                    child.parent.set(Some(Rc::downgrade(&handle)));
                }
                handle.children.borrow_mut().extend(adopted);
            }
        }
        stack.extend(handle.children.borrow().iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_round_trips_through_str() {
        for format in [Format::Html, Format::Xml, Format::StrictXml] {
            assert_eq!(format.as_str().parse::<Format>().unwrap(), format);
        }
        assert_eq!("  HTML ".parse::<Format>().unwrap(), Format::Html);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = "svg".parse::<Format>().unwrap_err();
        assert!(err.contains("svg"));
    }

    #[test]
    fn lenient_parse_accepts_fragments() {
        let dom = parse_dom("<p>unclosed", &ParseOptions::html()).unwrap();
        assert!(!dom.errors.borrow().is_empty());
    }

    #[test]
    fn strict_parse_rejects_recovered_input() {
        let Err(err) = parse_dom("<p>unclosed", &ParseOptions::html().with_strict(true)) else {
            panic!("strict parse accepted recovered input");
        };
        assert!(matches!(err, ParseError::Rejected { .. }));
    }

    #[test]
    fn template_contents_become_children() {
        let dom = parse_dom(
            "<template><p>inside</p><template><b>nested</b></template></template>",
            &ParseOptions::html(),
        )
        .unwrap_or_else(|err| panic!("parse failed: {err}"));

        let html = dom.document.children.borrow()[0].clone();
        let head = html.children.borrow()[0].clone();
        let template = head.children.borrow()[0].clone();
        let children = template.children.borrow();
        assert_eq!(children.len(), 2);

        let parent = children[0].parent.take();
        let upgraded = parent.as_ref().and_then(|weak| weak.upgrade());
        children[0].parent.set(parent);
        assert!(upgraded.is_some_and(|p| Rc::ptr_eq(&p, &template)));

        let nested = children[1].clone();
        assert_eq!(nested.children.borrow().len(), 1);
        if let NodeData::Element {
            template_contents, ..
        } = &template.data
        {
            assert!(template_contents.borrow().is_none());
        }
    }

    #[test]
    fn strict_parse_accepts_clean_document() {
        let content = "<!DOCTYPE html><html><head><title>t</title></head><body></body></html>";
        assert!(parse_dom(content, &ParseOptions::html().with_strict(true)).is_ok());
    }
}
