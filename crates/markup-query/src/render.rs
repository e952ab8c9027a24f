use html5ever::serialize::{SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, NodeData, SerializableHandle};

use crate::node::Node;
use crate::parse::Format;

pub(crate) fn serialize(handle: &Handle, format: Format, scope: TraversalScope) -> String {
    let mut output = Vec::new();
    let serializable = SerializableHandle::from(handle.clone());

    let written = if format.is_strict_xml() {
        let opts = xml5ever::serialize::SerializeOpts {
            traversal_scope: scope,
        };
        xml5ever::serialize::serialize(&mut output, &serializable, opts)
    } else {
        let opts = SerializeOpts {
            traversal_scope: scope,
            ..Default::default()
        };
        html5ever::serialize(&mut output, &serializable, opts)
    };
    written.expect("serializing into memory never fails");

    String::from_utf8(output).expect("serializer output is valid utf-8")
}

impl Node {
    /// Markup for this node including itself (its children only, for the
    /// document node).
    pub fn render(&self) -> String {
        let scope = match self.handle().data {
            NodeData::Document => TraversalScope::ChildrenOnly(None),
            _ => TraversalScope::IncludeNode,
        };
        serialize(self.handle(), self.format(), scope)
    }

    /// Markup for the children of this node.
    pub fn render_inner(&self) -> String {
        serialize(
            self.handle(),
            self.format(),
            TraversalScope::ChildrenOnly(None),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{Document, Format, ParseOptions};

    #[test]
    fn render_inner_omits_the_element_itself() {
        let doc = Document::load_html(r#"<div id="d"><p>a</p>b</div>"#).unwrap();
        let div = doc.find_by_tag("div").remove(0);
        assert_eq!(div.render(), r#"<div id="d"><p>a</p>b</div>"#);
        assert_eq!(div.render_inner(), "<p>a</p>b");
    }

    #[test]
    fn document_node_renders_like_the_document() {
        let options = ParseOptions::default().with_format(Format::StrictXml);
        let doc = Document::parse("<root><item>a</item></root>", &options).unwrap();
        assert_eq!(doc.root().render(), doc.render());
        assert_eq!(
            doc.find_by_tag("root")[0].render_inner(),
            "<item>a</item>"
        );
    }
}
