use crate::node::Node;

/// The two built-in element predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Matcher<'a> {
    /// Element name equals the given tag exactly.
    Tag(&'a str),
    /// `class` attribute holds the given token.
    Class(&'a str),
}

impl Matcher<'_> {
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Matcher::Tag(tag) => node.has_tag(tag),
            Matcher::Class(class_name) => node.has_class(class_name),
        }
    }
}

/// Depth-first pre-order walk from `root`, collecting every node accepted by
/// `predicate` in document order.
pub(crate) fn collect<F>(root: &Node, mut predicate: F) -> Vec<Node>
where
    F: FnMut(&Node) -> bool,
{
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if predicate(&node) {
            found.push(node.clone());
        }
        // Reversed so the leftmost child is visited next.
        stack.extend(node.children().into_iter().rev());
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    #[test]
    fn walk_is_pre_order() {
        let doc = Document::load_html("<div id=a><p id=b><i id=c></i></p><p id=d></p></div>")
            .unwrap();
        let ids: Vec<String> = collect(&doc.root(), |node| node.has_attr("id"))
            .iter()
            .filter_map(|node| node.attr("id"))
            .collect();
        assert_eq!(ids, ["a", "b", "c", "d"]);
    }

    #[test]
    fn matcher_variants() {
        let doc = Document::load_html(r#"<span class="x y">1</span><em class="y">2</em>"#).unwrap();
        let span = doc.find_by_tag("span").remove(0);
        assert!(Matcher::Tag("span").matches(&span));
        assert!(!Matcher::Tag("SPAN").matches(&span));
        assert!(Matcher::Class("x").matches(&span));
        assert!(!Matcher::Class("z").matches(&span));
        assert_eq!(doc.select(Matcher::Class("y")).len(), 2);
    }
}
