//! Load HTML or XML into a tree, find elements by tag name or class, change
//! their text or attributes, and render the tree back to markup.
//!
//! ```ignore
//! let mut doc = Document::load_html(r#"<div class="box"><p>Hi</p></div>"#)?;
//! doc.add_attr("p", "style", "color: red");
//! assert_eq!(doc.find_by_class("box").len(), 1);
//! println!("{}", doc.render());
//! ```

mod document;
mod error;
mod mutate;
mod node;
mod parse;
mod query;
mod render;

pub use document::Document;
pub use error::{LoadError, LoadResult, ParseError};
pub use node::{contains_class, Node, NodeKind};
pub use parse::{Format, ParseOptions};
pub use query::Matcher;
