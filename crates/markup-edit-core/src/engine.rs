use std::fmt;
use std::path::PathBuf;

use markup_query::{Document, LoadError, Matcher, Node, ParseError, ParseOptions};
use tracing::{debug, info};

use crate::diff::{build_unified_diff, diff_stats};
use crate::error::{EditError, EditResult, ExitCode};
use crate::fs::write_atomic;
use crate::payload::PayloadSource;

#[derive(Debug, Clone)]
pub struct EditOptions {
    /// Refuse to edit when more elements than this match.
    pub max_matches: Option<usize>,
    pub dry_run: bool,
    pub backup: bool,
    pub parse: ParseOptions,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            max_matches: None,
            dry_run: false,
            backup: true,
            parse: ParseOptions::default(),
        }
    }
}

/// Which elements an edit applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Class(String),
}

impl Selector {
    pub fn select(&self, document: &Document) -> Vec<Node> {
        document.select(self.matcher())
    }

    fn matcher(&self) -> Matcher<'_> {
        match self {
            Selector::Tag(tag) => Matcher::Tag(tag),
            Selector::Class(class_name) => Matcher::Class(class_name),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag(tag) => write!(f, "<{tag}>"),
            Selector::Class(class_name) => write!(f, ".{class_name}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Operation {
    SetText(PayloadSource),
    AddAttr { name: String, value: String },
    RemoveAttr { name: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SetText(_) => "set-text",
            Operation::AddAttr { .. } => "add-attr",
            Operation::RemoveAttr { .. } => "remove-attr",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditRequest {
    pub path: PathBuf,
    pub selector: Selector,
    pub options: EditOptions,
    pub operation: Operation,
}

#[derive(Debug)]
pub struct EditOutcome {
    pub exit_code: ExitCode,
    /// Whether the operation altered the tree.
    pub changed: bool,
    pub matched: usize,
    /// Diff of the file on disk against `result`.
    pub diff: Option<String>,
    pub result: String,
}

/// Loads `request.path`, applies the operation to every selected element and
/// writes the re-rendered document back unless this is a dry run.
pub fn apply_edit(request: EditRequest) -> EditResult<EditOutcome> {
    let mutation = Mutation::resolve(&request.operation)?;

    let bytes = std::fs::read(&request.path)?;
    let original =
        String::from_utf8(bytes).map_err(|err| LoadError::Parse(ParseError::Encoding(err)))?;
    let document = Document::parse(&original, &request.options.parse)?;
    let baseline = document.render();

    let matches = request.selector.select(&document);
    debug!(
        selector = %request.selector,
        matched = matches.len(),
        operation = request.operation.name(),
        "selected elements"
    );

    if matches.is_empty() {
        return Err(EditError::NotFound);
    }

    if let Some(max) = request.options.max_matches {
        if matches.len() > max {
            return Err(EditError::TooManyMatches {
                max,
                actual: matches.len(),
            });
        }
    }

    for node in &matches {
        mutation.apply(node);
    }

    let result = document.render();
    let changed = result != baseline;
    if changed && request.options.parse.strict {
        validate_rendered(&result, &request.options.parse)?;
    }
    let diff = build_unified_diff(&original, &result, &request.path.to_string_lossy());
    if changed {
        let stats = diff_stats(&original, &result);
        debug!(
            inserted = stats.inserted,
            deleted = stats.deleted,
            "rendered edit"
        );
    }

    if changed && !request.options.dry_run {
        write_atomic(&request.path, &result, request.options.backup)?;
        info!(path = %request.path.display(), matched = matches.len(), "updated document");
    }

    Ok(EditOutcome {
        exit_code: ExitCode::Success,
        changed,
        matched: matches.len(),
        diff,
        result,
    })
}

/// An operation with its payload loaded and its arguments checked.
enum Mutation<'a> {
    SetText(String),
    SetAttr { name: &'a str, value: &'a str },
    RemoveAttr { name: &'a str },
}

impl<'a> Mutation<'a> {
    fn resolve(operation: &'a Operation) -> EditResult<Self> {
        match operation {
            Operation::SetText(source) => Ok(Mutation::SetText(source.load()?)),
            Operation::AddAttr { name, value } => {
                validate_attr_name(name)?;
                Ok(Mutation::SetAttr { name, value })
            }
            Operation::RemoveAttr { name } => {
                validate_attr_name(name)?;
                Ok(Mutation::RemoveAttr { name })
            }
        }
    }

    fn apply(&self, node: &Node) {
        match self {
            Mutation::SetText(text) => node.set_text(text),
            Mutation::SetAttr { name, value } => {
                node.set_attr(name, value);
            }
            Mutation::RemoveAttr { name } => {
                node.remove_attr(name);
            }
        }
    }
}

/// Re-parses the edited markup and fails when the parser has to repair it.
fn validate_rendered(rendered: &str, parse: &ParseOptions) -> EditResult<()> {
    match Document::parse(rendered, parse) {
        Ok(_) => Ok(()),
        Err(LoadError::Parse(ParseError::Rejected { errors })) => Err(EditError::Validation(
            format!("edited document no longer parses cleanly: {}", errors.join("; ")),
        )),
        Err(err) => Err(err.into()),
    }
}

fn validate_attr_name(name: &str) -> EditResult<()> {
    if name.is_empty() {
        return Err(EditError::InvalidArguments(
            "attribute name cannot be empty".to_string(),
        ));
    }

    if let Some(bad) = name
        .chars()
        .find(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '"' | '\'' | '>' | '/' | '='))
    {
        return Err(EditError::InvalidArguments(format!(
            "attribute name '{name}' contains invalid character {bad:?}"
        )));
    }

    Ok(())
}
