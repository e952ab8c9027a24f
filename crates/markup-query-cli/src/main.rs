use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use markup_config::{Config, LoadOptions};
use markup_query::{Document, Format, Node, ParseOptions};
use serde_json::json;
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the markup file ('-' reads stdin)
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Match elements by tag name (case-sensitive)
    #[arg(short, long, value_name = "TAG", required_unless_present = "class")]
    tag: Option<String>,

    /// Match elements whose class attribute holds this token
    #[arg(short, long, value_name = "CLASS", conflicts_with = "tag")]
    class: Option<String>,

    /// Print all matching elements (don't stop after the first)
    #[arg(short, long)]
    all: bool,

    /// How each match is printed
    #[arg(short, long, value_enum, default_value_t = Output::Markup)]
    output: Output,

    /// Parse format, overriding the config file
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Fail when the parser had to repair the document
    #[arg(long)]
    strict: bool,

    /// Configuration file to use instead of the discovered ones
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Markup,
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Html,
    Xml,
    StrictXml,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Html => Format::Html,
            FormatArg::Xml => Format::Xml,
            FormatArg::StrictXml => Format::StrictXml,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = parse_options(&cli)?;
    let document = load_document(&cli.path, &options)
        .with_context(|| format!("Unable to load document: {}", cli.path.display()))?;

    let (matches, label) = match (&cli.tag, &cli.class) {
        (_, Some(class_name)) => (document.find_by_class(class_name), format!(".{class_name}")),
        (Some(tag), None) => (document.find_by_tag(tag), format!("<{tag}>")),
        (None, None) => bail!("either --tag or --class is required"),
    };
    debug!(selector = %label, matched = matches.len(), "query finished");

    if matches.is_empty() {
        bail!("No elements found for {label}");
    }

    let selected = if cli.all { &matches[..] } else { &matches[..1] };
    print_matches(selected, cli.output)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();
}

fn parse_options(cli: &Cli) -> Result<ParseOptions> {
    let mut load = LoadOptions::default();
    if let Some(path) = &cli.config {
        load = load.with_override_path(path);
    }
    let config = Config::load(load).context("Failed to load configuration")?;

    let mut options = config.parse_options();
    if let Some(format) = cli.format {
        options = options.with_format(format.into());
    }
    if cli.strict {
        options = options.with_strict(true);
    }
    Ok(options)
}

fn load_document(path: &Path, options: &ParseOptions) -> Result<Document> {
    if path == Path::new("-") {
        let stdin = io::stdin();
        Ok(Document::parse_reader(&mut stdin.lock(), options)?)
    } else {
        Ok(Document::parse_file(path, options)?)
    }
}

fn print_matches(nodes: &[Node], output: Output) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for node in nodes {
        let line = match output {
            Output::Markup => node.render(),
            Output::Text => node.inner_text(),
            Output::Json => describe(node).to_string(),
        };
        match writeln!(handle, "{line}") {
            Ok(_) => {}
            Err(err) if should_ignore_pipe_error(&err) => return Ok(()),
            Err(err) => return Err(err).context("Failed to print match"),
        }
    }

    match handle.flush() {
        Ok(_) => Ok(()),
        Err(err) if should_ignore_pipe_error(&err) => Ok(()),
        Err(err) => Err(err).context("Failed to flush stdout"),
    }
}

fn describe(node: &Node) -> serde_json::Value {
    let attributes: Vec<_> = node
        .attributes()
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    json!({
        "tag": node.tag_name(),
        "attributes": attributes,
        "text": node.inner_text(),
        "markup": node.render(),
    })
}

fn should_ignore_pipe_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::WouldBlock
    )
}
