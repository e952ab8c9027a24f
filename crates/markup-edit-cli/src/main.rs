use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};
use markup_config::{Config, LoadOptions};
use markup_edit_core::{
    apply_edit, EditError, EditOptions, EditOutcome, EditRequest, ExitCode, Operation,
    PayloadSource, Selector,
};
use markup_query::{Document, Format, ParseOptions};
use tracing::debug;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Tag- and class-targeted HTML/XML editor", long_about = None)]
struct Cli {
    /// Path to the markup file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Operation to perform (set-text, add-attr, remove-attr)
    #[arg(value_name = "OPERATION")]
    operation: OperationArg,

    /// Tag name of the elements to edit (a class token with --class)
    #[arg(value_name = "TARGET")]
    target: String,

    /// Attribute name for add-attr / remove-attr
    #[arg(value_name = "NAME")]
    name: Option<String>,

    /// Attribute value for add-attr
    #[arg(value_name = "VALUE", allow_hyphen_values = true)]
    value: Option<String>,

    /// Treat TARGET as a class token instead of a tag name
    #[arg(long = "class")]
    class: bool,

    /// Read the set-text payload from a file (use '-' for stdin)
    #[arg(long = "with", value_name = "PATH", allow_hyphen_values = true)]
    with: Option<PathBuf>,

    /// Inline set-text payload with escape sequences (\\n, \\t, \\r, \\\\ , \\")
    #[arg(long = "with-string", value_name = "TEXT", allow_hyphen_values = true)]
    with_string: Option<String>,

    /// Maximum number of matching elements allowed
    #[arg(long = "max-matches", value_name = "N")]
    max_matches: Option<usize>,

    /// Print the diff without writing changes
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Force creation of a .bak copy (default unless the config disables it)
    #[arg(long = "backup")]
    backup: bool,

    /// Disable backup creation
    #[arg(long = "no-backup", conflicts_with = "backup")]
    no_backup: bool,

    /// Parse format, overriding the config file
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Fail when the parser had to repair the document
    #[arg(long)]
    strict: bool,

    /// Configuration file to use instead of the discovered ones
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress informational output (diffs, success messages)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Debug, ValueEnum)]
enum OperationArg {
    SetText,
    AddAttr,
    RemoveAttr,
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

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(exit) | Err(exit) => std::process::ExitCode::from(exit as u8),
    }
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

fn run(cli: Cli) -> Result<ExitCode, ExitCode> {
    let config = load_config(&cli)?;
    let options = build_options(&cli, &config)?;
    let operation = build_operation(&cli)?;

    let selector = if cli.class {
        Selector::Class(cli.target.clone())
    } else {
        Selector::Tag(cli.target.clone())
    };

    debug!(
        file = %cli.file.display(),
        operation = %cli.operation,
        selector = %selector,
        dry_run = options.dry_run,
        "running edit"
    );

    let parse = options.parse.clone();
    let request = EditRequest {
        path: cli.file.clone(),
        selector,
        options,
        operation,
    };

    match apply_edit(request) {
        Ok(outcome) => {
            handle_success(&cli, &outcome);
            Ok(outcome.exit_code)
        }
        Err(err) => {
            let exit = err.exit_code();
            handle_error(&cli, &parse, &err);
            Err(exit)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, ExitCode> {
    let mut load = LoadOptions::default();
    if let Some(path) = &cli.config {
        load = load.with_override_path(path);
    }
    Config::load(load).map_err(|err| {
        eprintln!("{err}");
        ExitCode::InvalidArguments
    })
}

fn build_options(cli: &Cli, config: &Config) -> Result<EditOptions, ExitCode> {
    if cli.max_matches == Some(0) {
        eprintln!("--max-matches must be greater than 0");
        return Err(ExitCode::InvalidArguments);
    }

    let backup = match (cli.backup, cli.no_backup) {
        (_, true) => false,
        (true, false) => true,
        (false, false) => config.edit.backup,
    };

    let mut parse = config.parse_options();
    if let Some(format) = cli.format {
        parse = parse.with_format(format.into());
    }
    if cli.strict {
        parse = parse.with_strict(true);
    }

    Ok(EditOptions {
        max_matches: cli.max_matches.or(config.edit.max_matches),
        dry_run: cli.dry_run,
        backup,
        parse,
    })
}

fn build_operation(cli: &Cli) -> Result<Operation, ExitCode> {
    match cli.operation {
        OperationArg::SetText => {
            if cli.name.is_some() {
                eprintln!("'set-text' takes its text from --with or --with-string");
                return Err(ExitCode::InvalidArguments);
            }
            Ok(Operation::SetText(require_payload(cli)?))
        }
        OperationArg::AddAttr => {
            ensure_no_payload(cli)?;
            let (Some(name), Some(value)) = (&cli.name, &cli.value) else {
                eprintln!("'add-attr' requires NAME and VALUE");
                return Err(ExitCode::InvalidArguments);
            };
            Ok(Operation::AddAttr {
                name: name.clone(),
                value: value.clone(),
            })
        }
        OperationArg::RemoveAttr => {
            ensure_no_payload(cli)?;
            let Some(name) = &cli.name else {
                eprintln!("'remove-attr' requires NAME");
                return Err(ExitCode::InvalidArguments);
            };
            if cli.value.is_some() {
                eprintln!("'remove-attr' does not take a VALUE");
                return Err(ExitCode::InvalidArguments);
            }
            Ok(Operation::RemoveAttr { name: name.clone() })
        }
    }
}

fn ensure_no_payload(cli: &Cli) -> Result<(), ExitCode> {
    if cli.with.is_some() || cli.with_string.is_some() {
        eprintln!(
            "--with / --with-string cannot be used with '{}'",
            cli.operation
        );
        return Err(ExitCode::InvalidArguments);
    }
    Ok(())
}

fn require_payload(cli: &Cli) -> Result<PayloadSource, ExitCode> {
    match (&cli.with, &cli.with_string) {
        (Some(_), Some(_)) => {
            eprintln!("--with and --with-string cannot be used together");
            Err(ExitCode::InvalidArguments)
        }
        (Some(path), None) => {
            if path == Path::new("-") {
                Ok(PayloadSource::Stdin)
            } else {
                Ok(PayloadSource::File(path.clone()))
            }
        }
        (None, Some(text)) => Ok(PayloadSource::Inline(text.clone())),
        (None, None) => {
            eprintln!(
                "Operation '{}' requires --with or --with-string",
                cli.operation
            );
            Err(ExitCode::InvalidArguments)
        }
    }
}

fn handle_success(cli: &Cli, outcome: &EditOutcome) {
    if cli.quiet {
        return;
    }

    if cli.dry_run {
        match &outcome.diff {
            Some(diff) if outcome.changed => {
                print!("{diff}");
                io::stdout().flush().ok();
            }
            _ => println!("No changes (dry run)"),
        }
        return;
    }

    if outcome.changed {
        if let Some(diff) = &outcome.diff {
            print!("{diff}");
        }
        println!(
            "Updated {} ({} element(s))",
            cli.file.display(),
            outcome.matched
        );
    } else {
        println!("No changes applied; {} element(s) already up to date.", outcome.matched);
    }
}

fn handle_error(cli: &Cli, parse: &ParseOptions, err: &EditError) {
    match err {
        EditError::NotFound => {
            let kind = if cli.class { "class" } else { "tag" };
            eprintln!("No elements found with {kind} '{}'.", cli.target);
            if !cli.class {
                if let Ok(tags) = collect_tags(&cli.file, parse) {
                    if !tags.is_empty() {
                        eprintln!("Tags in document: {}", tags.join(", "));
                    }
                }
            }
        }
        EditError::TooManyMatches { max, actual } => {
            eprintln!(
                "Selector matched {actual} elements, exceeds limit {max}. Raise --max-matches to proceed."
            );
        }
        EditError::InvalidArguments(message)
        | EditError::InvalidContent(message)
        | EditError::Validation(message) => {
            eprintln!("{message}");
        }
        EditError::Io(io_err) => {
            eprintln!("I/O error: {io_err}");
        }
        EditError::Load(load_err) => {
            eprintln!("Failed to load {}: {load_err}", cli.file.display());
        }
    }
}

/// Distinct element names in document order, for the not-found hint.
fn collect_tags(path: &Path, parse: &ParseOptions) -> Result<Vec<String>, markup_query::LoadError> {
    let document = Document::parse_file(path, parse)?;
    let mut tags: Vec<String> = Vec::new();
    for node in document.find(|node| node.is_element()) {
        if let Some(tag) = node.tag_name() {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    Ok(tags)
}

impl std::fmt::Display for OperationArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OperationArg::SetText => "set-text",
            OperationArg::AddAttr => "add-attr",
            OperationArg::RemoveAttr => "remove-attr",
        })
    }
}
