//! Configuration loader for the markup-query tools.
//!
//! Settings are resolved by precedence:
//! override flag → working directory → git root → built-in defaults.
//! Each layer may set any subset of keys; later layers win key by key.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use markup_query::{Format, ParseOptions};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = ".markup-query.toml";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub parse: ParseSettings,
    pub edit: EditSettings,
    pub sources: ConfigSources,
}

/// How documents are parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseSettings {
    pub format: Format,
    pub strict: bool,
}

/// Defaults for the edit engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditSettings {
    pub backup: bool,
    /// `None` means no limit.
    pub max_matches: Option<usize>,
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::builtin();
        let mut merged = PartialConfig::defaults(&default_source);
        let mut layers = vec![default_source];

        let local_config_path = working_dir.join(CONFIG_FILE_NAME);
        let git_config_path = find_git_root(&working_dir).map(|root| root.join(CONFIG_FILE_NAME));

        if let Some(path) = git_config_path {
            if path.exists() && Some(&path) != override_path.as_ref() && path != local_config_path
            {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(&path, source.clone())?);
                layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            layers.push(source);
        }

        let (parse, edit) = merged.finalize().map_err(ConfigError::Validation)?;
        debug!(layers = layers.len(), format = %parse.format, "resolved configuration");

        Ok(Config {
            parse,
            edit,
            sources: ConfigSources {
                working_directory: working_dir,
                layers,
            },
        })
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::default()
            .with_format(self.parse.format)
            .with_strict(self.parse.strict)
    }
}

/// Where the resolved configuration came from.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn builtin() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {}: {source}", .attempted.display())]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {} not found", .path.display())]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

/// Validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: ConfigSource,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.source.describe())
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.into(),
        source: err,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|err| ConfigError::Parse {
        path: path.into(),
        source: err,
    })?;
    debug!(path = %path.display(), "loaded config layer");
    Ok(raw.into_partial(source))
}

/// A value together with the layer that set it.
#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    format: Option<Located<String>>,
    strict: Option<bool>,
    backup: Option<bool>,
    max_matches: Option<usize>,
}

impl PartialConfig {
    fn defaults(source: &ConfigSource) -> Self {
        PartialConfig {
            format: Some(Located::new(Format::Html.to_string(), source.clone())),
            strict: Some(false),
            backup: Some(true),
            max_matches: Some(0),
        }
    }

    fn merge(&mut self, other: PartialConfig) {
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
        if other.backup.is_some() {
            self.backup = other.backup;
        }
        if other.max_matches.is_some() {
            self.max_matches = other.max_matches;
        }
    }

    fn finalize(self) -> Result<(ParseSettings, EditSettings), ConfigValidationErrors> {
        let mut errors = Vec::new();

        let format_loc = self
            .format
            .unwrap_or_else(|| Located::new(Format::Html.to_string(), ConfigSource::builtin()));
        let format = match format_loc.value.parse::<Format>() {
            Ok(format) => format,
            Err(message) => {
                errors.push(ConfigValidationError {
                    source: format_loc.source.clone(),
                    message: format!("parse.format: {message}"),
                });
                Format::Html
            }
        };

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        let max_matches = self.max_matches.unwrap_or(0);

        Ok((
            ParseSettings {
                format,
                strict: self.strict.unwrap_or(false),
            },
            EditSettings {
                backup: self.backup.unwrap_or(true),
                max_matches: (max_matches > 0).then_some(max_matches),
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    parse: Option<RawParse>,
    #[serde(default)]
    edit: Option<RawEdit>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParse {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    strict: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEdit {
    #[serde(default)]
    backup: Option<bool>,
    #[serde(default)]
    max_matches: Option<usize>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        let mut partial = PartialConfig::default();
        if let Some(parse) = self.parse {
            partial.format = parse.format.map(|v| Located::new(v, source));
            partial.strict = parse.strict;
        }
        if let Some(edit) = self.edit {
            partial.backup = edit.backup;
            partial.max_matches = edit.max_matches;
        }
        partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_source() -> ConfigSource {
        ConfigSource::for_file(ConfigSourceKind::Local, PathBuf::from("/tmp/x.toml"))
    }

    #[test]
    fn later_layers_override_key_by_key() {
        let mut merged = PartialConfig::defaults(&ConfigSource::builtin());
        let raw: RawConfig = toml::from_str("[edit]\nbackup = false\n").unwrap();
        merged.merge(raw.into_partial(file_source()));

        let (parse, edit) = merged.finalize().unwrap();
        assert_eq!(parse.format, Format::Html);
        assert!(!edit.backup);
        assert_eq!(edit.max_matches, None);
    }

    #[test]
    fn invalid_format_names_its_source() {
        let raw: RawConfig = toml::from_str("[parse]\nformat = \"json\"\n").unwrap();
        let errors = raw.into_partial(file_source()).finalize().unwrap_err();
        let message = errors.to_string();
        assert!(message.contains("parse.format"));
        assert!(message.contains("/tmp/x.toml"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<RawConfig>("[parse]\nformats = \"xml\"\n").is_err());
    }
}
