use std::fs;
use std::path::{Path, PathBuf};

use markup_config::{Config, ConfigError, ConfigSourceKind, LoadOptions, CONFIG_FILE_NAME};
use markup_query::Format;
use tempfile::TempDir;

fn write_file(path: impl AsRef<Path>, contents: &str) {
    fs::write(path, contents).expect("write config");
}

fn canonical(path: impl AsRef<Path>) -> PathBuf {
    fs::canonicalize(path).expect("canonicalize path")
}

#[test]
fn loads_defaults_when_no_files_present() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let config = Config::load(LoadOptions::default().with_working_dir(working_dir.clone()))
        .expect("load defaults");

    assert_eq!(config.parse.format, Format::Html);
    assert!(!config.parse.strict);
    assert!(config.edit.backup);
    assert_eq!(config.edit.max_matches, None);
    assert_eq!(config.sources.working_directory, working_dir);
    assert_eq!(config.sources.layers.len(), 1);
    assert_eq!(config.sources.layers[0].kind, ConfigSourceKind::Default);
}

#[test]
fn local_config_overrides_defaults() {
    let temp = TempDir::new().expect("tempdir");
    write_file(
        temp.path().join(CONFIG_FILE_NAME),
        "[parse]\nformat = \"strict-xml\"\nstrict = true\n\n[edit]\nmax_matches = 3\n",
    );

    let config = Config::load(LoadOptions::default().with_working_dir(temp.path()))
        .expect("load local config");

    assert_eq!(config.parse.format, Format::StrictXml);
    assert!(config.parse.strict);
    assert!(config.edit.backup);
    assert_eq!(config.edit.max_matches, Some(3));
    assert_eq!(config.sources.layers.len(), 2);
    assert_eq!(config.sources.layers[1].kind, ConfigSourceKind::Local);

    let options = config.parse_options();
    assert_eq!(options.format, Format::StrictXml);
    assert!(options.strict);
}

#[test]
fn git_root_config_applies_below_local_config() {
    let temp = TempDir::new().expect("tempdir");
    let root = canonical(temp.path());
    fs::create_dir(root.join(".git")).unwrap();
    let nested = root.join("docs");
    fs::create_dir(&nested).unwrap();

    write_file(
        root.join(CONFIG_FILE_NAME),
        "[parse]\nformat = \"xml\"\n\n[edit]\nbackup = false\n",
    );
    write_file(nested.join(CONFIG_FILE_NAME), "[parse]\nformat = \"html\"\n");

    let config = Config::load(LoadOptions::default().with_working_dir(&nested))
        .expect("load layered config");

    assert_eq!(config.parse.format, Format::Html);
    assert!(!config.edit.backup);
    let kinds: Vec<ConfigSourceKind> = config.sources.layers.iter().map(|l| l.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ConfigSourceKind::Default,
            ConfigSourceKind::GitRoot,
            ConfigSourceKind::Local
        ]
    );
}

#[test]
fn override_path_wins_over_local_config() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path().join(CONFIG_FILE_NAME), "[parse]\nformat = \"xml\"\n");
    write_file(temp.path().join("custom.toml"), "[parse]\nformat = \"strict-xml\"\n");

    let config = Config::load(
        LoadOptions::default()
            .with_working_dir(temp.path())
            .with_override_path("custom.toml"),
    )
    .expect("load override");

    assert_eq!(config.parse.format, Format::StrictXml);
    assert_eq!(
        config.sources.layers.last().unwrap().kind,
        ConfigSourceKind::Override
    );
}

#[test]
fn missing_override_is_an_error() {
    let temp = TempDir::new().expect("tempdir");

    let err = Config::load(
        LoadOptions::default()
            .with_working_dir(temp.path())
            .with_override_path("nope.toml"),
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::OverrideNotFound { .. }));
}

#[test]
fn malformed_toml_reports_path() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path().join(CONFIG_FILE_NAME), "[parse\nformat = ");

    let err = Config::load(LoadOptions::default().with_working_dir(temp.path())).unwrap_err();

    match err {
        ConfigError::Parse { path, .. } => assert!(path.ends_with(CONFIG_FILE_NAME)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_format_fails_validation() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path().join(CONFIG_FILE_NAME), "[parse]\nformat = \"yaml\"\n");

    let err = Config::load(LoadOptions::default().with_working_dir(temp.path())).unwrap_err();

    match err {
        ConfigError::Validation(errors) => {
            assert_eq!(errors.iter().count(), 1);
            assert!(errors.to_string().contains("yaml"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
