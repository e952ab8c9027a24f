use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),

    #[error("parser rejected input: {}", .errors.join("; "))]
    Rejected { errors: Vec<String> },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to read input stream: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type LoadResult<T> = Result<T, LoadError>;
