use std::io;

use markup_query::LoadError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    NotFound = 1,
    TooManyMatches = 2,
    InvalidArguments = 3,
    Io = 4,
    InvalidContent = 5,
    Validation = 6,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("no matching elements found")]
    NotFound,

    #[error("number of matches exceeds maximum allowed ({max})")]
    TooManyMatches { max: usize, actual: usize },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid content source: {0}")]
    InvalidContent(String),

    #[error("failed to load document: {0}")]
    Load(#[from] LoadError),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl EditError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::NotFound => ExitCode::NotFound,
            Self::TooManyMatches { .. } => ExitCode::TooManyMatches,
            Self::InvalidArguments(_) => ExitCode::InvalidArguments,
            Self::Io(_) | Self::Load(LoadError::Io { .. } | LoadError::Read(_)) => ExitCode::Io,
            Self::InvalidContent(_) | Self::Load(LoadError::Parse(_)) => ExitCode::InvalidContent,
            Self::Validation(_) => ExitCode::Validation,
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;
    use markup_query::ParseError;

    #[test]
    fn errors_map_to_documented_exit_codes() {
        let cases = [
            (EditError::NotFound, 1u8),
            (EditError::TooManyMatches { max: 1, actual: 2 }, 2),
            (EditError::InvalidArguments("x".into()), 3),
            (EditError::Io(io::Error::other("x")), 4),
            (EditError::InvalidContent("x".into()), 5),
            (EditError::Validation("x".into()), 6),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code() as u8, code, "{err}");
        }
        assert_eq!(ExitCode::Success as u8, 0);
    }

    #[test]
    fn load_errors_map_by_cause() {
        let parse = EditError::Load(LoadError::Parse(ParseError::Rejected {
            errors: vec!["bad".into()],
        }));
        assert_eq!(parse.exit_code(), ExitCode::InvalidContent);

        let io = EditError::Load(LoadError::Read(io::Error::other("gone")));
        assert_eq!(io.exit_code(), ExitCode::Io);
    }
}
