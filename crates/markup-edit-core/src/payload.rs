use std::io::{self, Read};
use std::path::PathBuf;

use crate::error::{EditError, EditResult};

/// Where replacement text for `set-text` comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    File(PathBuf),
    Stdin,
    Inline(String),
}

impl PayloadSource {
    /// Reads the payload. File and stdin payloads lose one trailing line
    /// break.
    pub fn load(&self) -> EditResult<String> {
        match self {
            PayloadSource::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|err| {
                    EditError::InvalidContent(format!(
                        "failed to read payload file '{}': {err}",
                        path.display()
                    ))
                })?;
                Ok(strip_trailing_newline(content))
            }
            PayloadSource::Stdin => {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer).map_err(|err| {
                    EditError::InvalidContent(format!("failed to read stdin payload: {err}"))
                })?;
                Ok(strip_trailing_newline(buffer))
            }
            PayloadSource::Inline(raw) => unescape_inline(raw),
        }
    }
}

fn strip_trailing_newline(mut content: String) -> String {
    if content.ends_with('\n') {
        content.pop();
        if content.ends_with('\r') {
            content.pop();
        }
    }
    content
}

/// Decodes `\n`, `\r`, `\t`, `\\` and `\"`; any other escape is an error.
fn unescape_inline(raw: &str) -> EditResult<String> {
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }

        let decoded = match chars.next() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('\\') => '\\',
            Some('"') => '"',
            Some(other) => {
                return Err(EditError::InvalidContent(format!(
                    "unsupported escape sequence: \\{other}"
                )))
            }
            None => {
                return Err(EditError::InvalidContent(
                    "unterminated escape sequence".to_string(),
                ))
            }
        };
        output.push(decoded);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_inline_escapes() {
        let text = unescape_inline(r#"Line one\nLine \"two\"\t\\"#).unwrap();
        assert_eq!(text, "Line one\nLine \"two\"\t\\");
    }

    #[test]
    fn rejects_unknown_and_dangling_escapes() {
        assert!(matches!(
            unescape_inline(r"bad\q"),
            Err(EditError::InvalidContent(_))
        ));
        assert!(matches!(
            unescape_inline("dangling\\"),
            Err(EditError::InvalidContent(_))
        ));
    }

    #[test]
    fn file_payload_drops_one_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.txt");
        std::fs::write(&path, "Hello\r\n\n").unwrap();

        let text = PayloadSource::File(path).load().unwrap();
        assert_eq!(text, "Hello\r\n");
    }

    #[test]
    fn missing_payload_file_is_invalid_content() {
        let err = PayloadSource::File(PathBuf::from("/definitely/not/here.txt"))
            .load()
            .unwrap_err();
        assert!(matches!(err, EditError::InvalidContent(_)));
    }
}
