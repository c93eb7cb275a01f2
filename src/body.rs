//! `--data` argument → request body bytes

use std::io::Read;

use crate::error::DispatchError;

/// Load a request body.
///
/// - `@-` reads standard input
/// - `@path` reads a file
/// - anything else is sent as-is
///
/// An empty string means no body.
pub fn load_body(data: &str) -> Result<Option<Vec<u8>>, DispatchError> {
    load_body_from(data, std::io::stdin().lock())
}

/// Same as [`load_body`] with an explicit stdin source.
pub fn load_body_from(data: &str, mut stdin: impl Read) -> Result<Option<Vec<u8>>, DispatchError> {
    if data.is_empty() {
        return Ok(None);
    }

    match data.strip_prefix('@') {
        Some("-") => {
            let mut buf = Vec::new();
            stdin
                .read_to_end(&mut buf)
                .map_err(DispatchError::BodyStdinRead)?;
            Ok(Some(buf))
        }
        Some(path) => std::fs::read(path)
            .map(Some)
            .map_err(|source| DispatchError::BodyFileRead {
                path: path.to_string(),
                source,
            }),
        None => Ok(Some(data.as_bytes().to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_body_empty_is_none() {
        assert!(load_body_from("", std::io::empty()).unwrap().is_none());
    }

    #[test]
    fn load_body_literal_is_passed_through() {
        let input = r#"{"name": "test", "value": 123}"#;
        let body = load_body_from(input, std::io::empty()).unwrap().unwrap();
        assert_eq!(body, input.as_bytes());

        let text = load_body_from("plain text content", std::io::empty())
            .unwrap()
            .unwrap();
        assert_eq!(text, b"plain text content");
    }

    #[test]
    fn load_body_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(&path, r#"{"key": "value"}"#).unwrap();

        let body = load_body_from(&format!("@{}", path.display()), std::io::empty())
            .unwrap()
            .unwrap();
        assert_eq!(body, br#"{"key": "value"}"#);
    }

    #[test]
    fn load_body_missing_file_names_path() {
        let err = load_body_from("@/nonexistent/file.json", std::io::empty()).unwrap_err();
        assert!(
            err.to_string().contains("/nonexistent/file.json"),
            "got: {err}"
        );
    }

    #[test]
    fn load_body_reads_stdin() {
        let stdin = std::io::Cursor::new(b"{\"from\":\"stdin\"}".to_vec());
        let body = load_body_from("@-", stdin).unwrap().unwrap();
        assert_eq!(body, b"{\"from\":\"stdin\"}");
    }
}
