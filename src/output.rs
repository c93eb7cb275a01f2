//! Response rendering
//!
//! JSON payloads are pretty-printed with two-space indentation; anything else
//! is written as-is.

use std::io::Write;

use crate::error::DispatchError;

/// Check the status and render a buffered response body.
///
/// A non-2xx status returns [`DispatchError::HttpStatus`] carrying the body
/// text, and nothing is written to `out`.
pub fn render_response(status: u16, body: &[u8], out: &mut impl Write) -> Result<(), DispatchError> {
    check_status(status, body)?;
    render_body(body, out)
}

/// Fail with [`DispatchError::HttpStatus`] unless `status` is 2xx.
pub fn check_status(status: u16, body: &[u8]) -> Result<(), DispatchError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    Err(DispatchError::HttpStatus {
        status,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

/// Write a payload followed by a newline. Empty payloads produce no output.
pub fn render_body(body: &[u8], out: &mut impl Write) -> Result<(), DispatchError> {
    if body.is_empty() {
        return Ok(());
    }

    let written = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => {
            // to_string_pretty on a Value cannot fail
            let pretty = serde_json::to_string_pretty(&value).unwrap_or_default();
            writeln!(out, "{pretty}")
        }
        Err(_) => out.write_all(body).and_then(|()| writeln!(out)),
    };
    written.map_err(DispatchError::Output)
}
