//! Server-sent events decoding
//!
//! The body is read line by line. Accumulated `data:` lines form one event,
//! which is rendered through [`crate::output::render_body`] when a blank line
//! (or end of stream) closes it.

use std::io::{BufRead, Read, Write};

use crate::error::DispatchError;
use crate::output::render_body;

/// Upper bound on the accumulated data of a single event (10 MiB).
pub const MAX_EVENT_SIZE: usize = 10 * 1024 * 1024;

/// `true` when a `Content-Type` value announces an event stream.
pub fn is_event_stream(content_type: &str) -> bool {
    content_type.contains("text/event-stream")
}

/// Event-stream decoder.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct SseDecoder {
    pub max_event_size: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self {
            max_event_size: MAX_EVENT_SIZE,
        }
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_event_size(mut self, limit: usize) -> Self {
        self.max_event_size = limit;
        self
    }

    /// Decode `reader` until end of stream, rendering every event to `out`.
    ///
    /// Returns the number of events rendered.
    pub fn decode<R: BufRead, W: Write>(&self, mut reader: R, out: &mut W) -> Result<usize, DispatchError> {
        let mut data = String::new();
        let mut rendered = 0;
        let mut raw = Vec::new();

        while self.read_line(&mut reader, &mut raw)? {
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if flush(&mut data, out)? {
                    rendered += 1;
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            if let Some(value) = line.strip_prefix("data:") {
                let value = value.trim();
                if data.len() + value.len() + 1 > self.max_event_size {
                    return Err(DispatchError::SseEventTooLarge {
                        limit: self.max_event_size,
                    });
                }
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value);
                continue;
            }

            // event:, id: and retry: carry no routing here; unknown fields are ignored too.
            tracing::trace!(field = line, "skipping SSE field");
        }

        if flush(&mut data, out)? {
            rendered += 1;
        }
        Ok(rendered)
    }

    /// Read one line into `buf`, refusing lines longer than the event cap.
    fn read_line<R: BufRead>(&self, reader: &mut R, buf: &mut Vec<u8>) -> Result<bool, DispatchError> {
        buf.clear();
        // "data:" prefix plus a CRLF terminator on top of the payload cap
        let limit = self.max_event_size.saturating_add(8) as u64;
        let n = reader
            .by_ref()
            .take(limit)
            .read_until(b'\n', buf)
            .map_err(DispatchError::StreamRead)?;

        if n as u64 == limit && buf.last() != Some(&b'\n') {
            // An unterminated line filling the window is complete only at EOF
            let at_eof = reader.fill_buf().map_err(DispatchError::StreamRead)?.is_empty();
            if !at_eof {
                return Err(DispatchError::SseEventTooLarge {
                    limit: self.max_event_size,
                });
            }
        }
        Ok(n > 0)
    }
}

/// Render and reset the accumulated event data. Returns whether anything was written.
fn flush(data: &mut String, out: &mut impl Write) -> Result<bool, DispatchError> {
    let payload = data.trim();
    let written = !payload.is_empty();
    if written {
        render_body(payload.as_bytes(), out)?;
    }
    data.clear();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> (usize, String) {
        let mut out = Vec::new();
        let count = SseDecoder::new().decode(input.as_bytes(), &mut out).unwrap();
        (count, String::from_utf8(out).unwrap())
    }

    // -- is_event_stream --

    #[test]
    fn is_event_stream_matches_content_type() {
        assert!(is_event_stream("text/event-stream"));
        assert!(is_event_stream("text/event-stream; charset=utf-8"));
        assert!(!is_event_stream("application/json"));
        assert!(!is_event_stream(""));
    }

    // -- decode --

    #[test]
    fn decode_two_json_events() {
        let (count, out) = decode("data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(count, 2);
        assert_eq!(out, "{\n  \"a\": 1\n}\n{\n  \"b\": 2\n}\n");
    }

    #[test]
    fn decode_joins_multiline_data() {
        let (count, out) = decode("data: first\ndata: second\n\n");
        assert_eq!(count, 1);
        assert_eq!(out, "first\nsecond\n");
    }

    #[test]
    fn decode_joined_lines_are_classified_as_json() {
        let (_, out) = decode("data: {\"a\":\ndata: 1}\n\n");
        assert_eq!(out, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn decode_skips_comments_and_other_fields() {
        let input = ": keep-alive\nevent: update\nid: 7\nretry: 1000\ndata: hello\n\n";
        let (count, out) = decode(input);
        assert_eq!(count, 1);
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn decode_handles_crlf_lines() {
        let (count, out) = decode("data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(count, 2);
        assert_eq!(out, "one\ntwo\n");
    }

    #[test]
    fn decode_flushes_trailing_event_at_end() {
        let (count, out) = decode("data: {\"done\":true}");
        assert_eq!(count, 1);
        assert_eq!(out, "{\n  \"done\": true\n}\n");
    }

    #[test]
    fn decode_ignores_blank_only_events() {
        let (count, out) = decode("\n\ndata:   \n\n");
        assert_eq!(count, 0);
        assert_eq!(out, "");
    }

    #[test]
    fn decode_oversized_event_is_fatal() {
        let decoder = SseDecoder::new().with_max_event_size(16);
        let mut out = Vec::new();
        let input = "data: 0123456789\ndata: 0123456789\n\n";
        let err = decoder.decode(input.as_bytes(), &mut out).unwrap_err();
        assert!(matches!(err, DispatchError::SseEventTooLarge { limit: 16 }));
        assert!(out.is_empty());
    }

    #[test]
    fn decode_oversized_line_is_fatal() {
        let decoder = SseDecoder::new().with_max_event_size(16);
        let line = format!("data: {}\n\n", "x".repeat(64));
        let mut out = Vec::new();
        let err = decoder.decode(line.as_bytes(), &mut out).unwrap_err();
        assert!(matches!(err, DispatchError::SseEventTooLarge { .. }));
    }

    #[test]
    fn decode_event_at_cap_is_accepted() {
        // 15 payload bytes + 1 reserved for the separator == 16
        let decoder = SseDecoder::new().with_max_event_size(16);
        let input = format!("data: {}\n\n", "y".repeat(15));
        let mut out = Vec::new();
        assert_eq!(decoder.decode(input.as_bytes(), &mut out).unwrap(), 1);
    }

    #[test]
    fn decode_unterminated_last_line_at_window_is_accepted() {
        // limit 16 gives a 24-byte line window; both tails are exactly 24 bytes
        let decoder = SseDecoder::new().with_max_event_size(16);

        let input = format!("data: hi\n\n: {}", "k".repeat(22));
        let mut out = Vec::new();
        assert_eq!(decoder.decode(input.as_bytes(), &mut out).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "hi\n");

        let input = format!("data: {}   ", "z".repeat(15));
        let mut out = Vec::new();
        assert_eq!(decoder.decode(input.as_bytes(), &mut out).unwrap(), 1);
    }

    #[test]
    fn decode_line_past_window_before_eof_is_fatal() {
        let decoder = SseDecoder::new().with_max_event_size(16);
        let input = format!(": {}x", "k".repeat(22));
        let mut out = Vec::new();
        assert!(matches!(
            decoder.decode(input.as_bytes(), &mut out),
            Err(DispatchError::SseEventTooLarge { limit: 16 })
        ));
    }
}
