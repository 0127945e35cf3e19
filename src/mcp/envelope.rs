//! Response envelope decoding for event-stream framed bodies.
//!
//! Servers answer with a line-oriented stream. Lines starting with `data: `
//! carry a JSON document; everything else (comments, event names, keep-alive
//! pings, blank separators) is framing noise. The first data line that decodes
//! as a JSON-RPC response for the expected request id wins, and the rest of the
//! stream is never read.

use futures::{Stream, StreamExt};

use super::error::FramingError;
use super::protocol::McpResponse;

/// Prefix marking a data line.
pub const DATA_PREFIX: &str = "data: ";

/// Upper bound on a single line, in bytes.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental line decoder.
///
/// Feed body chunks with [`push`](Self::push) and call
/// [`finish`](Self::finish) once the stream ends.
#[derive(Debug)]
pub struct EnvelopeDecoder {
    buffer: Vec<u8>,
    expected_id: Option<u64>,
    limit: usize,
}

impl EnvelopeDecoder {
    /// Create a decoder that accepts responses whose id is `expected_id`.
    ///
    /// Responses with a `null` id are always accepted; `None` accepts any id.
    #[must_use]
    pub const fn new(expected_id: Option<u64>) -> Self {
        Self {
            buffer: Vec::new(),
            expected_id,
            limit: MAX_LINE_BYTES,
        }
    }

    /// Override the line size bound.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Consume a chunk, returning the response as soon as a complete line
    /// yields one.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<McpResponse>, FramingError> {
        self.buffer.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(pos) = self.buffer[consumed..].iter().position(|&b| b == b'\n') {
            let line = &self.buffer[consumed..consumed + pos];
            if line.len() > self.limit {
                return Err(FramingError::LineTooLong { limit: self.limit });
            }
            if let Some(response) = decode_line(line, self.expected_id) {
                return Ok(Some(response));
            }
            consumed += pos + 1;
        }
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.limit {
            return Err(FramingError::LineTooLong { limit: self.limit });
        }
        Ok(None)
    }

    /// Signal end of stream. An unterminated final line is still considered.
    pub fn finish(self) -> Result<McpResponse, FramingError> {
        if !self.buffer.is_empty() {
            if let Some(response) = decode_line(&self.buffer, self.expected_id) {
                return Ok(response);
            }
        }
        Err(FramingError::NoResponse { source: None })
    }
}

/// Decode a whole body held in memory.
pub fn decode_body(body: &[u8], expected_id: Option<u64>) -> Result<McpResponse, FramingError> {
    let mut decoder = EnvelopeDecoder::new(expected_id);
    if let Some(response) = decoder.push(body)? {
        return Ok(response);
    }
    decoder.finish()
}

/// Read a byte stream until the first response envelope.
///
/// A stream error before any envelope is found becomes
/// [`FramingError::NoResponse`] carrying the underlying error.
pub async fn read_envelope<S, B, E>(
    stream: S,
    expected_id: Option<u64>,
) -> Result<McpResponse, FramingError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    futures::pin_mut!(stream);
    let mut decoder = EnvelopeDecoder::new(expected_id);

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                if let Some(response) = decoder.push(bytes.as_ref())? {
                    return Ok(response);
                }
            }
            Err(e) => {
                return Err(FramingError::NoResponse {
                    source: Some(e.into()),
                });
            }
        }
    }

    decoder.finish()
}

fn decode_line(line: &[u8], expected_id: Option<u64>) -> Option<McpResponse> {
    let line = std::str::from_utf8(line).ok()?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    let data = line.strip_prefix(DATA_PREFIX)?;

    let response = match serde_json::from_str::<McpResponse>(data) {
        Ok(response) => response,
        Err(e) => {
            tracing::trace!(error = %e, "skipping data line");
            return None;
        }
    };

    is_reply_to(&response, expected_id).then_some(response)
}

/// Whether `response` answers the request `expected_id`.
///
/// A `null` id matches any request, and so does an `expected_id` of `None`.
pub(crate) fn is_reply_to(response: &McpResponse, expected_id: Option<u64>) -> bool {
    match (expected_id, response.id) {
        (Some(want), Some(got)) if want != got => {
            tracing::debug!(want, got, "skipping response for another request");
            false
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{InitializeResult, Outcome, ServerInfo};

    const VALID: &str = r#"data: {"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;

    #[test]
    fn skips_any_number_of_garbage_lines() {
        let garbage = [
            ": keep-alive",
            "",
            "event: message",
            "data: not json",
            "data: {\"jsonrpc\":\"2.0\"",
            "id: 7",
            "data:{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":1}",
        ];
        for n in 0..=garbage.len() {
            let mut body = garbage[..n].join("\n");
            if n > 0 {
                body.push('\n');
            }
            body.push_str(VALID);
            body.push('\n');

            let response = decode_body(body.as_bytes(), Some(1)).unwrap();
            assert_eq!(response.into_raw().get(), r#"{"ok":true}"#, "n = {n}");
        }
    }

    #[test]
    fn returns_first_response_and_ignores_rest() {
        let body = format!(
            "{VALID}\ndata: {{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":\"second\"}}\n"
        );
        let response = decode_body(body.as_bytes(), Some(1)).unwrap();
        assert_eq!(response.into_raw().get(), r#"{"ok":true}"#);
    }

    #[test]
    fn empty_stream_is_a_framing_error() {
        let err = decode_body(b"", Some(1)).unwrap_err();
        assert!(matches!(err, FramingError::NoResponse { source: None }));
    }

    #[test]
    fn stream_without_data_lines_is_a_framing_error() {
        let body = b": ping\n\nevent: message\ndata: [DONE]\n\n";
        let err = decode_body(body, Some(1)).unwrap_err();
        assert!(matches!(err, FramingError::NoResponse { .. }));
    }

    #[test]
    fn accepts_crlf_and_unterminated_last_line() {
        let body = format!("event: message\r\n{VALID}\r\n");
        assert!(decode_body(body.as_bytes(), Some(1)).is_ok());

        assert!(decode_body(VALID.as_bytes(), Some(1)).is_ok());
    }

    #[test]
    fn skips_notifications_and_foreign_ids() {
        let body = concat!(
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":9,\"result\":\"other\"}\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":\"mine\"}\n",
        );
        let response = decode_body(body.as_bytes(), Some(2)).unwrap();
        assert_eq!(response.id, Some(2));
        assert_eq!(response.into_raw().get(), "\"mine\"");
    }

    #[test]
    fn accepts_null_id_error_replies() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32700,\"message\":\"parse error\"}}\n";
        let response = decode_body(body.as_bytes(), Some(3)).unwrap();
        assert!(matches!(response.outcome, Outcome::Failure { .. }));
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut decoder = EnvelopeDecoder::new(Some(1));
        let (head, tail) = VALID.split_at(17);
        assert!(decoder.push(b": ping\n").unwrap().is_none());
        assert!(decoder.push(head.as_bytes()).unwrap().is_none());
        assert!(decoder.push(tail.as_bytes()).unwrap().is_none());
        assert!(decoder.push(b"\n").unwrap().is_some());
    }

    #[test]
    fn oversized_line_fails_explicitly() {
        let mut decoder = EnvelopeDecoder::new(Some(1)).with_limit(64);
        let line = format!("data: {}\n", "x".repeat(100));
        let err = decoder.push(line.as_bytes()).unwrap_err();
        assert!(matches!(err, FramingError::LineTooLong { limit: 64 }));

        let mut decoder = EnvelopeDecoder::new(Some(1)).with_limit(64);
        let err = decoder.push("y".repeat(65).as_bytes()).unwrap_err();
        assert!(matches!(err, FramingError::LineTooLong { .. }));
    }

    #[test]
    fn default_limit_allows_large_payloads() {
        let text = "z".repeat(900 * 1024);
        let body = format!("data: {{\"jsonrpc\":\"2.0\",\"id\":3,\"result\":\"{text}\"}}\n");
        let response = decode_body(body.as_bytes(), Some(3)).unwrap();
        assert_eq!(response.into_raw().get().len(), text.len() + 2);
    }

    #[test]
    fn handshake_result_round_trips_through_framing() {
        let original = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            server_info: ServerInfo {
                name: "acme".to_string(),
                version: "1.0".to_string(),
            },
        };
        let envelope = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": original,
        });
        let body = format!("event: message\ndata: {envelope}\n\n");

        let response = decode_body(body.as_bytes(), Some(1)).unwrap();
        let raw = response.into_result().unwrap();
        let decoded: InitializeResult = serde_json::from_str(raw.get()).unwrap();
        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn stream_error_before_response_is_wrapped() {
        let chunks: Vec<Result<&[u8], std::io::Error>> = vec![
            Ok(&b": ping\n"[..]),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let err = read_envelope(futures::stream::iter(chunks), Some(1))
            .await
            .unwrap_err();
        let FramingError::NoResponse { source: Some(source) } = err else {
            panic!("expected wrapped source");
        };
        assert_eq!(source.to_string(), "reset");
    }

    #[tokio::test]
    async fn stream_stops_at_first_response() {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(format!("{VALID}\n").into_bytes()),
            Err(std::io::Error::other("never read")),
        ];
        let response = read_envelope(futures::stream::iter(chunks), Some(1))
            .await
            .unwrap();
        assert!(response.is_ok());
    }
}
