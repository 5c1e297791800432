//! Newline-delimited JSON framer
//!
//! The chunked-HTTP transport delivers the feed as one JSON object per line,
//! split across arbitrary chunk boundaries. The framer reassembles complete
//! lines and leaves decoding to the caller.

use bytes::Bytes;
use tracing::warn;

/// Framer state for a newline-delimited stream
#[derive(Debug, Default)]
pub struct NdjsonFramer {
    /// Buffer for the trailing incomplete line
    buffer: Vec<u8>,
}

impl NdjsonFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and extract any complete lines
    ///
    /// Blank lines (keepalives) are skipped; a line that is not valid UTF-8
    /// is dropped with a warning, matching the malformed-frame policy.
    pub fn feed(&mut self, bytes: Bytes) -> Vec<String> {
        let mut lines = Vec::new();

        self.buffer.extend_from_slice(&bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<_>>();
            let line = &line[..line.len() - 1]; // Remove trailing \n

            // Handle \r\n line endings
            let line = if line.last() == Some(&b'\r') {
                &line[..line.len() - 1]
            } else {
                line
            };

            if line.is_empty() {
                continue;
            }

            match std::str::from_utf8(line) {
                Ok(text) => lines.push(text.to_string()),
                Err(_) => warn!("Dropping non-UTF-8 feed line"),
            }
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_line() {
        let mut framer = NdjsonFramer::new();
        let lines = framer.feed(Bytes::from_static(b"{\"type\":\"info\",\"payload\":\"up\"}\n"));
        assert_eq!(lines, vec![r#"{"type":"info","payload":"up"}"#]);
    }

    #[test]
    fn test_multiple_lines_one_chunk() {
        let mut framer = NdjsonFramer::new();
        let lines = framer.feed(Bytes::from_static(b"{\"a\":1}\n{\"b\":2}\n"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut framer = NdjsonFramer::new();

        // First chunk - incomplete
        let lines = framer.feed(Bytes::from_static(b"{\"type\":\"inf"));
        assert!(lines.is_empty());

        // Second chunk - completes the line and starts another
        let lines = framer.feed(Bytes::from_static(b"o\"}\n{\"type\":"));
        assert_eq!(lines, vec![r#"{"type":"info"}"#]);

        let lines = framer.feed(Bytes::from_static(b"\"error\"}\n"));
        assert_eq!(lines, vec![r#"{"type":"error"}"#]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let mut framer = NdjsonFramer::new();
        let lines = framer.feed(Bytes::from_static(b"{\"a\":1}\r\n\r\n{\"b\":2}\n"));
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }
}
