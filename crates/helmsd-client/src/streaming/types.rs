//! Types for feed streaming

use std::sync::Arc;

use thiserror::Error;
use url::Url;

/// Default ring-buffer capacity used by the stream singletons
pub const DEFAULT_BUFFER_LENGTH: usize = 200;

/// Configuration of one feed connection; immutable once a reader exists
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// HTTP(S) feed URL; rewritten to ws(s) for the WebSocket transport
    pub url: Url,
    /// Ring-buffer capacity in records; must be positive
    pub buffer_length: usize,
    /// Bearer secret, if the daemon requires one
    pub token: Option<String>,
    /// Attempt the WebSocket transport before chunked HTTP
    pub prefer_websocket: bool,
}

impl StreamConfig {
    /// Config with the default buffer length and WebSocket preference
    pub fn new(url: Url, token: Option<String>) -> Self {
        Self {
            url,
            buffer_length: DEFAULT_BUFFER_LENGTH,
            token,
            prefer_websocket: true,
        }
    }
}

/// One decoded record plus its reader-assigned sequence number
///
/// Sequence numbers start at 1 and increase strictly monotonically for the
/// reader's whole lifetime, across reconnects. A subscriber observing a
/// delta larger than 1 between consecutive records has missed that many
/// evicted records.
#[derive(Debug)]
pub struct StreamRecord<T> {
    pub seq: u64,
    pub payload: Arc<T>,
}

// Manual impl: T itself need not be Clone, the payload is shared.
impl<T> Clone for StreamRecord<T> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            payload: Arc::clone(&self.payload),
        }
    }
}

/// Lifecycle of a [`StreamReader`](super::StreamReader)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// First connection attempt in progress
    Connecting,
    /// Connected; records flowing
    Streaming,
    /// Transport lost; reconnecting
    Retrying,
    /// Explicitly closed; terminal
    Closed,
}

/// Errors surfaced to stream consumers and constructors
///
/// Transport errors during streaming are handled internally by reconnecting
/// and never reach subscribers; `Closed` is the only terminal signal a
/// cursor observes.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Connection-level failure (reported by the read loop, logged)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The feed URL could not be built for the selected transport
    #[error("Invalid stream URL: {0}")]
    Url(String),

    /// The reader was closed
    #[error("Stream closed")]
    Closed,
}

/// Result type for streaming operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;
