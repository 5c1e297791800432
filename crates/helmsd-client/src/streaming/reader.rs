//! Feed reader: one transport connection, many independent cursors
//!
//! [`StreamReader`] owns at most one live transport to a feed URL and fans
//! decoded records out through a bounded ring buffer. The read loop never
//! waits on consumer progress; slow cursors skip evicted records instead of
//! applying backpressure to the network.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use super::buffer::RingBuffer;
use super::framer::NdjsonFramer;
use super::types::{StreamConfig, StreamError, StreamRecord, StreamResult, StreamState};

/// Delay between reconnection attempts
const RETRY_DELAY: Duration = Duration::from_secs(1);
/// Connect timeout for the chunked-HTTP transport
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A live feed of typed records with bounded buffering
///
/// Construction is synchronous and performs no network I/O; the connect/read
/// loop runs on a spawned task, so a tokio runtime must be current. The
/// transport reconnects indefinitely on failure until [`close`] is called;
/// sequence numbering continues across reconnects.
///
/// [`close`]: StreamReader::close
pub struct StreamReader<T> {
    shared: Arc<Shared<T>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// An independent read position into a [`StreamReader`]
///
/// Created at the current buffer tail: a new cursor observes only records
/// produced after it subscribed. Cursors never block each other or the
/// transport.
pub struct StreamCursor<T> {
    shared: Arc<Shared<T>>,
    wake: watch::Receiver<u64>,
    last_seq: u64,
}

struct Shared<T> {
    config: StreamConfig,
    http: reqwest::Client,
    state: Mutex<ReaderState<T>>,
    /// Bumped to the latest sequence on every append; also signalled on close
    wake: watch::Sender<u64>,
}

struct ReaderState<T> {
    buffer: RingBuffer<T>,
    lifecycle: StreamState,
}

impl<T> StreamReader<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create the reader and schedule connection establishment
    pub fn new(config: StreamConfig) -> StreamResult<Self> {
        let http = reqwest::Client::builder()
            // No overall timeout: the response body is an endless stream.
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let (wake, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            state: Mutex::new(ReaderState {
                buffer: RingBuffer::new(config.buffer_length),
                lifecycle: StreamState::Connecting,
            }),
            config,
            http,
            wake,
        });

        let task = tokio::spawn(run_feed(Arc::clone(&shared)));

        Ok(Self {
            shared,
            task: Mutex::new(Some(task)),
        })
    }

    /// Register a new cursor at the current buffer tail
    pub fn subscribe(&self) -> StreamCursor<T> {
        // Hold the state lock while reading the tail and subscribing so no
        // append can slip between the two.
        let state = self.shared.state.lock();
        StreamCursor {
            shared: Arc::clone(&self.shared),
            wake: self.shared.wake.subscribe(),
            last_seq: state.buffer.latest_seq(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.shared.state.lock().lifecycle
    }

    /// Whether [`close`](StreamReader::close) has been called
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Copy of the retained record window, oldest first
    pub fn buffered(&self) -> Vec<StreamRecord<T>> {
        self.shared.state.lock().buffer.snapshot()
    }

    /// Highest sequence number assigned so far (0 before the first record)
    pub fn latest_seq(&self) -> u64 {
        self.shared.state.lock().buffer.latest_seq()
    }

    /// The immutable configuration this reader was built with
    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    /// Tear down the transport and wake every suspended cursor
    ///
    /// Idempotent. After close, every pending and future
    /// [`StreamCursor::next`] call returns [`StreamError::Closed`].
    pub fn close(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.lifecycle == StreamState::Closed {
                return;
            }
            state.lifecycle = StreamState::Closed;
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        // Wake waiters; they observe the closed lifecycle on re-check.
        self.shared.wake.send_modify(|_| {});
        debug!(url = %self.shared.config.url, "stream reader closed");
    }
}

impl<T> Drop for StreamReader<T> {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.lifecycle = StreamState::Closed;
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.shared.wake.send_modify(|_| {});
    }
}

impl<T> StreamCursor<T> {
    /// The next record after this cursor's position
    ///
    /// Suspends until a newer record arrives or the reader closes. A cursor
    /// that has fallen behind the retention window resumes at the oldest
    /// retained record; compare `seq` deltas to detect the gap.
    pub async fn next(&mut self) -> StreamResult<StreamRecord<T>> {
        loop {
            {
                let state = self.shared.state.lock();
                if let Some(record) = state.buffer.first_after(self.last_seq) {
                    self.last_seq = record.seq;
                    return Ok(record);
                }
                if state.lifecycle == StreamState::Closed {
                    return Err(StreamError::Closed);
                }
            }
            // Re-check the buffer after every wake-up; `changed` cannot miss
            // an append that happened after the check above because the
            // notification version is bumped by each send.
            if self.wake.changed().await.is_err() {
                return Err(StreamError::Closed);
            }
        }
    }

    /// Sequence number of the last record delivered to this cursor
    pub fn position(&self) -> u64 {
        self.last_seq
    }
}

impl<T> Shared<T> {
    fn is_closed(&self) -> bool {
        self.state.lock().lifecycle == StreamState::Closed
    }

    fn set_lifecycle(&self, lifecycle: StreamState) {
        let mut state = self.state.lock();
        // Closed is terminal.
        if state.lifecycle != StreamState::Closed {
            state.lifecycle = lifecycle;
        }
    }

    /// The feed URL rewritten for the WebSocket transport, token attached
    ///
    /// The token travels as a query parameter because browser-class
    /// WebSocket clients cannot set headers; the daemon accepts it there.
    fn ws_url(&self) -> StreamResult<Url> {
        let mut url = self.config.url.clone();
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| StreamError::Url(format!("cannot derive ws URL from {}", self.config.url)))?;
        if let Some(token) = &self.config.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}

impl<T> Shared<T>
where
    T: DeserializeOwned,
{
    /// Decode one wire message and append it
    ///
    /// Malformed frames are dropped, not fatal: one corrupt message must not
    /// take down the feed for every subscriber.
    fn ingest(&self, raw: &str) {
        match serde_json::from_str::<T>(raw) {
            Ok(payload) => {
                let seq = {
                    let mut state = self.state.lock();
                    if state.lifecycle == StreamState::Closed {
                        return;
                    }
                    state.lifecycle = StreamState::Streaming;
                    state.buffer.push(payload)
                };
                let _ = self.wake.send(seq);
            }
            Err(e) => warn!(error = %e, "dropping malformed feed frame"),
        }
    }
}

/// Connect/read loop: runs until the reader is closed
async fn run_feed<T>(shared: Arc<Shared<T>>)
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let mut first_attempt = true;
    loop {
        if shared.is_closed() {
            return;
        }
        shared.set_lifecycle(if first_attempt {
            StreamState::Connecting
        } else {
            StreamState::Retrying
        });
        first_attempt = false;

        // Transport selection, reapplied on every attempt: WebSocket when
        // preferred, with a chunked-HTTP fallback in the same attempt so a
        // daemon without WS support still streams.
        let outcome = if shared.config.prefer_websocket {
            match stream_websocket(&shared).await {
                Err(e) if !shared.is_closed() => {
                    debug!(error = %e, "websocket transport failed, trying chunked HTTP");
                    stream_http(&shared).await
                }
                other => other,
            }
        } else {
            stream_http(&shared).await
        };

        if shared.is_closed() {
            return;
        }
        if let Err(e) = outcome {
            warn!(url = %shared.config.url, error = %e, "feed disconnected, will reconnect");
        }
        tokio::time::sleep(RETRY_DELAY).await;
    }
}

/// Stream the feed over a persistent WebSocket connection
async fn stream_websocket<T>(shared: &Arc<Shared<T>>) -> StreamResult<()>
where
    T: DeserializeOwned,
{
    let url = shared.ws_url()?;
    debug!(url = %url, "connecting websocket feed");

    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| StreamError::Transport(e.to_string()))?;
    let (_write, mut read) = ws.split();

    while let Some(message) = read.next().await {
        if shared.is_closed() {
            return Ok(());
        }
        match message.map_err(|e| StreamError::Transport(e.to_string()))? {
            Message::Text(text) => shared.ingest(text.as_str()),
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => shared.ingest(text),
                Err(_) => warn!("dropping non-UTF-8 binary frame"),
            },
            Message::Close(_) => {
                return Err(StreamError::Transport("closed by daemon".into()));
            }
            // Ping/Pong handled by the protocol layer.
            _ => {}
        }
    }

    Err(StreamError::Transport("websocket stream ended".into()))
}

/// Stream the feed over a long-lived chunked HTTP response
async fn stream_http<T>(shared: &Arc<Shared<T>>) -> StreamResult<()>
where
    T: DeserializeOwned,
{
    debug!(url = %shared.config.url, "connecting chunked HTTP feed");

    let mut request = shared.http.get(shared.config.url.clone());
    if let Some(token) = &shared.config.token {
        request = request.bearer_auth(token);
    }
    let response = request
        .send()
        .await
        .map_err(|e| StreamError::Transport(e.to_string()))?;
    if !response.status().is_success() {
        return Err(StreamError::Transport(format!(
            "daemon returned HTTP {}",
            response.status()
        )));
    }

    let mut body = response.bytes_stream();
    let mut framer = NdjsonFramer::new();

    while let Some(chunk) = body.next().await {
        if shared.is_closed() {
            return Ok(());
        }
        let chunk = chunk.map_err(|e| StreamError::Transport(e.to_string()))?;
        for line in framer.feed(chunk) {
            shared.ingest(&line);
        }
    }

    Err(StreamError::Transport("http stream ended".into()))
}
