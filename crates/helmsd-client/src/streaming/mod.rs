//! Feed streaming for the daemon's real-time endpoints
//!
//! Turns an intermittent network feed (WebSocket or chunked HTTP) into a
//! stable, bounded, replay-safe sequence of typed records consumable by any
//! number of independent cursors.
//!
//! # Example
//!
//! ```no_run
//! use helmsd_client::streaming::{StreamConfig, StreamReader};
//! use helmsd_core::LogRecord;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = url::Url::parse("http://127.0.0.1:9090/logs?level=info")?;
//! let reader = StreamReader::<LogRecord>::new(StreamConfig::new(url, None))?;
//!
//! let mut cursor = reader.subscribe();
//! while let Ok(record) = cursor.next().await {
//!     println!("#{} [{}] {}", record.seq, record.payload.level, record.payload.payload);
//! }
//!
//! reader.close();
//! # Ok(())
//! # }
//! ```

mod buffer;
mod framer;
mod reader;
mod types;

pub use framer::NdjsonFramer;
pub use reader::{StreamCursor, StreamReader};
pub use types::{
    StreamConfig, StreamError, StreamRecord, StreamResult, StreamState, DEFAULT_BUFFER_LENGTH,
};
