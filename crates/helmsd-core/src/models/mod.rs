//! Shared data models for the helmsd control API

mod config;
mod connection;
mod log;
mod provider;
mod proxy;
mod rule;
mod version;

pub use config::*;
pub use connection::*;
pub use log::*;
pub use provider::*;
pub use proxy::*;
pub use rule::*;
pub use version::*;
