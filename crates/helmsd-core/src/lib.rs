//! Core wire types for the helmsd control API
//!
//! Every type in this crate maps one-to-one onto a JSON shape the daemon
//! produces or accepts. Field renames follow the daemon's wire casing
//! (kebab-case for config, camelCase for connections), so serializing a
//! value here is bit-compatible with the daemon.

pub mod models;

pub use models::*;
