//! Transport adapters for the ticketing core.
//!
//! HTTP via axum today. An adapter only maps user actions onto the
//! service's start/stop/query/reset operations; no wire format is
//! mandated by the core itself.

pub mod http;

pub use http::{ServerConfig, serve};
