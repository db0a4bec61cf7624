//! WebSocket Handshake Bench Library
//!
//! A sequential load driver that opens many WebSocket connections, one after
//! another, against a single endpoint. Each iteration waits for the opening
//! handshake to finish before the next begins, and the run reports the total
//! cost, the mean cost per connection and the connection throughput.
//!
//! # Modules
//!
//! - `config`: Configuration loading from .properties files and environment overrides
//! - `endpoint`: Target URI parsing and scheme default port resolution
//! - `tracker`: Success counter, run timing and summary reporting
//! - `driver`: Per-attempt connect/TLS/handshake and the serialized run loop

pub mod config;
pub mod endpoint;
pub mod tracker;
pub mod driver;

// Re-export main types for convenience
pub use config::{ClosePolicy, Config, SummaryFormat};
pub use driver::LoadDriver;
pub use endpoint::Endpoint;
pub use tracker::{RunSummary, RunTracker};
