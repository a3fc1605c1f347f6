//! Structured logging: tracing subscriber setup and ndjson lines for alerts.

mod format;

pub use format::{AlertEvent, StructuredLogger};
