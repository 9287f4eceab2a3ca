//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Settings derived from the passthrough `logging` section
//! - JSON or pretty stdout output, optional rolling log file
//! - In-memory log history for the log stream
//! - Secret scrubbing of collected records

pub mod collector;
pub mod config;
pub mod logger;
pub mod secret_scrubbing;

pub use collector::{LogCollector, LogRecord, MAX_LINES};
pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use secret_scrubbing::SecretScrubber;

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, trace, warn};
