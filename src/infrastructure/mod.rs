//! Infrastructure layer module
//!
//! This module contains the pieces that touch the outside world:
//! - Configuration loading (figment + serde_yaml)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
