//! Domain layer for the bot host
//!
//! This module contains the configuration model and its validated value types.
//! Nothing here performs I/O.

pub mod models;
