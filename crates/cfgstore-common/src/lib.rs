//! Shared utilities for cfgstore crates
//!
//! Holds the ambient pieces every crate in the workspace relies on, so the
//! library crates never configure a subscriber of their own.

pub mod logging;

pub use logging::{format_error, LogLevel, LogOptions, LoggingError};
