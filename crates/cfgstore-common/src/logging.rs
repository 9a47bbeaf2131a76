//! Unified logging for cfgstore
//!
//! Every crate in the workspace logs through `tracing`, and every target lives
//! under the `cfgstore` prefix. That prefix acts as the shared parent logger:
//! - [`init`] installs a subscriber writing to stderr or to a file
//! - [`set_level`] changes the minimum level of all cfgstore targets
//! - [`set_disabled`] silences them and later restores the previous level
//! - [`format_error`] renders an error with its cause chain for log fields
//!
//! Applications that install their own subscriber can skip [`init`] and
//! filter on the `cfgstore` target prefix directly.

use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use parking_lot::const_mutex;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Target prefix shared by all cfgstore diagnostics
pub const PARENT_TARGET: &str = "cfgstore";

/// Environment variable consulted by [`LogLevel::from_env`]
pub const LOG_ENV_VAR: &str = "CFGSTORE_LOG";

/// Targets controlled by the level switch
const TARGETS: [&str; 2] = ["cfgstore", "cfgstore_common"];

/// Logging errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("A global subscriber is already installed")]
    AlreadyInitialized,

    #[error("Failed to reload log filter: {0}")]
    Reload(String),
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    /// Convert to the directive spelling used by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Read the level from `CFGSTORE_LOG`, if set and valid
    pub fn from_env() -> Option<Self> {
        std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Minimum level; falls back to `CFGSTORE_LOG`, then `Info`
    pub level: Option<LogLevel>,
    /// Append to this file instead of printing to stderr
    pub log_file: Option<PathBuf>,
    /// Colorize output
    pub ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: None,
            log_file: None,
            ansi: true,
        }
    }
}

struct LoggerState {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    level: LogLevel,
    disabled: bool,
}

static STATE: parking_lot::Mutex<LoggerState> = const_mutex(LoggerState {
    handle: None,
    level: LogLevel::Info,
    disabled: false,
});

fn directive(level: LogLevel, disabled: bool) -> String {
    let level = if disabled { "off" } else { level.as_str() };
    let mut parts = vec!["warn".to_string()];
    parts.extend(TARGETS.iter().map(|target| format!("{}={}", target, level)));
    parts.join(",")
}

/// Initialize the global subscriber
pub fn init(options: LogOptions) -> Result<(), LoggingError> {
    let level = options
        .level
        .or_else(LogLevel::from_env)
        .unwrap_or(LogLevel::Info);

    let writer = match options.log_file {
        Some(ref path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::options().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let mut state = STATE.lock();
    let (filter, handle) = reload::Layer::new(EnvFilter::new(directive(level, state.disabled)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(options.ansi))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    state.handle = Some(handle);
    state.level = level;
    Ok(())
}

fn apply(state: &LoggerState) -> Result<(), LoggingError> {
    match state.handle {
        Some(ref handle) => handle
            .reload(EnvFilter::new(directive(state.level, state.disabled)))
            .map_err(|e| LoggingError::Reload(e.to_string())),
        None => Ok(()),
    }
}

/// Change the minimum level of all cfgstore targets
pub fn set_level(level: LogLevel) -> Result<(), LoggingError> {
    let mut state = STATE.lock();
    state.level = level;
    apply(&state)
}

/// Silence all cfgstore targets, or restore the level they had before
pub fn set_disabled(disabled: bool) -> Result<(), LoggingError> {
    let mut state = STATE.lock();
    state.disabled = disabled;
    apply(&state)
}

/// Whether cfgstore diagnostics are currently silenced
pub fn is_disabled() -> bool {
    STATE.lock().disabled
}

/// Current minimum level (ignoring the disabled switch)
pub fn level() -> LogLevel {
    STATE.lock().level
}

/// Format an error with cause chain
pub fn format_error(error: &dyn std::error::Error) -> String {
    format_error_recursive(error, 0)
}

fn format_error_recursive(error: &dyn std::error::Error, depth: usize) -> String {
    const MAX_DEPTH: usize = 10;

    if depth >= MAX_DEPTH {
        return error.to_string();
    }

    let base = error.to_string();

    if let Some(source) = error.source() {
        format!("{} Caused by: {}", base, format_error_recursive(source, depth + 1))
    } else {
        base
    }
}
