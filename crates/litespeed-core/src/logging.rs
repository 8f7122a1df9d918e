//! Leveled logging to stderr.
//!
//! One global configuration, set once via [`init`]. Messages below the
//! configured minimum level are dropped. The default minimum is `Info`.

use std::sync::OnceLock;

/// Log severity, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase label used in output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    min_level: LogLevel,
}

impl LogConfig {
    /// Configuration with the given minimum level.
    #[must_use]
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    /// Whether `level` passes the filter.
    #[must_use]
    pub fn allows(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

static CONFIG: OnceLock<LogConfig> = OnceLock::new();

/// Install the global configuration. Returns `false` when a configuration
/// was already installed (the first one wins).
pub fn init(config: LogConfig) -> bool {
    CONFIG.set(config).is_ok()
}

fn config() -> &'static LogConfig {
    CONFIG.get_or_init(LogConfig::default)
}

/// Emit a message at `level`.
pub fn log(level: LogLevel, message: &str) {
    if config().allows(level) {
        eprintln!("[litespeed {level}] {message}");
    }
}

/// Emit at `Debug`.
pub fn debug(message: &str) {
    log(LogLevel::Debug, message);
}

/// Emit at `Info`.
pub fn info(message: &str) {
    log(LogLevel::Info, message);
}

/// Emit at `Warn`.
pub fn warn(message: &str) {
    log(LogLevel::Warn, message);
}

/// Emit at `Error`.
pub fn error(message: &str) {
    log(LogLevel::Error, message);
}
