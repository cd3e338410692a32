//! Logging setup for applications embedding Waymark.
//!
//! Waymark emits `tracing` events while it discovers mappings and builds
//! links (mapping resolution and cache misses at `trace`/`debug`, broken
//! handler metadata at `warn`). Libraries never install a subscriber on their
//! own; [`LogConfig`] is a convenience for binaries and tests.
//!
//! ```no_run
//! use waymark_core::logging::*;
//!
//! LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init()
//!     .ok();
//! ```
//!
//! The filter is read from `WAYMARK_LOG`, then `RUST_LOG`, unless one is set
//! explicitly with [`LogConfig::with_env_filter`].

use std::io;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

pub use tracing::{debug, error, info, trace, warn};

/// Environment variable consulted for the log filter.
pub const LOG_ENV_VAR: &str = "WAYMARK_LOG";

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Convert to string for EnvFilter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured, machine-readable (default)
    Json,
    Plain,
    /// Multi-line, for development
    Pretty,
    Compact,
}

/// Output destination for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

impl LogOutput {
    fn writer(&self) -> BoxMakeWriter {
        match self {
            LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Include target (module path)
    pub targets: bool,
    /// Include file and line numbers
    pub file_line: bool,
    /// Enable ANSI colors (ignored for JSON)
    pub colors: bool,
    /// Custom filter directives (overrides level and environment if set)
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_file_line(mut self, enable: bool) -> Self {
        self.file_line = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Set filter directives such as `"waymark_core=trace"`.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Build the filter from explicit directives, `WAYMARK_LOG`, `RUST_LOG`,
    /// or the configured level, in that order.
    pub fn filter(&self) -> EnvFilter {
        if let Some(directives) = &self.env_filter {
            if let Ok(filter) = EnvFilter::try_new(directives) {
                return filter;
            }
        }

        EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }

    /// Install the configured subscriber as the global default.
    ///
    /// Fails when a global subscriber is already installed.
    pub fn init(self) -> Result<(), TryInitError> {
        let filter = self.filter();
        let writer = self.output.writer();

        match self.format {
            LogFormat::Json => {
                let layer = fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_file(self.file_line)
                    .with_line_number(self.file_line);

                tracing_subscriber::registry().with(filter).with(layer).try_init()
            }
            LogFormat::Plain => {
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_file(self.file_line)
                    .with_line_number(self.file_line)
                    .with_ansi(self.colors);

                tracing_subscriber::registry().with(filter).with(layer).try_init()
            }
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_file(self.file_line)
                    .with_line_number(self.file_line)
                    .with_ansi(self.colors);

                tracing_subscriber::registry().with(filter).with(layer).try_init()
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_ansi(self.colors);

                tracing_subscriber::registry().with(filter).with(layer).try_init()
            }
        }
    }
}

impl Default for LogConfig {
    /// JSON to STDOUT at WARN, so only broken handler metadata is reported.
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            file_line: false,
            colors: false,
            env_filter: None,
        }
    }
}
