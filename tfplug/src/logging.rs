//! Logging setup for provider processes
//!
//! Terraform reads the plugin handshake from stdout, so everything is
//! logged to stderr. `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level used when `RUST_LOG` is not set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
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

fn filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

/// Installs the global subscriber at `info`.
///
/// The plugin binary calls this once from `main`, before serving. Library
/// code only emits `tracing` events and never installs a subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_level(LogLevel::Info);
}

pub fn init_logging_with_level(level: LogLevel) {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Like [`init_logging`] but returns false instead of panicking when a
/// subscriber is already installed, which happens across tests.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter(LogLevel::Info))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .is_ok()
}
