//! Logging setup for fold builds
//!
//! Only available with the `logging` feature. Libraries just emit `tracing`
//! events; binaries and tests call [`init_logging`] once.
//!
//! The level applies to fold's own crates. Everything else (tokio, child
//! process plumbing) is held at `warn` so per-job debug output stays readable.
//! A non-empty `RUST_LOG` replaces these defaults entirely.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Crates whose events follow the configured level
pub const FOLD_TARGETS: [&str; 2] = ["fold_build", "fold_plugin_critical"];

/// Log level for fold output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// No logging output
    Silent,
    /// Only errors
    Error,
    /// Errors and warnings
    Warn,
    /// Phase summaries and extraction totals (default)
    #[default]
    Info,
    /// Per-phase, per-slot and per-job events
    Debug,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// `EnvFilter` directives for this level.
    ///
    /// ```
    /// use fold_build::LogLevel;
    ///
    /// assert_eq!(
    ///     LogLevel::Debug.filter_directives(),
    ///     "warn,fold_build=debug,fold_plugin_critical=debug"
    /// );
    /// ```
    pub fn filter_directives(&self) -> String {
        match self {
            LogLevel::Silent | LogLevel::Error => self.as_str().to_string(),
            level => {
                let mut directives = String::from("warn");
                for target in FOLD_TARGETS {
                    directives.push_str(&format!(",{}={}", target, level.as_str()));
                }
                directives
            }
        }
    }

    /// Filter for this level unless `RUST_LOG` is set.
    pub fn env_filter(&self) -> EnvFilter {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
            _ => EnvFilter::new(self.filter_directives()),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the global subscriber for `level`.
///
/// Only the first call in a process takes effect, so tests can call it freely.
///
/// ```rust,no_run
/// use fold_build::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        // try_init: another subscriber may already be installed by the host
        let _ = tracing_subscriber::registry()
            .with(level.env_filter())
            .with(fmt::layer().compact().with_target(false).without_time())
            .try_init();
    });
}

/// Install the global subscriber at the level named by `FOLD_LOG`
/// (`silent`, `error`, `warn`, `info`, `debug`), defaulting to info.
pub fn init_logging_from_env() {
    let level = std::env::var("FOLD_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();
    init_logging(level);
}
