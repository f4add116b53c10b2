#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fold-build
//!
//! Minimal plugin-driven build host for fold.
//!
//! A build runs as a fixed sequence of phases over one per-build
//! [`Compilation`]:
//!
//! ```text
//! make ─▶ construct_graph ─▶ seal ─▶ optimize_assets ─▶ after_compile ─▶ emit ─▶ after_emit
//!          (plugin)          (host)   (plugin)            (plugin)        (host)   (plugin, async)
//! ```
//!
//! Plugins implement [`BuildPlugin`]. The value returned from
//! [`BuildPlugin::construct_graph`] is the plugin's per-build state and is
//! threaded through every later phase, so a plugin instance never mutates
//! itself during a build.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fold_build::{Compiler, CompilerOptions, RawModule};
//! # use fold_build::{BuildPlugin, Compilation};
//! # struct Noop;
//! # impl BuildPlugin for Noop {
//! #     type State = ();
//! #     fn name(&self) -> std::borrow::Cow<'static, str> { "noop".into() }
//! #     fn construct_graph(&self, _: &mut Compilation) -> fold_build::Result<()> { Ok(()) }
//! # }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let compiler = Compiler::new(CompilerOptions::new(".", "dist"))
//!     .entry("main", vec![RawModule::new("./src/index.js", "console.log(1)")])
//!     .asset("main.css", "body { margin: 0 }");
//!
//! let output = compiler.run(&Noop).await?;
//! println!("built {} ({} assets)", output.hash, output.assets.len());
//! # Ok(()) }
//! ```

pub mod asset;
pub mod chunk;
pub mod compilation;
pub mod compiler;
pub mod diagnostics;
pub mod output;
pub mod plugin;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use asset::{AssetSource, AssetTable, RawSource};
pub use chunk::{Chunk, ChunkGraph, ModuleKind, RawModule};
pub use compilation::Compilation;
pub use compiler::{BuildOutput, Compiler, CompilerOptions};
pub use diagnostics::{BuildDiagnostic, DiagnosticSeverity};
pub use plugin::{BuildPhase, BuildPlugin};

/// Error types for fold-build operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// A plugin failed fatally during one of its phases.
    #[error("Plugin '{plugin}' failed during {phase}: {source}")]
    Plugin {
        plugin: String,
        phase: BuildPhase,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for fold-build operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a plugin's own error so the host can report which plugin and phase failed.
    pub fn plugin(
        plugin: impl Into<String>,
        phase: BuildPhase,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            phase,
            source: source.into(),
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::Plugin { .. } => "PLUGIN_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Ensure it stays inside the output directory and doesn't contain '..' components.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            Error::Plugin { plugin, .. } => Some(Box::new(format!(
                "The '{}' plugin aborted the build. Its error is shown above.",
                plugin
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_error_codes() {
        let err = Error::WriteFailure("disk full".to_string());
        assert_eq!(err.code().unwrap().to_string(), "WRITE_FAILURE");
        assert!(err.help().unwrap().to_string().contains("disk full"));
    }

    #[test]
    fn test_plugin_error_display() {
        let err = Error::plugin(
            "critical-css",
            BuildPhase::AfterEmit,
            std::io::Error::other("boom"),
        );
        let msg = err.to_string();
        assert!(msg.contains("critical-css"));
        assert!(msg.contains("after-emit"));
        assert!(msg.contains("boom"));
        assert_eq!(err.code().unwrap().to_string(), "PLUGIN_ERROR");
    }
}
