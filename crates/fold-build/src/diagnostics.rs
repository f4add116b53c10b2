//! Build diagnostics.
//!
//! Recoverable problems reported by the host or by plugins. They are collected
//! on the [`Compilation`](crate::Compilation) and returned with the build
//! output; a build with error diagnostics still completes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plugin::BuildPhase;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A single build diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDiagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    /// Plugin that reported the diagnostic, if any
    pub plugin: Option<String>,
    /// Phase during which the diagnostic was reported
    pub phase: Option<BuildPhase>,
    pub help: Option<String>,
    /// Error chain (causes) extracted from the error
    #[serde(default)]
    pub error_chain: Vec<String>,
}

impl BuildDiagnostic {
    fn new(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            plugin: None,
            phase: None,
            help: None,
            error_chain: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, message)
    }

    /// Build an error diagnostic from an error value, keeping its source chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut diagnostic = Self::error(error.to_string());
        let mut source = error.source();
        while let Some(cause) = source {
            diagnostic.error_chain.push(cause.to_string());
            source = cause.source();
        }
        diagnostic
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_phase(mut self, phase: BuildPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(plugin) = &self.plugin {
            write!(f, "[{}] ", plugin)?;
        }
        write!(f, "{}", self.message)?;
        for cause in &self.error_chain {
            write!(f, "\n  caused by: {}", cause)?;
        }
        Ok(())
    }
}
