//! Error types for critical CSS extraction

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the plugin itself
#[derive(Error, Debug, Diagnostic)]
pub enum CriticalCssError {
    /// Options could not be deserialized
    #[error("Invalid critical CSS options: {message}")]
    #[diagnostic(
        code(fold::critical::invalid_options),
        help("Check the `urls`, `filename`, `css_match` and `penthouse` keys of the plugin options")
    )]
    InvalidOptions { message: String },

    /// `css_match` is not a valid regular expression
    #[error("Invalid css_match pattern '{pattern}': {source}")]
    #[diagnostic(
        code(fold::critical::invalid_css_match),
        help("css_match is matched against asset names, e.g. \"^main\\\\.\" or \"vendor\"")
    )]
    InvalidCssMatch {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Two pages normalize to the same output file
    #[error("Pages '{first}' and '{second}' both write to '{filename}'")]
    #[diagnostic(
        code(fold::critical::duplicate_output),
        help("Page names are slugified before they replace [name]; rename one of the pages")
    )]
    DuplicateOutput {
        first: String,
        second: String,
        filename: String,
    },

    /// A reserved output file could not be read back
    #[error("Failed to read reserved output {}: {source}", .path.display())]
    #[diagnostic(code(fold::critical::read_slot))]
    ReadSlot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extraction failed for one page
    #[error("Critical CSS extraction failed for '{name}' ({url})")]
    #[diagnostic(code(fold::critical::extraction_failed))]
    Extraction {
        name: String,
        url: String,
        #[source]
        source: ExtractError,
    },

    /// Output writing failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] fold_build::Error),
}

impl CriticalCssError {
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    pub fn invalid_css_match(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidCssMatch {
            pattern: pattern.into(),
            source,
        }
    }

    pub fn read_slot(path: PathBuf, source: std::io::Error) -> Self {
        Self::ReadSlot { path, source }
    }

    pub fn extraction(name: impl Into<String>, url: impl Into<String>, source: ExtractError) -> Self {
        Self::Extraction {
            name: name.into(),
            url: url.into(),
            source,
        }
    }
}

/// Errors an [`Extractor`](crate::Extractor) reports for a single page
#[derive(Error, Debug, Diagnostic)]
pub enum ExtractError {
    /// Failed to spawn the extractor process or talk to it
    #[error("Failed to run critical CSS extractor: {source}")]
    #[diagnostic(
        code(fold::critical::spawn_failed),
        help("Check that the extractor command is installed and on your PATH")
    )]
    SpawnFailed {
        #[source]
        source: std::io::Error,
    },

    /// Extractor exited with non-zero status
    #[error("Critical CSS extractor exited with code {exit_code}")]
    #[diagnostic(code(fold::critical::extractor_exit_error))]
    ExitError {
        exit_code: i32,
        #[help]
        stderr: String,
    },

    /// Extractor did not finish in time
    #[error("Critical CSS extractor timed out after {timeout_secs} seconds")]
    #[diagnostic(
        code(fold::critical::timeout),
        help("Check that the page URL is reachable from the build machine")
    )]
    Timeout { timeout_secs: u64 },

    /// Output exceeded the size cap
    #[error("Extractor output exceeded {max_bytes} bytes")]
    #[diagnostic(
        code(fold::critical::output_too_large),
        help("Raise the limit with CommandExtractor::with_max_output")
    )]
    OutputTooLarge { max_bytes: usize },

    /// Output was not UTF-8
    #[error("Failed to parse extractor output as UTF-8: {source}")]
    #[diagnostic(code(fold::critical::parse_error))]
    ParseError {
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The request could not be encoded
    #[error("Failed to encode extraction request: {source}")]
    #[diagnostic(code(fold::critical::request_encoding))]
    Request {
        #[source]
        source: serde_json::Error,
    },

    /// The extractor rejected the page
    #[error("{message}")]
    #[diagnostic(code(fold::critical::rejected))]
    Rejected { message: String },
}

impl ExtractError {
    pub fn spawn_failed(source: std::io::Error) -> Self {
        Self::SpawnFailed { source }
    }

    pub fn exit_error(exit_code: i32, stderr: String) -> Self {
        Self::ExitError { exit_code, stderr }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    pub fn output_too_large(max_bytes: usize) -> Self {
        Self::OutputTooLarge { max_bytes }
    }

    pub fn parse_error(source: std::string::FromUtf8Error) -> Self {
        Self::ParseError { source }
    }

    pub fn request(source: serde_json::Error) -> Self {
        Self::Request { source }
    }

    /// Failure reported by a custom extractor.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_extraction_error_keeps_cause() {
        let err = CriticalCssError::extraction(
            "home",
            "https://example.com/",
            ExtractError::rejected("page returned 404"),
        );

        assert_eq!(
            err.to_string(),
            "Critical CSS extraction failed for 'home' (https://example.com/)"
        );
        assert_eq!(err.source().unwrap().to_string(), "page returned 404");
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = ExtractError::timeout(30);
        assert_eq!(
            err.code().unwrap().to_string(),
            "fold::critical::timeout"
        );
        assert!(err.to_string().contains("30 seconds"));
    }

    #[test]
    fn test_exit_error_uses_stderr_as_help() {
        let err = ExtractError::exit_error(2, "navigation failed".to_string());
        assert_eq!(err.help().unwrap().to_string(), "navigation failed");
    }
}
