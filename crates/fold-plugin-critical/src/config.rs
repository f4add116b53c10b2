//! Critical CSS plugin options
//!
//! Options deserialize from JSON or TOML. Missing keys take their defaults;
//! the extraction sub-config is merged key by key, so supplying only
//! `penthouse.timeout` keeps the default viewport.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CriticalCssError;

/// Default output template
pub const DEFAULT_FILENAME: &str = "[name].critical.css";

/// Default viewport width and height handed to the extractor
pub const DEFAULT_VIEWPORT: u32 = 1920;

/// Extraction keys that are filled in per job and never taken from options
pub const RESERVED_EXTRACTION_KEYS: [&str; 3] = ["url", "cssString", "css"];

/// How many extraction failures become build errors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureReport {
    /// Only the first failure, in job order
    #[default]
    First,
    /// One error per failed job
    All,
}

/// Options passed through to the extractor for every job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    #[serde(default = "default_viewport")]
    pub width: u32,

    #[serde(default = "default_viewport")]
    pub height: u32,

    /// Any other extractor setting, forwarded verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_viewport() -> u32 {
    DEFAULT_VIEWPORT
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT,
            height: DEFAULT_VIEWPORT,
            extra: Map::new(),
        }
    }
}

impl ExtractionOptions {
    /// Remove keys that would override the per-job url or stylesheet.
    ///
    /// Returns the keys that were removed.
    pub fn sanitize(&mut self) -> Vec<String> {
        RESERVED_EXTRACTION_KEYS
            .iter()
            .filter(|key| self.extra.remove(**key).is_some())
            .map(|key| key.to_string())
            .collect()
    }
}

/// Configuration for the critical CSS plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalCssOptions {
    /// Page name to URL. One extraction job per entry, in insertion order.
    pub urls: IndexMap<String, String>,

    /// Output template; supports `[name]` and `[hash]`
    pub filename: String,

    /// Regex restricting which stylesheet assets feed extraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_match: Option<String>,

    /// Extractor settings
    #[serde(alias = "extraction")]
    pub penthouse: ExtractionOptions,

    /// Maximum in-flight extractions; unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    pub failure_report: FailureReport,
}

impl Default for CriticalCssOptions {
    fn default() -> Self {
        Self {
            urls: IndexMap::new(),
            filename: DEFAULT_FILENAME.to_string(),
            css_match: None,
            penthouse: ExtractionOptions::default(),
            concurrency: None,
            failure_report: FailureReport::First,
        }
    }
}

impl CriticalCssOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON value
    pub fn from_value(value: Value) -> Result<Self, CriticalCssError> {
        serde_json::from_value(value).map_err(|e| CriticalCssError::invalid_options(e.to_string()))
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, CriticalCssError> {
        toml::from_str(source).map_err(|e| CriticalCssError::invalid_options(e.to_string()))
    }

    /// Serialize options back to JSON
    pub fn to_value(&self) -> Result<Value, CriticalCssError> {
        serde_json::to_value(self).map_err(|e| CriticalCssError::invalid_options(e.to_string()))
    }

    /// Add a page to extract
    pub fn with_url(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(name.into(), url.into());
        self
    }

    /// Set the output template
    pub fn with_filename(mut self, template: impl Into<String>) -> Self {
        self.filename = template.into();
        self
    }

    /// Restrict aggregation to stylesheet assets matching `pattern`
    pub fn with_css_match(mut self, pattern: impl Into<String>) -> Self {
        self.css_match = Some(pattern.into());
        self
    }

    /// Set the extraction viewport
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.penthouse.width = width;
        self.penthouse.height = height;
        self
    }

    /// Set an arbitrary extractor option
    pub fn with_extraction_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.penthouse.extra.insert(key.into(), value.into());
        self
    }

    /// Limit how many extractions run at once
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    pub fn with_failure_report(mut self, report: FailureReport) -> Self {
        self.failure_report = report;
        self
    }
}
