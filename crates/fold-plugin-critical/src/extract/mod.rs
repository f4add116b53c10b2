//! Critical CSS extraction collaborator.
//!
//! The plugin does not render pages itself. An [`Extractor`] receives the
//! page URL, the aggregated stylesheet and the extraction options, and
//! returns the CSS needed for the first screen.

mod command;

pub use command::CommandExtractor;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ExtractionOptions;
use crate::error::ExtractError;

/// One extraction call.
///
/// Serializes to `{ "url", "cssString", "width", "height", ...extra }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub url: String,
    pub css_string: Arc<str>,
    #[serde(flatten)]
    pub options: ExtractionOptions,
}

/// Computes critical CSS for a page.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: &ExtractRequest) -> Result<String, ExtractError>;
}

#[async_trait]
impl<E: Extractor + ?Sized> Extractor for Arc<E> {
    async fn extract(&self, request: &ExtractRequest) -> Result<String, ExtractError> {
        (**self).extract(request).await
    }
}
