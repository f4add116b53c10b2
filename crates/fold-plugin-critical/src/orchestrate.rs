//! Concurrent extraction.
//!
//! Every page is an independent job. Jobs run as futures on the current task;
//! a failed extraction never cancels its siblings. Outcomes come back in job
//! order regardless of completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fold_build::output::write_file_atomic;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::config::ExtractionOptions;
use crate::error::{CriticalCssError, ExtractError};
use crate::extract::{ExtractRequest, Extractor};
use crate::naming::output_filename;

/// One page to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub url: String,
}

impl Job {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Jobs without a name or url do nothing.
    pub fn is_runnable(&self) -> bool {
        !self.name.is_empty() && !self.url.is_empty()
    }
}

/// Result of one job.
#[derive(Debug)]
pub enum JobOutcome {
    /// Missing name or url
    Skipped { name: String },
    /// Critical CSS written to `path`
    Written {
        name: String,
        path: PathBuf,
        bytes: usize,
    },
    /// The extractor failed
    Failed { name: String, error: CriticalCssError },
}

impl JobOutcome {
    pub fn name(&self) -> &str {
        match self {
            JobOutcome::Skipped { name }
            | JobOutcome::Written { name, .. }
            | JobOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed { .. })
    }
}

/// Everything the jobs of one build share.
#[derive(Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub css: &'a Arc<str>,
    pub options: &'a ExtractionOptions,
    pub extractor: &'a dyn Extractor,
    pub template: &'a str,
    pub build_hash: &'a str,
    pub output_dir: &'a Path,
}

/// Run every job and wait for all of them.
///
/// With `concurrency` unset, all extractions are started before any is
/// awaited. A failure to write an output file aborts the run with `Err`;
/// extractor failures are returned as [`JobOutcome::Failed`].
pub async fn run_jobs(
    jobs: &[Job],
    ctx: ExtractionContext<'_>,
    concurrency: Option<usize>,
) -> Result<Vec<JobOutcome>, CriticalCssError> {
    let pending: Vec<_> = jobs.iter().map(|job| run_job(job, ctx)).collect();

    let results: Vec<Result<JobOutcome, CriticalCssError>> = match concurrency {
        Some(limit) => stream::iter(pending).buffered(limit.max(1)).collect().await,
        None => join_all(pending).await,
    };

    results.into_iter().collect()
}

async fn run_job(job: &Job, ctx: ExtractionContext<'_>) -> Result<JobOutcome, CriticalCssError> {
    if !job.is_runnable() {
        debug!("[critical-css] Skipping '{}': no url", job.name);
        return Ok(JobOutcome::Skipped {
            name: job.name.clone(),
        });
    }

    let request = ExtractRequest {
        url: job.url.clone(),
        css_string: Arc::clone(ctx.css),
        options: ctx.options.clone(),
    };

    debug!("[critical-css] Extracting '{}' from {}", job.name, job.url);
    let css = match ctx.extractor.extract(&request).await {
        Ok(css) => css,
        Err(error) => return Ok(failed(job, error)),
    };

    let filename = output_filename(&job.name, ctx.template, ctx.build_hash);
    let path = write_file_atomic(ctx.output_dir, &filename, css.as_bytes())?;
    debug!(
        "[critical-css] Wrote {} ({} bytes)",
        path.display(),
        css.len()
    );

    Ok(JobOutcome::Written {
        name: job.name.clone(),
        path,
        bytes: css.len(),
    })
}

fn failed(job: &Job, error: ExtractError) -> JobOutcome {
    warn!(
        "[critical-css] Extraction failed for '{}' ({}): {}",
        job.name, job.url, error
    );
    JobOutcome::Failed {
        name: job.name.clone(),
        error: CriticalCssError::extraction(&job.name, &job.url, error),
    }
}
