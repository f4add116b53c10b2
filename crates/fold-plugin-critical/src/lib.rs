//! Critical CSS plugin for fold
//!
//! Generates per-page "critical" stylesheets (the rules needed to render the
//! first screen) during a build and emits them next to the other outputs.
//!
//! ## How it runs
//!
//! ```text
//! construct_graph  → add the virtual `criticalcss` chunk
//! optimize_assets  → swap its placeholder for one empty file per page
//! after_compile    → concatenate the build's stylesheets
//! after_emit       → extract every page concurrently, overwrite the files
//! ```
//!
//! Output names come from the `filename` template (`[name]`, `[hash]`), so
//! later stages see the final names before the content exists. A page whose
//! extraction fails is reported as a build error without stopping the other
//! pages.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fold_build::{Compiler, CompilerOptions, RawModule};
//! use fold_plugin_critical::{CommandExtractor, CriticalCssOptions, CriticalCssPlugin};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CriticalCssOptions::new()
//!     .with_url("home", "http://localhost:8080/")
//!     .with_url("pricing", "http://localhost:8080/pricing")
//!     .with_filename("[name].[hash].critical.css");
//!
//! let plugin = CriticalCssPlugin::with_options(
//!     options,
//!     CommandExtractor::new("node").arg("scripts/critical.mjs"),
//! )?;
//!
//! let compiler = Compiler::new(CompilerOptions::new(".", "dist"))
//!     .entry("main", vec![RawModule::stylesheet("./src/app.css", "body { margin: 0 }")]);
//! let output = compiler.run(&plugin).await?;
//! for error in &output.errors {
//!     eprintln!("{}", error);
//! }
//! # Ok(()) }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use fold_build::{BuildDiagnostic, BuildPhase, BuildPlugin, Compilation};
use miette::Diagnostic;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod naming;
pub mod orchestrate;
pub mod reserve;

pub use config::{CriticalCssOptions, ExtractionOptions, FailureReport};
pub use error::{CriticalCssError, ExtractError};
pub use extract::{CommandExtractor, ExtractRequest, Extractor};
pub use orchestrate::{Job, JobOutcome};

use aggregate::aggregate_css;
use naming::output_filename;
use orchestrate::{ExtractionContext, run_jobs};

/// Plugin name used in diagnostics and errors
pub const PLUGIN_NAME: &str = "critical-css";

/// Build plugin that extracts critical CSS for configured pages.
pub struct CriticalCssPlugin {
    options: CriticalCssOptions,
    css_match: Option<Regex>,
    extractor: Arc<dyn Extractor>,
}

/// Per-build state, created at graph construction and consumed after emit.
#[derive(Debug, Default)]
pub struct CriticalCssBuild {
    reserved: Vec<String>,
    aggregate_css: Option<Arc<str>>,
}

impl CriticalCssBuild {
    /// Output files reserved for this build
    pub fn reserved(&self) -> &[String] {
        &self.reserved
    }

    /// Stylesheet text every extraction receives, once aggregated
    pub fn aggregate_css(&self) -> Option<&str> {
        self.aggregate_css.as_deref()
    }
}

impl CriticalCssPlugin {
    /// Create a plugin with default options (no pages)
    pub fn new(extractor: impl Extractor + 'static) -> Self {
        Self {
            options: CriticalCssOptions::default(),
            css_match: None,
            extractor: Arc::new(extractor),
        }
    }

    /// Create a plugin with custom options
    ///
    /// `url`, `cssString` and `css` are dropped from the extraction options,
    /// since every job supplies its own. Fails when `css_match` is not a valid
    /// regex or two pages would write the same file.
    pub fn with_options(
        mut options: CriticalCssOptions,
        extractor: impl Extractor + 'static,
    ) -> Result<Self, CriticalCssError> {
        let removed = options.penthouse.sanitize();
        if !removed.is_empty() {
            debug!(
                "[critical-css] Ignoring per-page extraction options: {}",
                removed.join(", ")
            );
        }

        let css_match = options
            .css_match
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| CriticalCssError::invalid_css_match(pattern, e))
            })
            .transpose()?;

        ensure_unique_outputs(&options)?;

        Ok(Self {
            options,
            css_match,
            extractor: Arc::new(extractor),
        })
    }

    /// Effective options, after sanitization
    pub fn options(&self) -> &CriticalCssOptions {
        &self.options
    }

    fn jobs(&self) -> Vec<Job> {
        self.options
            .urls
            .iter()
            .map(|(name, url)| Job::new(name.clone(), url.clone()))
            .collect()
    }

    fn fatal(&self, phase: BuildPhase, error: CriticalCssError) -> fold_build::Error {
        fold_build::Error::plugin(PLUGIN_NAME, phase, error)
    }

    fn report_failures(&self, compilation: &mut Compilation, outcomes: Vec<JobOutcome>) {
        let limit = match self.options.failure_report {
            FailureReport::First => 1,
            FailureReport::All => usize::MAX,
        };

        let failures = outcomes.into_iter().filter_map(|outcome| match outcome {
            JobOutcome::Failed { error, .. } => Some(error),
            _ => None,
        });

        for error in failures.take(limit) {
            let mut diagnostic = BuildDiagnostic::from_error(&error)
                .with_plugin(PLUGIN_NAME)
                .with_phase(BuildPhase::AfterEmit);
            if let CriticalCssError::Extraction { source, .. } = &error {
                if let Some(help) = source.help() {
                    diagnostic = diagnostic.with_help(help.to_string());
                }
            }
            compilation.push_error(diagnostic);
        }
    }
}

impl fmt::Debug for CriticalCssPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriticalCssPlugin")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Two page names must not resolve to the same output file.
fn ensure_unique_outputs(options: &CriticalCssOptions) -> Result<(), CriticalCssError> {
    let mut seen: FxHashMap<String, &str> = FxHashMap::default();
    for name in options.urls.keys() {
        // The build hash is shared by every page, so it cannot separate them.
        let filename = output_filename(name, &options.filename, "");
        if let Some(first) = seen.insert(filename.clone(), name) {
            return Err(CriticalCssError::DuplicateOutput {
                first: first.to_string(),
                second: name.clone(),
                filename,
            });
        }
    }
    Ok(())
}

#[async_trait]
impl BuildPlugin for CriticalCssPlugin {
    type State = CriticalCssBuild;

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(PLUGIN_NAME)
    }

    fn construct_graph(&self, compilation: &mut Compilation) -> fold_build::Result<CriticalCssBuild> {
        reserve::create_virtual_chunk(compilation);
        Ok(CriticalCssBuild::default())
    }

    fn optimize_assets(
        &self,
        compilation: &mut Compilation,
        state: &mut CriticalCssBuild,
    ) -> fold_build::Result<()> {
        let swapped =
            reserve::swap_placeholders(compilation, &self.options.urls, &self.options.filename)
                .map_err(|e| self.fatal(BuildPhase::OptimizeAssets, e))?;

        match swapped {
            Some(reserved) => state.reserved = reserved,
            None => compilation.push_warning(
                BuildDiagnostic::warning(format!(
                    "Chunk '{}' was removed before its outputs could be reserved",
                    reserve::CHUNK_NAME
                ))
                .with_plugin(PLUGIN_NAME)
                .with_phase(BuildPhase::OptimizeAssets)
                .with_help("Another plugin removed the chunk; critical CSS files will not be listed in the build output"),
            ),
        }
        Ok(())
    }

    fn after_compile(
        &self,
        compilation: &mut Compilation,
        state: &mut CriticalCssBuild,
    ) -> fold_build::Result<()> {
        if self.options.urls.is_empty() {
            debug!("[critical-css] No pages configured");
            return Ok(());
        }

        let css = aggregate_css(compilation.assets(), self.css_match.as_ref());
        if css.is_empty() {
            debug!("[critical-css] No stylesheet content to extract from");
            return Ok(());
        }

        debug!(
            "[critical-css] Aggregated {} bytes of stylesheet content",
            css.len()
        );
        state.aggregate_css = Some(Arc::from(css));
        Ok(())
    }

    async fn after_emit(
        &self,
        compilation: &mut Compilation,
        state: CriticalCssBuild,
    ) -> fold_build::Result<()> {
        let Some(css) = state.aggregate_css else {
            return Ok(());
        };

        let jobs = self.jobs();
        let ctx = ExtractionContext {
            css: &css,
            options: &self.options.penthouse,
            extractor: &*self.extractor,
            template: &self.options.filename,
            build_hash: compilation.hash(),
            output_dir: compilation.output_dir(),
        };
        let outcomes = run_jobs(&jobs, ctx, self.options.concurrency)
            .await
            .map_err(|e| self.fatal(BuildPhase::AfterEmit, e))?;

        let written = outcomes
            .iter()
            .filter(|o| matches!(o, JobOutcome::Written { .. }))
            .count();
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        info!(
            "[critical-css] {} of {} pages extracted, {} failed",
            written,
            jobs.len(),
            failed
        );

        self.report_failures(compilation, outcomes);
        Ok(())
    }
}
