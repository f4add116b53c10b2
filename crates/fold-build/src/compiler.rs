//! Build driver.
//!
//! [`Compiler`] owns the build inputs and runs one plugin through the phase
//! sequence. Each call to [`Compiler::run`] creates a fresh [`Compilation`].

use std::path::PathBuf;

use tracing::{debug, info};

use crate::Result;
use crate::asset::{AssetTable, RawSource};
use crate::chunk::{ChunkGraph, RawModule};
use crate::compilation::Compilation;
use crate::diagnostics::BuildDiagnostic;
use crate::output::writer::write_assets_to;
use crate::plugin::{BuildPhase, BuildPlugin};

/// Where a build reads from and writes to.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Project directory that relative paths resolve against
    pub context: PathBuf,
    /// Directory emit writes assets into
    pub output_dir: PathBuf,
}

impl CompilerOptions {
    pub fn new(context: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// Build inputs plus the phase driver.
#[derive(Debug, Clone)]
pub struct Compiler {
    options: CompilerOptions,
    entries: Vec<(String, Vec<RawModule>)>,
    assets: Vec<(String, RawSource)>,
}

/// Result of a finished build.
#[derive(Debug)]
pub struct BuildOutput {
    pub hash: String,
    pub output_dir: PathBuf,
    pub assets: AssetTable,
    pub chunks: ChunkGraph,
    pub errors: Vec<BuildDiagnostic>,
    pub warnings: Vec<BuildDiagnostic>,
}

impl BuildOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl From<Compilation> for BuildOutput {
    fn from(mut compilation: Compilation) -> Self {
        let assets = std::mem::take(compilation.assets_mut());
        let chunks = std::mem::take(compilation.chunks_mut());
        Self {
            hash: compilation.hash().to_string(),
            output_dir: compilation.output_dir().to_path_buf(),
            errors: compilation.errors().to_vec(),
            warnings: compilation.warnings().to_vec(),
            assets,
            chunks,
        }
    }
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            entries: Vec::new(),
            assets: Vec::new(),
        }
    }

    /// Add an entry chunk with its modules.
    pub fn entry(mut self, name: impl Into<String>, modules: Vec<RawModule>) -> Self {
        self.entries.push((name.into(), modules));
        self
    }

    /// Add a static asset that is copied to the output as-is.
    pub fn asset(mut self, filename: impl Into<String>, content: impl Into<RawSource>) -> Self {
        self.assets.push((filename.into(), content.into()));
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Run one build with `plugin`.
    ///
    /// Phases run strictly in order, once each. A plugin `Err` aborts the
    /// build; diagnostics pushed onto the compilation are returned in
    /// [`BuildOutput`].
    pub async fn run<P: BuildPlugin>(&self, plugin: &P) -> Result<BuildOutput> {
        let plugin_name = plugin.name();
        let mut compilation =
            Compilation::new(&self.options.context, &self.options.output_dir);

        // make
        for (name, modules) in &self.entries {
            let chunk = compilation.chunks_mut().add_chunk(name.clone());
            for module in modules {
                chunk.add_module(module.clone());
            }
        }
        for (filename, source) in &self.assets {
            compilation
                .assets_mut()
                .insert(filename.clone(), source.clone());
        }

        debug!("[fold] {} → {}", BuildPhase::ConstructGraph, plugin_name);
        let mut state = plugin.construct_graph(&mut compilation)?;

        compilation.seal();

        debug!("[fold] {} → {}", BuildPhase::OptimizeAssets, plugin_name);
        plugin.optimize_assets(&mut compilation, &mut state)?;

        debug!("[fold] {} → {}", BuildPhase::AfterCompile, plugin_name);
        plugin.after_compile(&mut compilation, &mut state)?;

        // emit
        write_assets_to(compilation.assets(), compilation.output_dir())?;
        debug!(
            "[fold] Emitted {} assets to {}",
            compilation.assets().len(),
            compilation.output_dir().display()
        );

        debug!("[fold] {} → {}", BuildPhase::AfterEmit, plugin_name);
        plugin.after_emit(&mut compilation, state).await?;

        info!(
            "[fold] Build {} finished: {} assets, {} errors, {} warnings",
            compilation.hash(),
            compilation.assets().len(),
            compilation.errors().len(),
            compilation.warnings().len()
        );

        Ok(BuildOutput::from(compilation))
    }
}
