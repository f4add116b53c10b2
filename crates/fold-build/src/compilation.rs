//! Per-build compilation context.
//!
//! A `Compilation` is created at the start of every build and discarded when
//! the build finishes. Nothing in it survives across builds.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::asset::{AssetTable, RawSource};
use crate::chunk::{ChunkGraph, ModuleKind};
use crate::diagnostics::BuildDiagnostic;

/// Length of the hex build hash.
const HASH_LENGTH: usize = 20;

/// Mutable state of a single build.
#[derive(Debug)]
pub struct Compilation {
    context: PathBuf,
    output_dir: PathBuf,
    hash: String,
    assets: AssetTable,
    chunks: ChunkGraph,
    errors: Vec<BuildDiagnostic>,
    warnings: Vec<BuildDiagnostic>,
}

impl Compilation {
    /// Create an empty compilation.
    ///
    /// `context` is the project directory relative paths resolve against;
    /// `output_dir` is where emit writes assets.
    pub fn new(context: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
            output_dir: output_dir.into(),
            hash: String::new(),
            assets: AssetTable::new(),
            chunks: ChunkGraph::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Content hash of this build. Empty until seal.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetTable {
        &mut self.assets
    }

    pub fn chunks(&self) -> &ChunkGraph {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkGraph {
        &mut self.chunks
    }

    pub fn errors(&self) -> &[BuildDiagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[BuildDiagnostic] {
        &self.warnings
    }

    pub fn push_error(&mut self, diagnostic: BuildDiagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn push_warning(&mut self, diagnostic: BuildDiagnostic) {
        self.warnings.push(diagnostic);
    }

    /// Seal the chunk graph: drop empty chunks, compute the build hash, and
    /// render every chunk into the asset table.
    ///
    /// Each chunk gets one file per module kind it contains (`<name>.js`,
    /// `<name>.css`), with module sources joined by newlines.
    pub fn seal(&mut self) {
        let removed = self.chunks.remove_empty_chunks();
        if removed > 0 {
            debug!("[fold] Removed {} empty chunks", removed);
        }

        self.hash = self.compute_hash();

        for chunk in self.chunks.iter_mut() {
            for kind in [ModuleKind::Script, ModuleKind::Stylesheet] {
                let sources: Vec<&str> = chunk
                    .modules()
                    .iter()
                    .filter(|m| m.kind() == kind)
                    .map(|m| m.source())
                    .collect();
                if sources.is_empty() {
                    continue;
                }

                let filename = format!("{}.{}", chunk.name(), kind.extension());
                self.assets
                    .insert(filename.clone(), RawSource::from(sources.join("\n")));
                chunk.push_file(filename);
            }
        }

        debug!(
            "[fold] Sealed {} chunks into {} assets (hash {})",
            self.chunks.len(),
            self.assets.len(),
            self.hash
        );
    }

    fn compute_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for chunk in self.chunks.iter() {
            hasher.update(chunk.name().as_bytes());
            for module in chunk.modules() {
                hasher.update(module.identifier().as_bytes());
                hasher.update(module.source().as_bytes());
            }
        }
        for (name, source) in self.assets.iter() {
            hasher.update(name.as_bytes());
            hasher.update(&source.source());
        }
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..HASH_LENGTH].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetSource;
    use crate::chunk::RawModule;

    fn compilation_with_main() -> Compilation {
        let mut compilation = Compilation::new("/project", "/project/dist");
        let chunk = compilation.chunks_mut().add_chunk("main");
        chunk.add_module(RawModule::new("./index.js", "console.log(1)"));
        chunk.add_module(RawModule::stylesheet("./index.css", "body{margin:0}"));
        compilation
    }

    #[test]
    fn test_seal_renders_chunk_files() {
        let mut compilation = compilation_with_main();
        compilation.seal();

        let chunk = compilation.chunks().named_chunk("main").unwrap();
        assert_eq!(chunk.files(), ["main.js", "main.css"]);
        assert_eq!(
            compilation.assets().get("main.css").unwrap().text(),
            "body{margin:0}"
        );
    }

    #[test]
    fn test_seal_computes_stable_hash() {
        let mut a = compilation_with_main();
        let mut b = compilation_with_main();
        a.seal();
        b.seal();

        assert_eq!(a.hash().len(), HASH_LENGTH);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let mut a = compilation_with_main();
        let mut b = compilation_with_main();
        b.chunks_mut()
            .add_chunk("main")
            .add_module(RawModule::new("./other.js", "console.log(2)"));
        a.seal();
        b.seal();

        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_seal_drops_empty_chunks() {
        let mut compilation = compilation_with_main();
        compilation.chunks_mut().add_chunk("empty");
        compilation.seal();

        assert!(compilation.chunks().named_chunk("empty").is_none());
        assert!(!compilation.assets().contains("empty.js"));
    }

    #[test]
    fn test_empty_script_module_still_renders() {
        let mut compilation = Compilation::new("/project", "/project/dist");
        compilation
            .chunks_mut()
            .add_chunk("placeholder")
            .add_module(RawModule::new("placeholder-module", ""));
        compilation.seal();

        assert_eq!(compilation.assets().get("placeholder.js").unwrap().size(), 0);
    }
}
