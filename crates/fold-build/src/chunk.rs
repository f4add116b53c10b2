//! Chunk graph: named output units and the modules they contain.
//!
//! The host creates one chunk per entry during make; plugins may add their own
//! chunks (including virtual ones with no real source) before seal. Seal drops
//! chunks without modules and renders one file per module kind for the rest.

use serde::{Deserialize, Serialize};

/// Kind of content a module contributes when its chunk is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Rendered into `<chunk>.js`
    Script,
    /// Rendered into `<chunk>.css`
    Stylesheet,
}

impl ModuleKind {
    /// File extension of the rendered chunk file.
    pub fn extension(&self) -> &'static str {
        match self {
            ModuleKind::Script => "js",
            ModuleKind::Stylesheet => "css",
        }
    }
}

/// A module whose source is given verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModule {
    identifier: String,
    source: String,
    kind: ModuleKind,
}

impl RawModule {
    /// Create a script module.
    pub fn new(identifier: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source: source.into(),
            kind: ModuleKind::Script,
        }
    }

    /// Create a stylesheet module.
    pub fn stylesheet(identifier: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source: source.into(),
            kind: ModuleKind::Stylesheet,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }
}

/// A named output unit.
#[derive(Debug, Clone)]
pub struct Chunk {
    name: String,
    is_virtual: bool,
    modules: Vec<RawModule>,
    files: Vec<String>,
}

impl Chunk {
    fn new(name: String) -> Self {
        Self {
            name,
            is_virtual: false,
            modules: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Virtual chunks have no real page source; they only reserve outputs.
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn set_virtual(&mut self, is_virtual: bool) {
        self.is_virtual = is_virtual;
    }

    pub fn add_module(&mut self, module: RawModule) {
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[RawModule] {
        &self.modules
    }

    /// Output files belonging to this chunk, in render order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn push_file(&mut self, filename: impl Into<String>) {
        self.files.push(filename.into());
    }

    /// Replace the file list, returning the previous one.
    pub fn take_files(&mut self) -> Vec<String> {
        std::mem::take(&mut self.files)
    }
}

/// All chunks of one build, in creation order.
#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
    chunks: Vec<Chunk>,
}

impl ChunkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named chunk, or return the existing chunk with that name.
    pub fn add_chunk(&mut self, name: impl Into<String>) -> &mut Chunk {
        let name = name.into();
        let index = match self.chunks.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.chunks.push(Chunk::new(name));
                self.chunks.len() - 1
            }
        };
        &mut self.chunks[index]
    }

    pub fn named_chunk(&self, name: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.name == name)
    }

    pub fn named_chunk_mut(&mut self, name: &str) -> Option<&mut Chunk> {
        self.chunks.iter_mut().find(|c| c.name == name)
    }

    /// Remove a chunk by name.
    pub fn remove_chunk(&mut self, name: &str) -> Option<Chunk> {
        let index = self.chunks.iter().position(|c| c.name == name)?;
        Some(self.chunks.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drop chunks that contain no modules. Returns how many were removed.
    pub fn remove_empty_chunks(&mut self) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| !c.modules.is_empty());
        before - self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_chunk_is_idempotent_by_name() {
        let mut graph = ChunkGraph::new();
        graph.add_chunk("main").add_module(RawModule::new("a.js", "a"));
        graph.add_chunk("main").add_module(RawModule::new("b.js", "b"));

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.named_chunk("main").unwrap().modules().len(), 2);
    }

    #[test]
    fn test_remove_empty_chunks_keeps_chunks_with_modules() {
        let mut graph = ChunkGraph::new();
        graph.add_chunk("empty");
        let virtual_chunk = graph.add_chunk("virtual");
        virtual_chunk.set_virtual(true);
        virtual_chunk.add_module(RawModule::new("virtual-module", ""));

        assert_eq!(graph.remove_empty_chunks(), 1);
        assert!(graph.named_chunk("empty").is_none());
        assert!(graph.named_chunk("virtual").unwrap().is_virtual());
    }

    #[test]
    fn test_take_files() {
        let mut graph = ChunkGraph::new();
        let chunk = graph.add_chunk("main");
        chunk.push_file("main.js");
        chunk.push_file("main.css");

        let files = chunk.take_files();
        assert_eq!(files, vec!["main.js", "main.css"]);
        assert!(chunk.files().is_empty());
    }

    #[test]
    fn test_module_kind_extension() {
        assert_eq!(RawModule::new("a", "").kind().extension(), "js");
        assert_eq!(RawModule::stylesheet("a", "").kind().extension(), "css");
    }
}
