//! Output reservation.
//!
//! Critical CSS is produced after emit, but later build stages need to see the
//! final filenames earlier. A virtual chunk claims the outputs during graph
//! construction; after seal, its placeholder file is swapped for one empty
//! file per page, written to disk and registered as an asset.

use std::path::Path;
use std::sync::Arc;

use fold_build::output::write_file_atomic;
use fold_build::{AssetSource, Compilation, RawModule, RawSource};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::CriticalCssError;
use crate::naming::output_filename;

/// Name of the virtual chunk holding the reserved outputs
pub const CHUNK_NAME: &str = "criticalcss";

/// Identifier of the empty module that keeps the chunk alive through seal
pub const MODULE_IDENTIFIER: &str = "criticalcss-module";

/// Add the virtual chunk to the graph.
pub fn create_virtual_chunk(compilation: &mut Compilation) {
    let chunk = compilation.chunks_mut().add_chunk(CHUNK_NAME);
    chunk.set_virtual(true);
    chunk.add_module(RawModule::new(MODULE_IDENTIFIER, ""));
}

/// Replace the virtual chunk's placeholder with one empty output per page.
///
/// Returns the resolved filenames, which are also the chunk's new file list,
/// or `None` when the chunk is no longer in the graph.
pub fn swap_placeholders(
    compilation: &mut Compilation,
    urls: &IndexMap<String, String>,
    template: &str,
) -> Result<Option<Vec<String>>, CriticalCssError> {
    let placeholders = match compilation.chunks_mut().named_chunk_mut(CHUNK_NAME) {
        Some(chunk) => chunk.take_files(),
        None => return Ok(None),
    };
    if let Some(first) = placeholders.first() {
        compilation.assets_mut().remove(first);
    }

    let output_dir = compilation.output_dir().to_path_buf();
    let mut reserved = Vec::with_capacity(urls.len());
    for name in urls.keys() {
        let filename = output_filename(name, template, compilation.hash());
        let path = write_file_atomic(&output_dir, &filename, b"")?;
        let key = register_file_asset(compilation, &path)?;
        debug!("[critical-css] Reserved {} as asset '{}'", filename, key);
        reserved.push(filename);
    }

    if let Some(chunk) = compilation.chunks_mut().named_chunk_mut(CHUNK_NAME) {
        for filename in &reserved {
            chunk.push_file(filename.clone());
        }
    }

    Ok(Some(reserved))
}

/// Read a file from disk into the asset table, keyed by its base name.
///
/// Relative paths resolve against the compilation's context directory.
/// Returns the asset key.
pub fn register_file_asset(
    compilation: &mut Compilation,
    path: &Path,
) -> Result<String, CriticalCssError> {
    let path = compilation.context().join(path);
    #[allow(clippy::disallowed_methods)]
    let bytes = std::fs::read(&path).map_err(|e| CriticalCssError::read_slot(path.clone(), e))?;

    let key = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let source: Arc<dyn AssetSource> = Arc::new(RawSource::new(bytes));
    compilation.assets_mut().insert_shared(key.clone(), source);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sealed_compilation(project: &TempDir) -> Compilation {
        let mut compilation = Compilation::new(project.path(), project.path().join("dist"));
        create_virtual_chunk(&mut compilation);
        compilation.seal();
        compilation
    }

    fn urls(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect()
    }

    #[test]
    fn test_virtual_chunk_survives_seal() {
        let project = TempDir::new().unwrap();
        let compilation = sealed_compilation(&project);

        let chunk = compilation.chunks().named_chunk(CHUNK_NAME).unwrap();
        assert!(chunk.is_virtual());
        assert_eq!(chunk.files(), ["criticalcss.js"]);
        assert!(compilation.assets().contains("criticalcss.js"));
    }

    #[test]
    fn test_swap_reserves_one_empty_output_per_page() {
        let project = TempDir::new().unwrap();
        let mut compilation = sealed_compilation(&project);

        let reserved = swap_placeholders(
            &mut compilation,
            &urls(&[("Home", "https://x.test/"), ("about", "https://x.test/about")]),
            "[name].critical.css",
        )
        .unwrap()
        .unwrap();

        assert_eq!(reserved, ["home.critical.css", "about.critical.css"]);
        let chunk = compilation.chunks().named_chunk(CHUNK_NAME).unwrap();
        assert_eq!(chunk.files(), reserved.as_slice());

        assert!(!compilation.assets().contains("criticalcss.js"));
        assert_eq!(compilation.assets().get("home.critical.css").unwrap().size(), 0);

        let on_disk = project.path().join("dist").join("about.critical.css");
        assert_eq!(std::fs::metadata(on_disk).unwrap().len(), 0);
    }

    #[test]
    fn test_nested_template_is_keyed_by_base_name() {
        let project = TempDir::new().unwrap();
        let mut compilation = sealed_compilation(&project);
        let hash = compilation.hash().to_string();

        let reserved = swap_placeholders(
            &mut compilation,
            &urls(&[("home", "https://x.test/")]),
            "critical/[name].[hash].css",
        )
        .unwrap()
        .unwrap();

        let expected = format!("critical/home.{}.css", hash);
        assert_eq!(reserved, [expected.clone()]);
        assert!(project.path().join("dist").join(&expected).exists());
        assert!(compilation.assets().contains(&format!("home.{}.css", hash)));
    }

    #[test]
    fn test_no_pages_clears_placeholder() {
        let project = TempDir::new().unwrap();
        let mut compilation = sealed_compilation(&project);

        let reserved = swap_placeholders(&mut compilation, &IndexMap::new(), "[name].css")
            .unwrap()
            .unwrap();

        assert!(reserved.is_empty());
        assert!(compilation.assets().is_empty());
        assert!(!project.path().join("dist").exists());
    }

    #[test]
    fn test_missing_chunk_is_reported() {
        let project = TempDir::new().unwrap();
        let mut compilation = sealed_compilation(&project);
        compilation.chunks_mut().remove_chunk(CHUNK_NAME);

        let reserved =
            swap_placeholders(&mut compilation, &urls(&[("home", "https://x.test/")]), "[name].css")
                .unwrap();

        assert!(reserved.is_none());
    }

    #[test]
    fn test_register_file_asset_resolves_against_context() {
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("inline.css"), "h1{}").unwrap();
        let mut compilation = Compilation::new(project.path(), project.path().join("dist"));

        let key = register_file_asset(&mut compilation, Path::new("inline.css")).unwrap();

        assert_eq!(key, "inline.css");
        let asset = compilation.assets().get("inline.css").unwrap();
        assert_eq!(asset.size(), 4);
        assert_eq!(asset.text(), "h1{}");
    }

    #[test]
    fn test_register_missing_file_fails() {
        let project = TempDir::new().unwrap();
        let mut compilation = Compilation::new(project.path(), project.path().join("dist"));

        let err = register_file_asset(&mut compilation, Path::new("missing.css")).unwrap_err();
        assert!(matches!(err, CriticalCssError::ReadSlot { .. }));
    }
}
