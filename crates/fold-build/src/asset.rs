//! Asset table for build outputs.
//!
//! Every file a build produces is tracked here by its output filename until
//! emit writes it to disk. Entries are content/size provider pairs so plugins
//! can register lazily computed or pre-existing files alongside rendered chunks.
//! Iteration follows insertion order.

use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Content provider for a single build asset.
pub trait AssetSource: Send + Sync + fmt::Debug {
    /// Raw bytes of the asset.
    fn source(&self) -> Cow<'_, [u8]>;

    /// Size of the asset in bytes.
    fn size(&self) -> usize {
        self.source().len()
    }

    /// Asset content decoded as UTF-8 (lossy).
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.source()).into_owned()
    }
}

/// In-memory asset content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSource {
    bytes: Arc<[u8]>,
}

impl RawSource {
    /// Create a source from owned bytes or a string.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    /// A zero-byte source.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl From<&str> for RawSource {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<String> for RawSource {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl AssetSource for RawSource {
    fn source(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.bytes[..])
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Ordered mapping of output filename to asset content.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    assets: IndexMap<String, Arc<dyn AssetSource>>,
}

impl AssetTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an asset, returning the previous entry if any.
    ///
    /// Replacing keeps the entry's original position.
    pub fn insert(
        &mut self,
        filename: impl Into<String>,
        source: impl AssetSource + 'static,
    ) -> Option<Arc<dyn AssetSource>> {
        self.assets.insert(filename.into(), Arc::new(source))
    }

    /// Insert a shared source.
    pub fn insert_shared(
        &mut self,
        filename: impl Into<String>,
        source: Arc<dyn AssetSource>,
    ) -> Option<Arc<dyn AssetSource>> {
        self.assets.insert(filename.into(), source)
    }

    /// Remove an asset, preserving the order of the remaining entries.
    pub fn remove(&mut self, filename: &str) -> Option<Arc<dyn AssetSource>> {
        self.assets.shift_remove(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&Arc<dyn AssetSource>> {
        self.assets.get(filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.assets.contains_key(filename)
    }

    /// Filenames in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    /// `(filename, source)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn AssetSource>)> {
        self.assets.iter().map(|(name, source)| (name.as_str(), source))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut table = AssetTable::new();
        table.insert("main.css", RawSource::from("body{}"));

        let asset = table.get("main.css").unwrap();
        assert_eq!(asset.text(), "body{}");
        assert_eq!(asset.size(), 6);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut table = AssetTable::new();
        table.insert("a.css", RawSource::from("a"));
        table.insert("b.css", RawSource::from("b"));
        let previous = table.insert("a.css", RawSource::from("aa"));

        assert_eq!(previous.unwrap().text(), "a");
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["a.css", "b.css"]);
        assert_eq!(table.get("a.css").unwrap().text(), "aa");
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut table = AssetTable::new();
        table.insert("a.js", RawSource::empty());
        table.insert("b.js", RawSource::empty());
        table.insert("c.js", RawSource::empty());

        assert!(table.remove("b.js").is_some());
        assert!(table.remove("missing.js").is_none());
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["a.js", "c.js"]);
    }

    #[test]
    fn test_size_counts_bytes_not_chars() {
        let source = RawSource::from("é");
        assert_eq!(source.size(), 2);
    }
}
