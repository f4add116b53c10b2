//! Stylesheet aggregation.

use fold_build::AssetTable;
use regex::Regex;

/// Extension of assets that feed extraction
pub const STYLESHEET_EXTENSION: &str = ".css";

/// Concatenate every stylesheet asset into one string.
///
/// Assets are taken in table order and joined without a separator. With
/// `css_match`, only asset names the pattern matches are included.
pub fn aggregate_css(assets: &AssetTable, css_match: Option<&Regex>) -> String {
    assets
        .iter()
        .filter(|(name, _)| name.ends_with(STYLESHEET_EXTENSION))
        .filter(|(name, _)| css_match.is_none_or(|pattern| pattern.is_match(name)))
        .map(|(_, source)| source.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fold_build::RawSource;

    fn table() -> AssetTable {
        let mut assets = AssetTable::new();
        assets.insert("main.js", RawSource::from("console.log(1)"));
        assets.insert("main.css", RawSource::from("body{margin:0}"));
        assets.insert("vendor.css", RawSource::from(".btn{color:red}"));
        assets.insert("main.css.map", RawSource::from("{}"));
        assets
    }

    #[test]
    fn test_concatenates_stylesheets_in_order() {
        assert_eq!(
            aggregate_css(&table(), None),
            "body{margin:0}.btn{color:red}"
        );
    }

    #[test]
    fn test_pattern_restricts_assets() {
        let pattern = Regex::new("^vendor").unwrap();
        assert_eq!(aggregate_css(&table(), Some(&pattern)), ".btn{color:red}");
    }

    #[test]
    fn test_pattern_cannot_admit_non_stylesheets() {
        let pattern = Regex::new("main").unwrap();
        assert_eq!(aggregate_css(&table(), Some(&pattern)), "body{margin:0}");
    }

    #[test]
    fn test_no_stylesheets_is_empty() {
        let mut assets = AssetTable::new();
        assets.insert("main.js", RawSource::from("console.log(1)"));
        assert!(aggregate_css(&assets, None).is_empty());
    }
}
