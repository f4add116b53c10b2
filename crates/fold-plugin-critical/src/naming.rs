//! Output file naming.

/// Replaced by the slugified page name.
pub const NAME_PLACEHOLDER: &str = "[name]";

/// Replaced by the build hash.
pub const HASH_PLACEHOLDER: &str = "[hash]";

/// Normalize a page name into a filename-safe token.
pub fn slugify(name: &str) -> String {
    rslug::slugify!(name)
}

/// Resolve the output filename for one page.
///
/// The first `[name]` becomes the slugified name; a template without `[name]`
/// gets `<slug>.` appended instead. The first `[hash]` then becomes
/// `build_hash`. Nothing else in the template is interpreted.
///
/// ```
/// use fold_plugin_critical::naming::output_filename;
///
/// assert_eq!(
///     output_filename("About Us", "[name].[hash].css", "4f2a"),
///     "about-us.4f2a.css"
/// );
/// ```
pub fn output_filename(name: &str, template: &str, build_hash: &str) -> String {
    let slug = slugify(name);

    let named = if template.contains(NAME_PLACEHOLDER) {
        template.replacen(NAME_PLACEHOLDER, &slug, 1)
    } else {
        format!("{}{}.", template, slug)
    };

    named.replacen(HASH_PLACEHOLDER, build_hash, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_template() {
        assert_eq!(
            output_filename("home", "[name].critical.css", "abc"),
            "home.critical.css"
        );
    }

    #[test]
    fn test_name_is_slugified() {
        assert_eq!(slugify("Landing Page"), "landing-page");
        assert_eq!(
            output_filename("Landing Page", "[name].css", "abc"),
            "landing-page.css"
        );
    }

    #[test]
    fn test_template_without_name_appends() {
        assert_eq!(output_filename("home", "critical-", "abc"), "critical-home.");
    }

    #[test]
    fn test_hash_substitution() {
        assert_eq!(
            output_filename("home", "css/[name].[hash].css", "0123456789"),
            "css/home.0123456789.css"
        );
    }

    #[test]
    fn test_only_first_placeholder_is_replaced() {
        assert_eq!(
            output_filename("home", "[name]/[name].[hash].[hash]", "h"),
            "home/[name].h.[hash]"
        );
    }

    proptest! {
        #[test]
        fn prop_name_substituted_once(
            prefix in "[a-z/]{0,8}",
            suffix in "[a-z.]{0,8}",
            name in "[a-z0-9]{1,12}",
        ) {
            let template = format!("{}[name]{}", prefix, suffix);
            let resolved = output_filename(&name, &template, "hash");

            prop_assert_eq!(resolved, format!("{}{}{}", prefix, name, suffix));
        }

        #[test]
        fn prop_without_name_appends_slug(
            template in "[a-z./-]{0,16}",
            name in "[a-z0-9]{1,12}",
        ) {
            let resolved = output_filename(&name, &template, "hash");
            prop_assert_eq!(resolved, format!("{}{}.", template, slugify(&name)));
        }

        #[test]
        fn prop_hash_is_bound(
            name in "[A-Za-z ]{1,12}",
            hash in "[0-9a-f]{20}",
        ) {
            let resolved = output_filename(&name, "[name].[hash].css", &hash);
            prop_assert!(resolved.contains(&hash));
            prop_assert!(!resolved.contains(HASH_PLACEHOLDER));
        }

        #[test]
        fn prop_resolution_is_deterministic(
            name in "\\PC{0,16}",
            template in "\\PC{0,24}",
            hash in "[0-9a-f]{8}",
        ) {
            prop_assert_eq!(
                output_filename(&name, &template, &hash),
                output_filename(&name, &template, &hash)
            );
        }
    }
}
