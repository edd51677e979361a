//! Wildcard query engine.
//!
//! A small pattern language over bank keys. The first rule whose shape the
//! pattern satisfies classifies it, in this order: `all`, comma-separated
//! extension list, `*ext`, `*name.ext`, `@substring`. The comma check runs
//! before the single-extension check, so `png,jpg` is always an extension
//! list. A pattern matching no rule matches no keys.

use once_cell::sync::Lazy;
use regex::Regex;

static EXTENSION_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*\w+$").unwrap());
static FILE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*\w+\.\w+$").unwrap());
static SUBSTRING_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@\w+$").unwrap());

/// Filters candidate bank keys against a wildcard pattern.
pub fn filter(keys: &[String], pattern: &str) -> Vec<String> {
    if pattern == "all" {
        return keys.to_vec();
    }
    if pattern.contains(',') {
        // Extension list: the key must end in a dot plus one listed extension.
        let suffixes: Vec<String> = pattern.split(',').map(|ext| format!(".{ext}")).collect();
        return keys
            .iter()
            .filter(|key| suffixes.iter().any(|suffix| key.ends_with(suffix.as_str())))
            .cloned()
            .collect();
    }
    if EXTENSION_SHAPE.is_match(pattern) {
        // `*ext`: a word character must precede the dot, so `*png` matches
        // `Icon.png` but neither `Icon.xpng` nor a bare `.png`.
        let suffix = format!(".{}", &pattern[1..]);
        return keys
            .iter()
            .filter(|key| {
                key.ends_with(suffix.as_str())
                    && key[..key.len() - suffix.len()]
                        .chars()
                        .next_back()
                        .is_some_and(|c| c.is_alphanumeric() || c == '_')
            })
            .cloned()
            .collect();
    }
    if FILE_SHAPE.is_match(pattern) {
        // `*name.ext`: literal suffix comparison, the dot is not a wildcard.
        let suffix = &pattern[1..];
        return keys.iter().filter(|key| key.ends_with(suffix)).cloned().collect();
    }
    if SUBSTRING_SHAPE.is_match(pattern) {
        let needle = &pattern[1..];
        return keys.iter().filter(|key| key.contains(needle)).cloned().collect();
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_matches_everything() {
        let candidates = keys(&["A.txt", "Images->B.png"]);
        assert_eq!(filter(&candidates, "all"), candidates);
    }

    #[test]
    fn comma_list_wins_over_the_extension_rule() {
        // `png,jpg` also fits the `*ext` shape's spirit, but the comma check
        // runs first and classifies it as an extension list.
        let candidates = keys(&["Images->Icon.png", "Images->Photo.jpg", "Images->Notes.txt"]);
        assert_eq!(
            filter(&candidates, "png,jpg"),
            keys(&["Images->Icon.png", "Images->Photo.jpg"])
        );
    }

    #[test]
    fn star_extension_requires_a_real_dot_boundary() {
        let candidates = keys(&["Images->Icon.png", "Images->Icon.xpng", "Images->Icon.apng"]);
        assert_eq!(filter(&candidates, "*png"), keys(&["Images->Icon.png"]));
    }

    #[test]
    fn star_file_pattern_is_a_literal_suffix() {
        let candidates = keys(&["Images->Icon.png", "Images->BigIcon.png", "Images->Icon.xpng"]);
        assert_eq!(
            filter(&candidates, "*Icon.png"),
            keys(&["Images->Icon.png", "Images->BigIcon.png"])
        );
    }

    #[test]
    fn at_pattern_matches_substrings_anywhere() {
        let candidates = keys(&["Images->Icon.png", "Docs->Readme.txt"]);
        assert_eq!(filter(&candidates, "@con"), keys(&["Images->Icon.png"]));
    }

    #[test]
    fn unclassifiable_patterns_match_nothing() {
        let candidates = keys(&["A.txt", "B.png"]);
        assert!(filter(&candidates, "???").is_empty());
        assert!(filter(&candidates, "*two words").is_empty());
        assert!(filter(&candidates, "").is_empty());
    }
}
