//! Controller-binding extraction from Visualforce markup.
//!
//! This is the only markup parsing the scanner does: find the root
//! `<apex:page>` tag and read its `extensions` attribute. Anything else in
//! the document is irrelevant here, so a regex over the tag is enough —
//! no full markup parse, and malformed documents simply yield no names.

use regex::Regex;

/// Extract extension controller names from a page's markup.
///
/// Matching is case-insensitive and accepts single- or double-quoted
/// attribute values. Names are split on commas, trimmed, and returned in
/// declaration order; empty tokens are dropped. A missing tag, missing
/// attribute, or empty value yields an empty list.
///
/// # Panics
///
/// Panics if the hardcoded patterns are invalid (compile-time invariant).
pub fn extract_extensions(body: &str) -> Vec<String> {
    let tag_pattern = Regex::new(r"(?is)<apex:page\b[^>]*>").expect("valid regex");
    let Some(tag) = tag_pattern.find(body) else {
        return Vec::new();
    };

    let attr_pattern =
        Regex::new(r#"(?is)\bextensions\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex");
    let Some(captures) = attr_pattern.captures(tag.as_str()) else {
        return Vec::new();
    };

    let raw = captures
        .get(1)
        .or_else(|| return captures.get(2))
        .map_or("", |value| return value.as_str());

    return raw
        .split(',')
        .map(str::trim)
        .filter(|name| return !name.is_empty())
        .map(String::from)
        .collect();
}
