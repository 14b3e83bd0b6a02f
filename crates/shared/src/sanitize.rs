//! Filesystem-safe name mapping for artifact files.

use std::sync::LazyLock;

use regex::Regex;

/// Map display text to a filesystem-safe file stem.
///
/// Removes the characters `\ / : * ? " < > |`, trims surrounding whitespace,
/// and replaces internal spaces with `_`. Deterministic; no state.
pub fn sanitize_name(text: &str) -> String {
    static FORBIDDEN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid regex"));

    FORBIDDEN_RE
        .replace_all(text, "")
        .trim()
        .replace(' ', "_")
}
