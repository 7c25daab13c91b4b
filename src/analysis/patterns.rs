//! Glob matching of file paths against category and ignore patterns.
//!
//! Patterns follow glob semantics (`*`, `**`), are case-sensitive, and
//! include dot-files. A pattern without a `/` matches against the path's
//! base name, so `*.env` matches `config/.env` style layouts the way
//! gitignore-trained users expect.

use globset::{GlobBuilder, GlobMatcher};
use tracing::warn;

/// Compiles a single glob pattern.
///
/// Invalid patterns are logged and yield `None`; matching treats them as
/// non-matching rather than failing the analysis.
fn compile(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Ignoring invalid glob pattern");
            None
        }
    }
}

/// Returns the base name of a path (the final `/`-separated segment).
fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Checks whether `path` matches `pattern`.
///
/// A pattern containing a `/` is matched against the full path; a bare
/// pattern is matched against the base name only.
pub fn matches(path: &str, pattern: &str) -> bool {
    let Some(matcher) = compile(pattern) else {
        return false;
    };

    if pattern.contains('/') {
        matcher.is_match(path)
    } else {
        matcher.is_match(base_name(path))
    }
}

/// Checks whether `path` matches any of `patterns`.
pub fn matches_any(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| matches(path, p))
}

/// Filters out paths matching any ignore pattern.
///
/// Ignored files are excluded from all analysis before any scoring or
/// scanning runs.
pub fn filter_ignored<T, F>(items: Vec<T>, ignore_patterns: &[String], path_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    if ignore_patterns.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| !matches_any(path_of(item), ignore_patterns))
        .collect()
}
