//! Conventional-commit scope inference from monorepo layouts.
//!
//! A pattern like `packages/*` names a package root; the first path
//! segment after the fixed prefix is the scope candidate. When every
//! changed file agrees on one scope it becomes the commit scope; files
//! spanning several packages yield no scope, which is the primary trigger
//! for split suggestions.

use std::collections::BTreeSet;

use crate::analysis::FileChange;

/// Bucket for files outside every monorepo pattern.
pub const ROOT_SCOPE: &str = "root";

/// Extracts the scope candidate for one path.
///
/// Returns `None` when the path sits outside every monorepo pattern; the
/// split planner groups such files under [`ROOT_SCOPE`].
pub fn scope_of(path: &str, monorepo_patterns: &[String]) -> Option<String> {
    for pattern in monorepo_patterns {
        let prefix = fixed_prefix(pattern);
        if prefix.is_empty() {
            continue;
        }
        if let Some(rest) = path.strip_prefix(prefix) {
            if let Some(rest) = rest.strip_prefix('/') {
                // The scope is the directory segment; a file directly under
                // the prefix (e.g. packages/README.md) has no scope.
                let segment = rest.split('/').next().unwrap_or("");
                if !segment.is_empty() && rest.contains('/') {
                    return Some(segment.to_string());
                }
            }
        }
    }
    None
}

/// Infers a single commit scope from a set of changed files.
///
/// Returns `Some(scope)` only when every file resolves to the same scope.
/// Mixed scopes, root-level files mixed with package files, and
/// non-monorepo layouts all yield `None`.
pub fn detect_scope(files: &[FileChange], monorepo_patterns: &[String]) -> Option<String> {
    if files.is_empty() {
        return None;
    }

    let mut scopes = BTreeSet::new();
    for file in files {
        match scope_of(&file.path, monorepo_patterns) {
            Some(scope) => {
                scopes.insert(scope);
            }
            None => return None,
        }
    }

    if scopes.len() == 1 {
        scopes.into_iter().next()
    } else {
        None
    }
}

/// Groups files by scope, with non-matching files under [`ROOT_SCOPE`].
///
/// Group order follows first appearance in the input, so suggestions are
/// stable for identical inputs.
pub fn group_by_scope<'a>(
    files: &'a [FileChange],
    monorepo_patterns: &[String],
) -> Vec<(String, Vec<&'a FileChange>)> {
    let mut groups: Vec<(String, Vec<&FileChange>)> = Vec::new();
    for file in files {
        let scope =
            scope_of(&file.path, monorepo_patterns).unwrap_or_else(|| ROOT_SCOPE.to_string());
        match groups.iter_mut().find(|(name, _)| *name == scope) {
            Some((_, members)) => members.push(file),
            None => groups.push((scope, vec![file])),
        }
    }
    groups
}

/// Literal prefix of a pattern up to its first wildcard, without the
/// trailing separator.
fn fixed_prefix(pattern: &str) -> &str {
    let end = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
    pattern[..end].trim_end_matches('/')
}
