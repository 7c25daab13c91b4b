//! Commit and PR split planning.
//!
//! Partitions a set of changed files into disjoint, cohesive groups along
//! scope boundaries, synthesizes a conventional-commit message per group,
//! validates user selections for coverage and duplication, and emits the
//! git command sequence that reproduces a chosen split. Command generation
//! is pure string assembly; execution belongs to the git collaborator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::patterns;
use crate::analysis::scope::{group_by_scope, ROOT_SCOPE};
use crate::analysis::FileChange;
use crate::config::{CategoryPatterns, GitGuardConfig};

/// One proposed commit in a split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitGroup {
    /// Files belonging to this commit.
    pub files: Vec<String>,
    /// Full conventional-commit message.
    pub message: String,
    /// Conventional-commit type (`feat`, `test`, `chore`, ...).
    pub commit_type: String,
    /// Inferred scope, absent for the root bucket.
    pub scope: Option<String>,
}

/// A proposed partition of staged changes into multiple commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSplitSuggestion {
    /// Why a split is proposed.
    pub reason: String,
    /// Ordered commit groups; together they cover every input file.
    pub suggestions: Vec<SplitGroup>,
    /// Git commands reproducing the full split.
    pub commands: Vec<String>,
}

/// One proposed PR in a branch split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrGroup {
    /// Files belonging to this PR.
    pub files: Vec<String>,
    /// PR title in conventional-commit form.
    pub title: String,
    /// Branch name to create for this PR.
    pub branch: String,
    /// Conventional-commit type.
    pub commit_type: String,
    /// Inferred scope, absent for the root bucket.
    pub scope: Option<String>,
    /// Merge order; PRs with lower order merge first.
    pub order: usize,
}

/// A proposed partition of one branch's diff into multiple PRs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrSplitSuggestion {
    /// Why a split is proposed.
    pub reason: String,
    /// Ordered PR groups; together they cover every input file.
    pub suggested_prs: Vec<PrGroup>,
    /// Git commands reproducing the full split.
    pub commands: Vec<String>,
}

/// Outcome of validating a split selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitValidation {
    /// True iff no duplicates, no unknown files, and (when checked) no
    /// missing files.
    pub is_valid: bool,
    /// Original files not covered by the selection.
    pub missing_files: Vec<String>,
    /// Files referenced by more than one selected group.
    pub duplicate_files: Vec<String>,
    /// Files referenced by a selected group but absent from the original
    /// change set.
    pub unknown_files: Vec<String>,
}

/// Proposes a commit split by grouping files along scope boundaries.
///
/// Returns `None` when the files form a single cohesive group; a split
/// with one commit would be the status quo.
pub fn suggest_commit_split(
    files: &[FileChange],
    config: &GitGuardConfig,
) -> Option<CommitSplitSuggestion> {
    let groups = scope_groups(files, config);
    if groups.len() < 2 {
        debug!(groups = groups.len(), "No commit split needed");
        return None;
    }

    let suggestions: Vec<SplitGroup> = groups
        .into_iter()
        .map(|(scope, members)| {
            let commit_type = infer_commit_type(&members, &config.complexity.patterns);
            let message = synthesize_message(&commit_type, &scope, members.len());
            SplitGroup {
                files: members.iter().map(|f| f.path.clone()).collect(),
                message,
                commit_type,
                scope: scope_field(&scope),
            }
        })
        .collect();

    let commands = commit_split_commands(&suggestions);
    let scopes: Vec<Option<String>> = suggestions.iter().map(|s| s.scope.clone()).collect();
    Some(CommitSplitSuggestion {
        reason: split_reason(&scopes),
        suggestions,
        commands,
    })
}

/// Proposes a PR split for one branch's diff against its base.
///
/// Groups follow the same scope boundaries as commit splits; the root
/// bucket merges first since package changes commonly depend on shared
/// root configuration.
pub fn suggest_pr_split(
    files: &[FileChange],
    base_branch: &str,
    current_branch: &str,
    config: &GitGuardConfig,
) -> Option<PrSplitSuggestion> {
    let groups = scope_groups(files, config);
    if groups.len() < 2 {
        debug!(groups = groups.len(), "No PR split needed");
        return None;
    }

    let mut ordered: Vec<(String, Vec<&FileChange>)> = groups;
    // Root-level changes merge first.
    ordered.sort_by_key(|(scope, _)| usize::from(scope != ROOT_SCOPE));

    let suggested_prs: Vec<PrGroup> = ordered
        .into_iter()
        .enumerate()
        .map(|(index, (scope, members))| {
            let commit_type = infer_commit_type(&members, &config.complexity.patterns);
            PrGroup {
                files: members.iter().map(|f| f.path.clone()).collect(),
                title: synthesize_message(&commit_type, &scope, members.len()),
                branch: format!("{current_branch}-split-{}-{scope}", index + 1),
                commit_type,
                scope: scope_field(&scope),
                order: index + 1,
            }
        })
        .collect();

    let commands = pr_split_commands(&suggested_prs, base_branch, current_branch);
    let scopes: Vec<Option<String>> = suggested_prs.iter().map(|s| s.scope.clone()).collect();
    Some(PrSplitSuggestion {
        reason: split_reason(&scopes),
        suggested_prs,
        commands,
    })
}

/// Validates a selection of split groups against the original file set.
///
/// `duplicate_files` and `unknown_files` are always checked: a selection
/// must be drawn from the original change set, never invent paths.
/// `missing_files` is only checked when `validate_missing_files` is true
/// (the caller sets it when the whole suggestion set is selected, so full
/// coverage is required). Out-of-range indices are ignored.
pub fn validate_split_selection(
    selected_indices: &[usize],
    suggestion_file_sets: &[Vec<String>],
    files: &[FileChange],
    validate_missing_files: bool,
) -> SplitValidation {
    let mut seen: Vec<&str> = Vec::new();
    let mut duplicate_files: Vec<String> = Vec::new();
    let mut unknown_files: Vec<String> = Vec::new();

    for &index in selected_indices {
        let Some(set) = suggestion_file_sets.get(index) else {
            continue;
        };
        for path in set {
            if !files.iter().any(|file| file.path == *path)
                && !unknown_files.contains(path)
            {
                unknown_files.push(path.clone());
            }
            if seen.contains(&path.as_str()) {
                if !duplicate_files.contains(path) {
                    duplicate_files.push(path.clone());
                }
            } else {
                seen.push(path.as_str());
            }
        }
    }

    let missing_files: Vec<String> = if validate_missing_files {
        files
            .iter()
            .filter(|file| !seen.contains(&file.path.as_str()))
            .map(|file| file.path.clone())
            .collect()
    } else {
        Vec::new()
    };

    SplitValidation {
        is_valid: duplicate_files.is_empty()
            && unknown_files.is_empty()
            && missing_files.is_empty(),
        missing_files,
        duplicate_files,
        unknown_files,
    }
}

fn scope_groups<'a>(
    files: &'a [FileChange],
    config: &GitGuardConfig,
) -> Vec<(String, Vec<&'a FileChange>)> {
    group_by_scope(files, &config.monorepo_patterns)
}

fn scope_field(scope: &str) -> Option<String> {
    if scope == ROOT_SCOPE {
        None
    } else {
        Some(scope.to_string())
    }
}

fn split_reason(scopes: &[Option<String>]) -> String {
    let names: Vec<String> = scopes
        .iter()
        .map(|scope| scope.clone().unwrap_or_else(|| ROOT_SCOPE.to_string()))
        .collect();
    format!(
        "Changes span {} unrelated areas ({})",
        names.len(),
        names.join(", ")
    )
}

/// Derives a conventional-commit type from the categories of a group.
fn infer_commit_type(files: &[&FileChange], categories: &CategoryPatterns) -> String {
    let all_match = |category_patterns: &[String]| {
        files
            .iter()
            .all(|file| patterns::matches_any(&file.path, category_patterns))
    };

    if all_match(&categories.test_files) {
        "test".to_string()
    } else if files.iter().all(|file| is_docs(&file.path)) {
        "docs".to_string()
    } else if all_match(&categories.config_files) || all_match(&categories.critical_files) {
        "chore".to_string()
    } else {
        "feat".to_string()
    }
}

fn is_docs(path: &str) -> bool {
    path.ends_with(".md") || path.ends_with(".mdx") || path.starts_with("docs/")
}

fn synthesize_message(commit_type: &str, scope: &str, file_count: usize) -> String {
    let noun = if file_count == 1 { "file" } else { "files" };
    if scope == ROOT_SCOPE {
        format!("{commit_type}: update project root ({file_count} {noun})")
    } else {
        format!("{commit_type}({scope}): update {scope} ({file_count} {noun})")
    }
}

fn quote_files(files: &[String]) -> String {
    files
        .iter()
        .map(|path| format!("\"{path}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Commands reproducing a full commit split: unstage everything, then
/// stage and commit each group in order.
fn commit_split_commands(suggestions: &[SplitGroup]) -> Vec<String> {
    let mut commands = vec!["git reset HEAD".to_string()];
    for group in suggestions {
        commands.push(format!("git add {}", quote_files(&group.files)));
        commands.push(format!("git commit -m \"{}\"", group.message));
    }
    commands
}

/// Commands reproducing a full PR split: one branch per group off the
/// base, files pulled from the source branch, finishing back on it.
fn pr_split_commands(prs: &[PrGroup], base_branch: &str, current_branch: &str) -> Vec<String> {
    let mut commands = Vec::new();
    for pr in prs {
        commands.push(format!("git checkout -b {} {base_branch}", pr.branch));
        for path in &pr.files {
            commands.push(format!("git checkout {current_branch} -- \"{path}\""));
        }
        commands.push(format!("git add {}", quote_files(&pr.files)));
        commands.push(format!("git commit -m \"{}\"", pr.title));
    }
    commands.push(format!("git checkout {current_branch}"));
    commands
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn file(path: &str) -> FileChange {
        FileChange::new(path, 10, 0)
    }

    fn config() -> GitGuardConfig {
        GitGuardConfig::default()
    }

    // ── commit split fallback ──────────────────────────────────────

    #[test]
    fn multi_package_change_splits_by_scope() {
        let files = vec![file("packages/core/a.ts"), file("packages/ui/b.tsx")];
        let split = suggest_commit_split(&files, &config()).unwrap();

        assert_eq!(split.suggestions.len(), 2);
        assert_eq!(split.suggestions[0].scope.as_deref(), Some("core"));
        assert_eq!(split.suggestions[1].scope.as_deref(), Some("ui"));

        // Union of groups equals the input set, no duplicates.
        let mut all: Vec<&String> = split
            .suggestions
            .iter()
            .flat_map(|s| s.files.iter())
            .collect();
        all.sort();
        assert_eq!(all.len(), files.len());
        all.dedup();
        assert_eq!(all.len(), files.len());
    }

    #[test]
    fn single_scope_change_needs_no_split() {
        let files = vec![
            file("packages/core/a.ts"),
            file("packages/core/b.ts"),
        ];
        assert!(suggest_commit_split(&files, &config()).is_none());
    }

    #[test]
    fn root_files_get_their_own_group_without_scope() {
        let files = vec![file("packages/core/a.ts"), file("README.md")];
        let split = suggest_commit_split(&files, &config()).unwrap();
        let root_group = split
            .suggestions
            .iter()
            .find(|s| s.scope.is_none())
            .unwrap();
        assert_eq!(root_group.files, vec!["README.md".to_string()]);
        assert!(root_group.message.starts_with(&root_group.commit_type));
    }

    #[test]
    fn docs_only_group_gets_docs_type() {
        let files = vec![file("packages/core/a.ts"), file("README.md")];
        let split = suggest_commit_split(&files, &config()).unwrap();
        let root_group = split
            .suggestions
            .iter()
            .find(|s| s.scope.is_none())
            .unwrap();
        assert_eq!(root_group.commit_type, "docs");
    }

    #[test]
    fn test_only_group_gets_test_type() {
        let files = vec![
            file("packages/core/index.ts"),
            file("packages/ui/button.spec.ts"),
        ];
        let split = suggest_commit_split(&files, &config()).unwrap();
        let ui_group = split
            .suggestions
            .iter()
            .find(|s| s.scope.as_deref() == Some("ui"))
            .unwrap();
        assert_eq!(ui_group.commit_type, "test");
    }

    #[test]
    fn commit_split_commands_unstage_then_commit_each_group() {
        let files = vec![file("packages/core/a.ts"), file("packages/ui/b.tsx")];
        let split = suggest_commit_split(&files, &config()).unwrap();

        assert_eq!(split.commands[0], "git reset HEAD");
        assert!(split.commands[1].starts_with("git add \"packages/core/a.ts\""));
        assert!(split.commands[2].starts_with("git commit -m \"feat(core):"));
        assert_eq!(split.commands.len(), 1 + 2 * split.suggestions.len());
    }

    // ── PR split fallback ──────────────────────────────────────────

    #[test]
    fn pr_split_orders_root_first() {
        let files = vec![
            file("packages/core/a.ts"),
            file("package.json"),
            file("packages/ui/b.tsx"),
        ];
        let split = suggest_pr_split(&files, "main", "feature/big", &config()).unwrap();
        assert_eq!(split.suggested_prs[0].scope, None);
        assert_eq!(split.suggested_prs[0].order, 1);
        assert!(split.suggested_prs.iter().all(|pr| pr.order >= 1));
    }

    #[test]
    fn pr_split_commands_branch_off_base_and_return() {
        let files = vec![file("packages/core/a.ts"), file("packages/ui/b.tsx")];
        let split = suggest_pr_split(&files, "main", "feature/big", &config()).unwrap();

        assert!(split.commands[0].starts_with("git checkout -b feature/big-split-1-"));
        assert!(split.commands[0].ends_with(" main"));
        assert!(split
            .commands
            .iter()
            .any(|c| c.starts_with("git checkout feature/big -- ")));
        assert_eq!(split.commands.last().unwrap(), "git checkout feature/big");
    }

    #[test]
    fn pr_branch_names_are_unique() {
        let files = vec![file("packages/core/a.ts"), file("packages/ui/b.tsx")];
        let split = suggest_pr_split(&files, "main", "feat", &config()).unwrap();
        let mut branches: Vec<&String> =
            split.suggested_prs.iter().map(|pr| &pr.branch).collect();
        branches.sort();
        branches.dedup();
        assert_eq!(branches.len(), split.suggested_prs.len());
    }

    // ── validation ─────────────────────────────────────────────────

    fn sets(groups: &[&[&str]]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| g.iter().map(|s| (*s).to_string()).collect())
            .collect()
    }

    #[test]
    fn full_selection_with_full_coverage_is_valid() {
        let files = vec![file("a.ts"), file("b.ts")];
        let groups = sets(&[&["a.ts"], &["b.ts"]]);
        let result = validate_split_selection(&[0, 1], &groups, &files, true);
        assert!(result.is_valid);
        assert!(result.missing_files.is_empty());
        assert!(result.duplicate_files.is_empty());
    }

    #[test]
    fn missing_files_reported_when_coverage_checked() {
        let files = vec![file("a.ts"), file("b.ts"), file("c.ts")];
        let groups = sets(&[&["a.ts"], &["b.ts"]]);
        let result = validate_split_selection(&[0, 1], &groups, &files, true);
        assert!(!result.is_valid);
        assert_eq!(result.missing_files, vec!["c.ts".to_string()]);
    }

    #[test]
    fn missing_files_skipped_for_partial_selection() {
        let files = vec![file("a.ts"), file("b.ts")];
        let groups = sets(&[&["a.ts"], &["b.ts"]]);
        let result = validate_split_selection(&[0], &groups, &files, false);
        assert!(result.is_valid);
        assert!(result.missing_files.is_empty());
    }

    #[test]
    fn duplicates_always_reported() {
        let files = vec![file("a.ts"), file("b.ts")];
        let groups = sets(&[&["a.ts", "b.ts"], &["b.ts"]]);
        // Checked regardless of the missing-files flag.
        for check_missing in [false, true] {
            let result = validate_split_selection(&[0, 1], &groups, &files, check_missing);
            assert!(!result.is_valid);
            assert_eq!(result.duplicate_files, vec!["b.ts".to_string()]);
        }
    }

    #[test]
    fn duplicates_reported_regardless_of_selection_order() {
        let files = vec![file("a.ts"), file("b.ts")];
        let groups = sets(&[&["a.ts", "b.ts"], &["b.ts"]]);
        let forward = validate_split_selection(&[0, 1], &groups, &files, false);
        let reverse = validate_split_selection(&[1, 0], &groups, &files, false);
        assert_eq!(forward.duplicate_files, reverse.duplicate_files);
    }

    #[test]
    fn unknown_files_invalidate_selection() {
        let files = vec![file("a.ts"), file("b.ts")];
        // Covers both originals but also names a path that was never staged.
        let groups = sets(&[&["a.ts", "ghost.ts"], &["b.ts"]]);
        for check_missing in [false, true] {
            let result = validate_split_selection(&[0, 1], &groups, &files, check_missing);
            assert!(!result.is_valid);
            assert_eq!(result.unknown_files, vec!["ghost.ts".to_string()]);
            assert!(result.duplicate_files.is_empty());
        }
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let files = vec![file("a.ts")];
        let groups = sets(&[&["a.ts"]]);
        let result = validate_split_selection(&[0, 7], &groups, &files, true);
        assert!(result.is_valid);
    }
}
