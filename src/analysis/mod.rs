//! Change analysis engine.
//!
//! Deterministic rules that classify changed files, score commit
//! complexity, detect monorepo scope, scan for security issues, and plan
//! commit/PR splits. Every analysis run is a pure function of its inputs
//! (file list, diff text, resolved configuration); there is no shared
//! mutable state between runs.

pub mod complexity;
pub mod diff;
pub mod patterns;
pub mod scope;
pub mod security;
pub mod split;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{CategoryPatterns, GitGuardConfig};

pub use complexity::{analyze_complexity, CommitComplexity};
pub use scope::detect_scope;
pub use security::{analyze_security, SecurityCheckResult, SecurityFinding, Severity};
pub use split::{
    suggest_commit_split, validate_split_selection, CommitSplitSuggestion, PrSplitSuggestion,
    SplitGroup, SplitValidation,
};

/// Immutable snapshot of one changed file.
///
/// Created by the git collaborator; consumed read-only by every analysis
/// component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Added line count.
    pub additions: usize,
    /// Deleted line count.
    pub deletions: usize,
    /// Whether the path matches the configured test patterns.
    pub is_test: bool,
    /// Whether the path matches the configured config patterns.
    pub is_config: bool,
}

impl FileChange {
    /// Creates an unclassified change snapshot.
    pub fn new(path: impl Into<String>, additions: usize, deletions: usize) -> Self {
        Self {
            path: path.into(),
            additions,
            deletions,
            is_test: false,
            is_config: false,
        }
    }

    /// Fills in the test/config classification flags.
    #[must_use]
    pub fn classified(mut self, categories: &CategoryPatterns) -> Self {
        self.is_test = patterns::matches_any(&self.path, &categories.test_files);
        self.is_config = patterns::matches_any(&self.path, &categories.config_files);
        self
    }

    /// Total changed line count.
    pub fn total_changes(&self) -> usize {
        self.additions + self.deletions
    }
}

/// Everything the deterministic engine concluded about one change set.
///
/// AI suggestions are layered on top by the orchestrator; they never
/// replace these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Files that survived ignore filtering, classified.
    pub files: Vec<FileChange>,
    /// Complexity score, reasons, and the needs-structure decision.
    pub complexity: CommitComplexity,
    /// Unanimous monorepo scope, if any.
    pub scope: Option<String>,
    /// Security findings and the block recommendation.
    pub security: SecurityCheckResult,
    /// Proposed commit split, when the change set warrants one.
    pub commit_split: Option<CommitSplitSuggestion>,
}

/// Runs the full deterministic pipeline over one change set.
///
/// Security scanning completes first; a blocking result suppresses split
/// planning so the caller reports findings before offering anything else.
pub fn analyze(files: Vec<FileChange>, diff: &str, config: &GitGuardConfig) -> AnalysisResult {
    let files: Vec<FileChange> =
        patterns::filter_ignored(files, &config.ignore_patterns, |file| file.path.as_str())
            .into_iter()
            .map(|file| file.classified(&config.complexity.patterns))
            .collect();

    info!(files = files.len(), "Analyzing change set");

    let security = analyze_security(&files, diff, &config.security);
    let complexity = analyze_complexity(&files, &config.complexity);
    let scope = detect_scope(&files, &config.monorepo_patterns);

    let commit_split = if security.should_block {
        debug!("High-severity security finding, suppressing split planning");
        None
    } else if complexity.needs_structure || scope.is_none() {
        suggest_commit_split(&files, config)
    } else {
        None
    };

    AnalysisResult {
        files,
        complexity,
        scope,
        security,
        commit_split,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn config() -> GitGuardConfig {
        GitGuardConfig::default()
    }

    #[test]
    fn classification_flags_follow_category_patterns() {
        let categories = CategoryPatterns::default();
        let test_file = FileChange::new("src/app.spec.ts", 1, 0).classified(&categories);
        assert!(test_file.is_test);
        assert!(!test_file.is_config);

        let config_file = FileChange::new("settings.yaml", 1, 0).classified(&categories);
        assert!(config_file.is_config);
    }

    #[test]
    fn ignored_files_are_excluded_from_everything() {
        let mut cfg = config();
        cfg.ignore_patterns = vec!["dist/**".to_string()];
        let files = vec![
            FileChange::new("dist/bundle.js", 5000, 0),
            FileChange::new("docs/notes.txt", 2, 0),
        ];
        let result = analyze(files, "", &cfg);
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path, "docs/notes.txt");
        // The huge ignored file contributes nothing to the score.
        assert!(!result.complexity.needs_structure);
    }

    #[test]
    fn multi_package_change_yields_split_and_no_scope() {
        let files = vec![
            FileChange::new("packages/core/a.ts", 10, 0),
            FileChange::new("packages/ui/b.tsx", 20, 0),
        ];
        let result = analyze(files, "", &config());
        assert_eq!(result.scope, None);
        let split = result.commit_split.unwrap();
        assert_eq!(split.suggestions.len(), 2);
    }

    #[test]
    fn single_scope_simple_change_yields_no_split() {
        let files = vec![
            FileChange::new("packages/core/a.ts", 3, 1),
            FileChange::new("packages/core/b.ts", 2, 0),
        ];
        let result = analyze(files, "", &config());
        assert_eq!(result.scope.as_deref(), Some("core"));
        assert!(result.commit_split.is_none());
    }

    #[test]
    fn blocking_security_finding_suppresses_split() {
        let files = vec![
            FileChange::new("packages/core/.env", 1, 0),
            FileChange::new("packages/ui/b.tsx", 20, 0),
        ];
        let result = analyze(files, "", &config());
        assert!(result.security.should_block);
        assert!(result.commit_split.is_none());
    }
}
