//! Commit complexity scoring.
//!
//! Combines per-file category weights and size tiers into a single score
//! plus a list of human-readable reasons, then decides whether the commit
//! needs structuring help (AI assistance or a split). Deterministic given
//! identical inputs; no I/O.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::patterns;
use crate::analysis::FileChange;
use crate::config::ComplexityOptions;

/// Result of scoring one set of changed files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitComplexity {
    /// Weighted sum over all changed files.
    pub score: f64,
    /// Ordered human-readable triggers.
    pub reasons: Vec<String>,
    /// Whether the commit warrants structuring help.
    pub needs_structure: bool,
}

const CRITICAL_REASON: &str = "Contains critical configuration changes";

/// Scores a set of changed files against the configured weights.
///
/// Size tiers are exclusive: only the highest tier a file crosses adds its
/// weight. Category weights accumulate; a file matching both source and
/// utility patterns scores both. `needs_structure` is true when a
/// critical-file reason is present, or the score exceeds the configured
/// cutoff, or the reason count exceeds the configured cutoff.
pub fn analyze_complexity(files: &[FileChange], options: &ComplexityOptions) -> CommitComplexity {
    let thresholds = &options.thresholds;
    let weights = &options.scoring;
    let cats = &options.patterns;

    let mut score = 0.0;
    let mut reasons = Vec::new();

    let mut has_large = false;
    let mut has_very_large = false;
    let mut has_huge = false;
    let mut has_critical = false;
    let mut top_dirs = BTreeSet::new();

    for file in files {
        score += weights.base_file_score;

        // Exclusive size tiers: highest crossed tier only.
        let changed = file.total_changes();
        if changed >= thresholds.huge_file {
            score += weights.huge_file_score;
            has_huge = true;
        } else if changed >= thresholds.very_large_file {
            score += weights.very_large_file_score;
            has_very_large = true;
        } else if changed >= thresholds.large_file {
            score += weights.large_file_score;
            has_large = true;
        }

        let category_weights = [
            (&cats.source_files, weights.source_file_score),
            (&cats.test_files, weights.test_file_score),
            (&cats.config_files, weights.config_file_score),
            (&cats.api_files, weights.api_file_score),
            (&cats.migration_files, weights.migration_file_score),
            (&cats.component_files, weights.component_file_score),
            (&cats.hook_files, weights.hook_file_score),
            (&cats.utility_files, weights.utility_file_score),
        ];
        for (category_patterns, weight) in category_weights {
            if patterns::matches_any(&file.path, category_patterns) {
                score += weight;
            }
        }

        if patterns::matches_any(&file.path, &cats.critical_files) {
            score += weights.critical_file_score;
            has_critical = true;
        }

        top_dirs.insert(top_level_dir(&file.path));
    }

    if has_huge {
        reasons.push("Huge file changes".to_string());
    } else if has_very_large {
        reasons.push("Very large file changes".to_string());
    } else if has_large {
        reasons.push("Large file changes".to_string());
    }

    if files.len() >= thresholds.many_files {
        reasons.push(format!("Many files changed ({})", files.len()));
    } else if files.len() >= thresholds.multiple_files {
        reasons.push(format!("Multiple files changed ({})", files.len()));
    }

    if top_dirs.len() > 1 {
        reasons.push("Changes span multiple directories".to_string());
    }

    if has_critical {
        reasons.push(CRITICAL_REASON.to_string());
    }

    let score_threshold = options.structure_thresholds.score_threshold;
    let over_score = score > score_threshold;
    if over_score {
        reasons.push(format!(
            "Complexity score ({score:.1}) exceeds threshold ({score_threshold:.1})"
        ));
    }

    let needs_structure =
        has_critical || over_score || reasons.len() > options.structure_thresholds.reasons_threshold;

    debug!(
        score,
        reasons = reasons.len(),
        needs_structure,
        "Complexity analysis complete"
    );

    CommitComplexity {
        score,
        reasons,
        needs_structure,
    }
}

/// First `/`-separated segment of a path, or the path itself at the root.
fn top_level_dir(path: &str) -> &str {
    path.split('/').next().unwrap_or(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ComplexityOptions;

    fn file(path: &str, additions: usize, deletions: usize) -> FileChange {
        FileChange::new(path, additions, deletions)
    }

    fn options() -> ComplexityOptions {
        ComplexityOptions::default()
    }

    // ── scoring ────────────────────────────────────────────────────

    #[test]
    fn empty_change_set_scores_zero() {
        let result = analyze_complexity(&[], &options());
        assert_eq!(result.score, 0.0);
        assert!(result.reasons.is_empty());
        assert!(!result.needs_structure);
    }

    #[test]
    fn small_unremarkable_file_scores_base_plus_categories() {
        let opts = options();
        // docs/readme.txt matches no category pattern.
        let result = analyze_complexity(&[file("docs/readme.txt", 3, 1)], &opts);
        assert_eq!(result.score, opts.scoring.base_file_score);
        assert!(!result.needs_structure);
    }

    #[test]
    fn size_tiers_are_exclusive() {
        let opts = options();
        // 600 changed lines crosses all three thresholds; only huge applies.
        let result = analyze_complexity(&[file("notes.txt", 600, 0)], &opts);
        let expected = opts.scoring.base_file_score + opts.scoring.huge_file_score;
        assert_eq!(result.score, expected);
        assert_eq!(result.reasons[0], "Huge file changes");
        assert!(!result.reasons.contains(&"Large file changes".to_string()));
    }

    #[test]
    fn category_weights_accumulate() {
        let opts = options();
        // Matches both source_files (src/**/*) and utility_files (**/utils/**/*).
        let result = analyze_complexity(&[file("src/utils/format.ts", 5, 0)], &opts);
        let expected = opts.scoring.base_file_score
            + opts.scoring.source_file_score
            + opts.scoring.utility_file_score;
        assert_eq!(result.score, expected);
    }

    #[test]
    fn very_large_api_file_scores_base_api_and_tier() {
        let opts = options();
        let result = analyze_complexity(&[file("backend/api/orders.ts", 350, 0)], &opts);
        let expected = opts.scoring.base_file_score
            + opts.scoring.api_file_score
            + opts.scoring.very_large_file_score;
        assert_eq!(result.score, expected);
        assert!(result.reasons.contains(&"Very large file changes".to_string()));
    }

    // ── reasons ────────────────────────────────────────────────────

    #[test]
    fn file_count_reasons_use_highest_bucket() {
        let opts = options();
        let many: Vec<FileChange> = (0..12).map(|i| file(&format!("docs/f{i}.txt"), 1, 0)).collect();
        let result = analyze_complexity(&many, &opts);
        assert!(result.reasons.iter().any(|r| r.starts_with("Many files")));
        assert!(!result.reasons.iter().any(|r| r.starts_with("Multiple files")));
    }

    #[test]
    fn multiple_directories_reason() {
        let result = analyze_complexity(
            &[file("docs/a.txt", 1, 0), file("assets/b.txt", 1, 0)],
            &options(),
        );
        assert!(result
            .reasons
            .contains(&"Changes span multiple directories".to_string()));
    }

    #[test]
    fn single_directory_no_span_reason() {
        let result = analyze_complexity(
            &[file("docs/a.txt", 1, 0), file("docs/b.txt", 1, 0)],
            &options(),
        );
        assert!(!result
            .reasons
            .contains(&"Changes span multiple directories".to_string()));
    }

    #[test]
    fn score_threshold_reason_names_both_numbers() {
        let mut opts = options();
        opts.structure_thresholds.score_threshold = 1.0;
        let result = analyze_complexity(&[file("src/a.rs", 5, 0)], &opts);
        let reason = result.reasons.last().unwrap();
        assert!(reason.starts_with("Complexity score ("));
        assert!(reason.contains("exceeds threshold (1.0)"));
    }

    // ── needs_structure ────────────────────────────────────────────

    #[test]
    fn small_clean_change_never_needs_structure() {
        let result = analyze_complexity(&[file("docs/a.txt", 2, 1)], &options());
        assert!(!result.needs_structure);
    }

    #[test]
    fn critical_file_alone_forces_structure() {
        let mut opts = options();
        // Keep the score well below the cutoff so only the critical rule fires.
        opts.structure_thresholds.score_threshold = 100.0;
        let result = analyze_complexity(&[file("package.json", 2, 0)], &opts);
        assert!(result.reasons.contains(&CRITICAL_REASON.to_string()));
        assert!(result.needs_structure);
    }

    #[test]
    fn score_over_threshold_forces_structure() {
        let mut opts = options();
        opts.structure_thresholds.score_threshold = 0.5;
        let result = analyze_complexity(&[file("docs/a.txt", 1, 0)], &opts);
        assert!(result.needs_structure);
    }

    #[test]
    fn reason_count_over_threshold_forces_structure() {
        let mut opts = options();
        opts.structure_thresholds.reasons_threshold = 1;
        opts.structure_thresholds.score_threshold = 1000.0;
        // Large file + multiple dirs = 2 reasons > 1.
        let result = analyze_complexity(
            &[file("docs/a.txt", 150, 0), file("assets/b.txt", 1, 0)],
            &opts,
        );
        assert!(result.reasons.len() > 1);
        assert!(result.needs_structure);
    }

    #[test]
    fn determinism() {
        let files = vec![
            file("src/api/routes.ts", 120, 10),
            file("package.json", 2, 2),
        ];
        let opts = options();
        let a = analyze_complexity(&files, &opts);
        let b = analyze_complexity(&files, &opts);
        assert_eq!(a.score, b.score);
        assert_eq!(a.reasons, b.reasons);
        assert_eq!(a.needs_structure, b.needs_structure);
    }
}
