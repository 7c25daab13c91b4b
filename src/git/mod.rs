//! Git repository collaborator.
//!
//! Supplies the analysis engine with changed-file snapshots, unified diff
//! text, and branch names. The engine itself never touches git; commands
//! it generates (§ split planning) are strings handed back here or to the
//! user.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Diff, DiffFormat, DiffOptions, Repository};
use tracing::debug;

use crate::analysis::FileChange;

/// Git repository wrapper.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Opens the repository containing the current directory.
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;
        Ok(Self { repo })
    }

    /// Opens the repository at a specific path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path).context("Failed to open git repository")?;
        Ok(Self { repo })
    }

    /// Working tree root, absent for bare repositories.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Current branch name.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD reference")?;
        if let Some(name) = head.shorthand() {
            if name != "HEAD" {
                return Ok(name.to_string());
            }
        }
        anyhow::bail!("Repository is in detached HEAD state")
    }

    /// Changed-file snapshots for the staged (index vs HEAD) set.
    pub fn staged_changes(&self) -> Result<Vec<FileChange>> {
        let diff = self.staged_diff()?;
        collect_changes(&diff)
    }

    /// Unified diff text for the staged set.
    pub fn staged_diff_text(&self) -> Result<String> {
        let diff = self.staged_diff()?;
        diff_text(&diff)
    }

    /// Changed-file snapshots for this branch against a base branch.
    pub fn branch_changes(&self, base_branch: &str) -> Result<Vec<FileChange>> {
        let diff = self.branch_diff(base_branch)?;
        collect_changes(&diff)
    }

    /// Unified diff text for this branch against a base branch.
    pub fn branch_diff_text(&self, base_branch: &str) -> Result<String> {
        let diff = self.branch_diff(base_branch)?;
        diff_text(&diff)
    }

    fn staged_diff(&self) -> Result<Diff<'_>> {
        // Unborn HEAD (first commit) diffs the index against an empty tree.
        let head_tree = match self.repo.head() {
            Ok(head) => Some(head.peel_to_tree().context("Failed to resolve HEAD tree")?),
            Err(_) => None,
        };
        let index = self.repo.index().context("Failed to read index")?;
        let mut options = DiffOptions::new();
        self.repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut options))
            .context("Failed to diff index against HEAD")
    }

    fn branch_diff(&self, base_branch: &str) -> Result<Diff<'_>> {
        let base_tree = self
            .repo
            .revparse_single(base_branch)
            .with_context(|| format!("Failed to resolve base branch '{base_branch}'"))?
            .peel_to_commit()
            .context("Base branch does not point to a commit")?
            .tree()
            .context("Failed to resolve base tree")?;
        let head_tree = self
            .repo
            .head()
            .context("Failed to get HEAD reference")?
            .peel_to_tree()
            .context("Failed to resolve HEAD tree")?;
        let mut options = DiffOptions::new();
        self.repo
            .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut options))
            .context("Failed to diff branch against base")
    }
}

/// Converts a git2 diff into per-file change snapshots.
fn collect_changes(diff: &Diff<'_>) -> Result<Vec<FileChange>> {
    let mut changes = Vec::new();
    for (index, delta) in diff.deltas().enumerate() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        if path.is_empty() {
            continue;
        }

        let (additions, deletions) = match git2::Patch::from_diff(diff, index) {
            Ok(Some(patch)) => {
                let (_, additions, deletions) =
                    patch.line_stats().context("Failed to read line stats")?;
                (additions, deletions)
            }
            // Binary files and unreadable patches count as zero lines.
            _ => (0, 0),
        };

        changes.push(FileChange::new(path, additions, deletions));
    }
    debug!(files = changes.len(), "Collected file changes");
    Ok(changes)
}

/// Renders a git2 diff as unified patch text.
fn diff_text(diff: &Diff<'_>) -> Result<String> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => text.push(line.origin()),
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .context("Failed to render diff")?;
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Temporary repository with helpers for staging and committing.
    struct TestRepo {
        _dir: TempDir,
        repo: Repository,
        root: PathBuf,
    }

    impl TestRepo {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Repository::init(dir.path()).unwrap();
            {
                let mut config = repo.config().unwrap();
                config.set_str("user.name", "Test").unwrap();
                config.set_str("user.email", "test@example.com").unwrap();
            }
            let root = dir.path().to_path_buf();
            Self {
                _dir: dir,
                repo,
                root,
            }
        }

        fn write(&self, path: &str, content: &str) {
            let full = self.root.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }

        fn stage(&self, path: &str) {
            let mut index = self.repo.index().unwrap();
            index.add_path(Path::new(path)).unwrap();
            index.write().unwrap();
        }

        fn commit(&self, message: &str) {
            let mut index = self.repo.index().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = self.repo.find_tree(tree_id).unwrap();
            let signature = git2::Signature::now("Test", "test@example.com").unwrap();
            let parent = self
                .repo
                .head()
                .ok()
                .and_then(|head| head.peel_to_commit().ok());
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            self.repo
                .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
                .unwrap();
        }
    }

    #[test]
    fn staged_changes_report_additions() {
        let test = TestRepo::new();
        test.write("a.txt", "one\n");
        test.stage("a.txt");
        test.commit("initial");

        test.write("a.txt", "one\ntwo\nthree\n");
        test.stage("a.txt");

        let git = GitRepository::open_at(&test.root).unwrap();
        let changes = git.staged_changes().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "a.txt");
        assert_eq!(changes[0].additions, 2);
        assert_eq!(changes[0].deletions, 0);
    }

    #[test]
    fn staged_changes_on_unborn_head() {
        let test = TestRepo::new();
        test.write("first.txt", "hello\n");
        test.stage("first.txt");

        let git = GitRepository::open_at(&test.root).unwrap();
        let changes = git.staged_changes().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "first.txt");
    }

    #[test]
    fn staged_diff_text_is_unified() {
        let test = TestRepo::new();
        test.write("src/app.js", "const x = 1;\n");
        test.stage("src/app.js");
        test.commit("initial");

        test.write("src/app.js", "const x = 1;\nconst key = \"secret\";\n");
        test.stage("src/app.js");

        let git = GitRepository::open_at(&test.root).unwrap();
        let diff = git.staged_diff_text().unwrap();
        assert!(diff.contains("diff --git a/src/app.js b/src/app.js"));
        assert!(diff.contains("+const key = \"secret\";"));
    }

    #[test]
    fn current_branch_name() {
        let test = TestRepo::new();
        test.write("a.txt", "x\n");
        test.stage("a.txt");
        test.commit("initial");

        let git = GitRepository::open_at(&test.root).unwrap();
        let branch = git.current_branch().unwrap();
        // Default branch name depends on git config.
        assert!(branch == "main" || branch == "master");
    }
}
