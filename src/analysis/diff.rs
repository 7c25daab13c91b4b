//! Per-file unified diff slicing with added-line attribution.
//!
//! The security scanner needs to know which file and line a matched
//! snippet came from, so beyond splitting a flat diff at `diff --git`
//! boundaries this module walks hunk headers to recover new-file line
//! numbers for every added line.

/// Marker that begins a per-file section in unified diff output.
const FILE_DIFF_MARKER: &str = "diff --git a/";

/// Marker that begins a hunk within a file diff.
const HUNK_MARKER: &str = "@@ ";

/// A per-file slice of a unified diff.
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path of the file (extracted from the `b/` side of `diff --git a/... b/...`).
    pub path: String,
    /// Raw text of this file's diff (header + all hunks).
    pub content: String,
}

/// One added line within a file's diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedLine {
    /// Line number in the new version of the file.
    pub line: usize,
    /// Line content without the leading `+`.
    pub content: String,
}

/// Splits a flat unified diff at `diff --git a/` boundaries.
///
/// Returns one [`FileDiff`] per file section; empty or marker-free input
/// returns an empty `Vec`.
pub fn split_by_file(diff: &str) -> Vec<FileDiff> {
    let mut result = Vec::new();
    let mut positions = Vec::new();

    // Find all positions where a file section starts (at line boundaries).
    if diff.starts_with(FILE_DIFF_MARKER) {
        positions.push(0);
    }
    let search = format!("\n{FILE_DIFF_MARKER}");
    let mut start = 0;
    while let Some(pos) = diff[start..].find(&search) {
        // +1 to skip the newline; the section starts at `diff`.
        positions.push(start + pos + 1);
        start = start + pos + 1;
    }

    for (i, &pos) in positions.iter().enumerate() {
        let end = positions.get(i + 1).copied().unwrap_or(diff.len());
        let content = &diff[pos..end];
        let first_line = content.lines().next().unwrap_or("");
        let path = extract_path_from_diff_header(first_line);

        result.push(FileDiff {
            path,
            content: content.to_string(),
        });
    }

    result
}

impl FileDiff {
    /// Returns every added line with its new-file line number.
    ///
    /// Binary files and mode-only changes have no hunks and yield an
    /// empty `Vec`.
    pub fn added_lines(&self) -> Vec<AddedLine> {
        let mut added = Vec::new();
        let mut new_line: Option<usize> = None;

        for line in self.content.lines() {
            if line.starts_with(HUNK_MARKER) {
                new_line = parse_new_start(line);
                continue;
            }
            let Some(current) = new_line else {
                // Still in the file header.
                continue;
            };
            if let Some(content) = line.strip_prefix('+') {
                if !line.starts_with("+++") {
                    added.push(AddedLine {
                        line: current,
                        content: content.to_string(),
                    });
                    new_line = Some(current + 1);
                }
            } else if line.starts_with('-') {
                // Removed line: new-file position unchanged.
            } else if line.starts_with('\\') {
                // "\ No newline at end of file": not a content line.
            } else {
                // Context line advances the new-file position.
                new_line = Some(current + 1);
            }
        }

        added
    }
}

/// Parses the new-file start line from a `@@ -a,b +c,d @@` hunk header.
fn parse_new_start(header: &str) -> Option<usize> {
    let plus = header.find('+')?;
    let rest = &header[plus + 1..];
    let end = rest.find([',', ' '])?;
    rest[..end].parse().ok()
}

/// Extracts the file path from the `b/` side of a `diff --git` header line.
fn extract_path_from_diff_header(header_line: &str) -> String {
    // Format: "diff --git a/old_path b/new_path"
    // Find the last " b/" to handle paths that may contain spaces.
    if let Some(b_pos) = header_line.rfind(" b/") {
        header_line[b_pos + 3..].to_string()
    } else {
        header_line
            .strip_prefix(FILE_DIFF_MARKER)
            .unwrap_or(header_line)
            .to_string()
    }
}
