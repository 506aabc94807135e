//! Line-level diffs between baseline and pending file content.

use serde::{Deserialize, Serialize};

/// A per-file pending change: the diff between the accepted baseline and
/// the latest generated content.
///
/// `old_content: None` denotes a newly created file; `new_content: None`
/// denotes a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Path of the file, relative to the project root.
    pub file_path: String,

    /// Unified-style diff text.
    pub diff: String,

    /// Number of added lines.
    pub additions: usize,

    /// Number of removed lines.
    pub deletions: usize,

    /// Baseline content, or `None` for a newly created file.
    pub old_content: Option<String>,

    /// Pending content, or `None` for a deleted file.
    pub new_content: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum DiffLine<'a> {
    Context(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Computes the change record for one file.
#[must_use]
pub fn diff_file(path: &str, old: Option<&str>, new: Option<&str>) -> FileChange {
    let old_lines: Vec<&str> = old.map(|s| s.lines().collect()).unwrap_or_default();
    let new_lines: Vec<&str> = new.map(|s| s.lines().collect()).unwrap_or_default();

    let mut additions = 0;
    let mut deletions = 0;
    let mut text = String::new();
    text.push_str(&format!(
        "--- {}\n",
        if old.is_some() {
            format!("a/{path}")
        } else {
            "/dev/null".to_string()
        }
    ));
    text.push_str(&format!(
        "+++ {}\n",
        if new.is_some() {
            format!("b/{path}")
        } else {
            "/dev/null".to_string()
        }
    ));

    for line in line_diff(&old_lines, &new_lines) {
        match line {
            DiffLine::Context(l) => {
                text.push_str(" ");
                text.push_str(l);
                text.push('\n');
            }
            DiffLine::Removed(l) => {
                deletions += 1;
                text.push('-');
                text.push_str(l);
                text.push('\n');
            }
            DiffLine::Added(l) => {
                additions += 1;
                text.push('+');
                text.push_str(l);
                text.push('\n');
            }
        }
    }

    FileChange {
        file_path: path.to_string(),
        diff: text,
        additions,
        deletions,
        old_content: old.map(String::from),
        new_content: new.map(String::from),
    }
}

/// Longest-common-subsequence walk over lines.
fn line_diff<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<DiffLine<'a>> {
    let n = old.len();
    let m = new.len();

    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push(DiffLine::Context(old[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(old[i]));
            i += 1;
        } else {
            out.push(DiffLine::Added(new[j]));
            j += 1;
        }
    }
    while i < n {
        out.push(DiffLine::Removed(old[i]));
        i += 1;
    }
    while j < m {
        out.push(DiffLine::Added(new[j]));
        j += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_file_counts_all_lines_added() {
        let change = diff_file("main.tf", None, Some("a\nb\nc"));
        assert_eq!(change.additions, 3);
        assert_eq!(change.deletions, 0);
        assert_eq!(change.old_content, None);
        assert!(change.diff.starts_with("--- /dev/null\n+++ b/main.tf\n"));
    }

    #[test]
    fn test_deleted_file_counts_all_lines_removed() {
        let change = diff_file("main.tf", Some("a\nb"), None);
        assert_eq!(change.additions, 0);
        assert_eq!(change.deletions, 2);
        assert_eq!(change.new_content, None);
        assert!(change.diff.contains("+++ /dev/null"));
    }

    #[test]
    fn test_modification_keeps_common_lines_as_context() {
        let old = "resource \"aws_vpc\" \"main\" {\n  cidr_block = \"10.0.0.0/16\"\n}";
        let new = "resource \"aws_vpc\" \"main\" {\n  cidr_block = \"10.1.0.0/16\"\n}";
        let change = diff_file("main.tf", Some(old), Some(new));
        assert_eq!(change.additions, 1);
        assert_eq!(change.deletions, 1);
        assert!(change.diff.contains("-  cidr_block = \"10.0.0.0/16\""));
        assert!(change.diff.contains("+  cidr_block = \"10.1.0.0/16\""));
        assert!(change.diff.contains(" resource \"aws_vpc\" \"main\" {"));
    }

    #[test]
    fn test_identical_content_has_no_changes() {
        let change = diff_file("main.tf", Some("same"), Some("same"));
        assert_eq!(change.additions, 0);
        assert_eq!(change.deletions, 0);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let change = diff_file("main.tf", None, Some("x"));
        let json = serde_json::to_value(&change).expect("serialize");
        assert!(json.get("filePath").is_some());
        assert!(json.get("oldContent").is_some());
        assert!(json.get("newContent").is_some());
    }
}
