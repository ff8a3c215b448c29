//! Manifest discovery on disk.

use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

/// Manifest file patterns
const FILE_PATTERNS: &[&str] = &["*.yaml", "*.yml", "*.json"];

/// Directories to skip
const SKIP_DIRS: &[&str] = &["target", "node_modules", ".git"];

/// Check if a path or its file name matches any of the exclude patterns
fn matches_exclude(path: &Path, exclude_patterns: &[Pattern]) -> bool {
    let path_str = path.to_string_lossy();
    exclude_patterns.iter().any(|pattern| {
        pattern.matches(&path_str)
            || path
                .file_name()
                .is_some_and(|name| pattern.matches(&name.to_string_lossy()))
    })
}

fn in_skip_dir(path: &Path) -> bool {
    path.components().any(|component| {
        matches!(component, Component::Normal(name)
            if SKIP_DIRS.iter().any(|skip| name.to_string_lossy() == *skip))
    })
}

fn matches_file_pattern(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let with_dot = format!("*.{}", ext.to_string_lossy().to_lowercase());
        FILE_PATTERNS.contains(&with_dot.as_str())
    })
}

/// A file that may hold a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Named on the command line rather than found by walking a directory.
    pub explicit: bool,
}

/// Absolute form of `path` with `.`, `..` and links resolved, so that two
/// spellings of one file compare equal. Falls back to `path` when it
/// cannot be resolved.
#[must_use]
pub fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Find every manifest candidate under the given files and directories.
///
/// Explicit file arguments are taken as-is when they carry a manifest
/// extension; directories are walked recursively. Each file is listed
/// once, explicit if any argument named it directly.
#[must_use]
pub fn find_manifests(paths: &[PathBuf], exclude: &[String]) -> Vec<Candidate> {
    let exclude_patterns: Vec<Pattern> = exclude
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "ignoring invalid exclude pattern");
                None
            }
        })
        .collect();

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            if matches_file_pattern(path) && !matches_exclude(path, &exclude_patterns) {
                files.push(Candidate {
                    path: canonical(path),
                    explicit: true,
                });
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| !entry.path().strip_prefix(path).is_ok_and(in_skip_dir))
                .filter_map(Result::ok)
            {
                let file_path = entry.path();
                if !file_path.is_file() || !matches_file_pattern(file_path) {
                    continue;
                }
                if matches_exclude(file_path, &exclude_patterns) {
                    tracing::debug!(path = %file_path.display(), "excluded");
                    continue;
                }
                files.push(Candidate {
                    path: canonical(file_path),
                    explicit: false,
                });
            }
        } else {
            tracing::warn!(path = %path.display(), "path does not exist");
        }
    }

    // explicit entries first within each path, so dedup keeps them
    files.sort_by(|a, b| a.path.cmp(&b.path).then(b.explicit.cmp(&a.explicit)));
    files.dedup_by(|later, kept| later.path == kept.path);
    files
}
