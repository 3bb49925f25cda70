//! Ant-style path patterns
//!
//! Finds property files with patterns like `/etc/app/**/*.properties`:
//! `*` and `?` match within one path segment, `**` spans any number of
//! directories. The walk starts from the longest leading directory that
//! contains no wildcard.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use glob::{MatchOptions, Pattern};
use regex::Regex;

use crate::error::{Error, Result};

fn character_class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".*:\[.*]").expect("character class pattern is valid"))
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Check if a single path segment contains ant wildcards
pub fn contains_ant_tokens(component: &str) -> bool {
    if component.is_empty() {
        return false;
    }
    if component.contains('*') || component.contains('?') {
        return true;
    }
    character_class_pattern().is_match(component)
}

/// Longest leading directory of `pattern` without wildcards.
///
/// The pattern is normalized lexically first (`.` dropped, `..` applied).
/// An empty pattern yields `/`.
pub fn extract_exact_directory(pattern: &Path) -> PathBuf {
    if pattern.as_os_str().is_empty() {
        return PathBuf::from("/");
    }

    let normalized = normalize(pattern);
    let mut exact = PathBuf::new();

    for component in normalized.components() {
        match component {
            Component::Normal(segment) => {
                if contains_ant_tokens(&segment.to_string_lossy()) {
                    break;
                }
                exact.push(segment);
            }
            other => exact.push(other.as_os_str()),
        }
    }

    if exact.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        exact
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// All regular files matching an ant `pattern`, sorted by path.
///
/// Symbolic links are followed; each directory is visited once.
pub fn files_matching(pattern: &str) -> Result<Vec<PathBuf>> {
    if pattern.trim().is_empty() {
        return Err(Error::invalid_pattern(
            pattern,
            "Provided pattern is empty. Put an ant path pattern in this element",
        ));
    }

    // Match against the same normalized form the walk starts from
    let normalized = normalize(Path::new(pattern));
    let matcher = Pattern::new(&normalized.to_string_lossy())
        .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
    let root = extract_exact_directory(Path::new(pattern));

    let mut found = Vec::new();
    let metadata = std::fs::metadata(&root).map_err(|e| {
        Error::io(root.display().to_string(), &e)
            .with_help("Error while traversing file tree to find properties files by ant pattern")
    })?;

    if metadata.is_file() {
        if matcher.matches_path_with(&root, MATCH_OPTIONS) {
            found.push(root);
        }
        return Ok(found);
    }

    let mut visited = HashSet::new();
    walk(&root, &matcher, &mut visited, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(
    dir: &Path,
    matcher: &Pattern,
    visited: &mut HashSet<PathBuf>,
    found: &mut Vec<PathBuf>,
) -> Result<()> {
    let canonical = dir
        .canonicalize()
        .map_err(|e| Error::io(dir.display().to_string(), &e))?;
    if !visited.insert(canonical) {
        return Ok(());
    }

    let entries =
        std::fs::read_dir(dir).map_err(|e| Error::io(dir.display().to_string(), &e))?;

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir.display().to_string(), &e))?;
        let path = entry.path();
        let path = path.strip_prefix(".").map(Path::to_path_buf).unwrap_or(path);

        // Follows symlinks; dangling links are skipped
        let Ok(metadata) = std::fs::metadata(&path) else {
            log::trace!("Skipping unreadable entry {}", path.display());
            continue;
        };

        if metadata.is_dir() {
            walk(&path, matcher, visited, found)?;
        } else if metadata.is_file() && matcher.matches_path_with(&path, MATCH_OPTIONS) {
            found.push(path);
        }
    }

    Ok(())
}
