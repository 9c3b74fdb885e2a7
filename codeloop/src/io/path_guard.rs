//! Sandbox check for generated file paths.
//!
//! Every path proposed by the generator is checked before it is written or
//! handed to a verification command. A path is safe only if it is relative,
//! cannot be mistaken for a command-line flag, and resolves to a strict
//! descendant of the canonical repo root.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// True if `path` may be written or executed under `repo_root`.
pub fn is_safe(path: &str, repo_root: &Path) -> bool {
    if path.is_empty() || path.starts_with('-') {
        debug!(path, "rejected: empty or flag-like path");
        return false;
    }
    let candidate = Path::new(path);
    if candidate.is_absolute() || candidate.has_root() {
        debug!(path, "rejected: absolute path");
        return false;
    }
    let Ok(root) = fs::canonicalize(repo_root) else {
        debug!(root = %repo_root.display(), "rejected: repo root cannot be canonicalized");
        return false;
    };
    let Some(resolved) = resolve_under(&root, candidate) else {
        debug!(path, "rejected: path cannot be resolved");
        return false;
    };
    let inside = resolved != root && resolved.starts_with(&root);
    if !inside {
        debug!(path, resolved = %resolved.display(), "rejected: escapes repo root");
    }
    inside
}

/// Resolve `relative` against the canonical `root` one component at a time.
///
/// Every component that exists on disk is canonicalized so symlinks are
/// followed, including components reached again after a `..` out of a missing
/// directory. Components that do not exist yet are applied lexically, and `..`
/// pops the current resolved location.
fn resolve_under(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                current.pop();
            }
            Component::Normal(part) => {
                current.push(part);
                if fs::symlink_metadata(&current).is_ok() {
                    current = fs::canonicalize(&current).ok()?;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(current)
}
