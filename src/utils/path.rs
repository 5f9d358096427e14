//! Command-line paths against the project root.
//!
//! Commands may run from any directory below the one holding
//! `tikzsvg.toml`. A relative path is taken from the working directory when
//! it makes sense there, otherwise from the project root.

use std::path::{Path, PathBuf};

/// Absolute form of `path`, symlinks resolved when it exists.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// A file that should already exist: working directory first, then `root`.
pub fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return normalize_path(path);
    }
    normalize_path(&root.join(path))
}

/// A file about to be written; its directory decides where it goes.
///
/// `fig.md` lands in the working directory, and so does `notes/fig.md` when
/// `notes/` exists there. Otherwise the path is taken from `root`.
pub fn resolve_output(path: &Path, root: &Path) -> PathBuf {
    let here = path
        .parent()
        .is_none_or(|dir| dir.as_os_str().is_empty() || dir.is_dir());
    if path.is_absolute() || here {
        return normalize_path(path);
    }
    normalize_path(&root.join(path))
}
