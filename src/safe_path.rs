//! Safe-path resolver (C1).
//!
//! Prevents file-based ingestion from escaping a configured allowlisted root.
//! Every file-based tool (markdown ingest, PDF ingest, conversion) resolves its
//! caller-supplied path through [`resolve`] before touching the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::PathError;

/// A path that has passed every check in [`resolve`]: canonical, inside the
/// root, a regular file, allowlisted suffix, within the size cap.
#[derive(Debug, Clone)]
pub struct SafePath {
    pub absolute: PathBuf,
    pub size_bytes: u64,
}

/// Resolve `relative_path` against `root`, applying the rules in spec §4.1 in
/// order. `root` must already exist and be a directory; `size_cap` is the
/// per-call byte limit for the caller's use case (text vs. converted text).
pub fn resolve(
    root: &Path,
    relative_path: &str,
    allowed_suffixes: &[String],
    size_cap: u64,
) -> Result<SafePath, PathError> {
    let root_canonical = canonicalize_root(root)?;

    // Rule 1: reject absolute relative_path.
    let candidate_raw = Path::new(relative_path);
    if candidate_raw.is_absolute() {
        return Err(PathError::Absolute);
    }

    // Rule 2: reject any `..` component after normalisation.
    for component in candidate_raw.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(PathError::Traversal);
        }
    }

    // Rule 3: compute realpath(root / relative_path), following symlinks.
    let joined = root_canonical.join(candidate_raw);
    let candidate = fs::canonicalize(&joined).map_err(PathError::Io)?;

    // Rule 4: root must be a prefix of candidate at a component boundary.
    if !candidate.starts_with(&root_canonical) {
        return Err(PathError::Escape);
    }

    // Rule 5: candidate must be a regular file.
    let meta = fs::metadata(&candidate).map_err(PathError::Io)?;
    if !meta.is_file() {
        return Err(PathError::NotRegularFile);
    }

    // Rule 6: suffix must be in the caller-provided allowlist.
    let suffix_ok = allowed_suffixes.iter().any(|suffix| {
        candidate
            .to_string_lossy()
            .to_lowercase()
            .ends_with(&suffix.to_lowercase())
    });
    if !suffix_ok {
        return Err(PathError::SuffixNotAllowed);
    }

    // Rule 7: per-call size cap.
    let size_bytes = meta.len();
    if size_bytes > size_cap {
        return Err(PathError::TooLarge {
            actual: size_bytes,
            limit: size_cap,
        });
    }

    Ok(SafePath {
        absolute: candidate,
        size_bytes,
    })
}

/// Create the allowlisted root lazily if it does not exist, then canonicalize
/// it. A root that exists but is not a directory is a misconfiguration.
pub fn ensure_root(root: &Path) -> Result<PathBuf, PathError> {
    if !root.exists() {
        fs::create_dir_all(root).map_err(PathError::Io)?;
        tracing::info!(root = %root.display(), "created allowlisted ingest root");
    }
    canonicalize_root(root)
}

fn canonicalize_root(root: &Path) -> Result<PathBuf, PathError> {
    if !root.is_dir() {
        return Err(PathError::RootMisconfigured(format!(
            "{} does not exist or is not a directory",
            root.display()
        )));
    }
    fs::canonicalize(root).map_err(PathError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, rel: &str, contents: &str) -> PathBuf {
        let full = dir.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut f = File::create(&full).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        full
    }

    #[test]
    fn resolves_valid_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.md", "hello");
        let result = resolve(
            dir.path(),
            "a.md",
            &["md".to_string()],
            1_000_000,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve(dir.path(), "/etc/passwd", &["pdf".to_string()], 1_000_000);
        assert!(matches!(result, Err(PathError::Absolute)));
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve(
            dir.path(),
            "../etc/passwd",
            &["md".to_string()],
            1_000_000,
        );
        assert!(matches!(result, Err(PathError::Traversal)));
    }

    #[test]
    fn rejects_symlink_escape() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let secret = write_file(outside.path(), "secret.md", "top secret");
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&secret, dir.path().join("link.md")).unwrap();
            let result = resolve(dir.path(), "link.md", &["md".to_string()], 1_000_000);
            assert!(matches!(result, Err(PathError::Escape)));
        }
    }

    #[test]
    fn rejects_disallowed_suffix() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.exe", "hello");
        let result = resolve(dir.path(), "a.exe", &["md".to_string()], 1_000_000);
        assert!(matches!(result, Err(PathError::SuffixNotAllowed)));
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.md", &"x".repeat(100));
        let result = resolve(dir.path(), "a.md", &["md".to_string()], 10);
        assert!(matches!(result, Err(PathError::TooLarge { .. })));
    }

    #[test]
    fn rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let result = resolve(&missing, "a.md", &["md".to_string()], 10);
        assert!(matches!(result, Err(PathError::RootMisconfigured(_))));
    }
}
