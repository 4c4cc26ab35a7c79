//! Unique temporary file allocation.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::MAX_TEMP_ATTEMPTS;
use crate::error::{HarvesterError, Result};

/// Create an empty file with a unique name in `dir` (or the OS temp
/// directory) and return its path.
///
/// Names are `<prefix><pid><random><suffix>`. A name collision is retried
/// up to [`MAX_TEMP_ATTEMPTS`] times.
pub fn allocate_temp_path(dir: Option<&Path>, prefix: &str, suffix: &str) -> Result<PathBuf> {
    allocate_temp_path_with(dir, prefix, suffix, || {
        uuid::Uuid::new_v4().simple().to_string()
    })
}

/// [`allocate_temp_path`] with the random part of the name drawn from
/// `unique`.
pub fn allocate_temp_path_with(
    dir: Option<&Path>,
    prefix: &str,
    suffix: &str,
    mut unique: impl FnMut() -> String,
) -> Result<PathBuf> {
    let dir = dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
    let pid = std::process::id();

    for _ in 0..MAX_TEMP_ATTEMPTS {
        let path = dir.join(format!("{prefix}{pid}{}{suffix}", unique()));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(HarvesterError::TempFile {
        dir,
        attempts: MAX_TEMP_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = allocate_temp_path(Some(dir.path()), "page-", ".xml").unwrap();
        let second = allocate_temp_path(Some(dir.path()), "page-", ".xml").unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert_eq!(first.parent(), Some(dir.path()));
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("page-"));
        assert!(name.ends_with(".xml"));
    }

    #[test]
    fn test_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = allocate_temp_path(Some(&missing), "x", "").unwrap_err();
        assert!(matches!(err, HarvesterError::Io(_)));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let taken = dir
            .path()
            .join(format!("page-{}taken.xml", std::process::id()));
        std::fs::write(&taken, "").unwrap();

        let mut calls = 0;
        let err = allocate_temp_path_with(Some(dir.path()), "page-", ".xml", || {
            calls += 1;
            "taken".to_string()
        })
        .unwrap_err();

        assert!(matches!(
            err,
            HarvesterError::TempFile { attempts: 100, .. }
        ));
        assert_eq!(calls, 100);
    }

    #[test]
    fn test_collision_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let pid = std::process::id();
        std::fs::write(dir.path().join(format!("x{pid}a")), "").unwrap();

        let mut names = ["a", "b"].into_iter();
        let path = allocate_temp_path_with(Some(dir.path()), "x", "", || {
            names.next().unwrap_or("c").to_string()
        })
        .unwrap();
        assert_eq!(path, dir.path().join(format!("x{pid}b")));
    }
}
