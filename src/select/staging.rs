//! Run-exclusive staging directories.
//!
//! Every pipeline run that extracts an archive gets its own staging
//! directory with a collision-resistant random name, so concurrent runs
//! never share extraction state. Cleanup is tied to drop; a failed run
//! discards its staging area along with any partially extracted content.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::SelectError;

/// Ephemeral extraction directory owned by exactly one pipeline run.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Creates a fresh staging directory under `root`.
    ///
    /// The root is created first if missing, so a configured staging
    /// location works on first use.
    pub fn create(root: &Path) -> Result<Self, SelectError> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("imgforge-")
            .tempdir_in(root)?;
        debug!(path = %dir.path().display(), "created staging area");
        Ok(Self { dir })
    }

    /// Path of the staging directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Detaches cleanup and returns the directory path.
    ///
    /// The directory is then the caller's to remove, typically after
    /// inspecting a failed extraction.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staging_areas_are_unique() {
        let root = TempDir::new().expect("tempdir");
        let a = StagingArea::create(root.path()).expect("staging a");
        let b = StagingArea::create(root.path()).expect("staging b");

        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
        assert!(b.path().is_dir());
    }

    #[test]
    fn test_staging_area_removed_on_drop() {
        let root = TempDir::new().expect("tempdir");
        let path = {
            let staging = StagingArea::create(root.path()).expect("staging");
            std::fs::write(staging.path().join("a.png"), b"data").expect("write");
            staging.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_staging_area_keep_detaches_cleanup() {
        let root = TempDir::new().expect("tempdir");
        let staging = StagingArea::create(root.path()).expect("staging");
        let kept = staging.keep();
        assert!(kept.is_dir());
        std::fs::remove_dir_all(kept).expect("manual cleanup");
    }

    #[test]
    fn test_staging_creates_missing_root() {
        let base = TempDir::new().expect("tempdir");
        let nested = base.path().join("staging/runs");
        let staging = StagingArea::create(&nested).expect("staging");
        assert!(staging.path().starts_with(&nested));
    }
}
