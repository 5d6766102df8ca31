//! Image validity checking and directory filtering.
//!
//! The validity check is a collaborator boundary behind the
//! [`ImageValidator`] trait: production wires in the extension-based
//! [`ExtensionValidator`], tests substitute deterministic stand-ins.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::SelectError;

/// Validity check applied to candidate image files.
pub trait ImageValidator: Send + Sync {
    /// Whether `path` should be kept as an image.
    fn is_valid_image(&self, path: &Path) -> bool;
}

/// Extension-based validator with a configurable accept set.
#[derive(Debug, Clone)]
pub struct ExtensionValidator {
    extensions: HashSet<String>,
}

impl ExtensionValidator {
    /// Extensions accepted by default, lowercase and without dots.
    pub const DEFAULT_EXTENSIONS: [&'static str; 7] =
        ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff"];

    /// Creates a validator accepting the given extensions,
    /// case-insensitively.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Default for ExtensionValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EXTENSIONS)
    }
}

impl ImageValidator for ExtensionValidator {
    fn is_valid_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

/// Enumerates the immediate entries of `dir` and keeps valid images.
///
/// Non-recursive: only the top level is inspected. Results are absolute
/// paths in file-name order, so the output is stable regardless of
/// filesystem enumeration order. An empty result is valid and simply
/// yields zero images downstream.
pub fn collect_images(
    dir: &Path,
    validator: &dyn ImageValidator,
) -> Result<Vec<PathBuf>, SelectError> {
    if !dir.is_dir() {
        return Err(SelectError::NotFound(dir.display().to_string()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        if validator.is_valid_image(entry.path()) {
            images.push(entry.path().to_path_buf());
        }
    }
    Ok(images)
}
