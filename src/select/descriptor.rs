//! File selection descriptors.
//!
//! A [`FileSelection`] describes what one pipeline run ingests: a zip or
//! tar archive, a directory under the image store, or an explicit list of
//! image files. The declared kind drives strategy dispatch; because the
//! kind is a closed enum, adding a kind is a compile-checked exhaustive
//! match rather than string comparison.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::extract::normalize_relative;
use crate::error::SelectError;

/// The four recognized selection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    /// A zip archive under the image store.
    Zip,
    /// A tar archive, optionally gzip-compressed, under the image store.
    Tar,
    /// A directory under the image store.
    Dir,
    /// An explicit list of image files under the image store.
    Images,
}

impl SelectionKind {
    /// Parses a wire tag into a kind.
    ///
    /// Unknown tags fail with [`SelectError::UnsupportedSelection`]; this
    /// is the bad-request-class error surfaced to callers that construct
    /// descriptors from raw strings.
    pub fn parse(tag: &str) -> Result<Self, SelectError> {
        match tag {
            "zip" => Ok(SelectionKind::Zip),
            "tar" => Ok(SelectionKind::Tar),
            "dir" => Ok(SelectionKind::Dir),
            "images" => Ok(SelectionKind::Images),
            other => Err(SelectError::UnsupportedSelection(other.to_string())),
        }
    }

    /// Returns the wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionKind::Zip => "zip",
            SelectionKind::Tar => "tar",
            SelectionKind::Dir => "dir",
            SelectionKind::Images => "images",
        }
    }

    /// Whether this kind names an archive requiring extraction.
    pub fn is_archive(&self) -> bool {
        matches!(self, SelectionKind::Zip | SelectionKind::Tar)
    }
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input record for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSelection {
    /// Declared kind; selects exactly one extraction strategy.
    #[serde(rename = "type")]
    pub kind: SelectionKind,
    /// Paths relative to the image-store root. Archive and directory kinds
    /// use only the first entry; the image-list kind uses every entry.
    pub files: Vec<String>,
    /// Logical task name; the result builder prefixes it with a timestamp,
    /// the cache key uses it raw.
    pub name: String,
    /// TTL override in seconds for the cached result.
    #[serde(default)]
    pub cache_duration: Option<u64>,
    /// Passthrough flag echoed in the terminal payload; never interpreted
    /// by the pipeline itself.
    #[serde(default)]
    pub autodownload: Option<bool>,
}

impl FileSelection {
    /// Creates a selection with no files and no overrides.
    pub fn new(kind: SelectionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            files: Vec::new(),
            name: name.into(),
            cache_duration: None,
            autodownload: None,
        }
    }

    /// Replaces the file list.
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Appends one file path.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Sets the cache TTL override in seconds.
    pub fn with_cache_duration(mut self, seconds: u64) -> Self {
        self.cache_duration = Some(seconds);
        self
    }

    /// Sets the autodownload passthrough flag.
    pub fn with_autodownload(mut self, autodownload: bool) -> Self {
        self.autodownload = Some(autodownload);
        self
    }

    /// Returns the archive or directory path for single-path kinds.
    pub fn primary_path(&self) -> Result<&str, SelectError> {
        self.files
            .first()
            .map(String::as_str)
            .ok_or_else(|| SelectError::InvalidSelection("files must not be empty".to_string()))
    }

    /// Validates shape and image-store containment.
    ///
    /// Containment is lexical: every referenced path must stay under the
    /// image-store root regardless of whether it exists yet. Existence is
    /// checked later by the strategy that actually reads the path.
    pub fn validate(&self, image_root: &Path) -> Result<(), SelectError> {
        if self.name.trim().is_empty() {
            return Err(SelectError::InvalidSelection(
                "name must not be empty".to_string(),
            ));
        }
        if self.files.is_empty() {
            return Err(SelectError::InvalidSelection(
                "files must not be empty".to_string(),
            ));
        }
        match self.kind {
            SelectionKind::Zip | SelectionKind::Tar | SelectionKind::Dir => {
                resolve_under(image_root, self.primary_path()?)?;
            }
            SelectionKind::Images => {
                for file in &self.files {
                    resolve_under(image_root, file)?;
                }
            }
        }
        Ok(())
    }
}

/// Joins an untrusted store-relative path onto `root`, enforcing
/// containment.
///
/// Shares the lexical normalization used for archive entries, so the two
/// containment boundaries cannot drift apart.
pub fn resolve_under(root: &Path, candidate: &str) -> Result<PathBuf, SelectError> {
    match normalize_relative(Path::new(candidate)) {
        Some(rel) => Ok(root.join(rel)),
        None => Err(SelectError::InvalidSelection(format!(
            "path '{candidate}' escapes the image store"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_kind_wire_tags() {
        let json = serde_json::to_string(&SelectionKind::Zip).expect("serialize");
        assert_eq!(json, "\"zip\"");

        for tag in ["zip", "tar", "dir", "images"] {
            let kind = SelectionKind::parse(tag).expect("known tag");
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn test_selection_kind_rejects_unknown_tag() {
        let err = SelectionKind::parse("rar").expect_err("unknown tag");
        assert!(matches!(err, SelectError::UnsupportedSelection(tag) if tag == "rar"));

        let parsed: Result<SelectionKind, _> = serde_json::from_str("\"7z\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_file_selection_wire_shape() {
        let json = r#"{
            "type": "tar",
            "files": ["uploads/batch.tar.gz"],
            "name": "batch-7",
            "cache_duration": 600
        }"#;
        let selection: FileSelection = serde_json::from_str(json).expect("deserialize");

        assert_eq!(selection.kind, SelectionKind::Tar);
        assert_eq!(selection.files, vec!["uploads/batch.tar.gz".to_string()]);
        assert_eq!(selection.name, "batch-7");
        assert_eq!(selection.cache_duration, Some(600));
        assert_eq!(selection.autodownload, None);

        let round = serde_json::to_value(&selection).expect("serialize");
        assert_eq!(round["type"], "tar");
    }

    #[test]
    fn test_validate_requires_name_and_files() {
        let root = Path::new("/store");

        let empty_files = FileSelection::new(SelectionKind::Dir, "task");
        assert!(matches!(
            empty_files.validate(root),
            Err(SelectError::InvalidSelection(_))
        ));

        let empty_name = FileSelection::new(SelectionKind::Dir, "  ").with_file("photos");
        assert!(matches!(
            empty_name.validate(root),
            Err(SelectError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_validate_enforces_store_containment() {
        let root = Path::new("/store");

        let escaping = FileSelection::new(SelectionKind::Zip, "task").with_file("../outside.zip");
        assert!(matches!(
            escaping.validate(root),
            Err(SelectError::InvalidSelection(_))
        ));

        let absolute = FileSelection::new(SelectionKind::Images, "task")
            .with_file("ok.png")
            .with_file("/etc/passwd");
        assert!(matches!(
            absolute.validate(root),
            Err(SelectError::InvalidSelection(_))
        ));

        let contained = FileSelection::new(SelectionKind::Dir, "task").with_file("photos/batch");
        contained.validate(root).expect("contained path");
    }

    #[test]
    fn test_resolve_under_joins_normalized() {
        let resolved = resolve_under(Path::new("/store"), "a/./b.png").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/store/a/b.png"));
    }
}
