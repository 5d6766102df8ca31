//! Selection preprocessing: strategy dispatch and result assembly.
//!
//! [`Preprocessor::preprocess`] turns a validated [`FileSelection`] into a
//! [`PreprocessingResult`]: archives are extracted into a fresh staging
//! area, flattened and filtered; directories are filtered in place; image
//! lists are resolved and filtered entry by entry. Exactly one strategy
//! runs per descriptor, chosen by an exhaustive match over the kind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::descriptor::{resolve_under, FileSelection, SelectionKind};
use super::extract::{extract_tar, extract_zip};
use super::normalize::flatten_wrapper;
use super::staging::StagingArea;
use super::validate::{collect_images, ImageValidator};
use crate::error::{ExtractError, SelectError};

/// Timestamp prefix applied to result names.
const NAME_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M";

/// Normalized output record consumed by the downstream processing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingResult {
    /// Root directory containing the normalized files.
    pub path: PathBuf,
    /// Task name prefixed with the run timestamp.
    pub name: String,
    /// Original descriptor kind.
    #[serde(rename = "type")]
    pub kind: SelectionKind,
    /// Ordered validated image paths.
    pub files: Vec<PathBuf>,
    /// Full original descriptor, retained for downstream stages.
    #[serde(rename = "data")]
    pub selection: FileSelection,
}

impl PreprocessingResult {
    /// Assembles the result record, stamping the name with the current
    /// local time as `YYYY_MM_DD_HH_MM_{name}`.
    pub fn build(selection: &FileSelection, path: PathBuf, files: Vec<PathBuf>) -> Self {
        let stamp = Local::now().format(NAME_TIMESTAMP_FORMAT);
        Self {
            path,
            name: format!("{}_{}", stamp, selection.name),
            kind: selection.kind,
            files,
            selection: selection.clone(),
        }
    }
}

/// One preprocessed selection plus the staging area backing it, if any.
///
/// The staging area must outlive downstream reads of `result.files`;
/// dropping this value discards the extracted content.
#[derive(Debug)]
pub struct Preprocessed {
    /// The normalized result record.
    pub result: PreprocessingResult,
    /// Present only for archive kinds.
    pub staging: Option<StagingArea>,
}

/// Strategy dispatcher turning selection descriptors into normalized
/// image sets.
#[derive(Clone)]
pub struct Preprocessor {
    image_root: PathBuf,
    staging_root: PathBuf,
    validator: Arc<dyn ImageValidator>,
}

impl Preprocessor {
    /// Creates a dispatcher rooted at the given image store.
    pub fn new(
        image_root: impl Into<PathBuf>,
        staging_root: impl Into<PathBuf>,
        validator: Arc<dyn ImageValidator>,
    ) -> Self {
        Self {
            image_root: image_root.into(),
            staging_root: staging_root.into(),
            validator,
        }
    }

    /// The configured image-store root.
    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    /// Validates the descriptor and runs exactly one strategy for its
    /// kind.
    pub fn preprocess(&self, selection: &FileSelection) -> Result<Preprocessed, SelectError> {
        selection.validate(&self.image_root)?;
        match selection.kind {
            SelectionKind::Zip => self.preprocess_archive(selection, extract_zip),
            SelectionKind::Tar => self.preprocess_archive(selection, extract_tar),
            SelectionKind::Dir => self.preprocess_dir(selection),
            SelectionKind::Images => self.preprocess_images(selection),
        }
    }

    /// Shared archive strategy: extract into fresh staging, collapse a
    /// single wrapper directory, filter images.
    fn preprocess_archive(
        &self,
        selection: &FileSelection,
        extract: fn(&Path, &Path) -> Result<(), ExtractError>,
    ) -> Result<Preprocessed, SelectError> {
        let relative = selection.primary_path()?;
        let archive = resolve_under(&self.image_root, relative)?;
        if !archive.is_file() {
            return Err(SelectError::NotFound(relative.to_string()));
        }

        let staging = StagingArea::create(&self.staging_root)?;
        extract(&archive, staging.path())?;
        let flattened = flatten_wrapper(staging.path())?;
        let files = collect_images(staging.path(), self.validator.as_ref())?;

        info!(
            task = %selection.name,
            archive = %archive.display(),
            staging = %staging.path().display(),
            flattened,
            images = files.len(),
            "archive preprocessed"
        );

        let result = PreprocessingResult::build(selection, staging.path().to_path_buf(), files);
        Ok(Preprocessed {
            result,
            staging: Some(staging),
        })
    }

    fn preprocess_dir(&self, selection: &FileSelection) -> Result<Preprocessed, SelectError> {
        let relative = selection.primary_path()?;
        let dir = resolve_under(&self.image_root, relative)?;
        if !dir.is_dir() {
            return Err(SelectError::NotFound(relative.to_string()));
        }

        let files = collect_images(&dir, self.validator.as_ref())?;
        info!(
            task = %selection.name,
            dir = %dir.display(),
            images = files.len(),
            "directory preprocessed"
        );

        let result = PreprocessingResult::build(selection, dir, files);
        Ok(Preprocessed {
            result,
            staging: None,
        })
    }

    /// Image-list strategy: resolve each listed path under the store and
    /// run it through the same validity check as the other kinds. Entries
    /// that are missing or fail validation are dropped with a warning
    /// rather than failing the run.
    fn preprocess_images(&self, selection: &FileSelection) -> Result<Preprocessed, SelectError> {
        let mut files = Vec::with_capacity(selection.files.len());
        for relative in &selection.files {
            let path = resolve_under(&self.image_root, relative)?;
            if !path.is_file() {
                warn!(task = %selection.name, file = %relative, "listed file missing, dropped");
                continue;
            }
            if self.validator.is_valid_image(&path) {
                files.push(path);
            } else {
                warn!(
                    task = %selection.name,
                    file = %relative,
                    "listed file failed image validation, dropped"
                );
            }
        }

        info!(
            task = %selection.name,
            listed = selection.files.len(),
            images = files.len(),
            "image list preprocessed"
        );

        let result = PreprocessingResult::build(selection, self.image_root.clone(), files);
        Ok(Preprocessed {
            result,
            staging: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::archive::{pack_tar, pack_zip};
    use crate::select::validate::ExtensionValidator;
    use std::fs;
    use tempfile::TempDir;

    fn preprocessor(store: &Path, staging: &Path) -> Preprocessor {
        Preprocessor::new(
            store,
            staging,
            Arc::new(ExtensionValidator::new(["png", "jpg"])),
        )
    }

    fn file_names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .expect("file name")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_zip_selection_extracts_flattens_and_filters() {
        let root = TempDir::new().expect("tempdir");
        let store = root.path().join("store");
        let wrapped = root.path().join("tree/batch");
        fs::create_dir_all(&store).expect("mkdir");
        fs::create_dir_all(&wrapped).expect("mkdir");
        fs::write(wrapped.join("a.png"), b"a").expect("write");
        fs::write(wrapped.join("b.txt"), b"b").expect("write");
        pack_zip(&root.path().join("tree"), &store.join("batch.zip")).expect("pack");

        let selection = FileSelection::new(SelectionKind::Zip, "batch").with_file("batch.zip");
        let pre = preprocessor(&store, &root.path().join("staging"))
            .preprocess(&selection)
            .expect("preprocess");

        assert_eq!(file_names(&pre.result.files), vec!["a.png"]);
        let staging = pre.staging.as_ref().expect("staging present");
        assert_eq!(pre.result.path, staging.path());
        // The wrapper level is gone.
        assert!(staging.path().join("a.png").is_file());
        assert!(!staging.path().join("batch").exists());
        assert_eq!(pre.result.kind, SelectionKind::Zip);
        assert_eq!(pre.result.selection.name, "batch");
    }

    #[test]
    fn test_tar_selection_without_wrapper_is_not_flattened() {
        let root = TempDir::new().expect("tempdir");
        let store = root.path().join("store");
        let tree = root.path().join("tree");
        fs::create_dir_all(&store).expect("mkdir");
        fs::create_dir_all(&tree).expect("mkdir");
        fs::write(tree.join("x.jpg"), b"x").expect("write");
        fs::write(tree.join("y.png"), b"y").expect("write");
        pack_tar(&tree, &store.join("batch.tar"), false).expect("pack");

        let selection = FileSelection::new(SelectionKind::Tar, "batch").with_file("batch.tar");
        let pre = preprocessor(&store, &root.path().join("staging"))
            .preprocess(&selection)
            .expect("preprocess");

        assert_eq!(file_names(&pre.result.files), vec!["x.jpg", "y.png"]);
    }

    #[test]
    fn test_dir_selection_filters_in_place() {
        let root = TempDir::new().expect("tempdir");
        let store = root.path().join("store");
        let batch = store.join("shoot-1");
        fs::create_dir_all(&batch).expect("mkdir");
        fs::write(batch.join("keep.png"), b"k").expect("write");
        fs::write(batch.join("skip.raw"), b"s").expect("write");

        let selection = FileSelection::new(SelectionKind::Dir, "shoot").with_file("shoot-1");
        let pre = preprocessor(&store, &root.path().join("staging"))
            .preprocess(&selection)
            .expect("preprocess");

        assert_eq!(file_names(&pre.result.files), vec!["keep.png"]);
        assert_eq!(pre.result.path, batch);
        assert!(pre.staging.is_none());
    }

    #[test]
    fn test_dir_selection_empty_dir_yields_empty_files() {
        let root = TempDir::new().expect("tempdir");
        let store = root.path().join("store");
        fs::create_dir_all(store.join("empty")).expect("mkdir");

        let selection = FileSelection::new(SelectionKind::Dir, "empty").with_file("empty");
        let pre = preprocessor(&store, &root.path().join("staging"))
            .preprocess(&selection)
            .expect("preprocess");

        assert!(pre.result.files.is_empty());
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let root = TempDir::new().expect("tempdir");
        let store = root.path().join("store");
        fs::create_dir_all(&store).expect("mkdir");

        let selection = FileSelection::new(SelectionKind::Zip, "gone").with_file("gone.zip");
        let err = preprocessor(&store, &root.path().join("staging"))
            .preprocess(&selection)
            .expect_err("missing archive");
        assert!(matches!(err, SelectError::NotFound(path) if path == "gone.zip"));
    }

    #[test]
    fn test_image_list_validates_and_drops() {
        let root = TempDir::new().expect("tempdir");
        let store = root.path().join("store");
        fs::create_dir_all(&store).expect("mkdir");
        fs::write(store.join("one.png"), b"1").expect("write");
        fs::write(store.join("two.txt"), b"2").expect("write");

        let selection = FileSelection::new(SelectionKind::Images, "list")
            .with_file("one.png")
            .with_file("two.txt")
            .with_file("missing.jpg");
        let pre = preprocessor(&store, &root.path().join("staging"))
            .preprocess(&selection)
            .expect("preprocess");

        assert_eq!(file_names(&pre.result.files), vec!["one.png"]);
        assert_eq!(pre.result.path, store);
        assert!(pre.result.files[0].starts_with(&store));
    }

    #[test]
    fn test_escaping_selection_is_rejected_before_io() {
        let root = TempDir::new().expect("tempdir");
        let store = root.path().join("store");
        fs::create_dir_all(&store).expect("mkdir");

        let selection =
            FileSelection::new(SelectionKind::Zip, "escape").with_file("../outside.zip");
        let err = preprocessor(&store, &root.path().join("staging"))
            .preprocess(&selection)
            .expect_err("escaping path");
        assert!(matches!(err, SelectError::InvalidSelection(_)));
    }

    #[test]
    fn test_result_name_carries_timestamp_prefix() {
        let selection = FileSelection::new(SelectionKind::Images, "gallery");
        let result = PreprocessingResult::build(&selection, PathBuf::from("/store"), Vec::new());

        // YYYY_MM_DD_HH_MM_gallery
        assert!(result.name.ends_with("_gallery"));
        assert_eq!(result.name.len(), "YYYY_MM_DD_HH_MM".len() + "_gallery".len());
        assert!(result.name[..4].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_result_wire_shape_uses_original_field_names() {
        let selection = FileSelection::new(SelectionKind::Dir, "shoot").with_file("shoot-1");
        let result = PreprocessingResult::build(&selection, PathBuf::from("/store/shoot-1"), vec![]);
        let value = serde_json::to_value(&result).expect("serialize");

        assert_eq!(value["type"], "dir");
        assert!(value.get("data").is_some());
        assert!(value.get("selection").is_none());
    }
}
