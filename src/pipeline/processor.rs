//! Downstream processing stage boundary.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::progress::ProgressHandle;
use crate::select::PreprocessingResult;

/// The opaque processing stage applied to validated images.
///
/// Failures surface as the run's `FAILURE` cause with the `processing`
/// taxonomy tag; the pipeline never retries on its own.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Processes the normalized file set, returning the payload that will
    /// be serialized and cached. May refresh the substep count through
    /// the progress handle while it works.
    async fn process(
        &self,
        input: &PreprocessingResult,
        progress: &ProgressHandle,
    ) -> anyhow::Result<Value>;
}

/// Default processor: emits a manifest of the normalized file set.
///
/// Keeps the pipeline runnable end to end without an external processing
/// collaborator wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestProcessor;

#[async_trait]
impl ImageProcessor for ManifestProcessor {
    async fn process(
        &self,
        input: &PreprocessingResult,
        _progress: &ProgressHandle,
    ) -> anyhow::Result<Value> {
        let mut files = Vec::with_capacity(input.files.len());
        for path in &input.files {
            let meta = tokio::fs::metadata(path).await?;
            files.push(json!({
                "name": path.file_name().and_then(|n| n.to_str()),
                "path": path,
                "size": meta.len(),
            }));
        }

        debug!(task = %input.name, files = files.len(), "built manifest");
        Ok(json!({
            "task": input.name,
            "type": input.kind,
            "root": input.path,
            "count": files.len(),
            "files": files,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress::WatchSink;
    use crate::select::{FileSelection, SelectionKind};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn handle() -> ProgressHandle {
        let (sink, _rx) = WatchSink::channel();
        ProgressHandle::new(Arc::new(sink))
    }

    #[tokio::test]
    async fn test_manifest_lists_files_with_sizes() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("a.png"), b"12345").expect("write");
        std::fs::write(dir.path().join("b.jpg"), b"123").expect("write");

        let selection = FileSelection::new(SelectionKind::Dir, "shoot").with_file("shoot");
        let input = PreprocessingResult::build(
            &selection,
            dir.path().to_path_buf(),
            vec![dir.path().join("a.png"), dir.path().join("b.jpg")],
        );

        let manifest = ManifestProcessor
            .process(&input, &handle())
            .await
            .expect("process");

        assert_eq!(manifest["count"], 2);
        assert_eq!(manifest["files"][0]["name"], "a.png");
        assert_eq!(manifest["files"][0]["size"], 5);
        assert_eq!(manifest["files"][1]["size"], 3);
        assert_eq!(manifest["task"], input.name);
    }

    #[tokio::test]
    async fn test_manifest_fails_on_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let selection = FileSelection::new(SelectionKind::Dir, "shoot").with_file("shoot");
        let input = PreprocessingResult::build(
            &selection,
            dir.path().to_path_buf(),
            vec![dir.path().join("vanished.png")],
        );

        let result = ManifestProcessor.process(&input, &handle()).await;
        assert!(result.is_err());
    }
}
