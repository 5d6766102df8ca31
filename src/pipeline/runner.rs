//! Pipeline runner executing one preprocessing run end to end.
//!
//! This module provides the `PipelineRunner` which drives the four
//! sequential stages of a run: preprocess, process, serialize, cache.
//! Each stage is announced through the progress handle before it starts,
//! and any stage failure terminates the run with a `FAILURE` record.
//! Runs are never retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::cache::{result_key, ResultCache};
use crate::config::PipelineConfig;
use crate::error::{SelectError, TaskError};
use crate::select::{ExtensionValidator, FileSelection, ImageValidator, Preprocessor};
use crate::serialize::Serializer;

use super::processor::ImageProcessor;
use super::progress::{
    ProgressHandle, STEP_CACHING, STEP_PREPROCESSING, STEP_PROCESSING, STEP_SERIALIZING,
};

/// Result of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Raw task name from the selection.
    pub task: String,
    /// Timestamped result name.
    pub result_name: String,
    /// Cache key the serialized result was stored under.
    pub cache_key: String,
    /// Expiry applied to the cached result.
    pub ttl: Duration,
    /// Resolved autodownload flag echoed in the terminal record.
    pub autodownload: bool,
    /// Number of images that flowed through processing.
    pub images: usize,
}

/// Runner that executes pipeline runs against shared collaborators.
///
/// The runner handles:
/// - Resolving per-selection cache policy against configured defaults
/// - Staging selections on the blocking pool
/// - Publishing stage progress and exactly one terminal record per run
/// - Caching the serialized result under the task's key
pub struct PipelineRunner {
    config: PipelineConfig,
    preprocessor: Preprocessor,
    processor: Arc<dyn ImageProcessor>,
    cache: Arc<dyn ResultCache>,
    serializer: Serializer,
}

impl PipelineRunner {
    /// Creates a new runner over the configured image store.
    ///
    /// # Arguments
    ///
    /// * `config` - Pipeline configuration (store paths and cache defaults)
    /// * `processor` - Downstream processing stage
    /// * `cache` - Result cache backend
    pub fn new(
        config: PipelineConfig,
        processor: Arc<dyn ImageProcessor>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        let preprocessor = Preprocessor::new(
            config.image_dir.clone(),
            config.staging_root.clone(),
            Arc::new(ExtensionValidator::default()),
        );
        Self {
            config,
            preprocessor,
            processor,
            cache,
            serializer: Serializer,
        }
    }

    /// Replaces the image validity check used during preprocessing.
    pub fn with_validator(mut self, validator: Arc<dyn ImageValidator>) -> Self {
        self.preprocessor = Preprocessor::new(
            self.config.image_dir.clone(),
            self.config.staging_root.clone(),
            validator,
        );
        self
    }

    /// Returns the runner's configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Executes one run and publishes its terminal record.
    ///
    /// The terminal state is always published through `progress` before this
    /// method returns, on failure as well as success. The returned value
    /// mirrors it for callers holding the join handle.
    pub async fn run(
        &self,
        selection: FileSelection,
        progress: &ProgressHandle,
    ) -> Result<RunOutcome, TaskError> {
        match self.execute(&selection, progress).await {
            Ok(outcome) => {
                info!(
                    task = %outcome.task,
                    cache_key = %outcome.cache_key,
                    images = outcome.images,
                    "run complete"
                );
                progress.succeed(&outcome.task, outcome.autodownload);
                Ok(outcome)
            }
            Err(err) => {
                error!(task = %selection.name, kind = %err.kind(), error = %err, "run failed");
                progress.fail(err.kind(), err.to_string());
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        selection: &FileSelection,
        progress: &ProgressHandle,
    ) -> Result<RunOutcome, TaskError> {
        let ttl = selection
            .cache_duration
            .map(Duration::from_secs)
            .unwrap_or(self.config.default_cache_ttl);
        let autodownload = selection
            .autodownload
            .unwrap_or(self.config.default_autodownload);

        // Stage 1: stage the selection on the blocking pool.
        progress.update(STEP_PREPROCESSING, 1, 0);
        let preprocessor = self.preprocessor.clone();
        let owned = selection.clone();
        let preprocessed = tokio::task::spawn_blocking(move || preprocessor.preprocess(&owned))
            .await
            .map_err(|err| TaskError::Select(SelectError::Io(std::io::Error::other(err))))??;
        debug!(
            task = %selection.name,
            images = preprocessed.result.files.len(),
            "preprocessing complete"
        );

        // Stage 2: downstream processing over the staged images.
        progress.update(STEP_PROCESSING, 2, preprocessed.result.files.len() as u64);
        let payload = self
            .processor
            .process(&preprocessed.result, progress)
            .await
            .map_err(TaskError::Processing)?;

        // Stage 3: serialize the processed payload.
        progress.update(STEP_SERIALIZING, 3, 0);
        let blob = self.serializer.serialize(&payload)?;

        // Stage 4: cache the blob. Staging contents live until this returns.
        progress.update(STEP_CACHING, 4, 0);
        let cache_key = result_key(&selection.name);
        self.cache.set(&cache_key, blob, ttl).await?;

        Ok(RunOutcome {
            task: selection.name.clone(),
            result_name: preprocessed.result.name.clone(),
            cache_key,
            ttl,
            autodownload,
            images: preprocessed.result.files.len(),
        })
    }
}
