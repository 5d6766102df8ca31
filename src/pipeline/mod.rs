//! Pipeline orchestration for image preprocessing runs.
//!
//! This module provides the infrastructure for executing preprocessing
//! runs: staging a file selection, processing the staged images, and
//! caching the serialized result, with progress reported at every stage.
//!
//! # Architecture
//!
//! The pipeline consists of several components:
//!
//! - **Runner**: Drives the four sequential stages of one run
//! - **Processor**: The downstream stage operating on staged images
//! - **Progress**: Status records and the sinks they are published through
//!
//! # Run Flow
//!
//! 1. **Preprocessing**: The selection is validated, staged (archives are
//!    extracted, wrapper directories flattened) and filtered to images
//! 2. **Processing**: The downstream processor consumes the staged images
//! 3. **Serializing**: The processed payload is serialized to bytes
//! 4. **Caching**: The blob is written to the result cache under the
//!    task's key with its resolved expiry
//!
//! Each stage is announced through a `PROGRESS` record before it starts.
//! A run ends with exactly one terminal record, `SUCCESS` or `FAILURE`,
//! and is never retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use imgforge::cache::MemoryCache;
//! use imgforge::config::PipelineConfig;
//! use imgforge::pipeline::{ManifestProcessor, PipelineRunner, ProgressHandle, WatchSink};
//! use imgforge::select::{FileSelection, SelectionKind};
//!
//! // Create configuration
//! let config = PipelineConfig::new()
//!     .with_image_dir("/srv/images")
//!     .with_default_cache_ttl(Duration::from_secs(3600));
//!
//! // Create the runner over a cache backend
//! let runner = PipelineRunner::new(
//!     config,
//!     Arc::new(ManifestProcessor),
//!     Arc::new(MemoryCache::new()),
//! );
//!
//! // Describe the selection
//! let selection = FileSelection::new(SelectionKind::Zip, "gallery")
//!     .with_file("uploads/gallery.zip");
//!
//! // Run it, following status through a watch channel
//! let (sink, status) = WatchSink::channel();
//! let progress = ProgressHandle::new(Arc::new(sink));
//! let outcome = runner.run(selection, &progress).await?;
//!
//! println!("cached {} images under {}", outcome.images, outcome.cache_key);
//! ```

pub mod processor;
pub mod progress;
pub mod runner;

// Re-export main types for convenience
pub use processor::{ImageProcessor, ManifestProcessor};
pub use progress::{ChannelSink, ProgressHandle, ProgressSink, TaskStatus, WatchSink};
pub use runner::{PipelineRunner, RunOutcome};
