//! Run submission and status tracking.
//!
//! This module provides the service surface over the pipeline:
//!
//! - **TaskService**: Accepts selections, spawns bounded pipeline runs
//! - **RunRegistry**: Maps run ids to their latest status record
//!
//! # Architecture
//!
//! ```text
//!      ┌──────────────┐
//!      │   Caller     │
//!      │  (API/CLI)   │
//!      └──────┬───────┘
//!             │ submit(selection) -> run id
//!      ┌──────▼───────┐        ┌──────────────┐
//!      │ TaskService  │───────▶│ RunRegistry  │
//!      └──────┬───────┘ status └──────▲───────┘
//!             │ spawn (bounded)       │ latest record
//!      ┌──────▼───────┐        ┌──────┴───────┐
//!      │PipelineRunner│───────▶│ watch channel│
//!      └──────────────┘ publish└──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use imgforge::cache::MemoryCache;
//! use imgforge::config::PipelineConfig;
//! use imgforge::pipeline::{ManifestProcessor, PipelineRunner};
//! use imgforge::select::{FileSelection, SelectionKind};
//! use imgforge::service::TaskService;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::from_env()?;
//! let runner = PipelineRunner::new(
//!     config,
//!     Arc::new(ManifestProcessor),
//!     Arc::new(MemoryCache::new()),
//! );
//! let service = TaskService::new(runner);
//!
//! let selection = FileSelection::new(SelectionKind::Zip, "gallery")
//!     .with_file("uploads/gallery.zip");
//! let run_id = service.submit(selection);
//!
//! // Poll the latest record, or follow the channel to completion
//! let status = service.status(&run_id);
//! let mut follower = service.follow(&run_id).unwrap();
//! while follower.changed().await.is_ok() {
//!     println!("{:?}", *follower.borrow());
//! }
//! ```

pub mod registry;
pub mod worker;

// Re-export main types for convenience
pub use registry::RunRegistry;
pub use worker::TaskService;
