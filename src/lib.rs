//! imgforge: Image selection preprocessing pipeline with cached results.
//!
//! This library provides tools for staging file selections (archives,
//! directories or explicit image lists), filtering them to valid images,
//! and caching the processed result under the task's key.

// Core modules
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod select;
pub mod serialize;
pub mod service;

// Re-export commonly used error types
pub use error::{CacheError, ConfigError, ExtractError, SelectError, TaskError};
