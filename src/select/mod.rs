//! Selection ingestion: descriptors, safe extraction, normalization.
//!
//! This module turns a [`FileSelection`] into a normalized set of image
//! files ready for downstream processing:
//!
//! - **descriptor**: the input record and its shape/containment validation
//! - **staging**: run-exclusive extraction directories
//! - **extract**: safe zip/tar extraction with traversal containment
//! - **normalize**: single-wrapper directory flattening
//! - **validate**: the image validity boundary and directory filtering
//! - **preprocess**: strategy dispatch and result assembly
//! - **archive**: the write-side companion used by `pack` and by tests

pub mod archive;
pub mod descriptor;
pub mod extract;
pub mod normalize;
pub mod preprocess;
pub mod staging;
pub mod validate;

pub use archive::{pack_tar, pack_zip};
pub use descriptor::{resolve_under, FileSelection, SelectionKind};
pub use extract::{extract_tar, extract_zip};
pub use normalize::flatten_wrapper;
pub use preprocess::{Preprocessed, Preprocessor, PreprocessingResult};
pub use staging::StagingArea;
pub use validate::{collect_images, ExtensionValidator, ImageValidator};
