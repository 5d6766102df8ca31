//! Directory normalization after extraction.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::SelectError;

/// Collapses a single superfluous wrapper directory.
///
/// Many archive tools wrap contents in a folder named after the archive;
/// without this step every normalized result would carry one spurious
/// nesting level. If `dir` has exactly one child and that child is a
/// directory, its entries are moved up into `dir` and the wrapper is
/// removed. The check runs exactly once per run, never iteratively.
/// Returns whether a wrapper was collapsed.
pub fn flatten_wrapper(dir: &Path) -> Result<bool, SelectError> {
    let mut children = fs::read_dir(dir)?;
    let first = match children.next() {
        Some(entry) => entry?,
        None => return Ok(false),
    };
    if children.next().is_some() {
        return Ok(false);
    }

    let wrapper = first.path();
    if !wrapper.is_dir() {
        return Ok(false);
    }

    for entry in fs::read_dir(&wrapper)? {
        let entry = entry?;
        fs::rename(entry.path(), dir.join(entry.file_name()))?;
    }
    fs::remove_dir(&wrapper)?;

    debug!(
        dir = %dir.display(),
        wrapper = %wrapper.display(),
        "collapsed wrapper directory"
    );
    Ok(true)
}
