//! Safe archive extraction.
//!
//! Extracts zip and tar archives into a staging directory while rejecting
//! any entry that would resolve outside it. The containment check is
//! purely lexical (the filesystem is never consulted) and is applied
//! identically to both formats; a single offending entry fails the whole
//! extraction and the caller must discard the staging directory.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;
use tracing::{debug, error, warn};

use crate::error::ExtractError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Normalizes an untrusted relative path lexically.
///
/// Returns `None` when the path is absolute, carries a root or prefix
/// component, or climbs above its starting point via `..`. `.` components
/// are dropped, interior `..` components cancel the preceding segment.
pub(crate) fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}

/// Containment check for one archive entry path.
///
/// Returns the normalized path relative to the extraction root, or
/// [`ExtractError::PathTraversal`] if the entry would land outside it.
/// Traversal attempts are logged as security events, not ordinary errors.
fn sanitize_entry_path(entry_path: &Path) -> Result<PathBuf, ExtractError> {
    match normalize_relative(entry_path) {
        Some(rel) => Ok(rel),
        None => {
            let entry = entry_path.display().to_string();
            error!(
                entry = %entry,
                "security: archive entry escapes the extraction directory"
            );
            Err(ExtractError::PathTraversal { entry })
        }
    }
}

/// Extracts a zip archive into `dest`, preserving relative structure.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| ExtractError::ArchiveRead(e.to_string()))?;
    let entry_count = archive.len();

    for index in 0..entry_count {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ExtractError::ArchiveRead(e.to_string()))?;
        let name = entry.name().to_string();
        let rel = sanitize_entry_path(Path::new(&name))?;
        let target = dest.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
        }
    }

    debug!(
        archive = %archive_path.display(),
        entries = entry_count,
        "zip extraction complete"
    );
    Ok(())
}

/// Extracts a tar archive (plain or gzip-compressed) into `dest`.
///
/// Compression is detected from the gzip magic bytes rather than the file
/// extension. Link entries have their targets containment-checked as well
/// before anything is materialized.
pub fn extract_tar(archive_path: &Path, dest: &Path) -> Result<(), ExtractError> {
    let mut file = File::open(archive_path)?;
    let mut magic = [0u8; 2];
    let gzipped = file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC;
    file.rewind()?;

    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    let entries = unpack_tar(tar::Archive::new(reader), dest)?;

    debug!(
        archive = %archive_path.display(),
        entries,
        gzipped,
        "tar extraction complete"
    );
    Ok(())
}

fn unpack_tar<R: Read>(mut archive: tar::Archive<R>, dest: &Path) -> Result<usize, ExtractError> {
    let mut count = 0usize;
    let entries = archive
        .entries()
        .map_err(|e| ExtractError::ArchiveRead(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ExtractError::ArchiveRead(e.to_string()))?;
        let entry_path = entry
            .path()
            .map_err(|e| ExtractError::ArchiveRead(e.to_string()))?
            .into_owned();
        let rel = sanitize_entry_path(&entry_path)?;
        let target = dest.join(&rel);
        count += 1;

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target)?;
            }
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut entry, &mut out)?;
            }
            EntryType::Symlink => {
                let link = link_target(&entry, &entry_path)?;
                // A symlink target is resolved from the link's own
                // directory, so containment is checked from there.
                let anchored = rel
                    .parent()
                    .map(|parent| parent.join(&link))
                    .unwrap_or_else(|| link.clone());
                if normalize_relative(&anchored).is_none() {
                    let entry = entry_path.display().to_string();
                    error!(
                        entry = %entry,
                        target = %link.display(),
                        "security: symlink target escapes the extraction directory"
                    );
                    return Err(ExtractError::PathTraversal { entry });
                }
                materialize_symlink(&link, &target, &entry_path)?;
            }
            EntryType::Link => {
                let link = link_target(&entry, &entry_path)?;
                // Hard link targets are archive-root relative.
                let Some(source_rel) = normalize_relative(&link) else {
                    let entry = entry_path.display().to_string();
                    error!(
                        entry = %entry,
                        target = %link.display(),
                        "security: hard link target escapes the extraction directory"
                    );
                    return Err(ExtractError::PathTraversal { entry });
                };
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::hard_link(dest.join(source_rel), &target)?;
            }
            other => {
                warn!(
                    entry = %entry_path.display(),
                    entry_type = ?other,
                    "skipping unsupported tar entry type"
                );
            }
        }
    }
    Ok(count)
}

fn link_target<R: Read>(
    entry: &tar::Entry<'_, R>,
    entry_path: &Path,
) -> Result<PathBuf, ExtractError> {
    entry
        .link_name()
        .map_err(|e| ExtractError::ArchiveRead(e.to_string()))?
        .map(|link| link.into_owned())
        .ok_or_else(|| {
            ExtractError::ArchiveRead(format!(
                "link entry '{}' has no target",
                entry_path.display()
            ))
        })
}

#[cfg(unix)]
fn materialize_symlink(link: &Path, target: &Path, _entry: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn materialize_symlink(link: &Path, _target: &Path, entry: &Path) -> Result<(), ExtractError> {
    warn!(
        entry = %entry.display(),
        target = %link.display(),
        "skipping symlink entry on this platform"
    );
    Ok(())
}
