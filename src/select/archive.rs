//! Archive creation.
//!
//! The write-side companion to extraction: packs a directory tree into a
//! zip or tar archive. Used by the `pack` CLI command and by tests to
//! build fixtures with the exact entry layout the extractors consume.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;
use walkdir::WalkDir;

use crate::error::SelectError;

/// Packs the contents of `src` into a zip archive at `dest`.
///
/// Entry names are relative to `src`, so a wrapper directory appears in
/// the archive only if `src` itself contains one. Returns the number of
/// file entries written.
pub fn pack_zip(src: &Path, dest: &Path) -> Result<usize, SelectError> {
    let file = File::create(dest)?;
    let mut writer = zip::ZipWriter::new(BufWriter::new(file));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut count = 0usize;
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| io::Error::other("walk entry outside pack root"))?;
        let name = rel.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .map_err(io::Error::other)?;
        } else {
            writer.start_file(name, options).map_err(io::Error::other)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut writer)?;
            count += 1;
        }
    }
    writer.finish().map_err(io::Error::other)?.flush()?;

    info!(archive = %dest.display(), files = count, "packed zip archive");
    Ok(count)
}

/// Packs the contents of `src` into a tar archive at `dest`, optionally
/// gzip-compressed.
pub fn pack_tar(src: &Path, dest: &Path, gzip: bool) -> Result<usize, SelectError> {
    let file = File::create(dest)?;
    let count = if gzip {
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let count = append_tree(&mut builder, src)?;
        builder.into_inner()?.finish()?.flush()?;
        count
    } else {
        let mut builder = tar::Builder::new(BufWriter::new(file));
        let count = append_tree(&mut builder, src)?;
        builder.into_inner()?.flush()?;
        count
    };

    info!(archive = %dest.display(), files = count, gzip, "packed tar archive");
    Ok(count)
}

fn append_tree<W: Write>(builder: &mut tar::Builder<W>, src: &Path) -> Result<usize, SelectError> {
    let mut count = 0usize;
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| io::Error::other("walk entry outside pack root"))?;

        if entry.file_type().is_dir() {
            builder.append_dir(rel, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), rel)?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::extract::{extract_tar, extract_zip};
    use std::fs;
    use tempfile::TempDir;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("nested")).expect("mkdir");
        fs::write(root.join("a.png"), b"aaa").expect("write");
        fs::write(root.join("nested/b.jpg"), b"bbb").expect("write");
    }

    #[test]
    fn test_pack_zip_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("src");
        build_tree(&src);

        let archive = dir.path().join("out.zip");
        let count = pack_zip(&src, &archive).expect("pack");
        assert_eq!(count, 2);

        let dest = dir.path().join("unpacked");
        fs::create_dir(&dest).expect("mkdir");
        extract_zip(&archive, &dest).expect("extract");
        assert_eq!(fs::read(dest.join("a.png")).expect("read"), b"aaa");
        assert_eq!(fs::read(dest.join("nested/b.jpg")).expect("read"), b"bbb");
    }

    #[test]
    fn test_pack_tar_roundtrip_plain_and_gzip() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("src");
        build_tree(&src);

        for (gzip, label) in [(false, "plain"), (true, "gzip")] {
            let archive = dir.path().join(format!("out-{label}.tar"));
            let count = pack_tar(&src, &archive, gzip).expect("pack");
            assert_eq!(count, 2, "{label}");

            let dest = dir.path().join(format!("unpacked-{label}"));
            fs::create_dir(&dest).expect("mkdir");
            extract_tar(&archive, &dest).expect("extract");
            assert_eq!(
                fs::read(dest.join("nested/b.jpg")).expect("read"),
                b"bbb",
                "{label}"
            );
        }
    }
}
