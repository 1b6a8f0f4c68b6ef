/*!
 * Archive writer: bundles a collected target directory into a single
 * zip/tar(+compression) file next to the target. 7z is part of the
 * configured format set but has no supporting crate in this dependency
 * stack (see DESIGN.md); requesting it fails with `CollectorError::Archive`
 * the same way the source collector fails without `py7zr` installed.
 */

use std::fs::File;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{ArchiveCompression, ArchiveFormat};
use crate::error::{CollectorError, Result};

/// Callback invoked after each file is added to the archive.
pub type ArchiveProgressCallback<'a> = dyn Fn(f64, u64, u64, Option<&str>) + 'a;

/// Contract an archive backend must satisfy. The bundled [`LocalArchiveWriter`]
/// covers zip/tar; a caller embedding this crate in a larger service can
/// supply its own (e.g. one that streams straight to object storage).
pub trait ArchiveWriter: Send + Sync {
    fn write_archive(
        &self,
        source_dir: &Path,
        archive_path: &Path,
        format: ArchiveFormat,
        compression: Option<ArchiveCompression>,
        progress_cb: Option<&ArchiveProgressCallback>,
    ) -> Result<()>;
}

/// Suggested archive file name for a format/compression pair, mirroring the
/// source collector's naming (`archive.tar.gz`, `archive.zip`, ...).
pub fn archive_file_name(format: ArchiveFormat, compression: Option<ArchiveCompression>) -> String {
    match format {
        ArchiveFormat::Zip => "archive.zip".to_string(),
        ArchiveFormat::SevenZ => "archive.7z".to_string(),
        ArchiveFormat::Tar => match compression {
            Some(ArchiveCompression::Gzip) => "archive.tar.gz".to_string(),
            Some(ArchiveCompression::Bzip2) => "archive.tar.bz2".to_string(),
            Some(ArchiveCompression::Xz) => "archive.tar.xz".to_string(),
            None => "archive.tar".to_string(),
        },
    }
}

/// Wraps the writer a tar stream is built on so the chosen compression's
/// trailer gets flushed explicitly once every entry has been appended.
enum TarEncoder {
    Plain(File),
    Gzip(flate2::write::GzEncoder<File>),
    Bzip2(bzip2::write::BzEncoder<File>),
    Xz(xz2::write::XzEncoder<File>),
}

impl TarEncoder {
    fn finish(self) -> std::io::Result<()> {
        match self {
            TarEncoder::Plain(_) => Ok(()),
            TarEncoder::Gzip(e) => e.finish().map(|_| ()),
            TarEncoder::Bzip2(e) => e.finish().map(|_| ()),
            TarEncoder::Xz(e) => e.finish().map(|_| ()),
        }
    }
}

impl std::io::Write for TarEncoder {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            TarEncoder::Plain(w) => w.write(buf),
            TarEncoder::Gzip(w) => w.write(buf),
            TarEncoder::Bzip2(w) => w.write(buf),
            TarEncoder::Xz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            TarEncoder::Plain(w) => w.flush(),
            TarEncoder::Gzip(w) => w.flush(),
            TarEncoder::Bzip2(w) => w.flush(),
            TarEncoder::Xz(w) => w.flush(),
        }
    }
}

fn count_files(source_dir: &Path) -> u64 {
    WalkDir::new(source_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count() as u64
}

/// Default in-process archive writer, backed by `zip`/`tar`/`flate2`/`bzip2`/`xz2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalArchiveWriter;

impl LocalArchiveWriter {
    fn write_zip(
        &self,
        source_dir: &Path,
        archive_path: &Path,
        progress_cb: Option<&ArchiveProgressCallback>,
    ) -> Result<()> {
        use zip::write::{FileOptions, ZipWriter};

        let total = count_files(source_dir);
        if total == 0 {
            return Err(CollectorError::Archive(format!(
                "no files found in source directory: {}",
                source_dir.display()
            )));
        }

        let file = File::create(archive_path)
            .map_err(|e| CollectorError::Archive(format!("failed to create archive file: {}", e)))?;
        let mut writer = ZipWriter::new(file);
        let options: FileOptions<()> =
            FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut done = 0u64;
        for entry in WalkDir::new(source_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let arcname = path
                .strip_prefix(source_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            writer
                .start_file(&arcname, options)
                .map_err(|e| CollectorError::Archive(format!("failed to add {}: {}", arcname, e)))?;
            let mut src = File::open(path)
                .map_err(|e| CollectorError::Archive(format!("failed to open {}: {}", path.display(), e)))?;
            std::io::copy(&mut src, &mut writer)
                .map_err(|e| CollectorError::Archive(format!("failed to write {}: {}", arcname, e)))?;

            done += 1;
            if let Some(cb) = progress_cb {
                cb(done as f64 / total as f64 * 100.0, done, total, Some(&arcname));
            }
        }

        writer
            .finish()
            .map_err(|e| CollectorError::Archive(format!("failed to finalize zip archive: {}", e)))?;
        Ok(())
    }

    fn write_tar(
        &self,
        source_dir: &Path,
        archive_path: &Path,
        compression: Option<ArchiveCompression>,
        progress_cb: Option<&ArchiveProgressCallback>,
    ) -> Result<()> {
        let total = count_files(source_dir);
        if total == 0 {
            return Err(CollectorError::Archive(format!(
                "no files found in source directory: {}",
                source_dir.display()
            )));
        }

        let file = File::create(archive_path)
            .map_err(|e| CollectorError::Archive(format!("failed to create archive file: {}", e)))?;

        // Compression is chosen up front (tar streams, it can't be picked
        // per-entry), matching the source collector's mode-string dispatch.
        let encoder = match compression {
            Some(ArchiveCompression::Gzip) => {
                TarEncoder::Gzip(flate2::write::GzEncoder::new(file, flate2::Compression::default()))
            }
            Some(ArchiveCompression::Bzip2) => {
                TarEncoder::Bzip2(bzip2::write::BzEncoder::new(file, bzip2::Compression::default()))
            }
            Some(ArchiveCompression::Xz) => TarEncoder::Xz(xz2::write::XzEncoder::new(file, 6)),
            None => TarEncoder::Plain(file),
        };

        let mut builder = tar::Builder::new(encoder);
        let mut done = 0u64;
        for entry in WalkDir::new(source_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let arcname = path.strip_prefix(source_dir).unwrap_or(path);

            builder
                .append_path_with_name(path, arcname)
                .map_err(|e| {
                    CollectorError::Archive(format!("failed to add {}: {}", arcname.display(), e))
                })?;

            done += 1;
            if let Some(cb) = progress_cb {
                cb(
                    done as f64 / total as f64 * 100.0,
                    done,
                    total,
                    Some(&arcname.to_string_lossy()),
                );
            }
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| CollectorError::Archive(format!("failed to finalize tar archive: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| CollectorError::Archive(format!("failed to finalize tar archive: {}", e)))?;
        Ok(())
    }
}

impl ArchiveWriter for LocalArchiveWriter {
    fn write_archive(
        &self,
        source_dir: &Path,
        archive_path: &Path,
        format: ArchiveFormat,
        compression: Option<ArchiveCompression>,
        progress_cb: Option<&ArchiveProgressCallback>,
    ) -> Result<()> {
        if !source_dir.is_dir() {
            return Err(CollectorError::Archive(format!(
                "source directory does not exist: {}",
                source_dir.display()
            )));
        }
        if let Some(parent) = archive_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CollectorError::Archive(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        match format {
            ArchiveFormat::Zip => self.write_zip(source_dir, archive_path, progress_cb),
            ArchiveFormat::Tar => self.write_tar(source_dir, archive_path, compression, progress_cb),
            ArchiveFormat::SevenZ => Err(CollectorError::Archive(
                "7z format has no bundled encoder in this build".to_string(),
            )),
        }
    }
}

/// Computed archive path for a collection run: the archive sits next to
/// (as a sibling of) the target directory, not inside it.
pub fn archive_path_for(target_base: &Path, format: ArchiveFormat, compression: Option<ArchiveCompression>) -> PathBuf {
    let name = archive_file_name(format, compression);
    target_base
        .parent()
        .map(|p| p.join(&name))
        .unwrap_or_else(|| PathBuf::from(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_archive_file_name_variants() {
        assert_eq!(archive_file_name(ArchiveFormat::Zip, None), "archive.zip");
        assert_eq!(
            archive_file_name(ArchiveFormat::Tar, Some(ArchiveCompression::Gzip)),
            "archive.tar.gz"
        );
        assert_eq!(archive_file_name(ArchiveFormat::Tar, None), "archive.tar");
    }

    #[test]
    fn test_write_zip_archive() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("a.txt"), b"hello").unwrap();

        let archive_path = dir.path().join("out.zip");
        let writer = LocalArchiveWriter;
        writer
            .write_archive(&source, &archive_path, ArchiveFormat::Zip, None, None)
            .unwrap();

        assert!(archive_path.exists());
    }

    #[test]
    fn test_write_tar_gz_archive() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("a.txt"), b"hello").unwrap();

        let archive_path = dir.path().join("out.tar.gz");
        let writer = LocalArchiveWriter;
        writer
            .write_archive(
                &source,
                &archive_path,
                ArchiveFormat::Tar,
                Some(ArchiveCompression::Gzip),
                None,
            )
            .unwrap();

        assert!(archive_path.exists());
    }

    #[test]
    fn test_empty_source_rejected() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("empty");
        std::fs::create_dir(&source).unwrap();

        let archive_path = dir.path().join("out.zip");
        let writer = LocalArchiveWriter;
        assert!(writer
            .write_archive(&source, &archive_path, ArchiveFormat::Zip, None, None)
            .is_err());
    }

    #[test]
    fn test_sevenz_unsupported() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("a.txt"), b"hello").unwrap();

        let archive_path = dir.path().join("out.7z");
        let writer = LocalArchiveWriter;
        assert!(writer
            .write_archive(&source, &archive_path, ArchiveFormat::SevenZ, None, None)
            .is_err());
    }
}
