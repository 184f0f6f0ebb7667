//! Deterministic single-entry zip writing.
//!
//! Function packages contain exactly one file, stored at the archive root
//! with fixed metadata (constant entry mtime, 0644 mode). Re-running a
//! build over unchanged sources therefore produces byte-identical
//! archives, not just logically identical ones.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Create a compressed zip at `out_path` containing exactly one entry.
///
/// The entry is stored flattened under `entry_name` with no directory
/// prefix. The archive is assembled at a temporary path in the same
/// directory and renamed into place on completion, so an interrupted
/// write never leaves a truncated archive at `out_path`. An existing
/// archive at `out_path` is replaced.
///
/// Returns the size of the finished archive in bytes.
pub fn write_single_entry_zip(source_file: &Path, entry_name: &str, out_path: &Path) -> Result<u64> {
    let tmp = out_path.with_extension(format!("zip.tmp-{}", std::process::id()));

    let out = File::create(&tmp)
        .with_context(|| format!("creating temp archive '{}'", tmp.display()))?;
    let mut writer = ZipWriter::new(out);

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    writer
        .start_file(entry_name, options)
        .with_context(|| format!("starting archive entry '{}'", entry_name))?;

    let mut input = File::open(source_file)
        .with_context(|| format!("opening entry source '{}'", source_file.display()))?;
    io::copy(&mut input, &mut writer).with_context(|| {
        format!(
            "compressing '{}' into '{}'",
            source_file.display(),
            tmp.display()
        )
    })?;

    writer
        .finish()
        .with_context(|| format!("finalizing archive '{}'", tmp.display()))?;

    atomic_rename(&tmp, out_path)?;

    let size = fs::metadata(out_path)
        .with_context(|| format!("reading archive metadata '{}'", out_path.display()))?
        .len();
    Ok(size)
}

fn atomic_rename(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory '{}'", parent.display()))?;
    }
    // Prefer rename; tmp lives next to dst, so it's the same filesystem.
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Fall back to copy+remove (e.g. EXDEV).
            fs::copy(src, dst).with_context(|| {
                format!("copying '{}' to '{}'", src.display(), dst.display())
            })?;
            fs::remove_file(src)
                .with_context(|| format!("removing temp archive '{}'", src.display()))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn single_entry_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("nested/dir/handler.py");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"def lambda_handler(event, context):\n    pass\n").unwrap();

        let out = tmp.path().join("validator.zip");
        let size = write_single_entry_zip(&source, "handler.py", &out).unwrap();
        assert!(size > 0);
        assert_eq!(fs::metadata(&out).unwrap().len(), size);

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_index(0).unwrap();
        // Stored at archive root, no directory prefix.
        assert_eq!(entry.name(), "handler.py");

        let mut bytes = Vec::new();
        io::Read::read_to_end(&mut entry, &mut bytes).unwrap();
        assert_eq!(bytes, b"def lambda_handler(event, context):\n    pass\n");
    }

    #[test]
    fn rewrites_are_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("handler.py");
        fs::write(&source, b"print('ok')\n").unwrap();

        let first = tmp.path().join("a.zip");
        let second = tmp.path().join("b.zip");
        write_single_entry_zip(&source, "handler.py", &first).unwrap();
        write_single_entry_zip(&source, "handler.py", &second).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn replaces_existing_archive() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("handler.py");
        fs::write(&source, b"v1\n").unwrap();

        let out = tmp.path().join("fn.zip");
        write_single_entry_zip(&source, "handler.py", &out).unwrap();

        fs::write(&source, b"v2 with more content\n").unwrap();
        write_single_entry_zip(&source, "handler.py", &out).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut entry = archive.by_index(0).unwrap();
        let mut bytes = Vec::new();
        io::Read::read_to_end(&mut entry, &mut bytes).unwrap();
        assert_eq!(bytes, b"v2 with more content\n");
    }

    #[test]
    fn leaves_no_temp_file_behind() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("handler.py");
        fs::write(&source, b"ok\n").unwrap();

        let out = tmp.path().join("fn.zip");
        write_single_entry_zip(&source, "handler.py", &out).unwrap();

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
