//! Artifact builder: turns registry entries into per-unit outcomes.
//!
//! A missing entry file is a build-configuration defect and is reported in
//! the per-unit result; everything else (unwritable artifacts directory,
//! failed archive write) is an environment fault that propagates as an
//! error and aborts the run.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::artifact::digest::sha256_file;
use crate::artifact::zip::write_single_entry_zip;
use crate::registry::{BuildUnit, Registry};

const LOCK_FILENAME: &str = ".pack.lock";

/// Per-unit outcome of a build pass. The artifact path exists only on the
/// success variant, so a failed unit can never carry one.
#[derive(Debug, Clone)]
pub enum BuildStatus {
    Success {
        artifact_path: PathBuf,
        size_bytes: u64,
        sha256: String,
    },
    MissingEntryFile {
        expected: PathBuf,
    },
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub unit_name: String,
    pub status: BuildStatus,
}

/// Aggregate of one build pass, in build order. Units after the first
/// failure never appear because the pass halts before reaching them.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub results: Vec<BuildResult>,
}

impl PipelineOutcome {
    /// True iff no result is a MissingEntryFile.
    pub fn overall_success(&self) -> bool {
        self.results.iter().all(|r| r.status.is_success())
    }

    pub fn first_failure(&self) -> Option<&BuildResult> {
        self.results.iter().find(|r| !r.status.is_success())
    }

    /// Successfully built results, in build order.
    pub fn artifacts(&self) -> Vec<&BuildResult> {
        self.results
            .iter()
            .filter(|r| r.status.is_success())
            .collect()
    }
}

/// Builds one archive per registry unit into a shared artifacts directory.
///
/// The directory is passed in explicitly and created if absent; an
/// exclusive lock file is held for the duration of a pass so two runs
/// cannot interleave writes into it.
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    artifacts_dir: PathBuf,
}

impl ArtifactBuilder {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Validate and package a single unit.
    ///
    /// Absence of the source directory is not checked separately; it
    /// surfaces as a missing entry file like any other absence.
    pub fn build(&self, unit: &BuildUnit) -> Result<BuildResult> {
        let entry_path = unit.entry_path();
        if !entry_path.is_file() {
            eprintln!(
                "[pack:{}] missing entry file '{}'",
                unit.name,
                entry_path.display()
            );
            return Ok(BuildResult {
                unit_name: unit.name.clone(),
                status: BuildStatus::MissingEntryFile {
                    expected: entry_path,
                },
            });
        }

        fs::create_dir_all(&self.artifacts_dir).with_context(|| {
            format!(
                "creating artifacts directory '{}'",
                self.artifacts_dir.display()
            )
        })?;

        let artifact_path = self.artifacts_dir.join(format!("{}.zip", unit.name));
        let size_bytes = write_single_entry_zip(&entry_path, &unit.entry_file, &artifact_path)
            .with_context(|| format!("packaging function '{}'", unit.name))?;
        let (sha256, _) = sha256_file(&artifact_path)?;

        println!(
            "[pack:{}] wrote {} ({} bytes)",
            unit.name,
            artifact_path.display(),
            size_bytes
        );

        Ok(BuildResult {
            unit_name: unit.name.clone(),
            status: BuildStatus::Success {
                artifact_path,
                size_bytes,
                sha256,
            },
        })
    }

    /// Run the whole pipeline in registry order, halting at the first
    /// unit that fails validation; units after it are not processed.
    ///
    /// A missing entry file is deterministic, so there are no retries:
    /// the halt leaves already-built archives in place and the overall
    /// outcome is a failure.
    pub fn build_all(&self, registry: &Registry) -> Result<PipelineOutcome> {
        fs::create_dir_all(&self.artifacts_dir).with_context(|| {
            format!(
                "creating artifacts directory '{}'",
                self.artifacts_dir.display()
            )
        })?;
        let _lock = self.acquire_run_lock()?;

        let mut results = Vec::with_capacity(registry.len());
        for unit in registry.units() {
            println!(
                "[pack:{}] building from '{}'",
                unit.name,
                unit.source_dir.display()
            );
            let result = self.build(unit)?;
            let halt = !result.status.is_success();
            results.push(result);
            if halt {
                break;
            }
        }

        let outcome = PipelineOutcome { results };
        if outcome.overall_success() {
            print_summary(&outcome);
        }
        Ok(outcome)
    }

    fn acquire_run_lock(&self) -> Result<RunLock> {
        let lock_path = self.artifacts_dir.join(LOCK_FILENAME);

        // Do not unlink "stale" lock files: unlinking a still-locked file
        // would let a second process lock a fresh file at the same path.
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("creating lock file '{}'", lock_path.display()))?;

        if lock_file.try_lock_exclusive().is_err() {
            drop(lock_file);
            return Err(anyhow::anyhow!(
                "another packaging run holds the lock '{}'",
                lock_path.display()
            ));
        }

        Ok(RunLock {
            _file: lock_file,
            path: lock_path,
        })
    }
}

fn print_summary(outcome: &PipelineOutcome) {
    let artifacts = outcome.artifacts();
    println!("packaged {} artifact(s):", artifacts.len());
    for result in artifacts {
        if let BuildStatus::Success {
            artifact_path,
            size_bytes,
            ..
        } = &result.status
        {
            println!("  {}  ({} bytes)", artifact_path.display(), size_bytes);
        }
    }
}

/// RAII guard: unlocks and removes the lock file on drop.
#[derive(Debug)]
struct RunLock {
    _file: File,
    path: PathBuf,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_handler(base: &Path, name: &str) {
        let dir = base.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("handler.py"),
            format!("# {name}\ndef lambda_handler(event, context):\n    return None\n"),
        )
        .unwrap();
    }

    fn registry_for(base: &Path, names: &[&str]) -> Registry {
        Registry::from_names(base, names, "handler.py")
    }

    #[test]
    fn builds_every_unit_when_all_entries_present() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        for name in ["validator", "processor", "api_reader"] {
            write_handler(&src, name);
        }

        let builder = ArtifactBuilder::new(tmp.path().join("artifacts"));
        let registry = registry_for(&src, &["validator", "processor", "api_reader"]);
        let outcome = builder.build_all(&registry).unwrap();

        assert!(outcome.overall_success());
        assert_eq!(outcome.results.len(), 3);
        for name in ["validator", "processor", "api_reader"] {
            let archive_path = tmp.path().join("artifacts").join(format!("{name}.zip"));
            assert!(archive_path.is_file());

            let mut archive =
                zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
            assert_eq!(archive.len(), 1);
            assert_eq!(archive.by_index(0).unwrap().name(), "handler.py");
        }
    }

    #[test]
    fn halts_at_first_missing_entry_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write_handler(&src, "validator");
        // processor intentionally absent
        write_handler(&src, "api_reader");

        let builder = ArtifactBuilder::new(tmp.path().join("artifacts"));
        let registry = registry_for(&src, &["validator", "processor", "api_reader"]);
        let outcome = builder.build_all(&registry).unwrap();

        assert!(!outcome.overall_success());
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.first_failure().unwrap().unit_name, "processor");

        // Artifacts before the halt are kept; nothing after it is built.
        assert!(tmp.path().join("artifacts/validator.zip").is_file());
        assert!(!tmp.path().join("artifacts/processor.zip").exists());
        assert!(!tmp.path().join("artifacts/api_reader.zip").exists());
    }

    #[test]
    fn missing_source_dir_reports_missing_entry_file() {
        let tmp = TempDir::new().unwrap();
        let builder = ArtifactBuilder::new(tmp.path().join("artifacts"));
        let registry = registry_for(&tmp.path().join("src"), &["ghost"]);

        let outcome = builder.build_all(&registry).unwrap();
        assert_eq!(outcome.results.len(), 1);
        match &outcome.results[0].status {
            BuildStatus::MissingEntryFile { expected } => {
                assert!(expected.ends_with("ghost/handler.py"));
            }
            other => panic!("expected MissingEntryFile, got {other:?}"),
        }
    }

    #[test]
    fn empty_registry_succeeds_with_no_archives() {
        let tmp = TempDir::new().unwrap();
        let artifacts_dir = tmp.path().join("artifacts");
        let builder = ArtifactBuilder::new(&artifacts_dir);

        let outcome = builder.build_all(&Registry::default()).unwrap();
        assert!(outcome.overall_success());
        assert!(outcome.results.is_empty());

        let zips: Vec<_> = fs::read_dir(&artifacts_dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("zip"))
            .collect();
        assert!(zips.is_empty());
    }

    #[test]
    fn rebuild_over_unchanged_sources_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write_handler(&src, "validator");

        let builder = ArtifactBuilder::new(tmp.path().join("artifacts"));
        let registry = registry_for(&src, &["validator"]);

        builder.build_all(&registry).unwrap();
        let first = fs::read(tmp.path().join("artifacts/validator.zip")).unwrap();

        builder.build_all(&registry).unwrap();
        let second = fs::read(tmp.path().join("artifacts/validator.zip")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn success_result_carries_artifact_metadata() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write_handler(&src, "validator");

        let builder = ArtifactBuilder::new(tmp.path().join("artifacts"));
        let registry = registry_for(&src, &["validator"]);
        let result = builder.build(&registry.units()[0]).unwrap();

        match result.status {
            BuildStatus::Success {
                artifact_path,
                size_bytes,
                sha256,
            } => {
                assert!(artifact_path.ends_with("validator.zip"));
                assert_eq!(size_bytes, fs::metadata(&artifact_path).unwrap().len());
                assert_eq!(sha256.len(), 64);
            }
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[test]
    fn archive_entry_bytes_match_source() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write_handler(&src, "validator");
        let source_bytes = fs::read(src.join("validator/handler.py")).unwrap();

        let builder = ArtifactBuilder::new(tmp.path().join("artifacts"));
        let registry = registry_for(&src, &["validator"]);
        builder.build_all(&registry).unwrap();

        let mut archive = zip::ZipArchive::new(
            File::open(tmp.path().join("artifacts/validator.zip")).unwrap(),
        )
        .unwrap();
        let mut entry = archive.by_index(0).unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, source_bytes);
    }
}
