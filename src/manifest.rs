//! Build manifest: machine-readable record of a successful build pass.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::builder::{BuildStatus, PipelineOutcome};

pub const MANIFEST_FILENAME: &str = "build-manifest.json";

const MANIFEST_SCHEMA: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub schema: u32,
    pub created_at_utc: String,
    pub artifacts: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub function: String,
    pub artifact: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

impl BuildManifest {
    /// Snapshot the successful results of a build pass.
    pub fn from_outcome(outcome: &PipelineOutcome) -> Self {
        let artifacts = outcome
            .results
            .iter()
            .filter_map(|result| match &result.status {
                BuildStatus::Success {
                    artifact_path,
                    size_bytes,
                    sha256,
                } => Some(ManifestEntry {
                    function: result.unit_name.clone(),
                    artifact: artifact_path.clone(),
                    size_bytes: *size_bytes,
                    sha256: sha256.clone(),
                }),
                BuildStatus::MissingEntryFile { .. } => None,
            })
            .collect();

        Self {
            schema: MANIFEST_SCHEMA,
            created_at_utc: now_utc_compact(),
            artifacts,
        }
    }
}

pub fn manifest_path(artifacts_dir: &Path) -> PathBuf {
    artifacts_dir.join(MANIFEST_FILENAME)
}

/// Write the manifest via temp file + rename so readers never observe a
/// torn manifest at the final path.
pub fn write_build_manifest(path: &Path, manifest: &BuildManifest) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("manifest path without parent '{}'", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;

    let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
    let payload = serde_json::to_vec_pretty(manifest).context("serializing build manifest")?;
    fs::write(&tmp, payload)
        .with_context(|| format!("writing temp manifest '{}'", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        format!(
            "renaming temp manifest '{}' to '{}'",
            tmp.display(),
            path.display()
        )
    })?;
    Ok(())
}

/// Load a manifest if one exists; a missing file is `Ok(None)`.
pub fn load_build_manifest(path: &Path) -> Result<Option<BuildManifest>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes =
        fs::read(path).with_context(|| format!("reading build manifest '{}'", path.display()))?;
    let manifest: BuildManifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing build manifest '{}'", path.display()))?;
    Ok(Some(manifest))
}

fn now_utc_compact() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
