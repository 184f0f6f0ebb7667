//! Object-storage staging for built artifacts.
//!
//! Thin wrapper around the `aws` CLI. The build core never touches the
//! network; this module takes the artifact paths the core produced and
//! copies each to `s3://<bucket>/<prefix><filename>`. A missing bucket
//! surfaces as a failed copy with the tool's own diagnostics attached.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::config::StagingConfig;
use crate::preflight;

/// Object key for a local artifact under the target's key prefix.
pub fn destination_key(config: &StagingConfig, artifact: &Path) -> Result<String> {
    let name = artifact
        .file_name()
        .and_then(|part| part.to_str())
        .ok_or_else(|| {
            anyhow::anyhow!("artifact path has no usable filename: '{}'", artifact.display())
        })?;
    Ok(format!("{}{}", config.key_prefix, name))
}

/// Copy one artifact to the bucket, returning the destination URI.
///
/// Fails when the local file is absent, before any external call is made.
pub fn upload_artifact(config: &StagingConfig, artifact: &Path) -> Result<String> {
    if !artifact.is_file() {
        bail!("artifact not found for staging: '{}'", artifact.display());
    }

    let key = destination_key(config, artifact)?;
    let destination = format!("s3://{}/{}", config.bucket, key);

    let output = Command::new("aws")
        .arg("s3")
        .arg("cp")
        .arg(artifact)
        .arg(&destination)
        .output()
        .with_context(|| format!("running aws s3 cp for '{}'", artifact.display()))?;

    if output.status.success() {
        return Ok(destination);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    bail!(
        "aws s3 cp failed copying '{}' to '{}': {}\n{}",
        artifact.display(),
        destination,
        stdout.trim(),
        stderr.trim()
    )
}

/// Zip artifacts currently present under `artifacts_dir`, sorted by path
/// for a stable staging order. A missing directory yields an empty list.
pub fn collect_artifacts(artifacts_dir: &Path) -> Result<Vec<PathBuf>> {
    if !artifacts_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(artifacts_dir).max_depth(1).follow_links(false) {
        let entry = entry.with_context(|| {
            format!("reading artifacts directory '{}'", artifacts_dir.display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if path.extension().and_then(|s| s.to_str()) == Some("zip") {
            artifacts.push(path);
        }
    }

    artifacts.sort();
    Ok(artifacts)
}

/// Upload every artifact in order, printing progress per object.
pub fn stage_artifacts(config: &StagingConfig, artifacts: &[PathBuf]) -> Result<()> {
    preflight::check_staging_tools()?;

    for artifact in artifacts {
        let destination = upload_artifact(config, artifact)
            .with_context(|| format!("staging '{}'", artifact.display()))?;
        println!("[stage] {} -> {}", artifact.display(), destination);
    }

    println!(
        "staged {} artifact(s) to bucket '{}'",
        artifacts.len(),
        config.bucket
    );
    Ok(())
}
