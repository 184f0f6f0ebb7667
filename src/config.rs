//! Packager configuration loading.
//!
//! Configuration is optional: with no `packager.toml` present the built-in
//! defaults describe the standard deployment (four functions under `src/`,
//! each entered through `handler.py`). An explicitly named config file must
//! exist and parse; a malformed file is an error, never a silent fallback.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::registry::Registry;

/// Config filename probed in the working directory when none is named.
pub const DEFAULT_CONFIG_FILENAME: &str = "packager.toml";

/// Functions packaged when no config file overrides the set, in
/// declaration (and therefore build) order.
pub const DEFAULT_FUNCTIONS: &[&str] = &[
    "validator",
    "processor",
    "api_reader",
    "validator_processor",
];

/// Entry-point filename required in every function's source directory.
pub const DEFAULT_ENTRY_FILE: &str = "handler.py";

/// Object key prefix used when staging artifacts to a bucket.
pub const DEFAULT_KEY_PREFIX: &str = "uploads/";

const DEFAULT_BASE_SRC_DIR: &str = "src";
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Validated runtime configuration for a packaging run.
#[derive(Debug, Clone)]
pub struct PackagerConfig {
    pub base_src_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub entry_file: String,
    pub functions: Vec<String>,
    pub staging: Option<StagingConfig>,
}

/// Destination for staged artifacts.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub bucket: String,
    pub key_prefix: String,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            base_src_dir: PathBuf::from(DEFAULT_BASE_SRC_DIR),
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            functions: DEFAULT_FUNCTIONS.iter().map(|s| s.to_string()).collect(),
            staging: None,
        }
    }
}

impl PackagerConfig {
    /// Registry of build units described by this configuration.
    pub fn registry(&self) -> Registry {
        Registry::from_names(&self.base_src_dir, &self.functions, &self.entry_file)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackagerToml {
    packager: PackagerTableToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackagerTableToml {
    base_src_dir: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    entry_file: Option<String>,
    functions: Option<Vec<String>>,
    staging: Option<StagingToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StagingToml {
    bucket: String,
    key_prefix: Option<String>,
}

/// Load configuration from `path`, or from `packager.toml` in the working
/// directory, or fall back to the built-in defaults when neither is given.
pub fn load_packager_config(path: Option<&Path>) -> Result<PackagerConfig> {
    match path {
        Some(explicit) => read_config_file(explicit),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILENAME);
            if fallback.is_file() {
                read_config_file(fallback)
            } else {
                Ok(PackagerConfig::default())
            }
        }
    }
}

fn read_config_file(path: &Path) -> Result<PackagerConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading packager config '{}'", path.display()))?;
    let parsed: PackagerToml = toml::from_str(&raw)
        .with_context(|| format!("parsing packager config '{}'", path.display()))?;
    let table = parsed.packager;

    let functions = table
        .functions
        .unwrap_or_else(|| DEFAULT_FUNCTIONS.iter().map(|s| s.to_string()).collect());
    validate_function_names(path, &functions)?;

    let entry_file = table
        .entry_file
        .unwrap_or_else(|| DEFAULT_ENTRY_FILE.to_string());
    if entry_file.trim().is_empty() || entry_file.contains('/') || entry_file.contains('\\') {
        bail!(
            "invalid packager config '{}': entry_file must be a bare filename, got '{}'",
            path.display(),
            entry_file
        );
    }

    let staging = match table.staging {
        Some(staging) => {
            if staging.bucket.trim().is_empty() {
                bail!(
                    "invalid packager config '{}': staging.bucket must not be empty",
                    path.display()
                );
            }
            Some(StagingConfig {
                bucket: staging.bucket,
                key_prefix: staging
                    .key_prefix
                    .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            })
        }
        None => None,
    };

    Ok(PackagerConfig {
        base_src_dir: table
            .base_src_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_SRC_DIR)),
        artifacts_dir: table
            .artifacts_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR)),
        entry_file,
        functions,
        staging,
    })
}

/// Function names become archive filenames; reject anything that would
/// escape the artifacts directory or collide within a run.
fn validate_function_names(config_path: &Path, functions: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in functions {
        if name.trim().is_empty() {
            bail!(
                "invalid packager config '{}': function names must not be empty",
                config_path.display()
            );
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            bail!(
                "invalid packager config '{}': function name '{}' must be a safe filename segment",
                config_path.display(),
                name
            );
        }
        if !seen.insert(name.as_str()) {
            bail!(
                "invalid packager config '{}': duplicate function name '{}'",
                config_path.display(),
                name
            );
        }
    }
    Ok(())
}
