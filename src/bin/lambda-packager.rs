use std::path::Path;

use anyhow::{bail, Result};
use lambda_packager::builder::ArtifactBuilder;
use lambda_packager::config::{load_packager_config, StagingConfig, DEFAULT_KEY_PREFIX};
use lambda_packager::manifest::{self, BuildManifest};
use lambda_packager::staging;

fn usage() -> &'static str {
    "Usage:\n  lambda-packager [build [config.toml]]\n  lambda-packager stage [<bucket>] [config.toml]\n  lambda-packager status [config.toml]"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [] => build(None),
        [cmd] if cmd == "build" => build(None),
        [cmd, config] if cmd == "build" => build(Some(Path::new(config))),
        [cmd] if cmd == "stage" => stage(None, None),
        [cmd, bucket] if cmd == "stage" => stage(Some(bucket), None),
        [cmd, bucket, config] if cmd == "stage" => stage(Some(bucket), Some(Path::new(config))),
        [cmd] if cmd == "status" => status(None),
        [cmd, config] if cmd == "status" => status(Some(Path::new(config))),
        _ => bail!(usage()),
    }
}

fn build(config_path: Option<&Path>) -> Result<()> {
    let config = load_packager_config(config_path)?;
    let registry = config.registry();
    let builder = ArtifactBuilder::new(&config.artifacts_dir);

    let outcome = builder.build_all(&registry)?;

    if let Some(failed) = outcome.first_failure() {
        bail!(
            "build halted: function '{}' is missing its entry file; \
             artifacts built before the halt were kept",
            failed.unit_name
        );
    }

    let manifest = BuildManifest::from_outcome(&outcome);
    manifest::write_build_manifest(&manifest::manifest_path(&config.artifacts_dir), &manifest)?;
    Ok(())
}

fn stage(bucket: Option<&String>, config_path: Option<&Path>) -> Result<()> {
    let config = load_packager_config(config_path)?;

    let staging_config = match (bucket, config.staging.clone()) {
        (Some(bucket), Some(mut from_config)) => {
            from_config.bucket = bucket.to_string();
            from_config
        }
        (Some(bucket), None) => StagingConfig {
            bucket: bucket.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        },
        (None, Some(from_config)) => from_config,
        (None, None) => bail!(
            "no staging bucket configured.\n\
             pass one on the command line (`lambda-packager stage <bucket>`)\n\
             or add a [packager.staging] section with `bucket = \"...\"` to packager.toml"
        ),
    };

    let artifacts = staging::collect_artifacts(&config.artifacts_dir)?;
    if artifacts.is_empty() {
        bail!(
            "no artifacts found under '{}'; run `lambda-packager build` first",
            config.artifacts_dir.display()
        );
    }

    staging::stage_artifacts(&staging_config, &artifacts)
}

fn status(config_path: Option<&Path>) -> Result<()> {
    let config = load_packager_config(config_path)?;

    let artifacts = staging::collect_artifacts(&config.artifacts_dir)?;
    if artifacts.is_empty() {
        println!("no artifacts under '{}'", config.artifacts_dir.display());
    } else {
        println!("{} artifact(s) under '{}':", artifacts.len(), config.artifacts_dir.display());
        for artifact in &artifacts {
            let size = std::fs::metadata(artifact).map(|md| md.len()).unwrap_or(0);
            println!("  {}  ({} bytes)", artifact.display(), size);
        }
    }

    let manifest_file = manifest::manifest_path(&config.artifacts_dir);
    if let Some(loaded) = manifest::load_build_manifest(&manifest_file)? {
        println!(
            "last successful build: {} ({} artifact(s))",
            loaded.created_at_utc,
            loaded.artifacts.len()
        );
    }

    Ok(())
}
