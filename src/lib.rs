//! Build pipeline for packaging serverless function sources into
//! deployable archives.
//!
//! Each configured function maps to one source directory and one required
//! entry-point file; the pipeline validates the entry point, packages it
//! into a zip archive named after the function, and halts at the first
//! function that fails validation:
//!
//! ```text
//! packager.toml ──► Registry (ordered BuildUnits)
//!                       │
//!                       ▼
//!                 ArtifactBuilder ──► artifacts/<name>.zip (one per unit)
//!                       │                  │
//!                       ▼                  ▼
//!                 PipelineOutcome    build-manifest.json
//!                                          │
//!                                          ▼ (separate command)
//!                                    s3://<bucket>/uploads/
//! ```
//!
//! Uploading is a thin wrapper around the `aws` CLI and is deliberately
//! kept out of the build pass; the build itself performs no network I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use lambda_packager::{ArtifactBuilder, Registry};
//! use std::path::Path;
//!
//! let registry = Registry::from_names(Path::new("src"), &["validator"], "handler.py");
//! let builder = ArtifactBuilder::new("artifacts");
//! let outcome = builder.build_all(&registry)?;
//! assert!(outcome.overall_success());
//! ```

pub mod artifact;
pub mod builder;
pub mod config;
pub mod manifest;
pub mod preflight;
pub mod registry;
pub mod staging;

pub use builder::{ArtifactBuilder, BuildResult, BuildStatus, PipelineOutcome};
pub use config::{load_packager_config, PackagerConfig, StagingConfig};
pub use registry::{BuildUnit, Registry};
