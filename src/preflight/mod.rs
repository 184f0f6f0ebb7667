//! Preflight checks for staging validation.
//!
//! Validates that the host has the tools staging shells out to before any
//! upload is attempted. This prevents cryptic errors partway through a
//! batch of uploads.
//!
//! # Example
//!
//! ```rust
//! use lambda_packager::preflight::{command_exists, check_required_tools};
//!
//! // Check a single command
//! if !command_exists("aws") {
//!     println!("aws CLI not installed");
//! }
//!
//! // Check multiple tools
//! let tools = &[("aws", "awscli")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists on the host system by searching PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools required for staging artifacts to object storage.
///
/// Each tuple is (command_name, package_name).
pub const REQUIRED_STAGING_TOOLS: &[(&str, &str)] = &[("aws", "awscli")];

/// Check that specific tools are available.
///
/// # Arguments
///
/// * `tools` - Slice of (command, package) tuples
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check that all tools staging depends on are available.
///
/// This checks all tools in [`REQUIRED_STAGING_TOOLS`].
pub fn check_staging_tools() -> Result<()> {
    check_required_tools(REQUIRED_STAGING_TOOLS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        // 'ls' should exist on any Unix system
        assert!(command_exists("ls"));
        // Random garbage should not exist
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_success() {
        // These should exist on any Unix system
        let tools = &[("ls", "coreutils"), ("cat", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_failure() {
        let tools = &[("nonexistent_command_xyz", "fake-package")];
        assert!(check_required_tools(tools).is_err());
    }
}
