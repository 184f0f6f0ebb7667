//! Function registry: the ordered set of build units to package.

use std::path::{Path, PathBuf};

/// One named function whose source maps to exactly one output archive.
#[derive(Debug, Clone)]
pub struct BuildUnit {
    /// Function identifier, unique within a run; also the archive stem.
    pub name: String,
    /// Directory holding the function's source files.
    pub source_dir: PathBuf,
    /// Filename that must exist in `source_dir` for the unit to build.
    pub entry_file: String,
}

impl BuildUnit {
    /// Full path of the unit's entry-point file.
    pub fn entry_path(&self) -> PathBuf {
        self.source_dir.join(&self.entry_file)
    }
}

/// Read-only, ordered collection of build units.
///
/// Construction cannot fail; an empty registry is valid and builds to a
/// trivially successful outcome. Name validation happens at config-load
/// time, before a registry is constructed.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    units: Vec<BuildUnit>,
}

impl Registry {
    /// Build a registry from function names in declaration order, mapping
    /// each to `<base_src_dir>/<name>` with a common entry filename.
    pub fn from_names<S: AsRef<str>>(base_src_dir: &Path, names: &[S], entry_file: &str) -> Self {
        let units = names
            .iter()
            .map(|name| {
                let name = name.as_ref().to_string();
                BuildUnit {
                    source_dir: base_src_dir.join(&name),
                    name,
                    entry_file: entry_file.to_string(),
                }
            })
            .collect();
        Self { units }
    }

    pub fn units(&self) -> &[BuildUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_names_to_source_convention() {
        let registry = Registry::from_names(Path::new("src"), &["validator", "processor"], "handler.py");

        assert_eq!(registry.len(), 2);
        let validator = &registry.units()[0];
        assert_eq!(validator.name, "validator");
        assert_eq!(validator.source_dir, Path::new("src/validator"));
        assert_eq!(validator.entry_path(), Path::new("src/validator/handler.py"));
    }

    #[test]
    fn preserves_declaration_order() {
        let names = ["c", "a", "b"];
        let registry = Registry::from_names(Path::new("src"), &names, "handler.py");

        let got: Vec<&str> = registry.units().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(got, vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_registry_is_valid() {
        let registry = Registry::from_names::<&str>(Path::new("src"), &[], "handler.py");
        assert!(registry.is_empty());
    }
}
