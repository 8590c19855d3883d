//! # Rule Catalog
//!
//! Layout of a catalog directory:
//!
//! ```text
//! rules/
//! ├── lib/audit.rego            rule modules, any depth
//! ├── templates/*.rego
//! └── constraints/              constraint documents (YAML or JSON)
//!     └── require_owner.yaml
//! ```
//!
//! Modules are keyed by their path relative to the catalog root, with `/`
//! separators, so the `ruleModulesSource` map attached to violations is
//! identical on every platform.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

const MODULE_EXTENSION: &str = "rego";
const CONSTRAINTS_DIR: &str = "constraints";

/// Errors loading the rule catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("rule catalog not found: {path}")]
    NotFound { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("rule catalog {path} contains no rule modules")]
    NoModules { path: String },

    #[error("invalid constraint document {path}: {message}")]
    InvalidConstraint { path: String, message: String },
}

/// Rule modules and constraint documents for one deployed rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCatalog {
    modules: BTreeMap<String, String>,
    constraints: Vec<Value>,
}

impl RuleCatalog {
    /// Load a catalog from disk.
    pub fn load(root: &Path) -> Result<Self, CatalogError> {
        if !root.is_dir() {
            return Err(CatalogError::NotFound {
                path: root.display().to_string(),
            });
        }

        let mut module_paths = Vec::new();
        collect_files(root, &mut module_paths)?;

        let mut modules = BTreeMap::new();
        for path in module_paths
            .iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(MODULE_EXTENSION))
        {
            let source = read(path)?;
            modules.insert(relative_key(root, path), source);
        }

        if modules.is_empty() {
            return Err(CatalogError::NoModules {
                path: root.display().to_string(),
            });
        }

        let constraints = load_constraints(&root.join(CONSTRAINTS_DIR))?;

        tracing::info!(
            modules = modules.len(),
            constraints = constraints.len(),
            catalog = %root.display(),
            "rule catalog loaded"
        );

        Ok(Self {
            modules,
            constraints,
        })
    }

    /// Build a catalog from in-memory parts.
    pub fn from_parts(modules: BTreeMap<String, String>, constraints: Vec<Value>) -> Self {
        Self {
            modules,
            constraints,
        }
    }

    /// Module path to source text.
    pub fn modules_source(&self) -> &BTreeMap<String, String> {
        &self.modules
    }

    pub fn constraints(&self) -> &[Value] {
        &self.constraints
    }
}

fn load_constraints(dir: &Path) -> Result<Vec<Value>, CatalogError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    collect_files(dir, &mut paths)?;
    paths.sort();

    let mut constraints = Vec::new();
    for path in &paths {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let doc: Value = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&read(path)?).map_err(|e| {
                CatalogError::InvalidConstraint {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            })?,
            "json" => serde_json::from_str(&read(path)?).map_err(|e| {
                CatalogError::InvalidConstraint {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            })?,
            _ => continue,
        };
        if !doc.is_object() {
            return Err(CatalogError::InvalidConstraint {
                path: path.display().to_string(),
                message: "constraint document must be a mapping".into(),
            });
        }
        constraints.push(doc);
    }
    Ok(constraints)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CatalogError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| CatalogError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn loads_modules_recursively_with_relative_keys() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib/audit.rego", "package validator.gcp.lib\n");
        write(dir.path(), "templates/owner.rego", "package templates.gcp.owner\n");
        write(dir.path(), "README.md", "ignored");

        let catalog = RuleCatalog::load(dir.path()).unwrap();
        let keys: Vec<_> = catalog.modules_source().keys().cloned().collect();
        assert_eq!(keys, vec!["lib/audit.rego", "templates/owner.rego"]);
        assert!(catalog.constraints().is_empty());
    }

    #[test]
    fn loads_yaml_and_json_constraints_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "audit.rego", "package validator.gcp.lib\n");
        write(
            dir.path(),
            "constraints/a.yaml",
            "apiVersion: v1\nkind: A\nmetadata:\n  name: first\n",
        );
        write(
            dir.path(),
            "constraints/b.json",
            r#"{"apiVersion": "v1", "kind": "B", "metadata": {"name": "second"}}"#,
        );

        let catalog = RuleCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.constraints().len(), 2);
        assert_eq!(catalog.constraints()[0]["metadata"]["name"], "first");
        assert_eq!(catalog.constraints()[1]["kind"], "B");
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = RuleCatalog::load(Path::new("/nonexistent/ram/rules")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.txt", "nothing here");
        let err = RuleCatalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::NoModules { .. }));
    }

    #[test]
    fn malformed_constraint_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "audit.rego", "package validator.gcp.lib\n");
        write(dir.path(), "constraints/bad.yaml", "kind: [unterminated\n");
        let err = RuleCatalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidConstraint { .. }));
    }

    #[test]
    fn scalar_constraint_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "audit.rego", "package validator.gcp.lib\n");
        write(dir.path(), "constraints/scalar.json", "42");
        let err = RuleCatalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidConstraint { .. }));
    }
}
