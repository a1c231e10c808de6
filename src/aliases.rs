//! Alias persistence.
//!
//! Aliases live in a user-editable TOML file:
//!
//! ```toml
//! [aliases]
//! ls = "instances list"
//! mine = "instances list -g mygroup"
//! ```

use crate::registry::Registry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// A TOML file holding alias definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasStore {
    path: PathBuf,
}

impl AliasStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all aliases. A missing file is an empty alias table.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no alias file");
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("read alias file {}", self.path.display()))?;
        let file: AliasFile = toml::from_str(&content)
            .with_context(|| format!("parse alias file {}", self.path.display()))?;
        Ok(file.aliases)
    }

    /// Replaces the file content with `aliases`, creating parent directories.
    pub fn save(&self, aliases: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let file = AliasFile {
            aliases: aliases.clone(),
        };
        let content = toml::to_string_pretty(&file).context("serialize aliases")?;
        fs::write(&self.path, content)
            .with_context(|| format!("write alias file {}", self.path.display()))
    }

    /// Loads the file into `registry`, skipping definitions the registry rejects.
    ///
    /// Returns the number of aliases registered.
    pub fn apply(&self, registry: &mut Registry) -> Result<usize> {
        let mut applied = 0;
        for (name, command) in self.load()? {
            match registry.register_alias(&name, &command) {
                Ok(()) => applied += 1,
                Err(e) => warn!(alias = %name, error = %e, "skipping alias"),
            }
        }
        debug!(applied, path = %self.path.display(), "aliases loaded");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Outcome;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = AliasStore::new(dir.path().join("missing.toml"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = AliasStore::new(dir.path().join("nested").join("aliases.toml"));

        let mut aliases = BTreeMap::new();
        aliases.insert("mine".to_string(), "instances list -g \"my group\"".to_string());
        store.save(&aliases).unwrap();

        assert_eq!(store.load().unwrap(), aliases);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aliases.toml");
        fs::write(&path, "[aliases\nls = ").unwrap();

        let err = AliasStore::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("parse alias file"));
    }

    #[test]
    fn test_apply_skips_rejected_aliases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aliases.toml");
        fs::write(
            &path,
            r#"
[aliases]
ls = "instances list"
list = "shadowing a command"
loop = "LOOP"
"#,
        )
        .unwrap();

        let mut registry = Registry::new();
        registry.register_fn("list", |_args, _session| Ok(Outcome::Nothing), false);

        let applied = AliasStore::new(&path).apply(&mut registry).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(registry.alias("ls"), Some("instances list"));
        assert_eq!(registry.alias("list"), None);
        assert_eq!(registry.alias("loop"), None);
    }
}
