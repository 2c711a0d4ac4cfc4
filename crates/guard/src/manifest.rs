//! Parser for plugin `info.toml` manifest files.
//!
//! The host records two tagging facts per plugin, both declared in a
//! `[tagging]` section of the manifest:
//! - `requires_shared_tables` — the plugin's explicit declaration that it
//!   needs the shared tags/taggings tables (the fact the guard enforces)
//! - `uses_tables` — the plugin's code paths actually touch the tables
//!   (usage without declaration is the old-style anomaly the guard warns
//!   about, not an error)

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Plugin metadata parsed from `info.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    /// Plugin machine name (must match the plugin directory name).
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Semantic version (e.g., "1.0.0").
    pub version: String,

    /// Other plugins this one depends on (loaded first).
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Shared tagging declaration and usage facts.
    #[serde(default)]
    pub tagging: TaggingConfig,
}

/// The `[tagging]` section of a plugin manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaggingConfig {
    /// Explicit declaration that this plugin needs the shared tables.
    #[serde(default)]
    pub requires_shared_tables: bool,

    /// Whether the plugin's code paths touch the shared tables.
    #[serde(default)]
    pub uses_tables: bool,
}

impl PluginManifest {
    /// Parse a plugin manifest from the given path.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plugin manifest: {}", path.display()))?;

        Self::parse_str(&content, path)
    }

    /// Parse a plugin manifest from a TOML string.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self> {
        let mut manifest: PluginManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse plugin manifest TOML at {}", path.display()))?;

        manifest.validate(path)?;

        // Declaring the dependency implies using the tables; a plugin that
        // requires them but left uses_tables unset still counts as a user
        // when the revert path asks who needs the tables.
        if manifest.tagging.requires_shared_tables {
            manifest.tagging.uses_tables = true;
        }

        Ok(manifest)
    }

    /// Validate the parsed manifest.
    fn validate(&self, path: &Path) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("plugin manifest at {} has empty 'name' field", path.display());
        }

        if self.version.is_empty() {
            anyhow::bail!(
                "plugin '{}' at {} has empty 'version' field",
                self.name,
                path.display()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_declaring_plugin() {
        let toml = r#"
name = "blog"
description = "Provides a blog content type"
version = "1.0.0"
dependencies = ["categories"]

[tagging]
requires_shared_tables = true
uses_tables = true
"#;

        let manifest = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(manifest.name, "blog");
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.dependencies, vec!["categories"]);
        assert!(manifest.tagging.requires_shared_tables);
        assert!(manifest.tagging.uses_tables);
    }

    #[test]
    fn parse_minimal_manifest_defaults_tagging_off() {
        let toml = r#"
name = "minimal"
description = "A minimal plugin"
version = "0.1.0"
"#;

        let manifest = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(manifest.name, "minimal");
        assert!(manifest.dependencies.is_empty());
        assert!(!manifest.tagging.requires_shared_tables);
        assert!(!manifest.tagging.uses_tables);
    }

    #[test]
    fn declaration_implies_usage() {
        let toml = r#"
name = "series"
description = "Series navigation"
version = "1.0.0"

[tagging]
requires_shared_tables = true
"#;

        let manifest = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap();
        assert!(manifest.tagging.uses_tables);
    }

    #[test]
    fn usage_without_declaration_is_preserved() {
        // Old-style plugin: touches the tables without declaring. Parsing
        // must keep the facts distinct so the scan can flag it.
        let toml = r#"
name = "legacy"
description = "Old-style plugin"
version = "0.9.0"

[tagging]
uses_tables = true
"#;

        let manifest = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap();
        assert!(!manifest.tagging.requires_shared_tables);
        assert!(manifest.tagging.uses_tables);
    }

    #[test]
    fn reject_empty_name() {
        let toml = r#"
name = ""
description = "Empty name"
version = "1.0.0"
"#;

        let result = PluginManifest::parse_str(toml, Path::new("test.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty 'name'"));
    }

    #[test]
    fn reject_empty_version() {
        let toml = r#"
name = "test"
description = "Empty version"
version = ""
"#;

        let result = PluginManifest::parse_str(toml, Path::new("test.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty 'version'"));
    }

    #[test]
    fn reject_invalid_toml() {
        let result = PluginManifest::parse_str("not valid [ toml", Path::new("test.toml"));
        assert!(result.is_err());
    }
}
