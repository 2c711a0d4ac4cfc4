//! Installed-plugin registry seam.
//!
//! The guard never reads host globals; it is handed a read-only registry
//! at construction so tests can drive it with fixtures. The host keeps
//! membership up to date through install/uninstall, not through this
//! crate.

use crate::manifest::PluginManifest;

/// The tagging-relevant facts about one installed plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
    /// Plugin machine name.
    pub name: String,

    /// The plugin declared that it requires the shared tagging tables.
    pub declares_shared_tagging: bool,

    /// The plugin's code paths touch the shared tagging tables.
    pub uses_tagging_tables: bool,
}

impl PluginRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declares_shared_tagging: false,
            uses_tagging_tables: false,
        }
    }
}

impl From<&PluginManifest> for PluginRecord {
    fn from(manifest: &PluginManifest) -> Self {
        Self {
            name: manifest.name.clone(),
            declares_shared_tagging: manifest.tagging.requires_shared_tables,
            uses_tagging_tables: manifest.tagging.uses_tables,
        }
    }
}

/// Read-only view of the host's installed plugins.
///
/// `installed_plugins` must preserve the host's load order; the revert
/// skip report lists still-dependent plugins in that order.
pub trait PluginRegistry: Send + Sync {
    /// The plugin whose install/uninstall lifecycle step is running.
    fn current_plugin(&self) -> PluginRecord;

    /// All currently installed plugins, in host load order.
    fn installed_plugins(&self) -> Vec<PluginRecord>;
}

/// Registry built from parsed plugin manifests.
///
/// The host parses every installed plugin's `info.toml` and names the
/// plugin whose lifecycle step is being applied.
pub struct ManifestRegistry {
    current: PluginRecord,
    installed: Vec<PluginRecord>,
}

impl ManifestRegistry {
    /// Build a registry from manifests.
    ///
    /// Returns `None` if `current` names a plugin that is not in the
    /// manifest set; a lifecycle step for an unknown plugin is a host
    /// bug the guard cannot act on.
    pub fn from_manifests(manifests: &[PluginManifest], current: &str) -> Option<Self> {
        let installed: Vec<PluginRecord> = manifests.iter().map(PluginRecord::from).collect();
        let current = installed.iter().find(|p| p.name == current)?.clone();

        Some(Self { current, installed })
    }
}

impl PluginRegistry for ManifestRegistry {
    fn current_plugin(&self) -> PluginRecord {
        self.current.clone()
    }

    fn installed_plugins(&self) -> Vec<PluginRecord> {
        self.installed.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::Path;

    fn manifest(name: &str, declares: bool, uses: bool) -> PluginManifest {
        let toml = format!(
            r#"
name = "{name}"
description = "{name} plugin"
version = "1.0.0"

[tagging]
requires_shared_tables = {declares}
uses_tables = {uses}
"#
        );
        PluginManifest::parse_str(&toml, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn record_from_manifest() {
        let record = PluginRecord::from(&manifest("blog", true, true));
        assert_eq!(record.name, "blog");
        assert!(record.declares_shared_tagging);
        assert!(record.uses_tagging_tables);
    }

    #[test]
    fn registry_preserves_order() {
        let manifests = vec![
            manifest("zebra", false, false),
            manifest("alpha", true, true),
            manifest("middle", false, true),
        ];
        let registry = ManifestRegistry::from_manifests(&manifests, "alpha").unwrap();

        let names: Vec<String> = registry
            .installed_plugins()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["zebra", "alpha", "middle"]);
        assert_eq!(registry.current_plugin().name, "alpha");
    }

    #[test]
    fn unknown_current_plugin_is_rejected() {
        let manifests = vec![manifest("blog", true, true)];
        assert!(ManifestRegistry::from_manifests(&manifests, "missing").is_none());
    }
}
