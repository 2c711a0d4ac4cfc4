//! Shared-table lifecycle coordinator.
//!
//! Mediates shared ownership of the tags/taggings tables across
//! independently installed plugins. At create time it either authorizes
//! table creation or verifies that a sibling plugin's existing tables are
//! structurally equivalent; at revert time it drops the tables only when
//! no other installed plugin still needs them. The external migration
//! runner serializes lifecycle steps, so no locking happens here.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::backend::{DdlEngine, SchemaBackend};
use crate::error::GuardError;
use crate::registry::{PluginRecord, PluginRegistry};
use crate::schema::{BaselineSchema, SHARED_TABLES, TAGGINGS_TABLE, TAGS_TABLE, expected_structure};

/// Which branch the create direction took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Neither table existed; the baseline was applied.
    Created,
    /// A conforming set of tables already existed; nothing was created.
    SkippedExisting,
}

/// Which branch the revert direction took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertOutcome {
    /// No other installed plugin uses the tables; both were dropped.
    Dropped,
    /// Other plugins still need the tables; nothing was dropped.
    SkippedInUse {
        /// The still-dependent plugins, in host load order.
        still_using: Vec<String>,
    },
}

/// The migration guard for the shared tagging tables.
pub struct MigrationGuard {
    registry: Arc<dyn PluginRegistry>,
    schema: Arc<dyn SchemaBackend>,
    ddl: Arc<dyn DdlEngine>,
    baseline: BaselineSchema,
}

impl MigrationGuard {
    pub fn new(
        registry: Arc<dyn PluginRegistry>,
        schema: Arc<dyn SchemaBackend>,
        ddl: Arc<dyn DdlEngine>,
        baseline: BaselineSchema,
    ) -> Self {
        Self {
            registry,
            schema,
            ddl,
            baseline,
        }
    }

    /// Apply the create direction of the lifecycle.
    ///
    /// Creates the shared tables from the baseline when neither exists;
    /// skips creation when a structurally conforming set already exists.
    ///
    /// # Errors
    ///
    /// Fails with [`GuardError::MissingDeclaration`] when the current
    /// plugin never declared the dependency, and with
    /// [`GuardError::SchemaMismatch`] when an existing table diverges
    /// from the expected structure. Database errors propagate as-is.
    pub async fn apply_create(&self) -> Result<CreateOutcome> {
        let current = self.registry.current_plugin();
        self.enforce_declaration(&current)?;
        self.scan_for_undeclared_usage();

        if self.any_table_exists().await? {
            self.assert_structures_match(&current).await?;
            info!(
                plugin = %current.name,
                "not creating \"tags\" and \"taggings\" because they already exist"
            );
            return Ok(CreateOutcome::SkippedExisting);
        }

        self.ddl.create_tables(&self.baseline).await?;
        info!(plugin = %current.name, "created \"tags\" and \"taggings\"");
        Ok(CreateOutcome::Created)
    }

    /// Apply the revert direction of the lifecycle.
    ///
    /// Drops the shared tables when no other installed plugin still uses
    /// them; otherwise skips and reports the still-dependent plugins.
    ///
    /// # Errors
    ///
    /// Fails with [`GuardError::MissingDeclaration`] when the current
    /// plugin never declared the dependency. Database errors propagate
    /// as-is.
    pub async fn apply_revert(&self) -> Result<RevertOutcome> {
        let current = self.registry.current_plugin();
        self.enforce_declaration(&current)?;

        let still_using = self.plugins_still_using_tables(&current);
        if !still_using.is_empty() {
            info!(
                plugin = %current.name,
                "not dropping \"tags\" and \"taggings\" because they're still needed by the following plugins:"
            );
            for name in &still_using {
                info!(plugin = %name, "still using the shared tagging tables");
            }
            return Ok(RevertOutcome::SkippedInUse { still_using });
        }

        // Taggings first so its tag_id reference never dangles mid-drop.
        self.ddl.drop_tables(&[TAGGINGS_TABLE, TAGS_TABLE]).await?;
        info!(plugin = %current.name, "dropped \"tags\" and \"taggings\"");
        Ok(RevertOutcome::Dropped)
    }

    /// Gate: the current plugin must have declared the dependency.
    fn enforce_declaration(&self, current: &PluginRecord) -> Result<()> {
        if !current.declares_shared_tagging {
            return Err(GuardError::missing_declaration(&current.name).into());
        }
        Ok(())
    }

    /// Warn about installed plugins that use the shared tables without
    /// declaring the dependency. Diagnostic only; never fails and never
    /// affects the create/revert decision.
    fn scan_for_undeclared_usage(&self) {
        for plugin in self.registry.installed_plugins() {
            if plugin.uses_tagging_tables && !plugin.declares_shared_tagging {
                warn!(
                    plugin = %plugin.name,
                    "uses the shared tagging tables without declaring the dependency"
                );
            }
        }
    }

    async fn any_table_exists(&self) -> Result<bool> {
        for table in SHARED_TABLES {
            if self.schema.table_exists(table).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Compare both live structures against the expected structures.
    /// Either table diverging is sufficient to fail.
    async fn assert_structures_match(&self, current: &PluginRecord) -> Result<()> {
        for table in SHARED_TABLES {
            let live = self.schema.table_structure(table).await?;
            // Lookup cannot miss: SHARED_TABLES and expected_structure
            // cover the same two names.
            let Some(expected) = expected_structure(table) else {
                continue;
            };

            if live != expected {
                warn!(
                    plugin = %current.name,
                    table = %table,
                    live = %live,
                    expected = %expected,
                    "existing table structure does not match"
                );
                return Err(GuardError::schema_mismatch(&current.name).into());
            }
        }
        Ok(())
    }

    /// Installed plugins that use the shared tables, excluding the one
    /// currently being reverted. Host load order is preserved.
    fn plugins_still_using_tables(&self, current: &PluginRecord) -> Vec<String> {
        self.registry
            .installed_plugins()
            .into_iter()
            .filter(|p| p.uses_tagging_tables && p.name != current.name)
            .map(|p| p.name)
            .collect()
    }
}
