//! Guard test utilities.
//!
//! Helpers for integration testing: fixture plugins and registries, and
//! an in-memory schema/DDL backend that records every call the guard
//! makes against it.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use tagging_guard::schema::{BaselineColumn, BaselineSchema, Column, ColumnType, TableStructure};
use tagging_guard::{DdlEngine, PluginRecord, PluginRegistry, SchemaBackend};

/// Initialize tracing for tests. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Create a fixture plugin with no tagging facts set.
pub fn plugin(name: &str) -> FixturePlugin {
    FixturePlugin {
        record: PluginRecord::new(name),
    }
}

/// A fixture plugin builder.
#[derive(Debug, Clone)]
pub struct FixturePlugin {
    record: PluginRecord,
}

impl FixturePlugin {
    /// Declare the shared tagging dependency (implies usage, as manifest
    /// parsing does).
    pub fn declares(mut self) -> Self {
        self.record.declares_shared_tagging = true;
        self.record.uses_tagging_tables = true;
        self
    }

    /// Mark the plugin as touching the shared tables without declaring.
    pub fn uses(mut self) -> Self {
        self.record.uses_tagging_tables = true;
        self
    }

    /// The underlying registry record.
    pub fn record(&self) -> PluginRecord {
        self.record.clone()
    }
}

/// A fixture registry over a fixed set of installed plugins.
pub struct FixtureRegistry {
    current: String,
    installed: Vec<PluginRecord>,
}

impl FixtureRegistry {
    /// Build a registry; `current` names the plugin whose lifecycle step
    /// is being driven. The installed order is preserved verbatim.
    pub fn new(plugins: &[FixturePlugin], current: &str) -> Arc<Self> {
        Arc::new(Self {
            current: current.to_string(),
            installed: plugins.iter().map(FixturePlugin::record).collect(),
        })
    }
}

impl PluginRegistry for FixtureRegistry {
    fn current_plugin(&self) -> PluginRecord {
        self.installed
            .iter()
            .find(|p| p.name == self.current)
            .cloned()
            // An unknown current plugin made no declaration.
            .unwrap_or_else(|| PluginRecord::new(&self.current))
    }

    fn installed_plugins(&self) -> Vec<PluginRecord> {
        self.installed.clone()
    }
}

/// One recorded DDL invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlCall {
    CreateTables,
    DropTables(Vec<String>),
}

/// In-memory schema backend and DDL engine.
///
/// Tables live in a map of name to raw column list; `create_tables`
/// materializes the baseline (with the bookkeeping `id` column) so a
/// second `apply_create` observes what the first one built.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Column>>>,
    ddl_calls: Mutex<Vec<DdlCall>>,
    schema_queries: Mutex<usize>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Preload a table with raw (un-normalized) columns.
    pub fn with_table(self: Arc<Self>, name: &str, columns: Vec<Column>) -> Arc<Self> {
        self.tables.lock().insert(name.to_string(), columns);
        self
    }

    /// Every DDL invocation the guard made, in order.
    pub fn ddl_calls(&self) -> Vec<DdlCall> {
        self.ddl_calls.lock().clone()
    }

    /// How many create invocations the guard made.
    pub fn create_calls(&self) -> usize {
        self.ddl_calls
            .lock()
            .iter()
            .filter(|c| matches!(c, DdlCall::CreateTables))
            .count()
    }

    /// How many drop invocations the guard made.
    pub fn drop_calls(&self) -> usize {
        self.ddl_calls
            .lock()
            .iter()
            .filter(|c| matches!(c, DdlCall::DropTables(_)))
            .count()
    }

    /// How many existence/introspection queries the guard made.
    pub fn schema_queries(&self) -> usize {
        *self.schema_queries.lock()
    }

    /// Whether a table currently exists in the fixture database.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.lock().contains_key(name)
    }
}

#[async_trait]
impl SchemaBackend for MemoryBackend {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        *self.schema_queries.lock() += 1;
        Ok(self.tables.lock().contains_key(table))
    }

    async fn table_structure(&self, table: &str) -> Result<TableStructure> {
        *self.schema_queries.lock() += 1;
        let columns = self.tables.lock().get(table).cloned().unwrap_or_default();
        Ok(TableStructure::normalized(columns))
    }
}

#[async_trait]
impl DdlEngine for MemoryBackend {
    async fn create_tables(&self, baseline: &BaselineSchema) -> Result<()> {
        let materialize = |columns: &[BaselineColumn]| {
            let mut out = vec![Column::new("id", ColumnType::Integer)];
            out.extend(
                columns
                    .iter()
                    .map(|c| Column::new(c.name.clone(), c.kind.clone())),
            );
            out
        };

        let mut tables = self.tables.lock();
        tables.insert("tags".to_string(), materialize(&baseline.tags));
        tables.insert("taggings".to_string(), materialize(&baseline.taggings));
        drop(tables);

        self.ddl_calls.lock().push(DdlCall::CreateTables);
        Ok(())
    }

    async fn drop_tables(&self, names: &[&str]) -> Result<()> {
        let mut tables = self.tables.lock();
        for name in names {
            tables.remove(*name);
        }
        drop(tables);

        self.ddl_calls.lock().push(DdlCall::DropTables(
            names.iter().map(|n| (*n).to_string()).collect(),
        ));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn plugin_builder_sets_facts() {
        let declared = plugin("blog").declares();
        assert!(declared.record().declares_shared_tagging);
        assert!(declared.record().uses_tagging_tables);

        let legacy = plugin("legacy").uses();
        assert!(!legacy.record().declares_shared_tagging);
        assert!(legacy.record().uses_tagging_tables);
    }

    #[test]
    fn registry_falls_back_for_unknown_current() {
        let registry = FixtureRegistry::new(&[plugin("blog").declares()], "ghost");
        let current = registry.current_plugin();
        assert_eq!(current.name, "ghost");
        assert!(!current.declares_shared_tagging);
    }

    #[tokio::test]
    async fn backend_records_calls() {
        let backend = MemoryBackend::new();
        assert!(!backend.table_exists("tags").await.unwrap());

        backend
            .create_tables(&BaselineSchema::acts_as_taggable_on())
            .await
            .unwrap();
        assert!(backend.has_table("tags"));
        assert!(backend.has_table("taggings"));

        backend.drop_tables(&["taggings", "tags"]).await.unwrap();
        assert!(!backend.has_table("tags"));

        assert_eq!(backend.create_calls(), 1);
        assert_eq!(backend.drop_calls(), 1);
        assert_eq!(backend.schema_queries(), 1);
    }
}
