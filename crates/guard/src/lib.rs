//! Migration guard for the shared tags/taggings tables.
//!
//! Multiple independently installed plugins share two database tables.
//! Whichever plugin installs first creates them from the baseline schema;
//! every later installer must find a structurally equivalent set or fail.
//! On uninstall the tables are dropped only when no other installed
//! plugin still uses them. The guard decides; the host's migration runner
//! applies, one lifecycle step at a time.

pub mod backend;
pub mod error;
pub mod guard;
pub mod manifest;
pub mod registry;
pub mod schema;

pub use backend::{DdlEngine, PgBackend, SchemaBackend};
pub use error::GuardError;
pub use guard::{CreateOutcome, MigrationGuard, RevertOutcome};
pub use manifest::{PluginManifest, TaggingConfig};
pub use registry::{ManifestRegistry, PluginRecord, PluginRegistry};
pub use schema::{BaselineSchema, Column, ColumnType, TableStructure};
