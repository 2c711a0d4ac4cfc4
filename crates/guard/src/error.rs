//! Guard error types with clear, actionable messages.
//!
//! Both variants are fatal: they abort the enclosing migration step
//! before any DDL runs. Underlying database errors are not wrapped and
//! propagate as-is.

use thiserror::Error;

/// Errors raised by the shared-table migration guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The plugin running its lifecycle step never declared that it
    /// needs the shared tagging tables.
    #[error(
        "plugin '{plugin}': missing shared-tagging declaration. Add \
         `requires_shared_tables = true` under [tagging] in the plugin's \
         info.toml; see the README for details"
    )]
    MissingDeclaration { plugin: String },

    /// Another plugin already created the shared tables with a structure
    /// this plugin does not agree with.
    #[error(
        "plugin '{plugin}': a plugin is already using the \"tags\" or \
         \"taggings\" tables, and the structure of the table does not \
         match the structure expected by '{plugin}'"
    )]
    SchemaMismatch { plugin: String },
}

impl GuardError {
    /// Create a missing declaration error.
    pub fn missing_declaration(plugin: impl Into<String>) -> Self {
        Self::MissingDeclaration {
            plugin: plugin.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(plugin: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            plugin: plugin.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_declaration_message_is_actionable() {
        let err = GuardError::missing_declaration("blog");
        let msg = err.to_string();
        assert!(msg.contains("blog"));
        assert!(msg.contains("requires_shared_tables = true"));
        assert!(msg.contains("info.toml"));
    }

    #[test]
    fn schema_mismatch_names_the_plugin() {
        let err = GuardError::schema_mismatch("media");
        let msg = err.to_string();
        assert!(msg.contains("media"));
        assert!(msg.contains("tags"));
        assert!(msg.contains("taggings"));
    }
}
