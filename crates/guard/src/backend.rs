//! Database collaborators: catalog introspection and DDL execution.
//!
//! The guard only decides; these traits do the looking and the touching.
//! `PgBackend` implements both over a PostgreSQL pool, introspecting
//! through `information_schema` and building DDL with sea-query.

use anyhow::Result;
use async_trait::async_trait;
use sea_query::{Alias, ColumnDef, Index, PostgresQueryBuilder, Table};
use sqlx::{Executor, PgPool, Row};
use tracing::debug;

use crate::schema::{BaselineColumn, BaselineSchema, Column, ColumnType, TableStructure};

/// Read-only view of the live database schema.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Check whether a table exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Introspect a table's normalized structure.
    ///
    /// A missing table yields an empty structure, which never matches an
    /// expected structure.
    async fn table_structure(&self, table: &str) -> Result<TableStructure>;
}

/// DDL execution engine. The guard authorizes; this applies.
#[async_trait]
pub trait DdlEngine: Send + Sync {
    /// Create the shared tables and their indexes from the baseline.
    async fn create_tables(&self, baseline: &BaselineSchema) -> Result<()>;

    /// Drop tables, in the given order.
    async fn drop_tables(&self, tables: &[&str]) -> Result<()>;
}

/// PostgreSQL-backed schema introspection and DDL.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaBackend for PgBackend {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as cnt FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("cnt");
        Ok(count > 0)
    }

    async fn table_structure(&self, table: &str) -> Result<TableStructure> {
        let rows = sqlx::query(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let columns: Vec<Column> = rows
            .iter()
            .map(|r| {
                let name: String = r.get("column_name");
                let data_type: String = r.get("data_type");
                Column::new(name, logical_type(&data_type))
            })
            .collect();

        Ok(TableStructure::normalized(columns))
    }
}

#[async_trait]
impl DdlEngine for PgBackend {
    async fn create_tables(&self, baseline: &BaselineSchema) -> Result<()> {
        // All statements in one transaction: either both tables and every
        // index land, or nothing does.
        let mut tx = self.pool.begin().await?;

        for sql in create_statements(baseline) {
            debug!(sql = %sql, "executing create statement");
            // Executor::execute (rather than RawSql::execute) returns an
            // already-boxed future; the opaque-future form fails the Send
            // proof under rust-lang/rust#100013.
            (&mut *tx).execute(sqlx::raw_sql(&sql)).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn drop_tables(&self, tables: &[&str]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for table in tables {
            let sql = Table::drop()
                .table(Alias::new(*table))
                .to_string(PostgresQueryBuilder);
            debug!(sql = %sql, "executing drop statement");
            (&mut *tx).execute(sqlx::raw_sql(&sql)).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Map an `information_schema` data type to the logical column type used
/// for structure comparison.
pub fn logical_type(data_type: &str) -> ColumnType {
    match data_type.to_ascii_lowercase().as_str() {
        "character varying" | "varchar" | "character" => ColumnType::String,
        "text" => ColumnType::Text,
        "integer" | "smallint" => ColumnType::Integer,
        "bigint" => ColumnType::BigInt,
        "boolean" => ColumnType::Boolean,
        other if other.starts_with("timestamp") => ColumnType::DateTime,
        other => ColumnType::Other(other.to_string()),
    }
}

/// Build the CREATE TABLE / CREATE INDEX statements for the baseline.
pub fn create_statements(baseline: &BaselineSchema) -> Vec<String> {
    let mut statements = vec![
        create_table_sql(crate::schema::TAGS_TABLE, &baseline.tags),
        create_table_sql(crate::schema::TAGGINGS_TABLE, &baseline.taggings),
    ];

    for index in &baseline.indexes {
        let name = format!("index_{}_on_{}", index.table, index.columns.join("_and_"));
        let mut stmt = Index::create();
        stmt.name(name).table(Alias::new(index.table.as_str()));
        for column in &index.columns {
            stmt.col(Alias::new(column.as_str()));
        }
        statements.push(stmt.to_string(PostgresQueryBuilder));
    }

    statements
}

fn create_table_sql(table: &str, columns: &[BaselineColumn]) -> String {
    let mut stmt = Table::create();
    stmt.table(Alias::new(table)).col(
        ColumnDef::new(Alias::new("id"))
            .integer()
            .not_null()
            .auto_increment()
            .primary_key(),
    );

    for column in columns {
        let mut def = ColumnDef::new(Alias::new(column.name.as_str()));
        match (&column.kind, column.limit) {
            (ColumnType::String, Some(limit)) => {
                def.string_len(limit);
            }
            (ColumnType::String, None) => {
                def.string();
            }
            (ColumnType::Text, _) => {
                def.text();
            }
            (ColumnType::Integer, _) => {
                def.integer();
            }
            (ColumnType::BigInt, _) => {
                def.big_integer();
            }
            (ColumnType::DateTime, _) => {
                def.date_time();
            }
            (ColumnType::Boolean, _) => {
                def.boolean();
            }
            (ColumnType::Other(name), _) => {
                def.custom(Alias::new(name.as_str()));
            }
        }
        stmt.col(&mut def);
    }

    stmt.to_string(PostgresQueryBuilder)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn logical_type_maps_pg_catalog_types() {
        assert_eq!(logical_type("character varying"), ColumnType::String);
        assert_eq!(logical_type("text"), ColumnType::Text);
        assert_eq!(logical_type("integer"), ColumnType::Integer);
        assert_eq!(logical_type("smallint"), ColumnType::Integer);
        assert_eq!(logical_type("bigint"), ColumnType::BigInt);
        assert_eq!(logical_type("boolean"), ColumnType::Boolean);
        assert_eq!(logical_type("timestamp without time zone"), ColumnType::DateTime);
        assert_eq!(logical_type("timestamp with time zone"), ColumnType::DateTime);
    }

    #[test]
    fn logical_type_preserves_unknown_types() {
        assert_eq!(logical_type("jsonb"), ColumnType::Other("jsonb".to_string()));
    }

    #[test]
    fn create_statements_cover_both_tables_and_indexes() {
        let statements = create_statements(&BaselineSchema::acts_as_taggable_on());

        // Two tables plus two taggings indexes.
        assert_eq!(statements.len(), 4);
        assert!(statements[0].contains("\"tags\""));
        assert!(statements[1].contains("\"taggings\""));
        assert!(statements[2].contains("index_taggings_on_tag_id"));
        assert!(statements[3].contains("index_taggings_on_taggable_id_and_taggable_type_and_context"));
    }

    #[test]
    fn baseline_tables_get_a_serial_primary_key() {
        let statements = create_statements(&BaselineSchema::acts_as_taggable_on());
        assert!(statements[0].contains("\"id\" serial"));
        assert!(statements[0].contains("PRIMARY KEY"));
    }

    #[test]
    fn baseline_context_column_carries_its_limit() {
        let statements = create_statements(&BaselineSchema::acts_as_taggable_on());
        assert!(statements[1].contains("\"context\" varchar(128)"));
    }
}
