//! Shared table structures and the baseline schema.
//!
//! The guard compares live table structures against the expected shared
//! structures, and hands the baseline schema to the DDL engine when it is
//! the first installer. Structures are normalized snapshots: bookkeeping
//! columns are dropped and the rest sorted so comparison is order
//! independent.

/// Name of the shared tags table.
pub const TAGS_TABLE: &str = "tags";

/// Name of the shared taggings table.
pub const TAGGINGS_TABLE: &str = "taggings";

/// Both shared tables, in create order.
pub const SHARED_TABLES: [&str; 2] = [TAGS_TABLE, TAGGINGS_TABLE];

/// Columns excluded from structure comparison. Every plugin is free to
/// rely on these existing; none is allowed to disagree about the rest.
const BOOKKEEPING_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Logical column type, abstracted over the backend's catalog types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnType {
    String,
    Text,
    Integer,
    BigInt,
    DateTime,
    Boolean,
    /// Any catalog type the guard has no logical name for. Compared
    /// verbatim, so two plugins using the same exotic type still agree.
    Other(String),
}

impl ColumnType {
    /// Stable lowercase name used for comparison and display.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::DateTime => "datetime",
            Self::Boolean => "boolean",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a live or expected table structure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Normalized snapshot of a table's structure.
///
/// Immutable once built; recomputed from the catalog on every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStructure {
    columns: Vec<Column>,
}

impl TableStructure {
    /// Build a normalized structure: bookkeeping columns removed, the
    /// remainder sorted by name (then type).
    pub fn normalized(columns: Vec<Column>) -> Self {
        let mut columns: Vec<Column> = columns
            .into_iter()
            .filter(|c| !BOOKKEEPING_COLUMNS.contains(&c.name.as_str()))
            .collect();
        columns.sort();
        Self { columns }
    }

    /// An empty structure, what introspecting a missing table yields.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The normalized columns, in sorted order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

impl std::fmt::Display for TableStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for col in &self.columns {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}:{}", col.name, col.kind)?;
            first = false;
        }
        Ok(())
    }
}

/// The structure every plugin must agree on for the tags table.
pub fn expected_tags_structure() -> TableStructure {
    TableStructure::normalized(vec![Column::new("name", ColumnType::String)])
}

/// The structure every plugin must agree on for the taggings table.
pub fn expected_taggings_structure() -> TableStructure {
    TableStructure::normalized(vec![
        Column::new("tag_id", ColumnType::Integer),
        Column::new("taggable_id", ColumnType::Integer),
        Column::new("taggable_type", ColumnType::String),
        Column::new("tagger_id", ColumnType::Integer),
        Column::new("tagger_type", ColumnType::String),
        Column::new("context", ColumnType::String),
    ])
}

/// The expected structure for a shared table, by name.
pub fn expected_structure(table: &str) -> Option<TableStructure> {
    match table {
        TAGS_TABLE => Some(expected_tags_structure()),
        TAGGINGS_TABLE => Some(expected_taggings_structure()),
        _ => None,
    }
}

/// A column of the baseline (first-installer) schema.
#[derive(Debug, Clone)]
pub struct BaselineColumn {
    pub name: String,
    pub kind: ColumnType,
    /// Length limit for string columns, where the baseline specifies one.
    pub limit: Option<u32>,
}

impl BaselineColumn {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An index of the baseline schema.
#[derive(Debug, Clone)]
pub struct BaselineIndex {
    pub table: String,
    pub columns: Vec<String>,
}

/// The externally-owned schema used only when this plugin is the first
/// installer of the shared tables. Not compared against; the expected
/// structures above are the comparison contract.
#[derive(Debug, Clone)]
pub struct BaselineSchema {
    pub tags: Vec<BaselineColumn>,
    pub taggings: Vec<BaselineColumn>,
    pub indexes: Vec<BaselineIndex>,
}

impl BaselineSchema {
    /// The upstream tagging library's own first migration: the column set
    /// and indexes it creates when no sibling plugin got there first.
    pub fn acts_as_taggable_on() -> Self {
        Self {
            tags: vec![BaselineColumn::new("name", ColumnType::String)],
            taggings: vec![
                BaselineColumn::new("tag_id", ColumnType::Integer),
                BaselineColumn::new("taggable_id", ColumnType::Integer),
                BaselineColumn::new("taggable_type", ColumnType::String),
                BaselineColumn::new("tagger_id", ColumnType::Integer),
                BaselineColumn::new("tagger_type", ColumnType::String),
                BaselineColumn::new("context", ColumnType::String).with_limit(128),
                BaselineColumn::new("created_at", ColumnType::DateTime),
            ],
            indexes: vec![
                BaselineIndex {
                    table: TAGGINGS_TABLE.to_string(),
                    columns: vec!["tag_id".to_string()],
                },
                BaselineIndex {
                    table: TAGGINGS_TABLE.to_string(),
                    columns: vec![
                        "taggable_id".to_string(),
                        "taggable_type".to_string(),
                        "context".to_string(),
                    ],
                },
            ],
        }
    }
}

impl Default for BaselineSchema {
    fn default() -> Self {
        Self::acts_as_taggable_on()
    }
}
