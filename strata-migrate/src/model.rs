//! Core schema data types.
//!
//! These types describe the declared shape of the relational model (as
//! supplied by a discovery collaborator), the live shape reported by
//! database introspection, and the diff between the two.

use serde::{Deserialize, Serialize};

/// An entity description supplied by the discovery collaborator.
///
/// The engine never inspects host-language types; everything it needs is in
/// the per-field tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    /// Identifier of the record type in source.
    pub struct_name: String,
    /// Target SQL table identifier.
    pub table_name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
}

/// A single field of an entity description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field identifier in source.
    pub field_name: String,
    /// Column identifier; empty means "take the name from the tag".
    #[serde(default)]
    pub column_name: String,
    /// Declaration order.
    #[serde(default)]
    pub index: usize,
    /// The raw column tag, e.g. `id,pk,type=integer`.
    #[serde(rename = "tag", default)]
    pub raw_tag: String,
}

/// The shape of one table: its name plus an ordered column list.
///
/// Values are immutable once built; the normalizer returns fresh copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableSchema {
    /// An empty column list means the table does not exist.
    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Look up a column by its SQL name.
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.column_name == name)
    }

    /// Primary-key column names in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.attrs.is_pk)
            .map(|c| c.column_name.as_str())
            .collect()
    }
}

/// One column of a table schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMeta {
    pub field_name: String,
    pub column_name: String,
    /// Declaration order; the stable ordering key.
    pub index: usize,
    pub attrs: ColumnAttributes,
}

/// Column attributes parsed from a tag or read from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnAttributes {
    /// PostgreSQL type name, e.g. `integer`, `text`, `timestamptz`.
    pub pg_type: String,
    pub not_null: bool,
    pub unique: bool,
    pub is_pk: bool,
    /// Raw SQL default expression, stored verbatim.
    pub default: Option<String>,
    pub foreign_key: Option<ForeignKey>,
    /// Real catalog constraint name when known from introspection, so DROP
    /// targets the actual constraint rather than the synthetic name.
    pub constraint_name: Option<String>,
}

/// A single-column foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKey {
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// Referential action on DELETE/UPDATE of the referenced row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    Restrict,
    #[default]
    NoAction,
}

impl ReferentialAction {
    /// Parse a catalog or tag spelling. Empty and unrecognized spellings
    /// normalize to `NO ACTION`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "RESTRICT" => Self::Restrict,
            _ => Self::NoAction,
        }
    }

    /// The SQL spelling of the action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Ordered forward/reverse DDL statement lists for one table.
///
/// Built once per `(table, old, new)` and consumed by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDiff {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl TableDiff {
    /// Check whether the diff carries any statements.
    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }
}
