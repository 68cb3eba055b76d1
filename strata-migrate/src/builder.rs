//! Entity-to-schema conversion and the schema registry.
//!
//! The builder turns an [`EntityInfo`] into a normalized [`TableSchema`] by
//! parsing each field's column tag. The tag grammar is a comma-separated
//! option list:
//!
//! ```text
//! <column>[,pk][,notnull][,unique][,type=X][,default=E][,fk=T.C][,delete=A][,update=A]
//! ```
//!
//! A tag name of `-` (or an empty tag) skips the field. When no `type=` is
//! given the column type defaults to `text`: the discovery collaborator has
//! already lost host-language type information, and the builder only
//! guarantees determinism given the tag.

use std::collections::BTreeMap;

use crate::model::{ColumnAttributes, ColumnMeta, EntityInfo, ForeignKey, ReferentialAction, TableSchema};

/// Fallback column type when the tag carries no `type=` option.
const DEFAULT_PG_TYPE: &str = "text";

/// Build a [`TableSchema`] from an entity description.
pub fn build_schema(entity: &EntityInfo) -> TableSchema {
    let mut columns = Vec::with_capacity(entity.fields.len());

    for (position, field) in entity.fields.iter().enumerate() {
        let Some((column_name, attrs)) = parse_tag(&field.raw_tag) else {
            continue;
        };

        columns.push(ColumnMeta {
            field_name: field.field_name.clone(),
            column_name,
            index: if field.index != 0 { field.index } else { position },
            attrs,
        });
    }

    TableSchema {
        table_name: entity.table_name.clone(),
        columns,
    }
}

/// Parse a column tag into its column name and attributes.
///
/// Returns `None` when the field is skipped (`-` or empty name). The parser
/// is total: unrecognized options are ignored, and `delete=`/`update=`
/// without a preceding `fk=` are dropped.
pub fn parse_tag(tag: &str) -> Option<(String, ColumnAttributes)> {
    // Accept both the bare tag and the `db:"..."` wrapper spelling.
    let tag = tag
        .trim()
        .strip_prefix("db:\"")
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(tag.trim());

    let mut parts = tag.split(',');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() || name == "-" {
        return None;
    }

    let mut attrs = ColumnAttributes::default();

    for part in parts {
        let part = part.trim();
        match part {
            "pk" => {
                attrs.is_pk = true;
                attrs.not_null = true;
            }
            "notnull" => attrs.not_null = true,
            "unique" => attrs.unique = true,
            _ => {
                if let Some(ty) = part.strip_prefix("type=") {
                    attrs.pg_type = ty.to_string();
                } else if let Some(expr) = part.strip_prefix("default=") {
                    attrs.default = Some(expr.to_string());
                } else if let Some(target) = part.strip_prefix("fk=") {
                    if let Some((table, column)) = target.split_once('.') {
                        attrs.foreign_key = Some(ForeignKey {
                            ref_table: table.to_string(),
                            ref_column: column.to_string(),
                            on_delete: ReferentialAction::NoAction,
                            on_update: ReferentialAction::NoAction,
                        });
                    }
                } else if let Some(action) = part.strip_prefix("delete=") {
                    if let Some(fk) = attrs.foreign_key.as_mut() {
                        fk.on_delete = ReferentialAction::parse(action);
                    }
                } else if let Some(action) = part.strip_prefix("update=") {
                    if let Some(fk) = attrs.foreign_key.as_mut() {
                        fk.on_update = ReferentialAction::parse(action);
                    }
                }
            }
        }
    }

    if attrs.pg_type.is_empty() {
        attrs.pg_type = DEFAULT_PG_TYPE.to_string();
    }

    Some((name.to_string(), attrs))
}

/// Builder closure producing the declared schema for one table.
pub type TableBuilder = Box<dyn Fn(&str) -> TableSchema + Send + Sync>;

/// Registry of declared tables, keyed by table name.
///
/// One builder closure per table; iteration order is the sorted table-name
/// order, which keeps downstream planning deterministic.
#[derive(Default)]
pub struct SchemaRegistry {
    builders: BTreeMap<String, TableBuilder>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder closure for a table.
    pub fn register(
        &mut self,
        table: impl Into<String>,
        builder: impl Fn(&str) -> TableSchema + Send + Sync + 'static,
    ) {
        self.builders.insert(table.into(), Box::new(builder));
    }

    /// Register an entity description; its schema is built on demand.
    pub fn register_entity(&mut self, entity: EntityInfo) {
        let table = entity.table_name.clone();
        self.register(table, move |_| build_schema(&entity));
    }

    /// Whether a table is declared.
    pub fn contains(&self, table: &str) -> bool {
        self.builders.contains_key(table)
    }

    /// Declared table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    /// Number of declared tables.
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Whether no tables are declared.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Build every declared schema, keyed by table name.
    pub fn build_all(&self) -> BTreeMap<String, TableSchema> {
        self.builders
            .iter()
            .map(|(table, builder)| (table.clone(), builder(table)))
            .collect()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("tables", &self.table_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldInfo;

    fn field(name: &str, tag: &str) -> FieldInfo {
        FieldInfo {
            field_name: name.to_string(),
            column_name: String::new(),
            index: 0,
            raw_tag: tag.to_string(),
        }
    }

    #[test]
    fn test_parse_tag_pk_implies_not_null() {
        let (name, attrs) = parse_tag("id,pk,type=integer").unwrap();
        assert_eq!(name, "id");
        assert!(attrs.is_pk);
        assert!(attrs.not_null);
        assert_eq!(attrs.pg_type, "integer");
    }

    #[test]
    fn test_parse_tag_default_type_is_text() {
        let (_, attrs) = parse_tag("title").unwrap();
        assert_eq!(attrs.pg_type, "text");
    }

    #[test]
    fn test_parse_tag_skip_markers() {
        assert!(parse_tag("-").is_none());
        assert!(parse_tag("").is_none());
        assert!(parse_tag("-,pk").is_none());
    }

    #[test]
    fn test_parse_tag_foreign_key_with_actions() {
        let (_, attrs) = parse_tag("author_id,type=integer,fk=authors.id,delete=cascade").unwrap();
        let fk = attrs.foreign_key.expect("fk should be set");
        assert_eq!(fk.ref_table, "authors");
        assert_eq!(fk.ref_column, "id");
        assert_eq!(fk.on_delete, ReferentialAction::Cascade);
        assert_eq!(fk.on_update, ReferentialAction::NoAction);
    }

    #[test]
    fn test_parse_tag_action_without_fk_is_ignored() {
        let (_, attrs) = parse_tag("author_id,delete=cascade").unwrap();
        assert!(attrs.foreign_key.is_none());
    }

    #[test]
    fn test_parse_tag_default_expression_verbatim() {
        let (_, attrs) = parse_tag("created_at,type=timestamptz,default=now(),notnull").unwrap();
        assert_eq!(attrs.default.as_deref(), Some("now()"));
        assert!(attrs.not_null);
    }

    #[test]
    fn test_parse_tag_db_wrapper() {
        let (name, attrs) = parse_tag(r#"db:"email,unique""#).unwrap();
        assert_eq!(name, "email");
        assert!(attrs.unique);
    }

    #[test]
    fn test_build_schema_skips_untagged_fields() {
        let entity = EntityInfo {
            struct_name: "User".to_string(),
            table_name: "users".to_string(),
            fields: vec![
                field("Id", "id,pk,type=integer"),
                field("Internal", "-"),
                field("Email", "email,unique"),
            ],
        };

        let schema = build_schema(&entity);
        assert_eq!(schema.table_name, "users");
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].column_name, "id");
        assert_eq!(schema.columns[1].column_name, "email");
        assert_eq!(schema.columns[1].index, 2);
    }

    #[test]
    fn test_registry_sorted_iteration() {
        let mut registry = SchemaRegistry::new();
        registry.register("posts", |t| TableSchema {
            table_name: t.to_string(),
            columns: Vec::new(),
        });
        registry.register("authors", |t| TableSchema {
            table_name: t.to_string(),
            columns: Vec::new(),
        });

        assert_eq!(registry.table_names(), vec!["authors", "posts"]);
        let schemas = registry.build_all();
        assert_eq!(schemas.len(), 2);
        assert!(registry.contains("posts"));
    }

    #[test]
    fn test_registry_register_entity() {
        let mut registry = SchemaRegistry::new();
        registry.register_entity(EntityInfo {
            struct_name: "Author".to_string(),
            table_name: "authors".to_string(),
            fields: vec![field("Id", "id,pk,type=integer")],
        });

        let schemas = registry.build_all();
        let authors = schemas.get("authors").expect("authors should be built");
        assert_eq!(authors.columns.len(), 1);
        assert!(authors.columns[0].attrs.is_pk);
    }
}
