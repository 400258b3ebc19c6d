//! Compiles metadata documents into table definitions.

use crate::error::{MdSchemaError, Result};
use crate::metadata::{MetadataDocument, ResourceDescriptor};
use crate::types::{ColumnType, TypeVocabulary};
use std::collections::{HashMap, HashSet};
use std::fmt;

pub const DEFAULT_SCHEMA: &str = "public";

/// A compiled table, ready to be provisioned.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn foreign_key_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.foreign_key.is_some())
            .count()
    }

    pub fn has_spatial_columns(&self) -> bool {
        self.columns.iter().any(|c| c.column_type.is_spatial())
    }

    /// Primary key column names in declaration order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub is_primary_key: bool,
    pub comment: Option<String>,
    pub foreign_key: Option<TableColumnRef>,
}

/// The target of a foreign key. `schema` is resolved against the compiler's
/// default schema; `schema_declared` records whether the metadata named it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableColumnRef {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub schema_declared: bool,
}

impl TableColumnRef {
    /// `schema.table` of the referenced table.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// The referenced resource and field as written in the metadata.
impl fmt::Display for TableColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema_declared {
            write!(f, "{}.{}.{}", self.schema, self.table, self.column)
        } else {
            write!(f, "{}.{}", self.table, self.column)
        }
    }
}

/// Turns metadata documents into table definitions.
///
/// Pure: no I/O, no database access. The same document always compiles to
/// the same tables in the same order.
pub struct TableCompiler<'a> {
    vocabulary: &'a TypeVocabulary,
    default_schema: String,
}

impl<'a> TableCompiler<'a> {
    pub fn new(vocabulary: &'a TypeVocabulary, default_schema: impl Into<String>) -> Self {
        TableCompiler {
            vocabulary,
            default_schema: default_schema.into(),
        }
    }

    /// Compile every resource of a document, in document order.
    pub fn compile(&self, document: &MetadataDocument) -> Result<Vec<TableDefinition>> {
        document
            .resources
            .iter()
            .map(|resource| self.compile_resource(document, resource))
            .collect()
    }

    fn compile_resource(
        &self,
        document: &MetadataDocument,
        resource: &ResourceDescriptor,
    ) -> Result<TableDefinition> {
        let doc = document.source.as_str();
        let (schema, table_name) = split_resource_name(&resource.name)
            .ok_or_else(|| {
                MdSchemaError::metadata(
                    doc,
                    format!("Cannot read table name (and schema) from resource '{}'", resource.name),
                )
            })?;
        let schema = schema.unwrap_or(self.default_schema.as_str()).to_string();

        let fields = &resource.schema.fields;
        let mut declared = HashSet::new();
        for field in fields {
            if !declared.insert(field.name.as_str()) {
                return Err(MdSchemaError::metadata(
                    doc,
                    format!("Duplicate field '{}' in resource '{}'", field.name, resource.name),
                ));
            }
        }

        let primary_keys: HashSet<&str> = resource.schema.primary_key.iter().collect();
        for key in &primary_keys {
            if !declared.contains(key) {
                return Err(MdSchemaError::metadata(
                    doc,
                    format!(
                        "Primary key '{}' is not a field of resource '{}'",
                        key, resource.name
                    ),
                ));
            }
        }

        let foreign_keys = self.foreign_key_map(doc, resource, &declared)?;

        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            let column_type = self
                .vocabulary
                .resolve(&field.field_type)
                .cloned()
                .ok_or_else(|| MdSchemaError::UnknownType {
                    document: doc.to_string(),
                    resource: resource.name.clone(),
                    field: field.name.clone(),
                    type_name: field.field_type.clone(),
                })?;

            columns.push(ColumnDefinition {
                name: field.name.clone(),
                column_type,
                is_primary_key: primary_keys.contains(field.name.as_str()),
                comment: field.description.clone(),
                foreign_key: foreign_keys.get(field.name.as_str()).cloned(),
            });
        }

        Ok(TableDefinition {
            schema,
            name: table_name.to_string(),
            columns,
        })
    }

    /// Local field name -> referenced column, for O(1) membership tests.
    fn foreign_key_map<'r>(
        &self,
        doc: &str,
        resource: &'r ResourceDescriptor,
        declared: &HashSet<&str>,
    ) -> Result<HashMap<&'r str, TableColumnRef>> {
        let mut map = HashMap::new();
        for fk in &resource.schema.foreign_keys {
            let local = fk.fields.first().ok_or_else(|| {
                MdSchemaError::metadata(
                    doc,
                    format!("Foreign key without fields in resource '{}'", resource.name),
                )
            })?;
            if !declared.contains(local) {
                return Err(MdSchemaError::metadata(
                    doc,
                    format!(
                        "Foreign key field '{}' is not a field of resource '{}'",
                        local, resource.name
                    ),
                ));
            }

            let target_column = fk.reference.fields.first().ok_or_else(|| {
                MdSchemaError::metadata(
                    doc,
                    format!(
                        "Foreign key '{}' of resource '{}' references no field",
                        local, resource.name
                    ),
                )
            })?;

            let target_resource = if fk.reference.resource.is_empty() {
                resource.name.as_str()
            } else {
                fk.reference.resource.as_str()
            };
            let (target_schema, target_table) =
                split_resource_name(target_resource).ok_or_else(|| {
                    MdSchemaError::metadata(
                        doc,
                        format!(
                            "Cannot resolve referenced resource '{}' of foreign key '{}.{}'",
                            target_resource, resource.name, local
                        ),
                    )
                })?;

            let reference = TableColumnRef {
                schema: target_schema
                    .unwrap_or(self.default_schema.as_str())
                    .to_string(),
                table: target_table.to_string(),
                column: target_column.to_string(),
                schema_declared: target_schema.is_some(),
            };
            if map.insert(local, reference).is_some() {
                return Err(MdSchemaError::metadata(
                    doc,
                    format!(
                        "Field '{}' of resource '{}' has more than one foreign key",
                        local, resource.name
                    ),
                ));
            }
        }
        Ok(map)
    }
}

/// Split `table` or `schema.table`. Anything else (or empty parts) is `None`.
pub fn split_resource_name(name: &str) -> Option<(Option<&str>, &str)> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    match parts.as_slice() {
        [table] => Some((None, *table)),
        [schema, table] => Some((Some(*schema), *table)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::parse_metadata_str;
    use pretty_assertions::assert_eq;

    fn compile(json: &str) -> Result<Vec<TableDefinition>> {
        let vocab = TypeVocabulary::builtin();
        let doc = parse_metadata_str(json, "test.json").unwrap();
        TableCompiler::new(&vocab, DEFAULT_SCHEMA).compile(&doc)
    }

    #[test]
    fn test_split_resource_name() {
        assert_eq!(split_resource_name("plant"), Some((None, "plant")));
        assert_eq!(
            split_resource_name("model_draft.plant"),
            Some((Some("model_draft"), "plant"))
        );
        assert_eq!(split_resource_name("a.b.c"), None);
        assert_eq!(split_resource_name(""), None);
        assert_eq!(split_resource_name("schema."), None);
    }

    #[test]
    fn test_compile_unqualified_name_uses_default_schema() {
        let tables = compile(
            r#"{"resources": [{"name": "region", "schema": {
                "fields": [{"name": "id", "type": "integer"}],
                "primaryKey": ["id"]
            }}]}"#,
        )
        .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].schema, "public");
        assert_eq!(tables[0].name, "region");
        assert_eq!(tables[0].qualified_name(), "public.region");
    }

    #[test]
    fn test_compile_custom_default_schema() {
        let vocab = TypeVocabulary::builtin();
        let doc = parse_metadata_str(
            r#"{"resources": [{"name": "region", "schema": {"fields": []}}]}"#,
            "inline",
        )
        .unwrap();
        let tables = TableCompiler::new(&vocab, "sandbox").compile(&doc).unwrap();
        assert_eq!(tables[0].schema, "sandbox");
    }

    #[test]
    fn test_compile_columns_keys_and_comments() {
        let tables = compile(
            r#"{"resources": [{
                "name": "model_draft.power_plant",
                "schema": {
                    "fields": [
                        {"name": "id", "type": "bigint", "description": "Unique id"},
                        {"name": "region_id", "type": "integer", "description": "Region"},
                        {"name": "capacity", "type": "float"},
                        {"name": "geom", "type": "geometry(point)"}
                    ],
                    "primaryKey": ["id"],
                    "foreignKeys": [{
                        "fields": ["region_id"],
                        "reference": {"resource": "boundaries.region", "fields": ["id"]}
                    }]
                }
            }]}"#,
        )
        .unwrap();

        let table = &tables[0];
        assert_eq!(table.schema, "model_draft");
        assert_eq!(table.name, "power_plant");
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "region_id", "capacity", "geom"]);

        assert!(table.columns[0].is_primary_key);
        assert!(!table.columns[1].is_primary_key);
        assert!(!table.columns[2].is_primary_key);
        assert_eq!(table.primary_key(), vec!["id"]);

        assert_eq!(table.columns[0].column_type, ColumnType::BigInt);
        assert_eq!(table.columns[2].column_type, ColumnType::DoublePrecision);
        assert_eq!(table.columns[0].comment.as_deref(), Some("Unique id"));
        assert_eq!(table.columns[2].comment, None);

        let fk = table.columns[1].foreign_key.as_ref().unwrap();
        assert_eq!(fk.to_string(), "boundaries.region.id");
        assert_eq!(fk.qualified_table(), "boundaries.region");
        assert!(table.columns[0].foreign_key.is_none());

        assert_eq!(table.foreign_key_count(), 1);
        assert!(table.has_spatial_columns());
    }

    #[test]
    fn test_compile_composite_primary_key() {
        let tables = compile(
            r#"{"resources": [{"name": "timeseries", "schema": {
                "fields": [
                    {"name": "id", "type": "integer"},
                    {"name": "timeindex", "type": "timestamp"},
                    {"name": "value", "type": "float"}
                ],
                "primaryKey": ["id", "timeindex"]
            }}]}"#,
        )
        .unwrap();
        assert_eq!(tables[0].primary_key(), vec!["id", "timeindex"]);
        assert!(!tables[0].columns[2].is_primary_key);
    }

    #[test]
    fn test_unqualified_reference_displays_as_declared() {
        let tables = compile(
            r#"{"resources": [{"name": "plant", "schema": {
                "fields": [{"name": "region", "type": "integer"}],
                "foreignKeys": [{"fields": ["region"], "reference": {"resource": "region", "fields": ["id"]}}]
            }}]}"#,
        )
        .unwrap();
        let fk = tables[0].columns[0].foreign_key.as_ref().unwrap();
        assert_eq!(fk.schema, "public");
        assert!(!fk.schema_declared);
        assert_eq!(fk.to_string(), "region.id");
        assert_eq!(fk.qualified_table(), "public.region");
    }

    #[test]
    fn test_empty_reference_resource_is_self_reference() {
        let tables = compile(
            r#"{"resources": [{"name": "grid.node", "schema": {
                "fields": [{"name": "id", "type": "integer"}, {"name": "parent", "type": "integer"}],
                "primaryKey": "id",
                "foreignKeys": [{"fields": "parent", "reference": {"resource": "", "fields": "id"}}]
            }}]}"#,
        )
        .unwrap();
        let fk = tables[0].columns[1].foreign_key.as_ref().unwrap();
        assert_eq!(fk.to_string(), "grid.node.id");
    }

    #[test]
    fn test_resource_name_with_two_dots_fails() {
        let err = compile(r#"{"resources": [{"name": "a.b.c", "schema": {"fields": []}}]}"#)
            .unwrap_err();
        match err {
            MdSchemaError::Metadata { document, message } => {
                assert_eq!(document, "test.json");
                assert!(message.contains("a.b.c"));
            }
            other => panic!("Expected Metadata error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_reports_field_and_document() {
        let err = compile(
            r#"{"resources": [{"name": "plant", "schema": {
                "fields": [{"name": "id", "type": "integer"}, {"name": "cost", "type": "money"}]
            }}]}"#,
        )
        .unwrap_err();
        match err {
            MdSchemaError::UnknownType {
                document,
                resource,
                field,
                type_name,
            } => {
                assert_eq!(document, "test.json");
                assert_eq!(resource, "plant");
                assert_eq!(field, "cost");
                assert_eq!(type_name, "money");
            }
            other => panic!("Expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolvable_references_fail() {
        let cases = [
            // fk field not declared
            r#"{"resources": [{"name": "t", "schema": {
                "fields": [{"name": "id", "type": "integer"}],
                "foreignKeys": [{"fields": ["other"], "reference": {"resource": "r", "fields": ["id"]}}]
            }}]}"#,
            // fk without local fields
            r#"{"resources": [{"name": "t", "schema": {
                "fields": [{"name": "id", "type": "integer"}],
                "foreignKeys": [{"fields": [], "reference": {"resource": "r", "fields": ["id"]}}]
            }}]}"#,
            // fk without referenced fields
            r#"{"resources": [{"name": "t", "schema": {
                "fields": [{"name": "id", "type": "integer"}],
                "foreignKeys": [{"fields": ["id"], "reference": {"resource": "r", "fields": []}}]
            }}]}"#,
            // malformed referenced resource
            r#"{"resources": [{"name": "t", "schema": {
                "fields": [{"name": "id", "type": "integer"}],
                "foreignKeys": [{"fields": ["id"], "reference": {"resource": "a.b.c", "fields": ["id"]}}]
            }}]}"#,
            // primary key not declared
            r#"{"resources": [{"name": "t", "schema": {
                "fields": [{"name": "id", "type": "integer"}],
                "primaryKey": ["key"]
            }}]}"#,
            // duplicate field
            r#"{"resources": [{"name": "t", "schema": {
                "fields": [{"name": "id", "type": "integer"}, {"name": "id", "type": "text"}]
            }}]}"#,
        ];
        for case in cases {
            let err = compile(case).unwrap_err();
            assert!(
                matches!(err, MdSchemaError::Metadata { .. }),
                "unexpected error {err:?} for {case}"
            );
        }
    }

    #[test]
    fn test_second_foreign_key_on_same_field_fails() {
        let err = compile(
            r#"{"resources": [{"name": "plant", "schema": {
                "fields": [{"name": "id", "type": "integer"}, {"name": "region_id", "type": "integer"}],
                "foreignKeys": [
                    {"fields": ["region_id"], "reference": {"resource": "region", "fields": ["id"]}},
                    {"fields": ["region_id"], "reference": {"resource": "boundaries.region", "fields": ["id"]}}
                ]
            }}]}"#,
        )
        .unwrap_err();
        match err {
            MdSchemaError::Metadata { message, .. } => {
                assert!(message.contains("region_id"));
                assert!(message.contains("plant"));
            }
            other => panic!("Expected Metadata error, got {other:?}"),
        }
    }

    #[test]
    fn test_unqualified_reference_resolves_to_custom_default_schema() {
        let vocab = TypeVocabulary::builtin();
        let doc = parse_metadata_str(
            r#"{"resources": [{"name": "plant", "schema": {
                "fields": [{"name": "region_id", "type": "integer"}],
                "foreignKeys": [{"fields": ["region_id"], "reference": {"resource": "region", "fields": ["id"]}}]
            }}]}"#,
            "inline",
        )
        .unwrap();
        let tables = TableCompiler::new(&vocab, "sandbox").compile(&doc).unwrap();
        let fk = tables[0].columns[0].foreign_key.as_ref().unwrap();
        assert_eq!(fk.schema, "sandbox");
        assert_eq!(fk.qualified_table(), "sandbox.region");
        assert_eq!(fk.to_string(), "region.id");
    }

    #[test]
    fn test_compile_is_deterministic() {
        let json = r#"{"resources": [
            {"name": "a", "schema": {"fields": [{"name": "x", "type": "text"}]}},
            {"name": "s.b", "schema": {"fields": [{"name": "y", "type": "integer"}, {"name": "z", "type": "date"}]}}
        ]}"#;
        let first = compile(json).unwrap();
        let second = compile(json).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].name, "a");
        assert_eq!(first[1].name, "b");
    }
}
