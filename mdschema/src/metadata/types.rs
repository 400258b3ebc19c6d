use serde::{Deserialize, Serialize};

/// One parsed metadata file: a data-package style document listing resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Where the document came from (file path or caller label). Not part of the JSON.
    #[serde(skip)]
    pub source: String,
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// A metadata-described table. `name` is either `table` or `schema.table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    #[serde(default)]
    pub schema: TableSchemaDescriptor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchemaDescriptor {
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub primary_key: FieldList,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

/// Definition of a single field in a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    pub fields: FieldList,
    pub reference: ForeignKeyReference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    /// Referenced resource name; empty means the resource itself.
    #[serde(default)]
    pub resource: String,
    pub fields: FieldList,
}

/// Field names given either as a list or as a single string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldList {
    Single(String),
    Multiple(Vec<String>),
}

impl Default for FieldList {
    fn default() -> Self {
        FieldList::Multiple(Vec::new())
    }
}

impl FieldList {
    pub fn first(&self) -> Option<&str> {
        match self {
            FieldList::Single(name) => Some(name.as_str()),
            FieldList::Multiple(names) => names.first().map(String::as_str),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            FieldList::Single(name) => std::slice::from_ref(name),
            FieldList::Multiple(names) => names,
        };
        names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        match self {
            FieldList::Single(_) => 1,
            FieldList::Multiple(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
