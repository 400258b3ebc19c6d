use crate::database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MdSchemaError {
    #[error("Metadata error in {document}: {message}")]
    Metadata { document: String, message: String },

    #[error("Unknown column type '{type_name}' for field '{resource}.{field}' in {document}")]
    UnknownType {
        document: String,
        resource: String,
        field: String,
        type_name: String,
    },

    #[error("Cannot create extension \"{extension}\" needed for table \"{table}\": {source}")]
    ExtensionCreation {
        extension: String,
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Cannot create schema \"{schema}\": {source}")]
    SchemaCreation {
        schema: String,
        #[source]
        source: DbError,
    },

    #[error("Cannot create table \"{table}\": {source}")]
    TableCreation {
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl MdSchemaError {
    pub(crate) fn metadata(document: &str, message: impl Into<String>) -> Self {
        MdSchemaError::Metadata {
            document: document.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MdSchemaError>;
