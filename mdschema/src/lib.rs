pub mod compiler;
pub mod config;
pub mod credentials;
pub mod database;
pub mod error;
pub mod metadata;
pub mod ordering;
pub mod pipeline;
pub mod provision;
pub mod sql;
pub mod types;

pub use compiler::{ColumnDefinition, TableColumnRef, TableCompiler, TableDefinition};
pub use config::{ConnectionSettings, Engine, ProvisionOptions};
pub use database::{Database, DbError, DbErrorKind, SqliteDatabase};
pub use error::{MdSchemaError, Result};
pub use metadata::MetadataDocument;
pub use ordering::OrderingStrategy;
pub use provision::{provision, ProvisionReport};
pub use types::{ColumnType, TypeVocabulary};
