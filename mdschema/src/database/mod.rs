//! The connection boundary the provisioner works against.
//!
//! Backends translate their driver errors into [`DbError`], classifying
//! "already exists" failures so the provisioner can apply its idempotency
//! rules without knowing the driver.

mod sqlite;
#[cfg(feature = "postgres")]
mod pg;

pub use sqlite::SqliteDatabase;
#[cfg(feature = "postgres")]
pub use pg::PostgresDatabase;

use crate::compiler::TableDefinition;
use crate::sql::Dialect;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The object being created is already there.
    AlreadyExists,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    pub kind: DbErrorKind,
    pub message: String,
}

impl DbError {
    pub fn already_exists(message: impl Into<String>) -> Self {
        DbError {
            kind: DbErrorKind::AlreadyExists,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        DbError {
            kind: DbErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == DbErrorKind::AlreadyExists
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DbError {}

pub type DbResult<T> = std::result::Result<T, DbError>;

/// An open database handle. Used serially by one provisioning run.
pub trait Database {
    fn dialect(&self) -> Dialect;

    /// Run one or more raw SQL statements.
    fn execute_raw(&mut self, sql: &str) -> DbResult<()>;

    fn has_schema(&mut self, schema: &str) -> DbResult<bool>;

    fn create_schema(&mut self, schema: &str) -> DbResult<()>;

    fn has_table(&mut self, schema: &str, table: &str) -> DbResult<bool>;

    /// Create the table with its primary and foreign key constraints.
    fn create_table(&mut self, table: &TableDefinition) -> DbResult<()>;
}

impl<D: Database + ?Sized> Database for Box<D> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute_raw(&mut self, sql: &str) -> DbResult<()> {
        (**self).execute_raw(sql)
    }

    fn has_schema(&mut self, schema: &str) -> DbResult<bool> {
        (**self).has_schema(schema)
    }

    fn create_schema(&mut self, schema: &str) -> DbResult<()> {
        (**self).create_schema(schema)
    }

    fn has_table(&mut self, schema: &str, table: &str) -> DbResult<bool> {
        (**self).has_table(schema, table)
    }

    fn create_table(&mut self, table: &TableDefinition) -> DbResult<()> {
        (**self).create_table(table)
    }
}
