use super::{Database, DbError, DbResult};
use crate::compiler::{TableDefinition, DEFAULT_SCHEMA};
use crate::error::Result;
use crate::sql::Dialect;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const MAIN: &str = "main";

/// SQLite backend. The default schema is the main database; every other
/// schema is an attached database (`<dir>/<schema>.db` next to the main
/// file, or a fresh in-memory database for in-memory connections).
pub struct SqliteDatabase {
    conn: Connection,
    default_schema: String,
    schema_dir: Option<PathBuf>,
}

impl SqliteDatabase {
    /// Open or create the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let schema_dir = path
            .parent()
            .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
            .map(Path::to_path_buf);
        Self::init(conn, schema_dir)
    }

    /// Open an in-memory database (for testing and dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, schema_dir: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(SqliteDatabase {
            conn,
            default_schema: DEFAULT_SCHEMA.to_string(),
            schema_dir,
        })
    }

    /// Use `schema` instead of `public` as the name that maps to `main`.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn physical_schema<'a>(&'a self, schema: &'a str) -> &'a str {
        if schema == self.default_schema {
            MAIN
        } else {
            schema
        }
    }

    fn attached_databases(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA database_list")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }
}

impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute_raw(&mut self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn has_schema(&mut self, schema: &str) -> DbResult<bool> {
        let physical = self.physical_schema(schema);
        if physical == MAIN {
            return Ok(true);
        }
        Ok(self.attached_databases()?.iter().any(|name| name == physical))
    }

    fn create_schema(&mut self, schema: &str) -> DbResult<()> {
        let physical = self.physical_schema(schema);
        if physical == MAIN {
            return Err(DbError::already_exists(format!(
                "schema {schema} is the main database"
            )));
        }

        let file = match &self.schema_dir {
            Some(dir) => dir.join(format!("{physical}.db")).to_string_lossy().to_string(),
            None => ":memory:".to_string(),
        };
        self.conn
            .execute("ATTACH DATABASE ?1 AS ?2", params![file, physical])?;
        Ok(())
    }

    fn has_table(&mut self, schema: &str, table: &str) -> DbResult<bool> {
        let physical = self.physical_schema(schema);
        let sql = format!(
            "SELECT 1 FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
            Dialect::Sqlite.quote_ident(physical)
        );
        let found = self
            .conn
            .query_row(&sql, params![table], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn create_table(&mut self, table: &TableDefinition) -> DbResult<()> {
        let physical = self.physical_schema(&table.schema);
        let statements = Dialect::Sqlite.create_table_statements(table, physical);
        self.conn.execute_batch(&statements.join(";\n"))?;
        Ok(())
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if message.contains("already exists") || message.contains("already in use") {
            DbError::already_exists(message)
        } else {
            DbError::other(message)
        }
    }
}
