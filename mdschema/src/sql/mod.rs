//! DDL rendering for the supported SQL dialects.

use crate::compiler::{ColumnDefinition, TableDefinition};
use crate::types::ColumnType;

/// Extension that provides spatial column types on postgres.
pub const POSTGIS_EXTENSION: &str = "postgis";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Double-quote an identifier, doubling embedded quotes.
    pub fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Single-quote a string literal.
    pub fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// `"schema"."table"`
    pub fn qualified(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
    }

    /// The extension spatial columns need, if the dialect has one.
    pub fn spatial_extension(&self) -> Option<&'static str> {
        match self {
            Dialect::Postgres => Some(POSTGIS_EXTENSION),
            Dialect::Sqlite => None,
        }
    }

    pub fn create_extension_sql(&self, extension: &str) -> String {
        format!("CREATE EXTENSION {}", self.quote_ident(extension))
    }

    pub fn create_schema_sql(&self, schema: &str) -> String {
        format!("CREATE SCHEMA {}", self.quote_ident(schema))
    }

    pub fn type_name(&self, column_type: &ColumnType) -> String {
        match self {
            Dialect::Postgres => postgres_type(column_type),
            Dialect::Sqlite => sqlite_type(column_type).to_string(),
        }
    }

    /// Statements that create `table` inside `schema` (the physical schema
    /// name, which may differ from `table.schema` on sqlite).
    pub fn create_table_statements(&self, table: &TableDefinition, schema: &str) -> Vec<String> {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{} {}", self.quote_ident(&c.name), self.type_name(&c.column_type)))
            .collect();

        let primary_key = table.primary_key();
        if !primary_key.is_empty() {
            let cols: Vec<String> = primary_key.iter().map(|c| self.quote_ident(c)).collect();
            lines.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }

        for column in &table.columns {
            if let Some(fk) = &column.foreign_key {
                let target = match self {
                    Dialect::Postgres => self.qualified(&fk.schema, &fk.table),
                    Dialect::Sqlite if fk.schema == table.schema => self.quote_ident(&fk.table),
                    // sqlite resolves foreign keys inside the child's own database only
                    Dialect::Sqlite => {
                        log::warn!(
                            "Skipping foreign key {}.{} -> {}: \
                             sqlite cannot reference a table in another schema",
                            table.qualified_name(),
                            column.name,
                            fk.qualified_table()
                        );
                        continue;
                    }
                };
                lines.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.quote_ident(&column.name),
                    target,
                    self.quote_ident(&fk.column)
                ));
            }
        }

        let body = match self {
            Dialect::Postgres => lines.join(",\n    "),
            Dialect::Sqlite => sqlite_body(&lines, &table.columns),
        };

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.qualified(schema, &table.name),
            body
        )];

        if *self == Dialect::Postgres {
            for column in &table.columns {
                if let Some(comment) = &column.comment {
                    statements.push(format!(
                        "COMMENT ON COLUMN {}.{} IS {}",
                        self.qualified(schema, &table.name),
                        self.quote_ident(&column.name),
                        self.quote_literal(comment)
                    ));
                }
            }
        }

        statements
    }
}

fn postgres_type(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::SmallInt => "SMALLINT".into(),
        ColumnType::Integer => "INTEGER".into(),
        ColumnType::BigInt => "BIGINT".into(),
        ColumnType::Real => "REAL".into(),
        ColumnType::DoublePrecision => "DOUBLE PRECISION".into(),
        ColumnType::Numeric { precision, scale } => match (precision, scale) {
            (Some(p), Some(s)) => format!("NUMERIC({p}, {s})"),
            (Some(p), None) => format!("NUMERIC({p})"),
            _ => "NUMERIC".into(),
        },
        ColumnType::Text => "TEXT".into(),
        ColumnType::Varchar { length: Some(n) } => format!("VARCHAR({n})"),
        ColumnType::Varchar { length: None } => "VARCHAR".into(),
        ColumnType::Boolean => "BOOLEAN".into(),
        ColumnType::Date => "DATE".into(),
        ColumnType::Time => "TIME".into(),
        ColumnType::Timestamp => "TIMESTAMP".into(),
        ColumnType::TimestampTz => "TIMESTAMP WITH TIME ZONE".into(),
        ColumnType::Interval => "INTERVAL".into(),
        ColumnType::Json => "JSON".into(),
        ColumnType::Jsonb => "JSONB".into(),
        ColumnType::Uuid => "UUID".into(),
        ColumnType::Bytea => "BYTEA".into(),
        ColumnType::Geometry { kind, srid } => spatial_type("geometry", kind, srid),
        ColumnType::Geography { kind, srid } => spatial_type("geography", kind, srid),
        ColumnType::Array(inner) => format!("{}[]", postgres_type(inner)),
    }
}

fn spatial_type(base: &str, kind: &Option<String>, srid: &Option<i32>) -> String {
    match (kind, srid) {
        (Some(kind), Some(srid)) => format!("{base}({kind}, {srid})"),
        (Some(kind), None) => format!("{base}({kind})"),
        (None, Some(srid)) => format!("{base}(GEOMETRY, {srid})"),
        (None, None) => base.to_string(),
    }
}

fn sqlite_type(column_type: &ColumnType) -> &'static str {
    match column_type {
        ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => "INTEGER",
        ColumnType::Real | ColumnType::DoublePrecision => "REAL",
        ColumnType::Numeric { .. } => "NUMERIC",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Date => "DATE",
        ColumnType::Time => "TIME",
        ColumnType::Timestamp | ColumnType::TimestampTz => "TIMESTAMP",
        ColumnType::Json | ColumnType::Jsonb => "JSON",
        ColumnType::Bytea | ColumnType::Geometry { .. } | ColumnType::Geography { .. } => "BLOB",
        ColumnType::Text
        | ColumnType::Varchar { .. }
        | ColumnType::Interval
        | ColumnType::Uuid
        | ColumnType::Array(_) => "TEXT",
    }
}

/// Join definition lines, keeping column descriptions as trailing `--` comments.
/// The comment has to follow the separating comma to stay out of the next line.
fn sqlite_body(lines: &[String], columns: &[ColumnDefinition]) -> String {
    let last = lines.len().saturating_sub(1);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let sep = if i == last { "" } else { "," };
            match columns.get(i).and_then(|c| c.comment.as_deref()) {
                Some(comment) => format!("{line}{sep} -- {}", single_line(comment)),
                None => format!("{line}{sep}"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n    ")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
