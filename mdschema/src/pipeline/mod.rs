//! Compile -> order -> provision, over a list of metadata files.

use crate::compiler::{TableCompiler, TableDefinition};
use crate::config::ProvisionOptions;
use crate::database::Database;
use crate::error::Result;
use crate::metadata::parse_metadata;
use crate::ordering::order_tables;
use crate::provision::{provision, ProvisionReport};
use crate::sql::Dialect;
use std::path::PathBuf;

/// Compile each file in order and flatten the tables.
pub fn compile_files(paths: &[PathBuf], compiler: &TableCompiler) -> Result<Vec<TableDefinition>> {
    let mut tables = Vec::new();
    for path in paths {
        let compiled = parse_metadata(path).and_then(|doc| compiler.compile(&doc));
        match compiled {
            Ok(mut file_tables) => {
                log::debug!("{}: {} table(s)", path.display(), file_tables.len());
                tables.append(&mut file_tables);
            }
            Err(e) => {
                log::error!(
                    "Could not generate tables from metadata file \"{}\"",
                    path.display()
                );
                return Err(e);
            }
        }
    }
    Ok(tables)
}

/// Compile and order, without touching any database.
pub fn plan(paths: &[PathBuf], options: &ProvisionOptions) -> Result<Vec<TableDefinition>> {
    let compiler = TableCompiler::new(&options.vocabulary, options.default_schema.as_str());
    let tables = compile_files(paths, &compiler)?;
    order_tables(tables, options.ordering)
}

/// Compile, order and provision. Every metadata problem surfaces before the
/// first database call.
pub fn run<D: Database + ?Sized>(
    db: &mut D,
    paths: &[PathBuf],
    options: &ProvisionOptions,
) -> Result<ProvisionReport> {
    let tables = plan(paths, options)?;
    log::info!("Provisioning {} table(s)", tables.len());
    provision(db, &tables)
}

/// The DDL for every table in `tables`, in order. The database is not
/// consulted, so tables that already exist are rendered too.
pub fn render_plan(tables: &[TableDefinition], dialect: Dialect) -> String {
    let mut out = String::new();
    let mut spatial_done = false;
    for table in tables {
        if table.has_spatial_columns() && !spatial_done {
            if let Some(extension) = dialect.spatial_extension() {
                out.push_str(&format!("{};\n\n", dialect.create_extension_sql(extension)));
            }
            spatial_done = true;
        }
        for statement in dialect.create_table_statements(table, &table.schema) {
            out.push_str(&statement);
            out.push_str(";\n");
        }
        out.push('\n');
    }
    out
}
