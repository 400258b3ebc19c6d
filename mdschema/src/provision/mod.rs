//! Applies ordered table definitions to a live database.
//!
//! Tables are handled strictly in the given order. Extension and schema
//! creation treat "already exists" as success; table creation never does,
//! since the existence check right before it should have caught that case.
//! The first fatal error ends the run and nothing already created is undone.

use crate::compiler::TableDefinition;
use crate::database::Database;
use crate::error::{MdSchemaError, Result};

/// What a provisioning run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Tables created, as `schema.table`, in creation order.
    pub created_tables: Vec<String>,
    /// Tables that already existed and were left alone.
    pub skipped_tables: Vec<String>,
    pub created_schemas: Vec<String>,
}

impl ProvisionReport {
    pub fn is_noop(&self) -> bool {
        self.created_tables.is_empty() && self.created_schemas.is_empty()
    }
}

pub struct Provisioner<'a, D: Database + ?Sized> {
    db: &'a mut D,
    spatial_ready: bool,
    report: ProvisionReport,
}

impl<'a, D: Database + ?Sized> Provisioner<'a, D> {
    pub fn new(db: &'a mut D) -> Self {
        Provisioner {
            db,
            spatial_ready: false,
            report: ProvisionReport::default(),
        }
    }

    /// Provision every table in order, stopping at the first failure.
    pub fn run(mut self, tables: &[TableDefinition]) -> Result<ProvisionReport> {
        for table in tables {
            self.provision_table(table)?;
        }
        Ok(self.report)
    }

    fn provision_table(&mut self, table: &TableDefinition) -> Result<()> {
        if table.has_spatial_columns() {
            self.ensure_spatial_extension(table)?;
        }

        self.ensure_schema(&table.schema)?;

        if self.db.has_table(&table.schema, &table.name)? {
            log::debug!("Table {} already exists, skipping", table.qualified_name());
            self.report.skipped_tables.push(table.qualified_name());
            return Ok(());
        }

        match self.db.create_table(table) {
            Ok(()) => {
                log::info!("Created table {}", table.qualified_name());
                self.report.created_tables.push(table.qualified_name());
                Ok(())
            }
            Err(e) => {
                if e.is_already_exists() {
                    log::error!("Table \"{}\" already exists", table.qualified_name());
                } else {
                    log::error!("Cannot create table \"{}\": {e}", table.qualified_name());
                }
                Err(MdSchemaError::TableCreation {
                    table: table.qualified_name(),
                    source: e,
                })
            }
        }
    }

    fn ensure_spatial_extension(&mut self, table: &TableDefinition) -> Result<()> {
        if self.spatial_ready {
            return Ok(());
        }
        let dialect = self.db.dialect();
        let Some(extension) = dialect.spatial_extension() else {
            self.spatial_ready = true;
            return Ok(());
        };

        match self.db.execute_raw(&dialect.create_extension_sql(extension)) {
            Ok(()) => log::info!("Created extension {extension}"),
            Err(e) if e.is_already_exists() => {
                log::debug!("Extension {extension} already exists");
            }
            Err(e) => {
                log::error!(
                    "Cannot create extension \"{extension}\" needed for table \"{}\"",
                    table.qualified_name()
                );
                return Err(MdSchemaError::ExtensionCreation {
                    extension: extension.to_string(),
                    table: table.qualified_name(),
                    source: e,
                });
            }
        }
        self.spatial_ready = true;
        Ok(())
    }

    fn ensure_schema(&mut self, schema: &str) -> Result<()> {
        if self.db.has_schema(schema)? {
            return Ok(());
        }
        match self.db.create_schema(schema) {
            Ok(()) => {
                log::info!("Created schema {schema}");
                self.report.created_schemas.push(schema.to_string());
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                log::debug!("Schema {schema} already exists");
                Ok(())
            }
            Err(e) => Err(MdSchemaError::SchemaCreation {
                schema: schema.to_string(),
                source: e,
            }),
        }
    }
}

/// Provision `tables` in order against `db`.
pub fn provision<D: Database + ?Sized>(
    db: &mut D,
    tables: &[TableDefinition],
) -> Result<ProvisionReport> {
    Provisioner::new(db).run(tables)
}
