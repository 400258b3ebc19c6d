//! Orders compiled tables so that referenced tables tend to be created first.
//!
//! The default strategy sorts by foreign-key count. It is a cheap proxy for a
//! dependency order and can still place a table before the table it
//! references (e.g. two tables with one foreign key each, pointing at each
//! other's successors). `Topological` is the strict alternative.

use crate::compiler::TableDefinition;
use crate::error::{MdSchemaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingStrategy {
    /// Stable sort by ascending number of foreign-key columns.
    #[default]
    #[serde(rename = "fk-count", alias = "foreign-key-count")]
    ForeignKeyCount,
    /// Dependency order over the foreign-key graph; fails on cycles.
    #[serde(rename = "topological")]
    Topological,
}

impl FromStr for OrderingStrategy {
    type Err = MdSchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fk-count" | "foreign-key-count" => Ok(OrderingStrategy::ForeignKeyCount),
            "topological" | "topo" => Ok(OrderingStrategy::Topological),
            other => Err(MdSchemaError::Config(format!(
                "Unknown ordering strategy '{other}'. Supported: fk-count, topological"
            ))),
        }
    }
}

/// Order `tables` with the given strategy.
pub fn order_tables(
    tables: Vec<TableDefinition>,
    strategy: OrderingStrategy,
) -> Result<Vec<TableDefinition>> {
    match strategy {
        OrderingStrategy::ForeignKeyCount => Ok(order_by_foreign_key_count(tables)),
        OrderingStrategy::Topological => order_topologically(tables),
    }
}

/// Stable sort by ascending foreign-key count; equal counts keep input order.
pub fn order_by_foreign_key_count(mut tables: Vec<TableDefinition>) -> Vec<TableDefinition> {
    tables.sort_by_key(TableDefinition::foreign_key_count);
    tables
}

/// Place every table after the tables it references.
///
/// References to tables outside the batch are assumed to exist already and
/// self references are ignored. Among tables whose dependencies are all
/// placed, input order wins.
pub fn order_topologically(tables: Vec<TableDefinition>) -> Result<Vec<TableDefinition>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, table) in tables.iter().enumerate() {
        index.entry(table.qualified_name()).or_insert(i);
    }

    let dependencies: Vec<HashSet<usize>> = tables
        .iter()
        .enumerate()
        .map(|(i, table)| {
            table
                .columns
                .iter()
                .filter_map(|c| c.foreign_key.as_ref())
                .filter_map(|fk| index.get(&fk.qualified_table()).copied())
                .filter(|&dep| dep != i)
                .collect()
        })
        .collect();

    let mut placed = vec![false; tables.len()];
    let mut sequence = Vec::with_capacity(tables.len());
    while sequence.len() < tables.len() {
        let next = (0..tables.len())
            .find(|&i| !placed[i] && dependencies[i].iter().all(|&dep| placed[dep]));

        match next {
            Some(i) => {
                placed[i] = true;
                sequence.push(i);
            }
            None => {
                let cycle: Vec<String> = (0..tables.len())
                    .filter(|&i| !placed[i])
                    .map(|i| tables[i].qualified_name())
                    .collect();
                return Err(MdSchemaError::Metadata {
                    document: "<batch>".to_string(),
                    message: format!(
                        "Circular foreign key dependency between tables: {}",
                        cycle.join(", ")
                    ),
                });
            }
        }
    }

    let mut slots: Vec<Option<TableDefinition>> = tables.into_iter().map(Some).collect();
    Ok(sequence
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect())
}
