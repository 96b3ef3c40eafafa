use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::connection::ConnectionDescriptor;
use crate::error::PhaseError;

/// In-memory description of one SQL Server database at load time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseSnapshot {
    /// Database name passed to the loader.
    pub name: String,
    /// Connection the snapshot was loaded from, serialized redacted.
    #[schemars(with = "String")]
    pub connection: ConnectionDescriptor,
    /// Where the snapshot is in its load lifecycle.
    pub state: LoadState,
    /// User tables keyed by table name.
    pub tables: BTreeMap<String, Table>,
    /// Stored procedures keyed by name.
    pub stored_procedures: BTreeMap<String, Script>,
    /// Scalar functions keyed by name, kept apart from procedures.
    pub functions: BTreeMap<String, Script>,
    /// Foreign-key edges keyed by constraint name.
    pub constraints: BTreeMap<String, Constraint>,
    /// Errors captured during loading, in the order they occurred.
    pub errors: Vec<PhaseError>,
}

/// Load lifecycle of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Empty,
    Loading,
    /// Every phase ran without error.
    Consistent,
    /// At least one phase recorded an error; the data is incomplete.
    PartiallyLoaded,
}

/// A user table and its supported columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: BTreeMap<String, Column>,
}

/// Column metadata for a user table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub schema: String,
    /// Name of the owning table; look it up through [`DatabaseSnapshot::tables`].
    pub table: String,
    pub name: String,
    pub data_type: String,
    /// Storage length in bytes (`-1` for `max` types).
    pub length: i32,
    pub precision: i32,
    pub scale: i32,
    pub is_nullable: bool,
    pub is_pk: bool,
    pub is_identity: bool,
    pub ordinal: i32,
    /// Default expression with its wrapping parentheses and quotes removed.
    pub default_value: Option<String>,
}

/// A stored procedure or function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    pub name: String,
    pub body: String,
}

/// A single directed foreign-key edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Constraint {
    pub name: String,
    pub fk_table: String,
    pub fk_column: String,
    pub pk_table: String,
    pub pk_column: String,
}

impl DatabaseSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every collection and restore the empty state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Bracket-quoted database name, e.g. `[Northwind]`.
    pub fn formatted_name(&self) -> String {
        format!("[{}]", self.name)
    }

    pub fn is_consistent(&self) -> bool {
        self.state == LoadState::Consistent
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&Column> {
        self.tables
            .get(table)
            .and_then(|table| table.columns.get(column))
    }

    /// Foreign-key edges where `table` is either the referencing or referenced side.
    pub fn constraints_for_table<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints
            .values()
            .filter(move |constraint| constraint.fk_table == table || constraint.pk_table == table)
    }
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Columns sorted by ordinal position.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.values().collect();
        columns.sort_by_key(|column| column.ordinal);
        columns
    }

    pub fn primary_key(&self) -> Vec<&Column> {
        self.ordered_columns()
            .into_iter()
            .filter(|column| column.is_pk)
            .collect()
    }
}
