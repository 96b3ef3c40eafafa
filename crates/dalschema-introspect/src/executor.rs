use std::sync::Arc;

use async_trait::async_trait;

use dalschema_core::{ConnectionDescriptor, Error, Result};

/// Anything that can run a SQL batch and hand back its first result set.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Returns the engine identifier (e.g. `mssql`).
    fn engine(&self) -> &'static str;

    /// Execute `sql` against the database described by `connection`.
    async fn execute_query(&self, connection: &ConnectionDescriptor, sql: &str)
    -> Result<ResultSet>;
}

/// A single cell read from a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A cell of a driver type the loader has no mapping for, by type name.
    Unsupported(String),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Tabular query output with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new<C, S>(columns: C) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing trailing cells read as NULL and extra cells are dropped.
    pub fn push_row<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut values: Vec<Value> = values.into_iter().map(Into::into).collect();
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(Row {
            columns: Arc::clone(&self.columns),
            values,
        });
    }

    pub fn with_row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_row(values);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// True when there is nothing to read: no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }
}

/// One result row with case-insensitive access by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Result<&Value> {
        self.columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| Error::MissingColumn(column.to_string()))
    }

    /// Read a text cell. NULL and non-text cells are errors.
    pub fn get_str(&self, column: &str) -> Result<String> {
        match self.get(column)? {
            Value::Text(text) => Ok(text.clone()),
            Value::Null => Err(coercion(column, "text", "value is NULL")),
            other => Err(coercion(column, "text", format!("found {other:?}"))),
        }
    }

    /// Read an integer cell. NULL is an error.
    pub fn get_i32(&self, column: &str) -> Result<i32> {
        match self.get(column)? {
            Value::Null => Err(coercion(column, "integer", "value is NULL")),
            Value::Bool(flag) => Ok(i32::from(*flag)),
            Value::Int(number) => i32::try_from(*number)
                .map_err(|_| coercion(column, "integer", format!("{number} is out of range"))),
            Value::Float(number) => {
                let rounded = number.round_ties_even();
                if rounded.is_finite()
                    && rounded >= f64::from(i32::MIN)
                    && rounded <= f64::from(i32::MAX)
                {
                    Ok(rounded as i32)
                } else {
                    Err(coercion(column, "integer", format!("{number} is out of range")))
                }
            }
            Value::Text(text) => text
                .trim()
                .parse::<i32>()
                .map_err(|err| coercion(column, "integer", err.to_string())),
            Value::Unsupported(type_name) => Err(coercion(
                column,
                "integer",
                format!("unsupported type {type_name}"),
            )),
        }
    }

    /// Read a boolean cell. NULL is an error; numbers are true when non-zero.
    pub fn get_bool(&self, column: &str) -> Result<bool> {
        match self.get(column)? {
            Value::Null => Err(coercion(column, "boolean", "value is NULL")),
            Value::Bool(flag) => Ok(*flag),
            Value::Int(number) => Ok(*number != 0),
            Value::Float(number) => Ok(*number != 0.0),
            Value::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(coercion(
                    column,
                    "boolean",
                    format!("`{other}` is not a boolean"),
                )),
            },
            Value::Unsupported(type_name) => Err(coercion(
                column,
                "boolean",
                format!("unsupported type {type_name}"),
            )),
        }
    }
}

fn coercion(column: &str, expected: &'static str, reason: impl Into<String>) -> Error {
    Error::Coercion {
        column: column.to_string(),
        expected,
        reason: reason.into(),
    }
}
