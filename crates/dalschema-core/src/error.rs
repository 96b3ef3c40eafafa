use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type shared across dalschema crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied an argument the loader cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Query execution or connection failure reported by an executor.
    #[error("database error: {0}")]
    Db(String),
    /// A result row lacks a column the loader reads.
    #[error("missing column `{0}` in result set")]
    MissingColumn(String),
    /// A cell could not be converted to the requested type.
    #[error("cannot read column `{column}` as {expected}: {reason}")]
    Coercion {
        column: String,
        expected: &'static str,
        reason: String,
    },
    /// The columns phase returned the same column twice for one table.
    #[error("column {column} already exists in table {table}")]
    DuplicateColumn { table: String, column: String },
    /// The constraints phase returned the same constraint name twice.
    #[error("constraint {0} already exists")]
    DuplicateConstraint(String),
    /// The snapshot violates internal invariants.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by dalschema crates.
pub type Result<T> = std::result::Result<T, Error>;

/// One of the five metadata fetch steps run by the loader, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Columns,
    StoredProcedures,
    Functions,
    Constraints,
    DefaultValues,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Columns,
        Phase::StoredProcedures,
        Phase::Functions,
        Phase::Constraints,
        Phase::DefaultValues,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Columns => "columns",
            Phase::StoredProcedures => "stored_procedures",
            Phase::Functions => "functions",
            Phase::Constraints => "constraints",
            Phase::DefaultValues => "default_values",
        }
    }

    /// Parse a phase from its snake_case name.
    pub fn parse(value: &str) -> Option<Phase> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure captured while running a single load phase.
///
/// The loader records these instead of returning them so that one failing
/// query never hides the results of the others.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, JsonSchema)]
#[error("{phase} phase failed: {message}")]
pub struct PhaseError {
    pub phase: Phase,
    pub message: String,
}

impl PhaseError {
    pub fn new(phase: Phase, source: &Error) -> Self {
        Self {
            phase,
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_phase_names() {
        assert_eq!(Phase::parse("stored_procedures"), Some(Phase::StoredProcedures));
        assert_eq!(Phase::parse(" Default_Values "), Some(Phase::DefaultValues));
        assert_eq!(Phase::parse("indexes"), None);
    }

    #[test]
    fn phase_error_keeps_phase_and_cause() {
        let err = PhaseError::new(
            Phase::Columns,
            &Error::DuplicateColumn {
                table: "Users".to_string(),
                column: "Id".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "columns phase failed: column Id already exists in table Users"
        );
    }
}
