//! Core contracts and helpers for dalschema.
//!
//! This crate defines the snapshot types produced by the SQL Server loader,
//! the shared error types, connection descriptor handling, and snapshot
//! validation.

pub mod connection;
pub mod error;
pub mod snapshot;
pub mod validation;

pub use connection::{ConnectionDescriptor, DEFAULT_CONNECTION_STRING};
pub use error::{Error, Phase, PhaseError, Result};
pub use snapshot::{Column, Constraint, DatabaseSnapshot, LoadState, Script, Table};
pub use validation::validate_snapshot;
