//! SQL Server schema snapshot loading.

pub mod executor;
pub mod memory;
pub mod mssql;
pub mod options;

pub use executor::{QueryExecutor, ResultSet, Row, Value};
pub use memory::StaticExecutor;
pub use mssql::{SnapshotLoader, TiberiusExecutor, build_query, load_snapshot};
pub use options::LoaderOptions;

pub use dalschema_core::{ConnectionDescriptor, DatabaseSnapshot, Phase, PhaseError};
