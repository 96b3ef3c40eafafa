use dalschema_core::{
    ConnectionDescriptor, DatabaseSnapshot, Error, LoadState, Phase, PhaseError, Result,
};

use crate::executor::{QueryExecutor, ResultSet};
use crate::options::LoaderOptions;

mod client;
mod mapper;
pub mod queries;

pub use client::TiberiusExecutor;
pub use mapper::{MergeStats, remove_wrapping_characters};
pub use queries::build_query;

/// Loads a [`DatabaseSnapshot`] from SQL Server catalog views.
///
/// Each load runs the five phases in order. A failing phase is recorded in
/// the snapshot's error list and the next phase still runs.
#[derive(Debug)]
pub struct SnapshotLoader<E> {
    executor: E,
    options: LoaderOptions,
    snapshot: DatabaseSnapshot,
}

impl<E: QueryExecutor> SnapshotLoader<E> {
    pub fn new(executor: E) -> Self {
        Self::with_options(executor, LoaderOptions::default())
    }

    pub fn with_options(executor: E, options: LoaderOptions) -> Self {
        Self {
            executor,
            options,
            snapshot: DatabaseSnapshot::new(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn snapshot(&self) -> &DatabaseSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> DatabaseSnapshot {
        self.snapshot
    }

    /// Rebuild the snapshot for `database_name`.
    ///
    /// Returns `Ok(true)` when every phase succeeded and `Ok(false)` when at
    /// least one phase recorded an error. The only `Err` is an empty
    /// database name, which is rejected before any query runs.
    pub async fn load_snapshot(
        &mut self,
        database_name: &str,
        connection: ConnectionDescriptor,
    ) -> Result<bool> {
        if database_name.is_empty() {
            return Err(Error::InvalidInput(
                "database name is null or empty".to_string(),
            ));
        }

        self.snapshot.reset();
        self.snapshot.name = database_name.to_string();
        self.snapshot.connection = connection;
        self.snapshot.state = LoadState::Loading;

        tracing::info!(
            event = "snapshot_load_started",
            engine = self.executor.engine(),
            database = %self.snapshot.name,
            server = self.snapshot.connection.server().unwrap_or("")
        );

        for phase in Phase::ALL {
            self.run_phase(phase).await;
        }

        let consistent = self.snapshot.errors.is_empty();
        self.snapshot.state = if consistent {
            LoadState::Consistent
        } else {
            LoadState::PartiallyLoaded
        };

        tracing::info!(
            event = "snapshot_load_finished",
            database = %self.snapshot.name,
            tables = self.snapshot.tables.len(),
            stored_procedures = self.snapshot.stored_procedures.len(),
            functions = self.snapshot.functions.len(),
            constraints = self.snapshot.constraints.len(),
            errors = self.snapshot.errors.len(),
            consistent
        );

        Ok(consistent)
    }

    async fn run_phase(&mut self, phase: Phase) {
        if !self.options.runs(phase) {
            tracing::debug!(event = "phase_skipped", phase = %phase);
            return;
        }

        tracing::debug!(event = "phase_started", phase = %phase);

        let sql = build_query(phase, &self.snapshot.name);
        let outcome = match self
            .executor
            .execute_query(&self.snapshot.connection, &sql)
            .await
        {
            Ok(result) => self.merge(phase, &result).map(|stats| (result.rows().len(), stats)),
            Err(err) => Err(err),
        };

        match outcome {
            Ok((rows, stats)) => tracing::info!(
                event = "phase_finished",
                phase = %phase,
                rows,
                applied = stats.applied,
                skipped = stats.skipped
            ),
            Err(err) => {
                tracing::warn!(event = "phase_failed", phase = %phase, error = %err);
                self.snapshot.errors.push(PhaseError::new(phase, &err));
            }
        }
    }

    fn merge(&mut self, phase: Phase, result: &ResultSet) -> Result<MergeStats> {
        let snapshot = &mut self.snapshot;
        match phase {
            Phase::Columns => mapper::merge_columns(&mut snapshot.tables, result),
            Phase::StoredProcedures => {
                mapper::merge_scripts(&mut snapshot.stored_procedures, result)
            }
            Phase::Functions => mapper::merge_scripts(&mut snapshot.functions, result),
            Phase::Constraints => mapper::merge_constraints(&mut snapshot.constraints, result),
            Phase::DefaultValues => mapper::attach_defaults(&mut snapshot.tables, result),
        }
    }
}

/// Load a snapshot with default options, returning it with the success flag.
pub async fn load_snapshot<E: QueryExecutor>(
    executor: E,
    database_name: &str,
    connection: ConnectionDescriptor,
) -> Result<(DatabaseSnapshot, bool)> {
    let mut loader = SnapshotLoader::new(executor);
    let consistent = loader.load_snapshot(database_name, connection).await?;
    Ok((loader.into_snapshot(), consistent))
}
