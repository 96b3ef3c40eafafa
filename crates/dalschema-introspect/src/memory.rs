use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use dalschema_core::{ConnectionDescriptor, Error, Result};

use crate::executor::{QueryExecutor, ResultSet};

/// Executor that answers from canned results keyed by exact SQL text.
///
/// Unknown SQL fails with a database error. Every call is recorded so tests
/// can assert which batches ran and in what order.
#[derive(Debug, Default)]
pub struct StaticExecutor {
    responses: HashMap<String, std::result::Result<ResultSet, String>>,
    calls: Mutex<Vec<String>>,
}

impl StaticExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `result`.
    pub fn respond(mut self, sql: impl Into<String>, result: ResultSet) -> Self {
        self.responses.insert(sql.into(), Ok(result));
        self
    }

    /// Fail `sql` with a database error carrying `message`.
    pub fn fail(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.insert(sql.into(), Err(message.into()));
        self
    }

    /// SQL batches executed so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    fn engine(&self) -> &'static str {
        "static"
    }

    async fn execute_query(
        &self,
        _connection: &ConnectionDescriptor,
        sql: &str,
    ) -> Result<ResultSet> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(sql.to_string());
        }

        match self.responses.get(sql) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(Error::Db(message.clone())),
            None => Err(Error::Db("no canned result for query".to_string())),
        }
    }
}
