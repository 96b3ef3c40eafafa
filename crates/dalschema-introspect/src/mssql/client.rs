use async_trait::async_trait;
use tiberius::{Client, ColumnData, Config};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use dalschema_core::{ConnectionDescriptor, Error, Result};

use crate::executor::{QueryExecutor, ResultSet, Value};

/// Executor backed by a TDS connection through `tiberius`.
///
/// Opens a fresh connection for every query; pooling is left to callers
/// that need it.
#[derive(Debug, Clone, Default)]
pub struct TiberiusExecutor {
    trust_server_certificate: bool,
}

impl TiberiusExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the server certificate without validation.
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    async fn connect(
        &self,
        connection: &ConnectionDescriptor,
    ) -> Result<Client<tokio_util::compat::Compat<TcpStream>>> {
        let mut config = Config::from_ado_string(connection.as_str()).map_err(db_error)?;
        if self.trust_server_certificate {
            config.trust_cert();
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|err| Error::Db(format!("connecting to {}: {err}", config.get_addr())))?;
        tcp.set_nodelay(true)
            .map_err(|err| Error::Db(err.to_string()))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(db_error)
    }
}

#[async_trait]
impl QueryExecutor for TiberiusExecutor {
    fn engine(&self) -> &'static str {
        "mssql"
    }

    async fn execute_query(
        &self,
        connection: &ConnectionDescriptor,
        sql: &str,
    ) -> Result<ResultSet> {
        let mut client = self.connect(connection).await?;
        let rows = client
            .simple_query(sql)
            .await
            .map_err(db_error)?
            .into_first_result()
            .await
            .map_err(db_error)?;

        let Some(first) = rows.first() else {
            return Ok(ResultSet::default());
        };
        let mut result = ResultSet::new(first.columns().iter().map(|column| column.name()));

        for row in rows {
            result.push_row(row.into_iter().map(cell_value));
        }

        Ok(result)
    }
}

fn db_error(err: tiberius::error::Error) -> Error {
    Error::Db(err.to_string())
}

// Only the text, integer, and bit cells are read by the loader. Other types
// keep their variant name so reading them reports what came back.
fn cell_value(data: ColumnData<'static>) -> Value {
    let value = match data {
        ColumnData::U8(value) => value.map(|value| Value::Int(value.into())),
        ColumnData::I16(value) => value.map(|value| Value::Int(value.into())),
        ColumnData::I32(value) => value.map(|value| Value::Int(value.into())),
        ColumnData::I64(value) => value.map(Value::Int),
        ColumnData::F32(value) => value.map(|value| Value::Float(value.into())),
        ColumnData::F64(value) => value.map(Value::Float),
        ColumnData::Bit(value) => value.map(Value::Bool),
        ColumnData::String(value) => value.map(|value| Value::Text(value.into_owned())),
        ColumnData::Numeric(value) => value.map(|value| {
            Value::Float(value.value() as f64 / 10f64.powi(i32::from(value.scale())))
        }),
        other => Some(Value::Unsupported(variant_name(&other))),
    };
    value.unwrap_or(Value::Null)
}

fn variant_name(data: &ColumnData<'static>) -> String {
    let debug = format!("{data:?}");
    debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_string()
}
