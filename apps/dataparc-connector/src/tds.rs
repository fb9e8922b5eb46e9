//! SQL Server driver for the historian's configuration database.
//!
//! tiberius is async-only; the driver owns a single-threaded tokio runtime
//! and blocks on it so the connector surface stays synchronous.

use crate::config::{ConnectorConfig, DEFAULT_PORT};
use crate::error::DriverError;
use crate::executor::{Connection, Driver, Record, SqlParam, SqlValue};
use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;
use std::sync::Arc;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, Query, Row, SqlBrowser};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type TdsClient = Client<Compat<TcpStream>>;

#[derive(Clone)]
pub struct TdsDriver {
    runtime: Arc<Runtime>,
}

impl std::fmt::Debug for TdsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TdsDriver").finish_non_exhaustive()
    }
}

impl TdsDriver {
    pub fn new() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build driver runtime")?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

fn tds_config(config: &ConnectorConfig) -> Config {
    let address = config.address();
    let mut tds = Config::new();
    tds.host(&address.host);
    match address.instance {
        Some(instance) => tds.instance_name(instance),
        None => tds.port(address.port.unwrap_or(DEFAULT_PORT)),
    }
    tds.database(&config.database);
    tds.authentication(AuthMethod::sql_server(&config.user, &config.password));
    tds.application_name("dataparc-connector");
    if config.trust_cert {
        tds.trust_cert();
    }
    tds
}

async fn open_client(config: Config) -> Result<TdsClient, DriverError> {
    let tcp = TcpStream::connect_named(&config).await.map_err(classify)?;
    tcp.set_nodelay(true)
        .context("failed to configure socket")?;
    Client::connect(config, tcp.compat_write())
        .await
        .map_err(classify)
}

impl Driver for TdsDriver {
    type Connection = TdsConnection;

    fn connect(&self, config: &ConnectorConfig) -> Result<TdsConnection, DriverError> {
        let client = self.runtime.block_on(open_client(tds_config(config)))?;
        tracing::trace!(server = %config.server, database = %config.database, "opened historian connection");
        Ok(TdsConnection {
            runtime: self.runtime.clone(),
            client: Some(client),
            timezone: config.timezone,
        })
    }
}

pub struct TdsConnection {
    runtime: Arc<Runtime>,
    client: Option<TdsClient>,
    timezone: Tz,
}

impl Connection for TdsConnection {
    fn query(&mut self, statement: &str, params: &[SqlParam]) -> Result<Vec<Record>, DriverError> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| DriverError::Other(anyhow::anyhow!("connection already closed")))?;

        let mut query = Query::new(statement);
        for param in params {
            match param {
                SqlParam::Text(value) => query.bind(value.clone()),
                SqlParam::Int(value) => query.bind(*value),
                SqlParam::DateTime(value) => query.bind(*value),
            }
        }

        let rows = self.runtime.block_on(async {
            let stream = query.query(client).await.map_err(classify)?;
            stream.into_first_result().await.map_err(classify)
        })?;

        rows.into_iter()
            .map(|row| row_to_record(row, &self.timezone))
            .collect()
    }
}

impl Drop for TdsConnection {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(err) = self.runtime.block_on(client.close()) {
                tracing::debug!(error = %err, "error while closing historian connection");
            }
        }
    }
}

fn classify(err: tiberius::error::Error) -> DriverError {
    use tiberius::error::Error;
    match err {
        Error::Server(token) => DriverError::Store(format!(
            "{} (error {}, state {})",
            token.message(),
            token.code(),
            token.state()
        )),
        Error::Io { kind, message } => {
            DriverError::Store(format!("connection error ({kind:?}): {message}"))
        }
        Error::Tls(message) => DriverError::Store(format!("tls error: {message}")),
        Error::Routing { host, port } => {
            DriverError::Store(format!("server requested routing to {host}:{port}"))
        }
        Error::Protocol(message) => DriverError::Store(format!("protocol error: {message}")),
        other => DriverError::Other(anyhow::Error::new(other)),
    }
}

fn row_to_record(row: Row, timezone: &Tz) -> Result<Record, DriverError> {
    let names: Vec<String> = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    let mut record = Record::new();
    for (name, data) in names.into_iter().zip(row) {
        let value = column_value(&data, timezone)
            .with_context(|| format!("failed to decode column '{name}'"))?;
        record.insert(name, value);
    }
    Ok(record)
}

/// Decodes one column. Offset-bearing datetimes are moved into the site zone
/// so every timestamp leaves the driver as a site-local wall clock.
fn column_value(data: &ColumnData<'static>, timezone: &Tz) -> anyhow::Result<SqlValue> {
    let value = match data {
        ColumnData::Bit(v) => v.map(SqlValue::Bool),
        ColumnData::U8(v) => v.map(|v| SqlValue::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| SqlValue::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| SqlValue::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(SqlValue::Int),
        ColumnData::F32(v) => v.map(|v| SqlValue::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(SqlValue::Float),
        ColumnData::Numeric(v) => v
            .as_ref()
            .map(|n| SqlValue::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))),
        ColumnData::String(v) => v.as_ref().map(|s| SqlValue::Text(s.to_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(SqlValue::DateTime)
        }
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)?
            .map(|dt| SqlValue::DateTime(dt.with_timezone(timezone).naive_local())),
        other => anyhow::bail!("unsupported column type {other:?}"),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}
