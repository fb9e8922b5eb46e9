use crate::config::ConnectorConfig;
use crate::error::{DriverError, QueryError};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::time::Instant;

/// A positional statement parameter. Bound by the driver, never spliced
/// into the statement text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    DateTime(NaiveDateTime),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(value: NaiveDateTime) -> Self {
        SqlParam::DateTime(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

/// One result row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, SqlValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.fields.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.fields.get(column)
    }

    fn field(&self, column: &str) -> Result<&SqlValue, QueryError> {
        self.get(column)
            .ok_or_else(|| QueryError::Unexpected(format!("missing field '{column}' in result row")))
    }

    pub fn text(&self, column: &str) -> Result<String, QueryError> {
        match self.field(column)? {
            SqlValue::Text(value) => Ok(value.clone()),
            other => Err(mistyped(column, "text", other)),
        }
    }

    pub fn float(&self, column: &str) -> Result<f64, QueryError> {
        match self.field(column)? {
            SqlValue::Float(value) => Ok(*value),
            SqlValue::Int(value) => Ok(*value as f64),
            other => Err(mistyped(column, "number", other)),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64, QueryError> {
        match self.field(column)? {
            SqlValue::Int(value) => Ok(*value),
            SqlValue::Float(value) if value.fract() == 0.0 => Ok(*value as i64),
            other => Err(mistyped(column, "integer", other)),
        }
    }

    pub fn datetime(&self, column: &str) -> Result<NaiveDateTime, QueryError> {
        match self.field(column)? {
            SqlValue::DateTime(value) => Ok(*value),
            other => Err(mistyped(column, "datetime", other)),
        }
    }
}

fn mistyped(column: &str, expected: &str, got: &SqlValue) -> QueryError {
    QueryError::Unexpected(format!(
        "field '{column}' expected {expected}, got {got:?}"
    ))
}

/// The fixed row shape every tag-reading stored function returns.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRow {
    pub tag_name: String,
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub quality: i32,
}

impl TryFrom<&Record> for TagRow {
    type Error = QueryError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        let quality = record.int("quality")?;
        let quality = i32::try_from(quality)
            .map_err(|_| QueryError::Unexpected(format!("quality {quality} out of range")))?;
        Ok(Self {
            tag_name: record.text("tagName")?,
            timestamp: record.datetime("timestamp")?,
            value: record.float("value")?,
            quality,
        })
    }
}

/// Opens connections to the store.
pub trait Driver: Send + Sync {
    type Connection: Connection;

    fn connect(&self, config: &ConnectorConfig) -> Result<Self::Connection, DriverError>;
}

/// An open store session. Dropping it releases the connection.
pub trait Connection {
    fn query(&mut self, statement: &str, params: &[SqlParam]) -> Result<Vec<Record>, DriverError>;
}

/// Runs one statement per call on a fresh connection.
#[derive(Debug)]
pub struct QueryExecutor<D> {
    config: ConnectorConfig,
    driver: D,
}

impl<D: Driver> QueryExecutor<D> {
    pub fn new(config: ConnectorConfig, driver: D) -> Self {
        Self { config, driver }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn execute_query(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Record>, QueryError> {
        let started = Instant::now();
        let result = self.run(statement, params);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(rows) => tracing::debug!(
                statement,
                params = params.len(),
                rows = rows.len(),
                elapsed_ms,
                "historian query complete"
            ),
            Err(err) => tracing::warn!(
                statement,
                params = params.len(),
                elapsed_ms,
                error = %err,
                "historian query failed"
            ),
        }
        result
    }

    fn run(&self, statement: &str, params: &[SqlParam]) -> Result<Vec<Record>, QueryError> {
        let mut connection = self.driver.connect(&self.config)?;
        let rows = connection.query(statement, params)?;
        drop(connection);
        Ok(rows)
    }
}
