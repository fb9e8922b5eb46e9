use crate::config::{ConnectorConfig, ConnectorOptions};
use crate::error::DriverError;
use crate::executor::{Connection, Driver, Record, SqlParam, SqlValue};
use chrono::NaiveDateTime;
use std::sync::{Arc, Mutex};

pub fn test_config() -> ConnectorConfig {
    test_config_in("UTC")
}

pub fn test_config_in(timezone: &str) -> ConnectorConfig {
    let options = ConnectorOptions {
        server: Some("localhost".to_string()),
        user: Some("test_user".to_string()),
        password: Some("test_password".to_string()),
        site_abbreviation: Some("TEST".to_string()),
        timezone: Some(timezone.to_string()),
        ..Default::default()
    };
    ConnectorConfig::resolve_with(options, |_| None).expect("test config")
}

pub fn tag_record(tag: &str, timestamp: NaiveDateTime, value: f64, quality: i64) -> Record {
    Record::new()
        .with("tagName", SqlValue::Text(tag.to_string()))
        .with("timestamp", SqlValue::DateTime(timestamp))
        .with("value", SqlValue::Float(value))
        .with("quality", SqlValue::Int(quality))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub statement: String,
    pub params: Vec<SqlParam>,
}

#[derive(Debug, Clone)]
enum Failure {
    Store(String),
    Other(String),
}

impl Failure {
    fn from_driver_error(err: DriverError) -> Self {
        match err {
            DriverError::Store(message) => Failure::Store(message),
            DriverError::Other(err) => Failure::Other(format!("{err:#}")),
        }
    }

    fn to_driver_error(&self) -> DriverError {
        match self {
            Failure::Store(message) => DriverError::Store(message.clone()),
            Failure::Other(message) => DriverError::Other(anyhow::anyhow!(message.clone())),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    rows: Vec<Record>,
    connect_failure: Option<Failure>,
    query_failure: Option<Failure>,
    connects: usize,
    releases: usize,
    calls: Vec<RecordedCall>,
}

/// In-memory driver that records every connect, query and release.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn returning(rows: Vec<Record>) -> Self {
        let driver = Self::default();
        driver.state.lock().expect("mock state").rows = rows;
        driver
    }

    pub fn failing_connect(err: DriverError) -> Self {
        let driver = Self::default();
        driver.state.lock().expect("mock state").connect_failure =
            Some(Failure::from_driver_error(err));
        driver
    }

    pub fn failing_query(err: DriverError) -> Self {
        let driver = Self::default();
        driver.state.lock().expect("mock state").query_failure =
            Some(Failure::from_driver_error(err));
        driver
    }

    pub fn connects(&self) -> usize {
        self.state.lock().expect("mock state").connects
    }

    pub fn releases(&self) -> usize {
        self.state.lock().expect("mock state").releases
    }

    pub fn queries(&self) -> usize {
        self.state.lock().expect("mock state").calls.len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().expect("mock state").calls.clone()
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;

    fn connect(&self, _config: &ConnectorConfig) -> Result<MockConnection, DriverError> {
        let mut state = self.state.lock().expect("mock state");
        if let Some(failure) = &state.connect_failure {
            return Err(failure.to_driver_error());
        }
        state.connects += 1;
        Ok(MockConnection {
            state: self.state.clone(),
        })
    }
}

pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl Connection for MockConnection {
    fn query(&mut self, statement: &str, params: &[SqlParam]) -> Result<Vec<Record>, DriverError> {
        let mut state = self.state.lock().expect("mock state");
        state.calls.push(RecordedCall {
            statement: statement.to_string(),
            params: params.to_vec(),
        });
        if let Some(failure) = &state.query_failure {
            return Err(failure.to_driver_error());
        }
        Ok(state.rows.clone())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.releases += 1;
        }
    }
}
