//! Read-only client for a dataPARC historian.
//!
//! Tag data is read through the historian's stored query functions on SQL
//! Server. Every [`Connector`] operation returns a [`Response`] envelope.

pub mod cli;
pub mod config;
pub mod connector;
pub mod error;
pub mod executor;
pub mod measurement;
pub mod response;
pub mod tds;
pub mod time;

#[cfg(test)]
pub mod test_support;

pub use config::{ConnectorConfig, ConnectorOptions};
pub use connector::{Connector, LatestValues, TagSeries};
pub use error::{ConfigError, DriverError, QueryError};
pub use measurement::{DataTag, Quality, TagMeasurement};
pub use response::Response;
