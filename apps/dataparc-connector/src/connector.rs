
use crate::config::{ConnectorConfig, ConnectorOptions};
use crate::error::QueryError;
use crate::executor::{Driver, QueryExecutor, Record, SqlParam, TagRow};
use crate::measurement::TagMeasurement;
use crate::response::{create_response, Response, STATUS_OK};
use crate::tds::TdsDriver;
use crate::time::{attach_timezone, format_store_timestamp, StoreTime};
use anyhow::Context;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

const CHECK_CONNECTION_SQL: &str = "SELECT 1";
const READ_LAST_TAGS_SQL: &str =
    "SELECT tagName, timestamp, value, quality FROM ctc_fn_PARCdata_ReadLastTags(@P1, ',')";
const READ_RAW_TAGS_SQL: &str =
    "SELECT tagName, timestamp, value, quality FROM ctc_fn_PARCdata_ReadRawTags(@P1, @P2, @P3, @P4, ',')";
const READ_INTERPOLATED_TAGS_SQL: &str = "SELECT tagName, timestamp, value, quality FROM ctc_fn_PARCdata_ReadInterpolatedTags(@P1, @P2, @P3, @P4, @P5, ',')";
const READ_AT_TIME_TAGS_SQL: &str =
    "SELECT tagName, timestamp, value, quality FROM ctc_fn_PARCdata_ReadAtTimeTags(@P1, @P2, ',')";

const TAG_DELIMITER: &str = ",";
/// Selects raw-sample retrieval in the raw-tags function.
const RAW_MODE: i64 = 1;

const EMPTY_TAGS: &str = "Tag list cannot be empty";
const EMPTY_TIMESTAMPS: &str = "Timestamps list cannot be empty";
const INVERTED_RANGE: &str = "Start time must be before end time";
const NON_POSITIVE_STEP: &str = "Step size must be greater than zero";

/// Latest reading per tag.
pub type LatestValues = BTreeMap<String, TagMeasurement>;
/// Readings per tag in the order the store returned them.
pub type TagSeries = BTreeMap<String, Vec<TagMeasurement>>;

/// Read-only client for the historian's stored tag functions.
///
/// Every operation opens its own connection, so one connector can be shared
/// across threads. No operation returns an error or panics; outcomes are
/// reported through [`Response`].
#[derive(Debug)]
pub struct Connector<D = TdsDriver> {
    executor: QueryExecutor<D>,
}

impl Connector<TdsDriver> {
    /// Resolves configuration (explicit options, then environment, then
    /// defaults) and fails when server, user or password are missing.
    pub fn new(options: ConnectorOptions) -> anyhow::Result<Self> {
        let config = ConnectorConfig::resolve(options)?;
        let driver = TdsDriver::new().context("failed to initialise SQL Server driver")?;
        Ok(Self::with_driver(config, driver))
    }
}

impl<D: Driver> Connector<D> {
    pub fn with_driver(config: ConnectorConfig, driver: D) -> Self {
        tracing::debug!(
            server = %config.server,
            database = %config.database,
            site = config.site_abbreviation.as_deref().unwrap_or("-"),
            timezone = %config.timezone,
            "historian connector configured"
        );
        Self {
            executor: QueryExecutor::new(config, driver),
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        self.executor.config()
    }

    pub fn site_abbreviation(&self) -> Option<&str> {
        self.config().site_abbreviation.as_deref()
    }

    pub fn check_connection(&self) -> Response<()> {
        match self.executor.execute_query(CHECK_CONNECTION_SQL, &[]) {
            Ok(_) => create_response(STATUS_OK, None, "Connection successful"),
            Err(err @ QueryError::Database(_)) => {
                Response::internal(format!("Database connection failed: {err}"))
            }
            Err(err @ QueryError::Unexpected(_)) => {
                Response::internal(format!("Unexpected error during connection check: {err}"))
            }
        }
    }

    pub fn fetch_latest_values<S: AsRef<str>>(&self, tags: &[S]) -> Response<LatestValues> {
        if tags.is_empty() {
            return Response::bad_request(EMPTY_TAGS);
        }

        let params = [SqlParam::Text(join_tags(tags))];
        let outcome = self
            .executor
            .execute_query(READ_LAST_TAGS_SQL, &params)
            .and_then(|rows| self.latest_by_tag(&rows));
        finish(
            outcome,
            "fetching latest values",
            "Successfully fetched latest values",
        )
    }

    pub fn fetch_raw_data<S, T>(&self, tags: &[S], start_time: T, end_time: T) -> Response<TagSeries>
    where
        S: AsRef<str>,
        T: StoreTime,
    {
        if tags.is_empty() {
            return Response::bad_request(EMPTY_TAGS);
        }
        let (start, end) = match self.store_range(&start_time, &end_time) {
            Some(range) => range,
            None => return Response::bad_request(INVERTED_RANGE),
        };

        let params = [
            SqlParam::Text(join_tags(tags)),
            SqlParam::DateTime(start),
            SqlParam::DateTime(end),
            SqlParam::Int(RAW_MODE),
        ];
        let outcome = self
            .executor
            .execute_query(READ_RAW_TAGS_SQL, &params)
            .and_then(|rows| self.series_by_tag(&rows));
        finish(outcome, "fetching raw data", "Successfully fetched raw data")
    }

    /// `aggregate` is passed to the store untouched; the store decides which
    /// aggregation names are legal.
    pub fn fetch_interpolated_data<S, T>(
        &self,
        tags: &[S],
        start_time: T,
        end_time: T,
        step_seconds: i64,
        aggregate: &str,
    ) -> Response<TagSeries>
    where
        S: AsRef<str>,
        T: StoreTime,
    {
        if tags.is_empty() {
            return Response::bad_request(EMPTY_TAGS);
        }
        let (start, end) = match self.store_range(&start_time, &end_time) {
            Some(range) => range,
            None => return Response::bad_request(INVERTED_RANGE),
        };
        if step_seconds <= 0 {
            return Response::bad_request(NON_POSITIVE_STEP);
        }

        let params = [
            SqlParam::Text(join_tags(tags)),
            SqlParam::DateTime(start),
            SqlParam::DateTime(end),
            SqlParam::Text(aggregate.to_string()),
            SqlParam::Int(step_seconds),
        ];
        let outcome = self
            .executor
            .execute_query(READ_INTERPOLATED_TAGS_SQL, &params)
            .and_then(|rows| self.series_by_tag(&rows));
        finish(
            outcome,
            "fetching interpolated data",
            "Successfully fetched interpolated data",
        )
    }

    pub fn fetch_data_at_times<S, T>(&self, tags: &[S], timestamps: &[T]) -> Response<TagSeries>
    where
        S: AsRef<str>,
        T: StoreTime,
    {
        if tags.is_empty() {
            return Response::bad_request(EMPTY_TAGS);
        }
        if timestamps.is_empty() {
            return Response::bad_request(EMPTY_TIMESTAMPS);
        }

        let timezone = self.config().timezone;
        let timestamp_string = timestamps
            .iter()
            .map(|ts| format_store_timestamp(&ts.to_store_local(&timezone)))
            .collect::<Vec<_>>()
            .join(TAG_DELIMITER);
        let params = [
            SqlParam::Text(join_tags(tags)),
            SqlParam::Text(timestamp_string),
        ];
        let outcome = self
            .executor
            .execute_query(READ_AT_TIME_TAGS_SQL, &params)
            .and_then(|rows| self.series_by_tag(&rows));
        finish(
            outcome,
            "fetching data at specified times",
            "Successfully fetched data at specified times",
        )
    }

    /// Orders the bounds as instants, then yields the site-local wall clocks
    /// the store is queried with.
    fn store_range<T: StoreTime>(&self, start: &T, end: &T) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let timezone = self.config().timezone;
        if start.to_utc(&timezone) >= end.to_utc(&timezone) {
            return None;
        }
        Some((start.to_store_local(&timezone), end.to_store_local(&timezone)))
    }

    fn measurement(&self, record: &Record) -> Result<(String, TagMeasurement), QueryError> {
        let row = TagRow::try_from(record)?;
        let timestamp = attach_timezone(&self.config().timezone, row.timestamp);
        Ok((
            row.tag_name,
            TagMeasurement::new(row.value, timestamp, row.quality),
        ))
    }

    fn latest_by_tag(&self, rows: &[Record]) -> Result<LatestValues, QueryError> {
        let mut latest = LatestValues::new();
        for record in rows {
            let (tag, measurement) = self.measurement(record)?;
            latest.insert(tag, measurement);
        }
        Ok(latest)
    }

    fn series_by_tag(&self, rows: &[Record]) -> Result<TagSeries, QueryError> {
        let mut series = TagSeries::new();
        for record in rows {
            let (tag, measurement) = self.measurement(record)?;
            series.entry(tag).or_default().push(measurement);
        }
        Ok(series)
    }
}

fn join_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|tag| tag.as_ref())
        .collect::<Vec<_>>()
        .join(TAG_DELIMITER)
}

fn finish<T>(outcome: Result<T, QueryError>, action: &str, success: &str) -> Response<T> {
    match outcome {
        Ok(result) => Response::ok(result, success),
        Err(err @ QueryError::Database(_)) => {
            Response::internal(format!("Database error while {action}: {err}"))
        }
        Err(err @ QueryError::Unexpected(_)) => {
            Response::internal(format!("Unexpected error while {action}: {err}"))
        }
    }
}
