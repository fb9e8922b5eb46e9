use thiserror::Error;

/// Failure of a single statement run through the query executor.
///
/// `Database` is anything the store itself reported (bad statement, login
/// rejected, connection refused by the server). `Unexpected` covers the rest:
/// decoding, environment and driver-internal failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Database error occurred: {0}")]
    Database(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl QueryError {
    pub fn is_database(&self) -> bool {
        matches!(self, QueryError::Database(_))
    }
}

/// What a store driver reports back to the executor.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    Store(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DriverError> for QueryError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Store(message) => QueryError::Database(message),
            DriverError::Other(err) => QueryError::Unexpected(format!("{err:#}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "Database connection information is incomplete (missing {0}). Please check the environment variables."
    )]
    Incomplete(&'static str),
    #[error("unknown timezone identifier {0:?}")]
    InvalidTimezone(String),
}
