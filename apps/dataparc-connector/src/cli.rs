use crate::config::ConnectorOptions;
use crate::time::parse_store_timestamp;
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dataparc",
    version,
    about = "Query dataPARC historian tags over SQL Server"
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags. Unset flags fall back to the DATAPARC_* environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    #[arg(long, global = true)]
    pub server: Option<String>,
    #[arg(long, global = true)]
    pub user: Option<String>,
    #[arg(long, global = true)]
    pub password: Option<String>,
    #[arg(long, global = true)]
    pub database: Option<String>,
    #[arg(long, global = true)]
    pub site: Option<String>,
    /// IANA timezone the historian stores local timestamps in.
    #[arg(long, global = true)]
    pub timezone: Option<String>,
    #[arg(long, global = true, default_value_t = false)]
    pub trust_cert: bool,
}

impl ConnectionArgs {
    pub fn into_options(self) -> ConnectorOptions {
        ConnectorOptions {
            server: self.server,
            user: self.user,
            password: self.password,
            site_abbreviation: self.site,
            database: self.database,
            timezone: self.timezone,
            trust_cert: self.trust_cert.then_some(true),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a trivial statement to verify connectivity.
    Check,
    /// Latest value of each tag.
    Latest(TagArgs),
    /// Raw samples between two site-local times.
    Raw(RangeArgs),
    /// Fixed-step aggregated series between two site-local times.
    Interpolated(InterpolatedArgs),
    /// Values at specific site-local times.
    AtTimes(AtTimesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TagArgs {
    #[arg(long, value_delimiter = ',', required = true)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    #[arg(long, value_delimiter = ',', required = true)]
    pub tags: Vec<String>,
    #[arg(long, value_parser = parse_store_timestamp)]
    pub start: NaiveDateTime,
    #[arg(long, value_parser = parse_store_timestamp)]
    pub end: NaiveDateTime,
}

#[derive(Args, Debug, Clone)]
pub struct InterpolatedArgs {
    #[command(flatten)]
    pub range: RangeArgs,
    /// Step size in seconds.
    #[arg(long, allow_hyphen_values = true)]
    pub step: i64,
    #[arg(long, default_value = "AVERAGE")]
    pub aggregate: String,
}

#[derive(Args, Debug, Clone)]
pub struct AtTimesArgs {
    #[arg(long, value_delimiter = ',', required = true)]
    pub tags: Vec<String>,
    #[arg(long, value_delimiter = ',', value_parser = parse_store_timestamp, required = true)]
    pub timestamps: Vec<NaiveDateTime>,
}
