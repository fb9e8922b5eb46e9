use crate::error::ConfigError;
use chrono_tz::Tz;
use std::fmt;

pub const DEFAULT_DATABASE: &str = "ctc_config";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_PORT: u16 = 1433;

pub const ENV_SERVER: &str = "DATAPARC_SERVER";
pub const ENV_USERNAME: &str = "DATAPARC_USERNAME";
pub const ENV_PASSWORD: &str = "DATAPARC_PASSWORD";
pub const ENV_SITE_ABBREVIATION: &str = "DATAPARC_SITE_ABBREVIATION";
pub const ENV_DATABASE: &str = "DATAPARC_DATABASE";
pub const ENV_TIMEZONE: &str = "DATAPARC_TIMEZONE";
pub const ENV_TRUST_CERT: &str = "DATAPARC_TRUST_CERT";

/// Explicit connector arguments. Anything left `None` falls back to the
/// environment and then to the documented default.
#[derive(Clone, Default)]
pub struct ConnectorOptions {
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub site_abbreviation: Option<String>,
    pub database: Option<String>,
    pub timezone: Option<String>,
    pub trust_cert: Option<bool>,
}

impl fmt::Debug for ConnectorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorOptions")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("site_abbreviation", &self.site_abbreviation)
            .field("database", &self.database)
            .field("timezone", &self.timezone)
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

/// Where the store lives on the network, parsed from the server string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub instance: Option<String>,
}

impl ServerAddress {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some((host, instance)) = raw.split_once('\\') {
            return Self {
                host: host.to_string(),
                port: None,
                instance: Some(instance.to_string()).filter(|v| !v.is_empty()),
            };
        }
        if let Some((host, port)) = raw.rsplit_once(',').or_else(|| raw.rsplit_once(':')) {
            if let Ok(port) = port.trim().parse::<u16>() {
                return Self {
                    host: host.trim().to_string(),
                    port: Some(port),
                    instance: None,
                };
            }
        }
        Self {
            host: raw.to_string(),
            port: None,
            instance: None,
        }
    }
}

/// Resolved, immutable connection settings for one connector.
#[derive(Clone)]
pub struct ConnectorConfig {
    pub server: String,
    pub user: String,
    pub password: String,
    pub site_abbreviation: Option<String>,
    pub database: String,
    pub timezone: Tz,
    pub trust_cert: bool,
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("site_abbreviation", &self.site_abbreviation)
            .field("database", &self.database)
            .field("timezone", &self.timezone)
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

impl ConnectorConfig {
    pub fn resolve(options: ConnectorOptions) -> Result<Self, ConfigError> {
        Self::resolve_with(options, env_optional_string)
    }

    /// Resolution against an arbitrary variable source instead of the
    /// process environment.
    pub fn resolve_with<F>(options: ConnectorOptions, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<String>, key: &str| {
            explicit
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .or_else(|| {
                    lookup(key)
                        .map(|value| value.trim().to_string())
                        .filter(|value| !value.is_empty())
                })
        };

        let server = pick(options.server, ENV_SERVER);
        let user = pick(options.user, ENV_USERNAME);
        let password = pick(options.password, ENV_PASSWORD);
        let site_abbreviation = pick(options.site_abbreviation, ENV_SITE_ABBREVIATION);
        let database =
            pick(options.database, ENV_DATABASE).unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let timezone_name =
            pick(options.timezone, ENV_TIMEZONE).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let trust_cert = options
            .trust_cert
            .or_else(|| {
                let raw = lookup(ENV_TRUST_CERT)?;
                let parsed = parse_bool(&raw);
                if parsed.is_none() {
                    tracing::warn!(
                        key = ENV_TRUST_CERT,
                        value = %raw,
                        "unrecognised boolean; certificate will be validated"
                    );
                }
                parsed
            })
            .unwrap_or(false);

        let server = server.ok_or(ConfigError::Incomplete("server"))?;
        let user = user.ok_or(ConfigError::Incomplete("user"))?;
        let password = password.ok_or(ConfigError::Incomplete("password"))?;
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(timezone_name.clone()))?;

        Ok(Self {
            server,
            user,
            password,
            site_abbreviation,
            database,
            timezone,
            trust_cert,
        })
    }

    pub fn address(&self) -> ServerAddress {
        ServerAddress::parse(&self.server)
    }
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
