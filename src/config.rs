//! Process configuration read from the environment.

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const POSTGRES_VARS: [&str; 5] = [
    "POSTGRES_HOST",
    "POSTGRES_PORT",
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_DB",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub database: PgConnectOptions,
    pub data_url: String,
    pub host: String,
    pub port: u16,
    pub sync_interval: Option<Duration>,
    pub query_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Split out from [`Config::from_env`]
    /// so tests don't have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL") {
            Some(url) => PgConnectOptions::from_str(&url).context("Invalid DATABASE_URL")?,
            None => postgres_options(&lookup)?,
        };
        let data_url = lookup("DATA_URL").context("DATA_URL must be set")?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("Invalid PORT")?;
        let sync_interval = match lookup("SYNC_INTERVAL_SECS") {
            Some(secs) => {
                let secs = secs
                    .parse::<u64>()
                    .context("Invalid SYNC_INTERVAL_SECS")?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };
        let query_dir = lookup("QUERY_DIR").map(PathBuf::from);

        Ok(Self {
            database,
            data_url,
            host,
            port,
            sync_interval,
            query_dir,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection options from the `POSTGRES_*` parts. Each part is passed
/// through as-is, so credentials need no URL escaping.
fn postgres_options<F>(lookup: &F) -> Result<PgConnectOptions>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = Vec::with_capacity(POSTGRES_VARS.len());
    let mut missing = Vec::new();
    for key in POSTGRES_VARS {
        match lookup(key) {
            Some(value) => values.push(value),
            None => missing.push(key),
        }
    }
    if !missing.is_empty() {
        anyhow::bail!(
            "DATABASE_URL must be set, or all of: {} (missing {})",
            POSTGRES_VARS.join(", "),
            missing.join(", ")
        );
    }

    let [host, port, user, pass, name] = values.as_slice() else {
        anyhow::bail!("Expected {} Postgres settings", POSTGRES_VARS.len());
    };
    let port = port.parse::<u16>().context("Invalid POSTGRES_PORT")?;

    Ok(PgConnectOptions::new()
        .host(host)
        .port(port)
        .username(user)
        .password(pass)
        .database(name)
        .ssl_mode(PgSslMode::Disable))
}
