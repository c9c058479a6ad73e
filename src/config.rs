use crate::connection::config::ConnectionConfig;
use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: usize,
    pub db_connect_timeout: Duration,
    pub db_query_timeout: Duration,
    pub data_dir: Option<PathBuf>,
    pub page_size: u32,
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "APP_PORT", 3000u16)?;

        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "projectdesk://localhost:7070/projects".to_string());

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10usize)?;
        let db_connect_timeout =
            Duration::from_millis(parse_or(&lookup, "DB_CONNECT_TIMEOUT_MS", 5_000u64)?);
        let db_query_timeout =
            Duration::from_millis(parse_or(&lookup, "DB_QUERY_TIMEOUT_MS", 10_000u64)?);

        let data_dir = lookup("DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let page_size = parse_or(&lookup, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(anyhow!("PAGE_SIZE must be between 1 and {}", MAX_PAGE_SIZE));
        }

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            db_connect_timeout,
            db_query_timeout,
            data_dir,
            page_size,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let mut config = ConnectionConfig::from_url(&self.database_url)
            .map_err(|e| anyhow!(e))
            .context("DATABASE_URL is not a valid projectdesk URL")?
            .max_connections(self.db_max_connections)
            .connect_timeout(self.db_connect_timeout)
            .query_timeout(self.db_query_timeout);
        if let Some(dir) = &self.data_dir {
            config = config.data_dir(dir);
        }
        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid {}", key, std::any::type_name::<T>())),
        _ => Ok(default),
    }
}
