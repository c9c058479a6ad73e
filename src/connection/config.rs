use crate::storage::DurabilityMode;
use std::path::PathBuf;
use std::time::Duration;

const URL_SCHEME: &str = "projectdesk://";
const DEFAULT_PORT: u16 = 7070;

/// Store connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Store host. The embedded store ignores it; it is kept so the URL
    /// form round-trips.
    pub host: String,

    pub port: u16,

    /// Data set name. A persistent store lives in `data_dir/<database>`.
    pub database: String,

    /// Maximum wait for a pooled connection
    pub connect_timeout: Duration,

    /// Upper bound for a single store operation
    pub query_timeout: Duration,

    /// Maximum number of connections in pool
    pub max_connections: usize,

    /// Connections opened eagerly when the pool starts
    pub min_connections: usize,

    pub idle_timeout: Option<Duration>,

    pub max_lifetime: Option<Duration>,

    /// Root directory for persistent data sets. `None` keeps the store in
    /// memory.
    pub data_dir: Option<PathBuf>,

    pub durability: DurabilityMode,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: "projects".to_string(),
            connect_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(10),
            max_connections: 10,
            min_connections: 1,
            idle_timeout: Some(Duration::from_secs(600)), // 10 minutes
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
            data_dir: None,
            durability: DurabilityMode::default(),
        }
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: usize) -> Self {
        self.min_connections = min;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Parse from connection string
    ///
    /// Format: `projectdesk://host[:port]/database`
    ///
    /// ```
    /// # use projectdesk::ConnectionConfig;
    /// let config = ConnectionConfig::from_url("projectdesk://localhost:7070/projects").unwrap();
    /// assert_eq!(config.database, "projects");
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| format!("URL must start with '{}'", URL_SCHEME))?;

        let (authority, database) = rest
            .split_once('/')
            .ok_or_else(|| "Invalid host/database format".to_string())?;
        if authority.is_empty() || database.is_empty() || database.contains('/') {
            return Err("Invalid host/database format".to_string());
        }

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => (
                host,
                port.parse().map_err(|_| format!("Invalid port '{}'", port))?,
            ),
            None => (authority, DEFAULT_PORT),
        };

        Ok(Self::new().host(host).port(port).database(database))
    }

    /// Directory holding this data set's log and snapshot.
    pub fn store_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(&self.database))
    }

    pub fn to_url(&self) -> String {
        format!("{}{}:{}/{}", URL_SCHEME, self.host, self.port, self.database)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.is_empty() {
            return Err("database cannot be empty".to_string());
        }

        let valid_name = self
            .database
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(format!(
                "database '{}' may only contain letters, digits, '_' and '-'",
                self.database
            ));
        }

        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }

        if self.min_connections > self.max_connections {
            return Err("min_connections cannot exceed max_connections".to_string());
        }

        if self.connect_timeout.is_zero() || self.query_timeout.is_zero() {
            return Err("timeouts must be greater than zero".to_string());
        }

        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}
