use std::net::SocketAddr;

use anyhow::Result;
use common::config::{LoggingConfig, TlsConfig};

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
/// The API is the backend for the HR portal
pub struct AppConfig {
    /// The path to the config file
    pub config_file: Option<String>,

    /// Name of this instance
    pub name: String,

    /// The logging config
    pub logging: LoggingConfig,

    /// HTTP server config
    pub http: HttpConfig,

    /// Database config
    pub database: DatabaseConfig,

    /// Session config
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address for the API
    pub bind_address: SocketAddr,

    /// If we should use TLS for the API server
    pub tls: Option<TlsConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "[::]:8080".parse().expect("failed to parse bind address"),
            tls: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// The database URL to use. The special value "memory" runs on in-memory
    /// stores with seeded development users.
    pub uri: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: "postgres://root@localhost:5432/portal_dev".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session time to live in seconds. Every successful validation slides
    /// the deadline forward by this much.
    pub ttl_seconds: u32,

    /// Name of the session cookie
    pub cookie_name: String,

    /// Mark the session cookie Secure (requires serving over TLS)
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 15 * 60,
            cookie_name: "session".to_string(),
            secure_cookie: false,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds as i64)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: Some("config".to_string()),
            name: "portal-api".to_string(),
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn parse() -> Result<Self> {
        let default_file = if cfg!(test) {
            // Tests must not pick up a developer's local config file.
            None
        } else {
            Self::default().config_file
        };

        let (mut config, config_file) = common::config::parse::<Self>(default_file)?;

        config.config_file = config_file;

        Ok(config)
    }
}
