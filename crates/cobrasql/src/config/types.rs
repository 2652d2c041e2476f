//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::PrimaryKeyPolicy;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which database to connect to.
    pub database: DatabaseConfig,

    /// Engine behavior.
    #[serde(default)]
    pub engine: EngineOptions,
}

impl Config {
    /// Configuration for an SQLite file, with default engine options.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite(SqliteConfig {
                path: path.into(),
                create_if_missing: true,
            }),
            engine: EngineOptions::default(),
        }
    }

    /// Configuration for a MySQL server, with default engine options.
    pub fn mysql(mysql: MysqlConfig) -> Self {
        Self {
            database: DatabaseConfig::Mysql(mysql),
            engine: EngineOptions::default(),
        }
    }
}

/// Database selection, tagged by `type` in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite(SqliteConfig),
    Mysql(MysqlConfig),
}

impl DatabaseConfig {
    /// Short name of the database kind ("sqlite" or "mysql").
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseConfig::Sqlite(_) => "sqlite",
            DatabaseConfig::Mysql(_) => "mysql",
        }
    }
}

/// Embedded SQLite database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file path.
    pub path: PathBuf,

    /// Create the file if it does not exist (default: true).
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

/// Networked MySQL database.
#[derive(Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,
}

impl MysqlConfig {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_mysql_port(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Debug for MysqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Engine behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Upper bound for the liveness probe before reusing a connection (default: 10).
    #[serde(default = "default_validation_timeout")]
    pub validation_timeout_secs: u64,

    /// Upper bound for opening a connection (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Primary key slot policy for every table the engine resolves.
    #[serde(default)]
    pub primary_key_policy: PrimaryKeyPolicy,
}

impl EngineOptions {
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            validation_timeout_secs: default_validation_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            primary_key_policy: PrimaryKeyPolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_validation_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}
