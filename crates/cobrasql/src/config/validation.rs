//! Configuration validation.

use super::{Config, DatabaseConfig};
use crate::error::{CobraError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    match &config.database {
        DatabaseConfig::Sqlite(sqlite) => {
            if sqlite.path.as_os_str().is_empty() {
                return Err(CobraError::Config("database.path is required".into()));
            }
        }
        DatabaseConfig::Mysql(mysql) => {
            if mysql.host.trim().is_empty() {
                return Err(CobraError::Config("database.host is required".into()));
            }
            if mysql.port == 0 {
                return Err(CobraError::Config("database.port must be at least 1".into()));
            }
            if mysql.database.trim().is_empty() {
                return Err(CobraError::Config("database.database is required".into()));
            }
            if mysql.user.trim().is_empty() {
                return Err(CobraError::Config("database.user is required".into()));
            }
        }
    }

    if config.engine.validation_timeout_secs == 0 {
        return Err(CobraError::Config(
            "engine.validation_timeout_secs must be at least 1".into(),
        ));
    }
    if config.engine.connect_timeout_secs == 0 {
        return Err(CobraError::Config(
            "engine.connect_timeout_secs must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MysqlConfig;

    fn valid_mysql() -> Config {
        Config::mysql(MysqlConfig::new("localhost", "app", "root", "secret"))
    }

    #[test]
    fn test_valid_configs() {
        assert!(validate(&Config::sqlite("data.db")).is_ok());
        assert!(validate(&valid_mysql()).is_ok());
    }

    #[test]
    fn test_empty_sqlite_path() {
        let result = validate(&Config::sqlite(""));
        assert!(matches!(result, Err(CobraError::Config(msg)) if msg.contains("database.path")));
    }

    #[test]
    fn test_missing_mysql_fields() {
        let mut config = valid_mysql();
        if let DatabaseConfig::Mysql(m) = &mut config.database {
            m.host = " ".into();
        }
        assert!(matches!(validate(&config), Err(CobraError::Config(msg)) if msg.contains("host")));

        let mut config = valid_mysql();
        if let DatabaseConfig::Mysql(m) = &mut config.database {
            m.user.clear();
        }
        assert!(matches!(validate(&config), Err(CobraError::Config(msg)) if msg.contains("user")));

        let mut config = valid_mysql();
        if let DatabaseConfig::Mysql(m) = &mut config.database {
            m.port = 0;
        }
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_password_is_allowed() {
        let config = Config::mysql(MysqlConfig::new("localhost", "app", "root", ""));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeouts() {
        let mut config = Config::sqlite("data.db");
        config.engine.validation_timeout_secs = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::sqlite("data.db");
        config.engine.connect_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_mysql_config_debug_redacts_password() {
        let config = MysqlConfig::new("localhost", "app", "root", "super_secret_password_123");
        let debug_output = format!("{:?}", config);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }
}
