//! Database connection pool management
//!
//! Builds a verified PostgreSQL pool from environment-driven settings.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Pool sizing and timeouts for one service
#[derive(Clone)]
pub struct DbConfig {
    /// Used to label log lines
    pub service_name: String,
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Budget for the post-connect `SELECT 1` check
    pub connect_timeout_secs: u64,
    /// How long a caller waits for a free connection
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

// The URL carries credentials
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service", &self.service_name)
            .field("url", &"<redacted>")
            .field("connections", &(self.min_connections..=self.max_connections))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            service_name: String::from("unknown"),
            database_url: String::new(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DbConfig {
    /// Create a DbConfig for `database_url`, applying `DB_*` overrides from
    /// the environment.
    ///
    /// Set-but-unparseable overrides are errors.
    pub fn from_env(service_name: &str, database_url: &str) -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            service_name: service_name.to_string(),
            database_url: database_url.to_string(),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs)?,
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout_secs)?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs)?,
        };

        if config.min_connections > config.max_connections {
            return Err(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                config.min_connections, config.max_connections
            ));
        }

        Ok(config)
    }

    pub fn log_config(&self) {
        info!(
            service = %self.service_name,
            max = self.max_connections,
            min = self.min_connections,
            connect_timeout_secs = self.connect_timeout_secs,
            acquire_timeout_secs = self.acquire_timeout_secs,
            idle_timeout_secs = self.idle_timeout_secs,
            max_lifetime_secs = self.max_lifetime_secs,
            "database pool settings"
        );
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .test_before_acquire(true)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String>
where
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Connect a pool and make sure it can answer `SELECT 1` within
/// `connect_timeout_secs`
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    debug!(?config, "connecting database pool");

    let pool = config.pool_options().connect(&config.database_url).await?;
    let budget = Duration::from_secs(config.connect_timeout_secs);

    let checked = tokio::time::timeout(budget, sqlx::query("SELECT 1").execute(&pool))
        .await
        .unwrap_or_else(|_| {
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("SELECT 1 did not answer within {}s", config.connect_timeout_secs),
            )))
        });

    match checked {
        Ok(_) => {
            info!(service = %config.service_name, "database pool ready");
            Ok(pool)
        }
        Err(e) => {
            error!(service = %config.service_name, error = %e, "database pool check failed");
            pool.close().await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_overrides() {
        for key in [
            "DB_MAX_CONNECTIONS",
            "DB_MIN_CONNECTIONS",
            "DB_CONNECT_TIMEOUT_SECS",
            "DB_ACQUIRE_TIMEOUT_SECS",
            "DB_IDLE_TIMEOUT_SECS",
            "DB_MAX_LIFETIME_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_config_from_env_without_override() {
        clear_overrides();

        let config = DbConfig::from_env("test-service", "postgres://localhost/test").unwrap();

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.database_url, "postgres://localhost/test");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.acquire_timeout_secs, 10);
    }

    #[test]
    #[serial_test::serial]
    fn test_config_env_override() {
        clear_overrides();
        std::env::set_var("DB_MAX_CONNECTIONS", "4");
        std::env::set_var("DB_MIN_CONNECTIONS", "1");

        let config = DbConfig::from_env("test-service", "postgres://localhost/test").unwrap();
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 1);

        clear_overrides();
    }

    #[test]
    #[serial_test::serial]
    fn test_config_rejects_garbage_override() {
        clear_overrides();
        std::env::set_var("DB_MAX_CONNECTIONS", "lots");

        let err = DbConfig::from_env("test-service", "postgres://localhost/test").unwrap_err();
        assert!(err.contains("DB_MAX_CONNECTIONS"));

        clear_overrides();
    }

    #[test]
    #[serial_test::serial]
    fn test_config_rejects_min_above_max() {
        clear_overrides();
        std::env::set_var("DB_MAX_CONNECTIONS", "2");
        std::env::set_var("DB_MIN_CONNECTIONS", "5");

        assert!(DbConfig::from_env("test-service", "postgres://localhost/test").is_err());

        clear_overrides();
    }

    #[test]
    fn test_debug_redacts_url() {
        let config = DbConfig {
            database_url: "postgres://user:hunter2@db/feed".to_string(),
            ..DbConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
