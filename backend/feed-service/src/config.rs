/// Configuration management for Feed Service
///
/// Everything is read from environment variables (a `.env` file is loaded
/// first when present).
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Main application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    /// `None` selects the in-memory store
    pub database_url: Option<String>,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_secs: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiry_secs", &self.jwt_expiry_secs)
            .finish()
    }
}

/// Posts, uploads and realtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub images_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub posts_per_page: i64,
    pub realtime_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app", &self.app)
            .field("cors", &self.cors)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("auth", &self.auth)
            .field("feed", &self.feed)
            .field("logging", &self.logging)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let jwt_secret = std::env::var("JWT_SECRET")
            .or_else(|_| std::env::var("JWT_TOKEN"))
            .map_err(|_| "JWT_SECRET (or JWT_TOKEN) must be set".to_string())?;
        if jwt_secret.trim().is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if production && jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(format!(
                "JWT_SECRET must be at least {} bytes in production",
                MIN_PRODUCTION_SECRET_LEN
            ));
        }

        let allowed_origins =
            std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if production && allowed_origins.trim() == "*" {
            return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
        }

        let posts_per_page = parse_env_or_default("POSTS_PER_PAGE", 2i64)?;
        if posts_per_page < 1 {
            return Err("POSTS_PER_PAGE must be at least 1".to_string());
        }

        let format = match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Ok(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Ok(v) => return Err(format!("LOG_FORMAT must be 'json' or 'pretty', got '{}'", v)),
            Err(_) if production => LogFormat::Json,
            Err(_) => LogFormat::Pretty,
        };

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("SERVER_PORT", 8080u16)?,
                workers: parse_env_or_default("SERVER_WORKERS", num_cpus::get())?,
            },
            cors: CorsConfig { allowed_origins },
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            auth: AuthConfig {
                jwt_secret,
                jwt_expiry_secs: parse_env_or_default(
                    "JWT_EXPIRY_SECS",
                    crypto_core::jwt::DEFAULT_EXPIRY_SECS,
                )?,
            },
            feed: FeedConfig {
                images_dir: std::env::var("IMAGES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("images")),
                max_upload_bytes: parse_env_or_default("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
                posts_per_page,
                realtime_capacity: parse_env_or_default("REALTIME_CHANNEL_CAPACITY", 256usize)?,
            },
            logging: LoggingConfig { format },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "JWT_SECRET",
        "JWT_TOKEN",
        "JWT_EXPIRY_SECS",
        "CORS_ALLOWED_ORIGINS",
        "POSTS_PER_PAGE",
        "SERVER_PORT",
        "LOG_FORMAT",
        "DATABASE_URL",
        "IMAGES_DIR",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        std::env::set_var("JWT_SECRET", "dev-secret");

        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 8080);
        assert_eq!(config.feed.posts_per_page, 2);
        assert_eq!(config.auth.jwt_expiry_secs, 3600);
        assert_eq!(config.feed.images_dir, PathBuf::from("images"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.cors.allowed_origins, "*");
        assert_eq!(config.bind_address(), "0.0.0.0:8080");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_legacy_secret_name() {
        clear_env();
        std::env::set_var("JWT_TOKEN", "legacy-secret");

        let config = Config::from_env().unwrap();
        assert_eq!(config.auth.jwt_secret, "legacy-secret");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_secret_is_error() {
        clear_env();
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_error() {
        clear_env();
        std::env::set_var("JWT_SECRET", "dev-secret");
        std::env::set_var("SERVER_PORT", "eighty");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("SERVER_PORT"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_rules() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("JWT_SECRET", "short");
        assert!(Config::from_env().is_err());

        std::env::set_var("JWT_SECRET", "x".repeat(48));
        assert!(Config::from_env().is_err(), "wildcard CORS rejected");

        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://feed.example.com");
        let config = Config::from_env().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_debug_redacts_secrets() {
        clear_env();
        std::env::set_var("JWT_SECRET", "super-secret-value");
        std::env::set_var("DATABASE_URL", "postgres://u:p@db/feed");

        let rendered = format!("{:?}", Config::from_env().unwrap());
        assert!(!rendered.contains("super-secret-value"));
        assert!(!rendered.contains("u:p@db"));

        clear_env();
    }
}
