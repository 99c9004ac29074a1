//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    /// Deployment platform; the admin reset endpoint only works on "dev"
    pub platform: String,
    /// Directory served under /app
    pub static_dir: String,

    // Database
    pub database_url: String,

    // Authentication
    pub jwt_secret: String,
    pub webhook_api_key: String,
    /// Maximum access token lifetime in seconds; login may request shorter
    pub access_token_ttl_secs: i64,
    /// Refresh token window in days
    pub refresh_token_ttl_days: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            platform: env::var("PLATFORM").unwrap_or_else(|_| "production".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // Authentication
            jwt_secret: {
                let secret =
                    env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
                // Ensure the JWT signing key is cryptographically strong
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            webhook_api_key: env::var("WEBHOOK_API_KEY")
                .map_err(|_| ConfigError::Missing("WEBHOOK_API_KEY"))?,
            access_token_ttl_secs: {
                let ttl: i64 = env::var("ACCESS_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .map_err(|_| ConfigError::Invalid("ACCESS_TOKEN_TTL_SECS must be an integer"))?;
                if ttl <= 0 {
                    return Err(ConfigError::Invalid(
                        "ACCESS_TOKEN_TTL_SECS must be positive",
                    ));
                }
                ttl
            },
            refresh_token_ttl_days: {
                let days: i64 = env::var("REFRESH_TOKEN_TTL_DAYS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .map_err(|_| ConfigError::Invalid("REFRESH_TOKEN_TTL_DAYS must be an integer"))?;
                if days <= 0 {
                    return Err(ConfigError::Invalid(
                        "REFRESH_TOKEN_TTL_DAYS must be positive",
                    ));
                }
                days
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("Invalid configuration value: {0}")]
    Invalid(&'static str),
}
