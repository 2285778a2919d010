use axum::http::{HeaderName, HeaderValue};
use std::{env, net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Where entities are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown backend '{}', expected 'dynamodb' or 'memory'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub table_prefix: String,
    pub store_timeout: Duration,
    pub auth_user_header: HeaderName,
    /// Empty means any origin.
    pub allowed_origins: Vec<HeaderValue>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let invalid = |key: &str, e: String| ConfigError::InvalidVar(key.into(), e);

        let bind_address = SocketAddr::from_str(&var_or("BIND_ADDRESS", "0.0.0.0:3000"))
            .map_err(|e| invalid("BIND_ADDRESS", e.to_string()))?;

        let store_backend = var_or("STORE_BACKEND", "dynamodb")
            .parse::<StoreBackend>()
            .map_err(|e| invalid("STORE_BACKEND", e))?;

        let aws_region = var_or("AWS_DEFAULT_REGION", "ca-central-1");
        let localstack_endpoint = lookup("AWS_ENDPOINT_URL").filter(|url| !url.trim().is_empty());
        let table_prefix = var_or("TABLE_PREFIX", "memeplace_");

        let timeout_ms: u64 = var_or("STORE_TIMEOUT_MS", "5000")
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| invalid("STORE_TIMEOUT_MS", e.to_string()))?;
        if timeout_ms == 0 {
            return Err(invalid("STORE_TIMEOUT_MS", "must be greater than zero".into()));
        }

        let auth_user_header = HeaderName::from_str(var_or("AUTH_USER_HEADER", "x-user-id").trim())
            .map_err(|e| invalid("AUTH_USER_HEADER", e.to_string()))?;

        let allowed_origins = var_or("ALLOWED_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| HeaderValue::from_str(origin).map_err(|e| invalid("ALLOWED_ORIGINS", e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            bind_address,
            store_backend,
            aws_region,
            localstack_endpoint,
            table_prefix,
            store_timeout: Duration::from_millis(timeout_ms),
            auth_user_header,
            allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.store_backend, StoreBackend::DynamoDb);
        assert_eq!(config.aws_region, "ca-central-1");
        assert_eq!(config.table_prefix, "memeplace_");
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.auth_user_header.as_str(), "x-user-id");
        assert!(config.allowed_origins.is_empty());
        assert!(config.localstack_endpoint.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("STORE_BACKEND", "Memory"),
            ("STORE_TIMEOUT_MS", "250"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("AWS_ENDPOINT_URL", "http://localhost:4566"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.localstack_endpoint.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(load(&[("BIND_ADDRESS", "nowhere")]), Err(ConfigError::InvalidVar(..))));
        assert!(matches!(load(&[("STORE_BACKEND", "postgres")]), Err(ConfigError::InvalidVar(..))));
        assert!(matches!(load(&[("STORE_TIMEOUT_MS", "0")]), Err(ConfigError::InvalidVar(..))));
    }
}
