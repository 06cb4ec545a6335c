//! Warehouse connection configuration.

use crate::error::{DataError, Result};
use std::time::Duration;

/// Environment variable holding the warehouse endpoint URL.
pub const ENV_URL: &str = "HANOVER_WAREHOUSE_URL";
/// Environment variable holding the account user name.
pub const ENV_USER: &str = "HANOVER_WAREHOUSE_USER";
/// Environment variable holding the account access token.
pub const ENV_TOKEN: &str = "HANOVER_WAREHOUSE_TOKEN";

/// Default minimum interval between warehouse requests.
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(200);

/// Connection parameters for the research-data warehouse.
///
/// Credentials come from the environment, never from source or config
/// files checked into a repository.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Endpoint URL accepting query requests
    pub url: String,
    /// Account user name
    pub user: String,
    /// Account access token
    pub token: String,
    /// Minimum interval between requests
    pub rate_limit: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl WarehouseConfig {
    /// Build a configuration from `HANOVER_WAREHOUSE_*` environment
    /// variables.
    pub fn from_env() -> Result<Self> {
        let read = |var: &str| {
            std::env::var(var).map_err(|_| DataError::MissingEnv(var.to_string()))
        };
        Ok(Self {
            url: read(ENV_URL)?,
            user: read(ENV_USER)?,
            token: read(ENV_TOKEN)?,
            rate_limit: DEFAULT_RATE_LIMIT,
            timeout: Duration::from_secs(120),
        })
    }

    /// Build a configuration with explicit values (used by tests and by
    /// callers that manage credentials themselves).
    pub fn new(url: impl Into<String>, user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            token: token.into(),
            rate_limit: DEFAULT_RATE_LIMIT,
            timeout: Duration::from_secs(120),
        }
    }

    /// Override the request rate limit.
    #[must_use]
    pub const fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config() {
        let config = WarehouseConfig::new("https://example.test/query", "researcher", "secret")
            .with_rate_limit(Duration::from_millis(50));
        assert_eq!(config.url, "https://example.test/query");
        assert_eq!(config.rate_limit, Duration::from_millis(50));
    }

    #[test]
    fn from_env_requires_all_variables() {
        // Only meaningful when the variables are absent, which is the
        // normal test environment.
        if std::env::var(ENV_URL).is_err() {
            assert!(matches!(
                WarehouseConfig::from_env(),
                Err(DataError::MissingEnv(_))
            ));
        }
    }
}
