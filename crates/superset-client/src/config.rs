//! Client configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Environment variable holding the server URL.
pub const ENV_HOST: &str = "SUPERSET_HOST";
/// Environment variable holding the login name.
pub const ENV_USERNAME: &str = "SUPERSET_USERNAME";
/// Environment variable holding the password.
pub const ENV_PASSWORD: &str = "SUPERSET_PASSWORD";
/// Environment variable holding the auth provider.
pub const ENV_PROVIDER: &str = "SUPERSET_PROVIDER";

/// Path of the REST API below the host.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
/// Auth provider of database-backed accounts.
pub const DEFAULT_PROVIDER: &str = "db";
/// Default page size of list queries.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Connection settings for a Superset server.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server URL, e.g. `http://localhost:8088`.
    pub host: String,
    /// API path prefix.
    pub api_prefix: String,
    /// Login name.
    pub username: String,
    password: String,
    /// Auth provider (`db`, `ldap`).
    pub provider: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Page size used by list queries.
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8088".to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            username: String::new(),
            password: String::new(),
            provider: DEFAULT_PROVIDER.to_string(),
            timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("api_prefix", &self.api_prefix)
            .field("username", &self.username)
            .field("password", &self.password())
            .field("provider", &self.provider)
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration for `host` with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Read the configuration from `SUPERSET_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from a variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            config.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            config.password = password;
        }
        if let Some(provider) = lookup(ENV_PROVIDER) {
            config.provider = provider;
        }
        config
    }

    /// Set the login credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the auth provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the API path prefix.
    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the list page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// The password, masked.
    #[must_use]
    pub fn password(&self) -> String {
        "*".repeat(self.password.chars().count())
    }

    pub(crate) fn raw_password(&self) -> &str {
        &self.password
    }

    /// Base URL of the REST API.
    #[must_use]
    pub fn api_url(&self) -> String {
        join_url(&self.host, &self.api_prefix)
    }

    /// Check the configuration before connecting.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an empty or non-HTTP host, a
    /// missing username, or a zero page size.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("host cannot be empty".to_string()));
        }
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "host must start with http:// or https://: {}",
                self.host
            )));
        }
        if self.username.trim().is_empty() {
            return Err(ClientError::Config("username cannot be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(ClientError::Config("page size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Join URL segments with single slashes.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if base.is_empty() {
        path.to_string()
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.provider, "db");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("https://bi.example.com/")
            .with_credentials("admin", "s3cret")
            .with_provider("ldap")
            .with_timeout(Duration::from_secs(5))
            .with_page_size(25);

        assert_eq!(config.username, "admin");
        assert_eq!(config.raw_password(), "s3cret");
        assert_eq!(config.provider, "ldap");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.api_url(), "https://bi.example.com/api/v1");
        config.validate().unwrap();
    }

    #[test]
    fn test_password_is_masked() {
        let config = ClientConfig::new("http://x").with_credentials("admin", "hunter2");
        assert_eq!(config.password(), "*******");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("*******"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_HOST, "http://superset:8088"),
            (ENV_USERNAME, "bot"),
            (ENV_PASSWORD, "pw"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.host, "http://superset:8088");
        assert_eq!(config.username, "bot");
        assert_eq!(config.raw_password(), "pw");
        assert_eq!(config.provider, DEFAULT_PROVIDER);
    }

    #[test_case("", "admin", 100 ; "empty host")]
    #[test_case("localhost:8088", "admin", 100 ; "missing scheme")]
    #[test_case("http://localhost", " ", 100 ; "blank username")]
    #[test_case("http://localhost", "admin", 0 ; "zero page size")]
    fn test_validate_rejects(host: &str, username: &str, page_size: u32) {
        let config = ClientConfig::new(host)
            .with_credentials(username, "pw")
            .with_page_size(page_size);
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
    }

    #[test_case("http://h", "/api/v1", "http://h/api/v1" ; "leading slash")]
    #[test_case("http://h/", "api/v1/", "http://h/api/v1" ; "trailing slashes")]
    #[test_case("http://h/api/v1", "/chart/", "http://h/api/v1/chart" ; "endpoint")]
    #[test_case("http://h/api/v1", "", "http://h/api/v1" ; "empty path")]
    fn test_join_url(base: &str, path: &str, expected: &str) {
        assert_eq!(join_url(base, path), expected);
    }
}
