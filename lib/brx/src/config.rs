//! Configuration types.
//!
//! [`ClientConfig`] tunes the HTTP transport. [`AppConfig`] holds the
//! application startup settings read from the environment.

use std::time::Duration;

use crate::{Error, Result};

/// Knobs of [`HyperClient`](crate::HyperClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Until the response head arrives.
    pub timeout: Duration,
    /// Until the TCP connection is up.
    pub connect_timeout: Duration,
    /// Idle connections kept per host.
    pub pool_idle_per_host: usize,
    /// How long an idle connection is kept.
    pub pool_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl ClientConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl From<&ClientConfig> for ClientConfigBuilder {
    fn from(config: &ClientConfig) -> Self {
        Self {
            timeout: Some(config.timeout),
            connect_timeout: Some(config.connect_timeout),
            pool_idle_per_host: Some(config.pool_idle_per_host),
            pool_idle_timeout: Some(config.pool_idle_timeout),
        }
    }
}

impl ClientConfigBuilder {
    /// See [`ClientConfig::timeout`].
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// See [`ClientConfig::connect_timeout`].
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// See [`ClientConfig::pool_idle_per_host`].
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// See [`ClientConfig::pool_idle_timeout`].
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Unset fields take their default.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}

// ============================================================================
// Application configuration
// ============================================================================

/// Environment variable holding the port the application is served on.
pub const PORT_VAR: &str = "BRX_PORT";
/// Environment variable holding the backend base URL.
pub const BACKEND_API_BASE_URL_VAR: &str = "BRX_BACKEND_API_BASE_URL";
/// Environment variable holding the repository name.
pub const REPO_NAME_VAR: &str = "BRX_REPO_NAME";
/// Environment variable holding the router basepath.
pub const BASEPATH_VAR: &str = "BRX_BASEPATH";

/// Application startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port the application is served on.
    pub port: String,
    /// Base URL of the backend API, if any.
    pub backend_api_base_url: Option<url::Url>,
    /// Repository name, used for deployment paths.
    pub repo_name: Option<String>,
    /// Router basepath, always starting with `/`.
    pub basepath: String,
}

impl AppConfig {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through `lookup`.
    ///
    /// Empty values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `BRX_PORT` is missing or if
    /// `BRX_BACKEND_API_BASE_URL` is not a valid absolute URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = read(PORT_VAR).ok_or_else(|| Error::config(format!("{PORT_VAR} is required")))?;

        let backend_api_base_url = read(BACKEND_API_BASE_URL_VAR)
            .map(|raw| {
                url::Url::parse(&raw).map_err(|err| {
                    Error::config(format!("{BACKEND_API_BASE_URL_VAR} is not a valid URL: {err}"))
                })
            })
            .transpose()?;

        let basepath = read(BASEPATH_VAR).map_or_else(|| "/".to_string(), |raw| normalize_basepath(&raw));

        Ok(Self {
            port,
            backend_api_base_url,
            repo_name: read(REPO_NAME_VAR),
            basepath,
        })
    }

    /// Backend base URL as a string, without a trailing slash.
    ///
    /// Paths are appended to it by plain concatenation.
    #[must_use]
    pub fn api_base(&self) -> String {
        self.backend_api_base_url
            .as_ref()
            .map(|url| url.as_str().trim_end_matches('/').to_string())
            .unwrap_or_default()
    }
}

fn normalize_basepath(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_client_config() {
        let config = ClientConfig::default();
        check!(config.timeout == Duration::from_secs(30));
        check!(config.pool_idle_timeout == Duration::from_secs(90));
        check!(config.pool_idle_per_host == 32);
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_per_host(16)
            .build();

        check!(config.timeout == Duration::from_secs(60));
        check!(config.connect_timeout == Duration::from_secs(5));
        check!(config.pool_idle_per_host == 16);
    }

    #[test]
    fn builder_from_config_keeps_values() {
        let config = ClientConfig::builder().pool_idle_per_host(4).build();
        let copy = ClientConfigBuilder::from(&config).build();
        check!(copy == config);
    }

    #[test]
    fn app_config_full() {
        let config = AppConfig::from_lookup(lookup(&[
            (PORT_VAR, "3000"),
            (BACKEND_API_BASE_URL_VAR, "https://jsonplaceholder.typicode.com/"),
            (REPO_NAME_VAR, "brx-template"),
            (BASEPATH_VAR, "brx-template/"),
        ]))
        .expect("config");

        check!(config.port == "3000");
        check!(config.api_base() == "https://jsonplaceholder.typicode.com");
        check!(config.repo_name.as_deref() == Some("brx-template"));
        check!(config.basepath == "/brx-template");
    }

    #[test]
    fn app_config_minimal() {
        let config = AppConfig::from_lookup(lookup(&[
            (PORT_VAR, "3000"),
            (BACKEND_API_BASE_URL_VAR, ""),
            (REPO_NAME_VAR, ""),
        ]))
        .expect("config");

        check!(config.backend_api_base_url.is_none());
        check!(config.repo_name.is_none());
        check!(config.basepath == "/");
        check!(config.api_base().is_empty());
    }

    #[test]
    fn app_config_requires_port() {
        let result = AppConfig::from_lookup(lookup(&[]));
        let_assert!(Err(Error::Config(message)) = result);
        check!(message == "BRX_PORT is required");
    }

    #[test]
    fn app_config_rejects_invalid_url() {
        let result = AppConfig::from_lookup(lookup(&[
            (PORT_VAR, "3000"),
            (BACKEND_API_BASE_URL_VAR, "not a url"),
        ]));
        let_assert!(Err(Error::Config(message)) = result);
        check!(message.starts_with("BRX_BACKEND_API_BASE_URL is not a valid URL"));
    }
}
