//! Runtime configuration from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `ORDER_QUEUE_BACKEND` | `volatile` | `volatile`, `local` or `remote` |
//! | `ORDER_QUEUE_STORAGE_DIR` | `.order-queue` | slot directory of the local backend |
//! | `ORDER_QUEUE_POLL_MS` | `250` | how often slots or the remote collection are re-read |
//! | `ORDER_QUEUE_REMOTE_URL` | (required for `remote`) | base URL of the realtime database |
//! | `ORDER_QUEUE_REMOTE_AUTH` | none | token sent as the `auth` query parameter |
//! | `ORDER_QUEUE_REMOTE_TIMEOUT_MS` | `5000` | per-request timeout |
//! | `ORDER_QUEUE_REMOTE_ATTEMPTS` | `3` | tries per request, including the first |
//! | `ORDER_QUEUE_REMOTE_BACKOFF_MS` | `200` | wait before the first retry, doubled after |
//! | `ORDER_QUEUE_CHANNEL_CAPACITY` | `32` | request channel capacity of the order actor |
//! | `ORDER_QUEUE_MENU` | `demos/menu.json` | menu book for the demo |

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::documents::RetryPolicy;
use crate::store::Backend;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set for the remote backend")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub url: String,
    pub auth: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    Volatile,
    Local {
        storage_dir: PathBuf,
        poll_interval: Duration,
    },
    Remote(RemoteConfig),
}

impl BackendConfig {
    pub fn backend(&self) -> Backend {
        match self {
            BackendConfig::Volatile => Backend::Volatile,
            BackendConfig::Local { .. } => Backend::Local,
            BackendConfig::Remote(_) => Backend::Remote,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: BackendConfig,
    pub channel_capacity: usize,
    pub menu_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Volatile,
            channel_capacity: 32,
            menu_path: PathBuf::from("demos/menu.json"),
        }
    }
}

impl Config {
    /// Reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which returns `None` for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend: Backend = try_load(&lookup, "ORDER_QUEUE_BACKEND", "volatile")?;
        let poll_ms: u64 = try_load(&lookup, "ORDER_QUEUE_POLL_MS", "250")?;
        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "ORDER_QUEUE_POLL_MS",
                value: "0".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        let poll_interval = Duration::from_millis(poll_ms);

        let backend = match backend {
            Backend::Volatile => BackendConfig::Volatile,
            Backend::Local => BackendConfig::Local {
                storage_dir: try_load(&lookup, "ORDER_QUEUE_STORAGE_DIR", ".order-queue")?,
                poll_interval,
            },
            Backend::Remote => {
                let url = lookup("ORDER_QUEUE_REMOTE_URL")
                    .filter(|url| !url.trim().is_empty())
                    .ok_or(ConfigError::Missing("ORDER_QUEUE_REMOTE_URL"))?;
                let attempts: u32 = try_load(&lookup, "ORDER_QUEUE_REMOTE_ATTEMPTS", "3")?;
                if attempts == 0 {
                    return Err(ConfigError::Invalid {
                        key: "ORDER_QUEUE_REMOTE_ATTEMPTS",
                        value: attempts.to_string(),
                        reason: "at least one attempt is needed".to_string(),
                    });
                }
                BackendConfig::Remote(RemoteConfig {
                    url,
                    auth: lookup("ORDER_QUEUE_REMOTE_AUTH").filter(|token| !token.is_empty()),
                    timeout: Duration::from_millis(try_load(
                        &lookup,
                        "ORDER_QUEUE_REMOTE_TIMEOUT_MS",
                        "5000",
                    )?),
                    retry: RetryPolicy {
                        attempts,
                        backoff: Duration::from_millis(try_load(
                            &lookup,
                            "ORDER_QUEUE_REMOTE_BACKOFF_MS",
                            "200",
                        )?),
                    },
                    poll_interval,
                })
            }
        };

        let channel_capacity: usize = try_load(&lookup, "ORDER_QUEUE_CHANNEL_CAPACITY", "32")?;
        if channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "ORDER_QUEUE_CHANNEL_CAPACITY",
                value: "0".to_string(),
                reason: "capacity must be positive".to_string(),
            });
        }

        Ok(Self {
            backend,
            channel_capacity,
            menu_path: try_load(&lookup, "ORDER_QUEUE_MENU", "demos/menu.json")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_local_backend() {
        let config = Config::from_lookup(lookup(&[
            ("ORDER_QUEUE_BACKEND", "Local"),
            ("ORDER_QUEUE_STORAGE_DIR", "/tmp/slots"),
            ("ORDER_QUEUE_POLL_MS", "50"),
        ]))
        .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Local {
                storage_dir: PathBuf::from("/tmp/slots"),
                poll_interval: Duration::from_millis(50),
            }
        );
    }

    #[test]
    fn test_remote_backend() {
        let missing = Config::from_lookup(lookup(&[("ORDER_QUEUE_BACKEND", "remote")]));
        assert_eq!(missing, Err(ConfigError::Missing("ORDER_QUEUE_REMOTE_URL")));

        let config = Config::from_lookup(lookup(&[
            ("ORDER_QUEUE_BACKEND", "remote"),
            ("ORDER_QUEUE_REMOTE_URL", "https://demo.example.com"),
            ("ORDER_QUEUE_REMOTE_AUTH", "secret"),
            ("ORDER_QUEUE_REMOTE_ATTEMPTS", "5"),
        ]))
        .unwrap();
        let BackendConfig::Remote(remote) = config.backend else {
            panic!("expected remote backend");
        };
        assert_eq!(remote.auth.as_deref(), Some("secret"));
        assert_eq!(remote.timeout, Duration::from_millis(5000));
        assert_eq!(remote.retry.attempts, 5);
        assert_eq!(remote.retry.backoff, Duration::from_millis(200));
    }

    #[test]
    fn test_invalid_values() {
        let result = Config::from_lookup(lookup(&[("ORDER_QUEUE_BACKEND", "cloud")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "ORDER_QUEUE_BACKEND", .. })
        ));

        let result = Config::from_lookup(lookup(&[("ORDER_QUEUE_CHANNEL_CAPACITY", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let result = Config::from_lookup(lookup(&[("ORDER_QUEUE_POLL_MS", "soon")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        // A zero interval would make the pollers spin
        let result = Config::from_lookup(lookup(&[("ORDER_QUEUE_POLL_MS", "0")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "ORDER_QUEUE_POLL_MS", .. })
        ));
    }
}
