use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3030`).
    pub port: u16,
    /// Directory of the file store. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Age after which a presence record is dropped.
    pub presence_staleness: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3030,
            data_dir: None,
            cors_origins: Vec::new(),
            presence_staleness: Duration::from_millis(10_000),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default     |
    /// |-------------------------|-------------|
    /// | `HOST`                  | `0.0.0.0`   |
    /// | `PORT`                  | `3030`      |
    /// | `MAGBOARD_DATA_DIR`     | in-memory   |
    /// | `CORS_ORIGINS`          | any origin  |
    /// | `PRESENCE_STALENESS_MS` | `10000`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "a valid u16",
                value,
            })?,
            None => defaults.port,
        };

        let data_dir = lookup("MAGBOARD_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let presence_staleness = match lookup("PRESENCE_STALENESS_MS") {
            Some(value) => value
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    name: "PRESENCE_STALENESS_MS",
                    expected: "a number of milliseconds",
                    value,
                })?,
            None => defaults.presence_staleness,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            cors_origins,
            presence_staleness,
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "HOST",
                expected: "an IP address",
                value: self.host.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3030);
        assert!(config.data_dir.is_none());
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:3030");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("MAGBOARD_DATA_DIR", "/var/lib/magboard"),
            ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
            ("PRESENCE_STALENESS_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/magboard")));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.presence_staleness, Duration::from_millis(2500));
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().starts_with("PORT must be"));
    }
}
