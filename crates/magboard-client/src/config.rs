use crate::error::{ClientError, ClientResult};
use magboard_core::presence::PresenceConfig;
use magboard_core::sync::SyncConfig;
use std::time::Duration;

/// Session settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the magboard server.
    pub server_url: String,
    pub campaign: String,
    pub user_id: String,
    pub user_name: String,
    pub sync: SyncConfig,
    pub presence: PresenceConfig,
}

impl ClientConfig {
    /// Config with default timings and a random user id.
    pub fn new(campaign: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            server_url: "http://localhost:3030".into(),
            campaign: campaign.into(),
            user_id: uuid::Uuid::new_v4().to_string(),
            user_name: user_name.into(),
            sync: SyncConfig::default(),
            presence: PresenceConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `MAGBOARD_SERVER`           | `http://localhost:3030` |
    /// | `MAGBOARD_CAMPAIGN`         | required                |
    /// | `MAGBOARD_USER_ID`          | random UUID             |
    /// | `MAGBOARD_USER_NAME`        | `Anonymous`             |
    /// | `MAGBOARD_SYNC_INTERVAL_MS` | `1000`                  |
    /// | `MAGBOARD_SAVE_DEBOUNCE_MS` | `500`                   |
    /// | `MAGBOARD_FORCED_FLUSH_MS`  | `3000`                  |
    /// | `MAGBOARD_GRACE_WINDOW_MS`  | `5000`                  |
    /// | `MAGBOARD_HEARTBEAT_MS`     | `1000`                  |
    /// | `MAGBOARD_DISCOVERY_MS`     | `1500`                  |
    /// | `MAGBOARD_STALENESS_MS`     | `10000`                 |
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let campaign = lookup("MAGBOARD_CAMPAIGN")
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClientError::MissingVar("MAGBOARD_CAMPAIGN"))?;
        let mut config = Self::new(
            campaign,
            lookup("MAGBOARD_USER_NAME").unwrap_or_else(|| "Anonymous".into()),
        );
        if let Some(url) = lookup("MAGBOARD_SERVER") {
            config.server_url = url;
        }
        if let Some(id) = lookup("MAGBOARD_USER_ID").filter(|id| !id.trim().is_empty()) {
            config.user_id = id;
        }

        let millis = |name: &'static str, default: Duration| -> ClientResult<Duration> {
            let Some(value) = lookup(name) else {
                return Ok(default);
            };
            match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
                _ => Err(ClientError::InvalidVar {
                    name,
                    expected: "a positive number of milliseconds",
                    value,
                }),
            }
        };

        let sync = config.sync;
        config.sync = SyncConfig {
            sync_interval: millis("MAGBOARD_SYNC_INTERVAL_MS", sync.sync_interval)?,
            save_debounce: millis("MAGBOARD_SAVE_DEBOUNCE_MS", sync.save_debounce)?,
            forced_flush: millis("MAGBOARD_FORCED_FLUSH_MS", sync.forced_flush)?,
            grace_window: millis("MAGBOARD_GRACE_WINDOW_MS", sync.grace_window)?,
            ..sync
        };
        let presence = config.presence;
        config.presence = PresenceConfig {
            heartbeat_interval: millis("MAGBOARD_HEARTBEAT_MS", presence.heartbeat_interval)?,
            discovery_interval: millis("MAGBOARD_DISCOVERY_MS", presence.discovery_interval)?,
            staleness: millis("MAGBOARD_STALENESS_MS", presence.staleness)?,
        };
        Ok(config)
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
    fn test_campaign_is_required() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ClientError::MissingVar("MAGBOARD_CAMPAIGN")));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("MAGBOARD_CAMPAIGN", "Curse of Strahd"),
            ("MAGBOARD_USER_ID", "u1"),
            ("MAGBOARD_SYNC_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.server_url, "http://localhost:3030");
        assert_eq!(config.user_id, "u1");
        assert_eq!(config.user_name, "Anonymous");
        assert_eq!(config.sync.sync_interval, Duration::from_millis(250));
        assert_eq!(config.sync.save_debounce, Duration::from_millis(500));
        assert_eq!(config.presence.staleness, Duration::from_millis(10_000));
    }

    #[test]
    fn test_invalid_interval() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("MAGBOARD_CAMPAIGN", "c"),
            ("MAGBOARD_HEARTBEAT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidVar { name: "MAGBOARD_HEARTBEAT_MS", .. }));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        for name in ["MAGBOARD_SYNC_INTERVAL_MS", "MAGBOARD_HEARTBEAT_MS", "MAGBOARD_DISCOVERY_MS"] {
            let err = ClientConfig::from_lookup(lookup(&[("MAGBOARD_CAMPAIGN", "c"), (name, "0")])).unwrap_err();
            match err {
                ClientError::InvalidVar { name: got, expected, value } => {
                    assert_eq!(got, name);
                    assert_eq!(expected, "a positive number of milliseconds");
                    assert_eq!(value, "0");
                }
                other => panic!("expected InvalidVar, got {:?}", other),
            }
        }
    }
}
