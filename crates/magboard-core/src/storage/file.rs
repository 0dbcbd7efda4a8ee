//! File-based gateway for native platforms.
//!
//! Layout: `<base>/campaigns/<slug>/whiteboard.json` and
//! `<base>/campaigns/<slug>/presence.json`. Writes go to a temporary file in
//! the same directory and are renamed over the target, so readers never see
//! a partially written collection.
//!
//! All I/O is synchronous `std::fs`; on an async runtime, run it off the
//! worker threads (the server wraps it in a blocking-pool adapter).

use super::{BoxFuture, Gateway, GatewayError, GatewayResult, slugify, upsert_presence};
use crate::clock::{Clock, SystemClock};
use crate::presence::PresenceRecord;
use crate::shapes::Element;
use crate::sync::{ElementsEnvelope, PresenceEnvelope};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

const WHITEBOARD_FILE: &str = "whiteboard.json";
const PRESENCE_FILE: &str = "presence.json";

/// File-based gateway.
pub struct FileGateway {
    /// Base directory for campaign storage.
    base_path: PathBuf,
    clock: Arc<dyn Clock>,
    last_save: AtomicI64,
    /// Serializes presence read-modify-write cycles.
    presence_lock: Mutex<()>,
}

impl FileGateway {
    /// Create a gateway rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> GatewayResult<Self> {
        Self::with_clock(base_path, Arc::new(SystemClock))
    }

    pub fn with_clock(base_path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> GatewayResult<Self> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                GatewayError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            clock,
            last_save: AtomicI64::new(0),
            presence_lock: Mutex::new(()),
        })
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory of a campaign.
    fn campaign_dir(&self, campaign: &str) -> GatewayResult<PathBuf> {
        let slug = slugify(campaign);
        if slug.is_empty() || slug.chars().all(|c| c == '.') {
            return Err(GatewayError::InvalidCampaign(campaign.to_string()));
        }
        Ok(self.base_path.join("campaigns").join(slug))
    }

    fn next_save_timestamp(&self) -> i64 {
        let now = self.clock.now_millis();
        let step = |prev: i64| now.max(prev.saturating_add(1));
        let prev = self
            .last_save
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(step(prev)))
            .unwrap_or_else(|prev| prev);
        step(prev)
    }
}

/// Read and parse a JSON file; `None` when it does not exist.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> GatewayResult<Option<T>> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GatewayError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )));
        }
    };
    serde_json::from_str(&json).map(Some).map_err(|e| {
        GatewayError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Write via temp file + rename.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> GatewayResult<()> {
    let json = serde_json::to_string(value)?;
    let dir = path
        .parent()
        .ok_or_else(|| GatewayError::Io(format!("No parent directory for {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    fs::write(&tmp, json).map_err(|e| {
        GatewayError::Io(format!("Failed to write {}: {}", tmp.display(), e))
    })?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(GatewayError::Io(format!(
            "Failed to replace {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}

impl Gateway for FileGateway {
    fn fetch_elements<'a>(&'a self, campaign: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Element>>> {
        Box::pin(async move {
            let path = self.campaign_dir(campaign)?.join(WHITEBOARD_FILE);
            let envelope: Option<ElementsEnvelope> = read_json(&path)?;
            Ok(envelope.map(|e| e.elements).unwrap_or_default())
        })
    }

    fn save_elements<'a>(
        &'a self,
        campaign: &'a str,
        elements: &'a [Element],
    ) -> BoxFuture<'a, GatewayResult<i64>> {
        Box::pin(async move {
            let path = self.campaign_dir(campaign)?.join(WHITEBOARD_FILE);
            let timestamp = self.next_save_timestamp();
            let envelope = ElementsEnvelope {
                elements: elements.to_vec(),
                timestamp: Some(timestamp),
            };
            write_json_atomic(&path, &envelope)?;
            log::debug!("Saved {} elements to {}", elements.len(), path.display());
            Ok(timestamp)
        })
    }

    fn fetch_presence<'a>(
        &'a self,
        campaign: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<PresenceRecord>>> {
        Box::pin(async move {
            let path = self.campaign_dir(campaign)?.join(PRESENCE_FILE);
            let envelope: Option<PresenceEnvelope> = read_json(&path)?;
            Ok(envelope.map(|e| e.users).unwrap_or_default())
        })
    }

    fn publish_presence<'a>(
        &'a self,
        campaign: &'a str,
        record: &'a PresenceRecord,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let path = self.campaign_dir(campaign)?.join(PRESENCE_FILE);
            let _guard = self
                .presence_lock
                .lock()
                .map_err(|e| GatewayError::Lock(e.to_string()))?;
            let mut envelope: PresenceEnvelope = read_json(&path)?.unwrap_or_default();
            upsert_presence(&mut envelope.users, record.clone());
            write_json_atomic(&path, &envelope)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::presence::color_for_user;
    use crate::shapes::{ElementKind, HexColor, PathStroke};
    use crate::test_util::block_on;
    use kurbo::Point;
    use tempfile::tempdir;

    fn stroke(ts: i64) -> Element {
        Element::new(
            ElementKind::Path(PathStroke::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)], 3.0)),
            HexColor::black(),
            ts,
        )
    }

    #[test]
    fn test_save_and_fetch() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(7_000));
        let gateway = FileGateway::with_clock(dir.path(), clock).unwrap();

        let elements = vec![stroke(1), stroke(2)];
        let ts = block_on(gateway.save_elements("Tomb of Horrors", &elements)).unwrap();
        assert_eq!(ts, 7_000);

        let stored = dir.path().join("campaigns/tomb-of-horrors/whiteboard.json");
        assert!(stored.exists());
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&stored).unwrap()).unwrap();
        assert_eq!(raw["timestamp"], 7_000);
        assert_eq!(raw["elements"][0]["kind"], "path");

        let loaded = block_on(gateway.fetch_elements("Tomb of Horrors")).unwrap();
        assert_eq!(loaded, elements);

        // Same clock reading still yields a newer save timestamp.
        let ts2 = block_on(gateway.save_elements("Tomb of Horrors", &[])).unwrap();
        assert_eq!(ts2, 7_001);
    }

    #[test]
    fn test_save_timestamp_saturates() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(i64::MAX));
        let gateway = FileGateway::with_clock(dir.path(), clock).unwrap();
        assert_eq!(block_on(gateway.save_elements("c", &[])).unwrap(), i64::MAX);
        assert_eq!(block_on(gateway.save_elements("c", &[])).unwrap(), i64::MAX);
    }

    #[test]
    fn test_missing_campaign_is_empty() {
        let dir = tempdir().unwrap();
        let gateway = FileGateway::new(dir.path()).unwrap();
        assert!(block_on(gateway.fetch_elements("fresh")).unwrap().is_empty());
        assert!(block_on(gateway.fetch_presence("fresh")).unwrap().is_empty());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let gateway = FileGateway::new(dir.path()).unwrap();
        block_on(gateway.save_elements("c", &[stroke(1)])).unwrap();
        block_on(gateway.save_elements("c", &[stroke(2)])).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path().join("campaigns/c"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["whiteboard.json".to_string()]);
    }

    #[test]
    fn test_rejects_traversal_slug() {
        let dir = tempdir().unwrap();
        let gateway = FileGateway::new(dir.path()).unwrap();
        let err = block_on(gateway.fetch_elements("..")).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCampaign(_)));
        assert!(block_on(gateway.fetch_elements("!!!")).is_err());
    }

    #[test]
    fn test_presence_merges_by_user() {
        let dir = tempdir().unwrap();
        let gateway = FileGateway::new(dir.path()).unwrap();
        let mut record = PresenceRecord {
            user_id: "u1".into(),
            user_name: "Una".into(),
            cursor_x: 1.0,
            cursor_y: 1.0,
            editing_element_id: None,
            last_seen: 1,
            color: color_for_user("u1"),
        };
        block_on(gateway.publish_presence("c", &record)).unwrap();
        record.cursor_x = 9.0;
        block_on(gateway.publish_presence("c", &record)).unwrap();
        record.user_id = "u2".into();
        block_on(gateway.publish_presence("c", &record)).unwrap();

        let users = block_on(gateway.fetch_presence("c")).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].cursor_x, 9.0);
    }
}
