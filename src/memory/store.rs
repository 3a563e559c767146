//! Per-video settings memory over the key-value store.
//!
//! Every mutator except `delete` and `import` is gated by the global memory
//! toggle. The store never holds no-op entries: saving the default state
//! deletes any existing record instead of writing one.

use super::types::{ExportBundle, MAX_VOLUME, MemoryRecord, UNKNOWN_TITLE, is_default_state, now_ms};
use crate::error::{Result, VolumaError};
use crate::identity::{VideoIdentity, display_name, resolve};
use crate::storage::{KeyValueStore, MEMORY_ENABLED_KEY, identity_from_key, video_key};
use serde_json::Value;
use tracing::{debug, info};

/// Result of a save request. `saved == false` means the call was a no-op or
/// a default-state delete — callers must not treat it as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved: bool,
}

/// Per-video settings memory.
#[derive(Debug, Clone)]
pub struct SettingsStore<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying key-value store.
    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Global memory toggle. Default: disabled.
    pub async fn memory_enabled(&self) -> Result<bool> {
        Ok(self
            .store
            .get(MEMORY_ENABLED_KEY)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub async fn set_memory_enabled(&self, enabled: bool) -> Result<()> {
        self.store.set(MEMORY_ENABLED_KEY, Value::Bool(enabled)).await
    }

    /// Persist a volume/mute pair for the video behind `url`.
    ///
    /// No-op when the toggle is disabled or the URL is not a recognized
    /// video. Saving the default state deletes any existing record — the
    /// reset path and the save path clear memory the same way.
    pub async fn save(
        &self,
        url: &str,
        volume: u32,
        is_muted: bool,
        title: Option<&str>,
    ) -> Result<SaveOutcome> {
        if !self.memory_enabled().await? {
            debug!(url, "memory disabled; not saving volume settings");
            return Ok(SaveOutcome { saved: false });
        }
        let Some(identity) = resolve(url) else {
            return Ok(SaveOutcome { saved: false });
        };

        let volume = volume.min(MAX_VOLUME);
        if is_default_state(volume, is_muted) {
            self.store.remove(&[video_key(&identity)]).await?;
            debug!(identity = %identity, "default state; deleted stored settings");
            return Ok(SaveOutcome { saved: false });
        }

        let title = match title {
            Some(t) if !t.trim().is_empty() && t.trim() != UNKNOWN_TITLE => t.trim().to_owned(),
            _ => display_name(&identity, url),
        };
        let record = MemoryRecord {
            url: identity.clone(),
            volume,
            is_muted,
            timestamp: now_ms(),
            title,
            original_url: url.to_owned(),
        };
        let value = serde_json::to_value(&record)
            .map_err(|e| VolumaError::Storage(format!("cannot encode record: {e}")))?;
        self.store.set(&video_key(&identity), value).await?;
        info!(identity = %identity, volume, is_muted, "saved video volume settings");
        Ok(SaveOutcome { saved: true })
    }

    /// Look up the stored record for the video behind `url`.
    ///
    /// Missing optional fields are defaulted; a missing title is derived
    /// from the identity.
    pub async fn find(&self, url: &str) -> Result<Option<MemoryRecord>> {
        let Some(identity) = resolve(url) else {
            return Ok(None);
        };
        let Some(value) = self.store.get(&video_key(&identity)).await? else {
            return Ok(None);
        };
        Ok(Some(decode_record(&identity, value, url)?))
    }

    /// Every stored record, most recently written first. Ties are broken by
    /// identity so the order is stable.
    pub async fn list(&self) -> Result<Vec<MemoryRecord>> {
        let mut records = Vec::new();
        for key in self.store.keys().await? {
            let Some(identity) = identity_from_key(&key) else {
                continue;
            };
            let identity = VideoIdentity::from_raw(identity);
            if let Some(value) = self.store.get(&key).await? {
                records.push(decode_record(&identity, value, "")?);
            }
        }
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.url.as_str().cmp(b.url.as_str()))
        });
        Ok(records)
    }

    /// Snapshot of [`list`](Self::list) plus export metadata.
    /// Round-trips through [`import`](Self::import).
    pub async fn export(&self) -> Result<ExportBundle> {
        let settings = self.list().await?;
        Ok(ExportBundle {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            export_date: chrono::Utc::now().to_rfc3339(),
            settings_count: settings.len(),
            settings,
        })
    }

    /// Import a settings bundle, writing each entry verbatim.
    ///
    /// Bypasses both the toggle and the default-equals-delete rule so an
    /// export restores exactly. Entries without an identity and a volume are
    /// skipped. Returns the number of entries written.
    pub async fn import(&self, data: &Value) -> Result<usize> {
        let settings = data
            .get("settings")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                VolumaError::Validation("invalid import payload: `settings` must be a list".into())
            })?;

        let mut imported = 0;
        for entry in settings {
            let Some(identity) = entry.get("url").and_then(Value::as_str).filter(|s| !s.is_empty())
            else {
                continue;
            };
            let Some(volume) = entry.get("volume").and_then(value_as_volume) else {
                continue;
            };
            let record = MemoryRecord {
                url: VideoIdentity::from_raw(identity),
                volume,
                is_muted: entry.get("isMuted").and_then(Value::as_bool).unwrap_or(false),
                timestamp: entry
                    .get("timestamp")
                    .and_then(Value::as_i64)
                    .unwrap_or_else(now_ms),
                title: entry
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                original_url: entry
                    .get("originalUrl")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            };
            let value = serde_json::to_value(&record)
                .map_err(|e| VolumaError::Storage(format!("cannot encode record: {e}")))?;
            self.store.set(&video_key(&record.url), value).await?;
            imported += 1;
        }
        info!(imported, "imported volume settings");
        Ok(imported)
    }

    /// Remove the records for exactly the given identities. Missing keys are
    /// silently ignored. Allowed regardless of the toggle.
    pub async fn delete(&self, identities: &[VideoIdentity]) -> Result<usize> {
        let keys: Vec<String> = identities.iter().map(video_key).collect();
        self.store.remove(&keys).await?;
        info!(count = identities.len(), "deleted volume settings");
        Ok(identities.len())
    }
}

/// Decode a stored value, defaulting missing fields and deriving a title
/// when none was captured.
fn decode_record(identity: &VideoIdentity, value: Value, fallback_url: &str) -> Result<MemoryRecord> {
    let mut record: MemoryRecord = serde_json::from_value(value)
        .map_err(|e| VolumaError::Storage(format!("corrupt record for {identity}: {e}")))?;
    record.url = identity.clone();
    if record.title.is_empty() {
        let original = if record.original_url.is_empty() {
            fallback_url
        } else {
            record.original_url.as_str()
        };
        record.title = display_name(identity, original);
    }
    Ok(record)
}

fn value_as_volume(value: &Value) -> Option<u32> {
    if let Some(v) = value.as_u64() {
        return Some(v.min(u64::from(MAX_VOLUME)) as u32);
    }
    value
        .as_f64()
        .map(|v| (v.round().max(0.0) as u32).min(MAX_VOLUME))
}
