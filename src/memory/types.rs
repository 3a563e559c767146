//! Record and bundle types for the per-video settings memory.

use crate::identity::VideoIdentity;
use serde::{Deserialize, Serialize};

/// Default volume percent — the "unmodified" state that is never stored.
pub const DEFAULT_VOLUME: u32 = 100;

/// Upper bound of the persisted volume domain, in percent.
pub const MAX_VOLUME: u32 = 600;

/// Placeholder title pages report when nothing usable is found.
/// A placeholder is never persisted; a display name is derived instead.
pub const UNKNOWN_TITLE: &str = "未知內容";

/// Persisted volume/mute settings for one logical video.
///
/// Field names are camelCase on the wire so export files round-trip with the
/// host runtime's message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Canonical identity this record is keyed by.
    pub url: VideoIdentity,
    /// Volume percent, 0..=600.
    pub volume: u32,
    #[serde(default)]
    pub is_muted: bool,
    /// Last-write instant, ms since epoch. Orders the settings list.
    #[serde(default)]
    pub timestamp: i64,
    /// Best-effort display label captured at save time.
    #[serde(default)]
    pub title: String,
    /// Last raw URL that produced this identity. Display/export only —
    /// never used to re-derive the identity.
    #[serde(default)]
    pub original_url: String,
}

/// True iff the pair is the default state (volume 100, not muted).
#[must_use]
pub fn is_default_state(volume: u32, is_muted: bool) -> bool {
    volume == DEFAULT_VOLUME && !is_muted
}

/// Snapshot of every stored record plus export metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    /// ISO-8601 export instant.
    pub export_date: String,
    pub settings_count: usize,
    pub settings: Vec<MemoryRecord>,
}

/// Current instant in ms since epoch.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_state_is_exactly_100_unmuted() {
        assert!(is_default_state(100, false));
        assert!(!is_default_state(100, true));
        assert!(!is_default_state(150, false));
        assert!(!is_default_state(0, false));
    }

    #[test]
    fn records_use_camel_case_on_the_wire() {
        let record = MemoryRecord {
            url: VideoIdentity::from_raw("youtube:abc"),
            volume: 150,
            is_muted: true,
            timestamp: 42,
            title: "t".into(),
            original_url: "https://youtu.be/abc".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["isMuted"], serde_json::json!(true));
        assert_eq!(value["originalUrl"], serde_json::json!("https://youtu.be/abc"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let record: MemoryRecord =
            serde_json::from_value(serde_json::json!({"url": "youtube:abc", "volume": 80}))
                .unwrap();
        assert!(!record.is_muted);
        assert_eq!(record.timestamp, 0);
        assert!(record.title.is_empty());
    }
}
