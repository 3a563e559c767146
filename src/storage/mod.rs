//! Persisted key-value storage boundary.
//!
//! The host runtime owns the real store (extension-local storage in a
//! browser); the core only assumes an async key-value surface whose backend
//! serializes individual key writes atomically. Keys are namespaced so that
//! no two reactor contexts ever contend for the same key: per-video records,
//! per-tab transient state, and the global config flag each live under their
//! own prefix.

use crate::error::Result;
use crate::identity::VideoIdentity;
use crate::tabs::TabId;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryKvStore;

/// Key prefix for per-video memory records.
const VIDEO_KEY_PREFIX: &str = "video:";

/// Global memory-toggle key. Default when absent: disabled.
pub const MEMORY_ENABLED_KEY: &str = "config:memoryEnabled";

/// Async key-value store surface.
///
/// All operations may fail with [`crate::VolumaError::Storage`]; callers that
/// control live audio must keep their in-memory state applied regardless.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, keys: &[String]) -> Result<()>;
    async fn keys(&self) -> Result<Vec<String>>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        (**self).remove(keys).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        (**self).keys().await
    }
}

/// Store key for a per-video memory record.
#[must_use]
pub fn video_key(identity: &VideoIdentity) -> String {
    format!("{VIDEO_KEY_PREFIX}{identity}")
}

/// Inverse of [`video_key`]: the identity part of a record key, if it is one.
#[must_use]
pub fn identity_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(VIDEO_KEY_PREFIX)
}

/// Store key for a tab's transient volume.
#[must_use]
pub fn tab_volume_key(tab: TabId) -> String {
    format!("tab:{tab}:volume")
}

/// Store key for a tab's transient mute flag.
#[must_use]
pub fn tab_muted_key(tab: TabId) -> String {
    format!("tab:{tab}:muted")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::identity::resolve;
    use crate::tabs::TabId;

    #[test]
    fn key_layout_is_namespaced() {
        let identity = resolve("https://youtu.be/abc123").unwrap();
        assert_eq!(video_key(&identity), "video:youtube:abc123");
        assert_eq!(identity_from_key("video:youtube:abc123"), Some("youtube:abc123"));
        assert_eq!(identity_from_key("tab:7:volume"), None);
        assert_eq!(tab_volume_key(TabId(7)), "tab:7:volume");
        assert_eq!(tab_muted_key(TabId(7)), "tab:7:muted");
    }
}
