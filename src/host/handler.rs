//! Memory host handler: the background-side implementation of the message
//! surface, backed by the settings store.

use crate::error::Result;
use crate::identity::VideoIdentity;
use crate::memory::{ExportBundle, MemoryRecord, SaveOutcome, SettingsStore};
use crate::storage::KeyValueStore;
use crate::tabs::{BadgeSink, TabId, badge_for};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Background-side handler for the memory host channel.
///
/// Mirrors the collaborator contract: save reports whether a record was
/// written, import validates up-front, delete is idempotent, and the badge
/// call is fire-and-forget.
#[async_trait]
pub trait MemoryHostHandler: Send + Sync + 'static {
    async fn save(
        &self,
        url: &str,
        volume: u32,
        is_muted: bool,
        title: Option<String>,
    ) -> Result<SaveOutcome>;

    async fn check(&self, url: &str) -> Result<bool>;

    async fn find(&self, url: &str) -> Result<Option<MemoryRecord>>;

    async fn list(&self) -> Result<Vec<MemoryRecord>>;

    async fn export(&self) -> Result<ExportBundle>;

    async fn import(&self, bundle: &serde_json::Value) -> Result<usize>;

    async fn delete(&self, identities: &[VideoIdentity]) -> Result<usize>;

    async fn memory_enabled(&self) -> Result<bool>;

    async fn set_memory_enabled(&self, enabled: bool) -> Result<()>;

    fn badge_update(&self, tab: TabId, volume_percent: u32, is_muted: bool);
}

/// Production handler over a [`SettingsStore`].
pub struct StoreHostHandler<S, B> {
    memory: SettingsStore<Arc<S>>,
    badge: B,
}

impl<S: KeyValueStore, B: BadgeSink> StoreHostHandler<S, B> {
    pub fn new(store: Arc<S>, badge: B) -> Self {
        Self {
            memory: SettingsStore::new(store),
            badge,
        }
    }

    pub fn memory(&self) -> &SettingsStore<Arc<S>> {
        &self.memory
    }
}

#[async_trait]
impl<S, B> MemoryHostHandler for StoreHostHandler<S, B>
where
    S: KeyValueStore + 'static,
    B: BadgeSink + 'static,
{
    async fn save(
        &self,
        url: &str,
        volume: u32,
        is_muted: bool,
        title: Option<String>,
    ) -> Result<SaveOutcome> {
        self.memory.save(url, volume, is_muted, title.as_deref()).await
    }

    async fn check(&self, url: &str) -> Result<bool> {
        Ok(self.memory.find(url).await?.is_some())
    }

    async fn find(&self, url: &str) -> Result<Option<MemoryRecord>> {
        self.memory.find(url).await
    }

    async fn list(&self) -> Result<Vec<MemoryRecord>> {
        self.memory.list().await
    }

    async fn export(&self) -> Result<ExportBundle> {
        self.memory.export().await
    }

    async fn import(&self, bundle: &serde_json::Value) -> Result<usize> {
        self.memory.import(bundle).await
    }

    async fn delete(&self, identities: &[VideoIdentity]) -> Result<usize> {
        self.memory.delete(identities).await
    }

    async fn memory_enabled(&self) -> Result<bool> {
        self.memory.memory_enabled().await
    }

    async fn set_memory_enabled(&self, enabled: bool) -> Result<()> {
        self.memory.set_memory_enabled(enabled).await
    }

    fn badge_update(&self, tab: TabId, volume_percent: u32, is_muted: bool) {
        let badge = badge_for(volume_percent, is_muted);
        debug!(%tab, text = %badge.text, color = badge.color, "badge update");
        self.badge.update(tab, volume_percent, is_muted);
    }
}
