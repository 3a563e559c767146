//! Background coordinator.
//!
//! Owns the settings memory and the per-tab transient state, and reconciles
//! both against tab lifecycle events: volume step commands, mute toggles,
//! resets, navigation completions, and tab activations. Commands reach the
//! tab's controller through the [`TabLink`] boundary; a remembered setting
//! is always delivered as a memory-apply so the controller never re-records
//! it as a user edit.

use super::badge::BadgeSink;
use super::state::{TabId, TabState, load_tab_state, store_tab_state};
use crate::config::VolumeConfig;
use crate::controller::TabCommand;
use crate::error::Result;
use crate::identity::is_video_url;
use crate::memory::SettingsStore;
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Direction of a volume step command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Increase,
    Decrease,
}

/// Tab runtime boundary: address lookup and command delivery.
#[async_trait]
pub trait TabLink: Send + Sync {
    /// Current URL of the tab, or `None` when the tab is gone.
    async fn url(&self, tab: TabId) -> Result<Option<String>>;

    /// Deliver a command to the tab's controller.
    async fn send(&self, tab: TabId, command: TabCommand) -> Result<()>;
}

/// Background coordinator over a shared key-value store.
pub struct TabCoordinator<S, B, L> {
    store: Arc<S>,
    memory: SettingsStore<Arc<S>>,
    badge: B,
    link: L,
    volume: VolumeConfig,
}

impl<S, B, L> TabCoordinator<S, B, L>
where
    S: KeyValueStore,
    B: BadgeSink,
    L: TabLink,
{
    pub fn new(store: Arc<S>, badge: B, link: L, volume: VolumeConfig) -> Self {
        Self {
            memory: SettingsStore::new(Arc::clone(&store)),
            store,
            badge,
            link,
            volume,
        }
    }

    /// The settings memory this coordinator owns.
    pub fn memory(&self) -> &SettingsStore<Arc<S>> {
        &self.memory
    }

    /// Step the tab's volume up or down, unmuting it in the process.
    /// Returns the new volume percent.
    pub async fn adjust_volume(&self, tab: TabId, direction: VolumeDirection) -> Result<u32> {
        let mut state = load_tab_state(self.store.as_ref(), tab).await?;
        state.is_muted = false;
        state.volume = match direction {
            VolumeDirection::Increase => {
                (state.volume + self.volume.step_percent).min(self.volume.max_volume_percent)
            }
            VolumeDirection::Decrease => state.volume.saturating_sub(self.volume.step_percent),
        };
        store_tab_state(self.store.as_ref(), tab, state).await?;

        self.save_for_tab(tab, state.volume, false).await;
        self.badge.update(tab, state.volume, false);
        self.deliver(
            tab,
            TabCommand::SetVolume {
                volume: state.volume as f32 / 100.0,
                show_notification: true,
                is_memory_apply: false,
            },
        )
        .await;
        Ok(state.volume)
    }

    /// Flip the tab's mute flag. Returns the new flag.
    pub async fn toggle_mute(&self, tab: TabId) -> Result<bool> {
        let mut state = load_tab_state(self.store.as_ref(), tab).await?;
        state.is_muted = !state.is_muted;
        store_tab_state(self.store.as_ref(), tab, state).await?;

        self.save_for_tab(tab, state.volume, state.is_muted).await;
        self.badge.update(tab, state.volume, state.is_muted);
        self.deliver(
            tab,
            TabCommand::ToggleMute {
                is_muted: state.is_muted,
                show_notification: true,
                is_memory_apply: false,
            },
        )
        .await;
        Ok(state.is_muted)
    }

    /// Reset the tab to the default state. Saving the default clears any
    /// stored memory for the tab's video.
    pub async fn reset_volume(&self, tab: TabId) -> Result<()> {
        let state = TabState::default();
        store_tab_state(self.store.as_ref(), tab, state).await?;

        self.save_for_tab(tab, state.volume, state.is_muted).await;
        self.badge.update(tab, state.volume, state.is_muted);
        self.deliver(
            tab,
            TabCommand::SetVolume {
                volume: 1.0,
                show_notification: true,
                is_memory_apply: false,
            },
        )
        .await;
        Ok(())
    }

    /// Reconcile a completed navigation: apply remembered settings for a
    /// recognized video, defaults otherwise. Every delivery here is a
    /// memory-apply.
    pub async fn tab_updated(&self, tab: TabId, url: &str) -> Result<()> {
        if is_video_url(url) {
            let record = match self.memory.find(url).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(%tab, error = %e, "memory lookup failed; applying defaults");
                    None
                }
            };
            let state = record.map_or_else(TabState::default, |r| TabState {
                volume: r.volume,
                is_muted: r.is_muted,
            });
            debug!(%tab, volume = state.volume, is_muted = state.is_muted, "navigation reconciled");
            store_tab_state(self.store.as_ref(), tab, state).await?;
            self.badge.update(tab, state.volume, state.is_muted);
            self.deliver(tab, memory_apply_command(state)).await;
        } else {
            let state = load_tab_state(self.store.as_ref(), tab).await?;
            self.badge.update(tab, state.volume, state.is_muted);
            self.deliver(tab, memory_apply_command(state)).await;
        }
        Ok(())
    }

    /// Re-apply the tab's stored state when it becomes active.
    pub async fn tab_activated(&self, tab: TabId) -> Result<()> {
        let state = load_tab_state(self.store.as_ref(), tab).await?;
        self.badge.update(tab, state.volume, state.is_muted);
        self.deliver(tab, memory_apply_command(state)).await;
        Ok(())
    }

    /// Startup pass: restore badges for already-open tabs.
    pub async fn refresh_badges(&self, tabs: &[TabId]) -> Result<()> {
        for &tab in tabs {
            let state = load_tab_state(self.store.as_ref(), tab).await?;
            self.badge.update(tab, state.volume, state.is_muted);
        }
        Ok(())
    }

    /// Memory-save the pair for the tab's current URL if it is a video.
    /// Routine persistence failures do not affect live control; log only.
    async fn save_for_tab(&self, tab: TabId, volume: u32, is_muted: bool) {
        let url = match self.link.url(tab).await {
            Ok(Some(url)) => url,
            Ok(None) => return,
            Err(e) => {
                warn!(%tab, error = %e, "tab url lookup failed");
                return;
            }
        };
        if !is_video_url(&url) {
            return;
        }
        if let Err(e) = self.memory.save(&url, volume, is_muted, None).await {
            warn!(%tab, error = %e, "memory save failed");
        }
    }

    async fn deliver(&self, tab: TabId, command: TabCommand) {
        if let Err(e) = self.link.send(tab, command).await {
            warn!(%tab, error = %e, "command delivery failed");
        }
    }
}

/// Command that replays a stored state without recording a user edit.
fn memory_apply_command(state: TabState) -> TabCommand {
    TabCommand::SetVolume {
        volume: if state.is_muted {
            0.0
        } else {
            state.volume as f32 / 100.0
        },
        show_notification: false,
        is_memory_apply: true,
    }
}
