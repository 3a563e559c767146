//! Per-tab transient volume state.
//!
//! Tab state lives in the shared key-value store under tab-scoped keys but
//! is conceptually owned by the tab's controller: it exists from the tab's
//! first navigation, is overwritten on every change, and is removed by tab
//! lifecycle, not by this core.

use crate::error::Result;
use crate::memory::DEFAULT_VOLUME;
use crate::storage::{KeyValueStore, tab_muted_key, tab_volume_key};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Host-runtime tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transient volume/mute state of one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabState {
    pub volume: u32,
    pub is_muted: bool,
}

impl Default for TabState {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            is_muted: false,
        }
    }
}

/// Load a tab's state, defaulting absent fields.
pub async fn load_tab_state<S: KeyValueStore + ?Sized>(store: &S, tab: TabId) -> Result<TabState> {
    let volume = store
        .get(&tab_volume_key(tab))
        .await?
        .and_then(|v| v.as_u64())
        .map_or(DEFAULT_VOLUME, |v| v as u32);
    let is_muted = store
        .get(&tab_muted_key(tab))
        .await?
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    Ok(TabState { volume, is_muted })
}

/// Overwrite a tab's state.
pub async fn store_tab_state<S: KeyValueStore + ?Sized>(
    store: &S,
    tab: TabId,
    state: TabState,
) -> Result<()> {
    store.set(&tab_volume_key(tab), json!(state.volume)).await?;
    store.set(&tab_muted_key(tab), Value::Bool(state.is_muted)).await
}

/// Drop a tab's state when the tab closes.
pub async fn clear_tab_state<S: KeyValueStore + ?Sized>(store: &S, tab: TabId) -> Result<()> {
    store
        .remove(&[tab_volume_key(tab), tab_muted_key(tab)])
        .await
}
