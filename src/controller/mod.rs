//! Per-tab live audio controller.
//!
//! One controller per tab per page load. It owns the tab's gain stage,
//! routes media elements through it exactly once, applies volume/mute
//! commands, and decides — via last-saved-state tracking — whether a change
//! must be persisted through the memory collaborator. Navigation resets the
//! tracker and re-primes it from stored memory so a re-apply of remembered
//! settings is never recorded as a fresh user edit.
//!
//! All mutable state lives in explicit fields with a documented lifecycle;
//! the controller is constructed once per page load and torn down by
//! cancelling its token (see [`watch`] for the driver loop).

pub mod watch;

pub use watch::{ControllerHandle, spawn};

use crate::audio::{AudioGraph, GraphState, MediaElementId};
use crate::config::WatchConfig;
use crate::error::Result;
use crate::memory::{DEFAULT_VOLUME, MemoryRecord, SaveOutcome};
use crate::page::{PageProbe, clean_video_title};
use crate::tabs::{BadgeSink, TabId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Persistence collaborator — the background context that owns the
/// settings store, reached over the host message channel.
#[async_trait]
pub trait MemoryLink: Send + Sync {
    /// Persist a volume/mute pair for `url`. `saved == false` means a
    /// default-state delete or a disabled toggle, not a failure.
    async fn save(
        &self,
        url: &str,
        volume_percent: u32,
        is_muted: bool,
        title: Option<String>,
    ) -> Result<SaveOutcome>;

    /// Full record lookup, used to prime the save tracker on navigation.
    async fn find(&self, url: &str) -> Result<Option<MemoryRecord>>;
}

/// Transient on-page notice sink (the volume overlay).
pub trait NoticeSink: Send + Sync {
    fn show_volume(&self, volume_percent: u32);
}

/// Sink that drops notices.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNotice;

impl NoticeSink for NoNotice {
    fn show_volume(&self, _volume_percent: u32) {}
}

/// Events delivered by the host document observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// A media element appeared in the document.
    ElementAdded(MediaElementId),
    /// Page visibility changed.
    Visibility(bool),
    /// A user-initiated interaction (pointer, key, touch) occurred.
    UserGesture,
}

/// Typed inbound command surface for a tab controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TabCommand {
    #[serde(rename_all = "camelCase")]
    SetVolume {
        /// Gain multiplier, clamped into [0.0, max].
        volume: f32,
        #[serde(default)]
        show_notification: bool,
        #[serde(default)]
        is_memory_apply: bool,
    },
    #[serde(rename_all = "camelCase")]
    ToggleMute {
        is_muted: bool,
        #[serde(default)]
        show_notification: bool,
        #[serde(default)]
        is_memory_apply: bool,
    },
    GetCurrentVolumeState,
    GetCleanVideoTitle,
}

/// Reply to a [`TabCommand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabReply {
    State(VolumeState),
    Title { title: String },
    Ack { success: bool },
}

/// Current volume state of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeState {
    /// Gain multiplier.
    pub volume: f32,
    pub is_muted: bool,
}

/// Per-tab runtime state machine.
pub struct TabController<G: AudioGraph> {
    tab: TabId,
    graph: G,
    page: Arc<dyn PageProbe>,
    memory: Arc<dyn MemoryLink>,
    badge: Arc<dyn BadgeSink>,
    notice: Arc<dyn NoticeSink>,
    /// Maximum gain multiplier (600 % by default).
    max_gain: f32,
    /// Elements already routed through the gain stage. Binding is
    /// idempotent: an element bound once is never bound twice.
    bound: HashSet<MediaElementId>,
    /// Gain remembered across a mute, restored on unmute.
    pre_mute_volume: f32,
    /// Last volume/mute pair acknowledged as persisted. Diffed against new
    /// values to suppress redundant saves.
    last_saved_volume: u32,
    last_saved_muted: bool,
    /// URL the tracker currently describes.
    current_url: String,
    /// One-shot interaction latch: while armed, the first user gesture
    /// resumes the graph and detaches itself.
    gesture_armed: bool,
    initialized: bool,
    watch: WatchConfig,
    cancel: CancellationToken,
}

impl<G: AudioGraph> TabController<G> {
    pub fn new(
        tab: TabId,
        graph: G,
        page: Arc<dyn PageProbe>,
        memory: Arc<dyn MemoryLink>,
        badge: Arc<dyn BadgeSink>,
        notice: Arc<dyn NoticeSink>,
        watch: WatchConfig,
    ) -> Self {
        let current_url = page.current_url();
        Self {
            tab,
            graph,
            page,
            memory,
            badge,
            notice,
            max_gain: crate::memory::MAX_VOLUME as f32 / 100.0,
            bound: HashSet::new(),
            pre_mute_volume: 1.0,
            last_saved_volume: DEFAULT_VOLUME,
            last_saved_muted: false,
            current_url,
            gesture_armed: false,
            initialized: false,
            watch,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// First-opportunity graph construction: route existing media elements
    /// through the gain stage and arm the gesture resume if the backend
    /// starts suspended. Idempotent; called on page ready and again on the
    /// first inbound command, whichever happens first.
    pub fn init_audio(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.current_url = self.page.current_url();

        for element in self.page.media_elements() {
            self.bind_element(element);
        }

        // An opportunistic resume outside a gesture may fail; harmless.
        self.try_resume();
        if self.graph.state() == GraphState::Suspended {
            self.gesture_armed = true;
        }
        debug!(tab = %self.tab, state = ?self.graph.state(), "audio graph initialized");
    }

    /// Route one element through the gain stage. Returns true if the element
    /// is bound after the call. A connection failure (already bound by
    /// another agent, no audio track) is logged and leaves the element
    /// unbound without aborting anything else.
    pub fn bind_element(&mut self, element: MediaElementId) -> bool {
        if self.bound.contains(&element) {
            return true;
        }
        match self.graph.connect(element) {
            Ok(()) => {
                self.bound.insert(element);
                debug!(tab = %self.tab, %element, "media element connected");
                true
            }
            Err(e) => {
                warn!(tab = %self.tab, %element, error = %e, "media element connect failed");
                false
            }
        }
    }

    /// Apply a gain value.
    ///
    /// Persists the change through the memory collaborator unless this is a
    /// memory-driven apply or the value matches the last saved pair. The
    /// tracker only adopts an acknowledgment whose payload still equals the
    /// live state, so a stale acknowledgment arriving after a newer change
    /// cannot overwrite the tracker.
    pub async fn apply_volume(&mut self, volume: f32, show_notice: bool, is_memory_apply: bool) {
        self.init_audio();
        self.try_resume();

        let gain = volume.clamp(0.0, self.max_gain);
        self.graph.set_gain(gain);
        let percent = (gain * 100.0).round() as u32;
        let is_muted = gain == 0.0;

        self.badge.update(self.tab, percent, is_muted);

        if is_memory_apply {
            // A memory-driven apply is not a user edit: the tracker was
            // primed by the navigation handler and must not move here.
            debug!(tab = %self.tab, percent, "memory apply; not persisting");
            return;
        }

        let changed = percent != self.last_saved_volume || is_muted != self.last_saved_muted;
        if changed {
            let url = self.page.current_url();
            let title = clean_video_title(&*self.page);
            match self.memory.save(&url, percent, is_muted, Some(title)).await {
                Ok(_outcome) => {
                    let live_percent = (self.graph.gain() * 100.0).round() as u32;
                    let live_muted = self.graph.gain() == 0.0;
                    if percent == live_percent && is_muted == live_muted {
                        self.last_saved_volume = percent;
                        self.last_saved_muted = is_muted;
                        debug!(tab = %self.tab, percent, is_muted, "save acknowledged");
                    } else {
                        debug!(tab = %self.tab, percent, "stale save acknowledgment ignored");
                    }
                }
                Err(e) => {
                    // Live audio must never depend on persistence.
                    warn!(tab = %self.tab, error = %e, "volume save failed; gain stays applied");
                }
            }
        } else {
            debug!(tab = %self.tab, percent, is_muted, "volume unchanged since last save");
        }

        if show_notice {
            self.notice.show_volume(percent);
        }
    }

    /// Mute or unmute, preserving the pre-mute gain.
    ///
    /// Unmute restores the remembered gain, substituting 100 % when the
    /// remembered value was 0 so unmuting never leaves the tab silent.
    pub async fn toggle_mute(&mut self, should_mute: bool, show_notice: bool, is_memory_apply: bool) {
        self.init_audio();
        self.try_resume();

        if should_mute {
            let gain = self.graph.gain();
            if gain != 0.0 {
                self.pre_mute_volume = gain;
            }
            self.apply_volume(0.0, show_notice, is_memory_apply).await;
        } else {
            let restored = if self.pre_mute_volume == 0.0 {
                1.0
            } else {
                self.pre_mute_volume
            };
            self.apply_volume(restored, show_notice, is_memory_apply).await;
        }
    }

    /// Current volume state, derived from the live gain.
    #[must_use]
    pub fn volume_state(&self) -> VolumeState {
        let gain = self.graph.gain();
        VolumeState {
            volume: gain,
            is_muted: gain == 0.0,
        }
    }

    /// Clean display title of the current video.
    #[must_use]
    pub fn video_title(&self) -> String {
        clean_video_title(&*self.page)
    }

    /// Detect an in-page navigation and reconcile the save tracker.
    ///
    /// On change the tracker resets to defaults, then is primed from the
    /// stored record for the new URL (without saving) so that re-applying
    /// remembered settings reads as "unchanged". The prime is discarded if
    /// the page navigated again while the lookup was in flight.
    pub async fn check_navigation(&mut self) {
        let new_url = self.page.current_url();
        if new_url == self.current_url {
            return;
        }
        info!(tab = %self.tab, url = %new_url, "url changed; resetting save tracker");
        self.current_url = new_url.clone();
        self.last_saved_volume = DEFAULT_VOLUME;
        self.last_saved_muted = false;

        match self.memory.find(&new_url).await {
            Ok(Some(record)) => {
                if self.page.current_url() == new_url {
                    self.last_saved_volume = record.volume;
                    self.last_saved_muted = record.is_muted;
                    debug!(
                        tab = %self.tab,
                        volume = record.volume,
                        is_muted = record.is_muted,
                        "save tracker primed from memory"
                    );
                }
            }
            Ok(None) => debug!(tab = %self.tab, "no memory for new url"),
            Err(e) => warn!(tab = %self.tab, error = %e, "memory lookup failed on navigation"),
        }
    }

    /// Handle a page event (element appearance, visibility, user gesture).
    pub fn handle_page_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::ElementAdded(element) => {
                self.init_audio();
                self.bind_element(element);
            }
            PageEvent::Visibility(visible) => {
                if visible {
                    self.try_resume();
                }
            }
            PageEvent::UserGesture => self.user_gesture(),
        }
    }

    /// One-shot gesture resume: consumes the latch on success.
    fn user_gesture(&mut self) {
        if !self.gesture_armed {
            return;
        }
        if self.graph.state() == GraphState::Running {
            self.gesture_armed = false;
            return;
        }
        match self.graph.resume() {
            Ok(()) => {
                info!(tab = %self.tab, "audio graph resumed by user gesture");
                self.gesture_armed = false;
            }
            Err(e) => debug!(tab = %self.tab, error = %e, "gesture resume failed; staying armed"),
        }
    }

    /// Opportunistic resume attempt; failure is expected outside a gesture.
    fn try_resume(&mut self) {
        if self.graph.state() == GraphState::Suspended {
            if let Err(e) = self.graph.resume() {
                debug!(tab = %self.tab, error = %e, "opportunistic resume failed");
            }
        }
    }

    /// Dispatch one inbound command. Any command counts as an opportunity to
    /// initialize the graph and attempt a resume.
    pub async fn handle_command(&mut self, command: TabCommand) -> TabReply {
        self.init_audio();
        self.try_resume();

        match command {
            TabCommand::SetVolume {
                volume,
                show_notification,
                is_memory_apply,
            } => {
                self.apply_volume(volume, show_notification, is_memory_apply).await;
                TabReply::Ack { success: true }
            }
            TabCommand::ToggleMute {
                is_muted,
                show_notification,
                is_memory_apply,
            } => {
                self.toggle_mute(is_muted, show_notification, is_memory_apply).await;
                TabReply::Ack { success: true }
            }
            TabCommand::GetCurrentVolumeState => TabReply::State(self.volume_state()),
            TabCommand::GetCleanVideoTitle => TabReply::Title {
                title: self.video_title(),
            },
        }
    }

    /// Poll for the dedicated player element. Returns true once the target
    /// is bound, signalling the discovery poll to cancel itself.
    pub(crate) fn poll_player(&mut self) -> bool {
        let Some(element) = self.page.player_element() else {
            return false;
        };
        self.init_audio();
        self.bind_element(element)
    }

    pub(crate) fn watch_config(&self) -> &WatchConfig {
        &self.watch
    }
}
