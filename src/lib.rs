//! Voluma: per-tab audio gain control with per-video volume memory.
//!
//! Three cooperating components, most foundational first:
//!
//! - **Identity resolver** ([`identity`]): pure mapping from a page URL to a
//!   canonical video identity, so every URL variant of the same logical
//!   video shares one settings record.
//! - **Settings memory** ([`memory`] over [`storage`]): persisted per-video
//!   volume/mute records gated by a global "remember" toggle. The default
//!   state (100 %, unmuted) is never stored — saving it clears the record.
//! - **Live audio controller** ([`controller`] driving [`audio`] and
//!   [`page`]): per-tab state machine that routes media elements through a
//!   single gain stage, applies volume changes, and tracks the last saved
//!   state so remembered settings are re-applied without duplicate writes.
//!
//! The background coordinator ([`tabs`]) reconciles tab lifecycle events
//! against the memory, and the host surface ([`host`]) carries the message
//! contract between contexts. Each context is a single-threaded reactor;
//! everything cross-context is an awaited async call or a broadcast event.

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod identity;
pub mod memory;
pub mod page;
pub mod storage;
pub mod tabs;

pub use config::VolumaConfig;
pub use controller::{TabCommand, TabController};
pub use error::{Result, VolumaError};
pub use identity::{VideoIdentity, is_video_url, resolve};
pub use memory::{ExportBundle, MemoryRecord, SettingsStore};
