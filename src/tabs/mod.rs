//! Background coordinator: per-tab transient state, badge model, and the
//! reconciliation logic driven by tab lifecycle events.

pub mod badge;
pub mod coordinator;
pub mod state;

pub use badge::{Badge, BadgeSink, NoBadge, badge_for};
pub use coordinator::{TabCoordinator, TabLink, VolumeDirection};
pub use state::{TabId, TabState, clear_tab_state, load_tab_state, store_tab_state};
