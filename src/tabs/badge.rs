//! Toolbar badge model.
//!
//! The badge shows the full volume percentage (or a mute marker) with a
//! background color per volume tier. Rendering belongs to the host runtime;
//! this module only computes what to render.

use super::state::TabId;

const COLOR_MUTED: &str = "#e74c3c";
const COLOR_SILENT: &str = "#95a5a6";
const COLOR_NORMAL: &str = "#2ecc71";
const COLOR_BOOSTED: &str = "#f39c12";
const COLOR_EXTREME: &str = "#e74c3c";

/// Badge text label shown while muted.
pub const MUTED_BADGE_TEXT: &str = "靜音";

/// Computed badge content for one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub color: &'static str,
}

/// Compute the badge for a volume/mute pair.
#[must_use]
pub fn badge_for(volume_percent: u32, is_muted: bool) -> Badge {
    if is_muted {
        return Badge {
            text: MUTED_BADGE_TEXT.to_owned(),
            color: COLOR_MUTED,
        };
    }
    let color = match volume_percent {
        0 => COLOR_SILENT,
        1..=100 => COLOR_NORMAL,
        101..=300 => COLOR_BOOSTED,
        _ => COLOR_EXTREME,
    };
    Badge {
        text: volume_percent.to_string(),
        color,
    }
}

/// Fire-and-forget badge update sink, owned by the host runtime.
pub trait BadgeSink: Send + Sync {
    fn update(&self, tab: TabId, volume_percent: u32, is_muted: bool);
}

/// Sink that drops updates; used where no badge surface exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBadge;

impl BadgeSink for NoBadge {
    fn update(&self, _tab: TabId, _volume_percent: u32, _is_muted: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_badge_overrides_volume() {
        let badge = badge_for(250, true);
        assert_eq!(badge.text, MUTED_BADGE_TEXT);
        assert_eq!(badge.color, COLOR_MUTED);
    }

    #[test]
    fn badge_colors_follow_volume_tiers() {
        assert_eq!(badge_for(0, false).color, COLOR_SILENT);
        assert_eq!(badge_for(80, false).color, COLOR_NORMAL);
        assert_eq!(badge_for(100, false).color, COLOR_NORMAL);
        assert_eq!(badge_for(150, false).color, COLOR_BOOSTED);
        assert_eq!(badge_for(300, false).color, COLOR_BOOSTED);
        assert_eq!(badge_for(450, false).color, COLOR_EXTREME);
    }

    #[test]
    fn badge_text_is_the_full_percentage() {
        assert_eq!(badge_for(600, false).text, "600");
    }
}
