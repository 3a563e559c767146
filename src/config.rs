//! Configuration types for the tab-volume core.

use crate::error::{Result, VolumaError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumaConfig {
    /// Volume range and step settings.
    pub volume: VolumeConfig,
    /// Poll intervals for navigation and late media elements.
    pub watch: WatchConfig,
    /// Persisted store location.
    pub storage: StorageConfig,
}

/// Volume range and step configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Upper bound of the volume range, in percent.
    pub max_volume_percent: u32,
    /// Step applied by a single increase/decrease command, in percent.
    pub step_percent: u32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            max_volume_percent: 600,
            step_percent: 20,
        }
    }
}

impl VolumeConfig {
    /// Upper bound of the gain range as a multiplier.
    #[must_use]
    pub fn max_gain(&self) -> f32 {
        self.max_volume_percent as f32 / 100.0
    }
}

/// Poll configuration for the controller's two long-lived timers.
///
/// In-page navigation and late-rendering players have no native hooks in the
/// host document model, so both are observed by bounded polling. The element
/// poll self-cancels once its target is bound or the attempt budget runs out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Interval between URL-change checks, in milliseconds.
    pub navigation_poll_ms: u64,
    /// Interval between dedicated-player lookups, in milliseconds.
    pub element_poll_ms: u64,
    /// Maximum number of dedicated-player lookups before giving up.
    pub element_poll_max_attempts: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            navigation_poll_ms: 1_000,
            element_poll_ms: 500,
            element_poll_max_attempts: 240,
        }
    }
}

/// Persisted store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for the persisted key-value store.
    /// `None` resolves to `~/.voluma`.
    pub root_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the store root, defaulting to `~/.voluma`.
    #[must_use]
    pub fn resolve_root(&self) -> PathBuf {
        if let Some(ref root) = self.root_dir {
            return root.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".voluma")
    }
}

impl VolumaConfig {
    /// Load configuration from a toml file, or defaults when absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let body = std::fs::read_to_string(path)?;
        toml::from_str(&body)
            .map_err(|e| VolumaError::Config(format!("invalid config at {}: {e}", path.display())))
    }

    /// Write configuration to a toml file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(self)
            .map_err(|e| VolumaError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_cover_the_documented_range() {
        let config = VolumaConfig::default();
        assert_eq!(config.volume.max_volume_percent, 600);
        assert_eq!(config.volume.step_percent, 20);
        assert!((config.volume.max_gain() - 6.0).abs() < f32::EPSILON);
        assert_eq!(config.watch.navigation_poll_ms, 1_000);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = VolumaConfig::default();
        config.volume.step_percent = 10;
        config.save(&path).unwrap();

        let loaded = VolumaConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.volume.step_percent, 10);
        assert_eq!(loaded.volume.max_volume_percent, 600);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let loaded = VolumaConfig::load_or_default(Path::new("/nonexistent/voluma.toml")).unwrap();
        assert_eq!(loaded.volume.step_percent, 20);
    }
}
