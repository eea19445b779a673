use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SettingsFile: deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_by_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub better_rendering: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimap_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slider_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_offset: Option<u32>,
}

// ---------------------------------------------------------------------------
// Settings: resolved (all fields concrete, clamped to their domains)
// ---------------------------------------------------------------------------

pub const SCALE_RANGE: (f64, f64) = (0.05, 0.3);
pub const OPACITY_RANGE: (f64, f64) = (0.05, 1.0);
pub const MAX_TOP_OFFSET: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Seed for the per-document toggle; documents already seen keep theirs.
    pub enabled_by_default: bool,
    /// Source thumbnails from shadow views instead of the live surface.
    pub better_rendering: bool,
    pub scale: f64,
    /// Alpha of the thumbnail background.
    pub minimap_opacity: f64,
    pub slider_opacity: f64,
    /// Pixels between the top of the view and the thumbnail.
    pub top_offset: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_by_default: true,
            better_rendering: false,
            scale: 0.1,
            minimap_opacity: 0.3,
            slider_opacity: 0.3,
            top_offset: 0,
        }
    }
}

fn clamp_or(value: Option<f64>, (lo, hi): (f64, f64), default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(lo, hi),
        Some(v) => {
            debug!("settings: ignoring non-finite value {v}");
            default
        }
        None => default,
    }
}

impl SettingsFile {
    /// Resolve to concrete settings, applying defaults and clamping.
    pub fn resolve(self) -> Settings {
        let d = Settings::default();
        let settings = Settings {
            enabled_by_default: self.enabled_by_default.unwrap_or(d.enabled_by_default),
            better_rendering: self.better_rendering.unwrap_or(d.better_rendering),
            scale: clamp_or(self.scale, SCALE_RANGE, d.scale),
            minimap_opacity: clamp_or(self.minimap_opacity, OPACITY_RANGE, d.minimap_opacity),
            slider_opacity: clamp_or(self.slider_opacity, OPACITY_RANGE, d.slider_opacity),
            top_offset: self.top_offset.unwrap_or(d.top_offset).min(MAX_TOP_OFFSET),
        };
        info!(
            "settings: resolved enabled_by_default={}, better_rendering={}, scale={}, \
             minimap_opacity={}, slider_opacity={}, top_offset={}",
            settings.enabled_by_default,
            settings.better_rendering,
            settings.scale,
            settings.minimap_opacity,
            settings.slider_opacity,
            settings.top_offset,
        );
        settings
    }
}

impl From<&Settings> for SettingsFile {
    fn from(s: &Settings) -> Self {
        Self {
            enabled_by_default: Some(s.enabled_by_default),
            better_rendering: Some(s.better_rendering),
            scale: Some(s.scale),
            minimap_opacity: Some(s.minimap_opacity),
            slider_opacity: Some(s.slider_opacity),
            top_offset: Some(s.top_offset),
        }
    }
}

/// Resolve the XDG settings path for notemap.
pub fn settings_path() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(config_dir.join("notemap").join("settings.toml"))
}

/// Load the settings file. Returns `SettingsFile::default()` if no file exists.
pub fn load_settings() -> anyhow::Result<SettingsFile> {
    match settings_path() {
        Some(p) => load_settings_from(&p),
        None => {
            info!("settings: no HOME or XDG_CONFIG_HOME set, using defaults");
            Ok(SettingsFile::default())
        }
    }
}

/// Load a settings file from `path`.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings_from(path: &Path) -> anyhow::Result<SettingsFile> {
    debug!("settings: looking for {}", path.display());
    match std::fs::read_to_string(path) {
        Ok(text) => {
            info!("settings: loaded from {}", path.display());
            let file: SettingsFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(file)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("settings: {} not found, using defaults", path.display());
            Ok(SettingsFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}

/// Persist `settings` to the XDG settings path.
pub fn save_settings(settings: &Settings) -> anyhow::Result<()> {
    let path = settings_path()
        .ok_or_else(|| anyhow::anyhow!("no HOME or XDG_CONFIG_HOME set, cannot save settings"))?;
    save_settings_to(&path, settings)
}

/// Write `settings` to `path`, creating parent directories as needed.
pub fn save_settings_to(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(&SettingsFile::from(settings))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", parent.display()))?;
    }
    std::fs::write(path, text)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    info!("settings: saved to {}", path.display());
    Ok(())
}
