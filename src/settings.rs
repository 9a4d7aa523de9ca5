use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::preload::{
    ACCEPTABLE_RATIO_DIFFERENCE, CSS_UNITS, HEIGHT_PADDING_PX, MAX_AUTO_SCALE, MAX_PRELOAD_PAGES,
    PAGE_URL_TOKEN, WIDTH_PADDING_PX,
};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "docpreload";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid setting `{field}`: {detail}")]
    Invalid { field: &'static str, detail: String },
}

/// Tunables for preload sizing, metadata validation and fetch fan-out.
///
/// The padding and zoom defaults match the full renderer's fit-to-width
/// policy so the handoff does not visibly resize pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Cap for the automatic zoom; `null` disables the cap
    #[serde(default = "default_max_zoom_scale")]
    pub max_zoom_scale: Option<f64>,

    #[serde(default = "default_width_padding")]
    pub width_padding_px: f64,

    #[serde(default = "default_height_padding")]
    pub height_padding_px: f64,

    /// Points to pixels factor applied to embedded geometry
    #[serde(default = "default_css_units")]
    pub css_units: f64,

    /// Total page images fetched per preload, primary included
    #[serde(default = "default_max_preload_pages")]
    pub max_preload_pages: usize,

    #[serde(default = "default_ratio_tolerance")]
    pub ratio_tolerance: f64,

    #[serde(default = "default_page_token")]
    pub page_token: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_max_zoom_scale() -> Option<f64> {
    Some(MAX_AUTO_SCALE)
}

fn default_width_padding() -> f64 {
    WIDTH_PADDING_PX
}

fn default_height_padding() -> f64 {
    HEIGHT_PADDING_PX
}

fn default_css_units() -> f64 {
    CSS_UNITS
}

fn default_max_preload_pages() -> usize {
    MAX_PRELOAD_PAGES
}

fn default_ratio_tolerance() -> f64 {
    ACCEPTABLE_RATIO_DIFFERENCE
}

fn default_page_token() -> String {
    PAGE_URL_TOKEN.to_string()
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            max_zoom_scale: default_max_zoom_scale(),
            width_padding_px: default_width_padding(),
            height_padding_px: default_height_padding(),
            css_units: default_css_units(),
            max_preload_pages: default_max_preload_pages(),
            ratio_tolerance: default_ratio_tolerance(),
            page_token: default_page_token(),
        }
    }
}

impl PreloadSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_preload_pages == 0 {
            return Err(SettingsError::Invalid {
                field: "max_preload_pages",
                detail: "must fetch at least the primary page".to_string(),
            });
        }
        if !(self.ratio_tolerance.is_finite() && self.ratio_tolerance >= 0.0) {
            return Err(SettingsError::Invalid {
                field: "ratio_tolerance",
                detail: format!("{} is not a non-negative number", self.ratio_tolerance),
            });
        }
        if !(self.css_units.is_finite() && self.css_units > 0.0) {
            return Err(SettingsError::Invalid {
                field: "css_units",
                detail: format!("{} is not a positive number", self.css_units),
            });
        }
        if let Some(scale) = self.max_zoom_scale {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(SettingsError::Invalid {
                    field: "max_zoom_scale",
                    detail: format!("{scale} is not a positive number"),
                });
            }
        }
        if self.page_token.is_empty() {
            return Err(SettingsError::Invalid {
                field: "page_token",
                detail: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path`, or from the user config directory when no
/// path is given. A missing file yields defaults.
pub fn load_settings(path: Option<&Path>) -> Result<PreloadSettings, SettingsError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match preferred_config_path() {
            Some(path) if path.exists() => path,
            Some(path) => {
                debug!("No settings at {path:?}, using defaults");
                return Ok(PreloadSettings::default());
            }
            None => {
                warn!("Could not determine config directory, using default settings");
                return Ok(PreloadSettings::default());
            }
        },
    };

    let settings = load_settings_from_path(&path)?;
    settings.validate()?;
    Ok(settings)
}

fn load_settings_from_path(path: &Path) -> Result<PreloadSettings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings: PreloadSettings =
        serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
    }

    Ok(settings)
}

fn migrate_settings(settings: &mut PreloadSettings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}
