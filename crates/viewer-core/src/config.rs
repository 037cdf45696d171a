//! Viewer configuration
//!
//! Zoom bounds, the annotation debounce delay and overlay styling. Values
//! come from defaults, a TOML file, or `DOCVIEW_*` environment variables.

use crate::surface::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the viewer controller and overlay renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Smallest zoom scale
    pub min_scale: f32,
    /// Largest zoom scale
    pub max_scale: f32,
    /// Factor applied by one zoom in / zoom out step
    pub zoom_step: f32,
    /// Scale used on first load and on zoom reset
    pub initial_scale: f32,
    /// Delay between an annotation update and the overlay redraw
    pub debounce_ms: u64,
    /// Gap kept between a scrolled-to region and the viewport edge, in pixels
    pub scroll_margin: f32,
    /// Overlay styling
    pub style: OverlayStyle,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.5,
            max_scale: 5.0,
            zoom_step: 1.2,
            initial_scale: 1.0,
            debounce_ms: 10,
            scroll_margin: 50.0,
            style: OverlayStyle::default(),
        }
    }
}

/// Colors and metrics for highlight regions and their labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    #[serde(with = "hex_color")]
    pub fill: Color,
    #[serde(with = "hex_color")]
    pub stroke: Color,
    pub stroke_width: f32,
    #[serde(with = "hex_color")]
    pub label_background: Color,
    #[serde(with = "hex_color")]
    pub label_text: Color,
    pub label_font_size: f32,
    pub label_padding: f32,
    /// Label externally supplied regions with their keys
    pub label_keys: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill: Color::HIGHLIGHT,
            stroke: Color::HIGHLIGHT_STROKE,
            stroke_width: 2.0,
            label_background: Color::HIGHLIGHT_STROKE,
            label_text: Color::BLACK,
            label_font_size: 12.0,
            label_padding: 4.0,
            label_keys: false,
        }
    }
}

mod hex_color {
    use crate::surface::Color;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&color.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Color::from_hex(&hex).ok_or_else(|| de::Error::custom(format!("invalid color {hex:?}")))
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the zoom bounds.
    pub fn with_scale_bounds(mut self, min_scale: f32, max_scale: f32) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self
    }

    /// Sets the zoom step factor.
    pub fn with_zoom_step(mut self, zoom_step: f32) -> Self {
        self.zoom_step = zoom_step;
        self
    }

    /// Sets the initial scale.
    pub fn with_initial_scale(mut self, initial_scale: f32) -> Self {
        self.initial_scale = initial_scale;
        self
    }

    /// Sets the annotation debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the overlay style.
    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Clamp `scale` into the configured bounds.
    ///
    /// Never panics: inverted bounds are swapped and a NaN bound or scale
    /// falls back to the other operand.
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        let (low, high) = if self.max_scale < self.min_scale {
            (self.max_scale, self.min_scale)
        } else {
            (self.min_scale, self.max_scale)
        };
        scale.max(low).min(high)
    }

    /// Check bounds and factors for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_scale.is_nan() || self.min_scale <= 0.0 {
            return Err(ConfigError::InvalidValue("min_scale".to_string()));
        }
        if self.max_scale.is_nan() || self.max_scale < self.min_scale {
            return Err(ConfigError::InvalidValue("max_scale".to_string()));
        }
        if self.zoom_step.is_nan() || self.zoom_step <= 1.0 {
            return Err(ConfigError::InvalidValue("zoom_step".to_string()));
        }
        if self.initial_scale.is_nan() || self.initial_scale <= 0.0 {
            return Err(ConfigError::InvalidValue("initial_scale".to_string()));
        }
        Ok(())
    }

    /// Returns the default config file location for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/docview/config.toml
    /// - Linux: ~/.config/docview/config.toml
    /// - Windows: %APPDATA%\docview\config.toml
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("docview").join("config.toml"),
            None => PathBuf::from("docview.toml"),
        }
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `DOCVIEW_MIN_SCALE`, `DOCVIEW_MAX_SCALE`: zoom bounds
    /// - `DOCVIEW_ZOOM_STEP`: zoom factor per step
    /// - `DOCVIEW_INITIAL_SCALE`: scale on load
    /// - `DOCVIEW_DEBOUNCE_MS`: annotation debounce in milliseconds
    /// - `DOCVIEW_SCROLL_MARGIN`: scroll-into-view margin in pixels
    ///
    /// # Errors
    /// Returns an error if any variable holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    /// Apply `DOCVIEW_*` overrides to this configuration.
    pub fn merge_env(mut self) -> Result<Self, ConfigError> {
        if let Some(value) = env_value("DOCVIEW_MIN_SCALE")? {
            self.min_scale = value;
        }
        if let Some(value) = env_value("DOCVIEW_MAX_SCALE")? {
            self.max_scale = value;
        }
        if let Some(value) = env_value("DOCVIEW_ZOOM_STEP")? {
            self.zoom_step = value;
        }
        if let Some(value) = env_value("DOCVIEW_INITIAL_SCALE")? {
            self.initial_scale = value;
        }
        if let Some(value) = env_value("DOCVIEW_DEBOUNCE_MS")? {
            self.debounce_ms = value;
        }
        if let Some(value) = env_value("DOCVIEW_SCROLL_MARGIN")? {
            self.scroll_margin = value;
        }

        self.validate()?;
        Ok(self)
    }

    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path.as_ref(), self.to_toml()?)?;
        Ok(())
    }

    /// Converts configuration to TOML format.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(None),
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
