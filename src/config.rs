//! Configuration module for persistent gesture settings.
//!
//! This module handles loading, merging, normalizing and saving the gesture
//! configuration. Out-of-range values are clamped, never rejected.

use crate::error::ConfigError;
use crate::geometry::{clamp_int, Rect};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

/// Fallback screen size used when a stored dimension is not positive.
const FALLBACK_SCREEN_W: i32 = 1080;
const FALLBACK_SCREEN_H: i32 = 2248;

/// Gesture configuration.
///
/// Key names match the JSON documents the control surface exchanges.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GestureConfig {
    pub enabled: bool,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Base swipe duration in ms.
    pub duration: i32,
    pub screen_w: i32,
    pub screen_h: i32,
    pub delay_hover: i32,
    pub delay_press: i32,
    /// Interval between curve steps in ms.
    pub delay_interval: i32,
    /// Bezier bend, percent of the swipe distance.
    pub curve_strength: i32,
    /// Delay before the redundant release frame.
    pub double_check: i32,
    pub interval_min_sec: i32,
    pub interval_max_sec: i32,
    /// Swipe length as a percent of the rectangle height.
    pub length_percent: i32,
    pub length_jitter_percent: i32,
    pub duration_jitter_percent: i32,
    pub delay_jitter_percent: i32,
    pub double_tap_enabled: bool,
    pub double_tap_prob_percent: i32,
    pub double_tap_prob_jitter_percent: i32,
    pub double_tap_interval_ms: i32,
    pub double_tap_interval_jitter_percent: i32,
    pub double_tap_edge_min_ms: i32,
    pub double_tap_edge_max_ms: i32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            x1: 540,
            y1: 1248,
            x2: 540,
            y2: 1000,
            duration: 250,
            screen_w: 1080,
            screen_h: 2250,
            delay_hover: 30,
            delay_press: 30,
            delay_interval: 10,
            curve_strength: 20,
            double_check: 20,
            interval_min_sec: 5,
            interval_max_sec: 45,
            length_percent: 80,
            length_jitter_percent: 15,
            duration_jitter_percent: 20,
            delay_jitter_percent: 15,
            double_tap_enabled: true,
            double_tap_prob_percent: 30,
            double_tap_prob_jitter_percent: 20,
            double_tap_interval_ms: 120,
            double_tap_interval_jitter_percent: 30,
            double_tap_edge_min_ms: 400,
            double_tap_edge_max_ms: 1200,
        }
    }
}

impl GestureConfig {
    /// Clamp every field into its legal range.
    ///
    /// Total and idempotent; each field is checked independently of the
    /// others except for the declared pairs (interval max/min, edge max/min).
    pub fn normalize(&mut self) {
        self.interval_min_sec = self.interval_min_sec.max(1);
        self.interval_max_sec = self.interval_max_sec.max(self.interval_min_sec);
        if self.screen_w <= 0 {
            self.screen_w = FALLBACK_SCREEN_W;
        }
        if self.screen_h <= 0 {
            self.screen_h = FALLBACK_SCREEN_H;
        }
        self.duration = self.duration.max(30);
        self.length_percent = clamp_int(self.length_percent, 20, 200);
        self.length_jitter_percent = clamp_int(self.length_jitter_percent, 0, 80);
        self.duration_jitter_percent = clamp_int(self.duration_jitter_percent, 0, 80);
        self.delay_jitter_percent = clamp_int(self.delay_jitter_percent, 0, 80);
        self.delay_hover = clamp_int(self.delay_hover, 0, 5000);
        self.delay_press = clamp_int(self.delay_press, 0, 5000);
        self.double_check = clamp_int(self.double_check, 0, 5000);
        self.delay_interval = clamp_int(self.delay_interval, 1, 200);
        self.curve_strength = clamp_int(self.curve_strength, 0, 100);
        self.double_tap_prob_percent = clamp_int(self.double_tap_prob_percent, 0, 100);
        self.double_tap_prob_jitter_percent =
            clamp_int(self.double_tap_prob_jitter_percent, 0, 100);
        self.double_tap_interval_ms = self.double_tap_interval_ms.max(40);
        self.double_tap_interval_jitter_percent =
            clamp_int(self.double_tap_interval_jitter_percent, 0, 200);
        self.double_tap_edge_min_ms = self.double_tap_edge_min_ms.max(100);
        self.double_tap_edge_max_ms = self
            .double_tap_edge_max_ms
            .max(self.double_tap_edge_min_ms.saturating_add(50));
    }

    /// Return a normalized copy.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// The swipe working rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.x1, self.y1, self.x2, self.y2)
    }
}

/// Partial configuration update. Absent fields keep their previous value.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GestureConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Legacy spelling of `enabled`; applied after it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x1: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y1: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x2: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_w: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_h: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_hover: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_press: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_interval: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve_strength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_check: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_min_sec: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_max_sec: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_jitter_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_jitter_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_jitter_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_tap_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_tap_prob_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_tap_prob_jitter_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_tap_interval_ms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_tap_interval_jitter_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_tap_edge_min_ms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_tap_edge_max_ms: Option<i32>,
}

macro_rules! merge_fields {
    ($patch:expr, $config:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $config.$field = value;
            }
        )+
    };
}

impl GestureConfigPatch {
    /// Parse a JSON patch document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Build a patch from `application/x-www-form-urlencoded` fields.
    ///
    /// Keys and values are percent-decoded, with `+` read as a space.
    /// Checkboxes are only submitted when ticked, so an absent `enabled` or
    /// `double_tap_enabled` means false. Numeric fields that fail to parse
    /// are left out of the patch.
    pub fn from_form(body: &str) -> Self {
        let mut patch = Self {
            enabled: Some(false),
            double_tap_enabled: Some(false),
            ..Self::default()
        };

        for pair in body.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let Some(key) = decode_form_component(raw_key) else {
                warn!("Ignoring undecodable form field {:?}", raw_key);
                continue;
            };
            let value = decode_form_component(raw_value).unwrap_or_default();
            let number = value.trim().parse::<i32>().ok();
            match key.as_str() {
                "enabled" => patch.enabled = Some(true),
                "double_tap_enabled" => patch.double_tap_enabled = Some(true),
                "x1" => patch.x1 = number.or(patch.x1),
                "y1" => patch.y1 = number.or(patch.y1),
                "x2" => patch.x2 = number.or(patch.x2),
                "y2" => patch.y2 = number.or(patch.y2),
                "duration" => patch.duration = number.or(patch.duration),
                "screen_w" => patch.screen_w = number.or(patch.screen_w),
                "screen_h" => patch.screen_h = number.or(patch.screen_h),
                "delay_hover" => patch.delay_hover = number.or(patch.delay_hover),
                "delay_press" => patch.delay_press = number.or(patch.delay_press),
                "delay_interval" => patch.delay_interval = number.or(patch.delay_interval),
                "curve_strength" => patch.curve_strength = number.or(patch.curve_strength),
                "double_check" => patch.double_check = number.or(patch.double_check),
                "interval_min_sec" => patch.interval_min_sec = number.or(patch.interval_min_sec),
                "interval_max_sec" => patch.interval_max_sec = number.or(patch.interval_max_sec),
                "length_percent" => patch.length_percent = number.or(patch.length_percent),
                "length_jitter_percent" => {
                    patch.length_jitter_percent = number.or(patch.length_jitter_percent)
                }
                "duration_jitter_percent" => {
                    patch.duration_jitter_percent = number.or(patch.duration_jitter_percent)
                }
                "delay_jitter_percent" => {
                    patch.delay_jitter_percent = number.or(patch.delay_jitter_percent)
                }
                "double_tap_prob_percent" => {
                    patch.double_tap_prob_percent = number.or(patch.double_tap_prob_percent)
                }
                "double_tap_prob_jitter_percent" => {
                    patch.double_tap_prob_jitter_percent =
                        number.or(patch.double_tap_prob_jitter_percent)
                }
                "double_tap_interval_ms" => {
                    patch.double_tap_interval_ms = number.or(patch.double_tap_interval_ms)
                }
                "double_tap_interval_jitter_percent" => {
                    patch.double_tap_interval_jitter_percent =
                        number.or(patch.double_tap_interval_jitter_percent)
                }
                "double_tap_edge_min_ms" => {
                    patch.double_tap_edge_min_ms = number.or(patch.double_tap_edge_min_ms)
                }
                "double_tap_edge_max_ms" => {
                    patch.double_tap_edge_max_ms = number.or(patch.double_tap_edge_max_ms)
                }
                _ => {}
            }
        }

        patch
    }

    /// Merge present fields into `config`. Does not normalize.
    pub fn apply_to(&self, config: &mut GestureConfig) {
        merge_fields!(
            self,
            config,
            enabled,
            x1,
            y1,
            x2,
            y2,
            duration,
            screen_w,
            screen_h,
            delay_hover,
            delay_press,
            delay_interval,
            curve_strength,
            double_check,
            interval_min_sec,
            interval_max_sec,
            length_percent,
            length_jitter_percent,
            duration_jitter_percent,
            delay_jitter_percent,
            double_tap_enabled,
            double_tap_prob_percent,
            double_tap_prob_jitter_percent,
            double_tap_interval_ms,
            double_tap_interval_jitter_percent,
            double_tap_edge_min_ms,
            double_tap_edge_max_ms,
        );
        if let Some(auto_start) = self.auto_start {
            config.enabled = auto_start;
        }
    }
}

fn decode_form_component(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Configuration manager with file I/O.
pub struct ConfigManager {
    config: RwLock<GestureConfig>,
    path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from file or use defaults.
    ///
    /// The stored document is applied as a patch over the defaults, so keys
    /// missing from an older file keep their default value. A corrupt file
    /// is logged and ignored.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let mut config = GestureConfig::default();

        if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| {
                ConfigError::ParseError(format!("Failed to read config file: {}", e))
            })?;

            match GestureConfigPatch::from_json(&contents) {
                Ok(patch) => patch.apply_to(&mut config),
                Err(e) => warn!("Ignoring stored config at {:?}: {}", path, e),
            }
        }

        Ok(Self {
            config: RwLock::new(config.normalized()),
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to file using atomic write.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config = self.get();

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {}", e)))?;

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    /// Get current configuration.
    pub fn get(&self) -> GestureConfig {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|_| GestureConfig::default())
    }

    /// Merge a patch, normalize, persist, and return the new configuration.
    pub fn update(&self, patch: &GestureConfigPatch) -> Result<GestureConfig, ConfigError> {
        let mut current = self
            .config
            .write()
            .map_err(|_| ConfigError::LockPoisoned)?;

        let mut merged = current.clone();
        patch.apply_to(&mut merged);
        merged.normalize();
        *current = merged.clone();

        // Release lock before saving
        drop(current);

        self.save()?;
        Ok(merged)
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the default config path (~/.config/auto-swipe/config.json).
    pub fn default_path() -> PathBuf {
        dirs_config_path().join("config.json")
    }
}

/// Get the config directory path.
fn dirs_config_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config").join("auto-swipe")
    } else {
        PathBuf::from("/tmp/auto-swipe")
    }
}
