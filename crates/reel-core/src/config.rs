#![forbid(unsafe_code)]

//! Gesture controller configuration.
//!
//! Captures every tunable of the drag handle as a single [`GestureConfig`]
//! that can be loaded from JSON (or TOML with the `config-toml` feature).
//! Durations are stored as whole milliseconds on the wire.
//!
//! ```toml
//! quick_hold_ms = 200
//! legacy_hold_ms = 400
//! move_cancel_px = 10.0
//!
//! [feedback]
//! max_rotation_deg = 8.0
//! ```
//!
//! # Defaults
//!
//! `GestureConfig::default()` reproduces the shipped behavior: 200 ms hold
//! (400 ms legacy), 10 px movement cancel, 300 ms settle transition with the
//! stacking override held for 600 ms, and a 15 ms haptic pulse.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackConfig;

/// Preference key holding the quick-hold flag.
pub const DEFAULT_HOLD_PREFERENCE_KEY: &str = "reel.quickDragHold";

/// Tunables for one drag handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Long-press duration for the default (quick) hold profile.
    #[serde(rename = "quick_hold_ms", with = "duration_ms")]
    pub quick_hold: Duration,
    /// Long-press duration for the legacy hold profile.
    #[serde(rename = "legacy_hold_ms", with = "duration_ms")]
    pub legacy_hold: Duration,
    /// Movement (per axis, CSS px) that cancels an armed long-press.
    pub move_cancel_px: f32,
    /// Duration of the CSS transition used to animate back to neutral.
    #[serde(rename = "settle_transition_ms", with = "duration_ms")]
    pub settle_transition: Duration,
    /// How long the stacking override is held after release.
    #[serde(rename = "settle_ms", with = "duration_ms")]
    pub settle: Duration,
    /// Vibration pulse requested when a touch drag begins.
    #[serde(rename = "haptic_pulse_ms", with = "duration_ms")]
    pub haptic_pulse: Duration,
    /// z-index applied to the card while it is dragged or settling.
    pub elevated_z_index: i32,
    /// Preference key consulted at session start for the hold profile.
    pub hold_preference_key: String,
    pub feedback: FeedbackConfig,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            quick_hold: Duration::from_millis(200),
            legacy_hold: Duration::from_millis(400),
            move_cancel_px: 10.0,
            settle_transition: Duration::from_millis(300),
            settle: Duration::from_millis(600),
            haptic_pulse: Duration::from_millis(15),
            elevated_z_index: 1000,
            hold_preference_key: DEFAULT_HOLD_PREFERENCE_KEY.to_owned(),
            feedback: FeedbackConfig::default(),
        }
    }
}

impl GestureConfig {
    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigLoadError::Json)?;
        config.check().map_err(ConfigLoadError::Invalid)?;
        Ok(config)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigLoadError::Io)?;
        Self::from_json_str(&content)
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(s).map_err(ConfigLoadError::Toml)?;
        config.check().map_err(ConfigLoadError::Invalid)?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-toml")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigLoadError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigLoadError> {
        serde_json::to_string_pretty(self).map_err(ConfigLoadError::Json)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of human-readable problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.quick_hold.is_zero() {
            errors.push("quick_hold_ms must be > 0".into());
        }
        if self.legacy_hold.is_zero() {
            errors.push("legacy_hold_ms must be > 0".into());
        }
        if !self.move_cancel_px.is_finite() || self.move_cancel_px < 0.0 {
            errors.push(format!(
                "move_cancel_px must be finite and >= 0, got {}",
                self.move_cancel_px
            ));
        }
        if self.settle < self.settle_transition {
            errors.push(format!(
                "settle_ms ({}) must be >= settle_transition_ms ({})",
                self.settle.as_millis(),
                self.settle_transition.as_millis()
            ));
        }
        let fb = &self.feedback;
        for (name, value) in [
            ("feedback.rotation_per_px", fb.rotation_per_px),
            ("feedback.max_rotation_deg", fb.max_rotation_deg),
            ("feedback.scale_per_px", fb.scale_per_px),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be finite and >= 0, got {value}"));
            }
        }
        if !fb.max_scale.is_finite() || fb.max_scale < 1.0 {
            errors.push(format!(
                "feedback.max_scale must be finite and >= 1, got {}",
                fb.max_scale
            ));
        }
        if self.hold_preference_key.is_empty() {
            errors.push("hold_preference_key must not be empty".into());
        }
        errors
    }

    /// Structured validation: the first problem found, if any.
    pub fn check(&self) -> Result<(), GestureConfigError> {
        if self.quick_hold.is_zero() {
            return Err(GestureConfigError::ZeroHold { profile: "quick" });
        }
        if self.legacy_hold.is_zero() {
            return Err(GestureConfigError::ZeroHold { profile: "legacy" });
        }
        if !self.move_cancel_px.is_finite() || self.move_cancel_px < 0.0 {
            return Err(GestureConfigError::InvalidMoveThreshold {
                px: self.move_cancel_px,
            });
        }
        if self.settle < self.settle_transition {
            return Err(GestureConfigError::SettleShorterThanTransition {
                settle: self.settle,
                transition: self.settle_transition,
            });
        }
        if self.hold_preference_key.is_empty() {
            return Err(GestureConfigError::EmptyPreferenceKey);
        }
        match self.validate().into_iter().next() {
            Some(message) => Err(GestureConfigError::InvalidFeedback(message)),
            None => Ok(()),
        }
    }
}

/// Gesture configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureConfigError {
    ZeroHold { profile: &'static str },
    InvalidMoveThreshold { px: f32 },
    SettleShorterThanTransition { settle: Duration, transition: Duration },
    EmptyPreferenceKey,
    InvalidFeedback(String),
}

impl fmt::Display for GestureConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroHold { profile } => write!(f, "{profile} hold duration must be > 0"),
            Self::InvalidMoveThreshold { px } => {
                write!(f, "movement cancel threshold must be finite and >= 0 (got {px})")
            }
            Self::SettleShorterThanTransition { settle, transition } => write!(
                f,
                "stacking override ({settle:?}) must outlive the settle transition ({transition:?})"
            ),
            Self::EmptyPreferenceKey => write!(f, "hold preference key must not be empty"),
            Self::InvalidFeedback(message) => write!(f, "invalid feedback tuning: {message}"),
        }
    }
}

impl std::error::Error for GestureConfigError {}

/// Errors from loading a configuration file.
#[derive(Debug)]
pub enum ConfigLoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    #[cfg(feature = "config-toml")]
    Toml(toml::de::Error),
    Invalid(GestureConfigError),
}

impl fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Json(e) => write!(f, "config JSON error: {e}"),
            #[cfg(feature = "config-toml")]
            Self::Toml(e) => write!(f, "config TOML error: {e}"),
            Self::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            #[cfg(feature = "config-toml")]
            Self::Toml(e) => Some(e),
            Self::Invalid(e) => Some(e),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
