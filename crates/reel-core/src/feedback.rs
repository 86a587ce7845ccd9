#![forbid(unsafe_code)]

//! Cosmetic drag feedback: the rotate/scale transform applied to a card
//! while it is being touch-dragged.
//!
//! The transform is derived purely from the displacement since the gesture
//! origin. Nothing in here participates in target resolution: hit testing
//! works on untransformed layout boxes.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Tuning for the drag feedback transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Degrees of rotation per pixel of vertical displacement.
    pub rotation_per_px: f32,
    /// Rotation magnitude cap in degrees.
    pub max_rotation_deg: f32,
    /// Scale increase per pixel of total displacement.
    pub scale_per_px: f32,
    /// Scale cap.
    pub max_scale: f32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            rotation_per_px: 0.05,
            max_rotation_deg: 8.0,
            scale_per_px: 0.000_8,
            max_scale: 1.08,
        }
    }
}

/// A translate/rotate/scale transform for the dragged card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragTransform {
    pub translate: Point,
    pub rotate_deg: f32,
    pub scale: f32,
}

impl Default for DragTransform {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl DragTransform {
    /// Identity transform the card settles back to.
    pub const NEUTRAL: Self = Self {
        translate: Point::ZERO,
        rotate_deg: 0.0,
        scale: 1.0,
    };

    /// Transform for a displacement of `delta` from the gesture origin.
    #[must_use]
    pub fn from_delta(delta: Point, config: &FeedbackConfig) -> Self {
        let max_rotation = config.max_rotation_deg.abs();
        let rotate_deg = (delta.y * config.rotation_per_px).clamp(-max_rotation, max_rotation);
        let scale = (1.0 + delta.length() * config.scale_per_px).clamp(1.0, config.max_scale.max(1.0));
        Self {
            translate: delta,
            rotate_deg,
            scale,
        }
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// CSS `transform` value.
    #[must_use]
    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) rotate({}deg) scale({})",
            self.translate.x, self.translate.y, self.rotate_deg, self.scale
        )
    }
}
