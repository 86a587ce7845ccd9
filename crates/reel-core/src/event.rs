#![forbid(unsafe_code)]

//! Raw input events delivered by the host to a drag handle.
//!
//! These mirror the browser events the handle listens to (`touchstart`,
//! `touchmove`, `touchend`, `touchcancel`, `dragstart`, `dragend`,
//! `keydown`), reduced to the fields the controller actually reads.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// One contact point of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Host-assigned touch identifier.
    pub identifier: i32,
    /// Viewport-relative position.
    pub client: Point,
}

impl TouchPoint {
    /// Create a new touch point.
    #[must_use]
    pub const fn new(identifier: i32, client: Point) -> Self {
        Self { identifier, client }
    }
}

/// The subset of a native HTML5 drag event the controller forwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeDragEvent {
    pub client: Point,
}

impl NativeDragEvent {
    #[must_use]
    pub const fn new(client: Point) -> Self {
        Self { client }
    }
}

/// Keys the handle can receive while focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Tab,
    Char(char),
}

impl KeyCode {
    /// Parse a DOM `KeyboardEvent.key` value.
    #[must_use]
    pub fn from_dom_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(Self::ArrowUp),
            "ArrowDown" => Some(Self::ArrowDown),
            "ArrowLeft" => Some(Self::ArrowLeft),
            "ArrowRight" => Some(Self::ArrowRight),
            "Enter" => Some(Self::Enter),
            "Escape" => Some(Self::Escape),
            "Tab" => Some(Self::Tab),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Self::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

/// A raw input delivered to a handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandleInput {
    TouchStart { touches: Vec<TouchPoint> },
    TouchMove { touches: Vec<TouchPoint> },
    TouchEnd,
    TouchCancel,
    NativeDragStart { native: NativeDragEvent },
    NativeDragEnd { native: NativeDragEvent },
    KeyDown { key: KeyCode },
    Focus,
    Blur,
}

impl HandleInput {
    /// Primary contact point of a touch input, if any.
    #[must_use]
    pub fn primary_touch(&self) -> Option<TouchPoint> {
        match self {
            Self::TouchStart { touches } | Self::TouchMove { touches } => touches.first().copied(),
            _ => None,
        }
    }
}
