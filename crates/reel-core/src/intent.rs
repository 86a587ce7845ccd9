#![forbid(unsafe_code)]

//! Reorder intents emitted by a drag handle to its list container.
//!
//! The handle never mutates list order. It only reports what the user is
//! trying to do; the container decides what that means for the list.
//!
//! # Invariants
//!
//! 1. Per session, `DragStart` is emitted at most once and always first.
//! 2. `TouchDragMove` only appears between a touch `DragStart` and the
//!    matching `DragEnd` (or cancellation, which emits nothing).
//! 3. `KeyboardReorder` is independent of any session.

use serde::{Deserialize, Serialize};

use crate::event::{KeyCode, NativeDragEvent, TouchPoint};

/// Event payload handed to drag-start and touch-move listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragIntentEvent {
    /// Touch-hold drag: carries the touch list of the originating gesture.
    Touch { touches: Vec<TouchPoint> },
    /// Native pointer drag.
    Pointer { native: NativeDragEvent },
}

impl DragIntentEvent {
    #[must_use]
    pub const fn is_touch(&self) -> bool {
        matches!(self, Self::Touch { .. })
    }
}

/// Direction of a keyboard reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderDirection {
    Up,
    Down,
}

impl ReorderDirection {
    /// Wire name (`"up"` / `"down"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Map a focused-handle key press to a reorder direction.
    #[must_use]
    pub const fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::ArrowUp => Some(Self::Up),
            KeyCode::ArrowDown => Some(Self::Down),
            _ => None,
        }
    }
}

/// A reorder intent for the list container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum ReorderIntent {
    DragStart {
        item_id: String,
        event: DragIntentEvent,
        index: usize,
    },
    TouchDragMove {
        event: DragIntentEvent,
        target_index: usize,
    },
    DragEnd,
    KeyboardReorder {
        direction: ReorderDirection,
    },
}

/// Callback seam for list containers.
///
/// [`deliver`] routes intents to these methods in emission order.
pub trait ReorderListener {
    fn on_drag_start(&mut self, item_id: &str, event: &DragIntentEvent, index: usize);

    fn on_touch_drag_move(&mut self, event: &DragIntentEvent, target_index: usize);

    fn on_drag_end(&mut self);

    fn on_keyboard_reorder(&mut self, direction: ReorderDirection);
}

/// Deliver a batch of intents to a listener, in order.
pub fn deliver<'a, L>(intents: impl IntoIterator<Item = &'a ReorderIntent>, listener: &mut L)
where
    L: ReorderListener + ?Sized,
{
    for intent in intents {
        match intent {
            ReorderIntent::DragStart {
                item_id,
                event,
                index,
            } => listener.on_drag_start(item_id, event, *index),
            ReorderIntent::TouchDragMove {
                event,
                target_index,
            } => listener.on_touch_drag_move(event, *target_index),
            ReorderIntent::DragEnd => listener.on_drag_end(),
            ReorderIntent::KeyboardReorder { direction } => {
                listener.on_keyboard_reorder(*direction);
            }
        }
    }
}
