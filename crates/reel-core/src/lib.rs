#![forbid(unsafe_code)]

//! Core: input events, reorder intents, and the drag-handle gesture machine.
//!
//! # Role in Reel
//! `reel-core` is the DOM-free half of the card reorder controller. It owns
//! the gesture phase machine, the intent contract with list containers,
//! the cosmetic drag transform, and configuration/preferences.
//!
//! # Primary responsibilities
//! - **HandleGestureMachine**: explicit `Idle → ArmingTimer → Dragging →
//!   Settling` lifecycle with host-driven deadlines.
//! - **ReorderIntent / ReorderListener**: what a handle tells its list.
//! - **DragTransform**: rotate/scale feedback, never used for hit testing.
//! - **GestureConfig / PreferenceStore**: tunables and the hold-profile flag.
//!
//! # How it fits in the system
//! `reel-web` wraps the machine in a `DragHandle` that resolves hovered
//! cards from the document, applies styles and swipe suppression, and
//! returns intents to the list container.

pub mod config;
pub mod event;
pub mod feedback;
pub mod geometry;
pub mod gesture;
pub mod intent;
pub mod logging;
pub mod preference;

pub use config::{ConfigLoadError, GestureConfig, GestureConfigError};
pub use event::{HandleInput, KeyCode, NativeDragEvent, TouchPoint};
pub use feedback::{DragTransform, FeedbackConfig};
pub use geometry::{Point, Rect};
pub use gesture::{
    CancelReason, DragInputKind, GestureEffect, GestureInput, GestureNoopReason, GesturePhase,
    GesturePhaseKind, GestureSession, GestureTransition, HandleGestureMachine,
};
pub use intent::{DragIntentEvent, ReorderDirection, ReorderIntent, ReorderListener, deliver};
pub use preference::{
    HoldProfile, JsonFilePreferences, MemoryPreferences, PreferenceError, PreferenceStore,
};
