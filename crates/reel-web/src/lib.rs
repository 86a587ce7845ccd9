#![forbid(unsafe_code)]

//! `reel-web` wires the Reel gesture machine to a document.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding page forwards handle events and
//!   performs the [`HostCommand`]s it gets back.
//! - **Deterministic time**: every call carries a monotonic timestamp and
//!   deadlines are polled via [`DragHandle::tick`]; nothing here sleeps or
//!   spawns.
//! - **Explicit shared state**: swipe suppression lives on the document as
//!   a marker attribute every swipe region reads, and is cleared globally.
//!
//! [`dom::Document`] is a headless stand-in for the browser DOM; a
//! `wasm-bindgen` shell maps real elements onto it one to one.

pub mod dom;
pub mod drag_handle;
pub mod list;
pub mod session_record;
pub mod suppression;

use core::time::Duration;

pub use dom::{Document, DomError, ElementId};
pub use drag_handle::{
    DragHandle, HandleDispatch, HandleIgnoredReason, HandleLifecyclePhase, HandleLogEntry,
    HandleLogOutcome, HostCommand, hovered_index,
};
pub use list::{CardListener, ReorderMove, ReorderableList};
pub use session_record::{HandleRecorder, HandleTrace, TraceError, replay};
pub use suppression::{SwipeDecision, SwipeDirection, SwipeRegion, SwipeSuppression};

/// Monotonic time source for driving handles.
pub trait HostClock {
    /// Time since an arbitrary fixed origin.
    fn now_mono(&self) -> Duration;
}

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time.
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

impl HostClock for DeterministicClock {
    fn now_mono(&self) -> Duration {
        self.now
    }
}

/// Wall clock backed by `performance.now()` on wasm and `Instant` elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: web_time::Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}
