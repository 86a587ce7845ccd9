#![forbid(unsafe_code)]

//! Drag-handle gesture phase machine.
//!
//! [`HandleGestureMachine`] owns the lifecycle of one reorder gesture on one
//! handle. The host feeds it [`GestureInput`]s stamped with a monotonic
//! timestamp and calls [`advance`](HandleGestureMachine::advance) when the
//! deadline from [`next_deadline`](HandleGestureMachine::next_deadline) is
//! reached.
//!
//! # State Machine
//!
//! ```text
//! Idle --touchstart--> ArmingTimer --hold elapsed--> Dragging(touch)
//!                      ArmingTimer --moved > threshold / release / cancel--> Idle
//! Dragging(touch) --touchend--> Settling --settle elapsed--> Idle
//! Dragging(touch) --touchcancel--> Idle
//! Idle --dragstart--> Dragging(pointer) --dragend--> Idle
//! ```
//!
//! # Invariants
//!
//! 1. Exactly one phase is current; a pending hold deadline exists only in
//!    `ArmingTimer`, a settle deadline only in `Settling`.
//! 2. The hovered target index exists only inside `Dragging`.
//! 3. `DragStarted` is produced at most once per session.
//! 4. `touchstart` while `Dragging` is a no-op: no new session, no new deadline.
//! 5. Every input first fires any deadline that is already due, so a hold
//!    that elapsed before a move is observed before that move.
//! 6. After [`force_cancel`](HandleGestureMachine::force_cancel) the machine is
//!    `Idle` with no deadline.
//!
//! # Failure Modes
//!
//! - Inputs that do not apply to the current phase yield a `Noop` transition
//!   with a reason; they never corrupt state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{GestureConfig, GestureConfigError};
use crate::event::{NativeDragEvent, TouchPoint};
use crate::geometry::Point;
use crate::intent::DragIntentEvent;

/// Which input path drives an active drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragInputKind {
    Touch,
    Pointer,
}

/// Per-session data shared by the arming and dragging phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSession {
    /// Caller-supplied identifier; never interpreted.
    pub item_id: String,
    /// Index of the card when the gesture began.
    pub source_index: usize,
    /// Where the gesture began.
    pub origin: Point,
    /// Long-press duration fixed at session start.
    pub hold: Duration,
    /// Touch list of the originating `touchstart` (empty for pointer drags).
    pub touches: Vec<TouchPoint>,
}

/// Current phase of the handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GesturePhase {
    #[default]
    Idle,
    ArmingTimer {
        session: GestureSession,
        deadline: Duration,
    },
    Dragging {
        session: GestureSession,
        input: DragInputKind,
        target_index: Option<usize>,
        current: Point,
    },
    Settling {
        deadline: Duration,
    },
}

impl GesturePhase {
    #[must_use]
    pub const fn kind(&self) -> GesturePhaseKind {
        match self {
            Self::Idle => GesturePhaseKind::Idle,
            Self::ArmingTimer { .. } => GesturePhaseKind::ArmingTimer,
            Self::Dragging { .. } => GesturePhaseKind::Dragging,
            Self::Settling { .. } => GesturePhaseKind::Settling,
        }
    }
}

/// Field-less view of [`GesturePhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhaseKind {
    Idle,
    ArmingTimer,
    Dragging,
    Settling,
}

impl GesturePhaseKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ArmingTimer => "arming_timer",
            Self::Dragging => "dragging",
            Self::Settling => "settling",
        }
    }
}

/// Input accepted by the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureInput {
    TouchStart {
        item_id: String,
        index: usize,
        touches: Vec<TouchPoint>,
        hold: Duration,
    },
    TouchMove {
        point: Point,
        /// Position index of the card under the pointer, resolved by the host
        /// from untransformed layout.
        hovered_index: Option<usize>,
    },
    TouchEnd,
    TouchCancel,
    NativeDragStart {
        item_id: String,
        index: usize,
        native: NativeDragEvent,
    },
    NativeDragEnd,
}

/// Why a pending or active gesture was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Moved past the threshold before the hold elapsed (a swipe or scroll).
    MovedBeforeHold,
    /// Finger lifted before the hold elapsed.
    ReleasedBeforeHold,
    /// OS-level `touchcancel`.
    TouchCancel,
    /// A new gesture replaced this one.
    Superseded,
    /// Host teardown (unmount).
    Programmatic,
}

/// Explicit diagnostics for inputs that are safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureNoopReason {
    IdleWithoutSession,
    EmptyTouchList,
    ActiveDragInProgress,
    TouchSessionActive,
    PointerDragActive,
    BelowMoveThreshold,
    SettlingInProgress,
}

/// Effect produced by one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum GestureEffect {
    Armed {
        hold: Duration,
        deadline: Duration,
    },
    Rearmed {
        hold: Duration,
        deadline: Duration,
    },
    ArmingCanceled {
        reason: CancelReason,
    },
    DragStarted {
        item_id: String,
        source_index: usize,
        input: DragInputKind,
        event: DragIntentEvent,
    },
    DragMoved {
        delta: Point,
        /// New hovered index when it differs from the previous one.
        target_changed: Option<usize>,
    },
    Released {
        input: DragInputKind,
        source_index: usize,
        target_index: Option<usize>,
    },
    DragCanceled {
        input: DragInputKind,
        reason: CancelReason,
    },
    SettleInterrupted {
        reason: CancelReason,
    },
    Settled,
    Noop {
        reason: GestureNoopReason,
    },
}

/// One machine transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureTransition {
    pub transition_id: u64,
    pub at: Duration,
    pub from: GesturePhaseKind,
    pub to: GesturePhaseKind,
    pub effect: GestureEffect,
}

impl GestureTransition {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self.effect, GestureEffect::Noop { .. })
    }
}

/// Phase machine for one drag handle.
#[derive(Debug, Clone)]
pub struct HandleGestureMachine {
    config: GestureConfig,
    phase: GesturePhase,
    transition_counter: u64,
}

impl HandleGestureMachine {
    /// Construct a machine with a validated configuration.
    pub fn new(config: GestureConfig) -> Result<Self, GestureConfigError> {
        config.check()?;
        Ok(Self {
            config,
            phase: GesturePhase::Idle,
            transition_counter: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> &GesturePhase {
        &self.phase
    }

    #[must_use]
    pub const fn phase_kind(&self) -> GesturePhaseKind {
        self.phase.kind()
    }

    /// Whether a drag (touch or pointer) is in flight.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.phase, GesturePhase::Dragging { .. })
    }

    /// Hovered index of the active drag; `None` outside `Dragging`.
    #[must_use]
    pub fn target_index(&self) -> Option<usize> {
        match &self.phase {
            GesturePhase::Dragging { target_index, .. } => *target_index,
            _ => None,
        }
    }

    /// The active session, if arming or dragging.
    #[must_use]
    pub fn session(&self) -> Option<&GestureSession> {
        match &self.phase {
            GesturePhase::ArmingTimer { session, .. } | GesturePhase::Dragging { session, .. } => {
                Some(session)
            }
            _ => None,
        }
    }

    /// The only pending timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        match &self.phase {
            GesturePhase::ArmingTimer { deadline, .. } | GesturePhase::Settling { deadline } => {
                Some(*deadline)
            }
            _ => None,
        }
    }

    /// Fire the pending deadline if it is due at `now`.
    pub fn advance(&mut self, now: Duration) -> Option<GestureTransition> {
        if !self.next_deadline().is_some_and(|deadline| now >= deadline) {
            return None;
        }
        match std::mem::take(&mut self.phase) {
            GesturePhase::ArmingTimer { session, .. } => {
                let effect = GestureEffect::DragStarted {
                    item_id: session.item_id.clone(),
                    source_index: session.source_index,
                    input: DragInputKind::Touch,
                    event: DragIntentEvent::Touch {
                        touches: session.touches.clone(),
                    },
                };
                let current = session.origin;
                let target_index = Some(session.source_index);
                self.phase = GesturePhase::Dragging {
                    session,
                    input: DragInputKind::Touch,
                    target_index,
                    current,
                };
                Some(self.record(now, GesturePhaseKind::ArmingTimer, effect))
            }
            GesturePhase::Settling { .. } => {
                Some(self.record(now, GesturePhaseKind::Settling, GestureEffect::Settled))
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Apply one input at `now`, after firing any deadline already due.
    pub fn apply(&mut self, input: GestureInput, now: Duration) -> Vec<GestureTransition> {
        let mut out = Vec::with_capacity(2);
        if let Some(fired) = self.advance(now) {
            out.push(fired);
        }

        match input {
            GestureInput::TouchStart {
                item_id,
                index,
                touches,
                hold,
            } => self.on_touch_start(item_id, index, touches, hold, now, &mut out),
            GestureInput::TouchMove {
                point,
                hovered_index,
            } => out.push(self.on_touch_move(point, hovered_index, now)),
            GestureInput::TouchEnd => out.push(self.on_touch_end(now)),
            GestureInput::TouchCancel => out.push(self.on_touch_cancel(now)),
            GestureInput::NativeDragStart {
                item_id,
                index,
                native,
            } => self.on_native_drag_start(item_id, index, native, now, &mut out),
            GestureInput::NativeDragEnd => out.push(self.on_native_drag_end(now)),
        }
        out
    }

    /// Unconditionally return to `Idle`, dropping any pending deadline.
    ///
    /// Used on teardown. Returns `None` when already idle.
    pub fn force_cancel(&mut self, now: Duration) -> Option<GestureTransition> {
        let from = self.phase.kind();
        let effect = match std::mem::take(&mut self.phase) {
            GesturePhase::Idle => return None,
            GesturePhase::ArmingTimer { .. } => GestureEffect::ArmingCanceled {
                reason: CancelReason::Programmatic,
            },
            GesturePhase::Dragging { input, .. } => GestureEffect::DragCanceled {
                input,
                reason: CancelReason::Programmatic,
            },
            GesturePhase::Settling { .. } => GestureEffect::SettleInterrupted {
                reason: CancelReason::Programmatic,
            },
        };
        Some(self.record(now, from, effect))
    }
}

// ---------------------------------------------------------------------------
// Internal input handlers
// ---------------------------------------------------------------------------

impl HandleGestureMachine {
    fn on_touch_start(
        &mut self,
        item_id: String,
        index: usize,
        touches: Vec<TouchPoint>,
        hold: Duration,
        now: Duration,
        out: &mut Vec<GestureTransition>,
    ) {
        let Some(first) = touches.first().copied() else {
            out.push(self.noop(now, GestureNoopReason::EmptyTouchList));
            return;
        };

        let rearm = match self.phase.kind() {
            GesturePhaseKind::Dragging => {
                out.push(self.noop(now, GestureNoopReason::ActiveDragInProgress));
                return;
            }
            GesturePhaseKind::Settling => {
                self.phase = GesturePhase::Idle;
                out.push(self.record(
                    now,
                    GesturePhaseKind::Settling,
                    GestureEffect::SettleInterrupted {
                        reason: CancelReason::Superseded,
                    },
                ));
                false
            }
            GesturePhaseKind::ArmingTimer => true,
            GesturePhaseKind::Idle => false,
        };

        let from = self.phase.kind();
        let deadline = now.saturating_add(hold);
        self.phase = GesturePhase::ArmingTimer {
            session: GestureSession {
                item_id,
                source_index: index,
                origin: first.client,
                hold,
                touches,
            },
            deadline,
        };
        let effect = if rearm {
            GestureEffect::Rearmed { hold, deadline }
        } else {
            GestureEffect::Armed { hold, deadline }
        };
        out.push(self.record(now, from, effect));
    }

    fn on_touch_move(
        &mut self,
        point: Point,
        hovered_index: Option<usize>,
        now: Duration,
    ) -> GestureTransition {
        match &mut self.phase {
            GesturePhase::Idle => self.noop(now, GestureNoopReason::IdleWithoutSession),
            GesturePhase::Settling { .. } => {
                self.noop(now, GestureNoopReason::SettlingInProgress)
            }
            GesturePhase::ArmingTimer { session, .. } => {
                let delta = point.delta_from(session.origin);
                if delta.exceeds_on_either_axis(self.config.move_cancel_px) {
                    self.phase = GesturePhase::Idle;
                    self.record(
                        now,
                        GesturePhaseKind::ArmingTimer,
                        GestureEffect::ArmingCanceled {
                            reason: CancelReason::MovedBeforeHold,
                        },
                    )
                } else {
                    self.noop(now, GestureNoopReason::BelowMoveThreshold)
                }
            }
            GesturePhase::Dragging {
                input: DragInputKind::Pointer,
                ..
            } => self.noop(now, GestureNoopReason::PointerDragActive),
            GesturePhase::Dragging {
                session,
                target_index,
                current,
                ..
            } => {
                *current = point;
                let delta = point.delta_from(session.origin);
                let target_changed = match hovered_index {
                    Some(hovered) if *target_index != Some(hovered) => {
                        *target_index = Some(hovered);
                        Some(hovered)
                    }
                    _ => None,
                };
                self.record(
                    now,
                    GesturePhaseKind::Dragging,
                    GestureEffect::DragMoved {
                        delta,
                        target_changed,
                    },
                )
            }
        }
    }

    fn on_touch_end(&mut self, now: Duration) -> GestureTransition {
        match &self.phase {
            GesturePhase::Idle => self.noop(now, GestureNoopReason::IdleWithoutSession),
            GesturePhase::Settling { .. } => {
                self.noop(now, GestureNoopReason::SettlingInProgress)
            }
            GesturePhase::ArmingTimer { .. } => {
                self.phase = GesturePhase::Idle;
                self.record(
                    now,
                    GesturePhaseKind::ArmingTimer,
                    GestureEffect::ArmingCanceled {
                        reason: CancelReason::ReleasedBeforeHold,
                    },
                )
            }
            GesturePhase::Dragging {
                input: DragInputKind::Pointer,
                ..
            } => self.noop(now, GestureNoopReason::PointerDragActive),
            GesturePhase::Dragging {
                session,
                target_index,
                ..
            } => {
                let effect = GestureEffect::Released {
                    input: DragInputKind::Touch,
                    source_index: session.source_index,
                    target_index: *target_index,
                };
                self.phase = GesturePhase::Settling {
                    deadline: now.saturating_add(self.config.settle),
                };
                self.record(now, GesturePhaseKind::Dragging, effect)
            }
        }
    }

    fn on_touch_cancel(&mut self, now: Duration) -> GestureTransition {
        let from = self.phase.kind();
        match &self.phase {
            GesturePhase::Idle => self.noop(now, GestureNoopReason::IdleWithoutSession),
            GesturePhase::Dragging {
                input: DragInputKind::Pointer,
                ..
            } => self.noop(now, GestureNoopReason::PointerDragActive),
            GesturePhase::ArmingTimer { .. } => {
                self.phase = GesturePhase::Idle;
                self.record(
                    now,
                    from,
                    GestureEffect::ArmingCanceled {
                        reason: CancelReason::TouchCancel,
                    },
                )
            }
            GesturePhase::Dragging { .. } => {
                self.phase = GesturePhase::Idle;
                self.record(
                    now,
                    from,
                    GestureEffect::DragCanceled {
                        input: DragInputKind::Touch,
                        reason: CancelReason::TouchCancel,
                    },
                )
            }
            GesturePhase::Settling { .. } => {
                self.phase = GesturePhase::Idle;
                self.record(
                    now,
                    from,
                    GestureEffect::SettleInterrupted {
                        reason: CancelReason::TouchCancel,
                    },
                )
            }
        }
    }

    fn on_native_drag_start(
        &mut self,
        item_id: String,
        index: usize,
        native: NativeDragEvent,
        now: Duration,
        out: &mut Vec<GestureTransition>,
    ) {
        match self.phase.kind() {
            GesturePhaseKind::Dragging => {
                out.push(self.noop(now, GestureNoopReason::ActiveDragInProgress));
                return;
            }
            GesturePhaseKind::ArmingTimer => {
                out.push(self.noop(now, GestureNoopReason::TouchSessionActive));
                return;
            }
            GesturePhaseKind::Settling => {
                self.phase = GesturePhase::Idle;
                out.push(self.record(
                    now,
                    GesturePhaseKind::Settling,
                    GestureEffect::SettleInterrupted {
                        reason: CancelReason::Superseded,
                    },
                ));
            }
            GesturePhaseKind::Idle => {}
        }

        let effect = GestureEffect::DragStarted {
            item_id: item_id.clone(),
            source_index: index,
            input: DragInputKind::Pointer,
            event: DragIntentEvent::Pointer { native },
        };
        self.phase = GesturePhase::Dragging {
            session: GestureSession {
                item_id,
                source_index: index,
                origin: native.client,
                hold: Duration::ZERO,
                touches: Vec::new(),
            },
            input: DragInputKind::Pointer,
            target_index: Some(index),
            current: native.client,
        };
        out.push(self.record(now, GesturePhaseKind::Idle, effect));
    }

    fn on_native_drag_end(&mut self, now: Duration) -> GestureTransition {
        match &self.phase {
            GesturePhase::Dragging {
                input: DragInputKind::Pointer,
                session,
                target_index,
                ..
            } => {
                let effect = GestureEffect::Released {
                    input: DragInputKind::Pointer,
                    source_index: session.source_index,
                    target_index: *target_index,
                };
                self.phase = GesturePhase::Idle;
                self.record(now, GesturePhaseKind::Dragging, effect)
            }
            GesturePhase::Dragging { .. } | GesturePhase::ArmingTimer { .. } => {
                self.noop(now, GestureNoopReason::TouchSessionActive)
            }
            GesturePhase::Settling { .. } => {
                self.noop(now, GestureNoopReason::SettlingInProgress)
            }
            GesturePhase::Idle => self.noop(now, GestureNoopReason::IdleWithoutSession),
        }
    }

    fn noop(&mut self, now: Duration, reason: GestureNoopReason) -> GestureTransition {
        let kind = self.phase.kind();
        self.record(now, kind, GestureEffect::Noop { reason })
    }

    fn record(
        &mut self,
        now: Duration,
        from: GesturePhaseKind,
        effect: GestureEffect,
    ) -> GestureTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        GestureTransition {
            transition_id: self.transition_counter,
            at: now,
            from,
            to: self.phase.kind(),
            effect,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS_50: Duration = Duration::from_millis(50);
    const MS_199: Duration = Duration::from_millis(199);
    const MS_200: Duration = Duration::from_millis(200);
    const MS_400: Duration = Duration::from_millis(400);

    fn machine() -> HandleGestureMachine {
        HandleGestureMachine::new(GestureConfig::default()).expect("default config is valid")
    }

    fn touch_start(x: f32, y: f32) -> GestureInput {
        GestureInput::TouchStart {
            item_id: "42".into(),
            index: 2,
            touches: vec![TouchPoint::new(0, Point::new(x, y))],
            hold: MS_200,
        }
    }

    fn touch_move(x: f32, y: f32, hovered: Option<usize>) -> GestureInput {
        GestureInput::TouchMove {
            point: Point::new(x, y),
            hovered_index: hovered,
        }
    }

    fn started(transitions: &[GestureTransition]) -> usize {
        transitions
            .iter()
            .filter(|t| matches!(t.effect, GestureEffect::DragStarted { .. }))
            .count()
    }

    #[test]
    fn touch_start_arms_hold_deadline() {
        let mut m = machine();
        let t = m.apply(touch_start(10.0, 10.0), Duration::ZERO);
        assert_eq!(t.len(), 1);
        assert!(matches!(
            t[0].effect,
            GestureEffect::Armed { hold, deadline } if hold == MS_200 && deadline == MS_200
        ));
        assert_eq!(m.phase_kind(), GesturePhaseKind::ArmingTimer);
        assert_eq!(m.next_deadline(), Some(MS_200));
        assert_eq!(m.target_index(), None);
    }

    #[test]
    fn hold_fires_exactly_at_threshold() {
        let mut m = machine();
        m.apply(touch_start(10.0, 10.0), Duration::ZERO);
        assert!(m.advance(MS_199).is_none());
        assert_eq!(m.phase_kind(), GesturePhaseKind::ArmingTimer);

        let fired = m.advance(MS_200).expect("hold should fire at 200ms");
        assert_eq!(fired.from, GesturePhaseKind::ArmingTimer);
        assert_eq!(fired.to, GesturePhaseKind::Dragging);
        match fired.effect {
            GestureEffect::DragStarted {
                item_id,
                source_index,
                input,
                event,
            } => {
                assert_eq!(item_id, "42");
                assert_eq!(source_index, 2);
                assert_eq!(input, DragInputKind::Touch);
                assert!(event.is_touch());
            }
            other => panic!("expected DragStarted, got {other:?}"),
        }
        assert_eq!(m.target_index(), Some(2));
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn release_before_hold_cancels() {
        let mut m = machine();
        m.apply(touch_start(10.0, 10.0), Duration::ZERO);
        let t = m.apply(GestureInput::TouchEnd, MS_199);
        assert_eq!(started(&t), 0);
        assert!(matches!(
            t[0].effect,
            GestureEffect::ArmingCanceled {
                reason: CancelReason::ReleasedBeforeHold
            }
        ));
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);
        assert!(m.advance(MS_400).is_none());
    }

    #[test]
    fn movement_beyond_threshold_cancels_arming() {
        let mut m = machine();
        m.apply(touch_start(100.0, 100.0), Duration::ZERO);

        // Exactly 10px is still a hold.
        let t = m.apply(touch_move(110.0, 100.0, Some(2)), MS_50);
        assert!(matches!(
            t[0].effect,
            GestureEffect::Noop {
                reason: GestureNoopReason::BelowMoveThreshold
            }
        ));

        let t = m.apply(touch_move(100.0, 89.0, Some(2)), MS_50 * 2);
        assert!(matches!(
            t[0].effect,
            GestureEffect::ArmingCanceled {
                reason: CancelReason::MovedBeforeHold
            }
        ));
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);
        assert!(m.advance(MS_400).is_none(), "cancelled timer must not fire");
    }

    #[test]
    fn due_hold_fires_before_the_move_that_observes_it() {
        let mut m = machine();
        m.apply(touch_start(100.0, 100.0), Duration::ZERO);
        let t = m.apply(touch_move(100.0, 160.0, Some(3)), Duration::from_millis(250));
        assert_eq!(t.len(), 2);
        assert!(matches!(t[0].effect, GestureEffect::DragStarted { .. }));
        assert!(matches!(
            t[1].effect,
            GestureEffect::DragMoved {
                target_changed: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn touch_start_while_dragging_is_ignored() {
        let mut m = machine();
        m.apply(touch_start(10.0, 10.0), Duration::ZERO);
        m.advance(MS_200);
        let t = m.apply(touch_start(50.0, 50.0), MS_400);
        assert_eq!(t.len(), 1);
        assert!(matches!(
            t[0].effect,
            GestureEffect::Noop {
                reason: GestureNoopReason::ActiveDragInProgress
            }
        ));
        assert_eq!(m.next_deadline(), None);
        assert_eq!(m.session().map(|s| s.origin), Some(Point::new(10.0, 10.0)));
    }

    #[test]
    fn touch_start_while_arming_rearms_single_deadline() {
        let mut m = machine();
        m.apply(touch_start(10.0, 10.0), Duration::ZERO);
        let t = m.apply(touch_start(12.0, 12.0), MS_50);
        assert!(matches!(t[0].effect, GestureEffect::Rearmed { .. }));
        assert_eq!(m.next_deadline(), Some(MS_50 + MS_200));
        assert!(m.advance(MS_200).is_none());
        assert!(m.advance(MS_50 + MS_200).is_some());
    }

    #[test]
    fn target_changes_only_on_new_index() {
        let mut m = machine();
        m.apply(touch_start(10.0, 10.0), Duration::ZERO);
        m.advance(MS_200);

        let over_self = m.apply(touch_move(10.0, 12.0, Some(2)), MS_400);
        assert!(matches!(
            over_self[0].effect,
            GestureEffect::DragMoved {
                target_changed: None,
                ..
            }
        ));

        let over_four = m.apply(touch_move(10.0, 200.0, Some(4)), MS_400);
        assert!(matches!(
            over_four[0].effect,
            GestureEffect::DragMoved {
                target_changed: Some(4),
                ..
            }
        ));

        let gap = m.apply(touch_move(10.0, 210.0, None), MS_400);
        assert!(matches!(
            gap[0].effect,
            GestureEffect::DragMoved {
                target_changed: None,
                ..
            }
        ));
        assert_eq!(m.target_index(), Some(4));

        let back_home = m.apply(touch_move(10.0, 10.0, Some(2)), MS_400);
        assert!(matches!(
            back_home[0].effect,
            GestureEffect::DragMoved {
                target_changed: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn touch_end_settles_then_idles() {
        let mut m = machine();
        m.apply(touch_start(10.0, 10.0), Duration::ZERO);
        m.advance(MS_200);
        m.apply(touch_move(10.0, 200.0, Some(4)), MS_400);

        let t = m.apply(GestureInput::TouchEnd, MS_400);
        assert!(matches!(
            t[0].effect,
            GestureEffect::Released {
                input: DragInputKind::Touch,
                source_index: 2,
                target_index: Some(4),
            }
        ));
        assert_eq!(m.phase_kind(), GesturePhaseKind::Settling);
        assert_eq!(m.target_index(), None);

        let settle_at = MS_400 + Duration::from_millis(600);
        assert!(m.advance(settle_at - Duration::from_millis(1)).is_none());
        let settled = m.advance(settle_at).expect("settle deadline");
        assert_eq!(settled.effect, GestureEffect::Settled);
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);
    }

    #[test]
    fn touch_cancel_from_every_phase_reaches_idle() {
        // Arming
        let mut m = machine();
        m.apply(touch_start(0.0, 0.0), Duration::ZERO);
        m.apply(GestureInput::TouchCancel, MS_50);
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);

        // Dragging: no Released effect.
        let mut m = machine();
        m.apply(touch_start(0.0, 0.0), Duration::ZERO);
        let t = m.apply(GestureInput::TouchCancel, MS_400);
        assert!(matches!(t[0].effect, GestureEffect::DragStarted { .. }));
        assert!(matches!(
            t[1].effect,
            GestureEffect::DragCanceled {
                reason: CancelReason::TouchCancel,
                ..
            }
        ));
        assert!(
            !t.iter()
                .any(|tr| matches!(tr.effect, GestureEffect::Released { .. }))
        );
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);

        // Settling
        let mut m = machine();
        m.apply(touch_start(0.0, 0.0), Duration::ZERO);
        m.apply(GestureInput::TouchEnd, MS_400);
        assert_eq!(m.phase_kind(), GesturePhaseKind::Settling);
        m.apply(GestureInput::TouchCancel, MS_400);
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn native_drag_skips_arming_and_settling() {
        let mut m = machine();
        let t = m.apply(
            GestureInput::NativeDragStart {
                item_id: "7".into(),
                index: 0,
                native: NativeDragEvent::new(Point::new(5.0, 5.0)),
            },
            Duration::ZERO,
        );
        assert_eq!(t[0].from, GesturePhaseKind::Idle);
        assert_eq!(t[0].to, GesturePhaseKind::Dragging);
        assert!(matches!(
            t[0].effect,
            GestureEffect::DragStarted {
                input: DragInputKind::Pointer,
                event: DragIntentEvent::Pointer { .. },
                ..
            }
        ));
        assert_eq!(m.next_deadline(), None);

        let t = m.apply(GestureInput::NativeDragEnd, MS_50);
        assert!(matches!(
            t[0].effect,
            GestureEffect::Released {
                input: DragInputKind::Pointer,
                ..
            }
        ));
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);
    }

    #[test]
    fn touch_start_during_settle_interrupts_then_arms() {
        let mut m = machine();
        m.apply(touch_start(0.0, 0.0), Duration::ZERO);
        m.apply(GestureInput::TouchEnd, MS_400);
        let t = m.apply(touch_start(0.0, 0.0), MS_400 + MS_50);
        assert_eq!(t.len(), 2);
        assert!(matches!(
            t[0].effect,
            GestureEffect::SettleInterrupted {
                reason: CancelReason::Superseded
            }
        ));
        assert!(matches!(t[1].effect, GestureEffect::Armed { .. }));
    }

    #[test]
    fn force_cancel_clears_pending_hold() {
        let mut m = machine();
        m.apply(touch_start(0.0, 0.0), Duration::ZERO);
        let t = m.force_cancel(MS_50).expect("was arming");
        assert!(matches!(
            t.effect,
            GestureEffect::ArmingCanceled {
                reason: CancelReason::Programmatic
            }
        ));
        assert!(m.advance(MS_400).is_none(), "no stale drag start after teardown");
        assert!(m.force_cancel(MS_400).is_none());
    }

    #[test]
    fn empty_touch_list_is_ignored() {
        let mut m = machine();
        let t = m.apply(
            GestureInput::TouchStart {
                item_id: "1".into(),
                index: 0,
                touches: Vec::new(),
                hold: MS_200,
            },
            Duration::ZERO,
        );
        assert!(t[0].is_noop());
        assert_eq!(m.phase_kind(), GesturePhaseKind::Idle);
    }

    #[test]
    fn transition_ids_increase() {
        let mut m = machine();
        let a = m.apply(touch_start(0.0, 0.0), Duration::ZERO);
        let b = m.apply(GestureInput::TouchEnd, MS_50);
        assert!(b[0].transition_id > a[0].transition_id);
    }
}
