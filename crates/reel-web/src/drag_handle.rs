#![forbid(unsafe_code)]

//! Drag-handle adapter for card lists.
//!
//! Bridges raw handle events (touch, native drag, keyboard, focus) into the
//! [`HandleGestureMachine`] and turns the resulting transitions into:
//! - [`ReorderIntent`] values for the list container,
//! - [`HostCommand`] values the embedding page must perform (haptics,
//!   `preventDefault`),
//! - inline style updates on the card wrapper, and
//! - swipe suppression on the enclosing swipe region.
//!
//! Every exit path out of a touch drag (release, `touchcancel`, unmount)
//! clears suppression markers document-wide.

use std::time::Duration;

use reel_core::config::{GestureConfig, GestureConfigError};
use reel_core::event::{HandleInput, KeyCode, NativeDragEvent, TouchPoint};
use reel_core::feedback::DragTransform;
use reel_core::geometry::Point;
use reel_core::gesture::{
    DragInputKind, GestureEffect, GestureInput, GestureNoopReason, GesturePhase,
    GesturePhaseKind, GestureTransition, HandleGestureMachine,
};
use reel_core::intent::{DragIntentEvent, ReorderDirection, ReorderIntent, ReorderListener};
use reel_core::logging::LOG_TARGET;
use reel_core::preference::{HoldProfile, PreferenceStore};
use serde::{Deserialize, Serialize};

use crate::dom::{
    ATTR_INDEX, Document, ElementId, STYLE_TRANSFORM, STYLE_TRANSITION, STYLE_Z_INDEX,
};
use crate::suppression::SwipeSuppression;

/// Side effect the embedding page must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    /// `navigator.vibrate` pulse, best effort.
    Vibrate { duration: Duration },
    /// Call `preventDefault()` on the current touch event to stop scrolling.
    PreventDefault,
}

/// Lifecycle signal recorded for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleLifecyclePhase {
    TouchStart,
    TouchMove,
    TouchEnd,
    TouchCancel,
    NativeDragStart,
    NativeDragEnd,
    KeyDown,
    Focus,
    Blur,
    Tick,
    Cancel,
    Unmount,
}

impl HandleLifecyclePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TouchStart => "touch_start",
            Self::TouchMove => "touch_move",
            Self::TouchEnd => "touch_end",
            Self::TouchCancel => "touch_cancel",
            Self::NativeDragStart => "native_drag_start",
            Self::NativeDragEnd => "native_drag_end",
            Self::KeyDown => "key_down",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::Tick => "tick",
            Self::Cancel => "cancel",
            Self::Unmount => "unmount",
        }
    }
}

/// Why a signal produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HandleIgnoredReason {
    Unmounted,
    NotFocused,
    UnmappedKey,
    EmptyTouchList,
    NothingDue,
    Machine { noop: GestureNoopReason },
}

/// Outcome category for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandleLogOutcome {
    Forwarded,
    FocusUpdated,
    Ignored { reason: HandleIgnoredReason },
}

/// Structured log record for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleLogEntry {
    pub phase: HandleLifecyclePhase,
    pub sequence: Option<u64>,
    pub index: usize,
    pub phase_before: GesturePhaseKind,
    pub phase_after: GesturePhaseKind,
    pub intent_count: usize,
    pub outcome: HandleLogOutcome,
}

/// Result of one handle dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleDispatch {
    pub intents: Vec<ReorderIntent>,
    pub commands: Vec<HostCommand>,
    pub transitions: Vec<GestureTransition>,
    pub log: HandleLogEntry,
}

impl HandleDispatch {
    fn ignored(
        phase: HandleLifecyclePhase,
        index: usize,
        state: GesturePhaseKind,
        reason: HandleIgnoredReason,
    ) -> Self {
        Self {
            intents: Vec::new(),
            commands: Vec::new(),
            transitions: Vec::new(),
            log: HandleLogEntry {
                phase,
                sequence: None,
                index,
                phase_before: state,
                phase_after: state,
                intent_count: 0,
                outcome: HandleLogOutcome::Ignored { reason },
            },
        }
    }

    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self.log.outcome, HandleLogOutcome::Ignored { .. })
    }

    /// Route this dispatch's intents to `listener`, in order.
    pub fn deliver<L: ReorderListener + ?Sized>(&self, listener: &mut L) {
        reel_core::intent::deliver(&self.intents, listener);
    }
}

/// Drag handle for one card.
///
/// The handle element lives inside the card wrapper, which carries the
/// card's `data-index`. Time is host-driven: pass a monotonic `now` with
/// every call and poll [`DragHandle::tick`] at or after
/// [`DragHandle::next_deadline`].
#[derive(Debug, Clone)]
pub struct DragHandle {
    machine: HandleGestureMachine,
    element: ElementId,
    item_id: String,
    index: usize,
    focused: bool,
    mounted: bool,
    suppression: SwipeSuppression,
    card: Option<ElementId>,
    next_sequence: u64,
}

impl DragHandle {
    /// Mount a handle for the card `item_id` currently at `index`.
    pub fn new(
        config: GestureConfig,
        element: ElementId,
        item_id: impl Into<String>,
        index: usize,
    ) -> Result<Self, GestureConfigError> {
        Ok(Self {
            machine: HandleGestureMachine::new(config)?,
            element,
            item_id: item_id.into(),
            index,
            focused: false,
            mounted: true,
            suppression: SwipeSuppression::new(),
            card: None,
            next_sequence: 1,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        self.machine.config()
    }

    #[must_use]
    pub const fn element(&self) -> ElementId {
        self.element
    }

    #[must_use]
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Update the position after the list re-renders.
    ///
    /// Takes effect for the next gesture; an active session keeps the index
    /// it started with.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    #[must_use]
    pub fn phase(&self) -> &GesturePhase {
        self.machine.phase()
    }

    #[must_use]
    pub const fn phase_kind(&self) -> GesturePhaseKind {
        self.machine.phase_kind()
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.machine.is_dragging()
    }

    #[must_use]
    pub fn target_index(&self) -> Option<usize> {
        self.machine.target_index()
    }

    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// When the host should next call [`DragHandle::tick`].
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.machine.next_deadline()
    }

    /// Route a raw [`HandleInput`] to the matching handler.
    pub fn handle(
        &mut self,
        doc: &mut Document,
        prefs: &dyn PreferenceStore,
        input: HandleInput,
        now: Duration,
    ) -> HandleDispatch {
        match input {
            HandleInput::TouchStart { touches } => self.touch_start(doc, prefs, touches, now),
            HandleInput::TouchMove { touches } => self.touch_move(doc, touches, now),
            HandleInput::TouchEnd => self.touch_end(doc, now),
            HandleInput::TouchCancel => self.touch_cancel(doc, now),
            HandleInput::NativeDragStart { native } => self.native_drag_start(doc, native, now),
            HandleInput::NativeDragEnd { .. } => self.native_drag_end(doc, now),
            HandleInput::KeyDown { key } => self.key_down(key),
            HandleInput::Focus => self.focus(),
            HandleInput::Blur => self.blur(),
        }
    }

    /// `touchstart` on the handle. Reads the hold profile from `prefs`.
    pub fn touch_start(
        &mut self,
        doc: &mut Document,
        prefs: &dyn PreferenceStore,
        touches: Vec<TouchPoint>,
        now: Duration,
    ) -> HandleDispatch {
        let phase = HandleLifecyclePhase::TouchStart;
        if !self.mounted {
            return self.ignored(phase, HandleIgnoredReason::Unmounted);
        }
        let config = self.machine.config();
        let hold = HoldProfile::resolve(prefs, config).duration(config);
        let input = GestureInput::TouchStart {
            item_id: self.item_id.clone(),
            index: self.index,
            touches,
            hold,
        };
        self.forward(doc, phase, input, &[], now)
    }

    /// `touchmove` on the handle.
    pub fn touch_move(
        &mut self,
        doc: &mut Document,
        touches: Vec<TouchPoint>,
        now: Duration,
    ) -> HandleDispatch {
        let phase = HandleLifecyclePhase::TouchMove;
        if !self.mounted {
            return self.ignored(phase, HandleIgnoredReason::Unmounted);
        }
        let Some(primary) = touches.first().copied() else {
            return self.ignored(phase, HandleIgnoredReason::EmptyTouchList);
        };
        let input = GestureInput::TouchMove {
            point: primary.client,
            hovered_index: hovered_index(doc, primary.client),
        };
        self.forward(doc, phase, input, &touches, now)
    }

    /// `touchend` on the handle.
    pub fn touch_end(&mut self, doc: &mut Document, now: Duration) -> HandleDispatch {
        self.forward_simple(doc, HandleLifecyclePhase::TouchEnd, GestureInput::TouchEnd, now)
    }

    /// `touchcancel` on the handle.
    pub fn touch_cancel(&mut self, doc: &mut Document, now: Duration) -> HandleDispatch {
        self.forward_simple(
            doc,
            HandleLifecyclePhase::TouchCancel,
            GestureInput::TouchCancel,
            now,
        )
    }

    /// Native `dragstart` (mouse path).
    pub fn native_drag_start(
        &mut self,
        doc: &mut Document,
        native: NativeDragEvent,
        now: Duration,
    ) -> HandleDispatch {
        let input = GestureInput::NativeDragStart {
            item_id: self.item_id.clone(),
            index: self.index,
            native,
        };
        self.forward_simple(doc, HandleLifecyclePhase::NativeDragStart, input, now)
    }

    /// Native `dragend` (mouse path).
    pub fn native_drag_end(&mut self, doc: &mut Document, now: Duration) -> HandleDispatch {
        self.forward_simple(
            doc,
            HandleLifecyclePhase::NativeDragEnd,
            GestureInput::NativeDragEnd,
            now,
        )
    }

    /// `keydown` while the handle has focus.
    ///
    /// Keyboard reorder bypasses the gesture machine entirely.
    pub fn key_down(&mut self, key: KeyCode) -> HandleDispatch {
        let phase = HandleLifecyclePhase::KeyDown;
        if !self.mounted {
            return self.ignored(phase, HandleIgnoredReason::Unmounted);
        }
        if !self.focused {
            return self.ignored(phase, HandleIgnoredReason::NotFocused);
        }
        let Some(direction) = ReorderDirection::from_key(key) else {
            return self.ignored(phase, HandleIgnoredReason::UnmappedKey);
        };
        let state = self.machine.phase_kind();
        self.finish(
            phase,
            state,
            Vec::new(),
            vec![ReorderIntent::KeyboardReorder { direction }],
            Vec::new(),
        )
    }

    pub fn focus(&mut self) -> HandleDispatch {
        self.set_focus(HandleLifecyclePhase::Focus, true)
    }

    pub fn blur(&mut self) -> HandleDispatch {
        self.set_focus(HandleLifecyclePhase::Blur, false)
    }

    /// Fire a due deadline (hold elapsed, settle finished).
    pub fn tick(&mut self, doc: &mut Document, now: Duration) -> HandleDispatch {
        let phase = HandleLifecyclePhase::Tick;
        if !self.mounted {
            return self.ignored(phase, HandleIgnoredReason::Unmounted);
        }
        let before = self.machine.phase_kind();
        let Some(fired) = self.machine.advance(now) else {
            return self.ignored(phase, HandleIgnoredReason::NothingDue);
        };
        self.settle_transitions(doc, phase, before, vec![fired], &[])
    }

    /// Abort whatever is in progress and clear all drag styling.
    ///
    /// Cleanup runs even when idle; it is idempotent.
    pub fn cancel(&mut self, doc: &mut Document, now: Duration) -> HandleDispatch {
        self.cancel_with(doc, HandleLifecyclePhase::Cancel, now)
    }

    /// Tear the handle down. Later inputs are ignored.
    pub fn unmount(&mut self, doc: &mut Document, now: Duration) -> HandleDispatch {
        if !self.mounted {
            return self.ignored(HandleLifecyclePhase::Unmount, HandleIgnoredReason::Unmounted);
        }
        let dispatch = self.cancel_with(doc, HandleLifecyclePhase::Unmount, now);
        self.mounted = false;
        self.focused = false;
        dispatch
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

impl DragHandle {
    fn ignored(&self, phase: HandleLifecyclePhase, reason: HandleIgnoredReason) -> HandleDispatch {
        let dispatch =
            HandleDispatch::ignored(phase, self.index, self.machine.phase_kind(), reason);
        tracing::trace!(
            target: LOG_TARGET,
            item_id = %self.item_id,
            phase = phase.as_str(),
            reason = ?reason,
            "handle signal ignored"
        );
        dispatch
    }

    fn set_focus(&mut self, phase: HandleLifecyclePhase, focused: bool) -> HandleDispatch {
        if !self.mounted {
            return self.ignored(phase, HandleIgnoredReason::Unmounted);
        }
        self.focused = focused;
        let state = self.machine.phase_kind();
        HandleDispatch {
            intents: Vec::new(),
            commands: Vec::new(),
            transitions: Vec::new(),
            log: HandleLogEntry {
                phase,
                sequence: None,
                index: self.index,
                phase_before: state,
                phase_after: state,
                intent_count: 0,
                outcome: HandleLogOutcome::FocusUpdated,
            },
        }
    }

    fn forward_simple(
        &mut self,
        doc: &mut Document,
        phase: HandleLifecyclePhase,
        input: GestureInput,
        now: Duration,
    ) -> HandleDispatch {
        if !self.mounted {
            return self.ignored(phase, HandleIgnoredReason::Unmounted);
        }
        self.forward(doc, phase, input, &[], now)
    }

    fn forward(
        &mut self,
        doc: &mut Document,
        phase: HandleLifecyclePhase,
        input: GestureInput,
        move_touches: &[TouchPoint],
        now: Duration,
    ) -> HandleDispatch {
        let before = self.machine.phase_kind();
        let transitions = self.machine.apply(input, now);
        self.settle_transitions(doc, phase, before, transitions, move_touches)
    }

    fn cancel_with(
        &mut self,
        doc: &mut Document,
        phase: HandleLifecyclePhase,
        now: Duration,
    ) -> HandleDispatch {
        let before = self.machine.phase_kind();
        let transitions: Vec<_> = self.machine.force_cancel(now).into_iter().collect();
        let dispatch = self.settle_transitions(doc, phase, before, transitions, &[]);
        self.suppression.release_all(doc);
        self.restore_card(doc);
        dispatch
    }

    /// Apply every transition's effect and assemble the dispatch.
    fn settle_transitions(
        &mut self,
        doc: &mut Document,
        phase: HandleLifecyclePhase,
        before: GesturePhaseKind,
        transitions: Vec<GestureTransition>,
        move_touches: &[TouchPoint],
    ) -> HandleDispatch {
        let mut intents = Vec::new();
        let mut commands = Vec::new();
        for transition in &transitions {
            self.apply_effect(doc, &transition.effect, move_touches, &mut intents, &mut commands);
        }
        self.finish(phase, before, transitions, intents, commands)
    }

    fn finish(
        &mut self,
        phase: HandleLifecyclePhase,
        before: GesturePhaseKind,
        transitions: Vec<GestureTransition>,
        intents: Vec<ReorderIntent>,
        commands: Vec<HostCommand>,
    ) -> HandleDispatch {
        let after = self.machine.phase_kind();
        let only_noops = !transitions.is_empty() && transitions.iter().all(GestureTransition::is_noop);
        let outcome = if only_noops {
            let noop = transitions
                .iter()
                .rev()
                .find_map(|t| match t.effect {
                    GestureEffect::Noop { reason } => Some(reason),
                    _ => None,
                })
                .unwrap_or(GestureNoopReason::IdleWithoutSession);
            HandleLogOutcome::Ignored {
                reason: HandleIgnoredReason::Machine { noop },
            }
        } else {
            HandleLogOutcome::Forwarded
        };
        // Only dispatches that changed state or carried intents are sequenced.
        let semantic = !transitions.is_empty() || !intents.is_empty();
        let sequence = (semantic && matches!(outcome, HandleLogOutcome::Forwarded)).then(|| {
            let sequence = self.next_sequence;
            self.next_sequence = self.next_sequence.saturating_add(1);
            sequence
        });
        let log = HandleLogEntry {
            phase,
            sequence,
            index: self.index,
            phase_before: before,
            phase_after: after,
            intent_count: intents.len(),
            outcome,
        };
        match outcome {
            HandleLogOutcome::Forwarded if sequence.is_some() => tracing::debug!(
                target: LOG_TARGET,
                item_id = %self.item_id,
                sequence = ?sequence,
                phase = phase.as_str(),
                from = before.as_str(),
                to = after.as_str(),
                intents = intents.len(),
                "handle dispatch"
            ),
            HandleLogOutcome::Forwarded => tracing::trace!(
                target: LOG_TARGET,
                item_id = %self.item_id,
                phase = phase.as_str(),
                "handle dispatch without effect"
            ),
            _ => tracing::trace!(
                target: LOG_TARGET,
                item_id = %self.item_id,
                phase = phase.as_str(),
                outcome = ?outcome,
                "handle dispatch ignored"
            ),
        }
        HandleDispatch {
            intents,
            commands,
            transitions,
            log,
        }
    }

    fn apply_effect(
        &mut self,
        doc: &mut Document,
        effect: &GestureEffect,
        move_touches: &[TouchPoint],
        intents: &mut Vec<ReorderIntent>,
        commands: &mut Vec<HostCommand>,
    ) {
        match effect {
            GestureEffect::Armed { .. }
            | GestureEffect::Rearmed { .. }
            | GestureEffect::Noop { .. } => {}
            GestureEffect::ArmingCanceled { .. } => {
                self.suppression.release_all(doc);
            }
            GestureEffect::DragStarted {
                item_id,
                source_index,
                input,
                event,
            } => {
                self.card = doc.closest(self.element, ATTR_INDEX);
                let z_index = self.machine.config().elevated_z_index.to_string();
                self.set_card_style(doc, STYLE_Z_INDEX, &z_index);
                self.set_card_style(doc, STYLE_TRANSITION, "none");
                if *input == DragInputKind::Touch {
                    self.suppression.suppress(doc, self.element);
                    commands.push(HostCommand::Vibrate {
                        duration: self.machine.config().haptic_pulse,
                    });
                }
                intents.push(ReorderIntent::DragStart {
                    item_id: item_id.clone(),
                    event: event.clone(),
                    index: *source_index,
                });
            }
            GestureEffect::DragMoved {
                delta,
                target_changed,
            } => {
                let transform = DragTransform::from_delta(*delta, &self.machine.config().feedback);
                self.set_card_style(doc, STYLE_TRANSFORM, &transform.to_css());
                commands.push(HostCommand::PreventDefault);
                if let Some(target_index) = target_changed {
                    intents.push(ReorderIntent::TouchDragMove {
                        event: DragIntentEvent::Touch {
                            touches: move_touches.to_vec(),
                        },
                        target_index: *target_index,
                    });
                }
            }
            GestureEffect::Released { input, .. } => {
                match input {
                    DragInputKind::Touch => {
                        self.suppression.release_all(doc);
                        let transition = format!(
                            "transform {}ms ease",
                            self.machine.config().settle_transition.as_millis()
                        );
                        self.set_card_style(doc, STYLE_TRANSITION, &transition);
                        self.set_card_style(doc, STYLE_TRANSFORM, &DragTransform::NEUTRAL.to_css());
                    }
                    DragInputKind::Pointer => self.restore_card(doc),
                }
                intents.push(ReorderIntent::DragEnd);
            }
            GestureEffect::DragCanceled { .. } | GestureEffect::SettleInterrupted { .. } => {
                self.suppression.release_all(doc);
                self.restore_card(doc);
            }
            GestureEffect::Settled => self.restore_card(doc),
        }
    }

    fn set_card_style(&self, doc: &mut Document, property: &str, value: &str) {
        let Some(card) = self.card else { return };
        if let Err(err) = doc.set_style(card, property, value) {
            tracing::debug!(target: LOG_TARGET, %err, property, "card style not applied");
        }
    }

    /// Drop every inline style the drag applied to the card.
    fn restore_card(&mut self, doc: &mut Document) {
        if let Some(card) = self.card.take() {
            doc.remove_style(card, STYLE_Z_INDEX);
            doc.remove_style(card, STYLE_TRANSITION);
            doc.remove_style(card, STYLE_TRANSFORM);
        }
    }
}

/// Position index of the card under `point`, from untransformed layout.
#[must_use]
pub fn hovered_index(doc: &Document, point: Point) -> Option<usize> {
    let hit = doc.element_from_point(point)?;
    let card = doc.closest(hit, ATTR_INDEX)?;
    doc.attribute(card, ATTR_INDEX)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ATTR_DRAG_ACTIVE, ATTR_SWIPE_REGION, STYLE_POINTER_EVENTS};
    use reel_core::geometry::Rect;
    use reel_core::preference::MemoryPreferences;

    use pretty_assertions::assert_eq;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_200: Duration = Duration::from_millis(200);
    const MS_250: Duration = Duration::from_millis(250);

    struct Fixture {
        doc: Document,
        cards: Vec<ElementId>,
        regions: Vec<ElementId>,
        handle: DragHandle,
        prefs: MemoryPreferences,
    }

    /// Three 100px cards, each wrapped in a swipe region with a handle at
    /// the right edge. The handle under test belongs to card 1.
    fn fixture() -> Fixture {
        let mut doc = Document::new(Rect::new(0.0, 0.0, 400.0, 600.0));
        let list = doc
            .create_element(doc.root(), "ul", Rect::new(0.0, 0.0, 400.0, 300.0))
            .unwrap();
        let mut cards = Vec::new();
        let mut regions = Vec::new();
        let mut handles = Vec::new();
        for i in 0..3 {
            let top = i as f32 * 100.0;
            let card = doc
                .create_element(list, "li", Rect::new(0.0, top, 400.0, 100.0))
                .unwrap();
            doc.set_attribute(card, ATTR_INDEX, &i.to_string()).unwrap();
            let region = doc
                .create_element(card, "div", Rect::new(0.0, top, 400.0, 100.0))
                .unwrap();
            doc.set_attribute(region, ATTR_SWIPE_REGION, "").unwrap();
            let handle = doc
                .create_element(region, "button", Rect::new(360.0, top + 30.0, 40.0, 40.0))
                .unwrap();
            cards.push(card);
            regions.push(region);
            handles.push(handle);
        }
        let handle = DragHandle::new(GestureConfig::default(), handles[1], "b", 1).unwrap();
        Fixture {
            doc,
            cards,
            regions,
            handle,
            prefs: MemoryPreferences::new(),
        }
    }

    fn touch(x: f32, y: f32) -> Vec<TouchPoint> {
        vec![TouchPoint::new(0, Point::new(x, y))]
    }

    fn start_drag(f: &mut Fixture) -> HandleDispatch {
        let d = f
            .handle
            .touch_start(&mut f.doc, &f.prefs, touch(380.0, 150.0), Duration::ZERO);
        assert!(d.intents.is_empty());
        f.handle.tick(&mut f.doc, MS_200)
    }

    #[test]
    fn hold_elapsing_starts_touch_drag() {
        let mut f = fixture();
        let d = start_drag(&mut f);
        assert_eq!(
            d.intents,
            vec![ReorderIntent::DragStart {
                item_id: "b".into(),
                event: DragIntentEvent::Touch {
                    touches: touch(380.0, 150.0)
                },
                index: 1,
            }]
        );
        assert_eq!(
            d.commands,
            vec![HostCommand::Vibrate {
                duration: Duration::from_millis(15)
            }]
        );
        assert_eq!(d.log.sequence, Some(1));
        assert_eq!(d.log.phase_after, GesturePhaseKind::Dragging);
        assert_eq!(f.doc.style(f.cards[1], STYLE_Z_INDEX), Some("1000"));
        assert_eq!(f.doc.style(f.cards[1], STYLE_TRANSITION), Some("none"));
        assert!(f.doc.has_attribute(f.regions[1], ATTR_DRAG_ACTIVE));
        assert_eq!(f.doc.style(f.regions[1], STYLE_POINTER_EVENTS), Some("none"));
    }

    #[test]
    fn tick_before_deadline_is_ignored() {
        let mut f = fixture();
        f.handle
            .touch_start(&mut f.doc, &f.prefs, touch(380.0, 150.0), Duration::ZERO);
        let d = f.handle.tick(&mut f.doc, MS_100);
        assert!(d.is_ignored());
        assert_eq!(
            d.log.outcome,
            HandleLogOutcome::Ignored {
                reason: HandleIgnoredReason::NothingDue
            }
        );
        assert_eq!(f.handle.next_deadline(), Some(MS_200));
    }

    #[test]
    fn legacy_preference_lengthens_hold() {
        let mut f = fixture();
        f.prefs = MemoryPreferences::new().with("reel.quickDragHold", "false");
        f.handle
            .touch_start(&mut f.doc, &f.prefs, touch(380.0, 150.0), Duration::ZERO);
        assert_eq!(f.handle.next_deadline(), Some(Duration::from_millis(400)));
        assert!(f.handle.tick(&mut f.doc, MS_200).is_ignored());
    }

    #[test]
    fn moving_over_another_card_emits_target() {
        let mut f = fixture();
        start_drag(&mut f);

        let same = f.handle.touch_move(&mut f.doc, touch(380.0, 160.0), MS_250);
        assert!(same.intents.is_empty());
        assert_eq!(same.commands, vec![HostCommand::PreventDefault]);
        assert!(f.doc.style(f.cards[1], STYLE_TRANSFORM).is_some());

        let over = f.handle.touch_move(&mut f.doc, touch(380.0, 250.0), MS_250);
        assert_eq!(
            over.intents,
            vec![ReorderIntent::TouchDragMove {
                event: DragIntentEvent::Touch {
                    touches: touch(380.0, 250.0)
                },
                target_index: 2,
            }]
        );

        let again = f.handle.touch_move(&mut f.doc, touch(380.0, 260.0), MS_250);
        assert!(again.intents.is_empty());

        let off_list = f.handle.touch_move(&mut f.doc, touch(380.0, 500.0), MS_250);
        assert!(off_list.intents.is_empty());
        assert_eq!(f.handle.target_index(), Some(2));
    }

    #[test]
    fn touch_end_releases_and_settles() {
        let mut f = fixture();
        start_drag(&mut f);
        f.handle.touch_move(&mut f.doc, touch(380.0, 250.0), MS_250);

        let end = f.handle.touch_end(&mut f.doc, MS_250);
        assert_eq!(end.intents, vec![ReorderIntent::DragEnd]);
        assert!(!f.doc.has_attribute(f.regions[1], ATTR_DRAG_ACTIVE));
        assert_eq!(
            f.doc.style(f.cards[1], STYLE_TRANSFORM),
            Some(DragTransform::NEUTRAL.to_css().as_str())
        );
        assert_eq!(
            f.doc.style(f.cards[1], STYLE_TRANSITION),
            Some("transform 300ms ease")
        );
        assert_eq!(f.doc.style(f.cards[1], STYLE_Z_INDEX), Some("1000"));
        assert_eq!(f.handle.phase_kind(), GesturePhaseKind::Settling);

        let settled = f.handle.tick(&mut f.doc, MS_250 + Duration::from_millis(600));
        assert!(settled.intents.is_empty());
        assert_eq!(f.handle.phase_kind(), GesturePhaseKind::Idle);
        assert_eq!(f.doc.style(f.cards[1], STYLE_Z_INDEX), None);
        assert_eq!(f.doc.style(f.cards[1], STYLE_TRANSFORM), None);
    }

    #[test]
    fn touch_cancel_cleans_up_without_drag_end() {
        let mut f = fixture();
        start_drag(&mut f);
        let d = f.handle.touch_cancel(&mut f.doc, MS_250);
        assert!(d.intents.is_empty());
        assert_eq!(f.handle.phase_kind(), GesturePhaseKind::Idle);
        assert!(f.doc.query_all_with_attribute(ATTR_DRAG_ACTIVE).is_empty());
        assert_eq!(f.doc.style(f.cards[1], STYLE_Z_INDEX), None);
    }

    #[test]
    fn early_move_cancels_arming() {
        let mut f = fixture();
        f.handle
            .touch_start(&mut f.doc, &f.prefs, touch(380.0, 150.0), Duration::ZERO);
        let d = f.handle.touch_move(&mut f.doc, touch(340.0, 151.0), MS_100);
        assert!(d.intents.is_empty());
        assert_eq!(f.handle.next_deadline(), None);
        assert!(f.handle.tick(&mut f.doc, MS_200).is_ignored());
    }

    #[test]
    fn native_drag_elevates_without_suppression() {
        let mut f = fixture();
        let native = NativeDragEvent::new(Point::new(380.0, 150.0));
        let start = f.handle.native_drag_start(&mut f.doc, native, Duration::ZERO);
        assert_eq!(
            start.intents,
            vec![ReorderIntent::DragStart {
                item_id: "b".into(),
                event: DragIntentEvent::Pointer { native },
                index: 1,
            }]
        );
        assert!(start.commands.is_empty());
        assert_eq!(f.doc.style(f.cards[1], STYLE_Z_INDEX), Some("1000"));
        assert_eq!(f.doc.style(f.cards[1], STYLE_TRANSITION), Some("none"));
        assert!(f.doc.query_all_with_attribute(ATTR_DRAG_ACTIVE).is_empty());

        let end = f.handle.native_drag_end(&mut f.doc, MS_100);
        assert_eq!(end.intents, vec![ReorderIntent::DragEnd]);
        assert_eq!(f.doc.style(f.cards[1], STYLE_Z_INDEX), None);
        assert_eq!(f.doc.style(f.cards[1], STYLE_TRANSITION), None);
        assert_eq!(f.handle.phase_kind(), GesturePhaseKind::Idle);
    }

    #[test]
    fn keyboard_requires_focus_and_arrow_keys() {
        let mut f = fixture();
        assert_eq!(
            f.handle.key_down(KeyCode::ArrowUp).log.outcome,
            HandleLogOutcome::Ignored {
                reason: HandleIgnoredReason::NotFocused
            }
        );
        f.handle.focus();
        assert_eq!(
            f.handle.key_down(KeyCode::ArrowUp).intents,
            vec![ReorderIntent::KeyboardReorder {
                direction: ReorderDirection::Up
            }]
        );
        assert_eq!(
            f.handle.key_down(KeyCode::ArrowDown).intents,
            vec![ReorderIntent::KeyboardReorder {
                direction: ReorderDirection::Down
            }]
        );
        assert!(f.handle.key_down(KeyCode::ArrowLeft).is_ignored());
        assert!(f.handle.key_down(KeyCode::Enter).is_ignored());
        f.handle.blur();
        assert!(f.handle.key_down(KeyCode::ArrowDown).is_ignored());
    }

    #[test]
    fn only_effectful_dispatches_are_sequenced() {
        let mut f = fixture();
        let idle_cancel = f.handle.cancel(&mut f.doc, Duration::ZERO);
        assert_eq!(idle_cancel.log.outcome, HandleLogOutcome::Forwarded);
        assert_eq!(idle_cancel.log.sequence, None);

        f.handle.focus();
        assert_eq!(f.handle.key_down(KeyCode::ArrowDown).log.sequence, Some(1));
        // touchstart arms (2), the hold tick starts the drag (3).
        assert_eq!(start_drag(&mut f).log.sequence, Some(3));

        let gone = f.handle.unmount(&mut f.doc, MS_250);
        assert_eq!(gone.log.sequence, Some(4));
    }

    #[test]
    fn unmount_mid_drag_cleans_everything() {
        let mut f = fixture();
        start_drag(&mut f);
        f.handle.touch_move(&mut f.doc, touch(380.0, 250.0), MS_250);

        let d = f.handle.unmount(&mut f.doc, MS_250);
        assert!(d.intents.is_empty());
        assert!(!f.handle.is_mounted());
        assert!(f.doc.query_all_with_attribute(ATTR_DRAG_ACTIVE).is_empty());
        assert_eq!(f.doc.style(f.cards[1], STYLE_TRANSFORM), None);
        assert_eq!(f.handle.next_deadline(), None);

        let late = f
            .handle
            .touch_start(&mut f.doc, &f.prefs, touch(380.0, 150.0), MS_250);
        assert_eq!(
            late.log.outcome,
            HandleLogOutcome::Ignored {
                reason: HandleIgnoredReason::Unmounted
            }
        );
    }

    #[test]
    fn unmount_after_card_removed_still_releases_markers() {
        let mut f = fixture();
        start_drag(&mut f);
        let card = f.cards[1];
        f.doc.remove_element(card).unwrap();
        f.doc
            .set_attribute(f.regions[0], ATTR_DRAG_ACTIVE, "true")
            .unwrap();
        f.handle.unmount(&mut f.doc, MS_250);
        assert!(f.doc.query_all_with_attribute(ATTR_DRAG_ACTIVE).is_empty());
    }

    #[test]
    fn second_touch_start_while_dragging_is_ignored() {
        let mut f = fixture();
        start_drag(&mut f);
        let d = f
            .handle
            .touch_start(&mut f.doc, &f.prefs, touch(380.0, 150.0), MS_250);
        assert_eq!(
            d.log.outcome,
            HandleLogOutcome::Ignored {
                reason: HandleIgnoredReason::Machine {
                    noop: GestureNoopReason::ActiveDragInProgress
                }
            }
        );
        assert!(f.handle.is_dragging());
    }

    #[test]
    fn hovered_index_reads_closest_card() {
        let f = fixture();
        assert_eq!(hovered_index(&f.doc, Point::new(10.0, 10.0)), Some(0));
        assert_eq!(hovered_index(&f.doc, Point::new(380.0, 250.0)), Some(2));
        assert_eq!(hovered_index(&f.doc, Point::new(10.0, 450.0)), None);
    }
}
