#![forbid(unsafe_code)]

//! Swipe suppression shared between a drag handle and swipe regions.
//!
//! While a touch reorder drag is active, the enclosing swipe region of the
//! dragged card carries [`ATTR_DRAG_ACTIVE`] and `pointer-events: none`.
//! Every [`SwipeRegion`] consults that marker before claiming a gesture, so
//! the document itself is the shared drag-session context.
//!
//! Release is global: [`SwipeSuppression::release_all`] clears every marked
//! element in the document, not only the one this handle marked. A handle
//! unmounted mid-drag therefore cannot strand a marker on a region that no
//! other handle knows about.

use reel_core::geometry::Point;
use reel_core::logging::LOG_TARGET;
use serde::{Deserialize, Serialize};

use crate::dom::{ATTR_DRAG_ACTIVE, ATTR_SWIPE_REGION, Document, ElementId, STYLE_POINTER_EVENTS};

const MARKER_VALUE: &str = "true";
const POINTER_EVENTS_NONE: &str = "none";

/// Whether `region` is currently suppressed by an active reorder drag.
#[must_use]
pub fn is_suppressed(doc: &Document, region: ElementId) -> bool {
    doc.has_attribute(region, ATTR_DRAG_ACTIVE)
}

/// Nearest enclosing swipe region of `element`, inclusive.
#[must_use]
pub fn nearest_swipe_region(doc: &Document, element: ElementId) -> Option<ElementId> {
    doc.closest(element, ATTR_SWIPE_REGION)
}

/// Outcome of a global release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseReport {
    /// Markers removed in total.
    pub cleared: usize,
    /// Markers removed that this handle did not set.
    pub foreign: usize,
}

/// Per-handle suppression bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SwipeSuppression {
    marked: Option<ElementId>,
}

impl SwipeSuppression {
    #[must_use]
    pub const fn new() -> Self {
        Self { marked: None }
    }

    /// Region this handle marked most recently, if still outstanding.
    #[must_use]
    pub const fn marked(&self) -> Option<ElementId> {
        self.marked
    }

    /// Mark the swipe region enclosing `handle` as suppressed.
    ///
    /// Returns the marked region, or `None` when the handle has no
    /// enclosing swipe region.
    pub fn suppress(&mut self, doc: &mut Document, handle: ElementId) -> Option<ElementId> {
        let region = nearest_swipe_region(doc, handle)?;
        doc.set_attribute(region, ATTR_DRAG_ACTIVE, MARKER_VALUE).ok()?;
        doc.set_style(region, STYLE_POINTER_EVENTS, POINTER_EVENTS_NONE)
            .ok()?;
        self.marked = Some(region);
        tracing::debug!(
            target: LOG_TARGET,
            region = region.raw(),
            "swipe region suppressed"
        );
        Some(region)
    }

    /// Clear every suppression marker in the document.
    pub fn release_all(&mut self, doc: &mut Document) -> ReleaseReport {
        let own = self.marked.take();
        let mut report = ReleaseReport::default();
        for region in doc.query_all_with_attribute(ATTR_DRAG_ACTIVE) {
            doc.remove_attribute(region, ATTR_DRAG_ACTIVE);
            if doc.style(region, STYLE_POINTER_EVENTS) == Some(POINTER_EVENTS_NONE) {
                doc.remove_style(region, STYLE_POINTER_EVENTS);
            }
            report.cleared += 1;
            if Some(region) != own {
                report.foreign += 1;
            }
        }
        if report.foreign > 0 {
            tracing::warn!(
                target: LOG_TARGET,
                cleared = report.cleared,
                foreign = report.foreign,
                "released suppression markers set by another handle"
            );
        } else if report.cleared > 0 {
            tracing::debug!(target: LOG_TARGET, cleared = report.cleared, "swipe suppression released");
        }
        report
    }
}

/// Horizontal swipe direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
}

/// Result of feeding a move to a [`SwipeRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum SwipeDecision {
    /// No gesture is being tracked.
    Idle,
    /// Tracking, threshold not yet reached.
    Pending,
    /// Horizontal swipe recognized.
    Claimed { direction: SwipeDirection, distance: f32 },
    /// Tracking abandoned: vertical motion, or a reorder drag took over.
    Rejected,
}

/// Minimal horizontal swipe recognizer that yields to reorder drags.
#[derive(Debug, Clone)]
pub struct SwipeRegion {
    element: ElementId,
    threshold_px: f32,
    start: Option<Point>,
    claimed: bool,
}

impl SwipeRegion {
    pub const DEFAULT_THRESHOLD_PX: f32 = 40.0;

    #[must_use]
    pub const fn new(element: ElementId) -> Self {
        Self {
            element,
            threshold_px: Self::DEFAULT_THRESHOLD_PX,
            start: None,
            claimed: false,
        }
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold_px: f32) -> Self {
        self.threshold_px = threshold_px;
        self
    }

    #[must_use]
    pub const fn element(&self) -> ElementId {
        self.element
    }

    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    /// Begin tracking unless suppressed. Returns whether tracking started.
    pub fn touch_start(&mut self, doc: &Document, point: Point) -> bool {
        self.claimed = false;
        if is_suppressed(doc, self.element) {
            self.start = None;
            return false;
        }
        self.start = Some(point);
        true
    }

    pub fn touch_move(&mut self, doc: &Document, point: Point) -> SwipeDecision {
        let Some(start) = self.start else {
            return SwipeDecision::Idle;
        };
        if is_suppressed(doc, self.element) {
            self.reset();
            return SwipeDecision::Rejected;
        }
        let delta = point.delta_from(start);
        if self.claimed || (delta.x.abs() > self.threshold_px && delta.x.abs() > delta.y.abs()) {
            self.claimed = true;
            let direction = if delta.x < 0.0 {
                SwipeDirection::Left
            } else {
                SwipeDirection::Right
            };
            return SwipeDecision::Claimed {
                direction,
                distance: delta.x.abs(),
            };
        }
        if delta.y.abs() > self.threshold_px {
            self.reset();
            return SwipeDecision::Rejected;
        }
        SwipeDecision::Pending
    }

    pub fn touch_end(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.start = None;
        self.claimed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::geometry::Rect;

    fn region_doc() -> (Document, ElementId, ElementId) {
        let mut doc = Document::new(Rect::new(0.0, 0.0, 400.0, 400.0));
        let region = doc
            .create_element(doc.root(), "div", Rect::new(0.0, 0.0, 400.0, 100.0))
            .unwrap();
        doc.set_attribute(region, ATTR_SWIPE_REGION, "").unwrap();
        let handle = doc
            .create_element(region, "button", Rect::new(360.0, 30.0, 40.0, 40.0))
            .unwrap();
        (doc, region, handle)
    }

    #[test]
    fn suppress_marks_enclosing_region() {
        let (mut doc, region, handle) = region_doc();
        let mut s = SwipeSuppression::new();
        assert_eq!(s.suppress(&mut doc, handle), Some(region));
        assert!(is_suppressed(&doc, region));
        assert_eq!(doc.style(region, STYLE_POINTER_EVENTS), Some("none"));

        let report = s.release_all(&mut doc);
        assert_eq!(report, ReleaseReport { cleared: 1, foreign: 0 });
        assert!(!is_suppressed(&doc, region));
        assert_eq!(doc.style(region, STYLE_POINTER_EVENTS), None);
        assert_eq!(s.marked(), None);
    }

    #[test]
    fn handle_without_region_suppresses_nothing() {
        let mut doc = Document::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let handle = doc
            .create_element(doc.root(), "button", Rect::new(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        assert_eq!(SwipeSuppression::new().suppress(&mut doc, handle), None);
    }

    #[test]
    fn release_is_global() {
        let (mut doc, region, _) = region_doc();
        doc.set_attribute(region, ATTR_DRAG_ACTIVE, "true").unwrap();
        let report = SwipeSuppression::new().release_all(&mut doc);
        assert_eq!(report, ReleaseReport { cleared: 1, foreign: 1 });
        assert!(doc.query_all_with_attribute(ATTR_DRAG_ACTIVE).is_empty());
    }

    #[test]
    fn release_keeps_foreign_pointer_events_value() {
        let (mut doc, region, _) = region_doc();
        doc.set_attribute(region, ATTR_DRAG_ACTIVE, "true").unwrap();
        doc.set_style(region, STYLE_POINTER_EVENTS, "auto").unwrap();
        SwipeSuppression::new().release_all(&mut doc);
        assert_eq!(doc.style(region, STYLE_POINTER_EVENTS), Some("auto"));
    }

    #[test]
    fn swipe_claims_horizontal_motion() {
        let (doc, region, _) = region_doc();
        let mut swipe = SwipeRegion::new(region);
        assert!(swipe.touch_start(&doc, Point::new(100.0, 50.0)));
        assert_eq!(swipe.touch_move(&doc, Point::new(120.0, 52.0)), SwipeDecision::Pending);
        assert_eq!(
            swipe.touch_move(&doc, Point::new(50.0, 52.0)),
            SwipeDecision::Claimed {
                direction: SwipeDirection::Left,
                distance: 50.0
            }
        );
        swipe.touch_end();
        assert_eq!(swipe.touch_move(&doc, Point::new(0.0, 0.0)), SwipeDecision::Idle);
    }

    #[test]
    fn swipe_rejects_vertical_motion() {
        let (doc, region, _) = region_doc();
        let mut swipe = SwipeRegion::new(region);
        swipe.touch_start(&doc, Point::new(100.0, 50.0));
        assert_eq!(swipe.touch_move(&doc, Point::new(100.0, 95.0)), SwipeDecision::Rejected);
        assert!(!swipe.is_tracking());
    }

    #[test]
    fn suppressed_region_refuses_and_yields() {
        let (mut doc, region, handle) = region_doc();
        let mut swipe = SwipeRegion::new(region);
        swipe.touch_start(&doc, Point::new(100.0, 50.0));

        let mut s = SwipeSuppression::new();
        s.suppress(&mut doc, handle);
        assert_eq!(swipe.touch_move(&doc, Point::new(10.0, 50.0)), SwipeDecision::Rejected);
        assert!(!swipe.touch_start(&doc, Point::new(100.0, 50.0)));

        s.release_all(&mut doc);
        assert!(swipe.touch_start(&doc, Point::new(100.0, 50.0)));
    }
}
