#![forbid(unsafe_code)]

//! Reference list container that consumes reorder intents.
//!
//! A drag is committed once, on `DragEnd`, by removing the dragged item and
//! reinserting it at the last hovered position. Hover updates only move the
//! drop hint. Keyboard reorders swap with the neighbor and are no-ops at the
//! list edges.

use reel_core::intent::{DragIntentEvent, ReorderDirection, ReorderListener};
use reel_core::logging::LOG_TARGET;

/// An in-flight drag as the container sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveReorder {
    pub item_id: String,
    pub source: usize,
    pub hovered: usize,
}

/// A committed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderMove {
    pub from: usize,
    pub to: usize,
}

/// Ordered items with at most one drag in flight.
#[derive(Debug, Clone)]
pub struct ReorderableList<T> {
    items: Vec<T>,
    active: Option<ActiveReorder>,
    last_move: Option<ReorderMove>,
}

impl<T> ReorderableList<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            active: None,
            last_move: None,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveReorder> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Drop-hint position while a drag is in flight.
    #[must_use]
    pub fn hovered_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.hovered)
    }

    /// Most recent committed move.
    #[must_use]
    pub const fn last_move(&self) -> Option<ReorderMove> {
        self.last_move
    }

    /// Bind the listener for the card at `index`.
    ///
    /// Mirrors per-card callbacks: keyboard reorders need to know which card
    /// they came from, while drag intents carry their own index.
    pub fn card(&mut self, index: usize) -> CardListener<'_, T> {
        CardListener { list: self, index }
    }

    /// Native `dragover` on a card (mouse path hover tracking).
    pub fn drag_over(&mut self, index: usize) {
        let last = self.items.len().saturating_sub(1);
        if let Some(active) = self.active.as_mut() {
            active.hovered = index.min(last);
        }
    }

    /// Move the item at `from` to `to`. Out-of-range `from` is rejected;
    /// `to` is clamped.
    pub fn move_item(&mut self, from: usize, to: usize) -> Option<ReorderMove> {
        if from >= self.items.len() {
            return None;
        }
        let to = to.min(self.items.len() - 1);
        if from == to {
            return None;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        let committed = ReorderMove { from, to };
        self.last_move = Some(committed);
        tracing::debug!(target: LOG_TARGET, from, to, "list reordered");
        Some(committed)
    }

    fn begin(&mut self, item_id: &str, index: usize) {
        if let Some(active) = &self.active {
            tracing::warn!(
                target: LOG_TARGET,
                active = %active.item_id,
                refused = item_id,
                "drag already in flight"
            );
            return;
        }
        if index >= self.items.len() {
            tracing::warn!(target: LOG_TARGET, index, len = self.items.len(), "drag start out of range");
            return;
        }
        self.active = Some(ActiveReorder {
            item_id: item_id.to_owned(),
            source: index,
            hovered: index,
        });
    }

    fn commit(&mut self) -> Option<ReorderMove> {
        let active = self.active.take()?;
        self.move_item(active.source, active.hovered)
    }

    fn nudge(&mut self, index: usize, direction: ReorderDirection) -> Option<ReorderMove> {
        let to = match direction {
            ReorderDirection::Up => index.checked_sub(1)?,
            ReorderDirection::Down => index.checked_add(1).filter(|to| *to < self.items.len())?,
        };
        self.move_item(index, to)
    }
}

/// [`ReorderListener`] bound to one card of a [`ReorderableList`].
#[derive(Debug)]
pub struct CardListener<'a, T> {
    list: &'a mut ReorderableList<T>,
    index: usize,
}

impl<T> ReorderListener for CardListener<'_, T> {
    fn on_drag_start(&mut self, item_id: &str, _event: &DragIntentEvent, index: usize) {
        self.list.begin(item_id, index);
    }

    fn on_touch_drag_move(&mut self, _event: &DragIntentEvent, target_index: usize) {
        self.list.drag_over(target_index);
    }

    fn on_drag_end(&mut self) {
        self.list.commit();
    }

    fn on_keyboard_reorder(&mut self, direction: ReorderDirection) {
        self.list.nudge(self.index, direction);
    }
}
