#![forbid(unsafe_code)]

//! Headless document model.
//!
//! A minimal stand-in for the browser DOM with exactly the surface the
//! reorder controller touches: a parent/child tree, string attributes,
//! inline style properties, layout boxes for hit testing, attribute
//! queries, and `closest`-style ancestor lookup.
//!
//! Layout boxes are never affected by inline `transform` styles, matching
//! the browser rule that transforms are paint-only for the purposes of this
//! controller's hit testing.

use std::collections::BTreeMap;
use std::fmt;

use reel_core::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Position-index attribute carried by every card in a list.
pub const ATTR_INDEX: &str = "data-index";
/// Shared marker telling a swipe recognizer that a reorder drag owns the touch.
pub const ATTR_DRAG_ACTIVE: &str = "data-drag-active";
/// Marks an element that owns horizontal swipe handling.
pub const ATTR_SWIPE_REGION: &str = "data-swipe-region";

pub const STYLE_POINTER_EVENTS: &str = "pointer-events";
pub const STYLE_Z_INDEX: &str = "z-index";
pub const STYLE_TRANSITION: &str = "transition";
pub const STYLE_TRANSFORM: &str = "transform";

/// Handle to an element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(u32);

impl ElementId {
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Document operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomError {
    /// The element was never created or has been removed.
    UnknownElement(ElementId),
    /// The document root cannot be removed.
    RootRemoval,
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownElement(id) => write!(f, "unknown or removed element {id}"),
            Self::RootRemoval => write!(f, "the document root cannot be removed"),
        }
    }
}

impl std::error::Error for DomError {}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    rect: Rect,
}

impl Node {
    fn new(tag: &str, parent: Option<ElementId>, rect: Rect) -> Self {
        Self {
            tag: tag.to_owned(),
            parent,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            rect,
        }
    }
}

/// An element tree with attributes, inline styles and layout boxes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    root: ElementId,
}

impl Document {
    /// Create a document whose root (`body`) covers `viewport`.
    #[must_use]
    pub fn new(viewport: Rect) -> Self {
        Self {
            nodes: vec![Some(Node::new("body", None, viewport))],
            root: ElementId(0),
        }
    }

    #[must_use]
    pub const fn root(&self) -> ElementId {
        self.root
    }

    /// Whether `id` refers to a live element.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live elements, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a new element under `parent`.
    pub fn create_element(
        &mut self,
        parent: ElementId,
        tag: &str,
        rect: Rect,
    ) -> Result<ElementId, DomError> {
        let id = ElementId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.node_mut(parent)?.children.push(id);
        self.nodes.push(Some(Node::new(tag, Some(parent), rect)));
        Ok(id)
    }

    /// Remove an element and its whole subtree.
    pub fn remove_element(&mut self, id: ElementId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::RootRemoval);
        }
        let parent = self.node(id).ok_or(DomError::UnknownElement(id))?.parent;
        if let Some(parent) = parent
            && let Ok(parent) = self.node_mut(parent)
        {
            parent.children.retain(|child| *child != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0 as usize).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.parent
    }

    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        match self.node(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    #[must_use]
    pub fn tag(&self, id: ElementId) -> Option<&str> {
        self.node(id).map(|node| node.tag.as_str())
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), DomError> {
        self.node_mut(id)?
            .attributes
            .insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    /// Remove an attribute; returns whether it was present.
    pub fn remove_attribute(&mut self, id: ElementId, name: &str) -> bool {
        self.node_mut(id)
            .is_ok_and(|node| node.attributes.remove(name).is_some())
    }

    #[must_use]
    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.node(id)?.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn has_attribute(&self, id: ElementId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_style(&mut self, id: ElementId, property: &str, value: &str) -> Result<(), DomError> {
        self.node_mut(id)?
            .style
            .insert(property.to_owned(), value.to_owned());
        Ok(())
    }

    /// Clear an inline style property; returns whether it was set.
    pub fn remove_style(&mut self, id: ElementId, property: &str) -> bool {
        self.node_mut(id)
            .is_ok_and(|node| node.style.remove(property).is_some())
    }

    #[must_use]
    pub fn style(&self, id: ElementId, property: &str) -> Option<&str> {
        self.node(id)?.style.get(property).map(String::as_str)
    }

    pub fn set_rect(&mut self, id: ElementId, rect: Rect) -> Result<(), DomError> {
        self.node_mut(id)?.rect = rect;
        Ok(())
    }

    #[must_use]
    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.node(id).map(|node| node.rect)
    }

    /// Nearest inclusive ancestor of `id` carrying attribute `name`.
    #[must_use]
    pub fn closest(&self, id: ElementId, name: &str) -> Option<ElementId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            if node.attributes.contains_key(name) {
                return Some(current);
            }
            cursor = node.parent;
        }
        None
    }

    /// Every live element carrying attribute `name`, in document order.
    #[must_use]
    pub fn query_all_with_attribute(&self, name: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if node.attributes.contains_key(name) {
                found.push(id);
            }
            stack.extend(node.children.iter().rev());
        }
        found
    }

    /// Every live element with inline style `property` set to `value`.
    #[must_use]
    pub fn query_all_with_style(&self, property: &str, value: &str) -> Vec<ElementId> {
        (0..self.nodes.len())
            .map(|i| ElementId(i as u32))
            .filter(|id| self.style(*id, property) == Some(value))
            .collect()
    }

    /// Topmost element whose layout box contains `point`.
    ///
    /// Later siblings paint above earlier ones and children above parents.
    #[must_use]
    pub fn element_from_point(&self, point: Point) -> Option<ElementId> {
        self.hit_test(self.root, point)
    }

    fn hit_test(&self, id: ElementId, point: Point) -> Option<ElementId> {
        let node = self.node(id)?;
        for child in node.children.iter().rev() {
            if let Some(hit) = self.hit_test(*child, point) {
                return Some(hit);
            }
        }
        node.rect.contains(point).then_some(id)
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    fn node_mut(&mut self, id: ElementId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(DomError::UnknownElement(id))
    }
}
