//! Widget tree.
//!
//! An arena of widgets addressed by generational handles. Destroying a
//! widget destroys its subtree, drops its registered callbacks, and
//! bumps the slot generation so stale handles fail lookups instead of
//! aliasing a reused slot.
//!
//! The tree also carries the per-(widget, event kind) callback registry
//! and the damage bookkeeping the paint step consumes.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::event::{EventCallback, EventKind};
use crate::style::{StateSelector, Style};
use crate::types::{Point, Rect, StateFlags, WidgetFlags, WidgetKind, WidgetState};

// =============================================================================
// Handles
// =============================================================================

/// Stable handle to a widget. Invalidated (not reused) on destroy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId {
    index: u32,
    generation: u32,
}

// =============================================================================
// Widget
// =============================================================================

/// One node in the tree.
#[derive(Debug)]
pub struct Widget {
    kind: WidgetKind,
    parent: Option<WidgetId>,
    children: Vec<WidgetId>,
    flags: WidgetFlags,
    state: StateFlags,
    bounds: Rect,
    dirty: bool,
    styles: Vec<(Rc<Style>, StateSelector)>,
}

impl Widget {
    fn new(kind: WidgetKind, parent: Option<WidgetId>) -> Self {
        let flags = match kind {
            WidgetKind::Button => WidgetFlags::CLICKABLE | WidgetFlags::FOCUSABLE,
            WidgetKind::Screen | WidgetKind::Panel | WidgetKind::Bar => WidgetFlags::CLICKABLE,
            WidgetKind::Label => WidgetFlags::empty(),
        };
        Self {
            kind,
            parent,
            children: Vec::new(),
            flags,
            state: StateFlags::empty(),
            bounds: Rect::default(),
            dirty: true,
            styles: Vec::new(),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn parent(&self) -> Option<WidgetId> {
        self.parent
    }

    pub fn children(&self) -> &[WidgetId] {
        &self.children
    }

    pub fn flags(&self) -> WidgetFlags {
        self.flags
    }

    pub fn state_flags(&self) -> StateFlags {
        self.state
    }

    /// The single state used for style resolution.
    pub fn current_state(&self) -> WidgetState {
        self.state.effective()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Attached styles in attachment order.
    pub fn styles(&self) -> &[(Rc<Style>, StateSelector)] {
        &self.styles
    }
}

// =============================================================================
// Tree
// =============================================================================

struct Slot {
    generation: u32,
    widget: Option<Widget>,
}

/// Arena of widgets plus the event-callback registry.
pub struct WidgetTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<WidgetId>,
    callbacks: HashMap<(WidgetId, EventKind), Vec<EventCallback>>,
    /// Screen area invalidated by destruction or movement, to be
    /// repainted even though no live widget covers it any more.
    damage: Rect,
    layout_dirty: bool,
}

impl WidgetTree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            callbacks: HashMap::new(),
            damage: Rect::default(),
            layout_dirty: false,
        }
    }

    /// Number of live widgets.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.widget.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn roots(&self) -> &[WidgetId] {
        &self.roots
    }

    pub fn is_alive(&self, id: WidgetId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: WidgetId) -> Option<&Widget> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.widget.as_ref()
    }

    fn get_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.widget.as_mut()
    }

    // =========================================================================
    // Creation / Destruction
    // =========================================================================

    /// Create a widget owned by `parent`, or a root widget if `parent`
    /// is `None`.
    pub fn create(&mut self, parent: Option<WidgetId>, kind: WidgetKind) -> Result<WidgetId> {
        if let Some(p) = parent {
            if !self.is_alive(p) {
                return Err(Error::Lookup);
            }
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    widget: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let generation = self.slots[index as usize].generation;
        let id = WidgetId { index, generation };

        self.slots[index as usize].widget = Some(Widget::new(kind, parent));

        match parent {
            Some(p) => {
                // Parent liveness checked above.
                if let Some(pw) = self.get_mut(p) {
                    pw.children.push(id);
                }
            }
            None => self.roots.push(id),
        }

        self.layout_dirty = true;
        Ok(id)
    }

    /// Destroy a widget and its whole subtree. Registered callbacks go
    /// with it; handles into the subtree become stale.
    pub fn destroy(&mut self, id: WidgetId) -> Result<()> {
        let widget = self.get(id).ok_or(Error::Lookup)?;
        let parent = widget.parent;

        // Unlink from the parent (or root list) first.
        match parent {
            Some(p) => {
                if let Some(pw) = self.get_mut(p) {
                    pw.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        // Post-order release of the subtree.
        let mut stack = vec![id];
        let mut subtree = Vec::new();
        while let Some(current) = stack.pop() {
            subtree.push(current);
            if let Some(w) = self.get(current) {
                stack.extend(w.children.iter().copied());
            }
        }

        for wid in subtree {
            if let Some(slot) = self.slots.get_mut(wid.index as usize) {
                if slot.generation != wid.generation {
                    continue;
                }
                if let Some(w) = slot.widget.take() {
                    self.damage = self.damage.union(&w.bounds);
                }
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(wid.index);
            }
            self.callbacks.retain(|(owner, _), _| *owner != wid);
        }

        self.layout_dirty = true;
        Ok(())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Attach a style for the given interaction-state selector. Styles
    /// stack in attachment order.
    pub fn attach_style(
        &mut self,
        id: WidgetId,
        style: Rc<Style>,
        selector: StateSelector,
    ) -> Result<()> {
        let w = self.get_mut(id).ok_or(Error::Lookup)?;
        w.styles.push((style, selector));
        w.dirty = true;
        self.layout_dirty = true;
        Ok(())
    }

    /// Set bounds explicitly. The widget becomes floating: the layout
    /// pass will never overwrite these bounds.
    pub fn set_bounds(&mut self, id: WidgetId, bounds: Rect) -> Result<()> {
        let w = self.get_mut(id).ok_or(Error::Lookup)?;
        let old = w.bounds;
        w.bounds = bounds;
        w.flags.insert(WidgetFlags::FLOATING);
        w.dirty = true;
        self.damage = self.damage.union(&old);
        self.layout_dirty = true;
        Ok(())
    }

    /// Used by the layout pass; keeps the floating flag untouched.
    pub(crate) fn set_computed_bounds(&mut self, id: WidgetId, bounds: Rect) {
        if let Some(w) = self.get_mut(id) {
            if w.bounds != bounds {
                let old = w.bounds;
                w.bounds = bounds;
                w.dirty = true;
                self.damage = self.damage.union(&old);
            }
        }
    }

    pub fn set_flags(&mut self, id: WidgetId, flags: WidgetFlags, on: bool) -> Result<()> {
        let w = self.get_mut(id).ok_or(Error::Lookup)?;
        w.flags.set(flags, on);
        w.dirty = true;
        Ok(())
    }

    /// Toggle interaction state bits (pressed, focused, disabled) and
    /// mark the widget for repaint. State-selector styles may carry
    /// dimensions, so a state change also invalidates layout.
    pub fn set_state_flags(&mut self, id: WidgetId, state: StateFlags, on: bool) -> Result<()> {
        let w = self.get_mut(id).ok_or(Error::Lookup)?;
        if w.state.contains(state) != on {
            w.state.set(state, on);
            w.dirty = true;
            self.layout_dirty = true;
        }
        Ok(())
    }

    pub fn mark_dirty(&mut self, id: WidgetId) -> Result<()> {
        let w = self.get_mut(id).ok_or(Error::Lookup)?;
        w.dirty = true;
        Ok(())
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Append a callback for the (widget, kind) pair. Multiple callbacks
    /// run in registration order.
    pub fn register_callback(
        &mut self,
        id: WidgetId,
        kind: EventKind,
        callback: EventCallback,
    ) -> Result<()> {
        if !self.is_alive(id) {
            return Err(Error::Lookup);
        }
        self.callbacks.entry((id, kind)).or_default().push(callback);
        Ok(())
    }

    /// Number of callbacks registered for a pair (diagnostics/tests).
    pub fn callback_count(&self, id: WidgetId, kind: EventKind) -> usize {
        self.callbacks.get(&(id, kind)).map_or(0, Vec::len)
    }

    /// Move the callback list out so the dispatcher can run it while the
    /// tree stays mutable.
    pub(crate) fn take_callbacks(&mut self, id: WidgetId, kind: EventKind) -> Vec<EventCallback> {
        self.callbacks
            .get_mut(&(id, kind))
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Put a taken callback list back, keeping any callbacks registered
    /// during dispatch after the original ones. No-op for a widget that
    /// died mid-dispatch.
    pub(crate) fn restore_callbacks(
        &mut self,
        id: WidgetId,
        kind: EventKind,
        mut list: Vec<EventCallback>,
    ) {
        if !self.is_alive(id) {
            return;
        }
        let slot = self.callbacks.entry((id, kind)).or_default();
        list.append(slot);
        *slot = list;
    }

    // =========================================================================
    // Hit-Testing
    // =========================================================================

    /// The deepest visible widget whose bounds contain `point`.
    ///
    /// Children are tested before their parent; among overlapping
    /// siblings the last-added child wins. Hidden widgets exclude their
    /// whole subtree.
    pub fn hit_test(&self, point: Point) -> Option<WidgetId> {
        for root in self.roots.iter().rev() {
            if let Some(hit) = self.hit_test_from(*root, point) {
                return Some(hit);
            }
        }
        None
    }

    fn hit_test_from(&self, id: WidgetId, point: Point) -> Option<WidgetId> {
        let w = self.get(id)?;
        if w.flags.contains(WidgetFlags::HIDDEN) {
            return None;
        }
        if !w.bounds.contains(point) {
            return None;
        }
        for child in w.children.iter().rev() {
            if let Some(hit) = self.hit_test_from(*child, point) {
                return Some(hit);
            }
        }
        Some(id)
    }

    // =========================================================================
    // Damage / Layout Bookkeeping
    // =========================================================================

    /// Collect the union of all dirty widget bounds plus structural
    /// damage, clearing both. The paint step consumes this once per
    /// tick.
    pub(crate) fn take_damage(&mut self) -> Option<Rect> {
        let mut damage = std::mem::take(&mut self.damage);
        for slot in &mut self.slots {
            if let Some(w) = slot.widget.as_mut() {
                if w.dirty {
                    damage = damage.union(&w.bounds);
                    w.dirty = false;
                }
            }
        }
        if damage.is_empty() { None } else { Some(damage) }
    }

    /// True once per structural/style change; cleared by the caller
    /// running the layout pass.
    pub(crate) fn take_layout_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.layout_dirty, false)
    }
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_lookup() {
        let mut tree = WidgetTree::new();
        let root = tree.create(None, WidgetKind::Screen).unwrap();
        let child = tree.create(Some(root), WidgetKind::Button).unwrap();

        assert!(tree.is_alive(root));
        assert!(tree.is_alive(child));
        assert_eq!(tree.get(child).unwrap().parent(), Some(root));
        assert_eq!(tree.get(root).unwrap().children(), &[child]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_create_under_dead_parent_fails() {
        let mut tree = WidgetTree::new();
        let root = tree.create(None, WidgetKind::Screen).unwrap();
        tree.destroy(root).unwrap();
        assert!(matches!(
            tree.create(Some(root), WidgetKind::Button),
            Err(Error::Lookup)
        ));
    }

    #[test]
    fn test_destroy_is_recursive() {
        let mut tree = WidgetTree::new();
        let root = tree.create(None, WidgetKind::Screen).unwrap();
        let panel = tree.create(Some(root), WidgetKind::Panel).unwrap();
        let button = tree.create(Some(panel), WidgetKind::Button).unwrap();

        tree.destroy(panel).unwrap();

        assert!(tree.is_alive(root));
        assert!(!tree.is_alive(panel));
        assert!(!tree.is_alive(button));
        assert!(tree.get(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_destroy_invalidates_handles_without_aliasing() {
        let mut tree = WidgetTree::new();
        let old = tree.create(None, WidgetKind::Button).unwrap();
        tree.destroy(old).unwrap();

        // Slot gets reused, but the stale handle must not see the new widget.
        let new = tree.create(None, WidgetKind::Panel).unwrap();
        assert!(!tree.is_alive(old));
        assert!(tree.is_alive(new));
        assert_ne!(old, new);
    }

    #[test]
    fn test_destroy_drops_callbacks() {
        let mut tree = WidgetTree::new();
        let w = tree.create(None, WidgetKind::Button).unwrap();
        tree.register_callback(w, EventKind::Pressed, Box::new(|_, _| {}))
            .unwrap();
        assert_eq!(tree.callback_count(w, EventKind::Pressed), 1);

        tree.destroy(w).unwrap();
        assert_eq!(tree.callback_count(w, EventKind::Pressed), 0);
    }

    #[test]
    fn test_hit_test_deepest_wins() {
        let mut tree = WidgetTree::new();
        let root = tree.create(None, WidgetKind::Screen).unwrap();
        let inner = tree.create(Some(root), WidgetKind::Button).unwrap();
        tree.set_bounds(root, Rect::new(0, 0, 200, 200)).unwrap();
        tree.set_bounds(inner, Rect::new(50, 50, 100, 100)).unwrap();

        assert_eq!(tree.hit_test(Point::new(60, 60)), Some(inner));
        assert_eq!(tree.hit_test(Point::new(10, 10)), Some(root));
        assert_eq!(tree.hit_test(Point::new(300, 300)), None);
    }

    #[test]
    fn test_hit_test_last_added_sibling_wins() {
        let mut tree = WidgetTree::new();
        let root = tree.create(None, WidgetKind::Screen).unwrap();
        let first = tree.create(Some(root), WidgetKind::Button).unwrap();
        let second = tree.create(Some(root), WidgetKind::Button).unwrap();
        tree.set_bounds(root, Rect::new(0, 0, 200, 200)).unwrap();
        tree.set_bounds(first, Rect::new(10, 10, 50, 50)).unwrap();
        tree.set_bounds(second, Rect::new(10, 10, 50, 50)).unwrap();

        assert_eq!(tree.hit_test(Point::new(20, 20)), Some(second));
    }

    #[test]
    fn test_hit_test_is_idempotent() {
        let mut tree = WidgetTree::new();
        let root = tree.create(None, WidgetKind::Screen).unwrap();
        tree.set_bounds(root, Rect::new(0, 0, 100, 100)).unwrap();

        let p = Point::new(5, 5);
        assert_eq!(tree.hit_test(p), tree.hit_test(p));
    }

    #[test]
    fn test_hidden_excludes_subtree() {
        let mut tree = WidgetTree::new();
        let root = tree.create(None, WidgetKind::Screen).unwrap();
        let panel = tree.create(Some(root), WidgetKind::Panel).unwrap();
        let button = tree.create(Some(panel), WidgetKind::Button).unwrap();
        tree.set_bounds(root, Rect::new(0, 0, 200, 200)).unwrap();
        tree.set_bounds(panel, Rect::new(0, 0, 100, 100)).unwrap();
        tree.set_bounds(button, Rect::new(0, 0, 50, 50)).unwrap();

        tree.set_flags(panel, WidgetFlags::HIDDEN, true).unwrap();
        assert_eq!(tree.hit_test(Point::new(10, 10)), Some(root));
    }

    #[test]
    fn test_take_damage_collects_and_clears() {
        let mut tree = WidgetTree::new();
        let w = tree.create(None, WidgetKind::Button).unwrap();
        tree.set_bounds(w, Rect::new(10, 10, 20, 20)).unwrap();

        let damage = tree.take_damage().unwrap();
        assert!(damage.contains(Point::new(15, 15)));
        assert!(tree.take_damage().is_none());
    }

    #[test]
    fn test_destroy_leaves_damage() {
        let mut tree = WidgetTree::new();
        let w = tree.create(None, WidgetKind::Button).unwrap();
        tree.set_bounds(w, Rect::new(10, 10, 20, 20)).unwrap();
        let _ = tree.take_damage();

        tree.destroy(w).unwrap();
        let damage = tree.take_damage().unwrap();
        assert!(damage.contains(Point::new(15, 15)));
    }
}
