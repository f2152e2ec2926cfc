//! Events and dispatch.
//!
//! An [`Event`] is a per-tick value: kind, target widget, payload, and a
//! consumed flag. The dispatcher invokes every callback registered for
//! the (target, kind) pair in registration order. A callback may consume
//! the event to suppress the default behaviour (the press/focus visual
//! state change) - consumption never stops later callbacks in the same
//! list. Events whose target is gone are silently dropped.

use crate::tree::{WidgetId, WidgetTree};
use crate::types::{Point, StateFlags};

// =============================================================================
// Event Types
// =============================================================================

/// Event kinds routed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pointer or encoder button went down over the target.
    Pressed,
    /// Button went up; always sent to the widget that took the press.
    Released,
    /// Released over the same widget that was pressed.
    Clicked,
    /// Target gained focus.
    Focused,
    /// Target lost focus.
    Defocused,
    /// Keypad key delivered to the focused widget.
    Key,
    /// Encoder rotation delivered by hit-test (unbound encoders).
    Turned,
}

/// Data carried alongside an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EventPayload {
    #[default]
    None,
    /// Pointer position in display coordinates.
    Pointer(Point),
    /// Key code (see [`crate::input::keys`]).
    Key(u32),
    /// Signed rotation delta.
    Delta(i32),
}

/// Callback registered for a (widget, event kind) pair.
///
/// Callbacks get mutable tree access so they can restyle, create, or
/// destroy widgets; changes land in the same tick's layout and paint.
pub type EventCallback = Box<dyn FnMut(&mut WidgetTree, &mut Event)>;

/// A routed input or focus event. Created per dispatch cycle, never
/// persisted.
#[derive(Debug)]
pub struct Event {
    pub kind: EventKind,
    pub target: Option<WidgetId>,
    pub payload: EventPayload,
    consumed: bool,
}

impl Event {
    pub fn new(
        kind: EventKind,
        target: Option<WidgetId>,
        payload: EventPayload,
    ) -> Self {
        Self {
            kind,
            target,
            payload,
            consumed: false,
        }
    }

    /// Suppress the default behaviour for this event. Later callbacks in
    /// the same list still run.
    pub fn consume(&mut self) {
        self.consumed = true;
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route an event to its target's callbacks, then apply the default
/// behaviour unless a callback consumed the event.
///
/// If a callback destroys the target mid-dispatch, the remaining
/// callbacks for that event are dropped along with the widget.
pub fn dispatch(tree: &mut WidgetTree, event: &mut Event) {
    let Some(target) = event.target else {
        return;
    };
    if !tree.is_alive(target) {
        // Target destroyed between routing and dispatch: drop silently.
        return;
    }

    let mut callbacks = tree.take_callbacks(target, event.kind);
    for cb in callbacks.iter_mut() {
        cb(tree, event);
        if !tree.is_alive(target) {
            return;
        }
    }
    tree.restore_callbacks(target, event.kind, callbacks);

    if !event.is_consumed() {
        apply_default(tree, event);
    }
}

/// The suppressible default behaviour per event kind: toggling the
/// visual interaction state. Kinds without a default are no-ops.
fn apply_default(tree: &mut WidgetTree, event: &Event) {
    let Some(target) = event.target else {
        return;
    };
    match event.kind {
        EventKind::Pressed => {
            let _ = tree.set_state_flags(target, StateFlags::PRESSED, true);
        }
        EventKind::Released => {
            let _ = tree.set_state_flags(target, StateFlags::PRESSED, false);
        }
        EventKind::Focused => {
            let _ = tree.set_state_flags(target, StateFlags::FOCUSED, true);
        }
        EventKind::Defocused => {
            let _ = tree.set_state_flags(target, StateFlags::FOCUSED, false);
        }
        EventKind::Clicked | EventKind::Key | EventKind::Turned => {}
    }
}

// =============================================================================
// Tests
// =============================================================================
