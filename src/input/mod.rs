//! Input devices and the multiplexer.
//!
//! Devices are capability objects implementing [`InputSource`]; the
//! multiplexer polls every registered device once per tick, turns raw
//! samples into routed [`Event`]s by edge detection, and queues them
//! for dispatch. Each registered device gets its own fresh edge state,
//! so registration order never bleeds state between devices.
//!
//! Per tick a device is read at most twice: once unconditionally, and
//! once more if the first sample reports buffered data. Anything beyond
//! that waits for the next tick, keeping a chatty device from stalling
//! the loop.

pub mod terminal;

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::event::{Event, EventKind, EventPayload};
use crate::focus::{FocusChange, FocusGroup, FocusGroupId};
use crate::tree::{WidgetId, WidgetTree};
use crate::types::{Point, WidgetFlags};

// =============================================================================
// Key Codes
// =============================================================================

/// Control key codes delivered in [`EventPayload::Key`].
///
/// Printable keys use their Unicode scalar value; these cover the
/// navigation and editing keys with dedicated semantics.
pub mod keys {
    pub const NEXT: u32 = 9;
    pub const ENTER: u32 = 10;
    pub const PREV: u32 = 11;
    pub const UP: u32 = 17;
    pub const DOWN: u32 = 18;
    pub const RIGHT: u32 = 19;
    pub const LEFT: u32 = 20;
    pub const ESC: u32 = 27;
    pub const BACKSPACE: u32 = 8;
    pub const DEL: u32 = 127;
    pub const HOME: u32 = 2;
    pub const END: u32 = 3;
}

// =============================================================================
// Sources
// =============================================================================

/// The three input device classes the multiplexer routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Absolute position plus a button (mouse, touch).
    Pointer,
    /// Key codes delivered to the focused widget.
    Keypad,
    /// Relative rotation plus a button.
    Encoder,
}

/// One raw reading from a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Pointer { pos: Point, pressed: bool },
    Key { code: u32, pressed: bool },
    Encoder { delta: i32, pressed: bool },
}

/// A sample plus the device's buffered-data flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    pub sample: Sample,
    /// More samples are buffered; the multiplexer will read once more
    /// this tick.
    pub has_more: bool,
}

/// Capability implemented by pollable input devices.
///
/// `read` must always return the current state and never block; a
/// device with nothing new reports its previous state with
/// `has_more: false`.
pub trait InputSource {
    fn kind(&self) -> DeviceKind;
    fn read(&mut self) -> Result<InputSample>;
}

// =============================================================================
// Multiplexer
// =============================================================================

/// Handle to a registered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceSlot(usize);

/// Per-device edge-detection state. Allocated fresh for every
/// registration.
#[derive(Default)]
struct DeviceState {
    pointer_pos: Point,
    button_pressed: bool,
    /// Widget that took the press; Released/Clicked route here.
    press_target: Option<WidgetId>,
    /// Key codes currently held, for keypad repeat suppression.
    held_keys: Vec<u32>,
}

struct Device {
    source: Box<dyn InputSource>,
    state: DeviceState,
    group: Option<FocusGroupId>,
}

/// Polls all registered devices each tick and queues routed events.
pub struct InputMultiplexer {
    devices: Vec<Device>,
    queue: VecDeque<Event>,
    capacity: usize,
    /// Most recent pointer position across all pointer devices; unbound
    /// encoders hit-test here.
    last_pointer: Point,
}

impl InputMultiplexer {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            devices: Vec::new(),
            queue: VecDeque::new(),
            capacity: queue_capacity.max(1),
            last_pointer: Point::ZERO,
        }
    }

    /// Register a device. Each registration gets independent edge
    /// state regardless of how many devices came before it.
    pub fn register(&mut self, source: Box<dyn InputSource>) -> DeviceSlot {
        self.devices.push(Device {
            source,
            state: DeviceState::default(),
            group: None,
        });
        DeviceSlot(self.devices.len() - 1)
    }

    /// Bind a keypad or encoder device to a focus group. Bound devices
    /// navigate the group instead of hit-testing.
    pub fn bind_group(&mut self, slot: DeviceSlot, group: FocusGroupId) -> Result<()> {
        let device = self
            .devices
            .get_mut(slot.0)
            .ok_or_else(|| Error::Config(format!("unknown device slot {}", slot.0)))?;
        if device.source.kind() == DeviceKind::Pointer {
            return Err(Error::Config(
                "pointer devices route by hit-test, not focus group".into(),
            ));
        }
        device.group = Some(group);
        Ok(())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Dequeue the next routed event, oldest first.
    pub fn pop_event(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    fn enqueue(&mut self, event: Event) {
        if self.queue.len() >= self.capacity {
            let dropped = self.queue.pop_front();
            tracing::warn!(
                capacity = self.capacity,
                dropped = ?dropped.map(|e| e.kind),
                "event queue full, dropping oldest event"
            );
        }
        self.queue.push_back(event);
    }

    /// Poll every device once (twice when it reports buffered data) and
    /// queue the resulting events. A failing device is logged and
    /// skipped for this tick; the others still get polled.
    pub fn poll_all(&mut self, tree: &WidgetTree, groups: &mut [FocusGroup]) {
        for index in 0..self.devices.len() {
            for _attempt in 0..2 {
                let reading = match self.devices[index].source.read() {
                    Ok(reading) => reading,
                    Err(err) => {
                        tracing::warn!(device = index, error = %err, "input device read failed");
                        break;
                    }
                };
                self.process(index, reading.sample, tree, groups);
                if !reading.has_more {
                    break;
                }
            }
        }
    }

    fn process(
        &mut self,
        index: usize,
        sample: Sample,
        tree: &WidgetTree,
        groups: &mut [FocusGroup],
    ) {
        match sample {
            Sample::Pointer { pos, pressed } => self.process_pointer(index, pos, pressed, tree),
            Sample::Key { code, pressed } => self.process_key(index, code, pressed, groups),
            Sample::Encoder { delta, pressed } => {
                self.process_encoder(index, delta, pressed, tree, groups)
            }
        }
    }

    // =========================================================================
    // Pointer
    // =========================================================================

    fn process_pointer(&mut self, index: usize, pos: Point, pressed: bool, tree: &WidgetTree) {
        self.last_pointer = pos;
        let was_pressed = self.devices[index].state.button_pressed;
        self.devices[index].state.pointer_pos = pos;
        self.devices[index].state.button_pressed = pressed;

        if pressed && !was_pressed {
            let target = clickable_at(tree, pos);
            self.devices[index].state.press_target = target;
            if target.is_some() {
                self.enqueue(Event::new(
                    EventKind::Pressed,
                    target,
                    EventPayload::Pointer(pos),
                ));
            }
        } else if !pressed && was_pressed {
            let press_target = self.devices[index].state.press_target.take();
            if let Some(target) = press_target {
                self.enqueue(Event::new(
                    EventKind::Released,
                    Some(target),
                    EventPayload::Pointer(pos),
                ));
                // A click is a release over the widget that took the press.
                if clickable_at(tree, pos) == Some(target) {
                    self.enqueue(Event::new(
                        EventKind::Clicked,
                        Some(target),
                        EventPayload::Pointer(pos),
                    ));
                }
            }
        }
    }

    // =========================================================================
    // Keypad
    // =========================================================================

    fn process_key(&mut self, index: usize, code: u32, pressed: bool, groups: &mut [FocusGroup]) {
        let already_held = self.devices[index].state.held_keys.contains(&code);
        if pressed && already_held {
            return;
        }
        if pressed {
            self.devices[index].state.held_keys.push(code);
        } else {
            self.devices[index].state.held_keys.retain(|k| *k != code);
        }

        let group = self.devices[index]
            .group
            .and_then(|g| groups.get_mut(g.0));

        match code {
            keys::NEXT | keys::PREV if pressed => {
                if let Some(group) = group {
                    let change = if code == keys::NEXT {
                        group.next()
                    } else {
                        group.prev()
                    };
                    self.enqueue_focus_change(change);
                }
            }
            keys::ENTER => {
                let Some(current) = group.and_then(|g| g.current()) else {
                    return;
                };
                if pressed {
                    self.devices[index].state.press_target = Some(current);
                    self.enqueue(Event::new(
                        EventKind::Pressed,
                        Some(current),
                        EventPayload::Key(code),
                    ));
                } else if let Some(target) = self.devices[index].state.press_target.take() {
                    self.enqueue(Event::new(
                        EventKind::Released,
                        Some(target),
                        EventPayload::Key(code),
                    ));
                    self.enqueue(Event::new(
                        EventKind::Clicked,
                        Some(target),
                        EventPayload::Key(code),
                    ));
                }
            }
            _ if pressed => {
                // Every other key goes to the focused widget as-is.
                if let Some(current) = group.and_then(|g| g.current()) {
                    self.enqueue(Event::new(
                        EventKind::Key,
                        Some(current),
                        EventPayload::Key(code),
                    ));
                }
            }
            _ => {}
        }
    }

    // =========================================================================
    // Encoder
    // =========================================================================

    fn process_encoder(
        &mut self,
        index: usize,
        delta: i32,
        pressed: bool,
        tree: &WidgetTree,
        groups: &mut [FocusGroup],
    ) {
        let bound = self.devices[index].group;

        if delta != 0 {
            match bound.and_then(|g| groups.get_mut(g.0)) {
                Some(group) => {
                    // Navigation is cyclic, so only the net movement
                    // matters; reducing modulo the ring size also bounds
                    // the work a garbage delta can demand.
                    let len = group.members().len();
                    let steps = if len == 0 {
                        0
                    } else {
                        delta.unsigned_abs() as usize % len
                    };
                    for _ in 0..steps {
                        let change = if delta > 0 { group.next() } else { group.prev() };
                        self.enqueue_focus_change(change);
                    }
                }
                None => {
                    let target = clickable_at(tree, self.last_pointer);
                    if target.is_some() {
                        self.enqueue(Event::new(
                            EventKind::Turned,
                            target,
                            EventPayload::Delta(delta),
                        ));
                    }
                }
            }
        }

        let was_pressed = self.devices[index].state.button_pressed;
        self.devices[index].state.button_pressed = pressed;
        if pressed == was_pressed {
            return;
        }

        let target = match bound.and_then(|g| groups.get(g.0)) {
            Some(group) => group.current(),
            None => clickable_at(tree, self.last_pointer),
        };
        if pressed {
            self.devices[index].state.press_target = target;
            if target.is_some() {
                self.enqueue(Event::new(EventKind::Pressed, target, EventPayload::None));
            }
        } else if let Some(target) = self.devices[index].state.press_target.take() {
            self.enqueue(Event::new(
                EventKind::Released,
                Some(target),
                EventPayload::None,
            ));
            self.enqueue(Event::new(
                EventKind::Clicked,
                Some(target),
                EventPayload::None,
            ));
        }
    }

    fn enqueue_focus_change(&mut self, change: Option<FocusChange>) {
        let Some(change) = change else {
            return;
        };
        if change.from == Some(change.to) {
            return;
        }
        if let Some(from) = change.from {
            self.enqueue(Event::new(
                EventKind::Defocused,
                Some(from),
                EventPayload::None,
            ));
        }
        self.enqueue(Event::new(
            EventKind::Focused,
            Some(change.to),
            EventPayload::None,
        ));
    }
}

/// The widget taking pointer interaction at `pos`: the hit-test result,
/// or its nearest clickable ancestor when the hit widget itself is not
/// clickable.
fn clickable_at(tree: &WidgetTree, pos: Point) -> Option<WidgetId> {
    let mut current = tree.hit_test(pos);
    while let Some(id) = current {
        let w = tree.get(id)?;
        if w.flags().contains(WidgetFlags::CLICKABLE) {
            return Some(id);
        }
        current = w.parent();
    }
    None
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, WidgetKind};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Scripted device: replays a fixed sample list, then idles.
    struct Script {
        kind: DeviceKind,
        samples: RefCell<VecDeque<InputSample>>,
        idle: Sample,
        reads: Rc<Cell<u32>>,
    }

    impl Script {
        fn pointer(samples: Vec<InputSample>) -> (Self, Rc<Cell<u32>>) {
            let reads = Rc::new(Cell::new(0));
            (
                Self {
                    kind: DeviceKind::Pointer,
                    samples: RefCell::new(samples.into()),
                    idle: Sample::Pointer {
                        pos: Point::ZERO,
                        pressed: false,
                    },
                    reads: reads.clone(),
                },
                reads,
            )
        }

        fn keypad(samples: Vec<InputSample>) -> Self {
            Self {
                kind: DeviceKind::Keypad,
                samples: RefCell::new(samples.into()),
                idle: Sample::Key {
                    code: 0,
                    pressed: false,
                },
                reads: Rc::new(Cell::new(0)),
            }
        }

        fn encoder(samples: Vec<InputSample>) -> Self {
            Self {
                kind: DeviceKind::Encoder,
                samples: RefCell::new(samples.into()),
                idle: Sample::Encoder {
                    delta: 0,
                    pressed: false,
                },
                reads: Rc::new(Cell::new(0)),
            }
        }
    }

    impl InputSource for Script {
        fn kind(&self) -> DeviceKind {
            self.kind
        }

        fn read(&mut self) -> Result<InputSample> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.samples.borrow_mut().pop_front().unwrap_or(InputSample {
                sample: self.idle,
                has_more: false,
            }))
        }
    }

    fn sample(sample: Sample, has_more: bool) -> InputSample {
        InputSample { sample, has_more }
    }

    fn screen_with_button() -> (WidgetTree, WidgetId) {
        let mut tree = WidgetTree::new();
        let screen = tree.create(None, WidgetKind::Screen).unwrap();
        let button = tree.create(Some(screen), WidgetKind::Button).unwrap();
        tree.set_bounds(screen, Rect::new(0, 0, 320, 240)).unwrap();
        tree.set_bounds(button, Rect::new(0, 0, 100, 40)).unwrap();
        (tree, button)
    }

    #[test]
    fn test_pointer_press_release_click() {
        let (tree, button) = screen_with_button();
        let mut mux = InputMultiplexer::new(16);
        let (script, _) = Script::pointer(vec![
            sample(
                Sample::Pointer {
                    pos: Point::new(50, 20),
                    pressed: true,
                },
                false,
            ),
            sample(
                Sample::Pointer {
                    pos: Point::new(50, 20),
                    pressed: false,
                },
                false,
            ),
        ]);
        mux.register(Box::new(script));

        mux.poll_all(&tree, &mut []);
        mux.poll_all(&tree, &mut []);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| mux.pop_event())
            .map(|e| {
                assert_eq!(e.target, Some(button));
                e.kind
            })
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::Pressed, EventKind::Released, EventKind::Clicked]
        );
    }

    #[test]
    fn test_release_outside_press_target_is_not_a_click() {
        let (tree, button) = screen_with_button();
        let mut mux = InputMultiplexer::new(16);
        let (script, _) = Script::pointer(vec![
            sample(
                Sample::Pointer {
                    pos: Point::new(50, 20),
                    pressed: true,
                },
                false,
            ),
            sample(
                Sample::Pointer {
                    pos: Point::new(200, 200),
                    pressed: false,
                },
                false,
            ),
        ]);
        mux.register(Box::new(script));

        mux.poll_all(&tree, &mut []);
        mux.poll_all(&tree, &mut []);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| mux.pop_event())
            .map(|e| {
                assert_eq!(e.target, Some(button));
                e.kind
            })
            .collect();
        assert_eq!(kinds, vec![EventKind::Pressed, EventKind::Released]);
    }

    #[test]
    fn test_held_button_produces_no_repeat_events() {
        let (tree, _) = screen_with_button();
        let mut mux = InputMultiplexer::new(16);
        let pressed = sample(
            Sample::Pointer {
                pos: Point::new(50, 20),
                pressed: true,
            },
            false,
        );
        let (script, _) = Script::pointer(vec![pressed, pressed, pressed]);
        mux.register(Box::new(script));

        for _ in 0..3 {
            mux.poll_all(&tree, &mut []);
        }
        assert_eq!(mux.pending_events(), 1);
    }

    #[test]
    fn test_has_more_reads_at_most_twice_per_tick() {
        let (tree, _) = screen_with_button();
        let mut mux = InputMultiplexer::new(16);
        let idle = Sample::Pointer {
            pos: Point::ZERO,
            pressed: false,
        };
        // Device claims buffered data forever; reads must still cap at 2.
        let (script, reads) = Script::pointer(vec![
            sample(idle, true),
            sample(idle, true),
            sample(idle, true),
            sample(idle, true),
        ]);
        mux.register(Box::new(script));

        mux.poll_all(&tree, &mut []);
        assert_eq!(reads.get(), 2);

        mux.poll_all(&tree, &mut []);
        assert_eq!(reads.get(), 4);
    }

    #[test]
    fn test_keypad_navigation_and_enter() {
        let mut tree = WidgetTree::new();
        let a = tree.create(None, WidgetKind::Button).unwrap();
        let b = tree.create(None, WidgetKind::Button).unwrap();
        let mut group = FocusGroup::new();
        group.add(a);
        group.add(b);
        let mut groups = [group];

        let mut mux = InputMultiplexer::new(16);
        let slot = mux.register(Box::new(Script::keypad(vec![
            sample(
                Sample::Key {
                    code: keys::NEXT,
                    pressed: true,
                },
                false,
            ),
            sample(
                Sample::Key {
                    code: keys::NEXT,
                    pressed: false,
                },
                false,
            ),
            sample(
                Sample::Key {
                    code: keys::ENTER,
                    pressed: true,
                },
                false,
            ),
            sample(
                Sample::Key {
                    code: keys::ENTER,
                    pressed: false,
                },
                false,
            ),
        ])));
        mux.bind_group(slot, FocusGroupId(0)).unwrap();

        for _ in 0..4 {
            mux.poll_all(&tree, &mut groups);
        }

        let events: Vec<(EventKind, Option<WidgetId>)> = std::iter::from_fn(|| mux.pop_event())
            .map(|e| (e.kind, e.target))
            .collect();
        assert_eq!(
            events,
            vec![
                (EventKind::Defocused, Some(a)),
                (EventKind::Focused, Some(b)),
                (EventKind::Pressed, Some(b)),
                (EventKind::Released, Some(b)),
                (EventKind::Clicked, Some(b)),
            ]
        );
    }

    #[test]
    fn test_bound_encoder_navigates() {
        let mut tree = WidgetTree::new();
        let a = tree.create(None, WidgetKind::Button).unwrap();
        let b = tree.create(None, WidgetKind::Button).unwrap();
        let mut groups = [FocusGroup::new()];
        groups[0].add(a);
        groups[0].add(b);

        let mut mux = InputMultiplexer::new(16);
        let slot = mux.register(Box::new(Script::encoder(vec![sample(
            Sample::Encoder {
                delta: 1,
                pressed: false,
            },
            false,
        )])));
        mux.bind_group(slot, FocusGroupId(0)).unwrap();

        mux.poll_all(&tree, &mut groups);

        let events: Vec<EventKind> =
            std::iter::from_fn(|| mux.pop_event()).map(|e| e.kind).collect();
        assert_eq!(events, vec![EventKind::Defocused, EventKind::Focused]);
        assert_eq!(groups[0].current(), Some(b));
    }

    #[test]
    fn test_encoder_delta_reduced_modulo_ring_size() {
        let mut tree = WidgetTree::new();
        let a = tree.create(None, WidgetKind::Button).unwrap();
        let b = tree.create(None, WidgetKind::Button).unwrap();
        let mut groups = [FocusGroup::new()];
        groups[0].add(a);
        groups[0].add(b);

        let mut mux = InputMultiplexer::new(16);
        // A huge delta must not spin the tick or flood the queue; net
        // movement on a 2-ring is delta mod 2 = one step.
        let slot = mux.register(Box::new(Script::encoder(vec![sample(
            Sample::Encoder {
                delta: i32::MAX - 6,
                pressed: false,
            },
            false,
        )])));
        mux.bind_group(slot, FocusGroupId(0)).unwrap();

        mux.poll_all(&tree, &mut groups);

        assert_eq!(mux.pending_events(), 2);
        assert_eq!(groups[0].current(), Some(b));
    }

    #[test]
    fn test_unbound_encoder_turns_at_pointer_position() {
        let (tree, button) = screen_with_button();
        let mut mux = InputMultiplexer::new(16);

        // Pointer establishes a position; the encoder hit-tests there.
        let (pointer, _) = Script::pointer(vec![sample(
            Sample::Pointer {
                pos: Point::new(50, 20),
                pressed: false,
            },
            false,
        )]);
        mux.register(Box::new(pointer));
        mux.register(Box::new(Script::encoder(vec![sample(
            Sample::Encoder {
                delta: -2,
                pressed: false,
            },
            false,
        )])));

        mux.poll_all(&tree, &mut []);

        let event = mux.pop_event().unwrap();
        assert_eq!(event.kind, EventKind::Turned);
        assert_eq!(event.target, Some(button));
        assert_eq!(event.payload, EventPayload::Delta(-2));
        assert!(mux.pop_event().is_none());
    }

    #[test]
    fn test_devices_registered_later_start_with_fresh_state() {
        let (tree, _) = screen_with_button();
        let mut mux = InputMultiplexer::new(16);

        // Two pointers registered back to back; the second one's press
        // must be detected even though the first is mid-gesture.
        let (first, _) = Script::pointer(vec![sample(
            Sample::Pointer {
                pos: Point::new(10, 10),
                pressed: true,
            },
            false,
        )]);
        mux.register(Box::new(first));
        let (second, _) = Script::pointer(vec![sample(
            Sample::Pointer {
                pos: Point::new(50, 20),
                pressed: true,
            },
            false,
        )]);
        mux.register(Box::new(second));
        let (third, _) = Script::pointer(vec![sample(
            Sample::Pointer {
                pos: Point::new(50, 20),
                pressed: true,
            },
            false,
        )]);
        mux.register(Box::new(third));

        mux.poll_all(&tree, &mut []);

        // Three independent presses, one per device.
        let presses = std::iter::from_fn(|| mux.pop_event())
            .filter(|e| e.kind == EventKind::Pressed)
            .count();
        assert_eq!(presses, 3);
    }

    #[test]
    fn test_queue_overflow_drops_oldest() {
        let (tree, _) = screen_with_button();
        let mut mux = InputMultiplexer::new(2);

        let press = |x| {
            sample(
                Sample::Pointer {
                    pos: Point::new(x, 20),
                    pressed: true,
                },
                false,
            )
        };
        let release = |x| {
            sample(
                Sample::Pointer {
                    pos: Point::new(x, 20),
                    pressed: false,
                },
                false,
            )
        };
        let (script, _) = Script::pointer(vec![press(50), release(50)]);
        mux.register(Box::new(script));

        mux.poll_all(&tree, &mut []);
        mux.poll_all(&tree, &mut []);

        // Press, Released, Clicked were queued; capacity 2 keeps the
        // newest two.
        let kinds: Vec<EventKind> =
            std::iter::from_fn(|| mux.pop_event()).map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Released, EventKind::Clicked]);
    }
}
