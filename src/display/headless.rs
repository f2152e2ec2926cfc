//! In-memory backend.
//!
//! Records every flushed window for assertions and supports failure and
//! readiness injection. This is the backend the test suites drive; it
//! doubles as a template for real panel drivers.

use std::cell::{Cell, Ref, RefCell};
use std::io;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::types::{Rect, Rgba};

#[derive(Default)]
struct Shared {
    flushes: RefCell<Vec<(Rect, Vec<Rgba>)>>,
    ready: Cell<bool>,
    fail_next: Cell<bool>,
}

/// Shared view of a [`HeadlessBackend`]'s flush log and injection knobs.
#[derive(Clone)]
pub struct FlushLogHandle {
    shared: Rc<Shared>,
}

impl FlushLogHandle {
    /// Every flush so far as (window, pixels) pairs, oldest first.
    pub fn borrow(&self) -> Ref<'_, Vec<(Rect, Vec<Rgba>)>> {
        self.shared.flushes.borrow()
    }

    pub fn flush_count(&self) -> usize {
        self.shared.flushes.borrow().len()
    }

    /// Toggle the backend's readiness (for [`FlushMode::Polled`]).
    ///
    /// [`FlushMode::Polled`]: crate::display::FlushMode::Polled
    pub fn set_ready(&self, ready: bool) {
        self.shared.ready.set(ready);
    }

    /// Make the next flush fail with an I/O error.
    pub fn fail_next(&self) {
        self.shared.fail_next.set(true);
    }
}

/// Backend that flushes into memory.
pub struct HeadlessBackend {
    shared: Rc<Shared>,
}

impl HeadlessBackend {
    pub fn new() -> (Self, FlushLogHandle) {
        let shared = Rc::new(Shared {
            flushes: RefCell::new(Vec::new()),
            ready: Cell::new(true),
            fail_next: Cell::new(false),
        });
        (
            Self {
                shared: shared.clone(),
            },
            FlushLogHandle { shared },
        )
    }
}

impl super::DisplayBackend for HeadlessBackend {
    fn flush(&mut self, window: Rect, pixels: &[Rgba]) -> Result<()> {
        if self.shared.fail_next.replace(false) {
            return Err(Error::Backend(io::Error::other("injected flush failure")));
        }
        self.shared
            .flushes
            .borrow_mut()
            .push((window, pixels.to_vec()));
        Ok(())
    }

    fn ready(&self) -> bool {
        self.shared.ready.get()
    }
}
