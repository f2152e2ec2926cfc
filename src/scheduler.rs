//! Render loop scheduler.
//!
//! The scheduler owns everything one UI instance needs: the widget
//! tree, theme, displays, input multiplexer, focus groups, and timers.
//! Each tick runs the fixed pipeline:
//!
//! 1. fire due timers
//! 2. poll input devices
//! 3. dispatch queued events
//! 4. recompute layout (skipped when clean)
//! 5. paint damage into display buffers
//! 6. flush painted windows
//!
//! Everything is single-threaded and cooperative; only the stop flag
//! crosses threads, so a signal handler or another thread can end
//! [`run`](Scheduler::run).

use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::display::{Display, DisplayBackend, DisplayConfig};
use crate::error::{Error, Result};
use crate::event;
use crate::focus::{FocusGroup, FocusGroupId};
use crate::input::{DeviceSlot, InputMultiplexer, InputSource};
use crate::layout;
use crate::theme::{DefaultTheme, ThemeProvider};
use crate::timer::{TimerCallback, TimerId, TimerQueue};
use crate::tree::WidgetTree;

// =============================================================================
// Configuration
// =============================================================================

/// Loop lifecycle. Registering the first display starts the loop;
/// stopping is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Target wall-clock time between ticks in [`Scheduler::run`].
    pub tick_period: Duration,
    pub event_queue_capacity: usize,
    pub timer_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(5),
            event_queue_capacity: 64,
            timer_capacity: 32,
        }
    }
}

/// Cross-thread stop switch for [`Scheduler::run`].
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Owner of one UI instance and driver of its tick pipeline.
pub struct Scheduler {
    config: SchedulerConfig,
    state: LoopState,
    tick: u64,
    tree: WidgetTree,
    theme: Rc<dyn ThemeProvider>,
    displays: Vec<Display>,
    input: InputMultiplexer,
    timers: TimerQueue,
    groups: Vec<FocusGroup>,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_theme(config, Rc::new(DefaultTheme::dark()))
    }

    pub fn with_theme(config: SchedulerConfig, theme: Rc<dyn ThemeProvider>) -> Self {
        let input = InputMultiplexer::new(config.event_queue_capacity);
        let timers = TimerQueue::new(config.timer_capacity);
        Self {
            config,
            state: LoopState::Uninitialized,
            tick: 0,
            tree: WidgetTree::new(),
            theme,
            displays: Vec::new(),
            input,
            timers,
            groups: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        &mut self.tree
    }

    pub fn theme(&self) -> &Rc<dyn ThemeProvider> {
        &self.theme
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register an output surface. The first registration starts the
    /// loop; the new surface gets a full initial layout, paint, and
    /// flush so widgets created before any tick are visible and
    /// hit-testable immediately.
    ///
    /// All displays mirror the same tree, and non-floating roots are
    /// laid out against the first display's resolution. Later displays
    /// with a different resolution show that layout clipped or
    /// letterboxed, not a relayout of their own.
    pub fn register_display(
        &mut self,
        config: DisplayConfig,
        backend: Box<dyn DisplayBackend>,
    ) -> Result<()> {
        if self.state == LoopState::Stopped {
            return Err(Error::Config("loop already stopped".into()));
        }
        let display = Display::new(config, backend)?;
        let screen = display.screen_rect();
        if self.state == LoopState::Uninitialized {
            self.state = LoopState::Running;
            tracing::debug!(width = screen.width, height = screen.height, "loop started");
        }

        let theme = self.theme.clone();
        let avail = self
            .displays
            .first()
            .map(|d| d.screen_rect())
            .unwrap_or(screen);
        layout::compute_layout(&mut self.tree, &*theme, avail)?;

        // Displays registered earlier still owe this damage; hand it to
        // them before the new surface swallows it with its full paint.
        let damage = self.tree.take_damage();
        for existing in &mut self.displays {
            existing.paint(&self.tree, &*theme, damage)?;
        }

        self.displays.push(display);
        if let Some(display) = self.displays.last_mut() {
            display.paint(&self.tree, &*theme, Some(screen))?;
            // Stripe through the whole screen while the backend keeps up.
            while display.flush_pending()? {
                display.paint(&self.tree, &*theme, None)?;
            }
        }
        Ok(())
    }

    /// Register an input device; see
    /// [`InputMultiplexer::register`].
    pub fn register_input(&mut self, source: Box<dyn InputSource>) -> DeviceSlot {
        self.input.register(source)
    }

    /// Bind a keypad or encoder device to a focus group.
    pub fn bind_input_group(&mut self, slot: DeviceSlot, group: FocusGroupId) -> Result<()> {
        if group.0 >= self.groups.len() {
            return Err(Error::Config(format!("unknown focus group {}", group.0)));
        }
        self.input.bind_group(slot, group)
    }

    pub fn create_focus_group(&mut self) -> FocusGroupId {
        self.groups.push(FocusGroup::new());
        FocusGroupId(self.groups.len() - 1)
    }

    pub fn group_mut(&mut self, id: FocusGroupId) -> Option<&mut FocusGroup> {
        self.groups.get_mut(id.0)
    }

    pub fn group(&self, id: FocusGroupId) -> Option<&FocusGroup> {
        self.groups.get(id.0)
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Schedule a one-shot timer `delay_ticks` ticks from now.
    pub fn add_timer(&mut self, delay_ticks: u64, callback: TimerCallback) -> TimerId {
        self.timers.insert(self.tick, delay_ticks, callback)
    }

    /// Schedule a repeating timer.
    pub fn add_periodic_timer(&mut self, period_ticks: u64, callback: TimerCallback) -> TimerId {
        self.timers.insert_periodic(self.tick, period_ticks, callback)
    }

    pub fn remove_timer(&mut self, id: TimerId) -> bool {
        self.timers.remove(id)
    }

    // =========================================================================
    // The Loop
    // =========================================================================

    /// Run one pipeline pass. Backend and layout failures are logged
    /// and retried on later ticks; the only hard error is ticking a
    /// loop that is not running.
    pub fn tick(&mut self) -> Result<()> {
        if self.state != LoopState::Running {
            return Err(Error::Config(format!(
                "tick on a loop in state {:?}",
                self.state
            )));
        }
        self.tick += 1;
        let theme = self.theme.clone();

        self.timers.advance(self.tick, &mut self.tree);

        self.input.poll_all(&self.tree, &mut self.groups);
        while let Some(mut ev) = self.input.pop_event() {
            event::dispatch(&mut self.tree, &mut ev);
        }
        for group in &mut self.groups {
            group.prune(&self.tree);
        }

        if let Some(avail) = self.displays.first().map(|d| d.screen_rect()) {
            if let Err(err) = layout::compute_layout(&mut self.tree, &*theme, avail) {
                tracing::warn!(error = %err, "layout pass failed");
            }
        }

        let damage = self.tree.take_damage();
        for display in &mut self.displays {
            if let Err(err) = display.paint(&self.tree, &*theme, damage) {
                tracing::warn!(error = %err, "paint failed");
            }
            if let Err(err) = display.flush_pending() {
                tracing::warn!(error = %err, "flush failed, retrying next tick");
            }
        }
        Ok(())
    }

    /// Tick at the configured period until stopped.
    pub fn run(&mut self) -> Result<()> {
        self.running.store(true, Ordering::Relaxed);
        while self.running.load(Ordering::Relaxed) && self.state == LoopState::Running {
            self.tick()?;
            std::thread::sleep(self.config.tick_period);
        }
        Ok(())
    }

    /// A handle other threads can use to end [`run`](Scheduler::run).
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Stop the loop permanently.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
        self.running.store(false, Ordering::Relaxed);
        tracing::debug!(ticks = self.tick, "loop stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================
