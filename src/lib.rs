//! # candela
//!
//! Tick-driven UI core for pixel displays.
//!
//! candela runs widget trees on small framebuffer targets: a terminal
//! cell grid, an in-memory test surface, or a real panel behind a
//! [`display::DisplayBackend`]. There is no reactive graph and no
//! global state; one [`scheduler::Scheduler`] owns one UI instance and
//! drives a fixed pipeline every tick:
//!
//! ```text
//! timers → input poll → event dispatch → layout → paint → flush
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Geometry, color, and widget attribute primitives
//! - [`tree`] - Widget arena with generational handles
//! - [`style`] - Shared immutable styles and the cascade
//! - [`theme`] - Per-kind default styles
//! - [`layout`] - Taffy-backed flexbox pass
//! - [`display`] - Frame buffers, backends, and the damage pipeline
//! - [`input`] - Pointer/keypad/encoder devices and the multiplexer
//! - [`event`] - Event routing and default behaviours
//! - [`focus`] - Focus groups for key-driven navigation
//! - [`timer`] - Tick-deadline timers
//! - [`scheduler`] - The loop that ties it all together

pub mod display;
pub mod error;
pub mod event;
pub mod focus;
pub mod input;
pub mod layout;
pub mod scheduler;
pub mod style;
pub mod theme;
pub mod timer;
pub mod tree;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use display::{
    Display, DisplayBackend, DisplayConfig, FlushMode, FrameBuffer,
    headless::{FlushLogHandle, HeadlessBackend},
    terminal::TerminalBackend,
};

pub use error::{Error, Result};

pub use event::{Event, EventCallback, EventKind, EventPayload, dispatch};

pub use focus::{FocusChange, FocusGroup, FocusGroupId};

pub use input::{
    DeviceKind, DeviceSlot, InputMultiplexer, InputSample, InputSource, Sample, keys,
    terminal::{EventPump, TerminalKeypadSource, TerminalPointerSource},
};

pub use layout::compute_layout;

pub use scheduler::{LoopState, Scheduler, SchedulerConfig, StopHandle};

pub use style::{
    FlexDirection, ResolvedStyle, StateSelector, Style, StyleProp, StylePropKey, resolve,
};

pub use theme::{DefaultTheme, ThemeProvider};

pub use timer::{TimerCallback, TimerId, TimerQueue};

pub use tree::{Widget, WidgetId, WidgetTree};
