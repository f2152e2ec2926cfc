//! Terminal input sources.
//!
//! Bridges crossterm's event stream to the pointer/keypad device model.
//! One [`EventPump`] drains the terminal event queue non-blockingly;
//! the pointer and keypad sources share it through an `Rc` so a single
//! drain per tick feeds both devices.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::stdout;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEventKind,
    MouseButton, MouseEventKind, poll, read,
};
use crossterm::execute;

use super::{keys, DeviceKind, InputSample, InputSource, Sample};
use crate::error::Result;
use crate::types::Point;

/// Turn on terminal mouse reporting. Pair with [`disable_mouse`] on
/// shutdown.
pub fn enable_mouse() -> Result<()> {
    execute!(stdout(), EnableMouseCapture)?;
    Ok(())
}

pub fn disable_mouse() -> Result<()> {
    execute!(stdout(), DisableMouseCapture)?;
    Ok(())
}

// =============================================================================
// Event Pump
// =============================================================================

/// Latest pointer state plus queued key transitions, refilled from the
/// terminal each tick.
#[derive(Default)]
struct PumpState {
    pointer_pos: Point,
    pointer_pressed: bool,
    key_queue: VecDeque<(u32, bool)>,
    last_key: (u32, bool),
}

/// Shared drain of the crossterm event queue.
#[derive(Clone, Default)]
pub struct EventPump {
    state: Rc<RefCell<PumpState>>,
}

impl EventPump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything the terminal has buffered right now.
    fn pump(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        while poll(Duration::ZERO)? {
            match read()? {
                CrosstermEvent::Mouse(mouse) => {
                    state.pointer_pos = Point::new(mouse.column as i32, mouse.row as i32);
                    match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => state.pointer_pressed = true,
                        MouseEventKind::Up(MouseButton::Left) => state.pointer_pressed = false,
                        _ => {}
                    }
                }
                CrosstermEvent::Key(key) => {
                    let Some(code) = convert_key_code(key.code) else {
                        continue;
                    };
                    // Most terminals never report key releases, so a
                    // press is queued as a press/release pair.
                    if key.kind == KeyEventKind::Press {
                        state.key_queue.push_back((code, true));
                        state.key_queue.push_back((code, false));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Map terminal keys onto the control key codes.
fn convert_key_code(code: KeyCode) -> Option<u32> {
    let mapped = match code {
        KeyCode::Tab => keys::NEXT,
        KeyCode::BackTab => keys::PREV,
        KeyCode::Enter => keys::ENTER,
        KeyCode::Up => keys::UP,
        KeyCode::Down => keys::DOWN,
        KeyCode::Left => keys::LEFT,
        KeyCode::Right => keys::RIGHT,
        KeyCode::Esc => keys::ESC,
        KeyCode::Backspace => keys::BACKSPACE,
        KeyCode::Delete => keys::DEL,
        KeyCode::Home => keys::HOME,
        KeyCode::End => keys::END,
        KeyCode::Char(c) => c as u32,
        _ => return None,
    };
    Some(mapped)
}

// =============================================================================
// Sources
// =============================================================================

/// Terminal mouse as an absolute pointer device.
pub struct TerminalPointerSource {
    pump: EventPump,
}

impl TerminalPointerSource {
    pub fn new(pump: EventPump) -> Self {
        Self { pump }
    }
}

impl InputSource for TerminalPointerSource {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Pointer
    }

    fn read(&mut self) -> Result<InputSample> {
        self.pump.pump()?;
        let state = self.pump.state.borrow();
        Ok(InputSample {
            sample: Sample::Pointer {
                pos: state.pointer_pos,
                pressed: state.pointer_pressed,
            },
            has_more: false,
        })
    }
}

/// Terminal keyboard as a keypad device.
pub struct TerminalKeypadSource {
    pump: EventPump,
}

impl TerminalKeypadSource {
    pub fn new(pump: EventPump) -> Self {
        Self { pump }
    }
}

impl InputSource for TerminalKeypadSource {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Keypad
    }

    fn read(&mut self) -> Result<InputSample> {
        self.pump.pump()?;
        let mut state = self.pump.state.borrow_mut();
        match state.key_queue.pop_front() {
            Some(transition) => {
                state.last_key = transition;
                Ok(InputSample {
                    sample: Sample::Key {
                        code: transition.0,
                        pressed: transition.1,
                    },
                    has_more: !state.key_queue.is_empty(),
                })
            }
            None => Ok(InputSample {
                // Nothing new: report the previous state.
                sample: Sample::Key {
                    code: state.last_key.0,
                    pressed: state.last_key.1,
                },
                has_more: false,
            }),
        }
    }
}
