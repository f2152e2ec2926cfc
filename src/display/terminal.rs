//! Terminal backend.
//!
//! Flushes pixel windows as colored cells: one pixel per terminal cell,
//! drawn as a space with the pixel's color as background. Commands are
//! queued into an in-memory buffer and written to stdout in a single
//! syscall per flush to avoid tearing.

use std::io::{Write, stdout};

use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{QueueableCommand, execute};

use super::DisplayBackend;
use crate::error::Result;
use crate::types::{Rect, Rgba};

/// Switch to the alternate screen and raw mode. Pair with
/// [`leave_fullscreen`] on shutdown.
pub fn enter_fullscreen() -> Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    Ok(())
}

pub fn leave_fullscreen() -> Result<()> {
    execute!(stdout(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Backend rendering pixel windows into a terminal.
#[derive(Default)]
pub struct TerminalBackend {
    /// Reused command buffer; one stdout write per flush.
    buf: Vec<u8>,
}

impl TerminalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplayBackend for TerminalBackend {
    fn flush(&mut self, window: Rect, pixels: &[Rgba]) -> Result<()> {
        self.buf.clear();

        let stride = window.width as usize;
        let mut last_color: Option<Rgba> = None;
        for row in 0..window.height as usize {
            self.buf.queue(MoveTo(
                window.x.max(0) as u16,
                (window.y + row as i32).max(0) as u16,
            ))?;
            for px in &pixels[row * stride..(row + 1) * stride] {
                // Only emit a color change when the run breaks.
                if last_color != Some(*px) {
                    self.buf.queue(SetBackgroundColor(Color::Rgb {
                        r: px.r,
                        g: px.g,
                        b: px.b,
                    }))?;
                    last_color = Some(*px);
                }
                self.buf.queue(Print(' '))?;
            }
        }
        self.buf.queue(ResetColor)?;

        let mut out = stdout();
        out.write_all(&self.buf)?;
        out.flush()?;
        Ok(())
    }
}
