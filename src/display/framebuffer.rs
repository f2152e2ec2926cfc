//! Pixel staging buffers.
//!
//! A [`FrameBuffer`] owns one or two pixel regions sized for a window
//! smaller than (or equal to) the full display. Painting renders into
//! the active region for a chosen window rect; the backend then flushes
//! that window and [`commit`](FrameBuffer::commit) swaps regions in
//! double-buffered mode so the next paint never touches pixels still in
//! flight.

use crate::error::{Error, Result};
use crate::types::{Rect, Rgba};

/// Staging memory between the rasterizer and a display backend.
pub struct FrameBuffer {
    regions: Vec<Vec<Rgba>>,
    write: usize,
    capacity: usize,
    window: Rect,
    dirty: bool,
}

impl FrameBuffer {
    /// Allocate a buffer covering `rows` full display lines of `width`
    /// pixels, single or double buffered.
    pub fn new(width: u32, rows: u32, double: bool) -> Result<Self> {
        let capacity = width as usize * rows as usize;
        if capacity == 0 {
            return Err(Error::Config(format!(
                "frame buffer must be non-empty ({width}x{rows})"
            )));
        }
        let count = if double { 2 } else { 1 };
        Ok(Self {
            regions: vec![vec![Rgba::TRANSPARENT; capacity]; count],
            write: 0,
            capacity,
            window: Rect::default(),
            dirty: false,
        })
    }

    /// Wrap caller-allocated regions. One or two regions of equal,
    /// non-zero length.
    pub fn with_regions(regions: Vec<Vec<Rgba>>) -> Result<Self> {
        let capacity = match regions.as_slice() {
            [single] => single.len(),
            [a, b] => {
                if a.len() != b.len() {
                    return Err(Error::Config(format!(
                        "double buffer regions differ in size ({} vs {})",
                        a.len(),
                        b.len()
                    )));
                }
                a.len()
            }
            other => {
                return Err(Error::Config(format!(
                    "expected 1 or 2 buffer regions, got {}",
                    other.len()
                )));
            }
        };
        if capacity == 0 {
            return Err(Error::Config("buffer regions must be non-empty".into()));
        }
        Ok(Self {
            regions,
            write: 0,
            capacity,
            window: Rect::default(),
            dirty: false,
        })
    }

    /// Pixels one region can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_double_buffered(&self) -> bool {
        self.regions.len() == 2
    }

    /// A painted window is staged and not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Start painting `window`. Returns the active region as a packed
    /// pixel slice (row-major, stride = window width).
    ///
    /// Fails if the window does not fit the region; the painter is
    /// expected to split oversized damage into stripes first.
    pub fn begin_paint(&mut self, window: Rect) -> Result<&mut [Rgba]> {
        let area = window.area();
        if window.is_empty() || area > self.capacity {
            return Err(Error::Config(format!(
                "paint window {}x{} exceeds buffer capacity {}",
                window.width, window.height, self.capacity
            )));
        }
        self.window = window;
        self.dirty = true;
        Ok(&mut self.regions[self.write][..area])
    }

    /// The staged window and its pixels, if a paint is pending flush.
    pub fn pending(&self) -> Option<(Rect, &[Rgba])> {
        if !self.dirty {
            return None;
        }
        Some((self.window, &self.regions[self.write][..self.window.area()]))
    }

    /// Mark the staged window flushed. Double-buffered mode swaps the
    /// active region so the flushed pixels stay untouched.
    pub fn commit(&mut self) {
        self.dirty = false;
        if self.regions.len() == 2 {
            self.write = 1 - self.write;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
