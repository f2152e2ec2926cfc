//! Display driver.
//!
//! A [`Display`] couples a [`FrameBuffer`] with a [`DisplayBackend`]
//! capability and drives the damage-to-pixels pipeline: collect damage,
//! rasterize the widget tree into the staging buffer one window at a
//! time, hand the window to the backend, commit.
//!
//! Buffers may be smaller than the screen. Damage wider than the buffer
//! is painted in horizontal stripes, one stripe per tick, with the
//! remainder carried as pending damage; a stripe is never overwritten
//! before its flush completes.

pub mod framebuffer;
pub mod headless;
pub mod terminal;

pub use framebuffer::FrameBuffer;

use crate::error::{Error, Result};
use crate::style::resolve;
use crate::theme::ThemeProvider;
use crate::tree::{WidgetId, WidgetTree};
use crate::types::{Rect, Rgba, WidgetFlags};

// =============================================================================
// Backend Capability
// =============================================================================

/// How flush completion is signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// `flush` returns only once the pixels are on screen.
    #[default]
    Blocking,
    /// Hardware completes asynchronously; `ready` gates the next flush.
    Polled,
}

/// Capability implemented by flush targets (terminal, memory, real
/// panels).
pub trait DisplayBackend {
    /// Push a packed pixel window (row-major, stride = window width) to
    /// the screen.
    fn flush(&mut self, window: Rect, pixels: &[Rgba]) -> Result<()>;

    /// Whether a previously started flush has completed. Only consulted
    /// in [`FlushMode::Polled`].
    fn ready(&self) -> bool {
        true
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Static display parameters, validated at registration.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub hor_res: u32,
    pub ver_res: u32,
    /// Full-width display lines one buffer region holds.
    pub buffer_rows: u32,
    pub double_buffered: bool,
    pub flush_mode: FlushMode,
    /// Base color painted under the widget tree.
    pub background: Rgba,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            hor_res: 320,
            ver_res: 240,
            buffer_rows: 24,
            double_buffered: false,
            flush_mode: FlushMode::Blocking,
            background: Rgba::BLACK,
        }
    }
}

impl DisplayConfig {
    fn validate(&self) -> Result<()> {
        if self.hor_res == 0 || self.ver_res == 0 {
            return Err(Error::Config(format!(
                "display resolution must be non-zero ({}x{})",
                self.hor_res, self.ver_res
            )));
        }
        if self.buffer_rows == 0 || self.buffer_rows > self.ver_res {
            return Err(Error::Config(format!(
                "buffer rows {} out of range 1..={}",
                self.buffer_rows, self.ver_res
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Display
// =============================================================================

/// One output surface: config, staging buffer, and backend.
pub struct Display {
    config: DisplayConfig,
    fb: FrameBuffer,
    backend: Box<dyn DisplayBackend>,
    /// Damage accepted but not yet painted (buffer busy or stripe
    /// remainder).
    pending_damage: Option<Rect>,
}

impl Display {
    pub fn new(config: DisplayConfig, backend: Box<dyn DisplayBackend>) -> Result<Self> {
        config.validate()?;
        let fb = FrameBuffer::new(config.hor_res, config.buffer_rows, config.double_buffered)?;
        Ok(Self {
            config,
            fb,
            backend,
            pending_damage: None,
        })
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// The full screen rect.
    pub fn screen_rect(&self) -> Rect {
        Rect::new(0, 0, self.config.hor_res, self.config.ver_res)
    }

    /// Damage painted but not flushed, or accepted but not painted.
    pub fn has_pending_work(&self) -> bool {
        self.fb.is_dirty() || self.pending_damage.is_some()
    }

    /// Accept new damage and paint as much of it as one buffer window
    /// allows. Oversized damage leaves a remainder for later ticks; a
    /// busy buffer (unflushed stripe) defers everything.
    pub fn paint(
        &mut self,
        tree: &WidgetTree,
        theme: &dyn ThemeProvider,
        damage: Option<Rect>,
    ) -> Result<()> {
        if let Some(damage) = damage {
            if let Some(clipped) = damage.intersect(&self.screen_rect()) {
                self.pending_damage = Some(match self.pending_damage {
                    Some(pending) => pending.union(&clipped),
                    None => clipped,
                });
            }
        }

        if self.fb.is_dirty() {
            // Previous stripe still awaits its flush.
            return Ok(());
        }
        let Some(damage) = self.pending_damage.take() else {
            return Ok(());
        };

        // Split into a stripe that fits the buffer, top rows first.
        let rows_fit = (self.fb.capacity() / damage.width as usize) as u32;
        let window = if damage.height <= rows_fit {
            damage
        } else {
            let stripe = Rect::new(damage.x, damage.y, damage.width, rows_fit);
            self.pending_damage = Some(Rect::new(
                damage.x,
                damage.y + rows_fit as i32,
                damage.width,
                damage.height - rows_fit,
            ));
            stripe
        };

        let background = self.config.background;
        let pixels = self.fb.begin_paint(window)?;
        pixels.fill(background);
        rasterize(tree, theme, window, pixels)?;
        Ok(())
    }

    /// Flush the staged window if there is one and the backend can take
    /// it. Returns whether a flush happened.
    pub fn flush_pending(&mut self) -> Result<bool> {
        let Some((window, pixels)) = self.fb.pending() else {
            return Ok(false);
        };
        if self.config.flush_mode == FlushMode::Polled && !self.backend.ready() {
            return Ok(false);
        }
        self.backend.flush(window, pixels)?;
        self.fb.commit();
        Ok(true)
    }
}

// =============================================================================
// Rasterizer
// =============================================================================

/// Paint the tree into a packed window: parents before children,
/// siblings in creation order, hidden subtrees skipped.
fn rasterize(
    tree: &WidgetTree,
    theme: &dyn ThemeProvider,
    window: Rect,
    pixels: &mut [Rgba],
) -> Result<()> {
    for root in tree.roots() {
        rasterize_widget(tree, theme, *root, window, pixels)?;
    }
    Ok(())
}

fn rasterize_widget(
    tree: &WidgetTree,
    theme: &dyn ThemeProvider,
    id: WidgetId,
    window: Rect,
    pixels: &mut [Rgba],
) -> Result<()> {
    let Some(widget) = tree.get(id) else {
        return Ok(());
    };
    if widget.flags().contains(WidgetFlags::HIDDEN) {
        return Ok(());
    }

    let bounds = widget.bounds();
    if bounds.intersect(&window).is_some() {
        let style = resolve(tree, id, widget.current_state(), theme)?;

        let bg = with_opacity(style.bg, style.opacity);
        if !bg.is_transparent() {
            fill_rect(pixels, window, bounds, bg);
        }

        if style.border_width > 0 {
            let border = with_opacity(style.border_color, style.opacity);
            if !border.is_transparent() {
                let bw = style.border_width.min(bounds.width).min(bounds.height);
                let edges = [
                    Rect::new(bounds.x, bounds.y, bounds.width, bw),
                    Rect::new(bounds.x, bounds.bottom() - bw as i32, bounds.width, bw),
                    Rect::new(bounds.x, bounds.y, bw, bounds.height),
                    Rect::new(bounds.right() - bw as i32, bounds.y, bw, bounds.height),
                ];
                for edge in edges {
                    fill_rect(pixels, window, edge, border);
                }
            }
        }
    }

    for child in widget.children() {
        rasterize_widget(tree, theme, *child, window, pixels)?;
    }
    Ok(())
}

fn with_opacity(color: Rgba, opacity: u8) -> Rgba {
    if opacity == 255 {
        return color;
    }
    Rgba::new(
        color.r,
        color.g,
        color.b,
        (color.a as u32 * opacity as u32 / 255) as u8,
    )
}

/// Blend a solid rect into the window's packed pixels.
fn fill_rect(pixels: &mut [Rgba], window: Rect, rect: Rect, color: Rgba) {
    let Some(clipped) = rect.intersect(&window) else {
        return;
    };
    let stride = window.width as usize;
    for row in 0..clipped.height as usize {
        let y = (clipped.y - window.y) as usize + row;
        let x0 = (clipped.x - window.x) as usize;
        let line = &mut pixels[y * stride + x0..y * stride + x0 + clipped.width as usize];
        if color.is_opaque() {
            line.fill(color);
        } else {
            for px in line {
                *px = Rgba::blend(color, *px);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::headless::HeadlessBackend;
    use super::*;
    use crate::style::{StateSelector, Style, StyleProp};
    use crate::theme::DefaultTheme;
    use crate::types::{Point, WidgetKind};

    fn display(config: DisplayConfig) -> (Display, super::headless::FlushLogHandle) {
        let (backend, log) = HeadlessBackend::new();
        (Display::new(config, Box::new(backend)).unwrap(), log)
    }

    fn red_box(tree: &mut WidgetTree, bounds: Rect) -> WidgetId {
        let w = tree.create(None, WidgetKind::Panel).unwrap();
        let style = Style::new().with(StyleProp::Bg(Rgba::RED)).finish();
        tree.attach_style(w, style, StateSelector::Any).unwrap();
        tree.set_bounds(w, bounds).unwrap();
        w
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (backend, _) = HeadlessBackend::new();
        let config = DisplayConfig {
            buffer_rows: 0,
            ..DisplayConfig::default()
        };
        assert!(matches!(
            Display::new(config, Box::new(backend)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_paint_and_flush_small_damage() {
        let mut tree = WidgetTree::new();
        red_box(&mut tree, Rect::new(10, 10, 20, 5));
        let theme = DefaultTheme::dark();
        let (mut display, log) = display(DisplayConfig::default());

        let damage = tree.take_damage();
        display.paint(&tree, &theme, damage).unwrap();
        assert!(display.flush_pending().unwrap());

        let flushes = log.borrow();
        assert_eq!(flushes.len(), 1);
        let (window, pixels) = &flushes[0];
        assert_eq!(*window, Rect::new(10, 10, 20, 5));
        assert!(pixels.iter().all(|p| *p == Rgba::RED));
    }

    #[test]
    fn test_oversized_damage_stripes_across_ticks() {
        let mut tree = WidgetTree::new();
        red_box(&mut tree, Rect::new(0, 0, 320, 240));
        let theme = DefaultTheme::dark();
        let (mut display, log) = display(DisplayConfig {
            buffer_rows: 100,
            ..DisplayConfig::default()
        });

        let damage = tree.take_damage();
        display.paint(&tree, &theme, damage).unwrap();
        assert!(display.flush_pending().unwrap());
        assert!(display.has_pending_work());

        display.paint(&tree, &theme, None).unwrap();
        assert!(display.flush_pending().unwrap());
        display.paint(&tree, &theme, None).unwrap();
        assert!(display.flush_pending().unwrap());
        assert!(!display.has_pending_work());

        let flushes = log.borrow();
        let windows: Vec<Rect> = flushes.iter().map(|(w, _)| *w).collect();
        assert_eq!(
            windows,
            vec![
                Rect::new(0, 0, 320, 100),
                Rect::new(0, 100, 320, 100),
                Rect::new(0, 200, 320, 40),
            ]
        );
    }

    #[test]
    fn test_unflushed_stripe_is_never_overwritten() {
        let mut tree = WidgetTree::new();
        let w = red_box(&mut tree, Rect::new(0, 0, 100, 10));
        let theme = DefaultTheme::dark();
        let (mut display, log) = display(DisplayConfig {
            flush_mode: FlushMode::Polled,
            ..DisplayConfig::default()
        });
        log.set_ready(false);

        let damage = tree.take_damage();
        display.paint(&tree, &theme, damage).unwrap();
        assert!(!display.flush_pending().unwrap());

        // New damage while the stripe waits: deferred, not repainted.
        tree.mark_dirty(w).unwrap();
        let damage = tree.take_damage();
        display.paint(&tree, &theme, damage).unwrap();
        assert!(display.has_pending_work());

        log.set_ready(true);
        assert!(display.flush_pending().unwrap());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_damage_outside_screen_is_clipped_away() {
        let tree = WidgetTree::new();
        let theme = DefaultTheme::dark();
        let (mut display, log) = display(DisplayConfig::default());

        display
            .paint(&tree, &theme, Some(Rect::new(1000, 1000, 50, 50)))
            .unwrap();
        assert!(!display.flush_pending().unwrap());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_children_paint_over_parents() {
        let mut tree = WidgetTree::new();
        let parent = red_box(&mut tree, Rect::new(0, 0, 10, 1));
        let child = tree.create(Some(parent), WidgetKind::Panel).unwrap();
        let blue = Style::new().with(StyleProp::Bg(Rgba::BLUE)).finish();
        tree.attach_style(child, blue, StateSelector::Any).unwrap();
        tree.set_bounds(child, Rect::new(5, 0, 5, 1)).unwrap();

        let theme = DefaultTheme::dark();
        let (mut display, log) = display(DisplayConfig::default());
        let damage = tree.take_damage();
        display.paint(&tree, &theme, damage).unwrap();
        display.flush_pending().unwrap();

        let flushes = log.borrow();
        let (window, pixels) = &flushes[0];
        assert!(window.contains(Point::new(4, 0)) && window.contains(Point::new(5, 0)));
        let idx = |x: i32| (x - window.x) as usize;
        assert_eq!(pixels[idx(4)], Rgba::RED);
        assert_eq!(pixels[idx(5)], Rgba::BLUE);
    }

    #[test]
    fn test_backend_error_keeps_stripe_staged() {
        let mut tree = WidgetTree::new();
        red_box(&mut tree, Rect::new(0, 0, 10, 1));
        let theme = DefaultTheme::dark();
        let (mut display, log) = display(DisplayConfig::default());
        log.fail_next();

        let damage = tree.take_damage();
        display.paint(&tree, &theme, damage).unwrap();
        assert!(display.flush_pending().is_err());

        // The stripe stays staged for a retry.
        assert!(display.has_pending_work());
        assert!(display.flush_pending().unwrap());
        assert_eq!(log.borrow().len(), 1);
    }
}
