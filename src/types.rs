//! Core types for candela.
//!
//! Geometry, pixel color, and the widget attribute primitives that flow
//! through the whole pipeline: the input multiplexer hit-tests with
//! [`Point`] and [`Rect`], the style cascade resolves [`Rgba`] and
//! [`Dimension`] values, and the renderer writes [`Rgba`] pixels.

use bitflags::bitflags;

// =============================================================================
// Geometry
// =============================================================================

/// A point in display coordinates (pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const ZERO: Self = Self::new(0, 0);
}

/// An axis-aligned rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the right edge.
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// One past the bottom edge.
    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    #[inline]
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if a point is inside this rect.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Compute the intersection of two rects.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            Some(Rect::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
        } else {
            None
        }
    }

    /// Compute the smallest rect covering both rects.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Rect::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32)
    }
}

// =============================================================================
// Color
// =============================================================================

/// RGBA pixel color with 8-bit channels.
///
/// Alpha 255 = fully opaque, 0 = fully transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Create from 0xRRGGBB integer format.
    pub const fn from_rgb_int(rgb: u32) -> Self {
        Self::rgb(
            ((rgb >> 16) & 0xFF) as u8,
            ((rgb >> 8) & 0xFF) as u8,
            (rgb & 0xFF) as u8,
        )
    }

    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    #[inline]
    pub const fn is_opaque(&self) -> bool {
        self.a == 255
    }

    #[inline]
    pub const fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Alpha blend src over dst (Porter-Duff "over").
    #[inline]
    pub fn blend(src: Self, dst: Self) -> Self {
        if src.is_opaque() {
            return src;
        }
        if src.is_transparent() {
            return dst;
        }

        let sa = src.a as u32;
        let inv_sa = 255 - sa;
        let da = dst.a as u32;

        let out_a = sa + da * inv_sa / 255;
        if out_a == 0 {
            return Self::TRANSPARENT;
        }

        let channel = |s: u8, d: u8| -> u8 {
            let v = (s as u32 * sa + d as u32 * da * inv_sa / 255) / out_a;
            v.min(255) as u8
        };

        Self {
            r: channel(src.r, dst.r),
            g: channel(src.g, dst.g),
            b: channel(src.b, dst.b),
            a: out_a.min(255) as u8,
        }
    }
}

// =============================================================================
// Dimension
// =============================================================================

/// A dimension value that can be absolute pixels, a percentage of the
/// parent, or content-determined.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    /// Size determined by content / layout.
    #[default]
    Auto,
    /// Absolute size in pixels.
    Px(u32),
    /// Percentage of parent size (0-100).
    Percent(f32),
}

// =============================================================================
// Widget Attributes
// =============================================================================

/// Widget kinds known to the theme provider.
///
/// The concrete widget catalog lives outside the core; this enum only
/// exists so themes can hand out per-kind default styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum WidgetKind {
    Screen,
    #[default]
    Panel,
    Button,
    Label,
    Bar,
}

/// Interaction state a style selector can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum WidgetState {
    #[default]
    Default,
    Focused,
    Pressed,
    Disabled,
}

bitflags! {
    /// Behaviour flags carried by every widget.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WidgetFlags: u8 {
        /// Excluded from hit-testing and painting.
        const HIDDEN = 1 << 0;
        const CLICKABLE = 1 << 1;
        const FOCUSABLE = 1 << 2;
        /// Bounds were set explicitly; the layout pass must not overwrite them.
        const FLOATING = 1 << 3;
    }
}

bitflags! {
    /// Current interaction state as a bitfield (a widget can be focused
    /// and pressed at the same time).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StateFlags: u8 {
        const FOCUSED = 1 << 0;
        const PRESSED = 1 << 1;
        const DISABLED = 1 << 2;
    }
}

impl StateFlags {
    /// Collapse the bitfield to the single state used for style
    /// resolution. Pressed wins over focused.
    pub fn effective(&self) -> WidgetState {
        if self.contains(StateFlags::DISABLED) {
            WidgetState::Disabled
        } else if self.contains(StateFlags::PRESSED) {
            WidgetState::Pressed
        } else if self.contains(StateFlags::FOCUSED) {
            WidgetState::Focused
        } else {
            WidgetState::Default
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
