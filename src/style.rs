//! Style cascade.
//!
//! A [`Style`] is a bag of typed property entries. Widgets hold ordered
//! lists of `(Rc<Style>, StateSelector)` attachments; [`resolve`] folds
//! the matching attachments, in attachment order, into a
//! [`ResolvedStyle`]. Later attachments override earlier ones
//! property-by-property, never whole-style. Wrapping a style in `Rc` for
//! attachment is what finalizes it: a shared style can no longer be
//! mutated.
//!
//! Resolution is a pure function over (attached styles, requested state,
//! theme); it never mutates the widget.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::theme::ThemeProvider;
use crate::tree::{WidgetId, WidgetTree};
use crate::types::{Dimension, Rgba, WidgetState};

// =============================================================================
// Properties
// =============================================================================

/// Main-axis direction for container layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Column,
    Row,
}

/// A single typed style property entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleProp {
    Width(Dimension),
    Height(Dimension),
    Bg(Rgba),
    Fg(Rgba),
    BorderWidth(u32),
    BorderColor(Rgba),
    Radius(u32),
    Pad(u32),
    Gap(u32),
    Opacity(u8),
    Flex(FlexDirection),
}

/// Property key, used for last-writer-wins replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StylePropKey {
    Width,
    Height,
    Bg,
    Fg,
    BorderWidth,
    BorderColor,
    Radius,
    Pad,
    Gap,
    Opacity,
    Flex,
}

impl StyleProp {
    pub fn key(&self) -> StylePropKey {
        match self {
            StyleProp::Width(_) => StylePropKey::Width,
            StyleProp::Height(_) => StylePropKey::Height,
            StyleProp::Bg(_) => StylePropKey::Bg,
            StyleProp::Fg(_) => StylePropKey::Fg,
            StyleProp::BorderWidth(_) => StylePropKey::BorderWidth,
            StyleProp::BorderColor(_) => StylePropKey::BorderColor,
            StyleProp::Radius(_) => StylePropKey::Radius,
            StyleProp::Pad(_) => StylePropKey::Pad,
            StyleProp::Gap(_) => StylePropKey::Gap,
            StyleProp::Opacity(_) => StylePropKey::Opacity,
            StyleProp::Flex(_) => StylePropKey::Flex,
        }
    }
}

// =============================================================================
// Style
// =============================================================================

/// A property bag. At most one entry per property key; `set` replaces.
///
/// The order entries were set in does not matter for resolution - only
/// the attachment order of whole styles does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    entries: Vec<StyleProp>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any existing entry with the same key.
    pub fn set(&mut self, prop: StyleProp) -> &mut Self {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key() == prop.key()) {
            *existing = prop;
        } else {
            self.entries.push(prop);
        }
        self
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, prop: StyleProp) -> Self {
        self.set(prop);
        self
    }

    /// Finalize the style for sharing; a shared style is immutable.
    pub fn finish(self) -> Rc<Style> {
        Rc::new(self)
    }

    pub fn get(&self, key: StylePropKey) -> Option<StyleProp> {
        self.entries.iter().copied().find(|e| e.key() == key)
    }

    pub fn props(&self) -> &[StyleProp] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// State Selectors
// =============================================================================

/// Which interaction states an attached style applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateSelector {
    /// Applies in every state.
    #[default]
    Any,
    /// Applies only in the given state.
    State(WidgetState),
}

impl StateSelector {
    pub fn matches(&self, state: WidgetState) -> bool {
        match self {
            StateSelector::Any => true,
            StateSelector::State(s) => *s == state,
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// The effective property set for one widget in one state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub width: Dimension,
    pub height: Dimension,
    pub bg: Rgba,
    pub fg: Rgba,
    pub border_width: u32,
    pub border_color: Rgba,
    pub radius: u32,
    pub pad: u32,
    pub gap: u32,
    pub opacity: u8,
    pub flex: FlexDirection,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            bg: Rgba::TRANSPARENT,
            fg: Rgba::WHITE,
            border_width: 0,
            border_color: Rgba::TRANSPARENT,
            radius: 0,
            pad: 0,
            gap: 0,
            opacity: 255,
            flex: FlexDirection::Column,
        }
    }
}

impl ResolvedStyle {
    fn apply(&mut self, prop: StyleProp) {
        match prop {
            StyleProp::Width(v) => self.width = v,
            StyleProp::Height(v) => self.height = v,
            StyleProp::Bg(v) => self.bg = v,
            StyleProp::Fg(v) => self.fg = v,
            StyleProp::BorderWidth(v) => self.border_width = v,
            StyleProp::BorderColor(v) => self.border_color = v,
            StyleProp::Radius(v) => self.radius = v,
            StyleProp::Pad(v) => self.pad = v,
            StyleProp::Gap(v) => self.gap = v,
            StyleProp::Opacity(v) => self.opacity = v,
            StyleProp::Flex(v) => self.flex = v,
        }
    }

    fn apply_style(&mut self, style: &Style) {
        for prop in style.props() {
            self.apply(*prop);
        }
    }
}

/// Compute the effective property set for `widget` in `state`.
///
/// Attached styles with a matching selector are folded in attachment
/// order. Widgets with no attached styles fall back to the theme's
/// default style for their kind, consulted lazily here.
///
/// Fails with [`Error::Lookup`] only if the widget has been destroyed.
pub fn resolve(
    tree: &WidgetTree,
    widget: WidgetId,
    state: WidgetState,
    theme: &dyn ThemeProvider,
) -> Result<ResolvedStyle> {
    let w = tree.get(widget).ok_or(Error::Lookup)?;

    let mut out = ResolvedStyle::default();

    if w.styles().is_empty() {
        if let Some(base) = theme.style_for(w.kind()) {
            out.apply_style(&base);
        }
    }

    for (style, selector) in w.styles() {
        if selector.matches(state) {
            out.apply_style(style);
        }
    }

    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================
