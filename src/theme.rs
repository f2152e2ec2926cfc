//! Theme provider.
//!
//! A theme supplies default styles for widget kinds that have no style
//! explicitly attached. The cascade consults it lazily during
//! resolution, so a theme swap takes effect on the next paint without
//! touching any widget.

use std::rc::Rc;

use crate::style::{Style, StyleProp};
use crate::types::{Dimension, Rgba, WidgetKind};

/// Capability consumed by the style cascade: per-kind default styles.
pub trait ThemeProvider {
    /// The default style for a widget kind, if the theme defines one.
    fn style_for(&self, kind: WidgetKind) -> Option<Rc<Style>>;
}

// =============================================================================
// Default Theme
// =============================================================================

/// A palette-based theme with prebuilt per-kind styles.
pub struct DefaultTheme {
    screen: Rc<Style>,
    panel: Rc<Style>,
    button: Rc<Style>,
    label: Rc<Style>,
    bar: Rc<Style>,
}

impl DefaultTheme {
    /// Build a theme from a two-colour palette.
    pub fn new(primary: Rgba, secondary: Rgba, dark: bool) -> Self {
        let (screen_bg, surface_bg, text) = if dark {
            (
                Rgba::from_rgb_int(0x15151a),
                Rgba::from_rgb_int(0x24242c),
                Rgba::from_rgb_int(0xf0f0f0),
            )
        } else {
            (
                Rgba::from_rgb_int(0xf2f2f7),
                Rgba::WHITE,
                Rgba::from_rgb_int(0x202020),
            )
        };

        let screen = Style::new()
            .with(StyleProp::Bg(screen_bg))
            .with(StyleProp::Fg(text))
            .with(StyleProp::Width(Dimension::Percent(100.0)))
            .with(StyleProp::Height(Dimension::Percent(100.0)))
            .finish();

        let panel = Style::new()
            .with(StyleProp::Bg(surface_bg))
            .with(StyleProp::Fg(text))
            .with(StyleProp::BorderWidth(1))
            .with(StyleProp::BorderColor(secondary))
            .with(StyleProp::Radius(4))
            .with(StyleProp::Pad(8))
            .finish();

        let button = Style::new()
            .with(StyleProp::Bg(primary))
            .with(StyleProp::Fg(Rgba::WHITE))
            .with(StyleProp::BorderWidth(1))
            .with(StyleProp::BorderColor(secondary))
            .with(StyleProp::Radius(4))
            .with(StyleProp::Pad(8))
            .finish();

        let label = Style::new().with(StyleProp::Fg(text)).finish();

        let bar = Style::new()
            .with(StyleProp::Bg(secondary))
            .with(StyleProp::Fg(primary))
            .with(StyleProp::Radius(3))
            .finish();

        Self {
            screen,
            panel,
            button,
            label,
            bar,
        }
    }

    /// Dark variant with a neutral palette.
    pub fn dark() -> Self {
        Self::new(
            Rgba::from_rgb_int(0x3d6fb4),
            Rgba::from_rgb_int(0x5a5a66),
            true,
        )
    }

    /// Light variant with a neutral palette.
    pub fn light() -> Self {
        Self::new(
            Rgba::from_rgb_int(0x3d6fb4),
            Rgba::from_rgb_int(0xb0b0b8),
            false,
        )
    }
}

impl ThemeProvider for DefaultTheme {
    fn style_for(&self, kind: WidgetKind) -> Option<Rc<Style>> {
        let style = match kind {
            WidgetKind::Screen => &self.screen,
            WidgetKind::Panel => &self.panel,
            WidgetKind::Button => &self.button,
            WidgetKind::Label => &self.label,
            WidgetKind::Bar => &self.bar,
        };
        Some(style.clone())
    }
}
