//! Layout pass.
//!
//! Bridges resolved widget styles to the Taffy flexbox engine and
//! writes computed absolute bounds back into the tree. The pass is
//! skipped entirely when no structural or style change happened since
//! the last run.
//!
//! Widgets with explicitly set bounds are floating: they anchor their
//! own layout subtree at those bounds, never participate in their
//! parent's flex flow, and never have their own bounds overwritten.

use std::collections::HashMap;

use taffy::{
    AvailableSpace, Dimension as TaffyDimension, Display, FlexDirection as TaffyFlexDirection,
    LengthPercentage, NodeId, Size, Style as TaffyStyle, TaffyTree,
};

use crate::error::{Error, Result};
use crate::style::{resolve, FlexDirection, ResolvedStyle};
use crate::theme::ThemeProvider;
use crate::tree::{WidgetId, WidgetTree};
use crate::types::{Dimension, Rect, WidgetFlags};

// =============================================================================
// Conversions
// =============================================================================

fn to_taffy_dimension(dim: Dimension) -> TaffyDimension {
    match dim {
        Dimension::Auto => TaffyDimension::Auto,
        Dimension::Px(n) => TaffyDimension::Length(n as f32),
        Dimension::Percent(p) => TaffyDimension::Percent(p / 100.0),
    }
}

fn to_taffy_flex_direction(dir: FlexDirection) -> TaffyFlexDirection {
    match dir {
        FlexDirection::Column => TaffyFlexDirection::Column,
        FlexDirection::Row => TaffyFlexDirection::Row,
    }
}

fn to_taffy_style(style: &ResolvedStyle) -> TaffyStyle {
    let pad = LengthPercentage::Length(style.pad as f32);
    let gap = LengthPercentage::Length(style.gap as f32);
    TaffyStyle {
        display: Display::Flex,
        flex_direction: to_taffy_flex_direction(style.flex),
        size: Size {
            width: to_taffy_dimension(style.width),
            height: to_taffy_dimension(style.height),
        },
        padding: taffy::Rect {
            left: pad,
            right: pad,
            top: pad,
            bottom: pad,
        },
        gap: Size {
            width: gap,
            height: gap,
        },
        ..Default::default()
    }
}

fn taffy_err(err: taffy::TaffyError) -> Error {
    Error::Config(format!("layout engine: {err}"))
}

// =============================================================================
// Pass
// =============================================================================

/// Recompute bounds for every non-floating widget if anything changed
/// since the last pass. `avail` is the space offered to roots without
/// explicit bounds (normally the screen rect).
pub fn compute_layout(
    tree: &mut WidgetTree,
    theme: &dyn ThemeProvider,
    avail: Rect,
) -> Result<()> {
    if !tree.take_layout_dirty() {
        return Ok(());
    }

    // Floating widgets anchor their own flex subtree.
    let mut anchors: Vec<WidgetId> = Vec::new();
    let mut stack: Vec<WidgetId> = tree.roots().to_vec();
    let tree_roots: Vec<WidgetId> = tree.roots().to_vec();
    while let Some(id) = stack.pop() {
        let Some(w) = tree.get(id) else { continue };
        if w.flags().contains(WidgetFlags::FLOATING) || tree_roots.contains(&id) {
            anchors.push(id);
        }
        stack.extend(w.children().iter().copied());
    }

    for anchor in anchors {
        layout_anchor(tree, theme, anchor, avail)?;
    }
    Ok(())
}

fn layout_anchor(
    tree: &mut WidgetTree,
    theme: &dyn ThemeProvider,
    anchor: WidgetId,
    avail: Rect,
) -> Result<()> {
    let Some(widget) = tree.get(anchor) else {
        return Ok(());
    };
    let floating = widget.flags().contains(WidgetFlags::FLOATING);
    let frame = if floating { widget.bounds() } else { avail };
    let resolved = resolve(tree, anchor, widget.current_state(), theme)?;

    let mut taffy: TaffyTree<()> = TaffyTree::new();
    let mut nodes: HashMap<WidgetId, NodeId> = HashMap::new();
    let Some(root_node) = build_node(&mut taffy, &mut nodes, tree, theme, anchor, true)? else {
        return Ok(());
    };

    // Anchors fill their frame; Auto would collapse an empty container.
    let mut root_style = to_taffy_style(&resolved);
    if floating || resolved.width == Dimension::Auto {
        root_style.size.width = TaffyDimension::Length(frame.width as f32);
    }
    if floating || resolved.height == Dimension::Auto {
        root_style.size.height = TaffyDimension::Length(frame.height as f32);
    }
    taffy
        .set_style(root_node, root_style)
        .map_err(taffy_err)?;

    taffy
        .compute_layout(
            root_node,
            Size {
                width: AvailableSpace::Definite(frame.width as f32),
                height: AvailableSpace::Definite(frame.height as f32),
            },
        )
        .map_err(taffy_err)?;

    write_back(&taffy, &nodes, tree, anchor, (frame.x, frame.y), floating)?;
    Ok(())
}

/// Build the Taffy subtree for one anchor. Floating and hidden
/// descendants are excluded (the former are anchors of their own).
fn build_node(
    taffy: &mut TaffyTree<()>,
    nodes: &mut HashMap<WidgetId, NodeId>,
    tree: &WidgetTree,
    theme: &dyn ThemeProvider,
    id: WidgetId,
    is_anchor: bool,
) -> Result<Option<NodeId>> {
    let Some(widget) = tree.get(id) else {
        return Ok(None);
    };
    if widget.flags().contains(WidgetFlags::HIDDEN) {
        return Ok(None);
    }
    if !is_anchor && widget.flags().contains(WidgetFlags::FLOATING) {
        return Ok(None);
    }

    let style = resolve(tree, id, widget.current_state(), theme)?;

    let mut children: Vec<NodeId> = Vec::new();
    for child in widget.children() {
        if let Some(node) = build_node(taffy, nodes, tree, theme, *child, false)? {
            children.push(node);
        }
    }

    let node = taffy
        .new_with_children(to_taffy_style(&style), &children)
        .map_err(taffy_err)?;
    nodes.insert(id, node);
    Ok(Some(node))
}

/// Convert Taffy's parent-relative locations to absolute bounds and
/// store them. The anchor widget itself keeps its explicit bounds when
/// floating.
fn write_back(
    taffy: &TaffyTree<()>,
    nodes: &HashMap<WidgetId, NodeId>,
    tree: &mut WidgetTree,
    id: WidgetId,
    origin: (i32, i32),
    skip_self: bool,
) -> Result<()> {
    let Some(&node) = nodes.get(&id) else {
        return Ok(());
    };
    let layout = taffy.layout(node).map_err(taffy_err)?;

    let abs = Rect::new(
        origin.0 + layout.location.x.round() as i32,
        origin.1 + layout.location.y.round() as i32,
        layout.size.width.round() as u32,
        layout.size.height.round() as u32,
    );
    if !skip_self {
        tree.set_computed_bounds(id, abs);
    }

    let children: Vec<WidgetId> = match tree.get(id) {
        Some(w) => w.children().to_vec(),
        None => return Ok(()),
    };
    for child in children {
        write_back(taffy, nodes, tree, child, (abs.x, abs.y), false)?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
