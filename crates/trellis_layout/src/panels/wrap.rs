//! Wrapping panel
//!
//! Children flow along `Panel.Orientation` and break onto a new line when the
//! next one would overflow the available extent. Lines stack along the cross
//! axis, each as thick as its thickest child.

use std::ops::Range;
use std::sync::LazyLock;

use trellis_core::geometry::{approx_gt, Rect, Size};
use trellis_core::invalidation::InvalidateMode;
use trellis_core::property::Property;
use trellis_core::types::Orientation;
use trellis_core::{NodeId, Result};

use crate::element::{ArrangeContext, Element, MeasureContext};
use crate::properties::{auto_or_length, ORIENTATION};
use crate::tree::VisualTree;

/// Fixed slot width for every child; `NaN` uses each child's desired width
pub static ITEM_WIDTH: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("WrapPanel", "ItemWidth", f32::NAN)
        .invalidates(InvalidateMode::MEASURE)
        .convert(auto_or_length)
        .register()
});

/// Fixed slot height for every child; `NaN` uses each child's desired height
pub static ITEM_HEIGHT: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("WrapPanel", "ItemHeight", f32::NAN)
        .invalidates(InvalidateMode::MEASURE)
        .convert(auto_or_length)
        .register()
});

/// Split items into lines no longer than `available`.
///
/// An item that alone exceeds `available` gets a line of its own. An
/// unbounded extent never breaks.
pub fn break_lines(extents: &[f32], available: f32) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut used = 0.0;
    for (i, &extent) in extents.iter().enumerate() {
        if i > start && approx_gt(used + extent, available) {
            lines.push(start..i);
            start = i;
            used = 0.0;
        }
        used += extent;
    }
    if start < extents.len() {
        lines.push(start..extents.len());
    }
    lines
}

/// Total size of `slots` broken into lines along `orientation`
fn lines_extent(slots: &[Size], lines: &[Range<usize>], orientation: Orientation) -> Size {
    let mut main = 0.0f32;
    let mut cross = 0.0f32;
    for line in lines {
        let items = &slots[line.clone()];
        main = main.max(items.iter().map(|s| s.along(orientation)).sum());
        cross += items
            .iter()
            .map(|s| s.across(orientation))
            .fold(0.0, f32::max);
    }
    Size::from_axes(orientation, main, cross)
}

/// Panel that wraps its children onto successive lines
#[derive(Clone, Copy, Debug, Default)]
pub struct WrapPanel;

struct ItemSize {
    width: f32,
    height: f32,
}

impl ItemSize {
    fn read(tree: &VisualTree, node: NodeId) -> Result<Self> {
        Ok(Self {
            width: tree.get(node, &ITEM_WIDTH)?,
            height: tree.get(node, &ITEM_HEIGHT)?,
        })
    }

    /// Slot of a child, overriding its desired size where set
    fn slot(&self, desired: Size) -> Size {
        Size::new(
            if self.width.is_nan() { desired.width } else { self.width },
            if self.height.is_nan() { desired.height } else { self.height },
        )
    }
}

impl Element for WrapPanel {
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, available: Size) -> Result<Size> {
        let node = ctx.node();
        let orientation = ctx.get(node, &ORIENTATION)?;
        let item = ItemSize::read(ctx.tree(), node)?;
        let constraint = item.slot(available);

        let mut slots = Vec::new();
        for child in ctx.visible_children()? {
            let desired = ctx.measure_child(child, constraint)?;
            slots.push(item.slot(desired));
        }
        let extents: Vec<f32> = slots.iter().map(|s| s.along(orientation)).collect();
        let lines = break_lines(&extents, available.along(orientation));
        Ok(lines_extent(&slots, &lines, orientation))
    }

    fn arrange_core(&mut self, ctx: &mut ArrangeContext<'_>, bounds: Rect) -> Result<()> {
        let node = ctx.node();
        let orientation = ctx.get(node, &ORIENTATION)?;
        let item = ItemSize::read(ctx.tree(), node)?;
        let children = ctx.visible_children()?;
        let slots: Vec<Size> = children
            .iter()
            .map(|&child| item.slot(ctx.desired_size(child)))
            .collect();
        let extents: Vec<f32> = slots.iter().map(|s| s.along(orientation)).collect();

        let mut cross_offset = 0.0;
        for line in break_lines(&extents, bounds.size.along(orientation)) {
            let thickness = slots[line.clone()]
                .iter()
                .map(|s| s.across(orientation))
                .fold(0.0, f32::max);
            let mut main_offset = 0.0;
            for i in line {
                let main = extents[i];
                let slot = Rect::from_axes(orientation, main_offset, cross_offset, main, thickness);
                ctx.arrange_child(children[i], slot.offset(bounds.x(), bounds.y()))?;
                main_offset += main;
            }
            cross_offset += thickness;
        }
        Ok(())
    }
}
