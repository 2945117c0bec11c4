//! Docking panel
//!
//! Children are consumed in order. Each one claims a strip of the space left
//! over by its predecessors along its `DockPanel.Dock` side; the last child
//! fills whatever remains when `DockPanel.LastChildFill` is set.
//!
//! Without `DockPanel.AllowOverlap` a strip is clamped to the remaining space,
//! so opposite strips never cross. With it, a strip is only clamped to the
//! panel edge.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use trellis_core::geometry::{approx_eq, Rect, Size};
use trellis_core::invalidation::InvalidateMode;
use trellis_core::property::Property;
use trellis_core::types::{DockSide, Orientation};
use trellis_core::{NodeId, Result};

use crate::element::{ArrangeContext, Element, MeasureContext};

/// Attached: side of the remaining space a child claims
pub static DOCK: LazyLock<Property<DockSide>> = LazyLock::new(|| {
    Property::builder("DockPanel", "Dock", DockSide::Left)
        .invalidates(InvalidateMode::PARENT_MEASURE)
        .register()
});

pub static LAST_CHILD_FILL: LazyLock<Property<bool>> = LazyLock::new(|| {
    Property::builder("DockPanel", "LastChildFill", true)
        .invalidates(InvalidateMode::MEASURE)
        .register()
});

pub static ALLOW_OVERLAP: LazyLock<Property<bool>> = LazyLock::new(|| {
    Property::builder("DockPanel", "AllowOverlap", false)
        .invalidates(InvalidateMode::MEASURE)
        .register()
});

/// Desired size of a dock panel.
///
/// `measure_child(i, constraint)` measures the `i`-th child against the space
/// its predecessors left over.
pub fn measure<F>(available: Size, sides: &[DockSide], mut measure_child: F) -> Result<Size>
where
    F: FnMut(usize, Size) -> Result<Size>,
{
    let mut desired = Size::ZERO;
    let mut used = Size::ZERO;
    for (i, side) in sides.iter().enumerate() {
        let constraint = Size::new(
            (available.width - used.width).max(0.0),
            (available.height - used.height).max(0.0),
        );
        let child = measure_child(i, constraint)?;
        match side.orientation() {
            Orientation::Horizontal => {
                desired.height = desired.height.max(used.height + child.height);
                used.width += child.width;
            }
            Orientation::Vertical => {
                desired.width = desired.width.max(used.width + child.width);
                used.height += child.height;
            }
        }
    }
    Ok(desired.max(used))
}

/// Slot of every child within a panel of `size`.
///
/// `items` pairs each child's dock side with its desired size.
pub fn arrange(
    size: Size,
    items: &[(DockSide, Size)],
    last_child_fill: bool,
    allow_overlap: bool,
) -> Vec<Rect> {
    let fill_index = if last_child_fill {
        items.len().saturating_sub(1)
    } else {
        items.len()
    };

    let (mut left, mut top, mut right, mut bottom) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
    let mut slots = Vec::with_capacity(items.len());
    for (i, &(side, desired)) in items.iter().enumerate() {
        let remaining = Size::new(
            (size.width - left - right).max(0.0),
            (size.height - top - bottom).max(0.0),
        );
        let mut slot = Rect::new(left, top, remaining.width, remaining.height);
        if i < fill_index {
            match side.orientation() {
                Orientation::Horizontal => {
                    let limit = if allow_overlap {
                        (size.width - if side == DockSide::Left { left } else { right }).max(0.0)
                    } else {
                        remaining.width
                    };
                    let width = desired.width.min(limit);
                    slot.size.width = width;
                    if side == DockSide::Left {
                        left += width;
                    } else {
                        right += width;
                        slot.origin.x = size.width - right;
                    }
                }
                Orientation::Vertical => {
                    let limit = if allow_overlap {
                        (size.height - if side == DockSide::Top { top } else { bottom }).max(0.0)
                    } else {
                        remaining.height
                    };
                    let height = desired.height.min(limit);
                    slot.size.height = height;
                    if side == DockSide::Top {
                        top += height;
                    } else {
                        bottom += height;
                        slot.origin.y = size.height - bottom;
                    }
                }
            }
        }
        slots.push(slot);
    }
    slots
}

fn side_index(side: DockSide) -> usize {
    match side {
        DockSide::Left => 0,
        DockSide::Top => 1,
        DockSide::Right => 2,
        DockSide::Bottom => 3,
    }
}

/// Immediate neighbour of each slot on each side, by index.
///
/// A neighbour shares the facing edge; among several, the one with the
/// longest shared span wins and the earliest child breaks ties. Degenerate
/// slots have no neighbours and are nobody's neighbour.
pub fn neighbors(slots: &[Rect]) -> Vec<[Option<usize>; 4]> {
    let mut out = vec![[None; 4]; slots.len()];
    for (i, a) in slots.iter().enumerate() {
        if a.is_degenerate() {
            continue;
        }
        for side in DockSide::ALL {
            let mut best: Option<(usize, f32)> = None;
            for (j, b) in slots.iter().enumerate() {
                if i == j || b.is_degenerate() {
                    continue;
                }
                let (touches, shared) = match side {
                    DockSide::Left => (approx_eq(b.right(), a.x()), a.vertical_overlap(b)),
                    DockSide::Right => (approx_eq(b.x(), a.right()), a.vertical_overlap(b)),
                    DockSide::Top => (approx_eq(b.bottom(), a.y()), a.horizontal_overlap(b)),
                    DockSide::Bottom => (approx_eq(b.y(), a.bottom()), a.horizontal_overlap(b)),
                };
                if !touches || shared <= 0.0 {
                    continue;
                }
                if best.map_or(true, |(_, longest)| shared > longest) {
                    best = Some((j, shared));
                }
            }
            out[i][side_index(side)] = best.map(|(j, _)| j);
        }
    }
    out
}

/// Neighbour map of the latest arrange
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DockNeighbors {
    map: FxHashMap<NodeId, [Option<NodeId>; 4]>,
}

impl DockNeighbors {
    fn rebuild(&mut self, children: &[NodeId], slots: &[Rect]) {
        self.map.clear();
        for (i, sides) in neighbors(slots).into_iter().enumerate() {
            self.map.insert(children[i], sides.map(|n| n.map(|j| children[j])));
        }
    }

    pub fn get(&self, child: NodeId, side: DockSide) -> Option<NodeId> {
        self.map.get(&child)?[side_index(side)]
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Panel docking its children against the edges of the remaining space
#[derive(Debug, Default)]
pub struct DockPanel {
    neighbors: DockNeighbors,
}

impl DockPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Neighbour of a docked child as of the latest arrange
    pub fn neighbor(&self, child: NodeId, side: DockSide) -> Option<NodeId> {
        self.neighbors.get(child, side)
    }

    pub fn neighbors(&self) -> &DockNeighbors {
        &self.neighbors
    }
}

impl Element for DockPanel {
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, available: Size) -> Result<Size> {
        let children = ctx.visible_children()?;
        let sides = children
            .iter()
            .map(|&child| ctx.get(child, &DOCK))
            .collect::<Result<Vec<_>>>()?;
        measure(available, &sides, |i, constraint| {
            ctx.measure_child(children[i], constraint)
        })
    }

    fn arrange_core(&mut self, ctx: &mut ArrangeContext<'_>, bounds: Rect) -> Result<()> {
        let node = ctx.node();
        let children = ctx.visible_children()?;
        let mut items = Vec::with_capacity(children.len());
        for &child in &children {
            items.push((ctx.get(child, &DOCK)?, ctx.desired_size(child)));
        }
        let fill = ctx.get(node, &LAST_CHILD_FILL)?;
        let overlap = ctx.get(node, &ALLOW_OVERLAP)?;

        let slots = arrange(bounds.size, &items, fill, overlap);
        for (&child, slot) in children.iter().zip(&slots) {
            ctx.arrange_child(child, slot.offset(bounds.x(), bounds.y()))?;
        }
        self.neighbors.rebuild(&children, &slots);
        Ok(())
    }
}
