//! Scroll bar with a draggable thumb
//!
//! The thumb length is the share of the content the viewport shows, never
//! shorter than [`MIN_THUMB_LENGTH`]. Dragging maps pointer travel onto the
//! `[Minimum, Maximum]` value range; clicking the track pages by the viewport
//! size, or with Shift held jumps the thumb to the pointer. Escape during a
//! drag puts the value back exactly as it was.

use std::sync::LazyLock;

use trellis_core::drag::{DragController, DragOutcome, DragTarget, DragUpdate};
use trellis_core::error::{Result, TrellisError};
use trellis_core::events::{KeyEvent, Modifiers, PointerEvent, PointerEventKind};
use trellis_core::geometry::{Point, Rect, Size, Vec2};
use trellis_core::invalidation::InvalidateMode;
use trellis_core::property::Property;
use trellis_core::types::Orientation;
use trellis_core::NodeId;

use crate::element::{ArrangeContext, Element, MeasureContext};
use crate::properties::{IS_ENABLED, ORIENTATION};
use crate::tree::VisualTree;

/// Shortest thumb along the track
pub const MIN_THUMB_LENGTH: f32 = 8.0;

fn finite(value: f32) -> std::result::Result<f32, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("expected a finite number, got {value}"))
    }
}

pub static VALUE: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("RangeBase", "Value", 0.0)
        .invalidates(InvalidateMode::ARRANGE)
        .convert(finite)
        .register()
});

pub static MINIMUM: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("RangeBase", "Minimum", 0.0)
        .invalidates(InvalidateMode::ARRANGE)
        .convert(finite)
        .register()
});

pub static MAXIMUM: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("RangeBase", "Maximum", 100.0)
        .invalidates(InvalidateMode::ARRANGE)
        .convert(finite)
        .register()
});

/// Extent of the content visible at once, in value units
pub static VIEWPORT_SIZE: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("ScrollBar", "ViewportSize", 0.0)
        .invalidates(InvalidateMode::ARRANGE)
        .convert(|value: f32| {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(format!("expected a finite non-negative size, got {value}"))
            }
        })
        .register()
});

/// Value range of one scroll bar
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollRange {
    pub minimum: f32,
    /// Never below `minimum`
    pub maximum: f32,
    /// Clamped into `[minimum, maximum]`
    pub value: f32,
    pub viewport: f32,
}

impl ScrollRange {
    pub fn new(minimum: f32, maximum: f32, value: f32, viewport: f32) -> Self {
        let maximum = maximum.max(minimum);
        Self {
            minimum,
            maximum,
            value: value.clamp(minimum, maximum),
            viewport,
        }
    }

    pub fn read(tree: &VisualTree, node: NodeId) -> Result<Self> {
        Ok(Self::new(
            tree.get(node, &MINIMUM)?,
            tree.get(node, &MAXIMUM)?,
            tree.get(node, &VALUE)?,
            tree.get(node, &VIEWPORT_SIZE)?,
        ))
    }

    pub fn span(&self) -> f32 {
        self.maximum - self.minimum
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.minimum, self.maximum)
    }

    /// Step of a track click
    pub fn page(&self) -> f32 {
        if self.viewport > 0.0 {
            self.viewport
        } else {
            self.span() / 10.0
        }
    }
}

/// Thumb `(length, travel)` on a track of `track` units.
///
/// Travel is the distance the thumb can move; it is zero when there is
/// nothing to scroll.
pub fn thumb_extent(track: f32, range: &ScrollRange) -> (f32, f32) {
    let track = track.max(0.0);
    let span = range.span();
    if span <= 0.0 {
        return (track, 0.0);
    }
    let length = if range.viewport > 0.0 {
        track * range.viewport / (span + range.viewport)
    } else {
        0.0
    };
    let length = length.max(MIN_THUMB_LENGTH).min(track);
    (length, track - length)
}

/// Value after dragging the thumb `delta` units from where it held `start`
pub fn drag_value(start: f32, delta: f32, range: &ScrollRange, travel: f32) -> f32 {
    if travel <= 0.0 {
        return range.clamp(start);
    }
    range.clamp(start + delta / travel * range.span())
}

/// What a pointer event did to a scroll bar
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollInput {
    Ignored,
    /// A track click moved the value one page
    Paged { value: f32 },
    /// A Shift track click centred the thumb on the pointer
    Jumped { value: f32 },
    Drag(DragOutcome),
}

/// State held while the thumb is dragged
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThumbSnapshot {
    value: f32,
    range: ScrollRange,
    axis: Orientation,
    travel: f32,
}

#[derive(Debug)]
pub struct ScrollBar {
    /// Extent across the track
    pub thickness: f32,
    controller: DragController<ThumbSnapshot>,
}

impl Default for ScrollBar {
    fn default() -> Self {
        Self {
            thickness: 12.0,
            controller: DragController::new(),
        }
    }
}

fn not_a_scroll_bar(node: NodeId) -> TrellisError {
    TrellisError::unsupported("ScrollBar", format!("node {node:?} does not hold a ScrollBar"))
}

impl ScrollBar {
    pub fn new(thickness: f32) -> Self {
        Self {
            thickness,
            ..Default::default()
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    /// Thumb rect in the scroll bar's own coordinates
    pub fn thumb_rect(tree: &VisualTree, node: NodeId) -> Result<Rect> {
        let axis = tree.get(node, &ORIENTATION)?;
        let range = ScrollRange::read(tree, node)?;
        let size = tree.arranged_rect(node).size;
        let (length, travel) = thumb_extent(size.along(axis), &range);
        let progress = if range.span() > 0.0 {
            (range.value - range.minimum) / range.span()
        } else {
            0.0
        };
        Ok(Rect::from_axes(axis, travel * progress, 0.0, length, size.across(axis)))
    }

    /// Set the value, clamped into range; returns what was stored
    pub fn scroll_to(tree: &mut VisualTree, node: NodeId, value: f32) -> Result<f32> {
        let range = ScrollRange::read(tree, node)?;
        let value = range.clamp(value);
        tree.set(node, &VALUE, value)?;
        Ok(value)
    }

    fn take_controller(tree: &mut VisualTree, node: NodeId) -> Result<DragController<ThumbSnapshot>> {
        tree.element_mut::<ScrollBar>(node)
            .map(|bar| std::mem::take(&mut bar.controller))
            .ok_or_else(|| not_a_scroll_bar(node))
    }

    fn put_controller(tree: &mut VisualTree, node: NodeId, controller: DragController<ThumbSnapshot>) {
        if let Some(bar) = tree.element_mut::<ScrollBar>(node) {
            bar.controller = controller;
        }
    }

    /// Route a pointer event to the scroll bar at `node`
    pub fn on_pointer(tree: &mut VisualTree, node: NodeId, event: &PointerEvent) -> Result<ScrollInput> {
        tree.check_thread()?;
        let bar = tree.element::<ScrollBar>(node).ok_or_else(|| not_a_scroll_bar(node))?;
        let dragging = bar.is_dragging();

        if event.kind == PointerEventKind::Down && !dragging {
            if !tree.get(node, &IS_ENABLED)? {
                return Ok(ScrollInput::Ignored);
            }
            let bounds = tree.bounds_in_root(node);
            if !bounds.contains(event.position) {
                return Ok(ScrollInput::Ignored);
            }
            let local = Point::new(event.position.x - bounds.x(), event.position.y - bounds.y());
            let thumb = Self::thumb_rect(tree, node)?;
            if !thumb.contains(local) {
                let axis = tree.get(node, &ORIENTATION)?;
                let range = ScrollRange::read(tree, node)?;
                if event.modifiers.contains(Modifiers::SHIFT) {
                    let (length, travel) = thumb_extent(bounds.size.along(axis), &range);
                    let pointer = local.delta_from(Point::ZERO).along(axis);
                    let target = drag_value(range.minimum, pointer - length / 2.0, &range, travel);
                    let value = Self::scroll_to(tree, node, target)?;
                    tracing::trace!(?node, value, "scroll bar jumped");
                    return Ok(ScrollInput::Jumped { value });
                }
                let before = if axis == Orientation::Horizontal {
                    local.x < thumb.x()
                } else {
                    local.y < thumb.y()
                };
                let step = if before { -range.page() } else { range.page() };
                let value = Self::scroll_to(tree, node, range.value + step)?;
                tracing::trace!(?node, value, "scroll bar paged");
                return Ok(ScrollInput::Paged { value });
            }
            let threshold = tree.config().drag_threshold;
            Self::take_controller(tree, node)?;
            let mut controller = DragController::new().with_threshold(threshold);
            let outcome = controller.handle_pointer(&mut ThumbTarget { tree: &mut *tree, node }, event);
            Self::put_controller(tree, node, controller);
            return outcome.map(ScrollInput::Drag);
        }

        let mut controller = Self::take_controller(tree, node)?;
        let outcome = controller.handle_pointer(&mut ThumbTarget { tree: &mut *tree, node }, event);
        Self::put_controller(tree, node, controller);
        outcome.map(ScrollInput::Drag)
    }

    /// Escape cancels a thumb drag
    pub fn on_key(tree: &mut VisualTree, node: NodeId, event: &KeyEvent) -> Result<DragOutcome> {
        tree.check_thread()?;
        let mut controller = Self::take_controller(tree, node)?;
        let outcome = controller.handle_key(&mut ThumbTarget { tree: &mut *tree, node }, event);
        Self::put_controller(tree, node, controller);
        outcome
    }
}

impl Element for ScrollBar {
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, _available: Size) -> Result<Size> {
        let axis = ctx.get(ctx.node(), &ORIENTATION)?;
        Ok(Size::from_axes(axis, MIN_THUMB_LENGTH, self.thickness))
    }

    fn arrange_core(&mut self, _ctx: &mut ArrangeContext<'_>, _bounds: Rect) -> Result<()> {
        Ok(())
    }
}

struct ThumbTarget<'a> {
    tree: &'a mut VisualTree,
    node: NodeId,
}

impl DragTarget for ThumbTarget<'_> {
    type Snapshot = ThumbSnapshot;

    fn capture_pointer(&mut self) -> Result<()> {
        self.tree.capture_pointer(self.node)
    }

    fn release_pointer(&mut self) {
        self.tree.release_pointer_capture(self.node);
    }

    fn begin_drag(&mut self) -> Result<ThumbSnapshot> {
        let axis = self.tree.get(self.node, &ORIENTATION)?;
        let range = ScrollRange::read(self.tree, self.node)?;
        let track = self.tree.arranged_rect(self.node).size.along(axis);
        let (_, travel) = thumb_extent(track, &range);
        Ok(ThumbSnapshot {
            value: self.tree.get(self.node, &VALUE)?,
            range,
            axis,
            travel,
        })
    }

    fn update_drag(&mut self, snapshot: &ThumbSnapshot, delta: Vec2) -> Result<DragUpdate> {
        let value = drag_value(
            snapshot.range.value,
            delta.along(snapshot.axis),
            &snapshot.range,
            snapshot.travel,
        );
        self.tree.set(self.node, &VALUE, value)?;
        Ok(DragUpdate::Applied)
    }

    fn restore(&mut self, snapshot: &ThumbSnapshot) -> Result<()> {
        self.tree.set(self.node, &VALUE, snapshot.value)?;
        Ok(())
    }
}
