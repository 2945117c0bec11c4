//! Stacking panel
//!
//! Children line up along `Panel.Orientation`, each measured with an unbounded
//! primary axis. Content past the end of the panel overflows.

use trellis_core::geometry::{Rect, Size};
use trellis_core::Result;

use crate::element::{ArrangeContext, Element, MeasureContext};
use crate::properties::ORIENTATION;

#[derive(Clone, Copy, Debug, Default)]
pub struct StackPanel;

impl Element for StackPanel {
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, available: Size) -> Result<Size> {
        let orientation = ctx.get(ctx.node(), &ORIENTATION)?;
        let constraint = Size::from_axes(orientation, f32::INFINITY, available.across(orientation));
        let mut main = 0.0;
        let mut cross = 0.0f32;
        for child in ctx.visible_children()? {
            let desired = ctx.measure_child(child, constraint)?;
            main += desired.along(orientation);
            cross = cross.max(desired.across(orientation));
        }
        Ok(Size::from_axes(orientation, main, cross))
    }

    fn arrange_core(&mut self, ctx: &mut ArrangeContext<'_>, bounds: Rect) -> Result<()> {
        let orientation = ctx.get(ctx.node(), &ORIENTATION)?;
        let cross = bounds.size.across(orientation);
        let mut offset = 0.0;
        for child in ctx.visible_children()? {
            let main = ctx.desired_size(child).along(orientation);
            let slot = Rect::from_axes(orientation, offset, 0.0, main, cross);
            ctx.arrange_child(child, slot.offset(bounds.x(), bounds.y()))?;
            offset += main;
        }
        Ok(())
    }
}
