//! Layout pass driver
//!
//! `update_layout` drains the measure queue and then the arrange queue,
//! always taking the shallowest queued node first. A node re-measured on its
//! own (with the constraint its parent last gave it) whose desired size
//! changed re-queues its parent, so size changes bubble up only as far as
//! they matter.
//!
//! Framework rules applied around every element core:
//!
//! - invisible nodes measure to zero and are parked off-screen
//! - margin is removed before the core runs and added back after
//! - explicit `Width`/`Height` and `Min*`/`Max*` bound both the constraint
//!   and the result
//! - desired sizes are forced finite and non-negative
//! - the arranged rect is resolved by alignment and never exceeds its slot
//! - degenerate rects are parked off-screen instead of being arranged

use trellis_core::error::{LayoutPhase, Result, TrellisError};
use trellis_core::geometry::{Point, Rect, Size};
use trellis_core::invalidation::{DirtyFlags, InvalidateMode, InvalidateReason, ReasonKind};
use trellis_core::types::Alignment;
use trellis_core::NodeId;

use crate::element::{ArrangeContext, MeasureContext, RenderArgs, RenderContext};
use crate::properties::LayoutProps;
use crate::tree::VisualTree;

/// Upper bound on measure/arrange rounds within one `update_layout`
const MAX_LAYOUT_ROUNDS: usize = 64;

/// Work performed by one layout pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// `measure_core` invocations
    pub measured: usize,
    /// `arrange_core` invocations
    pub arranged: usize,
    pub rounds: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Queue {
    Measure,
    Arrange,
}

/// Offset and extent along one axis
fn align_axis(alignment: Alignment, available: f32, desired: f32, min: f32, max: f32) -> (f32, f32) {
    let available = if available.is_finite() { available } else { desired };
    let wanted = match alignment {
        Alignment::Stretch => available,
        _ => desired,
    };
    let extent = wanted.min(max).max(min);
    // a bounded stretch is centered
    let effective = match alignment {
        Alignment::Stretch if extent < available => Alignment::Center,
        other => other,
    };
    effective.resolve(available, extent)
}

/// Final rect of a visible node inside `slot`
fn place(props: &LayoutProps, slot: Rect, desired: Size) -> Rect {
    let inner = slot.deflate(props.margin);
    let content = desired.deflate(props.margin);
    let bounds = props.min_max();
    let (x, width) = align_axis(
        props.horizontal_alignment,
        inner.width(),
        content.width,
        bounds.min_width,
        bounds.max_width,
    );
    let (y, height) = align_axis(
        props.vertical_alignment,
        inner.height(),
        content.height,
        bounds.min_height,
        bounds.max_height,
    );
    Rect::new(inner.x() + x, inner.y() + y, width, height)
}

impl VisualTree {
    /// Measure `node` against `available`, returning its desired size
    pub fn measure(&mut self, node: NodeId, available: Size) -> Result<Size> {
        self.check_thread()?;
        self.measure_node(node, available)
    }

    /// Arrange `node` into `slot` (parent coordinates)
    pub fn arrange(&mut self, node: NodeId, slot: Rect) -> Result<()> {
        self.check_thread()?;
        self.arrange_node(node, slot)
    }

    pub(crate) fn measure_node(&mut self, node: NodeId, available: Size) -> Result<Size> {
        let available = available.normalize_constraint();
        let slot = self.node(node)?;
        if !slot.flags.needs_measure() && slot.previous_constraint == Some(available) {
            return Ok(slot.desired_size);
        }

        let props = LayoutProps::read(self, node)?;
        let desired = if props.visible {
            let bounds = props.min_max();
            let inner = bounds.clamp(available.deflate(props.margin));
            let core = self.run_measure_core(node, inner)?;
            let sanitized = core.sanitized();
            if sanitized != core {
                tracing::debug!(?node, ?core, "sanitized desired size");
            }
            bounds.clamp(sanitized).inflate(props.margin).sanitized()
        } else {
            Size::ZERO
        };

        let slot = self.node_mut(node)?;
        slot.desired_size = desired;
        slot.previous_constraint = Some(available);
        slot.flags.remove(DirtyFlags::NEEDS_MEASURE);
        slot.flags.insert(DirtyFlags::NEEDS_ARRANGE);
        self.arrange_queue.insert(node);
        Ok(desired)
    }

    fn run_measure_core(&mut self, node: NodeId, available: Size) -> Result<Size> {
        let mut element = self.node_mut(node)?.element.take().ok_or(TrellisError::Reentrancy {
            node,
            phase: LayoutPhase::Measure,
        })?;
        let result = {
            let mut ctx = MeasureContext { tree: self, node };
            element.measure_core(&mut ctx, available)
        };
        if let Some(slot) = self.nodes.get_mut(node) {
            slot.element = Some(element);
        }
        self.stats.measured += 1;
        result
    }

    pub(crate) fn arrange_node(&mut self, node: NodeId, slot_rect: Rect) -> Result<()> {
        let cached = self.node(node)?;
        if !cached.flags.needs_arrange() && cached.previous_slot == Some(slot_rect) {
            return Ok(());
        }
        if cached.flags.needs_measure() {
            let constraint = cached.previous_constraint.unwrap_or(slot_rect.size);
            self.measure_node(node, constraint)?;
        }

        let props = LayoutProps::read(self, node)?;
        let slot = self.node(node)?;
        let old_rect = slot.arranged_rect;
        let mut rect = if props.visible {
            place(&props, slot_rect, slot.desired_size)
        } else {
            Rect::offscreen()
        };
        if self.config().layout_rounding {
            rect = rect.round();
        }
        let parked = rect.is_degenerate();
        if parked {
            rect = Rect::offscreen();
        }

        let slot = self.node_mut(node)?;
        slot.arranged_rect = rect;
        slot.previous_slot = Some(slot_rect);
        slot.flags.remove(DirtyFlags::NEEDS_ARRANGE);
        if !parked || rect != old_rect {
            slot.flags.insert(DirtyFlags::NEEDS_RENDER);
        }
        if parked {
            return Ok(());
        }

        self.run_arrange_core(node, Rect::from_origin_size(Point::ZERO, rect.size))?;
        self.park_hidden_children(node)
    }

    fn run_arrange_core(&mut self, node: NodeId, bounds: Rect) -> Result<()> {
        let mut element = self.node_mut(node)?.element.take().ok_or(TrellisError::Reentrancy {
            node,
            phase: LayoutPhase::Arrange,
        })?;
        let result = {
            let mut ctx = ArrangeContext { tree: self, node };
            element.arrange_core(&mut ctx, bounds)
        };
        if let Some(slot) = self.nodes.get_mut(node) {
            slot.element = Some(element);
        }
        self.stats.arranged += 1;
        result
    }

    /// Panels skip invisible children; settle them here
    fn park_hidden_children(&mut self, node: NodeId) -> Result<()> {
        for child in self.children(node).to_vec() {
            if self.get(child, &crate::properties::IS_VISIBLE)? {
                continue;
            }
            let constraint = self.node(child)?.previous_constraint.unwrap_or(Size::ZERO);
            self.measure_node(child, constraint)?;
            self.arrange_node(child, Rect::offscreen())?;
        }
        Ok(())
    }

    /// Run every pending measure and arrange for a viewport of `viewport`
    pub fn update_layout(&mut self, viewport: Size) -> Result<LayoutStats> {
        self.check_thread()?;
        let viewport = viewport.sanitized();
        self.stats = LayoutStats::default();

        let Some(root) = self.root() else {
            self.measure_queue.clear();
            self.arrange_queue.clear();
            self.viewport = viewport;
            return Ok(self.stats);
        };
        if viewport != self.viewport {
            self.viewport = viewport;
            self.invalidate_inner(
                root,
                InvalidateMode::MEASURE,
                InvalidateReason::new(ReasonKind::ViewportChanged),
            )?;
        }

        while !(self.measure_queue.is_empty() && self.arrange_queue.is_empty()) {
            if self.stats.rounds == MAX_LAYOUT_ROUNDS {
                tracing::warn!(
                    pending_measure = self.measure_queue.len(),
                    pending_arrange = self.arrange_queue.len(),
                    "layout did not settle"
                );
                break;
            }
            self.stats.rounds += 1;
            while let Some(node) = self.pop_shallowest(Queue::Measure) {
                self.process_measure(root, node)?;
            }
            while let Some(node) = self.pop_shallowest(Queue::Arrange) {
                self.process_arrange(root, node)?;
            }
        }

        tracing::debug!(
            measured = self.stats.measured,
            arranged = self.stats.arranged,
            rounds = self.stats.rounds,
            "layout pass"
        );
        Ok(self.stats)
    }

    fn pop_shallowest(&mut self, which: Queue) -> Option<NodeId> {
        let queue = match which {
            Queue::Measure => &self.measure_queue,
            Queue::Arrange => &self.arrange_queue,
        };
        let (index, _) = queue
            .iter()
            .enumerate()
            .map(|(i, &id)| (i, self.depth(id)))
            .min_by_key(|&(_, depth)| depth)?;
        let queue = match which {
            Queue::Measure => &mut self.measure_queue,
            Queue::Arrange => &mut self.arrange_queue,
        };
        queue.shift_remove_index(index)
    }

    fn process_measure(&mut self, root: NodeId, node: NodeId) -> Result<()> {
        let Some(slot) = self.nodes.get(node) else {
            return Ok(());
        };
        if !slot.flags.needs_measure() || !self.is_attached(node) {
            return Ok(());
        }
        if node == root {
            self.measure_node(root, self.viewport)?;
            return Ok(());
        }
        let parent = slot.parent;
        let before = slot.desired_size;
        let (Some(constraint), Some(parent)) = (slot.previous_constraint, parent) else {
            // never measured by its parent: the parent's own measure covers it
            if let Some(parent) = parent {
                self.invalidate_inner(
                    parent,
                    InvalidateMode::MEASURE,
                    InvalidateReason::new(ReasonKind::ChildInvalidated(node)),
                )?;
            }
            return Ok(());
        };
        let after = self.measure_node(node, constraint)?;
        if after != before {
            let mut reason = InvalidateReason::new(ReasonKind::DesiredSizeChanged(node));
            if let Some(cause) = self.last_invalidation(node) {
                reason = reason.caused_by(cause.clone());
            }
            self.invalidate_inner(parent, InvalidateMode::MEASURE, reason)?;
        }
        Ok(())
    }

    fn process_arrange(&mut self, root: NodeId, node: NodeId) -> Result<()> {
        let Some(slot) = self.nodes.get(node) else {
            return Ok(());
        };
        if !slot.flags.needs_arrange() || !self.is_attached(node) {
            return Ok(());
        }
        if node == root {
            let viewport = Rect::from_origin_size(Point::ZERO, self.viewport);
            return self.arrange_node(root, viewport);
        }
        match (slot.previous_slot, slot.parent) {
            (Some(previous), _) => self.arrange_node(node, previous),
            (None, Some(parent)) => self.invalidate_inner(
                parent,
                InvalidateMode::ARRANGE,
                InvalidateReason::new(ReasonKind::ChildInvalidated(node)),
            ),
            (None, None) => Ok(()),
        }
    }

    /// Render every node that needs it, in pre-order.
    ///
    /// Runs pending layout first. Does nothing until the composition is live.
    /// Returns the number of nodes rendered.
    pub fn render(&mut self, ctx: &mut dyn RenderContext) -> Result<usize> {
        self.check_thread()?;
        if !self.is_composition_live() {
            return Ok(0);
        }
        if !(self.measure_queue.is_empty() && self.arrange_queue.is_empty()) {
            self.update_layout(self.viewport)?;
        }
        let Some(root) = self.root() else {
            return Ok(0);
        };

        let mut rendered = 0;
        let mut stack = vec![(root, Point::ZERO)];
        while let Some((id, origin)) = stack.pop() {
            let slot = self.node(id)?;
            let rect = slot.arranged_rect;
            if rect.is_degenerate() {
                continue;
            }
            let bounds = rect.offset(origin.x, origin.y);
            if slot.flags.needs_render() {
                self.run_render_core(id, &RenderArgs { node: id, bounds }, ctx)?;
                self.node_mut(id)?.flags.remove(DirtyFlags::NEEDS_RENDER);
                rendered += 1;
            }
            for &child in self.children(id).iter().rev() {
                stack.push((child, bounds.origin));
            }
        }
        tracing::trace!(rendered, "render pass");
        Ok(rendered)
    }

    fn run_render_core(
        &mut self,
        node: NodeId,
        args: &RenderArgs,
        ctx: &mut dyn RenderContext,
    ) -> Result<()> {
        let mut element = self.node_mut(node)?.element.take().ok_or(TrellisError::Reentrancy {
            node,
            phase: LayoutPhase::Render,
        })?;
        let result = element.render_core(args, ctx);
        if let Some(slot) = self.nodes.get_mut(node) {
            slot.element = Some(element);
        }
        result
    }
}
