//! Element protocol
//!
//! Every node carries one [`Element`] that supplies the node-specific part of
//! measure, arrange and render. The tree wraps those cores with the framework
//! rules (visibility, margin, explicit and min/max sizes, alignment, caching);
//! see `pass.rs`.
//!
//! An element only reaches its children through the context it is handed, so
//! a core can measure or arrange its own children but never re-enter itself.

use std::any::Any;

use trellis_core::config::EngineConfig;
use trellis_core::geometry::{Rect, Size};
use trellis_core::property::Property;
use trellis_core::value::PropertyType;
use trellis_core::{NodeId, Result};

use crate::tree::VisualTree;

/// Downcasting support for boxed elements
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Node-specific layout and render behavior
///
/// The default cores lay children on top of each other, each receiving the
/// full space of the node.
pub trait Element: AsAny + Send {
    /// Short type name used in diagnostics
    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Compute the desired content size for `available` (margin already removed).
    ///
    /// Axes may be `f32::INFINITY`. The result may exceed `available`.
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, available: Size) -> Result<Size> {
        let mut desired = Size::ZERO;
        for child in ctx.visible_children()? {
            desired = desired.max(ctx.measure_child(child, available)?);
        }
        Ok(desired)
    }

    /// Place children inside `bounds`, which is local to this node (origin at zero)
    fn arrange_core(&mut self, ctx: &mut ArrangeContext<'_>, bounds: Rect) -> Result<()> {
        for child in ctx.visible_children()? {
            ctx.arrange_child(child, bounds)?;
        }
        Ok(())
    }

    fn render_core(&mut self, _args: &RenderArgs, _ctx: &mut dyn RenderContext) -> Result<()> {
        Ok(())
    }

    /// The tree became connected to a live rendering surface
    fn on_attached_to_composition(&mut self, _node: NodeId) {}

    /// The node is leaving its parent or the surface is going away
    fn on_detaching_from_parent(&mut self, _node: NodeId) {}
}

/// Opaque handle into the graphics collaborator
pub trait RenderContext {
    fn surface(&mut self) -> &mut dyn Any;
}

/// Per-node render input
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderArgs {
    pub node: NodeId,
    /// Arranged bounds in root coordinates
    pub bounds: Rect,
}

/// Access handed to [`Element::measure_core`]
pub struct MeasureContext<'a> {
    pub(crate) tree: &'a mut VisualTree,
    pub(crate) node: NodeId,
}

impl<'a> MeasureContext<'a> {
    /// The node being measured
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tree(&self) -> &VisualTree {
        self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        self.tree.config()
    }

    pub fn children(&self) -> Vec<NodeId> {
        self.tree.children(self.node).to_vec()
    }

    /// Children whose `Visual.IsVisible` is set, in insertion order
    pub fn visible_children(&self) -> Result<Vec<NodeId>> {
        self.tree.visible_children(self.node)
    }

    /// Read a property of this node or any other node
    pub fn get<T: PropertyType>(&self, node: NodeId, property: &Property<T>) -> Result<T> {
        self.tree.get(node, property)
    }

    /// Measure a direct child, returning its desired size including margin
    pub fn measure_child(&mut self, child: NodeId, available: Size) -> Result<Size> {
        self.tree.ensure_child(self.node, child)?;
        self.tree.measure_node(child, available)
    }

    pub fn desired_size(&self, child: NodeId) -> Size {
        self.tree.desired_size(child)
    }
}

/// Access handed to [`Element::arrange_core`]
pub struct ArrangeContext<'a> {
    pub(crate) tree: &'a mut VisualTree,
    pub(crate) node: NodeId,
}

impl<'a> ArrangeContext<'a> {
    /// The node being arranged
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tree(&self) -> &VisualTree {
        self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        self.tree.config()
    }

    pub fn children(&self) -> Vec<NodeId> {
        self.tree.children(self.node).to_vec()
    }

    pub fn visible_children(&self) -> Result<Vec<NodeId>> {
        self.tree.visible_children(self.node)
    }

    pub fn get<T: PropertyType>(&self, node: NodeId, property: &Property<T>) -> Result<T> {
        self.tree.get(node, property)
    }

    pub fn desired_size(&self, child: NodeId) -> Size {
        self.tree.desired_size(child)
    }

    /// Assign a direct child its slot, in this node's local coordinates
    pub fn arrange_child(&mut self, child: NodeId, slot: Rect) -> Result<()> {
        self.tree.ensure_child(self.node, child)?;
        self.tree.arrange_node(child, slot)
    }

    /// Final rect of an already arranged child
    pub fn arranged_rect(&self, child: NodeId) -> Rect {
        self.tree.arranged_rect(child)
    }
}

/// Leaf with a fixed intrinsic size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spacer {
    pub size: Size,
}

impl Spacer {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Size::new(width, height),
        }
    }
}

impl Element for Spacer {
    fn measure_core(&mut self, _ctx: &mut MeasureContext<'_>, _available: Size) -> Result<Size> {
        Ok(self.size)
    }

    fn arrange_core(&mut self, _ctx: &mut ArrangeContext<'_>, _bounds: Rect) -> Result<()> {
        Ok(())
    }
}

/// Container that stacks its children on top of each other
#[derive(Clone, Copy, Debug, Default)]
pub struct Overlay;

impl Element for Overlay {}
