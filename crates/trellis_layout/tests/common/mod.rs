//! Shared helpers for trellis_layout integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use trellis_core::geometry::{Rect, Size};
use trellis_core::{NodeId, Result};
use trellis_layout::{ArrangeContext, Element, MeasureContext, RenderArgs, RenderContext};

/// Route `tracing` output through the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Core invocation counters shared with a [`CountingElement`]
#[derive(Clone, Debug, Default)]
pub struct Calls {
    pub measure: Arc<AtomicUsize>,
    pub arrange: Arc<AtomicUsize>,
    pub render: Arc<AtomicUsize>,
}

impl Calls {
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.measure.load(Ordering::SeqCst),
            self.arrange.load(Ordering::SeqCst),
            self.render.load(Ordering::SeqCst),
        )
    }

    pub fn reset(&self) {
        self.measure.store(0, Ordering::SeqCst);
        self.arrange.store(0, Ordering::SeqCst);
        self.render.store(0, Ordering::SeqCst);
    }
}

/// Lifecycle hook log: `(hook, node)` in firing order
pub type HookLog = Arc<Mutex<Vec<(&'static str, NodeId)>>>;

/// Fixed-size element that records every core call
#[derive(Debug, Default)]
pub struct CountingElement {
    pub size: Size,
    pub calls: Calls,
    pub hooks: HookLog,
}

impl CountingElement {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Size::new(width, height),
            ..Default::default()
        }
    }

    pub fn with_hooks(mut self, hooks: &HookLog) -> Self {
        self.hooks = hooks.clone();
        self
    }
}

impl Element for CountingElement {
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, available: Size) -> Result<Size> {
        self.calls.measure.fetch_add(1, Ordering::SeqCst);
        let mut desired = self.size;
        for child in ctx.visible_children()? {
            desired = desired.max(ctx.measure_child(child, available)?);
        }
        Ok(desired)
    }

    fn arrange_core(&mut self, ctx: &mut ArrangeContext<'_>, bounds: Rect) -> Result<()> {
        self.calls.arrange.fetch_add(1, Ordering::SeqCst);
        for child in ctx.visible_children()? {
            ctx.arrange_child(child, bounds)?;
        }
        Ok(())
    }

    fn render_core(&mut self, args: &RenderArgs, ctx: &mut dyn RenderContext) -> Result<()> {
        self.calls.render.fetch_add(1, Ordering::SeqCst);
        if let Some(order) = ctx.surface().downcast_mut::<Vec<NodeId>>() {
            order.push(args.node);
        }
        Ok(())
    }

    fn on_attached_to_composition(&mut self, node: NodeId) {
        self.hooks.lock().unwrap().push(("attached", node));
    }

    fn on_detaching_from_parent(&mut self, node: NodeId) {
        self.hooks.lock().unwrap().push(("detaching", node));
    }
}

/// Render surface that records the order nodes were drawn in
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub order: Vec<NodeId>,
}

impl RenderContext for RecordingSurface {
    fn surface(&mut self) -> &mut dyn std::any::Any {
        &mut self.order
    }
}
