//! Visual tree arena
//!
//! Nodes live in a [`SlotMap`] and refer to each other by [`NodeId`]. A parent
//! owns the ordered list of its children; a child records at most one parent.
//! Every structural mutation validates first and mutates second, so a rejected
//! call leaves the tree exactly as it was.

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use slotmap::SlotMap;

use trellis_core::affinity::{DispatchQueue, ThreadAffinity};
use trellis_core::config::EngineConfig;
use trellis_core::drag::PointerCapture;
use trellis_core::error::{Result, TreeViolation, TrellisError};
use trellis_core::events::{CollectionAction, CollectionChanged, PropertyChanged};
use trellis_core::geometry::{Rect, Size};
use trellis_core::invalidation::{
    DirtyFlags, InvalidateMode, InvalidateReason, LayoutState, ReasonKind,
};
use trellis_core::observer::{ObserverList, ObserverToken};
use trellis_core::property::{
    resolve_value, Property, PropertyBag, PropertyChange, PropertyDescriptor, PropertyId,
    PropertySource, SetOptions,
};
use trellis_core::value::{PropertyType, PropertyValue};
use trellis_core::NodeId;

use crate::element::Element;
use crate::pass::LayoutStats;
use crate::properties::IS_VISIBLE;

pub(crate) type NodeQueue = IndexSet<NodeId, FxBuildHasher>;

/// One slot of the arena
pub(crate) struct VisualNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) properties: PropertyBag,
    /// `None` while the element is running one of its cores
    pub(crate) element: Option<Box<dyn Element>>,
    pub(crate) type_name: &'static str,
    pub(crate) desired_size: Size,
    pub(crate) arranged_rect: Rect,
    pub(crate) previous_constraint: Option<Size>,
    pub(crate) previous_slot: Option<Rect>,
    pub(crate) flags: DirtyFlags,
    pub(crate) last_reason: Option<InvalidateReason>,
    /// `on_attached_to_composition` has fired and no detach since
    pub(crate) live: bool,
}

impl VisualNode {
    fn new(element: Box<dyn Element>) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            properties: PropertyBag::new(),
            type_name: element.type_name(),
            element: Some(element),
            desired_size: Size::ZERO,
            arranged_rect: Rect::ZERO,
            previous_constraint: None,
            previous_slot: None,
            flags: DirtyFlags::ALL_DIRTY,
            last_reason: None,
            live: false,
        }
    }

    /// Forget cached layout inputs so the next parent pass measures afresh
    fn reset_layout_inputs(&mut self) {
        self.previous_constraint = None;
        self.previous_slot = None;
        self.flags = DirtyFlags::ALL_DIRTY;
    }
}

/// Retained tree of visual nodes bound to one owning thread
pub struct VisualTree {
    pub(crate) nodes: SlotMap<NodeId, VisualNode>,
    root: Option<NodeId>,
    affinity: ThreadAffinity,
    config: EngineConfig,
    pub(crate) measure_queue: NodeQueue,
    pub(crate) arrange_queue: NodeQueue,
    capture: PointerCapture<NodeId>,
    property_observers: ObserverList<PropertyChanged>,
    collection_observers: ObserverList<CollectionChanged>,
    dispatch: DispatchQueue<VisualTree>,
    composition_live: bool,
    pub(crate) viewport: Size,
    pub(crate) stats: LayoutStats,
}

impl VisualTree {
    /// Tree bound to the calling thread with the default configuration
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            affinity: ThreadAffinity::current(),
            config,
            measure_queue: NodeQueue::default(),
            arrange_queue: NodeQueue::default(),
            capture: PointerCapture::new(),
            property_observers: ObserverList::new(),
            collection_observers: ObserverList::new(),
            dispatch: DispatchQueue::new(),
            composition_live: false,
            viewport: Size::ZERO,
            stats: LayoutStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    pub(crate) fn check_thread(&self) -> Result<()> {
        self.affinity.check()
    }

    // ------------------------------------------------------------------
    // Structure queries
    // ------------------------------------------------------------------

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Children in insertion order; empty for unknown nodes
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Parent chain, nearest first
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    pub fn depth(&self, node: NodeId) -> usize {
        self.ancestors(node).count()
    }

    /// Reachable from the tree root
    pub fn is_attached(&self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        let top = self.ancestors(node).last().unwrap_or(node);
        self.root == Some(top)
    }

    /// `node` and all its descendants in pre-order
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(slot) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(slot.children.iter().rev().copied());
        }
        out
    }

    /// Children whose `Visual.IsVisible` is set
    pub fn visible_children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut visible = Vec::with_capacity(self.children(node).len());
        for &child in self.children(node) {
            if self.get(child, &IS_VISIBLE)? {
                visible.push(child);
            }
        }
        Ok(visible)
    }

    pub fn type_name(&self, node: NodeId) -> Option<&'static str> {
        self.nodes.get(node).map(|n| n.type_name)
    }

    pub(crate) fn node(&self, node: NodeId) -> Result<&VisualNode> {
        self.nodes
            .get(node)
            .ok_or_else(|| TreeViolation::UnknownNode(node).into())
    }

    pub(crate) fn node_mut(&mut self, node: NodeId) -> Result<&mut VisualNode> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| TreeViolation::UnknownNode(node).into())
    }

    pub(crate) fn ensure_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) == Some(parent) {
            Ok(())
        } else {
            Err(TreeViolation::NotAChild { parent, child }.into())
        }
    }

    // ------------------------------------------------------------------
    // Structure mutation
    // ------------------------------------------------------------------

    /// Create a detached node
    pub fn create<E: Element>(&mut self, element: E) -> Result<NodeId> {
        self.check_thread()?;
        let id = self.nodes.insert(VisualNode::new(Box::new(element)));
        tracing::trace!(node = ?id, type_name = self.nodes[id].type_name, "created node");
        Ok(id)
    }

    /// Make a parentless node the root of the tree
    pub fn set_root(&mut self, node: NodeId) -> Result<()> {
        self.check_thread()?;
        let slot = self.node(node)?;
        if slot.parent.is_some() {
            return Err(TreeViolation::ParentedRoot(node).into());
        }
        if self.root == Some(node) {
            return Ok(());
        }
        if let Some(old) = self.root.take() {
            self.fire_detaching(old);
        }
        self.root = Some(node);
        self.node_mut(node)?.reset_layout_inputs();
        if self.composition_live {
            self.fire_attached(node);
        }
        self.invalidate_inner(node, InvalidateMode::MEASURE, InvalidateReason::new(ReasonKind::Attached))
    }

    fn validate_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        let slot = self.node(child)?;
        if parent == child {
            return Err(TreeViolation::SelfParent(child).into());
        }
        if self.root == Some(child) {
            return Err(TreeViolation::RootAsChild(child).into());
        }
        if let Some(existing) = slot.parent {
            return Err(TreeViolation::AlreadyParented {
                child,
                parent: existing,
            }
            .into());
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(TreeViolation::Cycle { parent, child }.into());
        }
        Ok(())
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check_thread()?;
        self.validate_attach(parent, child)?;
        let len = self.children(parent).len();
        if len >= self.config.max_children {
            return Err(TreeViolation::TooManyChildren {
                parent,
                max: self.config.max_children,
            }
            .into());
        }
        if index > len {
            return Err(TreeViolation::IndexOutOfBounds { index, len }.into());
        }

        let action = if index == len {
            CollectionAction::Add
        } else {
            CollectionAction::Insert
        };
        self.link(parent, index, child)?;
        self.collection_observers.notify(
            &CollectionChanged::new(parent, action)
                .at(index)
                .with_item(child),
        );
        Ok(())
    }

    fn link(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.node_mut(parent)?.children.insert(index, child);
        let slot = self.node_mut(child)?;
        slot.parent = Some(parent);
        slot.reset_layout_inputs();
        if self.composition_live && self.is_attached(parent) {
            self.fire_attached(child);
        }
        self.invalidate_inner(child, InvalidateMode::MEASURE, InvalidateReason::new(ReasonKind::Attached))?;
        self.invalidate_inner(
            parent,
            InvalidateMode::MEASURE,
            InvalidateReason::new(ReasonKind::ChildAdded(child)),
        )
    }

    fn unlink(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let child = self.node(parent)?.children[index];
        self.fire_detaching(child);
        self.node_mut(parent)?.children.remove(index);
        let slot = self.node_mut(child)?;
        slot.parent = None;
        slot.reset_layout_inputs();
        if let Some(owner) = self.capture.owner() {
            if owner == child || self.ancestors(owner).any(|a| a == child) {
                self.capture.release(owner);
            }
        }
        self.invalidate_inner(
            parent,
            InvalidateMode::MEASURE,
            InvalidateReason::new(ReasonKind::ChildRemoved(child)),
        )?;
        Ok(child)
    }

    /// Detach `child` from `parent`; the child subtree stays alive, detached
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_thread()?;
        self.node(parent)?;
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == child)
            .ok_or(TreeViolation::NotAChild { parent, child })?;
        self.unlink(parent, index)?;
        self.collection_observers.notify(
            &CollectionChanged::new(parent, CollectionAction::Remove)
                .at(index)
                .with_item(child),
        );
        Ok(())
    }

    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        self.check_thread()?;
        let len = self.node(parent)?.children.len();
        if index >= len {
            return Err(TreeViolation::IndexOutOfBounds { index, len }.into());
        }
        let child = self.unlink(parent, index)?;
        self.collection_observers.notify(
            &CollectionChanged::new(parent, CollectionAction::Remove)
                .at(index)
                .with_item(child),
        );
        Ok(child)
    }

    /// Swap the child at `index` for `child`, returning the detached node
    pub fn replace_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<NodeId> {
        self.check_thread()?;
        self.validate_attach(parent, child)?;
        let len = self.children(parent).len();
        if index >= len {
            return Err(TreeViolation::IndexOutOfBounds { index, len }.into());
        }
        let old = self.unlink(parent, index)?;
        self.link(parent, index, child)?;
        self.collection_observers.notify(
            &CollectionChanged::new(parent, CollectionAction::Replace)
                .at(index)
                .with_item(old)
                .with_item(child),
        );
        Ok(old)
    }

    /// Detach every child, returning them in their former order
    pub fn clear_children(&mut self, parent: NodeId) -> Result<Vec<NodeId>> {
        self.check_thread()?;
        let count = self.node(parent)?.children.len();
        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            removed.push(self.unlink(parent, 0)?);
        }
        let mut event = CollectionChanged::new(parent, CollectionAction::Clear);
        event.items.extend(removed.iter().copied());
        self.collection_observers.notify(&event);
        Ok(removed)
    }

    /// Stable manual reordering; returns whether the order changed
    pub fn sort_children_by_key<K, F>(&mut self, parent: NodeId, mut key: F) -> Result<bool>
    where
        K: Ord,
        F: FnMut(&VisualTree, NodeId) -> K,
    {
        self.check_thread()?;
        let children = self.node(parent)?.children.clone();
        let mut keyed: Vec<(K, NodeId)> = children.iter().map(|&c| (key(self, c), c)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        let sorted: Vec<NodeId> = keyed.into_iter().map(|(_, c)| c).collect();
        if sorted == children {
            return Ok(false);
        }
        self.node_mut(parent)?.children = sorted;
        self.invalidate_inner(
            parent,
            InvalidateMode::MEASURE,
            InvalidateReason::new(ReasonKind::ChildrenReordered),
        )?;
        self.collection_observers
            .notify(&CollectionChanged::new(parent, CollectionAction::Sort));
        Ok(true)
    }

    /// Detach (if needed) and free `node` and its whole subtree
    pub fn destroy(&mut self, node: NodeId) -> Result<()> {
        self.check_thread()?;
        self.node(node)?;
        if let Some(parent) = self.parent(node) {
            self.remove_child(parent, node)?;
        } else if self.root == Some(node) {
            self.fire_detaching(node);
            self.root = None;
        }
        let doomed = self.subtree(node);
        for id in &doomed {
            self.nodes.remove(*id);
            self.measure_queue.shift_remove(id);
            self.arrange_queue.shift_remove(id);
            self.capture.release(*id);
        }
        tracing::trace!(?node, freed = doomed.len(), "destroyed subtree");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Composition lifecycle
    // ------------------------------------------------------------------

    pub fn is_composition_live(&self) -> bool {
        self.composition_live
    }

    /// The rendering surface became available; fires attach hooks on every
    /// attached node and on nodes attached later
    pub fn attach_composition(&mut self) -> Result<()> {
        self.check_thread()?;
        if self.composition_live {
            return Ok(());
        }
        self.composition_live = true;
        if let Some(root) = self.root {
            self.fire_attached(root);
        }
        Ok(())
    }

    /// The rendering surface is going away
    pub fn detach_composition(&mut self) -> Result<()> {
        self.check_thread()?;
        self.release_composition();
        Ok(())
    }

    fn release_composition(&mut self) {
        if !self.composition_live {
            return;
        }
        if let Some(root) = self.root {
            self.fire_detaching(root);
        }
        self.composition_live = false;
    }

    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.live)
    }

    fn fire_attached(&mut self, node: NodeId) {
        for id in self.subtree(node) {
            let Some(slot) = self.nodes.get_mut(id) else {
                continue;
            };
            if slot.live {
                continue;
            }
            slot.live = true;
            slot.flags.insert(DirtyFlags::NEEDS_RENDER);
            if let Some(element) = slot.element.as_deref_mut() {
                element.on_attached_to_composition(id);
            }
        }
    }

    fn fire_detaching(&mut self, node: NodeId) {
        for id in self.subtree(node) {
            let Some(slot) = self.nodes.get_mut(id) else {
                continue;
            };
            slot.live = false;
            if let Some(element) = slot.element.as_deref_mut() {
                element.on_detaching_from_parent(id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Property store
    // ------------------------------------------------------------------

    /// Effective typed value: local, then ambient ancestor, then default
    pub fn get<T: PropertyType>(&self, node: NodeId, property: &Property<T>) -> Result<T> {
        let value = self.get_value(node, property.descriptor())?;
        property.decode(value)
    }

    pub fn get_value(
        &self,
        node: NodeId,
        descriptor: &'static PropertyDescriptor,
    ) -> Result<&PropertyValue> {
        self.node(node)?;
        Ok(resolve_value(self, node, descriptor))
    }

    /// Locally set value, ignoring inheritance and defaults
    pub fn local_value(&self, node: NodeId, id: PropertyId) -> Option<&PropertyValue> {
        self.nodes.get(node)?.properties.get_local(id)
    }

    /// Returns whether the effective value changed
    pub fn set<T: PropertyType>(&mut self, node: NodeId, property: &Property<T>, value: T) -> Result<bool> {
        self.set_with(node, property, value, SetOptions::default())
    }

    pub fn set_with<T: PropertyType>(
        &mut self,
        node: NodeId,
        property: &Property<T>,
        value: T,
        options: SetOptions,
    ) -> Result<bool> {
        self.set_value(node, property.descriptor(), value.into_value(), options)
    }

    /// Untyped write through the store pipeline
    pub fn set_value(
        &mut self,
        node: NodeId,
        descriptor: &'static PropertyDescriptor,
        value: PropertyValue,
        options: SetOptions,
    ) -> Result<bool> {
        self.check_thread()?;
        let current = self.get_value(node, descriptor)?.clone();
        let change = self
            .node_mut(node)?
            .properties
            .set_value(node, descriptor, value, &current)?;
        match change {
            Some(change) => {
                self.publish_change(node, descriptor, change, options)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a local value; returns whether the effective value changed
    pub fn clear<T: PropertyType>(&mut self, node: NodeId, property: &Property<T>) -> Result<bool> {
        self.check_thread()?;
        let descriptor = property.descriptor();
        self.node(node)?;
        let fallback = match (descriptor.is_ambient(), self.parent(node)) {
            (true, Some(parent)) => resolve_value(&*self, parent, descriptor).clone(),
            _ => descriptor.default_value().clone(),
        };
        let change = self
            .node_mut(node)?
            .properties
            .clear_value(node, descriptor, &fallback);
        match change {
            Some(change) => {
                self.publish_change(node, descriptor, change, SetOptions::default())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn publish_change(
        &mut self,
        node: NodeId,
        descriptor: &'static PropertyDescriptor,
        change: PropertyChange,
        options: SetOptions,
    ) -> Result<()> {
        let mode = descriptor.invalidates();
        if !options.suppress_invalidation && !mode.is_empty() {
            let reason = InvalidateReason::property(descriptor);
            self.invalidate_inner(node, mode, reason.clone())?;
            if descriptor.is_ambient() {
                self.invalidate_inheritors(node, descriptor, mode.local(), &reason)?;
            }
        }
        self.property_observers.notify(&PropertyChanged {
            node,
            property: change.property,
            owner: descriptor.owner(),
            name: descriptor.name(),
            old: change.old,
            new: change.new,
        });
        Ok(())
    }

    /// Descendants that inherit an ambient value see the change too
    fn invalidate_inheritors(
        &mut self,
        node: NodeId,
        descriptor: &PropertyDescriptor,
        mode: InvalidateMode,
        reason: &InvalidateReason,
    ) -> Result<()> {
        let mut stack = self.children(node).to_vec();
        while let Some(id) = stack.pop() {
            if self.local_value(id, descriptor.id()).is_some() {
                continue;
            }
            self.invalidate_inner(id, mode, reason.clone())?;
            stack.extend_from_slice(self.children(id));
        }
        Ok(())
    }

    pub fn on_property_changed<F>(&mut self, callback: F) -> ObserverToken
    where
        F: Fn(&PropertyChanged) + Send + Sync + 'static,
    {
        self.property_observers.subscribe(callback)
    }

    pub fn unsubscribe_property_changed(&mut self, token: ObserverToken) -> bool {
        self.property_observers.unsubscribe(token)
    }

    pub fn on_collection_changed<F>(&mut self, callback: F) -> ObserverToken
    where
        F: Fn(&CollectionChanged) + Send + Sync + 'static,
    {
        self.collection_observers.subscribe(callback)
    }

    pub fn unsubscribe_collection_changed(&mut self, token: ObserverToken) -> bool {
        self.collection_observers.unsubscribe(token)
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Escalate `node` to at least `mode` and propagate the parent part upward
    pub fn invalidate(&mut self, node: NodeId, mode: InvalidateMode, reason: InvalidateReason) -> Result<()> {
        self.check_thread()?;
        self.invalidate_inner(node, mode, reason)
    }

    pub(crate) fn invalidate_inner(
        &mut self,
        node: NodeId,
        mode: InvalidateMode,
        reason: InvalidateReason,
    ) -> Result<()> {
        let trace = self.config.trace_invalidation;
        let slot = self.node_mut(node)?;
        let required = mode.local().required_flags();
        let added = slot.flags.escalate(required);
        let parent = slot.parent;
        if !required.is_empty() {
            slot.last_reason = Some(reason.clone());
        }
        if required.needs_measure() {
            self.measure_queue.insert(node);
        }
        if required.needs_arrange() {
            self.arrange_queue.insert(node);
        }
        if trace && !added.is_empty() {
            tracing::trace!(?node, ?mode, reason = %reason, "invalidate");
        }

        let parent_mode = mode.parent();
        match parent {
            Some(parent) if !parent_mode.is_empty() => {
                let reason = InvalidateReason::new(ReasonKind::ChildInvalidated(node)).caused_by(reason);
                self.invalidate_inner(parent, parent_mode, reason)
            }
            _ => Ok(()),
        }
    }

    /// Pending work; empty for unknown nodes
    pub fn dirty_flags(&self, node: NodeId) -> DirtyFlags {
        self.nodes
            .get(node)
            .map(|n| n.flags)
            .unwrap_or_else(DirtyFlags::empty)
    }

    pub fn layout_state(&self, node: NodeId) -> LayoutState {
        self.dirty_flags(node).layout_state()
    }

    /// Reason recorded by the latest invalidation of `node`
    pub fn last_invalidation(&self, node: NodeId) -> Option<&InvalidateReason> {
        self.nodes.get(node)?.last_reason.as_ref()
    }

    // ------------------------------------------------------------------
    // Layout results
    // ------------------------------------------------------------------

    /// Desired size from the latest measure, margin included
    pub fn desired_size(&self, node: NodeId) -> Size {
        self.nodes.get(node).map_or(Size::ZERO, |n| n.desired_size)
    }

    /// Rect from the latest arrange, relative to the parent
    pub fn arranged_rect(&self, node: NodeId) -> Rect {
        self.nodes.get(node).map_or(Rect::ZERO, |n| n.arranged_rect)
    }

    /// Arranged rect translated into root coordinates
    pub fn bounds_in_root(&self, node: NodeId) -> Rect {
        let mut rect = self.arranged_rect(node);
        for ancestor in self.ancestors(node) {
            let origin = self.arranged_rect(ancestor).origin;
            rect = rect.offset(origin.x, origin.y);
        }
        rect
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    pub fn element<T: Element>(&self, node: NodeId) -> Option<&T> {
        self.nodes
            .get(node)?
            .element
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn element_mut<T: Element>(&mut self, node: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(node)?
            .element
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Mutate an element's own state and invalidate the node with `mode`
    pub fn update_element<T, R, F>(&mut self, node: NodeId, mode: InvalidateMode, f: F) -> Result<R>
    where
        T: Element,
        F: FnOnce(&mut T) -> R,
    {
        self.check_thread()?;
        let element = self.element_mut::<T>(node).ok_or_else(|| {
            TrellisError::unsupported(
                "update_element",
                format!("node {node:?} does not hold a {}", std::any::type_name::<T>()),
            )
        })?;
        let result = f(element);
        self.invalidate_inner(
            node,
            mode,
            InvalidateReason::new(ReasonKind::ElementUpdated(std::any::type_name::<T>())),
        )?;
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Pointer capture
    // ------------------------------------------------------------------

    pub fn capture_pointer(&mut self, node: NodeId) -> Result<()> {
        self.check_thread()?;
        self.node(node)?;
        self.capture.capture(node)
    }

    pub fn release_pointer_capture(&mut self, node: NodeId) -> bool {
        self.capture.release(node)
    }

    pub fn pointer_capture(&self) -> Option<NodeId> {
        self.capture.owner()
    }

    // ------------------------------------------------------------------
    // Cross-thread dispatch
    // ------------------------------------------------------------------

    /// Handle other threads use to post work back to this tree
    pub fn dispatcher(&self) -> DispatchQueue<VisualTree> {
        self.dispatch.clone()
    }

    /// Run work posted through [`VisualTree::dispatcher`]
    pub fn process_dispatch(&mut self) -> Result<usize> {
        self.check_thread()?;
        let queue = self.dispatch.clone();
        let count = queue.run(self);
        if count > 0 {
            tracing::debug!(count, "processed dispatched tasks");
        }
        Ok(count)
    }
}

impl Default for VisualTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for VisualTree {
    fn local_value(&self, node: NodeId, id: PropertyId) -> Option<&PropertyValue> {
        VisualTree::local_value(self, node, id)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node)
    }
}

impl Drop for VisualTree {
    fn drop(&mut self) {
        if self.composition_live {
            tracing::debug!("visual tree dropped while composition was live");
            self.release_composition();
        }
    }
}
