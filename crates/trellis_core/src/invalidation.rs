//! Invalidation engine primitives
//!
//! A property mutation maps to an [`InvalidateMode`]. The local part of the
//! mode escalates the node's [`DirtyFlags`]; the parent part is re-applied to
//! the parent node. Coarser work subsumes finer work:
//!
//! ```text
//! Measure  ⊃  Arrange  ⊃  Render
//! ```
//!
//! [`InvalidateReason`] chains are carried for diagnostics only and never
//! change behavior.

use std::fmt;

use bitflags::bitflags;

use crate::property::PropertyDescriptor;
use crate::NodeId;

bitflags! {
    /// Pending recomputation for one node
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        const NEEDS_MEASURE = 1 << 0;
        const NEEDS_ARRANGE = 1 << 1;
        const NEEDS_RENDER = 1 << 2;
    }
}

bitflags! {
    /// Recomputation a property change requires, locally and on the parent
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct InvalidateMode: u8 {
        const MEASURE = 1 << 0;
        const ARRANGE = 1 << 1;
        const RENDER = 1 << 2;
        const PARENT_MEASURE = 1 << 3;
        const PARENT_ARRANGE = 1 << 4;
        const PARENT_RENDER = 1 << 5;
    }
}

impl DirtyFlags {
    /// Every flag a freshly created node starts with
    pub const ALL_DIRTY: DirtyFlags = DirtyFlags::all();

    /// Escalate to at least `required`, returning the flags that were newly set
    pub fn escalate(&mut self, required: DirtyFlags) -> DirtyFlags {
        let added = required.difference(*self);
        self.insert(required);
        added
    }

    pub fn needs_measure(self) -> bool {
        self.contains(DirtyFlags::NEEDS_MEASURE)
    }

    pub fn needs_arrange(self) -> bool {
        self.contains(DirtyFlags::NEEDS_ARRANGE)
    }

    pub fn needs_render(self) -> bool {
        self.contains(DirtyFlags::NEEDS_RENDER)
    }

    /// Position in the per-pass layout state machine
    pub fn layout_state(self) -> LayoutState {
        if self.needs_measure() {
            LayoutState::Unmeasured
        } else if self.needs_arrange() {
            LayoutState::Measured
        } else if self.needs_render() {
            LayoutState::Arranged
        } else {
            LayoutState::Rendered
        }
    }
}

impl InvalidateMode {
    /// Local part of the mode (measure/arrange/render on the node itself)
    pub fn local(self) -> InvalidateMode {
        self & (InvalidateMode::MEASURE | InvalidateMode::ARRANGE | InvalidateMode::RENDER)
    }

    /// Parent part of the mode, expressed as a local mode for the parent
    pub fn parent(self) -> InvalidateMode {
        let mut mode = InvalidateMode::empty();
        if self.contains(InvalidateMode::PARENT_MEASURE) {
            mode |= InvalidateMode::MEASURE;
        }
        if self.contains(InvalidateMode::PARENT_ARRANGE) {
            mode |= InvalidateMode::ARRANGE;
        }
        if self.contains(InvalidateMode::PARENT_RENDER) {
            mode |= InvalidateMode::RENDER;
        }
        mode
    }

    /// Dirty flags implied by the local part, with subsumption applied
    pub fn required_flags(self) -> DirtyFlags {
        if self.contains(InvalidateMode::MEASURE) {
            DirtyFlags::all()
        } else if self.contains(InvalidateMode::ARRANGE) {
            DirtyFlags::NEEDS_ARRANGE | DirtyFlags::NEEDS_RENDER
        } else if self.contains(InvalidateMode::RENDER) {
            DirtyFlags::NEEDS_RENDER
        } else {
            DirtyFlags::empty()
        }
    }
}

/// Per-node, per-pass layout state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayoutState {
    #[default]
    Unmeasured,
    Measured,
    Arranged,
    Rendered,
}

/// What caused an invalidation
#[derive(Clone, Debug, PartialEq)]
pub enum ReasonKind {
    PropertyChanged {
        owner: &'static str,
        name: &'static str,
    },
    ChildAdded(NodeId),
    ChildRemoved(NodeId),
    ChildrenReordered,
    ChildInvalidated(NodeId),
    DesiredSizeChanged(NodeId),
    Attached,
    ViewportChanged,
    ElementUpdated(&'static str),
    Explicit(&'static str),
}

impl fmt::Display for ReasonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonKind::PropertyChanged { owner, name } => write!(f, "property {owner}.{name}"),
            ReasonKind::ChildAdded(id) => write!(f, "child added {id:?}"),
            ReasonKind::ChildRemoved(id) => write!(f, "child removed {id:?}"),
            ReasonKind::ChildrenReordered => write!(f, "children reordered"),
            ReasonKind::ChildInvalidated(id) => write!(f, "child {id:?}"),
            ReasonKind::DesiredSizeChanged(id) => write!(f, "desired size of {id:?}"),
            ReasonKind::Attached => write!(f, "attached"),
            ReasonKind::ViewportChanged => write!(f, "viewport changed"),
            ReasonKind::ElementUpdated(what) => write!(f, "element {what}"),
            ReasonKind::Explicit(what) => write!(f, "explicit {what}"),
        }
    }
}

/// Causal chain attached to an invalidation
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidateReason {
    kind: ReasonKind,
    inner: Option<Box<InvalidateReason>>,
}

impl InvalidateReason {
    pub fn new(kind: ReasonKind) -> Self {
        Self { kind, inner: None }
    }

    pub fn explicit(what: &'static str) -> Self {
        Self::new(ReasonKind::Explicit(what))
    }

    pub fn property(descriptor: &PropertyDescriptor) -> Self {
        Self::new(ReasonKind::PropertyChanged {
            owner: descriptor.owner(),
            name: descriptor.name(),
        })
    }

    /// Attach the reason this one was caused by
    pub fn caused_by(mut self, inner: InvalidateReason) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn kind(&self) -> &ReasonKind {
        &self.kind
    }

    pub fn inner(&self) -> Option<&InvalidateReason> {
        self.inner.as_deref()
    }

    /// Iterate from this reason down to the root cause
    pub fn chain(&self) -> impl Iterator<Item = &InvalidateReason> {
        std::iter::successors(Some(self), |reason| reason.inner())
    }

    /// The innermost reason
    pub fn root_cause(&self) -> &InvalidateReason {
        self.chain().last().unwrap_or(self)
    }
}

impl fmt::Display for InvalidateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reason) in self.chain().enumerate() {
            if i > 0 {
                write!(f, " <- ")?;
            }
            write!(f, "{}", reason.kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_subsumes_arrange_and_render() {
        let flags = InvalidateMode::MEASURE.required_flags();
        assert!(flags.needs_measure() && flags.needs_arrange() && flags.needs_render());

        let flags = InvalidateMode::ARRANGE.required_flags();
        assert!(!flags.needs_measure() && flags.needs_arrange() && flags.needs_render());

        assert_eq!(InvalidateMode::RENDER.required_flags(), DirtyFlags::NEEDS_RENDER);
        assert_eq!(InvalidateMode::PARENT_MEASURE.required_flags(), DirtyFlags::empty());
    }

    #[test]
    fn test_escalate_is_idempotent() {
        let mut flags = DirtyFlags::empty();
        let added = flags.escalate(InvalidateMode::ARRANGE.required_flags());
        assert_eq!(added, DirtyFlags::NEEDS_ARRANGE | DirtyFlags::NEEDS_RENDER);

        let added = flags.escalate(InvalidateMode::RENDER.required_flags());
        assert!(added.is_empty());
        assert_eq!(flags.layout_state(), LayoutState::Measured);
    }

    #[test]
    fn test_parent_mode_mapping() {
        let mode = InvalidateMode::RENDER | InvalidateMode::PARENT_MEASURE;
        assert_eq!(mode.local(), InvalidateMode::RENDER);
        assert_eq!(mode.parent(), InvalidateMode::MEASURE);
        assert!(InvalidateMode::MEASURE.parent().is_empty());
    }

    #[test]
    fn test_reason_chain_display() {
        let reason = InvalidateReason::new(ReasonKind::ChildrenReordered)
            .caused_by(InvalidateReason::explicit("sort"));
        assert_eq!(reason.to_string(), "children reordered <- explicit sort");
        assert_eq!(reason.chain().count(), 2);
        assert_eq!(reason.root_cause().kind(), &ReasonKind::Explicit("sort"));
    }
}
