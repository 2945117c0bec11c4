//! Trellis Core Runtime
//!
//! This crate provides the foundational primitives for the Trellis scene graph:
//!
//! - **Property Store**: typed descriptors registered once, sparse per-node bags
//! - **Invalidation**: dirty flags and invalidation modes with parent propagation
//! - **Events**: decoded input events, collection/property change notifications
//! - **Drag State Machine**: press/drag/release sequencing with total rollback
//!
//! # Example
//!
//! ```rust
//! use trellis_core::property::{Property, PropertyBag};
//! use trellis_core::invalidation::InvalidateMode;
//!
//! let opacity = Property::<f32>::builder("Doc", "Opacity", 1.0)
//!     .invalidates(InvalidateMode::RENDER)
//!     .register();
//!
//! let bag = PropertyBag::new();
//! assert!(bag.get_local(opacity.id()).is_none());
//! assert_eq!(opacity.default_value(), 1.0);
//! ```

pub mod affinity;
pub mod config;
pub mod drag;
pub mod error;
pub mod events;
pub mod geometry;
pub mod invalidation;
pub mod observer;
pub mod property;
pub mod types;
pub mod value;

use slotmap::new_key_type;

new_key_type! {
    /// Identifier of a visual node inside a tree arena
    pub struct NodeId;
}

pub use affinity::{DispatchQueue, ThreadAffinity};
pub use config::EngineConfig;
pub use drag::{
    DragController, DragError, DragOutcome, DragPhase, DragState, DragTarget, DragUpdate,
    PointerCapture,
};
pub use error::{LayoutPhase, Result, TreeViolation, TrellisError};
pub use events::{
    CollectionAction, CollectionChanged, KeyCode, KeyEvent, Modifiers, PointerButton, PointerEvent,
    PointerEventKind, PropertyChanged,
};
pub use geometry::{Point, Rect, Size, Thickness, Vec2};
pub use invalidation::{DirtyFlags, InvalidateMode, InvalidateReason, LayoutState, ReasonKind};
pub use observer::{ObserverList, ObserverToken};
pub use property::{
    resolve_value, Property, PropertyBag, PropertyChange, PropertyDescriptor, PropertyId,
    PropertyRegistry, PropertySource, SetOptions,
};
pub use types::{Alignment, DockSide, GridLength, Orientation};
pub use value::{PropertyType, PropertyValue, ValueKind};
