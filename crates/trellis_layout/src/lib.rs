//! Trellis Layout Engine
//!
//! Retained visual tree with a two-pass measure/arrange protocol:
//!
//! - **Visual tree**: arena of nodes with typed properties and dirty tracking
//! - **Layout pass**: shallowest-first measure and arrange queues, driven by
//!   [`VisualTree::update_layout`]
//! - **Panels**: dock, wrap, stack and grid placement strategies
//! - **Interaction**: grid splitters and scroll bar thumbs built on
//!   [`trellis_core::drag`]
//!
//! # Example
//!
//! ```rust
//! use trellis_core::geometry::{Rect, Size};
//! use trellis_layout::panels::dock::DOCK;
//! use trellis_layout::{DockPanel, Spacer, VisualTree};
//! use trellis_core::types::DockSide;
//!
//! let mut tree = VisualTree::new();
//! let dock = tree.create(DockPanel::new()).unwrap();
//! tree.set_root(dock).unwrap();
//!
//! let header = tree.create(Spacer::new(0.0, 20.0)).unwrap();
//! let body = tree.create(Spacer::default()).unwrap();
//! tree.add_child(dock, header).unwrap();
//! tree.add_child(dock, body).unwrap();
//! tree.set(header, &DOCK, DockSide::Top).unwrap();
//!
//! tree.update_layout(Size::new(200.0, 100.0)).unwrap();
//! assert_eq!(tree.arranged_rect(body), Rect::new(0.0, 20.0, 200.0, 80.0));
//! ```

pub mod element;
pub mod panels;
pub mod pass;
pub mod properties;
pub mod scrollbar;
pub mod splitter;
pub mod tree;

pub use element::{ArrangeContext, Element, MeasureContext, Overlay, RenderArgs, RenderContext, Spacer};
pub use panels::{DockNeighbors, DockPanel, Grid, GridDimension, GridDimensions, StackPanel, WrapPanel};
pub use pass::LayoutStats;
pub use scrollbar::{ScrollBar, ScrollInput, ScrollRange};
pub use splitter::{GridResizeBehavior, GridResizeDirection, GridSplitter, ResizePair};
pub use tree::VisualTree;
