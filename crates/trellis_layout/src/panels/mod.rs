//! Panel layout strategies
//!
//! Each panel is split into a pure function over child sizes and an
//! [`Element`](crate::element::Element) wrapper that feeds it from the tree.

pub mod dock;
pub mod grid;
pub mod stack;
pub mod wrap;

pub use dock::{DockNeighbors, DockPanel};
pub use grid::{Grid, GridDimension, GridDimensions};
pub use stack::StackPanel;
pub use wrap::WrapPanel;
