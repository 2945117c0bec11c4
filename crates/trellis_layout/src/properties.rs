//! Framework layout properties shared by every node
//!
//! Lengths use `NaN` for "auto". Panel-specific attached properties live next
//! to their panel (`panels::dock::DOCK`, `panels::grid::ROW`, ...).

use std::sync::{Arc, LazyLock};

use trellis_core::geometry::{Size, Thickness};
use trellis_core::invalidation::InvalidateMode;
use trellis_core::property::Property;
use trellis_core::types::{Alignment, Orientation};
use trellis_core::{NodeId, Result};

use crate::tree::VisualTree;

const SIZE_CHANGE: InvalidateMode = InvalidateMode::MEASURE.union(InvalidateMode::PARENT_MEASURE);

/// `NaN` (auto) or a finite non-negative length
pub(crate) fn auto_or_length(value: f32) -> std::result::Result<f32, String> {
    if value.is_nan() || (value.is_finite() && value >= 0.0) {
        Ok(value)
    } else {
        Err(format!("expected a non-negative length or NaN, got {value}"))
    }
}

fn min_length(value: f32) -> std::result::Result<f32, String> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("expected a finite non-negative length, got {value}"))
    }
}

fn max_length(value: f32) -> std::result::Result<f32, String> {
    if !value.is_nan() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("expected a non-negative length or infinity, got {value}"))
    }
}

pub static WIDTH: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("Visual", "Width", f32::NAN)
        .invalidates(SIZE_CHANGE)
        .convert(auto_or_length)
        .register()
});

pub static HEIGHT: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("Visual", "Height", f32::NAN)
        .invalidates(SIZE_CHANGE)
        .convert(auto_or_length)
        .register()
});

pub static MIN_WIDTH: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("Visual", "MinWidth", 0.0)
        .invalidates(SIZE_CHANGE)
        .convert(min_length)
        .register()
});

pub static MIN_HEIGHT: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("Visual", "MinHeight", 0.0)
        .invalidates(SIZE_CHANGE)
        .convert(min_length)
        .register()
});

pub static MAX_WIDTH: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("Visual", "MaxWidth", f32::INFINITY)
        .invalidates(SIZE_CHANGE)
        .convert(max_length)
        .register()
});

pub static MAX_HEIGHT: LazyLock<Property<f32>> = LazyLock::new(|| {
    Property::builder("Visual", "MaxHeight", f32::INFINITY)
        .invalidates(SIZE_CHANGE)
        .convert(max_length)
        .register()
});

pub static MARGIN: LazyLock<Property<Thickness>> = LazyLock::new(|| {
    Property::builder("Visual", "Margin", Thickness::ZERO)
        .invalidates(SIZE_CHANGE)
        .convert(|margin| {
            if margin.is_valid() {
                Ok(margin)
            } else {
                Err(format!("margin sides must be finite and non-negative, got {margin:?}"))
            }
        })
        .register()
});

pub static HORIZONTAL_ALIGNMENT: LazyLock<Property<Alignment>> = LazyLock::new(|| {
    Property::builder("Visual", "HorizontalAlignment", Alignment::Stretch)
        .invalidates(InvalidateMode::ARRANGE)
        .register()
});

pub static VERTICAL_ALIGNMENT: LazyLock<Property<Alignment>> = LazyLock::new(|| {
    Property::builder("Visual", "VerticalAlignment", Alignment::Stretch)
        .invalidates(InvalidateMode::ARRANGE)
        .register()
});

pub static IS_VISIBLE: LazyLock<Property<bool>> = LazyLock::new(|| {
    Property::builder("Visual", "IsVisible", true)
        .invalidates(SIZE_CHANGE)
        .register()
});

/// Disabling a node disables its whole subtree unless a descendant overrides it
pub static IS_ENABLED: LazyLock<Property<bool>> = LazyLock::new(|| {
    Property::builder("Visual", "IsEnabled", true)
        .invalidates(InvalidateMode::RENDER)
        .ambient()
        .register()
});

/// Diagnostic label
pub static NAME: LazyLock<Property<Arc<str>>> =
    LazyLock::new(|| Property::builder("Visual", "Name", Arc::<str>::from("")).register());

/// Primary axis of stack and wrap panels
pub static ORIENTATION: LazyLock<Property<Orientation>> = LazyLock::new(|| {
    Property::builder("Panel", "Orientation", Orientation::Horizontal)
        .invalidates(InvalidateMode::MEASURE)
        .register()
});

/// Effective size bounds after combining explicit, min and max lengths
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct MinMax {
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl MinMax {
    /// Clamp both axes into the bounds
    pub fn clamp(&self, size: Size) -> Size {
        Size::new(
            size.width.min(self.max_width).max(self.min_width),
            size.height.min(self.max_height).max(self.min_height),
        )
    }
}

fn axis_bounds(explicit: f32, min: f32, max: f32) -> (f32, f32) {
    let upper = if explicit.is_nan() { f32::INFINITY } else { explicit };
    let max = upper.min(max).max(min);
    let lower = if explicit.is_nan() { 0.0 } else { explicit };
    let min = max.min(lower).max(min);
    (min, max)
}

/// Framework properties read once per measure/arrange of a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LayoutProps {
    pub width: f32,
    pub height: f32,
    pub min_width: f32,
    pub min_height: f32,
    pub max_width: f32,
    pub max_height: f32,
    pub margin: Thickness,
    pub horizontal_alignment: Alignment,
    pub vertical_alignment: Alignment,
    pub visible: bool,
}

impl LayoutProps {
    pub fn read(tree: &VisualTree, node: NodeId) -> Result<Self> {
        Ok(Self {
            width: tree.get(node, &WIDTH)?,
            height: tree.get(node, &HEIGHT)?,
            min_width: tree.get(node, &MIN_WIDTH)?,
            min_height: tree.get(node, &MIN_HEIGHT)?,
            max_width: tree.get(node, &MAX_WIDTH)?,
            max_height: tree.get(node, &MAX_HEIGHT)?,
            margin: tree.get(node, &MARGIN)?,
            horizontal_alignment: tree.get(node, &HORIZONTAL_ALIGNMENT)?,
            vertical_alignment: tree.get(node, &VERTICAL_ALIGNMENT)?,
            visible: tree.get(node, &IS_VISIBLE)?,
        })
    }

    pub fn min_max(&self) -> MinMax {
        let (min_width, max_width) = axis_bounds(self.width, self.min_width, self.max_width);
        let (min_height, max_height) = axis_bounds(self.height, self.min_height, self.max_height);
        MinMax {
            min_width,
            max_width,
            min_height,
            max_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_bounds() {
        assert_eq!(axis_bounds(f32::NAN, 0.0, f32::INFINITY), (0.0, f32::INFINITY));
        assert_eq!(axis_bounds(50.0, 0.0, f32::INFINITY), (50.0, 50.0));
        // min wins over explicit and max
        assert_eq!(axis_bounds(50.0, 80.0, 60.0), (80.0, 80.0));
        assert_eq!(axis_bounds(f32::NAN, 10.0, 40.0), (10.0, 40.0));
        assert_eq!(axis_bounds(100.0, 10.0, 40.0), (40.0, 40.0));
    }

    #[test]
    fn test_length_validators() {
        assert!(auto_or_length(f32::NAN).is_ok());
        assert!(auto_or_length(-1.0).is_err());
        assert!(auto_or_length(f32::INFINITY).is_err());
        assert!(min_length(f32::INFINITY).is_err());
        assert!(max_length(f32::INFINITY).is_ok());
        assert!(max_length(f32::NAN).is_err());
    }

    #[test]
    fn test_framework_properties_register_once() {
        assert_eq!(WIDTH.descriptor().full_name(), "Visual.Width");
        assert!(IS_ENABLED.descriptor().is_ambient());
        assert!(WIDTH.default_value().is_nan());
        assert!(WIDTH
            .descriptor()
            .invalidates()
            .contains(InvalidateMode::PARENT_MEASURE));
    }
}
