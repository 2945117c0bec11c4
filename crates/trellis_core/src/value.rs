//! Tagged property values
//!
//! Per-instance property overrides are stored as a closed tagged variant so a
//! bag can hold values of any registered type. Typed access goes through
//! [`PropertyType`].

use std::sync::Arc;

use crate::geometry::{Size, Thickness};
use crate::types::{Alignment, DockSide, GridLength, Orientation};

/// Kind tag of a [`PropertyValue`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Size,
    Thickness,
    Alignment,
    Orientation,
    Dock,
    GridLength,
    Text,
}

/// A dynamically typed property value
#[derive(Clone, Debug)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Size(Size),
    Thickness(Thickness),
    Alignment(Alignment),
    Orientation(Orientation),
    Dock(DockSide),
    GridLength(GridLength),
    Text(Arc<str>),
}

/// Float equality where NaN equals NaN and 0.0 equals -0.0
fn same_f32(a: f32, b: f32) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

fn same_grid_length(a: &GridLength, b: &GridLength) -> bool {
    match (a, b) {
        (GridLength::Auto, GridLength::Auto) => true,
        (GridLength::Pixel(x), GridLength::Pixel(y)) | (GridLength::Star(x), GridLength::Star(y)) => {
            same_f32(*x, *y)
        }
        _ => false,
    }
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Float(_) => ValueKind::Float,
            PropertyValue::Size(_) => ValueKind::Size,
            PropertyValue::Thickness(_) => ValueKind::Thickness,
            PropertyValue::Alignment(_) => ValueKind::Alignment,
            PropertyValue::Orientation(_) => ValueKind::Orientation,
            PropertyValue::Dock(_) => ValueKind::Dock,
            PropertyValue::GridLength(_) => ValueKind::GridLength,
            PropertyValue::Text(_) => ValueKind::Text,
        }
    }

    /// Structural equality used by the store's no-op check.
    ///
    /// Floats compare by value with NaN equal to itself, so re-assigning an
    /// "auto" (NaN) length is a no-op. Text compares by content.
    pub fn same_as(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
            (PropertyValue::Float(a), PropertyValue::Float(b)) => same_f32(*a, *b),
            (PropertyValue::Size(a), PropertyValue::Size(b)) => {
                same_f32(a.width, b.width) && same_f32(a.height, b.height)
            }
            (PropertyValue::Thickness(a), PropertyValue::Thickness(b)) => {
                same_f32(a.left, b.left)
                    && same_f32(a.top, b.top)
                    && same_f32(a.right, b.right)
                    && same_f32(a.bottom, b.bottom)
            }
            (PropertyValue::Alignment(a), PropertyValue::Alignment(b)) => a == b,
            (PropertyValue::Orientation(a), PropertyValue::Orientation(b)) => a == b,
            (PropertyValue::Dock(a), PropertyValue::Dock(b)) => a == b,
            (PropertyValue::GridLength(a), PropertyValue::GridLength(b)) => same_grid_length(a, b),
            (PropertyValue::Text(a), PropertyValue::Text(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

/// Rust types that can be stored in a property bag
pub trait PropertyType: Clone + Send + Sync + Sized + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> PropertyValue;

    fn from_value(value: &PropertyValue) -> Option<Self>;
}

macro_rules! impl_property_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyType for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }

            fn from_value(value: &PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for PropertyValue {
            fn from(value: $ty) -> Self {
                PropertyValue::$variant(value)
            }
        }
    };
}

impl_property_type!(bool, Bool);
impl_property_type!(i32, Int);
impl_property_type!(f32, Float);
impl_property_type!(Size, Size);
impl_property_type!(Thickness, Thickness);
impl_property_type!(Alignment, Alignment);
impl_property_type!(Orientation, Orientation);
impl_property_type!(DockSide, Dock);
impl_property_type!(GridLength, GridLength);
impl_property_type!(Arc<str>, Text);
