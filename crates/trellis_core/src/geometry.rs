//! Core geometry types
//!
//! Layout works in logical units with `f32` precision. An unconstrained axis is
//! expressed as `f32::INFINITY`; constraints arriving as `NaN` are normalised to
//! infinity before they reach a layout algorithm.

use crate::types::Orientation;

/// Tolerance used when comparing accumulated layout extents
pub const LAYOUT_EPSILON: f32 = 1e-4;

/// Origin used for nodes arranged into a degenerate rectangle
pub const OFFSCREEN_ORIGIN: Point = Point {
    x: -32000.0,
    y: -32000.0,
};

/// `a > b` beyond floating point noise
pub fn approx_gt(a: f32, b: f32) -> bool {
    a - b > LAYOUT_EPSILON
}

/// `a == b` within floating point noise
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= LAYOUT_EPSILON
}

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector from `origin` to this point
    pub fn delta_from(&self, origin: Point) -> Vec2 {
        Vec2::new(self.x - origin.x, self.y - origin.y)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// 2D vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Component along the given orientation
    pub fn along(&self, orientation: Orientation) -> f32 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }


    /// Build a size from main/cross extents of an orientation
    pub fn from_axes(orientation: Orientation, main: f32, cross: f32) -> Self {
        match orientation {
            Orientation::Horizontal => Size::new(main, cross),
            Orientation::Vertical => Size::new(cross, main),
        }
    }

    /// Extent along the orientation
    pub fn along(&self, orientation: Orientation) -> f32 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }

    /// Extent across the orientation
    pub fn across(&self, orientation: Orientation) -> f32 {
        match orientation {
            Orientation::Horizontal => self.height,
            Orientation::Vertical => self.width,
        }
    }

    /// Map NaN axes to "unconstrained"
    pub fn normalize_constraint(self) -> Self {
        let fix = |v: f32| if v.is_nan() { f32::INFINITY } else { v.max(0.0) };
        Size::new(fix(self.width), fix(self.height))
    }

    /// Force both axes to be finite and non-negative
    pub fn sanitized(self) -> Self {
        let fix = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Size::new(fix(self.width), fix(self.height))
    }

    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }

    /// Either axis is zero, negative or NaN
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Shrink by a thickness, never below zero
    pub fn deflate(&self, thickness: Thickness) -> Self {
        Size::new(
            (self.width - thickness.horizontal()).max(0.0),
            (self.height - thickness.vertical()).max(0.0),
        )
    }

    pub fn inflate(&self, thickness: Thickness) -> Self {
        Size::new(
            self.width + thickness.horizontal(),
            self.height + thickness.vertical(),
        )
    }

    pub fn min(&self, other: Size) -> Self {
        Size::new(self.width.min(other.width), self.height.min(other.height))
    }

    pub fn max(&self, other: Size) -> Self {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }
}

impl From<Size> for Rect {
    fn from(size: Size) -> Self {
        size.to_rect()
    }
}

/// Edge thickness (margins, padding)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Thickness {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Thickness {
    pub const ZERO: Thickness = Thickness {
        left: 0.0,
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
    };

    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Rect positioned by main/cross offsets of an orientation
    pub fn from_axes(
        orientation: Orientation,
        main_offset: f32,
        cross_offset: f32,
        main: f32,
        cross: f32,
    ) -> Self {
        match orientation {
            Orientation::Horizontal => Rect::new(main_offset, cross_offset, main, cross),
            Orientation::Vertical => Rect::new(cross_offset, main_offset, cross, main),
        }
    }

    /// Zero-sized rect parked outside any visible surface
    pub const fn offscreen() -> Self {
        Rect {
            origin: OFFSCREEN_ORIGIN,
            size: Size::ZERO,
        }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.right()
            && point.y >= self.origin.y
            && point.y <= self.bottom()
    }

    pub fn is_degenerate(&self) -> bool {
        self.size.is_degenerate()
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Rect {
            origin: self.origin.offset(dx, dy),
            size: self.size,
        }
    }

    /// Shrink by a thickness on each side
    pub fn deflate(&self, thickness: Thickness) -> Self {
        Rect {
            origin: self.origin.offset(thickness.left, thickness.top),
            size: self.size.deflate(thickness),
        }
    }

    /// Length of the overlap between the vertical spans of two rects
    pub fn vertical_overlap(&self, other: &Rect) -> f32 {
        (self.bottom().min(other.bottom()) - self.y().max(other.y())).max(0.0)
    }

    /// Length of the overlap between the horizontal spans of two rects
    pub fn horizontal_overlap(&self, other: &Rect) -> f32 {
        (self.right().min(other.right()) - self.x().max(other.x())).max(0.0)
    }

    /// Snap edges to whole units
    pub fn round(&self) -> Self {
        let x = self.origin.x.round();
        let y = self.origin.y.round();
        Rect::new(
            x,
            y,
            (self.right().round() - x).max(0.0),
            (self.bottom().round() - y).max(0.0),
        )
    }
}
