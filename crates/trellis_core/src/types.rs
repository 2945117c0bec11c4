//! Closed layout enumerations shared by properties and panel algorithms

use std::fmt;

/// Placement of a child inside the space offered along one axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Anchor to the start of the offered space
    Near,
    Center,
    /// Anchor to the end of the offered space
    Far,
    /// Use all offered space
    #[default]
    Stretch,
}

impl Alignment {
    /// Resolve `(offset, extent)` for a child that wants `desired` out of `available`.
    ///
    /// The extent never exceeds `available`.
    pub fn resolve(self, available: f32, desired: f32) -> (f32, f32) {
        let available = available.max(0.0);
        let extent = desired.max(0.0).min(available);
        match self {
            Alignment::Stretch => (0.0, available),
            Alignment::Near => (0.0, extent),
            Alignment::Center => ((available - extent) / 2.0, extent),
            Alignment::Far => (available - extent, extent),
        }
    }
}

/// Primary axis of a panel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Edge of the remaining space a docked child claims
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DockSide {
    #[default]
    Left,
    Top,
    Right,
    Bottom,
}

impl DockSide {
    pub const ALL: [DockSide; 4] = [DockSide::Left, DockSide::Top, DockSide::Right, DockSide::Bottom];

    /// Axis along which the claimed strip consumes space
    pub fn orientation(self) -> Orientation {
        match self {
            DockSide::Left | DockSide::Right => Orientation::Horizontal,
            DockSide::Top | DockSide::Bottom => Orientation::Vertical,
        }
    }
}

/// Sizing rule of a grid row or column
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GridLength {
    /// Fit the content of the track
    Auto,
    /// Fixed size in layout units
    Pixel(f32),
    /// Weighted share of the leftover space
    Star(f32),
}

impl Default for GridLength {
    fn default() -> Self {
        GridLength::Star(1.0)
    }
}

impl GridLength {
    pub fn is_star(&self) -> bool {
        matches!(self, GridLength::Star(_))
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, GridLength::Auto)
    }

    /// Numeric payload, zero for `Auto`
    pub fn value(&self) -> f32 {
        match self {
            GridLength::Auto => 0.0,
            GridLength::Pixel(v) | GridLength::Star(v) => *v,
        }
    }

    /// Non-negative finite payloads only
    pub fn is_valid(&self) -> bool {
        match self {
            GridLength::Auto => true,
            GridLength::Pixel(v) | GridLength::Star(v) => v.is_finite() && *v >= 0.0,
        }
    }
}

impl fmt::Display for GridLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridLength::Auto => write!(f, "Auto"),
            GridLength::Pixel(v) => write!(f, "{v}"),
            GridLength::Star(v) if *v == 1.0 => write!(f, "*"),
            GridLength::Star(v) => write!(f, "{v}*"),
        }
    }
}
