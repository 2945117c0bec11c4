//! Grid panel
//!
//! Rows and columns are [`GridDimension`]s sized by a [`GridLength`]:
//!
//! - `Pixel(v)` is fixed
//! - `Auto` fits the largest single-span child in the track
//! - `Star(w)` takes a `w`-weighted share of whatever the other tracks leave
//!
//! Every size is clamped to the track's `[min, max]`. Star tracks that would
//! violate their bounds are frozen at the bound and the rest of the leftover
//! space is shared again among the others. With an unbounded axis star tracks
//! size like `Auto`.
//!
//! Children pick their cell with the attached `Grid.Row`, `Grid.Column`,
//! `Grid.RowSpan` and `Grid.ColumnSpan` properties. Indices past the last
//! track are clamped onto it.

use std::sync::LazyLock;

use trellis_core::geometry::{Rect, Size, LAYOUT_EPSILON};
use trellis_core::invalidation::InvalidateMode;
use trellis_core::property::Property;
use trellis_core::types::{GridLength, Orientation};
use trellis_core::{NodeId, Result, TrellisError};

use crate::element::{ArrangeContext, Element, MeasureContext};
use crate::tree::VisualTree;

fn grid_index(value: i32) -> std::result::Result<i32, String> {
    if value >= 0 {
        Ok(value)
    } else {
        Err(format!("grid index must not be negative, got {value}"))
    }
}

fn grid_span(value: i32) -> std::result::Result<i32, String> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(format!("grid span must be at least 1, got {value}"))
    }
}

pub static ROW: LazyLock<Property<i32>> = LazyLock::new(|| {
    Property::builder("Grid", "Row", 0)
        .invalidates(InvalidateMode::PARENT_MEASURE)
        .convert(grid_index)
        .register()
});

pub static COLUMN: LazyLock<Property<i32>> = LazyLock::new(|| {
    Property::builder("Grid", "Column", 0)
        .invalidates(InvalidateMode::PARENT_MEASURE)
        .convert(grid_index)
        .register()
});

pub static ROW_SPAN: LazyLock<Property<i32>> = LazyLock::new(|| {
    Property::builder("Grid", "RowSpan", 1)
        .invalidates(InvalidateMode::PARENT_MEASURE)
        .convert(grid_span)
        .register()
});

pub static COLUMN_SPAN: LazyLock<Property<i32>> = LazyLock::new(|| {
    Property::builder("Grid", "ColumnSpan", 1)
        .invalidates(InvalidateMode::PARENT_MEASURE)
        .convert(grid_span)
        .register()
});

/// One row or column
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridDimension {
    pub length: GridLength,
    pub min: f32,
    pub max: f32,
    /// Size from the latest arrange
    pub actual: f32,
    /// Start of the track from the latest arrange
    pub offset: f32,
}

impl Default for GridDimension {
    fn default() -> Self {
        Self::new(GridLength::default())
    }
}

impl GridDimension {
    pub fn new(length: GridLength) -> Self {
        Self {
            length,
            min: 0.0,
            max: f32::INFINITY,
            actual: 0.0,
            offset: 0.0,
        }
    }

    pub fn auto() -> Self {
        Self::new(GridLength::Auto)
    }

    pub fn pixel(size: f32) -> Self {
        Self::new(GridLength::Pixel(size))
    }

    pub fn star(weight: f32) -> Self {
        Self::new(GridLength::Star(weight))
    }

    pub fn with_bounds(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// `max`, raised to `min` when the two cross
    pub fn upper(&self) -> f32 {
        self.max.max(self.min)
    }

    pub fn clamp(&self, size: f32) -> f32 {
        size.min(self.upper()).max(self.min)
    }

    /// Finite non-negative length and `min`; `max` may be infinite
    pub fn validate(&self) -> Result<()> {
        let reason = if !self.length.is_valid() {
            format!("track length must be finite and non-negative, got {}", self.length)
        } else if !(self.min.is_finite() && self.min >= 0.0) {
            format!("track min must be finite and non-negative, got {}", self.min)
        } else if self.max.is_nan() || self.max < 0.0 {
            format!("track max must be non-negative, got {}", self.max)
        } else {
            return Ok(());
        };
        Err(TrellisError::InvalidPropertyValue {
            property: "Grid.TrackDefinition".into(),
            reason,
        })
    }

    /// Star weight that takes part in distribution; unusable weights count as zero
    fn star_weight(&self) -> f32 {
        match self.length {
            GridLength::Star(weight) if weight.is_finite() && weight > 0.0 => weight,
            _ => 0.0,
        }
    }
}

/// Ordered rows or columns of a grid
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridDimensions {
    tracks: Vec<GridDimension>,
}

impl GridDimensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks in order, rejecting the first invalid one
    pub fn from_tracks(tracks: impl IntoIterator<Item = GridDimension>) -> Result<Self> {
        let mut dimensions = Self::new();
        for track in tracks {
            dimensions.push(track)?;
        }
        Ok(dimensions)
    }

    pub fn push(&mut self, track: GridDimension) -> Result<&mut Self> {
        track.validate()?;
        self.tracks.push(track);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GridDimension> {
        self.tracks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut GridDimension> {
        self.tracks.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridDimension> {
        self.tracks.iter()
    }

    pub fn as_slice(&self) -> &[GridDimension] {
        &self.tracks
    }

    pub fn as_mut_slice(&mut self) -> &mut [GridDimension] {
        &mut self.tracks
    }

    pub fn previous(&self, index: usize) -> Option<usize> {
        index.checked_sub(1).filter(|&i| i < self.tracks.len())
    }

    pub fn next(&self, index: usize) -> Option<usize> {
        Some(index + 1).filter(|&i| i < self.tracks.len())
    }

    /// Tracks used for layout; an empty list behaves as a single star track
    fn effective(&self) -> Vec<GridDimension> {
        if self.tracks.is_empty() {
            vec![GridDimension::default()]
        } else {
            self.tracks.clone()
        }
    }
}

/// Resolve `actual` and `offset` of every track.
///
/// `content[i]` is the extent single-span children want in track `i`.
pub fn resolve_track_sizes(tracks: &mut [GridDimension], available: f32, content: &[f32]) {
    let fit = |i: usize| content.get(i).copied().unwrap_or(0.0);
    let mut used = 0.0;
    let mut stars = Vec::new();
    for (i, track) in tracks.iter_mut().enumerate() {
        match track.length {
            GridLength::Pixel(size) => track.actual = track.clamp(size),
            GridLength::Star(_) if available.is_finite() => {
                stars.push(i);
                continue;
            }
            GridLength::Auto | GridLength::Star(_) => track.actual = track.clamp(fit(i)),
        }
        used += track.actual;
    }
    let leftover = if available.is_finite() {
        (available - used).max(0.0)
    } else {
        0.0
    };
    distribute_stars(tracks, &stars, leftover);

    let mut offset = 0.0;
    for track in tracks.iter_mut() {
        track.offset = offset;
        offset += track.actual;
    }
}

/// Weighted share of `space` among the star tracks at `indices`, freezing
/// tracks at their bounds until every share fits.
///
/// Every round either finishes or freezes at least one track.
fn distribute_stars(tracks: &mut [GridDimension], indices: &[usize], space: f32) {
    let mut open = indices.to_vec();
    let mut space = if space.is_finite() { space.max(0.0) } else { 0.0 };
    while !open.is_empty() {
        let weight: f32 = open.iter().map(|&i| tracks[i].star_weight()).sum();
        let shares: Vec<f32> = open
            .iter()
            .map(|&i| {
                if weight > 0.0 && weight.is_finite() {
                    space * tracks[i].star_weight() / weight
                } else {
                    0.0
                }
            })
            .collect();
        let violation: f32 = open
            .iter()
            .zip(&shares)
            .map(|(&i, &share)| tracks[i].clamp(share) - share)
            .sum();

        if violation.is_nan() || violation.abs() <= LAYOUT_EPSILON {
            for (&i, &share) in open.iter().zip(&shares) {
                tracks[i].actual = tracks[i].clamp(share);
            }
            return;
        }
        // too much handed out freezes the tracks at their max, too little at their min
        let mut still_open = Vec::with_capacity(open.len());
        for (&i, &share) in open.iter().zip(&shares) {
            let clamped = tracks[i].clamp(share);
            let frozen = if violation > 0.0 {
                clamped > share
            } else {
                clamped < share
            };
            if frozen {
                tracks[i].actual = clamped;
                space = (space - clamped).max(0.0);
            } else {
                still_open.push(i);
            }
        }
        if still_open.len() == open.len() {
            for (&i, &share) in open.iter().zip(&shares) {
                tracks[i].actual = tracks[i].clamp(share);
            }
            return;
        }
        open = still_open;
    }
}

/// Move `delta` from the second of two adjacent tracks to the first.
///
/// Returns the new `(a, b)` with `a + b == a0 + b0` and both inside their
/// bounds, or `None` when no such pair exists near the request.
pub fn redistribute_pair(
    a0: f32,
    b0: f32,
    delta: f32,
    (min_a, max_a): (f32, f32),
    (min_b, max_b): (f32, f32),
) -> Option<(f32, f32)> {
    let total = a0 + b0;
    let max_a = max_a.max(min_a);
    let max_b = max_b.max(min_b);
    let mut a = (a0 + delta).min(max_a).max(min_a);
    let mut b = total - a;
    if b < min_b || b > max_b {
        b = b.min(max_b).max(min_b);
        a = total - b;
    }
    let fits = |v: f32, min: f32, max: f32| v >= min - LAYOUT_EPSILON && v <= max + LAYOUT_EPSILON;
    if fits(a, min_a, max_a) && fits(b, min_b, max_b) {
        Some((a, b))
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    node: NodeId,
    row: usize,
    row_span: usize,
    column: usize,
    column_span: usize,
}

impl Cell {
    fn span(&self, orientation: Orientation) -> (usize, usize) {
        match orientation {
            Orientation::Horizontal => (self.column, self.column_span),
            Orientation::Vertical => (self.row, self.row_span),
        }
    }
}

/// Offset and extent covered by `span` tracks starting at `start`
fn span_extent(tracks: &[GridDimension], (start, span): (usize, usize)) -> (f32, f32) {
    let covered = &tracks[start..start + span];
    let offset = covered.first().map_or(0.0, |t| t.offset);
    (offset, covered.iter().map(|t| t.actual).sum())
}

/// Largest desired extent of single-span children per track
fn track_content(
    tracks: usize,
    cells: &[Cell],
    desired: &[Size],
    orientation: Orientation,
) -> Vec<f32> {
    let mut content = vec![0.0f32; tracks];
    for (cell, size) in cells.iter().zip(desired) {
        let (start, span) = cell.span(orientation);
        if span == 1 {
            content[start] = content[start].max(size.along(orientation));
        }
    }
    content
}

/// Panel placing children into rows and columns
#[derive(Clone, Debug, Default)]
pub struct Grid {
    pub rows: GridDimensions,
    pub columns: GridDimensions,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = GridDimension>) -> Result<Self> {
        self.rows = GridDimensions::from_tracks(rows)?;
        Ok(self)
    }

    pub fn with_columns(mut self, columns: impl IntoIterator<Item = GridDimension>) -> Result<Self> {
        self.columns = GridDimensions::from_tracks(columns)?;
        Ok(self)
    }

    /// Rows for `Vertical`, columns for `Horizontal`
    pub fn dimensions(&self, orientation: Orientation) -> &GridDimensions {
        match orientation {
            Orientation::Horizontal => &self.columns,
            Orientation::Vertical => &self.rows,
        }
    }

    pub fn dimensions_mut(&mut self, orientation: Orientation) -> &mut GridDimensions {
        match orientation {
            Orientation::Horizontal => &mut self.columns,
            Orientation::Vertical => &mut self.rows,
        }
    }

    fn cells(&self, tree: &VisualTree, children: &[NodeId]) -> Result<Vec<Cell>> {
        let rows = self.rows.len().max(1);
        let columns = self.columns.len().max(1);
        let place = |index: i32, span: i32, count: usize| {
            let start = (index.max(0) as usize).min(count - 1);
            let span = (span.max(1) as usize).min(count - start);
            (start, span)
        };
        children
            .iter()
            .map(|&node| -> Result<Cell> {
                let (row, row_span) = place(tree.get(node, &ROW)?, tree.get(node, &ROW_SPAN)?, rows);
                let (column, column_span) = place(
                    tree.get(node, &COLUMN)?,
                    tree.get(node, &COLUMN_SPAN)?,
                    columns,
                );
                Ok(Cell {
                    node,
                    row,
                    row_span,
                    column,
                    column_span,
                })
            })
            .collect()
    }
}

/// First-pass constraint of a span: fixed tracks give their size, the rest are open
fn open_extent(tracks: &[GridDimension], (start, span): (usize, usize)) -> f32 {
    tracks[start..start + span]
        .iter()
        .map(|t| match t.length {
            GridLength::Pixel(size) => t.clamp(size),
            GridLength::Auto | GridLength::Star(_) => f32::INFINITY,
        })
        .sum()
}

impl Element for Grid {
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, available: Size) -> Result<Size> {
        let children = ctx.visible_children()?;
        let cells = self.cells(ctx.tree(), &children)?;
        let mut rows = self.rows.effective();
        let mut columns = self.columns.effective();

        let mut desired = Vec::with_capacity(cells.len());
        for cell in &cells {
            let constraint = Size::new(
                open_extent(&columns, cell.span(Orientation::Horizontal)),
                open_extent(&rows, cell.span(Orientation::Vertical)),
            );
            desired.push(ctx.measure_child(cell.node, constraint)?);
        }
        let column_content = track_content(columns.len(), &cells, &desired, Orientation::Horizontal);
        let row_content = track_content(rows.len(), &cells, &desired, Orientation::Vertical);

        // desired size is what the content needs; stars only grow into spare room
        let mut fit_columns = columns.clone();
        let mut fit_rows = rows.clone();
        resolve_track_sizes(&mut fit_columns, f32::INFINITY, &column_content);
        resolve_track_sizes(&mut fit_rows, f32::INFINITY, &row_content);

        resolve_track_sizes(&mut columns, available.width, &column_content);
        resolve_track_sizes(&mut rows, available.height, &row_content);
        for cell in &cells {
            let (_, width) = span_extent(&columns, cell.span(Orientation::Horizontal));
            let (_, height) = span_extent(&rows, cell.span(Orientation::Vertical));
            ctx.measure_child(cell.node, Size::new(width, height))?;
        }

        Ok(Size::new(
            fit_columns.iter().map(|t| t.actual).sum(),
            fit_rows.iter().map(|t| t.actual).sum(),
        ))
    }

    fn arrange_core(&mut self, ctx: &mut ArrangeContext<'_>, bounds: Rect) -> Result<()> {
        let children = ctx.visible_children()?;
        let cells = self.cells(ctx.tree(), &children)?;
        let desired: Vec<Size> = cells.iter().map(|c| ctx.desired_size(c.node)).collect();
        let mut rows = self.rows.effective();
        let mut columns = self.columns.effective();
        let column_content = track_content(columns.len(), &cells, &desired, Orientation::Horizontal);
        let row_content = track_content(rows.len(), &cells, &desired, Orientation::Vertical);
        resolve_track_sizes(&mut columns, bounds.width(), &column_content);
        resolve_track_sizes(&mut rows, bounds.height(), &row_content);

        for cell in &cells {
            let (x, width) = span_extent(&columns, cell.span(Orientation::Horizontal));
            let (y, height) = span_extent(&rows, cell.span(Orientation::Vertical));
            ctx.arrange_child(cell.node, Rect::new(bounds.x() + x, bounds.y() + y, width, height))?;
        }

        if !self.rows.is_empty() {
            self.rows.as_mut_slice().copy_from_slice(&rows);
        }
        if !self.columns.is_empty() {
            self.columns.as_mut_slice().copy_from_slice(&columns);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Spacer;

    fn actuals(tracks: &[GridDimension]) -> Vec<f32> {
        tracks.iter().map(|t| t.actual).collect()
    }

    #[test]
    fn test_mixed_track_sizes() {
        let mut tracks = [
            GridDimension::pixel(20.0),
            GridDimension::auto(),
            GridDimension::star(1.0),
            GridDimension::star(3.0),
        ];
        resolve_track_sizes(&mut tracks, 110.0, &[0.0, 10.0, 50.0, 0.0]);
        assert_eq!(actuals(&tracks), vec![20.0, 10.0, 20.0, 60.0]);
        assert_eq!(tracks[3].offset, 50.0);
    }

    #[test]
    fn test_star_bounds_redistribute() {
        let mut tracks = [
            GridDimension::star(1.0).with_bounds(0.0, 10.0),
            GridDimension::star(1.0),
            GridDimension::star(1.0).with_bounds(50.0, f32::INFINITY),
        ];
        resolve_track_sizes(&mut tracks, 90.0, &[]);
        assert_eq!(actuals(&tracks), vec![10.0, 30.0, 50.0]);
    }

    #[test]
    fn test_unbounded_star_sizes_to_content() {
        let mut tracks = [GridDimension::star(1.0), GridDimension::star(2.0)];
        resolve_track_sizes(&mut tracks, f32::INFINITY, &[7.0, 3.0]);
        assert_eq!(actuals(&tracks), vec![7.0, 3.0]);
    }

    #[test]
    fn test_pixel_clamped_and_overflow_leaves_stars_empty() {
        let mut tracks = [
            GridDimension::pixel(80.0).with_bounds(0.0, 60.0),
            GridDimension::pixel(60.0),
            GridDimension::star(1.0),
        ];
        resolve_track_sizes(&mut tracks, 100.0, &[]);
        assert_eq!(actuals(&tracks), vec![60.0, 60.0, 0.0]);
    }

    #[test]
    fn test_unusable_star_weights_share_nothing() {
        for weight in [f32::INFINITY, f32::NAN, -2.0] {
            let mut tracks = [GridDimension::star(weight), GridDimension::star(1.0)];
            resolve_track_sizes(&mut tracks, 100.0, &[]);
            assert_eq!(actuals(&tracks), vec![0.0, 100.0]);
        }

        let mut tracks = [GridDimension::star(f32::INFINITY), GridDimension::star(f32::NAN)];
        resolve_track_sizes(&mut tracks, 100.0, &[]);
        assert_eq!(actuals(&tracks), vec![0.0, 0.0]);
    }

    #[test]
    fn test_invalid_tracks_are_rejected() {
        for track in [
            GridDimension::star(f32::INFINITY),
            GridDimension::star(f32::NAN),
            GridDimension::star(-1.0),
            GridDimension::pixel(f32::INFINITY),
            GridDimension::pixel(-5.0),
            GridDimension::auto().with_bounds(f32::NAN, 10.0),
            GridDimension::auto().with_bounds(-1.0, 10.0),
            GridDimension::auto().with_bounds(0.0, -1.0),
        ] {
            let err = Grid::new().with_columns([GridDimension::star(1.0), track]).unwrap_err();
            assert!(matches!(err, TrellisError::InvalidPropertyValue { .. }), "{track:?}");
        }

        let mut rows = GridDimensions::new();
        assert!(rows.push(GridDimension::star(f32::INFINITY)).is_err());
        assert!(rows.is_empty());
        assert!(rows.push(GridDimension::auto().with_bounds(10.0, f32::INFINITY)).is_ok());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_redistribute_pair() {
        assert_eq!(redistribute_pair(50.0, 50.0, 10.0, (0.0, 100.0), (0.0, 100.0)), Some((60.0, 40.0)));
        // clamped on the first track
        assert_eq!(redistribute_pair(50.0, 50.0, 30.0, (0.0, 70.0), (0.0, 100.0)), Some((70.0, 30.0)));
        // clamped on the second track
        assert_eq!(redistribute_pair(50.0, 50.0, 30.0, (0.0, 100.0), (40.0, 100.0)), Some((60.0, 40.0)));
        // no pair fits both bounds
        assert_eq!(redistribute_pair(50.0, 50.0, 5.0, (0.0, 40.0), (0.0, 40.0)), None);
    }

    #[test]
    fn test_neighbors() {
        let dims = GridDimensions::from_tracks([GridDimension::auto(), GridDimension::star(1.0)]).unwrap();
        assert_eq!(dims.previous(0), None);
        assert_eq!(dims.previous(1), Some(0));
        assert_eq!(dims.next(0), Some(1));
        assert_eq!(dims.next(1), None);
    }

    #[test]
    fn test_grid_element() {
        let mut tree = VisualTree::new();
        let grid = Grid::new()
            .with_columns([GridDimension::auto(), GridDimension::star(1.0)])
            .unwrap()
            .with_rows([GridDimension::pixel(30.0), GridDimension::star(1.0)])
            .unwrap();
        let panel = tree.create(grid).unwrap();
        tree.set_root(panel).unwrap();

        let label = tree.create(Spacer::new(40.0, 10.0)).unwrap();
        let body = tree.create(Spacer::new(10.0, 10.0)).unwrap();
        let footer = tree.create(Spacer::new(10.0, 10.0)).unwrap();
        for id in [label, body, footer] {
            tree.add_child(panel, id).unwrap();
        }
        tree.set(body, &COLUMN, 1).unwrap();
        tree.set(footer, &ROW, 1).unwrap();
        tree.set(footer, &COLUMN_SPAN, 2).unwrap();
        tree.update_layout(Size::new(200.0, 100.0)).unwrap();

        assert_eq!(tree.desired_size(panel), Size::new(50.0, 40.0));
        assert_eq!(tree.arranged_rect(label), Rect::new(0.0, 0.0, 40.0, 30.0));
        assert_eq!(tree.arranged_rect(body), Rect::new(40.0, 0.0, 160.0, 30.0));
        assert_eq!(tree.arranged_rect(footer), Rect::new(0.0, 30.0, 200.0, 70.0));

        let grid = tree.element::<Grid>(panel).unwrap();
        assert_eq!(grid.columns.get(1).map(|c| c.actual), Some(160.0));
        assert_eq!(grid.rows.get(1).map(|r| r.offset), Some(30.0));
    }

    #[test]
    fn test_out_of_range_cell_is_clamped() {
        let mut tree = VisualTree::new();
        let panel = tree
            .create(Grid::new().with_columns([GridDimension::star(1.0), GridDimension::star(1.0)]).unwrap())
            .unwrap();
        tree.set_root(panel).unwrap();
        let child = tree.create(Spacer::default()).unwrap();
        tree.add_child(panel, child).unwrap();
        tree.set(child, &COLUMN, 9).unwrap();
        tree.update_layout(Size::new(100.0, 10.0)).unwrap();

        assert_eq!(tree.arranged_rect(child), Rect::new(50.0, 0.0, 50.0, 10.0));
        assert!(tree.set(child, &ROW_SPAN, 0).is_err());
    }
}
