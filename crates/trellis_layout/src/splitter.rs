//! Grid splitter
//!
//! A splitter is a child of a [`Grid`] that resizes the two tracks on either
//! side of it. Dragging moves space from one neighbour to the other; the step
//! is applied to both or to neither (see [`redistribute_pair`]). While a drag
//! runs, every other star track is pinned to its last computed size so the
//! rest of the grid does not reflow.
//!
//! Escape cancels a drag and restores every track length exactly. Arrow keys
//! nudge the splitter by `EngineConfig::splitter_keyboard_step`.

use trellis_core::drag::{DragController, DragOutcome, DragTarget, DragUpdate};
use trellis_core::error::{Result, TrellisError};
use trellis_core::events::{KeyEvent, PointerEvent, PointerEventKind};
use trellis_core::geometry::{Rect, Size, Vec2};
use trellis_core::invalidation::InvalidateMode;
use trellis_core::types::{Alignment, GridLength, Orientation};
use trellis_core::NodeId;

use crate::element::{ArrangeContext, Element, MeasureContext};
use crate::panels::grid::{redistribute_pair, Grid, COLUMN, ROW};
use crate::properties::{HORIZONTAL_ALIGNMENT, IS_ENABLED, VERTICAL_ALIGNMENT};
use crate::tree::VisualTree;

/// Which tracks a splitter resizes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GridResizeDirection {
    /// Columns when horizontally aligned, rows when vertically aligned,
    /// otherwise by the longer side of the splitter
    #[default]
    Auto,
    Columns,
    Rows,
}

/// Which pair of tracks around the splitter's own track are resized
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GridResizeBehavior {
    /// `Near` resizes previous and current, `Far` current and next,
    /// otherwise previous and next
    #[default]
    BasedOnAlignment,
    CurrentAndNext,
    PreviousAndCurrent,
    PreviousAndNext,
}

/// Tracks a splitter moves space between
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizePair {
    pub grid: NodeId,
    /// `Horizontal` resizes columns
    pub axis: Orientation,
    pub first: usize,
    pub second: usize,
}

/// Track state taken when a drag begins
#[derive(Clone, Debug, PartialEq)]
pub struct SplitterSnapshot {
    pair: ResizePair,
    lengths: Vec<GridLength>,
    sizes: (f32, f32),
    first_bounds: (f32, f32),
    second_bounds: (f32, f32),
}

#[derive(Debug, Default)]
pub struct GridSplitter {
    pub direction: GridResizeDirection,
    pub behavior: GridResizeBehavior,
    controller: DragController<SplitterSnapshot>,
}

fn not_a_splitter(node: NodeId) -> TrellisError {
    TrellisError::unsupported("GridSplitter", format!("node {node:?} does not hold a GridSplitter"))
}

impl GridSplitter {
    pub fn new(direction: GridResizeDirection, behavior: GridResizeBehavior) -> Self {
        Self {
            direction,
            behavior,
            controller: DragController::new(),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    fn axis(&self, tree: &VisualTree, node: NodeId) -> Result<Orientation> {
        Ok(match self.direction {
            GridResizeDirection::Columns => Orientation::Horizontal,
            GridResizeDirection::Rows => Orientation::Vertical,
            GridResizeDirection::Auto => {
                if tree.get(node, &HORIZONTAL_ALIGNMENT)? != Alignment::Stretch {
                    Orientation::Horizontal
                } else if tree.get(node, &VERTICAL_ALIGNMENT)? != Alignment::Stretch {
                    Orientation::Vertical
                } else {
                    let size = tree.arranged_rect(node).size;
                    if size.width <= size.height {
                        Orientation::Horizontal
                    } else {
                        Orientation::Vertical
                    }
                }
            }
        })
    }

    /// Tracks this splitter would resize, `None` when it has no valid pair
    pub fn resize_pair(&self, tree: &VisualTree, node: NodeId) -> Result<Option<ResizePair>> {
        let Some(grid) = tree.parent(node) else {
            return Ok(None);
        };
        let Some(element) = tree.element::<Grid>(grid) else {
            return Ok(None);
        };
        let axis = self.axis(tree, node)?;
        let (index, alignment) = match axis {
            Orientation::Horizontal => (tree.get(node, &COLUMN)?, tree.get(node, &HORIZONTAL_ALIGNMENT)?),
            Orientation::Vertical => (tree.get(node, &ROW)?, tree.get(node, &VERTICAL_ALIGNMENT)?),
        };
        let count = element.dimensions(axis).len();
        if count == 0 {
            return Ok(None);
        }
        let index = (index.max(0) as usize).min(count - 1);

        let (first, second) = match (self.behavior, alignment) {
            (GridResizeBehavior::CurrentAndNext, _)
            | (GridResizeBehavior::BasedOnAlignment, Alignment::Far) => (Some(index), Some(index + 1)),
            (GridResizeBehavior::PreviousAndCurrent, _)
            | (GridResizeBehavior::BasedOnAlignment, Alignment::Near) => (index.checked_sub(1), Some(index)),
            (GridResizeBehavior::PreviousAndNext, _)
            | (GridResizeBehavior::BasedOnAlignment, Alignment::Center | Alignment::Stretch) => {
                (index.checked_sub(1), Some(index + 1))
            }
        };
        Ok(match (first, second) {
            (Some(first), Some(second)) if second < count => Some(ResizePair {
                grid,
                axis,
                first,
                second,
            }),
            _ => None,
        })
    }

    /// Route a pointer event to the splitter at `node`
    pub fn on_pointer(tree: &mut VisualTree, node: NodeId, event: &PointerEvent) -> Result<DragOutcome> {
        tree.check_thread()?;
        let splitter = tree.element::<GridSplitter>(node).ok_or_else(|| not_a_splitter(node))?;
        let mut pair = None;
        let starting = event.kind == PointerEventKind::Down && !splitter.is_dragging();
        if starting {
            if !tree.get(node, &IS_ENABLED)? {
                return Ok(DragOutcome::Ignored);
            }
            pair = splitter.resize_pair(tree, node)?;
            if pair.is_none() {
                return Ok(DragOutcome::Ignored);
            }
        }

        let threshold = tree.config().drag_threshold;
        let mut controller = match tree.element_mut::<GridSplitter>(node) {
            Some(splitter) => std::mem::take(&mut splitter.controller),
            None => return Err(not_a_splitter(node)),
        };
        if starting {
            controller = DragController::new().with_threshold(threshold);
        }
        let outcome = controller.handle_pointer(
            &mut SplitterTarget {
                tree: &mut *tree,
                splitter: node,
                pair,
            },
            event,
        );
        if let Some(splitter) = tree.element_mut::<GridSplitter>(node) {
            splitter.controller = controller;
        }
        outcome
    }

    /// Escape cancels an active drag; arrow keys along the resize axis nudge
    pub fn on_key(tree: &mut VisualTree, node: NodeId, event: &KeyEvent) -> Result<DragOutcome> {
        tree.check_thread()?;
        let splitter = tree.element::<GridSplitter>(node).ok_or_else(|| not_a_splitter(node))?;
        if splitter.is_dragging() {
            let mut controller = match tree.element_mut::<GridSplitter>(node) {
                Some(splitter) => std::mem::take(&mut splitter.controller),
                None => return Err(not_a_splitter(node)),
            };
            let outcome = controller.handle_key(
                &mut SplitterTarget {
                    tree: &mut *tree,
                    splitter: node,
                    pair: None,
                },
                event,
            );
            if let Some(splitter) = tree.element_mut::<GridSplitter>(node) {
                splitter.controller = controller;
            }
            return outcome;
        }

        let Some((horizontal, sign)) = event.key.arrow_step() else {
            return Ok(DragOutcome::Ignored);
        };
        if !tree.get(node, &IS_ENABLED)? {
            return Ok(DragOutcome::Ignored);
        }
        let Some(pair) = splitter.resize_pair(tree, node)? else {
            return Ok(DragOutcome::Ignored);
        };
        if horizontal != (pair.axis == Orientation::Horizontal) {
            return Ok(DragOutcome::Ignored);
        }

        let step = tree.config().splitter_keyboard_step * sign;
        let delta = if horizontal {
            Vec2::new(step, 0.0)
        } else {
            Vec2::new(0.0, step)
        };
        let mut target = SplitterTarget {
            tree,
            splitter: node,
            pair: Some(pair),
        };
        let snapshot = target.begin_drag()?;
        let update = target.update_drag(&snapshot, delta)?;
        if update == DragUpdate::Rejected {
            target.restore(&snapshot)?;
        }
        Ok(DragOutcome::Updated { delta, update })
    }
}

impl Element for GridSplitter {
    fn measure_core(&mut self, ctx: &mut MeasureContext<'_>, _available: Size) -> Result<Size> {
        let thickness = ctx.config().splitter_thickness;
        Ok(Size::new(thickness, thickness))
    }

    fn arrange_core(&mut self, _ctx: &mut ArrangeContext<'_>, _bounds: Rect) -> Result<()> {
        Ok(())
    }
}

/// Drag target over the parent grid's track lengths
struct SplitterTarget<'a> {
    tree: &'a mut VisualTree,
    splitter: NodeId,
    pair: Option<ResizePair>,
}

impl SplitterTarget<'_> {
    fn grid(&self, grid: NodeId) -> Result<&Grid> {
        self.tree
            .element::<Grid>(grid)
            .ok_or_else(|| TrellisError::unsupported("GridSplitter", "splitter parent is not a Grid"))
    }
}

impl DragTarget for SplitterTarget<'_> {
    type Snapshot = SplitterSnapshot;

    fn capture_pointer(&mut self) -> Result<()> {
        self.tree.capture_pointer(self.splitter)
    }

    fn release_pointer(&mut self) {
        self.tree.release_pointer_capture(self.splitter);
    }

    fn begin_drag(&mut self) -> Result<SplitterSnapshot> {
        let pair = self
            .pair
            .ok_or_else(|| TrellisError::unsupported("GridSplitter", "no tracks to resize"))?;
        let tracks = self.grid(pair.grid)?.dimensions(pair.axis).as_slice();
        let (first, second) = (tracks[pair.first], tracks[pair.second]);
        let snapshot = SplitterSnapshot {
            pair,
            lengths: tracks.iter().map(|t| t.length).collect(),
            sizes: (first.actual, second.actual),
            first_bounds: (first.min, first.upper()),
            second_bounds: (second.min, second.upper()),
        };

        self.tree
            .update_element::<Grid, _, _>(pair.grid, InvalidateMode::MEASURE, |grid| {
                for track in grid.dimensions_mut(pair.axis).as_mut_slice() {
                    track.length = match track.length {
                        GridLength::Star(_) => GridLength::Star(track.actual),
                        GridLength::Auto => GridLength::Pixel(track.actual),
                        pixel => pixel,
                    };
                }
            })?;
        Ok(snapshot)
    }

    fn update_drag(&mut self, snapshot: &SplitterSnapshot, delta: Vec2) -> Result<DragUpdate> {
        let pair = snapshot.pair;
        let (a0, b0) = snapshot.sizes;
        let Some((a, b)) = redistribute_pair(
            a0,
            b0,
            delta.along(pair.axis),
            snapshot.first_bounds,
            snapshot.second_bounds,
        ) else {
            tracing::trace!(grid = ?pair.grid, first = pair.first, "splitter step rejected at track bounds");
            return Ok(DragUpdate::Rejected);
        };
        let resized = |original: GridLength, size: f32| match original {
            GridLength::Star(_) => GridLength::Star(size),
            GridLength::Auto | GridLength::Pixel(_) => GridLength::Pixel(size),
        };
        let first = resized(snapshot.lengths[pair.first], a);
        let second = resized(snapshot.lengths[pair.second], b);
        self.tree
            .update_element::<Grid, _, _>(pair.grid, InvalidateMode::MEASURE, |grid| {
                let tracks = grid.dimensions_mut(pair.axis).as_mut_slice();
                tracks[pair.first].length = first;
                tracks[pair.second].length = second;
            })?;
        Ok(DragUpdate::Applied)
    }

    fn restore(&mut self, snapshot: &SplitterSnapshot) -> Result<()> {
        let pair = snapshot.pair;
        self.tree
            .update_element::<Grid, _, _>(pair.grid, InvalidateMode::MEASURE, |grid| {
                let tracks = grid.dimensions_mut(pair.axis).as_mut_slice();
                for (track, length) in tracks.iter_mut().zip(&snapshot.lengths) {
                    track.length = *length;
                }
            })
    }
}
