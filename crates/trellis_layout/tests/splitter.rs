//! Splitter drags through a live grid
//!
//! 1. Every applied step keeps the resized pair summing to its starting
//!    total, each inside its bounds; a rejected step changes nothing.
//! 2. Cancel restores every track length bit-for-bit.

mod common;

use common::init_tracing;
use proptest::prelude::*;
use trellis_core::events::{KeyCode, KeyEvent, PointerEvent};
use trellis_core::geometry::{Point, Size};
use trellis_core::types::GridLength;
use trellis_core::NodeId;
use trellis_layout::panels::grid::{redistribute_pair, COLUMN};
use trellis_layout::{
    Grid, GridDimension, GridResizeBehavior, GridResizeDirection, GridSplitter, VisualTree,
};

const TOLERANCE: f32 = 1e-3;
const VIEWPORT: Size = Size {
    width: 410.0,
    height: 60.0,
};

fn bounds() -> impl Strategy<Value = (f32, f32)> {
    (0.0f32..150.0, 0.0f32..300.0).prop_map(|(min, extra)| (min, min + extra))
}

/// Star columns `a | splitter | b | rest` with the given bounds on `a` and `b`
fn split_grid(a: (f32, f32), b: (f32, f32)) -> (VisualTree, NodeId, NodeId) {
    let mut tree = VisualTree::new();
    let grid = Grid::new().with_columns([
        GridDimension::star(1.0).with_bounds(a.0, a.1),
        GridDimension::pixel(10.0),
        GridDimension::star(2.0).with_bounds(b.0, b.1),
        GridDimension::star(1.0),
    ])
    .unwrap();
    let panel = tree.create(grid).unwrap();
    tree.set_root(panel).unwrap();
    let splitter = tree
        .create(GridSplitter::new(
            GridResizeDirection::Columns,
            GridResizeBehavior::PreviousAndNext,
        ))
        .unwrap();
    tree.add_child(panel, splitter).unwrap();
    tree.set(splitter, &COLUMN, 1).unwrap();
    tree.update_layout(VIEWPORT).unwrap();
    (tree, panel, splitter)
}

fn lengths(tree: &VisualTree, grid: NodeId) -> Vec<GridLength> {
    tree.element::<Grid>(grid)
        .unwrap()
        .columns
        .iter()
        .map(|c| c.length)
        .collect()
}

fn length_bits(lengths: &[GridLength]) -> Vec<(u8, u32)> {
    lengths
        .iter()
        .map(|l| match *l {
            GridLength::Auto => (0, 0),
            GridLength::Pixel(v) => (1, v.to_bits()),
            GridLength::Star(v) => (2, v.to_bits()),
        })
        .collect()
}

fn actuals(tree: &VisualTree, grid: NodeId) -> (f32, f32) {
    let columns = &tree.element::<Grid>(grid).unwrap().columns;
    (columns.as_slice()[0].actual, columns.as_slice()[2].actual)
}

proptest! {
    #[test]
    fn test_redistribute_is_all_or_nothing(
        a0 in 0.0f32..300.0,
        b0 in 0.0f32..300.0,
        delta in -400.0f32..400.0,
        a in bounds(),
        b in bounds(),
    ) {
        match redistribute_pair(a0, b0, delta, a, b) {
            Some((na, nb)) => {
                prop_assert!((na + nb - (a0 + b0)).abs() <= TOLERANCE);
                prop_assert!(na >= a.0 - TOLERANCE && na <= a.1 + TOLERANCE);
                prop_assert!(nb >= b.0 - TOLERANCE && nb <= b.1 + TOLERANCE);
            }
            None => {
                // no split of the total fits both ranges
                let total = a0 + b0;
                let lowest = a.0.max(total - b.1);
                let highest = a.1.min(total - b.0);
                prop_assert!(lowest > highest - TOLERANCE);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_splitter_steps_keep_pair_total(
        a in bounds(),
        b in bounds(),
        moves in prop::collection::vec(-250.0f32..250.0, 1..12),
    ) {
        let (mut tree, grid, splitter) = split_grid(a, b);
        let start = actuals(&tree, grid);
        let total = start.0 + start.1;

        GridSplitter::on_pointer(&mut tree, splitter, &PointerEvent::down(Point::ZERO)).unwrap();
        let mut previous = lengths(&tree, grid);
        for dx in moves {
            GridSplitter::on_pointer(&mut tree, splitter, &PointerEvent::moved(Point::new(dx, 0.0))).unwrap();
            let current = lengths(&tree, grid);
            match (current[0], current[2]) {
                (GridLength::Star(na), GridLength::Star(nb)) if current != previous => {
                    prop_assert!((na + nb - total).abs() <= TOLERANCE);
                    prop_assert!(na >= a.0 - TOLERANCE && na <= a.1 + TOLERANCE);
                    prop_assert!(nb >= b.0 - TOLERANCE && nb <= b.1 + TOLERANCE);
                }
                _ => prop_assert_eq!(&current, &previous),
            }
            previous = current;
        }
    }

    #[test]
    fn test_cancel_restores_every_track(
        a in bounds(),
        b in bounds(),
        moves in prop::collection::vec(-250.0f32..250.0, 0..12),
    ) {
        let (mut tree, grid, splitter) = split_grid(a, b);
        let original = length_bits(&lengths(&tree, grid));

        GridSplitter::on_pointer(&mut tree, splitter, &PointerEvent::down(Point::new(3.0, 3.0))).unwrap();
        for dx in moves {
            GridSplitter::on_pointer(&mut tree, splitter, &PointerEvent::moved(Point::new(3.0 + dx, 3.0))).unwrap();
            tree.update_layout(VIEWPORT).unwrap();
        }
        GridSplitter::on_key(&mut tree, splitter, &KeyEvent::new(KeyCode::Escape)).unwrap();

        prop_assert_eq!(length_bits(&lengths(&tree, grid)), original);
        prop_assert_eq!(tree.pointer_capture(), None);
    }
}

#[test]
fn test_other_star_tracks_hold_during_drag() {
    init_tracing();
    let (mut tree, grid, splitter) = split_grid((0.0, f32::INFINITY), (0.0, f32::INFINITY));
    let before = tree.element::<Grid>(grid).unwrap().columns.as_slice()[3].actual;

    GridSplitter::on_pointer(&mut tree, splitter, &PointerEvent::down(Point::ZERO)).unwrap();
    GridSplitter::on_pointer(&mut tree, splitter, &PointerEvent::moved(Point::new(-40.0, 0.0))).unwrap();
    tree.update_layout(VIEWPORT).unwrap();

    let columns = tree.element::<Grid>(grid).unwrap().columns.clone();
    assert_eq!(columns.as_slice()[3].actual, before);
    assert_eq!(columns.as_slice()[0].actual, 60.0);
    assert_eq!(columns.as_slice()[2].actual, 240.0);
    GridSplitter::on_pointer(&mut tree, splitter, &PointerEvent::up(Point::new(-40.0, 0.0))).unwrap();
    assert_eq!(tree.pointer_capture(), None);
}
