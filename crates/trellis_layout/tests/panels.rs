//! Panel placement properties

mod common;

use common::init_tracing;
use proptest::prelude::*;
use trellis_core::geometry::{Rect, Size};
use trellis_core::types::{DockSide, Orientation};
use trellis_layout::panels::dock::{self, DOCK};
use trellis_layout::panels::wrap::break_lines;
use trellis_layout::panels::grid::{COLUMN, COLUMN_SPAN, ROW};
use trellis_layout::properties::ORIENTATION;
use trellis_layout::{DockPanel, Grid, GridDimension, Spacer, VisualTree, WrapPanel};

const TOLERANCE: f32 = 1e-3;

fn dock_side() -> impl Strategy<Value = DockSide> {
    prop_oneof![
        Just(DockSide::Left),
        Just(DockSide::Top),
        Just(DockSide::Right),
        Just(DockSide::Bottom),
    ]
}

fn dock_items() -> impl Strategy<Value = Vec<(DockSide, Size)>> {
    prop::collection::vec(
        (dock_side(), 0.0f32..120.0, 0.0f32..120.0).prop_map(|(side, w, h)| (side, Size::new(w, h))),
        1..10,
    )
}

/// Strip extents claimed along each axis by the non-last children
fn claimed(items: &[(DockSide, Size)], slots: &[Rect]) -> (f32, f32) {
    let mut horizontal = 0.0;
    let mut vertical = 0.0;
    for ((side, _), slot) in items.iter().zip(slots).take(items.len() - 1) {
        match side {
            DockSide::Left | DockSide::Right => horizontal += slot.width(),
            DockSide::Top | DockSide::Bottom => vertical += slot.height(),
        }
    }
    (horizontal, vertical)
}

proptest! {
    #[test]
    fn test_dock_strips_and_fill_cover_panel(
        items in dock_items(),
        width in 0.0f32..400.0,
        height in 0.0f32..400.0,
    ) {
        let size = Size::new(width, height);
        let slots = dock::arrange(size, &items, true, false);
        prop_assert_eq!(slots.len(), items.len());

        let (horizontal, vertical) = claimed(&items, &slots);
        let last = slots[slots.len() - 1];
        prop_assert!((horizontal + last.width() - width).abs() <= TOLERANCE);
        prop_assert!((vertical + last.height() - height).abs() <= TOLERANCE);

        for slot in &slots {
            prop_assert!(slot.x() >= -TOLERANCE && slot.right() <= width + TOLERANCE);
            prop_assert!(slot.y() >= -TOLERANCE && slot.bottom() <= height + TOLERANCE);
        }
    }

    #[test]
    fn test_dock_panel_conserves_extent_in_tree(items in dock_items()) {
        let mut tree = VisualTree::new();
        let panel = tree.create(DockPanel::new()).unwrap();
        tree.set_root(panel).unwrap();
        for &(side, desired) in &items {
            let child = tree.create(Spacer { size: desired }).unwrap();
            tree.add_child(panel, child).unwrap();
            tree.set(child, &DOCK, side).unwrap();
        }
        tree.update_layout(Size::new(300.0, 200.0)).unwrap();

        let children = tree.children(panel).to_vec();
        let slots: Vec<Rect> = children.iter().map(|&c| tree.arranged_rect(c)).collect();
        let last = slots[slots.len() - 1];
        if !last.is_degenerate() {
            let (horizontal, vertical) = claimed(&items, &slots);
            prop_assert!((horizontal + last.width() - 300.0).abs() <= TOLERANCE);
            prop_assert!((vertical + last.height() - 200.0).abs() <= TOLERANCE);
        }
    }
}

#[test]
fn test_dock_neighbors_follow_latest_arrange() {
    init_tracing();
    let mut tree = VisualTree::new();
    let panel = tree.create(DockPanel::new()).unwrap();
    tree.set_root(panel).unwrap();
    let left = tree.create(Spacer::new(20.0, 0.0)).unwrap();
    let top = tree.create(Spacer::new(0.0, 10.0)).unwrap();
    let fill = tree.create(Spacer::default()).unwrap();
    for id in [left, top, fill] {
        tree.add_child(panel, id).unwrap();
    }
    tree.set(top, &DOCK, DockSide::Top).unwrap();
    tree.update_layout(Size::new(100.0, 100.0)).unwrap();

    let dock = tree.element::<DockPanel>(panel).unwrap();
    assert_eq!(dock.neighbor(fill, DockSide::Left), Some(left));
    assert_eq!(dock.neighbor(fill, DockSide::Top), Some(top));
    assert_eq!(dock.neighbor(top, DockSide::Left), Some(left));
    // the fill shares the longer edge with the left strip
    assert_eq!(dock.neighbor(left, DockSide::Right), Some(fill));
    assert_eq!(dock.neighbor(fill, DockSide::Right), None);

    tree.set(left, &DOCK, DockSide::Right).unwrap();
    tree.update_layout(Size::new(100.0, 100.0)).unwrap();
    let dock = tree.element::<DockPanel>(panel).unwrap();
    assert_eq!(dock.neighbor(fill, DockSide::Right), Some(left));
    assert_eq!(dock.neighbor(fill, DockSide::Left), None);
}

#[test]
fn test_wrap_breaks_fifteen_into_twelve() {
    assert_eq!(break_lines(&[5.0, 5.0, 5.0], 12.0), vec![0..2, 2..3]);

    let mut tree = VisualTree::new();
    let panel = tree.create(WrapPanel).unwrap();
    tree.set_root(panel).unwrap();
    tree.set(panel, &ORIENTATION, Orientation::Vertical).unwrap();
    let items: Vec<_> = (0..3)
        .map(|_| {
            let id = tree.create(Spacer::new(3.0, 5.0)).unwrap();
            tree.add_child(panel, id).unwrap();
            id
        })
        .collect();
    tree.update_layout(Size::new(50.0, 12.0)).unwrap();

    assert_eq!(tree.arranged_rect(items[0]), Rect::new(0.0, 0.0, 3.0, 5.0));
    assert_eq!(tree.arranged_rect(items[1]), Rect::new(0.0, 5.0, 3.0, 5.0));
    assert_eq!(tree.arranged_rect(items[2]), Rect::new(3.0, 0.0, 3.0, 5.0));
}

#[test]
fn test_grid_places_spanning_children() {
    let mut tree = VisualTree::new();
    let grid = Grid::new()
        .with_rows([GridDimension::pixel(20.0), GridDimension::star(1.0)])
        .unwrap()
        .with_columns([
            GridDimension::auto(),
            GridDimension::star(1.0),
            GridDimension::star(3.0),
        ])
        .unwrap();
    let panel = tree.create(grid).unwrap();
    tree.set_root(panel).unwrap();

    let label = tree.create(Spacer::new(30.0, 8.0)).unwrap();
    let banner = tree.create(Spacer::default()).unwrap();
    let body = tree.create(Spacer::default()).unwrap();
    for id in [label, banner, body] {
        tree.add_child(panel, id).unwrap();
    }
    tree.set(banner, &COLUMN, 1).unwrap();
    tree.set(banner, &COLUMN_SPAN, 2).unwrap();
    tree.set(body, &ROW, 1).unwrap();
    tree.set(body, &COLUMN, 2).unwrap();
    tree.update_layout(Size::new(190.0, 100.0)).unwrap();

    assert_eq!(tree.arranged_rect(label), Rect::new(0.0, 0.0, 30.0, 20.0));
    assert_eq!(tree.arranged_rect(banner), Rect::new(30.0, 0.0, 160.0, 20.0));
    assert_eq!(tree.arranged_rect(body), Rect::new(70.0, 20.0, 120.0, 80.0));
}
