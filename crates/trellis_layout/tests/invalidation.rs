//! Invalidation coalescing and parent escalation through a live tree

mod common;

use common::{init_tracing, Calls, CountingElement, RecordingSurface};
use proptest::prelude::*;
use trellis_core::geometry::Size;
use trellis_core::invalidation::{InvalidateMode, InvalidateReason, LayoutState, ReasonKind};
use trellis_core::types::DockSide;
use trellis_core::NodeId;
use trellis_layout::panels::dock::DOCK;
use trellis_layout::properties::WIDTH;
use trellis_layout::{DockPanel, Overlay, VisualTree};

const VIEWPORT: Size = Size {
    width: 200.0,
    height: 100.0,
};

/// Live tree `Overlay -> CountingElement`, laid out and rendered once
fn settled_leaf() -> (VisualTree, NodeId, NodeId, Calls) {
    init_tracing();
    let mut tree = VisualTree::new();
    let root = tree.create(Overlay).unwrap();
    tree.set_root(root).unwrap();
    let counting = CountingElement::new(10.0, 10.0);
    let calls = counting.calls.clone();
    let leaf = tree.create(counting).unwrap();
    tree.add_child(root, leaf).unwrap();
    tree.attach_composition().unwrap();
    tree.update_layout(VIEWPORT).unwrap();
    tree.render(&mut RecordingSurface::default()).unwrap();
    calls.reset();
    (tree, root, leaf, calls)
}

#[test]
fn test_repeated_invalidation_runs_one_cycle() {
    let (mut tree, root, leaf, calls) = settled_leaf();
    assert_eq!(tree.layout_state(leaf), LayoutState::Rendered);

    tree.invalidate(leaf, InvalidateMode::RENDER, InvalidateReason::explicit("paint"))
        .unwrap();
    tree.invalidate(leaf, InvalidateMode::MEASURE, InvalidateReason::explicit("size"))
        .unwrap();
    tree.invalidate(leaf, InvalidateMode::MEASURE, InvalidateReason::explicit("size again"))
        .unwrap();
    tree.invalidate(leaf, InvalidateMode::ARRANGE, InvalidateReason::explicit("move"))
        .unwrap();
    assert_eq!(tree.layout_state(leaf), LayoutState::Unmeasured);

    let stats = tree.update_layout(VIEWPORT).unwrap();
    assert_eq!(stats.measured, 1);
    assert_eq!(stats.arranged, 1);
    assert_eq!(calls.counts(), (1, 1, 0));
    assert_eq!(tree.layout_state(leaf), LayoutState::Arranged);
    // the desired size did not change, so the parent stays clean
    assert_eq!(tree.layout_state(root), LayoutState::Rendered);

    let rendered = tree.render(&mut RecordingSurface::default()).unwrap();
    assert_eq!(rendered, 1);
    assert_eq!(calls.counts(), (1, 1, 1));

    assert_eq!(tree.update_layout(VIEWPORT).unwrap().measured, 0);
    assert_eq!(tree.render(&mut RecordingSurface::default()).unwrap(), 0);
}

#[test]
fn test_render_only_invalidation_skips_layout() {
    let (mut tree, _root, leaf, calls) = settled_leaf();
    tree.invalidate(leaf, InvalidateMode::RENDER, InvalidateReason::explicit("paint"))
        .unwrap();
    tree.invalidate(leaf, InvalidateMode::RENDER, InvalidateReason::explicit("paint"))
        .unwrap();

    let stats = tree.update_layout(VIEWPORT).unwrap();
    assert_eq!((stats.measured, stats.arranged), (0, 0));
    assert_eq!(tree.render(&mut RecordingSurface::default()).unwrap(), 1);
    assert_eq!(calls.counts(), (0, 0, 1));
}

#[test]
fn test_size_change_bubbles_to_parent() {
    let (mut tree, root, leaf, calls) = settled_leaf();
    tree.set(leaf, &WIDTH, 40.0).unwrap();
    tree.update_layout(VIEWPORT).unwrap();

    assert_eq!(tree.desired_size(leaf), Size::new(40.0, 10.0));
    // shallowest first: the root measures the leaf, whose own entry is then clean
    assert_eq!(calls.counts().0, 1);
    let reason = tree.last_invalidation(root).unwrap();
    assert!(matches!(
        reason.root_cause().kind(),
        ReasonKind::PropertyChanged { name: "Width", .. }
    ));
}

fn dock_side() -> impl Strategy<Value = DockSide> {
    prop_oneof![
        Just(DockSide::Top),
        Just(DockSide::Right),
        Just(DockSide::Bottom),
    ]
}

proptest! {
    #[test]
    fn test_parent_measure_property_dirties_parent(prior in 0u8..4, side in dock_side()) {
        let mut tree = VisualTree::new();
        let panel = tree.create(DockPanel::new()).unwrap();
        tree.set_root(panel).unwrap();
        let child = tree.create(CountingElement::new(5.0, 5.0)).unwrap();
        tree.add_child(panel, child).unwrap();

        match prior {
            0 => {}
            1 => {
                tree.update_layout(VIEWPORT).unwrap();
            }
            2 => {
                tree.update_layout(VIEWPORT).unwrap();
                tree.invalidate(panel, InvalidateMode::ARRANGE, InvalidateReason::explicit("prior")).unwrap();
            }
            _ => {
                tree.update_layout(VIEWPORT).unwrap();
                tree.invalidate(child, InvalidateMode::RENDER, InvalidateReason::explicit("prior")).unwrap();
            }
        }

        prop_assert!(tree.set(child, &DOCK, side).unwrap());
        prop_assert!(tree.dirty_flags(panel).needs_measure());

        let reason = tree.last_invalidation(panel).unwrap();
        prop_assert_eq!(reason.kind(), &ReasonKind::ChildInvalidated(child));
        prop_assert!(matches!(
            reason.root_cause().kind(),
            ReasonKind::PropertyChanged { owner: "DockPanel", name: "Dock" }
        ), "root cause should be PropertyChanged(DockPanel.Dock)");
    }
}
