//! Composition hooks, render order and structural rejection

mod common;

use std::sync::{Arc, Mutex};

use common::{init_tracing, HookLog, CountingElement, RecordingSurface};
use trellis_core::error::{TreeViolation, TrellisError};
use trellis_core::geometry::{Rect, Size};
use trellis_core::NodeId;
use trellis_layout::properties::IS_VISIBLE;
use trellis_layout::{Overlay, Spacer, VisualTree};

fn drain(log: &HookLog) -> Vec<(&'static str, NodeId)> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[test]
fn test_hooks_fire_on_attach_and_detach() {
    init_tracing();
    let log: HookLog = Arc::new(Mutex::new(Vec::new()));
    let mut tree = VisualTree::new();
    let root = tree.create(CountingElement::default().with_hooks(&log)).unwrap();
    let child = tree.create(CountingElement::default().with_hooks(&log)).unwrap();
    tree.set_root(root).unwrap();
    tree.add_child(root, child).unwrap();
    assert!(drain(&log).is_empty());

    tree.attach_composition().unwrap();
    assert_eq!(drain(&log), vec![("attached", root), ("attached", child)]);
    assert!(tree.is_live(child));

    // a subtree joining a live tree is attached as a whole
    let branch = tree.create(CountingElement::default().with_hooks(&log)).unwrap();
    let leaf = tree.create(CountingElement::default().with_hooks(&log)).unwrap();
    tree.add_child(branch, leaf).unwrap();
    assert!(drain(&log).is_empty());
    tree.add_child(child, branch).unwrap();
    assert_eq!(drain(&log), vec![("attached", branch), ("attached", leaf)]);

    tree.remove_child(child, branch).unwrap();
    assert_eq!(drain(&log), vec![("detaching", branch), ("detaching", leaf)]);
    assert!(!tree.is_live(leaf));

    tree.detach_composition().unwrap();
    assert_eq!(drain(&log), vec![("detaching", root), ("detaching", child)]);
    assert!(!tree.is_composition_live());
}

#[test]
fn test_render_visits_pre_order_with_root_bounds() {
    let mut tree = VisualTree::new();
    let root = tree.create(CountingElement::default()).unwrap();
    tree.set_root(root).unwrap();
    let a = tree.create(CountingElement::new(10.0, 10.0)).unwrap();
    let a1 = tree.create(CountingElement::new(5.0, 5.0)).unwrap();
    let b = tree.create(CountingElement::new(10.0, 10.0)).unwrap();
    let hidden = tree.create(CountingElement::new(10.0, 10.0)).unwrap();
    tree.add_child(root, a).unwrap();
    tree.add_child(a, a1).unwrap();
    tree.add_child(root, b).unwrap();
    tree.add_child(root, hidden).unwrap();
    tree.set(hidden, &IS_VISIBLE, false).unwrap();

    let mut surface = RecordingSurface::default();
    // nothing is drawn before the composition is live
    assert_eq!(tree.render(&mut surface).unwrap(), 0);

    tree.update_layout(Size::new(50.0, 40.0)).unwrap();
    tree.attach_composition().unwrap();
    assert_eq!(tree.render(&mut surface).unwrap(), 4);
    assert_eq!(surface.order, vec![root, a, a1, b]);
    assert_eq!(tree.bounds_in_root(a1), Rect::new(0.0, 0.0, 50.0, 40.0));
}

#[test]
fn test_render_runs_pending_layout() {
    let mut tree = VisualTree::new();
    let root = tree.create(Overlay).unwrap();
    tree.set_root(root).unwrap();
    tree.attach_composition().unwrap();
    tree.update_layout(Size::new(30.0, 30.0)).unwrap();

    let child = tree.create(Spacer::new(10.0, 10.0)).unwrap();
    tree.add_child(root, child).unwrap();
    assert!(tree.dirty_flags(child).needs_measure());

    tree.render(&mut RecordingSurface::default()).unwrap();
    assert!(tree.dirty_flags(child).is_empty());
    assert_eq!(tree.arranged_rect(child), Rect::new(0.0, 0.0, 30.0, 30.0));
}

#[test]
fn test_attaching_a_parented_node_leaves_both_parents_unchanged() {
    let mut tree = VisualTree::new();
    let first = tree.create(Overlay).unwrap();
    let second = tree.create(Overlay).unwrap();
    let shared = tree.create(Spacer::default()).unwrap();
    let sibling = tree.create(Spacer::default()).unwrap();
    tree.add_child(first, shared).unwrap();
    tree.add_child(second, sibling).unwrap();

    let err = tree.insert_child(second, 0, shared).unwrap_err();
    assert_eq!(
        err,
        TrellisError::TreeIntegrityViolation(TreeViolation::AlreadyParented {
            child: shared,
            parent: first,
        })
    );
    assert_eq!(tree.children(first), &[shared]);
    assert_eq!(tree.children(second), &[sibling]);
    assert_eq!(tree.parent(shared), Some(first));
}
