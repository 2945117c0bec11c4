//! Interactive drag state machine
//!
//! ```text
//! Idle ──press──▶ Dragging ──release──▶ Committed
//!                    │
//!                    └──cancel / Escape──▶ Cancelled
//! ```
//!
//! A [`DragController`] sequences one gesture at a time over a [`DragTarget`].
//! Entering `Dragging` captures the pointer and takes the target's snapshot.
//! Every move hands the target the delta from the press point together with
//! that snapshot, so updates never accumulate state of their own and can be
//! replayed. Cancelling restores the snapshot and releases capture.
//!
//! `Committed` and `Cancelled` are terminal for the gesture; the next press
//! starts a new one.

use thiserror::Error;

use crate::error::Result;
use crate::events::{KeyCode, KeyEvent, PointerButton, PointerEvent, PointerEventKind};
use crate::geometry::{Point, Vec2};

/// Misuse of the drag protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    #[error("a drag gesture is already in progress")]
    AlreadyDragging,

    #[error("pointer is captured by another node")]
    PointerCaptured,
}

/// Phase of the current (or last) gesture
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    Committed,
    Cancelled,
}

/// Data held for the lifetime of one gesture
#[derive(Clone, Debug, PartialEq)]
pub struct DragState<S> {
    pub button: PointerButton,
    pub start: Point,
    pub current: Point,
    /// Target state captured on press, used for rollback
    pub snapshot: S,
}

impl<S> DragState<S> {
    /// Accumulated movement since the press
    pub fn delta(&self) -> Vec2 {
        self.current.delta_from(self.start)
    }
}

/// Result of applying one delta to a target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DragUpdate {
    Applied,
    /// The step would break a constraint; the target is unchanged
    Rejected,
}

/// What a controller call did
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragOutcome {
    Ignored,
    Started,
    Updated { delta: Vec2, update: DragUpdate },
    Committed { delta: Vec2 },
    Cancelled,
}

/// Something a drag gesture manipulates
pub trait DragTarget {
    /// State needed to roll back the gesture
    type Snapshot;

    /// Take exclusive pointer capture
    fn capture_pointer(&mut self) -> Result<()>;

    fn release_pointer(&mut self);

    /// Capture the rollback snapshot
    fn begin_drag(&mut self) -> Result<Self::Snapshot>;

    /// Apply `delta` relative to the state in `snapshot`
    fn update_drag(&mut self, snapshot: &Self::Snapshot, delta: Vec2) -> Result<DragUpdate>;

    /// Restore every value held in `snapshot`
    fn restore(&mut self, snapshot: &Self::Snapshot) -> Result<()>;

    fn commit_drag(&mut self, _snapshot: &Self::Snapshot) -> Result<()> {
        Ok(())
    }
}

/// Exclusive pointer capture slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerCapture<K> {
    owner: Option<K>,
}

impl<K: Copy + Eq> PointerCapture<K> {
    pub fn new() -> Self {
        Self { owner: None }
    }

    /// Capture for `key`. Re-capturing by the current owner is allowed.
    pub fn capture(&mut self, key: K) -> Result<()> {
        match self.owner {
            Some(owner) if owner != key => Err(DragError::PointerCaptured.into()),
            _ => {
                self.owner = Some(key);
                Ok(())
            }
        }
    }

    /// Release if held by `key`; returns whether anything was released
    pub fn release(&mut self, key: K) -> bool {
        if self.owner == Some(key) {
            self.owner = None;
            true
        } else {
            false
        }
    }

    pub fn owner(&self) -> Option<K> {
        self.owner
    }

    pub fn is_captured_by(&self, key: K) -> bool {
        self.owner == Some(key)
    }
}

/// Sequences press/move/release/cancel for one target type
#[derive(Debug)]
pub struct DragController<S> {
    phase: DragPhase,
    state: Option<DragState<S>>,
    threshold: f32,
    passed_threshold: bool,
}

impl<S> Default for DragController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> DragController<S> {
    pub fn new() -> Self {
        Self {
            phase: DragPhase::Idle,
            state: None,
            threshold: 0.0,
            passed_threshold: true,
        }
    }

    /// Ignore moves until the pointer has travelled `threshold` from the press
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.max(0.0);
        self
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == DragPhase::Dragging
    }

    pub fn state(&self) -> Option<&DragState<S>> {
        self.state.as_ref()
    }

    /// Begin a gesture at `event.position`
    pub fn press<T>(&mut self, target: &mut T, event: &PointerEvent) -> Result<DragOutcome>
    where
        T: DragTarget<Snapshot = S>,
    {
        if self.is_dragging() {
            return Err(DragError::AlreadyDragging.into());
        }
        target.capture_pointer()?;
        let snapshot = match target.begin_drag() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                target.release_pointer();
                return Err(err);
            }
        };
        self.state = Some(DragState {
            button: event.button,
            start: event.position,
            current: event.position,
            snapshot,
        });
        self.phase = DragPhase::Dragging;
        self.passed_threshold = self.threshold <= 0.0;
        tracing::trace!(x = event.position.x, y = event.position.y, "drag started");
        Ok(DragOutcome::Started)
    }

    /// Apply the delta from the press point to `position`
    pub fn pointer_move<T>(&mut self, target: &mut T, position: Point) -> Result<DragOutcome>
    where
        T: DragTarget<Snapshot = S>,
    {
        if !self.is_dragging() {
            return Ok(DragOutcome::Ignored);
        }
        let Some(state) = self.state.as_mut() else {
            return Ok(DragOutcome::Ignored);
        };
        state.current = position;
        let delta = state.delta();
        if !self.passed_threshold {
            if delta.length() < self.threshold {
                return Ok(DragOutcome::Ignored);
            }
            self.passed_threshold = true;
        }
        let update = target.update_drag(&state.snapshot, delta)?;
        if update == DragUpdate::Rejected {
            tracing::debug!(dx = delta.x, dy = delta.y, "drag step rejected");
        }
        Ok(DragOutcome::Updated { delta, update })
    }

    /// Finish the gesture at `position`, keeping the final state
    pub fn release<T>(&mut self, target: &mut T, position: Point) -> Result<DragOutcome>
    where
        T: DragTarget<Snapshot = S>,
    {
        if !self.is_dragging() {
            return Ok(DragOutcome::Ignored);
        }
        if self.state.as_ref().is_some_and(|s| s.current != position) {
            self.pointer_move(target, position)?;
        }
        let Some(state) = self.state.take() else {
            return Ok(DragOutcome::Ignored);
        };
        let delta = state.delta();
        let committed = target.commit_drag(&state.snapshot);
        target.release_pointer();
        self.phase = DragPhase::Committed;
        committed?;
        tracing::trace!(dx = delta.x, dy = delta.y, "drag committed");
        Ok(DragOutcome::Committed { delta })
    }

    /// Roll the target back to its snapshot and release capture
    pub fn cancel<T>(&mut self, target: &mut T) -> Result<DragOutcome>
    where
        T: DragTarget<Snapshot = S>,
    {
        if !self.is_dragging() {
            return Ok(DragOutcome::Ignored);
        }
        let Some(state) = self.state.take() else {
            return Ok(DragOutcome::Ignored);
        };
        let restored = target.restore(&state.snapshot);
        target.release_pointer();
        self.phase = DragPhase::Cancelled;
        restored?;
        tracing::trace!("drag cancelled");
        Ok(DragOutcome::Cancelled)
    }

    /// Escape cancels an active gesture
    pub fn handle_key<T>(&mut self, target: &mut T, event: &KeyEvent) -> Result<DragOutcome>
    where
        T: DragTarget<Snapshot = S>,
    {
        if event.key == KeyCode::Escape && self.is_dragging() {
            self.cancel(target)
        } else {
            Ok(DragOutcome::Ignored)
        }
    }

    /// Route a decoded pointer event
    pub fn handle_pointer<T>(&mut self, target: &mut T, event: &PointerEvent) -> Result<DragOutcome>
    where
        T: DragTarget<Snapshot = S>,
    {
        match event.kind {
            PointerEventKind::Down => self.press(target, event),
            PointerEventKind::Move => self.pointer_move(target, event.position),
            PointerEventKind::Up => {
                let same_button = self.state.as_ref().is_some_and(|s| s.button == event.button);
                if same_button {
                    self.release(target, event.position)
                } else {
                    Ok(DragOutcome::Ignored)
                }
            }
        }
    }
}
