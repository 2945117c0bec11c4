//! Input and notification events
//!
//! Pointer and key events are fed into drag controllers by the host. Property
//! and collection notifications are raised by the tree after a committed
//! mutation.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::geometry::Point;
use crate::property::PropertyId;
use crate::value::PropertyValue;
use crate::NodeId;

/// Keys the engine reacts to; anything else is carried as `Other`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Left,
    Up,
    Right,
    Down,
    /// Platform virtual key code
    Other(u32),
}

impl KeyCode {
    /// Signed step along an axis for arrow keys, `None` for anything else
    pub fn arrow_step(self) -> Option<(bool, f32)> {
        match self {
            KeyCode::Left => Some((true, -1.0)),
            KeyCode::Right => Some((true, 1.0)),
            KeyCode::Up => Some((false, -1.0)),
            KeyCode::Down => Some((false, 1.0)),
            KeyCode::Escape | KeyCode::Other(_) => None,
        }
    }
}

bitflags! {
    /// Modifier keys held during an input event
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

/// Pointer button identifier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
}

/// Pointer input in root coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn down(position: Point) -> Self {
        Self {
            kind: PointerEventKind::Down,
            position,
            button: PointerButton::Primary,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn moved(position: Point) -> Self {
        Self {
            kind: PointerEventKind::Move,
            ..Self::down(position)
        }
    }

    pub fn up(position: Point) -> Self {
        Self {
            kind: PointerEventKind::Up,
            ..Self::down(position)
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Key press
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: Modifiers,
    /// Whether this is a repeat event
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: Modifiers::empty(),
            repeat: false,
        }
    }
}

/// Notification of a committed property change
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChanged {
    pub node: NodeId,
    pub property: PropertyId,
    pub owner: &'static str,
    pub name: &'static str,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

/// Kind of child-collection mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionAction {
    Add,
    Insert,
    Remove,
    Replace,
    Clear,
    Sort,
}

/// Notification of a committed child-collection mutation
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionChanged {
    pub parent: NodeId,
    pub action: CollectionAction,
    /// Affected position, if the action has one
    pub index: Option<usize>,
    /// Nodes that entered or left the collection
    pub items: SmallVec<[NodeId; 1]>,
}

impl CollectionChanged {
    pub fn new(parent: NodeId, action: CollectionAction) -> Self {
        Self {
            parent,
            action,
            index: None,
            items: SmallVec::new(),
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_item(mut self, item: NodeId) -> Self {
        self.items.push(item);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_step() {
        assert_eq!(KeyCode::Left.arrow_step(), Some((true, -1.0)));
        assert_eq!(KeyCode::Down.arrow_step(), Some((false, 1.0)));
        assert_eq!(KeyCode::Escape.arrow_step(), None);
        assert_eq!(KeyCode::Other(0x41).arrow_step(), None);
    }

    #[test]
    fn test_pointer_constructors() {
        let e = PointerEvent::up(Point::new(3.0, 4.0)).with_button(PointerButton::Secondary);
        assert_eq!(e.kind, PointerEventKind::Up);
        assert_eq!(e.button, PointerButton::Secondary);
        assert!(e.modifiers.is_empty());

        let e = PointerEvent::down(Point::ZERO).with_modifiers(Modifiers::SHIFT | Modifiers::CTRL);
        assert!(e.modifiers.contains(Modifiers::SHIFT));
        assert!(!e.modifiers.contains(Modifiers::ALT));
    }
}
