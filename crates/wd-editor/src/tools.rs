//! Interaction modes and in-progress pointer gestures.
//!
//! | Mode      | Press on node           | Press on empty canvas |
//! |-----------|-------------------------|-----------------------|
//! | `Select`  | select, start drag      | clear, start marquee  |
//! | `Connect` | arm source / connect    | nothing               |
//! | `AddNode` | nothing                 | create `Node<n>`      |
//!
//! Ctrl toggles membership instead of replacing the selection. The middle
//! button pans in every mode.

use crate::commands::{ImageBox, ModuleMove};
use wd_core::geometry::{Point, Rect};
use wd_core::id::{ConnectionId, ImageId, InstanceId, NodeId};
use wd_core::model::ResizeHandle;

/// The active mode determines how pointer presses are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Select,
    Connect,
    AddNode,
}

/// A press-drag-release in progress. Drags are applied to the scene live
/// and committed as a single command on release.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    DragNode {
        id: NodeId,
        start: Point,
        /// Pointer position minus node position at press.
        grab: Point,
    },
    DragImage {
        id: ImageId,
        start: Point,
        grab: Point,
    },
    ResizeImage {
        id: ImageId,
        handle: ResizeHandle,
        start: ImageBox,
    },
    DragModule {
        instance: InstanceId,
        anchor: Point,
        /// Positions at press, as a zero-length move.
        base: ModuleMove,
        /// Move currently applied to the scene.
        current: Option<ModuleMove>,
    },
    DragWaypoint {
        connection: ConnectionId,
        index: usize,
        start: Point,
    },
    Marquee {
        start: Point,
        current: Point,
    },
    Pan {
        last: Point,
    },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    /// Rubber-band rectangle while a marquee is being dragged.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self {
            Gesture::Marquee { start, current } => Some(Rect::from_corners(*start, *current)),
            _ => None,
        }
    }
}

/// Smallest image edge a resize can produce.
pub const MIN_IMAGE_SIZE: f32 = 10.0;

/// New box for a resize drag. The opposite corner stays fixed.
pub fn resized_box(start: ImageBox, handle: ResizeHandle, pointer: Point) -> ImageBox {
    match handle {
        ResizeHandle::BottomRight => ImageBox {
            pos: start.pos,
            width: (pointer.x - start.pos.x).max(MIN_IMAGE_SIZE),
            height: (pointer.y - start.pos.y).max(MIN_IMAGE_SIZE),
        },
        ResizeHandle::TopLeft => {
            let right = start.pos.x + start.width;
            let bottom = start.pos.y + start.height;
            let x = pointer.x.min(right - MIN_IMAGE_SIZE);
            let y = pointer.y.min(bottom - MIN_IMAGE_SIZE);
            ImageBox {
                pos: Point::new(x, y),
                width: right - x,
                height: bottom - y,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_keeps_opposite_corner() {
        let start = ImageBox {
            pos: Point::new(10.0, 10.0),
            width: 100.0,
            height: 50.0,
        };
        let grown = resized_box(start, ResizeHandle::BottomRight, Point::new(150.0, 90.0));
        assert_eq!((grown.width, grown.height), (140.0, 80.0));

        let moved = resized_box(start, ResizeHandle::TopLeft, Point::new(0.0, 20.0));
        assert_eq!(moved.pos, Point::new(0.0, 20.0));
        assert_eq!((moved.width, moved.height), (110.0, 40.0));

        let clamped = resized_box(start, ResizeHandle::BottomRight, Point::new(0.0, 0.0));
        assert_eq!((clamped.width, clamped.height), (MIN_IMAGE_SIZE, MIN_IMAGE_SIZE));
    }

    #[test]
    fn marquee_rect_is_normalized() {
        let g = Gesture::Marquee {
            start: Point::new(50.0, 50.0),
            current: Point::new(10.0, 20.0),
        };
        assert_eq!(g.marquee_rect(), Some(Rect::new(10.0, 20.0, 40.0, 30.0)));
        assert!(Gesture::Idle.marquee_rect().is_none());
    }
}
