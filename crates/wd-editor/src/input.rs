//! Input abstraction layer.
//!
//! Host toolkits translate their pointer and key events into `InputEvent`
//! values in *screen* coordinates; the canvas maps them into canvas space.

use wd_core::geometry::Point;

/// Which pointer button is involved in a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    /// Middle button pans the view.
    Middle,
    Secondary,
}

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed.
    PointerDown {
        x: f32,
        y: f32,
        button: PointerButton,
        modifiers: Modifiers,
    },

    /// Pointer moved, with or without a button held.
    PointerMove { x: f32, y: f32 },

    /// Pointer released.
    PointerUp { x: f32, y: f32 },

    /// Wheel or pinch zoom. `zoom > 1.0` zooms in.
    Scroll { zoom: f32 },
}

impl InputEvent {
    /// Primary-button press without modifiers.
    pub fn press(x: f32, y: f32) -> Self {
        InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    /// Screen position carried by pointer events.
    pub fn position(&self) -> Option<Point> {
        match *self {
            InputEvent::PointerDown { x, y, .. }
            | InputEvent::PointerMove { x, y }
            | InputEvent::PointerUp { x, y } => Some(Point::new(x, y)),
            InputEvent::Scroll { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_defaults_to_primary() {
        let e = InputEvent::press(3.0, 4.0);
        assert_eq!(e.position(), Some(Point::new(3.0, 4.0)));
        assert!(matches!(
            e,
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
                ..
            }
        ));
        assert_eq!(InputEvent::Scroll { zoom: 1.2 }.position(), None);
    }
}
