//! Events a surface delivers to its listeners.

use serde::{Deserialize, Serialize};

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed / finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released / finger up.
    Up,
    /// Pointer left the surface.
    Leave,
    /// The host cancelled the pointer (e.g., palm rejection).
    Cancel,
}

/// A single pointer event in surface CSS pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// Host pointer identifier.
    pub pointer_id: i32,
    /// X offset from the surface's left edge, in CSS pixels.
    pub x: f64,
    /// Y offset from the surface's top edge, in CSS pixels.
    pub y: f64,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub fn new(phase: PointerPhase, pointer_id: i32, x: f64, y: f64) -> Self {
        Self {
            phase,
            pointer_id,
            x,
            y,
        }
    }

    /// Pointer-down at `(x, y)` for the primary pointer.
    #[must_use]
    pub fn down(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Down, 1, x, y)
    }

    /// Pointer-move to `(x, y)` for the primary pointer.
    #[must_use]
    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Move, 1, x, y)
    }

    /// Pointer-up at `(x, y)` for the primary pointer.
    #[must_use]
    pub fn up(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Up, 1, x, y)
    }
}

/// All events a surface can deliver to a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SurfaceEvent {
    /// Pointer input.
    Pointer(PointerEvent),
    /// The surface's CSS size or pixel ratio changed.
    Resize,
}

impl SurfaceEvent {
    /// The listener category this event is delivered to.
    #[must_use]
    pub fn kind(&self) -> ListenerKind {
        match self {
            Self::Pointer(_) => ListenerKind::Pointer,
            Self::Resize => ListenerKind::Resize,
        }
    }
}

/// Category a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerKind {
    /// Pointer down/move/up/leave/cancel.
    Pointer,
    /// Surface resize notifications.
    Resize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_routing() {
        let pointer = SurfaceEvent::Pointer(PointerEvent::down(1.0, 2.0));
        assert_eq!(pointer.kind(), ListenerKind::Pointer);
        assert_eq!(SurfaceEvent::Resize.kind(), ListenerKind::Resize);
    }

    #[test]
    fn test_pointer_event_json_shape() {
        let event = SurfaceEvent::Pointer(PointerEvent::moved(10.0, 20.0));
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "Pointer");
        assert_eq!(json["data"]["phase"], "move");
        assert_eq!(json["data"]["x"], 10.0);
    }
}
