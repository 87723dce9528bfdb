//! Translation state shared between the drag tracker and a backend.

use std::{cell::Cell, rc::Rc};

use serde::{Deserialize, Serialize};

/// Bound applied to each translation component, in NDC units.
pub const TRANSLATION_LIMIT: f32 = 2.0;

/// 2D offset applied to the triangle, in normalized device coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Horizontal offset, positive to the right.
    pub x: f32,
    /// Vertical offset, positive upwards.
    pub y: f32,
}

impl Translation {
    /// Create a translation, clamping both components.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }.clamped()
    }

    /// Return a copy with both components clamped to
    /// `[-TRANSLATION_LIMIT, TRANSLATION_LIMIT]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-TRANSLATION_LIMIT, TRANSLATION_LIMIT),
            y: self.y.clamp(-TRANSLATION_LIMIT, TRANSLATION_LIMIT),
        }
    }

    /// Add an NDC delta, then clamp.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
        .clamped()
    }
}

/// Shared, single-threaded handle to one backend's translation.
///
/// The tracker writes through it on pointer input and the backend reads it on
/// every frame, so a write is visible to the very next render.
#[derive(Debug, Clone, Default)]
pub struct TranslationHandle(Rc<Cell<Translation>>);

impl TranslationHandle {
    /// Create a handle starting at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> Translation {
        self.0.get()
    }

    /// Replace the value (clamped).
    pub fn set(&self, translation: Translation) {
        self.0.set(translation.clamped());
    }

    /// Add an NDC delta (clamped) and return the new value.
    pub fn apply_delta(&self, dx: f32, dy: f32) -> Translation {
        let next = self.0.get().offset(dx, dy);
        self.0.set(next);
        next
    }

    /// Return to the origin.
    pub fn reset(&self) {
        self.0.set(Translation::default());
    }
}
