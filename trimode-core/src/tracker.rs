//! Pointer-drag tracking shared by every backend.
//!
//! One [`PointerDragTracker`] converts raw pointer events on a surface into
//! translation updates. Backends install it as their pointer listener instead
//! of handling pointer input themselves, so drag feel is identical everywhere.

use std::{cell::Cell, rc::Rc};

use crate::{PointerEvent, PointerPhase, SurfaceResult, Translation, TranslationHandle};

/// The part of a surface the tracker needs.
pub trait PointerTarget {
    /// CSS-visible width and height of the surface.
    fn css_size(&self) -> (f64, f64);

    /// Route all further events for `pointer_id` to this surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the capture.
    fn set_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()>;

    /// Undo [`PointerTarget::set_pointer_capture`].
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the release.
    fn release_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()>;
}

/// Drag state of one tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    /// Whether a drag is in progress.
    pub dragging: bool,
    /// Last seen X position in CSS pixels.
    pub last_x: f64,
    /// Last seen Y position in CSS pixels.
    pub last_y: f64,
    /// Pointer that owns the current drag.
    pub pointer_id: Option<i32>,
}

/// Idle/dragging state machine writing into a [`TranslationHandle`].
pub struct PointerDragTracker<T: PointerTarget + ?Sized> {
    target: Rc<T>,
    sink: TranslationHandle,
    state: Cell<PointerState>,
}

impl<T: PointerTarget + ?Sized> PointerDragTracker<T> {
    /// Create an idle tracker for `target` writing into `sink`.
    #[must_use]
    pub fn new(target: Rc<T>, sink: TranslationHandle) -> Self {
        Self {
            target,
            sink,
            state: Cell::new(PointerState::default()),
        }
    }

    /// Current drag state.
    #[must_use]
    pub fn state(&self) -> PointerState {
        self.state.get()
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.state.get().dragging
    }

    /// The translation this tracker writes.
    #[must_use]
    pub fn translation(&self) -> Translation {
        self.sink.get()
    }

    /// Feed one pointer event. Returns `true` if the event changed drag state
    /// or translation.
    pub fn handle(&self, event: &PointerEvent) -> bool {
        match event.phase {
            PointerPhase::Down => self.pointer_down(event),
            PointerPhase::Move => self.pointer_move(event),
            PointerPhase::Up | PointerPhase::Leave | PointerPhase::Cancel => {
                self.pointer_release(event)
            }
        }
    }

    fn pointer_down(&self, event: &PointerEvent) -> bool {
        let state = self.state.get();
        if state.dragging {
            return false;
        }

        let (width, height) = self.target.css_size();
        let inside = (0.0..=width).contains(&event.x) && (0.0..=height).contains(&event.y);
        if !inside {
            return false;
        }

        if let Err(e) = self.target.set_pointer_capture(event.pointer_id) {
            tracing::trace!("Ignoring pointer capture failure: {e}");
        }

        self.state.set(PointerState {
            dragging: true,
            last_x: event.x,
            last_y: event.y,
            pointer_id: Some(event.pointer_id),
        });
        true
    }

    #[allow(clippy::cast_possible_truncation)]
    fn pointer_move(&self, event: &PointerEvent) -> bool {
        let state = self.state.get();
        if !state.dragging || state.pointer_id != Some(event.pointer_id) {
            return false;
        }

        let dx = event.x - state.last_x;
        let dy = event.y - state.last_y;
        self.state.set(PointerState {
            last_x: event.x,
            last_y: event.y,
            ..state
        });

        let (width, height) = self.target.css_size();
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        let ndc_dx = if half_w > 0.0 { dx / half_w } else { 0.0 };
        // Screen Y grows downwards, NDC Y grows upwards.
        let ndc_dy = if half_h > 0.0 { -dy / half_h } else { 0.0 };

        let t = self.sink.apply_delta(ndc_dx as f32, ndc_dy as f32);
        tracing::trace!("Drag delta ({dx}, {dy}) px -> translation ({}, {})", t.x, t.y);
        true
    }

    fn pointer_release(&self, event: &PointerEvent) -> bool {
        let state = self.state.get();
        if !state.dragging || state.pointer_id != Some(event.pointer_id) {
            return false;
        }

        if let Err(e) = self.target.release_pointer_capture(event.pointer_id) {
            tracing::trace!("Ignoring pointer release failure: {e}");
        }

        self.state.set(PointerState {
            dragging: false,
            pointer_id: None,
            ..state
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::SurfaceError;

    struct FakeTarget {
        size: Cell<(f64, f64)>,
        refuse_capture: bool,
        captured: RefCell<Vec<i32>>,
    }

    impl FakeTarget {
        fn new(width: f64, height: f64) -> Rc<Self> {
            Rc::new(Self {
                size: Cell::new((width, height)),
                refuse_capture: false,
                captured: RefCell::new(Vec::new()),
            })
        }
    }

    impl PointerTarget for FakeTarget {
        fn css_size(&self) -> (f64, f64) {
            self.size.get()
        }

        fn set_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()> {
            if self.refuse_capture {
                return Err(SurfaceError::PointerCaptureFailed("refused".to_string()));
            }
            self.captured.borrow_mut().push(pointer_id);
            Ok(())
        }

        fn release_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()> {
            if self.refuse_capture {
                return Err(SurfaceError::PointerCaptureFailed("refused".to_string()));
            }
            self.captured.borrow_mut().retain(|id| *id != pointer_id);
            Ok(())
        }
    }

    fn drag(tracker: &PointerDragTracker<FakeTarget>, from: (f64, f64), to: (f64, f64)) {
        tracker.handle(&PointerEvent::down(from.0, from.1));
        tracker.handle(&PointerEvent::moved(to.0, to.1));
        tracker.handle(&PointerEvent::up(to.0, to.1));
    }

    #[test]
    fn test_drag_maps_to_ndc() {
        let target = FakeTarget::new(640.0, 400.0);
        let tracker = PointerDragTracker::new(target, TranslationHandle::new());

        drag(&tracker, (320.0, 200.0), (400.0, 250.0));

        assert_eq!(tracker.translation(), Translation { x: 0.25, y: -0.25 });
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn test_repeated_drags_saturate() {
        let target = FakeTarget::new(640.0, 400.0);
        let tracker = PointerDragTracker::new(target, TranslationHandle::new());

        // 160 px on a 640 px wide surface is +0.5 NDC.
        for _ in 0..10 {
            drag(&tracker, (100.0, 100.0), (260.0, 100.0));
            let t = tracker.translation();
            assert!(t.x <= 2.0 && t.x >= -2.0);
        }

        assert_eq!(tracker.translation().x, 2.0);
    }

    #[test]
    fn test_move_without_down_is_ignored() {
        let target = FakeTarget::new(100.0, 100.0);
        let tracker = PointerDragTracker::new(target, TranslationHandle::new());

        assert!(!tracker.handle(&PointerEvent::moved(80.0, 80.0)));
        assert_eq!(tracker.translation(), Translation::default());
    }

    #[test]
    fn test_down_outside_surface_is_ignored() {
        let target = FakeTarget::new(100.0, 100.0);
        let tracker = PointerDragTracker::new(target, TranslationHandle::new());

        assert!(!tracker.handle(&PointerEvent::down(150.0, 50.0)));
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn test_capture_lifecycle() {
        let target = FakeTarget::new(100.0, 100.0);
        let tracker = PointerDragTracker::new(Rc::clone(&target), TranslationHandle::new());

        tracker.handle(&PointerEvent::down(10.0, 10.0));
        assert_eq!(*target.captured.borrow(), vec![1]);

        tracker.handle(&PointerEvent::new(PointerPhase::Leave, 1, 10.0, 10.0));
        assert!(target.captured.borrow().is_empty());
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn test_capture_failure_is_swallowed() {
        let target = Rc::new(FakeTarget {
            size: Cell::new((200.0, 200.0)),
            refuse_capture: true,
            captured: RefCell::new(Vec::new()),
        });
        let tracker = PointerDragTracker::new(target, TranslationHandle::new());

        assert!(tracker.handle(&PointerEvent::down(100.0, 100.0)));
        assert!(tracker.handle(&PointerEvent::moved(150.0, 100.0)));
        assert!(tracker.handle(&PointerEvent::up(150.0, 100.0)));
        assert_eq!(tracker.translation(), Translation { x: 0.5, y: 0.0 });
    }

    #[test]
    fn test_other_pointer_does_not_steer_drag() {
        let target = FakeTarget::new(200.0, 200.0);
        let tracker = PointerDragTracker::new(target, TranslationHandle::new());

        tracker.handle(&PointerEvent::down(100.0, 100.0));
        assert!(!tracker.handle(&PointerEvent::new(PointerPhase::Move, 7, 0.0, 0.0)));
        assert!(!tracker.handle(&PointerEvent::new(PointerPhase::Up, 7, 0.0, 0.0)));
        assert!(tracker.is_dragging());
    }

    #[test]
    fn test_uses_live_css_size() {
        let target = FakeTarget::new(200.0, 200.0);
        let tracker = PointerDragTracker::new(Rc::clone(&target), TranslationHandle::new());

        tracker.handle(&PointerEvent::down(0.0, 0.0));
        target.size.set((400.0, 100.0));
        tracker.handle(&PointerEvent::moved(100.0, 25.0));

        assert_eq!(tracker.translation(), Translation { x: 0.5, y: -0.5 });
    }

    #[test]
    fn test_zero_size_surface_adds_nothing() {
        let target = FakeTarget::new(0.0, 0.0);
        let tracker = PointerDragTracker::new(target, TranslationHandle::new());

        tracker.handle(&PointerEvent::down(0.0, 0.0));
        tracker.handle(&PointerEvent::moved(50.0, 50.0));
        assert_eq!(tracker.translation(), Translation::default());
    }
}
