//! Rendering backend implementations.
//!
//! The set of backends is closed: [`Backend`] is a tagged union over the three
//! variants, and every variant implements [`RenderBackend`]. New backends are
//! added by extending the union, not by branching in the engine.

pub mod software;
pub mod webgl;
pub mod wgpu;

use std::{cell::Cell, rc::Rc};

use trimode_core::{
    BackendOptions, ListenerKind, Mode, PointerDragTracker, SurfaceEvent, TranslationHandle,
};

use crate::{surface::Subscriptions, RenderError, RenderResult, Surface};

pub use self::software::SoftwareBackend;
pub use self::webgl::WebGlBackend;
pub use self::wgpu::WgpuBackend;

/// Lifecycle contract shared by every backend.
pub trait RenderBackend {
    /// Get the backend type.
    fn backend_type(&self) -> Mode;

    /// Begin the per-frame loop. No-op if already running.
    fn start(&mut self);

    /// Halt the per-frame loop, keeping resources. No-op if stopped.
    fn stop(&mut self);

    /// Whether the loop is running.
    fn is_running(&self) -> bool;

    /// Stop, release every owned resource and remove every listener.
    ///
    /// Idempotent. The backend must not be used afterwards.
    fn dispose(&mut self);

    /// Whether [`RenderBackend::dispose`] has run.
    fn is_disposed(&self) -> bool;

    /// Read the translation, clear, draw the triangle and present.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Disposed`] after disposal, or an error if the
    /// frame could not be produced.
    fn render(&mut self) -> RenderResult<()>;

    /// The translation this backend draws with.
    fn translation(&self) -> &TranslationHandle;

    /// Frames presented so far.
    fn frames_rendered(&self) -> u64;

    /// One loop iteration: render only if running and not disposed.
    ///
    /// Returns whether a frame was drawn.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn frame(&mut self) -> RenderResult<bool> {
        if self.is_disposed() || !self.is_running() {
            return Ok(false);
        }
        self.render()?;
        Ok(true)
    }
}

/// Running/disposed flags and frame counter.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Lifecycle {
    running: bool,
    disposed: bool,
    frames: u64,
}

impl Lifecycle {
    pub(crate) fn start(&mut self, mode: Mode) {
        if self.disposed {
            tracing::warn!("Ignoring start() on disposed {mode} backend");
            return;
        }
        if !self.running {
            self.running = true;
            tracing::debug!("{mode} frame loop started");
        }
    }

    pub(crate) fn stop(&mut self, mode: Mode) {
        if self.running {
            self.running = false;
            tracing::debug!("{mode} frame loop stopped");
        }
    }

    /// Marks disposal. Returns `false` if it had already happened.
    pub(crate) fn dispose(&mut self) -> bool {
        self.running = false;
        !std::mem::replace(&mut self.disposed, true)
    }

    pub(crate) fn ensure_live(&self) -> RenderResult<()> {
        if self.disposed {
            Err(RenderError::Disposed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn frame_done(&mut self) {
        self.frames += 1;
    }

    pub(crate) fn running(&self) -> bool {
        self.running
    }

    pub(crate) fn disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }
}

/// Install the shared drag tracker on `surface`, writing into `translation`.
pub(crate) fn install_tracker(
    subscriptions: &mut Subscriptions,
    surface: &Rc<dyn Surface>,
    translation: &TranslationHandle,
) {
    let tracker = PointerDragTracker::new(Rc::clone(surface), translation.clone());
    subscriptions.add(
        ListenerKind::Pointer,
        Rc::new(move |event: &SurfaceEvent| {
            if let SurfaceEvent::Pointer(pointer) = event {
                tracker.handle(pointer);
            }
        }),
    );
}

/// Install a resize listener that raises the returned flag.
pub(crate) fn install_resize_flag(subscriptions: &mut Subscriptions) -> Rc<Cell<bool>> {
    let pending = Rc::new(Cell::new(false));
    let flag = Rc::clone(&pending);
    subscriptions.add(
        ListenerKind::Resize,
        Rc::new(move |_: &SurfaceEvent| flag.set(true)),
    );
    pending
}

/// Linear RGBA clear color as `u8` channels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn color_to_rgba8(color: [f32; 4]) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// One of the three backends.
pub enum Backend {
    /// wgpu pipeline.
    Accelerated(WgpuBackend),
    /// GL shader pipeline.
    Rasterized(WebGlBackend),
    /// CPU rasterizer.
    Software(SoftwareBackend),
}

impl Backend {
    /// Construct the backend for `mode` on `surface`. Does not start it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BackendUnavailable`] if the surface cannot
    /// provide the mode's context, or [`RenderError::ResourceCreationFailed`]
    /// if backend resources cannot be built.
    pub async fn create(
        mode: Mode,
        surface: Rc<dyn Surface>,
        options: BackendOptions,
        clear_color: [f32; 4],
    ) -> RenderResult<Self> {
        Ok(match mode {
            Mode::Accelerated => {
                Self::Accelerated(WgpuBackend::create(surface, options, clear_color).await?)
            }
            Mode::Rasterized => {
                Self::Rasterized(WebGlBackend::create(surface, options, clear_color)?)
            }
            Mode::Software => {
                Self::Software(SoftwareBackend::create(surface, options, clear_color)?)
            }
        })
    }

    fn inner(&self) -> &dyn RenderBackend {
        match self {
            Self::Accelerated(b) => b,
            Self::Rasterized(b) => b,
            Self::Software(b) => b,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn RenderBackend {
        match self {
            Self::Accelerated(b) => b,
            Self::Rasterized(b) => b,
            Self::Software(b) => b,
        }
    }
}

impl RenderBackend for Backend {
    fn backend_type(&self) -> Mode {
        self.inner().backend_type()
    }

    fn start(&mut self) {
        self.inner_mut().start();
    }

    fn stop(&mut self) {
        self.inner_mut().stop();
    }

    fn is_running(&self) -> bool {
        self.inner().is_running()
    }

    fn dispose(&mut self) {
        self.inner_mut().dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner().is_disposed()
    }

    fn render(&mut self) -> RenderResult<()> {
        self.inner_mut().render()
    }

    fn translation(&self) -> &TranslationHandle {
        self.inner().translation()
    }

    fn frames_rendered(&self) -> u64 {
        self.inner().frames_rendered()
    }

    fn frame(&mut self) -> RenderResult<bool> {
        self.inner_mut().frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_start_stop_idempotent() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.start(Mode::Software);
        lifecycle.start(Mode::Software);
        assert!(lifecycle.running());
        lifecycle.stop(Mode::Software);
        lifecycle.stop(Mode::Software);
        assert!(!lifecycle.running());
    }

    #[test]
    fn test_lifecycle_dispose_once() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.start(Mode::Software);
        assert!(lifecycle.dispose());
        assert!(!lifecycle.dispose());
        assert!(!lifecycle.running());
        assert!(matches!(lifecycle.ensure_live(), Err(RenderError::Disposed)));
    }

    #[test]
    fn test_start_after_dispose_is_ignored() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.dispose();
        lifecycle.start(Mode::Rasterized);
        assert!(!lifecycle.running());
    }

    #[test]
    fn test_color_to_rgba8() {
        assert_eq!(color_to_rgba8([1.0, 0.0, 0.5, 2.0]), [255, 0, 128, 255]);
    }
}
