//! Host surface abstraction.
//!
//! A [`Surface`] is the drawable target (a `<canvas>` in browsers). Backends
//! ask it for a context of their [`Mode`], register listeners on it and size
//! its drawable buffer. A [`Host`] owns the surface and can replace it with a
//! fresh one, which the engine does whenever the backend kind changes.

use std::rc::Rc;

use trimode_core::{
    BackendOptions, ListenerKind, Mode, PointerTarget, SurfaceEvent, SurfaceResult,
};

use crate::gl::GlContext;

/// Callback invoked for every event of the kind it was registered for.
pub type Listener = Rc<dyn Fn(&SurfaceEvent)>;

/// Identifies a registered listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receives finished RGBA8 frames from the software backend.
pub trait PixelSink {
    /// Present a `width × height` frame of premultiplied RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot display the frame.
    fn present(&self, width: u32, height: u32, rgba: &[u8]) -> SurfaceResult<()>;
}

/// A graphics context yielded by a surface.
pub enum SurfaceContext {
    /// A target wgpu can create a presentable surface from.
    Accelerated(wgpu::SurfaceTarget<'static>),
    /// A WebGL2-style GL context.
    Rasterized(Box<dyn GlContext>),
    /// A sink for CPU-rendered frames.
    Software(Box<dyn PixelSink>),
}

impl SurfaceContext {
    /// The kind of context this is.
    #[must_use]
    pub fn kind(&self) -> Mode {
        match self {
            Self::Accelerated(_) => Mode::Accelerated,
            Self::Rasterized(_) => Mode::Rasterized,
            Self::Software(_) => Mode::Software,
        }
    }
}

/// A drawable surface owned by the host.
pub trait Surface: PointerTarget {
    /// Ratio of physical to CSS pixels.
    fn device_pixel_ratio(&self) -> f64;

    /// Current drawable buffer size in physical pixels.
    fn buffer_size(&self) -> (u32, u32);

    /// Resize the drawable buffer.
    fn set_buffer_size(&self, width: u32, height: u32);

    /// Obtain a context of the given kind.
    ///
    /// Hosts may refuse a second, different kind on the same surface.
    ///
    /// # Errors
    ///
    /// Returns [`trimode_core::SurfaceError::ContextUnavailable`] if the kind
    /// cannot be provided.
    fn context(&self, kind: Mode, options: &BackendOptions) -> SurfaceResult<SurfaceContext>;

    /// Register a listener for one kind of event.
    fn add_listener(&self, kind: ListenerKind, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Drawable size the surface should have right now.
    fn drawable_size(&self) -> (u32, u32) {
        drawable_size(self.css_size(), self.device_pixel_ratio())
    }
}

/// The environment that owns surfaces.
pub trait Host {
    /// The surface currently attached to the page/window.
    fn surface(&self) -> Rc<dyn Surface>;

    /// Replace the current surface with a fresh one and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot create a surface.
    fn recreate_surface(&mut self) -> SurfaceResult<Rc<dyn Surface>>;

    /// Whether the accelerated graphics API exists in this environment.
    fn accelerated_api_present(&self) -> bool;
}

/// `floor(css × dpr)` per dimension, never below one pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn drawable_size(css_size: (f64, f64), device_pixel_ratio: f64) -> (u32, u32) {
    let scale = |css: f64| -> u32 {
        let physical = (css * device_pixel_ratio).floor();
        if physical.is_finite() && physical >= 1.0 {
            physical.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    };
    (scale(css_size.0), scale(css_size.1))
}

/// Tracks the size a backend last configured, so reconfiguration only
/// happens when the wanted size actually changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawableSize {
    current: Option<(u32, u32)>,
}

impl DrawableSize {
    /// Start from an already configured size.
    #[must_use]
    pub fn configured(width: u32, height: u32) -> Self {
        Self {
            current: Some((width, height)),
        }
    }

    /// The configured size, if any.
    #[must_use]
    pub fn current(&self) -> Option<(u32, u32)> {
        self.current
    }

    /// Record `wanted`; returns it only if it differs from the configured size.
    pub fn update(&mut self, wanted: (u32, u32)) -> Option<(u32, u32)> {
        if self.current == Some(wanted) {
            return None;
        }
        self.current = Some(wanted);
        Some(wanted)
    }
}

/// Listener registrations owned by one backend.
///
/// Dropping or clearing it removes every listener from the surface, so a
/// backend that fails halfway through construction leaves nothing behind.
pub struct Subscriptions {
    surface: Rc<dyn Surface>,
    ids: Vec<ListenerId>,
}

impl Subscriptions {
    /// Create an empty set bound to `surface`.
    #[must_use]
    pub fn new(surface: Rc<dyn Surface>) -> Self {
        Self {
            surface,
            ids: Vec::new(),
        }
    }

    /// Register `listener` and keep its id.
    pub fn add(&mut self, kind: ListenerKind, listener: Listener) -> ListenerId {
        let id = self.surface.add_listener(kind, listener);
        self.ids.push(id);
        id
    }

    /// Number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Remove every listener.
    pub fn clear(&mut self) {
        for id in self.ids.drain(..) {
            if !self.surface.remove_listener(id) {
                tracing::trace!("Listener {id:?} already removed");
            }
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawable_size_floors() {
        assert_eq!(drawable_size((640.0, 400.0), 1.0), (640, 400));
        assert_eq!(drawable_size((333.0, 101.0), 1.5), (499, 151));
        assert_eq!(drawable_size((100.4, 100.9), 2.0), (200, 201));
    }

    #[test]
    fn test_drawable_size_never_zero() {
        assert_eq!(drawable_size((0.0, 0.2), 1.0), (1, 1));
        assert_eq!(drawable_size((f64::NAN, 10.0), 1.0), (1, 10));
    }

    #[test]
    fn test_drawable_size_update_only_on_change() {
        let mut size = DrawableSize::configured(640, 400);
        assert_eq!(size.update((640, 400)), None);
        assert_eq!(size.update((1280, 800)), Some((1280, 800)));
        assert_eq!(size.update((1280, 800)), None);
        assert_eq!(size.current(), Some((1280, 800)));
    }

    #[test]
    fn test_unconfigured_size_always_updates() {
        let mut size = DrawableSize::default();
        assert_eq!(size.update((1, 1)), Some((1, 1)));
    }
}
