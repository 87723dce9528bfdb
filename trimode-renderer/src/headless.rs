//! In-memory host and surface.
//!
//! Used by native tools and tests. A headless surface always offers a
//! software context, offers a rasterized context when a GL factory is
//! installed, and never offers an accelerated context (there is no window to
//! present to). Like a browser canvas, once a surface has handed out one kind
//! of context it refuses every other kind.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use trimode_core::{
    BackendOptions, ListenerKind, Mode, PointerTarget, SurfaceError, SurfaceEvent, SurfaceResult,
};

use crate::{
    gl::GlContext,
    surface::{Listener, ListenerId, PixelSink, SurfaceContext},
    Host, Surface,
};

/// Creates GL contexts for headless surfaces.
pub type GlFactory = Rc<dyn Fn() -> Option<Box<dyn GlContext>>>;

/// A presented frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major.
    pub pixels: Vec<u8>,
}

impl PixelFrame {
    /// RGBA at `(x, y)`, or `None` outside the frame.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.pixels.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Shared slot holding the most recent frame.
type FrameSlot = Rc<RefCell<Option<PixelFrame>>>;

struct FrameSink {
    slot: FrameSlot,
}

impl PixelSink for FrameSink {
    fn present(&self, width: u32, height: u32, rgba: &[u8]) -> SurfaceResult<()> {
        let expected = (width as usize) * (height as usize) * 4;
        if rgba.len() != expected {
            return Err(SurfaceError::Host(format!(
                "frame of {} bytes does not match {width}x{height}",
                rgba.len()
            )));
        }
        *self.slot.borrow_mut() = Some(PixelFrame {
            width,
            height,
            pixels: rgba.to_vec(),
        });
        Ok(())
    }
}

/// An in-memory drawable surface.
pub struct HeadlessSurface {
    generation: u64,
    css_size: Cell<(f64, f64)>,
    device_pixel_ratio: Cell<f64>,
    buffer_size: Cell<(u32, u32)>,
    claimed: Cell<Option<Mode>>,
    gl_factory: Option<GlFactory>,
    listeners: RefCell<Vec<(ListenerId, ListenerKind, Listener)>>,
    next_listener: Cell<u64>,
    captured: Cell<Option<i32>>,
    frame: FrameSlot,
}

impl HeadlessSurface {
    /// Create a surface with the given CSS size and pixel ratio.
    #[must_use]
    pub fn new(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            generation: 0,
            css_size: Cell::new((css_width, css_height)),
            device_pixel_ratio: Cell::new(device_pixel_ratio),
            buffer_size: Cell::new((300, 150)),
            claimed: Cell::new(None),
            gl_factory: None,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            captured: Cell::new(None),
            frame: Rc::new(RefCell::new(None)),
        }
    }

    /// Offer rasterized contexts produced by `factory`.
    #[must_use]
    pub fn with_gl(mut self, factory: GlFactory) -> Self {
        self.gl_factory = Some(factory);
        self
    }

    fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Which surface this is, counting from zero per host.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The context kind handed out so far, if any.
    #[must_use]
    pub fn claimed_context(&self) -> Option<Mode> {
        self.claimed.get()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Pointer currently captured by this surface.
    #[must_use]
    pub fn captured_pointer(&self) -> Option<i32> {
        self.captured.get()
    }

    /// Most recently presented software frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<PixelFrame> {
        self.frame.borrow().clone()
    }

    /// Deliver `event` to every listener registered for its kind.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &SurfaceEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| Rc::clone(l))
            .collect();
        for listener in &targets {
            listener(event);
        }
        targets.len()
    }

    /// Change the CSS size and notify resize listeners.
    pub fn resize(&self, css_width: f64, css_height: f64) {
        self.css_size.set((css_width, css_height));
        self.dispatch(&SurfaceEvent::Resize);
    }

    /// Change the pixel ratio and notify resize listeners.
    pub fn set_device_pixel_ratio(&self, ratio: f64) {
        self.device_pixel_ratio.set(ratio);
        self.dispatch(&SurfaceEvent::Resize);
    }

    fn claim(&self, kind: Mode) -> SurfaceResult<()> {
        match self.claimed.get() {
            Some(existing) if existing != kind => Err(SurfaceError::ContextUnavailable(kind)),
            _ => {
                self.claimed.set(Some(kind));
                Ok(())
            }
        }
    }
}

impl PointerTarget for HeadlessSurface {
    fn css_size(&self) -> (f64, f64) {
        self.css_size.get()
    }

    fn set_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()> {
        self.captured.set(Some(pointer_id));
        Ok(())
    }

    fn release_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()> {
        if self.captured.get() == Some(pointer_id) {
            self.captured.set(None);
            Ok(())
        } else {
            Err(SurfaceError::PointerCaptureFailed(format!(
                "pointer {pointer_id} is not captured"
            )))
        }
    }
}

impl Surface for HeadlessSurface {
    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio.get()
    }

    fn buffer_size(&self) -> (u32, u32) {
        self.buffer_size.get()
    }

    fn set_buffer_size(&self, width: u32, height: u32) {
        self.buffer_size.set((width, height));
    }

    fn context(&self, kind: Mode, _options: &BackendOptions) -> SurfaceResult<SurfaceContext> {
        match kind {
            Mode::Accelerated => Err(SurfaceError::ContextUnavailable(kind)),
            Mode::Rasterized => {
                let gl = self
                    .gl_factory
                    .as_ref()
                    .and_then(|factory| factory())
                    .ok_or(SurfaceError::ContextUnavailable(kind))?;
                self.claim(kind)?;
                Ok(SurfaceContext::Rasterized(gl))
            }
            Mode::Software => {
                self.claim(kind)?;
                Ok(SurfaceContext::Software(Box::new(FrameSink {
                    slot: Rc::clone(&self.frame),
                })))
            }
        }
    }

    fn add_listener(&self, kind: ListenerKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }
}

/// Settings for a [`HeadlessHost`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessConfig {
    /// CSS width of every surface.
    pub css_width: f64,
    /// CSS height of every surface.
    pub css_height: f64,
    /// Device pixel ratio of every surface.
    pub device_pixel_ratio: f64,
    /// What the capability probe reports for the accelerated API.
    pub accelerated_present: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            css_width: 640.0,
            css_height: 400.0,
            device_pixel_ratio: 1.0,
            accelerated_present: false,
        }
    }
}

/// Host that creates [`HeadlessSurface`]s.
pub struct HeadlessHost {
    config: HeadlessConfig,
    gl_factory: Option<GlFactory>,
    current: Rc<HeadlessSurface>,
    created: u64,
}

impl HeadlessHost {
    /// Create a host and its first surface.
    #[must_use]
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            current: Rc::new(Self::build(&config, None, 0)),
            config,
            gl_factory: None,
            created: 1,
        }
    }

    /// Offer rasterized contexts on this and every later surface.
    #[must_use]
    pub fn with_gl(mut self, factory: GlFactory) -> Self {
        self.current = Rc::new(Self::build(
            &self.config,
            Some(Rc::clone(&factory)),
            self.current.generation(),
        ));
        self.gl_factory = Some(factory);
        self
    }

    fn build(config: &HeadlessConfig, gl: Option<GlFactory>, generation: u64) -> HeadlessSurface {
        let surface = HeadlessSurface::new(
            config.css_width,
            config.css_height,
            config.device_pixel_ratio,
        )
        .with_generation(generation);
        match gl {
            Some(factory) => surface.with_gl(factory),
            None => surface,
        }
    }

    /// The current surface with its concrete type.
    #[must_use]
    pub fn current(&self) -> Rc<HeadlessSurface> {
        Rc::clone(&self.current)
    }

    /// Number of surfaces created so far, including the first.
    #[must_use]
    pub fn surfaces_created(&self) -> u64 {
        self.created
    }
}

impl Host for HeadlessHost {
    fn surface(&self) -> Rc<dyn Surface> {
        self.current.clone()
    }

    fn recreate_surface(&mut self) -> SurfaceResult<Rc<dyn Surface>> {
        self.current = Rc::new(Self::build(
            &self.config,
            self.gl_factory.clone(),
            self.created,
        ));
        self.created += 1;
        tracing::debug!("Headless surface #{} created", self.current.generation());
        Ok(self.current.clone())
    }

    fn accelerated_api_present(&self) -> bool {
        self.config.accelerated_present
    }
}

#[cfg(test)]
mod tests {
    use trimode_core::PointerEvent;

    use super::*;

    #[test]
    fn test_software_context_claims_surface() {
        let surface = HeadlessSurface::new(100.0, 100.0, 1.0);
        let options = BackendOptions::default();

        assert!(surface.context(Mode::Software, &options).is_ok());
        assert_eq!(surface.claimed_context(), Some(Mode::Software));
        // Same kind again is fine, a different kind is not.
        assert!(surface.context(Mode::Software, &options).is_ok());
        assert!(matches!(
            surface.context(Mode::Rasterized, &options),
            Err(SurfaceError::ContextUnavailable(Mode::Rasterized))
        ));
    }

    #[test]
    fn test_accelerated_is_never_offered() {
        let surface = HeadlessSurface::new(100.0, 100.0, 1.0);
        assert!(surface
            .context(Mode::Accelerated, &BackendOptions::default())
            .is_err());
        assert_eq!(surface.claimed_context(), None);
    }

    #[test]
    fn test_dispatch_by_kind_and_removal() {
        let surface = HeadlessSurface::new(100.0, 100.0, 1.0);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = surface.add_listener(
            ListenerKind::Pointer,
            Rc::new(move |_: &SurfaceEvent| counter.set(counter.get() + 1)),
        );

        assert_eq!(
            surface.dispatch(&SurfaceEvent::Pointer(PointerEvent::down(1.0, 1.0))),
            1
        );
        assert_eq!(surface.dispatch(&SurfaceEvent::Resize), 0);
        assert_eq!(hits.get(), 1);

        assert!(surface.remove_listener(id));
        assert!(!surface.remove_listener(id));
        assert_eq!(surface.listener_count(), 0);
    }

    #[test]
    fn test_frame_sink_rejects_short_frames() {
        let surface = HeadlessSurface::new(2.0, 2.0, 1.0);
        let Ok(SurfaceContext::Software(sink)) =
            surface.context(Mode::Software, &BackendOptions::default())
        else {
            panic!("expected software context");
        };
        assert!(sink.present(2, 2, &[0; 8]).is_err());
        assert!(sink.present(2, 2, &[7; 16]).is_ok());
        assert_eq!(surface.last_frame().unwrap().pixel(1, 1), Some([7, 7, 7, 7]));
    }

    #[test]
    fn test_host_recreates_fresh_surfaces() {
        let mut host = HeadlessHost::new(HeadlessConfig::default());
        let first = host.current();
        first
            .context(Mode::Software, &BackendOptions::default())
            .unwrap();

        host.recreate_surface().unwrap();
        let second = host.current();
        assert_eq!(second.generation(), 1);
        assert_eq!(second.claimed_context(), None);
        assert_eq!(host.surfaces_created(), 2);
    }
}
