//! Software fallback backend for hosts without GPU support.
//!
//! Rasterizes the triangle on the CPU into a pixel buffer with tiny-skia and
//! hands finished frames to the surface's [`PixelSink`]. There is no
//! per-vertex color interpolation; the triangle is filled with the mean of
//! its vertex colors.

use std::rc::Rc;

use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};
use trimode_core::{flat_color, BackendOptions, Mode, Translation, TranslationHandle, TRIANGLE};

use crate::{
    surface::{PixelSink, Subscriptions, SurfaceContext},
    RenderError, RenderResult, Surface,
};

use super::{color_to_rgba8, install_tracker, Lifecycle, RenderBackend};

/// Map an NDC position plus translation to pixel coordinates.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn ndc_to_pixel(position: [f32; 2], t: Translation, width: u32, height: u32) -> (f32, f32) {
    let x = (position[0] + t.x + 1.0) * 0.5 * width as f32;
    let y = (1.0 - (position[1] + t.y)) * 0.5 * height as f32;
    (x, y)
}

/// CPU renderer.
pub struct SoftwareBackend {
    surface: Rc<dyn Surface>,
    sink: Option<Box<dyn PixelSink>>,
    pixmap: Option<Pixmap>,
    paint: Paint<'static>,
    background: Color,
    translation: TranslationHandle,
    subscriptions: Subscriptions,
    lifecycle: Lifecycle,
}

impl SoftwareBackend {
    /// Create a new software backend on `surface`.
    ///
    /// The pixel buffer is allocated by the first frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BackendUnavailable`] if the surface has no pixel
    /// sink.
    pub fn create(
        surface: Rc<dyn Surface>,
        options: BackendOptions,
        clear_color: [f32; 4],
    ) -> RenderResult<Self> {
        let sink = match surface.context(Mode::Software, &options)? {
            SurfaceContext::Software(sink) => sink,
            other => {
                return Err(RenderError::BackendUnavailable(format!(
                    "surface yielded a {} context",
                    other.kind()
                )))
            }
        };

        let [r, g, b] = flat_color();
        let fill = color_to_rgba8([r, g, b, 1.0]);
        let mut paint = Paint::default();
        paint.set_color_rgba8(fill[0], fill[1], fill[2], fill[3]);
        paint.anti_alias = options.antialias;

        let bg = color_to_rgba8(clear_color);
        let background = Color::from_rgba8(bg[0], bg[1], bg[2], bg[3]);

        let translation = TranslationHandle::new();
        let mut subscriptions = Subscriptions::new(Rc::clone(&surface));
        install_tracker(&mut subscriptions, &surface, &translation);

        tracing::info!("Software backend initialized");

        Ok(Self {
            surface,
            sink: Some(sink),
            pixmap: None,
            paint,
            background,
            translation,
            subscriptions,
            lifecycle: Lifecycle::default(),
        })
    }

    /// Reallocate the pixel buffer if the drawable size changed.
    fn ensure_pixmap(&mut self) -> RenderResult<()> {
        let (width, height) = self.surface.drawable_size();
        let current = self.pixmap.as_ref().map(|p| (p.width(), p.height()));
        if current == Some((width, height)) {
            return Ok(());
        }

        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            RenderError::ResourceCreationFailed(format!(
                "Failed to allocate {width}x{height} pixel buffer"
            ))
        })?;
        self.pixmap = Some(pixmap);
        self.surface.set_buffer_size(width, height);
        tracing::debug!("Software pixel buffer resized to {width}x{height}");
        Ok(())
    }
}

impl RenderBackend for SoftwareBackend {
    fn backend_type(&self) -> Mode {
        Mode::Software
    }

    fn start(&mut self) {
        self.lifecycle.start(Mode::Software);
    }

    fn stop(&mut self) {
        self.lifecycle.stop(Mode::Software);
    }

    fn is_running(&self) -> bool {
        self.lifecycle.running()
    }

    fn dispose(&mut self) {
        if !self.lifecycle.dispose() {
            return;
        }
        self.subscriptions.clear();
        self.pixmap = None;
        self.sink = None;
        tracing::info!("Software backend disposed");
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle.disposed()
    }

    fn render(&mut self) -> RenderResult<()> {
        self.lifecycle.ensure_live()?;
        self.ensure_pixmap()?;

        let (Some(pixmap), Some(sink)) = (self.pixmap.as_mut(), self.sink.as_ref()) else {
            return Err(RenderError::Disposed);
        };

        let t = self.translation.get();
        let (width, height) = (pixmap.width(), pixmap.height());
        pixmap.fill(self.background);

        let [a, b, c] = TRIANGLE.map(|v| ndc_to_pixel(v.position, t, width, height));
        let mut builder = PathBuilder::new();
        builder.move_to(a.0, a.1);
        builder.line_to(b.0, b.1);
        builder.line_to(c.0, c.1);
        builder.close();
        if let Some(path) = builder.finish() {
            pixmap.fill_path(
                &path,
                &self.paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }

        sink.present(width, height, pixmap.data())?;
        self.lifecycle.frame_done();
        tracing::trace!("Software frame {}", self.lifecycle.frames());
        Ok(())
    }

    fn translation(&self) -> &TranslationHandle {
        &self.translation
    }

    fn frames_rendered(&self) -> u64 {
        self.lifecycle.frames()
    }
}

impl Drop for SoftwareBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}
