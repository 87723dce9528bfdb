//! Browser canvas surface and host.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use trimode_core::{
    BackendOptions, ListenerKind, Mode, PointerEvent, PointerPhase, PointerTarget, SurfaceError,
    SurfaceEvent, SurfaceResult,
};
use trimode_renderer::{
    surface::{Listener, ListenerId},
    Host, PixelSink, Surface, SurfaceContext,
};
use wasm_bindgen::{closure::Closure, Clamped, JsCast, JsValue};
use web_sys::{
    CanvasRenderingContext2d, Document, EventTarget, HtmlCanvasElement, ImageData,
    WebGl2RenderingContext, Window,
};

use crate::webgl::WebGl2Context;

const POINTER_EVENTS: [&str; 5] = [
    "pointerdown",
    "pointermove",
    "pointerup",
    "pointerleave",
    "pointercancel",
];
const RESIZE_EVENTS: [&str; 1] = ["resize"];

fn js_error(context: &str, err: &JsValue) -> SurfaceError {
    SurfaceError::Host(format!("{context}: {err:?}"))
}

fn window() -> SurfaceResult<Window> {
    web_sys::window().ok_or_else(|| SurfaceError::Host("No window object".to_string()))
}

fn document() -> SurfaceResult<Document> {
    window()?
        .document()
        .ok_or_else(|| SurfaceError::Host("No document object".to_string()))
}

/// A DOM listener kept alive until it is removed.
struct Registration {
    target: EventTarget,
    events: &'static [&'static str],
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl Registration {
    fn detach(&self) {
        let callback: &js_sys::Function = self.closure.as_ref().unchecked_ref();
        for event in self.events {
            if let Err(e) = self.target.remove_event_listener_with_callback(event, callback) {
                tracing::trace!("Failed to remove {event} listener: {e:?}");
            }
        }
    }
}

fn pointer_phase(event_type: &str) -> Option<PointerPhase> {
    Some(match event_type {
        "pointerdown" => PointerPhase::Down,
        "pointermove" => PointerPhase::Move,
        "pointerup" => PointerPhase::Up,
        "pointerleave" => PointerPhase::Leave,
        "pointercancel" => PointerPhase::Cancel,
        _ => return None,
    })
}

/// Build the context attributes object passed to `getContext`.
fn context_attributes(kind: Mode, options: &BackendOptions) -> SurfaceResult<js_sys::Object> {
    let attributes = js_sys::Object::new();
    let set = |key: &str, value: JsValue| {
        js_sys::Reflect::set(&attributes, &JsValue::from_str(key), &value)
            .map(|_| ())
            .map_err(|e| js_error("Failed to set context attribute", &e))
    };

    set("desynchronized", JsValue::from_bool(options.desynchronized))?;
    if kind == Mode::Rasterized {
        set("antialias", JsValue::from_bool(options.antialias))?;
        let preference = if options.high_performance {
            "high-performance"
        } else {
            "default"
        };
        set("powerPreference", JsValue::from_str(preference))?;
    }
    Ok(attributes)
}

/// Presents software frames through a 2D context.
struct ImageDataSink {
    ctx: CanvasRenderingContext2d,
}

impl PixelSink for ImageDataSink {
    fn present(&self, width: u32, height: u32, rgba: &[u8]) -> SurfaceResult<()> {
        // Frames are opaque, so premultiplied and straight alpha coincide.
        let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(rgba), width, height)
            .map_err(|e| js_error("Failed to create ImageData", &e))?;
        self.ctx
            .put_image_data(&image, 0.0, 0.0)
            .map_err(|e| js_error("Failed to put ImageData", &e))
    }
}

/// An `HtmlCanvasElement` as a drawable surface.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    registrations: RefCell<HashMap<ListenerId, Registration>>,
    next_listener: Cell<u64>,
}

impl CanvasSurface {
    /// Wrap `canvas`.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self {
            canvas,
            registrations: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        }
    }

    /// The wrapped element.
    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn context_object(
        &self,
        id: &str,
        options: &BackendOptions,
        kind: Mode,
    ) -> SurfaceResult<js_sys::Object> {
        let attributes = context_attributes(kind, options)?;
        self.canvas
            .get_context_with_context_options(id, &attributes)
            .map_err(|e| js_error("getContext failed", &e))?
            .ok_or(SurfaceError::ContextUnavailable(kind))
    }

    fn pointer_closure(&self, listener: Listener) -> Closure<dyn FnMut(web_sys::Event)> {
        Closure::new(move |event: web_sys::Event| {
            let Some(pointer) = event.dyn_ref::<web_sys::PointerEvent>() else {
                return;
            };
            let Some(phase) = pointer_phase(&event.type_()) else {
                return;
            };
            listener(&SurfaceEvent::Pointer(PointerEvent::new(
                phase,
                pointer.pointer_id(),
                f64::from(pointer.offset_x()),
                f64::from(pointer.offset_y()),
            )));
        })
    }
}

impl PointerTarget for CanvasSurface {
    fn css_size(&self) -> (f64, f64) {
        (
            f64::from(self.canvas.client_width()),
            f64::from(self.canvas.client_height()),
        )
    }

    fn set_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()> {
        self.canvas
            .set_pointer_capture(pointer_id)
            .map_err(|e| SurfaceError::PointerCaptureFailed(format!("{e:?}")))
    }

    fn release_pointer_capture(&self, pointer_id: i32) -> SurfaceResult<()> {
        self.canvas
            .release_pointer_capture(pointer_id)
            .map_err(|e| SurfaceError::PointerCaptureFailed(format!("{e:?}")))
    }
}

impl Surface for CanvasSurface {
    fn device_pixel_ratio(&self) -> f64 {
        web_sys::window().map_or(1.0, |w| w.device_pixel_ratio())
    }

    fn buffer_size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn set_buffer_size(&self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn context(&self, kind: Mode, options: &BackendOptions) -> SurfaceResult<SurfaceContext> {
        match kind {
            #[cfg(target_arch = "wasm32")]
            Mode::Accelerated => Ok(SurfaceContext::Accelerated(wgpu::SurfaceTarget::Canvas(
                self.canvas.clone(),
            ))),
            #[cfg(not(target_arch = "wasm32"))]
            Mode::Accelerated => Err(SurfaceError::ContextUnavailable(kind)),
            Mode::Rasterized => {
                let gl = self
                    .context_object("webgl2", options, kind)?
                    .dyn_into::<WebGl2RenderingContext>()
                    .map_err(|_| SurfaceError::ContextUnavailable(kind))?;
                Ok(SurfaceContext::Rasterized(Box::new(WebGl2Context::new(gl))))
            }
            Mode::Software => {
                let ctx = self
                    .context_object("2d", options, kind)?
                    .dyn_into::<CanvasRenderingContext2d>()
                    .map_err(|_| SurfaceError::ContextUnavailable(kind))?;
                Ok(SurfaceContext::Software(Box::new(ImageDataSink { ctx })))
            }
        }
    }

    fn add_listener(&self, kind: ListenerKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        let registration = match kind {
            ListenerKind::Pointer => Registration {
                target: self.canvas.clone().into(),
                events: &POINTER_EVENTS,
                closure: self.pointer_closure(listener),
            },
            ListenerKind::Resize => {
                let Ok(window) = window() else {
                    tracing::warn!("No window to observe resizes on");
                    return id;
                };
                Registration {
                    target: window.into(),
                    events: &RESIZE_EVENTS,
                    closure: Closure::new(move |_: web_sys::Event| {
                        listener(&SurfaceEvent::Resize);
                    }),
                }
            }
        };

        let callback: &js_sys::Function = registration.closure.as_ref().unchecked_ref();
        for event in registration.events {
            if let Err(e) = registration
                .target
                .add_event_listener_with_callback(event, callback)
            {
                tracing::warn!("Failed to add {event} listener: {e:?}");
            }
        }
        self.registrations.borrow_mut().insert(id, registration);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let Some(registration) = self.registrations.borrow_mut().remove(&id) else {
            return false;
        };
        registration.detach();
        true
    }
}

impl Drop for CanvasSurface {
    fn drop(&mut self) {
        for registration in self.registrations.get_mut().values() {
            registration.detach();
        }
    }
}

/// Owns the page's triangle canvas.
pub struct BrowserHost {
    current: Rc<CanvasSurface>,
}

impl BrowserHost {
    /// Attach to the canvas with the given element id.
    ///
    /// # Errors
    ///
    /// Returns an error if no canvas with that id exists.
    pub fn new(canvas_id: &str) -> SurfaceResult<Self> {
        let canvas = document()?
            .get_element_by_id(canvas_id)
            .ok_or_else(|| SurfaceError::Host(format!("Canvas element '{canvas_id}' not found")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| SurfaceError::Host("Element is not a canvas".to_string()))?;

        Ok(Self {
            current: Rc::new(CanvasSurface::new(canvas)),
        })
    }
}

impl Host for BrowserHost {
    fn surface(&self) -> Rc<dyn Surface> {
        self.current.clone()
    }

    fn recreate_surface(&mut self) -> SurfaceResult<Rc<dyn Surface>> {
        let old = self.current.canvas();
        let canvas = document()?
            .create_element("canvas")
            .map_err(|e| js_error("Failed to create canvas", &e))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| SurfaceError::Host("Created element is not a canvas".to_string()))?;

        canvas.set_id(&old.id());
        canvas.set_class_name(&old.class_name());
        if let Some(style) = old.get_attribute("style") {
            canvas
                .set_attribute("style", &style)
                .map_err(|e| js_error("Failed to copy canvas style", &e))?;
        }
        old.replace_with_with_node_1(&canvas)
            .map_err(|e| js_error("Failed to replace canvas", &e))?;

        tracing::debug!("Canvas '{}' replaced", canvas.id());
        self.current = Rc::new(CanvasSurface::new(canvas));
        Ok(self.current.clone())
    }

    fn accelerated_api_present(&self) -> bool {
        web_sys::window().is_some_and(|w| {
            js_sys::Reflect::get(&w.navigator(), &JsValue::from_str("gpu"))
                .is_ok_and(|gpu| !gpu.is_undefined() && !gpu.is_null())
        })
    }
}
