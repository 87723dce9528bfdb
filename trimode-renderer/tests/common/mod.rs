//! Shared fixtures for renderer integration tests.
//!
//! [`RecordingGl`] is an in-memory [`GlContext`] that records the calls the
//! rasterized backend makes, and [`RefusingHost`] is a host whose surfaces
//! cannot provide any context at all.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use trimode_core::{BackendOptions, ListenerKind, Mode, PointerTarget, SurfaceError, SurfaceResult};
use trimode_renderer::{
    gl::{GlBuffer, GlProgram, GlShader, GlUniform, GlVertexArray},
    headless::{GlFactory, HeadlessConfig, HeadlessHost},
    surface::{Listener, ListenerId},
    GlContext, Host, ShaderStage, Surface, SurfaceContext,
};

/// A GL call worth asserting on.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Viewport(i32, i32),
    BufferData(usize),
    Uniform2f(f32, f32),
    Clear,
    DrawTriangles(i32, i32),
    DeleteProgram,
    DeleteBuffer,
    DeleteVertexArray,
}

/// State shared by every context a [`gl_factory`] hands out.
#[derive(Default)]
pub struct GlState {
    calls: RefCell<Vec<GlCall>>,
    next_id: Cell<u32>,
    live_objects: Cell<i64>,
    contexts: Cell<usize>,
    /// Every shader fails to compile.
    pub fail_compile: Cell<bool>,
    /// The context reports itself lost.
    pub lost: Cell<bool>,
}

impl GlState {
    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    pub fn draws(&self) -> usize {
        self.count(|c| matches!(c, GlCall::DrawTriangles(..)))
    }

    pub fn viewports(&self) -> Vec<(i32, i32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                GlCall::Viewport(w, h) => Some((*w, *h)),
                _ => None,
            })
            .collect()
    }

    pub fn last_offset(&self) -> Option<(f32, f32)> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            GlCall::Uniform2f(x, y) => Some((*x, *y)),
            _ => None,
        })
    }

    /// Objects created and not yet deleted.
    pub fn live_objects(&self) -> i64 {
        self.live_objects.get()
    }

    /// Contexts handed out so far.
    pub fn contexts(&self) -> usize {
        self.contexts.get()
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn alloc(&self) -> Option<u32> {
        if self.lost.get() {
            return None;
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.live_objects.set(self.live_objects.get() + 1);
        Some(id)
    }

    fn free(&self) {
        self.live_objects.set(self.live_objects.get() - 1);
    }
}

/// Records calls into a shared [`GlState`].
pub struct RecordingGl {
    state: Rc<GlState>,
}

impl GlContext for RecordingGl {
    fn is_context_lost(&self) -> bool {
        self.state.lost.get()
    }

    fn create_shader(&self, _stage: ShaderStage) -> Option<GlShader> {
        self.state.alloc().map(GlShader)
    }

    fn shader_source(&self, _shader: GlShader, _source: &str) {}

    fn compile_shader(&self, _shader: GlShader) {}

    fn shader_compile_status(&self, _shader: GlShader) -> bool {
        !self.state.fail_compile.get()
    }

    fn shader_info_log(&self, _shader: GlShader) -> String {
        "ERROR: 0:1: syntax error".to_string()
    }

    fn delete_shader(&self, _shader: GlShader) {
        self.state.free();
    }

    fn create_program(&self) -> Option<GlProgram> {
        self.state.alloc().map(GlProgram)
    }

    fn attach_shader(&self, _program: GlProgram, _shader: GlShader) {}

    fn link_program(&self, _program: GlProgram) {}

    fn program_link_status(&self, _program: GlProgram) -> bool {
        true
    }

    fn program_info_log(&self, _program: GlProgram) -> String {
        String::new()
    }

    fn use_program(&self, _program: Option<GlProgram>) {}

    fn delete_program(&self, _program: GlProgram) {
        self.state.free();
        self.state.record(GlCall::DeleteProgram);
    }

    fn attrib_location(&self, _program: GlProgram, name: &str) -> Option<u32> {
        match name {
            "a_position" => Some(0),
            "a_color" => Some(1),
            _ => None,
        }
    }

    fn uniform_location(&self, _program: GlProgram, name: &str) -> Option<GlUniform> {
        (name == "u_offset").then_some(GlUniform(0))
    }

    fn uniform2f(&self, _location: GlUniform, x: f32, y: f32) {
        self.state.record(GlCall::Uniform2f(x, y));
    }

    fn create_buffer(&self) -> Option<GlBuffer> {
        self.state.alloc().map(GlBuffer)
    }

    fn bind_array_buffer(&self, _buffer: Option<GlBuffer>) {}

    fn array_buffer_data(&self, data: &[f32]) {
        self.state.record(GlCall::BufferData(data.len()));
    }

    fn delete_buffer(&self, _buffer: GlBuffer) {
        self.state.free();
        self.state.record(GlCall::DeleteBuffer);
    }

    fn create_vertex_array(&self) -> Option<GlVertexArray> {
        self.state.alloc().map(GlVertexArray)
    }

    fn bind_vertex_array(&self, _vao: Option<GlVertexArray>) {}

    fn delete_vertex_array(&self, _vao: GlVertexArray) {
        self.state.free();
        self.state.record(GlCall::DeleteVertexArray);
    }

    fn enable_vertex_attrib_array(&self, _index: u32) {}

    fn vertex_attrib_pointer_f32(&self, _index: u32, _size: i32, _stride: i32, _offset: i32) {}

    fn viewport(&self, _x: i32, _y: i32, width: i32, height: i32) {
        self.state.record(GlCall::Viewport(width, height));
    }

    fn clear_color(&self, _r: f32, _g: f32, _b: f32, _a: f32) {}

    fn clear(&self) {
        self.state.record(GlCall::Clear);
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        self.state.record(GlCall::DrawTriangles(first, count));
    }
}

/// A factory producing [`RecordingGl`] contexts over one shared state.
pub fn gl_factory() -> (GlFactory, Rc<GlState>) {
    let state = Rc::new(GlState::default());
    let shared = Rc::clone(&state);
    let factory: GlFactory = Rc::new(move || {
        shared.contexts.set(shared.contexts.get() + 1);
        Some(Box::new(RecordingGl {
            state: Rc::clone(&shared),
        }) as Box<dyn GlContext>)
    });
    (factory, state)
}

/// A 640x400 headless host with GL support.
pub fn gl_host(accelerated_present: bool) -> (HeadlessHost, Rc<GlState>) {
    let (factory, state) = gl_factory();
    let host = HeadlessHost::new(HeadlessConfig {
        accelerated_present,
        ..HeadlessConfig::default()
    })
    .with_gl(factory);
    (host, state)
}

/// A surface that offers no context of any kind.
#[derive(Default)]
pub struct RefusingSurface {
    next_listener: Cell<u64>,
}

impl PointerTarget for RefusingSurface {
    fn css_size(&self) -> (f64, f64) {
        (640.0, 400.0)
    }

    fn set_pointer_capture(&self, _pointer_id: i32) -> SurfaceResult<()> {
        Ok(())
    }

    fn release_pointer_capture(&self, _pointer_id: i32) -> SurfaceResult<()> {
        Ok(())
    }
}

impl Surface for RefusingSurface {
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    fn buffer_size(&self) -> (u32, u32) {
        (640, 400)
    }

    fn set_buffer_size(&self, _width: u32, _height: u32) {}

    fn context(&self, kind: Mode, _options: &BackendOptions) -> SurfaceResult<SurfaceContext> {
        Err(SurfaceError::ContextUnavailable(kind))
    }

    fn add_listener(&self, _kind: ListenerKind, _listener: Listener) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        ListenerId(id)
    }

    fn remove_listener(&self, _id: ListenerId) -> bool {
        true
    }
}

/// Host whose surfaces refuse every context.
pub struct RefusingHost {
    pub accelerated_present: bool,
    pub recreated: usize,
    surface: Rc<RefusingSurface>,
}

impl RefusingHost {
    pub fn new(accelerated_present: bool) -> Self {
        Self {
            accelerated_present,
            recreated: 0,
            surface: Rc::new(RefusingSurface::default()),
        }
    }
}

impl Host for RefusingHost {
    fn surface(&self) -> Rc<dyn Surface> {
        self.surface.clone()
    }

    fn recreate_surface(&mut self) -> SurfaceResult<Rc<dyn Surface>> {
        self.recreated += 1;
        self.surface = Rc::new(RefusingSurface::default());
        Ok(self.surface.clone())
    }

    fn accelerated_api_present(&self) -> bool {
        self.accelerated_present
    }
}
