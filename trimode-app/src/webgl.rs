//! [`GlContext`] over a browser `WebGL2RenderingContext`.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use trimode_renderer::{
    gl::{GlBuffer, GlProgram, GlShader, GlUniform, GlVertexArray},
    GlContext, ShaderStage,
};
use web_sys::{
    WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram, WebGlShader, WebGlUniformLocation,
    WebGlVertexArrayObject,
};

/// Maps small integer handles to JS objects.
struct Handles<T> {
    next: Cell<u32>,
    objects: RefCell<HashMap<u32, T>>,
}

impl<T: Clone> Handles<T> {
    fn insert(&self, object: T) -> u32 {
        let id = self.next.get() + 1;
        self.next.set(id);
        self.objects.borrow_mut().insert(id, object);
        id
    }

    fn get(&self, id: u32) -> Option<T> {
        self.objects.borrow().get(&id).cloned()
    }

    fn remove(&self, id: u32) -> Option<T> {
        self.objects.borrow_mut().remove(&id)
    }
}

impl<T> Default for Handles<T> {
    fn default() -> Self {
        Self {
            next: Cell::new(0),
            objects: RefCell::new(HashMap::new()),
        }
    }
}

/// A browser WebGL2 context.
pub struct WebGl2Context {
    gl: Gl,
    shaders: Handles<WebGlShader>,
    programs: Handles<WebGlProgram>,
    buffers: Handles<WebGlBuffer>,
    vertex_arrays: Handles<WebGlVertexArrayObject>,
    uniforms: Handles<WebGlUniformLocation>,
}

impl WebGl2Context {
    /// Wrap a context obtained from a canvas.
    #[must_use]
    pub fn new(gl: Gl) -> Self {
        Self {
            gl,
            shaders: Handles::default(),
            programs: Handles::default(),
            buffers: Handles::default(),
            vertex_arrays: Handles::default(),
            uniforms: Handles::default(),
        }
    }
}

impl GlContext for WebGl2Context {
    fn is_context_lost(&self) -> bool {
        self.gl.is_context_lost()
    }

    fn create_shader(&self, stage: ShaderStage) -> Option<GlShader> {
        let kind = match stage {
            ShaderStage::Vertex => Gl::VERTEX_SHADER,
            ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
        };
        self.gl
            .create_shader(kind)
            .map(|shader| GlShader(self.shaders.insert(shader)))
    }

    fn shader_source(&self, shader: GlShader, source: &str) {
        if let Some(shader) = self.shaders.get(shader.0) {
            self.gl.shader_source(&shader, source);
        }
    }

    fn compile_shader(&self, shader: GlShader) {
        if let Some(shader) = self.shaders.get(shader.0) {
            self.gl.compile_shader(&shader);
        }
    }

    fn shader_compile_status(&self, shader: GlShader) -> bool {
        self.shaders.get(shader.0).is_some_and(|shader| {
            self.gl
                .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
                .as_bool()
                .unwrap_or(false)
        })
    }

    fn shader_info_log(&self, shader: GlShader) -> String {
        self.shaders
            .get(shader.0)
            .and_then(|shader| self.gl.get_shader_info_log(&shader))
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: GlShader) {
        if let Some(shader) = self.shaders.remove(shader.0) {
            self.gl.delete_shader(Some(&shader));
        }
    }

    fn create_program(&self) -> Option<GlProgram> {
        self.gl
            .create_program()
            .map(|program| GlProgram(self.programs.insert(program)))
    }

    fn attach_shader(&self, program: GlProgram, shader: GlShader) {
        if let (Some(program), Some(shader)) =
            (self.programs.get(program.0), self.shaders.get(shader.0))
        {
            self.gl.attach_shader(&program, &shader);
        }
    }

    fn link_program(&self, program: GlProgram) {
        if let Some(program) = self.programs.get(program.0) {
            self.gl.link_program(&program);
        }
    }

    fn program_link_status(&self, program: GlProgram) -> bool {
        self.programs.get(program.0).is_some_and(|program| {
            self.gl
                .get_program_parameter(&program, Gl::LINK_STATUS)
                .as_bool()
                .unwrap_or(false)
        })
    }

    fn program_info_log(&self, program: GlProgram) -> String {
        self.programs
            .get(program.0)
            .and_then(|program| self.gl.get_program_info_log(&program))
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<GlProgram>) {
        let program = program.and_then(|p| self.programs.get(p.0));
        self.gl.use_program(program.as_ref());
    }

    fn delete_program(&self, program: GlProgram) {
        if let Some(program) = self.programs.remove(program.0) {
            self.gl.delete_program(Some(&program));
        }
    }

    fn attrib_location(&self, program: GlProgram, name: &str) -> Option<u32> {
        let program = self.programs.get(program.0)?;
        u32::try_from(self.gl.get_attrib_location(&program, name)).ok()
    }

    fn uniform_location(&self, program: GlProgram, name: &str) -> Option<GlUniform> {
        let program = self.programs.get(program.0)?;
        self.gl
            .get_uniform_location(&program, name)
            .map(|location| GlUniform(self.uniforms.insert(location)))
    }

    fn uniform2f(&self, location: GlUniform, x: f32, y: f32) {
        let location = self.uniforms.get(location.0);
        self.gl.uniform2f(location.as_ref(), x, y);
    }

    fn create_buffer(&self) -> Option<GlBuffer> {
        self.gl
            .create_buffer()
            .map(|buffer| GlBuffer(self.buffers.insert(buffer)))
    }

    fn bind_array_buffer(&self, buffer: Option<GlBuffer>) {
        let buffer = buffer.and_then(|b| self.buffers.get(b.0));
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, buffer.as_ref());
    }

    fn array_buffer_data(&self, data: &[f32]) {
        let array = js_sys::Float32Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &array, Gl::STATIC_DRAW);
    }

    fn delete_buffer(&self, buffer: GlBuffer) {
        if let Some(buffer) = self.buffers.remove(buffer.0) {
            self.gl.delete_buffer(Some(&buffer));
        }
    }

    fn create_vertex_array(&self) -> Option<GlVertexArray> {
        self.gl
            .create_vertex_array()
            .map(|vao| GlVertexArray(self.vertex_arrays.insert(vao)))
    }

    fn bind_vertex_array(&self, vao: Option<GlVertexArray>) {
        let vao = vao.and_then(|v| self.vertex_arrays.get(v.0));
        self.gl.bind_vertex_array(vao.as_ref());
    }

    fn delete_vertex_array(&self, vao: GlVertexArray) {
        if let Some(vao) = self.vertex_arrays.remove(vao.0) {
            self.gl.delete_vertex_array(Some(&vao));
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.gl.enable_vertex_attrib_array(index);
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        self.gl
            .vertex_attrib_pointer_with_i32(index, size, Gl::FLOAT, false, stride, offset);
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.gl.viewport(x, y, width, height);
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.gl.clear_color(r, g, b, a);
    }

    fn clear(&self) {
        self.gl.clear(Gl::COLOR_BUFFER_BIT);
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        self.gl.draw_arrays(Gl::TRIANGLES, first, count);
    }
}
