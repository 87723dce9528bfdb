//! The WebGL2 subset used by the rasterized backend.
//!
//! Object handles are small copyable ids; each context implementation maps
//! them to its own objects (for example `WebGlProgram` in browsers).

/// Shader object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlShader(pub u32);

/// Program object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlProgram(pub u32);

/// Buffer object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlBuffer(pub u32);

/// Vertex array object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlVertexArray(pub u32);

/// Uniform location handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlUniform(pub u32);

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

/// Minimal GL entry points, mirroring `WebGL2RenderingContext`.
///
/// `create_*` return `None` when the context cannot allocate the object
/// (typically because the context was lost).
#[allow(missing_docs)]
pub trait GlContext {
    fn is_context_lost(&self) -> bool;

    fn create_shader(&self, stage: ShaderStage) -> Option<GlShader>;
    fn shader_source(&self, shader: GlShader, source: &str);
    fn compile_shader(&self, shader: GlShader);
    fn shader_compile_status(&self, shader: GlShader) -> bool;
    fn shader_info_log(&self, shader: GlShader) -> String;
    fn delete_shader(&self, shader: GlShader);

    fn create_program(&self) -> Option<GlProgram>;
    fn attach_shader(&self, program: GlProgram, shader: GlShader);
    fn link_program(&self, program: GlProgram);
    fn program_link_status(&self, program: GlProgram) -> bool;
    fn program_info_log(&self, program: GlProgram) -> String;
    fn use_program(&self, program: Option<GlProgram>);
    fn delete_program(&self, program: GlProgram);

    fn attrib_location(&self, program: GlProgram, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: GlProgram, name: &str) -> Option<GlUniform>;
    fn uniform2f(&self, location: GlUniform, x: f32, y: f32);

    fn create_buffer(&self) -> Option<GlBuffer>;
    fn bind_array_buffer(&self, buffer: Option<GlBuffer>);
    /// Upload `data` to the bound array buffer with `STATIC_DRAW` usage.
    fn array_buffer_data(&self, data: &[f32]);
    fn delete_buffer(&self, buffer: GlBuffer);

    fn create_vertex_array(&self) -> Option<GlVertexArray>;
    fn bind_vertex_array(&self, vao: Option<GlVertexArray>);
    fn delete_vertex_array(&self, vao: GlVertexArray);
    fn enable_vertex_attrib_array(&self, index: u32);
    /// `vertexAttribPointer(index, size, FLOAT, false, stride, offset)`.
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    /// Clear the color buffer.
    fn clear(&self);
    /// `drawArrays(TRIANGLES, first, count)`.
    fn draw_triangles(&self, first: i32, count: i32);
}
