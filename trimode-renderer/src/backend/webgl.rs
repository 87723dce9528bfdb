//! WebGL2 rendering backend.
//!
//! Draws through a [`GlContext`]: one linked program with a translation
//! uniform, and a vertex array/buffer pair built on the first frame.

use std::{cell::Cell, rc::Rc};

use trimode_core::{
    interleaved_vertices, BackendOptions, Mode, TranslationHandle, FLOATS_PER_VERTEX,
};

use crate::{
    gl::{GlBuffer, GlContext, GlProgram, GlShader, GlUniform, GlVertexArray, ShaderStage},
    surface::{DrawableSize, Subscriptions, SurfaceContext},
    RenderError, RenderResult, Surface,
};

use super::{install_resize_flag, install_tracker, Lifecycle, RenderBackend};

/// Vertex shader source.
pub const VERTEX_SHADER: &str = r"#version 300 es
in vec2 a_position;
in vec3 a_color;
uniform vec2 u_offset;
out vec3 v_color;

void main() {
    v_color = a_color;
    gl_Position = vec4(a_position + u_offset, 0.0, 1.0);
}
";

/// Fragment shader source.
pub const FRAGMENT_SHADER: &str = r"#version 300 es
precision mediump float;
in vec3 v_color;
out vec4 out_color;

void main() {
    out_color = vec4(v_color, 1.0);
}
";

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const STRIDE_BYTES: i32 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as i32;
const COLOR_OFFSET_BYTES: i32 = 2 * 4;

/// Program and attribute/uniform locations.
struct ProgramState {
    program: GlProgram,
    offset: GlUniform,
    position_attrib: u32,
    color_attrib: u32,
}

/// Geometry objects, created on the first frame.
struct GeometryState {
    vao: GlVertexArray,
    buffer: GlBuffer,
}

/// GL-backed renderer.
pub struct WebGlBackend {
    surface: Rc<dyn Surface>,
    gl: Option<Box<dyn GlContext>>,
    program: Option<ProgramState>,
    geometry: Option<GeometryState>,
    size: DrawableSize,
    translation: TranslationHandle,
    subscriptions: Subscriptions,
    resize_pending: Rc<Cell<bool>>,
    lifecycle: Lifecycle,
    clear_color: [f32; 4],
}

impl WebGlBackend {
    /// Create a new GL backend on `surface`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BackendUnavailable`] if the surface has no GL
    /// context, and [`RenderError::ResourceCreationFailed`] if the program
    /// fails to compile or link.
    pub fn create(
        surface: Rc<dyn Surface>,
        options: BackendOptions,
        clear_color: [f32; 4],
    ) -> RenderResult<Self> {
        let gl = match surface.context(Mode::Rasterized, &options)? {
            SurfaceContext::Rasterized(gl) => gl,
            other => {
                return Err(RenderError::BackendUnavailable(format!(
                    "surface yielded a {} context",
                    other.kind()
                )))
            }
        };

        if gl.is_context_lost() {
            return Err(RenderError::BackendUnavailable(
                "GL context lost before initialization".to_string(),
            ));
        }

        let program = link_program(gl.as_ref())?;

        let translation = TranslationHandle::new();
        let mut subscriptions = Subscriptions::new(Rc::clone(&surface));
        install_tracker(&mut subscriptions, &surface, &translation);
        let resize_pending = install_resize_flag(&mut subscriptions);
        // The first frame sizes the drawing buffer.
        resize_pending.set(true);

        tracing::info!(
            "WebGL2 backend initialized (antialias={}, desynchronized={})",
            options.antialias,
            options.desynchronized
        );

        Ok(Self {
            surface,
            gl: Some(gl),
            program: Some(program),
            geometry: None,
            size: DrawableSize::default(),
            translation,
            subscriptions,
            resize_pending,
            lifecycle: Lifecycle::default(),
            clear_color,
        })
    }

    fn create_geometry(gl: &dyn GlContext, program: &ProgramState) -> RenderResult<GeometryState> {
        let vao = gl.create_vertex_array().ok_or_else(|| {
            RenderError::ResourceCreationFailed("Failed to create vertex array".to_string())
        })?;
        let Some(buffer) = gl.create_buffer() else {
            gl.delete_vertex_array(vao);
            return Err(RenderError::ResourceCreationFailed(
                "Failed to create vertex buffer".to_string(),
            ));
        };

        gl.bind_vertex_array(Some(vao));
        gl.bind_array_buffer(Some(buffer));
        gl.array_buffer_data(&interleaved_vertices());
        gl.enable_vertex_attrib_array(program.position_attrib);
        gl.vertex_attrib_pointer_f32(program.position_attrib, 2, STRIDE_BYTES, 0);
        gl.enable_vertex_attrib_array(program.color_attrib);
        gl.vertex_attrib_pointer_f32(program.color_attrib, 3, STRIDE_BYTES, COLOR_OFFSET_BYTES);
        gl.bind_vertex_array(None);

        tracing::debug!("WebGL2 vertex buffer uploaded");
        Ok(GeometryState { vao, buffer })
    }
}

fn compile_shader(gl: &dyn GlContext, stage: ShaderStage, source: &str) -> RenderResult<GlShader> {
    let shader = gl.create_shader(stage).ok_or_else(|| {
        RenderError::ResourceCreationFailed(format!("Failed to create {stage:?} shader"))
    })?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if gl.shader_compile_status(shader) {
        Ok(shader)
    } else {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        Err(RenderError::ResourceCreationFailed(format!(
            "{stage:?} shader: {log}"
        )))
    }
}

fn link_program(gl: &dyn GlContext) -> RenderResult<ProgramState> {
    let vertex = compile_shader(gl, ShaderStage::Vertex, VERTEX_SHADER)?;
    let fragment = match compile_shader(gl, ShaderStage::Fragment, FRAGMENT_SHADER) {
        Ok(shader) => shader,
        Err(e) => {
            gl.delete_shader(vertex);
            return Err(e);
        }
    };

    let Some(program) = gl.create_program() else {
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
        return Err(RenderError::ResourceCreationFailed(
            "Failed to create program".to_string(),
        ));
    };

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    // The program keeps its own reference to the attached shaders.
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);

    let located = if gl.program_link_status(program) {
        (
            gl.uniform_location(program, "u_offset"),
            gl.attrib_location(program, "a_position"),
            gl.attrib_location(program, "a_color"),
        )
    } else {
        let log = gl.program_info_log(program);
        gl.delete_program(program);
        return Err(RenderError::ResourceCreationFailed(format!(
            "Program link: {log}"
        )));
    };

    match located {
        (Some(offset), Some(position_attrib), Some(color_attrib)) => Ok(ProgramState {
            program,
            offset,
            position_attrib,
            color_attrib,
        }),
        _ => {
            gl.delete_program(program);
            Err(RenderError::ResourceCreationFailed(
                "Program is missing u_offset, a_position or a_color".to_string(),
            ))
        }
    }
}

impl RenderBackend for WebGlBackend {
    fn backend_type(&self) -> Mode {
        Mode::Rasterized
    }

    fn start(&mut self) {
        self.lifecycle.start(Mode::Rasterized);
    }

    fn stop(&mut self) {
        self.lifecycle.stop(Mode::Rasterized);
    }

    fn is_running(&self) -> bool {
        self.lifecycle.running()
    }

    fn dispose(&mut self) {
        if !self.lifecycle.dispose() {
            return;
        }
        self.subscriptions.clear();
        if let Some(gl) = self.gl.take() {
            gl.use_program(None);
            if let Some(geometry) = self.geometry.take() {
                gl.bind_vertex_array(None);
                gl.bind_array_buffer(None);
                gl.delete_buffer(geometry.buffer);
                gl.delete_vertex_array(geometry.vao);
            }
            if let Some(program) = self.program.take() {
                gl.delete_program(program.program);
            }
        }
        tracing::info!("WebGL2 backend disposed");
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle.disposed()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn render(&mut self) -> RenderResult<()> {
        self.lifecycle.ensure_live()?;
        let (Some(gl), Some(program)) = (self.gl.as_deref(), self.program.as_ref()) else {
            return Err(RenderError::Disposed);
        };

        if gl.is_context_lost() {
            return Err(RenderError::Frame("GL context lost".to_string()));
        }

        if self.resize_pending.replace(false) {
            if let Some((width, height)) = self.size.update(self.surface.drawable_size()) {
                self.surface.set_buffer_size(width, height);
                gl.viewport(0, 0, width as i32, height as i32);
                tracing::debug!("WebGL2 viewport resized to {width}x{height}");
            }
        }

        if self.geometry.is_none() {
            self.geometry = Some(Self::create_geometry(gl, program)?);
        }
        let Some(geometry) = self.geometry.as_ref() else {
            return Err(RenderError::Disposed);
        };

        let t = self.translation.get();
        let [r, g, b, a] = self.clear_color;

        gl.use_program(Some(program.program));
        gl.uniform2f(program.offset, t.x, t.y);
        gl.clear_color(r, g, b, a);
        gl.clear();
        gl.bind_vertex_array(Some(geometry.vao));
        gl.draw_triangles(0, 3);
        gl.bind_vertex_array(None);

        self.lifecycle.frame_done();
        tracing::trace!("WebGL2 frame {}", self.lifecycle.frames());
        Ok(())
    }

    fn translation(&self) -> &TranslationHandle {
        &self.translation
    }

    fn frames_rendered(&self) -> u64 {
        self.lifecycle.frames()
    }
}

impl Drop for WebGlBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}
