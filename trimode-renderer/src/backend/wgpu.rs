//! WebGPU/wgpu rendering backend.
//!
//! This is the primary high-performance backend. It owns an instance, a
//! presentable surface, a device/queue pair, a render pipeline with a
//! translation uniform, and a vertex buffer created on the first frame.

use std::{cell::Cell, rc::Rc};

use bytemuck::{Pod, Zeroable};
use trimode_core::{BackendOptions, Mode, Translation, TranslationHandle, TRIANGLE};
use wgpu::util::DeviceExt;

use crate::{
    surface::{DrawableSize, Subscriptions, SurfaceContext},
    RenderError, RenderResult, Surface,
};

use super::{install_resize_flag, install_tracker, Lifecycle, RenderBackend};

const SHADER: &str = r"
struct Uniforms {
    offset: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position + uniforms.offset, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
";

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct TranslationUniform {
    offset: [f32; 2],
    // Uniform buffers are bound in 16-byte blocks.
    _padding: [f32; 2],
}

impl From<Translation> for TranslationUniform {
    fn from(t: Translation) -> Self {
        Self {
            offset: [t.x, t.y],
            _padding: [0.0; 2],
        }
    }
}

fn instance_backends() -> wgpu::Backends {
    if cfg!(target_arch = "wasm32") {
        wgpu::Backends::BROWSER_WEBGPU
    } else {
        wgpu::Backends::PRIMARY
    }
}

fn power_preference(options: &BackendOptions) -> wgpu::PowerPreference {
    if options.high_performance {
        wgpu::PowerPreference::HighPerformance
    } else {
        wgpu::PowerPreference::LowPower
    }
}

/// Device objects; `None` on the backend once disposed.
struct GpuState {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    size: DrawableSize,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: Option<wgpu::Buffer>,
}

impl GpuState {
    /// Reconfigure the surface if the drawable size changed.
    fn resize_to(&mut self, surface: &dyn Surface) {
        if let Some((width, height)) = self.size.update(surface.drawable_size()) {
            self.config.width = width;
            self.config.height = height;
            self.target.configure(&self.device, &self.config);
            surface.set_buffer_size(width, height);
            tracing::debug!("wgpu surface reconfigured to {width}x{height}");
        }
    }
}

/// wgpu-based GPU renderer.
pub struct WgpuBackend {
    surface: Rc<dyn Surface>,
    gpu: Option<GpuState>,
    translation: TranslationHandle,
    subscriptions: Subscriptions,
    resize_pending: Rc<Cell<bool>>,
    lifecycle: Lifecycle,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    /// Create a new wgpu backend on `surface`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BackendUnavailable`] if the surface has no
    /// accelerated context or no adapter/device can be obtained, and
    /// [`RenderError::ResourceCreationFailed`] if the pipeline fails
    /// validation.
    pub async fn create(
        surface: Rc<dyn Surface>,
        options: BackendOptions,
        clear_color: [f32; 4],
    ) -> RenderResult<Self> {
        let target = match surface.context(Mode::Accelerated, &options)? {
            SurfaceContext::Accelerated(target) => target,
            other => {
                return Err(RenderError::BackendUnavailable(format!(
                    "surface yielded a {} context",
                    other.kind()
                )))
            }
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: instance_backends(),
            ..Default::default()
        });

        let gpu_surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::BackendUnavailable(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power_preference(&options),
                compatible_surface: Some(&gpu_surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| {
                RenderError::BackendUnavailable("No suitable GPU adapter found".to_string())
            })?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Trimode Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::BackendUnavailable(e.to_string()))?;

        tracing::info!(
            "wgpu backend using adapter: {:?}",
            adapter.get_info().name
        );

        let caps = gpu_surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                RenderError::BackendUnavailable("Surface reports no texture formats".to_string())
            })?;

        let (width, height) = surface.drawable_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        gpu_surface.configure(&device, &config);
        surface.set_buffer_size(width, height);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let (pipeline, uniform_buffer, bind_group) = Self::build_pipeline(&device, format);
        if let Some(err) = device.pop_error_scope().await {
            return Err(RenderError::ResourceCreationFailed(err.to_string()));
        }

        let translation = TranslationHandle::new();
        let mut subscriptions = Subscriptions::new(Rc::clone(&surface));
        install_tracker(&mut subscriptions, &surface, &translation);
        let resize_pending = install_resize_flag(&mut subscriptions);

        Ok(Self {
            surface,
            gpu: Some(GpuState {
                device,
                queue,
                target: gpu_surface,
                config,
                size: DrawableSize::configured(width, height),
                pipeline,
                uniform_buffer,
                bind_group,
                vertex_buffer: None,
            }),
            translation,
            subscriptions,
            resize_pending,
            lifecycle: Lifecycle::default(),
            clear_color: wgpu::Color {
                r: f64::from(clear_color[0]),
                g: f64::from(clear_color[1]),
                b: f64::from(clear_color[2]),
                a: f64::from(clear_color[3]),
            },
        })
    }

    fn build_pipeline(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> (wgpu::RenderPipeline, wgpu::Buffer, wgpu::BindGroup) {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("translation_uniform"),
            contents: bytemuck::bytes_of(&TranslationUniform::from(Translation::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("translation_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("translation_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("triangle_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("triangle_shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("triangle_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<trimode_core::Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x2,
                        1 => Float32x3,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, uniform_buffer, bind_group)
    }
}

impl RenderBackend for WgpuBackend {
    fn backend_type(&self) -> Mode {
        Mode::Accelerated
    }

    fn start(&mut self) {
        self.lifecycle.start(Mode::Accelerated);
    }

    fn stop(&mut self) {
        self.lifecycle.stop(Mode::Accelerated);
    }

    fn is_running(&self) -> bool {
        self.lifecycle.running()
    }

    fn dispose(&mut self) {
        if !self.lifecycle.dispose() {
            return;
        }
        self.subscriptions.clear();
        if let Some(gpu) = self.gpu.take() {
            if let Some(buffer) = &gpu.vertex_buffer {
                buffer.destroy();
            }
            gpu.uniform_buffer.destroy();
            gpu.device.destroy();
        }
        tracing::info!("wgpu backend disposed");
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle.disposed()
    }

    fn render(&mut self) -> RenderResult<()> {
        self.lifecycle.ensure_live()?;
        let gpu = self.gpu.as_mut().ok_or(RenderError::Disposed)?;

        if self.resize_pending.replace(false) {
            gpu.resize_to(self.surface.as_ref());
        }

        let uniform = TranslationUniform::from(self.translation.get());
        gpu.queue
            .write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let device = &gpu.device;
        let vertex_buffer = gpu.vertex_buffer.get_or_insert_with(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("triangle_vertices"),
                contents: bytemuck::cast_slice(&TRIANGLE),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let frame = match gpu.target.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("wgpu surface lost or outdated, reconfiguring");
                gpu.target.configure(&gpu.device, &gpu.config);
                return Ok(());
            }
            Err(e) => return Err(RenderError::Frame(e.to_string())),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("triangle_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("triangle_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&gpu.pipeline);
            pass.set_bind_group(0, &gpu.bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.draw(0..3, 0..1);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.lifecycle.frame_done();

        tracing::trace!("wgpu frame {}", self.lifecycle.frames());
        Ok(())
    }

    fn translation(&self) -> &TranslationHandle {
        &self.translation
    }

    fn frames_rendered(&self) -> u64 {
        self.lifecycle.frames()
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_is_one_block() {
        assert_eq!(std::mem::size_of::<TranslationUniform>(), 16);
        let uniform = TranslationUniform::from(Translation { x: 0.25, y: -0.25 });
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniform));
        assert_eq!(floats, &[0.25, -0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_power_preference_follows_option() {
        let mut options = BackendOptions::default();
        assert_eq!(power_preference(&options), wgpu::PowerPreference::LowPower);
        options.high_performance = true;
        assert_eq!(
            power_preference(&options),
            wgpu::PowerPreference::HighPerformance
        );
    }

    #[test]
    fn test_shader_declares_entry_points() {
        assert!(SHADER.contains("fn vs_main"));
        assert!(SHADER.contains("fn fs_main"));
        assert!(SHADER.contains("uniforms.offset"));
    }
}
