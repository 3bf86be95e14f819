use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::palette::{self, PaletteTexture};
use crate::runtime::TimeSample;
use crate::types::SurfaceConfig;

use super::context::GpuContext;
use super::pipeline::FieldPipeline;
use super::uniforms::FieldUniforms;

/// Aggregates every GPU resource needed to present a frame.
///
/// The layout mirrors the lifetime relationship between objects:
///
/// ```text
///   Target ─▶ GpuContext (surface ─▶ device ─▶ queue)
///                 │
///                 ├─▶ FieldPipeline
///                 ├─▶ uniform buffer / bind group
///                 └─▶ palette texture / bind group
/// ```
///
/// Dropping the state releases everything in reverse order; no draw call can
/// outlive it because the render loop owns the state exclusively.
pub(crate) struct GpuState {
    context: GpuContext,
    pipeline: FieldPipeline,
    multisample_target: Option<MultisampleTarget>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    palette_bind_group: wgpu::BindGroup,
    _palette: PaletteTexture,
    uniforms: FieldUniforms,
    last_log_time: Instant,
}

impl GpuState {
    /// Creates a fully initialised render state for the target surface.
    ///
    /// Adapter, device, pipeline, palette, and the seeded uniform buffer are
    /// all acquired synchronously; any failure aborts the mount before the
    /// render loop ever starts.
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        config: &SurfaceConfig,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(
            target,
            initial_size,
            config.antialiasing,
            config.surface_alpha,
        )?;
        let pipeline =
            FieldPipeline::new(&context.device, context.surface_format, context.sample_count)?;

        let stops = palette::resolve_stops(&config.palette_stops);
        let palette = palette::create_texture(&context.device, &context.queue, &stops);
        let palette_bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("palette bind group"),
            layout: &pipeline.palette_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&palette.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&palette.sampler),
                },
            ],
        });

        let uniforms = FieldUniforms::new(context.size.width, context.size.height, &config.effect);
        let uniform_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniform buffer"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let uniform_bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &pipeline.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let multisample_target = MultisampleTarget::for_context(&context);

        Ok(Self {
            context,
            pipeline,
            multisample_target,
            uniform_buffer,
            uniform_bind_group,
            palette_bind_group,
            _palette: palette,
            uniforms,
            last_log_time: Instant::now(),
        })
    }

    /// Current backing-store size.
    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Resizes the swapchain and updates the resolution uniform so the next
    /// rendered frame already sees the new dimensions.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
        self.multisample_target = MultisampleTarget::for_context(&self.context);
        self.uniforms
            .set_resolution(self.context.size.width as f32, self.context.size.height as f32);
    }

    /// Designated write path for the mouse uniform; only the render loop
    /// driver calls this.
    pub(crate) fn set_mouse(&mut self, position: [f32; 2]) {
        self.uniforms.set_mouse(position);
    }

    /// Uploads the uniform block and submits one frame.
    pub(crate) fn render(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        self.uniforms.update_time(sample);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        let (attachment_view, resolve_target) = match &self.multisample_target {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("field pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &self.palette_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        let now = Instant::now();
        if now.duration_since(self.last_log_time) >= Duration::from_secs(1) {
            tracing::debug!(
                time = self.uniforms.timing[0],
                mouse_x = self.uniforms.mouse[0],
                mouse_y = self.uniforms.mouse[1],
                width = self.context.size.width,
                height = self.context.size.height,
                "frame presented"
            );
            self.last_log_time = now;
        }

        Ok(())
    }
}

/// Optional multisample color buffer when MSAA is enabled.
struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn for_context(context: &GpuContext) -> Option<Self> {
        if context.sample_count <= 1 {
            return None;
        }

        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: wgpu::Extent3d {
                width: context.size.width.max(1),
                height: context.size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: context.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: context.surface_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Some(Self {
            _texture: texture,
            view,
        })
    }
}
