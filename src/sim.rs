//! Simulation driver: owns the double-buffered field and the two pass
//! programs, and runs the per-tick update sequence.
//!
//! Every tick executes the diffusion pass once; each queued drop request then
//! runs as its own injection pass, in submission order, fully reading the
//! previous pass's output. Every pass swaps the field, so a tick may well end
//! after an odd number of passes; that is fine because each pass is complete
//! in itself.

use std::collections::VecDeque;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::RippleConfig;
use crate::field::PingPongField;
use crate::gpu::GpuContext;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DiffuseParams {
    delta: [f32; 2],
    diffuse: f32,
    decay: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DropParams {
    center: [f32; 2],
    radius: f32,
    strength: f32,
}

/// One queued disturbance. Consumed by exactly one injection pass.
#[derive(Debug, Clone, Copy)]
pub struct DropRequest {
    pub center: [f32; 2],
    pub radius: f32,
    pub strength: f32,
}

/// A compiled pass: pipeline, its uniform buffer, and one bind group per
/// ping-pong orientation. Bind groups are immutable in wgpu, so "point the
/// input at the read texture" means selecting the group matching the field's
/// current read index.
struct PassProgram {
    pipeline: wgpu::RenderPipeline,
    params: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; 2],
}

pub struct RippleSimulation {
    config: RippleConfig,
    field: PingPongField,
    diffuse: PassProgram,
    drop: PassProgram,
    pending: VecDeque<DropRequest>,
}

impl RippleSimulation {
    /// Builds a simulation with the best field format the adapter offers.
    pub fn new(ctx: &GpuContext, config: &RippleConfig) -> anyhow::Result<Self> {
        let format = ctx.pick_field_format()?;
        Self::with_format(ctx, config, format)
    }

    /// Builds a simulation with an explicit field format. Used by tests that
    /// need `Rgba32Float` for direct readback.
    pub fn with_format(
        ctx: &GpuContext,
        config: &RippleConfig,
        format: wgpu::TextureFormat,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        anyhow::ensure!(
            ctx.supports_field_format(format),
            "field format {format:?} is not renderable on this adapter"
        );

        let field = PingPongField::new(&ctx.device, config.grid_width, config.grid_height, format)?;
        log::info!(
            "ripple field {}x{} ({:?})",
            config.grid_width,
            config.grid_height,
            format
        );

        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Ripple Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/ripple.wgsl").into()),
            });

        let diffuse_params = DiffuseParams {
            delta: field.texel_delta(),
            diffuse: config.diffuse_rate,
            decay: config.decay_rate,
        };
        let diffuse_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Diffuse Params"),
                contents: bytemuck::cast_slice(&[diffuse_params]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let drop_params = DropParams {
            center: [0.0, 0.0],
            radius: config.drop_radius,
            strength: config.drop_strength,
        };
        let drop_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Drop Params"),
                contents: bytemuck::cast_slice(&[drop_params]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let diffuse = Self::build_pass(
            ctx,
            &field,
            &shader,
            "diffuse_fs",
            1,
            diffuse_buffer,
            "Diffuse",
        );
        let drop = Self::build_pass(ctx, &field, &shader, "drop_fs", 2, drop_buffer, "Drop");

        Ok(Self {
            config: *config,
            field,
            diffuse,
            drop,
            pending: VecDeque::new(),
        })
    }

    fn build_pass(
        ctx: &GpuContext,
        field: &PingPongField,
        shader: &wgpu::ShaderModule,
        fragment_entry: &str,
        uniform_binding: u32,
        params: wgpu::Buffer,
        label: &str,
    ) -> PassProgram {
        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{label} Bind Group Layout")),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: uniform_binding,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        // One bind group per orientation: index i reads physical target i.
        let bind_groups = [0usize, 1].map(|i| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} Bind Group {i}")),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(field.view(i)),
                    },
                    wgpu::BindGroupEntry {
                        binding: uniform_binding,
                        resource: params.as_entire_binding(),
                    },
                ],
            })
        });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{label} Pipeline Layout")),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{label} Pipeline")),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: "fullscreen_vs",
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: fragment_entry,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: field.format(),
                        // Float32 targets are not blendable; the shaders carry
                        // channels through themselves.
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
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

        PassProgram {
            pipeline,
            params,
            bind_groups,
        }
    }

    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    pub fn field(&self) -> &PingPongField {
        &self.field
    }

    /// The *read* texture for external sampling. Re-query every frame.
    pub fn current_texture(&self) -> &wgpu::Texture {
        self.field.current_texture()
    }

    pub fn current_view(&self) -> &wgpu::TextureView {
        self.field.current_view()
    }

    pub fn read_index(&self) -> usize {
        self.field.read_index()
    }

    /// Queues one drop for the next tick. `x`/`y` are in [-1, 1]. A drop with
    /// a non-positive radius has no visible effect, so it is dropped with a
    /// warning instead of halting the simulation.
    pub fn add_drop(&mut self, x: f32, y: f32, radius: f32, strength: f32) {
        if radius <= 0.0 {
            log::warn!("ignoring drop with non-positive radius {radius}");
            return;
        }
        self.pending.push_back(DropRequest {
            center: [x, y],
            radius,
            strength,
        });
    }

    /// Queues a drop using the configured default radius and strength.
    pub fn add_default_drop(&mut self, x: f32, y: f32) {
        self.add_drop(x, y, self.config.drop_radius, self.config.drop_strength);
    }

    pub fn pending_drops(&self) -> usize {
        self.pending.len()
    }

    /// One simulation tick: diffusion first, then every queued drop in
    /// submission order. Each drop is submitted separately so its uniform
    /// write is ordered with its own draw.
    pub fn tick(&mut self, ctx: &GpuContext) {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Ripple Diffuse"),
            });
        let bind_group = &self.diffuse.bind_groups[self.field.read_index()];
        self.field
            .render_pass(&mut encoder, &self.diffuse.pipeline, bind_group);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        while let Some(request) = self.pending.pop_front() {
            let params = DropParams {
                center: request.center,
                radius: request.radius,
                strength: request.strength,
            };
            ctx.queue
                .write_buffer(&self.drop.params, 0, bytemuck::cast_slice(&[params]));

            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Ripple Drop"),
                });
            let bind_group = &self.drop.bind_groups[self.field.read_index()];
            self.field
                .render_pass(&mut encoder, &self.drop.pipeline, bind_group);
            ctx.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    /// Copies the current *read* target back to host memory as RGBA texels.
    /// Requires the `Rgba32Float` field format so texels map straight onto
    /// `f32` without a half-float decode. Verification/debugging only; the
    /// render loop never reads back.
    pub fn read_field(&self, ctx: &GpuContext) -> anyhow::Result<Vec<[f32; 4]>> {
        anyhow::ensure!(
            self.field.format() == wgpu::TextureFormat::Rgba32Float,
            "field readback requires Rgba32Float, current format is {:?}",
            self.field.format()
        );

        let width = self.field.width();
        let height = self.field.height();
        let bytes_per_texel = 16u32;
        let unpadded_bytes_per_row = width * bytes_per_texel;
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Staging"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Field Readback"),
            });
        encoder.copy_texture_to_buffer(
            self.field.current_texture().as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        pollster::block_on(receiver.receive())
            .ok_or_else(|| anyhow::anyhow!("field readback channel closed"))??;

        let data = buffer_slice.get_mapped_range();
        let mut texels = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            let end = start + unpadded_bytes_per_row as usize;
            texels.extend_from_slice(bytemuck::cast_slice(&data[start..end]));
        }
        drop(data);
        staging.unmap();

        Ok(texels)
    }
}
