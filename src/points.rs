//! Point-cloud visualization of the field.
//!
//! One point per ~3 screen pixels, laid out on the z=0 plane and regenerated
//! whenever the viewport changes. The vertex shader lifts each point by the
//! field's red channel and blends the two color stops; points are drawn as
//! instanced quads cut to circles in the fragment shader (there is no point
//! size in wgpu).

use bytemuck::{Pod, Zeroable};
use rand::Rng;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::field::PingPongField;
use crate::gpu::GpuContext;

/// Screen-space spacing between neighboring points, in pixels.
const POINT_SPACING_PX: f32 = 3.0;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub size: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    color1: [f32; 4],
    color2: [f32; 4],
}

/// Builds the instance grid for a viewport of `viewport_w` x `viewport_h`
/// device pixels, spanning `world_w` world units of the z=0 plane (one point
/// per `POINT_SPACING_PX` device pixels on both axes).
///
/// UVs crop the square field texture to the viewport aspect so ripples are
/// not stretched: the longer axis spans the full texture, the shorter axis a
/// centered band of it.
pub fn generate_grid(viewport_w: f32, viewport_h: f32, world_w: f32) -> Vec<PointInstance> {
    let wsize = POINT_SPACING_PX * world_w / viewport_w;
    let nx = (viewport_w / POINT_SPACING_PX).floor() as u32 + 1;
    let ny = (viewport_h / POINT_SPACING_PX).floor() as u32 + 1;
    let ox = -wsize * (nx as f32 / 2.0 - 0.5);
    let oy = -wsize * (ny as f32 / 2.0 - 0.5);

    let grid_ratio = viewport_w / viewport_h;
    let (uvx, uvdx, uvy, uvdy) = if grid_ratio >= 1.0 {
        (
            0.0,
            1.0 / nx as f32,
            (1.0 - 1.0 / grid_ratio) / 2.0,
            1.0 / ny as f32 / grid_ratio,
        )
    } else {
        (
            (1.0 - grid_ratio) / 2.0,
            grid_ratio / nx as f32,
            0.0,
            1.0 / ny as f32,
        )
    };

    let mut instances = Vec::with_capacity((nx * ny) as usize);
    for i in 0..nx {
        let x = ox + i as f32 * wsize;
        for j in 0..ny {
            let y = oy + j as f32 * wsize;
            instances.push(PointInstance {
                position: [x, y, 0.0],
                uv: [uvx + i as f32 * uvdx, uvy + j as f32 * uvdy],
                size: wsize * 0.5,
            });
        }
    }
    instances
}

pub struct PointCloud {
    pipeline: wgpu::RenderPipeline,
    scene_buffer: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; 2],
    instances: wgpu::Buffer,
    num_instances: u32,
    color1: [f32; 3],
    color2: [f32; 3],
}

impl PointCloud {
    pub fn new(
        ctx: &GpuContext,
        field: &PingPongField,
        surface_format: wgpu::TextureFormat,
        viewport: (f32, f32),
        world_width: f32,
        color1: [f32; 3],
        color2: [f32; 3],
    ) -> Self {
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Points Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/points.wgsl").into()),
            });

        // Rgba32Float fields are not filterable without an extra feature;
        // everything else gets smooth height sampling.
        let filterable = field.format() != wgpu::TextureFormat::Rgba32Float;
        let filter_mode = if filterable {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let scene_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Uniform"),
                contents: bytemuck::cast_slice(&[SceneUniform::zeroed()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Points Bind Group Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Sampler(if filterable {
                                wgpu::SamplerBindingType::Filtering
                            } else {
                                wgpu::SamplerBindingType::NonFiltering
                            }),
                            count: None,
                        },
                    ],
                });

        // The field swaps every pass, so keep a bind group per target and
        // pick by the field's read index at render time.
        let bind_groups = [0usize, 1].map(|i| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Points Bind Group {i}")),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: scene_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(field.view(i)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Points Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Points Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<PointInstance>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x2,
                            2 => Float32,
                        ],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let grid = generate_grid(viewport.0, viewport.1, world_width);
        let num_instances = grid.len() as u32;
        let instances = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Point Instances"),
                contents: bytemuck::cast_slice(&grid),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Self {
            pipeline,
            scene_buffer,
            bind_groups,
            instances,
            num_instances,
            color1,
            color2,
        }
    }

    /// Rebuilds the instance grid for a new viewport/world extent.
    pub fn regenerate(&mut self, ctx: &GpuContext, viewport: (f32, f32), world_width: f32) {
        let grid = generate_grid(viewport.0, viewport.1, world_width);
        self.num_instances = grid.len() as u32;
        self.instances = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Point Instances"),
                contents: bytemuck::cast_slice(&grid),
                usage: wgpu::BufferUsages::VERTEX,
            });
    }

    /// Picks two fresh random color stops. Bound to mouse release.
    pub fn randomize_colors(&mut self, rng: &mut impl Rng) {
        self.color1 = [rng.gen(), rng.gen(), rng.gen()];
        self.color2 = [rng.gen(), rng.gen(), rng.gen()];
    }

    /// Draws the cloud into `target`, sampling the field's current *read*
    /// texture (`read_index` must come from the field this frame).
    pub fn render(
        &self,
        ctx: &GpuContext,
        target: &wgpu::TextureView,
        camera: &Camera,
        read_index: usize,
    ) {
        let scene = SceneUniform {
            view_proj: camera.view_proj().to_cols_array_2d(),
            color1: [self.color1[0], self.color1[1], self.color1[2], 1.0],
            color2: [self.color2[0], self.color2[1], self.color2[2], 1.0],
        };
        ctx.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[scene]));

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Points Render"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Points Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_groups[read_index], &[]);
            pass.set_vertex_buffer(0, self.instances.slice(..));
            pass.draw(0..4, 0..self.num_instances);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_the_viewport() {
        let grid = generate_grid(300.0, 300.0, 30.0);
        let nx = (300.0f32 / POINT_SPACING_PX).floor() as usize + 1;
        assert_eq!(grid.len(), nx * nx);

        // Centered on the origin.
        let sum_x: f64 = grid.iter().map(|p| p.position[0] as f64).sum();
        let sum_y: f64 = grid.iter().map(|p| p.position[1] as f64).sum();
        assert!(sum_x.abs() < 1e-2);
        assert!(sum_y.abs() < 1e-2);
    }

    #[test]
    fn uvs_stay_in_unit_range() {
        for (w, h) in [(640.0, 480.0), (480.0, 640.0), (512.0, 512.0)] {
            let grid = generate_grid(w, h, 40.0);
            for p in &grid {
                assert!((0.0..=1.0).contains(&p.uv[0]), "u out of range: {}", p.uv[0]);
                assert!((0.0..=1.0).contains(&p.uv[1]), "v out of range: {}", p.uv[1]);
            }
        }
    }

    #[test]
    fn wide_viewport_crops_v_band() {
        // Aspect 2:1 leaves a centered band of v untouched.
        let grid = generate_grid(600.0, 300.0, 60.0);
        let min_v = grid.iter().map(|p| p.uv[1]).fold(f32::INFINITY, f32::min);
        assert!((min_v - 0.25).abs() < 0.05, "band should start near 0.25, got {min_v}");
    }
}
