//! Double-buffered field texture pair.
//!
//! Two equally-configured render targets alternate between the *read* role
//! (current authoritative state, sampled by passes and by the renderer) and
//! the *write* role (next-state scratch). Every completed pass draws one
//! full-screen triangle into *write* while reading *read*, then the roles
//! swap, so *read* always holds the most recently computed complete state.

use anyhow::bail;

struct FieldTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FieldTarget {
    fn new(device: &wgpu::Device, label: &str, size: wgpu::Extent3d, format: wgpu::TextureFormat) -> Self {
        // wgpu zero-initializes textures, which doubles as the flat initial
        // state of the simulation.
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

pub struct PingPongField {
    targets: [FieldTarget; 2],
    read: usize,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl PingPongField {
    /// Allocates both targets at a fixed resolution. The resolution is
    /// immutable for the lifetime of the field.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            bail!("invalid field resolution {width}x{height}");
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let targets = [
            FieldTarget::new(device, "Field Target A", size, format),
            FieldTarget::new(device, "Field Target B", size, format),
        ];
        Ok(Self {
            targets,
            read: 0,
            width,
            height,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Reciprocal texel step in UV space, used by the diffusion pass to find
    /// its four neighbors. Constant because the resolution is immutable.
    pub fn texel_delta(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }

    /// Which physical target currently holds the *read* role (0 or 1). Pass
    /// programs keep one pre-built bind group per orientation and select by
    /// this index.
    pub fn read_index(&self) -> usize {
        self.read
    }

    /// The *read* texture, safe for external sampling. Consumers should
    /// re-query every frame rather than hold a handle across a swap.
    pub fn current_texture(&self) -> &wgpu::Texture {
        &self.targets[self.read].texture
    }

    pub fn current_view(&self) -> &wgpu::TextureView {
        &self.targets[self.read].view
    }

    /// View of a specific physical target, for building per-orientation bind
    /// groups up front.
    pub fn view(&self, index: usize) -> &wgpu::TextureView {
        &self.targets[index].view
    }

    /// Executes one full-screen pass into the *write* target and swaps the
    /// roles. `bind_group` must be the caller's bind group that reads the
    /// current *read* target (i.e. the one built for `read_index()`).
    pub fn render_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
    ) {
        let write = &self.targets[1 - self.read];
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Field Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &write.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Every texel is covered by the triangle, so the
                        // previous scratch contents never survive.
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1); // Full-screen triangle
        }
        self.swap();
    }

    /// Exchanges the read/write roles. Pure bookkeeping, no GPU work.
    pub fn swap(&mut self) {
        self.read = 1 - self.read;
    }
}
