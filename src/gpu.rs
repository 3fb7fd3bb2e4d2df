//! GPU context acquisition and capability probing.

use anyhow::{anyhow, Context};

/// Field texture formats in preference order. Half-float is the
/// precision/bandwidth sweet spot; full float is the high-precision option
/// and the one tests read back directly.
const PREFERRED_FIELD_FORMATS: [wgpu::TextureFormat; 2] = [
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba32Float,
];

/// Degraded fallback when no floating-point format is renderable. Energy
/// clamps to [0, 1] but the simulation still runs.
const FALLBACK_FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Owns the wgpu device/queue pair for one session. Every component borrows
/// this instead of keeping its own device handle.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub async fn new(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> anyhow::Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                ..Default::default()
            })
            .await
            .ok_or_else(|| anyhow!("no suitable GPU adapter found"))?;

        let info = adapter.get_info();
        log::info!("using adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Ripple Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("failed to acquire GPU device")?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Surface-less context for tests and offscreen use. Returns `None` when
    /// the host has no usable adapter so callers can skip instead of failing.
    pub fn headless() -> Option<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        pollster::block_on(Self::new(&instance, None)).ok()
    }

    /// Whether `format` can back a field target (rendered into and sampled).
    pub fn supports_field_format(&self, format: wgpu::TextureFormat) -> bool {
        let features = self.adapter.get_texture_format_features(format);
        features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING)
    }

    /// Picks the field texture format: floating point when available, the
    /// normalized fallback otherwise, and an error when the GPU supports
    /// neither.
    pub fn pick_field_format(&self) -> anyhow::Result<wgpu::TextureFormat> {
        for format in PREFERRED_FIELD_FORMATS {
            if self.supports_field_format(format) {
                return Ok(format);
            }
        }
        if self.supports_field_format(FALLBACK_FIELD_FORMAT) {
            log::warn!(
                "no floating-point render target support; falling back to {:?}",
                FALLBACK_FIELD_FORMAT
            );
            return Ok(FALLBACK_FIELD_FORMAT);
        }
        anyhow::bail!("GPU supports neither floating-point nor normalized field textures")
    }
}
