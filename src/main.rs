// Ripple Field - interactive GPU ripple simulation rendered as a point cloud
// Licensed under MIT License

use std::sync::Arc;
use std::time::Instant;

use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use ripplefield::camera::Camera;
use ripplefield::config::RippleConfig;
use ripplefield::coords::pointer_to_drop_center;
use ripplefield::gpu::GpuContext;
use ripplefield::points::PointCloud;
use ripplefield::sim::RippleSimulation;

/// Orbit radius of the idle-animation drop, in normalized drop space.
const IDLE_ORBIT_RADIUS: f32 = 0.2;

const MIN_CAMERA_Z: f32 = 35.0;
const MAX_CAMERA_Z: f32 = 65.0;

struct State {
    ctx: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    sim: RippleSimulation,
    points: PointCloud,
    camera: Camera,
    start: Instant,
    mouse_over: bool,

    // Performance tracking
    frame_count: u32,
    frame_time_sum: f32,
    last_fps_update: Instant,
}

impl State {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let ctx = GpuContext::new(&instance, Some(&surface)).await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&ctx.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);

        let config = RippleConfig::default();
        let sim = RippleSimulation::new(&ctx, &config)?;

        let camera = Camera::new(surface_config.width as f32 / surface_config.height as f32);
        let points = PointCloud::new(
            &ctx,
            sim.field(),
            surface_format,
            (surface_config.width as f32, surface_config.height as f32),
            camera.world_size().0,
            config.color1,
            config.color2,
        );

        Ok(Self {
            ctx,
            surface,
            surface_config,
            sim,
            points,
            camera,
            start: Instant::now(),
            mouse_over: false,
            frame_count: 0,
            frame_time_sum: 0.0,
            last_fps_update: Instant::now(),
        })
    }

    fn viewport_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height as f32
    }

    /// Maps a pointer position to drop space and queues a default drop there.
    fn pointer_drop(&mut self, x: f32, y: f32) {
        self.mouse_over = true;
        let [cx, cy] = pointer_to_drop_center(
            x,
            y,
            self.surface_config.width as f32,
            self.surface_config.height as f32,
            self.viewport_ratio(),
        );
        self.sim.add_default_drop(cx, cy);
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface
            .configure(&self.ctx.device, &self.surface_config);
        self.camera.aspect = width as f32 / height as f32;
        // The field itself is viewport-independent; only the point mesh and
        // camera care about the new size.
        self.points.regenerate(
            &self.ctx,
            (width as f32, height as f32),
            self.camera.world_size().0,
        );
    }

    fn frame(&mut self, dt: f32) {
        self.frame_count += 1;
        self.frame_time_sum += dt;

        self.camera.ease();

        // While the pointer is away, an automatic drop orbits the center.
        if !self.mouse_over {
            let time = self.start.elapsed().as_secs_f32();
            let x = time.cos() * IDLE_ORBIT_RADIUS;
            let y = time.sin() * IDLE_ORBIT_RADIUS;
            self.sim.add_default_drop(x, y);
        }

        self.sim.tick(&self.ctx);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.points
            .render(&self.ctx, &view, &self.camera, self.sim.read_index());

        output.present();
        Ok(())
    }

    fn update_window_title(&mut self, window: &Window) {
        let elapsed = self.last_fps_update.elapsed();
        if elapsed.as_secs_f32() >= 0.5 && self.frame_count > 0 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            let avg_frame_time_ms = (self.frame_time_sum / self.frame_count as f32) * 1000.0;
            window.set_title(&format!(
                "Ripple Field | {:.0} FPS | {:.2} ms/frame",
                fps, avg_frame_time_ms
            ));
            self.frame_count = 0;
            self.frame_time_sum = 0.0;
            self.last_fps_update = Instant::now();
        }
    }
}

fn main() -> anyhow::Result<()> {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        event_loop.create_window(
            winit::window::WindowAttributes::default()
                .with_title("Ripple Field")
                .with_inner_size(winit::dpi::PhysicalSize::new(1280, 800)),
        )?,
    );

    let mut state = pollster::block_on(State::new(window.clone()))?;
    let mut last_update = Instant::now();
    let mut rng = rand::thread_rng();

    event_loop.run(move |event, control_flow| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => control_flow.exit(),
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(KeyCode::Escape),
                            ..
                        },
                    ..
                } => control_flow.exit(),
                WindowEvent::CursorMoved { position, .. } => {
                    state.pointer_drop(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => {
                    state.mouse_over = false;
                }
                WindowEvent::MouseInput {
                    state: ElementState::Released,
                    button: MouseButton::Left,
                    ..
                } => {
                    state.points.randomize_colors(&mut rng);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let lines = match delta {
                        MouseScrollDelta::LineDelta(_, y) => *y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.02,
                    };
                    state.camera.target_z =
                        (state.camera.target_z - lines * 2.0).clamp(MIN_CAMERA_Z, MAX_CAMERA_Z);
                }
                WindowEvent::Touch(touch) => match touch.phase {
                    TouchPhase::Started | TouchPhase::Moved => {
                        state.pointer_drop(touch.location.x as f32, touch.location.y as f32);
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        state.mouse_over = false;
                    }
                },
                WindowEvent::Resized(physical_size) => {
                    state.resize(physical_size.width, physical_size.height);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_update).as_secs_f32();
                    last_update = now;

                    state.frame(dt);
                    state.update_window_title(&window);

                    match state.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => {
                            state
                                .surface
                                .configure(&state.ctx.device, &state.surface_config);
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("out of GPU memory, exiting");
                            control_flow.exit();
                        }
                        Err(e) => log::error!("render error: {e:?}"),
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
