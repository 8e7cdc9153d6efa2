//! Interactive window host.
//!
//! Opens a window, runs one [`FrameDriver`] frame per redraw on the GPU
//! substrate, and draws the current grid with [`PointRenderer`]. Moving the
//! mouse or dragging fingers emits particles; `D` dumps the current grid to a
//! PNG in the working directory; `Escape` quits.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::KeyCode,
    window::{Window, WindowId},
};

use crate::config::SimulationConfig;
use crate::debug;
use crate::driver::FrameDriver;
use crate::encoding::GridLayout;
use crate::error::{DebugError, GpuError, SimulationError};
use crate::gpu::{GpuContext, GpuSubstrate, PointRenderer};
use crate::input::Input;
use crate::system::ParticleSystem;

const TITLE: &str = "texel-particles";
const TITLE_REFRESH_FRAMES: u64 = 30;

/// Open a window and run the simulation until it is closed.
pub fn run(config: SimulationConfig) -> Result<(), SimulationError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct WindowState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    driver: FrameDriver<GpuSubstrate>,
    renderer: PointRenderer,
}

impl WindowState {
    async fn new(window: Arc<Window>, config: &SimulationConfig) -> Result<Self, SimulationError> {
        let size = window.inner_size();
        let layout = GridLayout::new(config.capacity)?;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(GpuError::from)?;
        let context = GpuContext::new(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&context.adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(caps.formats[0]);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &surface_config);

        let renderer = PointRenderer::new(&context.device, format, &layout);
        let substrate = GpuSubstrate::new(context, &layout)?;
        let system = ParticleSystem::new(substrate, config)?;

        Ok(Self {
            window,
            surface,
            surface_config,
            driver: FrameDriver::new(system, config),
            renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        let device = &self.driver.system().substrate().context().device;
        self.surface.configure(device, &self.surface_config);
    }

    fn frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let report = self.driver.frame();

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let system = self.driver.system();
        let context = system.substrate().context();
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.renderer.draw(
            &context.device,
            &context.queue,
            &mut encoder,
            &view,
            system.current_state_grid(),
            glam::UVec2::new(self.surface_config.width, self.surface_config.height),
        );
        context.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if report.frame % TITLE_REFRESH_FRAMES == 0 {
            self.window.set_title(&format!(
                "{TITLE} | {:.0} fps | cursor {}",
                self.driver.time().fps(),
                system.cursor().index()
            ));
        }
        Ok(())
    }

    fn dump_grid(&self) -> Result<(), DebugError> {
        let system = self.driver.system();
        let grid = system
            .substrate()
            .read_grid(system.current_state_grid())?;
        debug::save_png(&grid, format!("state-grid-{:06}.png", system.steps()))
    }
}

struct App {
    config: SimulationConfig,
    state: Option<WindowState>,
    input: Input,
    error: Option<SimulationError>,
}

impl App {
    fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            state: None,
            input: Input::default(),
            error: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.error = Some(err.into());
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);

        match pollster::block_on(WindowState::new(window.clone(), &self.config)) {
            Ok(state) => {
                window.request_redraw();
                self.state = Some(state);
            }
            Err(err) => {
                log::error!("Initialization failed: {err}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        if let Some(pointer) = self.input.handle_event(&event) {
            let viewport = self.input.window_size();
            state.driver.pointer_event(&pointer, viewport);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput { .. } => {
                if self.input.key_pressed(KeyCode::Escape) {
                    event_loop.exit();
                }
                if self.input.key_pressed(KeyCode::KeyD) {
                    if let Err(err) = state.dump_grid() {
                        log::warn!("Grid dump failed: {err}");
                    }
                }
                self.input.begin_frame();
            }
            WindowEvent::RedrawRequested => {
                match state.frame() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (w, h) = (state.surface_config.width, state.surface_config.height);
                        state.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Surface out of memory");
                        event_loop.exit();
                    }
                    Err(err) => log::warn!("Surface error: {err:?}"),
                }
                state.window.request_redraw();
            }
            _ => {}
        }
    }
}
