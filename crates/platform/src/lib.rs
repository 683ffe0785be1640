//! Platform layer: windowing & event loop driving the renderer.
//!
//! - Redraws continuously; animation and the clock stop while paused.
//! - Proper handling of resize/scale/close and surface loss.
//! - OBJ files load on worker threads and join the scene as they finish.

pub mod controls;
pub mod loading;
pub mod scene;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use renderer::{GpuState, SceneView};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::controls::{Command, SceneControls};
use crate::loading::ModelLoader;
use crate::scene::Scene;

/// Pixels of trackpad scroll treated as one wheel line.
const PIXELS_PER_LINE: f64 = 40.0;

/// Everything the command line can configure.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    pub obj_paths: Vec<PathBuf>,
    /// Diffuse texture for the procedural planet.
    pub texture: Option<PathBuf>,
    pub sphere_bands: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            show_fps: false,
            width: 1280,
            height: 720,
            obj_paths: Vec::new(),
            texture: None,
            sphere_bands: 32,
        }
    }
}

/// Open the window and run until it is closed.
pub fn run_with_renderer(options: RunOptions) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = Viewer::new(options);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow!("Event loop error: {e:?}"))?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Frames per interval, reported once per second.
#[derive(Debug)]
pub struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self { frames: 0, since: now }
    }

    /// Count one frame; returns the rate once a second has passed.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.since);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}

struct Viewer {
    options: RunOptions,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    scene: Scene,
    controls: SceneControls,
    loader: Option<ModelLoader>,
    last_frame: Instant,
    fps: FpsCounter,
    fatal: Option<anyhow::Error>,
}

impl Viewer {
    fn new(options: RunOptions) -> Self {
        let now = Instant::now();
        Self {
            options,
            window: None,
            gpu: None,
            scene: Scene::new(),
            controls: SceneControls::default(),
            loader: None,
            last_frame: now,
            fps: FpsCounter::new(now),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Orrery")
            .with_inner_size(PhysicalSize::new(self.options.width, self.options.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let mut gpu = pollster::block_on(GpuState::new(window.clone(), self.options.backends))?;
        self.scene.populate(&mut gpu, &self.options)?;
        if !self.options.obj_paths.is_empty() {
            self.loader = Some(ModelLoader::spawn(self.options.obj_paths.clone()));
        }

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.last_frame = Instant::now();
        Ok(())
    }

    /// Move finished OBJ loads into the scene.
    fn collect_models(&mut self) {
        let (Some(loader), Some(gpu)) = (self.loader.as_mut(), self.gpu.as_mut()) else {
            return;
        };
        for model in loader.drain() {
            let label = model.path.display().to_string();
            match model.result {
                Ok(loaded) => {
                    for diagnostic in &loaded.diagnostics {
                        log::warn!("{label}: {diagnostic}");
                    }
                    match self.scene.add_model(gpu, &label, &loaded.mesh, &loaded.base_dir) {
                        Ok(_) => log::info!(
                            "{label}: {} triangles in {} group(s)",
                            loaded.mesh.triangle_count(),
                            loaded.mesh.material_groups().len()
                        ),
                        Err(err) => log::error!("{label}: {err:#}"),
                    }
                }
                Err(err) => log::error!("{label}: {err:#}"),
            }
        }
        if loader.outstanding() == 0 {
            self.loader = None;
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.controls.advance(dt);
        if !self.controls.paused {
            self.scene.world.system_spin(dt);
        }

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.release_unreferenced(&self.scene.world);
        let view = SceneView {
            camera: self.controls.orbit.camera(gpu.aspect()),
            time_of_day: self.controls.time_of_day,
            light_distance: self.controls.light_distance,
        };
        match gpu.render(&self.scene.world, &view) {
            Ok(()) => {
                gpu.take_settled_textures();
            }
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("Surface lost/outdated, reconfiguring");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("GPU out of memory while presenting"));
                return;
            }
            Err(err) => log::warn!("Frame skipped: {err}"),
        }

        if self.options.show_fps {
            if let Some(fps) = self.fps.tick(now) {
                log::info!("FPS: {fps:.1}");
                if let Some(window) = &self.window {
                    window.set_title(&format!("Orrery ({fps:.0} fps)"));
                }
            }
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {scale_factor:.3}");
                if let (Some(gpu), Some(window)) = (self.gpu.as_mut(), &self.window) {
                    let size = window.inner_size();
                    gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.controls.set_dragging(state == ElementState::Pressed),
            WindowEvent::CursorMoved { position, .. } => {
                self.controls.cursor_moved(position.x, position.y)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
                };
                self.controls.scroll(lines);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let Some(command) = Command::from_key(event.logical_key.as_ref()) {
                    self.controls.apply(command);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.collect_models();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_reports_once_per_second() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        assert_eq!(fps.tick(start + Duration::from_millis(500)), None);
        let rate = fps.tick(start + Duration::from_secs(2)).expect("a second passed");
        assert!((rate - 1.0).abs() < 1e-4);
        assert_eq!(fps.tick(start + Duration::from_millis(2100)), None);
    }

    #[test]
    fn default_options_match_cli_defaults() {
        let o = RunOptions::default();
        assert_eq!((o.width, o.height), (1280, 720));
        assert_eq!(o.sphere_bands, 32);
        assert!(o.obj_paths.is_empty());
    }
}
