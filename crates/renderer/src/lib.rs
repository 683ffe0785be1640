//! Renderer: wgpu surface + depth, shader programs and renderable resources.
//! wgpu = 26.x, winit = 0.30.x

pub mod context;
pub mod error;
pub mod layouts;
pub mod renderable;
pub mod shader;
pub mod texture;
pub mod uniforms;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use asset::{Mesh, MeshSource};
use corelib::camera::Camera;
use corelib::ecs::{ResourceId, World};
use wgpu::{
    CommandEncoderDescriptor, CompositeAlphaMode, DeviceDescriptor, Extent3d, Features, Instance,
    InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference, PresentMode,
    RenderPassColorAttachment, RenderPassDescriptor, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use layouts::DEPTH_FORMAT;
pub use renderable::{PackedIndices, RenderableResource, pack_indices};
pub use shader::{AttributeSlots, ShaderProgram, VertexInput, reflect_attributes};
pub use texture::DeferredTexture;
pub use uniforms::{FrameUniforms, MaterialUniform};

const SHADER_PRELUDE: &str = include_str!("shaders/common.wgsl");
const LIT_SHADER: &str = include_str!("shaders/lit.wgsl");
const TEXTURED_SHADER: &str = include_str!("shaders/textured.wgsl");

/// Built-in programs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramKind {
    /// Positions and normals, flat material colour.
    Lit,
    /// Adds uvs and samples the group's diffuse texture.
    Textured,
}

/// Per-frame inputs the scene shares across all resources.
#[derive(Clone, Copy, Debug)]
pub struct SceneView {
    pub camera: Camera,
    /// Fraction of a day in [0, 1).
    pub time_of_day: f32,
    pub light_distance: f32,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device, queue and shared layouts
    gpu: GpuContext,

    // Programs & resources
    lit: Arc<ShaderProgram>,
    textured: Arc<ShaderProgram>,
    resources: HashMap<ResourceId, RenderableResource>,
    next_resource: u32,
    awaiting_textures: HashSet<ResourceId>,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends) -> RenderResult<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::Init(format!("create_surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Init(format!("no suitable GPU adapter: {e}")))?;
        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Orrery Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| RenderError::Init(format!("request_device: {e}")))?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::Init("surface reports no formats".into()))?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);
        let gpu = GpuContext::new(device, queue, surface_format);

        let lit = ShaderProgram::compile(&gpu, "lit", &[SHADER_PRELUDE, LIT_SHADER].concat())?;
        let textured = ShaderProgram::compile(
            &gpu,
            "textured",
            &[SHADER_PRELUDE, TEXTURED_SHADER].concat(),
        )?;

        Ok(Self {
            surface,
            surface_config,
            gpu,
            lit,
            textured,
            resources: HashMap::new(),
            next_resource: 0,
            awaiting_textures: HashSet::new(),
            depth_view,
            width,
            height,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn program(&self, kind: ProgramKind) -> Arc<ShaderProgram> {
        match kind {
            ProgramKind::Lit => Arc::clone(&self.lit),
            ProgramKind::Textured => Arc::clone(&self.textured),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Upload `mesh` and register it under a fresh id.
    pub fn add_mesh(&mut self, label: &str, mesh: &Mesh, kind: ProgramKind) -> RenderResult<ResourceId> {
        let resource = RenderableResource::create(&self.gpu, label, mesh, self.program(kind))?;
        Ok(self.insert(resource))
    }

    /// Build a mesh from `source`, upload it and start decoding its
    /// textures relative to `base_dir`.
    pub fn add_source(
        &mut self,
        label: &str,
        source: &dyn MeshSource,
        kind: ProgramKind,
        base_dir: &Path,
    ) -> RenderResult<ResourceId> {
        let resource =
            RenderableResource::from_source(&self.gpu, label, source, self.program(kind))?;
        let id = self.insert(resource);
        self.request_textures(id, base_dir);
        Ok(id)
    }

    fn insert(&mut self, resource: RenderableResource) -> ResourceId {
        let id = ResourceId(self.next_resource);
        self.next_resource += 1;
        self.resources.insert(id, resource);
        id
    }

    pub fn resource(&self, id: ResourceId) -> Option<&RenderableResource> {
        self.resources.get(&id)
    }

    /// Start decoding the textures of resource `id` relative to `base_dir`.
    /// Returns how many decodes were started.
    pub fn request_textures(&mut self, id: ResourceId, base_dir: &Path) -> usize {
        let Some(resource) = self.resources.get_mut(&id) else {
            return 0;
        };
        let requested = resource.request_textures(base_dir);
        if requested > 0 {
            log::debug!("{}: decoding {requested} texture(s)", resource.label());
            self.awaiting_textures.insert(id);
        }
        requested
    }

    /// Ids whose texture decodes are all finished. Each is reported once.
    pub fn take_settled_textures(&mut self) -> Vec<ResourceId> {
        let resources = &self.resources;
        let settled = drain_settled(&mut self.awaiting_textures, |id| {
            resources.get(&id).map(RenderableResource::textures_settled)
        });
        for id in &settled {
            if let Some(resource) = resources.get(id) {
                log::info!(
                    "{}: {} textured group(s) ready",
                    resource.label(),
                    resource.textured_groups()
                );
            }
        }
        settled
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Drop every resource no live entity points at. GPU memory is freed
    /// with the last handle.
    pub fn release_unreferenced(&mut self, world: &World) -> usize {
        let live = world.referenced_resources();
        let before = self.resources.len();
        self.resources.retain(|id, _| live.contains(id));
        let released = before - self.resources.len();
        if released > 0 {
            log::debug!("released {released} renderable resource(s)");
        }
        released
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.gpu.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.gpu.device, &self.surface_config);
    }

    /// Render one frame: clear, then draw every renderable entity.
    /// A resource whose draw fails is logged and released so the loop keeps
    /// running.
    pub fn render(&mut self, world: &World, scene: &SceneView) -> Result<(), SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let target = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        let view = scene.camera.view();
        let projection = scene.camera.proj();
        let mut failed = Vec::new();
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(sky_color(scene.time_of_day)),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for (transform, renderable) in world.iter_renderables() {
                let Some(resource) = self.resources.get_mut(&renderable.resource) else {
                    continue;
                };
                let uniforms = FrameUniforms::new(
                    transform.matrix(),
                    view,
                    projection,
                    scene.camera.eye,
                    scene.time_of_day,
                    scene.light_distance,
                );
                if let Err(err) = resource.render(&self.gpu, &mut rpass, &uniforms) {
                    log::error!("{}: {err}", resource.label());
                    failed.push(renderable.resource);
                }
            }
        }
        for id in failed {
            self.resources.remove(&id);
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Remove and return the ids `settled` reports as done. Ids whose
/// resource is gone (`None`) are dropped without being reported.
fn drain_settled(
    awaiting: &mut HashSet<ResourceId>,
    settled: impl Fn(ResourceId) -> Option<bool>,
) -> Vec<ResourceId> {
    let mut done = Vec::new();
    awaiting.retain(|&id| match settled(id) {
        Some(true) => {
            done.push(id);
            false
        }
        Some(false) => true,
        None => false,
    });
    done.sort_by_key(|id| id.0);
    done
}

/// Clear colour tracking the sun: dark blue at night, pale blue at noon.
fn sky_color(time_of_day: f32) -> wgpu::Color {
    let height = ((time_of_day - 0.25) * std::f32::consts::TAU).sin();
    let day = (height * 0.5 + 0.5).clamp(0.0, 1.0) as f64;
    wgpu::Color {
        r: 0.02 + 0.38 * day,
        g: 0.03 + 0.52 * day,
        b: 0.08 + 0.72 * day,
        a: 1.0,
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &wgpu::Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_brightens_towards_noon() {
        let night = sky_color(0.0);
        let noon = sky_color(0.5);
        assert!(noon.b > night.b);
        assert!((night.r - 0.02).abs() < 1e-6);
    }

    #[test]
    fn settled_textures_are_reported_once() {
        let mut awaiting: HashSet<_> = [ResourceId(0), ResourceId(1), ResourceId(2)].into();
        let status = |id: ResourceId| match id.0 {
            0 => Some(true),
            1 => Some(false),
            _ => None,
        };

        assert_eq!(drain_settled(&mut awaiting, status), vec![ResourceId(0)]);
        assert_eq!(awaiting, HashSet::from([ResourceId(1)]));
        assert!(drain_settled(&mut awaiting, status).is_empty());
        assert_eq!(drain_settled(&mut awaiting, |_| Some(true)), vec![ResourceId(1)]);
        assert!(awaiting.is_empty());
    }
}
