//! Device handles shared by programs and renderable resources.

use wgpu::{Device, ErrorFilter, Queue, TextureFormat};

use crate::error::{RenderError, RenderResult};
use crate::layouts::SceneLayouts;

pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub layouts: SceneLayouts,
    pub color_format: TextureFormat,
}

impl GpuContext {
    pub fn new(device: Device, queue: Queue, color_format: TextureFormat) -> Self {
        let layouts = SceneLayouts::new(&device);
        Self {
            device,
            queue,
            layouts,
            color_format,
        }
    }

    pub fn uniform_alignment(&self) -> u32 {
        self.device.limits().min_uniform_buffer_offset_alignment
    }

    /// Run `create` inside validation and out-of-memory error scopes so a
    /// refused allocation comes back as an error instead of reaching the
    /// uncaptured-error handler.
    pub fn guarded<T>(&self, what: &str, create: impl FnOnce(&Device) -> T) -> RenderResult<T> {
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        self.device.push_error_scope(ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(err) => Err(RenderError::GpuResource {
                what: what.to_string(),
                message: err.to_string(),
            }),
            None => Ok(value),
        }
    }
}
