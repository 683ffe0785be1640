//! Deferred diffuse textures.
//!
//! A texture starts as a 1x1 white placeholder so its bind group is valid
//! from the first frame. Decoding runs on a worker thread; the finished
//! pixels are uploaded by [`DeferredTexture::poll`] on the render thread.

use std::path::PathBuf;
use std::sync::Arc;

use asset::TextureData;
use parking_lot::Mutex;
use wgpu::{BindGroup, Extent3d, Texture, TextureDescriptor, TextureDimension, TextureUsages};

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::layouts::TEXTURE_FORMAT;

type DecodeSlot = Arc<Mutex<Option<Result<TextureData, String>>>>;

pub struct DeferredTexture {
    label: String,
    texture: Texture,
    bind_group: BindGroup,
    pending: Option<DecodeSlot>,
    populated: bool,
}

impl DeferredTexture {
    pub fn placeholder(gpu: &GpuContext, label: &str) -> RenderResult<Self> {
        let (texture, bind_group) = upload(gpu, label, &TextureData::white())?;
        Ok(Self {
            label: label.to_string(),
            texture,
            bind_group,
            pending: None,
            populated: false,
        })
    }

    pub fn bind_group(&self) -> &BindGroup {
        &self.bind_group
    }

    /// True once real pixels replaced the placeholder.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start decoding `path` in the background. A request made while another
    /// is in flight supersedes it.
    pub fn load_async(&mut self, path: PathBuf) {
        let slot: DecodeSlot = Arc::new(Mutex::new(None));
        let worker_slot = Arc::clone(&slot);
        let spawned = std::thread::Builder::new()
            .name(format!("decode:{}", self.label))
            .spawn(move || {
                let result = TextureData::load(&path).map_err(|e| format!("{e:#}"));
                *worker_slot.lock() = Some(result);
            });
        match spawned {
            Ok(_) => self.pending = Some(slot),
            Err(err) => log::warn!("texture '{}': cannot spawn decoder: {err}", self.label),
        }
    }

    /// Replace the pixel store with `data` right away.
    pub fn populate(&mut self, gpu: &GpuContext, data: &TextureData) -> RenderResult<()> {
        if !data.is_valid() {
            return Err(RenderError::InvalidTexture {
                label: self.label.clone(),
                width: data.width,
                height: data.height,
                bytes: data.data.len(),
            });
        }
        let (texture, bind_group) = upload(gpu, &self.label, data)?;
        self.texture = texture;
        self.bind_group = bind_group;
        self.populated = true;
        Ok(())
    }

    /// Upload a finished decode, if any. Returns true when the pixel store
    /// changed. A failed decode keeps the placeholder.
    pub fn poll(&mut self, gpu: &GpuContext) -> RenderResult<bool> {
        let Some(slot) = &self.pending else {
            return Ok(false);
        };
        let finished = slot.lock().take();
        match finished {
            None => Ok(false),
            Some(Ok(data)) => {
                self.pending = None;
                match self.populate(gpu, &data) {
                    Err(err @ RenderError::InvalidTexture { .. }) => {
                        log::warn!("{err}; keeping placeholder");
                        return Ok(false);
                    }
                    other => other?,
                }
                log::debug!(
                    "texture '{}' ready ({}x{})",
                    self.label,
                    data.width,
                    data.height
                );
                Ok(true)
            }
            Some(Err(message)) => {
                self.pending = None;
                log::warn!("texture '{}' keeps placeholder: {message}", self.label);
                Ok(false)
            }
        }
    }
}

fn upload(gpu: &GpuContext, label: &str, data: &TextureData) -> RenderResult<(Texture, BindGroup)> {
    let size = Extent3d {
        width: data.width.max(1),
        height: data.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = gpu.guarded(&format!("texture '{label}'"), |device| {
        device.create_texture(&TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        })
    })?;
    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(data.bytes_per_row()),
            rows_per_image: Some(data.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = gpu.guarded(&format!("texture bind group '{label}'"), |device| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &gpu.layouts.texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&gpu.layouts.sampler),
                },
            ],
        })
    })?;
    Ok((texture, bind_group))
}
