//! Bind group layouts shared by every program.
//!
//! group 0: frame uniforms, group 1: material uniforms (dynamic offset),
//! group 2: diffuse texture + sampler.

use std::num::NonZeroU64;

use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BufferBindingType, Device, PipelineLayout, PipelineLayoutDescriptor, Sampler,
    SamplerBindingType, ShaderStages, TextureFormat, TextureSampleType, TextureViewDimension,
};

use crate::uniforms::{FrameUniforms, MaterialUniform};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
pub const TEXTURE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

pub struct SceneLayouts {
    pub frame: BindGroupLayout,
    pub material: BindGroupLayout,
    pub texture: BindGroupLayout,
    pub pipeline: PipelineLayout,
    pub sampler: Sampler,
}

impl SceneLayouts {
    pub fn new(device: &Device) -> Self {
        let frame = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Frame BGL"),
            entries: &[uniform_entry(
                ShaderStages::VERTEX_FRAGMENT,
                false,
                std::mem::size_of::<FrameUniforms>(),
            )],
        });
        let material = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[uniform_entry(
                ShaderStages::FRAGMENT,
                true,
                std::mem::size_of::<MaterialUniform>(),
            )],
        });
        let texture = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Texture BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Scene PipelineLayout"),
            bind_group_layouts: &[&frame, &material, &texture],
            push_constant_ranges: &[],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Diffuse sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            frame,
            material,
            texture,
            pipeline,
            sampler,
        }
    }
}

fn uniform_entry(visibility: ShaderStages, dynamic: bool, size: usize) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}
