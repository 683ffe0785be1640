//! GPU-resident mesh drawn as one draw call per material group.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use asset::{MAX_VERTICES, Material, Mesh, MeshSource, material::resolve_relative};
use wgpu::{BindGroup, Buffer, BufferUsages, IndexFormat, RenderPass, util::DeviceExt};

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::shader::{ShaderProgram, VertexInput};
use crate::texture::DeferredTexture;
use crate::uniforms::{FrameUniforms, MaterialUniform, material_stride, pack_materials};

/// Index buffer contents with each group's triangles stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedIndices {
    pub indices: Vec<u16>,
    pub ranges: Vec<Range<u32>>,
}

/// Lay the groups out back to back in declaration order and narrow the
/// indices to 16 bits.
pub fn pack_indices(mesh: &Mesh) -> RenderResult<PackedIndices> {
    let vertices = mesh.vertex_count();
    if vertices > MAX_VERTICES {
        return Err(RenderError::Capacity { vertices });
    }
    let mut indices = Vec::with_capacity(mesh.indices().len());
    let mut ranges = Vec::with_capacity(mesh.material_groups().len());
    for group in mesh.material_groups() {
        let start = indices.len() as u32;
        for &i in &group.indices {
            indices.push(u16::try_from(i).map_err(|_| RenderError::Capacity { vertices })?);
        }
        ranges.push(start..indices.len() as u32);
    }
    Ok(PackedIndices { indices, ranges })
}

struct GroupDraw {
    diffuse_map: Option<String>,
    range: Range<u32>,
    texture: DeferredTexture,
}

pub struct RenderableResource {
    label: String,
    program: Arc<ShaderProgram>,
    /// Indexed by [`VertexInput::index`].
    attribute_buffers: [Option<Buffer>; 3],
    index_buffer: Buffer,
    vertex_count: usize,
    frame_buffer: Buffer,
    frame_bind_group: BindGroup,
    material_bind_group: BindGroup,
    material_stride: u64,
    groups: Vec<GroupDraw>,
}

impl RenderableResource {
    /// Upload `mesh` for drawing with `program`. Capacity is checked before
    /// any GPU allocation.
    pub fn create(
        gpu: &GpuContext,
        label: &str,
        mesh: &Mesh,
        program: Arc<ShaderProgram>,
    ) -> RenderResult<Self> {
        let packed = pack_indices(mesh)?;
        let vertex_count = mesh.vertex_count();
        let slots = program.attributes();

        // ---- vertex streams
        let mut attribute_buffers: [Option<Buffer>; 3] = [None, None, None];
        attribute_buffers[VertexInput::Position.index()] = Some(vertex_buffer(
            gpu,
            label,
            "positions",
            bytemuck::cast_slice(mesh.positions()),
        )?);
        attribute_buffers[VertexInput::Normal.index()] = match mesh.normals() {
            Some(normals) => Some(vertex_buffer(gpu, label, "normals", bytemuck::cast_slice(normals))?),
            None if slots.consumes(VertexInput::Normal) => {
                log::debug!("{label}: program reads normals the mesh lacks, using zeros");
                let zeros = vec![[0.0f32; 3]; vertex_count];
                Some(vertex_buffer(gpu, label, "normals", bytemuck::cast_slice(&zeros))?)
            }
            None => None,
        };
        attribute_buffers[VertexInput::Uv.index()] = match mesh.uvs() {
            Some(uvs) => Some(vertex_buffer(gpu, label, "uvs", bytemuck::cast_slice(uvs))?),
            None if slots.consumes(VertexInput::Uv) => {
                log::debug!("{label}: program reads uvs the mesh lacks, using zeros");
                let zeros = vec![[0.0f32; 2]; vertex_count];
                Some(vertex_buffer(gpu, label, "uvs", bytemuck::cast_slice(&zeros))?)
            }
            None => None,
        };

        let index_buffer = gpu.guarded(&format!("{label} index buffer"), |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&packed.indices),
                usage: BufferUsages::INDEX,
            })
        })?;

        // ---- frame uniforms
        let frame_buffer = gpu.guarded(&format!("{label} frame uniforms"), |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&<FrameUniforms as bytemuck::Zeroable>::zeroed()),
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            })
        })?;
        let frame_bind_group = gpu.guarded(&format!("{label} frame bind group"), |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &gpu.layouts.frame,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                }],
            })
        })?;

        // ---- material uniforms, one dynamic-offset slot per group
        let materials: Vec<&Material> = mesh
            .material_groups()
            .iter()
            .map(|g| {
                mesh.material_for(g).ok_or_else(|| RenderError::GpuResource {
                    what: format!("{label} material '{}'", g.material_name),
                    message: "group has no material".to_string(),
                })
            })
            .collect::<RenderResult<_>>()?;
        let material_stride = material_stride(gpu.uniform_alignment());
        let uniforms: Vec<MaterialUniform> = materials.iter().map(|m| MaterialUniform::from(*m)).collect();
        let material_buffer = gpu.guarded(&format!("{label} material uniforms"), |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &pack_materials(&uniforms, material_stride),
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            })
        })?;
        let material_bind_group = gpu.guarded(&format!("{label} material bind group"), |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &gpu.layouts.material,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &material_buffer,
                        offset: 0,
                        size: std::num::NonZeroU64::new(
                            std::mem::size_of::<MaterialUniform>() as u64,
                        ),
                    }),
                }],
            })
        })?;

        let mut groups = Vec::with_capacity(packed.ranges.len());
        for ((group, range), material) in mesh
            .material_groups()
            .iter()
            .zip(packed.ranges)
            .zip(&materials)
        {
            groups.push(GroupDraw {
                diffuse_map: material.diffuse_map.clone(),
                range,
                texture: DeferredTexture::placeholder(
                    gpu,
                    &format!("{label}/{}", group.material_name),
                )?,
            });
        }

        log::info!(
            "{label}: uploaded {vertex_count} vertices, {} triangles in {} group(s) for '{}'",
            mesh.triangle_count(),
            groups.len(),
            program.label()
        );
        Ok(Self {
            label: label.to_string(),
            program,
            attribute_buffers,
            index_buffer,
            vertex_count,
            frame_buffer,
            frame_bind_group,
            material_bind_group,
            material_stride,
            groups,
        })
    }

    /// Build the mesh from any producer and upload it.
    pub fn from_source(
        gpu: &GpuContext,
        label: &str,
        source: &dyn MeshSource,
        program: Arc<ShaderProgram>,
    ) -> RenderResult<Self> {
        let mesh = source.build_mesh()?;
        Self::create(gpu, label, &mesh, program)
    }

    /// Start decoding every group's diffuse map, resolved against
    /// `base_dir`. Groups keep drawing with the placeholder until
    /// their pixels arrive.
    pub fn request_textures(&mut self, base_dir: &Path) -> usize {
        let mut requested = 0;
        for group in &mut self.groups {
            if let Some(map) = &group.diffuse_map {
                group.texture.load_async(resolve_relative(base_dir, map));
                requested += 1;
            }
        }
        requested
    }

    /// Push `frame`, then issue one indexed draw per group in declaration
    /// order with that group's material slot and texture bound.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        pass: &mut RenderPass<'_>,
        frame: &FrameUniforms,
    ) -> RenderResult<()> {
        for group in &mut self.groups {
            group.texture.poll(gpu)?;
        }
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(frame));

        pass.set_pipeline(self.program.pipeline());
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for (slot, (input, _)) in self.program.attributes().inputs().into_iter().enumerate() {
            if let Some(buffer) = &self.attribute_buffers[input.index()] {
                pass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
        }
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint16);

        for (i, group) in self.groups.iter().enumerate() {
            if group.range.is_empty() {
                continue;
            }
            let offset = (i as u64 * self.material_stride) as u32;
            pass.set_bind_group(1, &self.material_bind_group, &[offset]);
            pass.set_bind_group(2, group.texture.bind_group(), &[]);
            pass.draw_indexed(group.range.clone(), 0, 0..1);
        }
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// True when no texture decode is still in flight.
    pub fn textures_settled(&self) -> bool {
        self.groups.iter().all(|g| !g.texture.is_pending())
    }

    pub fn textured_groups(&self) -> usize {
        self.groups.iter().filter(|g| g.texture.is_populated()).count()
    }
}

fn vertex_buffer(gpu: &GpuContext, label: &str, stream: &str, bytes: &[u8]) -> RenderResult<Buffer> {
    gpu.guarded(&format!("{label} {stream} buffer"), |device| {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: BufferUsages::VERTEX,
        })
    })
}
