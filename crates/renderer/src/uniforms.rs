//! CPU mirrors of the WGSL uniform blocks (see `shaders/common.wgsl`).

use asset::Material;
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

/// Per-draw-call block: pushed once per `render`, shared by all groups.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// mat3x3 columns, each padded to 16 bytes.
    pub normal: [[f32; 4]; 3],
    pub camera_position: [f32; 3],
    pub time_of_day: f32,
    pub light_distance: f32,
    _pad: [f32; 3],
}

impl FrameUniforms {
    pub fn new(
        model: Mat4,
        view: Mat4,
        projection: Mat4,
        camera_position: Vec3,
        time_of_day: f32,
        light_distance: f32,
    ) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            normal: pad_mat3(corelib::transform::normal_matrix(&model)),
            camera_position: camera_position.to_array(),
            time_of_day,
            light_distance,
            _pad: [0.0; 3],
        }
    }
}

fn pad_mat3(m: Mat3) -> [[f32; 4]; 3] {
    [m.x_axis, m.y_axis, m.z_axis].map(|c| c.extend(0.0).to_array())
}

/// The `u_material` block, rebound per material group.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub ambient_color: [f32; 3],
    pub shininess: f32,
    pub diffuse_color: [f32; 3],
    pub density: f32,
    pub specular_color: [f32; 3],
    pub transparency: f32,
    pub emissive_color: [f32; 3],
    /// 1.0 when the diffuse texture replaces `diffuse_color`.
    pub has_texture: f32,
}

impl From<&Material> for MaterialUniform {
    fn from(m: &Material) -> Self {
        Self {
            ambient_color: m.ambient_color,
            shininess: m.shininess,
            diffuse_color: m.diffuse_color,
            density: m.density,
            specular_color: m.specular_color,
            transparency: m.transparency,
            emissive_color: m.emissive_color,
            has_texture: if m.diffuse_map.is_some() { 1.0 } else { 0.0 },
        }
    }
}

/// Distance between consecutive dynamic-offset slots.
pub fn material_stride(min_alignment: u32) -> u64 {
    let size = std::mem::size_of::<MaterialUniform>() as u64;
    let align = u64::from(min_alignment.max(1));
    size.div_ceil(align) * align
}

/// Pack one uniform per slot, each starting on a `stride` boundary.
pub fn pack_materials(materials: &[MaterialUniform], stride: u64) -> Vec<u8> {
    let mut bytes = vec![0u8; stride as usize * materials.len().max(1)];
    for (i, m) in materials.iter().enumerate() {
        let start = i * stride as usize;
        bytes[start..start + std::mem::size_of::<MaterialUniform>()]
            .copy_from_slice(bytemuck::bytes_of(m));
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_wgsl_sizes() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 272);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
    }

    #[test]
    fn material_fields_are_carried() {
        let m = Material {
            shininess: 10.0,
            diffuse_color: [1.0, 0.0, 0.0],
            transparency: 0.5,
            ..Material::default()
        };
        let u = MaterialUniform::from(&m);
        assert_eq!(u.diffuse_color, [1.0, 0.0, 0.0]);
        assert_eq!(u.shininess, 10.0);
        assert_eq!(u.density, 1.0);
        assert_eq!(u.transparency, 0.5);
        assert_eq!(u.has_texture, 0.0);
        assert_eq!(MaterialUniform::from(&m.with_diffuse_map("a.png")).has_texture, 1.0);
    }

    #[test]
    fn stride_respects_alignment() {
        assert_eq!(material_stride(256), 256);
        assert_eq!(material_stride(32), 64);
        let packed = pack_materials(&[MaterialUniform::default(); 3], 256);
        assert_eq!(packed.len(), 768);
    }

    #[test]
    fn frame_uniforms_carry_normal_matrix() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = FrameUniforms::new(model, Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ONE, 0.25, 8.0);
        assert!((u.normal[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(u.normal[0][3], 0.0);
        assert_eq!(u.camera_position, [1.0, 1.0, 1.0]);
        assert_eq!(u.time_of_day, 0.25);
    }
}
