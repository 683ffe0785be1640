//! Procedural primitives producing the same [`Mesh`] contract as the OBJ path.

use std::f32::consts::PI;

use crate::error::AssetError;
use crate::material::Material;
use crate::mesh::{MAX_VERTICES, Mesh, MeshParts, MeshSource};

pub const SPHERE_MATERIAL: &str = "sphere";
pub const CUBE_MATERIAL: &str = "cube";
pub const PLANE_MATERIAL: &str = "plane";

/// UV sphere on a latitude-major grid. Seam and pole rows are duplicated so
/// indexing never special-cases them.
#[derive(Clone, Debug)]
pub struct Sphere {
    pub radius: f32,
    pub latitude_bands: u32,
    pub longitude_bands: u32,
    pub material: Material,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            radius: 1.0,
            latitude_bands: 30,
            longitude_bands: 30,
            material: Material {
                ambient_color: [0.5, 1.0, 0.5],
                diffuse_color: [0.0, 0.0, 1.0],
                specular_color: [0.0, 0.0, 1.0],
                shininess: 30.0,
                ..Material::default()
            },
        }
    }
}

impl Sphere {
    pub fn new(radius: f32, latitude_bands: u32, longitude_bands: u32) -> Self {
        Self {
            radius,
            latitude_bands,
            longitude_bands,
            ..Self::default()
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

impl MeshSource for Sphere {
    fn build_mesh(&self) -> Result<Mesh, AssetError> {
        let (lat_bands, lon_bands) = (self.latitude_bands, self.longitude_bands);
        if lat_bands == 0 || lon_bands == 0 {
            return Err(AssetError::InvalidMesh(format!(
                "sphere needs at least one band each way, got {lat_bands}x{lon_bands}"
            )));
        }
        let vertex_count = (lat_bands as usize + 1) * (lon_bands as usize + 1);
        check_capacity(vertex_count)?;

        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for lat in 0..=lat_bands {
            let theta = lat as f32 * PI / lat_bands as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();

            for lon in 0..=lon_bands {
                let phi = lon as f32 * 2.0 * PI / lon_bands as f32;
                let (sin_phi, cos_phi) = phi.sin_cos();

                let n = [cos_phi * sin_theta, cos_theta, sin_phi * sin_theta];
                normals.push(n);
                positions.push(n.map(|c| c * self.radius));
                uvs.push([
                    1.0 - lon as f32 / lon_bands as f32,
                    1.0 - lat as f32 / lat_bands as f32,
                ]);
            }
        }

        let mut indices = Vec::with_capacity((lat_bands * lon_bands * 6) as usize);
        for lat in 0..lat_bands {
            for lon in 0..lon_bands {
                let first = lat * (lon_bands + 1) + lon;
                let second = first + lon_bands + 1;

                indices.extend_from_slice(&[first, first + 1, second]);
                indices.extend_from_slice(&[second, first + 1, second + 1]);
            }
        }

        Mesh::new(
            MeshParts {
                positions,
                normals: Some(normals),
                uvs: Some(uvs),
                indices,
                ..Default::default()
            }
            .with_single_group(SPHERE_MATERIAL, self.material.clone()),
        )
    }
}

/// Axis-aligned cube centred on the origin, four vertices per face.
#[derive(Clone, Debug)]
pub struct Cube {
    /// Edge length.
    pub size: f32,
    pub material: Material,
}

impl Default for Cube {
    fn default() -> Self {
        Self {
            size: 2.0,
            material: Material::neutral(),
        }
    }
}

/// (normal, u axis, v axis) with `u x v == normal`, so corners wind CCW outside.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
];

impl MeshSource for Cube {
    fn build_mesh(&self) -> Result<Mesh, AssetError> {
        let h = self.size * 0.5;
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in CUBE_FACES {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner: [f32; 3] =
                    std::array::from_fn(|i| (normal[i] + su * u[i] + sv * v[i]) * h);
                positions.push(corner);
                normals.push(normal);
                uvs.push([(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Mesh::new(
            MeshParts {
                positions,
                normals: Some(normals),
                uvs: Some(uvs),
                indices,
                ..Default::default()
            }
            .with_single_group(CUBE_MATERIAL, self.material.clone()),
        )
    }
}

/// Square ground plane in the XZ plane facing +Y.
#[derive(Clone, Debug)]
pub struct Plane {
    pub size: f32,
    pub subdivisions: u32,
    pub material: Material,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            size: 10.0,
            subdivisions: 1,
            material: Material::colored([0.35, 0.4, 0.35]),
        }
    }
}

impl MeshSource for Plane {
    fn build_mesh(&self) -> Result<Mesh, AssetError> {
        let s = self.subdivisions.max(1);
        let vertex_count = (s as usize + 1) * (s as usize + 1);
        check_capacity(vertex_count)?;

        let h = self.size * 0.5;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);
        for i in 0..=s {
            let fz = i as f32 / s as f32;
            for j in 0..=s {
                let fx = j as f32 / s as f32;
                positions.push([-h + fx * self.size, 0.0, -h + fz * self.size]);
                uvs.push([fx, 1.0 - fz]);
            }
        }

        let mut indices = Vec::with_capacity((s * s * 6) as usize);
        for i in 0..s {
            for j in 0..s {
                let a = i * (s + 1) + j;
                let b = a + s + 1;
                indices.extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
            }
        }

        Mesh::new(
            MeshParts {
                positions,
                normals: Some(vec![[0.0, 1.0, 0.0]; vertex_count]),
                uvs: Some(uvs),
                indices,
                ..Default::default()
            }
            .with_single_group(PLANE_MATERIAL, self.material.clone()),
        )
    }
}

fn check_capacity(vertices: usize) -> Result<(), AssetError> {
    if vertices > MAX_VERTICES {
        return Err(AssetError::CapacityExceeded {
            vertices,
            limit: MAX_VERTICES,
        });
    }
    Ok(())
}
