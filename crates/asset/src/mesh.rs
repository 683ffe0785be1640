//! CPU-side mesh representation shared by the text loaders and the
//! procedural generators.

use std::collections::{HashMap, HashSet};

use crate::error::AssetError;
use crate::material::Material;

/// Hard ceiling imposed by 16-bit index buffers (indices `0..=u16::MAX`).
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

/// Name of the group that collects faces declared before any `usemtl`.
pub const DEFAULT_MATERIAL: &str = "default";

/// A subset of the index stream drawn with one material bound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialGroup {
    pub material_name: String,
    pub indices: Vec<u32>,
}

impl MaterialGroup {
    pub fn new(material_name: impl Into<String>, indices: Vec<u32>) -> Self {
        Self {
            material_name: material_name.into(),
            indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Unchecked building blocks for a [`Mesh`].
#[derive(Clone, Debug, Default)]
pub struct MeshParts {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    pub material_groups: Vec<MaterialGroup>,
    pub materials: HashMap<String, Material>,
    pub material_libs: Vec<String>,
}

impl MeshParts {
    /// Attach a single group spanning the whole index stream.
    pub fn with_single_group(mut self, name: &str, material: Material) -> Self {
        self.material_groups = vec![MaterialGroup::new(name, self.indices.clone())];
        self.materials = HashMap::from([(name.to_owned(), material)]);
        self
    }
}

/// Indexed triangle list with co-indexed attributes, partitioned by material.
///
/// Only constructible through [`Mesh::new`], so every instance upholds the
/// invariants checked there. Immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    uvs: Option<Vec<[f32; 2]>>,
    indices: Vec<u32>,
    material_groups: Vec<MaterialGroup>,
    materials: HashMap<String, Material>,
    material_libs: Vec<String>,
}

impl Mesh {
    pub fn new(parts: MeshParts) -> Result<Self, AssetError> {
        validate(&parts)?;
        let MeshParts {
            positions,
            normals,
            uvs,
            indices,
            material_groups,
            materials,
            material_libs,
        } = parts;
        Ok(Self {
            positions,
            normals,
            uvs,
            indices,
            material_groups,
            materials,
            material_libs,
        })
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[[f32; 2]]> {
        self.uvs.as_deref()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn material_groups(&self) -> &[MaterialGroup] {
        &self.material_groups
    }

    pub fn materials(&self) -> &HashMap<String, Material> {
        &self.materials
    }

    /// Companion material library names recorded by the geometry document.
    pub fn material_libs(&self) -> &[String] {
        &self.material_libs
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn group(&self, material_name: &str) -> Option<&MaterialGroup> {
        self.material_groups
            .iter()
            .find(|g| g.material_name == material_name)
    }

    /// Material bound to a group. Always resolves for groups of this mesh.
    pub fn material_for(&self, group: &MaterialGroup) -> Option<&Material> {
        self.materials.get(&group.material_name)
    }
}

/// Anything that can hand a renderer a finished [`Mesh`].
pub trait MeshSource {
    fn build_mesh(&self) -> Result<Mesh, AssetError>;
}

impl MeshSource for Mesh {
    fn build_mesh(&self) -> Result<Mesh, AssetError> {
        Ok(self.clone())
    }
}

fn invalid(msg: impl Into<String>) -> AssetError {
    AssetError::InvalidMesh(msg.into())
}

fn validate(parts: &MeshParts) -> Result<(), AssetError> {
    let vertex_count = parts.positions.len();
    if vertex_count > MAX_VERTICES {
        return Err(AssetError::CapacityExceeded {
            vertices: vertex_count,
            limit: MAX_VERTICES,
        });
    }
    if parts.indices.is_empty() {
        return Err(AssetError::Empty);
    }
    if parts.indices.len() % 3 != 0 {
        return Err(invalid(format!(
            "index count {} is not a whole number of triangles",
            parts.indices.len()
        )));
    }
    if let Some(normals) = &parts.normals {
        if normals.len() != vertex_count {
            return Err(invalid(format!(
                "{} normals for {} positions",
                normals.len(),
                vertex_count
            )));
        }
    }
    if let Some(uvs) = &parts.uvs {
        if uvs.len() != vertex_count {
            return Err(invalid(format!(
                "{} uvs for {} positions",
                uvs.len(),
                vertex_count
            )));
        }
    }
    if let Some(&bad) = parts.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(invalid(format!(
            "index {bad} out of range for {vertex_count} vertices"
        )));
    }

    if parts.material_groups.is_empty() {
        return Err(invalid("mesh has no material groups"));
    }
    let mut seen = HashSet::new();
    for group in &parts.material_groups {
        if !seen.insert(group.material_name.as_str()) {
            return Err(invalid(format!(
                "material group '{}' declared twice",
                group.material_name
            )));
        }
        if !parts.materials.contains_key(&group.material_name) {
            return Err(invalid(format!(
                "material group '{}' has no material record",
                group.material_name
            )));
        }
        if group.indices.len() % 3 != 0 {
            return Err(invalid(format!(
                "material group '{}' is not a whole number of triangles",
                group.material_name
            )));
        }
    }

    // Groups must cover the index stream exactly once.
    let mut balance = vec![0i64; vertex_count];
    for &i in &parts.indices {
        balance[i as usize] += 1;
    }
    for group in &parts.material_groups {
        for &i in &group.indices {
            let slot = balance
                .get_mut(i as usize)
                .ok_or_else(|| invalid(format!("group index {i} out of range")))?;
            *slot -= 1;
        }
    }
    if balance.iter().any(|&b| b != 0) {
        return Err(invalid("material groups do not partition the index stream"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_parts() -> MeshParts {
        MeshParts {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
        .with_single_group(DEFAULT_MATERIAL, Material::neutral())
    }

    #[test]
    fn valid_triangle_builds() {
        let mesh = Mesh::new(triangle_parts()).expect("valid mesh");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.normals().is_none());
        let group = mesh.group(DEFAULT_MATERIAL).expect("default group");
        assert_eq!(mesh.material_for(group), Some(&Material::neutral()));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut parts = triangle_parts();
        parts.indices = vec![0, 1, 3];
        parts.material_groups[0].indices = vec![0, 1, 3];
        assert!(matches!(Mesh::new(parts), Err(AssetError::InvalidMesh(_))));
    }

    #[test]
    fn mismatched_normals_are_rejected() {
        let mut parts = triangle_parts();
        parts.normals = Some(vec![[0.0, 0.0, 1.0]]);
        assert!(matches!(Mesh::new(parts), Err(AssetError::InvalidMesh(_))));
    }

    #[test]
    fn groups_must_partition_indices() {
        let mut parts = triangle_parts();
        parts.material_groups[0].indices = vec![0, 1, 1];
        assert!(Mesh::new(parts).is_err());
    }

    #[test]
    fn group_without_material_is_rejected() {
        let mut parts = triangle_parts();
        parts.materials.clear();
        assert!(Mesh::new(parts).is_err());
    }

    #[test]
    fn exactly_max_vertices_is_accepted() {
        let last = MAX_VERTICES as u32 - 1;
        let mesh = Mesh::new(
            MeshParts {
                positions: vec![[0.0; 3]; MAX_VERTICES],
                indices: vec![0, 1, last],
                ..Default::default()
            }
            .with_single_group(DEFAULT_MATERIAL, Material::neutral()),
        )
        .expect("65536 vertices fit");
        assert_eq!(mesh.vertex_count(), MAX_VERTICES);
    }

    #[test]
    fn capacity_is_enforced_before_anything_else() {
        let parts = MeshParts {
            positions: vec![[0.0; 3]; MAX_VERTICES + 1],
            ..Default::default()
        };
        assert_eq!(
            Mesh::new(parts),
            Err(AssetError::CapacityExceeded {
                vertices: MAX_VERTICES + 1,
                limit: MAX_VERTICES
            })
        );
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let parts = MeshParts::default();
        assert_eq!(Mesh::new(parts), Err(AssetError::Empty));
    }
}
