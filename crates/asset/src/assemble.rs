//! Vertex deduplication and material partitioning.
//!
//! Face corners reference three independent pools; the GPU wants one index
//! per vertex. Every distinct `(position, uv, normal)` triple becomes one
//! output vertex, assigned in first-seen order.

use std::collections::{HashMap, HashSet};

use crate::error::{AssetError, Attribute, Diagnostic, Parsed};
use crate::material::Material;
use crate::mesh::{DEFAULT_MATERIAL, MAX_VERTICES, MaterialGroup, Mesh, MeshParts};
use crate::mtl::MaterialLibrary;
use crate::obj::{ObjDocument, VertexRef};

/// Build an indexed [`Mesh`] from a parsed document, resolving group
/// materials against `library`. Consumes the raw pools.
pub fn assemble(doc: ObjDocument, library: &MaterialLibrary) -> Result<Parsed<Mesh>, AssetError> {
    let ObjDocument {
        positions,
        normals,
        uvs,
        faces,
        material_names,
        material_libs,
        mut diagnostics,
    } = doc;

    let mut unique: HashMap<VertexRef, u32> = HashMap::new();
    let mut out_positions: Vec<[f32; 3]> = Vec::new();
    let mut out_normals: Vec<[f32; 3]> = Vec::new();
    let mut out_uvs: Vec<[f32; 2]> = Vec::new();
    let mut missing_normals = 0usize;
    let mut missing_uvs = 0usize;

    let mut indices: Vec<u32> = Vec::new();
    let mut pending: Vec<(Option<usize>, Vec<u32>)> = Vec::new();
    let mut group_slots: HashMap<Option<usize>, usize> = HashMap::new();
    let mut corner_indices: Vec<u32> = Vec::new();

    for face in &faces {
        corner_indices.clear();
        for corner in &face.corners {
            let index = match unique.get(corner) {
                Some(&idx) => idx,
                None => {
                    if out_positions.len() >= MAX_VERTICES {
                        let distinct: HashSet<&VertexRef> =
                            faces.iter().flat_map(|f| f.corners.iter()).collect();
                        return Err(AssetError::CapacityExceeded {
                            vertices: distinct.len(),
                            limit: MAX_VERTICES,
                        });
                    }
                    let idx = out_positions.len() as u32;
                    let position = positions.get(corner.position).copied().ok_or_else(|| {
                        AssetError::InvalidMesh(format!(
                            "line {}: position {} missing from pool",
                            face.line,
                            corner.position + 1
                        ))
                    })?;
                    out_positions.push(position);

                    match corner.normal.and_then(|i| normals.get(i).copied()) {
                        Some(n) => out_normals.push(n),
                        None => {
                            missing_normals += 1;
                            out_normals.push([0.0; 3]);
                        }
                    }
                    match corner.uv.and_then(|i| uvs.get(i).copied()) {
                        Some(t) => out_uvs.push(t),
                        None => {
                            missing_uvs += 1;
                            out_uvs.push([0.0; 2]);
                        }
                    }

                    unique.insert(*corner, idx);
                    idx
                }
            };
            corner_indices.push(index);
        }

        // Implicit faces are keyed apart from every `usemtl` name.
        let key = face.material.filter(|&id| id < material_names.len());
        let slot = match group_slots.get(&key) {
            Some(&slot) => slot,
            None => {
                pending.push((key, Vec::new()));
                group_slots.insert(key, pending.len() - 1);
                pending.len() - 1
            }
        };
        let group = &mut pending[slot].1;

        // Fan around the first corner.
        for tri in 1..(corner_indices.len() - 1) {
            let triangle = [
                corner_indices[0],
                corner_indices[tri],
                corner_indices[tri + 1],
            ];
            indices.extend_from_slice(&triangle);
            group.extend_from_slice(&triangle);
        }
    }

    if indices.is_empty() {
        return Err(AssetError::Empty);
    }

    let vertex_count = out_positions.len();
    let normals = attribute_or_none(out_normals, missing_normals, vertex_count, Attribute::Normal, &mut diagnostics);
    let uvs = attribute_or_none(out_uvs, missing_uvs, vertex_count, Attribute::TexCoord, &mut diagnostics);

    let mut materials: HashMap<String, Material> = library
        .iter()
        .map(|(name, material)| (name.to_owned(), material.clone()))
        .collect();
    let implicit_name = implicit_group_name(|name| {
        materials.contains_key(name) || material_names.iter().any(|n| n == name)
    });
    let mut groups = Vec::with_capacity(pending.len());
    for (key, group_indices) in pending {
        let name = match key {
            Some(id) => {
                let name = material_names[id].clone();
                if !materials.contains_key(&name) {
                    diagnostics.push(Diagnostic::UnresolvedMaterial { name: name.clone() });
                    materials.insert(name.clone(), Material::neutral());
                }
                name
            }
            None => {
                materials.insert(implicit_name.clone(), Material::neutral());
                implicit_name.clone()
            }
        };
        groups.push(MaterialGroup::new(name, group_indices));
    }

    log::debug!(
        "assembled {} vertices, {} triangles in {} material group(s)",
        vertex_count,
        indices.len() / 3,
        groups.len()
    );

    let mesh = Mesh::new(MeshParts {
        positions: out_positions,
        normals,
        uvs,
        indices,
        material_groups: groups,
        materials,
        material_libs,
    })?;
    Ok(Parsed::new(mesh, diagnostics))
}

/// Name for faces declared before any `usemtl`: `"default"` unless a
/// declared or library material already uses it.
fn implicit_group_name(taken: impl Fn(&str) -> bool) -> String {
    if !taken(DEFAULT_MATERIAL) {
        return DEFAULT_MATERIAL.to_owned();
    }
    (1..)
        .map(|n| format!("{DEFAULT_MATERIAL}.{n}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| DEFAULT_MATERIAL.to_owned())
}

/// Keep an attribute if any vertex referenced it, reporting the gaps.
fn attribute_or_none<T>(
    values: Vec<T>,
    missing: usize,
    vertex_count: usize,
    attribute: Attribute,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<T>> {
    if missing == vertex_count {
        return None;
    }
    if missing > 0 {
        diagnostics.push(Diagnostic::MissingAttribute {
            attribute,
            vertices: missing,
        });
    }
    Some(values)
}
