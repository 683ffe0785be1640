//! OBJ geometry parser: positions, normals, texture coordinates, polygonal
//! faces and `usemtl`/`mtllib` bookkeeping.
//!
//! Parsing only collects the raw attribute pools and face records; turning
//! them into an indexed [`Mesh`] is the job of [`crate::assemble`].

use std::collections::HashMap;
use std::str::SplitWhitespace;

use crate::assemble::assemble;
use crate::error::{AssetError, Attribute, Diagnostic, Parsed};
use crate::mesh::{Mesh, MeshSource};
use crate::mtl::{MaterialLibrary, parse_mtl};

/// One face corner, resolved to 0-based pool indices.
///
/// Doubles as the vertex identity key: equal refs share one output vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexRef {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

/// A polygon with at least three corners.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub corners: Vec<VertexRef>,
    /// Index into [`ObjDocument::material_names`]; `None` before any `usemtl`.
    pub material: Option<usize>,
    pub line: usize,
}

/// Raw attribute pools and faces of one geometry document.
#[derive(Clone, Debug, Default)]
pub struct ObjDocument {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub faces: Vec<Face>,
    /// Distinct `usemtl` names in first-seen order.
    pub material_names: Vec<String>,
    /// Companion libraries named by `mtllib`, in declaration order.
    pub material_libs: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse an OBJ document. Malformed records are skipped and reported in
/// [`ObjDocument::diagnostics`]; this never fails as a whole.
pub fn parse_obj(src: &str) -> ObjDocument {
    let mut doc = ObjDocument::default();
    let mut material_ids: HashMap<String, usize> = HashMap::new();
    let mut current_material: Option<usize> = None;

    for (line_idx, line) in src.lines().enumerate() {
        let line_no = line_idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => match parse_components::<3>(&mut parts, line_no, tag) {
                Ok(p) => doc.positions.push(p),
                Err(d) => doc.diagnostics.push(d),
            },
            "vn" => match parse_components::<3>(&mut parts, line_no, tag) {
                Ok(n) => doc.normals.push(n),
                Err(d) => doc.diagnostics.push(d),
            },
            "vt" => match parse_components::<2>(&mut parts, line_no, tag) {
                Ok(t) => doc.uvs.push(t),
                Err(d) => doc.diagnostics.push(d),
            },
            "f" => match parse_face(parts, &doc, line_no) {
                Ok(corners) => doc.faces.push(Face {
                    corners,
                    material: current_material,
                    line: line_no,
                }),
                Err(d) => doc.diagnostics.push(d),
            },
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    doc.diagnostics.push(Diagnostic::MissingName {
                        line: line_no,
                        directive: tag.to_owned(),
                    });
                    current_material = None;
                    continue;
                }
                let next_id = doc.material_names.len();
                let id = *material_ids.entry(name.clone()).or_insert_with(|| {
                    doc.material_names.push(name);
                    next_id
                });
                current_material = Some(id);
            }
            "mtllib" => {
                let before = doc.material_libs.len();
                doc.material_libs.extend(parts.map(str::to_owned));
                if doc.material_libs.len() == before {
                    doc.diagnostics.push(Diagnostic::MissingName {
                        line: line_no,
                        directive: tag.to_owned(),
                    });
                }
            }
            _ => {
                // o/g/s/l/p and friends carry nothing we draw.
            }
        }
    }

    doc
}

/// Parse geometry (and optionally its material library) straight into a mesh.
pub fn load_obj_from_str(
    geometry: &str,
    materials: Option<&str>,
) -> Result<Parsed<Mesh>, AssetError> {
    let library = match materials {
        Some(src) => parse_mtl(src),
        None => Parsed::new(MaterialLibrary::default(), Vec::new()),
    };
    let mut diagnostics = library.diagnostics;
    let mut assembled = assemble(parse_obj(geometry), &library.value)?;
    diagnostics.append(&mut assembled.diagnostics);
    Ok(Parsed::new(assembled.value, diagnostics))
}

/// OBJ text (plus optional MTL text) as a [`MeshSource`].
#[derive(Clone, Debug)]
pub struct ObjSource {
    pub label: String,
    pub geometry: String,
    pub materials: Option<String>,
}

impl ObjSource {
    pub fn new(label: impl Into<String>, geometry: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            geometry: geometry.into(),
            materials: None,
        }
    }

    pub fn with_materials(mut self, materials: impl Into<String>) -> Self {
        self.materials = Some(materials.into());
        self
    }
}

impl MeshSource for ObjSource {
    fn build_mesh(&self) -> Result<Mesh, AssetError> {
        let parsed = load_obj_from_str(&self.geometry, self.materials.as_deref())?;
        parsed.log_diagnostics(&self.label);
        Ok(parsed.into_value())
    }
}

pub(crate) fn parse_f32(token: Option<&str>, line_no: usize, directive: &str) -> Result<f32, Diagnostic> {
    let token = token.unwrap_or_default();
    token
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Diagnostic::InvalidNumber {
            line: line_no,
            directive: directive.to_owned(),
            token: token.to_owned(),
        })
}

fn parse_components<const N: usize>(
    parts: &mut SplitWhitespace<'_>,
    line_no: usize,
    directive: &str,
) -> Result<[f32; N], Diagnostic> {
    let mut out = [0.0f32; N];
    for slot in out.iter_mut() {
        *slot = parse_f32(parts.next(), line_no, directive)?;
    }
    Ok(out)
}

fn parse_face(
    parts: SplitWhitespace<'_>,
    doc: &ObjDocument,
    line_no: usize,
) -> Result<Vec<VertexRef>, Diagnostic> {
    let tokens: Vec<&str> = parts.collect();
    if tokens.len() < 3 {
        return Err(Diagnostic::FaceTooSmall {
            line: line_no,
            corners: tokens.len(),
        });
    }
    tokens
        .into_iter()
        .map(|token| parse_face_vertex(token, doc, line_no))
        .collect()
}

fn parse_face_vertex(token: &str, doc: &ObjDocument, line_no: usize) -> Result<VertexRef, Diagnostic> {
    let mut split = token.split('/');
    let position = resolve_index(
        split.next().unwrap_or_default(),
        doc.positions.len(),
        Attribute::Position,
        line_no,
    )?;

    let uv = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(
            value,
            doc.uvs.len(),
            Attribute::TexCoord,
            line_no,
        )?),
        _ => None,
    };

    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(
            value,
            doc.normals.len(),
            Attribute::Normal,
            line_no,
        )?),
        _ => None,
    };

    Ok(VertexRef {
        position,
        uv,
        normal,
    })
}

/// 1-based (or negative, end-relative) OBJ index to a 0-based pool index.
fn resolve_index(
    token: &str,
    len: usize,
    attribute: Attribute,
    line_no: usize,
) -> Result<usize, Diagnostic> {
    let raw = token.parse::<i64>().map_err(|_| Diagnostic::InvalidNumber {
        line: line_no,
        directive: "f".to_owned(),
        token: token.to_owned(),
    })?;

    let idx = match raw {
        r if r > 0 => r - 1,
        r if r < 0 => len as i64 + r,
        _ => -1,
    };

    if idx < 0 || idx as usize >= len {
        return Err(Diagnostic::IndexOutOfRange {
            line: line_no,
            attribute,
            index: raw,
            len,
        });
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::DEFAULT_MATERIAL;

    #[test]
    fn parse_simple_triangle() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3";
        let mesh = load_obj_from_str(src, None).expect("parse triangle").value;
        assert_eq!(mesh.positions().len(), 3);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert!(mesh.normals().is_none());
        assert!(mesh.uvs().is_none());
        assert_eq!(mesh.material_groups().len(), 1);
        let group = &mesh.material_groups()[0];
        assert_eq!(group.material_name, DEFAULT_MATERIAL);
        assert_eq!(group.indices, vec![0, 1, 2]);
    }

    #[test]
    fn pools_and_faces_are_collected() {
        let src = r#"
            # a comment
            mtllib scene.mtl extra.mtl
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            o Triangle
            s off
            f 1/1/1 2/2/1 3/3/1
        "#;
        let doc = parse_obj(src);
        assert!(doc.diagnostics.is_empty(), "{:?}", doc.diagnostics);
        assert_eq!(doc.positions.len(), 3);
        assert_eq!(doc.normals.len(), 1);
        assert_eq!(doc.uvs.len(), 3);
        assert_eq!(doc.material_libs, vec!["scene.mtl", "extra.mtl"]);
        assert_eq!(doc.faces.len(), 1);
        assert_eq!(
            doc.faces[0].corners[1],
            VertexRef {
                position: 1,
                uv: Some(1),
                normal: Some(0)
            }
        );
    }

    #[test]
    fn corner_forms_are_understood() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvt 0 0\nf 1//1 2/1 -1";
        let doc = parse_obj(src);
        let corners = &doc.faces[0].corners;
        assert_eq!(corners[0], VertexRef { position: 0, uv: None, normal: Some(0) });
        assert_eq!(corners[1], VertexRef { position: 1, uv: Some(0), normal: None });
        assert_eq!(corners[2], VertexRef { position: 2, uv: None, normal: None });
    }

    #[test]
    fn small_face_is_skipped_with_diagnostic() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2\nf 1 2 3";
        let doc = parse_obj(src);
        assert_eq!(doc.faces.len(), 1);
        assert_eq!(
            doc.diagnostics,
            vec![Diagnostic::FaceTooSmall { line: 4, corners: 2 }]
        );
    }

    #[test]
    fn out_of_range_reference_skips_face() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\nf 1/2 2 3\nf 0 1 2";
        let doc = parse_obj(src);
        assert!(doc.faces.is_empty());
        assert_eq!(
            doc.diagnostics,
            vec![
                Diagnostic::IndexOutOfRange { line: 4, attribute: Attribute::Position, index: 4, len: 3 },
                Diagnostic::IndexOutOfRange { line: 5, attribute: Attribute::TexCoord, index: 2, len: 0 },
                Diagnostic::IndexOutOfRange { line: 6, attribute: Attribute::Position, index: 0, len: 3 },
            ]
        );
    }

    #[test]
    fn bad_numbers_skip_the_line() {
        let src = "v 0 0 zero\nv 1 0\nv nan 0 0\nv 1 2 3 0.5";
        let doc = parse_obj(src);
        assert_eq!(doc.positions, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(doc.diagnostics.len(), 3);
        assert!(matches!(
            &doc.diagnostics[0],
            Diagnostic::InvalidNumber { line: 1, token, .. } if token == "zero"
        ));
    }

    #[test]
    fn usemtl_state_applies_to_following_faces() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nusemtl Red\nf 1 2 3\nusemtl Blue\nf 1 2 3\nusemtl Red\nf 1 2 3\nusemtl\nf 1 2 3";
        let doc = parse_obj(src);
        let materials: Vec<_> = doc.faces.iter().map(|f| f.material).collect();
        assert_eq!(materials, vec![None, Some(0), Some(1), Some(0), None]);
        assert_eq!(doc.material_names, vec!["Red", "Blue"]);
        assert_eq!(
            doc.diagnostics,
            vec![Diagnostic::MissingName { line: 11, directive: "usemtl".into() }]
        );
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\ng group\ncurv 0 1\nfoo bar\nf 1 2 3";
        let doc = parse_obj(src);
        assert!(doc.diagnostics.is_empty());
        assert_eq!(doc.faces.len(), 1);
    }

    #[test]
    fn obj_source_builds_through_trait() {
        let source = ObjSource::new("tri", "v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3")
            .with_materials("newmtl unused\nKd 1 1 1");
        let mesh = source.build_mesh().expect("mesh");
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.materials().contains_key("unused"));
    }
}
