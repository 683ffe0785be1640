//! File-system entry points: read a geometry document, pull in the
//! material libraries it names, and assemble the mesh.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::assemble::assemble;
use crate::error::{Diagnostic, Parsed};
use crate::material::resolve_relative;
use crate::mesh::Mesh;
use crate::mtl::{MaterialLibrary, parse_mtl};
use crate::obj::parse_obj;

/// A mesh loaded from disk plus the directory its companions resolve against.
#[derive(Clone, Debug)]
pub struct LoadedMesh {
    pub mesh: Mesh,
    pub base_dir: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

/// Load an OBJ mesh from a file path. Every `mtllib` is looked up next to
/// the OBJ file; a missing library only costs the materials it would have
/// defined.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<LoadedMesh> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let doc = parse_obj(&source);
    let mut library = MaterialLibrary::new();
    let mut diagnostics = Vec::new();
    for name in &doc.material_libs {
        let mtl_path = resolve_relative(&base_dir, name);
        match load_mtl_from_path(&mtl_path) {
            Ok(parsed) => {
                diagnostics.extend(parsed.diagnostics);
                library.merge(parsed.value);
            }
            Err(err) => log::warn!("{}: {err:#}", path.display()),
        }
    }

    let mut parsed = assemble(doc, &library)
        .with_context(|| format!("Failed to build mesh from {}", path.display()))?;
    diagnostics.append(&mut parsed.diagnostics);

    let parsed = Parsed::new(parsed.value, diagnostics);
    parsed.log_diagnostics(&path.display().to_string());
    log::info!(
        "Loaded {}: {} vertices, {} triangles, {} material group(s)",
        path.display(),
        parsed.value.vertex_count(),
        parsed.value.triangle_count(),
        parsed.value.material_groups().len()
    );

    Ok(LoadedMesh {
        mesh: parsed.value,
        base_dir,
        diagnostics: parsed.diagnostics,
    })
}

/// Load and parse a single MTL file.
pub fn load_mtl_from_path(path: impl AsRef<Path>) -> Result<Parsed<MaterialLibrary>> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to open material library: {}", path.display()))?;
    Ok(parse_mtl(&source))
}
