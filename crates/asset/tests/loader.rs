use std::path::PathBuf;

use asset::{Diagnostic, load_mtl_from_path, load_obj_from_path};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn loads_obj_with_companion_library() {
    let loaded = load_obj_from_path(data("scene.obj")).expect("load scene");
    let mesh = &loaded.mesh;

    assert_eq!(loaded.base_dir, data(""));
    assert_eq!(mesh.material_libs(), &["scene.mtl".to_owned(), "missing.mtl".to_owned()]);

    // quad -> 2 triangles, plus 3 single triangles
    assert_eq!(mesh.triangle_count(), 5);
    assert_eq!(mesh.normals().map(<[_]>::len), Some(mesh.vertex_count()));
    assert_eq!(mesh.uvs().map(<[_]>::len), Some(mesh.vertex_count()));
    assert!(mesh.indices().iter().all(|&i| (i as usize) < mesh.vertex_count()));

    let names: Vec<_> = mesh
        .material_groups()
        .iter()
        .map(|g| g.material_name.as_str())
        .collect();
    assert_eq!(names, vec!["Stone", "Moss", "Lichen"]);

    let stone = mesh.group("Stone").and_then(|g| mesh.material_for(g)).expect("stone");
    assert_eq!(stone.shininess, 12.0);
    assert_eq!(stone.diffuse_map.as_deref(), Some("stone.png"));
    let moss = mesh.group("Moss").and_then(|g| mesh.material_for(g)).expect("moss");
    assert_eq!(moss.transparency, 0.9);

    assert_eq!(
        loaded.diagnostics,
        vec![Diagnostic::UnresolvedMaterial { name: "Lichen".into() }]
    );
}

#[test]
fn seam_vertices_are_not_merged() {
    let mesh = load_obj_from_path(data("scene.obj")).expect("load scene").mesh;
    // position 5 (apex) appears with two normals: one vertex per normal.
    let apex = mesh
        .positions()
        .iter()
        .filter(|p| **p == [0.0, 1.0, 0.0])
        .count();
    assert_eq!(apex, 2);
}

#[test]
fn missing_geometry_file_is_an_error() {
    let err = load_obj_from_path(data("nope.obj")).unwrap_err();
    assert!(format!("{err:#}").contains("nope.obj"));
}

#[test]
fn library_loads_on_its_own() {
    let parsed = load_mtl_from_path(data("scene.mtl")).expect("mtl");
    assert!(parsed.diagnostics.is_empty());
    assert_eq!(parsed.value.len(), 2);
}
