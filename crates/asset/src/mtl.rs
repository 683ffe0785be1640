//! MTL material library parser.

use std::collections::HashMap;

use crate::error::{Diagnostic, Parsed};
use crate::material::Material;
use crate::obj::parse_f32;

/// Named materials in first-declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
    order: Vec<String>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record; a replaced name keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, material: Material) {
        let name = name.into();
        if self.materials.insert(name.clone(), material).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Material)> {
        self.order
            .iter()
            .filter_map(|name| self.materials.get(name).map(|m| (name.as_str(), m)))
    }

    /// Fold another library in; its records win on name clashes.
    pub fn merge(&mut self, other: MaterialLibrary) {
        let MaterialLibrary { mut materials, order } = other;
        for name in order {
            if let Some(material) = materials.remove(&name) {
                self.insert(name, material);
            }
        }
    }
}

enum Current {
    /// No `newmtl` seen yet.
    None,
    /// Inside a `newmtl` that had no name; properties are dropped.
    Invalid,
    Open(String, Material),
}

/// Parse an MTL document. Bad lines are reported and skipped.
pub fn parse_mtl(src: &str) -> Parsed<MaterialLibrary> {
    let mut library = MaterialLibrary::new();
    let mut diagnostics = Vec::new();
    let mut current = Current::None;

    for (line_idx, line) in src.lines().enumerate() {
        let line_no = line_idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (tag, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((tag, rest)) => (tag, rest.trim()),
            None => (trimmed, ""),
        };

        if tag == "newmtl" {
            if let Current::Open(name, material) = std::mem::replace(&mut current, Current::None) {
                library.insert(name, material);
            }
            current = if rest.is_empty() {
                diagnostics.push(Diagnostic::MissingName {
                    line: line_no,
                    directive: tag.to_owned(),
                });
                Current::Invalid
            } else {
                Current::Open(rest.to_owned(), Material::default())
            };
            continue;
        }

        if !is_property(tag) {
            continue;
        }

        let material = match &mut current {
            Current::Open(_, material) => material,
            Current::Invalid => continue,
            Current::None => {
                diagnostics.push(Diagnostic::OrphanProperty {
                    line: line_no,
                    directive: tag.to_owned(),
                });
                continue;
            }
        };

        if let Err(d) = apply_property(material, tag, rest, line_no) {
            diagnostics.push(d);
        }
    }

    if let Current::Open(name, material) = current {
        library.insert(name, material);
    }

    Parsed::new(library, diagnostics)
}

fn is_property(tag: &str) -> bool {
    matches!(
        tag,
        "Ka" | "Kd" | "Ks" | "Ke" | "Ns" | "Ni" | "d" | "Tr" | "map_Kd" | "map_Ks" | "map_Bump"
            | "bump"
    )
}

fn apply_property(
    material: &mut Material,
    tag: &str,
    rest: &str,
    line_no: usize,
) -> Result<(), Diagnostic> {
    match tag {
        "Ka" => material.ambient_color = parse_color(rest, line_no, tag)?,
        "Kd" => material.diffuse_color = parse_color(rest, line_no, tag)?,
        "Ks" => material.specular_color = parse_color(rest, line_no, tag)?,
        "Ke" => material.emissive_color = parse_color(rest, line_no, tag)?,
        "Ns" => material.shininess = parse_scalar(rest, line_no, tag)?.max(0.0),
        "Ni" => material.density = parse_scalar(rest, line_no, tag)?,
        "d" => material.transparency = parse_scalar(rest, line_no, tag)?.clamp(0.0, 1.0),
        "Tr" => material.transparency = (1.0 - parse_scalar(rest, line_no, tag)?).clamp(0.0, 1.0),
        "map_Kd" => material.diffuse_map = Some(parse_path(rest, line_no, tag)?),
        "map_Ks" => material.specular_map = Some(parse_path(rest, line_no, tag)?),
        "map_Bump" | "bump" => material.normal_map = Some(parse_path(rest, line_no, tag)?),
        _ => {}
    }
    Ok(())
}

/// Up to three components; absent ones stay 0.
fn parse_color(rest: &str, line_no: usize, tag: &str) -> Result<[f32; 3], Diagnostic> {
    let mut color = [0.0f32; 3];
    for (slot, token) in color.iter_mut().zip(rest.split_whitespace()) {
        *slot = parse_f32(Some(token), line_no, tag)?;
    }
    Ok(color)
}

fn parse_scalar(rest: &str, line_no: usize, tag: &str) -> Result<f32, Diagnostic> {
    parse_f32(rest.split_whitespace().next(), line_no, tag)
}

fn parse_path(rest: &str, line_no: usize, tag: &str) -> Result<String, Diagnostic> {
    if rest.is_empty() {
        return Err(Diagnostic::MissingName {
            line: line_no,
            directive: tag.to_owned(),
        });
    }
    Ok(rest.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_diffuse_and_shininess() {
        let parsed = parse_mtl("newmtl M\nKd 1 0 0\nNs 10");
        assert!(parsed.diagnostics.is_empty());
        let m = parsed.value.get("M").expect("material M");
        assert_eq!(m.diffuse_color, [1.0, 0.0, 0.0]);
        assert_eq!(m.shininess, 10.0);
        assert_eq!(m.ambient_color, [0.0; 3]);
        assert_eq!(m.density, 1.0);
        assert_eq!(m.transparency, 1.0);
        assert_eq!(m.diffuse_map, None);
    }

    #[test]
    fn full_record() {
        let src = r#"
            # Blender MTL
            newmtl Rock Face
            Ns 96.078431
            Ka 0.1 0.2 0.3
            Kd 0.640000 0.640000 0.640000
            Ks 0.5 0.5 0.5
            Ke 0 0 0.25
            Ni 1.45
            d 0.5
            illum 2
            map_Kd textures/rock diffuse.png
            map_Bump rock_normal.png
            map_Ks rock_spec.png
        "#;
        let parsed = parse_mtl(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let m = parsed.value.get("Rock Face").expect("material");
        assert_eq!(m.ambient_color, [0.1, 0.2, 0.3]);
        assert_eq!(m.emissive_color, [0.0, 0.0, 0.25]);
        assert_eq!(m.density, 1.45);
        assert_eq!(m.transparency, 0.5);
        assert_eq!(m.diffuse_map.as_deref(), Some("textures/rock diffuse.png"));
        assert_eq!(m.normal_map.as_deref(), Some("rock_normal.png"));
        assert_eq!(m.specular_map.as_deref(), Some("rock_spec.png"));
    }

    #[test]
    fn records_close_at_next_newmtl() {
        let parsed = parse_mtl("newmtl A\nKd 1 0 0\nnewmtl B\nKd 0 1 0\nTr 0.25");
        let names: Vec<_> = parsed.value.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(parsed.value.get("A").map(|m| m.diffuse_color), Some([1.0, 0.0, 0.0]));
        let b = parsed.value.get("B").expect("B");
        assert_eq!(b.diffuse_color, [0.0, 1.0, 0.0]);
        assert_eq!(b.transparency, 0.75);
    }

    #[test]
    fn properties_before_newmtl_are_ignored() {
        let parsed = parse_mtl("Kd 1 1 1\nnewmtl A\nKs 1 1 1");
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::OrphanProperty { line: 1, directive: "Kd".into() }]
        );
        let a = parsed.value.get("A").expect("A");
        assert_eq!(a.diffuse_color, [0.0; 3]);
        assert_eq!(a.specular_color, [1.0; 3]);
    }

    #[test]
    fn nameless_block_is_dropped() {
        let parsed = parse_mtl("newmtl\nKd 1 1 1\nnewmtl B\nKd 0 0 1");
        assert_eq!(parsed.value.len(), 1);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::MissingName { line: 1, directive: "newmtl".into() }]
        );
    }

    #[test]
    fn partial_color_and_bad_numbers() {
        let parsed = parse_mtl("newmtl A\nKd 0.5\nNs shiny\nNs -4\nd 3");
        let a = parsed.value.get("A").expect("A");
        assert_eq!(a.diffuse_color, [0.5, 0.0, 0.0]);
        assert_eq!(a.shininess, 0.0);
        assert_eq!(a.transparency, 1.0);
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn merge_overrides_by_name() {
        let mut base = parse_mtl("newmtl A\nKd 1 0 0\nnewmtl B").value;
        base.merge(parse_mtl("newmtl A\nKd 0 0 1\nnewmtl C").value);
        let names: Vec<_> = base.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(base.get("A").map(|m| m.diffuse_color), Some([0.0, 0.0, 1.0]));
    }
}
