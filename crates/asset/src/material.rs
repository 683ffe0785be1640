//! Material records as described by a material library.

use std::path::{Path, PathBuf};

/// Shading parameters for one material group. Colours are linear RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub ambient_color: [f32; 3],
    pub diffuse_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub emissive_color: [f32; 3],
    /// Specular exponent, never negative.
    pub shininess: f32,
    /// Optical density (index of refraction).
    pub density: f32,
    /// Opacity in `[0, 1]`, `1.0` is fully opaque.
    pub transparency: f32,
    pub diffuse_map: Option<String>,
    pub normal_map: Option<String>,
    pub specular_map: Option<String>,
}

impl Default for Material {
    /// Values a freshly opened `newmtl` record starts with.
    fn default() -> Self {
        Self {
            ambient_color: [0.0; 3],
            diffuse_color: [0.0; 3],
            specular_color: [0.0; 3],
            emissive_color: [0.0; 3],
            shininess: 0.0,
            density: 1.0,
            transparency: 1.0,
            diffuse_map: None,
            normal_map: None,
            specular_map: None,
        }
    }
}

impl Material {
    /// Grey, matte stand-in used for the implicit group and for unresolved names.
    pub fn neutral() -> Self {
        Self {
            ambient_color: [0.2; 3],
            diffuse_color: [0.8; 3],
            specular_color: [0.0; 3],
            ..Self::default()
        }
    }

    /// Solid diffuse colour with a soft highlight.
    pub fn colored(diffuse: [f32; 3]) -> Self {
        Self {
            ambient_color: diffuse.map(|c| c * 0.25),
            diffuse_color: diffuse,
            specular_color: [0.5; 3],
            shininess: 30.0,
            ..Self::default()
        }
    }

    pub fn with_diffuse_map(mut self, path: impl Into<String>) -> Self {
        self.diffuse_map = Some(path.into());
        self
    }
}

/// Resolve a companion file name the way the asset folder expects it:
/// absolute names are kept, everything else is joined onto `base`.
pub fn resolve_relative(base: &Path, name: &str) -> PathBuf {
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_uses_documented_defaults() {
        let m = Material::default();
        assert_eq!(m.diffuse_color, [0.0, 0.0, 0.0]);
        assert_eq!(m.shininess, 0.0);
        assert_eq!(m.density, 1.0);
        assert_eq!(m.transparency, 1.0);
    }

    #[test]
    fn companion_names_are_joined_on_base() {
        assert_eq!(
            resolve_relative(Path::new("assets/planets"), "earth day.png"),
            PathBuf::from("assets/planets/earth day.png")
        );
        let absolute = std::env::temp_dir().join("moon.png");
        let name = absolute.to_string_lossy();
        assert_eq!(resolve_relative(Path::new("assets"), &name), absolute);
    }
}
