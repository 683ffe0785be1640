//! Initial scene: ground plane, procedural planet with a cube moon, and
//! placement for OBJ models as they arrive.

use std::path::Path;

use asset::{Cube, Material, Mesh, MeshSource, Plane, Sphere};
use corelib::ecs::{Entity, Renderable, ResourceId, World};
use corelib::transform::Transform;
use corelib::{Vec3, vec3};
use renderer::{GpuState, ProgramKind};

use crate::RunOptions;

const GROUND_LEVEL: f32 = -1.5;
/// OBJ models are scaled to fit this radius.
const MODEL_RADIUS: f32 = 1.0;
const MODEL_RING: f32 = 3.5;

/// Textured program whenever the mesh carries uvs and a material names a
/// diffuse map, flat lighting otherwise.
pub fn program_for(mesh: &Mesh) -> ProgramKind {
    let has_maps = mesh.materials().values().any(|m| m.diffuse_map.is_some());
    if mesh.uvs().is_some() && has_maps {
        ProgramKind::Textured
    } else {
        ProgramKind::Lit
    }
}

/// Uniform scale that fits the mesh's bounding sphere (about the origin)
/// into `radius`.
pub fn fit_scale(mesh: &Mesh, radius: f32) -> f32 {
    let extent = mesh
        .positions()
        .iter()
        .map(|p| Vec3::from_array(*p).length())
        .fold(0.0f32, f32::max);
    if extent > f32::EPSILON {
        radius / extent
    } else {
        1.0
    }
}

/// Position of the `index`-th model on a ring around the planet.
pub fn model_slot(index: usize) -> Vec3 {
    let angle = index as f32 * 2.399_963; // golden angle
    let ring = MODEL_RING + 0.5 * (index / 6) as f32;
    vec3(ring * angle.cos(), GROUND_LEVEL + MODEL_RADIUS, ring * angle.sin())
}

pub struct Scene {
    pub world: World,
    models: usize,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            models: 0,
        }
    }

    pub fn populate(&mut self, gpu: &mut GpuState, options: &RunOptions) -> anyhow::Result<()> {
        let cwd = Path::new(".");

        let ground = Plane {
            size: 20.0,
            subdivisions: 8,
            ..Plane::default()
        };
        let id = gpu.add_source("ground", &ground, ProgramKind::Lit, cwd)?;
        self.spawn(id, Transform::from_translation(vec3(0.0, GROUND_LEVEL, 0.0)));

        let mut planet = Sphere::new(1.0, options.sphere_bands, options.sphere_bands);
        let kind = match &options.texture {
            Some(path) => {
                planet.material = Material {
                    diffuse_color: [1.0, 1.0, 1.0],
                    ..planet.material
                }
                .with_diffuse_map(path.to_string_lossy());
                ProgramKind::Textured
            }
            None => ProgramKind::Lit,
        };
        let id = gpu.add_source("planet", &planet, kind, cwd)?;
        let planet = self.spawn(id, Transform::identity());
        self.world.set_spin(planet, vec3(0.0, 0.3, 0.0));

        let moon = Cube {
            size: 0.3,
            material: Material::colored([0.75, 0.72, 0.68]),
        };
        let id = gpu.add_source("moon", &moon, ProgramKind::Lit, cwd)?;
        let moon = self.spawn(id, Transform::from_translation(vec3(1.8, 0.4, 0.0)));
        self.world.set_spin(moon, vec3(0.4, 0.9, 0.0));
        Ok(())
    }

    /// Upload a loaded OBJ and place it on the ring.
    pub fn add_model(
        &mut self,
        gpu: &mut GpuState,
        label: &str,
        mesh: &Mesh,
        base_dir: &Path,
    ) -> anyhow::Result<Entity> {
        let id = gpu.add_mesh(label, mesh, program_for(mesh))?;
        gpu.request_textures(id, base_dir);
        let transform = Transform::from_translation(model_slot(self.models))
            .with_uniform_scale(fit_scale(mesh, MODEL_RADIUS));
        self.models += 1;
        Ok(self.spawn(id, transform))
    }

    fn spawn(&mut self, resource: ResourceId, transform: Transform) -> Entity {
        self.world.spawn(transform, Some(Renderable { resource }))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedural_meshes_pick_programs() {
        let sphere = Sphere::default().build_mesh().unwrap();
        assert_eq!(program_for(&sphere), ProgramKind::Lit);

        let textured = Sphere::default()
            .with_material(Material::neutral().with_diffuse_map("earth.png"))
            .build_mesh()
            .unwrap();
        assert_eq!(program_for(&textured), ProgramKind::Textured);
    }

    #[test]
    fn models_are_scaled_to_fit() {
        let cube = Cube {
            size: 4.0,
            ..Cube::default()
        }
        .build_mesh()
        .unwrap();
        let scale = fit_scale(&cube, 1.0);
        // Corner distance is 2 * sqrt(3).
        assert!((scale - 1.0 / (2.0 * 3f32.sqrt())).abs() < 1e-5);
    }

    #[test]
    fn model_slots_do_not_collide() {
        let a = model_slot(0);
        let b = model_slot(1);
        assert!(a.distance(b) > 1.0);
        assert!((a.y - (GROUND_LEVEL + MODEL_RADIUS)).abs() < 1e-6);
    }
}
