//! Tiny ECS: World, Entity, components: Transform + Renderable + Spin.

use std::collections::HashSet;

use crate::Vec3;
use crate::transform::Transform;

/// Entity id (dense, index into component arrays).
pub type Entity = u32;

/// Handle of a GPU-side renderable owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u32);

/// Component: draw this entity with the given renderable resource.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Renderable {
    pub resource: ResourceId,
}

/// Very small ECS world with dense parallel arrays.
/// No allocations per-frame; spawn may allocate to grow capacity.
#[derive(Default)]
pub struct World {
    transforms: Vec<Transform>,
    renderables: Vec<Option<Renderable>>,
    spins: Vec<Vec3>,
    alive: Vec<bool>,
    len: u32,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn entity with Transform and optional Renderable.
    pub fn spawn(&mut self, t: Transform, r: Option<Renderable>) -> Entity {
        let id = self.len;
        let idx = id as usize;
        self.len += 1;

        if idx >= self.transforms.len() {
            // grow all arrays equally
            let new_len = (idx + 1).next_power_of_two().max(8);
            self.transforms.resize(new_len, Transform::identity());
            self.renderables.resize(new_len, None);
            self.spins.resize(new_len, Vec3::ZERO);
            self.alive.resize(new_len, false);
        }

        self.transforms[idx] = t;
        self.renderables[idx] = r;
        self.spins[idx] = Vec3::ZERO;
        self.alive[idx] = true;
        id
    }

    /// Remove an entity. Its renderable stays allocated until the renderer
    /// notices nothing references it any more.
    pub fn despawn(&mut self, e: Entity) -> bool {
        if !self.is_alive(e) {
            return false;
        }
        let i = e as usize;
        self.alive[i] = false;
        self.renderables[i] = None;
        true
    }

    #[inline]
    pub fn is_alive(&self, e: Entity) -> bool {
        let i = e as usize;
        i < self.alive.len() && self.alive[i]
    }

    #[inline]
    pub fn transform(&self, e: Entity) -> Option<&Transform> {
        self.is_alive(e).then(|| &self.transforms[e as usize])
    }

    /// Mutable access to a transform (for animation).
    #[inline]
    pub fn transform_mut(&mut self, e: Entity) -> Option<&mut Transform> {
        let i = e as usize;
        if self.is_alive(e) {
            Some(&mut self.transforms[i])
        } else {
            None
        }
    }

    /// Constant angular velocity (radians/second per Euler axis).
    pub fn set_spin(&mut self, e: Entity, speed_xyz: Vec3) {
        if self.is_alive(e) {
            self.spins[e as usize] = speed_xyz;
        }
    }

    /// Iterate over (Transform, Renderable) pairs of live entities.
    pub fn iter_renderables(&self) -> impl Iterator<Item = (&Transform, &Renderable)> {
        (0..self.len as usize).filter_map(move |i| {
            if self.alive.get(i).copied().unwrap_or(false) {
                if let Some(r) = self.renderables[i].as_ref() {
                    return Some((&self.transforms[i], r));
                }
            }
            None
        })
    }

    /// Resources some live entity still points at.
    pub fn referenced_resources(&self) -> HashSet<ResourceId> {
        self.iter_renderables().map(|(_, r)| r.resource).collect()
    }

    /// Advance every spinning transform by `dt` seconds.
    pub fn system_spin(&mut self, dt: f32) {
        for i in 0..(self.len as usize) {
            if self.alive[i] {
                self.transforms[i].rotation_euler += self.spins[i] * dt;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn despawn_drops_resource_reference() {
        let mut world = World::new();
        let a = world.spawn(Transform::identity(), Some(Renderable { resource: ResourceId(0) }));
        let b = world.spawn(Transform::identity(), Some(Renderable { resource: ResourceId(1) }));
        world.spawn(Transform::identity(), None);

        assert_eq!(world.referenced_resources().len(), 2);
        assert!(world.despawn(a));
        assert!(!world.despawn(a));
        assert_eq!(
            world.referenced_resources(),
            HashSet::from([ResourceId(1)])
        );
        assert!(world.transform(b).is_some());
        assert!(world.transform(a).is_none());
    }

    #[test]
    fn spin_advances_rotation() {
        let mut world = World::new();
        let e = world.spawn(Transform::identity(), None);
        world.set_spin(e, Vec3::new(0.0, 2.0, 0.0));
        world.system_spin(0.5);
        let t = world.transform(e).expect("alive");
        assert!((t.rotation_euler.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn spawn_grows_past_initial_capacity() {
        let mut world = World::new();
        let ids: Vec<_> = (0..20).map(|_| world.spawn(Transform::identity(), None)).collect();
        assert!(ids.iter().all(|&e| world.is_alive(e)));
    }
}
