//! Core types: math re-exports, Transform, Camera, orbit control and the scene world.

pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod ecs;
pub mod transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = transform::Transform::from_trs(
            vec3(1.0, 2.0, 3.0),
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 2.0, 2.0),
        );
        // Last column holds the translation, the diagonal the scale
        // (rotation is zero).
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::OrbitController::default().camera(16.0 / 9.0);
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn orbit_keeps_distance_and_clamps() {
        let mut orbit = camera::OrbitController::default();
        orbit.drag(100.0, 1000.0);
        assert_eq!(orbit.pitch_deg, 89.0);
        assert!((orbit.eye().length() - orbit.distance).abs() < 1e-4);

        orbit.zoom(100.0);
        assert_eq!(orbit.distance, camera::OrbitController::MIN_DISTANCE);
        orbit.zoom(-100.0);
        assert_eq!(orbit.distance, camera::OrbitController::MAX_DISTANCE);
    }
}
