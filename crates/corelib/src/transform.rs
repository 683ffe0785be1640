use crate::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// Placement of a renderable: translation, Euler XYZ rotation, per-axis scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians (XYZ order).
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    #[inline]
    pub fn with_uniform_scale(mut self, s: f32) -> Self {
        self.scale = Vec3::splat(s);
        self
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        )
    }

    /// Model matrix = T * R * S.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.translation)
    }

    /// Inverse-transpose of the upper 3x3, for carrying normals to world space
    /// under non-uniform scale.
    pub fn normal_matrix(&self) -> Mat3 {
        normal_matrix(&self.matrix())
    }
}

/// `transpose(inverse(mat3(model)))`; falls back to identity for singular input.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    let m = Mat3::from_mat4(*model);
    if m.determinant().abs() < f32::EPSILON {
        return Mat3::IDENTITY;
    }
    m.inverse().transpose()
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let t = Transform::from_trs(Vec3::ZERO, Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let n = t.normal_matrix();
        let out = n * Vec3::X;
        assert!((out.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn singular_model_yields_identity_normals() {
        let t = Transform::identity().with_uniform_scale(0.0);
        assert_eq!(t.normal_matrix(), Mat3::IDENTITY);
    }
}
