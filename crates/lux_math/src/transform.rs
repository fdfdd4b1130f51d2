// Transform utilities for DMat4
//
// Extends glam::DMat4 with the matrices object-space intersection needs.
// Note: glam::DMat4 already provides transform_point3(), transform_vector3() and inverse()

use crate::Aabb;
use glam::{DMat3, DMat4, DVec3};

/// Determinants below this are treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Extension trait for DMat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Upper 3x3 block (rotation and scale, no translation).
    fn linear_part(&self) -> DMat3;

    /// Inverse, or identity when the matrix is singular.
    fn inverse_or_identity(&self) -> DMat4;

    /// Inverse-transpose of the upper 3x3, used to carry normals, tangents
    /// and bitangents through non-uniform scale. Identity when singular.
    fn normal_matrix(&self) -> DMat3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for DMat4 {
    fn linear_part(&self) -> DMat3 {
        DMat3::from_mat4(*self)
    }

    fn inverse_or_identity(&self) -> DMat4 {
        if self.determinant().abs() < SINGULAR_DETERMINANT {
            return DMat4::IDENTITY;
        }
        self.inverse()
    }

    fn normal_matrix(&self) -> DMat3 {
        let linear = self.linear_part();
        if linear.determinant().abs() < SINGULAR_DETERMINANT {
            return DMat3::IDENTITY;
        }
        linear.inverse().transpose()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }

        let (lo, hi) = (aabb.min, aabb.max);
        let corners = [
            DVec3::new(lo.x, lo.y, lo.z),
            DVec3::new(hi.x, lo.y, lo.z),
            DVec3::new(lo.x, hi.y, lo.z),
            DVec3::new(hi.x, hi.y, lo.z),
            DVec3::new(lo.x, lo.y, hi.z),
            DVec3::new(hi.x, lo.y, hi.z),
            DVec3::new(lo.x, hi.y, hi.z),
            DVec3::new(hi.x, hi.y, hi.z),
        ];

        Aabb::from_iter_points(corners.iter().map(|&corner| self.transform_point3(corner)))
    }
}
