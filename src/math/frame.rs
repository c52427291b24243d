//! Orthonormal shading frames.

use glam::Vec3;

/// A right-handed orthonormal basis built around a unit normal.
///
/// Used to move directions between world space and the local frame whose
/// +Z axis is the normal (the convention the microfacet machinery and the
/// hemisphere samplers share).
#[derive(Clone, Copy, Debug)]
pub struct OrthonormalBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl OrthonormalBasis {
    /// Builds a frame around `normal`, which must be unit length.
    #[must_use]
    pub fn from_normal(normal: Vec3) -> Self {
        let tangent = orthogonal(normal);
        let bitangent = normal.cross(tangent);
        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    /// Local (x, y, z) with z along the normal, into world space.
    #[inline]
    #[must_use]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }

    /// World direction into the local frame.
    #[inline]
    #[must_use]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }
}

/// An arbitrary unit vector orthogonal to `v`.
///
/// Crosses against the axis least aligned with `v`, so the result is well
/// conditioned for any finite non-zero input.
#[must_use]
pub fn orthogonal(v: Vec3) -> Vec3 {
    let abs = v.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vec3::X
    } else if abs.y <= abs.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    v.cross(axis).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_frame(normal: Vec3) {
        let basis = OrthonormalBasis::from_normal(normal.normalize());
        assert!(basis.tangent.dot(basis.normal).abs() < 1e-6);
        assert!(basis.bitangent.dot(basis.normal).abs() < 1e-6);
        assert!(basis.tangent.dot(basis.bitangent).abs() < 1e-6);
        assert!((basis.tangent.length() - 1.0).abs() < 1e-5);

        // Round trip
        let v = Vec3::new(0.3, -0.4, 0.8);
        let back = basis.to_local(basis.to_world(v));
        assert!((back - v).length() < 1e-5);
    }

    #[test]
    fn frames_are_orthonormal() {
        check_frame(Vec3::Z);
        check_frame(Vec3::new(1.0, 1.0, 1.0));
        check_frame(Vec3::new(-0.1, 0.9, 0.2));
        check_frame(Vec3::NEG_Y);
    }
}
