//! Geometric foundation types
//!
//! Rays, ray differentials, bounding boxes, and the validation predicates the
//! rest of the core relies on. All vector math is `glam`; points and
//! directions are both `Vec3` (the distinction is carried by usage, matching
//! the transform helpers below).

mod frame;
mod sampling;

pub use frame::{OrthonormalBasis, orthogonal};
pub use sampling::{
    sample_hemisphere_uniformly, sample_hemisphere_with_cosine_weighting, sample_sphere_uniformly,
};

use glam::{Affine3A, Vec3};

use crate::errors::{Error, Result};

// ─── Validation ───────────────────────────────────────────────────────────────

/// True iff every component of `v` is finite.
#[inline]
#[must_use]
pub fn vector_is_finite(v: Vec3) -> bool {
    v.is_finite()
}

/// True iff `v` is finite and usable as a direction or normal (non-zero).
#[inline]
#[must_use]
pub fn vector_is_valid_direction(v: Vec3) -> bool {
    v.is_finite() && v != Vec3::ZERO
}

/// Dot product clamped below at zero.
#[inline]
#[must_use]
pub fn bounded_dot(a: Vec3, b: Vec3) -> f32 {
    a.dot(b).max(0.0)
}

/// Dot product, optionally negated, clamped below at zero.
///
/// The `negate` flag selects the transmission side of the shading normal.
#[inline]
#[must_use]
pub fn positive_dot(a: Vec3, b: Vec3, negate: bool) -> f32 {
    let dp = a.dot(b);
    if negate { (-dp).max(0.0) } else { dp.max(0.0) }
}

// ─── Ray ──────────────────────────────────────────────────────────────────────

/// A half-line with an origin and a (not necessarily unit) direction.
///
/// Directions are kept unnormalised through transforms so that a parametric
/// distance measured on a model-space ray maps back through `at` without
/// rescaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// The point at parametric distance `t`.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Applies `transform` to the origin as a point and the direction as a
    /// vector.
    #[inline]
    #[must_use]
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        Self {
            origin: transform.transform_point3(self.origin),
            direction: transform.transform_vector3(self.direction),
        }
    }

    /// True iff the origin is finite and the direction is finite and
    /// non-zero.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        vector_is_finite(self.origin) && vector_is_valid_direction(self.direction)
    }
}

// ─── Ray differential ─────────────────────────────────────────────────────────

/// A camera ray together with its two neighbouring screen-space rays.
///
/// The differentials feed the `dp/dx` and `dp/dy` partials used for texture
/// filtering; rays built inside the integrator loop carry none.
#[derive(Clone, Copy, Debug)]
pub struct RayDifferential {
    pub ray: Ray,
    /// The rays through the neighbouring pixel in x and in y, when known.
    pub differentials: Option<(Ray, Ray)>,
}

impl RayDifferential {
    #[inline]
    #[must_use]
    pub fn new(ray: Ray, rx: Ray, ry: Ray) -> Self {
        Self {
            ray,
            differentials: Some((rx, ry)),
        }
    }

    #[inline]
    #[must_use]
    pub fn without_differentials(ray: Ray) -> Self {
        Self {
            ray,
            differentials: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.ray.is_valid()
            && self
                .differentials
                .is_none_or(|(rx, ry)| rx.is_valid() && ry.is_valid())
    }
}

// ─── Normal transforms ────────────────────────────────────────────────────────

/// Transforms a model-space normal to world space via the inverse-transpose
/// of `model_to_world` and renormalises it.
///
/// Fails with [`Error::InvalidResult`] when the result is not a usable
/// direction (degenerate transform or non-finite input).
pub fn transform_normal(model_to_world: &Affine3A, normal: Vec3) -> Result<Vec3> {
    let world = model_to_world.matrix3.inverse().transpose() * normal;
    if !vector_is_valid_direction(world) {
        return Err(Error::InvalidResult);
    }
    Ok(world.normalize())
}

// ─── Bounding box ─────────────────────────────────────────────────────────────

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[inline]
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// The smallest box containing both operands.
    #[inline]
    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The box containing all eight transformed corners.
    #[must_use]
    pub fn transformed(&self, transform: Option<&Affine3A>) -> Self {
        let Some(transform) = transform else {
            return *self;
        };

        let mut min = Vec3::INFINITY;
        let mut max = Vec3::NEG_INFINITY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let corner = transform.transform_point3(corner);
            min = min.min(corner);
            max = max.max(corner);
        }
        Self { min, max }
    }
}
