//! Triangles, with optional per-face emission.
//!
//! A triangle has two faces: the side its geometric normal
//! (`(v1−v0) × (v2−v0)`) points away from is the front. Each hit publishes
//! the barycentric coordinates of the hit point as opaque auxiliary data for
//! downstream materials to interpolate with.

use std::sync::Arc;

use glam::{Affine3A, Vec3};
use rand::{Rng, RngExt};

use crate::errors::{Error, Result};
use crate::geometry::{HitSink, Shape};
use crate::math::{BoundingBox, Ray, vector_is_finite};
use crate::shading::{EmissiveMaterial, Material};

/// Face index of the side the geometric normal leaves.
pub const TRIANGLE_FRONT_FACE: u32 = 0;
/// Face index of the opposite side.
pub const TRIANGLE_BACK_FACE: u32 = 1;

/// Barycentric weights of a hit point, published as hit auxiliary data.
///
/// `coordinates[i]` is the weight of vertex `i`; the three sum to one.
#[derive(Clone, Copy, Debug)]
pub struct BarycentricCoordinates {
    pub coordinates: [f32; 3],
}

/// A triangle with per-face materials and, optionally, per-face emission.
pub struct Triangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    /// Unit geometric normal of the front face.
    normal: Vec3,
    area: f32,
    materials: [Option<Arc<dyn Material>>; 2],
    emissive_materials: [Option<Arc<dyn EmissiveMaterial>>; 2],
    sampleable: bool,
}

impl Triangle {
    /// A non-emissive triangle. `materials` are `[front, back]`.
    pub fn new(
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        materials: [Option<Arc<dyn Material>>; 2],
    ) -> Result<Self> {
        Self::build(v0, v1, v2, materials, [None, None], false)
    }

    /// An emissive triangle, sampleable as an area light.
    pub fn emissive(
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        materials: [Option<Arc<dyn Material>>; 2],
        emissive_materials: [Option<Arc<dyn EmissiveMaterial>>; 2],
    ) -> Result<Self> {
        Self::build(v0, v1, v2, materials, emissive_materials, true)
    }

    fn build(
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        materials: [Option<Arc<dyn Material>>; 2],
        emissive_materials: [Option<Arc<dyn EmissiveMaterial>>; 2],
        sampleable: bool,
    ) -> Result<Self> {
        for (i, v) in [v0, v1, v2].into_iter().enumerate() {
            if !vector_is_finite(v) {
                return Err(Error::InvalidArgument(i as u8));
            }
        }
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let cross = edge1.cross(edge2);
        let double_area = cross.length();
        if double_area == 0.0 || !double_area.is_finite() {
            // Degenerate: the vertices are collinear or coincident.
            log::warn!("degenerate triangle rejected: {v0} {v1} {v2}");
            return Err(Error::InvalidArgumentCombination(0));
        }
        Ok(Self {
            v0,
            edge1,
            edge2,
            normal: cross / double_area,
            area: 0.5 * double_area,
            materials,
            emissive_materials,
            sampleable,
        })
    }

    fn check_face(face: u32, argument: u8) -> Result<()> {
        if face > TRIANGLE_BACK_FACE {
            return Err(Error::InvalidArgument(argument));
        }
        Ok(())
    }

    /// Surface area of the triangle.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.area
    }
}

impl Shape for Triangle {
    fn trace<'s>(
        &'s self,
        ray: &Ray,
        _minimum: f32,
        _maximum: f32,
        hits: &mut HitSink<'_, 's, '_>,
    ) -> Result<()> {
        // Möller–Trumbore.
        let p = ray.direction.cross(self.edge2);
        let determinant = self.edge1.dot(p);
        if determinant == 0.0 {
            // Ray parallel to the plane.
            return Ok(());
        }
        let inv_determinant = 1.0 / determinant;

        let s = ray.origin - self.v0;
        let u = s.dot(p) * inv_determinant;
        if !(0.0..=1.0).contains(&u) {
            return Ok(());
        }

        let q = s.cross(self.edge1);
        let v = ray.direction.dot(q) * inv_determinant;
        if v < 0.0 || u + v > 1.0 {
            return Ok(());
        }

        let distance = self.edge2.dot(q) * inv_determinant;

        let barycentric = BarycentricCoordinates {
            coordinates: [1.0 - u - v, u, v],
        };

        let (front, back) = if ray.direction.dot(self.normal) < 0.0 {
            (TRIANGLE_FRONT_FACE, TRIANGLE_BACK_FACE)
        } else {
            (TRIANGLE_BACK_FACE, TRIANGLE_FRONT_FACE)
        };

        hits.push_with_data(distance, front, back, barycentric)
    }

    fn bounds(&self, model_to_world: Option<&Affine3A>) -> Result<BoundingBox> {
        let v1 = self.v0 + self.edge1;
        let v2 = self.v0 + self.edge2;
        let bounds = BoundingBox::new(self.v0.min(v1).min(v2), self.v0.max(v1).max(v2));
        Ok(bounds.transformed(model_to_world))
    }

    fn compute_normal(&self, _model_hit_point: Vec3, face: u32) -> Result<Vec3> {
        Self::check_face(face, 2)?;
        Ok(if face == TRIANGLE_FRONT_FACE {
            self.normal
        } else {
            -self.normal
        })
    }

    fn material(&self, face: u32) -> Result<Option<&dyn Material>> {
        Self::check_face(face, 1)?;
        Ok(self.materials[face as usize].as_deref())
    }

    fn emissive_material(&self, face: u32) -> Result<Option<&dyn EmissiveMaterial>> {
        Self::check_face(face, 1)?;
        Ok(self.emissive_materials[face as usize].as_deref())
    }

    fn is_sampleable(&self) -> bool {
        self.sampleable
    }

    fn sample_face(&self, face: u32, rng: &mut dyn Rng) -> Result<Vec3> {
        if !self.sampleable {
            return Err(Error::InvalidArgument(0));
        }
        Self::check_face(face, 1)?;
        let u: f32 = rng.random_range(0.0..1.0);
        let v: f32 = rng.random_range(0.0..1.0);
        let sqrt_u = u.sqrt();
        let b1 = 1.0 - sqrt_u;
        let b2 = v * sqrt_u;
        Ok(self.v0 + self.edge1 * b1 + self.edge2 * b2)
    }

    fn pdf_by_solid_angle(&self, to_shape: &Ray, distance: f32, face: u32) -> Result<f32> {
        if !self.sampleable {
            return Err(Error::InvalidArgument(0));
        }
        Self::check_face(face, 3)?;
        let direction = to_shape.direction.normalize();
        let cosine = direction.dot(self.normal).abs();
        // Infinite at grazing incidence; the caller drops such samples.
        Ok(distance * distance / (cosine * self.area))
    }
}
