//! Spheres, with optional per-face emission.
//!
//! A sphere has two faces: the outside (front) and the inside (back). Rays
//! entering from outside hit the front face first; rays originating inside
//! see the back face.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Affine3A, Vec3};
use rand::Rng;

use crate::errors::{Error, Result};
use crate::geometry::{HitSink, Shape};
use crate::math::{BoundingBox, Ray, bounded_dot, sample_sphere_uniformly, vector_is_finite};
use crate::shading::{EmissiveMaterial, Material};

/// Face index of the sphere's outside.
pub const SPHERE_FRONT_FACE: u32 = 0;
/// Face index of the sphere's inside.
pub const SPHERE_BACK_FACE: u32 = 1;

/// A sphere with per-face materials and, optionally, per-face emission.
pub struct Sphere {
    center: Vec3,
    radius: f32,
    radius_squared: f32,
    materials: [Option<Arc<dyn Material>>; 2],
    emissive_materials: [Option<Arc<dyn EmissiveMaterial>>; 2],
    sampleable: bool,
}

impl Sphere {
    /// A non-emissive sphere. `materials` are `[front, back]`.
    pub fn new(
        center: Vec3,
        radius: f32,
        materials: [Option<Arc<dyn Material>>; 2],
    ) -> Result<Self> {
        Self::build(center, radius, materials, [None, None], false)
    }

    /// An emissive sphere, sampleable as an area light.
    /// `emissive_materials` are `[front, back]`.
    pub fn emissive(
        center: Vec3,
        radius: f32,
        materials: [Option<Arc<dyn Material>>; 2],
        emissive_materials: [Option<Arc<dyn EmissiveMaterial>>; 2],
    ) -> Result<Self> {
        Self::build(center, radius, materials, emissive_materials, true)
    }

    fn build(
        center: Vec3,
        radius: f32,
        materials: [Option<Arc<dyn Material>>; 2],
        emissive_materials: [Option<Arc<dyn EmissiveMaterial>>; 2],
        sampleable: bool,
    ) -> Result<Self> {
        if !vector_is_finite(center) {
            return Err(Error::InvalidArgument(0));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidArgument(1));
        }
        Ok(Self {
            center,
            radius,
            radius_squared: radius * radius,
            materials,
            emissive_materials,
            sampleable,
        })
    }

    fn check_face(face: u32, argument: u8) -> Result<()> {
        if face > SPHERE_BACK_FACE {
            return Err(Error::InvalidArgument(argument));
        }
        Ok(())
    }
}

impl Shape for Sphere {
    fn trace<'s>(
        &'s self,
        ray: &Ray,
        _minimum: f32,
        _maximum: f32,
        hits: &mut HitSink<'_, 's, '_>,
    ) -> Result<()> {
        let to_center = self.center - ray.origin;
        let a = ray.direction.length_squared();
        if a == 0.0 {
            return Err(Error::InvalidArgument(1));
        }
        let t_mid = to_center.dot(ray.direction) / a;
        let distance_to_center_squared = to_center.length_squared();
        let chord_to_center_squared = distance_to_center_squared - t_mid * t_mid * a;

        // The ray's line misses the sphere entirely.
        if self.radius_squared < chord_to_center_squared {
            return Ok(());
        }

        let half_chord = ((self.radius_squared - chord_to_center_squared) / a).sqrt();
        let near = t_mid - half_chord;
        let far = t_mid + half_chord;

        if distance_to_center_squared < self.radius_squared {
            // Origin inside the sphere: both crossings see the inside.
            hits.push(far, SPHERE_BACK_FACE, SPHERE_FRONT_FACE)?;
            hits.push(near, SPHERE_BACK_FACE, SPHERE_FRONT_FACE)?;
        } else {
            hits.push(near, SPHERE_FRONT_FACE, SPHERE_BACK_FACE)?;
            hits.push(far, SPHERE_BACK_FACE, SPHERE_FRONT_FACE)?;
        }

        Ok(())
    }

    fn bounds(&self, model_to_world: Option<&Affine3A>) -> Result<BoundingBox> {
        let extent = Vec3::splat(self.radius);
        let bounds = BoundingBox::new(self.center - extent, self.center + extent);
        Ok(bounds.transformed(model_to_world))
    }

    fn compute_normal(&self, model_hit_point: Vec3, face: u32) -> Result<Vec3> {
        Self::check_face(face, 2)?;
        let outward = model_hit_point - self.center;
        let normal = if face == SPHERE_FRONT_FACE {
            outward
        } else {
            -outward
        };
        Ok(normal.normalize())
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
        let offset = sample_sphere_uniformly(self.radius, rng)?;
        Ok(self.center + offset)
    }

    fn pdf_by_solid_angle(&self, to_shape: &Ray, distance: f32, face: u32) -> Result<f32> {
        if !self.sampleable {
            return Err(Error::InvalidArgument(0));
        }
        Self::check_face(face, 3)?;

        if face == SPHERE_BACK_FACE {
            // Seen from inside: the generic area-to-solid-angle conversion
            // over the whole surface.
            let hit_point = to_shape.at(distance);
            let reversed_normal = (hit_point - self.center).normalize();
            let incoming = to_shape.direction.normalize();
            let dot = bounded_dot(reversed_normal, incoming);
            let area = 4.0 * PI * self.radius_squared;
            return Ok(distance * distance / (dot * area));
        }

        // Seen from outside: the cone of directions subtended by the sphere.
        // Assumes the viewer is outside (the shape is convex).
        let to_center = to_shape.origin - self.center;
        let distance_to_center_squared = to_center.length_squared();
        let sin_theta_squared = self.radius_squared / distance_to_center_squared;
        let cos_theta = (1.0 - sin_theta_squared).max(0.0).sqrt();
        Ok(1.0 / (2.0 * PI * (1.0 - cos_theta)))
    }
}
