//! Geometric primitives
//!
//! The [`Shape`] trait is the polymorphic geometry kind: it traces rays,
//! reports bounds and normals, and resolves the per-face collaborators
//! (materials, emissive materials, normal maps, texture-coordinate maps).
//! Faces are identified by a small per-shape index; implementations validate
//! face indices at the interface and fail with
//! [`Error::InvalidArgument`](crate::errors::Error::InvalidArgument) rather
//! than misbehaving.
//!
//! A shape is *sampleable* when it exposes the full emissive triple
//! (emissive material lookup, face sampling, and the solid-angle pdf),
//! which is what the area-light wrapper requires. Non-emissive shapes
//! expose none of the three; the defaults below reject the calls.

mod hit;
mod sphere;
mod triangle;

pub use hit::{ClosestHit, HitArena, HitSink, HitTester, trace_single_shape};
pub use sphere::{SPHERE_BACK_FACE, SPHERE_FRONT_FACE, Sphere};
pub use triangle::{
    BarycentricCoordinates, TRIANGLE_BACK_FACE, TRIANGLE_FRONT_FACE, Triangle,
};

use glam::{Affine3A, Vec3};
use rand::Rng;

use crate::errors::{Error, Result};
use crate::math::{BoundingBox, Ray};
use crate::shading::{EmissiveMaterial, Material, NormalMap, TextureCoordinateMap};

/// Polymorphic geometry. Long-lived and shared (`Arc<dyn Shape>`).
pub trait Shape: Send + Sync {
    /// Publishes every intersection of `ray` with the shape within
    /// `[minimum, maximum]` into `hits`. The ray is in the shape's model
    /// space. Compound shapes forward to their members through
    /// [`HitSink::test_nested_shape`], which is why the sink's shape
    /// lifetime is tied to `self`.
    fn trace<'s>(
        &'s self,
        ray: &Ray,
        minimum: f32,
        maximum: f32,
        hits: &mut HitSink<'_, 's, '_>,
    ) -> Result<()>;

    /// World-space bounds under the given model-to-world transform.
    fn bounds(&self, model_to_world: Option<&Affine3A>) -> Result<BoundingBox>;

    /// The model-space geometric normal at a model-space hit point on the
    /// given face.
    fn compute_normal(&self, model_hit_point: Vec3, face: u32) -> Result<Vec3>;

    /// The material shading the given face, if any.
    fn material(&self, face: u32) -> Result<Option<&dyn Material>>;

    /// The emissive material lighting the given face, if any. Only
    /// sampleable shapes return one.
    fn emissive_material(&self, face: u32) -> Result<Option<&dyn EmissiveMaterial>> {
        let _ = face;
        Ok(None)
    }

    /// Whether this shape exposes the emissive triple (emissive material,
    /// face sampling, solid-angle pdf).
    fn is_sampleable(&self) -> bool {
        false
    }

    /// Samples a model-space point uniformly by area on the given face.
    fn sample_face(&self, face: u32, rng: &mut dyn Rng) -> Result<Vec3> {
        let _ = (face, rng);
        Err(Error::InvalidArgument(0))
    }

    /// Converts the surface-area density of [`sample_face`](Self::sample_face)
    /// into a solid-angle density at `to_shape.origin`, for a ray that hits
    /// the face at parametric `distance`.
    fn pdf_by_solid_angle(&self, to_shape: &Ray, distance: f32, face: u32) -> Result<f32> {
        let _ = (to_shape, distance, face);
        Err(Error::InvalidArgument(0))
    }

    /// The normal map perturbing the given face, if any.
    fn normal_map(&self, face: u32) -> Result<Option<&dyn NormalMap>> {
        let _ = face;
        Ok(None)
    }

    /// The texture-coordinate map for the given face, if any.
    fn texture_coordinate_map(&self, face: u32) -> Result<Option<&dyn TextureCoordinateMap>> {
        let _ = face;
        Ok(None)
    }
}
