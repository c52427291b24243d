//! Shading collaborators
//!
//! The traits a shape's faces resolve to during shading: [`Material`]
//! (intersection → BSDF), [`EmissiveMaterial`] (model-space hit → spectrum),
//! [`NormalMap`] (perturbed shading normal plus its coordinate space), and
//! [`TextureCoordinateMap`] (intersection → opaque coordinate blob). All are
//! long-lived, shared, and read-only after scene assembly.
//!
//! Texture-coordinate blobs and hit auxiliary data are deliberately opaque
//! (`&dyn Any`): only the originating shape's collaborators know the
//! concrete layout to downcast to.

mod materials;
mod texture;

pub use materials::{
    ConstantEmissiveMaterial, MatteMaterial, MirrorMaterial, PlasticMaterial,
};
pub use texture::{
    ConstantFloatTexture, ConstantReflectorTexture, FloatTexture, ReflectorTexture,
};

use std::any::Any;

use bumpalo::Bump;
use glam::Vec3;

use crate::bsdf::{Bsdf, BsdfAllocator};
use crate::errors::{Error, Result};
use crate::spectrum::{ReflectorCompositor, Spectrum};
use crate::tracer::Intersection;

// ─── Material ─────────────────────────────────────────────────────────────────

/// Maps an intersection plus precomputed texture coordinates to a BSDF
/// built in the per-ray allocators.
///
/// Returning `None` means the surface absorbs everything at this point; the
/// integrator terminates the path there.
pub trait Material: Send + Sync {
    fn sample<'a>(
        &'a self,
        intersection: &Intersection<'_>,
        additional_data: Option<&dyn Any>,
        texture_coordinates: Option<&dyn Any>,
        bsdf_allocator: &'a BsdfAllocator,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Bsdf>>;
}

// ─── Emissive material ────────────────────────────────────────────────────────

/// Maps a model-space hit point plus hit auxiliary data to an emitted
/// spectrum.
pub trait EmissiveMaterial: Send + Sync {
    fn sample(
        &self,
        model_hit_point: Vec3,
        additional_data: Option<&dyn Any>,
    ) -> Result<Option<&dyn Spectrum>>;
}

// ─── Normal map ───────────────────────────────────────────────────────────────

/// The coordinate space a normal map reports its result in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NormalCoordinateSpace {
    Model,
    World,
}

/// Perturbs the shading normal at an intersection.
pub trait NormalMap: Send + Sync {
    /// Returns the perturbed normal and the space it is expressed in;
    /// model-space results are transformed by the shape's inverse-transpose
    /// and renormalised by the caller.
    fn compute(
        &self,
        intersection: &Intersection<'_>,
        model_geometry_normal: Vec3,
        world_geometry_normal: Vec3,
        additional_data: Option<&dyn Any>,
        texture_coordinates: Option<&dyn Any>,
    ) -> Result<(Vec3, NormalCoordinateSpace)>;
}

// ─── Texture coordinates ──────────────────────────────────────────────────────

/// Computes an opaque texture-coordinate blob for an intersection.
pub trait TextureCoordinateMap: Send + Sync {
    fn compute<'a>(
        &self,
        intersection: &Intersection<'_>,
        additional_data: Option<&dyn Any>,
        allocator: &'a TextureCoordinateAllocator,
    ) -> Result<Option<&'a dyn Any>>;
}

/// Bump allocator for texture-coordinate blobs, reset once per camera ray.
pub struct TextureCoordinateAllocator {
    bump: Bump,
}

impl TextureCoordinateAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Copies `value` in and returns it as an opaque blob tied to the
    /// allocator's lifetime.
    pub fn alloc<T: Copy + Send + Sync + 'static>(&self, value: T) -> Result<&dyn Any> {
        match self.bump.try_alloc(value) {
            Ok(blob) => Ok(blob),
            Err(_) => Err(Error::AllocationFailed),
        }
    }

    /// Resets the allocator, invalidating all outstanding blobs.
    pub fn free_all(&mut self) {
        self.bump.reset();
    }
}

impl Default for TextureCoordinateAllocator {
    fn default() -> Self {
        Self::new()
    }
}
