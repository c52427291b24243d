//! BSDF interfaces and per-ray allocation
//!
//! A [`Bsdf`] scatters light at a shading point: it can importance-sample an
//! outgoing direction, and it can evaluate its non-specular ("diffuse")
//! component at a given direction, with or without the matching density.
//! BSDFs are always arena-scoped: built per shading point by a material and
//! dead when the owning ray completes.
//!
//! Specular lobes are delta distributions. Their density is the explicit
//! [`Pdf::Delta`] tag rather than a floating-point infinity, and samples are
//! flagged with [`BsdfSampleFlags::SPECULAR`]. A delta density must never
//! come back from a *diffuse* sampler or evaluator; that contract is
//! enforced at exactly two layers, the [`checked_sample_diffuse`] /
//! [`checked_compute_diffuse_with_pdf`] wrappers every consumer in this
//! crate calls and the aggregate's child loop. Everything else trusts it.
//!
//! The [`Brdf`] trait is the single-normal reduction of the same contract;
//! [`BrdfBsdf`] adapts one into a full [`Bsdf`].

mod aggregate;
mod brdf;
mod lambertian;
mod microfacet;
mod mirror;
mod oren_nayar;

pub use aggregate::{AggregateBsdf, MAX_AGGREGATE_BSDFS};
pub use brdf::{Brdf, BrdfAllocator, BrdfBsdf, BrdfSample};
pub use lambertian::LambertianBsdf;
pub use microfacet::{DielectricFresnel, MicrofacetBsdf, TrowbridgeReitz};
pub use mirror::MirrorBsdf;
pub use oren_nayar::OrenNayarBsdf;

use bitflags::bitflags;
use glam::Vec3;
use rand::Rng;

use crate::arena::DynamicArena;
use crate::errors::{Error, Result};
use crate::spectrum::{Reflector, ReflectorCompositor};

// ─── Sample classification ────────────────────────────────────────────────────

bitflags! {
    /// Classification of a sampled BSDF direction.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct BsdfSampleFlags: u8 {
        /// The sampled direction crosses the surface.
        const TRANSMISSION = 1 << 0;
        /// The sample came from a delta lobe.
        const SPECULAR = 1 << 1;
    }
}

/// A probability density per solid angle, with the delta (specular) case as
/// an explicit tag instead of a floating-point sentinel.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Pdf {
    /// A finite, non-negative density.
    Finite(f32),
    /// A delta distribution.
    Delta,
}

impl Pdf {
    #[inline]
    #[must_use]
    pub fn is_delta(&self) -> bool {
        matches!(self, Pdf::Delta)
    }

    /// The finite density, or `None` for a delta.
    #[inline]
    #[must_use]
    pub fn finite(&self) -> Option<f32> {
        match self {
            Pdf::Finite(value) => Some(*value),
            Pdf::Delta => None,
        }
    }
}

/// The result of importance-sampling a BSDF.
#[derive(Clone, Copy, Debug)]
pub struct BsdfSample<'a> {
    /// The reflectance along the sampled direction.
    pub reflector: &'a dyn Reflector,
    /// Classification of the sampled lobe.
    pub flags: BsdfSampleFlags,
    /// The sampled outgoing direction (unit length, away from the surface).
    pub outgoing: Vec3,
    /// The density the direction was drawn with.
    pub pdf: Pdf,
}

// ─── BSDF trait ───────────────────────────────────────────────────────────────

/// A bidirectional scattering distribution function.
///
/// `incoming` is the direction the ray arrived along (pointing toward the
/// surface); `outgoing` directions point away from it. BSDFs receive both
/// the geometric surface normal and the possibly-perturbed shading normal.
pub trait Bsdf {
    /// Samples an outgoing direction from the full distribution. `None`
    /// means no energy leaves along any sampleable direction.
    fn sample<'a>(
        &'a self,
        incoming: Vec3,
        surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>>;

    /// Samples from the non-specular component only. The default is a BSDF
    /// with no diffuse component.
    fn sample_diffuse<'a>(
        &'a self,
        incoming: Vec3,
        surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        let _ = (incoming, surface_normal, shading_normal, rng, compositor);
        Ok(None)
    }

    /// Evaluates the non-specular reflectance toward `outgoing`.
    fn compute_diffuse<'a>(
        &'a self,
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Reflector>> {
        let _ = (incoming, shading_normal, outgoing, transmitted, compositor);
        Ok(None)
    }

    /// Evaluates the non-specular reflectance toward `outgoing` together
    /// with the density the diffuse sampler would draw it with.
    fn compute_diffuse_with_pdf<'a>(
        &'a self,
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        let _ = (incoming, shading_normal, outgoing, transmitted, compositor);
        Ok(None)
    }

    /// Whether the BSDF has a non-specular component worth next-event
    /// estimation.
    fn is_diffuse(&self) -> bool {
        false
    }
}

// ─── Contract enforcement ─────────────────────────────────────────────────────

/// [`Bsdf::sample_diffuse`] with the diffuse-sampler contract enforced: a
/// specular or delta sample from the diffuse sampler is
/// [`Error::InvalidResult`].
pub fn checked_sample_diffuse<'a>(
    bsdf: &'a dyn Bsdf,
    incoming: Vec3,
    surface_normal: Vec3,
    shading_normal: Vec3,
    rng: &mut dyn Rng,
    compositor: &'a ReflectorCompositor,
) -> Result<Option<BsdfSample<'a>>> {
    let sample = bsdf.sample_diffuse(incoming, surface_normal, shading_normal, rng, compositor)?;
    if let Some(sample) = &sample {
        let nonzero = sample.pdf.finite().is_none_or(|pdf| pdf > 0.0);
        if nonzero && (sample.pdf.is_delta() || sample.flags.contains(BsdfSampleFlags::SPECULAR)) {
            return Err(Error::InvalidResult);
        }
    }
    Ok(sample)
}

/// [`Bsdf::compute_diffuse_with_pdf`] with the contract enforced: the
/// returned density must be finite and non-negative.
pub fn checked_compute_diffuse_with_pdf<'a>(
    bsdf: &'a dyn Bsdf,
    incoming: Vec3,
    shading_normal: Vec3,
    outgoing: Vec3,
    transmitted: bool,
    compositor: &'a ReflectorCompositor,
) -> Result<Option<(&'a dyn Reflector, f32)>> {
    let result =
        bsdf.compute_diffuse_with_pdf(incoming, shading_normal, outgoing, transmitted, compositor)?;
    if let Some((_, pdf)) = &result
        && (pdf.is_infinite() || pdf.is_nan() || *pdf < 0.0)
    {
        return Err(Error::InvalidResult);
    }
    Ok(result)
}

// ─── Allocator ────────────────────────────────────────────────────────────────

/// Arena handing out per-shading-point BSDFs. The returned references are
/// non-owning and die at the next reset.
pub struct BsdfAllocator {
    arena: DynamicArena,
}

impl BsdfAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: DynamicArena::new(),
        }
    }

    /// Copies a concrete lobe into the arena and returns it as a trait
    /// object tied to the arena's lifetime.
    pub fn alloc<'a, B>(&'a self, bsdf: B) -> Result<&'a (dyn Bsdf + 'a)>
    where
        B: Bsdf + Copy + 'a,
    {
        Ok(self.arena.alloc(bsdf)?)
    }

    pub fn free_all(&mut self) {
        self.arena.free_all();
    }
}

impl Default for BsdfAllocator {
    fn default() -> Self {
        Self::new()
    }
}
