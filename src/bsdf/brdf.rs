//! BRDF interface
//!
//! The single-normal reduction of the BSDF contract: a triple of sample /
//! evaluate / evaluate-with-pdf operations plus the diffuse flag. Kept for
//! lobes that neither transmit nor distinguish geometric from shading
//! normals; [`BrdfBsdf`] lifts one into the full [`Bsdf`] interface.

use glam::Vec3;
use rand::Rng;

use crate::arena::DynamicArena;
use crate::bsdf::{Bsdf, BsdfSample, BsdfSampleFlags, Pdf};
use crate::errors::Result;
use crate::spectrum::{Reflector, ReflectorCompositor};

/// The result of importance-sampling a BRDF.
#[derive(Clone, Copy)]
pub struct BrdfSample<'a> {
    pub reflector: &'a dyn Reflector,
    pub flags: BsdfSampleFlags,
    pub outgoing: Vec3,
    pub pdf: Pdf,
}

/// A bidirectional reflectance distribution function over a single normal.
pub trait Brdf {
    /// Samples an outgoing direction.
    fn sample<'a>(
        &'a self,
        incoming: Vec3,
        normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BrdfSample<'a>>>;

    /// Evaluates the non-specular reflectance toward `outgoing`.
    fn compute_reflectance<'a>(
        &'a self,
        incoming: Vec3,
        normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Reflector>> {
        let _ = (incoming, normal, outgoing, transmitted, compositor);
        Ok(None)
    }

    /// Evaluates the non-specular reflectance with its density.
    fn compute_reflectance_with_pdf<'a>(
        &'a self,
        incoming: Vec3,
        normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        let _ = (incoming, normal, outgoing, transmitted, compositor);
        Ok(None)
    }

    fn is_diffuse(&self) -> bool {
        false
    }
}

/// Arena handing out per-shading-point BRDFs.
pub struct BrdfAllocator {
    arena: DynamicArena,
}

impl BrdfAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: DynamicArena::new(),
        }
    }

    pub fn alloc<'a, B>(&'a self, brdf: B) -> Result<&'a (dyn Brdf + 'a)>
    where
        B: Brdf + Copy + 'a,
    {
        Ok(self.arena.alloc(brdf)?)
    }

    pub fn free_all(&mut self) {
        self.arena.free_all();
    }
}

impl Default for BrdfAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Presents a [`Brdf`] as a [`Bsdf`], shading with the shading normal only.
#[derive(Clone, Copy)]
pub struct BrdfBsdf<'b> {
    brdf: &'b dyn Brdf,
}

impl<'b> BrdfBsdf<'b> {
    #[must_use]
    pub fn new(brdf: &'b dyn Brdf) -> Self {
        Self { brdf }
    }
}

impl Bsdf for BrdfBsdf<'_> {
    fn sample<'a>(
        &'a self,
        incoming: Vec3,
        _surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        let sample = self.brdf.sample(incoming, shading_normal, rng, compositor)?;
        Ok(sample.map(|sample| BsdfSample {
            reflector: sample.reflector,
            flags: sample.flags,
            outgoing: sample.outgoing,
            pdf: sample.pdf,
        }))
    }

    fn sample_diffuse<'a>(
        &'a self,
        incoming: Vec3,
        surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        if !self.brdf.is_diffuse() {
            return Ok(None);
        }
        self.sample(incoming, surface_normal, shading_normal, rng, compositor)
    }

    fn compute_diffuse<'a>(
        &'a self,
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Reflector>> {
        self.brdf
            .compute_reflectance(incoming, shading_normal, outgoing, transmitted, compositor)
    }

    fn compute_diffuse_with_pdf<'a>(
        &'a self,
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        self.brdf.compute_reflectance_with_pdf(
            incoming,
            shading_normal,
            outgoing,
            transmitted,
            compositor,
        )
    }

    fn is_diffuse(&self) -> bool {
        self.brdf.is_diffuse()
    }
}
