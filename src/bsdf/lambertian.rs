//! Lambertian reflection.

use std::f32::consts::FRAC_1_PI;

use glam::Vec3;
use rand::Rng;

use crate::bsdf::{Bsdf, BsdfSample, BsdfSampleFlags, Pdf};
use crate::errors::Result;
use crate::math::{bounded_dot, sample_hemisphere_with_cosine_weighting};
use crate::spectrum::{Reflector, ReflectorCompositor};

/// An ideal diffuse lobe: `f = R / π`, sampled with cosine weighting about
/// the shading normal.
#[derive(Clone, Copy)]
pub struct LambertianBsdf<'r> {
    reflector: &'r dyn Reflector,
}

impl<'r> LambertianBsdf<'r> {
    #[must_use]
    pub fn new(reflector: &'r dyn Reflector) -> Self {
        Self { reflector }
    }
}

impl Bsdf for LambertianBsdf<'_> {
    fn sample<'a>(
        &'a self,
        _incoming: Vec3,
        _surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        let outgoing = sample_hemisphere_with_cosine_weighting(shading_normal, rng)?;
        let Some(reflector) = compositor.attenuate(Some(self.reflector), FRAC_1_PI)? else {
            return Ok(None);
        };
        Ok(Some(BsdfSample {
            reflector,
            flags: BsdfSampleFlags::empty(),
            outgoing,
            pdf: Pdf::Finite(bounded_dot(outgoing, shading_normal) * FRAC_1_PI),
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
        self.sample(incoming, surface_normal, shading_normal, rng, compositor)
    }

    fn compute_diffuse<'a>(
        &'a self,
        _incoming: Vec3,
        _shading_normal: Vec3,
        _outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Reflector>> {
        if transmitted {
            return Ok(None);
        }
        compositor.attenuate(Some(self.reflector), FRAC_1_PI)
    }

    fn compute_diffuse_with_pdf<'a>(
        &'a self,
        _incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        if transmitted {
            return Ok(None);
        }
        let Some(reflector) = compositor.attenuate(Some(self.reflector), FRAC_1_PI)? else {
            return Ok(None);
        };
        let pdf = bounded_dot(outgoing, shading_normal) * FRAC_1_PI;
        Ok(Some((reflector, pdf)))
    }

    fn is_diffuse(&self) -> bool {
        true
    }
}
