//! Oren–Nayar rough diffuse reflection.

use std::f32::consts::FRAC_1_PI;

use glam::Vec3;
use rand::Rng;

use crate::bsdf::{Bsdf, BsdfSample, BsdfSampleFlags, Pdf};
use crate::errors::Result;
use crate::math::{bounded_dot, orthogonal, sample_hemisphere_with_cosine_weighting};
use crate::spectrum::{Reflector, ReflectorCompositor};

/// A rough diffuse lobe parameterised by the surface roughness σ, in
/// degrees. Diffuse-only; sampled with cosine weighting like the Lambertian
/// lobe, with the closed-form A/B reflectance applied on evaluation.
#[derive(Clone, Copy)]
pub struct OrenNayarBsdf<'r> {
    reflector: &'r dyn Reflector,
    a: f32,
    b: f32,
}

impl<'r> OrenNayarBsdf<'r> {
    /// `sigma` is the roughness standard deviation in degrees.
    #[must_use]
    pub fn new(reflector: &'r dyn Reflector, sigma: f32) -> Self {
        let sigma_radians = sigma.to_radians();
        let s_sq = sigma_radians * sigma_radians;
        Self {
            reflector,
            a: 1.0 - s_sq / (2.0 * (s_sq + 0.33)),
            b: 0.45 * s_sq / (s_sq + 0.09),
        }
    }

    fn reflectance(&self, incoming: Vec3, normal: Vec3, outgoing: Vec3) -> f32 {
        let perpendicular = orthogonal(normal);

        let cos_theta_i = incoming.dot(normal);
        let cos_theta_o = outgoing.dot(normal);

        let sin2_theta_i = 1.0 - cos_theta_i * cos_theta_i;
        let sin2_theta_o = 1.0 - cos_theta_o * cos_theta_o;

        let max_cosine = if sin2_theta_i > 1e-4 && sin2_theta_o > 1e-4 {
            let cos_phi_i = incoming.dot(perpendicular);
            let sin2_phi_i = 1.0 - cos_phi_i * cos_phi_i;
            let cos_phi_o = outgoing.dot(perpendicular);
            let sin2_phi_o = 1.0 - cos_phi_o * cos_phi_o;
            (cos_phi_i * cos_phi_o + sin2_phi_i * sin2_phi_o).max(0.0)
        } else {
            0.0
        };

        let abs_cos_theta_i = cos_theta_i.abs();
        let abs_cos_theta_o = cos_theta_o.abs();

        let (sin_alpha, tan_beta) = if abs_cos_theta_i > abs_cos_theta_o {
            (sin2_theta_o, sin2_theta_i / abs_cos_theta_i)
        } else {
            (sin2_theta_i, sin2_theta_o / abs_cos_theta_o)
        };

        FRAC_1_PI * (self.a + self.b * max_cosine * sin_alpha * tan_beta)
    }
}

impl Bsdf for OrenNayarBsdf<'_> {
    fn sample<'a>(
        &'a self,
        incoming: Vec3,
        _surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        let outgoing = sample_hemisphere_with_cosine_weighting(shading_normal, rng)?;
        let reflectance = self.reflectance(incoming, shading_normal, outgoing);
        let Some(reflector) = compositor.attenuate(Some(self.reflector), reflectance.max(0.0))?
        else {
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
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Reflector>> {
        if transmitted {
            return Ok(None);
        }
        let reflectance = self.reflectance(incoming, shading_normal, outgoing);
        compositor.attenuate(Some(self.reflector), reflectance.max(0.0))
    }

    fn compute_diffuse_with_pdf<'a>(
        &'a self,
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        if transmitted {
            return Ok(None);
        }
        let reflectance = self.reflectance(incoming, shading_normal, outgoing);
        let Some(reflector) = compositor.attenuate(Some(self.reflector), reflectance.max(0.0))?
        else {
            return Ok(None);
        };
        let pdf = bounded_dot(outgoing, shading_normal) * FRAC_1_PI;
        Ok(Some((reflector, pdf)))
    }

    fn is_diffuse(&self) -> bool {
        true
    }
}
