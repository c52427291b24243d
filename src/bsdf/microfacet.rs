//! Microfacet reflection: Trowbridge–Reitz distribution with a dielectric
//! Fresnel term.
//!
//! The distribution works in its own local space where the shading normal is
//! +Z; the BSDF translates directions in and out of that frame. Sampling
//! draws a half vector from the visible normal distribution, so the
//! resulting density is `D(h) · G1(i) · |i·h| / cos θi`, converted to a
//! density over outgoing directions by the reflection Jacobian
//! `1 / (4 |i·h|)`.

use std::f32::consts::PI;

use glam::Vec3;
use rand::{Rng, RngExt};

use crate::bsdf::{Bsdf, BsdfSample, BsdfSampleFlags, Pdf};
use crate::errors::{Error, Result};
use crate::math::OrthonormalBasis;
use crate::spectrum::{Reflector, ReflectorCompositor};

// ─── Trowbridge–Reitz distribution ────────────────────────────────────────────

/// The GGX normal distribution with independent tangent-space roughness in
/// x and y.
#[derive(Clone, Copy, Debug)]
pub struct TrowbridgeReitz {
    alpha_x: f32,
    alpha_y: f32,
}

impl TrowbridgeReitz {
    pub fn new(alpha_x: f32, alpha_y: f32) -> Result<Self> {
        if !alpha_x.is_finite() || alpha_x <= 0.0 {
            return Err(Error::InvalidArgument(0));
        }
        if !alpha_y.is_finite() || alpha_y <= 0.0 {
            return Err(Error::InvalidArgument(1));
        }
        Ok(Self { alpha_x, alpha_y })
    }

    /// Maps a perceptual roughness in `[0, 1]` to a distribution alpha.
    #[must_use]
    pub fn roughness_to_alpha(roughness: f32) -> f32 {
        let x = roughness.max(1e-3).ln();
        1.62142
            + 0.819_955 * x
            + 0.1734 * x * x
            + 0.017_120_1 * x * x * x
            + 0.000_640_711 * x * x * x * x
    }

    /// The normal distribution evaluated at a local-space half vector.
    #[must_use]
    pub fn d(&self, half_angle: Vec3) -> f32 {
        let cos_theta = half_angle.z;
        let cos2_theta = cos_theta * cos_theta;
        let sin2_theta = 1.0 - cos2_theta;
        let tan2_theta = sin2_theta / cos2_theta;
        if tan2_theta.is_infinite() || tan2_theta.is_nan() {
            return 0.0;
        }

        let (sin2_phi, cos2_phi) = Self::azimuth_squares(half_angle, sin2_theta);

        let e = (cos2_phi / (self.alpha_x * self.alpha_x)
            + sin2_phi / (self.alpha_y * self.alpha_y))
            * tan2_theta;

        1.0 / (PI * self.alpha_x * self.alpha_y * cos2_theta * cos2_theta * (1.0 + e) * (1.0 + e))
    }

    /// Smith's masking auxiliary function Λ for a local-space direction.
    #[must_use]
    pub fn lambda(&self, vector: Vec3) -> f32 {
        let cos_theta = vector.z;
        let cos2_theta = cos_theta * cos_theta;
        let sin2_theta = 1.0 - cos2_theta;
        let tan2_theta = sin2_theta / cos2_theta;
        if tan2_theta.is_infinite() || tan2_theta.is_nan() {
            return 0.0;
        }

        let (sin2_phi, cos2_phi) = Self::azimuth_squares(vector, sin2_theta);

        let alpha2 = cos2_phi * self.alpha_x * self.alpha_x
            + sin2_phi * self.alpha_y * self.alpha_y;

        0.5 * (-1.0 + (1.0 + alpha2 * tan2_theta).sqrt())
    }

    /// The bidirectional Smith masking-shadowing term.
    #[must_use]
    pub fn g(&self, incoming: Vec3, outgoing: Vec3) -> f32 {
        1.0 / (1.0 + self.lambda(incoming) + self.lambda(outgoing))
    }

    /// The unidirectional Smith masking term.
    #[must_use]
    pub fn g1(&self, vector: Vec3) -> f32 {
        1.0 / (1.0 + self.lambda(vector))
    }

    /// Density of [`sample_half_angle`](Self::sample_half_angle) over half
    /// vectors, both in local space.
    #[must_use]
    pub fn pdf(&self, incoming: Vec3, half_angle: Vec3) -> f32 {
        self.d(half_angle)
            * self.g1(incoming)
            * half_angle.dot(incoming).abs()
            / incoming.z.abs()
    }

    /// Samples a half vector from the distribution of normals visible from
    /// the local-space `incoming` direction.
    #[must_use]
    pub fn sample_half_angle(&self, incoming: Vec3, u: f32, v: f32) -> Vec3 {
        let (incoming, flip) = if incoming.z < 0.0 {
            (-incoming, true)
        } else {
            (incoming, false)
        };

        let stretched =
            Vec3::new(incoming.x * self.alpha_x, incoming.y * self.alpha_y, incoming.z)
                .normalize();

        let (mut slope_x, mut slope_y) = Self::sample_slopes(stretched.z, u, v);

        let cos2_stretched = stretched.z * stretched.z;
        let sin_stretched = (1.0 - cos2_stretched).sqrt();
        let (sin_phi, cos_phi) = if sin_stretched == 0.0 {
            (0.0, 1.0)
        } else {
            (
                (stretched.y / sin_stretched).clamp(-1.0, 1.0),
                (stretched.x / sin_stretched).clamp(-1.0, 1.0),
            )
        };

        let rotated_x = cos_phi * slope_x - sin_phi * slope_y;
        slope_y = sin_phi * slope_x + cos_phi * slope_y;
        slope_x = rotated_x;

        slope_x *= self.alpha_x;
        slope_y *= self.alpha_y;

        let result = Vec3::new(-slope_x, -slope_y, 1.0).normalize();
        if flip { -result } else { result }
    }

    /// Slope-space sampling of the visible normal distribution for a unit
    /// roughness cone.
    fn sample_slopes(cos_theta: f32, u: f32, mut v: f32) -> (f32, f32) {
        // Normal incidence: uniform disk.
        if cos_theta > 0.9999 {
            let r = (u / (1.0 - u)).sqrt();
            let phi = 2.0 * PI * v;
            return (r * phi.cos(), r * phi.sin());
        }

        let cos2_theta = cos_theta * cos_theta;
        let sin2_theta = 1.0 - cos2_theta;
        let tan2_theta = sin2_theta / cos2_theta;
        let tan_theta = tan2_theta.sqrt();

        let g1 = 2.0 / (1.0 + (1.0 + tan2_theta).sqrt());

        let a = 2.0 * u / g1 - 1.0;
        let tmp = (1.0 / (a * a - 1.0)).min(1e10);
        let b = tan_theta;
        let d = (b * b * tmp * tmp - (a * a - b * b) * tmp).max(0.0).sqrt();
        let slope_x_1 = b * tmp - d;
        let slope_x_2 = b * tmp + d;

        let slope_x = if a < 0.0 || slope_x_2 > 1.0 / tan_theta {
            slope_x_1
        } else {
            slope_x_2
        };

        let s = if v > 0.5 {
            v = 2.0 * (v - 0.5);
            1.0
        } else {
            v = 2.0 * (0.5 - v);
            -1.0
        };

        let z = (v * (v * (v * 0.273_85 - 0.733_69) + 0.463_41))
            / (v * (v * (v * 0.093_073 + 0.309_42) - 1.0) + 0.597_999);
        let slope_y = s * z * (1.0 + slope_x * slope_x).sqrt();

        (slope_x, slope_y)
    }

    fn azimuth_squares(vector: Vec3, sin2_theta: f32) -> (f32, f32) {
        let sin_theta = sin2_theta.sqrt();
        if sin_theta == 0.0 {
            return (0.0, 1.0);
        }
        let cos_phi = (vector.x / sin_theta).clamp(-1.0, 1.0);
        let sin_phi = (vector.y / sin_theta).clamp(-1.0, 1.0);
        (sin_phi * sin_phi, cos_phi * cos_phi)
    }
}

// ─── Dielectric Fresnel ───────────────────────────────────────────────────────

/// Fresnel reflectance between two dielectric media.
#[derive(Clone, Copy, Debug)]
pub struct DielectricFresnel {
    eta_incident: f32,
    eta_transmitted: f32,
}

impl DielectricFresnel {
    pub fn new(eta_incident: f32, eta_transmitted: f32) -> Result<Self> {
        if !eta_incident.is_finite() || eta_incident <= 0.0 {
            return Err(Error::InvalidArgument(0));
        }
        if !eta_transmitted.is_finite() || eta_transmitted <= 0.0 {
            return Err(Error::InvalidArgument(1));
        }
        Ok(Self {
            eta_incident,
            eta_transmitted,
        })
    }

    /// The unpolarised reflectance coefficient for a given incident cosine.
    #[must_use]
    pub fn coefficient(&self, cos_theta_i: f32) -> f32 {
        let (eta_i, eta_t, cos_theta_i) = if cos_theta_i > 0.0 {
            (self.eta_transmitted, self.eta_incident, -cos_theta_i)
        } else {
            (self.eta_incident, self.eta_transmitted, cos_theta_i)
        };

        let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
        let sin_theta_t = eta_i / eta_t * sin_theta_i;
        if sin_theta_t >= 1.0 {
            // Total internal reflection.
            return 1.0;
        }
        let cos_theta_t = (1.0 - sin_theta_t * sin_theta_t).sqrt();

        let r_parallel = (eta_t * cos_theta_i - eta_i * cos_theta_t)
            / (eta_t * cos_theta_i + eta_i * cos_theta_t);
        let r_perpendicular = (eta_i * cos_theta_i - eta_t * cos_theta_t)
            / (eta_i * cos_theta_i + eta_t * cos_theta_t);

        0.5 * (r_parallel * r_parallel + r_perpendicular * r_perpendicular)
    }

    /// The reflectance as an attenuated perfect reflector.
    pub fn compute<'a>(
        &self,
        cos_theta_i: f32,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Reflector>> {
        let coefficient = self.coefficient(cos_theta_i).clamp(0.0, 1.0);
        compositor.attenuate(Some(compositor.perfect_reflector()), coefficient)
    }
}

// ─── Microfacet BSDF ──────────────────────────────────────────────────────────

/// Glossy reflection: `D · G · F / (4 cos θi cos θo)` modulated by a base
/// reflectance.
#[derive(Clone, Copy)]
pub struct MicrofacetBsdf<'r> {
    reflector: &'r dyn Reflector,
    distribution: TrowbridgeReitz,
    fresnel: DielectricFresnel,
}

impl<'r> MicrofacetBsdf<'r> {
    #[must_use]
    pub fn new(
        reflector: &'r dyn Reflector,
        distribution: TrowbridgeReitz,
        fresnel: DielectricFresnel,
    ) -> Self {
        Self {
            reflector,
            distribution,
            fresnel,
        }
    }

    fn evaluate<'a>(
        &'a self,
        incoming_toward_surface: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        let incoming = -incoming_toward_surface;

        let frame = OrthonormalBasis::from_normal(shading_normal);
        let local_incoming = frame.to_local(incoming);
        let local_outgoing = frame.to_local(outgoing);

        let cos_theta_i = local_incoming.z;
        let cos_theta_o = local_outgoing.z;
        if (cos_theta_i < 0.0) != (cos_theta_o < 0.0) {
            return Ok(None);
        }

        let abs_cos_theta_i = cos_theta_i.abs();
        let abs_cos_theta_o = cos_theta_o.abs();
        if abs_cos_theta_i == 0.0 || abs_cos_theta_o == 0.0 {
            return Ok(None);
        }

        let half_angle = local_incoming + local_outgoing;
        if half_angle == Vec3::ZERO {
            return Ok(None);
        }
        let half_angle = half_angle.normalize();
        let cos_theta_half = half_angle.z.abs();

        let Some(fresnel) = self.fresnel.compute(cos_theta_half, compositor)? else {
            return Ok(None);
        };

        let d = self.distribution.d(half_angle);
        let g = self.distribution.g(local_incoming, local_outgoing);
        let attenuation = d * g / (4.0 * abs_cos_theta_i * abs_cos_theta_o);
        if !attenuation.is_finite() {
            return Ok(None);
        }

        let Some(glossy) = compositor.attenuate(Some(fresnel), attenuation)? else {
            return Ok(None);
        };
        let Some(reflector) = compositor.multiply(Some(self.reflector), Some(glossy))? else {
            return Ok(None);
        };

        let pdf = self.distribution.pdf(local_incoming, half_angle)
            / (4.0 * local_incoming.dot(half_angle));
        if !pdf.is_finite() || pdf < 0.0 {
            return Ok(None);
        }

        Ok(Some((reflector, pdf)))
    }
}

impl Bsdf for MicrofacetBsdf<'_> {
    fn sample<'a>(
        &'a self,
        incoming: Vec3,
        surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        let _ = surface_normal;
        let toward_light = -incoming;

        let cos_theta_i = shading_normal.dot(toward_light);
        if cos_theta_i == 0.0 {
            return Ok(None);
        }

        let u: f32 = rng.random_range(0.0..1.0);
        let v: f32 = rng.random_range(0.0..1.0);

        let frame = OrthonormalBasis::from_normal(shading_normal);
        let local_incoming = frame.to_local(toward_light);

        let local_half_angle = self.distribution.sample_half_angle(local_incoming, u, v);
        let half_angle = frame.to_world(local_half_angle);

        if toward_light.dot(half_angle) < 0.0 {
            return Ok(None);
        }

        let outgoing = incoming.reflect(half_angle);

        let cos_theta_o = shading_normal.dot(outgoing);
        if (cos_theta_i < 0.0) != (cos_theta_o < 0.0) {
            return Ok(None);
        }

        let Some((reflector, pdf)) =
            self.evaluate(incoming, shading_normal, outgoing, compositor)?
        else {
            return Ok(None);
        };
        if pdf <= 0.0 {
            return Ok(None);
        }

        Ok(Some(BsdfSample {
            reflector,
            flags: BsdfSampleFlags::empty(),
            outgoing,
            pdf: Pdf::Finite(pdf),
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
        let result = self.evaluate(incoming, shading_normal, outgoing, compositor)?;
        Ok(result.and_then(|(reflector, pdf)| (pdf > 0.0).then_some(reflector)))
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
        self.evaluate(incoming, shading_normal, outgoing, compositor)
    }

    fn is_diffuse(&self) -> bool {
        true
    }
}
