//! Environmental lights
//!
//! An [`EnvironmentalLight`] is radiance as a function of direction only; a
//! scene owns at most one, and the ray tracer evaluates it for rays that
//! escape all geometry. [`EnvironmentalLightAdapter`] additionally surfaces
//! it to the generic light loop, where every geometry test is an unbounded
//! shadow ray.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use crate::bsdf::Pdf;
use crate::errors::Result;
use crate::light::{Light, LightSample};
use crate::math::{Ray, sample_hemisphere_uniformly};
use crate::spectrum::{Spectrum, SpectrumCompositor};
use crate::tracer::VisibilityTester;

/// Radiance arriving from infinity as a function of direction.
pub trait EnvironmentalLight: Send + Sync {
    /// Samples a direction toward the environment from a shading point.
    /// Returns the radiance, the unit direction, and the density (finite;
    /// environments are never delta-distributed here).
    fn sample<'a>(
        &'a self,
        hit_point: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, Vec3, f32)>;

    /// The radiance along `direction`.
    fn compute_emissive<'a>(
        &'a self,
        direction: Vec3,
        compositor: &'a SpectrumCompositor,
    ) -> Result<Option<&'a dyn Spectrum>>;

    /// The radiance along `direction` with the density
    /// [`sample`](Self::sample) would have drawn it with.
    fn compute_emissive_with_pdf<'a>(
        &'a self,
        direction: Vec3,
        shading_normal: Vec3,
        compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, f32)>;
}

// ─── Constant environment ─────────────────────────────────────────────────────

/// An environment radiating the same spectrum in every direction, sampled
/// uniformly over the hemisphere above the shading normal.
pub struct ConstantEnvironmentalLight {
    spectrum: Arc<dyn Spectrum>,
}

impl ConstantEnvironmentalLight {
    #[must_use]
    pub fn new(spectrum: Arc<dyn Spectrum>) -> Self {
        Self { spectrum }
    }
}

const UNIFORM_HEMISPHERE_PDF: f32 = 1.0 / (2.0 * PI);

impl EnvironmentalLight for ConstantEnvironmentalLight {
    fn sample<'a>(
        &'a self,
        _hit_point: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, Vec3, f32)> {
        let direction = sample_hemisphere_uniformly(shading_normal, rng)?;
        Ok((Some(&*self.spectrum), direction, UNIFORM_HEMISPHERE_PDF))
    }

    fn compute_emissive<'a>(
        &'a self,
        _direction: Vec3,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<Option<&'a dyn Spectrum>> {
        Ok(Some(&*self.spectrum))
    }

    fn compute_emissive_with_pdf<'a>(
        &'a self,
        direction: Vec3,
        shading_normal: Vec3,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, f32)> {
        if direction.dot(shading_normal) <= 0.0 {
            return Ok((Some(&*self.spectrum), 0.0));
        }
        Ok((Some(&*self.spectrum), UNIFORM_HEMISPHERE_PDF))
    }
}

// ─── Adapter ──────────────────────────────────────────────────────────────────

/// Surfaces an [`EnvironmentalLight`] to the generic light loop.
pub struct EnvironmentalLightAdapter {
    environment: Arc<dyn EnvironmentalLight>,
}

impl EnvironmentalLightAdapter {
    #[must_use]
    pub fn new(environment: Arc<dyn EnvironmentalLight>) -> Self {
        Self { environment }
    }
}

impl Light for EnvironmentalLightAdapter {
    fn sample<'a>(
        &'a self,
        hit_point: Vec3,
        shading_normal: Vec3,
        visibility: &mut VisibilityTester<'_>,
        rng: &mut dyn Rng,
        compositor: &'a SpectrumCompositor,
    ) -> Result<LightSample<'a>> {
        let (spectrum, direction, pdf) =
            self.environment
                .sample(hit_point, shading_normal, rng, compositor)?;
        if spectrum.is_none() || pdf <= 0.0 {
            return Ok(LightSample::none(direction));
        }

        let shadow_ray = Ray::new(hit_point, direction);
        if !visibility.test_any_distance(&shadow_ray)? {
            return Ok(LightSample::none(direction));
        }

        Ok(LightSample {
            spectrum,
            to_light: direction,
            pdf: Pdf::Finite(pdf),
        })
    }

    fn compute_emissive<'a>(
        &'a self,
        to_light: &Ray,
        visibility: &mut VisibilityTester<'_>,
        compositor: &'a SpectrumCompositor,
    ) -> Result<Option<&'a dyn Spectrum>> {
        if !visibility.test_any_distance(to_light)? {
            return Ok(None);
        }
        self.environment
            .compute_emissive(to_light.direction, compositor)
    }

    fn compute_emissive_with_pdf<'a>(
        &'a self,
        to_light: &Ray,
        visibility: &mut VisibilityTester<'_>,
        compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, f32)> {
        if !visibility.test_any_distance(to_light)? {
            return Ok((None, 0.0));
        }
        // The adapter has no record of the shading normal here; treat the
        // ray direction itself as the upper hemisphere axis.
        self.environment
            .compute_emissive_with_pdf(to_light.direction, to_light.direction, compositor)
    }
}
