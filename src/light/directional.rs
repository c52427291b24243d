//! Directional (delta) lights.

use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use crate::bsdf::Pdf;
use crate::errors::{Error, Result};
use crate::light::{Light, LightSample};
use crate::math::{Ray, vector_is_valid_direction};
use crate::spectrum::{Spectrum, SpectrumCompositor};
use crate::tracer::VisibilityTester;

/// An infinitely distant light radiating from a single direction.
///
/// Delta-distributed: sampling reports [`Pdf::Delta`] and emission along an
/// arbitrary ray is always nothing.
pub struct DirectionalLight {
    to_light: Vec3,
    spectrum: Arc<dyn Spectrum>,
}

impl DirectionalLight {
    /// `to_light` points from any surface toward the light.
    pub fn new(to_light: Vec3, spectrum: Arc<dyn Spectrum>) -> Result<Self> {
        if !vector_is_valid_direction(to_light) {
            return Err(Error::InvalidArgument(0));
        }
        Ok(Self {
            to_light: to_light.normalize(),
            spectrum,
        })
    }
}

impl Light for DirectionalLight {
    fn sample<'a>(
        &'a self,
        hit_point: Vec3,
        shading_normal: Vec3,
        visibility: &mut VisibilityTester<'_>,
        _rng: &mut dyn Rng,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<LightSample<'a>> {
        if self.to_light.dot(shading_normal) <= 0.0 {
            return Ok(LightSample::none(self.to_light));
        }

        let shadow_ray = Ray::new(hit_point, self.to_light);
        if !visibility.test_any_distance(&shadow_ray)? {
            return Ok(LightSample::none(self.to_light));
        }

        Ok(LightSample {
            spectrum: Some(&*self.spectrum),
            to_light: self.to_light,
            pdf: Pdf::Delta,
        })
    }

    fn compute_emissive<'a>(
        &'a self,
        _to_light: &Ray,
        _visibility: &mut VisibilityTester<'_>,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<Option<&'a dyn Spectrum>> {
        Ok(None)
    }

    fn compute_emissive_with_pdf<'a>(
        &'a self,
        _to_light: &Ray,
        _visibility: &mut VisibilityTester<'_>,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, f32)> {
        Ok((None, 0.0))
    }
}
