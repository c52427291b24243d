//! Area lights
//!
//! Adapts an emissive shape face into a [`Light`]. The wrapper traces its
//! own shape, and only its shape, to find where a candidate direction
//! meets the face, samples the emissive material there, converts the face's
//! surface-area density to solid angle, and finally shadow-tests the world
//! ray against the full scene.
//!
//! In the nested variant the traced shape differs from the light-carrying
//! shape (a light embedded inside a hull); hits must then also match the
//! light shape's identity.

use std::ptr;
use std::sync::Arc;

use glam::{Affine3A, Vec3};
use rand::Rng;

use crate::bsdf::Pdf;
use crate::errors::{Error, Result};
use crate::geometry::{Shape, trace_single_shape};
use crate::light::{Light, LightSample};
use crate::math::{Ray, vector_is_valid_direction};
use crate::spectrum::{Spectrum, SpectrumCompositor};
use crate::tracer::VisibilityTester;

/// An emissive shape face exposed as a light.
pub struct AreaLight {
    trace_shape: Arc<dyn Shape>,
    light_shape: Arc<dyn Shape>,
    nested: bool,
    face: u32,
    model_to_world: Option<Affine3A>,
}

impl AreaLight {
    /// Wraps `shape`'s `face` as a light.
    ///
    /// The shape must expose the full emissive triple
    /// ([`Shape::is_sampleable`]), else [`Error::InvalidArgument`]`(0)`,
    /// and the face must carry an emissive material, else
    /// [`Error::InvalidArgumentCombination`]`(0)`.
    pub fn new(
        shape: Arc<dyn Shape>,
        face: u32,
        model_to_world: Option<Affine3A>,
    ) -> Result<Self> {
        Self::build(Arc::clone(&shape), shape, false, face, model_to_world)
    }

    /// Wraps `light_shape`'s `face` as a light whose rays are traced
    /// through `trace_shape` (the shape actually present in the scene).
    pub fn nested(
        trace_shape: Arc<dyn Shape>,
        light_shape: Arc<dyn Shape>,
        face: u32,
        model_to_world: Option<Affine3A>,
    ) -> Result<Self> {
        Self::build(trace_shape, light_shape, true, face, model_to_world)
    }

    fn build(
        trace_shape: Arc<dyn Shape>,
        light_shape: Arc<dyn Shape>,
        nested: bool,
        face: u32,
        model_to_world: Option<Affine3A>,
    ) -> Result<Self> {
        let argument = u8::from(nested);
        if !light_shape.is_sampleable() {
            log::warn!("area light over a shape without the emissive triple");
            return Err(Error::InvalidArgument(argument));
        }
        if light_shape.emissive_material(face)?.is_none() {
            log::warn!("area light over face {face} with no emissive material");
            return Err(Error::InvalidArgumentCombination(0));
        }
        Ok(Self {
            trace_shape,
            light_shape,
            nested,
            face,
            model_to_world,
        })
    }

    fn transform_point(&self, point: Vec3) -> Vec3 {
        match &self.model_to_world {
            Some(matrix) => matrix.transform_point3(point),
            None => point,
        }
    }

    /// Traces the wrapped shape along `world_ray`, and when the closest hit
    /// lands on the target face (and shape, for nested lights), samples the
    /// emissive material there.
    ///
    /// Returns the emitted spectrum, the model-ray hit distance, and the
    /// matching world-space distance.
    fn sample_emission<'a>(
        &'a self,
        world_ray: &Ray,
        visibility: &VisibilityTester<'_>,
    ) -> Result<Option<(&'a dyn Spectrum, f32, f32)>> {
        let hit = trace_single_shape(
            &*self.trace_shape,
            self.model_to_world.as_ref(),
            world_ray,
            visibility.epsilon(),
            visibility.hit_arena(),
        )?;
        let Some(hit) = hit else {
            return Ok(None);
        };

        if hit.front_face != self.face {
            return Ok(None);
        }
        if self.nested
            && !ptr::addr_eq(hit.shape as *const dyn Shape, Arc::as_ptr(&self.light_shape))
        {
            return Ok(None);
        }

        let model_hit_point = hit.model_ray.at(hit.distance);
        let Some(emissive) = self.light_shape.emissive_material(self.face)? else {
            return Ok(None);
        };
        let Some(spectrum) = emissive.sample(model_hit_point, hit.additional_data)? else {
            return Ok(None);
        };

        let world_distance = match &self.model_to_world {
            Some(matrix) => matrix
                .transform_point3(model_hit_point)
                .distance(world_ray.origin),
            None => hit.distance,
        };

        // Lifetime note: the spectrum borrows the emissive material, which
        // the light shape owns; re-borrow through self to outlive the trace.
        Ok(Some((spectrum, hit.distance, world_distance)))
    }

    /// Emission, solid-angle pdf, and occlusion along a world ray.
    fn emission_with_pdf<'a>(
        &'a self,
        world_ray: &Ray,
        visibility: &mut VisibilityTester<'_>,
    ) -> Result<(Option<&'a dyn Spectrum>, f32)> {
        let Some((spectrum, model_distance, world_distance)) =
            self.sample_emission(world_ray, visibility)?
        else {
            return Ok((None, 0.0));
        };

        let model_ray = match &self.model_to_world {
            Some(matrix) => world_ray.transformed(&matrix.inverse()),
            None => *world_ray,
        };
        let pdf =
            self.light_shape
                .pdf_by_solid_angle(&model_ray, model_distance, self.face)?;
        if pdf <= 0.0 || pdf.is_infinite() || pdf.is_nan() {
            return Ok((Some(spectrum), 0.0));
        }

        if !visibility.test(world_ray, world_distance)? {
            return Ok((Some(spectrum), 0.0));
        }

        Ok((Some(spectrum), pdf))
    }
}

impl Light for AreaLight {
    fn sample<'a>(
        &'a self,
        hit_point: Vec3,
        _shading_normal: Vec3,
        visibility: &mut VisibilityTester<'_>,
        rng: &mut dyn Rng,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<LightSample<'a>> {
        let sampled_point = self.light_shape.sample_face(self.face, rng)?;
        let world_sampled_point = self.transform_point(sampled_point);

        let to_light = world_sampled_point - hit_point;
        if !vector_is_valid_direction(to_light) {
            return Ok(LightSample::none(Vec3::Z));
        }
        let to_light = to_light.normalize();

        let world_ray = Ray::new(hit_point, to_light);
        let (spectrum, pdf) = self.emission_with_pdf(&world_ray, visibility)?;

        Ok(LightSample {
            spectrum: if pdf > 0.0 { spectrum } else { None },
            to_light,
            pdf: Pdf::Finite(pdf),
        })
    }

    fn compute_emissive<'a>(
        &'a self,
        to_light: &Ray,
        visibility: &mut VisibilityTester<'_>,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<Option<&'a dyn Spectrum>> {
        let (spectrum, pdf) = self.emission_with_pdf(to_light, visibility)?;
        Ok(if pdf > 0.0 { spectrum } else { None })
    }

    fn compute_emissive_with_pdf<'a>(
        &'a self,
        to_light: &Ray,
        visibility: &mut VisibilityTester<'_>,
        _compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, f32)> {
        self.emission_with_pdf(to_light, visibility)
    }
}
