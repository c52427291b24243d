//! Radiance sources
//!
//! The [`Light`] trait is the polymorphic radiance source the integrator's
//! next-event estimation loop consumes: it can be sampled from a shading
//! point, and it can report its emission along an arbitrary ray (with or
//! without the sampling density, for multiple importance sampling).
//!
//! A [`LightSampler`] chooses which lights to estimate at a vertex;
//! [`AllLightSampler`] visits every light, [`UniformLightSampler`] picks one
//! uniformly at random.

mod area;
mod directional;
mod environment;

pub use area::AreaLight;
pub use directional::DirectionalLight;
pub use environment::{ConstantEnvironmentalLight, EnvironmentalLight, EnvironmentalLightAdapter};

use glam::Vec3;
use rand::{Rng, RngExt};

use crate::bsdf::Pdf;
use crate::errors::Result;
use crate::math::Ray;
use crate::spectrum::{Spectrum, SpectrumCompositor};
use crate::tracer::VisibilityTester;

/// The result of sampling a light from a shading point.
#[derive(Clone, Copy)]
pub struct LightSample<'a> {
    /// Radiance arriving from the light; `None` when the light contributes
    /// nothing along the sampled direction.
    pub spectrum: Option<&'a dyn Spectrum>,
    /// Unit direction from the shading point toward the light.
    pub to_light: Vec3,
    /// Density of the sampled direction; [`Pdf::Delta`] for delta lights.
    pub pdf: Pdf,
}

impl<'a> LightSample<'a> {
    /// The "nothing arrives" sample.
    #[must_use]
    pub fn none(to_light: Vec3) -> Self {
        Self {
            spectrum: None,
            to_light,
            pdf: Pdf::Finite(0.0),
        }
    }
}

/// A polymorphic radiance source. Long-lived and shared.
pub trait Light: Send + Sync {
    /// Samples a direction toward the light from `hit_point`, testing
    /// occlusion through `visibility`.
    fn sample<'a>(
        &'a self,
        hit_point: Vec3,
        shading_normal: Vec3,
        visibility: &mut VisibilityTester<'_>,
        rng: &mut dyn Rng,
        compositor: &'a SpectrumCompositor,
    ) -> Result<LightSample<'a>>;

    /// The light's emission along `to_light` (origin at the shading point),
    /// or `None` when the ray never reaches it.
    fn compute_emissive<'a>(
        &'a self,
        to_light: &Ray,
        visibility: &mut VisibilityTester<'_>,
        compositor: &'a SpectrumCompositor,
    ) -> Result<Option<&'a dyn Spectrum>>;

    /// As [`compute_emissive`](Self::compute_emissive), also reporting the
    /// density with which [`sample`](Self::sample) would have drawn the
    /// ray's direction. A zero density means "drop this term".
    fn compute_emissive_with_pdf<'a>(
        &'a self,
        to_light: &Ray,
        visibility: &mut VisibilityTester<'_>,
        compositor: &'a SpectrumCompositor,
    ) -> Result<(Option<&'a dyn Spectrum>, f32)>;
}

// ─── Light samplers ───────────────────────────────────────────────────────────

/// Chooses which of the scene's lights to estimate direct lighting from at
/// one path vertex.
///
/// The light list itself lives beside the scene and is handed to the
/// integrator separately; samplers deal in indices into that list.
/// `prepare` is called once per vertex, then `next_sample` is drained. Each
/// sample carries the selection probability the estimate must be divided by.
pub trait LightSampler {
    fn prepare(
        &mut self,
        rng: &mut dyn Rng,
        hit_point: Vec3,
        shading_normal: Vec3,
        light_count: usize,
    ) -> Result<()>;

    fn next_sample(&mut self) -> Option<(usize, f32)>;
}

/// Visits every light with selection probability one.
#[derive(Default)]
pub struct AllLightSampler {
    count: usize,
    cursor: usize,
}

impl AllLightSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LightSampler for AllLightSampler {
    fn prepare(
        &mut self,
        _rng: &mut dyn Rng,
        _hit_point: Vec3,
        _shading_normal: Vec3,
        light_count: usize,
    ) -> Result<()> {
        self.count = light_count;
        self.cursor = 0;
        Ok(())
    }

    fn next_sample(&mut self) -> Option<(usize, f32)> {
        if self.cursor >= self.count {
            return None;
        }
        self.cursor += 1;
        Some((self.cursor - 1, 1.0))
    }
}

/// Picks a single light uniformly at random; the selection probability is
/// `1 / light count`.
#[derive(Default)]
pub struct UniformLightSampler {
    selected: Option<(usize, f32)>,
}

impl UniformLightSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LightSampler for UniformLightSampler {
    fn prepare(
        &mut self,
        rng: &mut dyn Rng,
        _hit_point: Vec3,
        _shading_normal: Vec3,
        light_count: usize,
    ) -> Result<()> {
        self.selected = if light_count == 0 {
            None
        } else {
            let index = rng.random_range(0..light_count);
            Some((index, 1.0 / light_count as f32))
        };
        Ok(())
    }

    fn next_sample(&mut self) -> Option<(usize, f32)> {
        self.selected.take()
    }
}
