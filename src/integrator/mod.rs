//! Integrator harness
//!
//! Owns the per-thread ray context (the compositors, allocators, and
//! arenas of one worker) and runs an inner [`RayIntegrator`] over one
//! camera ray at a time. Whatever the ray produced, the harness feeds the
//! resulting spectrum to the caller's tone-map callback and then resets
//! every arena, *also on the error path*, so a failing sample leaves the
//! thread state clean.
//!
//! Nothing here is internally synchronized; give every worker thread its
//! own [`Integrator`].

mod path;

pub use path::PathTracer;

use std::sync::Arc;

use rand::Rng;

use crate::bsdf::BsdfAllocator;
use crate::errors::{Error, Result};
use crate::geometry::HitArena;
use crate::light::{Light, LightSampler};
use crate::math::Ray;
use crate::scene::Scene;
use crate::shading::TextureCoordinateAllocator;
use crate::spectrum::{ReflectorCompositor, Spectrum, SpectrumCompositor};
use crate::tracer::{ShapeRayTracer, VisibilityTester};

/// The estimator the harness drives once per camera ray.
pub trait RayIntegrator {
    /// Estimates radiance along `ray`. The returned spectrum lives in the
    /// ray context's arenas and dies when the harness resets them.
    fn integrate<'a>(
        &self,
        ray: &Ray,
        tracer: &ShapeRayTracer<'a>,
        visibility: &mut VisibilityTester<'a>,
        lights: &'a [Arc<dyn Light>],
        light_sampler: &mut dyn LightSampler,
        spectra: &'a SpectrumCompositor,
        reflectors: &'a ReflectorCompositor,
        rng: &mut dyn Rng,
    ) -> Result<Option<&'a dyn Spectrum>>;
}

/// Per-thread render entry point wrapping an inner estimator.
pub struct Integrator<I> {
    integrator: I,
    spectra: SpectrumCompositor,
    reflectors: ReflectorCompositor,
    bsdfs: BsdfAllocator,
    texture_coordinates: TextureCoordinateAllocator,
    hits: HitArena,
}

impl<I: RayIntegrator> Integrator<I> {
    #[must_use]
    pub fn new(integrator: I) -> Self {
        Self {
            integrator,
            spectra: SpectrumCompositor::new(),
            reflectors: ReflectorCompositor::new(),
            bsdfs: BsdfAllocator::new(),
            texture_coordinates: TextureCoordinateAllocator::new(),
            hits: HitArena::new(),
        }
    }

    /// Evaluates one camera ray: runs the inner integrator against `scene`
    /// and hands the resulting spectrum (or `None` for black) to
    /// `tone_map` before the per-ray arenas are reset.
    ///
    /// `epsilon` is the minimum trace distance; it must be finite and
    /// non-negative ([`Error::InvalidArgument`]`(6)` otherwise). An invalid
    /// ray is [`Error::InvalidArgument`]`(4)`.
    pub fn integrate(
        &mut self,
        scene: &dyn Scene,
        lights: &[Arc<dyn Light>],
        light_sampler: &mut dyn LightSampler,
        ray: Ray,
        rng: &mut dyn Rng,
        epsilon: f32,
        tone_map: &mut dyn FnMut(Option<&dyn Spectrum>) -> Result<()>,
    ) -> Result<()> {
        if !ray.is_valid() {
            return Err(Error::InvalidArgument(4));
        }
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(Error::InvalidArgument(6));
        }

        let result = {
            let tracer = ShapeRayTracer::new(
                scene,
                epsilon,
                &self.hits,
                &self.texture_coordinates,
                &self.bsdfs,
                &self.reflectors,
                &self.spectra,
            );
            let mut visibility = VisibilityTester::new(scene, epsilon, &self.hits);

            self.integrator
                .integrate(
                    &ray,
                    &tracer,
                    &mut visibility,
                    lights,
                    light_sampler,
                    &self.spectra,
                    &self.reflectors,
                    rng,
                )
                .and_then(|spectrum| tone_map(spectrum))
        };

        if let Err(error) = &result {
            log::debug!("ray sample aborted: {error} (code {:#x})", error.code());
        }

        // The arenas are reset whatever happened above; a failed sample must
        // not leak state into the next one.
        self.spectra.free_all();
        self.reflectors.free_all();
        self.bsdfs.free_all();
        self.texture_coordinates.free_all();
        self.hits.free_all();

        result
    }
}
