//! Path tracer
//!
//! The Monte-Carlo light-transport estimator: next-event estimation at
//! every diffuse vertex, BSDF importance sampling for the continuation,
//! the power heuristic to weight the two strategies against each other,
//! and Russian roulette on the path throughput color.
//!
//! Double counting is avoided with the usual specular-flag bookkeeping:
//! emission found by following the path is credited only when next-event
//! estimation could not have found it (the first vertex, or a vertex
//! reached through a delta lobe); everywhere else the light's contribution
//! along the sampled continuation enters through the MIS term instead.

use std::sync::Arc;

use rand::{Rng, RngExt};
use smallvec::SmallVec;

use crate::bsdf::{BsdfSampleFlags, Pdf, checked_compute_diffuse_with_pdf};
use crate::errors::{Error, Result};
use crate::integrator::RayIntegrator;
use crate::light::{Light, LightSampler};
use crate::math::{Ray, RayDifferential};
use crate::spectrum::{ColorIntegrator, ReflectorCompositor, Spectrum, SpectrumCompositor};
use crate::tracer::{ShapeRayTracer, VisibilityTester};

/// Power heuristic for two sampling strategies.
fn power_heuristic(sampled: f32, other: f32) -> f32 {
    let sampled_squared = sampled * sampled;
    sampled_squared / (sampled_squared + other * other)
}

/// The path-tracing integrator.
pub struct PathTracer {
    min_bounces: u32,
    max_bounces: u32,
    min_termination_probability: f32,
    roulette_threshold: f32,
    color_integrator: Arc<dyn ColorIntegrator>,
}

impl PathTracer {
    /// Creates a path tracer.
    ///
    /// - `min_bounces`: Russian roulette is disabled below this depth.
    /// - `max_bounces`: hard cutoff on the number of bounces; zero means
    ///   no cutoff (paths end by escaping, absorption, or roulette).
    /// - `min_termination_probability`: floor on the roulette termination
    ///   probability once roulette applies; in `[0, 1]`.
    /// - `roulette_threshold`: roulette is considered only while the
    ///   throughput color's maximum channel is below this; non-negative
    ///   (`f32::INFINITY` applies roulette at every eligible vertex).
    /// - `color_integrator`: converts throughput reflectors to colors for
    ///   the roulette decision.
    pub fn new(
        min_bounces: u32,
        max_bounces: u32,
        min_termination_probability: f32,
        roulette_threshold: f32,
        color_integrator: Arc<dyn ColorIntegrator>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&min_termination_probability) {
            return Err(Error::InvalidArgument(2));
        }
        if roulette_threshold.is_nan() || roulette_threshold < 0.0 {
            return Err(Error::InvalidArgument(3));
        }
        Ok(Self {
            min_bounces,
            max_bounces,
            min_termination_probability,
            roulette_threshold,
            color_integrator,
        })
    }
}

impl RayIntegrator for PathTracer {
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
    ) -> Result<Option<&'a dyn Spectrum>> {
        let mut output: Option<&'a dyn Spectrum> = None;
        let mut throughput = Some(reflectors.perfect_reflector());
        let mut current_ray = *ray;
        let mut previous_was_specular = true;
        let mut bounce: u32 = 0;

        loop {
            let vertex = tracer.trace(&RayDifferential::without_differentials(current_ray))?;

            // Emission reached by following the path. Counted only where
            // next-event estimation could not have claimed it.
            if previous_was_specular && let Some(emitted) = vertex.emitted {
                let contribution = spectra.reflect(Some(emitted), throughput)?;
                output = spectra.add(output, contribution)?;
            }

            let Some(bsdf) = vertex.bsdf else {
                break;
            };

            let incoming = current_ray.direction.normalize();
            let hit_point = vertex.hit_point;
            let surface_normal = vertex.surface_normal;
            let shading_normal = vertex.shading_normal;

            // Next-event estimation at diffuse vertices.
            let mut vertex_lights: SmallVec<[(usize, f32); 4]> = SmallVec::new();
            if bsdf.is_diffuse() && !lights.is_empty() {
                light_sampler.prepare(rng, hit_point, shading_normal, lights.len())?;
                while let Some(sample) = light_sampler.next_sample() {
                    if sample.0 < lights.len() {
                        vertex_lights.push(sample);
                    }
                }

                for &(light_index, selection_probability) in &vertex_lights {
                    let light = &*lights[light_index];
                    let light_sample =
                        light.sample(hit_point, shading_normal, visibility, rng, spectra)?;
                    let Some(incident) = light_sample.spectrum else {
                        continue;
                    };

                    let transmitted = light_sample.to_light.dot(surface_normal) < 0.0;
                    let Some((reflectance, bsdf_pdf)) = checked_compute_diffuse_with_pdf(
                        bsdf,
                        incoming,
                        shading_normal,
                        light_sample.to_light,
                        transmitted,
                        reflectors,
                    )?
                    else {
                        continue;
                    };

                    let cosine = light_sample.to_light.dot(shading_normal).abs();
                    let (weight, density) = match light_sample.pdf {
                        // Delta lights cannot be hit by BSDF sampling;
                        // their estimate stands alone with weight one.
                        Pdf::Delta => (1.0, 1.0),
                        Pdf::Finite(light_pdf) => {
                            if light_pdf <= 0.0 {
                                continue;
                            }
                            (power_heuristic(light_pdf, bsdf_pdf), light_pdf)
                        }
                    };

                    let scale = weight * cosine / (density * selection_probability);
                    let path_reflectance = reflectors.multiply(Some(reflectance), throughput)?;
                    let direct = spectra.reflect(Some(incident), path_reflectance)?;
                    let contribution = spectra.attenuate(direct, scale)?;
                    output = spectra.add(output, contribution)?;
                }
            }

            // BSDF sampling for the continuation.
            let Some(sample) =
                bsdf.sample(incoming, surface_normal, shading_normal, rng, reflectors)?
            else {
                break;
            };

            let cosine = sample.outgoing.dot(shading_normal).abs();
            match sample.pdf {
                Pdf::Finite(pdf) => {
                    if pdf <= 0.0 || cosine == 0.0 {
                        break;
                    }
                    throughput = reflectors.multiply(throughput, Some(sample.reflector))?;
                    throughput = reflectors.attenuate(throughput, cosine / pdf)?;
                }
                Pdf::Delta => {
                    // Delta lobes fold the geometric terms into the
                    // reflectance; throughput picks it up unscaled.
                    throughput = reflectors.multiply(throughput, Some(sample.reflector))?;
                }
            }
            // A zero-attenuation reflector ends the path: nothing further
            // can contribute.
            if throughput.is_none() {
                break;
            }

            previous_was_specular =
                sample.pdf.is_delta() || sample.flags.contains(BsdfSampleFlags::SPECULAR);

            // The other half of the estimator: light found along the
            // sampled continuation, weighted against next-event estimation.
            if !previous_was_specular && !vertex_lights.is_empty() {
                let continuation = Ray::new(hit_point, sample.outgoing);
                if let Some(bsdf_pdf) = sample.pdf.finite() {
                    for &(light_index, selection_probability) in &vertex_lights {
                        let light = &*lights[light_index];
                        let (emission, light_pdf) =
                            light.compute_emissive_with_pdf(&continuation, visibility, spectra)?;
                        let Some(emission) = emission else {
                            continue;
                        };
                        if light_pdf <= 0.0 {
                            continue;
                        }
                        let weight = power_heuristic(bsdf_pdf, light_pdf);
                        let contribution = spectra.attenuated_reflect(
                            Some(emission),
                            throughput,
                            weight / selection_probability,
                        )?;
                        output = spectra.add(output, contribution)?;
                    }
                }
            }

            // Russian roulette on the throughput color.
            if bounce >= self.min_bounces {
                let throughput_color = match throughput {
                    Some(reflector) => self.color_integrator.reflector_color(reflector)?,
                    None => break,
                };
                let max_channel = throughput_color.max_channel();
                if max_channel < self.roulette_threshold {
                    let termination_probability =
                        (1.0 - max_channel).max(self.min_termination_probability);
                    let draw: f32 = rng.random_range(0.0..1.0);
                    if draw < termination_probability {
                        break;
                    }
                    throughput =
                        reflectors.attenuate(throughput, 1.0 / (1.0 - termination_probability))?;
                }
            }

            bounce += 1;
            if self.max_bounces != 0 && bounce >= self.max_bounces {
                break;
            }
            current_ray = Ray::new(hit_point, sample.outgoing);
        }

        Ok(output)
    }
}
