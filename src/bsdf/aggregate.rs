//! Aggregate BSDF
//!
//! Combines up to eight child lobes into one BSDF. Sampling picks a child
//! uniformly; for multiple importance sampling the diffuse density of every
//! other child is evaluated at the sampled direction and the densities are
//! averaged. Diffuse children are partitioned in front of specular children
//! at construction so the diffuse-only sampler can pick among them directly.

use glam::Vec3;
use rand::{Rng, RngExt};

use crate::bsdf::{
    Bsdf, BsdfSample, BsdfSampleFlags, Pdf, checked_compute_diffuse_with_pdf,
    checked_sample_diffuse,
};
use crate::errors::{Error, Result};
use crate::math::positive_dot;
use crate::spectrum::{Reflector, ReflectorCompositor};

/// Maximum number of child lobes an aggregate can carry.
pub const MAX_AGGREGATE_BSDFS: usize = 8;

/// A uniform mixture of child BSDFs. Build with [`AggregateBsdf::new`],
/// which returns the sole child directly when only one is supplied.
#[derive(Clone, Copy)]
pub struct AggregateBsdf<'a> {
    children: [Option<&'a dyn Bsdf>; MAX_AGGREGATE_BSDFS],
    count: usize,
    diffuse_count: usize,
}

impl<'a> AggregateBsdf<'a> {
    /// Combines `children` into an aggregate. `None` entries are skipped;
    /// diffuse children are moved in front of specular ones. Returns
    /// `Ok(None)` when no children remain, and the sole child unwrapped when
    /// exactly one remains. More than [`MAX_AGGREGATE_BSDFS`] children is
    /// [`Error::InvalidArgument`]`(0)`.
    pub fn new(children: &[Option<&'a dyn Bsdf>]) -> Result<Option<Self>> {
        let mut ordered: [Option<&'a dyn Bsdf>; MAX_AGGREGATE_BSDFS] =
            [None; MAX_AGGREGATE_BSDFS];
        let mut count = 0usize;
        let mut diffuse_count = 0usize;

        for child in children.iter().flatten() {
            if count >= MAX_AGGREGATE_BSDFS {
                return Err(Error::InvalidArgument(0));
            }
            if child.is_diffuse() {
                // Shift the specular suffix right to keep diffuse first.
                for i in (diffuse_count..count).rev() {
                    ordered[i + 1] = ordered[i];
                }
                ordered[diffuse_count] = Some(*child);
                diffuse_count += 1;
                count += 1;
            } else {
                ordered[count] = Some(*child);
                count += 1;
            }
        }

        if count == 0 {
            return Ok(None);
        }

        Ok(Some(Self {
            children: ordered,
            count,
            diffuse_count,
        }))
    }

    /// The sole child when the aggregate degenerated to one lobe, else the
    /// aggregate itself boxed into the allocator by the caller.
    #[must_use]
    pub fn sole_child(&self) -> Option<&'a dyn Bsdf> {
        if self.count == 1 { self.children[0] } else { None }
    }

    fn child(&self, index: usize) -> &'a dyn Bsdf {
        self.children[index].unwrap_or_else(|| unreachable!("index bounded by count"))
    }
}

impl Bsdf for AggregateBsdf<'_> {
    fn sample<'s>(
        &'s self,
        incoming: Vec3,
        surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'s ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'s>>> {
        let sampled_index: usize = rng.random_range(0..self.count);

        let Some(sample) = self.child(sampled_index).sample(
            incoming,
            surface_normal,
            shading_normal,
            rng,
            compositor,
        )?
        else {
            return Ok(None);
        };
        if sample.pdf == Pdf::Finite(0.0) {
            return Ok(None);
        }

        let below_surface = surface_normal.dot(sample.outgoing) < 0.0;
        let sampled_transmission = sample.flags.contains(BsdfSampleFlags::TRANSMISSION);
        let compute_transmission = below_surface || sampled_transmission;

        let mut reflector: Option<&dyn Reflector> = Some(sample.reflector);
        let mut specular = sample.pdf.is_delta();
        let mut pdf = sample.pdf.finite().unwrap_or(0.0);
        let mut matching = 1usize;

        for i in 0..self.count {
            if i == sampled_index {
                continue;
            }

            let Some((child_reflector, child_pdf)) = checked_compute_diffuse_with_pdf(
                self.child(i),
                incoming,
                shading_normal,
                sample.outgoing,
                compute_transmission,
                compositor,
            )?
            else {
                continue;
            };
            if child_pdf <= 0.0 {
                continue;
            }

            if specular {
                // Mixing a delta sample with finite lobes: undo the cosine
                // falloff the integrator will apply and stand the delta
                // selection in as unit density.
                let falloff =
                    positive_dot(shading_normal, sample.outgoing, sampled_transmission);
                if falloff <= 0.0 {
                    return Ok(None);
                }
                reflector = compositor.attenuate(reflector, 1.0 / falloff)?;
                pdf = 1.0 + child_pdf;
                specular = false;
            } else {
                pdf += child_pdf;
            }

            reflector = compositor.add(reflector, Some(child_reflector))?;
            matching += 1;
        }

        let Some(reflector) = reflector else {
            return Ok(None);
        };

        let pdf = if specular {
            Pdf::Delta
        } else {
            Pdf::Finite(if matching == 1 {
                pdf
            } else {
                pdf / matching as f32
            })
        };

        Ok(Some(BsdfSample {
            reflector,
            flags: sample.flags,
            outgoing: sample.outgoing,
            pdf,
        }))
    }

    fn sample_diffuse<'s>(
        &'s self,
        incoming: Vec3,
        surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'s ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'s>>> {
        if self.diffuse_count == 0 {
            return Ok(None);
        }
        let sampled_index: usize = rng.random_range(0..self.diffuse_count);

        let Some(sample) = checked_sample_diffuse(
            self.child(sampled_index),
            incoming,
            surface_normal,
            shading_normal,
            rng,
            compositor,
        )?
        else {
            return Ok(None);
        };
        if sample.pdf == Pdf::Finite(0.0) {
            return Ok(None);
        }

        let below_surface = surface_normal.dot(sample.outgoing) < 0.0;
        let sampled_transmission = sample.flags.contains(BsdfSampleFlags::TRANSMISSION);
        let compute_transmission = below_surface || sampled_transmission;

        let mut reflector: Option<&dyn Reflector> = Some(sample.reflector);
        let mut pdf = sample.pdf.finite().unwrap_or(0.0);
        let mut matching = 1usize;

        for i in 0..self.count {
            if i == sampled_index {
                continue;
            }
            let Some((child_reflector, child_pdf)) = checked_compute_diffuse_with_pdf(
                self.child(i),
                incoming,
                shading_normal,
                sample.outgoing,
                compute_transmission,
                compositor,
            )?
            else {
                continue;
            };
            if child_pdf <= 0.0 {
                continue;
            }
            reflector = compositor.add(reflector, Some(child_reflector))?;
            pdf += child_pdf;
            matching += 1;
        }

        let Some(reflector) = reflector else {
            return Ok(None);
        };

        Ok(Some(BsdfSample {
            reflector,
            flags: sample.flags,
            outgoing: sample.outgoing,
            pdf: Pdf::Finite(pdf / matching as f32),
        }))
    }

    fn compute_diffuse<'s>(
        &'s self,
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'s ReflectorCompositor,
    ) -> Result<Option<&'s dyn Reflector>> {
        let mut reflector: Option<&dyn Reflector> = None;
        for i in 0..self.count {
            let Some((child_reflector, child_pdf)) = checked_compute_diffuse_with_pdf(
                self.child(i),
                incoming,
                shading_normal,
                outgoing,
                transmitted,
                compositor,
            )?
            else {
                continue;
            };
            if child_pdf <= 0.0 {
                continue;
            }
            reflector = compositor.add(reflector, Some(child_reflector))?;
        }
        Ok(reflector)
    }

    fn compute_diffuse_with_pdf<'s>(
        &'s self,
        incoming: Vec3,
        shading_normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'s ReflectorCompositor,
    ) -> Result<Option<(&'s dyn Reflector, f32)>> {
        let mut reflector: Option<&dyn Reflector> = None;
        let mut pdf = 0.0f32;
        let mut matching = 0usize;

        for i in 0..self.count {
            let Some((child_reflector, child_pdf)) = checked_compute_diffuse_with_pdf(
                self.child(i),
                incoming,
                shading_normal,
                outgoing,
                transmitted,
                compositor,
            )?
            else {
                continue;
            };
            if child_pdf <= 0.0 {
                continue;
            }
            matching += 1;
            reflector = compositor.add(reflector, Some(child_reflector))?;
            pdf += child_pdf;
        }

        if matching > 1 {
            pdf /= matching as f32;
        }

        Ok(reflector.map(|reflector| (reflector, pdf)))
    }

    fn is_diffuse(&self) -> bool {
        self.diffuse_count > 0
    }
}
