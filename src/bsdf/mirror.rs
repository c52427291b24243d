//! Perfect specular reflection.

use glam::Vec3;
use rand::Rng;

use crate::bsdf::{Bsdf, BsdfSample, BsdfSampleFlags, Pdf};
use crate::errors::Result;
use crate::spectrum::{Reflector, ReflectorCompositor};

/// A perfect mirror: a single delta lobe reflecting about the shading
/// normal. No diffuse component.
#[derive(Clone, Copy)]
pub struct MirrorBsdf<'r> {
    reflector: &'r dyn Reflector,
}

impl<'r> MirrorBsdf<'r> {
    #[must_use]
    pub fn new(reflector: &'r dyn Reflector) -> Self {
        Self { reflector }
    }
}

impl Bsdf for MirrorBsdf<'_> {
    fn sample<'a>(
        &'a self,
        incoming: Vec3,
        _surface_normal: Vec3,
        shading_normal: Vec3,
        _rng: &mut dyn Rng,
        _compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        Ok(Some(BsdfSample {
            reflector: self.reflector,
            flags: BsdfSampleFlags::SPECULAR,
            outgoing: incoming.reflect(shading_normal),
            pdf: Pdf::Delta,
        }))
    }
}
