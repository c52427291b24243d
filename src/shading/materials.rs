//! Built-in materials.

use std::any::Any;
use std::sync::Arc;

use glam::Vec3;

use crate::bsdf::{
    AggregateBsdf, Bsdf, BsdfAllocator, DielectricFresnel, LambertianBsdf, MicrofacetBsdf,
    MirrorBsdf, OrenNayarBsdf, TrowbridgeReitz,
};
use crate::errors::Result;
use crate::shading::{EmissiveMaterial, FloatTexture, Material, ReflectorTexture};
use crate::spectrum::{ReflectorCompositor, Spectrum};
use crate::tracer::Intersection;

// ─── Matte ────────────────────────────────────────────────────────────────────

/// Diffuse material: Lambertian when the roughness texture samples to zero,
/// Oren–Nayar otherwise.
pub struct MatteMaterial {
    diffuse: Arc<dyn ReflectorTexture>,
    sigma: Arc<dyn FloatTexture>,
}

impl MatteMaterial {
    #[must_use]
    pub fn new(diffuse: Arc<dyn ReflectorTexture>, sigma: Arc<dyn FloatTexture>) -> Self {
        Self { diffuse, sigma }
    }
}

impl Material for MatteMaterial {
    fn sample<'a>(
        &'a self,
        _intersection: &Intersection<'_>,
        _additional_data: Option<&dyn Any>,
        texture_coordinates: Option<&dyn Any>,
        bsdf_allocator: &'a BsdfAllocator,
        _compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Bsdf>> {
        let Some(reflector) = self.diffuse.sample(texture_coordinates)? else {
            return Ok(None);
        };
        let sigma = self.sigma.sample(texture_coordinates)?;

        let bsdf: &dyn Bsdf = if sigma == 0.0 {
            bsdf_allocator.alloc(LambertianBsdf::new(reflector))?
        } else {
            bsdf_allocator.alloc(OrenNayarBsdf::new(reflector, sigma))?
        };
        Ok(Some(bsdf))
    }
}

// ─── Mirror ───────────────────────────────────────────────────────────────────

/// Perfect specular material.
pub struct MirrorMaterial {
    reflectance: Arc<dyn ReflectorTexture>,
}

impl MirrorMaterial {
    #[must_use]
    pub fn new(reflectance: Arc<dyn ReflectorTexture>) -> Self {
        Self { reflectance }
    }
}

impl Material for MirrorMaterial {
    fn sample<'a>(
        &'a self,
        _intersection: &Intersection<'_>,
        _additional_data: Option<&dyn Any>,
        texture_coordinates: Option<&dyn Any>,
        bsdf_allocator: &'a BsdfAllocator,
        _compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Bsdf>> {
        let Some(reflector) = self.reflectance.sample(texture_coordinates)? else {
            return Ok(None);
        };
        Ok(Some(bsdf_allocator.alloc(MirrorBsdf::new(reflector))?))
    }
}

// ─── Plastic ──────────────────────────────────────────────────────────────────

/// Diffuse base plus a glossy dielectric coat, mixed by an aggregate.
pub struct PlasticMaterial {
    diffuse: Arc<dyn ReflectorTexture>,
    specular: Arc<dyn ReflectorTexture>,
    roughness: Arc<dyn FloatTexture>,
    remap_roughness: bool,
}

impl PlasticMaterial {
    #[must_use]
    pub fn new(
        diffuse: Arc<dyn ReflectorTexture>,
        specular: Arc<dyn ReflectorTexture>,
        roughness: Arc<dyn FloatTexture>,
        remap_roughness: bool,
    ) -> Self {
        Self {
            diffuse,
            specular,
            roughness,
            remap_roughness,
        }
    }
}

impl Material for PlasticMaterial {
    fn sample<'a>(
        &'a self,
        _intersection: &Intersection<'_>,
        _additional_data: Option<&dyn Any>,
        texture_coordinates: Option<&dyn Any>,
        bsdf_allocator: &'a BsdfAllocator,
        _compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Bsdf>> {
        let diffuse = self.diffuse.sample(texture_coordinates)?;
        let specular = self.specular.sample(texture_coordinates)?;
        let mut roughness = self.roughness.sample(texture_coordinates)?;
        if self.remap_roughness {
            roughness = TrowbridgeReitz::roughness_to_alpha(roughness);
        }

        let lambertian: Option<&dyn Bsdf> = match diffuse {
            Some(reflector) => Some(bsdf_allocator.alloc(LambertianBsdf::new(reflector))?),
            None => None,
        };
        let glossy: Option<&dyn Bsdf> = match specular {
            Some(reflector) => Some(bsdf_allocator.alloc(MicrofacetBsdf::new(
                reflector,
                TrowbridgeReitz::new(roughness, roughness)?,
                DielectricFresnel::new(1.5, 1.0)?,
            ))?),
            None => None,
        };

        let Some(aggregate) = AggregateBsdf::new(&[lambertian, glossy])? else {
            return Ok(None);
        };
        if let Some(sole) = aggregate.sole_child() {
            return Ok(Some(sole));
        }
        Ok(Some(bsdf_allocator.alloc(aggregate)?))
    }
}

// ─── Constant emissive ────────────────────────────────────────────────────────

/// An emissive material radiating the same spectrum everywhere on the face.
pub struct ConstantEmissiveMaterial {
    spectrum: Arc<dyn Spectrum>,
}

impl ConstantEmissiveMaterial {
    #[must_use]
    pub fn new(spectrum: Arc<dyn Spectrum>) -> Self {
        Self { spectrum }
    }
}

impl EmissiveMaterial for ConstantEmissiveMaterial {
    fn sample(
        &self,
        _model_hit_point: Vec3,
        _additional_data: Option<&dyn Any>,
    ) -> Result<Option<&dyn Spectrum>> {
        Ok(Some(&*self.spectrum))
    }
}
