//! Reflectance and scalar textures.
//!
//! Textures resolve per-shading-point parameters for materials. The
//! constant implementations cover the untextured case; anything image-backed
//! belongs to outer layers (file I/O is not a core concern).

use std::any::Any;
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::spectrum::Reflector;

/// A texture of reflectors.
pub trait ReflectorTexture: Send + Sync {
    /// Samples the texture. `None` means no reflectance at this point; the
    /// material usually produces no lobe then.
    fn sample(&self, texture_coordinates: Option<&dyn Any>) -> Result<Option<&dyn Reflector>>;
}

/// A texture of scalars.
pub trait FloatTexture: Send + Sync {
    fn sample(&self, texture_coordinates: Option<&dyn Any>) -> Result<f32>;
}

/// A [`ReflectorTexture`] returning the same reflector everywhere.
pub struct ConstantReflectorTexture {
    reflector: Option<Arc<dyn Reflector>>,
}

impl ConstantReflectorTexture {
    #[must_use]
    pub fn new(reflector: Option<Arc<dyn Reflector>>) -> Self {
        Self { reflector }
    }
}

impl ReflectorTexture for ConstantReflectorTexture {
    fn sample(&self, _texture_coordinates: Option<&dyn Any>) -> Result<Option<&dyn Reflector>> {
        Ok(self.reflector.as_deref())
    }
}

/// A [`FloatTexture`] returning the same value everywhere.
pub struct ConstantFloatTexture {
    value: f32,
}

impl ConstantFloatTexture {
    pub fn new(value: f32) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidArgument(0));
        }
        Ok(Self { value })
    }
}

impl FloatTexture for ConstantFloatTexture {
    fn sample(&self, _texture_coordinates: Option<&dyn Any>) -> Result<f32> {
        Ok(self.value)
    }
}
