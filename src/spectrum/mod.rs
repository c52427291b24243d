//! Radiometric quantities
//!
//! A [`Spectrum`] maps a wavelength to a non-negative radiance; a
//! [`Reflector`] maps a wavelength to a reflectance in `[0, 1]` and carries a
//! scalar albedo hint. Both come in two lifetimes: long-lived shared entities
//! (`Arc<dyn Spectrum>`) built during scene assembly, and short-lived
//! composites handed out by the compositors whose lifetime is a single
//! camera-ray invocation.

mod color;
mod compositor;

pub use color::{
    Color3, ColorExtrapolator, ColorIntegrator, RgbColorExtrapolator, RgbColorIntegrator,
    RgbReflector, RgbSpectrum,
};
pub use compositor::{ReflectorCompositor, SpectrumCompositor};

use crate::errors::Result;

/// A radiance distribution sampled point-wise by wavelength.
///
/// Sampled intensities must be non-negative at every wavelength.
pub trait Spectrum: Send + Sync {
    fn sample(&self, wavelength: f32) -> Result<f32>;
}

/// A reflectance distribution sampled point-wise by wavelength, plus an
/// albedo hint used for importance decisions.
pub trait Reflector: Send + Sync + std::fmt::Debug {
    fn reflect(&self, wavelength: f32) -> Result<f32>;

    fn albedo(&self) -> Result<f32>;
}

/// The built-in perfect reflector: unit reflectance at every wavelength.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerfectReflector;

impl Reflector for PerfectReflector {
    fn reflect(&self, _wavelength: f32) -> Result<f32> {
        Ok(1.0)
    }

    fn albedo(&self) -> Result<f32> {
        Ok(1.0)
    }
}

/// Shared instance of [`PerfectReflector`].
pub static PERFECT_REFLECTOR: PerfectReflector = PerfectReflector;
