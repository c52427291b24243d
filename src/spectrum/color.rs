//! Color boundary
//!
//! Conversion between spectra/reflectors and device colors. Used only at the
//! edges of the core: the renderer converts integrated spectra to pixels, and
//! the path tracer consults the throughput color for Russian roulette.
//!
//! The RGB implementations band-sample at three fixed wavelengths, the
//! centers of the unit-wide red, green, and blue bands, so an RGB workflow
//! round-trips exactly.

use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::spectrum::{Reflector, Spectrum};

/// Wavelengths at the centers of the three RGB bands.
pub const RED_WAVELENGTH: f32 = 0.5;
pub const GREEN_WAVELENGTH: f32 = 1.5;
pub const BLUE_WAVELENGTH: f32 = 2.5;

const BAND_LIMIT: f32 = 3.0;

// ─── Color ────────────────────────────────────────────────────────────────────

/// A linear RGB triple.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub const BLACK: Color3 = Color3 {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    #[inline]
    #[must_use]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// True iff every channel is finite and non-negative.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.r.is_finite()
            && self.g.is_finite()
            && self.b.is_finite()
            && self.r >= 0.0
            && self.g >= 0.0
            && self.b >= 0.0
    }

    /// The largest channel value.
    #[inline]
    #[must_use]
    pub fn max_channel(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    #[inline]
    #[must_use]
    pub fn scaled(&self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k)
    }
}

// ─── Band-sampled spectra ─────────────────────────────────────────────────────

/// A spectrum that is constant within each of the three RGB bands and zero
/// outside them.
#[derive(Clone, Copy, Debug)]
pub struct RgbSpectrum {
    values: [f32; 3],
}

impl RgbSpectrum {
    /// Fails with [`Error::InvalidArgument`] if any intensity is negative or
    /// non-finite.
    pub fn new(r: f32, g: f32, b: f32) -> Result<Self> {
        for (i, v) in [r, g, b].into_iter().enumerate() {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::InvalidArgument(i as u8));
            }
        }
        Ok(Self { values: [r, g, b] })
    }
}

impl Spectrum for RgbSpectrum {
    fn sample(&self, wavelength: f32) -> Result<f32> {
        if (0.0..BAND_LIMIT).contains(&wavelength) {
            Ok(self.values[wavelength as usize])
        } else {
            Ok(0.0)
        }
    }
}

/// A reflector that is constant within each of the three RGB bands and zero
/// outside them. The albedo hint is the channel mean.
#[derive(Clone, Copy, Debug)]
pub struct RgbReflector {
    values: [f32; 3],
    albedo: f32,
}

impl RgbReflector {
    /// Fails with [`Error::InvalidArgument`] if any reflectance lies outside
    /// `[0, 1]`.
    pub fn new(r: f32, g: f32, b: f32) -> Result<Self> {
        for (i, v) in [r, g, b].into_iter().enumerate() {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidArgument(i as u8));
            }
        }
        Ok(Self {
            values: [r, g, b],
            albedo: (r + g + b) / 3.0,
        })
    }
}

impl Reflector for RgbReflector {
    fn reflect(&self, wavelength: f32) -> Result<f32> {
        if (0.0..BAND_LIMIT).contains(&wavelength) {
            Ok(self.values[wavelength as usize])
        } else {
            Ok(0.0)
        }
    }

    fn albedo(&self) -> Result<f32> {
        Ok(self.albedo)
    }
}

// ─── Integrator / extrapolator ────────────────────────────────────────────────

/// Converts spectra and reflectors to device colors.
pub trait ColorIntegrator: Send + Sync {
    fn spectrum_color(&self, spectrum: &dyn Spectrum) -> Result<Color3>;

    fn reflector_color(&self, reflector: &dyn Reflector) -> Result<Color3>;
}

/// Converts device colors back to long-lived spectra and reflectors.
pub trait ColorExtrapolator: Send + Sync {
    fn spectrum_from_color(&self, color: Color3) -> Result<Arc<dyn Spectrum>>;

    fn reflector_from_color(&self, color: Color3) -> Result<Arc<dyn Reflector>>;
}

/// [`ColorIntegrator`] over the three RGB band wavelengths.
#[derive(Clone, Copy, Debug, Default)]
pub struct RgbColorIntegrator;

impl ColorIntegrator for RgbColorIntegrator {
    fn spectrum_color(&self, spectrum: &dyn Spectrum) -> Result<Color3> {
        Ok(Color3::new(
            spectrum.sample(RED_WAVELENGTH)?,
            spectrum.sample(GREEN_WAVELENGTH)?,
            spectrum.sample(BLUE_WAVELENGTH)?,
        ))
    }

    fn reflector_color(&self, reflector: &dyn Reflector) -> Result<Color3> {
        Ok(Color3::new(
            reflector.reflect(RED_WAVELENGTH)?,
            reflector.reflect(GREEN_WAVELENGTH)?,
            reflector.reflect(BLUE_WAVELENGTH)?,
        ))
    }
}

/// [`ColorExtrapolator`] producing band-sampled RGB spectra and reflectors.
#[derive(Clone, Copy, Debug, Default)]
pub struct RgbColorExtrapolator;

impl ColorExtrapolator for RgbColorExtrapolator {
    fn spectrum_from_color(&self, color: Color3) -> Result<Arc<dyn Spectrum>> {
        if !color.is_valid() {
            return Err(Error::InvalidArgument(1));
        }
        Ok(Arc::new(RgbSpectrum::new(color.r, color.g, color.b)?))
    }

    fn reflector_from_color(&self, color: Color3) -> Result<Arc<dyn Reflector>> {
        if !color.is_valid() {
            return Err(Error::InvalidArgument(1));
        }
        let reflector = RgbReflector::new(
            color.r.clamp(0.0, 1.0),
            color.g.clamp(0.0, 1.0),
            color.b.clamp(0.0, 1.0),
        )?;
        Ok(Arc::new(reflector))
    }
}
