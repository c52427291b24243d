//! Spectrum and reflector compositors
//!
//! Per-ray algebra over radiometric quantities. Every operation returns a
//! new composite whose lifetime equals the compositor's arena; the composite
//! is a lazy expression node evaluated on sample, so building one is a single
//! arena allocation regardless of operand depth.
//!
//! `None` stands for the zero spectrum/reflector throughout: it is the
//! identity of `add` and the annihilator of the multiplicative operations,
//! which lets callers short-circuit entire bounces without special cases.
//!
//! Allocation goes through `&self`; [`SpectrumCompositor::free_all`] (and the
//! reflector twin) require `&mut self`, so the borrow checker confines every
//! composite to the ray that built it.

use crate::arena::DynamicArena;
use crate::errors::{Error, Result};
use crate::spectrum::{PERFECT_REFLECTOR, Reflector, Spectrum};

// ─── Composite spectrum nodes ─────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct SumSpectrum<'a> {
    augend: &'a dyn Spectrum,
    addend: &'a dyn Spectrum,
}

impl Spectrum for SumSpectrum<'_> {
    fn sample(&self, wavelength: f32) -> Result<f32> {
        Ok(self.augend.sample(wavelength)? + self.addend.sample(wavelength)?)
    }
}

#[derive(Clone, Copy)]
struct AttenuatedSpectrum<'a> {
    spectrum: &'a dyn Spectrum,
    attenuation: f32,
}

impl Spectrum for AttenuatedSpectrum<'_> {
    fn sample(&self, wavelength: f32) -> Result<f32> {
        Ok(self.spectrum.sample(wavelength)? * self.attenuation)
    }
}

#[derive(Clone, Copy)]
struct AttenuatedSumSpectrum<'a> {
    augend: &'a dyn Spectrum,
    attenuated: &'a dyn Spectrum,
    attenuation: f32,
}

impl Spectrum for AttenuatedSumSpectrum<'_> {
    fn sample(&self, wavelength: f32) -> Result<f32> {
        Ok(self.augend.sample(wavelength)?
            + self.attenuated.sample(wavelength)? * self.attenuation)
    }
}

#[derive(Clone, Copy)]
struct ReflectionSpectrum<'a> {
    spectrum: &'a dyn Spectrum,
    reflector: &'a dyn Reflector,
}

impl Spectrum for ReflectionSpectrum<'_> {
    fn sample(&self, wavelength: f32) -> Result<f32> {
        Ok(self.spectrum.sample(wavelength)? * self.reflector.reflect(wavelength)?)
    }
}

#[derive(Clone, Copy)]
struct AttenuatedReflectionSpectrum<'a> {
    spectrum: &'a dyn Spectrum,
    reflector: &'a dyn Reflector,
    attenuation: f32,
}

impl Spectrum for AttenuatedReflectionSpectrum<'_> {
    fn sample(&self, wavelength: f32) -> Result<f32> {
        Ok(self.spectrum.sample(wavelength)?
            * self.reflector.reflect(wavelength)?
            * self.attenuation)
    }
}

// ─── Spectrum compositor ──────────────────────────────────────────────────────

/// Arena-backed builder of composite spectra.
pub struct SpectrumCompositor {
    arena: DynamicArena,
}

impl SpectrumCompositor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: DynamicArena::new(),
        }
    }

    /// `s(λ) = s0(λ) + s1(λ)`; `None` is the identity.
    pub fn add<'a>(
        &'a self,
        spectrum0: Option<&'a dyn Spectrum>,
        spectrum1: Option<&'a dyn Spectrum>,
    ) -> Result<Option<&'a dyn Spectrum>> {
        match (spectrum0, spectrum1) {
            (None, other) | (other, None) => Ok(other),
            (Some(augend), Some(addend)) => {
                Ok(Some(self.arena.alloc(SumSpectrum { augend, addend })?))
            }
        }
    }

    /// `s'(λ) = k · s(λ)` with `k` finite and non-negative.
    pub fn attenuate<'a>(
        &'a self,
        spectrum: Option<&'a dyn Spectrum>,
        attenuation: f32,
    ) -> Result<Option<&'a dyn Spectrum>> {
        if !attenuation.is_finite() || attenuation < 0.0 {
            return Err(Error::InvalidArgument(2));
        }
        let Some(spectrum) = spectrum else {
            return Ok(None);
        };
        if attenuation == 0.0 {
            return Ok(None);
        }
        if attenuation == 1.0 {
            return Ok(Some(spectrum));
        }
        Ok(Some(self.arena.alloc(AttenuatedSpectrum {
            spectrum,
            attenuation,
        })?))
    }

    /// `s(λ) = added(λ) + k · attenuated(λ)` in one node.
    pub fn attenuated_add<'a>(
        &'a self,
        added: Option<&'a dyn Spectrum>,
        attenuated: Option<&'a dyn Spectrum>,
        attenuation: f32,
    ) -> Result<Option<&'a dyn Spectrum>> {
        if !attenuation.is_finite() || attenuation < 0.0 {
            return Err(Error::InvalidArgument(3));
        }
        let Some(augend) = added else {
            return self.attenuate(attenuated, attenuation);
        };
        let Some(attenuated) = attenuated else {
            return Ok(Some(augend));
        };
        if attenuation == 0.0 {
            return Ok(Some(augend));
        }
        Ok(Some(self.arena.alloc(AttenuatedSumSpectrum {
            augend,
            attenuated,
            attenuation,
        })?))
    }

    /// `s'(λ) = s(λ) · r(λ)`, a spectrum reflected off a reflector.
    pub fn reflect<'a>(
        &'a self,
        spectrum: Option<&'a dyn Spectrum>,
        reflector: Option<&'a dyn Reflector>,
    ) -> Result<Option<&'a dyn Spectrum>> {
        let (Some(spectrum), Some(reflector)) = (spectrum, reflector) else {
            return Ok(None);
        };
        Ok(Some(self.arena.alloc(ReflectionSpectrum {
            spectrum,
            reflector,
        })?))
    }

    /// `s'(λ) = k · s(λ) · r(λ)` in one node.
    pub fn attenuated_reflect<'a>(
        &'a self,
        spectrum: Option<&'a dyn Spectrum>,
        reflector: Option<&'a dyn Reflector>,
        attenuation: f32,
    ) -> Result<Option<&'a dyn Spectrum>> {
        if !attenuation.is_finite() || attenuation < 0.0 {
            return Err(Error::InvalidArgument(3));
        }
        let (Some(spectrum), Some(reflector)) = (spectrum, reflector) else {
            return Ok(None);
        };
        if attenuation == 0.0 {
            return Ok(None);
        }
        if attenuation == 1.0 {
            return self.reflect(Some(spectrum), Some(reflector));
        }
        Ok(Some(self.arena.alloc(AttenuatedReflectionSpectrum {
            spectrum,
            reflector,
            attenuation,
        })?))
    }

    /// Resets the arena. All composites built since the previous reset die
    /// with this call.
    pub fn free_all(&mut self) {
        self.arena.free_all();
    }
}

impl Default for SpectrumCompositor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Composite reflector nodes ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
struct SumReflector<'a> {
    augend: &'a dyn Reflector,
    addend: &'a dyn Reflector,
}

impl Reflector for SumReflector<'_> {
    fn reflect(&self, wavelength: f32) -> Result<f32> {
        Ok(self.augend.reflect(wavelength)? + self.addend.reflect(wavelength)?)
    }

    fn albedo(&self) -> Result<f32> {
        Ok((self.augend.albedo()? + self.addend.albedo()?).min(1.0))
    }
}

#[derive(Clone, Copy, Debug)]
struct AttenuatedReflector<'a> {
    reflector: &'a dyn Reflector,
    attenuation: f32,
}

impl Reflector for AttenuatedReflector<'_> {
    fn reflect(&self, wavelength: f32) -> Result<f32> {
        Ok(self.reflector.reflect(wavelength)? * self.attenuation)
    }

    fn albedo(&self) -> Result<f32> {
        Ok((self.reflector.albedo()? * self.attenuation).min(1.0))
    }
}

#[derive(Clone, Copy, Debug)]
struct AttenuatedSumReflector<'a> {
    augend: &'a dyn Reflector,
    attenuated: &'a dyn Reflector,
    attenuation: f32,
}

impl Reflector for AttenuatedSumReflector<'_> {
    fn reflect(&self, wavelength: f32) -> Result<f32> {
        Ok(self.augend.reflect(wavelength)?
            + self.attenuated.reflect(wavelength)? * self.attenuation)
    }

    fn albedo(&self) -> Result<f32> {
        Ok((self.augend.albedo()? + self.attenuated.albedo()? * self.attenuation).min(1.0))
    }
}

#[derive(Clone, Copy, Debug)]
struct ProductReflector<'a> {
    multiplicand: &'a dyn Reflector,
    multiplier: &'a dyn Reflector,
}

impl Reflector for ProductReflector<'_> {
    fn reflect(&self, wavelength: f32) -> Result<f32> {
        Ok(self.multiplicand.reflect(wavelength)? * self.multiplier.reflect(wavelength)?)
    }

    fn albedo(&self) -> Result<f32> {
        Ok(self.multiplicand.albedo()? * self.multiplier.albedo()?)
    }
}

// ─── Reflector compositor ─────────────────────────────────────────────────────

/// Arena-backed builder of composite reflectors.
pub struct ReflectorCompositor {
    arena: DynamicArena,
}

impl ReflectorCompositor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: DynamicArena::new(),
        }
    }

    /// The built-in perfect reflector (unit reflectance, albedo one).
    #[inline]
    #[must_use]
    pub fn perfect_reflector(&self) -> &'static dyn Reflector {
        &PERFECT_REFLECTOR
    }

    /// `r(λ) = r0(λ) + r1(λ)`; `None` is the identity.
    pub fn add<'a>(
        &'a self,
        reflector0: Option<&'a dyn Reflector>,
        reflector1: Option<&'a dyn Reflector>,
    ) -> Result<Option<&'a dyn Reflector>> {
        match (reflector0, reflector1) {
            (None, other) | (other, None) => Ok(other),
            (Some(augend), Some(addend)) => {
                Ok(Some(self.arena.alloc(SumReflector { augend, addend })?))
            }
        }
    }

    /// `r'(λ) = k · r(λ)` with `k` finite and non-negative.
    pub fn attenuate<'a>(
        &'a self,
        reflector: Option<&'a dyn Reflector>,
        attenuation: f32,
    ) -> Result<Option<&'a dyn Reflector>> {
        if !attenuation.is_finite() || attenuation < 0.0 {
            return Err(Error::InvalidArgument(2));
        }
        let Some(reflector) = reflector else {
            return Ok(None);
        };
        if attenuation == 0.0 {
            return Ok(None);
        }
        if attenuation == 1.0 {
            return Ok(Some(reflector));
        }
        Ok(Some(self.arena.alloc(AttenuatedReflector {
            reflector,
            attenuation,
        })?))
    }

    /// `r(λ) = added(λ) + k · attenuated(λ)` in one node.
    pub fn attenuated_add<'a>(
        &'a self,
        added: Option<&'a dyn Reflector>,
        attenuated: Option<&'a dyn Reflector>,
        attenuation: f32,
    ) -> Result<Option<&'a dyn Reflector>> {
        if !attenuation.is_finite() || attenuation < 0.0 {
            return Err(Error::InvalidArgument(3));
        }
        let Some(augend) = added else {
            return self.attenuate(attenuated, attenuation);
        };
        let Some(attenuated) = attenuated else {
            return Ok(Some(augend));
        };
        if attenuation == 0.0 {
            return Ok(Some(augend));
        }
        Ok(Some(self.arena.alloc(AttenuatedSumReflector {
            augend,
            attenuated,
            attenuation,
        })?))
    }

    /// `r(λ) = r0(λ) · r1(λ)`; `None` annihilates.
    pub fn multiply<'a>(
        &'a self,
        reflector0: Option<&'a dyn Reflector>,
        reflector1: Option<&'a dyn Reflector>,
    ) -> Result<Option<&'a dyn Reflector>> {
        let (Some(multiplicand), Some(multiplier)) = (reflector0, reflector1) else {
            return Ok(None);
        };
        Ok(Some(self.arena.alloc(ProductReflector {
            multiplicand,
            multiplier,
        })?))
    }

    /// Resets the arena. All composites built since the previous reset die
    /// with this call.
    pub fn free_all(&mut self) {
        self.arena.free_all();
    }
}

impl Default for ReflectorCompositor {
    fn default() -> Self {
        Self::new()
    }
}
