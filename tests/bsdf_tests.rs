//! BSDF contract tests
//!
//! Tests for:
//! - Lambertian energy and density
//! - Diffuse-sampler contract enforcement
//! - Aggregate mixing and density averaging
//! - Brdf-to-Bsdf adaptation

mod common;

use std::f32::consts::FRAC_1_PI;

use glam::Vec3;
use prism::bsdf::{
    AggregateBsdf, Bsdf, BsdfAllocator, BsdfSample, BsdfSampleFlags, Pdf, LambertianBsdf,
    MirrorBsdf, OrenNayarBsdf, checked_compute_diffuse_with_pdf, checked_sample_diffuse,
};
use prism::errors::{Error, Result};
use prism::spectrum::{PerfectReflector, Reflector, ReflectorCompositor, RgbReflector};
use rand::rngs::SmallRng;
use rand::{Rng, RngExt, SeedableRng};

// ============================================================================
// Lambertian
// ============================================================================

#[test]
fn lambertian_reflectance_is_r_over_pi() {
    let base = RgbReflector::new(0.8, 0.4, 0.2).unwrap();
    let bsdf = LambertianBsdf::new(&base);
    let compositor = ReflectorCompositor::new();

    let (reflectance, pdf) = bsdf
        .compute_diffuse_with_pdf(
            Vec3::NEG_Z,
            Vec3::Z,
            Vec3::new(0.0, 0.6, 0.8),
            false,
            &compositor,
        )
        .unwrap()
        .unwrap();

    assert!(common::approx_eq(
        reflectance.reflect(0.5).unwrap(),
        0.8 * FRAC_1_PI
    ));
    assert!(common::approx_eq(pdf, 0.8 * FRAC_1_PI));
}

#[test]
fn lambertian_transmission_side_is_empty() {
    let base = PerfectReflector;
    let bsdf = LambertianBsdf::new(&base);
    let compositor = ReflectorCompositor::new();
    assert!(
        bsdf.compute_diffuse(Vec3::NEG_Z, Vec3::Z, Vec3::Y, true, &compositor)
            .unwrap()
            .is_none()
    );
}

#[test]
fn lambertian_samples_respect_cosine_density() {
    let base = PerfectReflector;
    let bsdf = LambertianBsdf::new(&base);
    let compositor = ReflectorCompositor::new();
    let mut rng = SmallRng::seed_from_u64(55);

    for _ in 0..512 {
        let sample = bsdf
            .sample(Vec3::NEG_Z, Vec3::Z, Vec3::Z, &mut rng, &compositor)
            .unwrap()
            .unwrap();
        assert!(sample.outgoing.z >= 0.0);
        let expected = sample.outgoing.z.max(0.0) * FRAC_1_PI;
        assert!(common::approx_eq(sample.pdf.finite().unwrap(), expected));
        assert!(!sample.flags.contains(BsdfSampleFlags::SPECULAR));
    }
}

/// Monte-Carlo check that ∫ f cos θ dω = R for the Lambertian lobe.
#[test]
fn lambertian_conserves_energy() {
    let base = RgbReflector::new(0.6, 0.6, 0.6).unwrap();
    let bsdf = LambertianBsdf::new(&base);
    let compositor = ReflectorCompositor::new();
    let mut rng = SmallRng::seed_from_u64(21);

    let samples = 20_000;
    let mut total = 0.0f64;
    for _ in 0..samples {
        let sample = bsdf
            .sample(Vec3::NEG_Z, Vec3::Z, Vec3::Z, &mut rng, &compositor)
            .unwrap()
            .unwrap();
        let pdf = sample.pdf.finite().unwrap();
        if pdf <= 0.0 {
            continue;
        }
        let f = sample.reflector.reflect(0.5).unwrap();
        total += f64::from(f * sample.outgoing.z / pdf);
    }
    let mean = total / f64::from(samples);
    assert!((mean - 0.6).abs() < 0.01, "integrated reflectance {mean}");
}

// ============================================================================
// Oren–Nayar
// ============================================================================

#[test]
fn oren_nayar_darkens_at_normal_incidence_with_roughness() {
    let base = PerfectReflector;
    let smooth = OrenNayarBsdf::new(&base, 0.0);
    let rough = OrenNayarBsdf::new(&base, 30.0);
    let compositor = ReflectorCompositor::new();

    let incoming = Vec3::NEG_Z;
    let outgoing = Vec3::Z;
    let f_smooth = smooth
        .compute_diffuse(incoming, Vec3::Z, outgoing, false, &compositor)
        .unwrap()
        .unwrap()
        .reflect(0.5)
        .unwrap();
    let f_rough = rough
        .compute_diffuse(incoming, Vec3::Z, outgoing, false, &compositor)
        .unwrap()
        .unwrap()
        .reflect(0.5)
        .unwrap();

    assert!(common::approx_eq(f_smooth, FRAC_1_PI));
    assert!(f_rough < f_smooth);
}

// ============================================================================
// Contract enforcement
// ============================================================================

/// A defective lobe whose diffuse sampler returns a specular sample.
#[derive(Clone, Copy)]
struct RogueSpecular;

impl Bsdf for RogueSpecular {
    fn sample<'a>(
        &'a self,
        incoming: Vec3,
        _surface_normal: Vec3,
        shading_normal: Vec3,
        _rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        Ok(Some(BsdfSample {
            reflector: compositor.perfect_reflector(),
            flags: BsdfSampleFlags::SPECULAR,
            outgoing: incoming.reflect(shading_normal),
            pdf: Pdf::Delta,
        }))
    }

    fn sample_diffuse<'a>(
        &'a self,
        incoming: Vec3,
        surface_normal: Vec3,
        shading_normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<BsdfSample<'a>>> {
        self.sample(incoming, surface_normal, shading_normal, rng, compositor)
    }

    fn compute_diffuse_with_pdf<'a>(
        &'a self,
        _incoming: Vec3,
        _shading_normal: Vec3,
        _outgoing: Vec3,
        _transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        Ok(Some((compositor.perfect_reflector(), f32::INFINITY)))
    }

    fn is_diffuse(&self) -> bool {
        true
    }
}

#[test]
fn specular_samples_from_the_diffuse_sampler_are_rejected() {
    let rogue = RogueSpecular;
    let compositor = ReflectorCompositor::new();
    let mut rng = SmallRng::seed_from_u64(1);

    let result = checked_sample_diffuse(
        &rogue,
        Vec3::NEG_Z,
        Vec3::Z,
        Vec3::Z,
        &mut rng,
        &compositor,
    );
    assert_eq!(result.unwrap_err(), Error::InvalidResult);
}

#[test]
fn infinite_diffuse_densities_are_rejected() {
    let rogue = RogueSpecular;
    let compositor = ReflectorCompositor::new();
    let result =
        checked_compute_diffuse_with_pdf(&rogue, Vec3::NEG_Z, Vec3::Z, Vec3::Y, false, &compositor);
    assert_eq!(result.unwrap_err(), Error::InvalidResult);
}

// ============================================================================
// Aggregate
// ============================================================================

#[test]
fn aggregate_with_no_children_is_nothing() {
    assert!(AggregateBsdf::new(&[None, None]).unwrap().is_none());
}

#[test]
fn aggregate_with_one_child_degenerates_to_it() {
    let base = PerfectReflector;
    let lambertian = LambertianBsdf::new(&base);
    let aggregate = AggregateBsdf::new(&[Some(&lambertian as &dyn Bsdf)])
        .unwrap()
        .unwrap();
    assert!(aggregate.sole_child().is_some());
}

#[test]
fn aggregate_rejects_too_many_children() {
    let base = PerfectReflector;
    let lambertian = LambertianBsdf::new(&base);
    let children: Vec<Option<&dyn Bsdf>> = (0..9).map(|_| Some(&lambertian as &dyn Bsdf)).collect();
    assert_eq!(
        AggregateBsdf::new(&children).unwrap_err(),
        Error::InvalidArgument(0)
    );
}

#[test]
fn aggregate_diffuse_density_is_the_child_average() {
    // Two identical Lambertian children: the averaged density must equal
    // the single-lobe density, and the summed reflectance must double.
    let base = RgbReflector::new(0.5, 0.5, 0.5).unwrap();
    let one = LambertianBsdf::new(&base);
    let two = LambertianBsdf::new(&base);
    let aggregate = AggregateBsdf::new(&[
        Some(&one as &dyn Bsdf),
        Some(&two as &dyn Bsdf),
    ])
    .unwrap()
    .unwrap();
    let compositor = ReflectorCompositor::new();

    let outgoing = Vec3::new(0.0, 0.6, 0.8);
    let (reflectance, pdf) = aggregate
        .compute_diffuse_with_pdf(Vec3::NEG_Z, Vec3::Z, outgoing, false, &compositor)
        .unwrap()
        .unwrap();

    let single_pdf = outgoing.z * FRAC_1_PI;
    assert!(common::approx_eq(pdf, single_pdf));
    assert!(common::approx_eq(
        reflectance.reflect(0.5).unwrap(),
        2.0 * 0.5 * FRAC_1_PI
    ));
}

#[test]
fn aggregate_partitions_diffuse_children_first() {
    let base = PerfectReflector;
    let mirror = MirrorBsdf::new(&base);
    let lambertian = LambertianBsdf::new(&base);
    let aggregate = AggregateBsdf::new(&[
        Some(&mirror as &dyn Bsdf),
        Some(&lambertian as &dyn Bsdf),
    ])
    .unwrap()
    .unwrap();
    let compositor = ReflectorCompositor::new();
    let mut rng = SmallRng::seed_from_u64(9);

    // The diffuse sampler must only ever draw from the Lambertian child.
    for _ in 0..64 {
        let sample =
            checked_sample_diffuse(&aggregate, Vec3::NEG_Z, Vec3::Z, Vec3::Z, &mut rng, &compositor)
                .unwrap();
        if let Some(sample) = sample {
            assert!(!sample.pdf.is_delta());
            assert!(!sample.flags.contains(BsdfSampleFlags::SPECULAR));
        }
    }
}

#[test]
fn aggregate_full_sampler_mixes_both_lobes() {
    let base = PerfectReflector;
    let mirror = MirrorBsdf::new(&base);
    let lambertian = LambertianBsdf::new(&base);
    let aggregate = AggregateBsdf::new(&[
        Some(&lambertian as &dyn Bsdf),
        Some(&mirror as &dyn Bsdf),
    ])
    .unwrap()
    .unwrap();
    let compositor = ReflectorCompositor::new();
    let mut rng = SmallRng::seed_from_u64(1234);

    let incoming = Vec3::new(0.6, 0.0, -0.8).normalize();
    let mut specular_draws = 0usize;
    let mut diffuse_draws = 0usize;
    for _ in 0..512 {
        let Some(sample) = aggregate
            .sample(incoming, Vec3::Z, Vec3::Z, &mut rng, &compositor)
            .unwrap()
        else {
            continue;
        };
        if sample.flags.contains(BsdfSampleFlags::SPECULAR) {
            specular_draws += 1;
            // The mirror direction: sampled density may stay delta (no
            // diffuse density at exactly that direction is unlikely but
            // possible); the direction itself must be the reflection.
            let expected = incoming.reflect(Vec3::Z);
            assert!((sample.outgoing - expected).length() < 1e-5);
        } else {
            diffuse_draws += 1;
            assert!(sample.pdf.finite().is_some());
        }
    }
    // A uniform child pick must exercise both lobes.
    assert!(specular_draws > 100, "specular draws {specular_draws}");
    assert!(diffuse_draws > 100, "diffuse draws {diffuse_draws}");
}

// ============================================================================
// BRDF adaptation
// ============================================================================

/// A minimal diffuse BRDF used to exercise the single-normal interface.
#[derive(Clone, Copy)]
struct FlatBrdf {
    reflectance: f32,
}

impl prism::bsdf::Brdf for FlatBrdf {
    fn sample<'a>(
        &'a self,
        _incoming: Vec3,
        normal: Vec3,
        rng: &mut dyn Rng,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<prism::bsdf::BrdfSample<'a>>> {
        let outgoing =
            prism::math::sample_hemisphere_with_cosine_weighting(normal, rng)?;
        let Some(reflector) = compositor.attenuate(
            Some(compositor.perfect_reflector()),
            self.reflectance * FRAC_1_PI,
        )?
        else {
            return Ok(None);
        };
        Ok(Some(prism::bsdf::BrdfSample {
            reflector,
            flags: BsdfSampleFlags::empty(),
            outgoing,
            pdf: Pdf::Finite(outgoing.dot(normal).max(0.0) * FRAC_1_PI),
        }))
    }

    fn compute_reflectance_with_pdf<'a>(
        &'a self,
        _incoming: Vec3,
        normal: Vec3,
        outgoing: Vec3,
        transmitted: bool,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<(&'a dyn Reflector, f32)>> {
        if transmitted {
            return Ok(None);
        }
        let Some(reflector) = compositor.attenuate(
            Some(compositor.perfect_reflector()),
            self.reflectance * FRAC_1_PI,
        )?
        else {
            return Ok(None);
        };
        Ok(Some((reflector, outgoing.dot(normal).max(0.0) * FRAC_1_PI)))
    }

    fn is_diffuse(&self) -> bool {
        true
    }
}

#[test]
fn brdf_adapter_exposes_the_full_bsdf_contract() {
    use prism::bsdf::{BrdfAllocator, BrdfBsdf};

    let brdf_allocator = BrdfAllocator::new();
    let compositor = ReflectorCompositor::new();
    let mut rng = SmallRng::seed_from_u64(31);

    let brdf = brdf_allocator.alloc(FlatBrdf { reflectance: 0.5 }).unwrap();
    let bsdf = BrdfBsdf::new(brdf);

    assert!(bsdf.is_diffuse());

    let sample = bsdf
        .sample(Vec3::NEG_Z, Vec3::Z, Vec3::Z, &mut rng, &compositor)
        .unwrap()
        .unwrap();
    assert!(sample.outgoing.z >= 0.0);

    let (reflectance, pdf) = bsdf
        .compute_diffuse_with_pdf(
            Vec3::NEG_Z,
            Vec3::Z,
            Vec3::new(0.0, 0.6, 0.8),
            false,
            &compositor,
        )
        .unwrap()
        .unwrap();
    assert!(common::approx_eq(
        reflectance.reflect(0.5).unwrap(),
        0.5 * FRAC_1_PI
    ));
    assert!(common::approx_eq(pdf, 0.8 * FRAC_1_PI));
}

// ============================================================================
// Energy bound for the full pipeline reflectances
// ============================================================================

#[test]
fn sampled_reflectances_are_finite_and_non_negative() {
    let base = RgbReflector::new(0.9, 0.8, 0.7).unwrap();
    let allocator = BsdfAllocator::new();
    let compositor = ReflectorCompositor::new();
    let mut rng = SmallRng::seed_from_u64(77);

    let lambertian = allocator.alloc(LambertianBsdf::new(&base)).unwrap();
    let oren_nayar = allocator.alloc(OrenNayarBsdf::new(&base, 15.0)).unwrap();

    for bsdf in [lambertian, oren_nayar] {
        for _ in 0..128 {
            let Some(sample) = bsdf
                .sample(Vec3::NEG_Z, Vec3::Z, Vec3::Z, &mut rng, &compositor)
                .unwrap()
            else {
                continue;
            };
            for wavelength in [0.5, 1.5, 2.5] {
                let value = sample.reflector.reflect(wavelength).unwrap();
                assert!(value.is_finite() && value >= 0.0);
            }
        }
    }
}
