//! Stochastic geometry sampling.
//!
//! The hemisphere samplers orient their results about an arbitrary surface
//! normal; the sphere sampler works in the sphere's local space.

use std::f32::consts::PI;

use glam::Vec3;
use rand::{Rng, RngExt};

use crate::errors::{Error, Result};
use crate::math::OrthonormalBasis;
use crate::math::vector_is_valid_direction;

/// Samples a direction on the hemisphere about `surface_normal` with a
/// cosine-weighted density (`pdf = cos θ / π`).
pub fn sample_hemisphere_with_cosine_weighting(
    surface_normal: Vec3,
    rng: &mut dyn Rng,
) -> Result<Vec3> {
    if !vector_is_valid_direction(surface_normal) {
        return Err(Error::InvalidArgument(0));
    }

    let radius_squared: f32 = rng.random_range(0.0..1.0);
    let theta: f32 = rng.random_range(-PI..PI);

    let radius = radius_squared.sqrt();
    let (sin_theta, cos_theta) = theta.sin_cos();

    let local = Vec3::new(
        radius * cos_theta,
        radius * sin_theta,
        (1.0 - radius_squared).sqrt(),
    );

    Ok(OrthonormalBasis::from_normal(surface_normal).to_world(local))
}

/// Samples a direction on the hemisphere about `surface_normal` uniformly
/// (`pdf = 1 / 2π`).
pub fn sample_hemisphere_uniformly(surface_normal: Vec3, rng: &mut dyn Rng) -> Result<Vec3> {
    if !vector_is_valid_direction(surface_normal) {
        return Err(Error::InvalidArgument(0));
    }

    let z: f32 = rng.random_range(0.0..1.0);
    let theta: f32 = rng.random_range(-PI..PI);

    let radius = (1.0 - z * z).sqrt();
    let (sin_theta, cos_theta) = theta.sin_cos();

    let local = Vec3::new(radius * cos_theta, radius * sin_theta, z);

    Ok(OrthonormalBasis::from_normal(surface_normal).to_world(local))
}

/// Samples a point uniformly on the surface of a sphere of the given radius
/// centred at the origin.
pub fn sample_sphere_uniformly(radius: f32, rng: &mut dyn Rng) -> Result<Vec3> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(Error::InvalidArgument(0));
    }

    let z: f32 = rng.random_range(-radius..radius);
    let phi: f32 = rng.random_range(-PI..PI);

    let r = (radius * radius - z * z).max(0.0).sqrt();
    let (sin_phi, cos_phi) = phi.sin_cos();

    Ok(Vec3::new(r * cos_phi, r * sin_phi, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn cosine_samples_stay_in_hemisphere() {
        let mut rng = SmallRng::seed_from_u64(7);
        let normal = Vec3::new(0.2, -0.7, 0.4).normalize();
        for _ in 0..256 {
            let v = sample_hemisphere_with_cosine_weighting(normal, &mut rng).unwrap();
            assert!(v.dot(normal) >= 0.0);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn cosine_sampling_mean_matches_density() {
        // E[cos θ] under pdf cos θ/π is 2/3.
        let mut rng = SmallRng::seed_from_u64(13);
        let normal = Vec3::Z;
        let n = 20_000;
        let mean: f32 = (0..n)
            .map(|_| {
                sample_hemisphere_with_cosine_weighting(normal, &mut rng)
                    .unwrap()
                    .dot(normal)
            })
            .sum::<f32>()
            / n as f32;
        assert!((mean - 2.0 / 3.0).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn sphere_samples_lie_on_surface() {
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..256 {
            let p = sample_sphere_uniformly(2.5, &mut rng).unwrap();
            assert!((p.length() - 2.5).abs() < 1e-3);
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            sample_hemisphere_with_cosine_weighting(Vec3::ZERO, &mut rng),
            Err(Error::InvalidArgument(0))
        );
        assert_eq!(
            sample_sphere_uniformly(-1.0, &mut rng),
            Err(Error::InvalidArgument(0))
        );
    }
}
