//! Shared test fixtures: an orthographic camera, a framebuffer, drop
//! tracking for ownership tests, and the vertex-color triangle material.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec3;

use prism::bsdf::{Bsdf, BsdfAllocator, LambertianBsdf};
use prism::errors::Result;
use prism::geometry::BarycentricCoordinates;
use prism::shading::Material;
use prism::spectrum::{Color3, Reflector, ReflectorCompositor};
use prism::tracer::Intersection;
use prism::{Ray, Spectrum};

#[allow(dead_code)]
pub const EPSILON: f32 = 1e-4;

/// Wires `log` output into test captures. Safe to call repeatedly.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

#[allow(dead_code)]
pub fn color_approx(a: Color3, b: Color3, tolerance: f32) -> bool {
    (a.r - b.r).abs() < tolerance && (a.g - b.g).abs() < tolerance && (a.b - b.b).abs() < tolerance
}

// ============================================================================
// Orthographic camera
// ============================================================================

/// An orthographic camera looking along +Z, matching the end-to-end test
/// geometry: center position, view width and height in world units.
#[allow(dead_code)]
pub struct OrthographicCamera {
    pub position: Vec3,
    pub width: f32,
    pub height: f32,
}

#[allow(dead_code)]
impl OrthographicCamera {
    pub fn new(position: Vec3, width: f32, height: f32) -> Self {
        Self {
            position,
            width,
            height,
        }
    }

    /// The ray through pixel `(x, y)` of a `columns × rows` framebuffer,
    /// sampled at the pixel center.
    pub fn ray(&self, x: usize, y: usize, columns: usize, rows: usize) -> Ray {
        let u = (x as f32 + 0.5) / columns as f32 - 0.5;
        let v = 0.5 - (y as f32 + 0.5) / rows as f32;
        let origin =
            self.position + Vec3::new(u * self.width, v * self.height, 0.0);
        Ray::new(origin, Vec3::Z)
    }
}

// ============================================================================
// Framebuffer
// ============================================================================

#[allow(dead_code)]
pub struct Framebuffer {
    pub columns: usize,
    pub rows: usize,
    pub pixels: Vec<Color3>,
}

#[allow(dead_code)]
impl Framebuffer {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            pixels: vec![Color3::BLACK; columns * rows],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Color3 {
        self.pixels[y * self.columns + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color3) {
        self.pixels[y * self.columns + x] = color;
    }

    /// Sum of all channel values, for energy-conservation checks.
    pub fn total_energy(&self) -> f32 {
        self.pixels.iter().map(|p| p.r + p.g + p.b).sum()
    }
}

// ============================================================================
// Drop tracking
// ============================================================================

/// A reflector that counts its drops, for shared-ownership tests.
#[allow(dead_code)]
#[derive(Debug)]
pub struct TrackedReflector {
    reflectance: f32,
    drops: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl TrackedReflector {
    pub fn new(reflectance: f32, drops: Arc<AtomicUsize>) -> Self {
        Self { reflectance, drops }
    }
}

impl Reflector for TrackedReflector {
    fn reflect(&self, _wavelength: f32) -> Result<f32> {
        Ok(self.reflectance)
    }

    fn albedo(&self) -> Result<f32> {
        Ok(self.reflectance)
    }
}

impl Drop for TrackedReflector {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A spectrum that counts its drops.
#[allow(dead_code)]
pub struct TrackedSpectrum {
    intensity: f32,
    drops: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl TrackedSpectrum {
    pub fn new(intensity: f32, drops: Arc<AtomicUsize>) -> Self {
        Self { intensity, drops }
    }
}

impl Spectrum for TrackedSpectrum {
    fn sample(&self, _wavelength: f32) -> Result<f32> {
        Ok(self.intensity)
    }
}

impl Drop for TrackedSpectrum {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Vertex-color triangle material
// ============================================================================

/// Interpolates three vertex reflectors by the hit's barycentric weights
/// and shades with a Lambertian lobe.
#[allow(dead_code)]
pub struct VertexColorMaterial {
    pub reflectors: [Arc<dyn Reflector>; 3],
}

impl Material for VertexColorMaterial {
    fn sample<'a>(
        &'a self,
        _intersection: &Intersection<'_>,
        additional_data: Option<&dyn Any>,
        _texture_coordinates: Option<&dyn Any>,
        bsdf_allocator: &'a BsdfAllocator,
        compositor: &'a ReflectorCompositor,
    ) -> Result<Option<&'a dyn Bsdf>> {
        let Some(barycentric) =
            additional_data.and_then(|data| data.downcast_ref::<BarycentricCoordinates>())
        else {
            return Ok(None);
        };
        let [w0, w1, w2] = barycentric.coordinates;

        let first = compositor.attenuate(Some(&*self.reflectors[0]), w0.max(0.0))?;
        let blended =
            compositor.attenuated_add(first, Some(&*self.reflectors[1]), w1.max(0.0))?;
        let blended =
            compositor.attenuated_add(blended, Some(&*self.reflectors[2]), w2.max(0.0))?;
        let Some(reflector) = blended else {
            return Ok(None);
        };

        Ok(Some(bsdf_allocator.alloc(LambertianBsdf::new(reflector))?))
    }
}
