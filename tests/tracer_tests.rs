//! Ray-tracing context tests
//!
//! Tests for:
//! - Visibility epsilon window and bounded/unbounded queries
//! - Shape ray tracer resolution: emission, materials, normals
//! - Transformed shapes and inverse-transpose normals
//! - Normal maps in model and world coordinate spaces

mod common;

use std::any::Any;
use std::sync::Arc;

use glam::{Affine3A, Vec3};
use prism::bsdf::BsdfAllocator;
use prism::errors::{Error, Result};
use prism::geometry::{HitArena, Sphere, Triangle};
use prism::scene::{ListScene, SceneEntry};
use prism::shading::{
    ConstantEmissiveMaterial, ConstantFloatTexture, ConstantReflectorTexture, MatteMaterial,
    NormalCoordinateSpace, NormalMap, TextureCoordinateAllocator,
};
use prism::spectrum::{ReflectorCompositor, RgbReflector, RgbSpectrum, SpectrumCompositor};
use prism::tracer::{Intersection, ShapeRayTracer, VisibilityTester};
use prism::{Material, Ray, RayDifferential, Shape};

const EPSILON: f32 = 1e-3;

struct Arenas {
    hits: HitArena,
    texture_coordinates: TextureCoordinateAllocator,
    bsdfs: BsdfAllocator,
    reflectors: ReflectorCompositor,
    spectra: SpectrumCompositor,
}

impl Arenas {
    fn new() -> Self {
        Self {
            hits: HitArena::new(),
            texture_coordinates: TextureCoordinateAllocator::new(),
            bsdfs: BsdfAllocator::new(),
            reflectors: ReflectorCompositor::new(),
            spectra: SpectrumCompositor::new(),
        }
    }

    fn tracer<'a>(&'a self, scene: &'a dyn prism::Scene) -> ShapeRayTracer<'a> {
        ShapeRayTracer::new(
            scene,
            EPSILON,
            &self.hits,
            &self.texture_coordinates,
            &self.bsdfs,
            &self.reflectors,
            &self.spectra,
        )
    }
}

fn matte_material(r: f32, g: f32, b: f32) -> Arc<dyn Material> {
    Arc::new(MatteMaterial::new(
        Arc::new(ConstantReflectorTexture::new(Some(Arc::new(
            RgbReflector::new(r, g, b).unwrap(),
        )))),
        Arc::new(ConstantFloatTexture::new(0.0).unwrap()),
    ))
}

// ============================================================================
// Visibility tester
// ============================================================================

#[test]
fn visibility_respects_the_epsilon_window() {
    let shape: Arc<dyn Shape> =
        Arc::new(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, [None, None]).unwrap());
    let scene = ListScene::new(vec![SceneEntry::new(shape, None)], None);
    let arena = HitArena::new();
    let mut visibility = VisibilityTester::new(&scene, EPSILON, &arena);

    let ray = Ray::new(Vec3::ZERO, Vec3::Z);

    // The sphere's near surface is at distance 4.
    assert!(visibility.test(&ray, 3.0).unwrap());
    assert!(!visibility.test(&ray, 6.0).unwrap());
    assert!(!visibility.test_any_distance(&ray).unwrap());

    // The target sits on the near surface itself: the epsilon window
    // excludes it.
    assert!(visibility.test(&ray, 4.0 + EPSILON / 2.0).unwrap());
}

#[test]
fn visibility_rejects_negative_distances() {
    let scene = ListScene::new(Vec::new(), None);
    let arena = HitArena::new();
    let mut visibility = VisibilityTester::new(&scene, EPSILON, &arena);
    let ray = Ray::new(Vec3::ZERO, Vec3::Z);
    assert_eq!(
        visibility.test(&ray, -1.0).unwrap_err(),
        Error::InvalidArgument(2)
    );
}

#[test]
fn visibility_is_clear_in_an_empty_scene() {
    let scene = ListScene::new(Vec::new(), None);
    let arena = HitArena::new();
    let mut visibility = VisibilityTester::new(&scene, EPSILON, &arena);
    let ray = Ray::new(Vec3::ZERO, Vec3::Z);
    assert!(visibility.test(&ray, 100.0).unwrap());
    assert!(visibility.test_any_distance(&ray).unwrap());
}

// ============================================================================
// Shape ray tracer
// ============================================================================

#[test]
fn miss_with_no_environment_is_black_and_terminal() {
    let scene = ListScene::new(Vec::new(), None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::ZERO,
            Vec3::Z,
        )))
        .unwrap();
    assert!(result.emitted.is_none());
    assert!(result.bsdf.is_none());
}

#[test]
fn hit_resolves_material_and_normals() {
    let shape: Arc<dyn Shape> = Arc::new(
        Sphere::new(
            Vec3::new(0.0, 0.0, 2.0),
            1.0,
            [Some(matte_material(0.5, 0.5, 0.5)), None],
        )
        .unwrap(),
    );
    let scene = ListScene::new(vec![SceneEntry::new(shape, None)], None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::ZERO,
            Vec3::Z,
        )))
        .unwrap();

    assert!(result.bsdf.is_some());
    assert!((result.hit_point - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-4);
    assert!((result.surface_normal - Vec3::NEG_Z).length() < 1e-4);
    assert!((result.shading_normal - Vec3::NEG_Z).length() < 1e-4);
    assert!(result.emitted.is_none());
}

#[test]
fn missing_material_terminates_with_emission_only() {
    let emitted = Arc::new(RgbSpectrum::new(3.0, 2.0, 1.0).unwrap());
    let shape: Arc<dyn Shape> = Arc::new(
        Triangle::emissive(
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 3.0, 1.0),
            Vec3::new(3.0, -1.0, 1.0),
            [None, None],
            [Some(Arc::new(ConstantEmissiveMaterial::new(emitted))), None],
        )
        .unwrap(),
    );
    let scene = ListScene::new(vec![SceneEntry::new(shape, None)], None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::ZERO,
            Vec3::Z,
        )))
        .unwrap();

    assert!(result.bsdf.is_none());
    assert!(common::approx_eq(
        result.emitted.unwrap().sample(0.5).unwrap(),
        3.0
    ));
}

#[test]
fn transformed_shapes_report_inverse_transpose_normals() {
    // A unit sphere scaled non-uniformly: the normal at the +Y pole must
    // still come out along +Y after the inverse-transpose transform.
    let shape: Arc<dyn Shape> = Arc::new(
        Sphere::new(Vec3::ZERO, 1.0, [Some(matte_material(0.5, 0.5, 0.5)), None]).unwrap(),
    );
    let squash = Affine3A::from_scale(Vec3::new(3.0, 1.0, 3.0));
    let scene = ListScene::new(vec![SceneEntry::new(shape, Some(squash))], None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::NEG_Y,
        )))
        .unwrap();

    assert!(result.bsdf.is_some());
    assert!((result.hit_point - Vec3::Y).length() < 1e-3);
    assert!((result.surface_normal - Vec3::Y).length() < 1e-3);
}

#[test]
fn closest_of_multiple_shapes_wins() {
    let near: Arc<dyn Shape> = Arc::new(
        Sphere::new(
            Vec3::new(0.0, 0.0, 3.0),
            1.0,
            [Some(matte_material(1.0, 0.0, 0.0)), None],
        )
        .unwrap(),
    );
    let far: Arc<dyn Shape> = Arc::new(
        Sphere::new(
            Vec3::new(0.0, 0.0, 8.0),
            1.0,
            [Some(matte_material(0.0, 1.0, 0.0)), None],
        )
        .unwrap(),
    );
    let scene = ListScene::new(
        vec![SceneEntry::new(far, None), SceneEntry::new(near, None)],
        None,
    );
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::ZERO,
            Vec3::Z,
        )))
        .unwrap();
    assert!((result.hit_point.z - 2.0).abs() < 1e-4);
}

// ============================================================================
// Normal maps
// ============================================================================

struct FixedNormalMap {
    normal: Vec3,
    space: NormalCoordinateSpace,
}

impl NormalMap for FixedNormalMap {
    fn compute(
        &self,
        _intersection: &Intersection<'_>,
        _model_geometry_normal: Vec3,
        _world_geometry_normal: Vec3,
        _additional_data: Option<&dyn Any>,
        _texture_coordinates: Option<&dyn Any>,
    ) -> Result<(Vec3, NormalCoordinateSpace)> {
        Ok((self.normal, self.space))
    }
}

/// A sphere wrapper attaching a normal map to the front face.
struct MappedSphere {
    sphere: Sphere,
    map: FixedNormalMap,
}

impl Shape for MappedSphere {
    fn trace<'s>(
        &'s self,
        ray: &Ray,
        minimum: f32,
        maximum: f32,
        hits: &mut prism::geometry::HitSink<'_, 's, '_>,
    ) -> Result<()> {
        // Hits stay attributed to this shape so the normal map resolves.
        self.sphere.trace(ray, minimum, maximum, hits)
    }

    fn bounds(&self, model_to_world: Option<&Affine3A>) -> Result<prism::BoundingBox> {
        self.sphere.bounds(model_to_world)
    }

    fn compute_normal(&self, model_hit_point: Vec3, face: u32) -> Result<Vec3> {
        self.sphere.compute_normal(model_hit_point, face)
    }

    fn material(&self, face: u32) -> Result<Option<&dyn Material>> {
        self.sphere.material(face)
    }

    fn normal_map(&self, _face: u32) -> Result<Option<&dyn NormalMap>> {
        Ok(Some(&self.map))
    }
}

#[test]
fn world_space_normal_maps_override_the_shading_normal() {
    let perturbed = Vec3::new(1.0, 1.0, -1.0).normalize();
    let shape: Arc<dyn Shape> = Arc::new(MappedSphere {
        sphere: Sphere::new(
            Vec3::new(0.0, 0.0, 2.0),
            1.0,
            [Some(matte_material(0.5, 0.5, 0.5)), None],
        )
        .unwrap(),
        map: FixedNormalMap {
            normal: perturbed,
            space: NormalCoordinateSpace::World,
        },
    });
    let scene = ListScene::new(vec![SceneEntry::new(shape, None)], None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::ZERO,
            Vec3::Z,
        )))
        .unwrap();

    // The geometric normal is untouched; the shading normal follows the map.
    assert!((result.surface_normal - Vec3::NEG_Z).length() < 1e-4);
    assert!((result.shading_normal - perturbed).length() < 1e-4);
}

#[test]
fn model_space_normal_maps_go_through_the_inverse_transpose() {
    let shape: Arc<dyn Shape> = Arc::new(MappedSphere {
        sphere: Sphere::new(Vec3::ZERO, 1.0, [Some(matte_material(0.5, 0.5, 0.5)), None])
            .unwrap(),
        map: FixedNormalMap {
            normal: Vec3::Y,
            space: NormalCoordinateSpace::Model,
        },
    });
    let squash = Affine3A::from_scale(Vec3::new(2.0, 0.5, 2.0));
    let scene = ListScene::new(vec![SceneEntry::new(shape, Some(squash))], None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::NEG_Y,
        )))
        .unwrap();

    // Y-axis model normal stays along +Y through the inverse transpose of
    // an axis-aligned scale, and comes back normalised.
    assert!((result.shading_normal - Vec3::Y).length() < 1e-4);
    assert!((result.shading_normal.length() - 1.0).abs() < 1e-5);
}

// ============================================================================
// Material resolution through the tracer
// ============================================================================

#[test]
fn rough_matte_material_produces_a_diffuse_lobe() {
    let material: Arc<dyn Material> = Arc::new(MatteMaterial::new(
        Arc::new(ConstantReflectorTexture::new(Some(Arc::new(
            RgbReflector::new(0.6, 0.6, 0.6).unwrap(),
        )))),
        Arc::new(ConstantFloatTexture::new(25.0).unwrap()),
    ));
    let shape: Arc<dyn Shape> = Arc::new(
        Sphere::new(Vec3::new(0.0, 0.0, 2.0), 1.0, [Some(material), None]).unwrap(),
    );
    let scene = ListScene::new(vec![SceneEntry::new(shape, None)], None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::ZERO,
            Vec3::Z,
        )))
        .unwrap();
    let bsdf = result.bsdf.unwrap();
    assert!(bsdf.is_diffuse());
}

#[test]
fn plastic_material_mixes_diffuse_and_glossy_lobes() {
    use prism::shading::PlasticMaterial;

    let material: Arc<dyn Material> = Arc::new(PlasticMaterial::new(
        Arc::new(ConstantReflectorTexture::new(Some(Arc::new(
            RgbReflector::new(0.4, 0.2, 0.1).unwrap(),
        )))),
        Arc::new(ConstantReflectorTexture::new(Some(Arc::new(
            RgbReflector::new(1.0, 1.0, 1.0).unwrap(),
        )))),
        Arc::new(ConstantFloatTexture::new(0.3).unwrap()),
        false,
    ));
    let shape: Arc<dyn Shape> = Arc::new(
        Sphere::new(Vec3::new(0.0, 0.0, 2.0), 1.0, [Some(material), None]).unwrap(),
    );
    let scene = ListScene::new(vec![SceneEntry::new(shape, None)], None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);

    let result = tracer
        .trace(&RayDifferential::without_differentials(Ray::new(
            Vec3::ZERO,
            Vec3::Z,
        )))
        .unwrap();
    let bsdf = result.bsdf.unwrap();
    assert!(bsdf.is_diffuse());

    // The aggregate evaluates: reflectance and a finite density at a
    // non-grazing direction.
    let (reflectance, pdf) = prism::bsdf::checked_compute_diffuse_with_pdf(
        bsdf,
        Vec3::Z,
        result.shading_normal,
        Vec3::new(0.0, 0.4, -0.9).normalize(),
        false,
        &arenas.reflectors,
    )
    .unwrap()
    .unwrap();
    assert!(pdf > 0.0);
    assert!(reflectance.reflect(0.5).unwrap() > 0.0);
}

#[test]
fn invalid_rays_are_rejected_at_the_entry_point() {
    let scene = ListScene::new(Vec::new(), None);
    let arenas = Arenas::new();
    let tracer = arenas.tracer(&scene);
    let invalid = RayDifferential::without_differentials(Ray::new(Vec3::ZERO, Vec3::ZERO));
    assert_eq!(tracer.trace(&invalid).unwrap_err(), Error::InvalidArgument(1));
}
