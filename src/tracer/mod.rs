//! Ray-tracing context
//!
//! [`ShapeRayTracer`] is the resolution chain between raw geometry and the
//! integrator: it finds the closest hit, resolves the emitted spectrum, the
//! material, the geometric and shading normals, and the texture
//! coordinates, and hands back everything a path vertex needs.
//! [`VisibilityTester`] answers the integrator's shadow-ray queries over the
//! same scene. Both borrow the per-ray arenas owned by the harness and are
//! confined to one thread.

use glam::{Affine3A, Vec3};

use crate::bsdf::{Bsdf, BsdfAllocator};
use crate::errors::{Error, Result};
use crate::geometry::{HitArena, HitTester};
use crate::math::{Ray, RayDifferential, transform_normal, vector_is_valid_direction};
use crate::scene::Scene;
use crate::shading::{NormalCoordinateSpace, TextureCoordinateAllocator};
use crate::spectrum::{ReflectorCompositor, Spectrum, SpectrumCompositor};

// ─── Intersection ─────────────────────────────────────────────────────────────

/// A resolved ray-surface intersection, in both model and world space, with
/// the screen-space position partials used for texture filtering.
pub struct Intersection<'s> {
    pub ray: RayDifferential,
    pub model_hit_point: Vec3,
    pub world_hit_point: Vec3,
    pub world_surface_normal: Vec3,
    pub model_to_world: Option<&'s Affine3A>,
    /// World-space change of the hit point per screen-space x step.
    pub dp_dx: Vec3,
    /// World-space change of the hit point per screen-space y step.
    pub dp_dy: Vec3,
}

impl<'s> Intersection<'s> {
    /// Builds the record, deriving `dp/dx` and `dp/dy` by intersecting the
    /// differential rays with the tangent plane at the hit point. Rays
    /// without differentials get zero partials.
    #[must_use]
    pub fn new(
        ray: RayDifferential,
        model_to_world: Option<&'s Affine3A>,
        model_hit_point: Vec3,
        world_hit_point: Vec3,
        world_surface_normal: Vec3,
    ) -> Self {
        let (dp_dx, dp_dy) = match ray.differentials {
            Some((rx, ry)) => (
                plane_offset(&rx, world_hit_point, world_surface_normal),
                plane_offset(&ry, world_hit_point, world_surface_normal),
            ),
            None => (Vec3::ZERO, Vec3::ZERO),
        };
        Self {
            ray,
            model_hit_point,
            world_hit_point,
            world_surface_normal,
            model_to_world,
            dp_dx,
            dp_dy,
        }
    }
}

/// Where `ray` meets the plane through `point` with normal `normal`,
/// relative to `point`. Zero when the ray is parallel to the plane.
fn plane_offset(ray: &Ray, point: Vec3, normal: Vec3) -> Vec3 {
    let denominator = ray.direction.dot(normal);
    if denominator == 0.0 {
        return Vec3::ZERO;
    }
    let t = (point - ray.origin).dot(normal) / denominator;
    ray.at(t) - point
}

// ─── Trace result ─────────────────────────────────────────────────────────────

/// Everything the integrator needs from one path vertex.
pub struct TraceResult<'a> {
    /// Light emitted toward the ray origin, from an emissive hit face or
    /// the environment on a miss.
    pub emitted: Option<&'a dyn Spectrum>,
    /// The BSDF at the hit, or `None` when the path terminates here (miss,
    /// missing material, or absorbing material).
    pub bsdf: Option<&'a dyn Bsdf>,
    /// World-space hit point. Meaningful only when `bsdf` is `Some`.
    pub hit_point: Vec3,
    /// World-space geometric normal. Meaningful only when `bsdf` is `Some`.
    pub surface_normal: Vec3,
    /// World-space shading normal. Meaningful only when `bsdf` is `Some`.
    pub shading_normal: Vec3,
}

impl std::fmt::Debug for TraceResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceResult")
            .field("emitted", &self.emitted.map(|_| "<dyn Spectrum>"))
            .field("bsdf", &self.bsdf.map(|_| "<dyn Bsdf>"))
            .field("hit_point", &self.hit_point)
            .field("surface_normal", &self.surface_normal)
            .field("shading_normal", &self.shading_normal)
            .finish()
    }
}

impl<'a> TraceResult<'a> {
    fn terminal(emitted: Option<&'a dyn Spectrum>) -> TraceResult<'a> {
        TraceResult {
            emitted,
            bsdf: None,
            hit_point: Vec3::ZERO,
            surface_normal: Vec3::ZERO,
            shading_normal: Vec3::ZERO,
        }
    }
}

// ─── Shape ray tracer ─────────────────────────────────────────────────────────

/// Per-ray shading resolver over one scene and one set of arenas.
pub struct ShapeRayTracer<'a> {
    scene: &'a dyn Scene,
    epsilon: f32,
    hits: &'a HitArena,
    texture_coordinates: &'a TextureCoordinateAllocator,
    bsdfs: &'a BsdfAllocator,
    reflectors: &'a ReflectorCompositor,
    spectra: &'a SpectrumCompositor,
}

impl<'a> ShapeRayTracer<'a> {
    #[must_use]
    pub fn new(
        scene: &'a dyn Scene,
        epsilon: f32,
        hits: &'a HitArena,
        texture_coordinates: &'a TextureCoordinateAllocator,
        bsdfs: &'a BsdfAllocator,
        reflectors: &'a ReflectorCompositor,
        spectra: &'a SpectrumCompositor,
    ) -> Self {
        Self {
            scene,
            epsilon,
            hits,
            texture_coordinates,
            bsdfs,
            reflectors,
            spectra,
        }
    }

    /// Traces `ray` to the closest hit at `epsilon` or beyond and resolves
    /// the full shading state there.
    ///
    /// Misses evaluate the scene's environmental light, if any. Failures of
    /// any collaborator propagate unchanged; a shading normal that fails
    /// validation is [`Error::InvalidResult`].
    pub fn trace(&self, ray: &RayDifferential) -> Result<TraceResult<'a>> {
        if !ray.is_valid() {
            return Err(Error::InvalidArgument(1));
        }

        let mut tester = HitTester::new(ray.ray, self.epsilon, f32::INFINITY, self.hits);
        self.scene.trace(&ray.ray, &mut tester)?;

        let Some(hit) = tester.into_closest() else {
            let emitted = match self.scene.environment() {
                Some(environment) => {
                    environment.compute_emissive(ray.ray.direction, self.spectra)?
                }
                None => None,
            };
            return Ok(TraceResult::terminal(emitted));
        };

        let shape = hit.shape;
        let model_hit_point = hit.model_ray.at(hit.distance);
        let world_hit_point = match hit.model_to_world {
            Some(matrix) => matrix.transform_point3(model_hit_point),
            None => ray.ray.at(hit.distance),
        };

        // Emission, gated on the shape exposing the full emissive triple.
        let mut emitted = None;
        if shape.is_sampleable()
            && let Some(emissive) = shape.emissive_material(hit.front_face)?
        {
            emitted = emissive.sample(model_hit_point, hit.additional_data)?;
        }

        let Some(material) = shape.material(hit.front_face)? else {
            return Ok(TraceResult::terminal(emitted));
        };

        let model_surface_normal = shape.compute_normal(model_hit_point, hit.front_face)?;
        let world_surface_normal = match hit.model_to_world {
            Some(matrix) => transform_normal(matrix, model_surface_normal)?,
            None => {
                if !vector_is_valid_direction(model_surface_normal) {
                    return Err(Error::InvalidResult);
                }
                model_surface_normal
            }
        };

        let intersection = Intersection::new(
            *ray,
            hit.model_to_world,
            model_hit_point,
            world_hit_point,
            world_surface_normal,
        );

        let texture_coordinates = match shape.texture_coordinate_map(hit.front_face)? {
            Some(map) => map.compute(
                &intersection,
                hit.additional_data,
                self.texture_coordinates,
            )?,
            None => None,
        };

        let bsdf = material.sample(
            &intersection,
            hit.additional_data,
            texture_coordinates,
            self.bsdfs,
            self.reflectors,
        )?;

        let shading_normal = match shape.normal_map(hit.front_face)? {
            Some(map) => {
                let (normal, space) = map.compute(
                    &intersection,
                    model_surface_normal,
                    world_surface_normal,
                    hit.additional_data,
                    texture_coordinates,
                )?;
                match (space, hit.model_to_world) {
                    (NormalCoordinateSpace::Model, Some(matrix)) => {
                        transform_normal(matrix, normal)?
                    }
                    _ => {
                        if !vector_is_valid_direction(normal) {
                            return Err(Error::InvalidResult);
                        }
                        normal.normalize()
                    }
                }
            }
            None => world_surface_normal,
        };

        Ok(TraceResult {
            emitted,
            bsdf,
            hit_point: world_hit_point,
            surface_normal: world_surface_normal,
            shading_normal,
        })
    }
}

// ─── Visibility tester ────────────────────────────────────────────────────────

/// Shadow-ray queries over a scene, with the configured trace epsilon.
pub struct VisibilityTester<'a> {
    scene: &'a dyn Scene,
    epsilon: f32,
    hits: &'a HitArena,
}

impl<'a> VisibilityTester<'a> {
    #[must_use]
    pub fn new(scene: &'a dyn Scene, epsilon: f32, hits: &'a HitArena) -> Self {
        Self {
            scene,
            epsilon,
            hits,
        }
    }

    /// True iff no geometry lies along `ray` within
    /// `(epsilon, distance_to_object − epsilon)`.
    ///
    /// A negative distance is [`Error::InvalidArgument`]`(2)`.
    pub fn test(&mut self, ray: &Ray, distance_to_object: f32) -> Result<bool> {
        if !ray.is_valid() {
            return Err(Error::InvalidArgument(1));
        }
        if distance_to_object < 0.0 {
            return Err(Error::InvalidArgument(2));
        }

        let maximum = distance_to_object - self.epsilon;
        if maximum <= self.epsilon {
            return Ok(true);
        }

        let mut tester = HitTester::new_any_hit(*ray, self.epsilon, maximum, self.hits);
        self.scene.trace(ray, &mut tester)?;
        Ok(!tester.hit_found())
    }

    /// As [`test`](Self::test) with an unbounded distance.
    pub fn test_any_distance(&mut self, ray: &Ray) -> Result<bool> {
        if !ray.is_valid() {
            return Err(Error::InvalidArgument(1));
        }
        let mut tester = HitTester::new_any_hit(*ray, self.epsilon, f32::INFINITY, self.hits);
        self.scene.trace(ray, &mut tester)?;
        Ok(!tester.hit_found())
    }

    /// The configured trace epsilon.
    #[inline]
    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// The hit arena backing this ray context.
    #[inline]
    #[must_use]
    pub fn hit_arena(&self) -> &'a HitArena {
        self.hits
    }
}
