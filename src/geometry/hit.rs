//! Hit plumbing
//!
//! Shapes publish intersections through a [`HitSink`] handed to their
//! `trace`; the sink feeds a [`HitTester`], which keeps either the closest
//! in-range hit (shading traces) or a single boolean (shadow traces). Hit
//! auxiliary data, the opaque per-shape blob downstream materials and
//! normal maps downcast, is copied into a [`HitArena`] so it survives until
//! the owning ray completes.
//!
//! The tester records, for its closest hit, the shape that produced it, the
//! shape's model-to-world transform, and the model-space ray, which is
//! everything the shading resolution chain needs afterwards.

use std::any::Any;

use glam::Affine3A;

use crate::arena::DynamicArena;
use crate::errors::{Error, Result};
use crate::geometry::Shape;
use crate::math::Ray;

// ─── Hit arena ────────────────────────────────────────────────────────────────

/// Arena backing per-hit auxiliary data blobs. Reset once per camera ray.
pub struct HitArena {
    arena: DynamicArena,
}

impl HitArena {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: DynamicArena::new(),
        }
    }

    /// Copies `value` into the arena and returns it as an opaque blob.
    ///
    /// Only the originating shape's collaborators know the concrete type to
    /// downcast to.
    pub fn alloc<T: Copy + Send + Sync + 'static>(&self, value: T) -> Result<&dyn Any> {
        Ok(self.arena.alloc(value)?)
    }

    pub fn free_all(&mut self) {
        self.arena.free_all();
    }
}

impl Default for HitArena {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Closest hit record ───────────────────────────────────────────────────────

/// The closest in-range hit found by a [`HitTester`], resolved to the shape
/// that produced it.
#[derive(Clone, Copy)]
pub struct ClosestHit<'s, 'h> {
    /// Parametric distance along the model-space ray.
    pub distance: f32,
    /// Face the ray entered through.
    pub front_face: u32,
    /// Face behind the hit.
    pub back_face: u32,
    /// Opaque shape-specific data published with the hit.
    pub additional_data: Option<&'h dyn Any>,
    /// The shape the hit belongs to (a nested shape when the outer shape
    /// forwarded the trace).
    pub shape: &'s dyn Shape,
    /// The transform the shape was traced under.
    pub model_to_world: Option<&'s Affine3A>,
    /// The ray in the shape's model space.
    pub model_ray: Ray,
}

// ─── Hit tester ───────────────────────────────────────────────────────────────

enum Mode<'s, 'h> {
    Closest(Option<ClosestHit<'s, 'h>>),
    AnyHit { hit_found: bool },
}

/// Drives shape traces over one ray and accumulates the result.
pub struct HitTester<'s, 'h> {
    world_ray: Ray,
    minimum: f32,
    maximum: f32,
    arena: &'h HitArena,
    mode: Mode<'s, 'h>,
}

impl<'s, 'h> HitTester<'s, 'h> {
    /// A tester that keeps the closest hit within `[minimum, maximum]`.
    #[must_use]
    pub fn new(world_ray: Ray, minimum: f32, maximum: f32, arena: &'h HitArena) -> Self {
        Self {
            world_ray,
            minimum,
            maximum,
            arena,
            mode: Mode::Closest(None),
        }
    }

    /// A tester that only records whether any in-range hit exists.
    #[must_use]
    pub fn new_any_hit(world_ray: Ray, minimum: f32, maximum: f32, arena: &'h HitArena) -> Self {
        Self {
            world_ray,
            minimum,
            maximum,
            arena,
            mode: Mode::AnyHit { hit_found: false },
        }
    }

    /// The ray being tested, in world space.
    #[inline]
    #[must_use]
    pub fn world_ray(&self) -> Ray {
        self.world_ray
    }

    /// Traces `shape` as world-space geometry.
    pub fn test_world_shape(&mut self, shape: &'s dyn Shape) -> Result<()> {
        let ray = self.world_ray;
        self.test_with_ray(shape, None, ray)
    }

    /// Traces `shape` under `model_to_world`, transforming the ray into the
    /// shape's model space first.
    pub fn test_transformed_shape(
        &mut self,
        shape: &'s dyn Shape,
        model_to_world: &'s Affine3A,
    ) -> Result<()> {
        let model_ray = self.world_ray.transformed(&model_to_world.inverse());
        self.test_with_ray(shape, Some(model_to_world), model_ray)
    }

    fn test_with_ray(
        &mut self,
        shape: &'s dyn Shape,
        model_to_world: Option<&'s Affine3A>,
        model_ray: Ray,
    ) -> Result<()> {
        let (minimum, maximum) = (self.minimum, self.maximum);
        let mut sink = HitSink {
            tester: self,
            shape,
            model_to_world,
            model_ray,
        };
        shape.trace(&model_ray, minimum, maximum, &mut sink)
    }

    /// Whether any in-range hit was recorded.
    #[must_use]
    pub fn hit_found(&self) -> bool {
        match &self.mode {
            Mode::Closest(closest) => closest.is_some(),
            Mode::AnyHit { hit_found } => *hit_found,
        }
    }

    /// Consumes the tester and returns the closest hit, if one exists.
    /// Meaningless in any-hit mode (always `None`).
    #[must_use]
    pub fn into_closest(self) -> Option<ClosestHit<'s, 'h>> {
        match self.mode {
            Mode::Closest(closest) => closest,
            Mode::AnyHit { .. } => None,
        }
    }

    fn record(&mut self, candidate: ClosestHit<'s, 'h>) {
        match &mut self.mode {
            Mode::Closest(closest) => {
                if closest.is_none_or(|best| candidate.distance < best.distance) {
                    *closest = Some(candidate);
                }
            }
            Mode::AnyHit { hit_found } => *hit_found = true,
        }
    }
}

// ─── Hit sink ─────────────────────────────────────────────────────────────────

/// The publishing surface a shape's `trace` writes through.
pub struct HitSink<'t, 's, 'h> {
    tester: &'t mut HitTester<'s, 'h>,
    shape: &'s dyn Shape,
    model_to_world: Option<&'s Affine3A>,
    model_ray: Ray,
}

impl<'t, 's, 'h> HitSink<'t, 's, 'h> {
    /// Publishes a hit with no auxiliary data.
    pub fn push(&mut self, distance: f32, front_face: u32, back_face: u32) -> Result<()> {
        self.push_inner(self.shape, distance, front_face, back_face, None)
    }

    /// Publishes a hit carrying an opaque shape-specific blob. The blob is
    /// copied into the hit arena only when the hit is an improvement.
    pub fn push_with_data<T: Copy + Send + Sync + 'static>(
        &mut self,
        distance: f32,
        front_face: u32,
        back_face: u32,
        data: T,
    ) -> Result<()> {
        if !self.is_improvement(distance) {
            return self.push_inner(self.shape, distance, front_face, back_face, None);
        }
        let blob = self.tester.arena.alloc(data)?;
        self.push_inner(self.shape, distance, front_face, back_face, Some(blob))
    }

    /// Traces a shape nested inside the one being traced, in the same model
    /// space. Hits published by the nested shape are attributed to it, which
    /// is what identity-matching consumers (nested area lights) rely on.
    pub fn test_nested_shape(&mut self, shape: &'s dyn Shape) -> Result<()> {
        let (minimum, maximum) = (self.tester.minimum, self.tester.maximum);
        let (model_to_world, model_ray) = (self.model_to_world, self.model_ray);
        let mut sink = HitSink {
            tester: &mut *self.tester,
            shape,
            model_to_world,
            model_ray,
        };
        shape.trace(&model_ray, minimum, maximum, &mut sink)
    }

    fn is_improvement(&self, distance: f32) -> bool {
        if !(distance >= self.tester.minimum && distance <= self.tester.maximum) {
            return false;
        }
        match &self.tester.mode {
            Mode::Closest(closest) => closest.is_none_or(|best| distance < best.distance),
            Mode::AnyHit { hit_found } => !hit_found,
        }
    }

    fn push_inner(
        &mut self,
        shape: &'s dyn Shape,
        distance: f32,
        front_face: u32,
        back_face: u32,
        additional_data: Option<&'h dyn Any>,
    ) -> Result<()> {
        if distance.is_nan() {
            return Err(Error::InvalidResult);
        }
        if !(distance >= self.tester.minimum && distance <= self.tester.maximum) {
            return Ok(());
        }
        self.tester.record(ClosestHit {
            distance,
            front_face,
            back_face,
            additional_data,
            shape,
            model_to_world: self.model_to_world,
            model_ray: self.model_ray,
        });
        Ok(())
    }
}

// ─── Single-shape trace ───────────────────────────────────────────────────────

/// Traces exactly one shape and returns its closest hit at distance
/// `minimum` or beyond. This is the dedicated trace the area-light wrapper
/// uses: no scene traversal, just the wrapped shape.
pub fn trace_single_shape<'s, 'h>(
    shape: &'s dyn Shape,
    model_to_world: Option<&'s Affine3A>,
    world_ray: &Ray,
    minimum: f32,
    arena: &'h HitArena,
) -> Result<Option<ClosestHit<'s, 'h>>> {
    let mut tester = HitTester::new(*world_ray, minimum, f32::INFINITY, arena);
    match model_to_world {
        Some(matrix) => tester.test_transformed_shape(shape, matrix)?,
        None => tester.test_world_shape(shape)?,
    }
    Ok(tester.into_closest())
}
