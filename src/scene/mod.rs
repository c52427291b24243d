//! Scenes
//!
//! A [`Scene`] exposes exactly one operation to the core, tracing a ray
//! into a [`HitTester`], plus an optional environmental light for rays that
//! escape. Spatial-index internals are an external concern; [`ListScene`]
//! is the reference implementation that simply visits every entry.

use std::sync::Arc;

use glam::Affine3A;

use crate::errors::Result;
use crate::geometry::{HitTester, Shape};
use crate::light::EnvironmentalLight;
use crate::math::Ray;

/// A traceable collection of shapes owning an optional environment.
pub trait Scene: Send + Sync {
    /// Tests every shape that might intersect `ray` against `tester`.
    fn trace<'s>(&'s self, ray: &Ray, tester: &mut HitTester<'s, '_>) -> Result<()>;

    /// The environmental light evaluated for escaping rays, if any.
    fn environment(&self) -> Option<&dyn EnvironmentalLight> {
        None
    }
}

/// One shape placed in a scene, optionally transformed.
pub struct SceneEntry {
    pub shape: Arc<dyn Shape>,
    pub model_to_world: Option<Affine3A>,
}

impl SceneEntry {
    #[must_use]
    pub fn new(shape: Arc<dyn Shape>, model_to_world: Option<Affine3A>) -> Self {
        Self {
            shape,
            model_to_world,
        }
    }
}

/// The trivial scene: a list of entries traced in order.
pub struct ListScene {
    entries: Vec<SceneEntry>,
    environment: Option<Arc<dyn EnvironmentalLight>>,
}

impl ListScene {
    #[must_use]
    pub fn new(
        entries: Vec<SceneEntry>,
        environment: Option<Arc<dyn EnvironmentalLight>>,
    ) -> Self {
        Self {
            entries,
            environment,
        }
    }
}

impl Scene for ListScene {
    fn trace<'s>(&'s self, _ray: &Ray, tester: &mut HitTester<'s, '_>) -> Result<()> {
        for entry in &self.entries {
            match &entry.model_to_world {
                Some(matrix) => tester.test_transformed_shape(&*entry.shape, matrix)?,
                None => tester.test_world_shape(&*entry.shape)?,
            }
        }
        Ok(())
    }

    fn environment(&self) -> Option<&dyn EnvironmentalLight> {
        self.environment.as_deref()
    }
}
