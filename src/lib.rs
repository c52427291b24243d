#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]

//! # Prism
//!
//! A physically based spectral path-tracing core: the rendering-runtime
//! data plane of a renderer. It provides the polymorphic object model
//! (shapes, materials, lights, spectra), the arena-scoped shading-pipeline
//! allocators, the path-tracer integration loop, and the radiometric
//! composition algebra. Scene description parsing, image I/O, spatial-index
//! construction, and thread-pool scheduling are external collaborators:
//! they hand this crate fully constructed scenes and read back per-ray
//! results through the tone-map callback.

pub mod arena;
pub mod bsdf;
pub mod errors;
pub mod geometry;
pub mod integrator;
pub mod light;
pub mod math;
pub mod scene;
pub mod shading;
pub mod spectrum;
pub mod tracer;

pub use arena::DynamicArena;
pub use bsdf::{Bsdf, BsdfAllocator, BsdfSample, BsdfSampleFlags, Pdf};
pub use errors::{Error, Result};
pub use geometry::{Shape, Sphere, Triangle};
pub use integrator::{Integrator, PathTracer, RayIntegrator};
pub use light::{
    AllLightSampler, AreaLight, DirectionalLight, EnvironmentalLight, Light, LightSampler,
    UniformLightSampler,
};
pub use math::{BoundingBox, Ray, RayDifferential};
pub use scene::{ListScene, Scene, SceneEntry};
pub use shading::{EmissiveMaterial, Material, NormalMap, TextureCoordinateMap};
pub use spectrum::{
    Color3, ColorExtrapolator, ColorIntegrator, Reflector, ReflectorCompositor, Spectrum,
    SpectrumCompositor,
};
pub use tracer::{Intersection, ShapeRayTracer, TraceResult, VisibilityTester};
