//! Core building blocks: analysis parameters, raster and vector primitives, the typed
//! scene stages, and the processing stages that turn a scene series into anomaly maps.
//! These are consumed by the high-level `api` module.
pub mod geometry;
pub mod params;
pub mod processing;
pub mod raster;
pub mod scene;
