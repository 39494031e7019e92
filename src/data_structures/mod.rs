//! Data structures: models, textures and imported scene graphs.
//!
//! - `model` contains meshes, models and the vertex layout
//! - `scene_graph` holds what importers produce before a model is flattened from it
//! - `texture` contains texture references, the per-model texture cache and the GPU texture wrapper

pub mod model;
pub mod scene_graph;
pub mod texture;
