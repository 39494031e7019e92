//! meshcam
//!
//! A first-person orientation controller and a flattened mesh/model aggregate
//! for small rendering hosts. The crate computes view/projection matrices and
//! turns imported 3D assets (obj, glTF) into ordered lists of drawable meshes.
//! Everything that touches a graphics API sits behind the collaborator traits
//! in `render`; `context` provides a wgpu implementation of the upload side.
//!
//! High-level modules
//! - `camera`: Euler-angle camera, projection and camera uniform
//! - `context`: wgpu device/queue owning uploaded textures and mesh buffers
//! - `data_structures`: meshes, models, textures and imported scene graphs
//! - `input`: cursor and frame-time helpers feeding the camera
//! - `render`: collaborator traits for uploading, shading and drawing
//! - `resources`: importers, post-processing and model loading
//! - `shader`: shader source loading
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod input;
pub mod render;
pub mod resources;
pub mod shader;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
