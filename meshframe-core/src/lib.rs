//! Meshframe Core - per-vertex normals and tangent frames for triangle meshes
//!
//! Both generators are pure functions over caller-owned slices: they read an
//! index buffer (16- or 32-bit) plus vertex attributes, accumulate into a
//! transient scratch buffer, and write one result per vertex. They hold no
//! global state and can run concurrently on disjoint buffers.

pub mod error;
pub mod geometry;
pub mod index;
mod math;
pub mod normals;
pub mod tangents;

// Re-export commonly used types
pub use error::{ErrorKind, MeshError, MeshResult};
pub use geometry::IndexedMesh;
pub use index::{face_count, validate_counts, MeshIndex};
pub use normals::{compute_normals, NormalOptions, NormalWeighting, Winding};
pub use tangents::{
    compute_tangent_frame, compute_tangent_frame_with_handedness, compute_tangents,
    generate_tangent_frame, TangentFrameTargets, TangentOutput,
};
