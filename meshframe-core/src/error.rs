//! Error types shared by the normal and tangent-frame generators.
//!
//! Every failure aborts the whole call before any output buffer is written.
//! Numerically degenerate input (collapsed UVs, zero-area faces, vertices no
//! face references) is not an error and is resolved in-band by the generators.

use thiserror::Error;

/// Broad failure class, for callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A buffer is missing, mis-sized, or a count is out of range.
    InvalidArgument,
    /// `face_count * 3` does not fit in a 32-bit count.
    ArithmeticOverflow,
    /// A face references a vertex past the end of the vertex buffers.
    UnexpectedIndex,
    /// The per-call scratch buffer could not be allocated.
    OutOfMemory,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A required buffer is empty or has the wrong length, or no output was requested.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The vertex count collides with the sentinel of the chosen index width.
    #[error("Vertex count {vertex_count} must be below the index sentinel {limit}")]
    VertexCountTooLarge { vertex_count: usize, limit: usize },

    #[error("Face count {face_count} overflows a 32-bit index count")]
    ArithmeticOverflow { face_count: usize },

    #[error("Face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("Failed to allocate scratch space for {elements} vectors")]
    AllocationFailed { elements: usize },
}

impl MeshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::InvalidArgument(_) | MeshError::VertexCountTooLarge { .. } => {
                ErrorKind::InvalidArgument
            }
            MeshError::ArithmeticOverflow { .. } => ErrorKind::ArithmeticOverflow,
            MeshError::IndexOutOfRange { .. } => ErrorKind::UnexpectedIndex,
            MeshError::AllocationFailed { .. } => ErrorKind::OutOfMemory,
        }
    }
}

/// Convenience alias for generator results.
pub type MeshResult<T> = Result<T, MeshError>;
