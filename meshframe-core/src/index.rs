//! Index buffer handling shared by both generators.
//!
//! Meshes come with either 16-bit or 32-bit index buffers. Both widths run
//! through the same code via [`MeshIndex`]; the only thing that differs is
//! the sentinel value, which is also the exclusive upper bound on the vertex
//! count.

use std::fmt::Debug;

use nalgebra::Vector3;

use crate::error::{MeshError, MeshResult};

mod sealed {
    pub trait Sealed {}

    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// An index type usable in a triangle index buffer.
///
/// A face with any corner equal to [`MeshIndex::SENTINEL`] is a placeholder
/// and is skipped by the generators.
pub trait MeshIndex: sealed::Sealed + Copy + Eq + Debug + Send + Sync + 'static {
    /// Maximum value of the type; marks a skipped face.
    const SENTINEL: Self;

    /// The sentinel as a vertex count. Meshes must have fewer vertices than this.
    const LIMIT: usize;

    fn to_usize(self) -> usize;

    /// `i` as an index, or `None` if it does not fit below the sentinel.
    fn from_usize(i: usize) -> Option<Self>;

    #[inline]
    fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }
}

impl MeshIndex for u16 {
    const SENTINEL: u16 = u16::MAX;
    const LIMIT: usize = u16::MAX as usize;

    #[inline]
    fn to_usize(self) -> usize {
        usize::from(self)
    }

    #[inline]
    fn from_usize(i: usize) -> Option<Self> {
        u16::try_from(i).ok().filter(|v| !v.is_sentinel())
    }
}

impl MeshIndex for u32 {
    const SENTINEL: u32 = u32::MAX;
    const LIMIT: usize = u32::MAX as usize;

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_usize(i: usize) -> Option<Self> {
        u32::try_from(i).ok().filter(|v| !v.is_sentinel())
    }
}

/// Number of whole triangles in `indices`.
pub fn face_count<I: MeshIndex>(indices: &[I]) -> MeshResult<usize> {
    if indices.len() % 3 != 0 {
        return Err(MeshError::InvalidArgument(
            "index buffer length is not a multiple of three",
        ));
    }
    Ok(indices.len() / 3)
}

/// Checks face and vertex counts against the limits of index width `I`.
///
/// Fails on zero counts, on a vertex count that reaches the sentinel, and on
/// a face count whose index count would not fit in 32 bits.
pub fn validate_counts<I: MeshIndex>(face_count: usize, vertex_count: usize) -> MeshResult<()> {
    if face_count == 0 {
        return Err(MeshError::InvalidArgument("index buffer holds no faces"));
    }
    if vertex_count == 0 {
        return Err(MeshError::InvalidArgument("position buffer is empty"));
    }
    if vertex_count >= I::LIMIT {
        return Err(MeshError::VertexCountTooLarge {
            vertex_count,
            limit: I::LIMIT,
        });
    }

    let overflows = (face_count as u64)
        .checked_mul(3)
        .map_or(true, |count| count >= u64::from(u32::MAX));
    if overflows {
        return Err(MeshError::ArithmeticOverflow { face_count });
    }

    Ok(())
}

/// Fails unless `len` matches the vertex count.
pub(crate) fn expect_vertex_len(len: usize, vertex_count: usize, what: &'static str) -> MeshResult<()> {
    if len != vertex_count {
        return Err(MeshError::InvalidArgument(what));
    }
    Ok(())
}

/// Visits every face that is not a sentinel placeholder, in buffer order.
///
/// Returns the number of skipped faces. The first face referencing a vertex
/// at or past `vertex_count` aborts the walk with
/// [`MeshError::IndexOutOfRange`]; faces already visited are not rolled back,
/// so callers only accumulate into scratch space here.
pub(crate) fn for_each_face<I, F>(indices: &[I], vertex_count: usize, mut visit: F) -> MeshResult<usize>
where
    I: MeshIndex,
    F: FnMut([usize; 3]),
{
    let mut skipped = 0;

    for (face, tri) in indices.chunks_exact(3).enumerate() {
        if tri.iter().any(|i| i.is_sentinel()) {
            skipped += 1;
            continue;
        }

        let corners = [tri[0].to_usize(), tri[1].to_usize(), tri[2].to_usize()];
        if let Some(&index) = corners.iter().find(|&&i| i >= vertex_count) {
            log::warn!(
                "face {} references vertex {} of {}, aborting",
                face,
                index,
                vertex_count
            );
            return Err(MeshError::IndexOutOfRange {
                face,
                index,
                vertex_count,
            });
        }

        visit(corners);
    }

    Ok(skipped)
}

/// Allocates a zero-filled per-vertex accumulator without aborting on OOM.
pub(crate) fn zeroed_scratch(len: usize) -> MeshResult<Vec<Vector3<f32>>> {
    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(len)
        .map_err(|_| MeshError::AllocationFailed { elements: len })?;
    scratch.resize(len, Vector3::zeros());
    Ok(scratch)
}
