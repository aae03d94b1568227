//! Per-vertex normal generation.
//!
//! Each face contributes its unit normal to its three corners, scaled by a
//! per-corner weight. The accumulated vectors are normalized at the end and
//! flipped for clockwise winding.

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, MeshResult};
use crate::index::{expect_vertex_len, face_count, for_each_face, validate_counts, zeroed_scratch, MeshIndex};
use crate::math::normalize_or_zero;

/// How much each face contributes to the normal of a corner vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NormalWeighting {
    /// Weight by the angle the face subtends at the vertex.
    #[default]
    Angle,
    /// Weight by twice the face area.
    Area,
    /// Every face counts the same.
    Equal,
}

/// Vertex order that produces outward-facing normals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Winding {
    #[default]
    CounterClockwise,
    Clockwise,
}

/// Options for [`compute_normals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalOptions {
    pub weighting: NormalWeighting,
    pub winding: Winding,
}

impl NormalOptions {
    /// Flag bit selecting area weighting. Takes precedence over [`Self::WEIGHT_EQUAL`].
    pub const WEIGHT_BY_AREA: u32 = 0x1;
    /// Flag bit selecting equal weighting.
    pub const WEIGHT_EQUAL: u32 = 0x2;
    /// Flag bit selecting clockwise winding.
    pub const WIND_CW: u32 = 0x4;

    pub fn new(weighting: NormalWeighting, winding: Winding) -> Self {
        Self { weighting, winding }
    }

    /// Decode the bit-flag form used by flag-based mesh pipelines.
    ///
    /// Unknown bits are ignored. With no weighting bit set, angle weighting is used.
    pub fn from_flags(flags: u32) -> Self {
        let weighting = if flags & Self::WEIGHT_BY_AREA != 0 {
            NormalWeighting::Area
        } else if flags & Self::WEIGHT_EQUAL != 0 {
            NormalWeighting::Equal
        } else {
            NormalWeighting::Angle
        };
        let winding = if flags & Self::WIND_CW != 0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        };
        Self { weighting, winding }
    }

    pub fn with_weighting(mut self, weighting: NormalWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_winding(mut self, winding: Winding) -> Self {
        self.winding = winding;
        self
    }
}

impl NormalWeighting {
    /// Weights for corners 0, 1 and 2 of a triangle, each computed from the
    /// two edges leaving that corner.
    fn corner_weights(self, p0: &Point3<f32>, p1: &Point3<f32>, p2: &Point3<f32>) -> [f32; 3] {
        match self {
            NormalWeighting::Equal => [1.0; 3],
            NormalWeighting::Angle => [
                corner_angle(&(p1 - p0), &(p2 - p0)),
                corner_angle(&(p2 - p1), &(p0 - p1)),
                corner_angle(&(p0 - p2), &(p1 - p2)),
            ],
            NormalWeighting::Area => [
                (p1 - p0).cross(&(p2 - p0)).norm(),
                (p2 - p1).cross(&(p0 - p1)).norm(),
                (p0 - p2).cross(&(p1 - p2)).norm(),
            ],
        }
    }
}

/// Angle in radians between two edges sharing a corner.
fn corner_angle(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    normalize_or_zero(a)
        .dot(&normalize_or_zero(b))
        .clamp(-1.0, 1.0)
        .acos()
}

/// Compute one unit normal per vertex into `normals`.
///
/// `positions` defines the vertex count; `normals` must be the same length.
/// Faces with a sentinel index are skipped. A vertex that no face references
/// gets the zero vector. On error `normals` is left untouched.
pub fn compute_normals<I: MeshIndex>(
    indices: &[I],
    positions: &[Point3<f32>],
    options: NormalOptions,
    normals: &mut [Vector3<f32>],
) -> MeshResult<()> {
    if indices.is_empty() {
        return Err(MeshError::InvalidArgument("index buffer is empty"));
    }
    if positions.is_empty() {
        return Err(MeshError::InvalidArgument("position buffer is empty"));
    }
    if normals.is_empty() {
        return Err(MeshError::InvalidArgument("normal output buffer is empty"));
    }

    let faces = face_count(indices)?;
    let vertex_count = positions.len();
    validate_counts::<I>(faces, vertex_count)?;
    expect_vertex_len(
        normals.len(),
        vertex_count,
        "normal output buffer length differs from vertex count",
    )?;

    log::trace!(
        "computing normals: {} faces, {} vertices, {:?}",
        faces,
        vertex_count,
        options
    );

    let mut accum = zeroed_scratch(vertex_count)?;

    let skipped = for_each_face(indices, vertex_count, |[i0, i1, i2]| {
        let (p0, p1, p2) = (&positions[i0], &positions[i1], &positions[i2]);

        let face_normal = normalize_or_zero(&(p1 - p0).cross(&(p2 - p0)));
        let [w0, w1, w2] = options.weighting.corner_weights(p0, p1, p2);

        accum[i0] += face_normal * w0;
        accum[i1] += face_normal * w1;
        accum[i2] += face_normal * w2;
    })?;

    match options.winding {
        Winding::CounterClockwise => {
            for (out, sum) in normals.iter_mut().zip(&accum) {
                *out = normalize_or_zero(sum);
            }
        }
        Winding::Clockwise => {
            for (out, sum) in normals.iter_mut().zip(&accum) {
                *out = -normalize_or_zero(sum);
            }
        }
    }

    log::debug!(
        "normals done: {} of {} faces skipped as placeholders",
        skipped,
        faces
    );

    Ok(())
}
