//! Per-vertex tangent frames for normal mapping.
//!
//! Each face solves for the object-space directions of increasing `u` and
//! `v` and adds them, unnormalized, to its three vertices. A second pass
//! Gram-Schmidt orthonormalizes the sums against the vertex normal, rebuilding
//! whichever direction collapsed.

use nalgebra::{Matrix2, Matrix2x3, Point3, Vector2, Vector3, Vector4};

use crate::error::{MeshError, MeshResult};
use crate::index::{expect_vertex_len, face_count, for_each_face, validate_counts, zeroed_scratch, MeshIndex};
use crate::math::normalize_or_zero;

/// Threshold for a collapsed UV determinant and for a collapsed frame axis.
pub const EPSILON: f32 = 1e-4;

/// Destination for per-vertex tangents.
#[derive(Debug)]
pub enum TangentOutput<'a> {
    /// Bare tangent direction.
    Xyz(&'a mut [Vector3<f32>]),
    /// Tangent direction with handedness (±1) in `w`.
    Xyzw(&'a mut [Vector4<f32>]),
}

impl TangentOutput<'_> {
    fn len(&self) -> usize {
        match self {
            TangentOutput::Xyz(out) => out.len(),
            TangentOutput::Xyzw(out) => out.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The outputs a tangent-frame pass should write. At least one must be set.
///
/// An empty slice counts as not requested.
#[derive(Debug, Default)]
pub struct TangentFrameTargets<'a> {
    pub tangents: Option<TangentOutput<'a>>,
    pub bitangents: Option<&'a mut [Vector3<f32>]>,
}

impl TangentFrameTargets<'_> {
    fn requested(self) -> Self {
        Self {
            tangents: self.tangents.filter(|t| !t.is_empty()),
            bitangents: self.bitangents.filter(|b| !b.is_empty()),
        }
    }

    fn is_empty(&self) -> bool {
        self.tangents.is_none() && self.bitangents.is_none()
    }
}

/// Tangents and/or bitangents as bare 3-vectors.
pub fn compute_tangent_frame<I: MeshIndex>(
    indices: &[I],
    positions: &[Point3<f32>],
    normals: &[Vector3<f32>],
    texcoords: &[Vector2<f32>],
    tangents: Option<&mut [Vector3<f32>]>,
    bitangents: Option<&mut [Vector3<f32>]>,
) -> MeshResult<()> {
    let targets = TangentFrameTargets {
        tangents: tangents.map(TangentOutput::Xyz),
        bitangents,
    };
    generate_tangent_frame(indices, positions, normals, texcoords, targets)
}

/// Tangents with handedness in `w`, and/or bitangents.
pub fn compute_tangent_frame_with_handedness<I: MeshIndex>(
    indices: &[I],
    positions: &[Point3<f32>],
    normals: &[Vector3<f32>],
    texcoords: &[Vector2<f32>],
    tangents: Option<&mut [Vector4<f32>]>,
    bitangents: Option<&mut [Vector3<f32>]>,
) -> MeshResult<()> {
    let targets = TangentFrameTargets {
        tangents: tangents.map(TangentOutput::Xyzw),
        bitangents,
    };
    generate_tangent_frame(indices, positions, normals, texcoords, targets)
}

/// Tangents with handedness in `w`; the bitangent is left for the shader to rebuild.
pub fn compute_tangents<I: MeshIndex>(
    indices: &[I],
    positions: &[Point3<f32>],
    normals: &[Vector3<f32>],
    texcoords: &[Vector2<f32>],
    tangents: &mut [Vector4<f32>],
) -> MeshResult<()> {
    let targets = TangentFrameTargets {
        tangents: Some(TangentOutput::Xyzw(tangents)),
        bitangents: None,
    };
    generate_tangent_frame(indices, positions, normals, texcoords, targets)
}

/// Shared implementation behind the `compute_tangent*` entry points.
///
/// `positions`, `normals`, `texcoords` and every requested output must all
/// hold one entry per vertex. Outputs not requested are never touched, and
/// nothing is written when the call fails.
pub fn generate_tangent_frame<I: MeshIndex>(
    indices: &[I],
    positions: &[Point3<f32>],
    normals: &[Vector3<f32>],
    texcoords: &[Vector2<f32>],
    targets: TangentFrameTargets<'_>,
) -> MeshResult<()> {
    let TangentFrameTargets {
        mut tangents,
        mut bitangents,
    } = match targets.requested() {
        t if t.is_empty() => {
            return Err(MeshError::InvalidArgument(
                "no tangent or bitangent output requested",
            ))
        }
        t => t,
    };

    if indices.is_empty() {
        return Err(MeshError::InvalidArgument("index buffer is empty"));
    }
    if positions.is_empty() {
        return Err(MeshError::InvalidArgument("position buffer is empty"));
    }
    if normals.is_empty() {
        return Err(MeshError::InvalidArgument("normal buffer is empty"));
    }
    if texcoords.is_empty() {
        return Err(MeshError::InvalidArgument("texture coordinate buffer is empty"));
    }

    let faces = face_count(indices)?;
    let vertex_count = positions.len();
    validate_counts::<I>(faces, vertex_count)?;

    expect_vertex_len(normals.len(), vertex_count, "normal buffer length differs from vertex count")?;
    expect_vertex_len(
        texcoords.len(),
        vertex_count,
        "texture coordinate buffer length differs from vertex count",
    )?;
    if let Some(out) = &tangents {
        expect_vertex_len(out.len(), vertex_count, "tangent output length differs from vertex count")?;
    }
    if let Some(out) = &bitangents {
        expect_vertex_len(out.len(), vertex_count, "bitangent output length differs from vertex count")?;
    }

    log::trace!(
        "computing tangent frame: {} faces, {} vertices",
        faces,
        vertex_count
    );

    let mut sum_u = zeroed_scratch(vertex_count)?;
    let mut sum_v = zeroed_scratch(vertex_count)?;
    let mut flat_uv_faces = 0usize;

    let skipped = for_each_face(indices, vertex_count, |[i0, i1, i2]| {
        let (tangent, bitangent, flat) = face_directions(
            [&positions[i0], &positions[i1], &positions[i2]],
            [texcoords[i0], texcoords[i1], texcoords[i2]],
        );
        if flat {
            flat_uv_faces += 1;
        }

        for i in [i0, i1, i2] {
            sum_u[i] += tangent;
            sum_v[i] += bitangent;
        }
    })?;

    let mut recovered = 0usize;

    for j in 0..vertex_count {
        let frame = orthonormalize(&normals[j], &sum_u[j], &sum_v[j]);
        if frame.recovered {
            recovered += 1;
        }

        match tangents.as_mut() {
            Some(TangentOutput::Xyz(out)) => out[j] = frame.tangent,
            Some(TangentOutput::Xyzw(out)) => {
                let t = frame.tangent;
                out[j] = Vector4::new(t.x, t.y, t.z, frame.handedness);
            }
            None => {}
        }
        if let Some(out) = bitangents.as_mut() {
            out[j] = frame.bitangent;
        }
    }

    log::debug!(
        "tangent frame done: {} faces skipped, {} with collapsed UVs, {} of {} vertices rebuilt",
        skipped,
        flat_uv_faces,
        recovered,
        vertex_count
    );

    Ok(())
}

/// Object-space directions of increasing `u` and `v` across one face.
///
/// Solves `[duv1; duv2] * [T; B] = [e1; e2]` for the rows `T` and `B`. A
/// determinant within [`EPSILON`] of zero is replaced by 1, so the result is
/// the adjugate product; the third value reports that substitution.
fn face_directions(p: [&Point3<f32>; 3], uv: [Vector2<f32>; 3]) -> (Vector3<f32>, Vector3<f32>, bool) {
    let d1 = uv[1] - uv[0];
    let d2 = uv[2] - uv[0];

    let det = Matrix2::new(d1.x, d1.y, d2.x, d2.y).determinant();
    let flat = det.abs() <= EPSILON;
    let scale = if flat { 1.0 } else { 1.0 / det };

    let adjugate = Matrix2::new(d2.y, -d1.y, -d2.x, d1.x);
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let edges = Matrix2x3::from_rows(&[e1.transpose(), e2.transpose()]);

    let solved = adjugate * edges * scale;
    (
        solved.row(0).transpose(),
        solved.row(1).transpose(),
        flat,
    )
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    tangent: Vector3<f32>,
    bitangent: Vector3<f32>,
    handedness: f32,
    recovered: bool,
}

/// Gram-Schmidt the accumulated directions against `normal`.
fn orthonormalize(normal: &Vector3<f32>, sum_u: &Vector3<f32>, sum_v: &Vector3<f32>) -> Frame {
    let b0 = normalize_or_zero(normal);

    let mut b1 = normalize_or_zero(&(sum_u - b0 * b0.dot(sum_u)));
    let mut b2 = normalize_or_zero(&(sum_v - b0 * b0.dot(sum_v) - b1 * b1.dot(sum_v)));

    let len1 = b1.norm();
    let len2 = b2.norm();
    let recovered = len1 <= EPSILON || len2 <= EPSILON;

    if recovered {
        if len1 > 0.5 {
            b2 = b0.cross(&b1);
        } else if len2 > 0.5 {
            b1 = b2.cross(&b0);
        } else {
            let axis = least_aligned_axis(&b0);
            b1 = normalize_or_zero(&b0.cross(&axis));
            b2 = b0.cross(&b1);
        }
    }

    let handedness = if b0.cross(sum_u).dot(sum_v) < 0.0 { -1.0 } else { 1.0 };

    Frame {
        tangent: b1,
        bitangent: b2,
        handedness,
        recovered,
    }
}

/// The world axis with the smallest absolute dot product against `n`.
///
/// Ties resolve as: x only when strictly smaller than both y and z, then y
/// when strictly smaller than z, otherwise z.
fn least_aligned_axis(n: &Vector3<f32>) -> Vector3<f32> {
    let (d0, d1, d2) = (n.x.abs(), n.y.abs(), n.z.abs());
    if d0 < d1 {
        if d0 < d2 {
            Vector3::x()
        } else {
            Vector3::z()
        }
    } else if d1 < d2 {
        Vector3::y()
    } else {
        Vector3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn approx_eq(a: &Vector3<f32>, b: &Vector3<f32>) -> bool {
        (a - b).norm() < 1e-5
    }

    fn quad() -> ([u16; 6], [Point3<f32>; 4], [Vector3<f32>; 4], [Vector2<f32>; 4]) {
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let texcoords = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ];
        ([0, 1, 2, 0, 2, 3], positions, [Vector3::z(); 4], texcoords)
    }

    #[test]
    fn test_face_directions_follow_uv_axes() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        ];
        let uv = [Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)];
        let (t, b, flat) = face_directions([&p[0], &p[1], &p[2]], uv);
        assert!(!flat);
        assert!(approx_eq(&t, &Vector3::new(2.0, 0.0, 0.0)));
        assert!(approx_eq(&b, &Vector3::new(0.0, 4.0, 0.0)));
    }

    #[test]
    fn test_face_directions_collapsed_uvs() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let uv = [Vector2::new(0.5, 0.5); 3];
        let (t, b, flat) = face_directions([&p[0], &p[1], &p[2]], uv);
        assert!(flat);
        assert_eq!(t, Vector3::zeros());
        assert_eq!(b, Vector3::zeros());
    }

    #[test]
    fn test_least_aligned_axis() {
        assert_eq!(least_aligned_axis(&Vector3::x()), Vector3::z());
        assert_eq!(least_aligned_axis(&Vector3::y()), Vector3::z());
        assert_eq!(least_aligned_axis(&Vector3::z()), Vector3::y());
        assert_eq!(least_aligned_axis(&Vector3::new(0.1, 0.9, 0.5)), Vector3::x());
        // All three tie on the diagonal.
        let diagonal = Vector3::new(1.0, 1.0, 1.0).normalize();
        assert_eq!(least_aligned_axis(&diagonal), Vector3::z());
    }

    #[test]
    fn test_orthonormalize_rebuilds_missing_bitangent() {
        let frame = orthonormalize(&Vector3::z(), &Vector3::new(3.0, 0.0, 1.0), &Vector3::zeros());
        assert!(frame.recovered);
        assert!(approx_eq(&frame.tangent, &Vector3::x()));
        assert!(approx_eq(&frame.bitangent, &Vector3::y()));
    }

    #[test]
    fn test_orthonormalize_rebuilds_missing_tangent() {
        let frame = orthonormalize(&Vector3::z(), &Vector3::zeros(), &Vector3::new(0.0, 2.0, 0.0));
        assert!(frame.recovered);
        assert!(approx_eq(&frame.tangent, &Vector3::x()));
        assert!(approx_eq(&frame.bitangent, &Vector3::y()));
    }

    #[test]
    fn test_orthonormalize_tilted_normal_stays_unit() {
        let normal = Vector3::new(0.2, 0.3, 0.9);
        let frame = orthonormalize(&normal, &Vector3::zeros(), &Vector3::zeros());
        let n = normal.normalize();
        assert!((frame.tangent.norm() - 1.0).abs() < 1e-5);
        assert!((frame.bitangent.norm() - 1.0).abs() < 1e-5);
        assert!(frame.tangent.dot(&n).abs() < 1e-5);
        assert!(frame.bitangent.dot(&n).abs() < 1e-5);
    }

    #[test]
    fn test_handedness_flips_with_mirrored_uvs() {
        let (indices, positions, normals, mut texcoords) = quad();
        let mut tangents = [Vector4::zeros(); 4];
        compute_tangents(&indices, &positions, &normals, &texcoords, &mut tangents).unwrap();
        assert!(tangents.iter().all(|t| t.w == 1.0));

        for uv in texcoords.iter_mut() {
            uv.y = 1.0 - uv.y;
        }
        compute_tangents(&indices, &positions, &normals, &texcoords, &mut tangents).unwrap();
        assert!(tangents.iter().all(|t| t.w == -1.0));
    }

    #[test]
    fn test_only_requested_outputs_are_written() {
        let (indices, positions, normals, texcoords) = quad();
        let marker = Vector3::new(7.0, 7.0, 7.0);
        let mut tangents = [marker; 4];
        let mut bitangents = [marker; 4];

        compute_tangent_frame(&indices, &positions, &normals, &texcoords, None, Some(&mut bitangents[..])).unwrap();
        assert!(tangents.iter().all(|t| *t == marker));
        assert!(bitangents.iter().all(|b| approx_eq(b, &Vector3::y())));

        compute_tangent_frame(&indices, &positions, &normals, &texcoords, Some(&mut tangents[..]), None).unwrap();
        assert!(tangents.iter().all(|t| approx_eq(t, &Vector3::x())));
    }

    #[test]
    fn test_no_outputs_is_rejected() {
        let (indices, positions, normals, texcoords) = quad();
        let err = compute_tangent_frame(&indices, &positions, &normals, &texcoords, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut empty: [Vector3<f32>; 0] = [];
        let err = compute_tangent_frame(&indices, &positions, &normals, &texcoords, Some(&mut empty[..]), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_mismatched_texcoords_are_rejected() {
        let (indices, positions, normals, texcoords) = quad();
        let mut tangents = [Vector4::zeros(); 4];
        let err = compute_tangents(&indices, &positions, &normals, &texcoords[..3], &mut tangents).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(tangents.iter().all(|t| *t == Vector4::zeros()));
    }
}
