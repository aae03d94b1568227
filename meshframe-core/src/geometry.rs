//! Owned indexed meshes and a few builders for them

use nalgebra::{Point3, Vector2, Vector3, Vector4};

use crate::error::{MeshError, MeshResult};
use crate::index::MeshIndex;
use crate::normals::{compute_normals, NormalOptions};
use crate::tangents::compute_tangent_frame_with_handedness;

/// A triangle mesh with per-vertex attributes held in parallel vectors
///
/// Vertices are never welded: every `push_vertex` adds a new slot. The
/// derived attributes (`normals`, `tangents`, `bitangents`) are empty until
/// the matching `compute_*` method succeeds.
#[derive(Debug, Clone)]
pub struct IndexedMesh<I: MeshIndex = u32> {
    pub positions: Vec<Point3<f32>>,
    pub texcoords: Vec<Vector2<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub tangents: Vec<Vector4<f32>>,
    pub bitangents: Vec<Vector3<f32>>,
    pub indices: Vec<I>,
}

impl<I: MeshIndex> IndexedMesh<I> {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_capacity),
            texcoords: Vec::with_capacity(vertex_capacity),
            normals: Vec::new(),
            tangents: Vec::new(),
            bitangents: Vec::new(),
            indices: Vec::with_capacity(index_capacity),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append a vertex and return its index
    pub fn push_vertex(&mut self, position: Point3<f32>, texcoord: Vector2<f32>) -> MeshResult<I> {
        let count = self.positions.len() + 1;
        let index = I::from_usize(count - 1)
            .filter(|_| count < I::LIMIT)
            .ok_or(MeshError::VertexCountTooLarge {
                vertex_count: count,
                limit: I::LIMIT,
            })?;
        self.positions.push(position);
        self.texcoords.push(texcoord);
        Ok(index)
    }

    pub fn push_triangle(&mut self, a: I, b: I, c: I) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Fill `normals` from the current positions and indices
    pub fn compute_normals(&mut self, options: NormalOptions) -> MeshResult<()> {
        let mut normals = vec![Vector3::zeros(); self.positions.len()];
        compute_normals(&self.indices, &self.positions, options, &mut normals)?;
        self.normals = normals;
        Ok(())
    }

    /// Fill `tangents` (with handedness) and `bitangents`
    ///
    /// Needs `normals` and `texcoords` for every vertex.
    pub fn compute_tangent_frame(&mut self) -> MeshResult<()> {
        let mut tangents = vec![Vector4::zeros(); self.positions.len()];
        let mut bitangents = vec![Vector3::zeros(); self.positions.len()];
        compute_tangent_frame_with_handedness(
            &self.indices,
            &self.positions,
            &self.normals,
            &self.texcoords,
            Some(tangents.as_mut_slice()),
            Some(bitangents.as_mut_slice()),
        )?;
        self.tangents = tangents;
        self.bitangents = bitangents;
        Ok(())
    }

    /// Add one square face as four vertices and two counter-clockwise triangles
    ///
    /// `u` and `v` are half-extent vectors; the face points along `u x v`.
    fn push_face(&mut self, center: Vector3<f32>, u: Vector3<f32>, v: Vector3<f32>) -> MeshResult<()> {
        let corners = [
            (center - u - v, Vector2::new(0.0, 0.0)),
            (center + u - v, Vector2::new(1.0, 0.0)),
            (center + u + v, Vector2::new(1.0, 1.0)),
            (center - u + v, Vector2::new(0.0, 1.0)),
        ];

        let mut ids = Vec::with_capacity(4);
        for (position, uv) in corners {
            ids.push(self.push_vertex(Point3::from(position), uv)?);
        }
        self.push_triangle(ids[0], ids[1], ids[2]);
        self.push_triangle(ids[0], ids[2], ids[3]);
        Ok(())
    }

    /// Square in the XY plane facing +Z, UVs spanning 0..1
    pub fn quad(size: f32) -> Self {
        let half = size / 2.0;
        let mut mesh = Self::with_capacity(4, 6);
        // Four vertices always fit any index width.
        let _ = mesh.push_face(
            Vector3::zeros(),
            Vector3::new(half, 0.0, 0.0),
            Vector3::new(0.0, half, 0.0),
        );
        mesh
    }

    /// Axis-aligned cube with 4 unshared vertices per face and per-face UVs
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let x = Vector3::new(half, 0.0, 0.0);
        let y = Vector3::new(0.0, half, 0.0);
        let z = Vector3::new(0.0, 0.0, half);

        let faces = [
            // Front, back
            (z, x, y),
            (-z, -x, y),
            // Top, bottom
            (y, x, -z),
            (-y, x, z),
            // Right, left
            (x, -z, y),
            (-x, z, y),
        ];

        let mut mesh = Self::with_capacity(24, 36);
        for (center, u, v) in faces {
            let _ = mesh.push_face(center, u, v);
        }
        mesh
    }

    /// Flat disc in the XY plane: a center vertex plus `segments` rim vertices
    ///
    /// UVs are a planar projection of the disc onto 0..1.
    pub fn fan(segments: usize, radius: f32) -> MeshResult<Self> {
        if segments < 3 {
            return Err(MeshError::InvalidArgument("a fan needs at least three segments"));
        }

        let mut mesh = Self::with_capacity(segments + 1, segments * 3);
        let center = mesh.push_vertex(Point3::origin(), Vector2::new(0.5, 0.5))?;

        let mut rim = Vec::with_capacity(segments);
        for k in 0..segments {
            let theta = std::f32::consts::TAU * k as f32 / segments as f32;
            let (s, c) = theta.sin_cos();
            rim.push(mesh.push_vertex(
                Point3::new(radius * c, radius * s, 0.0),
                Vector2::new(0.5 + 0.5 * c, 0.5 + 0.5 * s),
            )?);
        }
        for k in 0..segments {
            mesh.push_triangle(center, rim[k], rim[(k + 1) % segments]);
        }

        Ok(mesh)
    }
}

impl<I: MeshIndex> Default for IndexedMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}
