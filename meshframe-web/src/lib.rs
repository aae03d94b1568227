//! Meshframe Web - WASM bindings over flat typed arrays
//!
//! JavaScript import code hands over `Uint16Array`/`Uint32Array` index
//! buffers and interleaved `Float32Array` attributes (3 floats per position
//! or normal, 2 per texcoord) and gets flat `Float32Array` results back.

use meshframe_core::{compute_normals, compute_tangents, MeshError, MeshIndex, MeshResult, NormalOptions};
use nalgebra::{Point3, Vector2, Vector3, Vector4};
use wasm_bindgen::prelude::*;

fn to_js(err: MeshError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn unflatten3(flat: &[f32], what: &'static str) -> MeshResult<Vec<Vector3<f32>>> {
    if flat.len() % 3 != 0 {
        return Err(MeshError::InvalidArgument(what));
    }
    Ok(flat
        .chunks_exact(3)
        .map(|c| Vector3::new(c[0], c[1], c[2]))
        .collect())
}

fn unflatten2(flat: &[f32], what: &'static str) -> MeshResult<Vec<Vector2<f32>>> {
    if flat.len() % 2 != 0 {
        return Err(MeshError::InvalidArgument(what));
    }
    Ok(flat.chunks_exact(2).map(|c| Vector2::new(c[0], c[1])).collect())
}

fn points(flat: &[f32]) -> MeshResult<Vec<Point3<f32>>> {
    let coords = unflatten3(flat, "position array length is not a multiple of three")?;
    Ok(coords.into_iter().map(Point3::from).collect())
}

fn normals_flat<I: MeshIndex>(indices: &[I], positions: &[f32], flags: u32) -> MeshResult<Vec<f32>> {
    let positions = points(positions)?;
    let mut normals = vec![Vector3::zeros(); positions.len()];
    compute_normals(indices, &positions, NormalOptions::from_flags(flags), &mut normals)?;
    Ok(normals.iter().flat_map(|n| [n.x, n.y, n.z]).collect())
}

fn tangents_flat<I: MeshIndex>(
    indices: &[I],
    positions: &[f32],
    normals: &[f32],
    texcoords: &[f32],
) -> MeshResult<Vec<f32>> {
    let positions = points(positions)?;
    let normals = unflatten3(normals, "normal array length is not a multiple of three")?;
    let texcoords = unflatten2(texcoords, "texcoord array length is not a multiple of two")?;
    let mut tangents = vec![Vector4::zeros(); positions.len()];
    compute_tangents(indices, &positions, &normals, &texcoords, &mut tangents)?;
    Ok(tangents.iter().flat_map(|t| [t.x, t.y, t.z, t.w]).collect())
}

/// Per-vertex normals for a 16-bit index buffer.
///
/// `flags`: 0x1 area weighting, 0x2 equal weighting, 0x4 clockwise winding.
#[wasm_bindgen(js_name = computeNormals16)]
pub fn compute_normals_16(indices: &[u16], positions: &[f32], flags: u32) -> Result<Vec<f32>, JsValue> {
    normals_flat(indices, positions, flags).map_err(to_js)
}

#[wasm_bindgen(js_name = computeNormals32)]
pub fn compute_normals_32(indices: &[u32], positions: &[f32], flags: u32) -> Result<Vec<f32>, JsValue> {
    normals_flat(indices, positions, flags).map_err(to_js)
}

/// Per-vertex tangents (xyz + handedness) for a 16-bit index buffer.
#[wasm_bindgen(js_name = computeTangents16)]
pub fn compute_tangents_16(
    indices: &[u16],
    positions: &[f32],
    normals: &[f32],
    texcoords: &[f32],
) -> Result<Vec<f32>, JsValue> {
    tangents_flat(indices, positions, normals, texcoords).map_err(to_js)
}

#[wasm_bindgen(js_name = computeTangents32)]
pub fn compute_tangents_32(
    indices: &[u32],
    positions: &[f32],
    normals: &[f32],
    texcoords: &[f32],
) -> Result<Vec<f32>, JsValue> {
    tangents_flat(indices, positions, normals, texcoords).map_err(to_js)
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    // A logger may already be installed by the embedding page.
    let _ = console_log::init_with_level(log::Level::Warn);
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_POSITIONS: [f32; 12] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

    #[test]
    fn test_normals_flat() {
        let normals = normals_flat(&QUAD_INDICES, &QUAD_POSITIONS, 0).unwrap();
        assert_eq!(normals.len(), 12);
        for n in normals.chunks_exact(3) {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }

        let flipped = normals_flat(&QUAD_INDICES, &QUAD_POSITIONS, NormalOptions::WIND_CW).unwrap();
        assert!(flipped.chunks_exact(3).all(|n| (n[2] + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_tangents_flat() {
        let normals = normals_flat(&QUAD_INDICES, &QUAD_POSITIONS, 0).unwrap();
        let texcoords = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let tangents = tangents_flat(&QUAD_INDICES, &QUAD_POSITIONS, &normals, &texcoords).unwrap();
        assert_eq!(tangents.len(), 16);
        for t in tangents.chunks_exact(4) {
            assert!((t[0] - 1.0).abs() < 1e-6);
            assert_eq!(t[3], 1.0);
        }
    }

    #[test]
    fn test_ragged_arrays_are_rejected() {
        assert!(normals_flat(&QUAD_INDICES, &QUAD_POSITIONS[..11], 0).is_err());
        let err = tangents_flat(&QUAD_INDICES, &QUAD_POSITIONS, &[0.0; 12], &[0.0; 7]).unwrap_err();
        assert!(matches!(err, MeshError::InvalidArgument(_)));
    }
}
