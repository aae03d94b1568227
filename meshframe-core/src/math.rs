use nalgebra::Vector3;

/// Unit vector along `v`, or the zero vector when `v` has no length.
#[inline]
pub(crate) fn normalize_or_zero(v: &Vector3<f32>) -> Vector3<f32> {
    let len = v.norm();
    if len > 0.0 {
        v / len
    } else {
        Vector3::zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_or_zero() {
        let n = normalize_or_zero(&Vector3::new(3.0, 0.0, 4.0));
        assert!((n - Vector3::new(0.6, 0.0, 0.8)).norm() < 1e-6);
        assert_eq!(normalize_or_zero(&Vector3::zeros()), Vector3::zeros());
    }
}
