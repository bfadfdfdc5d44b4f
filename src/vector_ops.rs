use crate::config::Number;
use wide::f32x8;

/// Squared Euclidean distance between two vectors of equal length, computed
/// eight lanes at a time. Callers check lengths before calling.
pub fn squared_euclidean_simd(a: &[Number], b: &[Number]) -> Number {
    debug_assert_eq!(a.len(), b.len());

    let mut acc = f32x8::splat(0.0);

    let len = a.len().min(b.len());
    let simd_len = len - (len % 8);

    // SIMD loop
    for i in (0..simd_len).step_by(8) {
        let va = f32x8::new([
            a[i],
            a[i + 1],
            a[i + 2],
            a[i + 3],
            a[i + 4],
            a[i + 5],
            a[i + 6],
            a[i + 7],
        ]);
        let vb = f32x8::new([
            b[i],
            b[i + 1],
            b[i + 2],
            b[i + 3],
            b[i + 4],
            b[i + 5],
            b[i + 6],
            b[i + 7],
        ]);
        let diff = va - vb;
        acc += diff * diff;
    }

    let mut sum = acc.reduce_add();

    // Handle remaining elements
    for i in simd_len..len {
        let diff = a[i] - b[i];
        sum += diff * diff;
    }

    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(a: &[Number], b: &[Number]) -> Number {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v: Vec<Number> = (0..19).map(|i| i as Number * 0.5).collect();
        assert_eq!(squared_euclidean_simd(&v, &v), 0.0);
    }

    #[test]
    fn matches_scalar_with_tail() {
        let a: Vec<Number> = (0..21).map(|i| (i as Number).sin()).collect();
        let b: Vec<Number> = (0..21).map(|i| (i as Number).cos()).collect();
        let simd = squared_euclidean_simd(&a, &b);
        assert!((simd - scalar(&a, &b)).abs() < 1e-4);
    }

    #[test]
    fn short_vectors_use_scalar_path() {
        assert_eq!(squared_euclidean_simd(&[1.0, 0.0], &[0.0, 1.0]), 2.0);
        assert_eq!(squared_euclidean_simd(&[], &[]), 0.0);
    }
}
