//! Dense vector helpers shared by the similarity maintainer and the ranker.

/// Norms below this are treated as zero to avoid blowing up on degenerate embeddings.
const MIN_NORM: f32 = 1e-12;

pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Unit-length copy of `v`. A zero vector stays zero.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n < MIN_NORM {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| x / n).collect()
}

pub fn normalize_in_place(v: &mut [f32]) {
    let n = norm(v);
    if n < MIN_NORM {
        v.iter_mut().for_each(|x| *x = 0.0);
        return;
    }
    v.iter_mut().for_each(|x| *x /= n);
}

/// Cosine similarity of two arbitrary vectors. Returns 0.0 when either is
/// zero-norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let na = norm(a);
    let nb = norm(b);
    if na < MIN_NORM || nb < MIN_NORM {
        return 0.0;
    }
    dot(a, b) / (na as f64 * nb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_unit_similarity() {
        let v = vec![0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn zero_vector_is_guarded() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn length_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn normalized_dot_equals_cosine() {
        let a = vec![3.0, 4.0, 0.0];
        let b = vec![1.0, 2.0, 2.0];
        let via_dot = dot(&normalize(&a), &normalize(&b));
        assert!((via_dot - cosine_similarity(&a, &b)).abs() < 1e-6);
    }

    #[test]
    fn normalize_in_place_yields_unit_norm() {
        let mut v = vec![2.0, 0.0, 0.0, 2.0];
        normalize_in_place(&mut v);
        assert!((norm(&v) - 1.0).abs() < 1e-6);
    }
}
