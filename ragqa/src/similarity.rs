//! Cosine similarity between embedding vectors.

use tracing::debug;

use crate::error::{RagError, Result};

/// Score returned when either vector has zero magnitude.
///
/// Cosine similarity is undefined there; treating the pair as unrelated keeps
/// the ranking total and free of NaN.
pub const DEGENERATE_SIMILARITY: f32 = 0.0;

/// Compute the cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Sums are accumulated in `f64`, where the square of any finite `f32` is
/// representable, so neither very large nor very small components overflow
/// or vanish. The result is clamped to `[-1, 1]`. If either vector has zero
/// magnitude, or the ratio is not finite (e.g. an infinite component), the
/// result is [`DEGENERATE_SIMILARITY`].
///
/// # Errors
///
/// Returns [`RagError::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch { left: a.len(), right: b.len() });
    }

    let (dot, norm_a_sq, norm_b_sq) =
        a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |(dot, na, nb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, na + x * x, nb + y * y)
        });
    if norm_a_sq == 0.0 || norm_b_sq == 0.0 {
        debug!(dimensions = a.len(), "zero-magnitude vector, using degenerate similarity");
        return Ok(DEGENERATE_SIMILARITY);
    }

    let ratio = dot / (norm_a_sq.sqrt() * norm_b_sq.sqrt());
    if !ratio.is_finite() {
        debug!(dimensions = a.len(), "non-finite similarity, using degenerate similarity");
        return Ok(DEGENERATE_SIMILARITY);
    }

    Ok((ratio as f32).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn magnitude_does_not_matter() {
        let score = cosine_similarity(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_yields_sentinel() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), DEGENERATE_SIMILARITY);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]).unwrap(), DEGENERATE_SIMILARITY);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), DEGENERATE_SIMILARITY);
    }

    #[test]
    fn large_components_do_not_overflow() {
        let v = [1e20f32, 2e20];
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-6);
        let max = [f32::MAX, f32::MAX, -f32::MAX];
        assert!((cosine_similarity(&max, &max).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tiny_components_do_not_underflow() {
        let v = [1e-25f32, 2e-25];
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-6);
        let subnormal = [f32::from_bits(1), 0.0];
        assert!((cosine_similarity(&subnormal, &subnormal).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn infinite_component_yields_sentinel() {
        let score = cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 1.0]).unwrap();
        assert_eq!(score, DEGENERATE_SIMILARITY);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { left: 3, right: 2 }));
    }
}
