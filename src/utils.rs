use crate::types::Position;
use cgmath::{InnerSpace, Zero};

/// Arithmetic mean of a set of vectors; `None` for an empty set.
pub(crate) fn __mean_vector(vectors: &[Position]) -> Option<Position> {
    if vectors.is_empty() {
        return None;
    }
    let sum = vectors.iter().fold(Position::zero(), |acc, &v| acc + v);
    Some(sum / vectors.len() as f64)
}

/// Cosine of the angle between `a` and `b`, clamped to [-1, 1].
/// `None` when either vector has no direction.
///
/// Divides by `sqrt(|a|² |b|²)` so that identical inputs give exactly 1.0.
pub(crate) fn __cosine(a: Position, b: Position) -> Option<f64> {
    let denominator = (a.magnitude2() * b.magnitude2()).sqrt();
    if !denominator.is_finite() || denominator <= 0.0 {
        return None;
    }
    Some((a.dot(b) / denominator).clamp(-1.0, 1.0))
}
