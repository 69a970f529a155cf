// Sentence embeddings: trait, local ONNX backend, lazy shared handle and
// model download.

pub mod download;
pub mod lazy;
pub mod onnx;
pub mod traits;

pub use lazy::LazyEmbedder;
pub use onnx::OnnxEmbedder;
pub use traits::TextEmbedder;

/// Scale a vector to unit length.
///
/// Returns the original vector when the norm is zero.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vec.to_vec()
    } else {
        vec.iter().map(|x| x / norm).collect()
    }
}

/// Dot product of two equal-length vectors. For unit vectors this is their
/// cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
