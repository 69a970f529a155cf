// Text embedder trait: the swap-ready abstraction.
//
// Scoring only ever talks to this trait. The default implementation runs a
// local ONNX sentence-embedding model; tests plug in deterministic fakes.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for turning text into dense vectors in a shared embedding space.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text. Default implementation wraps `embed_batch`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            anyhow::bail!("Embedder returned {} vectors for one text", vectors.len());
        }
        Ok(vectors.remove(0))
    }
}
