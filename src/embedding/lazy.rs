// Lazily-initialized shared embedder.
//
// Loading a model is expensive, so it happens once, on first use, and the
// instance is then shared read-only for the rest of the process. The handle is
// constructed explicitly and passed to whoever scores; there is no global.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use super::traits::TextEmbedder;

type Loader = dyn Fn() -> Result<Arc<dyn TextEmbedder>> + Send + Sync;

/// An embedder that builds its inner model the first time it is asked to
/// embed. A failed load is returned to the caller and attempted again on the
/// next call; a successful one is kept for good.
pub struct LazyEmbedder {
    loader: Box<Loader>,
    inner: OnceCell<Arc<dyn TextEmbedder>>,
}

impl LazyEmbedder {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TextEmbedder>> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            inner: OnceCell::new(),
        }
    }

    /// Whether the inner model has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.inner.initialized()
    }

    async fn get(&self) -> Result<&Arc<dyn TextEmbedder>> {
        self.inner
            .get_or_try_init(|| async {
                let embedder = (self.loader)()?;
                info!("Embedding model initialized");
                Ok::<_, anyhow::Error>(embedder)
            })
            .await
    }
}

#[async_trait]
impl TextEmbedder for LazyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.get().await?.embed_batch(texts).await
    }
}
