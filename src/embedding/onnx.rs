// Local ONNX sentence embedder using BAAI's bge-small-en-v1.5.
//
// BGE is a BERT encoder trained for asymmetric retrieval: passages are
// embedded as-is and queries carry an instruction prefix (see
// scoring::QUERY_INSTRUCTION). Sentence vectors are the hidden state of the
// [CLS] token, L2-normalized, so cosine similarity is a plain dot product.
//
// The model runs on the local CPU; no API calls and no rate limits.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::TextEmbedder;
use super::l2_normalize;

/// Longest token sequence the BERT position embeddings support.
pub const MAX_SEQUENCE_LEN: usize = 512;

/// BERT [PAD] token id.
const PAD_TOKEN_ID: i64 = 0;

/// Sentence embedder backed by a local ONNX model. Converts text into dense
/// L2-normalized vectors suitable for cosine similarity.
pub struct OnnxEmbedder {
    // ort::Session::run takes &mut self, and spawn_blocking needs 'static
    // handles, hence Arc<Mutex<_>>.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxEmbedder {
    /// Load the embedding model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Call `download::download_model()` first if they don't exist.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(super::download::MODEL_FILE);
        let tokenizer_path = model_dir.join(super::download::TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `creator-match download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `creator-match download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;
        // Padding is done by hand below; a padding config baked into
        // tokenizer.json would only inflate every sequence.
        tokenizer.with_padding(None);

        debug!(
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl TextEmbedder for OnnxEmbedder {
    /// One forward pass over the whole batch. Tokenization and inference are
    /// CPU-bound, so they run under spawn_blocking.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || embed_sync(&session, &tokenizer, &texts))
            .await
            .context("spawn_blocking panicked")?
    }
}

/// Synchronous embedding: tokenization, inference and CLS pooling.
fn embed_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let encodings: Vec<_> = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        anyhow::bail!("Tokenizer produced no tokens (missing special tokens in tokenizer.json?)");
    }

    let inputs = PaddedBatch::build(
        encodings
            .iter()
            .map(|enc| (enc.get_ids(), enc.get_attention_mask())),
        max_len,
    );

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor = Tensor::from_array((shape, inputs.input_ids))
        .context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, inputs.attention_mask))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, inputs.token_type_ids))
        .context("Failed to create token_type_ids tensor")?;

    // Output 0 is last_hidden_state: [batch, seq_len, hidden]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    let embeddings = cls_pool(&hidden_states, batch_size, max_len)?;

    debug!(
        batch_size,
        dim = embeddings.first().map(Vec::len).unwrap_or(0),
        "Computed sentence embeddings"
    );

    Ok(embeddings)
}

/// Right-padded, flattened model inputs. Shape: [batch_size, max_len].
#[derive(Debug, PartialEq)]
struct PaddedBatch {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl PaddedBatch {
    fn build<'a>(rows: impl Iterator<Item = (&'a [u32], &'a [u32])>, max_len: usize) -> Self {
        let mut batch = PaddedBatch {
            input_ids: Vec::new(),
            attention_mask: Vec::new(),
            token_type_ids: Vec::new(),
        };

        for (ids, mask) in rows {
            let pad_len = max_len - ids.len();

            batch.input_ids.extend(ids.iter().map(|&id| id as i64));
            batch.input_ids.extend(std::iter::repeat_n(PAD_TOKEN_ID, pad_len));

            batch.attention_mask.extend(mask.iter().map(|&m| m as i64));
            batch.attention_mask.extend(std::iter::repeat_n(0i64, pad_len));

            // Single-segment input: all zeros
            batch.token_type_ids.extend(std::iter::repeat_n(0i64, max_len));
        }

        batch
    }
}

/// Take the [CLS] (first token) hidden state of every sequence and
/// L2-normalize it.
fn cls_pool(hidden_states: &[f32], batch_size: usize, max_len: usize) -> Result<Vec<Vec<f32>>> {
    let tokens = batch_size * max_len;
    if tokens == 0 || hidden_states.is_empty() || hidden_states.len() % tokens != 0 {
        anyhow::bail!(
            "Unexpected embedding output size {} for batch {}x{}",
            hidden_states.len(),
            batch_size,
            max_len
        );
    }
    let dim = hidden_states.len() / tokens;

    Ok((0..batch_size)
        .map(|i| {
            let offset = i * max_len * dim;
            l2_normalize(&hidden_states[offset..offset + dim])
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_batch_right_pads_to_max_len() {
        let a_ids = [101u32, 7, 102];
        let a_mask = [1u32, 1, 1];
        let b_ids = [101u32, 102];
        let b_mask = [1u32, 1];

        let batch = PaddedBatch::build(
            vec![(&a_ids[..], &a_mask[..]), (&b_ids[..], &b_mask[..])].into_iter(),
            3,
        );

        assert_eq!(batch.input_ids, vec![101, 7, 102, 101, 102, 0]);
        assert_eq!(batch.attention_mask, vec![1, 1, 1, 1, 1, 0]);
        assert_eq!(batch.token_type_ids, vec![0; 6]);
    }

    #[test]
    fn test_cls_pool_takes_first_token_and_normalizes() {
        // batch 2, seq 2, dim 2
        let hidden = vec![
            3.0, 4.0, 9.0, 9.0, // sequence 0: CLS = [3, 4]
            0.0, 2.0, 5.0, 5.0, // sequence 1: CLS = [0, 2]
        ];
        let pooled = cls_pool(&hidden, 2, 2).unwrap();
        assert_eq!(pooled.len(), 2);
        assert!((pooled[0][0] - 0.6).abs() < 1e-6);
        assert!((pooled[0][1] - 0.8).abs() < 1e-6);
        assert!((pooled[1][0]).abs() < 1e-6);
        assert!((pooled[1][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cls_pool_rejects_misshapen_output() {
        assert!(cls_pool(&[1.0, 2.0, 3.0], 2, 1).is_err());
        assert!(cls_pool(&[], 1, 1).is_err());
    }

    #[test]
    fn test_load_fails_without_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxEmbedder::load(dir.path()).err().unwrap();
        assert!(err.to_string().contains("download-model"));
    }
}
