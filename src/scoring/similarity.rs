// Brief-to-bio similarity scoring.
//
// Bios are embedded as passages in one batch, the brief is embedded once as a
// retrieval query, and every creator gets the cosine similarity between the
// two. Either every record is scored or the call fails; there are no partial
// results.

use tracing::{debug, info};

use super::{ScoredCreator, ScoredDataset};
use crate::dataset::CreatorDataset;
use crate::embedding::{dot, l2_normalize, TextEmbedder};
use crate::error::MatchError;

/// Instruction the embedding model expects in front of retrieval queries.
/// Passages (bios) are embedded without it.
pub const QUERY_INSTRUCTION: &str = "Represent this sentence for searching relevant passages: ";

/// Trim a brief and reject it if nothing is left.
pub fn normalize_brief(brief: &str) -> Result<&str, MatchError> {
    let trimmed = brief.trim();
    if trimmed.is_empty() {
        Err(MatchError::EmptyBrief)
    } else {
        Ok(trimmed)
    }
}

/// The text actually embedded for a brief.
pub fn query_text(brief: &str) -> String {
    format!("{QUERY_INSTRUCTION}{brief}")
}

/// Score every creator in `dataset` against `brief`.
///
/// The brief is trimmed first. An empty dataset yields an empty result
/// without calling the embedder.
pub async fn score(
    dataset: &CreatorDataset,
    brief: &str,
    embedder: &dyn TextEmbedder,
) -> Result<ScoredDataset, MatchError> {
    let brief = normalize_brief(brief)?;

    if dataset.is_empty() {
        debug!("Empty dataset, nothing to score");
        return Ok(ScoredDataset::new(dataset.schema().clone(), Vec::new()));
    }

    let bios = dataset.bios();
    let bio_vectors = embedder
        .embed_batch(&bios)
        .await
        .map_err(|e| MatchError::EmbeddingFailure(format!("{e:#}")))?;

    if bio_vectors.len() != bios.len() {
        return Err(MatchError::EmbeddingFailure(format!(
            "expected {} bio embeddings, got {}",
            bios.len(),
            bio_vectors.len()
        )));
    }

    let query_vector = embedder
        .embed(&query_text(brief))
        .await
        .map_err(|e| MatchError::EmbeddingFailure(format!("{e:#}")))?;
    let query_vector = l2_normalize(&query_vector);

    if query_vector.is_empty() {
        return Err(MatchError::EmbeddingFailure(
            "brief embedding is empty".to_string(),
        ));
    }
    ensure_finite(&query_vector, "brief embedding")?;

    let mut scores = Vec::with_capacity(bio_vectors.len());
    for (i, bio_vector) in bio_vectors.iter().enumerate() {
        if bio_vector.len() != query_vector.len() {
            return Err(MatchError::EmbeddingFailure(format!(
                "bio embedding {i} has dimension {}, brief has {}",
                bio_vector.len(),
                query_vector.len()
            )));
        }
        ensure_finite(bio_vector, &format!("bio embedding {i}"))?;
        let similarity = dot(&query_vector, &l2_normalize(bio_vector));
        scores.push(similarity.clamp(-1.0, 1.0));
    }

    let creators: Vec<ScoredCreator> = dataset
        .records()
        .iter()
        .cloned()
        .zip(scores)
        .map(|(record, similarity_score)| ScoredCreator {
            record,
            similarity_score,
        })
        .collect();

    info!(
        creators = creators.len(),
        dim = query_vector.len(),
        "Scored creators against brief"
    );

    Ok(ScoredDataset::new(dataset.schema().clone(), creators))
}

/// NaN or infinite components would survive normalization and clamping.
fn ensure_finite(vector: &[f32], what: &str) -> Result<(), MatchError> {
    if vector.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(MatchError::EmbeddingFailure(format!(
            "{what} contains non-finite values"
        )))
    }
}
