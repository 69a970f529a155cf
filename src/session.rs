// Interactive matching session.
//
// Owns everything one user interaction loop needs: the current upload, the
// shared embedder, the last-result cache and the active filter. Each call is
// one user action and runs to completion before the next.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{fingerprint, CacheEntry, CacheKey, ResultCache};
use crate::dataset::{load_dataset, CreatorDataset};
use crate::embedding::TextEmbedder;
use crate::error::MatchError;
use crate::scoring::{self, MatchFilter, ScoredCreator, ScoredDataset};

/// A validated upload and the fingerprint of its raw bytes.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub fingerprint: String,
    pub dataset: CreatorDataset,
}

/// Result of evaluating a brief.
#[derive(Debug)]
pub struct Evaluation<'a> {
    pub scored: &'a ScoredDataset,
    /// True when the result came from the cache rather than a fresh scoring pass.
    pub cached: bool,
}

pub struct MatchSession {
    embedder: Arc<dyn TextEmbedder>,
    upload: Option<Upload>,
    cache: ResultCache,
    pub filter: MatchFilter,
}

impl MatchSession {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            upload: None,
            cache: ResultCache::new(),
            filter: MatchFilter::default(),
        }
    }

    /// Load and validate a new upload. The previous upload stays current if
    /// this one fails.
    pub fn upload(&mut self, bytes: &[u8], filename: &str) -> Result<&Upload, MatchError> {
        let dataset = load_dataset(bytes, filename)?;
        let upload = Upload {
            filename: filename.to_string(),
            fingerprint: fingerprint(bytes),
            dataset,
        };
        info!(
            filename,
            fingerprint = %upload.fingerprint,
            creators = upload.dataset.len(),
            "Upload accepted"
        );
        Ok(self.upload.insert(upload))
    }

    pub fn current_upload(&self) -> Option<&Upload> {
        self.upload.as_ref()
    }

    /// The most recent successful result, if any.
    pub fn last_result(&self) -> Option<&ScoredDataset> {
        self.cache.last()
    }

    /// Score the current upload against `brief`.
    ///
    /// Reuses the cached result when neither the upload bytes nor the trimmed
    /// brief changed, unless `recompute` is set. On failure the cache is left
    /// untouched.
    pub async fn evaluate(
        &mut self,
        brief: &str,
        recompute: bool,
    ) -> Result<Evaluation<'_>, MatchError> {
        let brief = scoring::similarity::normalize_brief(brief)?;
        let upload = self.upload.as_ref().ok_or(MatchError::NoDataset)?;
        let key = CacheKey::new(upload.fingerprint.as_str(), brief);

        let vacant = if recompute {
            self.cache.refresh(key)
        } else {
            match self.cache.entry(key) {
                CacheEntry::Hit(scored) => {
                    return Ok(Evaluation {
                        scored,
                        cached: true,
                    })
                }
                CacheEntry::Miss(vacant) => vacant,
            }
        };

        let scored = scoring::score(&upload.dataset, brief, self.embedder.as_ref())
            .await
            .inspect_err(|e| warn!(error = %e, "Scoring failed, keeping previous result"))?;

        Ok(Evaluation {
            scored: vacant.insert(scored),
            cached: false,
        })
    }

    /// Apply the session filter to the most recent result. Returns `None`
    /// until the current upload has been scored.
    pub fn ranked(&self) -> Option<(&ScoredDataset, Vec<&ScoredCreator>)> {
        let upload = self.upload.as_ref()?;
        let key = self.cache.last_key()?;
        if key.file_fingerprint != upload.fingerprint {
            return None;
        }
        self.cache
            .last()
            .map(|scored| (scored, scored.select(&self.filter)))
    }
}
