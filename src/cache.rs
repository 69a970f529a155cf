// Last-result cache for scored datasets.
//
// Scoring is the only expensive step, and it is a pure function of the
// uploaded bytes and the trimmed brief. The cache keeps exactly one result,
// keyed on both. Callers decide when to bypass it (explicit recompute) and
// only store successful results, so a failed recompute leaves the previous
// entry in place.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::scoring::ScoredDataset;

/// Lowercase hex SHA-256 of an upload's raw bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Identity of one scoring pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub file_fingerprint: String,
    /// The brief with surrounding whitespace removed.
    pub brief: String,
}

impl CacheKey {
    pub fn new(file_fingerprint: impl Into<String>, brief: &str) -> Self {
        Self {
            file_fingerprint: file_fingerprint.into(),
            brief: brief.trim().to_string(),
        }
    }
}

/// Outcome of looking a key up in the cache.
pub enum CacheEntry<'a> {
    Hit(&'a ScoredDataset),
    Miss(VacantEntry<'a>),
}

/// A cache slot waiting for a fresh result. The previous entry stays in place
/// until `insert` is called.
pub struct VacantEntry<'a> {
    slot: &'a mut Option<(CacheKey, ScoredDataset)>,
    key: CacheKey,
}

impl<'a> VacantEntry<'a> {
    /// Replace the cached entry and return a reference to the stored result.
    pub fn insert(self, scored: ScoredDataset) -> &'a ScoredDataset {
        let VacantEntry { slot, key } = self;
        &slot.insert((key, scored)).1
    }
}

/// Holds the most recent successful scoring result.
#[derive(Debug, Default)]
pub struct ResultCache {
    last: Option<(CacheKey, ScoredDataset)>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached result, if it was computed for exactly this key.
    pub fn get(&self, key: &CacheKey) -> Option<&ScoredDataset> {
        match &self.last {
            Some((cached_key, scored)) if cached_key == key => {
                debug!(brief = %key.brief, "Result cache hit");
                Some(scored)
            }
            _ => None,
        }
    }

    /// Look up `key`, handing back either the cached result or a slot to fill.
    pub fn entry(&mut self, key: CacheKey) -> CacheEntry<'_> {
        if matches!(&self.last, Some((cached_key, _)) if *cached_key == key) {
            debug!(brief = %key.brief, "Result cache hit");
            let (_, scored) = self.last.as_ref().expect("checked above");
            CacheEntry::Hit(scored)
        } else {
            CacheEntry::Miss(VacantEntry {
                slot: &mut self.last,
                key,
            })
        }
    }

    /// A slot for `key` that ignores any cached result (explicit recompute).
    pub fn refresh(&mut self, key: CacheKey) -> VacantEntry<'_> {
        VacantEntry {
            slot: &mut self.last,
            key,
        }
    }

    /// Replace the cached entry and return a reference to the stored result.
    pub fn store(&mut self, key: CacheKey, scored: ScoredDataset) -> &ScoredDataset {
        let (_, scored) = self.last.insert((key, scored));
        scored
    }

    /// The most recent result regardless of key.
    pub fn last(&self) -> Option<&ScoredDataset> {
        self.last.as_ref().map(|(_, scored)| scored)
    }

    pub fn last_key(&self) -> Option<&CacheKey> {
        self.last.as_ref().map(|(key, _)| key)
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}
