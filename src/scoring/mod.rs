// Scoring: brief similarity per creator, then filtering and ranking.

pub mod ranking;
pub mod similarity;

use crate::dataset::{distinct_values, CreatorRecord, Schema};

pub use ranking::MatchFilter;
pub use similarity::{score, QUERY_INSTRUCTION};

/// Name of the column appended to exports.
pub const SCORE_COLUMN: &str = "similarity_score";

/// A creator record annotated with its similarity to the brief.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCreator {
    pub record: CreatorRecord,
    /// Cosine similarity in [-1, 1].
    pub similarity_score: f32,
}

/// Every creator of a dataset, scored against one brief, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDataset {
    schema: Schema,
    creators: Vec<ScoredCreator>,
}

impl ScoredDataset {
    pub fn new(schema: Schema, creators: Vec<ScoredCreator>) -> Self {
        Self { schema, creators }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn creators(&self) -> &[ScoredCreator] {
        &self.creators
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    /// Distinct non-empty niches, sorted.
    pub fn niches(&self) -> Vec<String> {
        distinct_values(self.creators.iter().map(|c| c.record.niche.as_str()))
    }

    /// Distinct non-empty locations, sorted.
    pub fn locations(&self) -> Vec<String> {
        distinct_values(self.creators.iter().map(|c| c.record.location.as_str()))
    }
}
