// creator-match: rank content creators against a campaign brief by the
// semantic similarity of their bios.
//
// This is the library root. Each module corresponds to one stage of the
// matching pipeline: load -> embed and score -> cache -> rank -> output.

pub mod cache;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod output;
pub mod scoring;
pub mod session;

pub use error::MatchError;
