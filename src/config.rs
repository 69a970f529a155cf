use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::embedding::download;
use crate::output::export::DEFAULT_EXPORT_FILE;
use crate::scoring::ranking::{DEFAULT_TOP_COUNT, MAX_TOP_COUNT};

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// setting has a default, so an empty environment is valid.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory holding downloaded models
    pub model_dir: PathBuf,
    /// Number of top matches shown when no count is given
    pub top_count: usize,
    /// Where CSV exports go when no path is given
    pub export_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_dir = lookup("CREATOR_MATCH_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(download::default_model_dir);

        let top_count = match lookup("CREATOR_MATCH_TOP_COUNT") {
            Some(raw) => {
                let n: usize = raw.trim().parse().with_context(|| {
                    format!("CREATOR_MATCH_TOP_COUNT must be a number, got '{raw}'")
                })?;
                if !(1..=MAX_TOP_COUNT).contains(&n) {
                    anyhow::bail!(
                        "CREATOR_MATCH_TOP_COUNT must be between 1 and {MAX_TOP_COUNT}, got {n}"
                    );
                }
                n
            }
            None => DEFAULT_TOP_COUNT,
        };

        let export_path = lookup("CREATOR_MATCH_EXPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE));

        Ok(Self {
            model_dir,
            top_count,
            export_path,
        })
    }

    /// Directory of the sentence embedding model inside `model_dir`.
    pub fn embedding_dir(&self) -> PathBuf {
        download::embedding_model_dir(&self.model_dir)
    }

    /// Check that the embedding model has been downloaded.
    /// Call this before any operation that scores creators.
    pub fn require_model(&self) -> Result<()> {
        if !download::embedding_files_present(&self.model_dir) {
            anyhow::bail!(
                "Embedding model files not found in {}\n\
                 Run `creator-match download-model` to download them.",
                self.embedding_dir().display()
            );
        }
        Ok(())
    }
}
