// Domain errors for loading, scoring and exporting creator datasets.
//
// Every variant is terminal for the action that produced it: the caller
// reports the message and waits for new input. Nothing here is retried.

use thiserror::Error;

use crate::dataset::REQUIRED_COLUMNS;

/// Allowed upload formats, as shown to the user.
pub const ALLOWED_FORMATS: &str = "CSV (.csv) or Excel (.xls, .xlsx)";

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Unsupported file format for '{filename}'. Upload a {} file.", ALLOWED_FORMATS)]
    UnsupportedFormat { filename: String },

    #[error(
        "Dataset must include the following columns: {}; missing: {}",
        REQUIRED_COLUMNS.join(", "),
        .missing.join(", ")
    )]
    MissingColumns { missing: Vec<String> },

    #[error("Failed to parse {format} file: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Embedding and scoring failed: {0}")]
    EmbeddingFailure(String),

    #[error("Campaign brief is empty. Enter a brief to find matches.")]
    EmptyBrief,

    #[error("No dataset loaded. Upload a creator dataset first.")]
    NoDataset,

    #[error("Failed to export results: {0}")]
    Export(String),
}

impl MatchError {
    pub(crate) fn csv_parse(message: impl ToString) -> Self {
        MatchError::Parse {
            format: "CSV",
            message: message.to_string(),
        }
    }

    pub(crate) fn excel_parse(message: impl ToString) -> Self {
        MatchError::Parse {
            format: "Excel",
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_missing_and_required() {
        let err = MatchError::MissingColumns {
            missing: vec!["bio".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing: bio"), "got: {msg}");
        assert!(msg.contains("name, bio, niche, location, audience_size"));
    }

    #[test]
    fn test_unsupported_format_names_allowed_formats() {
        let err = MatchError::UnsupportedFormat {
            filename: "creators.txt".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("creators.txt"));
        assert!(msg.contains(".csv") && msg.contains(".xlsx"));
    }
}
