// Export of ranked creators: CSV download and JSON.
//
// Columns come out in source order with `similarity_score` appended. A source
// column that is itself named `similarity_score` (a re-uploaded export) is
// dropped so the fresh score is the only one.

use serde_json::{Map, Value};

use crate::dataset::{Column, Schema};
use crate::error::MatchError;
use crate::scoring::{ScoredCreator, SCORE_COLUMN};

/// Default file name for CSV exports.
pub const DEFAULT_EXPORT_FILE: &str = "top_creators.csv";

/// Source columns that survive into an export, paired with their slots.
fn export_columns(schema: &Schema) -> Vec<(&str, Column)> {
    schema
        .columns()
        .iter()
        .zip(schema.layout())
        .filter(|(name, column)| !(matches!(column, Column::Extra(_)) && *name == SCORE_COLUMN))
        .map(|(name, column)| (name.as_str(), *column))
        .collect()
}

/// Render the selected creators as CSV text with a header row.
pub fn to_csv(schema: &Schema, creators: &[&ScoredCreator]) -> Result<String, MatchError> {
    let columns = export_columns(schema);
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = columns
        .iter()
        .map(|(name, _)| *name)
        .chain(std::iter::once(SCORE_COLUMN));
    writer
        .write_record(header)
        .map_err(|e| MatchError::Export(e.to_string()))?;

    for creator in creators {
        let row = columns
            .iter()
            .map(|(_, column)| creator.record.value(*column).to_string())
            .chain(std::iter::once(creator.similarity_score.to_string()));
        writer
            .write_record(row)
            .map_err(|e| MatchError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| MatchError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| MatchError::Export(e.to_string()))
}

/// Render the selected creators as a JSON array of objects whose keys follow
/// the export column order.
pub fn to_json(schema: &Schema, creators: &[&ScoredCreator]) -> Value {
    let columns = export_columns(schema);

    Value::Array(
        creators
            .iter()
            .map(|creator| {
                let mut object = Map::new();
                for (name, column) in &columns {
                    let value = serde_json::to_value(creator.record.value(*column))
                        .unwrap_or(Value::Null);
                    object.insert(name.to_string(), value);
                }
                object.insert(
                    SCORE_COLUMN.to_string(),
                    Value::from(f64::from(creator.similarity_score)),
                );
                Value::Object(object)
            })
            .collect(),
    )
}
