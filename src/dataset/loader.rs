// Upload loader: turns raw file bytes into a validated CreatorDataset.
//
// The format is chosen from the filename extension alone. Unknown extensions
// are rejected before any parsing happens.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDateTime, NaiveTime};
use tracing::{debug, info};

use super::{Cell, CreatorDataset, Schema};
use crate::error::MatchError;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Excel,
}

impl DatasetFormat {
    /// Pick the format from a filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, MatchError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(DatasetFormat::Csv),
            Some("xls") | Some("xlsx") => Ok(DatasetFormat::Excel),
            _ => Err(MatchError::UnsupportedFormat {
                filename: filename.to_string(),
            }),
        }
    }
}

/// Parse and validate an uploaded creator dataset.
pub fn load_dataset(bytes: &[u8], filename: &str) -> Result<CreatorDataset, MatchError> {
    let format = DatasetFormat::from_filename(filename)?;
    debug!(filename, ?format, size = bytes.len(), "Loading dataset");

    let dataset = match format {
        DatasetFormat::Csv => parse_csv(bytes)?,
        DatasetFormat::Excel => parse_excel(bytes)?,
    };

    info!(
        filename,
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "Dataset loaded"
    );
    Ok(dataset)
}

fn parse_csv(bytes: &[u8]) -> Result<CreatorDataset, MatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()
        .map_err(MatchError::csv_parse)?
        .iter()
        .map(clean_header)
        .collect();

    let schema = Schema::resolve(header)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(MatchError::csv_parse)?;
        let cells = row
            .iter()
            .zip(schema.layout())
            .map(|(raw, column)| {
                if column.is_text() {
                    raw_text_cell(raw)
                } else {
                    infer_cell(raw)
                }
            })
            .collect();
        records.push(schema.record(cells));
    }

    Ok(CreatorDataset::new(schema, records))
}

fn parse_excel(bytes: &[u8]) -> Result<CreatorDataset, MatchError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(MatchError::excel_parse)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| MatchError::excel_parse("workbook has no worksheets"))?
        .map_err(MatchError::excel_parse)?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| MatchError::excel_parse("first worksheet is empty"))?
        .iter()
        .map(|cell| clean_header(&cell.to_string()))
        .collect();

    let schema = Schema::resolve(header)?;

    let mut records = Vec::new();
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(excel_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        records.push(schema.record(cells));
    }

    Ok(CreatorDataset::new(schema, records))
}

fn clean_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').to_string()
}

fn raw_text_cell(raw: &str) -> Cell {
    if raw.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(raw.to_string())
    }
}

/// Type a CSV field the way a dataframe reader would: numbers and booleans
/// become typed cells, everything else stays text.
fn infer_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return Cell::Number(n);
        }
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Cell::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Cell::Bool(false);
    }
    Cell::Text(raw.to_string())
}

fn excel_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(datetime) => Cell::Text(format_datetime(datetime)),
            None => Cell::Text(data.to_string()),
        },
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// ISO date, with the time only when it is not midnight.
fn format_datetime(datetime: NaiveDateTime) -> String {
    if datetime.time() == NaiveTime::MIN {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
