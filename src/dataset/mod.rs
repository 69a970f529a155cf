// Creator datasets: the record model and the upload loader.
//
// A dataset keeps the uploaded header exactly as it arrived so exports can
// reproduce the source column order. The five required columns are lifted
// into typed fields on each record; every other column rides along as an
// untyped cell.

pub mod loader;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

pub use loader::{load_dataset, DatasetFormat};

/// Columns every creator dataset must provide, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 5] = ["name", "bio", "niche", "location", "audience_size"];

/// A single value from a CSV or spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Plain decimal rendering: `12000`, `0.25`, never scientific notation.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
        }
    }
}

/// Where a source column's value lives on a `CreatorRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Bio,
    Niche,
    Location,
    AudienceSize,
    /// Index into `CreatorRecord::extra`.
    Extra(usize),
}

impl Column {
    fn required(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Column::Name),
            "bio" => Some(Column::Bio),
            "niche" => Some(Column::Niche),
            "location" => Some(Column::Location),
            "audience_size" => Some(Column::AudienceSize),
            _ => None,
        }
    }

    /// True for the four free-text fields, whose raw text is kept verbatim.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Column::Name | Column::Bio | Column::Niche | Column::Location
        )
    }
}

/// One creator row.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatorRecord {
    pub name: String,
    pub bio: String,
    pub niche: String,
    pub location: String,
    pub audience_size: Cell,
    /// Cells of the non-required columns, in source order.
    pub extra: Vec<Cell>,
}

impl CreatorRecord {
    /// The value this record holds for a source column.
    pub fn value(&self, column: Column) -> Cell {
        match column {
            Column::Name => text_cell(&self.name),
            Column::Bio => text_cell(&self.bio),
            Column::Niche => text_cell(&self.niche),
            Column::Location => text_cell(&self.location),
            Column::AudienceSize => self.audience_size.clone(),
            Column::Extra(i) => self.extra.get(i).cloned().unwrap_or(Cell::Empty),
        }
    }
}

fn text_cell(s: &str) -> Cell {
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

/// Header of an uploaded dataset, resolved against the required columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
    layout: Vec<Column>,
}

impl Schema {
    /// Map each header name to a record slot. Fails with `MissingColumns`
    /// when any required column is absent. A duplicated required name keeps
    /// its first occurrence; later copies are carried as extra columns.
    pub fn resolve(columns: Vec<String>) -> Result<Self, crate::error::MatchError> {
        let mut layout = Vec::with_capacity(columns.len());
        let mut seen = Vec::with_capacity(REQUIRED_COLUMNS.len());
        let mut extra = 0;

        for name in &columns {
            match Column::required(name) {
                Some(column) if !seen.contains(&column) => {
                    seen.push(column);
                    layout.push(column);
                }
                _ => {
                    layout.push(Column::Extra(extra));
                    extra += 1;
                }
            }
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| !columns.iter().any(|c| c == *name))
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(crate::error::MatchError::MissingColumns { missing });
        }

        Ok(Self { columns, layout })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn layout(&self) -> &[Column] {
        &self.layout
    }

    /// Build a record from one row of cells in header order. Short rows are
    /// padded with empty cells.
    pub fn record(&self, cells: Vec<Cell>) -> CreatorRecord {
        let mut record = CreatorRecord {
            name: String::new(),
            bio: String::new(),
            niche: String::new(),
            location: String::new(),
            audience_size: Cell::Empty,
            extra: Vec::with_capacity(self.layout.len().saturating_sub(REQUIRED_COLUMNS.len())),
        };

        let mut cells = cells.into_iter();
        for column in &self.layout {
            let cell = cells.next().unwrap_or(Cell::Empty);
            match column {
                Column::Name => record.name = cell.to_string(),
                Column::Bio => record.bio = cell.to_string(),
                Column::Niche => record.niche = cell.to_string(),
                Column::Location => record.location = cell.to_string(),
                Column::AudienceSize => record.audience_size = cell,
                Column::Extra(_) => record.extra.push(cell),
            }
        }

        record
    }
}

/// An ordered set of creator records sharing one header.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatorDataset {
    schema: Schema,
    records: Vec<CreatorRecord>,
}

impl CreatorDataset {
    pub fn new(schema: Schema, records: Vec<CreatorRecord>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn records(&self) -> &[CreatorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The bios to embed, in record order.
    pub fn bios(&self) -> Vec<String> {
        self.records.iter().map(|r| r.bio.clone()).collect()
    }

    /// Distinct non-empty niches, sorted.
    pub fn niches(&self) -> Vec<String> {
        distinct_values(self.records.iter().map(|r| r.niche.as_str()))
    }

    /// Distinct non-empty locations, sorted.
    pub fn locations(&self) -> Vec<String> {
        distinct_values(self.records.iter().map(|r| r.location.as_str()))
    }
}

/// Sorted distinct values, skipping blanks.
pub(crate) fn distinct_values<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
