//! FILENAME: engine/src/table.rs
//! PURPOSE: The table data model fed to the layout engine.
//! CONTEXT: A `Table` owns a `Dataset` plus the descriptive metadata of a
//! good-practice table (title, subtitles, instructions, scope, source,
//! legend, annotations, notes, units) and the index-column mapping that
//! marks columns as row labels rather than data. Units and footnote
//! markers are embedded into the column headers when they are attached,
//! before any layout takes place.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cell::Value;
use crate::directive::{AdditionalFormat, ColumnSelector};
use crate::error::EngineError;

// ============================================================================
// DATASET
// ============================================================================

/// An ordered, rectangular dataset with named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create a dataset, enforcing the tabular invariants: column names
    /// unique and non-empty, every row exactly as wide as the column list.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, EngineError> {
        if columns.is_empty() {
            return Err(EngineError::Validation(
                "a dataset must have at least one column".to_string(),
            ));
        }
        for (pos, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(EngineError::Validation(format!(
                    "column {} has an empty name",
                    pos
                )));
            }
            if columns[..pos].contains(name) {
                return Err(EngineError::Validation(format!(
                    "duplicate column name `{}`",
                    name
                )));
            }
        }
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(EngineError::Validation(format!(
                    "row {} has {} cells, expected {}",
                    row_index,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Dataset { columns, rows })
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// 0-indexed position of the named column.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

// ============================================================================
// UNITS
// ============================================================================

/// Units metadata attached to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Units {
    /// One caption for the whole table, written on the scope row at the
    /// rightmost block column.
    Single(String),
    /// Per-column unit strings, embedded into the selected columns'
    /// headers when the units are attached.
    PerColumn(Vec<(ColumnSelector, String)>),
}

// ============================================================================
// TABLE
// ============================================================================

/// A dataset plus its descriptive metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    dataset: Dataset,
    /// Display headers, one per dataset column. Start as the column names
    /// and accumulate embedded units; reference and URL resolution rewrite
    /// them on the working copy.
    headers: Vec<Value>,
    pub title: Option<Value>,
    pub subtitles: Vec<Value>,
    pub instructions: Option<Value>,
    pub scope: Option<Value>,
    pub source: Option<Value>,
    pub legend: Vec<Value>,
    /// Footnote definitions, key -> text, in definition order.
    pub annotations: IndexMap<String, Value>,
    pub notes: Vec<Value>,
    /// A single-caption units entry, if attached.
    pub units: Option<String>,
    /// Index level (1..=3) -> 0-indexed column position.
    pub index_columns: BTreeMap<u8, usize>,
    /// Write index-column headings instead of blanking them.
    pub show_index_column_headings: bool,
    pub additional_formatting: Vec<AdditionalFormat>,
}

impl Table {
    pub fn new(name: impl Into<String>, dataset: Dataset) -> Self {
        let headers = dataset
            .column_names()
            .iter()
            .map(|name| Value::text(name.clone()))
            .collect();
        Table {
            name: name.into(),
            dataset,
            headers,
            title: None,
            subtitles: Vec::new(),
            instructions: None,
            scope: None,
            source: None,
            legend: Vec::new(),
            annotations: IndexMap::new(),
            notes: Vec::new(),
            units: None,
            index_columns: BTreeMap::new(),
            show_index_column_headings: false,
            additional_formatting: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<Value>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitles(mut self, subtitles: Vec<Value>) -> Self {
        self.subtitles = subtitles;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<Value>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<Value>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<Value>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_legend(mut self, legend: Vec<Value>) -> Self {
        self.legend = legend;
        self
    }

    /// Attach footnote definitions in definition order.
    pub fn with_annotations(mut self, annotations: Vec<(String, Value)>) -> Self {
        self.annotations = annotations.into_iter().collect();
        self
    }

    pub fn with_notes(mut self, notes: Vec<Value>) -> Self {
        self.notes = notes;
        self
    }

    /// Attach units. Per-column units are embedded into the selected
    /// headers immediately; a single caption is stored for the scope row.
    pub fn with_units(mut self, units: Units) -> Result<Self, EngineError> {
        match units {
            Units::Single(caption) => {
                self.units = Some(caption);
            }
            Units::PerColumn(per_column) => {
                for (selector, unit) in per_column {
                    let pos = selector.resolve(&self.dataset)?;
                    let header = &mut self.headers[pos];
                    let embedded = format!("{}\n({})", header.display_text(), unit);
                    *header = Value::Text(embedded);
                }
            }
        }
        Ok(self)
    }

    /// Mark a column as an index column of the given level.
    pub fn with_index_column(mut self, level: u8, position: usize) -> Self {
        self.index_columns.insert(level, position);
        self
    }

    pub fn with_show_index_column_headings(mut self, show: bool) -> Self {
        self.show_index_column_headings = show;
        self
    }

    pub fn with_additional_formatting(mut self, directives: Vec<AdditionalFormat>) -> Self {
        self.additional_formatting = directives;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }

    pub fn headers(&self) -> &[Value] {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut [Value] {
        &mut self.headers
    }

    /// The index level of a column position, if it is an index column.
    pub fn index_level_of(&self, position: usize) -> Option<u8> {
        self.index_columns
            .iter()
            .find(|(_, pos)| **pos == position)
            .map(|(level, _)| *level)
    }

    /// Validate the table invariants and directive format attributes.
    /// Called by the layout engine before anything is written.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (level, position) in &self.index_columns {
            if !(1..=3).contains(level) {
                return Err(EngineError::Validation(format!(
                    "index level {} is not in 1..=3",
                    level
                )));
            }
            if *position >= self.dataset.n_cols() {
                return Err(EngineError::Validation(format!(
                    "index column position {} is out of range for {} columns",
                    position,
                    self.dataset.n_cols()
                )));
            }
        }
        for directive in &self.additional_formatting {
            directive.validate()?;
        }
        Ok(())
    }
}
