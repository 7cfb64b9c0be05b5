//! FILENAME: engine/src/writer.rs
//! PURPOSE: The sheet backend boundary and an in-memory implementation.
//! CONTEXT: The layout engine emits cells through this trait and has no
//! inheritance relationship with any concrete spreadsheet library; a
//! backend adapter implements the trait (see the persistence crate for
//! the XLSX one). `SheetBuffer` records emitted operations in memory and
//! is what tests and introspective callers consume.

use std::collections::BTreeMap;

use crate::cell::Value;
use crate::coord::DataRange;
use crate::error::EngineError;
use crate::format_list::FormatList;
use crate::style::{FormatMap, FORMAT_ATTRIBUTES};

/// The operations a sheet backend must support.
pub trait SheetWriter {
    fn write_cell(&mut self, row: u32, col: u32, value: &Value, format: &FormatMap)
        -> Result<(), EngineError>;

    fn write_rich_text(
        &mut self,
        row: u32,
        col: u32,
        segments: &FormatList,
        format: &FormatMap,
    ) -> Result<(), EngineError>;

    fn write_hyperlink(
        &mut self,
        row: u32,
        col: u32,
        url: &str,
        display: &str,
        format: &FormatMap,
    ) -> Result<(), EngineError>;

    fn write_blank(&mut self, row: u32, col: u32, format: &FormatMap) -> Result<(), EngineError>;

    fn set_column_width(&mut self, col: u32, width: f64) -> Result<(), EngineError>;

    /// Mark a header+data block as a table region, with one header entry
    /// per column.
    fn register_table_region(
        &mut self,
        range: &DataRange,
        column_headers: &[String],
    ) -> Result<(), EngineError>;

    /// The style attribute names this backend recognises.
    fn valid_format_attributes(&self) -> &[&'static str] {
        FORMAT_ATTRIBUTES
    }
}

// ============================================================================
// IN-MEMORY SHEET
// ============================================================================

/// What one buffered cell holds.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Value(Value),
    Rich(FormatList),
    Hyperlink { url: String, display: String },
    Blank,
}

/// A cell recorded by `SheetBuffer`.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedCell {
    pub content: CellContent,
    pub format: FormatMap,
}

impl BufferedCell {
    /// The rendered text of the cell, blanks rendering as empty.
    pub fn display_text(&self) -> String {
        match &self.content {
            CellContent::Value(value) => value.display_text(),
            CellContent::Rich(list) => list.text(),
            CellContent::Hyperlink { display, .. } => display.clone(),
            CellContent::Blank => String::new(),
        }
    }
}

/// An in-memory sheet that records every emitted operation.
#[derive(Debug, Clone, Default)]
pub struct SheetBuffer {
    cells: BTreeMap<(u32, u32), BufferedCell>,
    column_widths: BTreeMap<u32, f64>,
    regions: Vec<(DataRange, Vec<String>)>,
}

impl SheetBuffer {
    pub fn new() -> Self {
        SheetBuffer::default()
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&BufferedCell> {
        self.cells.get(&(row, col))
    }

    /// The rendered text at a position, if anything was written there.
    pub fn text_at(&self, row: u32, col: u32) -> Option<String> {
        self.cell(row, col).map(BufferedCell::display_text)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&(u32, u32), &BufferedCell)> {
        self.cells.iter()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    pub fn regions(&self) -> &[(DataRange, Vec<String>)] {
        &self.regions
    }

    /// The highest row index written so far, if any.
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().map(|(row, _)| *row).max()
    }

    fn put(&mut self, row: u32, col: u32, content: CellContent, format: &FormatMap) {
        self.cells.insert(
            (row, col),
            BufferedCell {
                content,
                format: format.clone(),
            },
        );
    }
}

impl SheetWriter for SheetBuffer {
    fn write_cell(
        &mut self,
        row: u32,
        col: u32,
        value: &Value,
        format: &FormatMap,
    ) -> Result<(), EngineError> {
        self.put(row, col, CellContent::Value(value.clone()), format);
        Ok(())
    }

    fn write_rich_text(
        &mut self,
        row: u32,
        col: u32,
        segments: &FormatList,
        format: &FormatMap,
    ) -> Result<(), EngineError> {
        self.put(row, col, CellContent::Rich(segments.clone()), format);
        Ok(())
    }

    fn write_hyperlink(
        &mut self,
        row: u32,
        col: u32,
        url: &str,
        display: &str,
        format: &FormatMap,
    ) -> Result<(), EngineError> {
        self.put(
            row,
            col,
            CellContent::Hyperlink {
                url: url.to_string(),
                display: display.to_string(),
            },
            format,
        );
        Ok(())
    }

    fn write_blank(&mut self, row: u32, col: u32, format: &FormatMap) -> Result<(), EngineError> {
        self.put(row, col, CellContent::Blank, format);
        Ok(())
    }

    fn set_column_width(&mut self, col: u32, width: f64) -> Result<(), EngineError> {
        self.column_widths.insert(col, width);
        Ok(())
    }

    fn register_table_region(
        &mut self,
        range: &DataRange,
        column_headers: &[String],
    ) -> Result<(), EngineError> {
        self.regions.push((*range, column_headers.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_records_cells_and_widths() {
        let mut buffer = SheetBuffer::new();
        buffer
            .write_cell(0, 0, &Value::text("Title"), &FormatMap::new())
            .unwrap();
        buffer.set_column_width(0, 12.5).unwrap();

        assert_eq!(buffer.text_at(0, 0).as_deref(), Some("Title"));
        assert_eq!(buffer.column_width(0), Some(12.5));
        assert_eq!(buffer.last_row(), Some(0));
    }

    #[test]
    fn test_buffer_records_regions() {
        let mut buffer = SheetBuffer::new();
        let range = DataRange::new(1, 0, 3, 1);
        buffer
            .register_table_region(&range, &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(buffer.regions().len(), 1);
        assert_eq!(buffer.regions()[0].0, range);
    }

    #[test]
    fn test_default_attribute_set_is_exposed() {
        let buffer = SheetBuffer::new();
        assert!(buffer.valid_format_attributes().contains(&"bold"));
    }
}
