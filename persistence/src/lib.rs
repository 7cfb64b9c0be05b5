//! FILENAME: persistence/src/lib.rs
//! Workbook Persistence Module
//!
//! Turns laid-out tables into an XLSX file. This crate owns everything the
//! layout engine treats as external: the output path, worksheet creation,
//! the global reference order computed across all sheets before anything
//! is written, and the `rust_xlsxwriter` backend adapter.

mod error;
mod xlsx_writer;

pub use error::PersistenceError;
pub use xlsx_writer::XlsxSheetWriter;

use std::path::Path;

use engine::{LayoutEngine, ReferenceOrder, Table, Theme};
use rust_xlsxwriter::Workbook;

/// One worksheet and the tables stacked on it, top to bottom.
#[derive(Debug, Clone)]
pub struct SheetSpec {
    pub name: String,
    pub tables: Vec<Table>,
}

impl SheetSpec {
    pub fn new(name: impl Into<String>, tables: Vec<Table>) -> Self {
        SheetSpec {
            name: name.into(),
            tables,
        }
    }
}

/// Write every sheet's tables to an XLSX workbook at `path`.
///
/// The reference order is computed across all tables of all sheets, in
/// order, before the first cell is written; every table then consults
/// that one order, so a key shared between tables keeps one number.
pub fn write_workbook(
    path: impl AsRef<Path>,
    sheets: &[SheetSpec],
    theme: &Theme,
    auto_width: bool,
) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    validate_path(path)?;

    let tables: Vec<&Table> = sheets.iter().flat_map(|sheet| &sheet.tables).collect();
    let order = ReferenceOrder::build(&tables, theme)?;

    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        let mut writer = XlsxSheetWriter::new(worksheet);
        let mut layout = LayoutEngine::new(&mut writer, theme, &order);
        for table in &sheet.tables {
            layout.write_table(table, auto_width)?;
        }
    }

    workbook.save(path)?;
    log::debug!("wrote workbook {}", path.display());
    Ok(())
}

/// The output path must name an `.xlsx` file in an existing directory.
fn validate_path(path: &Path) -> Result<(), PersistenceError> {
    let is_xlsx = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);
    if !is_xlsx {
        return Err(PersistenceError::InvalidPath(
            "output filename must end with '.xlsx'".to_string(),
        ));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(PersistenceError::InvalidPath(format!(
                "can't write {}, directory does not exist",
                path.display()
            )));
        }
    }
    Ok(())
}
