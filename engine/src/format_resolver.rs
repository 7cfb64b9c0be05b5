//! FILENAME: engine/src/format_resolver.rs
//! PURPOSE: Merges the layered formatting model into one format per cell.
//! CONTEXT: Resolution order for every block coordinate: theme default for
//! the element kind occupying it, then computed overrides (missing-value
//! alignment), then user directives strictly in list order. Later layers
//! override earlier ones per attribute; distinct attributes all survive.
//! Block coordinates: row 0 is the column-heading row.

use std::collections::HashSet;

use crate::directive::AdditionalFormat;
use crate::error::EngineError;
use crate::style::FormatMap;
use crate::table::Table;
use crate::theme::{Element, Theme};

/// Resolve the parallel format grid for a table's header+data block.
/// `missing` holds the block coordinates of missing-value substitutions.
pub fn resolve_block_formats(
    table: &Table,
    theme: &Theme,
    missing: &HashSet<(usize, usize)>,
) -> Result<Vec<Vec<FormatMap>>, EngineError> {
    let n_cols = table.dataset().n_cols();
    let n_rows = table.dataset().n_rows() + 1;

    // Layer 1: theme defaults by element kind.
    let mut grid: Vec<Vec<FormatMap>> = Vec::with_capacity(n_rows);
    for row in 0..n_rows {
        let mut row_formats = Vec::with_capacity(n_cols);
        for col in 0..n_cols {
            let element = if row == 0 {
                Element::ColumnHeading
            } else {
                match table.index_level_of(col) {
                    Some(level) => Theme::index_element(level),
                    None => Element::Data,
                }
            };
            row_formats.push(theme.format_for(element).clone());
        }
        grid.push(row_formats);
    }

    // Layer 2: computed overrides. Missing-value cells are centred unless
    // the theme already aligns data cells.
    if !theme.format_for(Element::Data).contains("align") {
        for (row, col) in missing {
            if *row < n_rows && *col < n_cols {
                grid[*row][*col].set("align", "center");
            }
        }
    }

    // Layer 3: user directives, in list order.
    for directive in &table.additional_formatting {
        apply_directive(directive, table, &mut grid)?;
    }

    Ok(grid)
}

fn apply_directive(
    directive: &AdditionalFormat,
    table: &Table,
    grid: &mut [Vec<FormatMap>],
) -> Result<(), EngineError> {
    let n_rows = grid.len();
    let n_cols = table.dataset().n_cols();

    match directive {
        AdditionalFormat::Column {
            columns,
            format,
            include_names,
        } => {
            let first_row = if *include_names { 0 } else { 1 };
            for selector in columns {
                let col = selector.resolve(table.dataset())?;
                for row in first_row..n_rows {
                    grid[row][col].merge_from(format);
                }
            }
        }
        AdditionalFormat::Row {
            rows,
            format,
            include_names,
        } => {
            let index_positions: HashSet<usize> = table.index_columns.values().copied().collect();
            for index in rows {
                let row = resolve_row_index(*index, n_rows)?;
                for col in 0..n_cols {
                    if !*include_names && index_positions.contains(&col) {
                        continue;
                    }
                    grid[row][col].merge_from(format);
                }
            }
        }
        AdditionalFormat::Cell { cells, format } => {
            for (row, col) in cells {
                let (row, col) = (*row as usize, *col as usize);
                if row >= n_rows || col >= n_cols {
                    return Err(EngineError::Validation(format!(
                        "cell ({}, {}) is outside the {} x {} table block",
                        row, col, n_rows, n_cols
                    )));
                }
                grid[row][col].merge_from(format);
            }
        }
    }
    Ok(())
}

/// Resolve a possibly negative block row index. Negative values count
/// back from the last block row (-1 is the last data row).
fn resolve_row_index(index: i64, n_rows: usize) -> Result<usize, EngineError> {
    let resolved = if index < 0 {
        n_rows as i64 + index
    } else {
        index
    };
    if (0..n_rows as i64).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(EngineError::Validation(format!(
            "row index {} is out of range for a block of {} rows",
            index, n_rows
        )))
    }
}
