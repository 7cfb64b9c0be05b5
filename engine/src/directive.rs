//! FILENAME: engine/src/directive.rs
//! PURPOSE: User-supplied column/row/cell style overrides.
//! CONTEXT: Directives are an explicit tagged union resolved by exhaustive
//! matching. They are applied strictly in list order after all theme
//! defaults, so a later directive wins on any attribute it also sets.
//! Selectors address table-block coordinates: row 0 is the column-heading
//! row, column 0 the leftmost block column.

use serde::{Deserialize, Serialize};

use crate::coord::CellCoord;
use crate::error::EngineError;
use crate::style::FormatMap;
use crate::table::Dataset;

/// Identifies a dataset column by name or 0-indexed position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    Position(usize),
    Name(String),
}

impl ColumnSelector {
    /// Resolve to a 0-indexed column position within `dataset`.
    pub fn resolve(&self, dataset: &Dataset) -> Result<usize, EngineError> {
        match self {
            ColumnSelector::Position(pos) => {
                if *pos < dataset.n_cols() {
                    Ok(*pos)
                } else {
                    Err(EngineError::Validation(format!(
                        "column position {} is out of range for {} columns",
                        pos,
                        dataset.n_cols()
                    )))
                }
            }
            ColumnSelector::Name(name) => {
                dataset.column_position(name).ok_or_else(|| {
                    EngineError::Validation(format!("unknown column name `{}`", name))
                })
            }
        }
    }
}

impl From<&str> for ColumnSelector {
    fn from(name: &str) -> Self {
        ColumnSelector::Name(name.to_string())
    }
}

impl From<String> for ColumnSelector {
    fn from(name: String) -> Self {
        ColumnSelector::Name(name)
    }
}

impl From<usize> for ColumnSelector {
    fn from(pos: usize) -> Self {
        ColumnSelector::Position(pos)
    }
}

fn default_include_names() -> bool {
    true
}

/// One additional-formatting directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalFormat {
    /// Style whole columns. `include_names = false` excludes the
    /// column-heading row from the selection.
    Column {
        columns: Vec<ColumnSelector>,
        format: FormatMap,
        #[serde(default = "default_include_names")]
        include_names: bool,
    },
    /// Style whole block rows. Negative indices count back from the last
    /// block row. `include_names = false` excludes index columns.
    Row {
        rows: Vec<i64>,
        format: FormatMap,
        #[serde(default = "default_include_names")]
        include_names: bool,
    },
    /// Style explicit block coordinates.
    Cell {
        cells: Vec<CellCoord>,
        format: FormatMap,
    },
}

impl AdditionalFormat {
    pub fn column(columns: Vec<ColumnSelector>, format: FormatMap) -> Self {
        AdditionalFormat::Column {
            columns,
            format,
            include_names: true,
        }
    }

    pub fn row(rows: Vec<i64>, format: FormatMap) -> Self {
        AdditionalFormat::Row {
            rows,
            format,
            include_names: true,
        }
    }

    /// A directive for one explicit coordinate.
    pub fn cell(cell: CellCoord, format: FormatMap) -> Self {
        AdditionalFormat::Cell {
            cells: vec![cell],
            format,
        }
    }

    pub fn cells(cells: Vec<CellCoord>, format: FormatMap) -> Self {
        AdditionalFormat::Cell { cells, format }
    }

    pub fn format(&self) -> &FormatMap {
        match self {
            AdditionalFormat::Column { format, .. } => format,
            AdditionalFormat::Row { format, .. } => format,
            AdditionalFormat::Cell { format, .. } => format,
        }
    }

    /// Check the directive's format attributes against the backend
    /// allow-list. Raised before any cell is written.
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(name) = self.format().first_unknown_attribute() {
            return Err(EngineError::Validation(format!(
                "`{}` is not a recognised format attribute",
                name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Value;

    fn dataset() -> Dataset {
        Dataset::new(
            vec!["Class".to_string(), "Mean".to_string()],
            vec![
                vec![Value::text("setosa"), Value::Number(5.0)],
                vec![Value::text("virginica"), Value::Number(6.6)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_selector_resolution() {
        let data = dataset();
        assert_eq!(ColumnSelector::from("Mean").resolve(&data).unwrap(), 1);
        assert_eq!(ColumnSelector::from(0usize).resolve(&data).unwrap(), 0);
        assert!(ColumnSelector::from("Median").resolve(&data).is_err());
        assert!(ColumnSelector::from(2usize).resolve(&data).is_err());
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let directive = AdditionalFormat::row(vec![0], FormatMap::new().with("blink", true));
        assert!(matches!(
            directive.validate(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_serde_shape_matches_tagged_mapping() {
        let directive = AdditionalFormat::column(
            vec![ColumnSelector::from("Mean")],
            FormatMap::new().with("bold", true),
        );
        let json = serde_json::to_value(&directive).unwrap();
        assert!(json.get("column").is_some());

        let parsed: AdditionalFormat = serde_json::from_value(serde_json::json!({
            "row": { "rows": [-1], "format": { "italic": true }, "include_names": false }
        }))
        .unwrap();
        assert_eq!(
            parsed,
            AdditionalFormat::Row {
                rows: vec![-1],
                format: FormatMap::new().with("italic", true),
                include_names: false,
            }
        );
    }

    #[test]
    fn test_include_names_defaults_to_true() {
        let parsed: AdditionalFormat = serde_json::from_value(serde_json::json!({
            "column": { "columns": [0], "format": { "bold": true } }
        }))
        .unwrap();
        match parsed {
            AdditionalFormat::Column { include_names, .. } => assert!(include_names),
            other => panic!("unexpected directive: {:?}", other),
        }
    }
}
