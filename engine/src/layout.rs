//! FILENAME: engine/src/layout.rs
//! PURPOSE: Lays one table out onto a sheet, element by element.
//! CONTEXT: A strictly sequential state machine: TITLE -> SUBTITLES ->
//! DESCRIPTION_ELEMENTS -> TABLE_BLOCK -> FOOTER_ELEMENTS -> DONE, with a
//! monotonically advancing cursor and no backtracking. All engine-side
//! validation and resolution happens before the first cell is emitted;
//! once emission starts only backend failures can abort, and a failed
//! table leaves the sheet unusable rather than half-recovered.

use std::collections::HashSet;

use crate::cell::Value;
use crate::coord::{CellCoord, DataRange};
use crate::error::EngineError;
use crate::format_resolver::resolve_block_formats;
use crate::reference::{resolve_references, ReferenceOrder};
use crate::style::FormatMap;
use crate::table::Table;
use crate::theme::{DescriptionElement, Element, FooterElement, Theme};
use crate::urls::resolve_urls;
use crate::width::estimate_column_widths;
use crate::writer::SheetWriter;

/// Lays out tables on one sheet through a `SheetWriter`.
///
/// The engine owns the cursor for the duration of a sheet. Each finished
/// table leaves the cursor one blank row below its last written row, so
/// repeated `write_table` calls stack tables down the sheet.
pub struct LayoutEngine<'a, W: SheetWriter> {
    writer: &'a mut W,
    theme: &'a Theme,
    order: &'a ReferenceOrder,
    cursor: CellCoord,
}

impl<'a, W: SheetWriter> LayoutEngine<'a, W> {
    pub fn new(writer: &'a mut W, theme: &'a Theme, order: &'a ReferenceOrder) -> Self {
        LayoutEngine {
            writer,
            theme,
            order,
            cursor: (0, 0),
        }
    }

    pub fn cursor(&self) -> CellCoord {
        self.cursor
    }

    /// Lay out and emit one table. Returns the cursor position where the
    /// next table would start and the bounding range of the header+data
    /// block.
    pub fn write_table(
        &mut self,
        table: &Table,
        auto_width: bool,
    ) -> Result<(CellCoord, DataRange), EngineError> {
        let theme = self.theme;
        let order = self.order;

        table.validate()?;

        // Clone-then-rewrite: the caller's table is never touched.
        let mut working = resolve_references(table, order)?;
        resolve_urls(&mut working)?;

        let block = prepare_block(&mut working, theme)?;
        let formats = resolve_block_formats(&working, theme, &block.missing)?;

        // Widths are computed while the block is still in hand, before
        // anything reaches the writer.
        let widths = if auto_width {
            let mut width_block: Vec<Vec<Value>> = Vec::with_capacity(block.rows.len() + 1);
            width_block.push(
                block
                    .headers
                    .iter()
                    .map(|header| header.clone().unwrap_or_else(|| Value::text("")))
                    .collect(),
            );
            width_block.extend(block.rows.iter().cloned());
            Some(estimate_column_widths(&width_block, &formats))
        } else {
            None
        };

        let n_cols = working.dataset().n_cols();

        // TITLE
        if let Some(title) = &working.title {
            self.write_line(title, theme.format_for(Element::Title))?;
        }

        // SUBTITLES
        for subtitle in &working.subtitles {
            self.write_line(subtitle, theme.format_for(Element::Subtitle))?;
        }

        // DESCRIPTION_ELEMENTS
        for element in &theme.description_order {
            match element {
                DescriptionElement::Instructions => {
                    if let Some(instructions) = &working.instructions {
                        self.write_line(instructions, theme.format_for(Element::Instructions))?;
                    }
                }
                DescriptionElement::Source => {
                    if let Some(source) = &working.source {
                        self.write_line(source, theme.format_for(Element::Source))?;
                    }
                }
                DescriptionElement::Scope => {
                    self.write_scope_row(&working, theme, n_cols)?;
                }
                DescriptionElement::Legend => {
                    for entry in &working.legend {
                        self.write_line(entry, theme.format_for(Element::Legend))?;
                    }
                }
            }
        }

        // TABLE_BLOCK
        let top = self.cursor.0;
        let range = DataRange::new(
            top,
            0,
            top + block.rows.len() as u32,
            (n_cols - 1) as u32,
        );

        for (col, header) in block.headers.iter().enumerate() {
            match header {
                Some(value) => self.write_value(top, col as u32, value, &formats[0][col])?,
                None => self.writer.write_blank(top, col as u32, &formats[0][col])?,
            }
        }
        for (row, cells) in block.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                self.write_value(
                    top + 1 + row as u32,
                    col as u32,
                    cell,
                    &formats[row + 1][col],
                )?;
            }
        }

        if let Some(widths) = widths {
            for (col, width) in widths.into_iter().enumerate() {
                self.writer.set_column_width(col as u32, width)?;
            }
        }

        self.writer
            .register_table_region(&range, &block.header_names)?;
        self.cursor = (range.bottom + 1, 0);

        // FOOTER_ELEMENTS
        for element in &theme.footer_order {
            match element {
                FooterElement::Source => {
                    if let Some(source) = &working.source {
                        self.write_line(source, theme.format_for(Element::Source))?;
                    }
                }
                FooterElement::Legend => {
                    for entry in &working.legend {
                        self.write_line(entry, theme.format_for(Element::Legend))?;
                    }
                }
                FooterElement::Annotations => {
                    for (key, text) in &working.annotations {
                        let marker = order.marker(key).ok_or_else(|| {
                            EngineError::Reference(format!(
                                "annotation `{}` has no entry in the reference order",
                                key
                            ))
                        })?;
                        let line = Value::text(format!("{}: {}", marker, text.display_text()));
                        self.write_line(&line, theme.format_for(Element::Annotations))?;
                    }
                }
                FooterElement::Notes => {
                    for note in &working.notes {
                        self.write_line(note, theme.format_for(Element::Notes))?;
                    }
                }
            }
        }

        log::debug!(
            "laid out table `{}` with data block {}",
            working.name,
            range.to_a1()
        );

        // One blank separator row below the table.
        self.cursor = (self.cursor.0 + 1, 0);
        Ok((self.cursor, range))
    }

    /// Write one element on its own row at column 0 and advance.
    fn write_line(&mut self, value: &Value, format: &FormatMap) -> Result<(), EngineError> {
        let row = self.cursor.0;
        self.write_value(row, 0, value, format)?;
        self.cursor.0 += 1;
        Ok(())
    }

    /// The scope/units row: scope at column 0, a single-caption units
    /// entry at the rightmost block column. The row advances when either
    /// is present, and only once when both are.
    fn write_scope_row(
        &mut self,
        working: &Table,
        theme: &Theme,
        n_cols: usize,
    ) -> Result<(), EngineError> {
        let has_scope = working.scope.is_some();
        let has_units = working.units.is_some();
        if !has_scope && !has_units {
            return Ok(());
        }
        let row = self.cursor.0;
        if let Some(scope) = &working.scope {
            self.write_value(row, 0, scope, theme.format_for(Element::Scope))?;
        }
        if let Some(units) = &working.units {
            self.write_value(
                row,
                (n_cols - 1) as u32,
                &Value::text(units.clone()),
                theme.format_for(Element::Units),
            )?;
        }
        self.cursor.0 += 1;
        Ok(())
    }

    /// Route a value to the matching writer operation.
    fn write_value(
        &mut self,
        row: u32,
        col: u32,
        value: &Value,
        format: &FormatMap,
    ) -> Result<(), EngineError> {
        match value {
            Value::Rich(list) => self.writer.write_rich_text(row, col, list, format),
            Value::Link { display, url } => {
                self.writer.write_hyperlink(row, col, url, display, format)
            }
            other => self.writer.write_cell(row, col, other, format),
        }
    }
}

// ============================================================================
// BLOCK PREPARATION
// ============================================================================

/// The assembled header+data block, ready for emission.
struct PreparedBlock {
    /// One entry per column; `None` for a blanked index heading.
    headers: Vec<Option<Value>>,
    /// Resolved plain-text header entries for the table region.
    header_names: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// Block coordinates of missing-value substitutions.
    missing: HashSet<(usize, usize)>,
}

/// Substitute missing values, validate every dataset cell and blank index
/// headings. Appends the single explanatory legend entry when at least
/// one missing value was substituted.
fn prepare_block(working: &mut Table, theme: &Theme) -> Result<PreparedBlock, EngineError> {
    let marker = theme.missing_value.clone();
    let mut missing = HashSet::new();
    let mut rows = Vec::with_capacity(working.dataset().n_rows());

    for (row_index, row) in working.dataset().rows().iter().enumerate() {
        let mut out = Vec::with_capacity(row.len());
        for (col, cell) in row.iter().enumerate() {
            if cell.is_missing() {
                let marker = marker.as_ref().ok_or_else(|| {
                    EngineError::MissingMarker(format!(
                        "table `{}` contains missing values but the theme configures no marker",
                        working.name
                    ))
                })?;
                missing.insert((row_index + 1, col));
                out.push(Value::text(marker.clone()));
                continue;
            }
            let is_marker = marker.as_deref() == Some(cell.display_text().as_str());
            if cell.is_effectively_blank() && !is_marker {
                return Err(EngineError::Validation(format!(
                    "cell in column `{}`, row {} of table `{}` is blank or holds no \
                     alphanumeric text and is not the missing-value marker",
                    working.dataset().column_names()[col],
                    row_index,
                    working.name
                )));
            }
            out.push(cell.clone());
        }
        rows.push(out);
    }

    if !missing.is_empty() {
        if let Some(marker) = &marker {
            working
                .legend
                .push(Value::text(format!("{} not available", marker)));
        }
    }

    let mut headers = Vec::with_capacity(working.headers().len());
    let mut header_names = Vec::with_capacity(working.headers().len());
    for (col, header) in working.headers().iter().enumerate() {
        header_names.push(header.display_text());
        let blanked =
            working.index_level_of(col).is_some() && !working.show_index_column_headings;
        headers.push(if blanked { None } else { Some(header.clone()) });
    }

    Ok(PreparedBlock {
        headers,
        header_names,
        rows,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::ColumnSelector;
    use crate::style::FormatValue;
    use crate::table::{Dataset, Units};
    use crate::theme::{default_theme, ThemeConfig};
    use crate::writer::{CellContent, SheetBuffer};

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

    fn bare_theme() -> Theme {
        Theme::from_config("bare", ThemeConfig::default()).unwrap_or_else(|_| unreachable!())
    }

    fn write(
        table: &Table,
        theme: &Theme,
        order: &ReferenceOrder,
        auto_width: bool,
    ) -> (SheetBuffer, CellCoord, DataRange) {
        let mut buffer = SheetBuffer::new();
        let mut engine = LayoutEngine::new(&mut buffer, theme, order);
        let (cursor, range) = engine.write_table(table, auto_width).unwrap();
        (buffer, cursor, range)
    }

    #[test]
    fn test_data_range_accounts_for_header_elements() {
        let theme = default_theme();
        let table = Table::new("stats", dataset())
            .with_title("Iris statistics")
            .with_subtitles(vec![Value::text("By species")]);

        let (buffer, _, range) = write(&table, &theme, &ReferenceOrder::empty(), false);

        // Title and one subtitle occupy rows 0..2, so the block starts at 2.
        assert_eq!(range, DataRange::new(2, 0, 4, 1));
        assert_eq!(buffer.text_at(0, 0).as_deref(), Some("Iris statistics"));
        assert_eq!(buffer.text_at(2, 0).as_deref(), Some("Class"));
        assert_eq!(buffer.text_at(4, 1).as_deref(), Some("6.6"));
    }

    #[test]
    fn test_title_references_are_resolved() {
        let theme = default_theme();
        let table = Table::new("stats", dataset()).with_title("Stats$$n1$$");
        let order = ReferenceOrder::from_keys(vec!["n1".to_string()]);

        let (buffer, _, range) = write(&table, &theme, &order, false);

        assert_eq!(buffer.text_at(0, 0).as_deref(), Some("Stats[note 1]"));
        assert_eq!(range, DataRange::new(1, 0, 3, 1));
    }

    #[test]
    fn test_missing_values_are_substituted_and_legend_extended() {
        let theme = default_theme();
        let data = Dataset::new(
            vec!["Class".to_string(), "Mean".to_string()],
            vec![
                vec![Value::text("setosa"), Value::Missing],
                vec![Value::text("virginica"), Value::Number(6.6)],
            ],
        )
        .unwrap();
        let table = Table::new("stats", data);

        let (buffer, _, range) = write(&table, &theme, &ReferenceOrder::empty(), false);

        // The sentinel is written as the marker, centred.
        let cell = buffer.cell(range.top + 1, 1).unwrap();
        assert_eq!(cell.display_text(), ":");
        assert_eq!(
            cell.format.get("align"),
            Some(&FormatValue::Text("center".to_string()))
        );
        // Exactly one legend entry, written in the footer.
        let legend_texts: Vec<String> = buffer
            .cells()
            .map(|(_, cell)| cell.display_text())
            .filter(|text| text == ": not available")
            .collect();
        assert_eq!(legend_texts.len(), 1);
    }

    #[test]
    fn test_missing_value_without_marker_is_fatal() {
        let theme = bare_theme();
        let data = Dataset::new(
            vec!["a".to_string()],
            vec![vec![Value::Missing]],
        )
        .unwrap();
        let table = Table::new("stats", data);

        let mut buffer = SheetBuffer::new();
        let order = ReferenceOrder::empty();
        let mut engine = LayoutEngine::new(&mut buffer, &theme, &order);
        let result = engine.write_table(&table, false);

        assert!(matches!(result, Err(EngineError::MissingMarker(_))));
        assert_eq!(buffer.n_cells(), 0);
    }

    #[test]
    fn test_blank_cell_is_rejected_before_any_write() {
        let theme = bare_theme();
        let data = Dataset::new(
            vec!["a".to_string()],
            vec![vec![Value::text("")]],
        )
        .unwrap();
        let table = Table::new("stats", data).with_title("A title");

        let mut buffer = SheetBuffer::new();
        let order = ReferenceOrder::empty();
        let mut engine = LayoutEngine::new(&mut buffer, &theme, &order);
        let result = engine.write_table(&table, false);

        assert!(matches!(result, Err(EngineError::Validation(_))));
        // Validation runs before emission, so not even the title landed.
        assert_eq!(buffer.n_cells(), 0);
    }

    #[test]
    fn test_marker_valued_cell_is_allowed() {
        let theme = default_theme();
        let data = Dataset::new(
            vec!["a".to_string()],
            vec![vec![Value::text(":")]],
        )
        .unwrap();
        let table = Table::new("stats", data);

        let (buffer, _, range) = write(&table, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(buffer.text_at(range.top + 1, 0).as_deref(), Some(":"));
    }

    #[test]
    fn test_scope_row_advances_for_either_scope_or_units() {
        let theme = default_theme();

        // Scope only.
        let scope_only = Table::new("stats", dataset()).with_scope("England and Wales");
        let (_, _, range) = write(&scope_only, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(range.top, 1);

        // Units only.
        let units_only = Table::new("stats", dataset())
            .with_units(Units::Single("cm".to_string()))
            .unwrap();
        let (buffer, _, range) = write(&units_only, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(range.top, 1);
        assert_eq!(buffer.text_at(0, 1).as_deref(), Some("cm"));

        // Both share one row.
        let both = Table::new("stats", dataset())
            .with_scope("England and Wales")
            .with_units(Units::Single("cm".to_string()))
            .unwrap();
        let (buffer, _, range) = write(&both, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(range.top, 1);
        assert_eq!(buffer.text_at(0, 0).as_deref(), Some("England and Wales"));
        assert_eq!(buffer.text_at(0, 1).as_deref(), Some("cm"));
    }

    #[test]
    fn test_index_headings_blanked_unless_requested() {
        let theme = default_theme();
        let table = Table::new("stats", dataset()).with_index_column(1, 0);

        let (buffer, _, range) = write(&table, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(
            buffer.cell(range.top, 0).map(|c| c.content.clone()),
            Some(CellContent::Blank)
        );
        // The region still carries the real header entry.
        assert_eq!(buffer.regions()[0].1[0], "Class");

        let shown = table.clone().with_show_index_column_headings(true);
        let (buffer, _, range) = write(&shown, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(buffer.text_at(range.top, 0).as_deref(), Some("Class"));
    }

    #[test]
    fn test_auto_width_emits_column_widths() {
        let theme = default_theme();
        let table = Table::new("stats", dataset());

        let (buffer, _, _) = write(&table, &theme, &ReferenceOrder::empty(), true);
        // "virginica" is the longest line in column 0.
        assert!(buffer.column_width(0).unwrap() > 0.0);
        assert!(buffer.column_width(0).unwrap() > buffer.column_width(1).unwrap());

        let (without, _, _) = write(&table, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(without.column_width(0), None);
    }

    #[test]
    fn test_hyperlink_cells_use_the_hyperlink_operation() {
        let theme = default_theme();
        let table = Table::new("stats", dataset())
            .with_source("Source: [ONS](https://www.ons.gov.uk)");

        let (buffer, _, _) = write(&table, &theme, &ReferenceOrder::empty(), false);

        let hyperlink = buffer.cells().find_map(|(_, cell)| match &cell.content {
            CellContent::Hyperlink { url, display } => Some((url.clone(), display.clone())),
            _ => None,
        });
        assert_eq!(
            hyperlink,
            Some((
                "https://www.ons.gov.uk".to_string(),
                "Source: ONS".to_string()
            ))
        );
    }

    #[test]
    fn test_footer_annotations_render_with_their_markers() {
        let theme = default_theme();
        let table = Table::new("stats", dataset())
            .with_title("Stats$$n1$$")
            .with_annotations(vec![("n1".to_string(), Value::text("Provisional."))]);
        let order = ReferenceOrder::build(&[&table], &theme).unwrap();

        let (buffer, _, _) = write(&table, &theme, &order, false);

        let rendered = buffer
            .cells()
            .map(|(_, cell)| cell.display_text())
            .any(|text| text == "[note 1]: Provisional.");
        assert!(rendered);
    }

    #[test]
    fn test_tables_stack_with_one_blank_row() {
        let theme = default_theme();
        let first = Table::new("first", dataset()).with_title("First");
        let second = Table::new("second", dataset()).with_title("Second");

        let mut buffer = SheetBuffer::new();
        let order = ReferenceOrder::empty();
        let mut engine = LayoutEngine::new(&mut buffer, &theme, &order);
        let (cursor_after_first, first_range) = engine.write_table(&first, false).unwrap();
        let (_, second_range) = engine.write_table(&second, false).unwrap();

        assert!(second_range.top > first_range.bottom);
        assert_eq!(cursor_after_first.0, first_range.bottom + 2);
        // The separator row holds nothing.
        assert_eq!(buffer.text_at(first_range.bottom + 1, 0), None);
        assert_eq!(
            buffer.text_at(second_range.top - 1, 0).as_deref(),
            Some("Second")
        );
    }

    #[test]
    fn test_description_legend_receives_missing_entry() {
        // Legend placed above the table still gains the missing entry,
        // because the block is prepared before anything is emitted.
        let config: ThemeConfig = serde_json::from_value(serde_json::json!({
            "description_order": ["legend"],
            "missing_value": ":"
        }))
        .unwrap();
        let theme = Theme::from_config("legend-first", config).unwrap();
        let data = Dataset::new(
            vec!["a".to_string()],
            vec![vec![Value::Missing]],
        )
        .unwrap();
        let table = Table::new("stats", data);

        let (buffer, _, range) = write(&table, &theme, &ReferenceOrder::empty(), false);
        assert_eq!(range.top, 1);
        assert_eq!(buffer.text_at(0, 0).as_deref(), Some(": not available"));
    }

    #[test]
    fn test_additional_formatting_precedence_on_heading_cell() {
        let theme = default_theme();
        let table = Table::new("stats", dataset()).with_additional_formatting(vec![
            crate::directive::AdditionalFormat::column(
                vec![ColumnSelector::from(0usize)],
                FormatMap::new().with("bold", true),
            ),
            crate::directive::AdditionalFormat::cell((0, 0), FormatMap::new().with("italic", true)),
        ]);

        let (buffer, _, range) = write(&table, &theme, &ReferenceOrder::empty(), false);
        let format = &buffer.cell(range.top, 0).unwrap().format;
        assert_eq!(format.get("bold"), Some(&FormatValue::Bool(true)));
        assert_eq!(format.get("italic"), Some(&FormatValue::Bool(true)));
    }
}
