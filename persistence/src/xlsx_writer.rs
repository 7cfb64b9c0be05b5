//! FILENAME: persistence/src/xlsx_writer.rs
//! PURPOSE: The XLSX implementation of the engine's sheet backend.
//! CONTEXT: Adapts one `rust_xlsxwriter` worksheet to the `SheetWriter`
//! boundary. Engine format maps are converted attribute by attribute into
//! `rust_xlsxwriter::Format` values; the attribute vocabulary matches the
//! engine's allow-list, so an unconvertible attribute here means the two
//! sides disagree and is surfaced as a backend error.

use engine::{
    DataRange, EngineError, FormatList, FormatMap, FormatValue, Segment, SheetWriter, Value,
};
use rust_xlsxwriter::{
    Format, FormatAlign, FormatBorder, FormatUnderline, Table, TableColumn, TableStyle, Url,
    Worksheet,
};

/// Writes engine output onto one `rust_xlsxwriter` worksheet.
pub struct XlsxSheetWriter<'a> {
    worksheet: &'a mut Worksheet,
}

impl<'a> XlsxSheetWriter<'a> {
    pub fn new(worksheet: &'a mut Worksheet) -> Self {
        XlsxSheetWriter { worksheet }
    }
}

fn backend_err(error: rust_xlsxwriter::XlsxError) -> EngineError {
    EngineError::Backend(error.to_string())
}

impl SheetWriter for XlsxSheetWriter<'_> {
    fn write_cell(
        &mut self,
        row: u32,
        col: u32,
        value: &Value,
        format: &FormatMap,
    ) -> Result<(), EngineError> {
        let fmt = convert_format(format)?;
        match value {
            Value::Text(text) => {
                self.worksheet
                    .write_string_with_format(row, col as u16, text, &fmt)
                    .map_err(backend_err)?;
            }
            Value::Number(n) => {
                self.worksheet
                    .write_number_with_format(row, col as u16, *n, &fmt)
                    .map_err(backend_err)?;
            }
            Value::Boolean(b) => {
                self.worksheet
                    .write_boolean_with_format(row, col as u16, *b, &fmt)
                    .map_err(backend_err)?;
            }
            Value::Missing => {
                self.worksheet
                    .write_blank(row, col as u16, &fmt)
                    .map_err(backend_err)?;
            }
            Value::Rich(list) => {
                return self.write_rich_text(row, col, list, format);
            }
            Value::Link { display, url } => {
                return self.write_hyperlink(row, col, url, display, format);
            }
        }
        Ok(())
    }

    fn write_rich_text(
        &mut self,
        row: u32,
        col: u32,
        segments: &FormatList,
        format: &FormatMap,
    ) -> Result<(), EngineError> {
        let cell_format = convert_format(format)?;
        let mut converted: Vec<(Format, String)> = Vec::with_capacity(segments.segments().len());
        for segment in segments.segments() {
            match segment {
                Segment::Plain(text) => {
                    converted.push((cell_format.clone(), text.clone()));
                }
                Segment::Styled(overrides, text) => {
                    let merged = format.merged_with(overrides);
                    converted.push((convert_format(&merged)?, text.clone()));
                }
            }
        }
        let pairs: Vec<(&Format, &str)> = converted
            .iter()
            .map(|(fmt, text)| (fmt, text.as_str()))
            .collect();
        self.worksheet
            .write_rich_string_with_format(row, col as u16, &pairs, &cell_format)
            .map_err(backend_err)?;
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
        let fmt = convert_format(format)?;
        let link = Url::new(url).set_text(display);
        self.worksheet
            .write_url_with_format(row, col as u16, link, &fmt)
            .map_err(backend_err)?;
        Ok(())
    }

    fn write_blank(&mut self, row: u32, col: u32, format: &FormatMap) -> Result<(), EngineError> {
        let fmt = convert_format(format)?;
        self.worksheet
            .write_blank(row, col as u16, &fmt)
            .map_err(backend_err)?;
        Ok(())
    }

    fn set_column_width(&mut self, col: u32, width: f64) -> Result<(), EngineError> {
        self.worksheet
            .set_column_width(col as u16, width)
            .map_err(backend_err)?;
        Ok(())
    }

    fn register_table_region(
        &mut self,
        range: &DataRange,
        column_headers: &[String],
    ) -> Result<(), EngineError> {
        // A worksheet table needs at least one data row below its header.
        if range.bottom == range.top {
            log::debug!("skipping table markup for header-only range {}", range.to_a1());
            return Ok(());
        }
        let columns: Vec<TableColumn> = column_headers
            .iter()
            .map(|header| TableColumn::new().set_header(header))
            .collect();
        let table = Table::new()
            .set_columns(&columns)
            .set_header_row(true)
            .set_autofilter(false)
            .set_style(TableStyle::None);
        self.worksheet
            .add_table(
                range.top,
                range.left as u16,
                range.bottom,
                range.right as u16,
                &table,
            )
            .map_err(backend_err)?;
        Ok(())
    }
}

// ============================================================================
// FORMAT CONVERSION
// ============================================================================

/// Convert an engine format map into a `rust_xlsxwriter::Format`.
pub(crate) fn convert_format(map: &FormatMap) -> Result<Format, EngineError> {
    let mut format = Format::new();

    for (name, value) in map.iter() {
        format = match (name, value) {
            ("font_name", FormatValue::Text(family)) => format.set_font_name(family),
            ("font_size", FormatValue::Number(size)) => format.set_font_size(*size),
            ("font_color", FormatValue::Text(color)) => {
                format.set_font_color(parse_color(color)?)
            }
            ("bold", FormatValue::Bool(flag)) => {
                if *flag {
                    format.set_bold()
                } else {
                    format
                }
            }
            ("italic", FormatValue::Bool(flag)) => {
                if *flag {
                    format.set_italic()
                } else {
                    format
                }
            }
            ("underline", FormatValue::Bool(flag)) => {
                if *flag {
                    format.set_underline(FormatUnderline::Single)
                } else {
                    format
                }
            }
            ("font_strikeout", FormatValue::Bool(flag)) => {
                if *flag {
                    format.set_font_strikethrough()
                } else {
                    format
                }
            }
            ("num_format", FormatValue::Text(pattern)) => format.set_num_format(pattern),
            ("align", FormatValue::Text(align)) => format.set_align(horizontal_align(align)?),
            ("valign", FormatValue::Text(align)) => format.set_align(vertical_align(align)?),
            ("text_wrap", FormatValue::Bool(flag)) => {
                if *flag {
                    format.set_text_wrap()
                } else {
                    format
                }
            }
            ("rotation", FormatValue::Number(angle)) => format.set_rotation(*angle as i16),
            ("indent", FormatValue::Number(level)) => format.set_indent(*level as u8),
            ("bg_color", FormatValue::Text(color)) => {
                format.set_background_color(parse_color(color)?)
            }
            ("fg_color", FormatValue::Text(color)) => {
                format.set_foreground_color(parse_color(color)?)
            }
            ("border", FormatValue::Number(style)) => format.set_border(border_style(*style)?),
            ("top", FormatValue::Number(style)) => format.set_border_top(border_style(*style)?),
            ("bottom", FormatValue::Number(style)) => {
                format.set_border_bottom(border_style(*style)?)
            }
            ("left", FormatValue::Number(style)) => format.set_border_left(border_style(*style)?),
            ("right", FormatValue::Number(style)) => {
                format.set_border_right(border_style(*style)?)
            }
            ("border_color", FormatValue::Text(color)) => {
                format.set_border_color(parse_color(color)?)
            }
            (name, value) => {
                return Err(EngineError::Backend(format!(
                    "cannot realise format attribute `{}` with value {:?}",
                    name, value
                )));
            }
        };
    }

    Ok(format)
}

fn horizontal_align(name: &str) -> Result<FormatAlign, EngineError> {
    match name {
        "left" => Ok(FormatAlign::Left),
        "center" | "centre" => Ok(FormatAlign::Center),
        "right" => Ok(FormatAlign::Right),
        "fill" => Ok(FormatAlign::Fill),
        "justify" => Ok(FormatAlign::Justify),
        "center_across" => Ok(FormatAlign::CenterAcross),
        other => Err(EngineError::Backend(format!(
            "unknown horizontal alignment `{}`",
            other
        ))),
    }
}

fn vertical_align(name: &str) -> Result<FormatAlign, EngineError> {
    match name {
        "top" => Ok(FormatAlign::Top),
        "vcenter" => Ok(FormatAlign::VerticalCenter),
        "bottom" => Ok(FormatAlign::Bottom),
        "vjustify" => Ok(FormatAlign::VerticalJustify),
        other => Err(EngineError::Backend(format!(
            "unknown vertical alignment `{}`",
            other
        ))),
    }
}

/// XlsxWriter-style numeric border styles.
fn border_style(style: f64) -> Result<FormatBorder, EngineError> {
    match style as i64 {
        0 => Ok(FormatBorder::None),
        1 => Ok(FormatBorder::Thin),
        2 => Ok(FormatBorder::Medium),
        3 => Ok(FormatBorder::Dashed),
        4 => Ok(FormatBorder::Dotted),
        5 => Ok(FormatBorder::Thick),
        6 => Ok(FormatBorder::Double),
        7 => Ok(FormatBorder::Hair),
        other => Err(EngineError::Backend(format!(
            "unknown border style {}",
            other
        ))),
    }
}

/// Parse "#RRGGBB" / "RRGGBB" hex colors and a small set of names.
fn parse_color(text: &str) -> Result<rust_xlsxwriter::Color, EngineError> {
    match text {
        "black" => return Ok(rust_xlsxwriter::Color::Black),
        "white" => return Ok(rust_xlsxwriter::Color::White),
        "red" => return Ok(rust_xlsxwriter::Color::Red),
        "green" => return Ok(rust_xlsxwriter::Color::Green),
        "blue" => return Ok(rust_xlsxwriter::Color::Blue),
        "gray" | "grey" => return Ok(rust_xlsxwriter::Color::Gray),
        _ => {}
    }
    let hex = text.trim_start_matches('#');
    if hex.len() == 6 {
        if let Ok(rgb) = u32::from_str_radix(hex, 16) {
            return Ok(rust_xlsxwriter::Color::RGB(rgb));
        }
    }
    Err(EngineError::Backend(format!("unknown color `{}`", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // `Format` exposes no attribute getters, so conversions are compared
    // through their debug representations.
    fn assert_format_eq(left: &Format, right: &Format) {
        assert_eq!(format!("{:?}", left), format!("{:?}", right));
    }

    #[test]
    fn test_convert_basic_attributes() {
        let map = FormatMap::new()
            .with("bold", true)
            .with("font_size", 14)
            .with("align", "center");
        let converted = convert_format(&map).unwrap();
        let expected = Format::new()
            .set_bold()
            .set_font_size(14.0)
            .set_align(FormatAlign::Center);
        assert_format_eq(&converted, &expected);
    }

    #[test]
    fn test_false_flags_leave_format_untouched() {
        let map = FormatMap::new().with("bold", false).with("italic", false);
        assert_format_eq(&convert_format(&map).unwrap(), &Format::new());
    }

    #[test]
    fn test_border_attribute_conversion() {
        let map = FormatMap::new().with("bottom", 1);
        let expected = Format::new().set_border_bottom(FormatBorder::Thin);
        assert_format_eq(&convert_format(&map).unwrap(), &expected);
    }

    #[test]
    fn test_bad_alignment_is_a_backend_error() {
        let map = FormatMap::new().with("align", "sideways");
        assert!(matches!(
            convert_format(&map),
            Err(EngineError::Backend(_))
        ));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(
            parse_color("#FF0000").unwrap(),
            rust_xlsxwriter::Color::RGB(0xFF0000)
        );
        assert_eq!(
            parse_color("0000ff").unwrap(),
            rust_xlsxwriter::Color::RGB(0x0000FF)
        );
        assert_eq!(parse_color("black").unwrap(), rust_xlsxwriter::Color::Black);
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn test_border_style_mapping() {
        assert_eq!(border_style(1.0).unwrap(), FormatBorder::Thin);
        assert_eq!(border_style(6.0).unwrap(), FormatBorder::Double);
        assert!(border_style(12.0).is_err());
    }

    #[test]
    fn test_writer_accepts_engine_output() {
        let mut worksheet = Worksheet::new();
        let mut writer = XlsxSheetWriter::new(&mut worksheet);

        writer
            .write_cell(0, 0, &Value::text("Title"), &FormatMap::new().with("bold", true))
            .unwrap();
        writer
            .write_hyperlink(
                1,
                0,
                "https://example.org",
                "Example",
                &FormatMap::new(),
            )
            .unwrap();
        writer.write_blank(2, 0, &FormatMap::new()).unwrap();
        writer.set_column_width(0, 11.5).unwrap();
        writer
            .register_table_region(
                &DataRange::new(3, 0, 5, 1),
                &["Class".to_string(), "Mean".to_string()],
            )
            .unwrap();
    }
}
