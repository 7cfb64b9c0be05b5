//! FILENAME: engine/src/width.rs
//! PURPOSE: Suggested column widths from rendered text and font size.
//! CONTEXT: A heuristic, not a measurement. The longest rendered line in
//! a column (headers included) is scaled by the largest font size used in
//! that column's resolved formats. Monotonically non-decreasing in both
//! length and font size.

use crate::cell::Value;
use crate::style::FormatMap;

/// Font size assumed when a column's formats do not set one.
pub const DEFAULT_FONT_SIZE: f64 = 10.0;

/// The width suggested for a line of `length` characters at `font_size`.
/// Empty columns get width 0.
pub fn estimate_width(length: usize, font_size: f64) -> f64 {
    if length == 0 {
        return 0.0;
    }
    length as f64 * (font_size * 0.12 - 0.09)
}

/// Estimate one width per column of a header+data block, pairing each
/// column's longest rendered line with its largest configured font size.
pub fn estimate_column_widths(block: &[Vec<Value>], formats: &[Vec<FormatMap>]) -> Vec<f64> {
    let n_cols = block.first().map_or(0, Vec::len);
    let mut widths = Vec::with_capacity(n_cols);

    for col in 0..n_cols {
        let length = block
            .iter()
            .filter_map(|row| row.get(col))
            .map(longest_line)
            .max()
            .unwrap_or(0);
        let font_size = formats
            .iter()
            .filter_map(|row| row.get(col))
            .filter_map(FormatMap::font_size)
            .fold(DEFAULT_FONT_SIZE, f64::max);
        widths.push(estimate_width(length, font_size));
    }

    widths
}

/// Character count of the longest line in a value's rendered text.
/// Handles both `\n` and `\r\n` line breaks.
fn longest_line(value: &Value) -> usize {
    value
        .display_text()
        .split('\n')
        .map(|line| line.trim_end_matches('\r').chars().count())
        .max()
        .unwrap_or(0)
}
