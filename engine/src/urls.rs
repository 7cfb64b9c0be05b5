//! FILENAME: engine/src/urls.rs
//! PURPOSE: Markdown-style hyperlink detection.
//! CONTEXT: A `[display](url)` pattern in any text field or dataset cell
//! turns the whole value into a structured link: the pattern is replaced
//! by its display text within the surrounding string and the URL is
//! carried alongside. One spreadsheet cell holds at most one hyperlink,
//! so a second pattern in the same scalar value is a validation error.
//! Runs on the layout engine's working copy, after reference resolution.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cell::Value;
use crate::error::EngineError;
use crate::table::Table;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap_or_else(|_| unreachable!("link pattern is valid"))
});

/// Sweep every text-bearing field and every dataset cell of the table,
/// converting link patterns into `Value::Link`. The table is mutated in
/// place; callers hand over their working copy.
pub fn resolve_urls(table: &mut Table) -> Result<(), EngineError> {
    resolve_optional(&mut table.title)?;
    resolve_values(&mut table.subtitles)?;
    resolve_optional(&mut table.instructions)?;
    resolve_optional(&mut table.scope)?;
    resolve_optional(&mut table.source)?;
    resolve_values(&mut table.legend)?;
    resolve_values(&mut table.notes)?;
    for annotation in table.annotations.values_mut() {
        resolve_url_value(annotation)?;
    }
    for header in table.headers_mut() {
        resolve_url_value(header)?;
    }
    for row in table.dataset_mut().rows_mut() {
        for cell in row {
            resolve_url_value(cell)?;
        }
    }
    Ok(())
}

fn resolve_optional(value: &mut Option<Value>) -> Result<(), EngineError> {
    if let Some(value) = value {
        resolve_url_value(value)?;
    }
    Ok(())
}

fn resolve_values(values: &mut [Value]) -> Result<(), EngineError> {
    for value in values {
        resolve_url_value(value)?;
    }
    Ok(())
}

/// Convert one value. Already-resolved links are left alone, so the
/// parser is idempotent.
pub fn resolve_url_value(value: &mut Value) -> Result<(), EngineError> {
    match value {
        Value::Text(text) => {
            if let Some((display, url)) = extract_link(text)? {
                *value = Value::Link { display, url };
            }
        }
        Value::Rich(list) => {
            // A link inside rich text collapses to a plain link cell;
            // the cell can only carry one format alongside a hyperlink.
            let text = list.text();
            if let Some((display, url)) = extract_link(&text)? {
                *value = Value::Link { display, url };
            }
        }
        Value::Link { .. } | Value::Missing | Value::Number(_) | Value::Boolean(_) => {}
    }
    Ok(())
}

/// Find the link pattern in a scalar text. Returns the surrounding text
/// with the pattern replaced by its display part, plus the URL.
fn extract_link(text: &str) -> Result<Option<(String, String)>, EngineError> {
    let mut matches = URL_RE.captures_iter(text);
    let caps = match matches.next() {
        Some(caps) => caps,
        None => return Ok(None),
    };
    if matches.next().is_some() {
        return Err(EngineError::Validation(format!(
            "`{}` contains more than one hyperlink; a cell can hold only one",
            text
        )));
    }
    let (whole, display, url) = match (caps.get(0), caps.get(1), caps.get(2)) {
        (Some(whole), Some(display), Some(url)) => (whole, display, url),
        _ => return Ok(None),
    };
    let mut rewritten = String::with_capacity(text.len());
    rewritten.push_str(&text[..whole.start()]);
    rewritten.push_str(display.as_str());
    rewritten.push_str(&text[whole.end()..]);
    Ok(Some((rewritten, url.as_str().to_string())))
}
