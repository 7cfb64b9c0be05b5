//! FILENAME: engine/src/reference.rs
//! PURPOSE: Footnote reference discovery and renumbering.
//! CONTEXT: Inline markers (`$$key$$`) are rewritten into sequential
//! display markers (`[note k]`) against a single reference order computed
//! once per output run, before any sheet is written. Scanning always walks
//! the same field order, so two tables that use the same key receive the
//! same number. Resolution works on a deep copy; the source table is
//! never mutated.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cell::Value;
use crate::error::EngineError;
use crate::table::Table;
use crate::theme::{DescriptionElement, FooterElement, Theme};

/// An inline reference marker: text flanked by `$$` on each side.
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\$(.+?)\$\$").unwrap_or_else(|_| unreachable!("marker pattern is valid"))
});

// ============================================================================
// REFERENCE ORDER
// ============================================================================

/// The process-scoped, first-appearance order of footnote reference keys.
/// Read-only once built; consulted by every table of the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceOrder {
    keys: Vec<String>,
}

impl ReferenceOrder {
    /// An empty order, for output runs that use no references.
    pub fn empty() -> Self {
        ReferenceOrder::default()
    }

    /// An order with explicitly given keys, mostly useful in tests and
    /// for callers that manage definitions themselves.
    pub fn from_keys(keys: Vec<String>) -> Self {
        ReferenceOrder { keys }
    }

    /// Scan every table in the fixed field order (title, subtitles,
    /// description elements as configured, units, column headers, footer
    /// elements as configured) and append each newly seen key once.
    ///
    /// A scanned key with no definition in any table's annotations is a
    /// fatal reference error. Definitions never referenced anywhere are
    /// appended at the end in their original order and logged as warnings.
    pub fn build(tables: &[&Table], theme: &Theme) -> Result<Self, EngineError> {
        let mut order = ReferenceOrder::default();
        for table in tables {
            for key in scan_table(table, theme) {
                if !order.keys.contains(&key) {
                    order.keys.push(key);
                }
            }
        }

        for key in &order.keys {
            let defined = tables.iter().any(|t| t.annotations.contains_key(key));
            if !defined {
                return Err(EngineError::Reference(format!(
                    "reference `{}` is used but never defined in any table's annotations",
                    key
                )));
            }
        }

        // Unused definitions keep their numbers at the tail of the order.
        for table in tables {
            for key in table.annotations.keys() {
                if !order.keys.contains(key) {
                    log::warn!(
                        "annotation `{}` in table `{}` is never referenced",
                        key,
                        table.name
                    );
                    order.keys.push(key.clone());
                }
            }
        }

        Ok(order)
    }

    /// 0-based position of a key, if present.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// The display marker for a key: `[note k]` with k 1-indexed.
    pub fn marker(&self, key: &str) -> Option<String> {
        self.position(key).map(|pos| format!("[note {}]", pos + 1))
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Collect marker keys from one table, in the agreed field order.
fn scan_table(table: &Table, theme: &Theme) -> Vec<String> {
    let mut keys = Vec::new();

    scan_optional(&table.title, &mut keys);
    scan_values(&table.subtitles, &mut keys);
    for element in &theme.description_order {
        match element {
            DescriptionElement::Instructions => scan_optional(&table.instructions, &mut keys),
            DescriptionElement::Source => scan_optional(&table.source, &mut keys),
            DescriptionElement::Scope => scan_optional(&table.scope, &mut keys),
            DescriptionElement::Legend => scan_values(&table.legend, &mut keys),
        }
    }
    if let Some(units) = &table.units {
        scan_text(units, &mut keys);
    }
    scan_values(table.headers(), &mut keys);
    for element in &theme.footer_order {
        match element {
            FooterElement::Source => scan_optional(&table.source, &mut keys),
            FooterElement::Legend => scan_values(&table.legend, &mut keys),
            FooterElement::Notes => scan_values(&table.notes, &mut keys),
            // Annotation texts are definitions, not consumers.
            FooterElement::Annotations => {}
        }
    }

    keys
}

fn scan_optional(value: &Option<Value>, keys: &mut Vec<String>) {
    if let Some(value) = value {
        scan_value(value, keys);
    }
}

fn scan_values(values: &[Value], keys: &mut Vec<String>) {
    for value in values {
        scan_value(value, keys);
    }
}

fn scan_value(value: &Value, keys: &mut Vec<String>) {
    match value {
        Value::Text(text) => scan_text(text, keys),
        Value::Rich(list) => {
            for segment in list.segments() {
                scan_text(segment.text(), keys);
            }
        }
        Value::Link { display, .. } => scan_text(display, keys),
        Value::Missing | Value::Number(_) | Value::Boolean(_) => {}
    }
}

fn scan_text(text: &str, keys: &mut Vec<String>) {
    for caps in MARKER_RE.captures_iter(text) {
        if let Some(key) = caps.get(1) {
            keys.push(key.as_str().to_string());
        }
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Rewrite every `$$key$$` marker in a deep copy of the table into its
/// `[note k]` display marker. The source table is never touched, so a
/// shared table template can be resolved repeatedly against different
/// orders. This is also the narrow "resolve references only" operation
/// used by contents-style consumers.
pub fn resolve_references(table: &Table, order: &ReferenceOrder) -> Result<Table, EngineError> {
    let mut resolved = table.clone();

    resolve_optional(&mut resolved.title, order)?;
    resolve_values(&mut resolved.subtitles, order)?;
    resolve_optional(&mut resolved.instructions, order)?;
    resolve_optional(&mut resolved.scope, order)?;
    resolve_optional(&mut resolved.source, order)?;
    resolve_values(&mut resolved.legend, order)?;
    resolve_values(&mut resolved.notes, order)?;
    if let Some(units) = resolved.units.take() {
        resolved.units = Some(resolve_text(&units, order)?);
    }
    for header in resolved.headers_mut() {
        resolve_value(header, order)?;
    }
    for annotation in resolved.annotations.values_mut() {
        resolve_value(annotation, order)?;
    }
    for row in resolved.dataset_mut().rows_mut() {
        for cell in row {
            resolve_value(cell, order)?;
        }
    }

    Ok(resolved)
}

fn resolve_optional(value: &mut Option<Value>, order: &ReferenceOrder) -> Result<(), EngineError> {
    if let Some(value) = value {
        resolve_value(value, order)?;
    }
    Ok(())
}

fn resolve_values(values: &mut [Value], order: &ReferenceOrder) -> Result<(), EngineError> {
    for value in values {
        resolve_value(value, order)?;
    }
    Ok(())
}

fn resolve_value(value: &mut Value, order: &ReferenceOrder) -> Result<(), EngineError> {
    match value {
        Value::Text(text) => {
            *text = resolve_text(text, order)?;
        }
        Value::Rich(list) => {
            for segment in list.segments_mut() {
                let text = segment.text_mut();
                *text = resolve_text(text, order)?;
            }
        }
        Value::Link { display, .. } => {
            *display = resolve_text(display, order)?;
        }
        Value::Missing | Value::Number(_) | Value::Boolean(_) => {}
    }
    Ok(())
}

fn resolve_text(text: &str, order: &ReferenceOrder) -> Result<String, EngineError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in MARKER_RE.captures_iter(text) {
        let (whole, key) = match (caps.get(0), caps.get(1)) {
            (Some(whole), Some(key)) => (whole, key),
            _ => continue,
        };
        let marker = order.marker(key.as_str()).ok_or_else(|| {
            EngineError::Reference(format!(
                "reference `{}` has no entry in the reference order",
                key.as_str()
            ))
        })?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(&marker);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Dataset;
    use crate::theme::default_theme;

    fn table_with_title(title: &str) -> Table {
        let dataset = Dataset::new(
            vec!["Class".to_string(), "Mean".to_string()],
            vec![vec![Value::text("setosa"), Value::Number(5.0)]],
        )
        .unwrap();
        Table::new("stats", dataset).with_title(title)
    }

    #[test]
    fn test_resolution_is_deterministic_for_a_fixed_order() {
        let order = ReferenceOrder::from_keys(vec!["n1".to_string(), "n2".to_string()]);
        let resolved = resolve_text("Deaths$$n2$$ by area$$n1$$", &order).unwrap();
        assert_eq!(resolved, "Deaths[note 2] by area[note 1]");
        assert!(!resolved.contains("$$"));
    }

    #[test]
    fn test_unknown_key_is_a_reference_error() {
        let order = ReferenceOrder::from_keys(vec!["n1".to_string()]);
        let result = resolve_text("Deaths$$nope$$", &order);
        assert!(matches!(result, Err(EngineError::Reference(_))));
    }

    #[test]
    fn test_source_table_is_never_mutated() {
        let table = table_with_title("Stats$$n1$$")
            .with_annotations(vec![("n1".to_string(), Value::text("Provisional."))]);
        let order = ReferenceOrder::from_keys(vec!["n1".to_string()]);

        let resolved = resolve_references(&table, &order).unwrap();

        assert_eq!(
            resolved.title.as_ref().map(Value::display_text),
            Some("Stats[note 1]".to_string())
        );
        assert_eq!(
            table.title.as_ref().map(Value::display_text),
            Some("Stats$$n1$$".to_string())
        );
    }

    #[test]
    fn test_build_assigns_first_appearance_order() {
        let theme = default_theme();
        let first = table_with_title("A$$x$$ and $$y$$")
            .with_annotations(vec![
                ("x".to_string(), Value::text("x note")),
                ("y".to_string(), Value::text("y note")),
            ]);
        let second = table_with_title("B$$y$$")
            .with_annotations(vec![("y".to_string(), Value::text("y note"))]);

        let order = ReferenceOrder::build(&[&first, &second], &theme).unwrap();

        assert_eq!(order.keys(), &["x".to_string(), "y".to_string()]);
        // The shared key resolves to the same number in both tables.
        assert_eq!(order.marker("y").as_deref(), Some("[note 2]"));
    }

    #[test]
    fn test_build_rejects_undefined_reference() {
        let theme = default_theme();
        let table = table_with_title("A$$ghost$$");
        let result = ReferenceOrder::build(&[&table], &theme);
        assert!(matches!(result, Err(EngineError::Reference(_))));
    }

    #[test]
    fn test_unused_definitions_are_appended_in_original_order() {
        let theme = default_theme();
        let table = table_with_title("A$$used$$").with_annotations(vec![
            ("spare_a".to_string(), Value::text("first spare")),
            ("used".to_string(), Value::text("used note")),
            ("spare_b".to_string(), Value::text("second spare")),
        ]);

        let order = ReferenceOrder::build(&[&table], &theme).unwrap();

        assert_eq!(
            order.keys(),
            &[
                "used".to_string(),
                "spare_a".to_string(),
                "spare_b".to_string()
            ]
        );
    }

    #[test]
    fn test_headers_are_scanned_after_metadata() {
        let theme = default_theme();
        let dataset = Dataset::new(
            vec!["Class$$h$$".to_string(), "Mean".to_string()],
            vec![vec![Value::text("setosa"), Value::Number(5.0)]],
        )
        .unwrap();
        let table = Table::new("stats", dataset)
            .with_title("Title$$t$$")
            .with_annotations(vec![
                ("h".to_string(), Value::text("header note")),
                ("t".to_string(), Value::text("title note")),
            ]);

        let order = ReferenceOrder::build(&[&table], &theme).unwrap();
        assert_eq!(order.keys(), &["t".to_string(), "h".to_string()]);
    }
}
