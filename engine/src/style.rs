//! FILENAME: engine/src/style.rs
//! PURPOSE: The format-attribute model shared by themes, directives and cells.
//! CONTEXT: Formats are open attribute maps rather than a closed struct so
//! that theme defaults, computed overrides and user directives can be merged
//! layer by layer, later layers winning per attribute while distinct
//! attributes from every layer survive. Attribute names are validated
//! against the backend's enumerated allow-list.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Style attribute names the sheet backend recognises.
///
/// This is the introspectable set referred to by the `SheetWriter` boundary;
/// the XLSX adapter realises each of these against `rust_xlsxwriter`.
pub const FORMAT_ATTRIBUTES: &[&str] = &[
    "font_name",
    "font_size",
    "font_color",
    "bold",
    "italic",
    "underline",
    "font_strikeout",
    "num_format",
    "align",
    "valign",
    "text_wrap",
    "rotation",
    "indent",
    "bg_color",
    "fg_color",
    "border",
    "top",
    "bottom",
    "left",
    "right",
    "border_color",
];

/// A single format attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for FormatValue {
    fn from(value: bool) -> Self {
        FormatValue::Bool(value)
    }
}

impl From<f64> for FormatValue {
    fn from(value: f64) -> Self {
        FormatValue::Number(value)
    }
}

impl From<i32> for FormatValue {
    fn from(value: i32) -> Self {
        FormatValue::Number(value as f64)
    }
}

impl From<&str> for FormatValue {
    fn from(value: &str) -> Self {
        FormatValue::Text(value.to_string())
    }
}

impl From<String> for FormatValue {
    fn from(value: String) -> Self {
        FormatValue::Text(value)
    }
}

/// An ordered attribute -> value mapping describing one cell style.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatMap {
    attributes: IndexMap<String, FormatValue>,
}

impl FormatMap {
    pub fn new() -> Self {
        FormatMap {
            attributes: IndexMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<FormatValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace one attribute.
    pub fn set(&mut self, name: &str, value: impl Into<FormatValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FormatValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormatValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge another map into this one. Attributes present in `other`
    /// replace existing values; attributes only present here survive.
    pub fn merge_from(&mut self, other: &FormatMap) {
        for (name, value) in other.iter() {
            self.attributes.insert(name.to_string(), value.clone());
        }
    }

    /// A copy of this map with `other` merged on top.
    pub fn merged_with(&self, other: &FormatMap) -> FormatMap {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    /// The first attribute name not present in the backend allow-list.
    pub fn first_unknown_attribute(&self) -> Option<&str> {
        self.attributes
            .keys()
            .map(String::as_str)
            .find(|name| !FORMAT_ATTRIBUTES.contains(name))
    }

    /// The `font_size` attribute as a number, if set.
    pub fn font_size(&self) -> Option<f64> {
        match self.get("font_size") {
            Some(FormatValue::Number(size)) => Some(*size),
            _ => None,
        }
    }
}

impl FromIterator<(String, FormatValue)> for FormatMap {
    fn from_iter<T: IntoIterator<Item = (String, FormatValue)>>(iter: T) -> Self {
        FormatMap {
            attributes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_later_layer_wins_per_attribute() {
        let mut base = FormatMap::new().with("bold", true).with("font_size", 12);
        let overlay = FormatMap::new().with("font_size", 9).with("italic", true);

        base.merge_from(&overlay);

        assert_eq!(base.get("bold"), Some(&FormatValue::Bool(true)));
        assert_eq!(base.get("italic"), Some(&FormatValue::Bool(true)));
        assert_eq!(base.get("font_size"), Some(&FormatValue::Number(9.0)));
    }

    #[test]
    fn test_unknown_attribute_detection() {
        let valid = FormatMap::new().with("bold", true).with("align", "center");
        assert_eq!(valid.first_unknown_attribute(), None);

        let invalid = FormatMap::new().with("bold", true).with("blink", true);
        assert_eq!(invalid.first_unknown_attribute(), Some("blink"));
    }

    #[test]
    fn test_font_size_probe() {
        let fmt = FormatMap::new().with("font_size", 14);
        assert_eq!(fmt.font_size(), Some(14.0));
        assert_eq!(FormatMap::new().font_size(), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let fmt = FormatMap::new()
            .with("bold", true)
            .with("font_size", 10)
            .with("font_color", "#FF0000");
        let json = serde_json::to_string(&fmt).unwrap();
        let back: FormatMap = serde_json::from_str(&json).unwrap();
        assert_eq!(fmt, back);
    }
}
