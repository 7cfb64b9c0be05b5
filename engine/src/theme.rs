//! FILENAME: engine/src/theme.rs
//! PURPOSE: Named default formats and ordering rules shared by all tables
//! of one output run.
//! CONTEXT: A theme maps each table element kind to its default format and
//! fixes the order of the optional description and footer blocks. Themes
//! are validated completely at configuration time, before any table is
//! processed; an unrecognised element name or style attribute never makes
//! it into a `Theme` value.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::style::FormatMap;

// ============================================================================
// ELEMENT KINDS
// ============================================================================

/// Every element kind a theme can style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Title,
    Subtitle,
    Instructions,
    Scope,
    Source,
    Units,
    ColumnHeading,
    Index1,
    Index2,
    Index3,
    Data,
    Legend,
    Annotations,
    Notes,
}

/// Elements that may appear above the table block, in theme order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionElement {
    Instructions,
    Source,
    Scope,
    Legend,
}

/// Elements that may appear below the table block, in theme order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FooterElement {
    Source,
    Legend,
    Annotations,
    Notes,
}

// ============================================================================
// THEME
// ============================================================================

/// The validated style defaults and ordering rules for one output run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    title_format: FormatMap,
    subtitle_format: FormatMap,
    instructions_format: FormatMap,
    scope_format: FormatMap,
    source_format: FormatMap,
    units_format: FormatMap,
    column_heading_format: FormatMap,
    index_1_format: FormatMap,
    index_2_format: FormatMap,
    index_3_format: FormatMap,
    data_format: FormatMap,
    legend_format: FormatMap,
    annotations_format: FormatMap,
    notes_format: FormatMap,
    pub description_order: Vec<DescriptionElement>,
    pub footer_order: Vec<FooterElement>,
    pub missing_value: Option<String>,
}

impl Theme {
    /// Build a theme from a configuration mapping. Unknown element names
    /// are rejected by `ThemeConfig` deserialisation; unknown style
    /// attributes are rejected here.
    pub fn from_config(name: impl Into<String>, config: ThemeConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let seed = config.global.clone().unwrap_or_default();
        let resolve = |specific: &Option<FormatMap>| match specific {
            Some(map) => seed.merged_with(map),
            None => seed.clone(),
        };

        Ok(Theme {
            name: name.into(),
            title_format: resolve(&config.title),
            subtitle_format: resolve(&config.subtitle),
            instructions_format: resolve(&config.instructions),
            scope_format: resolve(&config.scope),
            source_format: resolve(&config.source),
            units_format: resolve(&config.units),
            column_heading_format: resolve(&config.column_heading),
            index_1_format: resolve(&config.index_1),
            index_2_format: resolve(&config.index_2),
            index_3_format: resolve(&config.index_3),
            data_format: resolve(&config.data),
            legend_format: resolve(&config.legend),
            annotations_format: resolve(&config.annotations),
            notes_format: resolve(&config.notes),
            description_order: config.description_order,
            footer_order: config.footer_order,
            missing_value: config.missing_value,
        })
    }

    /// The default format for one element kind.
    pub fn format_for(&self, element: Element) -> &FormatMap {
        match element {
            Element::Title => &self.title_format,
            Element::Subtitle => &self.subtitle_format,
            Element::Instructions => &self.instructions_format,
            Element::Scope => &self.scope_format,
            Element::Source => &self.source_format,
            Element::Units => &self.units_format,
            Element::ColumnHeading => &self.column_heading_format,
            Element::Index1 => &self.index_1_format,
            Element::Index2 => &self.index_2_format,
            Element::Index3 => &self.index_3_format,
            Element::Data => &self.data_format,
            Element::Legend => &self.legend_format,
            Element::Annotations => &self.annotations_format,
            Element::Notes => &self.notes_format,
        }
    }

    /// The element kind styling index columns of the given level.
    pub fn index_element(level: u8) -> Element {
        match level {
            1 => Element::Index1,
            2 => Element::Index2,
            _ => Element::Index3,
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// The raw configuration surface of a theme. Unknown keys fail
/// deserialisation, so an unrecognised element name is caught before a
/// `Theme` exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Seed format merged beneath every element format.
    pub global: Option<FormatMap>,
    pub title: Option<FormatMap>,
    pub subtitle: Option<FormatMap>,
    pub instructions: Option<FormatMap>,
    pub scope: Option<FormatMap>,
    pub source: Option<FormatMap>,
    pub units: Option<FormatMap>,
    pub column_heading: Option<FormatMap>,
    pub index_1: Option<FormatMap>,
    pub index_2: Option<FormatMap>,
    pub index_3: Option<FormatMap>,
    pub data: Option<FormatMap>,
    pub legend: Option<FormatMap>,
    pub annotations: Option<FormatMap>,
    pub notes: Option<FormatMap>,
    pub description_order: Vec<DescriptionElement>,
    pub footer_order: Vec<FooterElement>,
    pub missing_value: Option<String>,
}

impl ThemeConfig {
    /// Check every format map against the backend attribute allow-list.
    fn validate(&self) -> Result<(), EngineError> {
        let named = [
            ("global", &self.global),
            ("title", &self.title),
            ("subtitle", &self.subtitle),
            ("instructions", &self.instructions),
            ("scope", &self.scope),
            ("source", &self.source),
            ("units", &self.units),
            ("column_heading", &self.column_heading),
            ("index_1", &self.index_1),
            ("index_2", &self.index_2),
            ("index_3", &self.index_3),
            ("data", &self.data),
            ("legend", &self.legend),
            ("annotations", &self.annotations),
            ("notes", &self.notes),
        ];
        for (element, map) in named {
            if let Some(map) = map {
                if let Some(attr) = map.first_unknown_attribute() {
                    return Err(EngineError::Config(format!(
                        "`{}` is not a recognised format attribute (element `{}`)",
                        attr, element
                    )));
                }
            }
        }
        if let Some(marker) = &self.missing_value {
            if marker.is_empty() {
                return Err(EngineError::Config(
                    "`missing_value` must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The built-in theme. Constructed explicitly; callers pass it (or their
/// own) to the layout engine rather than relying on an implicit default.
pub fn default_theme() -> Theme {
    let config = ThemeConfig {
        global: Some(FormatMap::new().with("font_name", "Arial").with("font_size", 10)),
        title: Some(FormatMap::new().with("bold", true).with("font_size", 14)),
        subtitle: Some(FormatMap::new().with("font_size", 12)),
        column_heading: Some(FormatMap::new().with("bold", true).with("bottom", 1)),
        index_1: Some(FormatMap::new().with("bold", true)),
        units: Some(FormatMap::new().with("align", "right")),
        legend: Some(FormatMap::new().with("font_size", 9)),
        annotations: Some(FormatMap::new().with("font_size", 9)),
        notes: Some(FormatMap::new().with("font_size", 9)),
        description_order: vec![DescriptionElement::Instructions, DescriptionElement::Scope],
        footer_order: vec![
            FooterElement::Source,
            FooterElement::Legend,
            FooterElement::Annotations,
            FooterElement::Notes,
        ],
        missing_value: Some(":".to_string()),
        ..ThemeConfig::default()
    };
    // The built-in configuration is valid by construction.
    match Theme::from_config("default", config) {
        Ok(theme) => theme,
        Err(_) => unreachable!("built-in theme configuration is valid"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FormatValue;

    #[test]
    fn test_global_seeds_every_element_format() {
        let theme = default_theme();
        assert_eq!(
            theme.format_for(Element::Data).get("font_name"),
            Some(&FormatValue::Text("Arial".to_string()))
        );
        // Per-element values win over the global seed.
        assert_eq!(
            theme.format_for(Element::Title).get("font_size"),
            Some(&FormatValue::Number(14.0))
        );
        assert_eq!(
            theme.format_for(Element::Data).get("font_size"),
            Some(&FormatValue::Number(10.0))
        );
    }

    #[test]
    fn test_unknown_element_rejected_at_configuration_time() {
        let result: Result<ThemeConfig, _> = serde_json::from_value(serde_json::json!({
            "heading": { "bold": true }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_attribute_rejected_at_configuration_time() {
        let config: ThemeConfig = serde_json::from_value(serde_json::json!({
            "title": { "shimmer": true }
        }))
        .unwrap();
        assert!(matches!(
            Theme::from_config("bad", config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_empty_missing_value_rejected() {
        let config = ThemeConfig {
            missing_value: Some(String::new()),
            ..ThemeConfig::default()
        };
        assert!(matches!(
            Theme::from_config("bad", config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_config_roundtrip() {
        let config: ThemeConfig = serde_json::from_value(serde_json::json!({
            "global": { "font_name": "Arial" },
            "data": { "align": "right" },
            "description_order": ["instructions", "scope"],
            "footer_order": ["source", "legend"],
            "missing_value": ":"
        }))
        .unwrap();
        let theme = Theme::from_config("custom", config).unwrap();
        assert_eq!(theme.description_order.len(), 2);
        assert_eq!(theme.missing_value.as_deref(), Some(":"));
        assert_eq!(
            theme.format_for(Element::Data).get("align"),
            Some(&FormatValue::Text("right".to_string()))
        );
    }

    #[test]
    fn test_index_element_mapping() {
        assert_eq!(Theme::index_element(1), Element::Index1);
        assert_eq!(Theme::index_element(2), Element::Index2);
        assert_eq!(Theme::index_element(3), Element::Index3);
    }
}
