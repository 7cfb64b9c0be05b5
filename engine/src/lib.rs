//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the table layout engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//! The engine turns a table plus a theme into positioned, styled cell
//! writes against an abstract sheet backend; the persistence crate
//! provides the XLSX implementation of that backend.

pub mod cell;
pub mod coord;
pub mod directive;
pub mod error;
pub mod format_list;
pub mod format_resolver;
pub mod layout;
pub mod reference;
pub mod style;
pub mod table;
pub mod theme;
pub mod urls;
pub mod width;
pub mod writer;

// Re-export commonly used types at the crate root
pub use cell::Value;
pub use coord::{coord_to_a1, index_to_col, CellCoord, DataRange};
pub use directive::{AdditionalFormat, ColumnSelector};
pub use error::EngineError;
pub use format_list::{FormatList, Segment};
pub use format_resolver::resolve_block_formats;
pub use layout::LayoutEngine;
pub use reference::{resolve_references, ReferenceOrder};
pub use style::{FormatMap, FormatValue, FORMAT_ATTRIBUTES};
pub use table::{Dataset, Table, Units};
pub use theme::{
    default_theme, DescriptionElement, Element, FooterElement, Theme, ThemeConfig,
};
pub use urls::resolve_urls;
pub use width::{estimate_column_widths, estimate_width, DEFAULT_FONT_SIZE};
pub use writer::{BufferedCell, CellContent, SheetBuffer, SheetWriter};
