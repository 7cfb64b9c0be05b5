//! FILENAME: engine/src/format_list.rs
//! PURPOSE: Rich text as an ordered list of plain and format-override segments.
//! CONTEXT: Wherever the data model accepts text, it also accepts a
//! `FormatList` so single runs within a cell can carry their own style on
//! top of the cell format. The concatenated text of all segments is the
//! value used for reference scanning, URL detection and width estimation.

use serde::{Deserialize, Serialize};

use crate::style::FormatMap;

/// One run of a rich-text value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    /// Text rendered with the cell's base format.
    Plain(String),
    /// Text rendered with the given overrides merged onto the base format.
    Styled(FormatMap, String),
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain(text) => text,
            Segment::Styled(_, text) => text,
        }
    }

    pub fn text_mut(&mut self) -> &mut String {
        match self {
            Segment::Plain(text) => text,
            Segment::Styled(_, text) => text,
        }
    }
}

/// An ordered sequence of rich-text segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatList {
    segments: Vec<Segment>,
}

impl FormatList {
    pub fn new() -> Self {
        FormatList {
            segments: Vec::new(),
        }
    }

    /// Builder-style plain segment.
    pub fn plain(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Plain(text.into()));
        self
    }

    /// Builder-style styled segment.
    pub fn styled(mut self, format: FormatMap, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Styled(format, text.into()));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The concatenated text of every segment, plain and styled alike.
    pub fn text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }
}
