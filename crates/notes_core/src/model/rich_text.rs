//! Rich text domain model.
//!
//! # Responsibility
//! - Represent formatted note bodies as ordered attribute runs.
//! - Keep a normalized shape so equality survives encode/decode.
//!
//! # Invariants
//! - No run has empty text.
//! - Adjacent runs never share identical attributes (they are merged).

use serde::{Deserialize, Serialize};

/// Font family used when text carries no explicit font.
pub const DEFAULT_FONT: &str = "Helvetica";
/// Default size in half-points (12pt).
pub const DEFAULT_FONT_SIZE: u16 = 24;

/// Character-level formatting for one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextAttributes {
    /// Font family name.
    pub font: String,
    /// Font size in half-points.
    pub size: u16,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl Default for TextAttributes {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
        }
    }
}

impl TextAttributes {
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    pub fn with_size(mut self, half_points: u16) -> Self {
        self.size = half_points;
        self
    }
}

/// Contiguous text sharing one attribute set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub attributes: TextAttributes,
}

/// Formatted note body.
///
/// Serialized as a plain list of runs; deserialization goes through
/// [`RichText::push`] so the result is always normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TextRun>", into = "Vec<TextRun>")]
pub struct RichText {
    runs: Vec<TextRun>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates text with default attributes.
    pub fn plain(text: impl Into<String>) -> Self {
        let mut value = Self::new();
        value.push(text, TextAttributes::default());
        value
    }

    /// Appends `text` with `attributes`, merging into the last run when the
    /// attributes match. Empty text is ignored.
    pub fn push(&mut self, text: impl Into<String>, attributes: TextAttributes) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.attributes == attributes {
                last.text.push_str(&text);
                return;
            }
        }
        self.runs.push(TextRun { text, attributes });
    }

    /// Builder form of [`RichText::push`].
    pub fn with_run(mut self, text: impl Into<String>, attributes: TextAttributes) -> Self {
        self.push(text, attributes);
        self
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.runs.iter().map(|run| run.text.chars().count()).sum()
    }

    /// Plain-text projection without formatting.
    pub fn to_plain_string(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

impl FromIterator<TextRun> for RichText {
    fn from_iter<I: IntoIterator<Item = TextRun>>(iter: I) -> Self {
        let mut value = Self::new();
        for run in iter {
            value.push(run.text, run.attributes);
        }
        value
    }
}

impl From<Vec<TextRun>> for RichText {
    fn from(runs: Vec<TextRun>) -> Self {
        runs.into_iter().collect()
    }
}

impl From<RichText> for Vec<TextRun> {
    fn from(text: RichText) -> Self {
        text.runs
    }
}
