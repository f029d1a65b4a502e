//! RTF byte encoding for [`RichText`](crate::model::rich_text::RichText).
//!
//! # Responsibility
//! - Encode note bodies to deterministic RTF suitable for `Text.rtf`.
//! - Decode RTF produced by this crate and by common desktop editors.
//!
//! # Invariants
//! - `decode(encode(x)) == x` for every normalized rich text value.
//! - Encoding the same value twice yields identical bytes.
//! - Decoding never panics on arbitrary input; malformed input is an error.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod reader;
mod writer;

pub use reader::decode;
pub use writer::encode;

pub type RtfResult<T> = Result<T, RtfError>;

/// Error for RTF encode/decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtfError {
    /// Input does not start with `{\rtf`.
    MissingHeader,
    /// Input ended with groups still open.
    UnbalancedGroups { open: usize },
    /// Input ended inside a control sequence.
    UnexpectedEof,
    /// `\'hh` escape at byte offset `offset` is not two hex digits.
    InvalidHex { offset: usize },
    /// Font family name cannot be written into a font table.
    InvalidFontName(String),
}

impl Display for RtfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "missing `{{\\rtf` header"),
            Self::UnbalancedGroups { open } => {
                write!(f, "unbalanced groups: {open} still open at end of input")
            }
            Self::UnexpectedEof => write!(f, "unexpected end of input in control sequence"),
            Self::InvalidHex { offset } => write!(f, "invalid hex escape at byte {offset}"),
            Self::InvalidFontName(name) => write!(f, "font name cannot be encoded: `{name}`"),
        }
    }
}

impl Error for RtfError {}
