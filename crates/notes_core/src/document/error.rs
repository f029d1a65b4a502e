//! Document error taxonomy.

use crate::bundle::BundleError;
use crate::rtf::RtfError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error domain reported alongside [`ErrorCode`] values.
pub const ERROR_DOMAIN: &str = "NotesErrorDomain";

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Flat, stable code for document-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    CannotLoadFileWrappers = 0,
    CannotLoadText = 1,
    CannotAccessAttachments = 2,
    CannotSaveText = 3,
    CannotSaveSummary = 4,
}

impl ErrorCode {
    /// Numeric code within [`ERROR_DOMAIN`].
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Stable snake_case identifier used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CannotLoadFileWrappers => "cannot_load_file_wrappers",
            Self::CannotLoadText => "cannot_load_text",
            Self::CannotAccessAttachments => "cannot_access_attachments",
            Self::CannotSaveText => "cannot_save_text",
            Self::CannotSaveSummary => "cannot_save_summary",
        }
    }
}

/// Error for note document load/save/mutation.
#[derive(Debug)]
pub enum DocumentError {
    /// Package root is not a directory.
    CannotLoadFileWrappers,
    /// `Text.rtf` is missing, not a regular file, or fails RTF decoding.
    CannotLoadText(Option<RtfError>),
    /// Package tree cannot hold an `Attachments` directory.
    CannotAccessAttachments,
    /// Body text fails RTF encoding.
    CannotSaveText(RtfError),
    /// `Document.plist` fails to serialize.
    CannotSaveSummary(String),
    /// Underlying package/filesystem failure, passed through unchanged.
    Io(BundleError),
}

impl DocumentError {
    /// Returns the flat code, or `None` for pass-through I/O errors.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::CannotLoadFileWrappers => Some(ErrorCode::CannotLoadFileWrappers),
            Self::CannotLoadText(_) => Some(ErrorCode::CannotLoadText),
            Self::CannotAccessAttachments => Some(ErrorCode::CannotAccessAttachments),
            Self::CannotSaveText(_) => Some(ErrorCode::CannotSaveText),
            Self::CannotSaveSummary(_) => Some(ErrorCode::CannotSaveSummary),
            Self::Io(_) => None,
        }
    }

    /// Log-friendly identifier (`io` for pass-through errors).
    pub(crate) fn log_code(&self) -> &'static str {
        self.code().map(ErrorCode::as_str).unwrap_or("io")
    }
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CannotLoadFileWrappers => write!(f, "note package is not a directory"),
            Self::CannotLoadText(None) => write!(f, "note text is missing"),
            Self::CannotLoadText(Some(err)) => write!(f, "note text cannot be read: {err}"),
            Self::CannotAccessAttachments => write!(f, "note attachments cannot be accessed"),
            Self::CannotSaveText(err) => write!(f, "note text cannot be saved: {err}"),
            Self::CannotSaveSummary(details) => {
                write!(f, "note summary cannot be saved: {details}")
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CannotLoadText(Some(err)) | Self::CannotSaveText(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BundleError> for DocumentError {
    fn from(value: BundleError) -> Self {
        Self::Io(value)
    }
}
