//! Core persistence logic for package-based rich-text notes.
//! This crate is the single source of truth for the package format.

pub mod bundle;
pub mod document;
pub mod logging;
pub mod model;
pub mod rtf;

pub use bundle::{
    read_from_external_tree, write_to_external_path, BundleError, BundleNode, BundleResult,
    NodeContents, NodeKind,
};
pub use document::{
    AttachmentRef, ChangeKind, DocumentError, DocumentObserver, DocumentProperty, DocumentResult,
    DocumentState, DocumentSummary, ErrorCode, NoteDocument, ObserverId,
    ATTACHMENTS_DIRECTORY_NAME, DOCUMENT_FILE_NAME, ERROR_DOMAIN, TEXT_FILE_NAME,
};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
};
pub use model::rich_text::{RichText, TextAttributes, TextRun};
pub use rtf::RtfError;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
