//! Note document: load/save protocols and attachment mutation.
//!
//! # Responsibility
//! - Own the formatted body and the package tree of one open note.
//! - Translate between in-memory state and the package layout.
//! - Track unsaved changes and notify observers around every mutation.
//!
//! # Invariants
//! - `document_tree` is always a directory and is the only record of
//!   attachments; `text` is flattened into `Text.rtf` on save.
//! - No operation partially commits: on error, text, tree and change
//!   tracking are exactly as before the call.
//! - Every committed mutation bumps the change count by one inside exactly
//!   one will/did notification pair.

mod error;
mod observer;
mod summary;

pub use error::{DocumentError, DocumentResult, ErrorCode, ERROR_DOMAIN};
pub use observer::{DocumentObserver, DocumentProperty, ObserverId};
pub use summary::DocumentSummary;

use crate::bundle::{
    read_from_external_tree, validate_name, write_to_external_path, BundleError, BundleNode,
    NodeKind,
};
use crate::model::rich_text::RichText;
use crate::rtf;
use log::{debug, error, info, warn};
use observer::ObserverRegistry;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Package entry holding the summary index.
pub const DOCUMENT_FILE_NAME: &str = "Document.plist";
/// Package entry holding the RTF body.
pub const TEXT_FILE_NAME: &str = "Text.rtf";
/// Package directory holding attachments.
pub const ATTACHMENTS_DIRECTORY_NAME: &str = "Attachments";

/// Lifecycle state of one document instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Fresh document, nothing loaded.
    Unopened,
    /// Loaded from a package and unchanged since.
    Loaded,
    /// First load failed; the host should discard this instance.
    LoadFailed,
    /// Has changes not yet written out.
    Modified,
    /// Written out and unchanged since.
    Saved,
    /// Last save attempt failed; changes are still pending.
    SaveFailed,
}

/// Change-count bookkeeping request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// One change was made.
    Done,
    /// Current contents were persisted; mark clean.
    Cleared,
}

/// Read model for one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRef {
    pub name: String,
    pub kind: NodeKind,
    /// Total bytes of file contents (recursive for directories).
    pub size: u64,
}

/// One open note.
pub struct NoteDocument {
    text: RichText,
    document_tree: BundleNode,
    change_count: u64,
    saved_change_count: u64,
    state: DocumentState,
    observers: ObserverRegistry,
}

impl Default for NoteDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteDocument {
    /// Creates an empty, clean, unopened document.
    pub fn new() -> Self {
        Self {
            text: RichText::new(),
            document_tree: BundleNode::empty_root(),
            change_count: 0,
            saved_change_count: 0,
            state: DocumentState::Unopened,
            observers: ObserverRegistry::default(),
        }
    }

    /// Reads the package at `path` into a new document.
    pub fn open(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let mut document = Self::new();
        document.read_from_path(path)?;
        Ok(document)
    }

    /// Reads the package at `path` and loads it into this document.
    ///
    /// # Errors
    /// - `Io` when the package cannot be read from disk.
    /// - Any load-protocol error from [`NoteDocument::load`].
    pub fn read_from_path(&mut self, path: impl AsRef<Path>) -> DocumentResult<()> {
        let tree = match read_from_external_tree(path) {
            Ok(tree) => tree,
            Err(err) => {
                let err = DocumentError::from(err);
                self.record_load_failure(&err);
                return Err(err);
            }
        };
        self.load(tree)
    }

    /// Loads state from a package tree.
    ///
    /// On success the whole tree (attachments and unknown entries included)
    /// becomes the document tree and the document is clean.
    ///
    /// # Errors
    /// - `CannotLoadFileWrappers` when `tree` is not a directory.
    /// - `CannotLoadText` when `Text.rtf` is missing, not a regular file, or
    ///   not valid RTF.
    pub fn load(&mut self, tree: BundleNode) -> DocumentResult<()> {
        let started_at = Instant::now();
        let text = match decode_package(&tree) {
            Ok(text) => text,
            Err(err) => {
                self.record_load_failure(&err);
                return Err(err);
            }
        };

        check_summary(&tree);

        self.observers.will_change(DocumentProperty::Text);
        self.observers.will_change(DocumentProperty::AttachedFiles);
        self.text = text;
        self.document_tree = tree;
        self.saved_change_count = self.change_count;
        self.state = DocumentState::Loaded;
        self.observers.did_change(DocumentProperty::Text);
        self.observers.did_change(DocumentProperty::AttachedFiles);

        info!(
            "event=document_load module=document status=ok attachments={} text_chars={} duration_ms={}",
            self.attachment_count(),
            self.text.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Flattens the body into the tree and returns the tree to persist.
    ///
    /// Only `Text.rtf` and `Document.plist` are replaced; attachments are
    /// already live in the tree and are left untouched.
    ///
    /// # Errors
    /// - `CannotSaveText` when the body cannot be RTF-encoded.
    /// - `CannotSaveSummary` when the summary cannot be serialized.
    pub fn save(&mut self) -> DocumentResult<&BundleNode> {
        if let Err(err) = self.flatten_into_tree() {
            self.state = DocumentState::SaveFailed;
            error!(
                "event=document_save module=document status=error error_code={} error={}",
                err.log_code(),
                err
            );
            return Err(err);
        }
        debug!(
            "event=document_save module=document status=ok attachments={}",
            self.attachment_count()
        );
        Ok(&self.document_tree)
    }

    /// Saves and writes the package to `path`, then marks the document clean.
    ///
    /// # Errors
    /// - Any error from [`NoteDocument::save`].
    /// - `Io` when the package cannot be written; the document stays dirty.
    pub fn save_to(&mut self, path: impl AsRef<Path>) -> DocumentResult<()> {
        let started_at = Instant::now();
        self.save()?;
        if let Err(err) = write_to_external_path(&self.document_tree, path) {
            self.state = DocumentState::SaveFailed;
            error!(
                "event=document_write module=document status=error error_code=io duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
        self.update_change_count(ChangeKind::Cleared);
        info!(
            "event=document_write module=document status=ok bytes={} duration_ms={}",
            self.document_tree.total_size(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Copies the file or directory at `source` into `Attachments/`.
    ///
    /// The source is read eagerly before anything is mutated. A same-named
    /// attachment is replaced.
    ///
    /// # Errors
    /// - `CannotAccessAttachments` when the tree cannot hold attachments.
    /// - `Io` when the source cannot be read or has no usable name.
    pub fn add_attachment(&mut self, source: impl AsRef<Path>) -> DocumentResult<()> {
        self.ensure_attachments_accessible()?;
        let source = source.as_ref();
        if source.file_name().is_none() {
            return Err(BundleError::InvalidName(source.display().to_string()).into());
        }
        let attachment = read_from_external_tree(source)?;
        validate_name(attachment.preferred_name())?;
        let size = attachment.total_size();

        self.observers.will_change(DocumentProperty::AttachedFiles);
        let result = self
            .document_tree
            .directory_child_or_insert(ATTACHMENTS_DIRECTORY_NAME)
            .and_then(|directory| directory.add_child(attachment));
        let replaced = match &result {
            Ok(previous) => {
                self.update_change_count(ChangeKind::Done);
                previous.is_some()
            }
            Err(_) => false,
        };
        self.observers.did_change(DocumentProperty::AttachedFiles);
        result?;

        info!(
            "event=attachment_add module=document status=ok replaced={} bytes={} attachments={}",
            replaced,
            size,
            self.attachment_count()
        );
        Ok(())
    }

    /// Removes the attachment named `name`.
    ///
    /// Returns `false` without notifying or counting a change when no such
    /// attachment exists.
    ///
    /// # Errors
    /// - `CannotAccessAttachments` when the tree cannot hold attachments.
    pub fn remove_attachment(&mut self, name: &str) -> DocumentResult<bool> {
        self.ensure_attachments_accessible()?;
        if self.attachment(name).is_none() {
            return Ok(false);
        }

        self.observers.will_change(DocumentProperty::AttachedFiles);
        let removed = self
            .document_tree
            .child_named_mut(ATTACHMENTS_DIRECTORY_NAME)
            .and_then(|directory| directory.remove_child(name))
            .is_some();
        if removed {
            self.update_change_count(ChangeKind::Done);
        }
        self.observers.did_change(DocumentProperty::AttachedFiles);

        info!("event=attachment_remove module=document status=ok");
        Ok(removed)
    }

    /// Replaces the body.
    pub fn set_text(&mut self, text: RichText) {
        self.observers.will_change(DocumentProperty::Text);
        self.text = text;
        self.update_change_count(ChangeKind::Done);
        self.observers.did_change(DocumentProperty::Text);
    }

    pub fn text(&self) -> &RichText {
        &self.text
    }

    /// The package tree as last loaded, mutated or saved.
    pub fn document_tree(&self) -> &BundleNode {
        &self.document_tree
    }

    /// Attachments sorted by name, or `None` when `Attachments/` is absent.
    pub fn attached_files(&self) -> Option<Vec<AttachmentRef>> {
        let children = self.attachments_directory()?.children()?;
        Some(
            children
                .values()
                .map(|node| AttachmentRef {
                    name: node.preferred_name().to_string(),
                    kind: node.kind(),
                    size: node.total_size(),
                })
                .collect(),
        )
    }

    /// Looks up one attachment node by name.
    pub fn attachment(&self, name: &str) -> Option<&BundleNode> {
        self.attachments_directory()?.child_named(name)
    }

    /// Parses `Document.plist` from the tree, if present and readable.
    pub fn summary(&self) -> Option<DocumentSummary> {
        let bytes = self
            .document_tree
            .child_named(DOCUMENT_FILE_NAME)?
            .regular_file_contents()?;
        DocumentSummary::from_plist_bytes(bytes).ok()
    }

    /// Applies change-count bookkeeping.
    pub fn update_change_count(&mut self, change: ChangeKind) {
        match change {
            ChangeKind::Done => {
                self.change_count += 1;
                self.state = DocumentState::Modified;
            }
            ChangeKind::Cleared => {
                self.saved_change_count = self.change_count;
                self.state = DocumentState::Saved;
            }
        }
    }

    /// Monotonic count of changes made over this instance's lifetime.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// Whether changes were made since the last load or successful write.
    pub fn is_dirty(&self) -> bool {
        self.change_count != self.saved_change_count
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Registers `observer`; events are delivered in registration order.
    pub fn add_observer(&mut self, observer: Arc<dyn DocumentObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    /// Unregisters an observer. Returns `false` if `id` was unknown.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    fn attachments_directory(&self) -> Option<&BundleNode> {
        self.document_tree.child_named(ATTACHMENTS_DIRECTORY_NAME)
    }

    fn attachment_count(&self) -> usize {
        self.attachments_directory()
            .and_then(BundleNode::children)
            .map_or(0, |children| children.len())
    }

    fn attachment_names(&self) -> Vec<String> {
        self.attachments_directory()
            .and_then(BundleNode::children)
            .map(|children| children.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn ensure_attachments_accessible(&self) -> DocumentResult<()> {
        if !self.document_tree.is_directory() {
            return Err(DocumentError::CannotAccessAttachments);
        }
        match self.attachments_directory() {
            Some(directory) if !directory.is_directory() => {
                Err(DocumentError::CannotAccessAttachments)
            }
            _ => Ok(()),
        }
    }

    /// Encodes everything first so a failure leaves the tree untouched.
    fn flatten_into_tree(&mut self) -> DocumentResult<()> {
        let text_bytes = rtf::encode(&self.text).map_err(DocumentError::CannotSaveText)?;
        let summary = DocumentSummary {
            attachments: self.attachment_names(),
        };
        let summary_bytes = summary
            .to_plist_bytes()
            .map_err(|err| DocumentError::CannotSaveSummary(err.to_string()))?;

        self.document_tree.remove_child(TEXT_FILE_NAME);
        self.document_tree
            .add_regular_file(TEXT_FILE_NAME, text_bytes)?;
        self.document_tree.remove_child(DOCUMENT_FILE_NAME);
        self.document_tree
            .add_regular_file(DOCUMENT_FILE_NAME, summary_bytes)?;
        Ok(())
    }

    fn record_load_failure(&mut self, err: &DocumentError) {
        if self.state == DocumentState::Unopened {
            self.state = DocumentState::LoadFailed;
        }
        error!(
            "event=document_load module=document status=error error_code={} error={}",
            err.log_code(),
            err
        );
    }
}

fn decode_package(tree: &BundleNode) -> DocumentResult<RichText> {
    let children = tree
        .children()
        .ok_or(DocumentError::CannotLoadFileWrappers)?;
    let text_bytes = children
        .get(TEXT_FILE_NAME)
        .and_then(BundleNode::regular_file_contents)
        .ok_or(DocumentError::CannotLoadText(None))?;
    rtf::decode(text_bytes).map_err(|err| DocumentError::CannotLoadText(Some(err)))
}

fn check_summary(tree: &BundleNode) {
    let Some(bytes) = tree
        .child_named(DOCUMENT_FILE_NAME)
        .and_then(BundleNode::regular_file_contents)
    else {
        debug!("event=summary_check module=document status=missing");
        return;
    };

    match DocumentSummary::from_plist_bytes(bytes) {
        Ok(summary) => {
            let actual: Vec<String> = tree
                .child_named(ATTACHMENTS_DIRECTORY_NAME)
                .and_then(BundleNode::children)
                .map(|children| children.keys().cloned().collect())
                .unwrap_or_default();
            if summary.attachments != actual {
                debug!(
                    "event=summary_check module=document status=stale listed={} actual={}",
                    summary.attachments.len(),
                    actual.len()
                );
            }
        }
        Err(err) => warn!(
            "event=summary_check module=document status=warn error_code=summary_unreadable error={}",
            err
        ),
    }
}
