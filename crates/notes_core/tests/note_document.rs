use notes_core::{
    BundleError, BundleNode, DocumentError, DocumentObserver, DocumentProperty, DocumentState,
    NodeKind, NoteDocument, RichText, TextAttributes, ATTACHMENTS_DIRECTORY_NAME,
    DOCUMENT_FILE_NAME, TEXT_FILE_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Will(DocumentProperty),
    Did(DocumentProperty),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl DocumentObserver for Recorder {
    fn will_change(&self, property: DocumentProperty) {
        self.events.lock().unwrap().push(Event::Will(property));
    }

    fn did_change(&self, property: DocumentProperty) {
        self.events.lock().unwrap().push(Event::Did(property));
    }
}

fn write_source(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn sample_text() -> RichText {
    RichText::new()
        .with_run("Shopping\n", TextAttributes::default().bold().with_size(32))
        .with_run("milk, eggs", TextAttributes::default().italic())
}

fn text_bytes(tree: &BundleNode) -> Vec<u8> {
    tree.child_named(TEXT_FILE_NAME)
        .and_then(BundleNode::regular_file_contents)
        .unwrap()
        .to_vec()
}

#[test]
fn new_document_saves_text_without_attachments_directory() {
    let mut document = NoteDocument::new();
    let tree = document.save().unwrap();

    assert!(tree.child_named(TEXT_FILE_NAME).is_some());
    assert!(tree.child_named(DOCUMENT_FILE_NAME).is_some());
    assert!(tree.child_named(ATTACHMENTS_DIRECTORY_NAME).is_none());
    assert!(document.attached_files().is_none());
}

#[test]
fn attachment_is_byte_identical_after_save() {
    let sources = tempfile::tempdir().unwrap();
    let photo_bytes = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3];
    let photo = write_source(sources.path(), "photo.png", &photo_bytes);

    let mut document = NoteDocument::new();
    document.add_attachment(&photo).unwrap();
    let tree = document.save().unwrap();

    let stored = tree
        .child_named(ATTACHMENTS_DIRECTORY_NAME)
        .and_then(|dir| dir.child_named("photo.png"))
        .and_then(BundleNode::regular_file_contents)
        .unwrap();
    assert_eq!(stored, photo_bytes.as_slice());
    assert!(tree.child_named(TEXT_FILE_NAME).is_some());
}

#[test]
fn save_then_load_round_trips_text_and_attachment_names() {
    let sources = tempfile::tempdir().unwrap();
    let a = write_source(sources.path(), "a.txt", b"alpha");
    let b = write_source(sources.path(), "b.bin", &[0u8; 16]);

    let mut original = NoteDocument::new();
    original.set_text(sample_text());
    original.add_attachment(&a).unwrap();
    original.add_attachment(&b).unwrap();
    let tree = original.save().unwrap().clone();

    let mut reloaded = NoteDocument::new();
    reloaded.load(tree).unwrap();

    assert_eq!(reloaded.text(), &sample_text());
    let names: Vec<String> = reloaded
        .attached_files()
        .unwrap()
        .into_iter()
        .map(|attachment| attachment.name)
        .collect();
    assert_eq!(names, vec!["a.txt".to_string(), "b.bin".to_string()]);
    assert_eq!(reloaded.state(), DocumentState::Loaded);
    assert!(!reloaded.is_dirty());
}

#[test]
fn repeated_save_is_byte_identical_and_leaves_attachments_alone() {
    let sources = tempfile::tempdir().unwrap();
    let file = write_source(sources.path(), "doc.pdf", b"%PDF-1.4");

    let mut document = NoteDocument::new();
    document.set_text(sample_text());
    document.add_attachment(&file).unwrap();

    let first = document.save().unwrap().clone();
    let second = document.save().unwrap().clone();

    assert_eq!(text_bytes(&first), text_bytes(&second));
    assert_eq!(
        first.child_named(ATTACHMENTS_DIRECTORY_NAME),
        second.child_named(ATTACHMENTS_DIRECTORY_NAME)
    );
    assert_eq!(first, second);
}

#[test]
fn load_without_text_file_keeps_previous_state() {
    let mut document = NoteDocument::new();
    document.set_text(RichText::plain("keep me"));
    let tree_before = document.document_tree().clone();
    let count_before = document.change_count();

    let mut package = BundleNode::empty_root();
    package
        .add_child(BundleNode::directory(ATTACHMENTS_DIRECTORY_NAME))
        .unwrap();
    let err = document.load(package).unwrap_err();

    assert!(matches!(err, DocumentError::CannotLoadText(None)));
    assert_eq!(document.text(), &RichText::plain("keep me"));
    assert_eq!(document.document_tree(), &tree_before);
    assert_eq!(document.change_count(), count_before);
    assert!(document.is_dirty());
}

#[test]
fn load_rejects_non_directory_root() {
    let mut document = NoteDocument::new();
    let err = document
        .load(BundleNode::regular_file("Note.note", b"{\\rtf1}".to_vec()))
        .unwrap_err();

    assert!(matches!(err, DocumentError::CannotLoadFileWrappers));
    assert_eq!(document.state(), DocumentState::LoadFailed);
}

#[test]
fn load_rejects_unparsable_text() {
    let mut package = BundleNode::empty_root();
    package
        .add_regular_file(TEXT_FILE_NAME, b"plain, not rtf".to_vec())
        .unwrap();

    let mut document = NoteDocument::new();
    let err = document.load(package).unwrap_err();
    assert!(matches!(err, DocumentError::CannotLoadText(Some(_))));
}

#[test]
fn load_rejects_text_entry_that_is_a_directory() {
    let mut package = BundleNode::empty_root();
    package.add_child(BundleNode::directory(TEXT_FILE_NAME)).unwrap();

    let mut document = NoteDocument::new();
    assert!(matches!(
        document.load(package).unwrap_err(),
        DocumentError::CannotLoadText(None)
    ));
}

#[test]
fn load_ignores_missing_or_garbage_summary() {
    let mut package = BundleNode::empty_root();
    package
        .add_regular_file(TEXT_FILE_NAME, b"{\\rtf1 hi}".to_vec())
        .unwrap();
    package
        .add_regular_file(DOCUMENT_FILE_NAME, b"garbage".to_vec())
        .unwrap();

    let mut document = NoteDocument::new();
    document.load(package).unwrap();
    assert_eq!(document.text().to_plain_string(), "hi");
    assert!(document.summary().is_none());
}

#[test]
fn same_named_attachments_collapse_to_one_entry() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let first = write_source(first_dir.path(), "photo.png", b"first");
    let second = write_source(second_dir.path(), "photo.png", b"second");

    let mut document = NoteDocument::new();
    document.add_attachment(&first).unwrap();
    document.add_attachment(&second).unwrap();

    let attached = document.attached_files().unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].name, "photo.png");
    assert_eq!(
        document
            .attachment("photo.png")
            .and_then(BundleNode::regular_file_contents),
        Some(&b"second"[..])
    );
}

#[test]
fn add_attachment_counts_one_change_inside_one_notification_pair() {
    let sources = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let mut document = NoteDocument::new();
    document.add_observer(recorder.clone());

    for (index, name) in ["a", "b", "a"].iter().enumerate() {
        let path = write_source(sources.path(), name, name.as_bytes());
        document.add_attachment(&path).unwrap();

        assert_eq!(document.change_count(), index as u64 + 1);
        assert_eq!(
            recorder.take(),
            vec![
                Event::Will(DocumentProperty::AttachedFiles),
                Event::Did(DocumentProperty::AttachedFiles),
            ]
        );
    }
    assert_eq!(document.state(), DocumentState::Modified);
}

#[test]
fn unreadable_source_leaves_document_untouched() {
    let sources = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let mut document = NoteDocument::new();
    document.add_observer(recorder.clone());

    let err = document
        .add_attachment(sources.path().join("missing.png"))
        .unwrap_err();

    assert!(matches!(err, DocumentError::Io(_)));
    assert!(err.code().is_none());
    assert!(recorder.take().is_empty());
    assert_eq!(document.change_count(), 0);
    assert!(document
        .document_tree()
        .child_named(ATTACHMENTS_DIRECTORY_NAME)
        .is_none());
}

#[test]
fn attachments_entry_that_is_a_file_blocks_mutation() {
    let mut package = BundleNode::empty_root();
    package
        .add_regular_file(TEXT_FILE_NAME, b"{\\rtf1 x}".to_vec())
        .unwrap();
    package
        .add_regular_file(ATTACHMENTS_DIRECTORY_NAME, b"oops".to_vec())
        .unwrap();
    let mut document = NoteDocument::new();
    document.load(package).unwrap();

    let sources = tempfile::tempdir().unwrap();
    let file = write_source(sources.path(), "a.txt", b"a");
    assert!(matches!(
        document.add_attachment(&file).unwrap_err(),
        DocumentError::CannotAccessAttachments
    ));
    assert!(matches!(
        document.remove_attachment("a.txt").unwrap_err(),
        DocumentError::CannotAccessAttachments
    ));
    assert!(!document.is_dirty());
}

#[test]
fn directory_sources_are_attached_recursively() {
    let sources = tempfile::tempdir().unwrap();
    let folder = sources.path().join("Sketches");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("one.svg"), b"<svg/>").unwrap();
    fs::write(folder.join("two.svg"), b"<svg></svg>").unwrap();

    let mut document = NoteDocument::new();
    document.add_attachment(&folder).unwrap();

    let attached = document.attached_files().unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].kind, NodeKind::Directory);
    assert_eq!(attached[0].size, 17);
}

#[test]
fn nameless_source_is_rejected_before_reading() {
    let recorder = Arc::new(Recorder::default());
    let mut document = NoteDocument::new();
    document.add_observer(recorder.clone());

    let err = document.add_attachment("/").unwrap_err();

    assert!(matches!(err, DocumentError::Io(BundleError::InvalidName(_))));
    assert!(recorder.take().is_empty());
    assert_eq!(document.change_count(), 0);
    assert!(document
        .document_tree()
        .child_named(ATTACHMENTS_DIRECTORY_NAME)
        .is_none());
}

#[cfg(unix)]
#[test]
fn source_with_symlinked_subdirectory_leaves_document_untouched() {
    let sources = tempfile::tempdir().unwrap();
    let outside = sources.path().join("outside");
    fs::create_dir(&outside).unwrap();
    let folder = sources.path().join("Sketches");
    fs::create_dir(&folder).unwrap();
    std::os::unix::fs::symlink(&outside, folder.join("linked")).unwrap();

    let mut document = NoteDocument::new();
    let err = document.add_attachment(&folder).unwrap_err();

    assert!(matches!(
        err,
        DocumentError::Io(BundleError::UnsupportedEntry(_))
    ));
    assert_eq!(document.change_count(), 0);
    assert!(document
        .document_tree()
        .child_named(ATTACHMENTS_DIRECTORY_NAME)
        .is_none());
}

#[cfg(unix)]
#[test]
fn socket_source_leaves_document_untouched() {
    let sources = tempfile::tempdir().unwrap();
    let socket = sources.path().join("sock");
    let _listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();

    let mut document = NoteDocument::new();
    let err = document.add_attachment(&socket).unwrap_err();

    assert!(matches!(
        err,
        DocumentError::Io(BundleError::UnsupportedEntry(_))
    ));
    assert_eq!(document.change_count(), 0);
    assert!(document
        .document_tree()
        .child_named(ATTACHMENTS_DIRECTORY_NAME)
        .is_none());
}

#[test]
fn remove_attachment_follows_notification_pattern() {
    let sources = tempfile::tempdir().unwrap();
    let file = write_source(sources.path(), "a.txt", b"a");
    let recorder = Arc::new(Recorder::default());
    let mut document = NoteDocument::new();
    document.add_attachment(&file).unwrap();
    document.add_observer(recorder.clone());

    assert!(!document.remove_attachment("missing").unwrap());
    assert!(recorder.take().is_empty());
    assert_eq!(document.change_count(), 1);

    assert!(document.remove_attachment("a.txt").unwrap());
    assert_eq!(
        recorder.take(),
        vec![
            Event::Will(DocumentProperty::AttachedFiles),
            Event::Did(DocumentProperty::AttachedFiles),
        ]
    );
    assert_eq!(document.change_count(), 2);
    assert_eq!(document.attached_files(), Some(Vec::new()));
}

#[test]
fn removed_observer_stops_receiving_events() {
    let recorder = Arc::new(Recorder::default());
    let mut document = NoteDocument::new();
    let id = document.add_observer(recorder.clone());

    document.set_text(RichText::plain("one"));
    assert_eq!(
        recorder.take(),
        vec![
            Event::Will(DocumentProperty::Text),
            Event::Did(DocumentProperty::Text),
        ]
    );

    assert!(document.remove_observer(id));
    assert!(!document.remove_observer(id));
    document.set_text(RichText::plain("two"));
    assert!(recorder.take().is_empty());
}

#[test]
fn summary_lists_attachments_after_save() {
    let sources = tempfile::tempdir().unwrap();
    let file = write_source(sources.path(), "photo.png", b"png");
    let mut document = NoteDocument::new();
    document.add_attachment(&file).unwrap();
    document.save().unwrap();

    let summary = document.summary().unwrap();
    assert_eq!(summary.attachments, vec!["photo.png".to_string()]);
}

#[test]
fn save_with_unencodable_font_fails_and_keeps_tree() {
    let mut document = NoteDocument::new();
    document.save().unwrap();
    let tree_before = document.document_tree().clone();

    document.set_text(
        RichText::new().with_run("x", TextAttributes::default().with_font("Bad;Font")),
    );
    let err = document.save().unwrap_err();

    assert!(matches!(err, DocumentError::CannotSaveText(_)));
    assert_eq!(document.document_tree(), &tree_before);
    assert_eq!(document.state(), DocumentState::SaveFailed);
    assert!(document.is_dirty());
}

#[test]
fn attachment_refs_serialize_with_snake_case_kind() {
    let sources = tempfile::tempdir().unwrap();
    let file = write_source(sources.path(), "scan.pdf", b"%PDF");
    let mut document = NoteDocument::new();
    document.add_attachment(&file).unwrap();

    let json = serde_json::to_value(document.attached_files().unwrap()).unwrap();
    assert_eq!(json[0]["name"], "scan.pdf");
    assert_eq!(json[0]["kind"], "regular_file");
    assert_eq!(json[0]["size"], 4);
}
