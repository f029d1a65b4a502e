use notes_core::{
    read_from_external_tree, write_to_external_path, BundleError, BundleNode, DocumentError,
    DocumentState, NodeKind, NoteDocument, RichText, TextAttributes, ATTACHMENTS_DIRECTORY_NAME,
    DOCUMENT_FILE_NAME, TEXT_FILE_NAME,
};
use std::fs;

#[test]
fn tree_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Tree.note");

    let mut root = BundleNode::empty_root();
    root.add_regular_file("top.txt", b"top".to_vec()).unwrap();
    let nested = root.directory_child_or_insert("nested").unwrap();
    nested.add_regular_file("inner.bin", vec![0u8, 255, 7]).unwrap();
    nested.directory_child_or_insert("empty").unwrap();

    write_to_external_path(&root, &target).unwrap();
    let mut read_back = read_from_external_tree(&target).unwrap();

    assert_eq!(read_back.preferred_name(), "Tree.note");
    read_back.set_preferred_name("");
    assert_eq!(read_back, root);
}

#[test]
fn save_to_then_open_reproduces_document() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("receipt.jpg");
    fs::write(&source, [0xFFu8, 0xD8, 0xFF, 0xE0]).unwrap();
    let package = dir.path().join("Groceries.note");

    let text = RichText::new()
        .with_run("Groceries ", TextAttributes::default().bold())
        .with_run("for Sunday", TextAttributes::default().with_font("Georgia"));
    let mut document = NoteDocument::new();
    document.set_text(text.clone());
    document.add_attachment(&source).unwrap();
    document.save_to(&package).unwrap();

    assert_eq!(document.state(), DocumentState::Saved);
    assert!(!document.is_dirty());
    assert!(package.join(TEXT_FILE_NAME).is_file());
    assert!(package.join(DOCUMENT_FILE_NAME).is_file());
    assert_eq!(
        fs::read(package.join(ATTACHMENTS_DIRECTORY_NAME).join("receipt.jpg")).unwrap(),
        vec![0xFFu8, 0xD8, 0xFF, 0xE0]
    );

    let reopened = NoteDocument::open(&package).unwrap();
    assert_eq!(reopened.text(), &text);
    let attached = reopened.attached_files().unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].name, "receipt.jpg");
    assert_eq!(attached[0].kind, NodeKind::RegularFile);
    assert_eq!(attached[0].size, 4);
}

#[test]
fn resave_overwrites_package_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("Note.note");

    let mut document = NoteDocument::new();
    document.set_text(RichText::plain("first"));
    document.save_to(&package).unwrap();
    document.set_text(RichText::plain("second"));
    assert!(document.is_dirty());
    document.save_to(&package).unwrap();

    let reopened = NoteDocument::open(&package).unwrap();
    assert_eq!(reopened.text().to_plain_string(), "second");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn open_keeps_unknown_entries_and_writes_them_back() {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("Legacy.note");
    fs::create_dir(&package).unwrap();
    fs::write(package.join(TEXT_FILE_NAME), b"{\\rtf1 legacy}").unwrap();
    fs::write(package.join("QuickLook.png"), b"thumb").unwrap();

    let mut document = NoteDocument::open(&package).unwrap();
    document.save_to(&package).unwrap();

    assert_eq!(fs::read(package.join("QuickLook.png")).unwrap(), b"thumb");
}

#[test]
fn open_missing_package_surfaces_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = NoteDocument::open(dir.path().join("absent.note")).err().unwrap();
    assert!(matches!(err, DocumentError::Io(BundleError::Io { .. })));
}

#[test]
fn failed_write_keeps_document_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("no-such-parent").join("Note.note");

    let mut document = NoteDocument::new();
    document.set_text(RichText::plain("unsaved"));
    let err = document.save_to(&package).unwrap_err();

    assert!(matches!(err, DocumentError::Io(_)));
    assert_eq!(document.state(), DocumentState::SaveFailed);
    assert!(document.is_dirty());
}
