//! Filesystem flattening for package trees.
//!
//! # Invariants
//! - Reads are eager and recursive; symlinks to regular files are followed,
//!   symlinks to directories are rejected so a read always terminates.
//! - Writes go to a staging directory beside the target and are swapped in
//!   with renames; a failed write leaves the previous package in place.

use super::{BundleError, BundleNode, BundleResult, NodeContents};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const STAGING_PREFIX: &str = ".notes-staging-";
const STAGED_ENTRY: &str = "package";
const PREVIOUS_ENTRY: &str = "previous";

/// Builds an in-memory tree mirroring the file or directory at `path`.
///
/// The returned node is named after the last component of `path` (empty
/// when `path` has none, e.g. `/`).
///
/// # Errors
/// - `Io` when any entry cannot be stat'ed, listed or read.
/// - `UnsupportedEntry` for sockets, fifos, devices and directory symlinks.
/// - `InvalidName` for entry names that are not valid UTF-8.
pub fn read_from_external_tree(path: impl AsRef<Path>) -> BundleResult<BundleNode> {
    let path = path.as_ref();
    let name = match path.file_name() {
        None => String::new(),
        Some(raw) => raw
            .to_str()
            .ok_or_else(|| BundleError::InvalidName(raw.to_string_lossy().into_owned()))?
            .to_string(),
    };

    let node = read_node(path, name, true)?;
    debug!(
        "event=bundle_read module=bundle status=ok kind={:?} bytes={}",
        node.kind(),
        node.total_size()
    );
    Ok(node)
}

fn read_node(path: &Path, name: String, is_root: bool) -> BundleResult<BundleNode> {
    let link_metadata = fs::symlink_metadata(path).map_err(|err| BundleError::io(path, err))?;
    let metadata = if link_metadata.file_type().is_symlink() {
        fs::metadata(path).map_err(|err| BundleError::io(path, err))?
    } else {
        link_metadata.clone()
    };

    if metadata.is_file() {
        let bytes = fs::read(path).map_err(|err| BundleError::io(path, err))?;
        return Ok(BundleNode::regular_file(name, bytes));
    }

    if metadata.is_dir() {
        if link_metadata.file_type().is_symlink() && !is_root {
            return Err(BundleError::UnsupportedEntry(path.to_path_buf()));
        }
        let mut node = BundleNode::directory(name);
        let entries = fs::read_dir(path).map_err(|err| BundleError::io(path, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| BundleError::io(path, err))?;
            let child_name = entry.file_name().into_string().map_err(|raw| {
                BundleError::InvalidName(raw.to_string_lossy().into_owned())
            })?;
            let child = read_node(&entry.path(), child_name, false)?;
            node.add_child(child)?;
        }
        return Ok(node);
    }

    Err(BundleError::UnsupportedEntry(path.to_path_buf()))
}

/// Flattens `node` to disk at `path`, replacing whatever is there.
///
/// The parent directory of `path` must exist.
///
/// # Errors
/// - `Io` for any staging, write, sync or rename failure. Errors are never
///   swallowed; on failure the previous contents of `path` are kept.
/// - `RestoreFailed` when the swap fails and the previous package cannot be
///   moved back; it is left in a kept staging directory.
pub fn write_to_external_path(node: &BundleNode, path: impl AsRef<Path>) -> BundleResult<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&parent)
        .map_err(|err| BundleError::io(&parent, err))?;
    let staged = staging.path().join(STAGED_ENTRY);
    let previous = staging.path().join(PREVIOUS_ENTRY);
    write_node(node, &staged)?;
    let had_previous = move_aside(path, &previous)?;
    if let Err(err) = fs::rename(&staged, path) {
        if had_previous {
            return Err(restore_previous(staging, path, err));
        }
        return Err(BundleError::io(path, err));
    }

    if let Err(err) = staging.close() {
        warn!(
            "event=bundle_write module=bundle status=warn error_code=staging_cleanup_failed error={}",
            err
        );
    }
    debug!(
        "event=bundle_write module=bundle status=ok kind={:?} bytes={}",
        node.kind(),
        node.total_size()
    );
    Ok(())
}

fn write_node(node: &BundleNode, path: &Path) -> BundleResult<()> {
    match node.contents() {
        NodeContents::RegularFile(bytes) => {
            let mut file = File::create(path).map_err(|err| BundleError::io(path, err))?;
            file.write_all(bytes)
                .map_err(|err| BundleError::io(path, err))?;
            file.sync_all().map_err(|err| BundleError::io(path, err))?;
        }
        NodeContents::Directory(children) => {
            fs::create_dir(path).map_err(|err| BundleError::io(path, err))?;
            for (name, child) in children {
                write_node(child, &path.join(name))?;
            }
        }
    }
    Ok(())
}

fn move_aside(target: &Path, previous: &Path) -> BundleResult<bool> {
    match fs::symlink_metadata(target) {
        Ok(_) => {
            fs::rename(target, previous).map_err(|err| BundleError::io(target, err))?;
            Ok(true)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(BundleError::io(target, err)),
    }
}

/// Moves the set-aside package back to `target` after a failed swap.
///
/// When that also fails the staging directory is kept on disk so the
/// previous package survives, and the error names where it was left.
fn restore_previous(staging: TempDir, target: &Path, swap_err: std::io::Error) -> BundleError {
    let previous = staging.path().join(PREVIOUS_ENTRY);
    match fs::rename(&previous, target) {
        Ok(()) => BundleError::io(target, swap_err),
        Err(restore_err) => {
            let kept = staging.keep().join(PREVIOUS_ENTRY);
            warn!(
                "event=bundle_write module=bundle status=error error_code=restore_failed kept={} error={}",
                kept.display(),
                restore_err
            );
            BundleError::RestoreFailed {
                target: target.to_path_buf(),
                kept,
                source: swap_err,
            }
        }
    }
}
