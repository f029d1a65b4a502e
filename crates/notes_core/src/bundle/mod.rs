//! In-memory mirror of directory-style packages.
//!
//! # Responsibility
//! - Model a package as a tree of named directory and regular-file nodes.
//! - Funnel every filesystem read/write of a package through one surface.
//!
//! # Invariants
//! - Children of a directory are keyed by name; no duplicate names coexist.
//! - Every child carries a valid single-component name.
//! - Reads are eager: no file handle outlives the call that opened it.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod fs;
mod node;

pub use fs::{read_from_external_tree, write_to_external_path};
pub use node::{validate_name, BundleNode, NodeContents, NodeKind};

pub type BundleResult<T> = Result<T, BundleError>;

/// Error for package tree mutation and filesystem flattening.
#[derive(Debug)]
pub enum BundleError {
    /// Child operation attempted on a regular-file node.
    NotADirectory(String),
    /// Name is empty, a dot entry, contains a separator/NUL, or is not UTF-8.
    InvalidName(String),
    /// On-disk entry is neither a regular file nor a directory.
    UnsupportedEntry(PathBuf),
    /// Swapping a new package into `target` failed and the previous
    /// package could not be moved back; it was left at `kept`.
    RestoreFailed {
        target: PathBuf,
        kept: PathBuf,
        source: std::io::Error,
    },
    /// Underlying filesystem failure at `path`.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl BundleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for BundleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotADirectory(name) => write!(f, "bundle node `{name}` is not a directory"),
            Self::InvalidName(name) => write!(f, "invalid bundle entry name: `{name}`"),
            Self::UnsupportedEntry(path) => {
                write!(f, "unsupported filesystem entry: {}", path.display())
            }
            Self::RestoreFailed {
                target,
                kept,
                source,
            } => write!(
                f,
                "{}: {source}; previous package kept at {}",
                target.display(),
                kept.display()
            ),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for BundleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::RestoreFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
