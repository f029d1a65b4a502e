//! Package tree node.

use super::{BundleError, BundleResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Node kind discriminator used by read models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    RegularFile,
}

/// Payload of one package node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeContents {
    /// Children keyed by their preferred name, iterated in name order.
    Directory(BTreeMap<String, BundleNode>),
    /// Raw file bytes.
    RegularFile(Vec<u8>),
}

/// One node of a package tree.
///
/// The root of a package may carry an empty name; every node inserted as a
/// child must carry a name accepted by [`validate_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleNode {
    preferred_name: String,
    contents: NodeContents,
}

impl BundleNode {
    /// Creates an empty directory node.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            preferred_name: name.into(),
            contents: NodeContents::Directory(BTreeMap::new()),
        }
    }

    /// Creates a regular-file node holding `contents`.
    pub fn regular_file(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            preferred_name: name.into(),
            contents: NodeContents::RegularFile(contents.into()),
        }
    }

    /// Creates an unnamed, empty package root.
    pub fn empty_root() -> Self {
        Self::directory(String::new())
    }

    pub fn preferred_name(&self) -> &str {
        &self.preferred_name
    }

    /// Renames this node. Only meaningful before it is inserted into a parent.
    pub fn set_preferred_name(&mut self, name: impl Into<String>) {
        self.preferred_name = name.into();
    }

    pub fn contents(&self) -> &NodeContents {
        &self.contents
    }

    pub fn kind(&self) -> NodeKind {
        match self.contents {
            NodeContents::Directory(_) => NodeKind::Directory,
            NodeContents::RegularFile(_) => NodeKind::RegularFile,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind() == NodeKind::Directory
    }

    /// Returns file bytes, or `None` for directories.
    pub fn regular_file_contents(&self) -> Option<&[u8]> {
        match &self.contents {
            NodeContents::RegularFile(bytes) => Some(bytes.as_slice()),
            NodeContents::Directory(_) => None,
        }
    }

    /// Returns the children map, or `None` for regular files.
    pub fn children(&self) -> Option<&BTreeMap<String, BundleNode>> {
        match &self.contents {
            NodeContents::Directory(children) => Some(children),
            NodeContents::RegularFile(_) => None,
        }
    }

    /// Looks up a direct child by name.
    ///
    /// Returns `None` when no such child exists or `self` is a regular file.
    pub fn child_named(&self, name: &str) -> Option<&BundleNode> {
        self.children().and_then(|children| children.get(name))
    }

    /// Mutable variant of [`BundleNode::child_named`].
    pub fn child_named_mut(&mut self, name: &str) -> Option<&mut BundleNode> {
        match &mut self.contents {
            NodeContents::Directory(children) => children.get_mut(name),
            NodeContents::RegularFile(_) => None,
        }
    }

    /// Inserts `node` under its preferred name.
    ///
    /// A same-named child is replaced and returned.
    ///
    /// # Errors
    /// - `NotADirectory` when `self` is a regular file.
    /// - `InvalidName` when the child's name is not a valid entry name.
    pub fn add_child(&mut self, node: BundleNode) -> BundleResult<Option<BundleNode>> {
        validate_name(&node.preferred_name)?;
        match &mut self.contents {
            NodeContents::Directory(children) => {
                Ok(children.insert(node.preferred_name.clone(), node))
            }
            NodeContents::RegularFile(_) => {
                Err(BundleError::NotADirectory(self.preferred_name.clone()))
            }
        }
    }

    /// Inserts a regular file built from `contents` under `name`.
    pub fn add_regular_file(
        &mut self,
        name: impl Into<String>,
        contents: impl Into<Vec<u8>>,
    ) -> BundleResult<Option<BundleNode>> {
        self.add_child(BundleNode::regular_file(name, contents))
    }

    /// Removes the child named `name`.
    ///
    /// No-op returning `None` when absent or when `self` is a regular file.
    pub fn remove_child(&mut self, name: &str) -> Option<BundleNode> {
        match &mut self.contents {
            NodeContents::Directory(children) => children.remove(name),
            NodeContents::RegularFile(_) => None,
        }
    }

    /// Returns the directory child `name`, creating an empty one if missing.
    ///
    /// # Errors
    /// - `NotADirectory` when `self` is a regular file, or when the existing
    ///   child of that name is a regular file.
    pub fn directory_child_or_insert(&mut self, name: &str) -> BundleResult<&mut BundleNode> {
        validate_name(name)?;
        let parent_name = self.preferred_name.clone();
        let children = match &mut self.contents {
            NodeContents::Directory(children) => children,
            NodeContents::RegularFile(_) => return Err(BundleError::NotADirectory(parent_name)),
        };
        let child = children
            .entry(name.to_string())
            .or_insert_with(|| BundleNode::directory(name));
        if !child.is_directory() {
            return Err(BundleError::NotADirectory(name.to_string()));
        }
        Ok(child)
    }

    /// Total bytes of regular-file contents in this subtree.
    pub fn total_size(&self) -> u64 {
        match &self.contents {
            NodeContents::RegularFile(bytes) => bytes.len() as u64,
            NodeContents::Directory(children) => {
                children.values().map(BundleNode::total_size).sum()
            }
        }
    }
}

/// Validates a single package entry name.
///
/// # Errors
/// - `InvalidName` for empty names, `.`/`..`, or names containing `/`, `\`
///   or NUL.
pub fn validate_name(name: &str) -> BundleResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(BundleError::InvalidName(name.to_string()));
    }
    Ok(())
}
