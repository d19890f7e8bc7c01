use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::path::STREAM_MARKER;

// ---------------------------------------------------------------------------
// TreeNode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Stream,
    Directory,
    File,
}

/// One entry of the stream/directory namespace.
///
/// Built fresh for every request. Names are unique among siblings; stream
/// names carry the leading [`STREAM_MARKER`].
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub kind: NodeKind,
    /// Depot-relative location reported by accurev, used to expand a
    /// directory later. `None` for streams.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Bytes; files only.
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    /// Child name to position in `children`, kept by [`TreeNode::add_child`].
    #[serde(skip)]
    child_index: HashMap<String, usize>,
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.location == other.location
            && self.size == other.size
            && self.last_modified == other.last_modified
            && self.children == other.children
    }
}

impl Eq for TreeNode {}

impl TreeNode {
    /// A stream node; the marker is added if `name` lacks it.
    pub fn stream(name: &str) -> Self {
        let name = if name.starts_with(STREAM_MARKER) {
            name.to_string()
        } else {
            format!("{STREAM_MARKER}{name}")
        };
        Self::container(name, NodeKind::Stream, None)
    }

    pub fn directory(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self::container(name.into(), NodeKind::Directory, Some(location.into()))
    }

    pub fn file(name: impl Into<String>, size: u64, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            location: None,
            size,
            last_modified: Some(last_modified),
            children: Vec::new(),
            child_index: HashMap::new(),
        }
    }

    fn container(name: String, kind: NodeKind, location: Option<String>) -> Self {
        Self {
            name,
            kind,
            location,
            size: 0,
            last_modified: None,
            children: Vec::new(),
            child_index: HashMap::new(),
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind != NodeKind::File
    }

    /// Stream name without the marker. Only meaningful for stream nodes.
    pub fn stream_name(&self) -> &str {
        self.name.trim_start_matches(STREAM_MARKER)
    }

    /// Attach `node` as a child and return it.
    ///
    /// If a sibling of the same name exists and both are containers, the
    /// existing node (with its children) is kept; otherwise it is replaced.
    pub fn add_child(&mut self, node: TreeNode) -> &mut TreeNode {
        if self.child_index.len() != self.children.len() {
            self.reindex();
        }
        let index = match self.child_position(&node.name) {
            Some(i) => {
                let existing = &mut self.children[i];
                if existing.is_container() && node.is_container() {
                    if existing.location.is_none() {
                        existing.location = node.location;
                    }
                } else {
                    *existing = node;
                }
                i
            }
            None => {
                let i = self.children.len();
                self.child_index.insert(node.name.clone(), i);
                self.children.push(node);
                i
            }
        };
        &mut self.children[index]
    }

    /// Direct child by exact name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.child_position(name).map(|i| &self.children[i])
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        self.child_position(name).map(|i| &mut self.children[i])
    }

    /// Position of the child called `name`. Falls back to a scan when
    /// `children` was edited directly and the index no longer matches.
    fn child_position(&self, name: &str) -> Option<usize> {
        if self.child_index.len() == self.children.len() {
            self.child_index
                .get(name)
                .copied()
                .filter(|&i| self.children.get(i).is_some_and(|c| c.name == name))
        } else {
            self.children.iter().position(|c| c.name == name)
        }
    }

    fn reindex(&mut self) {
        self.child_index.clear();
        for (i, child) in self.children.iter().enumerate() {
            self.child_index.entry(child.name.clone()).or_insert(i);
        }
    }

    /// Depth-first, pre-order search of the whole subtree (including `self`)
    /// by exact name. When names collide across branches the first node
    /// visited wins.
    pub fn find(&self, name: &str) -> Option<&TreeNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Mutable counterpart of [`TreeNode::find`], same visiting order.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        if self.name == name {
            return Some(self);
        }
        for child in &mut self.children {
            if let Some(hit) = child.find_mut(name) {
                return Some(hit);
            }
        }
        None
    }

    /// Follow `segments` child by child; `None` if any segment is absent.
    pub fn walk(&self, segments: &[String]) -> Option<&TreeNode> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Number of nodes in the subtree, `self` included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Longest root-to-leaf chain, counting nodes.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }

    /// One-level listing of this node, labelled with `path`.
    pub fn to_listing(&self, path: &str) -> DirectoryListing {
        let mut listing = DirectoryListing {
            path: path.to_string(),
            directories: Vec::new(),
            files: Vec::new(),
        };
        for child in &self.children {
            match child.kind {
                NodeKind::Stream | NodeKind::Directory => {
                    listing.directories.push(child.name.clone())
                }
                NodeKind::File => listing.files.push(FileEntry {
                    name: child.name.clone(),
                    size: child.size,
                    last_modified: child.last_modified.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                    attributes: FileAttributes::Normal,
                }),
            }
        }
        listing
    }
}

// ---------------------------------------------------------------------------
// Listing shape
// ---------------------------------------------------------------------------

/// A single directory level: sub-directory names and file records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub path: String,
    pub directories: Vec<String>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub attributes: FileAttributes,
}

/// accurev reports no file attributes; every element is `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAttributes {
    Normal,
}
