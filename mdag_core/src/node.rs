//! Input nodes: the file and directory capabilities the builder consumes.
//!
//! The builder does not care where bytes come from. Anything that can expose
//! a file's content or a directory's children can be turned into a DAG;
//! [`crate::walk`] adapts the local file system and [`MemFile`] / [`MemDir`]
//! hold a tree in memory.

use crate::error::Result;
use std::borrow::Cow;
use std::fmt;

/// Iterator over a directory's children, in the order they should be linked.
pub type Children<'a> = Box<dyn Iterator<Item = Result<Node>> + 'a>;

/// A file: named raw content.
pub trait FileNode {
    fn name(&self) -> &str;

    /// Byte length of the content.
    fn size(&self) -> u64;

    /// The full content.
    fn bytes(&self) -> Result<Cow<'_, [u8]>>;
}

/// A directory: a named, ordered collection of child nodes.
pub trait DirNode {
    fn name(&self) -> &str;

    /// Total recursive size as reported by the source.
    ///
    /// The builder computes its own total and only compares against this.
    fn size(&self) -> u64;

    /// Children in iteration order. The builder never re-sorts them.
    fn children(&self) -> Result<Children<'_>>;
}

/// A file-system node.
pub enum Node {
    File(Box<dyn FileNode>),
    Directory(Box<dyn DirNode>),
}

impl Node {
    pub fn file(file: impl FileNode + 'static) -> Self {
        Node::File(Box::new(file))
    }

    pub fn directory(dir: impl DirNode + 'static) -> Self {
        Node::Directory(Box::new(dir))
    }

    pub fn name(&self) -> &str {
        match self {
            Node::File(file) => file.name(),
            Node::Directory(dir) => dir.name(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Node::File(file) => file.size(),
            Node::Directory(dir) => dir.size(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { "Directory" } else { "File" };
        f.debug_struct(kind)
            .field("name", &self.name())
            .field("size", &self.size())
            .finish()
    }
}

/// An in-memory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemFile {
    name: String,
    data: Vec<u8>,
}

impl MemFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn into_node(self) -> Node {
        Node::file(self)
    }
}

impl FileNode for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&self.data))
    }
}

/// An in-memory directory whose children are yielded in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemDir {
    name: String,
    entries: Vec<MemEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MemEntry {
    File(MemFile),
    Dir(MemDir),
}

impl MemDir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append a file entry.
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.entries.push(MemEntry::File(MemFile::new(name, data)));
        self
    }

    /// Append a subdirectory entry.
    pub fn with_dir(mut self, dir: MemDir) -> Self {
        self.entries.push(MemEntry::Dir(dir));
        self
    }

    /// Same entries under a different name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_node(self) -> Node {
        Node::directory(self)
    }
}

impl DirNode for MemDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| match entry {
                MemEntry::File(file) => file.size(),
                MemEntry::Dir(dir) => dir.size(),
            })
            .sum()
    }

    fn children(&self) -> Result<Children<'_>> {
        Ok(Box::new(self.entries.iter().map(|entry| {
            Ok(match entry {
                MemEntry::File(file) => Node::file(file.clone()),
                MemEntry::Dir(dir) => Node::directory(dir.clone()),
            })
        })))
    }
}
