//! File-system nodes.
//!
//! Directories are listed one level at a time with the `ignore` walker, so
//! hidden files are included and `.gitignore` rules apply. Children come back
//! sorted by file name. File content is read only when the builder asks for it.

use crate::builder::DagBuilder;
use crate::error::{Error, Result};
use crate::hash::{Digest, DigestHasher};
use crate::node::{Children, DirNode, FileNode, Node};
use crate::store::KvStore;
use std::borrow::Cow;
use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

/// Open `path` as a node. The path itself may be a symlink; entries below it
/// may not.
pub fn fs_node(path: impl AsRef<Path>) -> Result<Node> {
    let path = path.as_ref();
    let metadata = fs::metadata(path)?;
    let name = root_name(path);

    if metadata.is_file() {
        Ok(Node::file(FsFile::new(path, name, metadata.len())))
    } else if metadata.is_dir() {
        Ok(Node::directory(FsDir::new(path, name)))
    } else {
        Err(Error::unsupported_file_type(path))
    }
}

/// Build the DAG for `path` into `store` with the default layout.
pub fn build_path<S, H>(store: &S, path: impl AsRef<Path>, hasher: &H) -> Result<Digest>
where
    S: KvStore + ?Sized,
    H: DigestHasher,
{
    let node = fs_node(path)?;
    DagBuilder::new(store, hasher.clone()).build(&node)
}

fn root_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A regular file on disk.
#[derive(Debug, Clone)]
pub struct FsFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl FsFile {
    fn new(path: &Path, name: String, size: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            name,
            size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileNode for FsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Owned(fs::read(&self.path)?))
    }
}

/// A directory on disk.
#[derive(Debug)]
pub struct FsDir {
    path: PathBuf,
    name: String,
    size: OnceCell<u64>,
}

impl FsDir {
    fn new(path: &Path, name: String) -> Self {
        Self {
            path: path.to_path_buf(),
            name,
            size: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn walker(&self) -> ignore::WalkBuilder {
        let mut builder = ignore::WalkBuilder::new(&self.path);
        builder
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder
    }

    fn list(&self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        let mut walker = self.walker();
        walker.max_depth(Some(1));
        for entry in walker.build() {
            let entry = entry?;
            let entry_path = entry.path();
            if entry.depth() == 0 {
                continue;
            }

            let name = entry_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    Error::invalid_tree_entry(format!(
                        "Non UTF-8 file name: {}",
                        entry_path.display()
                    ))
                })?
                .to_string();

            let metadata = fs::symlink_metadata(entry_path)?;
            let file_type = metadata.file_type();
            if file_type.is_file() {
                nodes.push(Node::file(FsFile::new(entry_path, name, metadata.len())));
            } else if file_type.is_dir() {
                nodes.push(Node::directory(FsDir::new(entry_path, name)));
            } else {
                return Err(Error::unsupported_file_type(entry_path));
            }
        }

        tracing::trace!(path = %self.path.display(), entries = nodes.len(), "listed directory");
        Ok(nodes)
    }
}

impl DirNode for FsDir {
    fn name(&self) -> &str {
        &self.name
    }

    /// Total size of the regular files below this directory.
    ///
    /// Computed on first use. Entries that cannot be read are left out.
    fn size(&self) -> u64 {
        *self.size.get_or_init(|| {
            self.walker()
                .build()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
                .filter_map(|entry| entry.metadata().ok())
                .map(|metadata| metadata.len())
                .sum()
        })
    }

    fn children(&self) -> Result<Children<'_>> {
        Ok(Box::new(self.list()?.into_iter().map(Ok)))
    }
}
