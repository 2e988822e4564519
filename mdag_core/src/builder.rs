//! Building a Merkle-DAG from a file or directory.
//!
//! Files are split into fixed-size blocks, each stored as a blob object.
//! A file of more than one block gets a balanced index tree above its blobs,
//! no node linking more than `fanout` children. Directories become tree
//! objects linking each entry by name; a directory wider than `fanout` is
//! split into fragments under its tree the same way. Every object is keyed by
//! the digest of its own encoding and written only once.

use crate::chunking::{ChunkerConfig, split, subtree_capacity, tree_height};
use crate::error::{Error, Result};
use crate::hash::{Digest, DigestHasher};
use crate::node::{DirNode, FileNode, Node};
use crate::object::{Link, LinkKind, Object, ObjectKind};
use crate::store::KvStore;
use serde::Serialize;

/// A stored object as seen by its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub digest: Digest,
    /// Byte length of the content under this object.
    pub size: u64,
    pub kind: ObjectKind,
}

impl ChildRef {
    fn unnamed_link(&self) -> (Link, LinkKind) {
        (
            Link::unnamed(self.digest.clone(), self.size),
            self.kind.link_kind(),
        )
    }
}

/// Counters collected while building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Objects newly written to the store.
    pub objects_written: u64,
    /// Objects whose key was already present, so the write was skipped.
    pub objects_deduplicated: u64,
    /// Encoded bytes handed to the store.
    pub bytes_written: u64,
    pub blobs: u64,
    pub indexes: u64,
    pub trees: u64,
    /// Directory fragments written for directories wider than the fan-out.
    pub fragments: u64,
}

/// Builds DAGs into a store.
///
/// The hasher passed in acts as a prototype: each object is digested with a
/// fresh reset copy of it.
pub struct DagBuilder<'s, S: KvStore + ?Sized, H: DigestHasher> {
    store: &'s S,
    hasher: H,
    config: ChunkerConfig,
    stats: BuildStats,
}

impl<'s, S: KvStore + ?Sized, H: DigestHasher> DagBuilder<'s, S, H> {
    /// Create a builder with the default block size and fan-out.
    pub fn new(store: &'s S, hasher: H) -> Self {
        Self {
            store,
            hasher,
            config: ChunkerConfig::default(),
            stats: BuildStats::default(),
        }
    }

    /// Use a custom block size and fan-out.
    pub fn with_config(mut self, config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Counters accumulated over every build run by this builder.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Store `node` and everything below it, returning the root digest.
    pub fn build(&mut self, node: &Node) -> Result<Digest> {
        self.build_ref(node).map(|root| root.digest)
    }

    /// Like [`DagBuilder::build`], but also reports the root's kind and size.
    pub fn build_ref(&mut self, node: &Node) -> Result<ChildRef> {
        let root = match node {
            Node::File(file) => self.store_file(file.as_ref())?,
            Node::Directory(dir) => self.store_dir(dir.as_ref())?,
        };

        tracing::info!(
            root = %root.digest,
            kind = root.kind.as_str(),
            size = root.size,
            written = self.stats.objects_written,
            deduplicated = self.stats.objects_deduplicated,
            "built dag"
        );

        Ok(root)
    }

    /// Store a file as a single blob, or as blobs under an index tree.
    pub fn store_file(&mut self, file: &dyn FileNode) -> Result<ChildRef> {
        let bytes = file.bytes()?;
        if bytes.len() as u64 != file.size() {
            tracing::warn!(
                name = file.name(),
                reported = file.size(),
                actual = bytes.len(),
                "file size differs from its content length"
            );
        }

        let blocks = split(&bytes, self.config.block_size);
        if let [block] = blocks.as_slice() {
            return self.store_leaf(block);
        }

        let mut leaves = Vec::with_capacity(blocks.len());
        for block in &blocks {
            leaves.push(self.store_leaf(block)?);
        }

        let height = tree_height(leaves.len(), self.config.fanout);
        self.build_index(&leaves, height)
    }

    /// Store one block as a blob object.
    pub fn store_leaf(&mut self, block: &[u8]) -> Result<ChildRef> {
        let digest = self.put_object(&Object::blob(block))?;
        self.stats.blobs += 1;
        Ok(ChildRef {
            digest,
            size: block.len() as u64,
            kind: ObjectKind::Blob,
        })
    }

    /// Group `children` under index objects in a tree of the given height.
    ///
    /// Each level splits its children into contiguous groups that fit a
    /// subtree one level lower, so no index links more than `fanout`
    /// children. A group holding a single child is linked directly rather
    /// than wrapped in a one-link index.
    pub fn build_index(&mut self, children: &[ChildRef], height: u32) -> Result<ChildRef> {
        let fanout = self.config.fanout;

        match children {
            [] => return Err(Error::invalid_object("Cannot index zero children")),
            [only] => return Ok(only.clone()),
            _ => {}
        }

        if height == 0 || subtree_capacity(height, fanout) < children.len() {
            return Err(Error::invalid_object(format!(
                "{} children do not fit in an index tree of height {} with fan-out {}",
                children.len(),
                height,
                fanout
            )));
        }

        if height == 1 {
            return self.store_index(children);
        }

        let group_capacity = subtree_capacity(height - 1, fanout);
        let mut subtrees = Vec::with_capacity(children.len().div_ceil(group_capacity));
        for group in children.chunks(group_capacity) {
            subtrees.push(self.build_index(group, height - 1)?);
        }

        if let [only] = subtrees.as_slice() {
            return Ok(only.clone());
        }
        self.store_index(&subtrees)
    }

    fn store_index(&mut self, children: &[ChildRef]) -> Result<ChildRef> {
        let entries = children.iter().map(ChildRef::unnamed_link).collect();
        let object = Object::index(entries)?;
        let size = object.content_size();
        let digest = self.put_object(&object)?;
        self.stats.indexes += 1;
        Ok(ChildRef {
            digest,
            size,
            kind: ObjectKind::Index,
        })
    }

    /// Fold a directory into a tree object, storing its children first.
    ///
    /// Entry names are linked exactly as the node reports them. A directory
    /// with more than `fanout` entries is sharded into fragments.
    pub fn store_dir(&mut self, dir: &dyn DirNode) -> Result<ChildRef> {
        let mut entries = Vec::new();

        for child in dir.children()? {
            let child = child?;
            let stored = match &child {
                Node::File(file) => self.store_file(file.as_ref())?,
                Node::Directory(subdir) => self.store_dir(subdir.as_ref())?,
            };
            entries.push((
                Link::named(child.name(), stored.digest, stored.size),
                stored.kind.link_kind(),
            ));
        }

        let height = tree_height(entries.len(), self.config.fanout);
        let tree = self.store_entries(&entries, height, ObjectKind::Tree)?;

        if tree.size != dir.size() {
            tracing::warn!(
                name = dir.name(),
                reported = dir.size(),
                folded = tree.size,
                "directory size differs from the sum of its entries"
            );
        }

        Ok(tree)
    }

    /// Store named entries as one object of `kind` when they fit the fan-out,
    /// otherwise as a layer over fragments built one level lower.
    ///
    /// Entries keep their order across fragments. A fragment group that
    /// reduces to a single fragment is linked directly.
    fn store_entries(
        &mut self,
        entries: &[(Link, LinkKind)],
        height: u32,
        kind: ObjectKind,
    ) -> Result<ChildRef> {
        let fanout = self.config.fanout;

        let object = if entries.len() <= fanout || height <= 1 {
            Self::directory_object(kind, entries.to_vec())?
        } else {
            let group_capacity = subtree_capacity(height - 1, fanout);
            let mut fragments = Vec::with_capacity(entries.len().div_ceil(group_capacity));
            for group in entries.chunks(group_capacity) {
                fragments.push(self.store_entries(group, height - 1, ObjectKind::Fragment)?);
            }

            if kind == ObjectKind::Fragment {
                if let [only] = fragments.as_slice() {
                    return Ok(only.clone());
                }
            }
            let links = fragments.iter().map(ChildRef::unnamed_link).collect();
            Self::directory_object(kind, links)?
        };

        let size = object.content_size();
        let digest = self.put_object(&object)?;
        if kind == ObjectKind::Tree {
            self.stats.trees += 1;
        } else {
            self.stats.fragments += 1;
        }

        Ok(ChildRef { digest, size, kind })
    }

    fn directory_object(kind: ObjectKind, entries: Vec<(Link, LinkKind)>) -> Result<Object> {
        if kind == ObjectKind::Tree {
            Object::tree(entries)
        } else {
            Object::fragment(entries)
        }
    }

    /// Encode, digest and persist one object, skipping keys already stored.
    fn put_object(&mut self, object: &Object) -> Result<Digest> {
        let encoded = object.encode();
        let key = self.hasher.digest(&encoded);

        if self.store.has(&key)? {
            self.stats.objects_deduplicated += 1;
            tracing::debug!(key = %key, kind = object.kind().as_str(), "object already stored");
            return Ok(key);
        }

        self.store.put(&key, &encoded).map_err(|e| match e {
            Error::KeyConflict { .. } => e,
            other => Error::store_write(key.to_hex(), other),
        })?;

        self.stats.objects_written += 1;
        self.stats.bytes_written += encoded.len() as u64;
        tracing::debug!(
            key = %key,
            kind = object.kind().as_str(),
            len = encoded.len(),
            "stored object"
        );

        Ok(key)
    }
}

/// Store `node` with the default layout and return its root digest.
pub fn build<S, H>(store: &S, node: &Node, hasher: &H) -> Result<Digest>
where
    S: KvStore + ?Sized,
    H: DigestHasher,
{
    DagBuilder::new(store, hasher.clone()).build(node)
}
