//! # mdag core
//!
//! Content-addressed Merkle-DAG construction for files and directory trees.
//!
//! Files are cut into fixed-size blocks and stored as blob objects; a file of
//! more than one block gets a balanced tree of index objects above them, each
//! linking at most `fanout` children. Directories become tree objects linking
//! their entries by name. Every object is stored under the digest of its
//! canonical encoding, so equal content is always stored once and yields the
//! same root digest.
//!
//! ## Features
//!
//! - Fixed-size chunking with a configurable block size and fan-out
//! - Pluggable digest algorithms (BLAKE3, SHA-256, or any [`DigestHasher`])
//! - Pluggable key-value stores: in-memory or an on-disk object store
//! - Strict, versioned binary object format
//!
//! ## Example
//!
//! ```no_run
//! use mdag_core::{DagBuilder, FsStore, fs_node};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open a store created with `FsStore::init`
//! let store = FsStore::open("./mdag-store")?;
//!
//! // Build a directory into it using the store's layout
//! let node = fs_node("./my-data")?;
//! let mut builder = DagBuilder::new(&store, store.hasher())
//!     .with_config(store.chunker_config())?;
//! let root = builder.build(&node)?;
//!
//! println!("{} ({} new objects)", root, builder.stats().objects_written);
//! # Ok(())
//! # }
//! ```

mod builder;
mod chunking;
mod error;
mod fs_store;
mod hash;
mod node;
mod object;
mod store;
mod walk;

pub use builder::{BuildStats, ChildRef, DagBuilder, build};
pub use chunking::{
    ChunkerConfig, DEFAULT_BLOCK_SIZE, DEFAULT_FANOUT, block_count, split, subtree_capacity,
    tree_height,
};
pub use error::{Error, Result};
pub use fs_store::{CompressionType, EnvelopeHeader, FsStore};
pub use hash::{AnyHasher, Algorithm, Blake3Hasher, Digest, DigestHasher, Sha256Hasher};
pub use node::{Children, DirNode, FileNode, MemDir, MemFile, Node};
pub use object::{Link, LinkKind, Object, ObjectData, ObjectKind};
pub use store::{KvStore, MemoryStore};
pub use walk::{FsDir, FsFile, build_path, fs_node};
