//! Fixed-size block splitting and index-tree geometry.

use crate::error::{Error, Result};

/// Default maximum block size: 256 KiB.
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Default maximum number of links per index or tree object.
pub const DEFAULT_FANOUT: usize = 4096;

/// Configuration for the chunker and the index-tree builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Maximum block size in bytes. Only the last block of a file may be smaller.
    pub block_size: usize,
    /// Maximum number of links in one index or tree object.
    pub fanout: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            fanout: DEFAULT_FANOUT,
        }
    }
}

impl ChunkerConfig {
    /// Create a config with the given block size and fan-out.
    pub fn new(block_size: usize, fanout: usize) -> Result<Self> {
        let config = Self { block_size, fanout };
        config.validate()?;
        Ok(config)
    }

    /// Check that the config can describe a tree.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::invalid_config("block_size must be at least 1"));
        }
        if self.fanout < 2 {
            return Err(Error::invalid_config(format!(
                "fanout must be at least 2, got {}",
                self.fanout
            )));
        }
        Ok(())
    }
}

/// Number of blocks a payload of `len` bytes splits into.
///
/// An empty payload still occupies one (empty) block.
pub fn block_count(len: usize, block_size: usize) -> usize {
    len.div_ceil(block_size).max(1)
}

/// Split `data` into ordered, non-overlapping blocks of at most `block_size` bytes.
///
/// Every block is exactly `block_size` long except possibly the last.
/// Empty input yields a single empty block.
pub fn split(data: &[u8], block_size: usize) -> Vec<&[u8]> {
    if data.is_empty() {
        return vec![data];
    }
    data.chunks(block_size).collect()
}

/// Minimum height `h >= 1` such that `fanout^h >= count`.
pub fn tree_height(count: usize, fanout: usize) -> u32 {
    let mut height = 1;
    let mut capacity = fanout;
    while capacity < count {
        height += 1;
        capacity = capacity.saturating_mul(fanout);
    }
    height
}

/// Number of leaves one subtree of the given height can hold.
pub fn subtree_capacity(height: u32, fanout: usize) -> usize {
    fanout.saturating_pow(height)
}
