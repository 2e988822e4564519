//! Digests and the hashing primitives objects are keyed by.
//!
//! The builder never assumes a particular algorithm or digest length: it is
//! generic over [`DigestHasher`] and treats digests as opaque byte strings.
//! BLAKE3 and SHA-256 implementations are provided.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use sha2::Digest as _;
use std::fmt;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    Blake3,
    /// SHA-256.
    Sha256,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
            Algorithm::Sha256 => "sha-256",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" => Ok(Algorithm::Blake3),
            "sha-256" => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Returns the algorithm ID byte (for stored object headers).
    pub fn id(&self) -> u8 {
        match self {
            Algorithm::Blake3 => 1,
            Algorithm::Sha256 => 2,
        }
    }

    /// Parse algorithm from ID byte.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Algorithm::Blake3),
            2 => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(format!("ID {}", id))),
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Algorithm::Blake3 | Algorithm::Sha256 => 32,
        }
    }

    /// A fresh hasher for this algorithm.
    pub fn hasher(&self) -> AnyHasher {
        match self {
            Algorithm::Blake3 => AnyHasher::Blake3(Blake3Hasher::new()),
            Algorithm::Sha256 => AnyHasher::Sha256(Sha256Hasher::new()),
        }
    }
}

/// A content digest of arbitrary length.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Create a Digest from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Digest(bytes.into())
    }

    /// Create a Digest from a hex string.
    ///
    /// Any non-empty, even-length hex string is accepted since the digest
    /// length depends on the algorithm that produced it.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.is_empty() {
            return Err(Error::invalid_digest("Empty hex string"));
        }

        if hex_str.len() % 2 != 0 {
            return Err(Error::invalid_digest(format!(
                "Odd number of hex characters: {}",
                hex_str.len()
            )));
        }

        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::invalid_digest(format!("Invalid hex: {}", e)))?;
        Ok(Digest(bytes))
    }

    /// Convert to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Get the first 2 hex characters (for directory sharding).
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(1)])
    }

    /// Get the remaining hex characters (for filename).
    pub fn suffix(&self) -> String {
        hex::encode(self.0.get(1..).unwrap_or_default())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for a zero-length digest.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// A resettable, incremental digest primitive.
///
/// The builder keeps the caller's hasher as a prototype and derives a fresh,
/// reset instance from it for every object, so one object's digest never
/// depends on bytes hashed for another.
pub trait DigestHasher: Clone + Send + Sync {
    /// Feed bytes into the hash state.
    fn update(&mut self, data: &[u8]);

    /// Produce the digest of everything fed so far and reset the state.
    fn finalize_reset(&mut self) -> Digest;

    /// Discard any accumulated state.
    fn reset(&mut self);

    /// Digest `data` with an independent instance.
    fn digest(&self, data: &[u8]) -> Digest {
        let mut hasher = self.clone();
        hasher.reset();
        hasher.update(data);
        hasher.finalize_reset()
    }
}

/// BLAKE3 (256-bit output).
#[derive(Clone, Default)]
pub struct Blake3Hasher(blake3::Hasher);

impl Blake3Hasher {
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }
}

impl DigestHasher for Blake3Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_reset(&mut self) -> Digest {
        let hash = self.0.finalize();
        self.0.reset();
        Digest::from_bytes(hash.as_bytes().to_vec())
    }

    fn reset(&mut self) {
        self.0.reset();
    }
}

/// SHA-256.
#[derive(Clone, Default)]
pub struct Sha256Hasher(sha2::Sha256);

impl Sha256Hasher {
    pub fn new() -> Self {
        Self(sha2::Sha256::new())
    }
}

impl DigestHasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_reset(&mut self) -> Digest {
        Digest::from_bytes(self.0.finalize_reset().to_vec())
    }

    fn reset(&mut self) {
        sha2::Digest::reset(&mut self.0);
    }
}

/// A hasher chosen at runtime from an [`Algorithm`].
#[derive(Clone)]
pub enum AnyHasher {
    Blake3(Blake3Hasher),
    Sha256(Sha256Hasher),
}

impl DigestHasher for AnyHasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            AnyHasher::Blake3(h) => h.update(data),
            AnyHasher::Sha256(h) => h.update(data),
        }
    }

    fn finalize_reset(&mut self) -> Digest {
        match self {
            AnyHasher::Blake3(h) => h.finalize_reset(),
            AnyHasher::Sha256(h) => h.finalize_reset(),
        }
    }

    fn reset(&mut self) {
        match self {
            AnyHasher::Blake3(h) => h.reset(),
            AnyHasher::Sha256(h) => h.reset(),
        }
    }
}
