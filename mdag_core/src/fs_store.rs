//! On-disk object store.
//!
//! Values are written to `objects/{algorithm}/{prefix}/{suffix}` with a
//! 16-byte envelope header in front of the payload:
//!
//! ```text
//! 0x00  4   "MDGS" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   algo: 1=blake3-256, 2=sha-256
//! 0x06  1   compression: 0=none, 1=zstd
//! 0x07  1   reserved (must be 0)
//! 0x08  8   payload_len (u64 LE) - stored (possibly compressed) size
//! 0x10  ... payload
//! ```
//!
//! Compression is transparent: keys are always digests of the uncompressed
//! value.

use crate::chunking::{ChunkerConfig, DEFAULT_BLOCK_SIZE, DEFAULT_FANOUT};
use crate::error::{Error, Result};
use crate::hash::{Algorithm, AnyHasher, Digest};
use crate::store::KvStore;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every object file.
pub const MAGIC: &[u8; 4] = b"MDGS";

/// Current envelope format version.
pub const VERSION: u8 = 1;

/// Size of the envelope header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Compression threshold: values >= 4KB are compressed.
const COMPRESSION_THRESHOLD: usize = 4096;

/// Compression types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression.
    None = 0,
    /// Zstandard compression.
    Zstd = 1,
}

impl CompressionType {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zstd),
            _ => Err(Error::invalid_object(format!(
                "Invalid compression type: {}",
                value
            ))),
        }
    }
}

/// The 16-byte envelope header of a stored object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub algorithm: Algorithm,
    pub compression: CompressionType,
    /// Length of the stored payload (compressed size if compressed).
    pub payload_len: u64,
}

impl EnvelopeHeader {
    /// Encode the header to a 16-byte array.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = VERSION;
        buf[5] = self.algorithm.id();
        buf[6] = self.compression.to_u8();
        buf[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Decode a header from the start of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::invalid_object(format!(
                "Header too short: {} bytes (expected {})",
                buf.len(),
                HEADER_SIZE
            )));
        }

        if &buf[0..4] != MAGIC {
            return Err(Error::invalid_object(format!(
                "Invalid magic: expected {:?}, got {:?}",
                MAGIC,
                &buf[0..4]
            )));
        }

        if buf[4] != VERSION {
            return Err(Error::invalid_object(format!(
                "Unsupported envelope version: {}",
                buf[4]
            )));
        }

        let algorithm = Algorithm::from_id(buf[5])?;
        let compression = CompressionType::from_u8(buf[6])?;

        if buf[7] != 0 {
            return Err(Error::invalid_object(format!(
                "Reserved byte must be 0, got {}",
                buf[7]
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[8..16]);

        Ok(Self {
            algorithm,
            compression,
            payload_len: u64::from_le_bytes(len_bytes),
        })
    }
}

/// A content-addressed store rooted at a directory.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    algorithm: Algorithm,
    chunker: ChunkerConfig,
}

impl FsStore {
    /// Initialize a new store at the given path.
    ///
    /// Creates `objects/{algorithm}/` and a `config` file recording the
    /// algorithm and the DAG layout, so later builds against this store
    /// produce comparable digests.
    pub fn init<P: AsRef<Path>>(
        root: P,
        algorithm: Algorithm,
        chunker: ChunkerConfig,
    ) -> Result<Self> {
        chunker.validate()?;
        let root = root.as_ref().to_path_buf();

        let objects_dir = root.join("objects").join(algorithm.as_str());
        fs::create_dir_all(&objects_dir)?;

        let config_content = format!(
            "version=1\nalgo={}\nblock_size={}\nfanout={}\n",
            algorithm.as_str(),
            chunker.block_size,
            chunker.fanout
        );
        fs::write(root.join("config"), config_content)?;

        tracing::info!(root = %root.display(), algo = algorithm.as_str(), "initialized store");

        Ok(Self {
            root,
            algorithm,
            chunker,
        })
    }

    /// Open an existing store at the given path.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(Error::invalid_store(&root, "directory does not exist"));
        }

        let config_path = root.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_store(&root, "config file not found"));
        }

        let config_content = fs::read_to_string(&config_path)?;
        let (algorithm, chunker) = Self::parse_config(&config_content)?;

        let objects_dir = root.join("objects").join(algorithm.as_str());
        if !objects_dir.exists() {
            return Err(Error::invalid_store(
                &root,
                "objects directory structure missing",
            ));
        }

        Ok(Self {
            root,
            algorithm,
            chunker,
        })
    }

    /// Parse the config file into the algorithm and DAG layout.
    fn parse_config(content: &str) -> Result<(Algorithm, ChunkerConfig)> {
        let mut version = None;
        let mut algo = None;
        let mut block_size = None;
        let mut fanout = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    "block_size" => block_size = Some(parse_usize("block_size", value)?),
                    "fanout" => fanout = Some(parse_usize("fanout", value)?),
                    _ => {}
                }
            }
        }

        if version != Some("1") {
            return Err(Error::invalid_config(format!(
                "Unsupported config version: {:?}",
                version
            )));
        }

        let algo_str = algo.ok_or_else(|| Error::invalid_config("Missing algo in config"))?;
        let algorithm = Algorithm::parse(algo_str)?;

        let chunker = ChunkerConfig::new(
            block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
            fanout.unwrap_or(DEFAULT_FANOUT),
        )?;

        Ok((algorithm, chunker))
    }

    /// Get the path to an object file given its key.
    ///
    /// Returns: `objects/{algorithm}/{prefix}/{suffix}`
    pub fn object_path(&self, key: &Digest) -> PathBuf {
        self.root
            .join("objects")
            .join(self.algorithm.as_str())
            .join(key.prefix())
            .join(key.suffix())
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the algorithm used by this store.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// A hasher matching the store's algorithm.
    pub fn hasher(&self) -> AnyHasher {
        self.algorithm.hasher()
    }

    /// DAG layout recorded in the store config.
    pub fn chunker_config(&self) -> ChunkerConfig {
        self.chunker
    }

    /// Read and unwrap the value in an object file.
    fn read_value(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = fs::File::open(path)?;

        let mut header_buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_buf)
            .map_err(|e| Error::corrupted_object(path, format!("Unreadable header: {}", e)))?;
        let header = EnvelopeHeader::decode(&header_buf)
            .map_err(|e| Error::corrupted_object(path, e.to_string()))?;

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;

        if payload.len() as u64 != header.payload_len {
            return Err(Error::corrupted_object(
                path,
                format!(
                    "Payload length mismatch: expected {}, got {}",
                    header.payload_len,
                    payload.len()
                ),
            ));
        }

        match header.compression {
            CompressionType::None => Ok(payload),
            CompressionType::Zstd => decompress_zstd(&payload),
        }
    }

    /// Write an object atomically using tempfile.
    fn write_value_atomic(&self, path: &Path, value: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::invalid_store(&self.root, "object path has no parent"))?;
        fs::create_dir_all(parent)?;

        let (payload, compression) = if value.len() >= COMPRESSION_THRESHOLD {
            (compress_zstd(value)?, CompressionType::Zstd)
        } else {
            (value.to_vec(), CompressionType::None)
        };

        let header = EnvelopeHeader {
            algorithm: self.algorithm,
            compression,
            payload_len: payload.len() as u64,
        };

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(&header.encode())?;
        temp_file.write_all(&payload)?;
        temp_file.flush()?;
        temp_file.persist(path)?;

        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::invalid_config(format!("Invalid {}: {:?} ({})", key, value.trim(), e)))
}

impl KvStore for FsStore {
    fn has(&self, key: &Digest) -> Result<bool> {
        Ok(self.object_path(key).exists())
    }

    fn put(&self, key: &Digest, value: &[u8]) -> Result<()> {
        let path = self.object_path(key);
        if path.exists() {
            let existing = self.read_value(&path)?;
            if existing != value {
                return Err(Error::key_conflict(key.to_hex()));
            }
            return Ok(());
        }
        self.write_value_atomic(&path, value)
    }

    fn get(&self, key: &Digest) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(key);
        if !path.exists() {
            return Ok(None);
        }
        self.read_value(&path).map(Some)
    }

    fn delete(&self, key: &Digest) -> Result<bool> {
        let path = self.object_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Compress data using zstd.
fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3) // Level 3 = fast compression
        .map_err(|e| Error::compression_error(format!("zstd compression failed: {}", e)))
}

/// Decompress data using zstd.
fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data)
        .map_err(|e| Error::compression_error(format!("zstd decompression failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::DigestHasher;
    use tempfile::TempDir;

    fn init_store(temp_dir: &TempDir) -> FsStore {
        FsStore::init(temp_dir.path(), Algorithm::Blake3, ChunkerConfig::default()).unwrap()
    }

    fn keyed(store: &FsStore, value: &[u8]) -> Digest {
        store.hasher().digest(value)
    }

    #[test]
    fn test_store_init() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("store");

        let chunker = ChunkerConfig::new(1024, 16).unwrap();
        let store = FsStore::init(&store_path, Algorithm::Sha256, chunker).unwrap();
        assert_eq!(store.root(), store_path);
        assert_eq!(store.algorithm(), Algorithm::Sha256);

        assert!(store_path.join("objects/sha-256").exists());

        let config = fs::read_to_string(store_path.join("config")).unwrap();
        assert!(config.contains("version=1"));
        assert!(config.contains("algo=sha-256"));
        assert!(config.contains("block_size=1024"));
        assert!(config.contains("fanout=16"));
    }

    #[test]
    fn test_store_open_roundtrips_config() {
        let temp_dir = TempDir::new().unwrap();
        let chunker = ChunkerConfig::new(64, 8).unwrap();
        FsStore::init(temp_dir.path(), Algorithm::Blake3, chunker).unwrap();

        let store = FsStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.algorithm(), Algorithm::Blake3);
        assert_eq!(store.chunker_config(), chunker);
    }

    #[test]
    fn test_store_open_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        assert!(FsStore::open(temp_dir.path().join("nonexistent")).is_err());
    }

    #[test]
    fn test_store_open_invalid_no_config() {
        let temp_dir = TempDir::new().unwrap();
        assert!(FsStore::open(temp_dir.path()).is_err());
    }

    #[test]
    fn test_init_rejects_bad_layout() {
        let temp_dir = TempDir::new().unwrap();
        let bad = ChunkerConfig {
            block_size: 0,
            fanout: 4,
        };
        assert!(FsStore::init(temp_dir.path(), Algorithm::Blake3, bad).is_err());
    }

    #[test]
    fn test_parse_config_defaults_layout() {
        let (algo, chunker) = FsStore::parse_config("version=1\nalgo=blake3-256\n").unwrap();
        assert_eq!(algo, Algorithm::Blake3);
        assert_eq!(chunker, ChunkerConfig::default());
    }

    #[test]
    fn test_parse_config_with_comments() {
        let config = "# Comment\nversion=1\nalgo=sha-256\nfanout=32\n# Another comment\n";
        let (algo, chunker) = FsStore::parse_config(config).unwrap();
        assert_eq!(algo, Algorithm::Sha256);
        assert_eq!(chunker.fanout, 32);
        assert_eq!(chunker.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_parse_config_invalid() {
        assert!(FsStore::parse_config("version=99\nalgo=blake3-256\n").is_err());
        assert!(FsStore::parse_config("version=1\n").is_err());
        assert!(FsStore::parse_config("version=1\nalgo=md5\n").is_err());
        assert!(FsStore::parse_config("version=1\nalgo=blake3-256\nfanout=x\n").is_err());
        assert!(FsStore::parse_config("version=1\nalgo=blake3-256\nfanout=1\n").is_err());
    }

    #[test]
    fn test_object_path() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let key = keyed(&store, b"test");
        let path = store.object_path(&key);
        assert!(path.ends_with(format!(
            "objects/blake3-256/{}/{}",
            key.prefix(),
            key.suffix()
        )));
    }

    #[test]
    fn test_put_get_small() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let key = keyed(&store, b"hello world");
        store.put(&key, b"hello world").unwrap();

        assert!(store.has(&key).unwrap());
        assert_eq!(store.get(&key).unwrap().unwrap(), b"hello world");

        let raw = fs::read(store.object_path(&key)).unwrap();
        let header = EnvelopeHeader::decode(&raw).unwrap();
        assert_eq!(header.compression, CompressionType::None);
    }

    #[test]
    fn test_put_get_large_is_compressed() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let value = vec![0xAB; 64 * 1024];
        let key = keyed(&store, &value);
        store.put(&key, &value).unwrap();

        let raw = fs::read(store.object_path(&key)).unwrap();
        let header = EnvelopeHeader::decode(&raw).unwrap();
        assert_eq!(header.compression, CompressionType::Zstd);
        assert!(raw.len() < value.len());

        assert_eq!(store.get(&key).unwrap().unwrap(), value);
    }

    #[test]
    fn test_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);
        let key = keyed(&store, b"nonexistent");
        assert_eq!(store.get(&key).unwrap(), None);
        assert!(!store.has(&key).unwrap());
    }

    #[test]
    fn test_put_idempotent_and_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let key = keyed(&store, b"same content");
        store.put(&key, b"same content").unwrap();
        store.put(&key, b"same content").unwrap();

        let err = store.put(&key, b"other content").unwrap_err();
        assert!(matches!(err, Error::KeyConflict { .. }));
        assert_eq!(store.get(&key).unwrap().unwrap(), b"same content");
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let key = keyed(&store, b"bye");
        store.put(&key, b"bye").unwrap();
        assert!(store.delete(&key).unwrap());
        assert!(!store.delete(&key).unwrap());
        assert!(!store.has(&key).unwrap());
    }

    #[test]
    fn test_corruption_detection() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let key = keyed(&store, b"test");
        store.put(&key, b"test").unwrap();

        let path = store.object_path(&key);
        let mut raw = fs::read(&path).unwrap();
        raw.truncate(raw.len() - 1);
        fs::write(&path, raw).unwrap();

        let err = store.get(&key).unwrap_err();
        assert!(matches!(err, Error::CorruptedObject { .. }));
    }

    #[test]
    fn test_header_too_short_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let store = init_store(&temp_dir);

        let key = keyed(&store, b"short");
        let path = store.object_path(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"short").unwrap();

        assert!(matches!(
            store.get(&key).unwrap_err(),
            Error::CorruptedObject { .. }
        ));
    }

    #[test]
    fn test_header_decode_rejects_garbage() {
        let header = EnvelopeHeader {
            algorithm: Algorithm::Blake3,
            compression: CompressionType::None,
            payload_len: 10,
        };
        let good = header.encode();
        assert_eq!(EnvelopeHeader::decode(&good).unwrap(), header);

        let mut bad = good;
        bad[0] = b'X';
        assert!(EnvelopeHeader::decode(&bad).is_err());

        let mut bad = good;
        bad[4] = 9;
        assert!(EnvelopeHeader::decode(&bad).is_err());

        let mut bad = good;
        bad[6] = 99;
        assert!(EnvelopeHeader::decode(&bad).is_err());

        let mut bad = good;
        bad[7] = 1;
        assert!(EnvelopeHeader::decode(&bad).is_err());
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 56,
            max_shrink_iters: 1000,
            ..ProptestConfig::default()
        })]

        /// Compression round-trip preserves data
        #[test]
        fn prop_compression_roundtrip(data in prop::collection::vec(any::<u8>(), 0..100_000)) {
            let compressed = compress_zstd(&data)?;
            let decompressed = decompress_zstd(&compressed)?;
            prop_assert_eq!(decompressed, data, "Compression must be lossless");
        }

        /// Stored values come back unchanged whether or not they were compressed
        #[test]
        fn prop_put_get_roundtrip(data in prop::collection::vec(any::<u8>(), 0..10_000)) {
            let temp_dir = TempDir::new().unwrap();
            let store = init_store(&temp_dir);

            let key = keyed(&store, &data);
            store.put(&key, &data)?;

            let raw = std::fs::read(store.object_path(&key))?;
            let header = EnvelopeHeader::decode(&raw)?;
            if data.len() < COMPRESSION_THRESHOLD {
                prop_assert_eq!(header.compression, CompressionType::None);
            } else {
                prop_assert_eq!(header.compression, CompressionType::Zstd);
            }

            prop_assert_eq!(store.get(&key)?, Some(data));
        }
    }
}
