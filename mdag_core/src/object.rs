//! DAG objects and their canonical binary encoding.
//!
//! Every object is keyed by the digest of exactly the bytes produced by
//! [`Object::encode`], so the encoding must stay stable:
//!
//! ```text
//! 0x00  4   "MDAG" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   kind: 1=blob, 2=index, 3=tree, 4=fragment
//! 0x06  2   reserved (must be 0)
//!
//! blob:
//! 0x08  8   payload_len (u64 LE)
//! 0x10  ... payload
//!
//! index / tree / fragment:
//! 0x08  8   link_count (u64 LE)
//!       ... per link:
//!             8  hash_len (u64 LE), hash bytes
//!             8  size (u64 LE)
//!             1  named flag (0 or 1)
//!             8  name_len (u64 LE), name bytes (only when named)
//!       8   tag_count (u64 LE, equals link_count)
//!       ... one tag byte per link: 1=blob, 2=index, 3=tree, 4=fragment
//! ```
//!
//! A directory with at most `fanout` entries is one tree whose links are all
//! named. A larger directory is sharded: the tree links fragments, unnamed and
//! tagged `fragment`, and the named entries sit in the fragments in order.
//! Fragments nest the same way when one level is not enough.

use crate::error::{Error, Result};
use crate::hash::Digest;
use serde::Serialize;

/// Magic bytes at the start of every serialized object.
pub const MAGIC: &[u8; 4] = b"MDAG";

/// Current object format version.
pub const VERSION: u8 = 1;

/// Size of the fixed object prefix in bytes.
pub const PREFIX_SIZE: usize = 8;

/// The three object shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// One block of file content.
    Blob = 1,
    /// An internal node of a multi-block file.
    Index = 2,
    /// A directory.
    Tree = 3,
    /// A slice of a directory too large for one tree.
    Fragment = 4,
}

impl ObjectKind {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ObjectKind::Blob),
            2 => Ok(ObjectKind::Index),
            3 => Ok(ObjectKind::Tree),
            4 => Ok(ObjectKind::Fragment),
            _ => Err(Error::invalid_object(format!(
                "Invalid object kind: {}",
                value
            ))),
        }
    }

    /// Get the string name of this object kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Index => "index",
            ObjectKind::Tree => "tree",
            ObjectKind::Fragment => "fragment",
        }
    }

    /// The tag a parent uses for a link to an object of this kind.
    pub fn link_kind(self) -> LinkKind {
        match self {
            ObjectKind::Blob => LinkKind::Blob,
            ObjectKind::Index => LinkKind::Index,
            ObjectKind::Tree => LinkKind::Tree,
            ObjectKind::Fragment => LinkKind::Fragment,
        }
    }
}

/// Type tag recorded for each link, telling a reader what it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// A leaf block, or a file small enough to be a single block.
    Blob = 1,
    /// An index node of a multi-block file.
    Index = 2,
    /// A directory tree.
    Tree = 3,
    /// Part of a sharded directory.
    Fragment = 4,
}

impl LinkKind {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(LinkKind::Blob),
            2 => Ok(LinkKind::Index),
            3 => Ok(LinkKind::Tree),
            4 => Ok(LinkKind::Fragment),
            _ => Err(Error::invalid_object(format!("Invalid link tag: {}", value))),
        }
    }

    /// Get the string name of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Blob => "blob",
            LinkKind::Index => "index",
            LinkKind::Tree => "tree",
            LinkKind::Fragment => "fragment",
        }
    }
}

/// A reference from a parent object to a child object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Entry name; set on the entry links of trees and fragments.
    pub name: Option<String>,
    /// Digest of the child object.
    pub hash: Digest,
    /// Byte length of the content under the child.
    pub size: u64,
}

impl Link {
    /// An unnamed link, as used inside index objects.
    pub fn unnamed(hash: Digest, size: u64) -> Self {
        Self {
            name: None,
            hash,
            size,
        }
    }

    /// A named link for a directory entry. The name is stored as given.
    pub fn named(name: impl Into<String>, hash: Digest, size: u64) -> Self {
        Self {
            name: Some(name.into()),
            hash,
            size,
        }
    }
}

/// Object payload: raw bytes for a blob, one tag per link otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectData {
    Raw(Vec<u8>),
    Tags(Vec<LinkKind>),
}

/// The unit of persisted storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    kind: ObjectKind,
    links: Vec<Link>,
    data: ObjectData,
}

impl Object {
    /// A leaf object holding one block of content.
    pub fn blob(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: ObjectKind::Blob,
            links: Vec::new(),
            data: ObjectData::Raw(payload.into()),
        }
    }

    /// An index object over already-stored children.
    pub fn index(entries: Vec<(Link, LinkKind)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::invalid_object("Index object needs at least one link"));
        }
        if let Some((link, _)) = entries.iter().find(|(link, _)| link.name.is_some()) {
            return Err(Error::invalid_object(format!(
                "Index link {} must not be named",
                link.hash
            )));
        }
        if let Some((_, tag)) = entries
            .iter()
            .find(|(_, tag)| matches!(tag, LinkKind::Tree | LinkKind::Fragment))
        {
            return Err(Error::invalid_object(format!(
                "Index object cannot link a {}",
                tag.as_str()
            )));
        }
        Ok(Self::linked(ObjectKind::Index, entries))
    }

    /// A tree object: either named directory entries in the given order, or
    /// unnamed links to the fragments of a sharded directory.
    pub fn tree(entries: Vec<(Link, LinkKind)>) -> Result<Self> {
        check_directory_links(ObjectKind::Tree, &entries)?;
        Ok(Self::linked(ObjectKind::Tree, entries))
    }

    /// A fragment of a sharded directory, shaped like [`Object::tree`].
    pub fn fragment(entries: Vec<(Link, LinkKind)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::invalid_object("Fragment needs at least one link"));
        }
        check_directory_links(ObjectKind::Fragment, &entries)?;
        Ok(Self::linked(ObjectKind::Fragment, entries))
    }

    fn linked(kind: ObjectKind, entries: Vec<(Link, LinkKind)>) -> Self {
        let (links, tags) = entries.into_iter().unzip();
        Self {
            kind,
            links,
            data: ObjectData::Tags(tags),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn data(&self) -> &ObjectData {
        &self.data
    }

    /// Link tags, parallel to [`Object::links`]. Empty for blobs.
    pub fn tags(&self) -> &[LinkKind] {
        match &self.data {
            ObjectData::Tags(tags) => tags,
            ObjectData::Raw(_) => &[],
        }
    }

    /// Byte length of the content this object covers.
    pub fn content_size(&self) -> u64 {
        match &self.data {
            ObjectData::Raw(payload) => payload.len() as u64,
            ObjectData::Tags(_) => self.links.iter().map(|link| link.size).sum(),
        }
    }

    /// Whether this tree or fragment links further fragments rather than
    /// directory entries.
    pub fn is_sharded(&self) -> bool {
        self.tags().first() == Some(&LinkKind::Fragment)
    }

    /// Encode the object to its canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len_hint());

        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.push(self.kind.to_u8());
        buf.extend_from_slice(&[0u8; 2]);

        match &self.data {
            ObjectData::Raw(payload) => {
                buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
                buf.extend_from_slice(payload);
            }
            ObjectData::Tags(tags) => {
                buf.extend_from_slice(&(self.links.len() as u64).to_le_bytes());
                for link in &self.links {
                    let hash = link.hash.as_bytes();
                    buf.extend_from_slice(&(hash.len() as u64).to_le_bytes());
                    buf.extend_from_slice(hash);
                    buf.extend_from_slice(&link.size.to_le_bytes());

                    match &link.name {
                        Some(name) => {
                            buf.push(1);
                            buf.extend_from_slice(&(name.len() as u64).to_le_bytes());
                            buf.extend_from_slice(name.as_bytes());
                        }
                        None => buf.push(0),
                    }
                }

                buf.extend_from_slice(&(tags.len() as u64).to_le_bytes());
                buf.extend(tags.iter().map(|tag| tag.to_u8()));
            }
        }

        buf
    }

    fn encoded_len_hint(&self) -> usize {
        match &self.data {
            ObjectData::Raw(payload) => PREFIX_SIZE + 8 + payload.len(),
            ObjectData::Tags(tags) => {
                let links: usize = self
                    .links
                    .iter()
                    .map(|link| 17 + link.hash.len() + link.name.as_ref().map_or(0, |n| 8 + n.len()))
                    .sum();
                PREFIX_SIZE + 16 + links + tags.len()
            }
        }
    }

    /// Decode an object from its canonical bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);

        let magic = reader.take(4)?;
        if magic != MAGIC {
            return Err(Error::invalid_object(format!(
                "Invalid magic: expected {:?}, got {:?}",
                MAGIC, magic
            )));
        }

        let version = reader.u8()?;
        if version != VERSION {
            return Err(Error::invalid_object(format!(
                "Unsupported version: {} (expected {})",
                version, VERSION
            )));
        }

        let kind = ObjectKind::from_u8(reader.u8()?)?;

        if reader.take(2)? != [0u8; 2] {
            return Err(Error::invalid_object("Reserved bytes must be 0"));
        }

        let object = match kind {
            ObjectKind::Blob => {
                let len = reader.len_u64()?;
                Object::blob(reader.take(len)?)
            }
            ObjectKind::Index | ObjectKind::Tree | ObjectKind::Fragment => {
                let link_count = reader.len_u64()?;
                let mut links = Vec::new();
                for _ in 0..link_count {
                    let hash_len = reader.len_u64()?;
                    let hash = Digest::from_bytes(reader.take(hash_len)?);
                    let size = reader.u64()?;
                    let name = match reader.u8()? {
                        0 => None,
                        1 => {
                            let name_len = reader.len_u64()?;
                            let bytes = reader.take(name_len)?.to_vec();
                            Some(String::from_utf8(bytes).map_err(|e| {
                                Error::invalid_object(format!("Invalid UTF-8 in name: {}", e))
                            })?)
                        }
                        flag => {
                            return Err(Error::invalid_object(format!(
                                "Invalid name flag: {}",
                                flag
                            )));
                        }
                    };
                    links.push(Link { name, hash, size });
                }

                let tag_count = reader.len_u64()?;
                if tag_count != link_count {
                    return Err(Error::invalid_object(format!(
                        "Tag count {} does not match link count {}",
                        tag_count, link_count
                    )));
                }
                let tags = reader
                    .take(tag_count)?
                    .iter()
                    .map(|b| LinkKind::from_u8(*b))
                    .collect::<Result<Vec<_>>>()?;

                let entries = links.into_iter().zip(tags).collect();
                match kind {
                    ObjectKind::Index => Object::index(entries)?,
                    ObjectKind::Tree => Object::tree(entries)?,
                    _ => Object::fragment(entries)?,
                }
            }
        };

        if !reader.is_empty() {
            return Err(Error::invalid_object(format!(
                "{} trailing bytes after object",
                reader.remaining()
            )));
        }

        Ok(object)
    }
}

/// Links of a tree or fragment are either all named entries, or all unnamed
/// links to fragments.
fn check_directory_links(kind: ObjectKind, entries: &[(Link, LinkKind)]) -> Result<()> {
    let sharded = entries.first().map(|(_, tag)| *tag) == Some(LinkKind::Fragment);

    for (link, tag) in entries {
        if sharded {
            if *tag != LinkKind::Fragment || link.name.is_some() {
                return Err(Error::invalid_tree_entry(format!(
                    "Sharded {} must link only unnamed fragments, found {} {}",
                    kind.as_str(),
                    tag.as_str(),
                    link.hash
                )));
            }
        } else if *tag == LinkKind::Fragment {
            return Err(Error::invalid_tree_entry(format!(
                "{} mixes entries with fragment {}",
                kind.as_str(),
                link.hash
            )));
        } else if link.name.is_none() {
            return Err(Error::invalid_tree_entry(format!(
                "{} entry {} has no name",
                kind.as_str(),
                link.hash
            )));
        }
    }

    Ok(())
}

/// Bounds-checked cursor over an encoded object.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(Error::invalid_object(format!(
                "Truncated object: needed {} bytes, {} left",
                n,
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    /// A u64 length field, rejected if it cannot fit in what is left.
    fn len_u64(&mut self) -> Result<usize> {
        let len = self.u64()?;
        if len > self.buf.len() as u64 {
            return Err(Error::invalid_object(format!(
                "Length {} exceeds remaining {} bytes",
                len,
                self.buf.len()
            )));
        }
        Ok(len as usize)
    }

    fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Blake3Hasher, DigestHasher};

    fn digest(data: &[u8]) -> Digest {
        Blake3Hasher::new().digest(data)
    }

    #[test]
    fn test_kind_conversions() {
        for kind in [
            ObjectKind::Blob,
            ObjectKind::Index,
            ObjectKind::Tree,
            ObjectKind::Fragment,
        ] {
            assert_eq!(ObjectKind::from_u8(kind.to_u8()).unwrap(), kind);
            assert_eq!(LinkKind::from_u8(kind.link_kind().to_u8()).unwrap(), kind.link_kind());
            assert_eq!(kind.link_kind().as_str(), kind.as_str());
        }
        assert!(ObjectKind::from_u8(0).is_err());
        assert!(ObjectKind::from_u8(5).is_err());
        assert!(LinkKind::from_u8(0).is_err());
    }

    #[test]
    fn test_blob_layout() {
        let encoded = Object::blob(b"abc".to_vec()).encode();
        assert_eq!(&encoded[0..4], MAGIC);
        assert_eq!(encoded[4], VERSION);
        assert_eq!(encoded[5], ObjectKind::Blob.to_u8());
        assert_eq!(&encoded[8..16], &3u64.to_le_bytes());
        assert_eq!(&encoded[16..], b"abc");
    }

    #[test]
    fn test_empty_blob_and_empty_tree_differ() {
        let blob = Object::blob(Vec::new()).encode();
        let tree = Object::tree(Vec::new()).unwrap().encode();
        assert_ne!(blob, tree);
        assert_ne!(digest(&blob), digest(&tree));
    }

    #[test]
    fn test_tree_roundtrip_preserves_order() {
        let entries = vec![
            (
                Link::named("zeta", digest(b"z"), 10),
                LinkKind::Blob,
            ),
            (
                Link::named("alpha", digest(b"a"), 0),
                LinkKind::Tree,
            ),
        ];
        let tree = Object::tree(entries).unwrap();
        let decoded = Object::decode(&tree.encode()).unwrap();

        assert_eq!(decoded, tree);
        assert_eq!(decoded.links()[0].name.as_deref(), Some("zeta"));
        assert_eq!(decoded.tags(), &[LinkKind::Blob, LinkKind::Tree]);
        assert_eq!(decoded.content_size(), 10);
    }

    #[test]
    fn test_index_roundtrip() {
        let index = Object::index(vec![
            (Link::unnamed(digest(b"1"), 4), LinkKind::Blob),
            (Link::unnamed(digest(b"2"), 8), LinkKind::Index),
        ])
        .unwrap();
        let decoded = Object::decode(&index.encode()).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(decoded.kind(), ObjectKind::Index);
        assert_eq!(decoded.content_size(), 12);
    }

    #[test]
    fn test_index_rejects_bad_links() {
        assert!(Object::index(Vec::new()).is_err());

        let named = Link::named("x", digest(b"x"), 1);
        assert!(Object::index(vec![(named, LinkKind::Blob)]).is_err());

        let tree_tag = Link::unnamed(digest(b"t"), 0);
        assert!(Object::index(vec![(tree_tag, LinkKind::Tree)]).is_err());

        let fragment_tag = Link::unnamed(digest(b"f"), 0);
        assert!(Object::index(vec![(fragment_tag, LinkKind::Fragment)]).is_err());
    }

    #[test]
    fn test_tree_rejects_unnamed_link() {
        let unnamed = Link::unnamed(digest(b"x"), 1);
        assert!(Object::tree(vec![(unnamed, LinkKind::Blob)]).is_err());
    }

    #[test]
    fn test_names_are_opaque() {
        let names = ["", "a/b", "bad\0name", "same", "same"];
        let mut entries: Vec<(Link, LinkKind)> = names
            .iter()
            .map(|name| (Link::named(*name, digest(name.as_bytes()), 1), LinkKind::Blob))
            .collect();
        entries.push((Link::named("x".repeat(70_000), digest(b"long"), 2), LinkKind::Blob));

        let tree = Object::tree(entries).unwrap();
        let decoded = Object::decode(&tree.encode()).unwrap();
        assert_eq!(decoded, tree);
        // An empty name is still a name, not an unnamed link.
        assert_eq!(decoded.links()[0].name.as_deref(), Some(""));
        assert_eq!(decoded.links()[5].name.as_ref().map(String::len), Some(70_000));
    }

    #[test]
    fn test_long_digest_roundtrip() {
        let wide = Digest::from_bytes(vec![0x5a; 70_000]);
        let index = Object::index(vec![
            (Link::unnamed(wide.clone(), 3), LinkKind::Blob),
            (Link::unnamed(digest(b"short"), 4), LinkKind::Blob),
        ])
        .unwrap();

        let decoded = Object::decode(&index.encode()).unwrap();
        assert_eq!(decoded.links()[0].hash, wide);
        assert_eq!(decoded, index);
    }

    #[test]
    fn test_sharded_tree_and_fragment() {
        let fragment = Object::fragment(vec![
            (Link::named("a", digest(b"a"), 1), LinkKind::Blob),
            (Link::named("b", digest(b"b"), 2), LinkKind::Tree),
        ])
        .unwrap();
        assert!(!fragment.is_sharded());
        assert_eq!(Object::decode(&fragment.encode()).unwrap(), fragment);

        let tree = Object::tree(vec![
            (Link::unnamed(digest(b"f1"), 3), LinkKind::Fragment),
            (Link::unnamed(digest(b"f2"), 4), LinkKind::Fragment),
        ])
        .unwrap();
        assert!(tree.is_sharded());
        assert_eq!(tree.content_size(), 7);
        assert_eq!(Object::decode(&tree.encode()).unwrap(), tree);

        assert!(Object::fragment(Vec::new()).is_err());
    }

    #[test]
    fn test_directory_links_do_not_mix() {
        let entry = (Link::named("a", digest(b"a"), 1), LinkKind::Blob);
        let shard = (Link::unnamed(digest(b"f"), 1), LinkKind::Fragment);
        let named_shard = (Link::named("f", digest(b"f"), 1), LinkKind::Fragment);

        assert!(Object::tree(vec![entry.clone(), shard.clone()]).is_err());
        assert!(Object::tree(vec![shard.clone(), entry.clone()]).is_err());
        assert!(Object::fragment(vec![named_shard]).is_err());
        assert!(Object::fragment(vec![shard, entry]).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let good = Object::blob(b"payload".to_vec()).encode();

        let mut bad_magic = good.clone();
        bad_magic[0] = b'X';
        assert!(Object::decode(&bad_magic).is_err());

        let mut bad_version = good.clone();
        bad_version[4] = 99;
        assert!(Object::decode(&bad_version).is_err());

        let mut bad_kind = good.clone();
        bad_kind[5] = 9;
        assert!(Object::decode(&bad_kind).is_err());

        let mut bad_reserved = good.clone();
        bad_reserved[6] = 1;
        assert!(Object::decode(&bad_reserved).is_err());

        assert!(Object::decode(&good[..good.len() - 1]).is_err());

        let mut trailing = good;
        trailing.push(0);
        assert!(Object::decode(&trailing).is_err());

        assert!(Object::decode(b"MD").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_name_flag() {
        let tree = Object::tree(vec![(Link::named("n", digest(b"n"), 1), LinkKind::Blob)]).unwrap();
        let mut encoded = tree.encode();
        // prefix, link count, hash length, hash, size, then the flag.
        let flag_at = PREFIX_SIZE + 8 + 8 + 32 + 8;
        assert_eq!(encoded[flag_at], 1);
        encoded[flag_at] = 2;
        assert!(Object::decode(&encoded).is_err());
    }

    #[test]
    fn test_decode_rejects_tag_mismatch() {
        let index = Object::index(vec![
            (Link::unnamed(digest(b"1"), 1), LinkKind::Blob),
            (Link::unnamed(digest(b"2"), 1), LinkKind::Blob),
        ])
        .unwrap();
        let mut encoded = index.encode();
        // Drop the last tag and patch the tag count down to 1.
        encoded.pop();
        let count_at = encoded.len() - 1 - 8;
        encoded[count_at..count_at + 8].copy_from_slice(&1u64.to_le_bytes());
        assert!(Object::decode(&encoded).is_err());
    }

    // Property-based tests
    use proptest::prelude::*;

    fn arb_link_kind() -> impl Strategy<Value = LinkKind> {
        prop::sample::select(vec![LinkKind::Blob, LinkKind::Index, LinkKind::Tree])
    }

    fn arb_tree() -> impl Strategy<Value = Object> {
        prop::collection::vec(
            (
                ".{0,40}",
                prop::collection::vec(any::<u8>(), 1..64),
                any::<u64>(),
                arb_link_kind(),
            ),
            0..20,
        )
        .prop_map(|entries| {
            let entries = entries
                .into_iter()
                .map(|(name, hash, size, tag)| {
                    (Link::named(name, Digest::from_bytes(hash), size), tag)
                })
                .collect();
            Object::tree(entries).unwrap()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Blob encoding round-trips any payload
        #[test]
        fn prop_blob_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..4096)) {
            let blob = Object::blob(payload.clone());
            let decoded = Object::decode(&blob.encode())?;
            prop_assert_eq!(decoded.data(), &ObjectData::Raw(payload));
        }

        /// Tree encoding round-trips and is canonical
        #[test]
        fn prop_tree_roundtrip(tree in arb_tree()) {
            let encoded = tree.encode();
            let decoded = Object::decode(&encoded)?;
            prop_assert_eq!(decoded.encode(), encoded);
            prop_assert_eq!(decoded, tree);
        }

        /// Truncating an encoding anywhere makes it undecodable
        #[test]
        fn prop_truncation_rejected(tree in arb_tree(), cut in any::<prop::sample::Index>()) {
            let encoded = tree.encode();
            let at = cut.index(encoded.len());
            prop_assert!(Object::decode(&encoded[..at]).is_err());
        }
    }
}
