//! This module provides data structures to represent the UnixFS data model.
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use cid::Cid;
use ipld_dagpb::PbLink;

use crate::errors::IpldError;

/// A named link to another IPLD node.
///
/// `size` is the cumulative size of the target as recorded by the parent (the DAG-PB `Tsize`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub name: String,
    pub cid: Cid,
    pub size: u64,
}

impl Link {
    pub fn new(name: impl Into<String>, cid: Cid, size: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            size,
        }
    }

    pub(crate) fn try_from_pb(owner: &Cid, link: &PbLink) -> Result<Self, IpldError> {
        let name = link
            .name
            .clone()
            .ok_or_else(|| IpldError::UnnamedLink(*owner))?;
        Ok(Self::new(name, link.cid, link.size.unwrap_or_default()))
    }
}

impl From<&Link> for PbLink {
    fn from(link: &Link) -> Self {
        PbLink {
            cid: link.cid,
            name: Some(link.name.clone()),
            size: Some(link.size),
        }
    }
}

/// Modification time of a node, seconds since the unix epoch and an optional nanosecond part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mtime {
    pub secs: i64,
    pub nsecs: Option<u32>,
}

impl Mtime {
    pub fn new(secs: i64, nsecs: Option<u32>) -> Self {
        Self { secs, nsecs }
    }

    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: now.as_secs() as i64,
            nsecs: Some(now.subsec_nanos()),
        }
    }
}

/// The optional POSIX-like attributes UnixFS carries for files and directories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub mode: Option<u32>,
    pub mtime: Option<Mtime>,
}

impl Metadata {
    pub fn new(mode: Option<u32>, mtime: Option<Mtime>) -> Self {
        Self { mode, mtime }
    }

    /// Bump the mtime to now, only when the node already tracks one.
    pub fn touch_if_set(&mut self) {
        if self.mtime.is_some() {
            self.mtime = Some(Mtime::now());
        }
    }
}

/// A directory whose links are the full child names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatDirectory {
    pub links: Vec<Link>,
    pub metadata: Metadata,
}

impl FlatDirectory {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            links: Vec::new(),
            metadata,
        }
    }

    pub fn find(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.name == name)
    }
}

/// One block of a HAMT sharded directory, either the shard root or a subshard.
///
/// Link names are either a slot prefix (a pointer to a subshard) or the slot prefix followed by
/// the child name (a leaf entry).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardedDirectory {
    pub links: Vec<Link>,
    pub metadata: Metadata,
    pub fanout: u64,
    pub hash_type: u64,
    /// Occupied slots, big-endian: slot 0 is the lowest bit of the last byte.
    pub bitfield: Bytes,
}

impl ShardedDirectory {
    /// Returns true if `slot` is marked as occupied in the bitfield.
    pub fn is_occupied(&self, slot: usize) -> bool {
        let byte = slot / 8;
        if byte >= self.bitfield.len() {
            return false;
        }
        let index = self.bitfield.len() - 1 - byte;
        self.bitfield[index] & (1 << (slot % 8)) != 0
    }
}

/// Build a big-endian occupancy bitfield of `fanout / 8` bytes.
pub fn bitfield_from_slots(fanout: u64, slots: impl IntoIterator<Item = usize>) -> Bytes {
    let len = (fanout as usize).div_ceil(8);
    let mut bits = vec![0u8; len];
    for slot in slots {
        let index = len - 1 - slot / 8;
        bits[index] |= 1 << (slot % 8);
    }
    bits.into()
}

/// A decoded directory block, flat or sharded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryNode {
    Flat(FlatDirectory),
    Sharded(ShardedDirectory),
}

impl DirectoryNode {
    /// An empty flat directory without attributes.
    pub fn empty() -> Self {
        Self::Flat(FlatDirectory::default())
    }

    pub fn is_sharded(&self) -> bool {
        matches!(self, Self::Sharded(_))
    }

    pub fn links(&self) -> &[Link] {
        match self {
            Self::Flat(dir) => &dir.links,
            Self::Sharded(dir) => &dir.links,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::Flat(dir) => &dir.metadata,
            Self::Sharded(dir) => &dir.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Self::Flat(dir) => &mut dir.metadata,
            Self::Sharded(dir) => &mut dir.metadata,
        }
    }
}

/// A UnixFS file node. Small files keep their bytes in `data`, larger files link to chunks and
/// record the size of each chunk in `blocksizes`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileNode {
    pub data: Option<Bytes>,
    pub links: Vec<Link>,
    pub blocksizes: Vec<u64>,
    pub filesize: Option<u64>,
    pub metadata: Metadata,
}

impl FileNode {
    /// The logical size of the file in bytes.
    pub fn file_size(&self) -> u64 {
        self.filesize.unwrap_or_else(|| {
            self.data.as_ref().map(|d| d.len() as u64).unwrap_or_default()
                + self.blocksizes.iter().sum::<u64>()
        })
    }
}

/// Any node this crate knows how to decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnixFsNode {
    Directory(DirectoryNode),
    File(FileNode),
    Symlink(String),
    Raw(Bytes),
}

impl UnixFsNode {
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn try_into_dir(self, cid: &Cid) -> Result<DirectoryNode, IpldError> {
        match self {
            Self::Directory(dir) => Ok(dir),
            _ => Err(IpldError::InvalidDir(*cid)),
        }
    }

    /// Links carried by the node, empty for raw leaves and symlinks.
    pub fn links(&self) -> &[Link] {
        match self {
            Self::Directory(dir) => dir.links(),
            Self::File(file) => &file.links,
            _ => &[],
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Directory(dir) => Some(dir.metadata()),
            Self::File(file) => Some(&file.metadata),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitfield_is_big_endian() {
        let bits = bitfield_from_slots(256, [0, 9, 255]);
        assert_eq!(bits.len(), 32);
        assert_eq!(bits[31], 0b0000_0001);
        assert_eq!(bits[30], 0b0000_0010);
        assert_eq!(bits[0], 0b1000_0000);
    }

    #[test]
    fn occupied_reads_the_bitfield() {
        let dir = ShardedDirectory {
            links: vec![],
            metadata: Metadata::default(),
            fanout: 256,
            hash_type: 0x22,
            bitfield: bitfield_from_slots(256, [3, 200]),
        };
        assert!(dir.is_occupied(3));
        assert!(dir.is_occupied(200));
        assert!(!dir.is_occupied(4));
        assert!(!dir.is_occupied(300));
    }

    #[test]
    fn touch_only_refreshes_existing_mtime() {
        let mut meta = Metadata::default();
        meta.touch_if_set();
        assert_eq!(meta.mtime, None);

        let mut meta = Metadata::new(None, Some(Mtime::new(1, None)));
        meta.touch_if_set();
        assert!(meta.mtime.unwrap().secs > 1);
    }
}
