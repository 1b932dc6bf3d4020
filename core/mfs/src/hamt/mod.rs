//! HAMT sharded directories.
//!
//! A shard is held in memory as an arena of buckets, see [`Hamt`]. Buckets below the root are
//! only read from the block store when an operation descends into them, and only the buckets an
//! operation touched are serialized again when the shard is flushed.
pub mod bucket;
mod flush;
pub mod hash;

pub use bucket::{BucketId, Hamt, Occupant, Position, ROOT};
pub use flush::Flushed;

use crate::error::{MfsError, Result};

/// Fanout and hash function of a shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HamtOptions {
    fanout: u64,
    hash_type: u64,
}

impl HamtOptions {
    pub fn new(fanout: u64, hash_type: u64) -> Result<Self> {
        if !fanout.is_power_of_two() || fanout < 2 || fanout > 1 << 16 {
            return Err(MfsError::StructuralCorruption(format!(
                "fanout {fanout} is not a supported power of two"
            )));
        }
        if hash_type != fleek_ipld::hash::MURMUR3_X64_64 {
            return Err(MfsError::StructuralCorruption(format!(
                "unsupported hamt hash type 0x{hash_type:x}"
            )));
        }
        Ok(Self { fanout, hash_type })
    }

    pub fn fanout(&self) -> u64 {
        self.fanout
    }

    pub fn hash_type(&self) -> u64 {
        self.hash_type
    }

    /// Number of hash bits consumed per level.
    pub fn bits(&self) -> u32 {
        self.fanout.trailing_zeros()
    }

    pub fn prefix_len(&self) -> usize {
        format!("{:X}", self.fanout - 1).len()
    }

    /// The link name prefix of `slot`: uppercase hex, zero padded to [`Self::prefix_len`].
    pub fn prefix(&self, slot: usize) -> String {
        format!("{:0width$X}", slot, width = self.prefix_len())
    }

    /// Split a link name into its slot and the remaining child name. The remainder is empty for
    /// links to subshards.
    pub fn parse_prefix<'a>(&self, name: &'a str) -> Option<(usize, &'a str)> {
        let len = self.prefix_len();
        let prefix = name.get(..len)?;
        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let slot = usize::from_str_radix(prefix, 16).ok()?;
        if slot as u64 >= self.fanout {
            return None;
        }
        Some((slot, &name[len..]))
    }
}
