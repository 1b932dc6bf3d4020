//! Content addressing for blocks produced by this crate.
//!
//! Every block is addressed by a sha2-256 multihash. Directory and file nodes use the DAG-PB
//! codec and can be addressed with either CIDv0 or CIDv1, raw leaves are always CIDv1.
use cid::{Cid, Version};
use multihash::{Code, MultihashDigest};

use crate::errors::IpldError;

/// Multicodec code for DAG-PB.
pub const DAG_PB: u64 = 0x70;
/// Multicodec code for raw binary blocks.
pub const RAW: u64 = 0x55;
/// Multicodec code for sha2-256.
pub const SHA2_256: u64 = 0x12;
/// Multicodec code for the truncated murmur3 hash used by HAMT shards.
pub const MURMUR3_X64_64: u64 = 0x22;

/// Compute the CID of `bytes` for the given codec.
///
/// CIDv0 only exists for DAG-PB, a request for a v0 raw CID is upgraded to v1.
pub fn block_cid(bytes: &[u8], version: Version, codec: u64) -> Result<Cid, IpldError> {
    let digest = Code::Sha2_256.digest(bytes);
    let hash = cid::multihash::Multihash::<64>::wrap(digest.code(), digest.digest())?;
    match version {
        Version::V0 if codec == DAG_PB => Ok(Cid::new_v0(hash)?),
        _ => Ok(Cid::new_v1(codec, hash)),
    }
}

/// Check that `bytes` hash to the multihash carried by `cid`.
pub fn verify_block(cid: &Cid, bytes: &[u8]) -> Result<(), IpldError> {
    if let Ok(hasher) = Code::try_from(cid.hash().code()) {
        if hasher.digest(bytes).digest() == cid.hash().digest() {
            Ok(())
        } else {
            Err(IpldError::MultihashError(*cid))
        }
    } else {
        Err(IpldError::MultihashCodeError(cid.hash().code()))
    }
}
