//! Hashing of entry names into HAMT slot indices.
//!
//! A name is hashed with murmur3 x64 128 (seed 0) and only the first 64 bits of the digest are
//! kept, in big-endian order. Slot indices are read from that buffer most significant bit first,
//! `log2(fanout)` bits per level. When a deep bucket needs more bits than the buffer holds, the
//! name is hashed again with a one byte round counter appended and the new digest is appended to
//! the buffer.
use std::io::Cursor;

use crate::error::{MfsError, Result};

/// The 8 byte HAMT hash of `data`.
pub fn hamt_hash(data: &[u8]) -> Result<[u8; 8]> {
    let digest = murmur3::murmur3_x64_128(&mut Cursor::new(data), 0)?;
    // the low half of the digest is the first 64 bit word (h1).
    Ok((digest as u64).to_be_bytes())
}

/// A lazily extended stream of hash bits for one name.
#[derive(Clone, Debug)]
pub struct HashBits {
    name: Vec<u8>,
    buffer: Vec<u8>,
    position: usize,
    rounds: u8,
}

impl HashBits {
    pub fn new(name: &[u8]) -> Result<Self> {
        Ok(Self {
            name: name.to_vec(),
            buffer: hamt_hash(name)?.to_vec(),
            position: 0,
            rounds: 0,
        })
    }

    fn extend(&mut self) -> Result<()> {
        self.rounds = self.rounds.checked_add(1).ok_or_else(|| {
            MfsError::StructuralCorruption("hash bits exhausted for a single name".into())
        })?;
        let mut salted = Vec::with_capacity(self.name.len() + 1);
        salted.extend_from_slice(&self.name);
        salted.push(self.rounds);
        self.buffer.extend_from_slice(&hamt_hash(&salted)?);
        Ok(())
    }

    /// Consume the next `bits` bits as an integer.
    pub fn take(&mut self, bits: u32) -> Result<usize> {
        let bits = bits as usize;
        while self.buffer.len() * 8 - self.position < bits {
            self.extend()?;
        }
        let mut value = 0usize;
        for _ in 0..bits {
            let byte = self.buffer[self.position / 8];
            let bit = (byte >> (7 - self.position % 8)) & 1;
            value = (value << 1) | bit as usize;
            self.position += 1;
        }
        Ok(value)
    }
}

/// The slot `name` falls into in a bucket at `depth` (the shard root is depth 0).
pub fn slot_at_depth(name: &str, depth: usize, bits: u32) -> Result<usize> {
    let mut hash = HashBits::new(name.as_bytes())?;
    for _ in 0..depth {
        hash.take(bits)?;
    }
    hash.take(bits)
}
