use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlockstoreError {
    #[error("Block not found: {0}")]
    NotFound(Cid),
    #[error("Block {0} does not match its content hash")]
    Corrupted(Cid),
    #[error("Error while accessing the disk. {0}")]
    IOError(#[from] std::io::Error),
}

/// Content addressed block storage.
///
/// Blocks are immutable. Writing the same CID twice is a no-op, and implementations must be safe
/// for concurrent reads and writes of different CIDs.
#[async_trait]
pub trait BlockStore: Clone + Send + Sync + 'static {
    /// Fetch the bytes of a block, fails with [`BlockstoreError::NotFound`] when it is absent.
    async fn get(&self, cid: &Cid) -> Result<Bytes, BlockstoreError>;

    /// Store a block. The caller is trusted to provide the CID of `block`.
    async fn put(&self, cid: &Cid, block: Bytes) -> Result<(), BlockstoreError>;

    async fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError>;
}

/// Small mutable key-value storage for pointers such as the MFS root.
#[async_trait]
pub trait RootStore: Clone + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BlockstoreError>;

    async fn put(&self, key: &str, value: Bytes) -> Result<(), BlockstoreError>;
}
