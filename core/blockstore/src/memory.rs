use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use parking_lot::RwLock;

use crate::store::{BlockStore, BlockstoreError, RootStore};

#[derive(Clone, Default)]
pub struct MemoryBlockStore {
    pub(crate) inner: Arc<RwLock<HashMap<Cid, Bytes>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks held by the store.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn get(&self, cid: &Cid) -> Result<Bytes, BlockstoreError> {
        self.inner
            .read()
            .get(cid)
            .cloned()
            .ok_or(BlockstoreError::NotFound(*cid))
    }

    async fn put(&self, cid: &Cid, block: Bytes) -> Result<(), BlockstoreError> {
        self.inner.write().entry(*cid).or_insert(block);
        Ok(())
    }

    async fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError> {
        Ok(self.inner.read().contains_key(cid))
    }
}

#[derive(Clone, Default)]
pub struct MemoryRootStore {
    inner: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryRootStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RootStore for MemoryRootStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BlockstoreError> {
        Ok(self.inner.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), BlockstoreError> {
        self.inner.write().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cid::Version;
    use fleek_ipld::hash::{block_cid, RAW};

    use super::*;

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = MemoryBlockStore::new();
        let block = Bytes::from_static(b"hello");
        let cid = block_cid(&block, Version::V1, RAW).unwrap();
        store.put(&cid, block.clone()).await.unwrap();
        store.put(&cid, block.clone()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&cid).await.unwrap(), block);
        assert!(store.has(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let store = MemoryBlockStore::new();
        let cid = block_cid(b"nope", Version::V1, RAW).unwrap();
        assert!(matches!(
            store.get(&cid).await,
            Err(BlockstoreError::NotFound(c)) if c == cid
        ));
        assert!(!store.has(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn root_store_overwrites() {
        let store = MemoryRootStore::new();
        assert!(store.get("/local/filesroot").await.unwrap().is_none());
        store.put("/local/filesroot", Bytes::from_static(b"a")).await.unwrap();
        store.put("/local/filesroot", Bytes::from_static(b"b")).await.unwrap();
        assert_eq!(
            store.get("/local/filesroot").await.unwrap(),
            Some(Bytes::from_static(b"b"))
        );
    }
}
