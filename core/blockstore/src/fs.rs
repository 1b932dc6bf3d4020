//! Filesystem backed block and root stores.
//!
//! The layout of the root directory looks like this:
//!
//! ```txt
//! /ROOT/
//!     ./blocks/
//!         ./[cid]
//!     ./datastore/
//!         ./[hex(key)]
//!     ./tmp/
//!         ./[randomNames]
//! ```
//!
//! Every write goes to a fresh file under `tmp/` and is renamed into place once complete, so a
//! reader never observes a partially written block or pointer.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use fleek_ipld::hash::verify_block;
use lightning_utils::config::ConfigConsumer;
use rand::random;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, trace};

use crate::config::{Config, BLOCK_DIR, DATASTORE_DIR, TMP_DIR};
use crate::store::{BlockStore, BlockstoreError, RootStore};

#[derive(Clone, Debug)]
struct Layout {
    blocks: PathBuf,
    datastore: PathBuf,
    tmp: PathBuf,
}

impl Layout {
    async fn open(path: &Path) -> std::io::Result<Self> {
        // turn the root path into an absolute path. this will prevent any bugs from changing the
        // cwd after the store is opened.
        let mut root = std::env::current_dir()?;
        root.push(path);

        let layout = Self {
            blocks: root.join(BLOCK_DIR),
            datastore: root.join(DATASTORE_DIR),
            tmp: root.join(TMP_DIR),
        };
        fs::create_dir_all(&layout.blocks).await?;
        fs::create_dir_all(&layout.datastore).await?;
        fs::create_dir_all(&layout.tmp).await?;
        Ok(layout)
    }

    fn new_tmp_path(&self) -> PathBuf {
        let name: [u8; 16] = random();
        self.tmp.join(hex::encode(name))
    }

    async fn write_atomic(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
        let tmp = TmpFile::new(self.new_tmp_path());
        let mut file = fs::File::create(&tmp.path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);
        if let Err(e) = fs::rename(&tmp.path, path).await {
            error!("failed to move {:?} into place: {e}", tmp.path);
            return Err(e);
        }
        tmp.persisted();
        Ok(())
    }
}

/// A file under `tmp/`, removed on drop unless it was moved into place.
struct TmpFile {
    path: PathBuf,
    keep: bool,
}

impl TmpFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn persisted(mut self) {
        self.keep = true;
    }
}

impl Drop for TmpFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => trace!("removed leftover {:?}", self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => error!("failed to remove {:?}: {e}", self.path),
        }
    }
}

/// Block store keeping one file per block.
#[derive(Clone, Debug)]
pub struct FsBlockStore {
    layout: Layout,
}

impl ConfigConsumer for FsBlockStore {
    const KEY: &'static str = "blockstore";
    type Config = Config;
}

impl FsBlockStore {
    pub async fn init(config: Config) -> Result<Self, BlockstoreError> {
        let layout = Layout::open(&config.root).await?;
        Ok(Self { layout })
    }

    fn block_path(&self, cid: &Cid) -> PathBuf {
        self.layout.blocks.join(cid.to_string())
    }
}

#[async_trait]
impl BlockStore for FsBlockStore {
    async fn get(&self, cid: &Cid) -> Result<Bytes, BlockstoreError> {
        let path = self.block_path(cid);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlockstoreError::NotFound(*cid));
            },
            Err(e) => return Err(e.into()),
        };
        if verify_block(cid, &content).is_err() {
            error!("block {cid} failed hash verification");
            return Err(BlockstoreError::Corrupted(*cid));
        }
        Ok(content.into())
    }

    async fn put(&self, cid: &Cid, block: Bytes) -> Result<(), BlockstoreError> {
        let path = self.block_path(cid);
        if fs::try_exists(&path).await? {
            trace!("block {cid} already stored");
            return Ok(());
        }
        self.layout.write_atomic(&path, &block).await?;
        trace!("stored block {cid} ({} bytes)", block.len());
        Ok(())
    }

    async fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError> {
        Ok(fs::try_exists(self.block_path(cid)).await?)
    }
}

/// Root pointer store sharing the directory of a [`FsBlockStore`].
#[derive(Clone, Debug)]
pub struct FsRootStore {
    layout: Layout,
}

impl FsRootStore {
    pub async fn init(config: Config) -> Result<Self, BlockstoreError> {
        let layout = Layout::open(&config.root).await?;
        Ok(Self { layout })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.layout.datastore.join(hex::encode(key))
    }
}

#[async_trait]
impl RootStore for FsRootStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BlockstoreError> {
        match fs::read(self.key_path(key)).await {
            Ok(content) => Ok(Some(content.into())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), BlockstoreError> {
        let path = self.key_path(key);
        self.layout.write_atomic(&path, &value).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cid::Version;
    use fleek_ipld::hash::{block_cid, RAW};

    use super::*;

    fn config(dir: &tempfile::TempDir) -> Config {
        Config {
            root: dir.path().join("store"),
        }
    }

    #[tokio::test]
    async fn blocks_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let block = Bytes::from_static(b"some block");
        let cid = block_cid(&block, Version::V1, RAW).unwrap();

        let store = FsBlockStore::init(config(&dir)).await.unwrap();
        store.put(&cid, block.clone()).await.unwrap();
        store.put(&cid, block.clone()).await.unwrap();
        drop(store);

        let store = FsBlockStore::init(config(&dir)).await.unwrap();
        assert!(store.has(&cid).await.unwrap());
        assert_eq!(store.get(&cid).await.unwrap(), block);
    }

    #[tokio::test]
    async fn corrupted_blocks_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let block = Bytes::from_static(b"original");
        let cid = block_cid(&block, Version::V1, RAW).unwrap();

        let store = FsBlockStore::init(config(&dir)).await.unwrap();
        store.put(&cid, block).await.unwrap();
        std::fs::write(store.block_path(&cid), b"tampered").unwrap();

        assert!(matches!(
            store.get(&cid).await,
            Err(BlockstoreError::Corrupted(c)) if c == cid
        ));
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::init(config(&dir)).await.unwrap();
        let cid = block_cid(b"absent", Version::V1, RAW).unwrap();
        assert!(matches!(
            store.get(&cid).await,
            Err(BlockstoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn root_store_persists_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRootStore::init(config(&dir)).await.unwrap();
        assert!(store.get("/local/filesroot").await.unwrap().is_none());
        store
            .put("/local/filesroot", Bytes::from_static(b"pointer"))
            .await
            .unwrap();

        let store = FsRootStore::init(config(&dir)).await.unwrap();
        assert_eq!(
            store.get("/local/filesroot").await.unwrap(),
            Some(Bytes::from_static(b"pointer"))
        );
    }

    fn tmp_entries(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path().join("store").join(TMP_DIR))
            .unwrap()
            .count()
    }

    #[tokio::test]
    async fn failed_writes_leave_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRootStore::init(config(&dir)).await.unwrap();
        // a directory in the way makes the final rename fail.
        std::fs::create_dir(store.key_path("/local/filesroot")).unwrap();

        assert!(store
            .put("/local/filesroot", Bytes::from_static(b"pointer"))
            .await
            .is_err());
        assert_eq!(tmp_entries(&dir), 0);
    }

    #[tokio::test]
    async fn abandoned_temp_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::init(config(&dir)).await.unwrap();
        let tmp = TmpFile::new(store.layout.new_tmp_path());
        std::fs::write(&tmp.path, b"partial").unwrap();
        assert_eq!(tmp_entries(&dir), 1);
        drop(tmp);
        assert_eq!(tmp_entries(&dir), 0);

        let block = Bytes::from_static(b"complete");
        let cid = block_cid(&block, Version::V1, RAW).unwrap();
        store.put(&cid, block).await.unwrap();
        assert_eq!(tmp_entries(&dir), 0);
        assert!(store.has(&cid).await.unwrap());
    }
}
