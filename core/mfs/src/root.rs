use bytes::Bytes;
use cid::{Cid, Version};
use fleek_ipld::DirectoryNode;
use lightning_blockstore::{BlockStore, RootStore};

use crate::dag::Dag;
use crate::error::{MfsError, Result};

/// Key under which the root of the MFS tree is stored.
pub const MFS_ROOT_KEY: &str = "/local/filesroot";

/// The persisted pointer to the current root directory.
#[derive(Clone)]
pub struct RootPointer<R> {
    roots: R,
    key: String,
}

impl<R: RootStore> RootPointer<R> {
    pub fn new(store: R) -> Self {
        Self::with_key(store, MFS_ROOT_KEY)
    }

    pub fn with_key(store: R, key: impl Into<String>) -> Self {
        Self {
            roots: store,
            key: key.into(),
        }
    }

    /// Read the current root. A missing pointer is corruption, it is created when the file
    /// system is opened.
    pub async fn load(&self) -> Result<Cid> {
        let bytes = self.roots.get(&self.key).await?.ok_or_else(|| {
            MfsError::StructuralCorruption(format!("root pointer '{}' is missing", self.key))
        })?;
        Cid::try_from(bytes.as_ref()).map_err(|e| {
            MfsError::StructuralCorruption(format!(
                "root pointer '{}' does not hold a cid: {e}",
                self.key
            ))
        })
    }

    /// Read the current root, creating and publishing an empty directory on first use. Callers
    /// must hold the exclusive lock.
    pub async fn load_or_init<B: BlockStore>(
        &self,
        dag: &Dag<B>,
        version: Version,
    ) -> Result<Cid> {
        if self.roots.get(&self.key).await?.is_some() {
            return self.load().await;
        }

        let stored = dag.put_dir(DirectoryNode::empty(), version, true).await?;
        self.store(dag, &stored.cid).await?;
        tracing::info!("initialized empty mfs root {}", stored.cid);
        Ok(stored.cid)
    }

    /// Publish `cid` as the new root, unless the operation was cancelled.
    pub async fn store<B: BlockStore>(&self, dag: &Dag<B>, cid: &Cid) -> Result<()> {
        dag.check_cancelled()?;
        self.roots
            .put(&self.key, Bytes::from(cid.to_bytes()))
            .await?;
        tracing::debug!("published mfs root {cid}");
        Ok(())
    }
}
