use bytes::Bytes;
use cid::Cid;
use fleek_ipld::{Mtime, UnixFsNode};
use lightning_blockstore::{BlockStore, RootStore};
use tokio_util::sync::CancellationToken;

use super::{Mfs, ReadOptions, StatOptions};
use crate::dag::Dag;
use crate::editor;
use crate::error::{MfsError, Result};
use crate::file::read_file;
use crate::path::MfsPath;
use crate::trail::{self, EntryKind, Walk};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stat {
    pub cid: Cid,
    pub kind: EntryKind,
    /// File size in bytes, zero for directories.
    pub size: u64,
    pub cumulative_size: u64,
    /// Number of links of the node.
    pub blocks: usize,
    pub mode: Option<u32>,
    pub mtime: Option<Mtime>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub cid: Cid,
    pub size: u64,
}

impl<B: BlockStore, R: RootStore> Mfs<B, R> {
    /// Resolve `path` under the shared lock.
    async fn resolve(
        &self,
        path: &MfsPath,
        signal: Option<&CancellationToken>,
    ) -> Result<(Dag<B>, Walk)> {
        let dag = self.dag(signal);
        let _guard = self.gate.read().await;
        let root = self.current_root().await?;
        let walk = trail::walk(&dag, root, path.components()).await?;
        if !walk.is_complete() {
            return Err(MfsError::NotFound(path.to_string()));
        }
        Ok((dag, walk))
    }

    pub async fn stat(&self, path: &str, options: StatOptions) -> Result<Stat> {
        let path = MfsPath::parse(path)?;
        let (_, walk) = self.resolve(&path, options.signal.as_ref()).await?;
        let target = walk.target()?;
        let size = match &walk.node {
            UnixFsNode::File(file) => file.file_size(),
            UnixFsNode::Raw(bytes) => bytes.len() as u64,
            _ => 0,
        };
        let metadata = walk.node.metadata().copied().unwrap_or_default();
        Ok(Stat {
            cid: target.cid,
            kind: target.kind,
            size,
            cumulative_size: target.size,
            blocks: walk.node.links().len(),
            mode: metadata.mode,
            mtime: metadata.mtime,
        })
    }

    /// List a directory. Listing a file yields the file itself.
    pub async fn ls(&self, path: &str, options: StatOptions) -> Result<Vec<DirEntry>> {
        let path = MfsPath::parse(path)?;
        let (dag, walk) = self.resolve(&path, options.signal.as_ref()).await?;
        let target = walk.target()?;
        let UnixFsNode::Directory(dir) = &walk.node else {
            return Ok(vec![DirEntry {
                name: path
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| target.cid.to_string()),
                cid: target.cid,
                size: target.size,
            }]);
        };
        Ok(editor::list(&dag, dir)
            .await?
            .into_iter()
            .map(|link| DirEntry {
                name: link.name,
                cid: link.cid,
                size: link.size,
            })
            .collect())
    }

    /// Read the content of the file at `path`.
    pub async fn read(&self, path: &str, options: ReadOptions) -> Result<Bytes> {
        let path = MfsPath::parse(path)?;
        let (dag, walk) = self.resolve(&path, options.signal.as_ref()).await?;
        let target = walk.target()?;
        if target.kind.is_dir() {
            return Err(MfsError::NotAFile(path.to_string()));
        }
        // blocks are immutable, the content is read without holding the gate.
        read_file(&dag, target.cid, options.offset, options.length).await
    }

    /// Resolve the CID at `path`. Edits are persisted as they happen, so there is nothing left to
    /// write.
    pub async fn flush(&self, path: &str, options: StatOptions) -> Result<Cid> {
        let path = MfsPath::parse(path)?;
        let (_, walk) = self.resolve(&path, options.signal.as_ref()).await?;
        let cid = walk.target()?.cid;
        tracing::debug!("flushed {path} at {cid}");
        Ok(cid)
    }
}
