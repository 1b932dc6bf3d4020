//! Block access for a single MFS operation.
//!
//! [`Dag`] wraps a [`BlockStore`] together with the cancellation signal of the operation it serves.
//! Every block read or write races the signal, a cancelled operation fails with
//! [`MfsError::Cancelled`] before its next block access.
use bytes::Bytes;
use cid::{Cid, Version};
use fleek_ipld::hash::{block_cid, DAG_PB};
use fleek_ipld::{DagPbWithUnixFsCodec, DirectoryNode, UnixFsNode};
use lightning_blockstore::BlockStore;
use tokio_util::sync::CancellationToken;

use crate::error::{MfsError, Result};

/// A node as it was written: its address and the cumulative size a parent link records for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stored {
    pub cid: Cid,
    pub size: u64,
}

#[derive(Clone)]
pub struct Dag<B> {
    store: B,
    signal: CancellationToken,
}

impl<B: BlockStore> Dag<B> {
    pub fn new(store: B) -> Self {
        Self {
            store,
            signal: CancellationToken::new(),
        }
    }

    /// Attach the cancellation signal of the caller, if any.
    pub fn with_signal(mut self, signal: Option<&CancellationToken>) -> Self {
        if let Some(signal) = signal {
            self.signal = signal.clone();
        }
        self
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.signal.is_cancelled() {
            return Err(MfsError::Cancelled);
        }
        Ok(())
    }

    pub async fn get(&self, cid: &Cid) -> Result<Bytes> {
        tokio::select! {
            biased;
            _ = self.signal.cancelled() => Err(MfsError::Cancelled),
            res = self.store.get(cid) => Ok(res?),
        }
    }

    pub async fn put(&self, cid: &Cid, block: Bytes) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.signal.cancelled() => Err(MfsError::Cancelled),
            res = self.store.put(cid, block) => Ok(res?),
        }
    }

    /// Load and decode any node, returning it with its cumulative size.
    pub async fn load(&self, cid: &Cid) -> Result<(UnixFsNode, u64)> {
        let bytes = self.get(cid).await?;
        let node = DagPbWithUnixFsCodec::decode_from_slice(cid, &bytes)?;
        let size = cumulative_size(bytes.len(), &node);
        Ok((node, size))
    }

    /// Load a node that must be a directory.
    ///
    /// A CID that does not use the DAG-PB codec cannot hold a directory and is rejected without
    /// touching the store.
    pub async fn load_dir(&self, cid: &Cid) -> Result<DirectoryNode> {
        if cid.codec() != DAG_PB {
            return Err(MfsError::NotUnixfsNode(format!(
                "{cid} is not a dag-pb node"
            )));
        }
        let (node, _) = self.load(cid).await?;
        match node {
            UnixFsNode::Directory(dir) => Ok(dir),
            _ => Err(MfsError::NotADirectory(cid.to_string())),
        }
    }

    /// Encode `node`, address it and write it to the store when `persist` is set.
    ///
    /// DAG-PB nodes are addressed with `version`, raw nodes always with CIDv1.
    pub async fn put_node(
        &self,
        node: &UnixFsNode,
        version: Version,
        persist: bool,
    ) -> Result<Stored> {
        let (bytes, codec) = DagPbWithUnixFsCodec::encode_to_vec(node)?;
        let cid = block_cid(&bytes, version, codec)?;
        let size = cumulative_size(bytes.len(), node);
        if persist {
            self.put(&cid, bytes.into()).await?;
        } else {
            self.check_cancelled()?;
        }
        tracing::trace!("encoded node {cid} with cumulative size {size}");
        Ok(Stored { cid, size })
    }

    pub async fn put_dir(
        &self,
        dir: DirectoryNode,
        version: Version,
        persist: bool,
    ) -> Result<Stored> {
        self.put_node(&UnixFsNode::Directory(dir), version, persist)
            .await
    }
}

/// The size a parent records for a node: the node's own encoded length plus the recorded sizes of
/// everything it links to.
pub fn cumulative_size(encoded_len: usize, node: &UnixFsNode) -> u64 {
    encoded_len as u64 + node.links().iter().map(|l| l.size).sum::<u64>()
}
