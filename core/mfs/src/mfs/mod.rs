//! The mutable file system.
//!
//! An [`Mfs`] is a pointer to a root directory plus a [`ConcurrencyGate`]. Every mutation
//! rewrites the changed node and all of its ancestors, then publishes the new root. Blocks are
//! never modified in place.
mod options;
mod read;
mod write;

use cid::Cid;
use fleek_ipld::{DirectoryNode, FileNode, Metadata, UnixFsNode};
use lightning_blockstore::{BlockStore, RootStore};
use lightning_utils::config::ConfigConsumer;
use tokio_util::sync::CancellationToken;

pub use self::options::{
    ChmodOptions,
    CpOptions,
    MkdirOptions,
    ReadOptions,
    RmOptions,
    StatOptions,
    TouchOptions,
    WriteOptions,
};
pub use self::read::{DirEntry, Stat};
use crate::config::Config;
use crate::dag::{Dag, Stored};
use crate::editor::{self, ChildLink, EditOptions};
use crate::error::{MfsError, Result};
use crate::gate::ConcurrencyGate;
use crate::root::RootPointer;
use crate::trail::{self, EntryKind, TrailEntry, Walk};

#[derive(Clone)]
pub struct Mfs<B, R> {
    blockstore: B,
    root: RootPointer<R>,
    gate: ConcurrencyGate,
    config: Config,
    edit: EditOptions,
}

impl<B, R> ConfigConsumer for Mfs<B, R> {
    const KEY: &'static str = "mfs";

    type Config = Config;
}

impl<B: BlockStore, R: RootStore> Mfs<B, R> {
    /// Validate `config` and open the file system, creating an empty root on first use.
    pub async fn new(blockstore: B, rootstore: R, config: Config) -> Result<Self> {
        config.validate()?;
        let edit = config.edit_options()?;
        let mfs = Self {
            blockstore,
            root: RootPointer::new(rootstore),
            gate: ConcurrencyGate::new(),
            config,
            edit,
        };

        let _guard = mfs.gate.write().await;
        let root = mfs
            .root
            .load_or_init(&mfs.dag(None), mfs.edit.cid_version)
            .await?;
        tracing::debug!("opened mfs at root {root}");
        drop(_guard);

        Ok(mfs)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn blockstore(&self) -> &B {
        &self.blockstore
    }

    /// The currently published root.
    pub async fn root(&self) -> Result<Cid> {
        let _guard = self.gate.read().await;
        self.current_root().await
    }

    fn dag(&self, signal: Option<&CancellationToken>) -> Dag<B> {
        Dag::new(self.blockstore.clone()).with_signal(signal)
    }

    async fn current_root(&self) -> Result<Cid> {
        self.root.load().await
    }

    async fn publish(&self, dag: &Dag<B>, root: Cid) -> Result<()> {
        self.root.store(dag, &root).await
    }

    /// Link `child` into the directory `parent` was walked to, creating the directories listed
    /// in `parent.missing` on the way (with `dir_metadata`), and propagate the change to a new
    /// root.
    async fn splice(
        &self,
        dag: &Dag<B>,
        parent: Walk,
        child: ChildLink,
        dir_metadata: Metadata,
    ) -> Result<Cid> {
        let Walk {
            mut trail,
            missing,
            node,
        } = parent;
        let UnixFsNode::Directory(dir) = node else {
            let at: Vec<&str> = trail.iter().skip(1).map(|e| e.name.as_str()).collect();
            return Err(MfsError::NotADirectory(format!("/{}", at.join("/"))));
        };

        let mut child = child;
        for name in missing.iter().rev() {
            tracing::trace!("creating missing directory {name}");
            let created = editor::add_link(
                dag,
                DirectoryNode::Flat(fleek_ipld::FlatDirectory::new(dir_metadata)),
                child,
                &self.edit,
            )
            .await?;
            child = ChildLink::new(name, created.cid, created.size);
        }

        let parent = trail
            .pop()
            .ok_or_else(|| MfsError::StructuralCorruption("empty trail".into()))?;
        let updated = editor::add_link(dag, dir, child, &self.edit).await?;
        trail.push(TrailEntry {
            name: parent.name,
            cid: updated.cid,
            size: updated.size,
            kind: EntryKind::of(&UnixFsNode::Directory(updated.node)),
        });
        Ok(trail::update_tree(dag, trail, &self.edit).await?.cid)
    }

    /// Swap the node at the end of a complete walk for `new` and propagate to a new root.
    async fn replace(
        &self,
        dag: &Dag<B>,
        target: Walk,
        new: Stored,
        kind: EntryKind,
    ) -> Result<Cid> {
        let mut trail = target.trail;
        let old = trail
            .pop()
            .ok_or_else(|| MfsError::StructuralCorruption("empty trail".into()))?;
        if trail.is_empty() {
            return Ok(new.cid);
        }
        trail.push(TrailEntry {
            name: old.name,
            cid: new.cid,
            size: new.size,
            kind,
        });
        Ok(trail::update_tree(dag, trail, &self.edit).await?.cid)
    }

    /// Rewrite the attributes of the node at the end of `target`.
    async fn set_attributes(
        &self,
        dag: &Dag<B>,
        target: Walk,
        update: impl FnOnce(&mut Metadata),
    ) -> Result<Cid> {
        let node = match target.node.clone() {
            UnixFsNode::Directory(mut dir) => {
                update(dir.metadata_mut());
                UnixFsNode::Directory(dir)
            },
            UnixFsNode::File(mut file) => {
                update(&mut file.metadata);
                UnixFsNode::File(file)
            },
            // a raw leaf holding a whole file has nowhere to store attributes, wrap it.
            UnixFsNode::Raw(bytes) => {
                let mut metadata = Metadata::default();
                update(&mut metadata);
                UnixFsNode::File(FileNode {
                    filesize: Some(bytes.len() as u64),
                    data: Some(bytes),
                    metadata,
                    ..Default::default()
                })
            },
            UnixFsNode::Symlink(_) => {
                return Err(MfsError::InvalidArgument(
                    "symlinks do not carry attributes".into(),
                ));
            },
        };
        let kind = EntryKind::of(&node);
        let stored = dag.put_node(&node, self.edit.cid_version, true).await?;
        self.replace(dag, target, stored, kind).await
    }
}

#[cfg(test)]
mod tests {
    use lightning_blockstore::{MemoryBlockStore, MemoryRootStore};

    use super::*;

    #[tokio::test]
    async fn rejects_invalid_config() {
        let config = Config {
            fanout: 3,
            ..Default::default()
        };
        assert!(matches!(
            Mfs::new(MemoryBlockStore::new(), MemoryRootStore::new(), config).await,
            Err(MfsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn reopening_keeps_the_root() {
        let blocks = MemoryBlockStore::new();
        let roots = MemoryRootStore::new();
        let mfs = Mfs::new(blocks.clone(), roots.clone(), Config::default())
            .await
            .unwrap();
        mfs.mkdir("/kept", MkdirOptions::default()).await.unwrap();
        let root = mfs.root().await.unwrap();
        drop(mfs);

        let mfs = Mfs::new(blocks, roots, Config::default()).await.unwrap();
        assert_eq!(mfs.root().await.unwrap(), root);
    }
}
