use bytes::Bytes;
use cid::Cid;
use fleek_ipld::{DirectoryNode, FlatDirectory, Metadata, Mtime, UnixFsNode};
use lightning_blockstore::{BlockStore, RootStore};

use super::{
    ChmodOptions,
    CpOptions,
    Mfs,
    MkdirOptions,
    RmOptions,
    TouchOptions,
    WriteOptions,
};
use crate::dag::{Dag, Stored};
use crate::editor::{self, ChildLink};
use crate::error::{MfsError, Result};
use crate::file::{import_file, ImportOptions};
use crate::path::{MfsPath, Source};
use crate::trail::{self, EntryKind, TrailEntry, Walk};

/// Split an incomplete walk into the walk of the parent directory and the name of the missing
/// target. Fails unless `parents` is set or only the target itself is missing.
fn split_target(mut walk: Walk, path: &MfsPath, parents: bool) -> Result<(Walk, String)> {
    if walk.missing.len() > 1 && !parents {
        let parent = path.parent().unwrap_or_default();
        return Err(MfsError::NotFound(parent.to_string()));
    }
    let name = walk
        .missing
        .pop()
        .ok_or_else(|| MfsError::AlreadyExists(path.to_string()))?;
    Ok((walk, name))
}

impl<B: BlockStore, R: RootStore> Mfs<B, R> {
    pub async fn mkdir(&self, path: &str, options: MkdirOptions) -> Result<()> {
        let path = MfsPath::parse(path)?;
        if path.is_root() {
            if options.parents {
                return Ok(());
            }
            return Err(MfsError::AlreadyExists(path.to_string()));
        }
        let dag = self.dag(options.signal.as_ref());
        let metadata = Metadata::new(options.mode, options.mtime);

        let _guard = self.gate.write().await;
        let root = self.current_root().await?;
        let target = trail::walk(&dag, root, path.components()).await?;
        if target.is_complete() {
            if options.parents && target.target()?.kind.is_dir() {
                return Ok(());
            }
            return Err(MfsError::AlreadyExists(path.to_string()));
        }

        let (parent, name) = split_target(target, &path, options.parents)?;
        let dir = dag
            .put_dir(
                DirectoryNode::Flat(FlatDirectory::new(metadata)),
                self.edit.cid_version,
                true,
            )
            .await?;
        let new_root = self
            .splice(&dag, parent, ChildLink::new(name, dir.cid, dir.size), metadata)
            .await?;
        self.publish(&dag, new_root).await?;
        tracing::debug!("created directory {path}");
        Ok(())
    }

    /// Write `content` as the file at `path`, returning the CID of the file.
    ///
    /// The file DAG is built before the gate is taken, only linking it into the tree happens
    /// under the exclusive lock.
    pub async fn write(
        &self,
        path: &str,
        content: impl Into<Bytes>,
        options: WriteOptions,
    ) -> Result<Cid> {
        let path = MfsPath::parse(path)?;
        if path.is_root() {
            return Err(MfsError::NotAFile(path.to_string()));
        }
        let dag = self.dag(options.signal.as_ref());
        let import = ImportOptions::builder()
            .chunk_size(self.config.chunk_size)
            .max_children_per_node(self.config.max_children_per_node)
            .raw_leaves(options.raw_leaves.unwrap_or(self.config.raw_leaves))
            .cid_version(self.edit.cid_version)
            .metadata(Metadata::new(options.mode, options.mtime))
            .build();
        let imported = import_file(&dag, content.into(), &import).await?;

        let _guard = self.gate.write().await;
        let root = self.current_root().await?;
        let target = trail::walk(&dag, root, path.components()).await?;
        let stored = Stored {
            cid: imported.cid,
            size: imported.size,
        };
        let new_root = if target.is_complete() {
            if target.target()?.kind.is_dir() {
                return Err(MfsError::NotAFile(path.to_string()));
            }
            let kind = if imported.cid.codec() == fleek_ipld::hash::RAW {
                EntryKind::Raw
            } else {
                EntryKind::File
            };
            self.replace(&dag, target, stored, kind).await?
        } else {
            if !options.create {
                return Err(MfsError::NotFound(path.to_string()));
            }
            let (parent, name) = split_target(target, &path, options.parents)?;
            let child = ChildLink::new(name, stored.cid, stored.size);
            self.splice(&dag, parent, child, Metadata::default())
                .await?
        };
        self.publish(&dag, new_root).await?;
        tracing::debug!("wrote {} bytes to {path}", imported.file_size);
        Ok(imported.cid)
    }

    pub async fn rm(&self, path: &str, options: RmOptions) -> Result<()> {
        let path = MfsPath::parse(path)?;
        if path.is_root() {
            return Err(MfsError::InvalidArgument("cannot remove the root".into()));
        }
        let dag = self.dag(options.signal.as_ref());

        let _guard = self.gate.write().await;
        let root = self.current_root().await?;
        let new_root = self
            .remove_at(&dag, root, &path, options.recursive)
            .await?;
        self.publish(&dag, new_root).await?;
        tracing::debug!("removed {path}");
        Ok(())
    }

    /// Copy `source` (an MFS path or `/ipfs/<cid>[/path]`) to `dest`.
    pub async fn cp(&self, source: &str, dest: &str, options: CpOptions) -> Result<()> {
        let source = Source::parse(source)?;
        let dest = MfsPath::parse(dest)?;
        let dag = self.dag(options.signal.as_ref());

        let _guard = self.gate.write().await;
        let root = self.current_root().await?;
        let new_root = self
            .copy_at(&dag, root, &source, &dest, options.parents)
            .await?;
        self.publish(&dag, new_root).await?;
        tracing::debug!("copied {source:?} to {dest}");
        Ok(())
    }

    /// Move an entry. The copy and the removal are published as a single new root.
    pub async fn mv(&self, source: &str, dest: &str, options: CpOptions) -> Result<()> {
        let source = MfsPath::parse(source)?;
        let dest = MfsPath::parse(dest)?;
        if source.is_root() {
            return Err(MfsError::InvalidArgument("cannot move the root".into()));
        }
        if dest.starts_with(&source) {
            return Err(MfsError::InvalidArgument(format!(
                "cannot move {source} into itself"
            )));
        }
        let dag = self.dag(options.signal.as_ref());

        let _guard = self.gate.write().await;
        let root = self.current_root().await?;
        let copied = self
            .copy_at(&dag, root, &Source::Mfs(source.clone()), &dest, options.parents)
            .await?;
        let new_root = self.remove_at(&dag, copied, &source, true).await?;
        self.publish(&dag, new_root).await?;
        tracing::debug!("moved {source} to {dest}");
        Ok(())
    }

    /// Set the mtime of the node at `path`, creating an empty file if nothing exists there.
    pub async fn touch(&self, path: &str, options: TouchOptions) -> Result<()> {
        let path = MfsPath::parse(path)?;
        let mtime = options.mtime.unwrap_or_else(Mtime::now);
        let dag = self.dag(options.signal.as_ref());

        let _guard = self.gate.write().await;
        let root = self.current_root().await?;
        let target = trail::walk(&dag, root, path.components()).await?;
        let new_root = if target.is_complete() {
            self.set_attributes(&dag, target, |metadata| metadata.mtime = Some(mtime))
                .await?
        } else {
            let (parent, name) = split_target(target, &path, false)?;
            let import = ImportOptions::builder()
                .cid_version(self.edit.cid_version)
                .metadata(Metadata::new(None, Some(mtime)))
                .build();
            let empty = import_file(&dag, Bytes::new(), &import).await?;
            let child = ChildLink::new(name, empty.cid, empty.size);
            self.splice(&dag, parent, child, Metadata::default())
                .await?
        };
        self.publish(&dag, new_root).await?;
        tracing::debug!("touched {path}");
        Ok(())
    }

    pub async fn chmod(&self, path: &str, mode: u32, options: ChmodOptions) -> Result<()> {
        let path = MfsPath::parse(path)?;
        let dag = self.dag(options.signal.as_ref());

        let _guard = self.gate.write().await;
        let root = self.current_root().await?;
        let target = trail::walk(&dag, root, path.components()).await?;
        if !target.is_complete() {
            return Err(MfsError::NotFound(path.to_string()));
        }
        let new_root = self
            .set_attributes(&dag, target, |metadata| metadata.mode = Some(mode))
            .await?;
        self.publish(&dag, new_root).await?;
        tracing::debug!("changed mode of {path} to {mode:o}");
        Ok(())
    }

    async fn remove_at(
        &self,
        dag: &Dag<B>,
        root: Cid,
        path: &MfsPath,
        recursive: bool,
    ) -> Result<Cid> {
        let target = trail::walk(dag, root, path.components()).await?;
        if !target.is_complete() {
            return Err(MfsError::NotFound(path.to_string()));
        }
        if let UnixFsNode::Directory(dir) = &target.node {
            if !recursive && !dir.links().is_empty() {
                return Err(MfsError::InvalidArgument(format!(
                    "{path} is not empty, removing it requires `recursive`"
                )));
            }
        }

        let mut trail = target.trail;
        let (removed, parent) = match (trail.pop(), trail.pop()) {
            (Some(removed), Some(parent)) => (removed, parent),
            _ => return Err(MfsError::InvalidArgument("cannot remove the root".into())),
        };
        let updated = editor::remove_link(dag, parent.cid, &removed.name, &self.edit).await?;
        trail.push(TrailEntry {
            name: parent.name,
            cid: updated.cid,
            size: updated.size,
            kind: EntryKind::of(&UnixFsNode::Directory(updated.node)),
        });
        Ok(trail::update_tree(dag, trail, &self.edit).await?.cid)
    }

    async fn copy_at(
        &self,
        dag: &Dag<B>,
        root: Cid,
        source: &Source,
        dest: &MfsPath,
        parents: bool,
    ) -> Result<Cid> {
        let (start, components) = match source {
            Source::Mfs(path) => (root, path.components()),
            Source::Ipfs { cid, path } => (*cid, path.as_slice()),
        };
        let origin = trail::to_trail(dag, start, components).await?;
        let origin = origin
            .last()
            .ok_or_else(|| MfsError::StructuralCorruption("empty trail".into()))?;

        let target = trail::walk(dag, root, dest.components()).await?;
        let (parent, name) = if target.is_complete() {
            let UnixFsNode::Directory(dir) = &target.node else {
                return Err(MfsError::AlreadyExists(dest.to_string()));
            };
            let name = source.base_name().ok_or_else(|| {
                MfsError::InvalidArgument("copying the root needs a destination name".into())
            })?;
            if editor::lookup(dag, dir, &name).await?.is_some() {
                return Err(MfsError::AlreadyExists(dest.join(&name)?.to_string()));
            }
            (target, name)
        } else {
            split_target(target, dest, parents)?
        };

        let child = ChildLink::new(name, origin.cid, origin.size);
        self.splice(dag, parent, child, Metadata::default()).await
    }
}
