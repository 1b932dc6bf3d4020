//! Paths through the DAG, from the root down to a target, and the propagation of a rewritten
//! target back up to a new root.
use cid::Cid;
use fleek_ipld::{DirectoryNode, UnixFsNode};
use lightning_blockstore::BlockStore;

use crate::dag::Dag;
use crate::editor::{self, ChildLink, EditOptions};
use crate::error::{MfsError, Result};

/// What kind of node an entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    ShardedDirectory,
    File,
    Raw,
    Symlink,
}

impl EntryKind {
    pub fn of(node: &UnixFsNode) -> Self {
        match node {
            UnixFsNode::Directory(DirectoryNode::Flat(_)) => Self::Directory,
            UnixFsNode::Directory(DirectoryNode::Sharded(_)) => Self::ShardedDirectory,
            UnixFsNode::File(_) => Self::File,
            UnixFsNode::Raw(_) => Self::Raw,
            UnixFsNode::Symlink(_) => Self::Symlink,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory | Self::ShardedDirectory)
    }
}

/// One step of a trail: the name the node has in its parent, its address and the cumulative size
/// recorded for it. The root entry has an empty name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrailEntry {
    pub name: String,
    pub cid: Cid,
    pub size: u64,
    pub kind: EntryKind,
}

/// The result of walking a path: the entries that exist, and the names below the deepest
/// existing entry that do not.
#[derive(Clone, Debug)]
pub struct Walk {
    pub trail: Vec<TrailEntry>,
    pub missing: Vec<String>,
    /// The decoded node of the last trail entry.
    pub node: UnixFsNode,
}

impl Walk {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn target(&self) -> Result<&TrailEntry> {
        self.trail
            .last()
            .ok_or_else(|| MfsError::StructuralCorruption("empty trail".into()))
    }
}

/// Walk `components` starting at `root`, stopping at the first name that does not exist.
///
/// Fails with [`MfsError::NotADirectory`] when a path goes through a node that is not a
/// directory.
pub async fn walk<B: BlockStore>(dag: &Dag<B>, root: Cid, components: &[String]) -> Result<Walk> {
    let (mut node, size) = dag.load(&root).await?;
    let mut trail = vec![TrailEntry {
        name: String::new(),
        cid: root,
        size,
        kind: EntryKind::of(&node),
    }];

    for (depth, name) in components.iter().enumerate() {
        let UnixFsNode::Directory(dir) = &node else {
            return Err(MfsError::NotADirectory(format!(
                "/{}",
                components[..depth].join("/")
            )));
        };
        let Some(link) = editor::lookup(dag, dir, name).await? else {
            return Ok(Walk {
                trail,
                missing: components[depth..].to_vec(),
                node,
            });
        };
        let (child, _) = dag.load(&link.cid).await?;
        trail.push(TrailEntry {
            name: link.name,
            cid: link.cid,
            size: link.size,
            kind: EntryKind::of(&child),
        });
        node = child;
    }

    Ok(Walk {
        trail,
        missing: Vec::new(),
        node,
    })
}

/// Resolve the full trail to an existing node.
pub async fn to_trail<B: BlockStore>(
    dag: &Dag<B>,
    root: Cid,
    components: &[String],
) -> Result<Vec<TrailEntry>> {
    let walk = walk(dag, root, components).await?;
    if !walk.is_complete() {
        return Err(MfsError::NotFound(format!("/{}", components.join("/"))));
    }
    Ok(walk.trail)
}

/// Propagate the last entry of `trail` up to the root.
///
/// The last entry is the child that was just rewritten, every other entry is re-linked to the new
/// address of the entry below it. Returns the new root entry.
pub async fn update_tree<B: BlockStore>(
    dag: &Dag<B>,
    mut trail: Vec<TrailEntry>,
    options: &EditOptions,
) -> Result<TrailEntry> {
    let mut current = trail
        .pop()
        .ok_or_else(|| MfsError::InvalidArgument("cannot update an empty trail".into()))?;

    while let Some(ancestor) = trail.pop() {
        dag.check_cancelled()?;
        let updated = editor::add_link(
            dag,
            ancestor.cid,
            ChildLink::new(current.name, current.cid, current.size),
            options,
        )
        .await?;
        tracing::trace!("re-linked '{}' as {}", ancestor.name, updated.cid);
        current = TrailEntry {
            name: ancestor.name,
            cid: updated.cid,
            size: updated.size,
            kind: EntryKind::of(&UnixFsNode::Directory(updated.node)),
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use cid::Version;
    use fleek_ipld::FileNode;
    use lightning_blockstore::MemoryBlockStore;

    use super::*;
    use crate::editor::add_link;

    async fn file(dag: &Dag<MemoryBlockStore>, content: &'static [u8]) -> (Cid, u64) {
        let node = UnixFsNode::File(FileNode {
            data: Some(Bytes::from_static(content)),
            filesize: Some(content.len() as u64),
            ..Default::default()
        });
        let stored = dag.put_node(&node, Version::V0, true).await.unwrap();
        (stored.cid, stored.size)
    }

    /// Builds `/a/b/c` (a file) and `/d`, returning the root.
    async fn tree(dag: &Dag<MemoryBlockStore>) -> Cid {
        let options = EditOptions::default();
        let (c, c_size) = file(dag, b"content").await;
        let b = add_link(dag, DirectoryNode::empty(), ChildLink::new("c", c, c_size), &options)
            .await
            .unwrap();
        let a = add_link(dag, DirectoryNode::empty(), ChildLink::new("b", b.cid, b.size), &options)
            .await
            .unwrap();
        let d = dag
            .put_dir(DirectoryNode::empty(), Version::V0, true)
            .await
            .unwrap();
        let root = add_link(dag, DirectoryNode::empty(), ChildLink::new("a", a.cid, a.size), &options)
            .await
            .unwrap();
        add_link(dag, root.cid, ChildLink::new("d", d.cid, d.size), &options)
            .await
            .unwrap()
            .cid
    }

    fn components(path: &str) -> Vec<String> {
        path.split('/').filter(|c| !c.is_empty()).map(String::from).collect()
    }

    #[tokio::test]
    async fn walk_reports_missing_suffix() {
        let dag = Dag::new(MemoryBlockStore::new());
        let root = tree(&dag).await;

        let full = walk(&dag, root, &components("/a/b/c")).await.unwrap();
        assert!(full.is_complete());
        assert_eq!(
            full.trail.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            ["", "a", "b", "c"]
        );
        assert_eq!(full.target().unwrap().kind, EntryKind::File);

        let partial = walk(&dag, root, &components("/a/x/y")).await.unwrap();
        assert_eq!(partial.trail.len(), 2);
        assert_eq!(partial.missing, ["x", "y"]);

        assert!(matches!(
            walk(&dag, root, &components("/a/b/c/z")).await,
            Err(MfsError::NotADirectory(_))
        ));
        assert!(matches!(
            to_trail(&dag, root, &components("/nope")).await,
            Err(MfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_rewrites_only_ancestors() {
        let dag = Dag::new(MemoryBlockStore::new());
        let root = tree(&dag).await;
        let mut trail = to_trail(&dag, root, &components("/a/b/c")).await.unwrap();
        let old = trail.clone();
        let d_before = to_trail(&dag, root, &components("/d")).await.unwrap();

        let (new_c, new_size) = file(&dag, b"different content").await;
        let target = trail.last_mut().unwrap();
        target.cid = new_c;
        target.size = new_size;

        let new_root = update_tree(&dag, trail, &EditOptions::default())
            .await
            .unwrap();
        assert_ne!(new_root.cid, root);
        assert_eq!(new_root.name, "");

        let fresh = to_trail(&dag, new_root.cid, &components("/a/b/c")).await.unwrap();
        for (before, after) in old.iter().zip(fresh.iter()) {
            assert_ne!(before.cid, after.cid, "{} should change", before.name);
        }
        assert_eq!(fresh[3].cid, new_c);

        let d_after = to_trail(&dag, new_root.cid, &components("/d")).await.unwrap();
        assert_eq!(d_before[1], d_after[1]);
    }

    #[tokio::test]
    async fn update_aborts_on_missing_ancestor() {
        let dag = Dag::new(MemoryBlockStore::new());
        let root = tree(&dag).await;
        let mut trail = to_trail(&dag, root, &components("/a/b/c")).await.unwrap();
        trail[1].cid = fleek_ipld::hash::block_cid(b"gone", Version::V0, fleek_ipld::hash::DAG_PB)
            .unwrap();
        assert!(matches!(
            update_tree(&dag, trail, &EditOptions::default()).await,
            Err(MfsError::NotFound(_))
        ));
    }
}
