//! Adding and removing the links of a single directory node.
//!
//! Both operations take the parent either as an already decoded node or as a CID, and produce the
//! rewritten parent together with its new CID and cumulative size. Flat directories that reach
//! the split threshold are converted into HAMT shards on the next insert.
mod flat;
mod sharded;

use cid::{Cid, Version};
use fleek_ipld::hash::MURMUR3_X64_64;
use fleek_ipld::{DirectoryNode, Link, UnixFsNode};
use lightning_blockstore::BlockStore;
use typed_builder::TypedBuilder;

use crate::dag::Dag;
use crate::error::{MfsError, Result};
use crate::path::validate_name;

#[derive(Clone, Debug, TypedBuilder)]
pub struct EditOptions {
    #[builder(default = Version::V0)]
    pub cid_version: Version,
    /// Write the rewritten nodes to the block store. When unset only their CIDs are computed.
    #[builder(default = true)]
    pub flush: bool,
    #[builder(default = 1000)]
    pub shard_split_threshold: usize,
    /// Fanout of shards created by a conversion. Existing shards keep their own.
    #[builder(default = 256)]
    pub fanout: u64,
    #[builder(default = MURMUR3_X64_64)]
    pub hash_type: u64,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EditOptions {
    pub fn validate(&self) -> Result<()> {
        if self.shard_split_threshold == 0 {
            return Err(MfsError::InvalidArgument(
                "shard_split_threshold must be at least 1".into(),
            ));
        }
        if !self.fanout.is_power_of_two() || !(2..=1 << 16).contains(&self.fanout) {
            return Err(MfsError::InvalidArgument(format!(
                "fanout must be a power of two between 2 and 65536, got {}",
                self.fanout
            )));
        }
        if self.hash_type != MURMUR3_X64_64 {
            return Err(MfsError::InvalidArgument(format!(
                "unsupported hamt hash type 0x{:x}",
                self.hash_type
            )));
        }
        Ok(())
    }
}

/// A link to add. The size is optional so a missing size can be reported instead of guessed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildLink {
    pub name: String,
    pub cid: Cid,
    pub size: Option<u64>,
}

impl ChildLink {
    pub fn new(name: impl Into<String>, cid: Cid, size: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            size: Some(size),
        }
    }

    fn into_link(self) -> Result<Link> {
        validate_name(&self.name)?;
        let size = self.size.ok_or_else(|| {
            MfsError::InvalidArgument(format!("link '{}' has no size", self.name))
        })?;
        Ok(Link::new(self.name, self.cid, size))
    }
}

impl From<Link> for ChildLink {
    fn from(link: Link) -> Self {
        Self::new(link.name, link.cid, link.size)
    }
}

/// The directory being edited.
#[derive(Clone, Debug)]
pub enum ParentRef {
    Node(DirectoryNode),
    Cid(Cid),
}

impl From<DirectoryNode> for ParentRef {
    fn from(node: DirectoryNode) -> Self {
        Self::Node(node)
    }
}

impl From<Cid> for ParentRef {
    fn from(cid: Cid) -> Self {
        Self::Cid(cid)
    }
}

/// A rewritten directory node.
#[derive(Clone, Debug)]
pub struct Updated {
    pub node: DirectoryNode,
    pub cid: Cid,
    pub size: u64,
}

async fn resolve<B: BlockStore>(dag: &Dag<B>, parent: ParentRef) -> Result<DirectoryNode> {
    match parent {
        ParentRef::Node(node) => Ok(node),
        ParentRef::Cid(cid) => dag.load_dir(&cid).await,
    }
}

/// Add `child` to `parent`, replacing any entry of the same name.
pub async fn add_link<B: BlockStore>(
    dag: &Dag<B>,
    parent: impl Into<ParentRef>,
    child: ChildLink,
    options: &EditOptions,
) -> Result<Updated> {
    options.validate()?;
    let link = child.into_link()?;
    match resolve(dag, parent.into()).await? {
        DirectoryNode::Sharded(dir) => sharded::add_link(dag, dir, link, options).await,
        DirectoryNode::Flat(dir) if dir.links.len() >= options.shard_split_threshold => {
            sharded::convert(dag, dir, link, options).await
        },
        DirectoryNode::Flat(dir) => flat::add_link(dag, dir, link, options).await,
    }
}

/// Remove the entry called `name` from `parent`.
pub async fn remove_link<B: BlockStore>(
    dag: &Dag<B>,
    parent: impl Into<ParentRef>,
    name: &str,
    options: &EditOptions,
) -> Result<Updated> {
    options.validate()?;
    validate_name(name)?;
    match resolve(dag, parent.into()).await? {
        DirectoryNode::Sharded(dir) => sharded::remove_link(dag, dir, name, options).await,
        DirectoryNode::Flat(dir) => flat::remove_link(dag, dir, name, options).await,
    }
}

/// Find the entry called `name` in a directory, loading subshards as needed.
pub async fn lookup<B: BlockStore>(
    dag: &Dag<B>,
    dir: &DirectoryNode,
    name: &str,
) -> Result<Option<Link>> {
    match dir {
        DirectoryNode::Flat(dir) => Ok(dir.find(name).cloned()),
        DirectoryNode::Sharded(dir) => {
            let mut hamt = crate::hamt::Hamt::from_directory(dir)?;
            hamt.get(dag, name).await
        },
    }
}

/// Every entry of a directory. Sharded directories are listed in slot order with their real
/// names.
pub async fn list<B: BlockStore>(dag: &Dag<B>, dir: &DirectoryNode) -> Result<Vec<Link>> {
    match dir {
        DirectoryNode::Flat(dir) => Ok(dir.links.clone()),
        DirectoryNode::Sharded(dir) => {
            let mut hamt = crate::hamt::Hamt::from_directory(dir)?;
            hamt.entries(dag).await
        },
    }
}

async fn store<B: BlockStore>(
    dag: &Dag<B>,
    node: DirectoryNode,
    options: &EditOptions,
) -> Result<Updated> {
    let stored = dag
        .put_node(
            &UnixFsNode::Directory(node.clone()),
            options.cid_version,
            options.flush,
        )
        .await?;
    Ok(Updated {
        node,
        cid: stored.cid,
        size: stored.size,
    })
}
