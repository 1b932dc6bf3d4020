use fleek_ipld::{FlatDirectory, Link, ShardedDirectory};
use lightning_blockstore::BlockStore;

use super::{EditOptions, Updated};
use crate::dag::Dag;
use crate::error::Result;
use crate::hamt::{Flushed, Hamt, HamtOptions};

impl From<Flushed> for Updated {
    fn from(flushed: Flushed) -> Self {
        Self {
            node: flushed.node,
            cid: flushed.cid,
            size: flushed.size,
        }
    }
}

pub(super) async fn add_link<B: BlockStore>(
    dag: &Dag<B>,
    dir: ShardedDirectory,
    link: Link,
    options: &EditOptions,
) -> Result<Updated> {
    let mut hamt = Hamt::from_directory(&dir)?;
    if let Some(previous) = hamt.insert(dag, link).await? {
        tracing::trace!("replaced {} in sharded directory", previous.name);
    }
    let mut metadata = dir.metadata;
    metadata.touch_if_set();
    let flushed = hamt
        .flush(dag, metadata, options.cid_version, options.flush)
        .await?;
    Ok(flushed.into())
}

pub(super) async fn remove_link<B: BlockStore>(
    dag: &Dag<B>,
    dir: ShardedDirectory,
    name: &str,
    options: &EditOptions,
) -> Result<Updated> {
    let mut hamt = Hamt::from_directory(&dir)?;
    hamt.remove(dag, name).await?;
    let mut metadata = dir.metadata;
    metadata.touch_if_set();
    let flushed = hamt
        .flush(dag, metadata, options.cid_version, options.flush)
        .await?;
    Ok(flushed.into())
}

/// Rebuild a flat directory that reached the split threshold as a shard, adding `link` to it.
///
/// The attributes of the flat directory move to the shard root unchanged.
pub(super) async fn convert<B: BlockStore>(
    dag: &Dag<B>,
    dir: FlatDirectory,
    link: Link,
    options: &EditOptions,
) -> Result<Updated> {
    tracing::debug!(
        "converting flat directory with {} links into a HAMT shard",
        dir.links.len()
    );
    let mut hamt = Hamt::new(HamtOptions::new(options.fanout, options.hash_type)?);
    for existing in dir.links {
        if existing.name != link.name {
            hamt.insert(dag, existing).await?;
        }
    }
    hamt.insert(dag, link).await?;
    let flushed = hamt
        .flush(dag, dir.metadata, options.cid_version, options.flush)
        .await?;
    Ok(flushed.into())
}
