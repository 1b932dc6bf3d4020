use fleek_ipld::{DirectoryNode, FlatDirectory, Link};
use lightning_blockstore::BlockStore;

use super::{store, EditOptions, Updated};
use crate::dag::Dag;
use crate::error::{MfsError, Result};

pub(super) async fn add_link<B: BlockStore>(
    dag: &Dag<B>,
    mut dir: FlatDirectory,
    link: Link,
    options: &EditOptions,
) -> Result<Updated> {
    match dir.links.iter_mut().find(|l| l.name == link.name) {
        Some(existing) => {
            tracing::trace!("replacing link {} in flat directory", link.name);
            *existing = link;
        },
        None => dir.links.push(link),
    }
    dir.metadata.touch_if_set();
    store(dag, DirectoryNode::Flat(dir), options).await
}

pub(super) async fn remove_link<B: BlockStore>(
    dag: &Dag<B>,
    mut dir: FlatDirectory,
    name: &str,
    options: &EditOptions,
) -> Result<Updated> {
    let before = dir.links.len();
    dir.links.retain(|l| l.name != name);
    if dir.links.len() == before {
        return Err(MfsError::NotFound(name.to_string()));
    }
    dir.metadata.touch_if_set();
    store(dag, DirectoryNode::Flat(dir), options).await
}
