use std::collections::HashMap;

use cid::{Cid, Version};
use fleek_ipld::{bitfield_from_slots, DirectoryNode, Link, Metadata, ShardedDirectory};
use lightning_blockstore::BlockStore;

use super::bucket::{BucketId, Hamt, Slot, ROOT};
use crate::dag::Dag;
use crate::error::{MfsError, Result};

/// The serialized shard root.
#[derive(Clone, Debug)]
pub struct Flushed {
    pub cid: Cid,
    pub size: u64,
    pub node: DirectoryNode,
}

impl Hamt {
    /// Serialize the shard bottom-up.
    ///
    /// Buckets that still match their persisted block are not encoded again, their parent links
    /// reuse the recorded CID and size. Only the shard root carries `metadata`.
    pub async fn flush<B: BlockStore>(
        &self,
        dag: &Dag<B>,
        metadata: Metadata,
        version: Version,
        persist: bool,
    ) -> Result<Flushed> {
        let mut written: HashMap<BucketId, (Cid, u64)> = HashMap::new();
        let mut stack = vec![(ROOT, false)];

        while let Some((id, children_done)) = stack.pop() {
            let bucket = &self.buckets[id];
            if id != ROOT {
                if let Some(persisted) = bucket.persisted() {
                    written.insert(id, persisted);
                    continue;
                }
            }

            if !children_done {
                stack.push((id, true));
                for slot in bucket.slots.values() {
                    if let Slot::Bucket(child) = slot {
                        stack.push((*child, false));
                    }
                }
                continue;
            }

            let mut links = Vec::with_capacity(bucket.slots.len());
            for (index, slot) in &bucket.slots {
                let prefix = self.options.prefix(*index);
                links.push(match slot {
                    Slot::Leaf(link) => {
                        Link::new(format!("{prefix}{}", link.name), link.cid, link.size)
                    },
                    Slot::Bucket(child) => {
                        let (cid, size) = written.get(child).copied().ok_or_else(|| {
                            MfsError::StructuralCorruption(format!(
                                "subshard in slot {prefix} was not serialized"
                            ))
                        })?;
                        Link::new(prefix, cid, size)
                    },
                });
            }

            let node = DirectoryNode::Sharded(ShardedDirectory {
                links,
                metadata: if id == ROOT {
                    metadata
                } else {
                    Metadata::default()
                },
                fanout: self.options.fanout(),
                hash_type: self.options.hash_type(),
                bitfield: bitfield_from_slots(
                    self.options.fanout(),
                    bucket.slots.keys().copied(),
                ),
            });

            if id == ROOT {
                let stored = dag.put_dir(node.clone(), version, persist).await?;
                tracing::debug!(
                    "flushed shard {} with {} slots in use",
                    stored.cid,
                    bucket.slots.len()
                );
                return Ok(Flushed {
                    cid: stored.cid,
                    size: stored.size,
                    node,
                });
            }
            let stored = dag.put_dir(node, version, persist).await?;
            written.insert(id, (stored.cid, stored.size));
        }

        Err(MfsError::StructuralCorruption(
            "shard root was never serialized".into(),
        ))
    }
}
