use std::collections::BTreeMap;

use cid::Cid;
use fleek_ipld::{DirectoryNode, Link, ShardedDirectory};
use lightning_blockstore::BlockStore;

use super::hash::{slot_at_depth, HashBits};
use super::HamtOptions;
use crate::dag::Dag;
use crate::error::{MfsError, Result};

/// Index of a bucket in the arena of a [`Hamt`].
pub type BucketId = usize;

/// The shard root always lives at the start of the arena.
pub const ROOT: BucketId = 0;

#[derive(Clone, Debug)]
pub(crate) enum Slot {
    /// A child entry, stored under its real name (without the slot prefix).
    Leaf(Link),
    Bucket(BucketId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// Only known through the link of its parent, the block was not read yet.
    Unloaded { cid: Cid, size: u64 },
    /// Read from the block store and unchanged since.
    Loaded { cid: Cid, size: u64 },
    /// Created or modified, must be serialized again on flush.
    Dirty,
}

#[derive(Clone, Debug)]
pub(crate) struct Bucket {
    /// The parent bucket and the slot this bucket occupies in it.
    pub(crate) parent: Option<(BucketId, usize)>,
    pub(crate) depth: usize,
    pub(crate) slots: BTreeMap<usize, Slot>,
    pub(crate) state: State,
}

impl Bucket {
    fn new(parent: Option<(BucketId, usize)>, depth: usize, state: State) -> Self {
        Self {
            parent,
            depth,
            slots: BTreeMap::new(),
            state,
        }
    }

    /// The address of the persisted block, as long as it still describes this bucket.
    pub(crate) fn persisted(&self) -> Option<(Cid, u64)> {
        match self.state {
            State::Unloaded { cid, size } | State::Loaded { cid, size } => Some((cid, size)),
            State::Dirty => None,
        }
    }
}

/// What occupies the slot a name hashes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    /// The slot holds the entry with the searched name.
    Match(Link),
    /// The slot holds a different entry whose hash shares the prefix consumed so far.
    Other(Link),
}

/// The deepest bucket reached while following the hash of a name.
#[derive(Clone, Debug)]
pub struct Position {
    pub bucket: BucketId,
    pub slot: usize,
    pub occupant: Occupant,
}

/// An in-memory HAMT shard.
///
/// Buckets are kept in an arena and refer to each other by index, every bucket knows its parent
/// and the slot it occupies there. Subshards decoded from the block store start out unloaded and
/// are read on first descent.
#[derive(Clone, Debug)]
pub struct Hamt {
    pub(crate) options: HamtOptions,
    pub(crate) buckets: Vec<Bucket>,
}

impl Hamt {
    /// An empty shard.
    pub fn new(options: HamtOptions) -> Self {
        Self {
            options,
            buckets: vec![Bucket::new(None, 0, State::Dirty)],
        }
    }

    /// Build the shard described by a decoded shard root.
    pub fn from_directory(dir: &ShardedDirectory) -> Result<Self> {
        let options = HamtOptions::new(dir.fanout, dir.hash_type)?;
        let mut hamt = Self::new(options);
        hamt.populate(ROOT, dir)?;
        Ok(hamt)
    }

    pub fn options(&self) -> HamtOptions {
        self.options
    }

    /// Fill bucket `id` from the links of its block.
    fn populate(&mut self, id: BucketId, dir: &ShardedDirectory) -> Result<()> {
        if dir.fanout != self.options.fanout() || dir.hash_type != self.options.hash_type() {
            return Err(MfsError::StructuralCorruption(format!(
                "subshard with fanout {} and hash type 0x{:x} in a shard with fanout {}",
                dir.fanout,
                dir.hash_type,
                self.options.fanout()
            )));
        }

        let depth = self.buckets[id].depth;
        for link in &dir.links {
            let (slot, rest) = self.options.parse_prefix(&link.name).ok_or_else(|| {
                MfsError::StructuralCorruption(format!(
                    "link '{}' does not start with a slot prefix",
                    link.name
                ))
            })?;
            if self.buckets[id].slots.contains_key(&slot) {
                return Err(MfsError::StructuralCorruption(format!(
                    "slot {} is used by more than one link",
                    self.options.prefix(slot)
                )));
            }
            let entry = if rest.is_empty() {
                let child = self.buckets.len();
                self.buckets.push(Bucket::new(
                    Some((id, slot)),
                    depth + 1,
                    State::Unloaded {
                        cid: link.cid,
                        size: link.size,
                    },
                ));
                Slot::Bucket(child)
            } else {
                Slot::Leaf(Link::new(rest, link.cid, link.size))
            };
            self.buckets[id].slots.insert(slot, entry);
        }

        if !dir.bitfield.is_empty() {
            for slot in 0..self.options.fanout() as usize {
                let linked = self.buckets[id].slots.contains_key(&slot);
                if dir.is_occupied(slot) != linked {
                    return Err(MfsError::StructuralCorruption(format!(
                        "bitfield and links disagree on slot {}",
                        self.options.prefix(slot)
                    )));
                }
            }
        }
        Ok(())
    }

    async fn ensure_loaded<B: BlockStore>(&mut self, dag: &Dag<B>, id: BucketId) -> Result<()> {
        let State::Unloaded { cid, size } = self.buckets[id].state else {
            return Ok(());
        };
        tracing::trace!("loading subshard {cid}");
        let dir = match dag.load_dir(&cid).await? {
            DirectoryNode::Sharded(dir) => dir,
            DirectoryNode::Flat(_) => {
                return Err(MfsError::StructuralCorruption(format!(
                    "subshard {cid} is not a HAMT shard node"
                )));
            },
        };
        self.populate(id, &dir)?;
        self.buckets[id].state = State::Loaded { cid, size };
        Ok(())
    }

    /// Follow the hash of `name` down to the bucket and slot it belongs to, loading subshards on
    /// the way.
    pub async fn find_position<B: BlockStore>(
        &mut self,
        dag: &Dag<B>,
        name: &str,
    ) -> Result<Position> {
        let mut hash = HashBits::new(name.as_bytes())?;
        let mut id = ROOT;
        loop {
            let slot = hash.take(self.options.bits())?;
            let occupant = match self.buckets[id].slots.get(&slot) {
                None => Occupant::Empty,
                Some(Slot::Leaf(link)) if link.name == name => Occupant::Match(link.clone()),
                Some(Slot::Leaf(link)) => Occupant::Other(link.clone()),
                Some(Slot::Bucket(child)) => {
                    let child = *child;
                    self.ensure_loaded(dag, child).await?;
                    id = child;
                    continue;
                },
            };
            return Ok(Position {
                bucket: id,
                slot,
                occupant,
            });
        }
    }

    pub async fn get<B: BlockStore>(&mut self, dag: &Dag<B>, name: &str) -> Result<Option<Link>> {
        match self.find_position(dag, name).await?.occupant {
            Occupant::Match(link) => Ok(Some(link)),
            _ => Ok(None),
        }
    }

    /// Insert `link` under its name, returning the entry it replaced.
    ///
    /// When the slot is taken by another name, the slot is turned into a subshard holding the
    /// existing entry and the search continues one level deeper.
    pub async fn insert<B: BlockStore>(
        &mut self,
        dag: &Dag<B>,
        link: Link,
    ) -> Result<Option<Link>> {
        loop {
            let position = self.find_position(dag, &link.name).await?;
            match position.occupant {
                Occupant::Empty => {
                    self.set_leaf(position.bucket, position.slot, link);
                    return Ok(None);
                },
                Occupant::Match(previous) => {
                    self.set_leaf(position.bucket, position.slot, link);
                    return Ok(Some(previous));
                },
                Occupant::Other(existing) => {
                    self.split(position.bucket, position.slot, existing)?;
                },
            }
        }
    }

    /// Remove the entry called `name` and collapse the buckets left too small on the way up.
    pub async fn remove<B: BlockStore>(&mut self, dag: &Dag<B>, name: &str) -> Result<Link> {
        let position = self.find_position(dag, name).await?;
        if !matches!(position.occupant, Occupant::Match(_)) {
            return Err(MfsError::NotFound(name.to_string()));
        }
        let removed = match self.buckets[position.bucket].slots.remove(&position.slot) {
            Some(Slot::Leaf(link)) => link,
            _ => {
                return Err(MfsError::StructuralCorruption(format!(
                    "slot of '{name}' changed during removal"
                )));
            },
        };
        self.mark_dirty(position.bucket);
        self.collapse(position.bucket);
        Ok(removed)
    }

    /// Every entry of the shard, in slot order.
    pub async fn entries<B: BlockStore>(&mut self, dag: &Dag<B>) -> Result<Vec<Link>> {
        enum Work {
            Leaf(Link),
            Bucket(BucketId),
        }

        let mut entries = Vec::new();
        let mut stack = vec![Work::Bucket(ROOT)];
        while let Some(work) = stack.pop() {
            let id = match work {
                Work::Leaf(link) => {
                    entries.push(link);
                    continue;
                },
                Work::Bucket(id) => id,
            };
            self.ensure_loaded(dag, id).await?;
            for slot in self.buckets[id].slots.values().rev() {
                stack.push(match slot {
                    Slot::Leaf(link) => Work::Leaf(link.clone()),
                    Slot::Bucket(child) => Work::Bucket(*child),
                });
            }
        }
        Ok(entries)
    }

    fn set_leaf(&mut self, id: BucketId, slot: usize, link: Link) {
        self.buckets[id].slots.insert(slot, Slot::Leaf(link));
        self.mark_dirty(id);
    }

    fn split(&mut self, id: BucketId, slot: usize, existing: Link) -> Result<()> {
        let depth = self.buckets[id].depth + 1;
        let child_slot = slot_at_depth(&existing.name, depth, self.options.bits())?;
        tracing::trace!(
            "splitting slot {} at depth {} into a subshard",
            self.options.prefix(slot),
            depth - 1
        );

        let child = self.buckets.len();
        let mut bucket = Bucket::new(Some((id, slot)), depth, State::Dirty);
        bucket.slots.insert(child_slot, Slot::Leaf(existing));
        self.buckets.push(bucket);
        self.buckets[id].slots.insert(slot, Slot::Bucket(child));
        self.mark_dirty(id);
        Ok(())
    }

    /// Mark `id` and all of its ancestors as modified.
    fn mark_dirty(&mut self, mut id: BucketId) {
        loop {
            let bucket = &mut self.buckets[id];
            bucket.state = State::Dirty;
            match bucket.parent {
                Some((parent, _)) => id = parent,
                None => return,
            }
        }
    }

    /// Walk up from `id`: an empty subshard is dropped from its parent and a subshard left with a
    /// single leaf is replaced by that leaf. The shard root never collapses.
    fn collapse(&mut self, mut id: BucketId) {
        while let Some((parent, index)) = self.buckets[id].parent {
            let bucket = &mut self.buckets[id];
            let replacement = match bucket.slots.len() {
                0 => None,
                1 if matches!(bucket.slots.values().next(), Some(Slot::Leaf(_))) => {
                    bucket.slots.pop_first().map(|(_, slot)| slot)
                },
                _ => return,
            };
            bucket.parent = None;

            let parent_bucket = &mut self.buckets[parent];
            match replacement {
                Some(leaf) => {
                    parent_bucket.slots.insert(index, leaf);
                },
                None => {
                    parent_bucket.slots.remove(&index);
                },
            }
            tracing::trace!("collapsed subshard into slot {}", self.options.prefix(index));
            id = parent;
        }
    }
}
