//! Building a whole directory tree at once.
//!
//! [`DirectoryBuilder`] collects entries and nested directories in memory and writes them
//! bottom-up in a single pass. Directories with more entries than the split threshold are written
//! as HAMT shards directly.
use std::collections::BTreeMap;

use cid::Cid;
use fleek_ipld::{DirectoryNode, FlatDirectory, Link, Metadata};
use lightning_blockstore::BlockStore;

use crate::dag::Dag;
use crate::editor::{EditOptions, Updated};
use crate::error::{MfsError, Result};
use crate::hamt::{Hamt, HamtOptions};
use crate::path::validate_name;

#[derive(Clone, Debug)]
enum Entry {
    Link { cid: Cid, size: u64 },
    Dir(DirectoryBuilder),
}

#[derive(Clone, Debug, Default)]
pub struct DirectoryBuilder {
    entries: BTreeMap<String, Entry>,
    metadata: Metadata,
}

impl DirectoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            entries: BTreeMap::new(),
            metadata,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a link to an existing node, replacing any entry of the same name.
    pub fn add_link(&mut self, name: &str, cid: Cid, size: u64) -> Result<&mut Self> {
        validate_name(name)?;
        self.entries
            .insert(name.to_string(), Entry::Link { cid, size });
        Ok(self)
    }

    pub fn add_dir(&mut self, name: &str, dir: DirectoryBuilder) -> Result<&mut Self> {
        validate_name(name)?;
        self.entries.insert(name.to_string(), Entry::Dir(dir));
        Ok(self)
    }

    /// The nested builder called `name`, created empty if needed.
    pub fn dir_mut(&mut self, name: &str) -> Result<&mut DirectoryBuilder> {
        validate_name(name)?;
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| Entry::Dir(DirectoryBuilder::new()));
        match entry {
            Entry::Dir(dir) => Ok(dir),
            Entry::Link { .. } => Err(MfsError::AlreadyExists(name.to_string())),
        }
    }

    /// Write the tree, children before parents, and return the root directory.
    pub async fn flush<B: BlockStore>(
        self,
        dag: &Dag<B>,
        options: &EditOptions,
    ) -> Result<Updated> {
        options.validate()?;

        struct Pending {
            metadata: Metadata,
            links: Vec<Link>,
            /// Entries still waiting for a nested directory: (name, pending index).
            nested: Vec<(String, usize)>,
        }

        // flatten the tree, parents always get a lower index than their children.
        let mut pending: Vec<Pending> = Vec::new();
        let mut queue = vec![(self, None::<(usize, String)>)];
        let mut parents = Vec::new();
        while let Some((builder, parent)) = queue.pop() {
            let index = pending.len();
            pending.push(Pending {
                metadata: builder.metadata,
                links: Vec::new(),
                nested: Vec::new(),
            });
            parents.push(parent);
            for (name, entry) in builder.entries {
                match entry {
                    Entry::Link { cid, size } => {
                        pending[index].links.push(Link::new(name, cid, size));
                    },
                    Entry::Dir(dir) => queue.push((dir, Some((index, name)))),
                }
            }
        }
        for (index, parent) in parents.iter().enumerate() {
            if let Some((parent, name)) = parent {
                pending[*parent].nested.push((name.clone(), index));
            }
        }

        let mut written: Vec<Option<Updated>> = vec![None; pending.len()];
        for index in (0..pending.len()).rev() {
            dag.check_cancelled()?;
            let mut links = std::mem::take(&mut pending[index].links);
            for (name, child) in std::mem::take(&mut pending[index].nested) {
                let child = written[child].as_ref().ok_or_else(|| {
                    MfsError::StructuralCorruption(format!("directory '{name}' was not written"))
                })?;
                links.push(Link::new(name, child.cid, child.size));
            }
            let metadata = pending[index].metadata;
            written[index] = Some(write_dir(dag, links, metadata, options).await?);
        }

        written
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| {
                MfsError::StructuralCorruption("root directory was not written".into())
            })
    }
}

async fn write_dir<B: BlockStore>(
    dag: &Dag<B>,
    links: Vec<Link>,
    metadata: Metadata,
    options: &EditOptions,
) -> Result<Updated> {
    if links.len() <= options.shard_split_threshold {
        let node = DirectoryNode::Flat(FlatDirectory { links, metadata });
        let stored = dag
            .put_dir(node.clone(), options.cid_version, options.flush)
            .await?;
        return Ok(Updated {
            node,
            cid: stored.cid,
            size: stored.size,
        });
    }

    let mut hamt = Hamt::new(HamtOptions::new(options.fanout, options.hash_type)?);
    for link in links {
        hamt.insert(dag, link).await?;
    }
    Ok(hamt
        .flush(dag, metadata, options.cid_version, options.flush)
        .await?
        .into())
}
