use bytes::Bytes;
use cid::{Cid, Version};
use fleek_ipld::{FileNode, Link, Metadata, UnixFsNode};
use lightning_blockstore::BlockStore;
use typed_builder::TypedBuilder;

use crate::dag::Dag;
use crate::error::{MfsError, Result};

#[derive(Clone, Debug, TypedBuilder)]
pub struct ImportOptions {
    #[builder(default = 262144)]
    pub chunk_size: usize,
    #[builder(default = 174)]
    pub max_children_per_node: usize,
    #[builder(default)]
    pub raw_leaves: bool,
    #[builder(default = Version::V0)]
    pub cid_version: Version,
    /// Attributes of the file, stored on its root node.
    #[builder(default)]
    pub metadata: Metadata,
}

impl ImportOptions {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(MfsError::InvalidArgument(
                "chunk_size must be at least 1".into(),
            ));
        }
        if self.max_children_per_node < 2 {
            return Err(MfsError::InvalidArgument(format!(
                "max_children_per_node must be at least 2, got {}",
                self.max_children_per_node
            )));
        }
        Ok(())
    }
}

/// The root of an imported file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Imported {
    pub cid: Cid,
    /// Cumulative size of the file DAG, what a directory link records.
    pub size: u64,
    pub file_size: u64,
}

struct Layer {
    cid: Cid,
    size: u64,
    file_size: u64,
}

/// Chunk `content` with a fixed size chunker and store it as a balanced DAG.
///
/// Content that fits in one chunk is stored as a single node. Larger content gets one leaf per
/// chunk and layers of intermediate nodes with at most `max_children_per_node` links each, the
/// file attributes live on the root only.
pub async fn import_file<B: BlockStore>(
    dag: &Dag<B>,
    content: Bytes,
    options: &ImportOptions,
) -> Result<Imported> {
    options.validate()?;
    let file_size = content.len() as u64;

    if content.len() <= options.chunk_size {
        let plain = options.metadata == Metadata::default();
        let node = if options.raw_leaves && plain && !content.is_empty() {
            UnixFsNode::Raw(content)
        } else {
            UnixFsNode::File(FileNode {
                data: (!content.is_empty()).then_some(content),
                filesize: Some(file_size),
                metadata: options.metadata,
                ..Default::default()
            })
        };
        let stored = dag.put_node(&node, options.cid_version, true).await?;
        return Ok(Imported {
            cid: stored.cid,
            size: stored.size,
            file_size,
        });
    }

    let mut layer = Vec::with_capacity(content.len().div_ceil(options.chunk_size));
    let mut offset = 0;
    while offset < content.len() {
        let end = (offset + options.chunk_size).min(content.len());
        let chunk = content.slice(offset..end);
        let len = chunk.len() as u64;
        let node = if options.raw_leaves {
            UnixFsNode::Raw(chunk)
        } else {
            UnixFsNode::File(FileNode {
                data: Some(chunk),
                filesize: Some(len),
                ..Default::default()
            })
        };
        let stored = dag.put_node(&node, options.cid_version, true).await?;
        layer.push(Layer {
            cid: stored.cid,
            size: stored.size,
            file_size: len,
        });
        offset = end;
    }
    tracing::trace!("stored {} leaves for a {file_size} byte file", layer.len());

    loop {
        let groups = layer.len().div_ceil(options.max_children_per_node);
        let mut parents = Vec::with_capacity(groups);
        for group in layer.chunks(options.max_children_per_node) {
            let node = FileNode {
                data: None,
                links: group
                    .iter()
                    .map(|child| Link::new("", child.cid, child.size))
                    .collect(),
                blocksizes: group.iter().map(|child| child.file_size).collect(),
                filesize: Some(group.iter().map(|child| child.file_size).sum()),
                metadata: if groups == 1 {
                    options.metadata
                } else {
                    Metadata::default()
                },
            };
            let file_size = node.file_size();
            let stored = dag
                .put_node(&UnixFsNode::File(node), options.cid_version, true)
                .await?;
            parents.push(Layer {
                cid: stored.cid,
                size: stored.size,
                file_size,
            });
        }
        layer = parents;
        if let [root] = layer.as_slice() {
            return Ok(Imported {
                cid: root.cid,
                size: root.size,
                file_size: root.file_size,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use fleek_ipld::hash::{DAG_PB, RAW};
    use fleek_ipld::Mtime;
    use lightning_blockstore::MemoryBlockStore;

    use super::*;

    fn content(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
    }

    #[tokio::test]
    async fn small_content_is_a_single_node() {
        let dag = Dag::new(MemoryBlockStore::new());
        let options = ImportOptions::builder().build();
        let imported = import_file(&dag, content(100), &options).await.unwrap();
        assert_eq!(imported.file_size, 100);
        assert_eq!(imported.cid.codec(), DAG_PB);
        let (node, size) = dag.load(&imported.cid).await.unwrap();
        assert_eq!(size, imported.size);
        let UnixFsNode::File(file) = node else {
            panic!("expected a file node");
        };
        assert!(file.links.is_empty());
        assert_eq!(file.data.unwrap(), content(100));
    }

    #[tokio::test]
    async fn raw_leaves_without_attributes_store_raw_blocks() {
        let dag = Dag::new(MemoryBlockStore::new());
        let options = ImportOptions::builder().raw_leaves(true).build();
        let imported = import_file(&dag, content(10), &options).await.unwrap();
        assert_eq!(imported.cid.codec(), RAW);

        let with_mtime = ImportOptions::builder()
            .raw_leaves(true)
            .metadata(Metadata::new(None, Some(Mtime::new(1, None))))
            .build();
        let imported = import_file(&dag, content(10), &with_mtime).await.unwrap();
        assert_eq!(imported.cid.codec(), DAG_PB);
    }

    #[tokio::test]
    async fn large_content_builds_balanced_layers() {
        let dag = Dag::new(MemoryBlockStore::new());
        let options = ImportOptions::builder()
            .chunk_size(10)
            .max_children_per_node(3)
            .metadata(Metadata::new(Some(0o644), None))
            .build();
        // 10 chunks: 4 parents, 2 grandparents, 1 root.
        let imported = import_file(&dag, content(95), &options).await.unwrap();
        assert_eq!(imported.file_size, 95);

        let (node, _) = dag.load(&imported.cid).await.unwrap();
        let UnixFsNode::File(root) = node else {
            panic!("expected a file node");
        };
        assert_eq!(root.links.len(), 2);
        assert_eq!(root.file_size(), 95);
        assert_eq!(root.metadata.mode, Some(0o644));

        let (child, _) = dag.load(&root.links[0].cid).await.unwrap();
        assert_eq!(child.metadata(), Some(&Metadata::default()));
        assert_eq!(child.links().len(), 3);
    }

    #[tokio::test]
    async fn empty_content_keeps_its_attributes() {
        let dag = Dag::new(MemoryBlockStore::new());
        let options = ImportOptions::builder()
            .raw_leaves(true)
            .metadata(Metadata::new(Some(0o600), None))
            .build();
        let imported = import_file(&dag, Bytes::new(), &options).await.unwrap();
        assert_eq!(imported.file_size, 0);
        let (node, _) = dag.load(&imported.cid).await.unwrap();
        assert_eq!(node.metadata().unwrap().mode, Some(0o600));
    }

    #[tokio::test]
    async fn degenerate_layouts_are_rejected() {
        let blocks = MemoryBlockStore::new();
        let dag = Dag::new(blocks.clone());

        let single_child = ImportOptions::builder()
            .chunk_size(4)
            .max_children_per_node(1)
            .build();
        assert!(matches!(
            import_file(&dag, content(12), &single_child).await,
            Err(MfsError::InvalidArgument(_))
        ));

        let no_chunks = ImportOptions::builder().chunk_size(0).build();
        assert!(matches!(
            import_file(&dag, content(12), &no_chunks).await,
            Err(MfsError::InvalidArgument(_))
        ));
        assert!(blocks.is_empty());
    }
}
