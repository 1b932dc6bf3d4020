use bytes::{Bytes, BytesMut};
use cid::Cid;
use fleek_ipld::UnixFsNode;
use lightning_blockstore::BlockStore;

use crate::dag::Dag;
use crate::error::{MfsError, Result};

/// Read `length` bytes (or everything) starting at `offset` from the file rooted at `cid`.
///
/// Only the nodes overlapping the requested range are loaded.
pub async fn read_file<B: BlockStore>(
    dag: &Dag<B>,
    cid: Cid,
    offset: u64,
    length: Option<u64>,
) -> Result<Bytes> {
    let (root, _) = dag.load(&cid).await?;
    let file_size = match &root {
        UnixFsNode::File(file) => file.file_size(),
        UnixFsNode::Raw(bytes) => bytes.len() as u64,
        _ => return Err(MfsError::NotAFile(cid.to_string())),
    };
    let start = offset.min(file_size);
    let end = length
        .map(|len| start.saturating_add(len))
        .unwrap_or(file_size)
        .min(file_size);

    let mut out = BytesMut::with_capacity((end - start) as usize);
    // (node, offset of its first byte in the file)
    let mut stack = vec![(root, 0u64)];
    while let Some((node, node_start)) = stack.pop() {
        match node {
            UnixFsNode::Raw(bytes) => copy_range(&mut out, &bytes, node_start, start, end),
            UnixFsNode::File(file) => {
                let data_len = file.data.as_ref().map(|d| d.len() as u64).unwrap_or_default();
                if let Some(data) = &file.data {
                    copy_range(&mut out, data, node_start, start, end);
                }
                if file.links.len() != file.blocksizes.len() {
                    return Err(MfsError::StructuralCorruption(format!(
                        "file node with {} links and {} block sizes",
                        file.links.len(),
                        file.blocksizes.len()
                    )));
                }

                let mut wanted = Vec::new();
                let mut child_start = node_start + data_len;
                for (link, len) in file.links.iter().zip(&file.blocksizes) {
                    if child_start < end && child_start + len > start {
                        wanted.push((link.cid, child_start));
                    }
                    child_start += len;
                }
                for (child, child_start) in wanted.into_iter().rev() {
                    let (node, _) = dag.load(&child).await?;
                    stack.push((node, child_start));
                }
            },
            _ => return Err(MfsError::NotAFile(cid.to_string())),
        }
    }
    Ok(out.freeze())
}

fn copy_range(out: &mut BytesMut, bytes: &[u8], node_start: u64, start: u64, end: u64) {
    let node_end = node_start + bytes.len() as u64;
    let from = start.max(node_start);
    let to = end.min(node_end);
    if from < to {
        out.extend_from_slice(&bytes[(from - node_start) as usize..(to - node_start) as usize]);
    }
}

#[cfg(test)]
mod tests {
    use lightning_blockstore::MemoryBlockStore;

    use super::*;
    use crate::file::{import_file, ImportOptions};

    fn content(len: usize) -> Bytes {
        (0..len).map(|i| (i * 7 % 256) as u8).collect::<Vec<_>>().into()
    }

    #[tokio::test]
    async fn reads_whole_and_partial_ranges() {
        let dag = Dag::new(MemoryBlockStore::new());
        let data = content(1000);
        for raw_leaves in [false, true] {
            let options = ImportOptions::builder()
                .chunk_size(64)
                .max_children_per_node(4)
                .raw_leaves(raw_leaves)
                .build();
            let imported = import_file(&dag, data.clone(), &options).await.unwrap();

            assert_eq!(read_file(&dag, imported.cid, 0, None).await.unwrap(), data);
            assert_eq!(
                read_file(&dag, imported.cid, 100, Some(300)).await.unwrap(),
                data.slice(100..400)
            );
            assert_eq!(
                read_file(&dag, imported.cid, 990, Some(100)).await.unwrap(),
                data.slice(990..)
            );
            assert!(read_file(&dag, imported.cid, 5000, None)
                .await
                .unwrap()
                .is_empty());
        }
    }

    #[tokio::test]
    async fn directories_are_not_files() {
        let dag = Dag::new(MemoryBlockStore::new());
        let dir = dag
            .put_dir(fleek_ipld::DirectoryNode::empty(), cid::Version::V0, true)
            .await
            .unwrap();
        assert!(matches!(
            read_file(&dag, dir.cid, 0, None).await,
            Err(MfsError::NotAFile(_))
        ));
    }
}
