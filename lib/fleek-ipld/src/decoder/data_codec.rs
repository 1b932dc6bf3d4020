//! This module provides the two step codec between raw block bytes and the typed UnixFS model.
//!
//! Decoding first reads the DAG-PB envelope (links + opaque `Data` bytes) and then decodes the
//! `Data` field as a UnixFS protobuf message. Encoding runs the same steps in reverse. Both are
//! pure functions of the node content: the same node always encodes to the same bytes.
//!
//! On any doubts or question please refer to the [UnixFS Spec](https://specs.ipfs.tech/unixfs/).
use std::borrow::Cow;

use bytes::Bytes;
use cid::Cid;
use ipld_core::codec::Codec;
use ipld_dagpb::{DagPbCodec, PbLink, PbNode};

use super::fs::{
    DirectoryNode,
    FileNode,
    FlatDirectory,
    Link,
    Metadata,
    Mtime,
    ShardedDirectory,
    UnixFsNode,
};
use crate::errors::IpldError;
use crate::hash::{DAG_PB, MURMUR3_X64_64, RAW};
use crate::unixfs::{Data, DataType, UnixTime};

/// Trait to decode the `data` field from a IPLD abstract format `F` and to build it back.
pub trait DataCodec<F> {
    fn decode_from(cid: &Cid, data: F) -> Result<UnixFsNode, IpldError>;

    fn encode_into(node: &UnixFsNode) -> Result<F, IpldError>;
}

/// Default implementation for `UnixFs`.
///
/// `PbNode` <---> `Data` (UnixFs) <---> `UnixFsNode`
pub struct UnixFsProtobufCodec;

impl UnixFsProtobufCodec {
    fn links(cid: &Cid, node: &PbNode) -> Result<Vec<Link>, IpldError> {
        node.links
            .iter()
            .map(|link| Link::try_from_pb(cid, link))
            .collect()
    }

    fn metadata(data: &Data) -> Metadata {
        Metadata {
            mode: data.mode,
            mtime: data
                .mtime
                .as_ref()
                .map(|t| Mtime::new(t.Seconds, t.FractionalNanoseconds)),
        }
    }

    fn from_result(cid: &Cid, node: &PbNode, data: &Data) -> Result<UnixFsNode, IpldError> {
        let metadata = Self::metadata(data);
        match data.Type {
            DataType::Directory => Ok(UnixFsNode::Directory(DirectoryNode::Flat(
                FlatDirectory {
                    links: Self::links(cid, node)?,
                    metadata,
                },
            ))),
            DataType::HAMTShard => {
                let fanout = data.fanout.ok_or_else(|| {
                    IpldError::UnixFsDecodingError(format!("shard without fanout - Cid {cid}"))
                })?;
                Ok(UnixFsNode::Directory(DirectoryNode::Sharded(
                    ShardedDirectory {
                        links: Self::links(cid, node)?,
                        metadata,
                        fanout,
                        hash_type: data.hashType.unwrap_or(MURMUR3_X64_64),
                        bitfield: data
                            .Data
                            .as_ref()
                            .map(|bits| Bytes::copy_from_slice(bits))
                            .unwrap_or_default(),
                    },
                )))
            },
            DataType::File | DataType::Raw => {
                // Chunk links are positional, their names are empty or absent.
                let links = node
                    .links
                    .iter()
                    .map(|link| {
                        let name = link.name.clone().unwrap_or_default();
                        Link::new(name, link.cid, link.size.unwrap_or_default())
                    })
                    .collect();
                Ok(UnixFsNode::File(FileNode {
                    data: data.Data.as_ref().map(|d| Bytes::copy_from_slice(d)),
                    links,
                    blocksizes: data.blocksizes.clone(),
                    filesize: data.filesize,
                    metadata,
                }))
            },
            DataType::Symlink => {
                let target = data.Data.as_deref().unwrap_or_default();
                Ok(UnixFsNode::Symlink(
                    String::from_utf8_lossy(target).into_owned(),
                ))
            },
            DataType::Metadata => Err(IpldError::NotUnixFs(*cid)),
        }
    }
}

fn unix_time(metadata: &Metadata) -> Option<UnixTime> {
    metadata.mtime.map(|t| UnixTime {
        Seconds: t.secs,
        FractionalNanoseconds: t.nsecs,
    })
}

impl DataCodec<PbNode> for UnixFsProtobufCodec {
    fn decode_from(cid: &Cid, node: PbNode) -> Result<UnixFsNode, IpldError> {
        let Some(bytes) = node.data.as_ref() else {
            return Err(IpldError::NotUnixFs(*cid));
        };
        let data = Data::try_from(bytes.as_ref())
            .map_err(|e| IpldError::UnixFsDecodingError(format!("{e} - Cid {cid}")))?;
        Self::from_result(cid, &node, &data)
    }

    fn encode_into(node: &UnixFsNode) -> Result<PbNode, IpldError> {
        let (data, links) = match node {
            UnixFsNode::Directory(DirectoryNode::Flat(dir)) => (
                Data {
                    Type: DataType::Directory,
                    mode: dir.metadata.mode,
                    mtime: unix_time(&dir.metadata),
                    ..Default::default()
                },
                &dir.links,
            ),
            UnixFsNode::Directory(DirectoryNode::Sharded(dir)) => (
                Data {
                    Type: DataType::HAMTShard,
                    Data: Some(Cow::Borrowed(dir.bitfield.as_ref())),
                    hashType: Some(dir.hash_type),
                    fanout: Some(dir.fanout),
                    mode: dir.metadata.mode,
                    mtime: unix_time(&dir.metadata),
                    ..Default::default()
                },
                &dir.links,
            ),
            UnixFsNode::File(file) => (
                Data {
                    Type: DataType::File,
                    Data: file.data.as_ref().map(|d| Cow::Borrowed(d.as_ref())),
                    filesize: Some(file.file_size()),
                    blocksizes: file.blocksizes.clone(),
                    mode: file.metadata.mode,
                    mtime: unix_time(&file.metadata),
                    ..Default::default()
                },
                &file.links,
            ),
            UnixFsNode::Symlink(target) => {
                let data = Data {
                    Type: DataType::Symlink,
                    Data: Some(Cow::Borrowed(target.as_bytes())),
                    ..Default::default()
                };
                return Ok(PbNode {
                    links: Vec::new(),
                    data: Some(data.to_bytes()?.into()),
                });
            },
            UnixFsNode::Raw(_) => {
                return Err(IpldError::UnixFsDecodingError(
                    "raw leaves have no DAG-PB form".to_string(),
                ));
            },
        };
        Ok(PbNode {
            links: links.iter().map(PbLink::from).collect(),
            data: Some(data.to_bytes()?.into()),
        })
    }
}

/// Default implementation for the combination of `DagPbCodec` and `UnixFs`.
/// This is the most common use case for IPFS data.
///
/// `Bytes` <---> `DagPbCodec` <---> `Data` (UnixFs) <---> `UnixFsNode`
#[derive(Default, Clone, Copy, Debug)]
pub struct DagPbWithUnixFsCodec;

impl DagPbWithUnixFsCodec {
    /// Decode the block `bytes` addressed by `cid`. Raw blocks decode to [`UnixFsNode::Raw`].
    pub fn decode_from_slice(cid: &Cid, bytes: &[u8]) -> Result<UnixFsNode, IpldError> {
        match cid.codec() {
            RAW => Ok(UnixFsNode::Raw(Bytes::copy_from_slice(bytes))),
            DAG_PB => {
                let node: PbNode = DagPbCodec::decode_from_slice(bytes)?;
                UnixFsProtobufCodec::decode_from(cid, node)
            },
            _ => Err(IpldError::UnsupportedCodec(*cid)),
        }
    }

    /// Decode the block `bytes` addressed by `cid` and require it to be a directory.
    pub fn decode_directory(cid: &Cid, bytes: &[u8]) -> Result<DirectoryNode, IpldError> {
        Self::decode_from_slice(cid, bytes)?.try_into_dir(cid)
    }

    /// Encode a node into block bytes, returning the codec the bytes must be addressed with.
    pub fn encode_to_vec(node: &UnixFsNode) -> Result<(Vec<u8>, u64), IpldError> {
        match node {
            UnixFsNode::Raw(bytes) => Ok((bytes.to_vec(), RAW)),
            _ => {
                let pb = UnixFsProtobufCodec::encode_into(node)?;
                Ok((DagPbCodec::encode_to_vec(&pb)?, DAG_PB))
            },
        }
    }

    /// Encode a directory node into DAG-PB bytes.
    pub fn encode_directory(dir: &DirectoryNode) -> Result<Vec<u8>, IpldError> {
        let pb = UnixFsProtobufCodec::encode_into(&UnixFsNode::Directory(dir.clone()))?;
        Ok(DagPbCodec::encode_to_vec(&pb)?)
    }
}

#[cfg(test)]
mod tests {
    use cid::Version;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::decoder::fs::bitfield_from_slots;
    use crate::hash::block_cid;

    fn leaf(name: &str) -> Link {
        let cid = block_cid(name.as_bytes(), Version::V1, RAW).unwrap();
        Link::new(name, cid, name.len() as u64)
    }

    #[test]
    fn empty_directory_encodes_to_well_known_bytes() {
        let bytes = DagPbWithUnixFsCodec::encode_directory(&DirectoryNode::empty()).unwrap();
        assert_eq!(bytes, vec![0x0a, 0x02, 0x08, 0x01]);
    }

    #[test]
    fn flat_directory_round_trips_with_metadata() {
        let dir = DirectoryNode::Flat(FlatDirectory {
            links: vec![leaf("a"), leaf("b")],
            metadata: Metadata::new(Some(0o755), Some(Mtime::new(5, Some(6)))),
        });
        let bytes = DagPbWithUnixFsCodec::encode_directory(&dir).unwrap();
        let cid = block_cid(&bytes, Version::V0, DAG_PB).unwrap();
        let decoded = DagPbWithUnixFsCodec::decode_directory(&cid, &bytes).unwrap();
        assert_eq!(decoded, dir);
    }

    #[test]
    fn sharded_directory_keeps_its_shard_fields() {
        let dir = DirectoryNode::Sharded(ShardedDirectory {
            links: vec![leaf("0Aname"), leaf("FF")],
            metadata: Metadata::default(),
            fanout: 256,
            hash_type: MURMUR3_X64_64,
            bitfield: bitfield_from_slots(256, [10, 255]),
        });
        let bytes = DagPbWithUnixFsCodec::encode_directory(&dir).unwrap();
        let cid = block_cid(&bytes, Version::V1, DAG_PB).unwrap();
        let decoded = DagPbWithUnixFsCodec::decode_directory(&cid, &bytes).unwrap();
        assert_eq!(decoded, dir);
    }

    #[test]
    fn identical_content_encodes_identically() {
        let dir = DirectoryNode::Flat(FlatDirectory {
            links: vec![leaf("x"), leaf("y")],
            metadata: Metadata::default(),
        });
        let a = DagPbWithUnixFsCodec::encode_directory(&dir).unwrap();
        let b = DagPbWithUnixFsCodec::encode_directory(&dir.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn raw_codec_is_not_a_directory() {
        let cid = block_cid(b"data", Version::V1, RAW).unwrap();
        assert!(matches!(
            DagPbWithUnixFsCodec::decode_directory(&cid, b"data"),
            Err(IpldError::InvalidDir(_))
        ));
    }

    #[test]
    fn pb_node_without_data_is_not_unixfs() {
        let bytes = DagPbCodec::encode_to_vec(&PbNode {
            links: vec![],
            data: None,
        })
        .unwrap();
        let cid = block_cid(&bytes, Version::V0, DAG_PB).unwrap();
        assert!(matches!(
            DagPbWithUnixFsCodec::decode_from_slice(&cid, &bytes),
            Err(IpldError::NotUnixFs(_))
        ));
    }

    #[test]
    fn file_with_chunks_round_trips() {
        let node = UnixFsNode::File(FileNode {
            data: None,
            links: vec![Link::new("", leaf("a").cid, 3), Link::new("", leaf("b").cid, 3)],
            blocksizes: vec![3, 3],
            filesize: Some(6),
            metadata: Metadata::new(Some(0o644), None),
        });
        let (bytes, codec) = DagPbWithUnixFsCodec::encode_to_vec(&node).unwrap();
        assert_eq!(codec, DAG_PB);
        let cid = block_cid(&bytes, Version::V0, codec).unwrap();
        let decoded = DagPbWithUnixFsCodec::decode_from_slice(&cid, &bytes).unwrap();
        assert_eq!(decoded, node);
    }
}
