//! UnixFS over DAG-PB: the typed node model, its codec and the content addressing used to
//! persist it.
pub mod decoder;
pub mod errors;
pub mod hash;
pub mod unixfs;

pub use decoder::data_codec::{DagPbWithUnixFsCodec, DataCodec, UnixFsProtobufCodec};
pub use decoder::fs::{
    bitfield_from_slots,
    DirectoryNode,
    FileNode,
    FlatDirectory,
    Link,
    Metadata,
    Mtime,
    ShardedDirectory,
    UnixFsNode,
};
pub use errors::IpldError;
