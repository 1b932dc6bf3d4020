use cid::Cid;
use thiserror::Error;

/// Error type for IPLD operations
#[derive(Debug, Error)]
pub enum IpldError {
    #[error("IPLD error: Error parsing Cid {0}")]
    CidParsingError(#[from] cid::Error),

    #[error("IPLD error: Error Decoding DAG-PB data {0}")]
    DagPbError(#[from] ipld_dagpb::Error),

    #[error("IPLD error: UnixFS error {0}")]
    UnixFsProtobufError(#[from] quick_protobuf::Error),

    #[error("IPLD error: Error decoding UnixFS data - {0}")]
    UnixFsDecodingError(String),

    #[error("IPLD error: Not a UnixFS node - Cid {0}")]
    NotUnixFs(Cid),

    #[error("IPLD error: Unsupported codec - Cid {0}")]
    UnsupportedCodec(Cid),

    #[error("IPLD error: Error validating hash - Cid {0}")]
    MultihashError(Cid),

    #[error("IPLD error: UnssuportedCode Multihash code: {0}")]
    MultihashCodeError(u64),

    #[error("IPLD error: Error building multihash {0}")]
    MultihashWrapError(#[from] cid::multihash::Error),

    #[error("IPLD error: Error trying to convert to Dir - Cid {0}")]
    InvalidDir(Cid),

    #[error("IPLD error: Link without a name in directory - Cid {0}")]
    UnnamedLink(Cid),
}
