use fleek_ipld::IpldError;
use lightning_blockstore::BlockstoreError;
use thiserror::Error;

/// The error kinds an MFS operation can fail with, without their payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotUnixfsNode,
    NotFound,
    StructuralCorruption,
    AlreadyExists,
    NotADirectory,
    NotAFile,
    Cancelled,
    Codec,
    Blockstore,
}

#[derive(Debug, Error)]
pub enum MfsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not a UnixFS node: {0}")]
    NotUnixfsNode(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Corrupted sharded directory: {0}")]
    StructuralCorruption(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("Operation was cancelled")]
    Cancelled,
    #[error("Codec error: {0}")]
    Codec(IpldError),
    #[error("Blockstore error: {0}")]
    Blockstore(BlockstoreError),
}

impl MfsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotUnixfsNode(_) => ErrorKind::NotUnixfsNode,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StructuralCorruption(_) => ErrorKind::StructuralCorruption,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotADirectory(_) => ErrorKind::NotADirectory,
            Self::NotAFile(_) => ErrorKind::NotAFile,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Blockstore(_) => ErrorKind::Blockstore,
        }
    }
}

impl From<IpldError> for MfsError {
    fn from(e: IpldError) -> Self {
        match e {
            IpldError::NotUnixFs(_)
            | IpldError::UnsupportedCodec(_)
            | IpldError::DagPbError(_)
            | IpldError::UnixFsDecodingError(_)
            | IpldError::UnnamedLink(_) => Self::NotUnixfsNode(e.to_string()),
            IpldError::InvalidDir(cid) => Self::NotADirectory(cid.to_string()),
            e => Self::Codec(e),
        }
    }
}

impl From<BlockstoreError> for MfsError {
    fn from(e: BlockstoreError) -> Self {
        match e {
            BlockstoreError::NotFound(cid) => Self::NotFound(format!("block {cid}")),
            e => Self::Blockstore(e),
        }
    }
}

impl From<std::io::Error> for MfsError {
    fn from(e: std::io::Error) -> Self {
        Self::Blockstore(BlockstoreError::IOError(e))
    }
}

pub type Result<T> = std::result::Result<T, MfsError>;
