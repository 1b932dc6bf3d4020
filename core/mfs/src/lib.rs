//! A mutable, POSIX-like file system over immutable UnixFS blocks.
//!
//! Directories are DAG-PB nodes, large directories are stored as HAMT shards. Every change
//! produces new blocks for the changed node and its ancestors and moves a single root pointer.
pub mod builder;
pub mod config;
pub mod dag;
pub mod editor;
pub mod error;
pub mod file;
pub mod gate;
pub mod hamt;
pub mod mfs;
pub mod path;
pub mod root;
pub mod trail;

#[cfg(test)]
mod tests;

pub use builder::DirectoryBuilder;
pub use config::Config;
pub use editor::{add_link, remove_link, ChildLink, EditOptions, ParentRef, Updated};
pub use error::{ErrorKind, MfsError};
pub use mfs::{
    ChmodOptions,
    CpOptions,
    DirEntry,
    Mfs,
    MkdirOptions,
    ReadOptions,
    RmOptions,
    Stat,
    StatOptions,
    TouchOptions,
    WriteOptions,
};
pub use path::MfsPath;
pub use root::{RootPointer, MFS_ROOT_KEY};
pub use trail::{update_tree, EntryKind, TrailEntry};
