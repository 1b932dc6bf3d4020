pub mod config;
pub mod fs;
pub mod memory;
pub mod store;

pub use config::Config;
pub use fs::{FsBlockStore, FsRootStore};
pub use memory::{MemoryBlockStore, MemoryRootStore};
pub use store::{BlockStore, BlockstoreError, RootStore};
