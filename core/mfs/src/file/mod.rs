//! Turning byte content into a UnixFS file DAG and reading it back.
mod import;
mod read;

pub use import::{import_file, ImportOptions, Imported};
pub use read::read_file;
