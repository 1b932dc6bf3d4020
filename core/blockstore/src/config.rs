use std::path::PathBuf;

use lightning_utils::config::LIGHTNING_HOME_DIR;
use serde::{Deserialize, Serialize};

pub const BLOCK_DIR: &str = "blocks";
pub const DATASTORE_DIR: &str = "datastore";
pub const TMP_DIR: &str = "tmp";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: LIGHTNING_HOME_DIR.join("blockstore"),
        }
    }
}
