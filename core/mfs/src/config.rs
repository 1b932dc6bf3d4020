use cid::Version;
use fleek_ipld::hash::MURMUR3_X64_64;
use serde::{Deserialize, Serialize};

use crate::editor::EditOptions;
use crate::error::{MfsError, Result};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// A flat directory holding this many links is converted into a HAMT shard on the next
    /// insert.
    pub shard_split_threshold: usize,
    /// Number of slots per HAMT bucket. Must be a power of two.
    pub fanout: u64,
    /// Multicodec code of the HAMT hash function.
    pub hamt_hash_type: u64,
    /// CID version of the DAG-PB nodes this instance writes, `0` or `1`.
    pub cid_version: u8,
    /// Store file chunks as raw blocks instead of UnixFS file nodes.
    pub raw_leaves: bool,
    pub chunk_size: usize,
    pub max_children_per_node: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_split_threshold: 1000,
            fanout: 256,
            hamt_hash_type: MURMUR3_X64_64,
            cid_version: 0,
            raw_leaves: false,
            chunk_size: 262144,
            max_children_per_node: 174,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.fanout.is_power_of_two() || !(8..=1024).contains(&self.fanout) {
            return Err(MfsError::InvalidArgument(format!(
                "fanout must be a power of two between 8 and 1024, got {}",
                self.fanout
            )));
        }
        if self.hamt_hash_type != MURMUR3_X64_64 {
            return Err(MfsError::InvalidArgument(format!(
                "unsupported hamt hash type 0x{:x}",
                self.hamt_hash_type
            )));
        }
        if self.shard_split_threshold == 0 {
            return Err(MfsError::InvalidArgument(
                "shard_split_threshold must be at least 1".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(MfsError::InvalidArgument(
                "chunk_size must be at least 1".into(),
            ));
        }
        if self.max_children_per_node < 2 {
            return Err(MfsError::InvalidArgument(
                "max_children_per_node must be at least 2".into(),
            ));
        }
        self.version()?;
        Ok(())
    }

    pub fn version(&self) -> Result<Version> {
        match self.cid_version {
            0 => Ok(Version::V0),
            1 => Ok(Version::V1),
            v => Err(MfsError::InvalidArgument(format!(
                "unsupported cid version {v}"
            ))),
        }
    }

    /// The options used for every directory edit performed on behalf of this configuration.
    pub fn edit_options(&self) -> Result<EditOptions> {
        Ok(EditOptions::builder()
            .cid_version(self.version()?)
            .shard_split_threshold(self.shard_split_threshold)
            .fanout(self.fanout)
            .hash_type(self.hamt_hash_type)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use lightning_utils::config::TomlConfigProvider;

    use super::*;
    use crate::Mfs;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.shard_split_threshold, 1000);
        assert_eq!(config.fanout, 256);
        assert_eq!(config.version().unwrap(), Version::V0);
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            Config {
                fanout: 100,
                ..Default::default()
            },
            Config {
                fanout: 2048,
                ..Default::default()
            },
            Config {
                hamt_hash_type: 0x12,
                ..Default::default()
            },
            Config {
                shard_split_threshold: 0,
                ..Default::default()
            },
            Config {
                cid_version: 2,
                ..Default::default()
            },
            Config {
                max_children_per_node: 1,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(MfsError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[mfs]\nshard_split_threshold = 5\ncid_version = 1\n").unwrap();

        let provider = TomlConfigProvider::load(&path).unwrap();
        let config = provider
            .get::<Mfs<lightning_blockstore::MemoryBlockStore, lightning_blockstore::MemoryRootStore>>()
            .unwrap();
        assert_eq!(config.shard_split_threshold, 5);
        assert_eq!(config.version().unwrap(), Version::V1);
        assert_eq!(config.fanout, 256);
    }
}
