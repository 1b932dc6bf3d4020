mod concurrency;

use lightning_blockstore::{MemoryBlockStore, MemoryRootStore};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

use crate::{Config, Mfs};

#[allow(unused)]
pub fn try_init_tracing() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lightning_mfs=debug".into()),
        )
        .try_init()
}

pub type TestMfs = Mfs<MemoryBlockStore, MemoryRootStore>;

pub async fn mfs_with(config: Config) -> TestMfs {
    let _ = try_init_tracing();
    Mfs::new(MemoryBlockStore::new(), MemoryRootStore::new(), config)
        .await
        .unwrap()
}

pub async fn mfs() -> TestMfs {
    mfs_with(Config::default()).await
}

/// Deterministic pseudo random content.
pub fn content(len: usize, seed: u64) -> Vec<u8> {
    use rand::rngs::SmallRng;
    use rand::{RngCore, SeedableRng};

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut buf = vec![0; len];
    rng.fill_bytes(&mut buf);
    buf
}
