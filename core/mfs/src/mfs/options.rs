//! Per-operation options. Every operation accepts an optional cancellation signal, a cancelled
//! operation fails with `MfsError::Cancelled` and never publishes a root.
use fleek_ipld::Mtime;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct StatOptions {
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct MkdirOptions {
    /// Create missing parents, and succeed if the directory already exists.
    #[builder(default)]
    pub parents: bool,
    #[builder(default, setter(strip_option))]
    pub mode: Option<u32>,
    #[builder(default, setter(strip_option))]
    pub mtime: Option<Mtime>,
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}

#[derive(Clone, Debug, TypedBuilder)]
pub struct WriteOptions {
    #[builder(default = true)]
    pub create: bool,
    #[builder(default)]
    pub parents: bool,
    #[builder(default, setter(strip_option))]
    pub mode: Option<u32>,
    #[builder(default, setter(strip_option))]
    pub mtime: Option<Mtime>,
    /// Overrides the configured leaf format for this write.
    #[builder(default, setter(strip_option))]
    pub raw_leaves: Option<bool>,
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct ReadOptions {
    #[builder(default)]
    pub offset: u64,
    #[builder(default, setter(strip_option))]
    pub length: Option<u64>,
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct RmOptions {
    #[builder(default)]
    pub recursive: bool,
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}

/// Options of `cp` and `mv`.
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct CpOptions {
    #[builder(default)]
    pub parents: bool,
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct TouchOptions {
    /// Defaults to the current time.
    #[builder(default, setter(strip_option))]
    pub mtime: Option<Mtime>,
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct ChmodOptions {
    #[builder(default, setter(strip_option))]
    pub signal: Option<CancellationToken>,
}
