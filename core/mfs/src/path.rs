use std::fmt;
use std::str::FromStr;

use cid::Cid;

use crate::error::{MfsError, Result};

/// An absolute path inside the MFS tree.
///
/// Paths are `/`-separated, repeated and trailing separators are ignored. `.` and `..` components
/// are rejected rather than resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MfsPath {
    components: Vec<String>,
}

impl MfsPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> Result<Self> {
        if !path.starts_with('/') {
            return Err(MfsError::InvalidArgument(format!(
                "paths must start with '/', got '{path}'"
            )));
        }
        let mut components = Vec::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            validate_name(component)?;
            components.push(component.to_string());
        }
        Ok(Self { components })
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The last component, `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<MfsPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    pub fn join(&self, name: &str) -> Result<MfsPath> {
        validate_name(name)?;
        let mut components = self.components.clone();
        components.push(name.to_string());
        Ok(Self { components })
    }

    /// Returns true if `self` is `other` or lies below it.
    pub fn starts_with(&self, other: &MfsPath) -> bool {
        self.components.starts_with(&other.components)
    }
}

impl fmt::Display for MfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromStr for MfsPath {
    type Err = MfsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check that `name` can be used as a single directory entry name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MfsError::InvalidArgument("empty entry name".into()));
    }
    if name.contains('/') {
        return Err(MfsError::InvalidArgument(format!(
            "entry name '{name}' contains '/'"
        )));
    }
    if name == "." || name == ".." {
        return Err(MfsError::InvalidArgument(format!(
            "relative component '{name}' is not supported"
        )));
    }
    Ok(())
}

/// Where a copy reads from: a path of this MFS, or an immutable `/ipfs/<cid>[/sub/path]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Mfs(MfsPath),
    Ipfs { cid: Cid, path: Vec<String> },
}

impl Source {
    pub fn parse(source: &str) -> Result<Self> {
        let Some(rest) = source.strip_prefix("/ipfs/") else {
            return MfsPath::parse(source).map(Self::Mfs);
        };
        let mut parts = rest.split('/').filter(|c| !c.is_empty());
        let cid = parts
            .next()
            .ok_or_else(|| MfsError::InvalidArgument(format!("missing cid in '{source}'")))?;
        let cid = Cid::try_from(cid)
            .map_err(|e| MfsError::InvalidArgument(format!("invalid cid '{cid}': {e}")))?;
        let mut path = Vec::new();
        for component in parts {
            validate_name(component)?;
            path.push(component.to_string());
        }
        Ok(Self::Ipfs { cid, path })
    }

    /// The name a copy of this source gets when the destination is an existing directory.
    pub fn base_name(&self) -> Option<String> {
        match self {
            Self::Mfs(path) => path.file_name().map(str::to_string),
            Self::Ipfs { cid, path } => Some(path.last().cloned().unwrap_or(cid.to_string())),
        }
    }
}
