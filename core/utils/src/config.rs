use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use toml::{Table, Value};

lazy_static! {
    pub static ref LIGHTNING_HOME_DIR: PathBuf = env::var("LIGHTNING_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".lightning")
        });
}

/// A component that reads its configuration from a section of the config file.
pub trait ConfigConsumer {
    /// The name of the section in the config file.
    const KEY: &'static str;

    type Config: Serialize + DeserializeOwned + Default;
}

/// The implementation of a configuration loader that uses the `toml` backend.
#[derive(Default)]
pub struct TomlConfigProvider {
    /// A `[key: string]->any` mapping, one entry per [`ConfigConsumer::KEY`].
    table: Mutex<Table>,
}

impl Clone for TomlConfigProvider {
    fn clone(&self) -> Self {
        Self {
            table: Mutex::new(self.table.lock().clone()),
        }
    }
}

impl TomlConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject<T: ConfigConsumer>(&self, config: T::Config) -> Result<()> {
        let value = Value::try_from(&config)
            .with_context(|| format!("Could not serialize the '{}' config.", T::KEY))?;
        self.table.lock().insert(T::KEY.to_owned(), value);
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!(
                "The configuration file '{}' does not exist.",
                path.to_string_lossy()
            ));
        }

        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "IO: Could not load the configuration file '{}'.",
                path.to_string_lossy()
            )
        })?;

        let table = toml::from_str::<Table>(&content).with_context(|| {
            format!(
                "Could not parse the configuration file '{}' as toml.",
                path.to_string_lossy()
            )
        })?;

        Ok(Self {
            table: Mutex::new(table),
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(&path, self.serialize_config()?).with_context(|| {
            format!(
                "Could not write the configuration file: {}",
                path.as_ref().to_string_lossy()
            )
        })
    }

    /// Returns the section of `S`, or its default when the section is missing. The returned
    /// value is written back into the table so that [`Self::write`] emits every section in use.
    pub fn get<S: ConfigConsumer>(&self) -> Result<S::Config> {
        tracing::trace!("Getting the config for {}", std::any::type_name::<S>());

        let mut table = self.table.lock();

        let item: S::Config = match table.get(S::KEY) {
            Some(v) => v
                .clone()
                .try_into()
                .with_context(|| format!("Failed to deserialize '{}' config", S::KEY))?,
            None => S::Config::default(),
        };

        table.insert(S::KEY.into(), Value::try_from(&item)?);

        Ok(item)
    }

    pub fn serialize_config(&self) -> Result<String> {
        Ok(toml::to_string(&*self.table.lock())?)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct SampleConfig {
        threshold: usize,
        name: String,
    }

    impl Default for SampleConfig {
        fn default() -> Self {
            Self {
                threshold: 1000,
                name: "sample".to_string(),
            }
        }
    }

    struct Sample;

    impl ConfigConsumer for Sample {
        const KEY: &'static str = "sample";
        type Config = SampleConfig;
    }

    #[test]
    fn missing_section_yields_default() {
        let provider = TomlConfigProvider::new();
        assert_eq!(provider.get::<Sample>().unwrap(), SampleConfig::default());
    }

    #[test]
    fn config_survives_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let provider = TomlConfigProvider::new();
        provider
            .inject::<Sample>(SampleConfig {
                threshold: 7,
                name: "custom".to_string(),
            })
            .unwrap();
        provider.write(&path).unwrap();

        let loaded = TomlConfigProvider::load(&path).unwrap();
        let config = loaded.get::<Sample>().unwrap();
        assert_eq!(config.threshold, 7);
        assert_eq!(config.name, "custom");
    }

    #[test]
    fn load_fails_for_missing_file() {
        assert!(TomlConfigProvider::load("/definitely/not/here.toml").is_err());
    }
}
