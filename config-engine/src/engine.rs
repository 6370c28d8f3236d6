use crate::{
    error::{ConfigError, Result},
    validation::Validate,
};
use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Builder for a layered configuration source
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a YAML (`.yaml`/`.yml`) or TOML (`.toml`) file over the defaults
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Merge environment variables starting with `prefix` over the file
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    fn figment<T: Serialize + Default>(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(T::default()));

        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::SourceNotFound(path.display().to_string()));
            }
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            figment = match extension.as_str() {
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                "toml" => figment.merge(Toml::file(path)),
                other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
            };
            debug!(path = %path.display(), "Merged configuration file");
        }

        if let Some(prefix) = &self.env_prefix {
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        Ok(figment)
    }

    /// Extract and validate the configuration
    pub fn load<T>(&self) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default + Validate,
    {
        let config: T = self.figment::<T>()?.extract()?;
        config.validate()?;
        info!(
            file = ?self.file.as_ref().map(|p| p.display().to_string()),
            env_prefix = ?self.env_prefix,
            "Configuration loaded"
        );
        Ok(config)
    }
}
