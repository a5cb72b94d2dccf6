//! Pipeline Configuration
//!
//! JSON file declaring the build environment, the asset root and the assets
//! with their filters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::asset::{Asset, FilterSpec};
use crate::filesystem::{Filesystem, FilesystemError};
use crate::filter::FilterError;
use crate::group::AssetGroup;
use crate::paths;
use crate::registry::{FilterFactory, FilterRegistry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Asset {asset}: {source}")]
    Asset {
        asset: String,
        #[source]
        source: FilesystemError,
    },

    #[error("Filter {filter} on {asset}: {source}")]
    Filter {
        asset: String,
        filter: String,
        #[source]
        source: FilterError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Directory local asset paths are resolved against.
    #[serde(default)]
    pub root: PathBuf,
    /// Short filter names mapped to registered engine names.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

fn default_environment() -> String {
    "production".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetConfig {
    pub path: String,
    #[serde(default)]
    pub group: Option<AssetGroup>,
    #[serde(default)]
    pub order: Option<NonZeroU32>,
    #[serde(default)]
    pub exclude: bool,
    #[serde(default)]
    pub raw: bool,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub when_asset_is: Option<String>,
    #[serde(default)]
    pub when_environment_is: Vec<String>,
    #[serde(default)]
    pub when_asset_is_javascript: bool,
    #[serde(default)]
    pub when_asset_is_stylesheet: bool,
    #[serde(default)]
    pub when_production_build: bool,
    #[serde(default)]
    pub when_development_build: bool,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Built-in registry extended with the configured aliases.
    pub fn registry(&self) -> FilterRegistry {
        let mut registry = FilterRegistry::with_defaults();
        for (alias, target) in &self.aliases {
            registry.alias(alias.clone(), target.clone());
        }
        registry
    }

    /// Absolute location of a configured asset path.
    pub fn absolute_path(&self, path: &str) -> String {
        if paths::is_remote(path) || self.root.as_os_str().is_empty() {
            path.to_string()
        } else {
            self.root.join(path).to_string_lossy().into_owned()
        }
    }

    /// Build every configured asset with its filters applied, in file order.
    pub fn assets(
        &self,
        files: Arc<dyn Filesystem>,
        factory: Arc<dyn FilterFactory>,
    ) -> Result<Vec<Asset>, ConfigError> {
        self.assets
            .iter()
            .map(|entry| self.asset(entry, Arc::clone(&files), Arc::clone(&factory)))
            .collect()
    }

    fn asset(
        &self,
        entry: &AssetConfig,
        files: Arc<dyn Filesystem>,
        factory: Arc<dyn FilterFactory>,
    ) -> Result<Asset, ConfigError> {
        let mut asset = Asset::new(
            files,
            factory,
            self.environment.clone(),
            self.absolute_path(&entry.path),
            entry.path.clone(),
        )
        .map_err(|source| ConfigError::Asset {
            asset: entry.path.clone(),
            source,
        })?;

        asset.set_group(entry.group);
        if let Some(order) = entry.order {
            asset.set_order(order);
        }
        if entry.exclude {
            asset.exclude();
        }
        if entry.raw {
            asset.raw();
        }

        for filter in &entry.filters {
            apply_filter(&mut asset, filter).map_err(|source| ConfigError::Filter {
                asset: entry.path.clone(),
                filter: filter.name.clone(),
                source,
            })?;
        }

        Ok(asset)
    }
}

fn apply_filter(asset: &mut Asset, config: &FilterConfig) -> Result<(), FilterError> {
    let filter = asset.apply(FilterSpec::named(
        config.name.clone(),
        config.arguments.clone(),
    ));

    if let Some(pattern) = &config.when_asset_is {
        filter.when_asset_is(pattern)?;
    }
    if !config.when_environment_is.is_empty() {
        filter.when_environment_is(config.when_environment_is.iter().cloned());
    }
    if config.when_asset_is_javascript {
        filter.when_asset_is_javascript();
    }
    if config.when_asset_is_stylesheet {
        filter.when_asset_is_stylesheet();
    }
    if config.when_production_build {
        filter.when_production_build();
    }
    if config.when_development_build {
        filter.when_development_build();
    }
    Ok(())
}
