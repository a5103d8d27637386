use crate::{
    community::DEFAULT_TOP_ATTRIBUTES, correlate::CorrelationParams, error::CorrNetError,
    filter::FilterParams,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Global static variable to hold the config provider.
pub static CONFIG_PROVIDER: OnceCell<Mutex<Arc<dyn PipelineConfigProvider>>> = OnceCell::new();

/// Session defaults for the analysis pipeline, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    /// Correlation scan parameters applied to newly uploaded raw tables.
    pub correlation: CorrelationParams,
    /// Attrib name assigned to links when an upload does not name one.
    pub link_attrib: String,
    /// Community detection resolution (0 = connected components).
    pub resolution: f64,
    /// Ranked attribute values reported per community.
    pub top_attributes: usize,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        PipelineDefaults {
            correlation: CorrelationParams::default(),
            link_attrib: "dataset".to_string(),
            resolution: 0.0,
            top_attributes: DEFAULT_TOP_ATTRIBUTES,
        }
    }
}

pub trait PipelineConfigProvider: Send + Sync {
    fn get_defaults(&self) -> Result<PipelineDefaults, CorrNetError>;
    fn set_defaults(&self, defaults: PipelineDefaults) -> Result<(), CorrNetError>;
    fn get_filters(&self) -> Result<FilterParams, CorrNetError>;
    fn set_filters(&self, filters: FilterParams) -> Result<(), CorrNetError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    defaults: Option<PipelineDefaults>,
    filters: Option<FilterParams>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    fn read(&self) -> Result<ConfigFile, CorrNetError> {
        tracing::debug!("Attempting to read pipeline config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, starting from defaults.");
            return Ok(ConfigFile::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn write(&self, config: &ConfigFile) -> Result<(), CorrNetError> {
        tracing::debug!("Attempting to write pipeline config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

impl PipelineConfigProvider for TomlConfigProvider {
    fn get_defaults(&self) -> Result<PipelineDefaults, CorrNetError> {
        Ok(self.read()?.defaults.unwrap_or_default())
    }

    fn set_defaults(&self, defaults: PipelineDefaults) -> Result<(), CorrNetError> {
        let mut config = self.read()?;
        config.defaults = Some(defaults);
        self.write(&config)
    }

    fn get_filters(&self) -> Result<FilterParams, CorrNetError> {
        Ok(self.read()?.filters.unwrap_or_default())
    }

    fn set_filters(&self, filters: FilterParams) -> Result<(), CorrNetError> {
        let mut config = self.read()?;
        config.filters = Some(filters);
        self.write(&config)
    }
}

pub fn get_content<P: AsRef<Path>>(path: P) -> Result<String, CorrNetError> {
    tracing::debug!("Reading {:?}", path.as_ref());
    Ok(read_to_string(path)?)
}
