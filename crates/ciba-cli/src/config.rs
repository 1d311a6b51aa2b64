use crate::error::{CliError, Result};
use cibascreen::engine::config::{ScreenConfig, ScreenConfigBuilder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name probed in the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "screen.toml";

/// The campaign configuration file.
///
/// Every table and key is optional; omitted values fall back to the
/// campaign defaults, so an empty file (or no file at all) is a valid
/// configuration.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub paths: PathsConfig,
    pub engine: EngineSection,
    pub calculation: CalculationSection,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PathsConfig {
    pub calculations_dir: PathBuf,
    pub structure_store: PathBuf,
    pub result_store: PathBuf,
    pub pyridine_template: PathBuf,
    pub thiophene_template: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            calculations_dir: PathBuf::from("calculations"),
            structure_store: PathBuf::from("data/structures.json"),
            result_store: PathBuf::from("data/calculated-data.json"),
            pyridine_template: PathBuf::from("templates/input-template.com"),
            thiophene_template: PathBuf::from("templates/input-template-thiol.com"),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct EngineSection {
    pub command: String,
    pub memory: String,
    pub nprocshared: u8,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            command: ScreenConfig::DEFAULT_ENGINE_COMMAND.to_string(),
            memory: ScreenConfig::DEFAULT_MEMORY.to_string(),
            nprocshared: ScreenConfig::DEFAULT_SHARED_PROCESSORS,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CalculationSection {
    pub functional: String,
    pub basis_set: String,
    pub dieze_tag: String,
    pub integral_accuracy: u8,
    pub retry_integral_accuracy: u8,
    pub checkpoint_file: String,
}

impl Default for CalculationSection {
    fn default() -> Self {
        Self {
            functional: ScreenConfig::DEFAULT_FUNCTIONAL.to_string(),
            basis_set: ScreenConfig::DEFAULT_BASIS_SET.to_string(),
            dieze_tag: ScreenConfig::DEFAULT_DIEZE_TAG.to_string(),
            integral_accuracy: ScreenConfig::DEFAULT_INTEGRAL_ACCURACY,
            retry_integral_accuracy: ScreenConfig::DEFAULT_RETRY_INTEGRAL_ACCURACY,
            checkpoint_file: ScreenConfig::DEFAULT_CHECKPOINT_FILE.to_string(),
        }
    }
}

impl FileConfig {
    /// Loads the configuration: an explicit `--config` path must exist; with
    /// no path given, `screen.toml` is used when present and the built-in
    /// defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    debug!("no configuration file found, using built-in defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = toml::from_str(&text).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Assembles the immutable core configuration passed into the
    /// workflows.
    pub fn to_screen_config(&self) -> Result<ScreenConfig> {
        let config = ScreenConfigBuilder::new()
            .engine_command(self.engine.command.clone())
            .memory(self.engine.memory.clone())
            .shared_processors(self.engine.nprocshared)
            .functional(self.calculation.functional.clone())
            .basis_set(self.calculation.basis_set.clone())
            .dieze_tag(self.calculation.dieze_tag.clone())
            .integral_accuracy(self.calculation.integral_accuracy)
            .retry_integral_accuracy(self.calculation.retry_integral_accuracy)
            .checkpoint_file(self.calculation.checkpoint_file.clone())
            .calculations_dir(self.paths.calculations_dir.clone())
            .build()?;
        Ok(config)
    }
}
