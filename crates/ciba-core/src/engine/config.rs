use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Calculation settings shared by every job of a campaign.
///
/// The configuration is immutable and passed explicitly into the workflows
/// and the job driver; nothing in the library reads process-global state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    /// Engine executable invoked per stage, e.g. `g09`.
    pub engine_command: String,
    pub functional: String,
    pub basis_set: String,
    pub dieze_tag: String,
    /// Link0 `%mem` value, e.g. `58GB`.
    pub memory: String,
    /// Link0 `%nprocshared` value.
    pub shared_processors: u8,
    /// Two-electron integral accuracy (`integral=(acc2e=N)`).
    pub integral_accuracy: u8,
    /// Tightened accuracy applied when a relaxation is re-run after an
    /// abnormal or malformed prior attempt.
    pub retry_integral_accuracy: u8,
    /// Transient checkpoint file name; deleted before archiving.
    pub checkpoint_file: String,
    /// Directory holding per-job working directories and archives.
    pub calculations_dir: PathBuf,
    /// Rings probed by the shielding stages, as site-index lists into the
    /// relaxed geometry. Probes are appended in ring order, one above and
    /// one below each ring plane.
    pub rings: Vec<Vec<usize>>,
}

impl ScreenConfig {
    pub const DEFAULT_ENGINE_COMMAND: &'static str = "g09";
    pub const DEFAULT_FUNCTIONAL: &'static str = "b3lyp";
    pub const DEFAULT_BASIS_SET: &'static str = "6-311++G(d,p)";
    pub const DEFAULT_DIEZE_TAG: &'static str = "#p";
    pub const DEFAULT_MEMORY: &'static str = "58GB";
    pub const DEFAULT_SHARED_PROCESSORS: u8 = 24;
    pub const DEFAULT_INTEGRAL_ACCURACY: u8 = 12;
    pub const DEFAULT_RETRY_INTEGRAL_ACCURACY: u8 = 14;
    pub const DEFAULT_CHECKPOINT_FILE: &'static str = "chkpt.chk";

    /// The ring systems of the unsubstituted chromophore scaffold, in the
    /// fixed order the extractor relies on: the two six-membered rings,
    /// then the two five-membered rings.
    pub fn default_rings() -> Vec<Vec<usize>> {
        vec![
            vec![0, 1, 2, 3, 4, 5],
            vec![1, 2, 6, 7, 8, 9],
            vec![0, 1, 9, 13, 12],
            vec![2, 3, 10, 11, 6],
        ]
    }
}

#[derive(Debug, Default)]
pub struct ScreenConfigBuilder {
    engine_command: Option<String>,
    functional: Option<String>,
    basis_set: Option<String>,
    dieze_tag: Option<String>,
    memory: Option<String>,
    shared_processors: Option<u8>,
    integral_accuracy: Option<u8>,
    retry_integral_accuracy: Option<u8>,
    checkpoint_file: Option<String>,
    calculations_dir: Option<PathBuf>,
    rings: Option<Vec<Vec<usize>>>,
}

impl ScreenConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine_command(mut self, command: impl Into<String>) -> Self {
        self.engine_command = Some(command.into());
        self
    }
    pub fn functional(mut self, functional: impl Into<String>) -> Self {
        self.functional = Some(functional.into());
        self
    }
    pub fn basis_set(mut self, basis_set: impl Into<String>) -> Self {
        self.basis_set = Some(basis_set.into());
        self
    }
    pub fn dieze_tag(mut self, dieze_tag: impl Into<String>) -> Self {
        self.dieze_tag = Some(dieze_tag.into());
        self
    }
    pub fn memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }
    pub fn shared_processors(mut self, n: u8) -> Self {
        self.shared_processors = Some(n);
        self
    }
    pub fn integral_accuracy(mut self, accuracy: u8) -> Self {
        self.integral_accuracy = Some(accuracy);
        self
    }
    pub fn retry_integral_accuracy(mut self, accuracy: u8) -> Self {
        self.retry_integral_accuracy = Some(accuracy);
        self
    }
    pub fn checkpoint_file(mut self, name: impl Into<String>) -> Self {
        self.checkpoint_file = Some(name.into());
        self
    }
    pub fn calculations_dir(mut self, dir: PathBuf) -> Self {
        self.calculations_dir = Some(dir);
        self
    }
    pub fn rings(mut self, rings: Vec<Vec<usize>>) -> Self {
        self.rings = Some(rings);
        self
    }

    /// Builds the configuration. Only the calculations directory has no
    /// default; every calculation setting falls back to the campaign's
    /// published values.
    pub fn build(self) -> Result<ScreenConfig, ConfigError> {
        Ok(ScreenConfig {
            engine_command: self
                .engine_command
                .unwrap_or_else(|| ScreenConfig::DEFAULT_ENGINE_COMMAND.to_string()),
            functional: self
                .functional
                .unwrap_or_else(|| ScreenConfig::DEFAULT_FUNCTIONAL.to_string()),
            basis_set: self
                .basis_set
                .unwrap_or_else(|| ScreenConfig::DEFAULT_BASIS_SET.to_string()),
            dieze_tag: self
                .dieze_tag
                .unwrap_or_else(|| ScreenConfig::DEFAULT_DIEZE_TAG.to_string()),
            memory: self
                .memory
                .unwrap_or_else(|| ScreenConfig::DEFAULT_MEMORY.to_string()),
            shared_processors: self
                .shared_processors
                .unwrap_or(ScreenConfig::DEFAULT_SHARED_PROCESSORS),
            integral_accuracy: self
                .integral_accuracy
                .unwrap_or(ScreenConfig::DEFAULT_INTEGRAL_ACCURACY),
            retry_integral_accuracy: self
                .retry_integral_accuracy
                .unwrap_or(ScreenConfig::DEFAULT_RETRY_INTEGRAL_ACCURACY),
            checkpoint_file: self
                .checkpoint_file
                .unwrap_or_else(|| ScreenConfig::DEFAULT_CHECKPOINT_FILE.to_string()),
            calculations_dir: self
                .calculations_dir
                .ok_or(ConfigError::MissingParameter("calculations_dir"))?,
            rings: self.rings.unwrap_or_else(ScreenConfig::default_rings),
        })
    }
}
