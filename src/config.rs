use crate::tables::Variant;
use crate::utils::check_num;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of residents of the household.
    pub residents: usize,
    /// Use the four-state (home/active) chain instead of the seven-state one.
    #[serde(default = "default_four_states")]
    pub four_states: bool,

    /// Tables file, relative to the simulation directory.
    pub tables: PathBuf,

    /// Day of the week of the first simulated day (`0` is Monday).
    #[serde(default)]
    pub start_day: usize,
    /// Number of days simulated per trajectory file.
    pub days_per_file: usize,

    /// Seed of the engine's random stream (drawn from the OS if absent).
    pub seed: Option<u64>,
}

fn default_four_states() -> bool {
    true
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn variant(&self) -> Variant {
        Variant::from_four_states(self.four_states)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.residents, 1..=6).context("invalid number of residents")?;
        check_num(self.start_day, 0..7).context("invalid start day")?;
        check_num(self.days_per_file, 1..=10_000).context("invalid number of days per file")?;
        Ok(())
    }
}
