//! Runner configuration.
use std::{fs, path::Path};

use serde::Deserialize;
use sprite8::{prelude::Chip8Conf, KeyCode};

use crate::{clock::Hz, error::AppError};

/// Settings for a headless run, loaded from YAML.
///
/// ```yaml
/// machine:
///   policy: compatible
///   rng_seed: 1234
/// clock_frequency: 500
/// steps: 2000
/// held_keys: [5]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConf {
    pub machine: Chip8Conf,
    /// Ticks per second.
    pub clock_frequency: Hz,
    /// Number of ticks to execute before printing the display.
    pub steps: usize,
    /// Keys held down for the whole run.
    pub held_keys: Vec<u8>,
}

impl Default for RunConf {
    fn default() -> Self {
        Self {
            machine: Chip8Conf::default(),
            clock_frequency: Hz(500),
            steps: 1000,
            held_keys: Vec::new(),
        }
    }
}

impl RunConf {
    pub fn from_file(filepath: impl AsRef<Path>) -> Result<Self, AppError> {
        let source = fs::read_to_string(filepath.as_ref())?;
        let conf = Self::parse(&source)?;
        log::debug!("loaded run configuration: {:#?}", conf);
        Ok(conf)
    }

    pub fn parse(source: &str) -> Result<Self, AppError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Validated keycodes of the held keys.
    pub fn keys(&self) -> Result<Vec<KeyCode>, AppError> {
        self.held_keys
            .iter()
            .map(|key_id| KeyCode::try_from(*key_id).map_err(AppError::from))
            .collect()
    }
}
