//! Configuration loading for the command-line adapter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use kinetic_grid_core::SimulationConfig;

/// Configuration file picked up from the working directory when no path is given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "kinetic-grid.toml";

/// Values supplied on the command line that take precedence over the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub(crate) seed: Option<u64>,
    pub(crate) agents: Option<u32>,
    pub(crate) columns: Option<u32>,
    pub(crate) rows: Option<u32>,
}

impl Overrides {
    fn apply(self, config: &mut SimulationConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(agents) = self.agents {
            config.agent_count = agents;
        }
        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
    }
}

/// Resolves the configuration for a run.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is read
/// if present and the built-in defaults are used otherwise.
pub(crate) fn load(path: Option<&Path>, overrides: Overrides) -> Result<SimulationConfig> {
    let source = match path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|path| path.is_file()),
    };

    let mut config = match source {
        Some(path) => {
            let config = read(&path)?;
            tracing::info!(path = %path.display(), "loaded configuration file");
            config
        }
        None => SimulationConfig::default(),
    };

    overrides.apply(&mut config);
    config.validate().context("invalid simulation configuration")?;
    Ok(config)
}

fn read(path: &Path) -> Result<SimulationConfig> {
    let payload = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration from {}", path.display()))?;
    parse(&payload).with_context(|| format!("invalid configuration TOML in {}", path.display()))
}

fn parse(payload: &str) -> Result<SimulationConfig> {
    Ok(toml::from_str(payload)?)
}
