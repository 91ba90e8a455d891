//! Tuning constants for a simulation run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GridDimensions;

/// Tunable parameters controlling grid size, timing, and the fault wave.
///
/// Every field falls back to its default when omitted from a configuration
/// file, so partial TOML documents are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Number of agents generated when the world is created.
    pub agent_count: u32,
    /// Seconds between multi-agent steps.
    pub tick_interval_secs: f64,
    /// Seconds between fault wave expansions.
    pub wave_step_secs: f64,
    /// Largest radius the fault wave floods before settling.
    pub wave_max_radius: u32,
    /// Seconds a wave ring stays visible after being spawned.
    pub ring_lifetime_secs: f64,
    /// World-space edge length of a single cell.
    pub cell_size: f32,
    /// Restricts the fault wave to cells inside the grid.
    pub clip_wave_to_grid: bool,
    /// Attempts made to find a free random cell before falling back to the origin.
    pub free_cell_attempts: u32,
    /// Seed used for agent placement and goal reassignment.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            columns: 12,
            rows: 10,
            agent_count: 8,
            tick_interval_secs: 0.45,
            wave_step_secs: 0.08,
            wave_max_radius: 40,
            ring_lifetime_secs: 0.55,
            cell_size: 1.0,
            clip_wave_to_grid: false,
            free_cell_attempts: 300,
            seed: 0x6b69_6e65_7469_63,
        }
    }
}

impl SimulationConfig {
    /// Grid dimensions described by the configuration.
    #[must_use]
    pub const fn grid(&self) -> GridDimensions {
        GridDimensions::new(self.columns, self.rows)
    }

    /// Interval between multi-agent steps.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        seconds(self.tick_interval_secs)
    }

    /// Interval between fault wave expansions.
    #[must_use]
    pub fn wave_step(&self) -> Duration {
        seconds(self.wave_step_secs)
    }

    /// Visibility window of a wave ring.
    #[must_use]
    pub fn ring_lifetime(&self) -> Duration {
        seconds(self.ring_lifetime_secs)
    }

    /// Checks that the configuration describes a runnable simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::EmptyGrid {
                columns: self.columns,
                rows: self.rows,
            });
        }

        let cells = self.grid().cell_count();
        if usize::try_from(self.agent_count).map_or(true, |count| count > cells) {
            return Err(ConfigError::TooManyAgents {
                agents: self.agent_count,
                cells,
            });
        }

        for (name, value) in [
            ("tick_interval_secs", self.tick_interval_secs),
            ("wave_step_secs", self.wave_step_secs),
            ("ring_lifetime_secs", self.ring_lifetime_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveInterval { name, value });
            }
        }

        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }

        if self.free_cell_attempts == 0 {
            return Err(ConfigError::NoPlacementAttempts);
        }

        Ok(())
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Reasons a [`SimulationConfig`] can be rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The grid has no cells.
    #[error("grid must contain at least one cell (got {columns}x{rows})")]
    EmptyGrid {
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// More agents were requested than the grid can hold.
    #[error("{agents} agents do not fit on a grid of {cells} cells")]
    TooManyAgents {
        /// Configured agent count.
        agents: u32,
        /// Number of cells on the grid.
        cells: usize,
    },
    /// A timing parameter was zero, negative, or not finite.
    #[error("{name} must be a positive number of seconds (got {value})")]
    NonPositiveInterval {
        /// Name of the offending field.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The cell size was zero, negative, or not finite.
    #[error("cell_size must be positive (got {0})")]
    InvalidCellSize(f32),
    /// Random placement was given no attempts, so every agent would land on the origin.
    #[error("free_cell_attempts must be at least 1")]
    NoPlacementAttempts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tuning() {
        let config = SimulationConfig::default();
        assert_eq!(config.grid(), GridDimensions::new(12, 10));
        assert_eq!(config.agent_count, 8);
        assert_eq!(config.tick_interval(), Duration::from_millis(450));
        assert_eq!(config.wave_step(), Duration::from_millis(80));
        assert_eq!(config.ring_lifetime(), Duration::from_millis(550));
        assert_eq!(config.wave_max_radius, 40);
        assert!(!config.clip_wave_to_grid);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: SimulationConfig =
            toml::from_str("agent_count = 3\nclip_wave_to_grid = true\n").expect("parse");
        assert_eq!(config.agent_count, 3);
        assert!(config.clip_wave_to_grid);
        assert_eq!(config.columns, 12);
        assert_eq!(config.tick_interval_secs, 0.45);
    }

    #[test]
    fn crowded_grid_is_rejected() {
        let config = SimulationConfig {
            columns: 2,
            rows: 2,
            agent_count: 5,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyAgents {
                agents: 5,
                cells: 4
            })
        );
    }

    #[test]
    fn empty_grid_is_rejected() {
        let config = SimulationConfig {
            rows: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyGrid { rows: 0, .. })
        ));
    }

    #[test]
    fn non_finite_interval_is_rejected() {
        let config = SimulationConfig {
            wave_step_secs: f64::NAN,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveInterval {
                name: "wave_step_secs",
                ..
            })
        ));
    }

    #[test]
    fn zero_placement_attempts_are_rejected() {
        let config = SimulationConfig {
            free_cell_attempts: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPlacementAttempts));
    }

    #[test]
    fn config_round_trips_through_bincode() {
        let config = SimulationConfig {
            seed: 42,
            ..SimulationConfig::default()
        };
        let bytes = bincode::serialize(&config).expect("serialize");
        let restored: SimulationConfig = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, config);
    }
}
