//! Configuration loading and typed config structures for the Geocoin game.
//!
//! Configuration is YAML. Every field is optional and falls back to the
//! defaults below, so an empty document is a valid configuration:
//!
//! ```yaml
//! grid:
//!   tile_degrees: 0.0001
//!   neighborhood_radius: 8
//! spawn:
//!   probability: 0.1
//!   initial_value_scale: 100
//! player:
//!   start: { lat: 36.98949379578401, lng: -122.06277128548504 }
//! storage:
//!   path: geocoin-state.json
//! ```
//!
//! `GEOCOIN_STATE_PATH` overrides `storage.path` when set.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use geocoin_types::GeoPoint;
use geocoin_world::{
    DEFAULT_INITIAL_VALUE_SCALE, DEFAULT_SPAWN_PROBABILITY, DEFAULT_TILE_DEGREES, Grid,
    SpawnRules,
};
use serde::Deserialize;

/// Environment variable that overrides `storage.path`.
pub const STATE_PATH_ENV: &str = "GEOCOIN_STATE_PATH";

/// Default starting latitude.
pub const DEFAULT_START_LAT: f64 = 36.989_493_795_784_01;

/// Default starting longitude.
pub const DEFAULT_START_LNG: f64 = -122.062_771_285_485_04;

/// Default neighborhood radius in tiles.
pub const DEFAULT_NEIGHBORHOOD_RADIUS: u32 = 8;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds unusable values.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Which value was rejected and why.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    /// Grid geometry and neighborhood size.
    #[serde(default)]
    pub grid: GridConfig,

    /// Cache spawning parameters.
    #[serde(default)]
    pub spawn: SpawnConfig,

    /// Player defaults.
    #[serde(default)]
    pub player: PlayerConfig,

    /// Durable storage location.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl GameConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// `GEOCOIN_STATE_PATH` overrides `storage.path` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.storage.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check every value without building anything.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = self.grid()?;
        self.spawn_rules()?;
        grid.point_to_cell(self.player.start)
            .map_err(|e| invalid(format!("player.start: {e}")))?;
        Ok(())
    }

    /// The grid described by `grid.tile_degrees`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-positive or non-finite
    /// tile size.
    pub fn grid(&self) -> Result<Grid, ConfigError> {
        Grid::new(self.grid.tile_degrees).map_err(|e| invalid(format!("grid.tile_degrees: {e}")))
    }

    /// The spawn rules described by the `spawn` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a probability outside `[0, 1]`
    /// or a zero value scale.
    pub fn spawn_rules(&self) -> Result<SpawnRules, ConfigError> {
        SpawnRules::new(self.spawn.probability, self.spawn.initial_value_scale)
            .map_err(|e| invalid(format!("spawn: {e}")))
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

/// Grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Side of one square tile in degrees.
    #[serde(default = "default_tile_degrees")]
    pub tile_degrees: f64,

    /// Cells within this many tiles of the player cell are materialized.
    #[serde(default = "default_neighborhood_radius")]
    pub neighborhood_radius: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_degrees: default_tile_degrees(),
            neighborhood_radius: default_neighborhood_radius(),
        }
    }
}

/// Cache spawning configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnConfig {
    /// Chance that an untouched cell holds a cache.
    #[serde(default = "default_spawn_probability")]
    pub probability: f64,

    /// Upper bound (exclusive) of a fresh cache's value.
    #[serde(default = "default_initial_value_scale")]
    pub initial_value_scale: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            probability: default_spawn_probability(),
            initial_value_scale: default_initial_value_scale(),
        }
    }
}

/// Player configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    /// Where a new or reset player stands.
    #[serde(default = "default_start")]
    pub start: GeoPoint,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
        }
    }
}

/// Durable storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// File backing the durable store. `None` keeps state in memory only.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Override `path` with `GEOCOIN_STATE_PATH` when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_override(std::env::var_os(STATE_PATH_ENV));
    }

    fn apply_override(&mut self, value: Option<OsString>) {
        if let Some(val) = value.filter(|v| !v.is_empty()) {
            self.path = Some(PathBuf::from(val));
        }
    }
}

// Default value functions for serde.

const fn default_tile_degrees() -> f64 {
    DEFAULT_TILE_DEGREES
}
const fn default_neighborhood_radius() -> u32 {
    DEFAULT_NEIGHBORHOOD_RADIUS
}
const fn default_spawn_probability() -> f64 {
    DEFAULT_SPAWN_PROBABILITY
}
const fn default_initial_value_scale() -> u32 {
    DEFAULT_INITIAL_VALUE_SCALE
}
const fn default_start() -> GeoPoint {
    GeoPoint::new(DEFAULT_START_LAT, DEFAULT_START_LNG)
}
