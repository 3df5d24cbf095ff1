//! Robot configuration file
//!
//! One JSON document holding the connection settings and every behavior's
//! tunables. Missing fields take their defaults, so a file only needs the
//! values it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::behavior::{
    BumpLightsConfig, BumpRetreatConfig, CardSearchConfig, SquareLapConfig, WallFollowConfig,
};
use crate::protocol::ConnectionConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub connection: ConnectionConfig,
    pub bump_lights: BumpLightsConfig,
    pub bump_retreat: BumpRetreatConfig,
    pub square_lap: SquareLapConfig,
    pub wall_follow: WallFollowConfig,
    pub card_search: CardSearchConfig,
}

impl RobotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{BaudRate, Mode, SensorPacket};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_hardware_programs() {
        let config = RobotConfig::default();
        assert_eq!(config.connection.port_name, "/dev/ttyUSB0");
        assert_eq!(config.connection.baud, BaudRate::B115200);
        assert_eq!(config.connection.mode, Mode::Full);
        assert_eq!(config.wall_follow.wall_sensor, SensorPacket::LightBumpRightSignal);
        assert_eq!(config.card_search.rotate_ms, 1585);
        assert_eq!(config.square_lap.sides, 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("robot.json");

        let mut config = RobotConfig::default();
        config.connection.port_name = "/dev/ttyACM0".to_string();
        config.wall_follow.wall_sensor = SensorPacket::WallSignal;
        config.wall_follow.integral_limit = Some(2000.0);
        config.save(&path).unwrap();

        let loaded = RobotConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("robot.json");
        fs::write(&path, r#"{ "connection": { "baud": "B57600" }, "card_search": { "passes": 2 } }"#)
            .unwrap();

        let loaded = RobotConfig::load(&path).unwrap();
        assert_eq!(loaded.connection.baud, BaudRate::B57600);
        assert_eq!(loaded.connection.port_name, "/dev/ttyUSB0");
        assert_eq!(loaded.card_search.passes, 2);
        assert_eq!(loaded.card_search.card_threshold, 150);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            RobotConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(RobotConfig::load(&bad), Err(ConfigError::Parse { .. })));
    }
}
