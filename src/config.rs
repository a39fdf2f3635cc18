use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::session::{
    HexColor, PowerUps, SessionConfig, DEFAULT_BOARD_SIZE, DEFAULT_INITIAL_TIME,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub board_size: usize,
    pub initial_time: i64,
    pub palette: Vec<HexColor>,
    pub power_ups: PowerUps,
    pub track_best_time: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            initial_time: DEFAULT_INITIAL_TIME,
            palette: HexColor::ALL.to_vec(),
            power_ups: PowerUps::default(),
            track_best_time: false,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            board_size: cfg.board_size,
            initial_time: cfg.initial_time,
            palette: cfg.palette.clone(),
            initial_power_ups: cfg.power_ups,
            track_best_time: cfg.track_best_time,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("hexa_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(error = %e, path = %self.path.display(), "ignoring malformed config"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
