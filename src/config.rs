//! Application-level configuration loading: clock periods, lock liveness and
//! snapshot locations.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOREBOARD_BACK_CONFIG_PATH";
/// Environment variable pointing at the last-match snapshot file.
const DATA_PATH_ENV: &str = "DATA_PATH";
/// Environment variable pointing at the settings file.
const SETTINGS_PATH_ENV: &str = "SETTINGS_PATH";

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1_000);
const DEFAULT_LOCK_SWEEP_INTERVAL: Duration = Duration::from_millis(2_000);
const DEFAULT_LOCK_STALE_AFTER: Duration = Duration::from_millis(6_000);
const DEFAULT_DATA_DIR: &str = "data";
const LAST_MATCH_FILE: &str = "last-match.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    tick_interval: Duration,
    lock_sweep_interval: Duration,
    lock_stale_after: Duration,
    storage: StorageConfig,
}

/// Where the file snapshot store keeps its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    last_match_path: PathBuf,
    settings_path: PathBuf,
}

impl StorageConfig {
    /// Both files inside `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            last_match_path: data_dir.join(LAST_MATCH_FILE),
            settings_path: data_dir.join(SETTINGS_FILE),
        }
    }

    /// Apply the `DATA_PATH` / `SETTINGS_PATH` overrides.
    ///
    /// When only `DATA_PATH` is given, the settings file lives next to it.
    fn with_env_overrides(mut self) -> Self {
        if let Some(path) = env_path(DATA_PATH_ENV) {
            if let Some(parent) = path.parent() {
                self.settings_path = parent.join(SETTINGS_FILE);
            }
            self.last_match_path = path;
        }
        if let Some(path) = env_path(SETTINGS_PATH_ENV) {
            self.settings_path = path;
        }
        self
    }

    /// Snapshot file of the last match.
    pub fn last_match_path(&self) -> PathBuf {
        self.last_match_path.clone()
    }

    /// Settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.settings_path.clone()
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        tick_ms = app_config.tick_interval.as_millis() as u64,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        Self {
            storage: config.storage.with_env_overrides(),
            ..config
        }
    }

    /// Period of the countdown ticker.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Period of the controller-lock liveness sweep.
    pub fn lock_sweep_interval(&self) -> Duration {
        self.lock_sweep_interval
    }

    /// Heartbeat age after which the controller lock is reclaimed.
    pub fn lock_stale_after(&self) -> Duration {
        self.lock_stale_after
    }

    /// Snapshot file locations.
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Same configuration with another storage location.
    pub fn with_storage(self, storage: StorageConfig) -> Self {
        Self { storage, ..self }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            lock_sweep_interval: DEFAULT_LOCK_SWEEP_INTERVAL,
            lock_stale_after: DEFAULT_LOCK_STALE_AFTER,
            storage: StorageConfig::in_dir(DEFAULT_DATA_DIR),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    tick_interval_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    lock_sweep_interval_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    lock_stale_after_ms: Duration,
    data_dir: PathBuf,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL,
            lock_sweep_interval_ms: DEFAULT_LOCK_SWEEP_INTERVAL,
            lock_stale_after_ms: DEFAULT_LOCK_STALE_AFTER,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let nonzero = |period: Duration, fallback: Duration| {
            if period.is_zero() { fallback } else { period }
        };
        Self {
            tick_interval: nonzero(value.tick_interval_ms, DEFAULT_TICK_INTERVAL),
            lock_sweep_interval: nonzero(value.lock_sweep_interval_ms, DEFAULT_LOCK_SWEEP_INTERVAL),
            lock_stale_after: value.lock_stale_after_ms,
            storage: StorageConfig::in_dir(value.data_dir),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env_path(CONFIG_PATH_ENV).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}
