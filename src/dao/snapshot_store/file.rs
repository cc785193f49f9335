//! JSON-file snapshot store, one pretty-printed document per record.

use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tokio::fs;

use crate::{
    config::StorageConfig,
    dao::{
        snapshot_store::SnapshotStore,
        storage::{StorageError, StorageResult},
    },
    state::match_state::{MatchState, Settings},
};

/// Stores the last match and the settings as JSON documents on disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    last_match_path: Arc<PathBuf>,
    settings_path: Arc<PathBuf>,
}

impl FileSnapshotStore {
    /// Store writing to the two given files.
    pub fn new(last_match_path: impl Into<PathBuf>, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            last_match_path: Arc::new(last_match_path.into()),
            settings_path: Arc::new(settings_path.into()),
        }
    }

    /// Store using the paths resolved by the application configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.last_match_path(), config.settings_path())
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load_last_match(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let path = self.last_match_path.clone();
        Box::pin(async move { read_json(&path).await })
    }

    fn save_last_match(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.last_match_path.clone();
        Box::pin(async move { write_json(&path, &state).await })
    }

    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let path = self.settings_path.clone();
        Box::pin(async move { read_json(&path).await })
    }

    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.settings_path.clone();
        Box::pin(async move { write_json(&path, &settings).await })
    }
}

async fn read_json(path: &PathBuf) -> StorageResult<Option<Value>> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(StorageError::unavailable(
                format!("failed to read `{}`", path.display()),
                err,
            ));
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|err| StorageError::malformed(format!("invalid JSON in `{}`", path.display()), err))
}

/// Write through a sibling temp file and rename so a crash never leaves a
/// half-written snapshot behind.
async fn write_json<T>(path: &PathBuf, value: &T) -> StorageResult<()>
where
    T: ?Sized + Serialize,
{
    let payload = serde_json::to_vec_pretty(value).map_err(|err| {
        StorageError::malformed(format!("failed to encode `{}`", path.display()), err)
    })?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|err| {
            StorageError::unavailable(format!("failed to create `{}`", parent.display()), err)
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).await.map_err(|err| {
        StorageError::unavailable(format!("failed to write `{}`", tmp.display()), err)
    })?;
    fs::rename(&tmp, path).await.map_err(|err| {
        StorageError::unavailable(format!("failed to replace `{}`", path.display()), err)
    })
}
