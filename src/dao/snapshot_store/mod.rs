#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod file;
pub mod memory;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{
    dao::storage::StorageResult,
    state::match_state::{MatchState, Settings},
};

/// Abstraction over the persistence layer for the last match and the settings.
///
/// Loads hand back untyped records so callers can reconcile snapshots written
/// by older builds field by field.
pub trait SnapshotStore: Send + Sync {
    /// Last saved match, if any.
    fn load_last_match(&self) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    /// Replace the saved match.
    fn save_last_match(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>>;
    /// Saved settings record, if any.
    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    /// Replace the saved settings.
    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>>;
}
