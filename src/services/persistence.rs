use tokio::task::JoinHandle;
use tracing::info;

use crate::state::{PendingSnapshots, SharedState};

/// Write queued snapshots to the store in the background, latest first.
///
/// Commits only hand their snapshot over; a slow or hung backend delays the
/// saves but never the commands, the ticker or the broadcasts.
pub fn spawn_persister(state: SharedState) -> JoinHandle<()> {
    let PendingSnapshots {
        mut last_match,
        mut settings,
    } = state.pending_snapshots();
    tokio::spawn(async move {
        info!("snapshot persister started");
        loop {
            tokio::select! {
                changed = last_match.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = last_match.borrow_and_update().clone();
                    if let Some(snapshot) = snapshot {
                        let result = state.store().save_last_match(snapshot).await;
                        state.record_save("last match", result);
                    }
                }
                changed = settings.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = settings.borrow_and_update().clone();
                    if let Some(snapshot) = snapshot {
                        let result = state.store().save_settings(snapshot).await;
                        state.record_save("settings", result);
                    }
                }
            }
        }
    })
}

/// Save the current records once, waiting for the store. Used at shutdown
/// after the background persister has been stopped.
pub async fn flush(state: &SharedState) {
    let last_match = state.match_state().lock().await.clone();
    let result = state.store().save_last_match(last_match).await;
    state.record_save("last match", result);

    let settings = state.settings().lock().await.clone();
    let result = state.store().save_settings(settings).await;
    state.record_save("settings", result);
    info!("final snapshot flushed");
}
