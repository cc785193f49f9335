pub mod clock;
pub mod commands;
pub mod controller_lock;
pub mod countdown;
pub mod events;
pub mod match_state;
pub mod reconcile;
pub mod session;
pub mod termination;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{snapshot_store::SnapshotStore, storage::StorageResult},
    dto::ws::ServerMessage,
    state::{
        clock::Clock,
        controller_lock::ControllerLock,
        events::EventHub,
        match_state::{MatchState, Settings},
        reconcile::{reconcile, reconcile_settings},
        session::{Session, SessionId},
    },
};

pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a single connected session.
pub struct SessionHandle {
    pub session: Session,
    pub tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Receivers for the latest snapshot of each record awaiting a save.
pub struct PendingSnapshots {
    /// Latest match record handed over by a commit.
    pub last_match: watch::Receiver<Option<MatchState>>,
    /// Latest settings record handed over by a commit.
    pub settings: watch::Receiver<Option<Settings>>,
}

/// Central application state: the match record, the controller lock and the
/// connected sessions.
///
/// Lock order is `controller` before `match_state` before `settings`.
pub struct AppState {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SnapshotStore>,
    match_state: Mutex<MatchState>,
    settings: Mutex<Settings>,
    controller: Mutex<ControllerLock>,
    sessions: DashMap<SessionId, SessionHandle>,
    events: EventHub,
    degraded: watch::Sender<bool>,
    pending_match: watch::Sender<Option<MatchState>>,
    pending_settings: watch::Sender<Option<Settings>>,
    pending: PendingSnapshots,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn SnapshotStore>,
        match_state: MatchState,
        settings: Settings,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        let (pending_match, last_match_rx) = watch::channel(None);
        let (pending_settings, settings_rx) = watch::channel(None);
        let stale_after_ms = config.lock_stale_after().as_millis() as u64;
        Arc::new(Self {
            config,
            clock,
            store,
            match_state: Mutex::new(match_state),
            settings: Mutex::new(settings),
            controller: Mutex::new(ControllerLock::new(stale_after_ms)),
            sessions: DashMap::new(),
            events: EventHub::default(),
            degraded: degraded_tx,
            pending_match,
            pending_settings,
            pending: PendingSnapshots {
                last_match: last_match_rx,
                settings: settings_rx,
            },
        })
    }

    /// Load and reconcile the persisted records, falling back to defaults when
    /// they are missing or unreadable.
    pub async fn bootstrap(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn SnapshotStore>,
    ) -> SharedState {
        let settings = match store.load_settings().await {
            Ok(Some(raw)) => reconcile_settings(&raw),
            Ok(None) => {
                info!("no saved settings; using defaults");
                Settings::default()
            }
            Err(err) => {
                warn!(error = %err, "failed to load settings; using defaults");
                Settings::default()
            }
        };

        let defaults = MatchState::new(&settings);
        let match_state = match store.load_last_match().await {
            Ok(Some(raw)) => {
                let state = reconcile(&raw, &defaults);
                info!(
                    match_id = %state.match_id,
                    remaining_ms = state.timer.remaining_ms,
                    over = state.ended.over,
                    "restored last match"
                );
                state
            }
            Ok(None) => {
                info!(match_id = %defaults.match_id, "no saved match; starting fresh");
                defaults
            }
            Err(err) => {
                warn!(error = %err, "failed to load last match; starting fresh");
                defaults
            }
        };

        Self::new(config, clock, store, match_state, settings)
    }

    /// Backend the persister writes to.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current instant according to the injected clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// The single authoritative match record.
    pub fn match_state(&self) -> &Mutex<MatchState> {
        &self.match_state
    }

    /// Long-lived settings.
    pub fn settings(&self) -> &Mutex<Settings> {
        &self.settings
    }

    /// Controller lock; always taken before [`Self::match_state`].
    pub fn controller(&self) -> &Mutex<ControllerLock> {
        &self.controller
    }

    /// Registry of connected sessions keyed by their identifier.
    pub fn sessions(&self) -> &DashMap<SessionId, SessionHandle> {
        &self.sessions
    }

    /// Login status of a session, `None` once it disconnected.
    pub fn session(&self, session_id: SessionId) -> Option<Session> {
        self.sessions.get(&session_id).map(|handle| handle.session)
    }

    /// Broadcast hub shared by every session and the public SSE stream.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Push a message to a single session, ignoring closed connections.
    pub fn send_to(&self, session_id: SessionId, message: ServerMessage) {
        let Some(handle) = self.sessions.get(&session_id) else {
            return;
        };
        let tx = handle.tx.clone();
        drop(handle);
        let _ = tx.send(message);
    }

    /// True when the last snapshot save failed.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Hand the match record to the persister. Never waits on the store;
    /// a snapshot not yet written is replaced by the newer one.
    pub fn queue_match_save(&self, state: &MatchState) {
        self.pending_match.send_replace(Some(state.clone()));
    }

    /// Hand the settings record to the persister.
    pub fn queue_settings_save(&self, settings: &Settings) {
        self.pending_settings.send_replace(Some(settings.clone()));
    }

    /// Receivers observing every queued snapshot since startup.
    pub fn pending_snapshots(&self) -> PendingSnapshots {
        PendingSnapshots {
            last_match: self.pending.last_match.clone(),
            settings: self.pending.settings.clone(),
        }
    }

    /// Record the outcome of a save in the degraded flag.
    pub fn record_save(&self, record: &'static str, result: StorageResult<()>) {
        let failed = result.is_err();
        if let Err(err) = result {
            warn!(record, error = %err, "failed to persist snapshot");
        }
        self.degraded.send_if_modified(|degraded| {
            if *degraded == failed {
                return false;
            }
            if !failed {
                info!(record, "snapshot persistence recovered");
            }
            *degraded = failed;
            true
        });
    }
}
