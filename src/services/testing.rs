use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};

use crate::{
    config::AppConfig,
    dao::snapshot_store::memory::InMemorySnapshotStore,
    dto::ws::{LoginRequest, ServerMessage},
    services::{persistence, session_service},
    state::{
        AppState, SharedState,
        clock::ManualClock,
        match_state::{MatchState, Settings},
        session::{Role, SessionId},
    },
};

pub(crate) const TEST_PIN: &str = "2468";

/// Shared state wired to a manual clock and an in-memory store, with the
/// persister running.
pub(crate) struct Harness {
    pub state: SharedState,
    pub clock: Arc<ManualClock>,
    pub store: InMemorySnapshotStore,
    persister: JoinHandle<()>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = InMemorySnapshotStore::new();
        let settings = Settings {
            pin: TEST_PIN.into(),
            ..Settings::default()
        };
        let state = AppState::new(
            AppConfig::default(),
            clock.clone(),
            Arc::new(store.clone()),
            MatchState::new(&settings),
            settings,
        );
        let persister = persistence::spawn_persister(state.clone());
        Self {
            state,
            clock,
            store,
            persister,
        }
    }

    pub fn connect(&self) -> (SessionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (session_service::connect(&self.state, tx), rx)
    }

    /// Connected, logged-in session holding the controller lock.
    pub async fn controller(&self) -> SessionId {
        claim_control(&self.state).await
    }

    pub async fn snapshot(&self) -> MatchState {
        self.state.match_state().lock().await.clone()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.persister.abort();
    }
}

/// Connect a session, log it in as controller and claim the lock.
pub(crate) async fn claim_control(state: &SharedState) -> SessionId {
    let (tx, _rx) = mpsc::unbounded_channel();
    let session = session_service::connect(state, tx);
    let pin = state.settings().lock().await.pin.clone();
    session_service::login(
        state,
        session,
        LoginRequest {
            role: Role::Controller,
            pin: Some(pin),
        },
    )
    .await
    .unwrap();
    session_service::claim(state, session).await.unwrap();
    session
}

/// Wait for background work (the persister) to make `condition` true.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within one second");
}
