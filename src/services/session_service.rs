use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{Ack, LoginRequest, ServerMessage},
    error::ServiceError,
    services::broadcast,
    state::{
        SessionHandle, SharedState,
        controller_lock::LockChange,
        session::{Role, Session, SessionId},
    },
};

/// Register a freshly connected session and return its identifier.
pub fn connect(state: &SharedState, tx: mpsc::UnboundedSender<ServerMessage>) -> SessionId {
    let session_id = Uuid::new_v4();
    state.sessions().insert(
        session_id,
        SessionHandle {
            session: Session::connected(session_id),
            tx,
        },
    );
    info!(session = %session_id, "session connected");
    session_id
}

/// Authenticate a session. Observers always succeed, controllers need the PIN.
pub async fn login(
    state: &SharedState,
    session_id: SessionId,
    request: LoginRequest,
) -> Result<Ack, ServiceError> {
    if request.role == Role::Controller {
        let pin = state.settings().lock().await.pin.clone();
        if request.pin.as_deref() != Some(pin.as_str()) {
            warn!(session = %session_id, "controller login with bad PIN");
            return Err(ServiceError::BadCredential);
        }
    }

    {
        let Some(mut handle) = state.sessions().get_mut(&session_id) else {
            return Err(ServiceError::NotFound(format!("session `{session_id}`")));
        };
        handle.session.role = request.role;
        handle.session.authenticated = true;
    }

    let holder = {
        let mut controller = state.controller().lock().await;
        if request.role == Role::Observer
            && controller.release(session_id) == LockChange::Holder(None)
        {
            broadcast::broadcast_lock_status(state, None);
        }
        controller.holder()
    };
    info!(session = %session_id, role = ?request.role, "session logged in");

    let snapshot = state.match_state().lock().await.clone();
    broadcast::broadcast_full(state, &snapshot);

    Ok(Ack {
        session_id: Some(session_id),
        role: Some(request.role),
        controller: Some(holder == Some(session_id)),
        ..Ack::ok()
    })
}

/// Take over the controller lock.
pub async fn claim(state: &SharedState, session_id: SessionId) -> Result<Ack, ServiceError> {
    let session = state
        .session(session_id)
        .ok_or(ServiceError::NotAuthorized)?;

    let mut controller = state.controller().lock().await;
    let previous = controller.holder();
    controller.claim(&session, state.now_ms())?;
    drop(controller);

    info!(session = %session_id, previous = ?previous, "controller lock claimed");
    broadcast::notify_lock_granted(state, session_id);
    broadcast::broadcast_lock_status(state, Some(session_id));
    Ok(Ack::ok())
}

/// Give the controller lock up; a no-op unless `session_id` holds it.
pub async fn release(state: &SharedState, session_id: SessionId) -> Ack {
    let change = state.controller().lock().await.release(session_id);
    if let LockChange::Holder(holder) = change {
        info!(session = %session_id, "controller lock released");
        broadcast::broadcast_lock_status(state, holder);
    }
    Ack::ok()
}

/// Refresh the holder's liveness; ignored for any other session.
pub async fn ping(state: &SharedState, session_id: SessionId) {
    state
        .controller()
        .lock()
        .await
        .heartbeat(session_id, state.now_ms());
}

/// Forget a closed session, releasing the lock it may hold.
pub async fn disconnect(state: &SharedState, session_id: SessionId) {
    state.sessions().remove(&session_id);
    let change = state.controller().lock().await.release(session_id);
    if let LockChange::Holder(holder) = change {
        info!(session = %session_id, "controller disconnected; lock released");
        broadcast::broadcast_lock_status(state, holder);
    }
    info!(session = %session_id, "session disconnected");
}
