use serde::Serialize;

use crate::dto::ws::ServerMessage;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` field.
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

impl TryFrom<&ServerMessage> for ServerEvent {
    type Error = serde_json::Error;

    fn try_from(message: &ServerMessage) -> Result<Self, Self::Error> {
        ServerEvent::json(Some(message.event_name().to_string()), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_becomes_named_event() {
        let event = ServerEvent::try_from(&ServerMessage::LockStatus { holder: None }).unwrap();
        assert_eq!(event.event.as_deref(), Some("control:lock:status"));
        assert_eq!(event.data, r#"{"type":"control:lock:status","holder":null}"#);
    }
}
