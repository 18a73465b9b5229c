//! The socket wire protocol.
//!
//! Frames are JSON objects of the form `{"event": "...", "data": {...}}`.
//! Event names match the vocabulary existing clients already speak
//! ("join chat", "message received", ...), so they contain spaces and are
//! mapped explicitly rather than derived.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification};

/// Events a client may send over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Bind this connection to a user. Carries the same JWT used on the
    /// HTTP channel; the gateway verifies it and binds the token's subject.
    #[serde(rename = "setup")]
    Setup { token: String },

    /// Join the room for a chat. The gateway checks chat membership before
    /// honoring this; the room manager itself performs no authorization.
    #[serde(rename = "join chat")]
    #[serde(rename_all = "camelCase")]
    JoinChat { chat_id: Uuid },

    #[serde(rename = "typing")]
    #[serde(rename_all = "camelCase")]
    Typing { chat_id: Uuid },

    #[serde(rename = "stop typing")]
    #[serde(rename_all = "camelCase")]
    StopTyping { chat_id: Uuid },
}

/// Events the server pushes to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Acknowledges a successful `setup`.
    #[serde(rename = "connected")]
    Connected,

    #[serde(rename = "typing")]
    #[serde(rename_all = "camelCase")]
    Typing { chat_id: Uuid },

    #[serde(rename = "stop typing")]
    #[serde(rename_all = "camelCase")]
    StopTyping { chat_id: Uuid },

    /// A new message was persisted; pushed to every connection joined to the
    /// chat's room. The sender's own connections receive it too - clients
    /// merge idempotently by message id.
    #[serde(rename = "message received")]
    #[serde(rename_all = "camelCase")]
    MessageReceived { message: Message },

    #[serde(rename = "message deleted")]
    #[serde(rename_all = "camelCase")]
    MessageDeleted { message_id: Uuid, chat_id: Uuid },

    #[serde(rename = "chat deleted")]
    #[serde(rename_all = "camelCase")]
    ChatDeleted { chat_id: Uuid },

    /// Personal (non-room) push, e.g. an incoming friend request.
    #[serde(rename = "notification received")]
    #[serde(rename_all = "camelCase")]
    NotificationReceived { notification: Notification },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn client_event_wire_names() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"setup","data":{"token":"abc"}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Setup {
                token: "abc".to_string()
            }
        );

        let chat_id = Uuid::new_v4();
        let json = format!(r#"{{"event":"join chat","data":{{"chatId":"{chat_id}"}}}}"#);
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, ClientEvent::JoinChat { chat_id });
    }

    #[test]
    fn server_event_wire_names() {
        let value = serde_json::to_value(ServerEvent::Connected).unwrap();
        assert_eq!(value, serde_json::json!({"event": "connected"}));

        let chat_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();
        let value = serde_json::to_value(ServerEvent::MessageDeleted {
            message_id,
            chat_id,
        })
        .unwrap();
        assert_eq!(value["event"], "message deleted");
        assert_eq!(value["data"]["messageId"], message_id.to_string());
        assert_eq!(value["data"]["chatId"], chat_id.to_string());
    }

    #[test]
    fn typing_round_trip() {
        let chat_id = Uuid::new_v4();
        let event = ServerEvent::StopTyping { chat_id };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("stop typing"));
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"launch missiles"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }
}
