use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::registry::ConnectionId;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping {
        #[serde(default)]
        message: String,
    },
    Echo {
        #[serde(default)]
        message: String,
    },
    Broadcast {
        #[serde(default)]
        message: String,
    },
}

/// Classification of an incoming text frame
#[derive(Debug)]
pub enum Inbound {
    Command(ClientMessage),
    /// Valid JSON without a recognized command type
    UnknownJson,
    /// Payload that does not parse as JSON at all
    NotJson,
}

pub fn decode_inbound(text: &str) -> Inbound {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(command) => Inbound::Command(command),
        Err(_) => {
            if serde_json::from_str::<serde_json::Value>(text).is_ok() {
                Inbound::UnknownJson
            } else {
                Inbound::NotJson
            }
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Connection {
        message: String,
        timestamp: String,
        connection_id: ConnectionId,
    },
    Pong {
        message: String,
        timestamp: String,
        original_message: String,
    },
    Echo {
        message: String,
        timestamp: String,
    },
    Broadcast {
        message: String,
        timestamp: String,
        sender: String,
    },
    Message {
        message: String,
        timestamp: String,
    },
    Text {
        message: String,
        timestamp: String,
    },
    Periodic {
        message: String,
        timestamp: String,
        connections_count: usize,
    },
}

/// Wall-clock timestamp stamped on every outgoing frame
fn now_hms() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

impl ServerMessage {
    pub fn welcome(connection_id: ConnectionId) -> Self {
        Self::Connection {
            message: "Successfully connected to the WebSocket server".to_string(),
            timestamp: now_hms(),
            connection_id,
        }
    }

    pub fn pong(original_message: impl Into<String>) -> Self {
        Self::Pong {
            message: "Pong! Connection is alive.".to_string(),
            timestamp: now_hms(),
            original_message: original_message.into(),
        }
    }

    pub fn echo(input: &str) -> Self {
        Self::Echo {
            message: format!("Echo: {input}"),
            timestamp: now_hms(),
        }
    }

    pub fn broadcast_from(sender_id: ConnectionId, input: &str) -> Self {
        Self::Broadcast {
            message: format!("Broadcast: {input}"),
            timestamp: now_hms(),
            sender: format!("client-{sender_id}"),
        }
    }

    pub fn ack_json(raw: &str) -> Self {
        Self::Message {
            message: format!("Received: {raw}"),
            timestamp: now_hms(),
        }
    }

    pub fn ack_text(raw: &str) -> Self {
        Self::Text {
            message: format!("Received text: {raw}"),
            timestamp: now_hms(),
        }
    }

    pub fn periodic(connections_count: usize) -> Self {
        Self::Periodic {
            message: "Periodic server update".to_string(),
            timestamp: now_hms(),
            connections_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_commands() {
        match decode_inbound(r#"{"type":"ping","message":"hello"}"#) {
            Inbound::Command(ClientMessage::Ping { message }) => assert_eq!(message, "hello"),
            other => panic!("expected ping, got {other:?}"),
        }
        match decode_inbound(r#"{"type":"echo","message":"x"}"#) {
            Inbound::Command(ClientMessage::Echo { message }) => assert_eq!(message, "x"),
            other => panic!("expected echo, got {other:?}"),
        }
        match decode_inbound(r#"{"type":"broadcast","message":"hi all"}"#) {
            Inbound::Command(ClientMessage::Broadcast { message }) => assert_eq!(message, "hi all"),
            other => panic!("expected broadcast, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_missing_message_defaults_empty() {
        match decode_inbound(r#"{"type":"ping"}"#) {
            Inbound::Command(ClientMessage::Ping { message }) => assert_eq!(message, ""),
            other => panic!("expected ping, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        match decode_inbound(r#"{"type":"echo","message":"x","timestamp":"10:00:00"}"#) {
            Inbound::Command(ClientMessage::Echo { message }) => assert_eq!(message, "x"),
            other => panic!("expected echo, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_json() {
        assert!(matches!(
            decode_inbound(r#"{"type":"subscribe","channel":"news"}"#),
            Inbound::UnknownJson
        ));
        assert!(matches!(decode_inbound(r#"{"hello":"world"}"#), Inbound::UnknownJson));
        // A bare JSON string is still JSON
        assert!(matches!(decode_inbound(r#""hello""#), Inbound::UnknownJson));
    }

    #[test]
    fn test_decode_not_json() {
        assert!(matches!(decode_inbound("hello there"), Inbound::NotJson));
        assert!(matches!(decode_inbound("{not json"), Inbound::NotJson));
    }

    #[test]
    fn test_pong_carries_original_message() {
        let encoded = serde_json::to_value(ServerMessage::pong("hello")).unwrap();
        assert_eq!(encoded["type"], "pong");
        assert_eq!(encoded["original_message"], "hello");
        assert_eq!(encoded["message"], "Pong! Connection is alive.");
    }

    #[test]
    fn test_broadcast_names_sender() {
        let encoded = serde_json::to_value(ServerMessage::broadcast_from(7, "hi")).unwrap();
        assert_eq!(encoded["type"], "broadcast");
        assert_eq!(encoded["message"], "Broadcast: hi");
        assert_eq!(encoded["sender"], "client-7");
    }

    #[test]
    fn test_welcome_carries_connection_id() {
        let encoded = serde_json::to_value(ServerMessage::welcome(3)).unwrap();
        assert_eq!(encoded["type"], "connection");
        assert_eq!(encoded["connection_id"], 3);
    }
}
