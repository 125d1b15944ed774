// ================
// common/src/lib.rs
// ================
//! Wire types shared between the chat server and its clients.
//!
//! Every frame on the live connection is a JSON text frame. Clients send
//! [`InboundFrame`]s; the server answers with one [`ChatMessage`] per frame,
//! both for the history replay on join and for every live broadcast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned to a message by the server.
///
/// Ids start at 1 and are never reused, not even after the message they
/// name is removed from the log.
pub type MessageId = u64;

/// A chat message as stored in the log and sent to clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Server-assigned id, strictly increasing in creation order
    pub id: MessageId,
    /// Identity of the author
    pub user: String,
    /// Message body, stored verbatim
    pub content: String,
    /// Server-assigned creation time, RFC 3339 on the wire
    pub time: DateTime<Utc>,
}

/// The single frame type a client may send on the live connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Text to publish to the room
    pub content: String,
}

impl InboundFrame {
    /// Decode a text frame. Anything that is not an object with a string
    /// `content` field is rejected.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        Self::from_object(serde_json::from_str(text)?)
    }

    /// Decode a binary frame carrying the same JSON payload.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Self::from_object(serde_json::from_slice(bytes)?)
    }

    // A derived struct decoder also takes `["text"]`; going through a map
    // first limits frames to JSON objects.
    fn from_object(object: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(object))
    }
}

impl ChatMessage {
    /// Encode for the wire.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_chat_message_wire_format() {
        let msg = ChatMessage {
            id: 1,
            user: "client1".to_string(),
            content: "hello".to_string(),
            time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let parsed: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["user"], "client1");
        assert_eq!(parsed["content"], "hello");
        assert_eq!(parsed["time"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_inbound_frame_decode() {
        let frame = InboundFrame::decode(r#"{"content":"hi there"}"#).unwrap();
        assert_eq!(frame.content, "hi there");

        // Empty bodies are legal
        let frame = InboundFrame::decode(r#"{"content":""}"#).unwrap();
        assert_eq!(frame.content, "");

        let frame = InboundFrame::decode_bytes(br#"{"content":"bin"}"#).unwrap();
        assert_eq!(frame.content, "bin");
    }

    #[test]
    fn test_inbound_frame_rejects_malformed() {
        assert!(InboundFrame::decode("not json").is_err());
        assert!(InboundFrame::decode("{}").is_err());
        assert!(InboundFrame::decode(r#"{"content":42}"#).is_err());
        assert!(InboundFrame::decode(r#"["content"]"#).is_err());
        assert!(InboundFrame::decode(r#""content""#).is_err());
        assert!(InboundFrame::decode_bytes(br#"["bin"]"#).is_err());
    }

    #[test]
    fn test_inbound_frame_ignores_extra_fields() {
        let frame = InboundFrame::decode(r#"{"content":"hi","user":"admin"}"#).unwrap();
        assert_eq!(frame.content, "hi");
    }
}
