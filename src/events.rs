//! Push event payloads.
//!
//! Each SSE frame's `data` is a JSON object with a `type` discriminator. A
//! payload that fails to parse is logged and discarded; one bad frame must
//! not kill the stream.

use serde::Deserialize;

use crate::types::TicketStatus;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// Connection acknowledgement; no state change.
    Connected,

    /// A new message in some ticket's conversation. Staff replies arrive
    /// only through this channel, never via a re-fetch.
    TicketMessage {
        ticket_id: String,
        message_id: String,
        is_staff_reply: bool,
        message: String,
        created_at: String,
        #[serde(default)]
        sender_name: Option<String>,
    },

    /// The server moved a ticket to a new status.
    TicketStatusChange {
        ticket_id: String,
        new_status: TicketStatus,
    },
}

impl PushEvent {
    /// Parse a raw frame payload. Malformed or unrecognized payloads are
    /// discarded with a warning and `None` is returned.
    pub fn decode(payload: &str) -> Option<Self> {
        match serde_json::from_str(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("discarding malformed push frame: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_connected() {
        let event = PushEvent::decode(r#"{"type":"connected"}"#).unwrap();
        assert_eq!(event, PushEvent::Connected);
    }

    #[test]
    fn test_decode_ticket_message() {
        let payload = r#"{
            "type": "ticket_message",
            "ticket_id": "T1",
            "message_id": "m9",
            "is_staff_reply": true,
            "message": "We're looking into it",
            "created_at": "2026-08-21T14:02:00Z"
        }"#;
        match PushEvent::decode(payload).unwrap() {
            PushEvent::TicketMessage {
                ticket_id,
                message_id,
                is_staff_reply,
                message,
                sender_name,
                ..
            } => {
                assert_eq!(ticket_id, "T1");
                assert_eq!(message_id, "m9");
                assert!(is_staff_reply);
                assert_eq!(message, "We're looking into it");
                assert_eq!(sender_name, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_status_change() {
        let payload = r#"{"type":"ticket_status_change","ticket_id":"T1","new_status":"closed"}"#;
        assert_eq!(
            PushEvent::decode(payload).unwrap(),
            PushEvent::TicketStatusChange {
                ticket_id: "T1".to_string(),
                new_status: TicketStatus::Closed,
            }
        );
    }

    #[test]
    fn test_decode_malformed_is_discarded() {
        assert!(PushEvent::decode("not json").is_none());
        assert!(PushEvent::decode("{}").is_none());
        assert!(PushEvent::decode(r#"{"type":"heartbeat"}"#).is_none());
        // Missing required fields.
        assert!(PushEvent::decode(r#"{"type":"ticket_message","ticket_id":"T1"}"#).is_none());
    }
}
