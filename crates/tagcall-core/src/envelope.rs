//! JSON envelopes exchanged with the relay server.
//!
//! Every frame is a JSON object with a `type` discriminator:
//!
//! | type      | fields                      | direction        |
//! |-----------|-----------------------------|------------------|
//! | pair      | userId, tag                 | client → server  |
//! | pair      | peerId                      | server → client  |
//! | offer     | offer, peerId               | both             |
//! | answer    | answer                      | both             |
//! | candidate | candidate, peerId           | both             |
//! | message   | message, userId             | both             |
//!
//! `pair` carries different fields in each direction, so outbound and
//! inbound frames are modelled as separate enums.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{IceCandidate, SessionDescription, Tag, UserId};

// ── Outbound ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundEnvelope {
    Pair {
        #[serde(rename = "userId")]
        user_id: UserId,
        tag: Tag,
    },
    Offer {
        offer: SessionDescription,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    Answer {
        answer: SessionDescription,
    },
    Candidate {
        candidate: IceCandidate,
        #[serde(rename = "peerId", default, skip_serializing_if = "Option::is_none")]
        peer_id: Option<String>,
    },
    Message {
        message: String,
        #[serde(rename = "userId")]
        user_id: UserId,
    },
}

impl OutboundEnvelope {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire `type` value, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pair { .. } => "pair",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Message { .. } => "message",
        }
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundEnvelope {
    Pair {
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    Offer {
        offer: SessionDescription,
        #[serde(rename = "peerId", default, skip_serializing_if = "Option::is_none")]
        peer_id: Option<String>,
    },
    Answer {
        answer: SessionDescription,
    },
    Candidate {
        candidate: IceCandidate,
        #[serde(rename = "peerId", default, skip_serializing_if = "Option::is_none")]
        peer_id: Option<String>,
    },
    Message {
        message: String,
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
}

impl InboundEnvelope {
    /// Decodes one text frame. Unknown `type` values and malformed JSON
    /// yield `None`.
    pub fn decode(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                debug!("Ignoring inbound frame ({} bytes): {}", text.len(), e);
                None
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pair { .. } => "pair",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Message { .. } => "message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pair_request_matches_wire_shape() {
        let env = OutboundEnvelope::Pair {
            user_id: UserId::from("user-abc"),
            tag: Tag::parse(" chess ").unwrap(),
        };
        let value: serde_json::Value = serde_json::from_str(&env.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "pair", "userId": "user-abc", "tag": "chess"}));
    }

    #[test]
    fn offer_and_candidate_carry_peer_id() {
        let offer = OutboundEnvelope::Offer {
            offer: SessionDescription::offer("v=0"),
            peer_id: "user-peer".into(),
        };
        assert_eq!(
            serde_json::to_value(&offer).unwrap(),
            json!({"type": "offer", "offer": {"type": "offer", "sdp": "v=0"}, "peerId": "user-peer"})
        );

        let cand = OutboundEnvelope::Candidate {
            candidate: IceCandidate::new("candidate:1"),
            peer_id: None,
        };
        assert_eq!(
            serde_json::to_value(&cand).unwrap(),
            json!({"type": "candidate", "candidate": {"candidate": "candidate:1"}})
        );
    }

    #[test]
    fn decodes_every_inbound_type() {
        assert_eq!(
            InboundEnvelope::decode(r#"{"type":"pair","peerId":"user-b"}"#),
            Some(InboundEnvelope::Pair { peer_id: "user-b".into() })
        );
        assert!(matches!(
            InboundEnvelope::decode(r#"{"type":"offer","offer":{"type":"offer","sdp":"x"},"peerId":"user-a"}"#),
            Some(InboundEnvelope::Offer { peer_id: Some(_), .. })
        ));
        assert!(matches!(
            InboundEnvelope::decode(r#"{"type":"answer","answer":{"type":"answer","sdp":"y"}}"#),
            Some(InboundEnvelope::Answer { .. })
        ));
        assert!(matches!(
            InboundEnvelope::decode(r#"{"type":"candidate","candidate":{"candidate":"c","sdpMid":"0","sdpMLineIndex":0}}"#),
            Some(InboundEnvelope::Candidate { peer_id: None, .. })
        ));
        assert_eq!(
            InboundEnvelope::decode(r#"{"type":"message","message":"hi","userId":"user-b"}"#),
            Some(InboundEnvelope::Message { message: "hi".into(), user_id: Some("user-b".into()) })
        );
    }

    #[test]
    fn unknown_or_malformed_frames_are_ignored() {
        assert_eq!(InboundEnvelope::decode(r#"{"type":"presence","count":3}"#), None);
        assert_eq!(InboundEnvelope::decode(r#"{"peerId":"user-b"}"#), None);
        assert_eq!(InboundEnvelope::decode("not json"), None);
        assert_eq!(InboundEnvelope::decode(r#"{"type":"pair"}"#), None);
    }
}
