use serde::{Deserialize, Serialize};

use crate::errors::CallError;

// MARK: - UserId

/// Opaque identity of this client for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    const PREFIX: &'static str = "user-";
    const RANDOM_LEN: usize = 13;

    /// Generates `user-` followed by 13 random lowercase alphanumerics.
    pub fn generate() -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", Self::PREFIX, &random[..Self::RANDOM_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// MARK: - Tag

/// Matchmaking tag. Always non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    pub fn parse(raw: &str) -> Result<Self, CallError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CallError::InvalidTag);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Tag {
    type Error = CallError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// MARK: - SessionDescription

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// SDP blob in the `{type, sdp}` shape browsers put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Offer, sdp: sdp.into() }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Answer, sdp: sdp.into() }
    }
}

// MARK: - IceCandidate

/// ICE candidate in the `RTCIceCandidateInit` JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

// MARK: - Chat

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    #[serde(rename = "self")]
    Local,
    Peer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub sender: ChatSender,
    pub text: String,
}

impl ChatEntry {
    pub fn local(text: impl Into<String>) -> Self {
        Self { sender: ChatSender::Local, text: text.into() }
    }

    pub fn peer(text: impl Into<String>) -> Self {
        Self { sender: ChatSender::Peer, text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_user_ids_are_prefixed_and_unique() {
        let a = UserId::generate();
        let b = UserId::generate();
        assert!(a.as_str().starts_with("user-"));
        assert_eq!(a.as_str().len(), "user-".len() + 13);
        assert!(a.as_str()[5..].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn tag_is_trimmed_and_must_not_be_blank() {
        assert_eq!(Tag::parse("  music ").unwrap().as_str(), "music");
        assert!(matches!(Tag::parse(""), Err(CallError::InvalidTag)));
        assert!(matches!(Tag::parse(" \t\n"), Err(CallError::InvalidTag)));
    }

    #[test]
    fn ice_candidate_uses_browser_field_names() {
        let json = r#"{"candidate":"candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host","sdpMid":"0","sdpMLineIndex":0}"#;
        let cand: IceCandidate = serde_json::from_str(json).expect("browser candidate");
        assert_eq!(cand.sdp_mid.as_deref(), Some("0"));
        assert_eq!(cand.sdp_mline_index, Some(0));
        assert!(cand.username_fragment.is_none());

        let out = serde_json::to_value(&cand).unwrap();
        assert_eq!(out["sdpMLineIndex"], 0);
        assert!(out.get("usernameFragment").is_none());
    }

    #[test]
    fn session_description_serializes_type_field() {
        let desc = SessionDescription::answer("v=0\r\n");
        let out = serde_json::to_value(&desc).unwrap();
        assert_eq!(out["type"], "answer");
        assert_eq!(out["sdp"], "v=0\r\n");
    }
}
