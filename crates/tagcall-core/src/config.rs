use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_SIGNALING_URL: &str = "ws://127.0.0.1:8080";
pub const DEFAULT_CHAT_HISTORY: usize = 300;

/// What to do with remote ICE candidates that arrive before the remote
/// description has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidatePolicy {
    /// Queue them and apply in arrival order once the description is set.
    #[default]
    Buffer,
    /// Discard them.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceServerKind {
    Stun,
    Turn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    #[serde(rename = "type")]
    pub kind: IceServerKind,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self { kind: IceServerKind::Stun, url: url.into(), username: None, credential: None }
    }

    /// URL with a `stun:` / `turn:` scheme, adding one from `kind` if missing.
    pub fn url_with_scheme(&self) -> String {
        if ["stun:", "turn:", "turns:"].iter().any(|s| self.url.starts_with(s)) {
            return self.url.clone();
        }
        let scheme = match self.kind {
            IceServerKind::Stun => "stun:",
            IceServerKind::Turn => "turn:",
        };
        format!("{}{}", scheme, self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self { video: true, audio: true }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(alias = "signalingUrl")]
    pub signaling_url: String,
    #[serde(alias = "iceServers")]
    pub ice_servers: Vec<IceServerConfig>,
    #[serde(alias = "candidatePolicy")]
    pub candidate_policy: CandidatePolicy,
    pub media: MediaConstraints,
    #[serde(alias = "chatHistory")]
    pub chat_history: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_owned(),
            ice_servers: vec![
                IceServerConfig::stun("stun:stun.l.google.com:19302"),
                IceServerConfig::stun("stun:stun1.l.google.com:19302"),
            ],
            candidate_policy: CandidatePolicy::default(),
            media: MediaConstraints::default(),
            chat_history: DEFAULT_CHAT_HISTORY,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Replaces the signaling URL, keeping the rest.
    pub fn with_signaling_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.signaling_url = url.into();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.signaling_url.starts_with("ws://") || self.signaling_url.starts_with("wss://")) {
            return Err(ConfigError::Invalid {
                reason: format!("signaling URL must be ws:// or wss://, got '{}'", self.signaling_url),
            });
        }
        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(ConfigError::Invalid { reason: "ICE server URL cannot be empty".into() });
            }
            if server.kind == IceServerKind::Turn
                && (server.username.is_none() || server.credential.is_none())
            {
                return Err(ConfigError::Invalid {
                    reason: format!("TURN server {} requires username and credential", server.url),
                });
            }
        }
        if self.chat_history == 0 {
            return Err(ConfigError::Invalid { reason: "chat history must hold at least one entry".into() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "signalingUrl": "wss://relay.example.org",
            "iceServers": [{"type": "stun", "url": "stun.example.org:3478"}],
            "candidatePolicy": "drop",
            "media": {"video": false},
            "chatHistory": 50
        }"#;

        let cfg = ClientConfig::from_json(json).expect("valid camelCase config");
        assert_eq!(cfg.signaling_url, "wss://relay.example.org");
        assert_eq!(cfg.candidate_policy, CandidatePolicy::Drop);
        assert!(!cfg.media.video);
        assert!(cfg.media.audio);
        assert_eq!(cfg.chat_history, 50);
        assert_eq!(cfg.ice_servers[0].url_with_scheme(), "stun:stun.example.org:3478");
    }

    #[test]
    fn deserializes_snake_case_fields_with_defaults() {
        let json = r#"{"signaling_url": "ws://localhost:9000", "candidate_policy": "buffer"}"#;

        let cfg = ClientConfig::from_json(json).expect("valid snake_case config");
        assert_eq!(cfg.signaling_url, "ws://localhost:9000");
        assert_eq!(cfg.candidate_policy, CandidatePolicy::Buffer);
        assert_eq!(cfg.ice_servers.len(), 2);
        assert_eq!(cfg.chat_history, DEFAULT_CHAT_HISTORY);
    }

    #[test]
    fn rejects_turn_without_credentials() {
        let json = r#"{"iceServers": [{"type": "turn", "url": "turn.example.org:3478", "username": "u"}]}"#;
        assert!(matches!(ClientConfig::from_json(json), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_non_websocket_url() {
        let json = r#"{"signalingUrl": "http://relay.example.org"}"#;
        assert!(matches!(ClientConfig::from_json(json), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ClientConfig::load("/nonexistent/tagcall.json").unwrap_err();
        match err {
            ConfigError::Read { path, .. } => assert_eq!(path, "/nonexistent/tagcall.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn signaling_override_is_validated() {
        let cfg = ClientConfig::default().with_signaling_url("wss://relay.example.org").unwrap();
        assert_eq!(cfg.signaling_url, "wss://relay.example.org");
        assert!(ClientConfig::default().with_signaling_url("relay.example.org").is_err());
    }

    #[test]
    fn turn_urls_get_turn_scheme() {
        let server = IceServerConfig {
            kind: IceServerKind::Turn,
            url: "relay.example.org:3478".into(),
            username: Some("u".into()),
            credential: Some("p".into()),
        };
        assert_eq!(server.url_with_scheme(), "turn:relay.example.org:3478");
        assert_eq!(IceServerConfig::stun("turns:x:5349").url_with_scheme(), "turns:x:5349");
    }
}
