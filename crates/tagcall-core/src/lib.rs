pub mod config;
pub mod envelope;
pub mod errors;
pub mod types;

pub use config::{
    CandidatePolicy, ClientConfig, IceServerConfig, IceServerKind, MediaConstraints, DEFAULT_CHAT_HISTORY,
    DEFAULT_SIGNALING_URL,
};
pub use envelope::{InboundEnvelope, OutboundEnvelope};
pub use errors::{CallError, ConfigError, RelayError};
pub use types::*;
