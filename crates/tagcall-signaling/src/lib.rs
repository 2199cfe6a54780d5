//! tagcall-signaling: relay client.
//!
//! One long-lived WebSocket to the relay/matchmaking server. Outbound
//! envelopes are serialised to text frames; inbound text frames are decoded
//! into [`InboundEnvelope`]s and delivered on a channel, one at a time.
//!
//! ```text
//! CallController ── RelaySender ──► writer task ──► WebSocket ──► relay
//! CallController ◄── mpsc::Receiver ◄── reader task ◄── WebSocket ◄── relay
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tagcall_core::{OutboundEnvelope, Tag, UserId};
//! use tagcall_signaling::RelayClient;
//!
//! # async fn demo() -> Result<(), tagcall_core::RelayError> {
//! let client = RelayClient::connect("ws://127.0.0.1:8080").await?;
//! let (sender, mut inbound) = client.start();
//! sender.send(OutboundEnvelope::Pair {
//!     user_id: UserId::generate(),
//!     tag: Tag::parse("chess").unwrap(),
//! });
//! while let Some(envelope) = inbound.recv().await {
//!     println!("{:?}", envelope);
//! }
//! # Ok(())
//! # }
//! ```

pub mod relay;

pub use relay::{RelayClient, RelaySender, INBOUND_CAPACITY};
pub use tagcall_core::{InboundEnvelope, OutboundEnvelope};
