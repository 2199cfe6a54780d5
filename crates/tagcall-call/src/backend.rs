use std::sync::Arc;

use async_trait::async_trait;
use tagcall_core::{CallError, IceCandidate, MediaConstraints, SessionDescription};
use tokio::sync::mpsc;
use tracing::trace;

use crate::machine::BackendEvent;

// MARK: - RtcBackend trait

/// Media capture and peer-connection factory.
///
/// Implementations:
/// - `WebRtcBackend` in `tagcall-webrtc`: webrtc-rs
/// - the in-crate fake used by the controller tests
#[async_trait]
pub trait RtcBackend: Send + Sync + 'static {
    type Media: LocalMedia;
    type Peer: PeerSession;

    /// Acquire local camera/microphone tracks.
    async fn capture(&self, constraints: &MediaConstraints) -> Result<Arc<Self::Media>, CallError>;

    /// Create a peer connection, attach every track of `media`, and route
    /// local candidates and the remote stream to `events`.
    async fn open_peer(
        &self,
        media: Arc<Self::Media>,
        events: PeerEventSink,
    ) -> Result<Arc<Self::Peer>, CallError>;
}

// MARK: - PeerSession trait

#[async_trait]
pub trait PeerSession: Send + Sync + 'static {
    /// Creates an offer and applies it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription, CallError>;

    /// Creates an answer and applies it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription, CallError>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), CallError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), CallError>;

    async fn close(&self) -> Result<(), CallError>;
}

// MARK: - LocalMedia trait

/// A captured local stream.
pub trait LocalMedia: Send + Sync + 'static {
    fn stream_id(&self) -> &str;

    fn track_count(&self) -> usize;

    /// Stop every track. Idempotent.
    fn stop(&self);
}

// MARK: - PeerEventSink

/// Backend event stamped with the epoch of the call that produced it.
pub type TaggedEvent = (u64, BackendEvent);

/// Callback target handed to [`RtcBackend::open_peer`].
#[derive(Debug, Clone)]
pub struct PeerEventSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl PeerEventSink {
    pub fn new(epoch: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { epoch, tx }
    }

    /// A sink not attached to any controller.
    pub fn detached(epoch: u64) -> (Self, mpsc::UnboundedReceiver<TaggedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { epoch, tx }, rx)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn local_candidate(&self, candidate: IceCandidate) {
        self.emit(BackendEvent::LocalCandidate(candidate));
    }

    pub fn remote_stream(&self, stream_id: impl Into<String>) {
        self.emit(BackendEvent::RemoteStream { stream_id: stream_id.into() });
    }

    fn emit(&self, event: BackendEvent) {
        if self.tx.send((self.epoch, event)).is_err() {
            trace!("Peer event dropped; controller gone (epoch={})", self.epoch);
        }
    }
}
