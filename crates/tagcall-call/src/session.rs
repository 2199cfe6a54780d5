use std::sync::Arc;

use tagcall_core::UserId;
use tracing::{debug, warn};

use crate::backend::{LocalMedia, PeerSession, RtcBackend};

/// Resources of the current call: the captured stream and the peer
/// connection. Owned by the controller; nothing else holds a reference
/// across events.
pub struct CallSession<B: RtcBackend> {
    user_id: UserId,
    media: Option<Arc<B::Media>>,
    peer: Option<Arc<B::Peer>>,
}

impl<B: RtcBackend> CallSession<B> {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, media: None, peer: None }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn media(&self) -> Option<&Arc<B::Media>> {
        self.media.as_ref()
    }

    pub fn peer(&self) -> Option<&Arc<B::Peer>> {
        self.peer.as_ref()
    }

    /// Stores new media, stopping any stream it replaces.
    pub fn set_media(&mut self, media: Arc<B::Media>) {
        if let Some(old) = self.media.replace(media) {
            old.stop();
        }
    }

    pub fn set_peer(&mut self, peer: Arc<B::Peer>) -> Option<Arc<B::Peer>> {
        self.peer.replace(peer)
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// Closes and forgets the peer connection, if any. Media is kept.
    pub async fn close_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            match peer.close().await {
                Ok(()) => debug!("Peer connection closed"),
                Err(e) => warn!("Closing peer connection failed: {}", e),
            }
        }
    }

    /// Closes the peer connection and stops every local track. Either
    /// half may be missing; a close failure does not keep the tracks
    /// running.
    pub async fn teardown(&mut self) {
        self.close_peer().await;
        if let Some(media) = self.media.take() {
            debug!("Stopping {} local track(s) of {}", media.track_count(), media.stream_id());
            media.stop();
        }
    }
}
