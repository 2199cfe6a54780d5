use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tagcall_call::{PeerEventSink, PeerSession};
use tagcall_core::{CallError, IceCandidate, SessionDescription};
use tracing::{debug, info, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

use crate::convert::{from_rtc_candidate, from_rtc_description, negotiation_error, to_rtc_candidate, to_rtc_description};
use crate::media::WebRtcMedia;

/// One `RTCPeerConnection` with the local stream attached.
pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
}

impl WebRtcPeer {
    /// Attaches every track of `media` and routes callbacks to `events`.
    pub(crate) async fn attach(
        pc: Arc<RTCPeerConnection>,
        media: &WebRtcMedia,
        events: PeerEventSink,
    ) -> Result<Self, CallError> {
        for track in media.rtc_tracks() {
            let sender = pc.add_track(track).await.map_err(|e| negotiation_error("add_track", e))?;
            // RTCP has to be drained for interceptors (NACK, reports) to run.
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while sender.read(&mut buf).await.is_ok() {}
            });
        }

        let candidates = events.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            match candidate {
                Some(c) => match c.to_json() {
                    Ok(init) => candidates.local_candidate(from_rtc_candidate(init)),
                    Err(e) => warn!("Dropping local ICE candidate: {}", e),
                },
                None => debug!("ICE gathering complete"),
            }
            Box::pin(async {})
        }));

        let remote = events;
        let remote_seen = Arc::new(AtomicBool::new(false));
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
                let stream_id = track.stream_id();
                debug!("Remote track {} ({:?}) on stream {}", track.id(), track.kind(), stream_id);
                if !remote_seen.swap(true, Ordering::AcqRel) {
                    remote.remote_stream(stream_id);
                }
                Box::pin(async {})
            },
        ));

        pc.on_peer_connection_state_change(Box::new(|state: RTCPeerConnectionState| {
            match state {
                RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected => {
                    warn!("Peer connection state: {:?}", state)
                }
                _ => info!("Peer connection state: {:?}", state),
            }
            Box::pin(async {})
        }));

        Ok(Self { pc })
    }

    pub fn connection(&self) -> &Arc<RTCPeerConnection> {
        &self.pc
    }

    async fn apply_local(&self, desc: RTCSessionDescription) -> Result<SessionDescription, CallError> {
        self.pc
            .set_local_description(desc.clone())
            .await
            .map_err(|e| negotiation_error("set_local_description", e))?;
        from_rtc_description(desc)
    }
}

#[async_trait]
impl PeerSession for WebRtcPeer {
    async fn create_offer(&self) -> Result<SessionDescription, CallError> {
        let offer = self.pc.create_offer(None).await.map_err(|e| negotiation_error("create_offer", e))?;
        self.apply_local(offer).await
    }

    async fn create_answer(&self) -> Result<SessionDescription, CallError> {
        let answer = self.pc.create_answer(None).await.map_err(|e| negotiation_error("create_answer", e))?;
        self.apply_local(answer).await
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), CallError> {
        let desc = to_rtc_description(description)?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| negotiation_error("set_remote_description", e))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), CallError> {
        self.pc
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .map_err(|e| CallError::Backend { reason: format!("add_ice_candidate: {e}") })
    }

    async fn close(&self) -> Result<(), CallError> {
        self.pc.close().await.map_err(|e| CallError::Backend { reason: format!("close: {e}") })
    }
}
