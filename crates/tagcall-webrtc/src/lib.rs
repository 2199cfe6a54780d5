//! tagcall-webrtc: webrtc-rs implementation of [`tagcall_call::RtcBackend`].
//!
//! - [`WebRtcBackend`]: API with default codecs and interceptors, ICE
//!   servers from [`ClientConfig`](tagcall_core::ClientConfig)
//! - [`WebRtcMedia`]: VP8 + Opus sample tracks (no device capture)
//! - [`WebRtcPeer`]: one `RTCPeerConnection`

pub mod backend;
pub mod convert;
pub mod media;
pub mod peer;

pub use backend::WebRtcBackend;
pub use media::{TrackKind, WebRtcMedia};
pub use peer::WebRtcPeer;

#[cfg(test)]
mod tests {
    use super::*;
    use tagcall_call::{LocalMedia, PeerEventSink, PeerSession, RtcBackend};
    use tagcall_core::{ClientConfig, IceServerConfig, MediaConstraints, SdpType};

    fn offline_config() -> ClientConfig {
        ClientConfig { ice_servers: Vec::new(), ..ClientConfig::default() }
    }

    #[test]
    fn default_config_uses_public_stun() {
        let backend = WebRtcBackend::new(&ClientConfig::default()).unwrap();
        let urls: Vec<_> = backend.rtc_config().ice_servers.iter().flat_map(|s| s.urls.clone()).collect();
        assert_eq!(urls, ["stun:stun.l.google.com:19302", "stun:stun1.l.google.com:19302"]);

        let custom = ClientConfig { ice_servers: vec![IceServerConfig::stun("stun.example.org")], ..offline_config() };
        let backend = WebRtcBackend::new(&custom).unwrap();
        assert_eq!(backend.rtc_config().ice_servers[0].urls, ["stun:stun.example.org"]);
    }

    #[tokio::test]
    async fn capture_gives_each_call_a_new_stream() {
        let backend = WebRtcBackend::new(&offline_config()).unwrap();
        let first = backend.capture(&MediaConstraints::default()).await.unwrap();
        let second = backend.capture(&MediaConstraints::default()).await.unwrap();
        assert_eq!(first.track_count(), 2);
        assert_ne!(first.stream_id(), second.stream_id());
    }

    #[tokio::test]
    async fn offer_answer_between_two_local_peers() {
        let backend = WebRtcBackend::new(&offline_config()).unwrap();

        let (sink_a, _events_a) = PeerEventSink::detached(1);
        let (sink_b, _events_b) = PeerEventSink::detached(1);
        let media_a = backend.capture(&MediaConstraints::default()).await.unwrap();
        let media_b = backend.capture(&MediaConstraints { video: false, audio: true }).await.unwrap();
        let a = backend.open_peer(media_a, sink_a).await.unwrap();
        let b = backend.open_peer(media_b, sink_b).await.unwrap();

        let offer = a.create_offer().await.unwrap();
        assert_eq!(offer.sdp_type, SdpType::Offer);
        assert!(offer.sdp.contains("m=video"));
        assert!(offer.sdp.contains("m=audio"));

        b.set_remote_description(offer).await.unwrap();
        let answer = b.create_answer().await.unwrap();
        assert_eq!(answer.sdp_type, SdpType::Answer);
        a.set_remote_description(answer).await.unwrap();

        a.close().await.unwrap();
        b.close().await.unwrap();
    }
}
