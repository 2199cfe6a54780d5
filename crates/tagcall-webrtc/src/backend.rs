use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tagcall_call::{LocalMedia, PeerEventSink, RtcBackend};
use tagcall_core::{CallError, ClientConfig, MediaConstraints};
use tracing::info;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;

use crate::convert::{negotiation_error, to_rtc_ice_servers};
use crate::media::WebRtcMedia;
use crate::peer::WebRtcPeer;

/// [`RtcBackend`] on webrtc-rs.
pub struct WebRtcBackend {
    api: API,
    rtc_config: RTCConfiguration,
    streams: AtomicU64,
}

impl WebRtcBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, CallError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| CallError::Backend { reason: format!("register codecs: {e}") })?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| CallError::Backend { reason: format!("register interceptors: {e}") })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration { ice_servers: to_rtc_ice_servers(&config.ice_servers), ..Default::default() };
        info!("WebRTC backend ready ({} ICE server(s))", rtc_config.ice_servers.len());
        Ok(Self { api, rtc_config, streams: AtomicU64::new(0) })
    }

    pub fn rtc_config(&self) -> &RTCConfiguration {
        &self.rtc_config
    }
}

#[async_trait]
impl RtcBackend for WebRtcBackend {
    type Media = WebRtcMedia;
    type Peer = WebRtcPeer;

    async fn capture(&self, constraints: &MediaConstraints) -> Result<Arc<WebRtcMedia>, CallError> {
        let stream_id = format!("tagcall-stream-{}", self.streams.fetch_add(1, Ordering::Relaxed) + 1);
        WebRtcMedia::new(stream_id, constraints).map(Arc::new)
    }

    async fn open_peer(&self, media: Arc<WebRtcMedia>, events: PeerEventSink) -> Result<Arc<WebRtcPeer>, CallError> {
        let pc = self
            .api
            .new_peer_connection(self.rtc_config.clone())
            .await
            .map_err(|e| negotiation_error("new_peer_connection", e))?;
        let epoch = events.epoch();
        let peer = WebRtcPeer::attach(Arc::new(pc), &media, events).await?;
        info!("Peer connection opened with {} local track(s) (epoch={})", media.track_count(), epoch);
        Ok(Arc::new(peer))
    }
}
