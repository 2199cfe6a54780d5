use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tagcall_call::LocalMedia;
use tagcall_core::{CallError, MediaConstraints};
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    fn track_id(self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }

    fn codec(self) -> RTCRtpCodecCapability {
        match self {
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90_000,
                ..Default::default()
            },
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
        }
    }
}

/// Local stream: one VP8 and/or one Opus sample track sharing a stream id.
///
/// No capture device is opened. The tracks are negotiated but
/// carry no samples.
pub struct WebRtcMedia {
    stream_id: String,
    tracks: Vec<(TrackKind, Arc<TrackLocalStaticSample>)>,
    stopped: AtomicBool,
}

impl WebRtcMedia {
    pub fn new(stream_id: impl Into<String>, constraints: &MediaConstraints) -> Result<Self, CallError> {
        let stream_id = stream_id.into();
        let kinds = [(constraints.video, TrackKind::Video), (constraints.audio, TrackKind::Audio)];
        let tracks: Vec<_> = kinds
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, kind)| {
                let track = TrackLocalStaticSample::new(kind.codec(), kind.track_id().to_owned(), stream_id.clone());
                (kind, Arc::new(track))
            })
            .collect();

        if tracks.is_empty() {
            return Err(CallError::MediaUnavailable { reason: "neither audio nor video requested".into() });
        }
        debug!("Created {} local track(s) for stream {}", tracks.len(), stream_id);
        Ok(Self { stream_id, tracks, stopped: AtomicBool::new(false) })
    }

    pub fn track(&self, kind: TrackKind) -> Option<&Arc<TrackLocalStaticSample>> {
        self.tracks.iter().find(|(k, _)| *k == kind).map(|(_, track)| track)
    }

    /// Every track, in the form `RTCPeerConnection::add_track` takes.
    pub fn rtc_tracks(&self) -> Vec<Arc<dyn TrackLocal + Send + Sync>> {
        self.tracks
            .iter()
            .map(|(_, track)| Arc::clone(track) as Arc<dyn TrackLocal + Send + Sync>)
            .collect()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl LocalMedia for WebRtcMedia {
    fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!("Local stream {} stopped", self.stream_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_follow_constraints() {
        let both = WebRtcMedia::new("s", &MediaConstraints::default()).unwrap();
        assert_eq!(both.track_count(), 2);
        assert!(both.track(TrackKind::Video).is_some());
        assert_eq!(both.track(TrackKind::Audio).unwrap().stream_id(), "s");

        let audio_only = WebRtcMedia::new("s", &MediaConstraints { video: false, audio: true }).unwrap();
        assert_eq!(audio_only.track_count(), 1);
        assert!(audio_only.track(TrackKind::Video).is_none());
    }

    #[test]
    fn no_tracks_requested_is_an_error() {
        let err = WebRtcMedia::new("s", &MediaConstraints { video: false, audio: false }).err();
        assert!(matches!(err, Some(CallError::MediaUnavailable { .. })));
    }

    #[test]
    fn stop_is_idempotent() {
        let media = WebRtcMedia::new("s", &MediaConstraints::default()).unwrap();
        assert!(!media.is_stopped());
        media.stop();
        media.stop();
        assert!(media.is_stopped());
    }
}
