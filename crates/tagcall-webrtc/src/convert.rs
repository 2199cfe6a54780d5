//! Conversions between tagcall wire types and webrtc-rs types.

use tagcall_core::{CallError, IceCandidate, IceServerConfig, SdpType, SessionDescription};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

pub fn negotiation_error(context: &str, err: webrtc::Error) -> CallError {
    CallError::Negotiation { reason: format!("{context}: {err}") }
}

pub fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, CallError> {
    let SessionDescription { sdp_type, sdp } = desc;
    match sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(sdp),
        SdpType::Answer => RTCSessionDescription::answer(sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(sdp),
        SdpType::Rollback => {
            return Err(CallError::Negotiation { reason: "rollback descriptions are not supported".into() })
        }
    }
    .map_err(|e| negotiation_error("invalid session description", e))
}

pub fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription, CallError> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        other => {
            return Err(CallError::Negotiation { reason: format!("unsupported description type {other:?}") })
        }
    };
    Ok(SessionDescription { sdp_type, sdp: desc.sdp })
}

pub fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_mline_index,
        username_fragment: candidate.username_fragment,
    }
}

pub fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_mline_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

pub fn to_rtc_ice_servers(servers: &[IceServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|server| RTCIceServer {
            urls: vec![server.url_with_scheme()],
            username: server.username.clone().unwrap_or_default(),
            credential: server.credential.clone().unwrap_or_default(),
        })
        .collect()
}
