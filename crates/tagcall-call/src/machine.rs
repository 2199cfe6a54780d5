//! Call state machine.
//!
//! ```text
//!          toggle(tag)           pair{peerId} / offer        answer / answer sent
//!   Idle ───────────────► Capturing ─────────────────► Negotiating ─────────────► Connected
//!    ▲                                                                                │
//!    └──────────────────────────────── toggle (hang-up) ◄─────────────────────────────┘
//! ```
//!
//! [`CallMachine::handle`] maps one [`CallEvent`] to a list of [`Command`]s
//! for the controller to execute. It never performs I/O.
//!
//! Every start opens a new *epoch*. Backend completions carry the epoch they
//! were issued under; completions from an older epoch are dropped so that
//! results arriving after a hang-up cannot revive the call.

use tagcall_core::{
    CandidatePolicy, ChatEntry, IceCandidate, InboundEnvelope, OutboundEnvelope,
    SessionDescription, Tag, UserId,
};
use tracing::{debug, info, warn};

pub const EMPTY_TAG_ALERT: &str = "Please enter a tag!";
pub const CALL_ACTIVE_ALERT: &str = "A call is already active; hang up first.";

// ── Phase ─────────────────────────────────────────────────────────────────────

/// Which side produced the first session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// We were paired and sent the offer.
    LocalInitiated { peer_id: String },
    /// The peer's offer arrived first; we answer.
    RemoteInitiated,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallPhase {
    #[default]
    Idle,
    Capturing { media_ready: bool },
    Negotiating(Negotiation),
    Connected(Negotiation),
}

impl CallPhase {
    pub fn label(&self) -> &'static str {
        match self {
            CallPhase::Idle => "idle",
            CallPhase::Capturing { .. } => "capturing",
            CallPhase::Negotiating(_) => "negotiating",
            CallPhase::Connected(_) => "connected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteDescription {
    Unset,
    Applying,
    Applied,
}

// ── Events and commands ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// Start/stop control. Starts with `tag` when idle, hangs up otherwise.
    ToggleCall { tag: String },
    /// Start-only control. Ignored with an alert while a call is active.
    StartCall { tag: String },
    /// Unconditional hang-up.
    Hangup,
    SendMessage { text: String },
    Relay(InboundEnvelope),
    Backend { epoch: u64, event: BackendEvent },
}

/// Completions and callbacks reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    MediaReady { stream_id: String },
    MediaFailed { reason: String },
    PeerOpened,
    /// Offer or answer, already applied locally.
    LocalDescription(SessionDescription),
    RemoteDescriptionApplied,
    NegotiationFailed { reason: String },
    LocalCandidate(IceCandidate),
    RemoteStream { stream_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Alert(String),
    Send(OutboundEnvelope),
    CaptureMedia { epoch: u64 },
    OpenPeer { epoch: u64 },
    CreateOffer { epoch: u64 },
    CreateAnswer { epoch: u64 },
    ApplyRemoteDescription { epoch: u64, description: SessionDescription },
    AddRemoteCandidate(IceCandidate),
    ShowLocalPreview(Option<String>),
    ShowRemotePreview(Option<String>),
    AppendChat(ChatEntry),
    ClearMessageInput,
    CallActiveChanged(bool),
    /// Close the peer connection, keeping local media.
    ClosePeer,
    /// Close the peer connection and stop every local track.
    Teardown,
}

// ── CallMachine ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CallMachine {
    user_id: UserId,
    policy: CandidatePolicy,
    phase: CallPhase,
    call_active: bool,
    peer_id: Option<String>,
    epoch: u64,
    peer_open: bool,
    remote: RemoteDescription,
    pending_offer: Option<SessionDescription>,
    pending_candidates: Vec<IceCandidate>,
    remote_stream_shown: bool,
}

impl CallMachine {
    pub fn new(user_id: UserId, policy: CandidatePolicy) -> Self {
        Self {
            user_id,
            policy,
            phase: CallPhase::Idle,
            call_active: false,
            peer_id: None,
            epoch: 0,
            peer_open: false,
            remote: RemoteDescription::Unset,
            pending_offer: None,
            pending_candidates: Vec::new(),
            remote_stream_shown: false,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn phase(&self) -> &CallPhase {
        &self.phase
    }

    pub fn call_active(&self) -> bool {
        self.call_active
    }

    pub fn is_paired(&self) -> bool {
        self.peer_id.is_some()
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.call_active && epoch == self.epoch
    }

    pub fn remote_description_applied(&self) -> bool {
        self.remote == RemoteDescription::Applied
    }

    pub fn buffered_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn handle(&mut self, event: CallEvent) -> Vec<Command> {
        match event {
            CallEvent::ToggleCall { tag } => {
                if self.call_active {
                    self.hang_up()
                } else {
                    self.start(&tag)
                }
            }
            CallEvent::StartCall { tag } => {
                if self.call_active {
                    debug!("Start ignored: call already active (epoch={})", self.epoch);
                    return vec![Command::Alert(CALL_ACTIVE_ALERT.to_owned())];
                }
                self.start(&tag)
            }
            CallEvent::Hangup => self.hang_up(),
            CallEvent::SendMessage { text } => self.send_message(text),
            CallEvent::Relay(envelope) => self.on_relay(envelope),
            CallEvent::Backend { epoch, event } => {
                if !self.is_current(epoch) {
                    debug!("Dropping stale backend event (epoch {} != {}): {:?}", epoch, self.epoch, event);
                    return Vec::new();
                }
                self.on_backend(event)
            }
        }
    }

    // ── User actions ─────────────────────────────────────────────────────────

    fn start(&mut self, raw_tag: &str) -> Vec<Command> {
        let tag = match Tag::parse(raw_tag) {
            Ok(tag) => tag,
            Err(e) => {
                debug!("Start rejected: {}", e);
                return vec![Command::Alert(EMPTY_TAG_ALERT.to_owned())];
            }
        };

        self.epoch += 1;
        self.call_active = true;
        self.phase = CallPhase::Capturing { media_ready: false };
        info!("Call started with tag '{}' (epoch={})", tag, self.epoch);

        vec![
            Command::Send(OutboundEnvelope::Pair { user_id: self.user_id.clone(), tag }),
            Command::CaptureMedia { epoch: self.epoch },
            Command::CallActiveChanged(true),
        ]
    }

    fn hang_up(&mut self) -> Vec<Command> {
        if self.call_active {
            info!("Call ended (epoch={}, phase={})", self.epoch, self.phase.label());
        }
        self.reset();
        vec![
            Command::Teardown,
            Command::ShowLocalPreview(None),
            Command::ShowRemotePreview(None),
            Command::CallActiveChanged(false),
        ]
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.call_active = false;
        self.phase = CallPhase::Idle;
        self.peer_id = None;
        self.peer_open = false;
        self.remote = RemoteDescription::Unset;
        self.pending_offer = None;
        self.pending_candidates.clear();
        self.remote_stream_shown = false;
    }

    fn send_message(&mut self, text: String) -> Vec<Command> {
        if text.is_empty() {
            return Vec::new();
        }
        vec![
            Command::Send(OutboundEnvelope::Message {
                message: text.clone(),
                user_id: self.user_id.clone(),
            }),
            Command::AppendChat(ChatEntry::local(text)),
            Command::ClearMessageInput,
        ]
    }

    // ── Relay envelopes ──────────────────────────────────────────────────────

    fn on_relay(&mut self, envelope: InboundEnvelope) -> Vec<Command> {
        match envelope {
            InboundEnvelope::Pair { peer_id } => self.on_paired(peer_id),
            InboundEnvelope::Offer { offer, .. } => self.on_offer(offer),
            InboundEnvelope::Answer { answer } => self.on_answer(answer),
            InboundEnvelope::Candidate { candidate, .. } => self.on_remote_candidate(candidate),
            InboundEnvelope::Message { message, user_id } => {
                if user_id.as_deref() == Some(self.user_id.as_str()) {
                    return Vec::new();
                }
                vec![Command::AppendChat(ChatEntry::peer(message))]
            }
        }
    }

    fn on_paired(&mut self, peer_id: String) -> Vec<Command> {
        if !self.call_active {
            debug!("Ignoring pair response for {} while no call is active", peer_id);
            return Vec::new();
        }
        if let Some(current) = &self.peer_id {
            debug!("Already paired with {}; ignoring pair response for {}", current, peer_id);
            return Vec::new();
        }

        info!("Paired with {}", peer_id);
        self.peer_id = Some(peer_id.clone());

        match self.phase {
            CallPhase::Capturing { media_ready: true } if self.pending_offer.is_none() => {
                self.phase = CallPhase::Negotiating(Negotiation::LocalInitiated { peer_id });
                vec![Command::OpenPeer { epoch: self.epoch }]
            }
            // Media still pending: the connection opens once capture completes.
            _ => Vec::new(),
        }
    }

    fn on_offer(&mut self, offer: SessionDescription) -> Vec<Command> {
        if !self.call_active {
            debug!("Ignoring offer while no call is active");
            return Vec::new();
        }
        match self.phase {
            CallPhase::Capturing { media_ready } => {
                if self.pending_offer.is_some() {
                    debug!("Offer already pending; ignoring duplicate");
                    return Vec::new();
                }
                self.pending_offer = Some(offer);
                if media_ready {
                    self.phase = CallPhase::Negotiating(Negotiation::RemoteInitiated);
                    vec![Command::OpenPeer { epoch: self.epoch }]
                } else {
                    Vec::new()
                }
            }
            CallPhase::Negotiating(Negotiation::LocalInitiated { ref peer_id }) => {
                if self.user_id.as_str() > peer_id.as_str() {
                    info!("Offer collision with {}; dropping our offer and answering", peer_id);
                    self.yield_to_offer(offer)
                } else {
                    warn!("Offer collision with {}; keeping our offer", peer_id);
                    Vec::new()
                }
            }
            _ => {
                debug!("Ignoring offer in phase {}", self.phase.label());
                Vec::new()
            }
        }
    }

    /// Both sides offered. The side with the greater user id discards its
    /// connection and answers on a fresh one; the other keeps its offer.
    /// Local media survives; the new epoch drops completions of the old peer.
    fn yield_to_offer(&mut self, offer: SessionDescription) -> Vec<Command> {
        self.epoch += 1;
        self.peer_open = false;
        self.remote = RemoteDescription::Unset;
        self.remote_stream_shown = false;
        self.pending_offer = Some(offer);
        self.phase = CallPhase::Negotiating(Negotiation::RemoteInitiated);
        vec![Command::ClosePeer, Command::OpenPeer { epoch: self.epoch }]
    }

    fn on_answer(&mut self, answer: SessionDescription) -> Vec<Command> {
        match &self.phase {
            CallPhase::Negotiating(negotiation @ Negotiation::LocalInitiated { .. })
                if self.peer_open && self.remote == RemoteDescription::Unset =>
            {
                self.phase = CallPhase::Connected(negotiation.clone());
                self.remote = RemoteDescription::Applying;
                vec![Command::ApplyRemoteDescription { epoch: self.epoch, description: answer }]
            }
            _ => {
                debug!("Ignoring answer in phase {}", self.phase.label());
                Vec::new()
            }
        }
    }

    fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Vec<Command> {
        if !self.call_active {
            debug!("Ignoring remote candidate while no call is active");
            return Vec::new();
        }
        if self.remote == RemoteDescription::Applied {
            return vec![Command::AddRemoteCandidate(candidate)];
        }
        match self.policy {
            CandidatePolicy::Buffer => {
                self.pending_candidates.push(candidate);
                debug!("Buffered remote candidate ({} pending)", self.pending_candidates.len());
            }
            CandidatePolicy::Drop => {
                debug!("Dropping remote candidate received before remote description");
            }
        }
        Vec::new()
    }

    // ── Backend completions ──────────────────────────────────────────────────

    fn on_backend(&mut self, event: BackendEvent) -> Vec<Command> {
        match event {
            BackendEvent::MediaReady { stream_id } => self.on_media_ready(stream_id),
            BackendEvent::MediaFailed { reason } => {
                warn!("Error accessing camera/microphone: {}", reason);
                self.reset();
                vec![Command::Teardown, Command::CallActiveChanged(false)]
            }
            BackendEvent::PeerOpened => self.on_peer_opened(),
            BackendEvent::LocalDescription(description) => self.on_local_description(description),
            BackendEvent::RemoteDescriptionApplied => self.on_remote_applied(),
            BackendEvent::NegotiationFailed { reason } => {
                warn!("Negotiation failed: {}", reason);
                self.hang_up()
            }
            BackendEvent::LocalCandidate(candidate) => vec![Command::Send(OutboundEnvelope::Candidate {
                candidate,
                peer_id: self.peer_id.clone(),
            })],
            BackendEvent::RemoteStream { stream_id } => {
                if self.remote_stream_shown {
                    return Vec::new();
                }
                self.remote_stream_shown = true;
                vec![Command::ShowRemotePreview(Some(stream_id))]
            }
        }
    }

    fn on_media_ready(&mut self, stream_id: String) -> Vec<Command> {
        if self.phase != (CallPhase::Capturing { media_ready: false }) {
            debug!("Media ready in phase {}; ignoring", self.phase.label());
            return Vec::new();
        }
        self.phase = CallPhase::Capturing { media_ready: true };
        let mut commands = vec![Command::ShowLocalPreview(Some(stream_id))];

        if self.pending_offer.is_some() {
            self.phase = CallPhase::Negotiating(Negotiation::RemoteInitiated);
            commands.push(Command::OpenPeer { epoch: self.epoch });
        } else if let Some(peer_id) = self.peer_id.clone() {
            self.phase = CallPhase::Negotiating(Negotiation::LocalInitiated { peer_id });
            commands.push(Command::OpenPeer { epoch: self.epoch });
        }
        commands
    }

    fn on_peer_opened(&mut self) -> Vec<Command> {
        self.peer_open = true;
        match &self.phase {
            CallPhase::Negotiating(Negotiation::LocalInitiated { .. }) => {
                vec![Command::CreateOffer { epoch: self.epoch }]
            }
            CallPhase::Negotiating(Negotiation::RemoteInitiated) => match self.pending_offer.take() {
                Some(offer) => {
                    self.remote = RemoteDescription::Applying;
                    vec![Command::ApplyRemoteDescription { epoch: self.epoch, description: offer }]
                }
                None => {
                    warn!("Peer opened for an answer but no offer is pending");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }

    fn on_local_description(&mut self, description: SessionDescription) -> Vec<Command> {
        match &self.phase {
            CallPhase::Negotiating(Negotiation::LocalInitiated { peer_id }) => {
                vec![Command::Send(OutboundEnvelope::Offer { offer: description, peer_id: peer_id.clone() })]
            }
            CallPhase::Negotiating(Negotiation::RemoteInitiated) => {
                self.phase = CallPhase::Connected(Negotiation::RemoteInitiated);
                vec![Command::Send(OutboundEnvelope::Answer { answer: description })]
            }
            _ => {
                debug!("Local description in phase {}; not sent", self.phase.label());
                Vec::new()
            }
        }
    }

    fn on_remote_applied(&mut self) -> Vec<Command> {
        self.remote = RemoteDescription::Applied;
        let mut commands: Vec<Command> = self
            .pending_candidates
            .drain(..)
            .map(Command::AddRemoteCandidate)
            .collect();
        if !commands.is_empty() {
            debug!("Flushing {} buffered remote candidates", commands.len());
        }
        if self.phase == CallPhase::Negotiating(Negotiation::RemoteInitiated) {
            commands.push(Command::CreateAnswer { epoch: self.epoch });
        }
        commands
    }
}
