//! Async driver around [`CallMachine`].
//!
//! # Flow
//!
//! ```text
//!  relay inbound ─┐
//!  user actions ──┼──► select! ──► CallMachine::handle ──► Vec<Command> ──► execute
//!  completions ───┘                                                          │
//!       ▲                                                                    │
//!       └──────────── spawned backend tasks (capture, open, offer, …) ◄──────┘
//! ```
//!
//! The controller is the only owner of the [`CallSession`]. Backend work is
//! spawned and reports back through channels stamped with the epoch it was
//! issued under.

use std::sync::Arc;

use tagcall_core::{CallError, ClientConfig, IceCandidate, InboundEnvelope, MediaConstraints, UserId};
use tagcall_signaling::RelaySender;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{LocalMedia, PeerEventSink, PeerSession, RtcBackend, TaggedEvent};
use crate::machine::{BackendEvent, CallEvent, CallMachine, Command};
use crate::session::CallSession;
use crate::view::CallView;

/// Input from the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// The start/stop control, with the current contents of the tag field.
    ToggleCall { tag: String },
    /// Start-only control for front-ends with separate start and stop commands.
    StartCall { tag: String },
    SendMessage { text: String },
    Hangup,
    /// Hang up and leave the dispatch loop.
    Shutdown,
}

enum Completion<B: RtcBackend> {
    Media { epoch: u64, result: Result<Arc<B::Media>, CallError> },
    Peer { epoch: u64, result: Result<Arc<B::Peer>, CallError> },
}

struct Receivers<B: RtcBackend> {
    completions: mpsc::UnboundedReceiver<Completion<B>>,
    events: mpsc::UnboundedReceiver<TaggedEvent>,
}

pub struct CallController<B: RtcBackend, V: CallView> {
    machine: CallMachine,
    session: CallSession<B>,
    backend: Arc<B>,
    relay: RelaySender,
    view: V,
    constraints: MediaConstraints,
    /// Feeds remote candidates, in order, to the current peer.
    candidates: Option<mpsc::UnboundedSender<IceCandidate>>,
    completion_tx: mpsc::UnboundedSender<Completion<B>>,
    event_tx: mpsc::UnboundedSender<TaggedEvent>,
    receivers: Option<Receivers<B>>,
}

impl<B: RtcBackend, V: CallView> CallController<B, V> {
    pub fn new(user_id: UserId, config: &ClientConfig, backend: Arc<B>, relay: RelaySender, view: V) -> Self {
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        Self {
            machine: CallMachine::new(user_id.clone(), config.candidate_policy),
            session: CallSession::new(user_id),
            backend,
            relay,
            view,
            constraints: config.media,
            candidates: None,
            completion_tx,
            event_tx,
            receivers: Some(Receivers { completions, events }),
        }
    }

    pub fn user_id(&self) -> &UserId {
        self.session.user_id()
    }

    /// Dispatch loop. Returns after [`UserAction::Shutdown`] or once the
    /// action channel closes, with the call torn down.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<InboundEnvelope>,
        mut actions: mpsc::Receiver<UserAction>,
    ) {
        let Some(Receivers { mut completions, mut events }) = self.receivers.take() else {
            warn!("Call controller started twice");
            return;
        };
        let mut relay_open = true;
        info!("Call controller running as {}", self.user_id());

        loop {
            tokio::select! {
                envelope = inbound.recv(), if relay_open => match envelope {
                    Some(envelope) => self.dispatch(CallEvent::Relay(envelope)).await,
                    None => {
                        info!("Relay stream ended; no further signaling will arrive");
                        relay_open = false;
                    }
                },
                action = actions.recv() => match action {
                    Some(UserAction::ToggleCall { tag }) => self.dispatch(CallEvent::ToggleCall { tag }).await,
                    Some(UserAction::StartCall { tag }) => self.dispatch(CallEvent::StartCall { tag }).await,
                    Some(UserAction::SendMessage { text }) => self.dispatch(CallEvent::SendMessage { text }).await,
                    Some(UserAction::Hangup) => self.dispatch(CallEvent::Hangup).await,
                    Some(UserAction::Shutdown) | None => break,
                },
                Some(completion) = completions.recv() => self.on_completion(completion).await,
                Some((epoch, event)) = events.recv() => self.dispatch(CallEvent::Backend { epoch, event }).await,
            }
        }

        if self.machine.call_active() || self.session.has_peer() {
            self.dispatch(CallEvent::Hangup).await;
        }
        info!("Call controller stopped");
    }

    async fn dispatch(&mut self, event: CallEvent) {
        for command in self.machine.handle(event) {
            self.execute(command).await;
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::Alert(message) => self.view.alert(&message),
            Command::Send(envelope) => self.relay.send(envelope),
            Command::CaptureMedia { epoch } => {
                let backend = self.backend.clone();
                let constraints = self.constraints;
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let result = backend.capture(&constraints).await;
                    let _ = tx.send(Completion::Media { epoch, result });
                });
            }
            Command::OpenPeer { epoch } => {
                let Some(media) = self.session.media().cloned() else {
                    self.post(epoch, BackendEvent::NegotiationFailed { reason: "no local media".into() });
                    return;
                };
                let backend = self.backend.clone();
                let sink = PeerEventSink::new(epoch, self.event_tx.clone());
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let result = backend.open_peer(media, sink).await;
                    let _ = tx.send(Completion::Peer { epoch, result });
                });
            }
            Command::CreateOffer { epoch } => self.spawn_peer_op(epoch, |peer| async move {
                peer.create_offer().await.map(BackendEvent::LocalDescription)
            }),
            Command::CreateAnswer { epoch } => self.spawn_peer_op(epoch, |peer| async move {
                peer.create_answer().await.map(BackendEvent::LocalDescription)
            }),
            Command::ApplyRemoteDescription { epoch, description } => {
                self.spawn_peer_op(epoch, |peer| async move {
                    peer.set_remote_description(description).await?;
                    Ok(BackendEvent::RemoteDescriptionApplied)
                })
            }
            Command::AddRemoteCandidate(candidate) => {
                let delivered = self.candidates.as_ref().is_some_and(|tx| tx.send(candidate).is_ok());
                if !delivered {
                    debug!("No peer connection; remote candidate dropped");
                }
            }
            Command::ShowLocalPreview(stream) => self.view.show_local_preview(stream.as_deref()),
            Command::ShowRemotePreview(stream) => self.view.show_remote_preview(stream.as_deref()),
            Command::AppendChat(entry) => self.view.append_chat(&entry),
            Command::ClearMessageInput => self.view.clear_message_input(),
            Command::CallActiveChanged(active) => self.view.call_active_changed(active),
            Command::ClosePeer => {
                self.candidates = None;
                self.session.close_peer().await;
            }
            Command::Teardown => {
                self.candidates = None;
                self.session.teardown().await;
            }
        }
    }

    async fn on_completion(&mut self, completion: Completion<B>) {
        match completion {
            Completion::Media { epoch, result: Ok(media) } => {
                if !self.machine.is_current(epoch) {
                    debug!("Stopping media captured for stale epoch {}", epoch);
                    media.stop();
                    return;
                }
                let stream_id = media.stream_id().to_owned();
                info!("Local media ready: {} ({} track(s))", stream_id, media.track_count());
                self.session.set_media(media);
                self.dispatch(CallEvent::Backend { epoch, event: BackendEvent::MediaReady { stream_id } }).await;
            }
            Completion::Media { epoch, result: Err(e) } => {
                let event = BackendEvent::MediaFailed { reason: e.to_string() };
                self.dispatch(CallEvent::Backend { epoch, event }).await;
            }
            Completion::Peer { epoch, result: Ok(peer) } => {
                if !self.machine.is_current(epoch) || self.session.has_peer() {
                    debug!("Closing peer connection opened for stale epoch {}", epoch);
                    tokio::spawn(async move {
                        let _ = peer.close().await;
                    });
                    return;
                }
                self.candidates = Some(spawn_candidate_pump(peer.clone()));
                self.session.set_peer(peer);
                self.dispatch(CallEvent::Backend { epoch, event: BackendEvent::PeerOpened }).await;
            }
            Completion::Peer { epoch, result: Err(e) } => {
                let event = BackendEvent::NegotiationFailed { reason: e.to_string() };
                self.dispatch(CallEvent::Backend { epoch, event }).await;
            }
        }
    }

    /// Runs `op` against the current peer on a spawned task. Errors are
    /// reported as [`BackendEvent::NegotiationFailed`].
    fn spawn_peer_op<F, Fut>(&self, epoch: u64, op: F)
    where
        F: FnOnce(Arc<B::Peer>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<BackendEvent, CallError>> + Send + 'static,
    {
        let Some(peer) = self.session.peer().cloned() else {
            self.post(epoch, BackendEvent::NegotiationFailed { reason: "no peer connection".into() });
            return;
        };
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = op(peer)
                .await
                .unwrap_or_else(|e| BackendEvent::NegotiationFailed { reason: e.to_string() });
            let _ = tx.send((epoch, event));
        });
    }

    fn post(&self, epoch: u64, event: BackendEvent) {
        let _ = self.event_tx.send((epoch, event));
    }
}

fn spawn_candidate_pump<P: PeerSession>(peer: Arc<P>) -> mpsc::UnboundedSender<IceCandidate> {
    let (tx, mut rx) = mpsc::unbounded_channel::<IceCandidate>();
    tokio::spawn(async move {
        while let Some(candidate) = rx.recv().await {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!("Failed to add remote ICE candidate: {}", e);
            }
        }
    });
    tx
}
