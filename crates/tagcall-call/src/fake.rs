//! Recording backend for controller tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tagcall_core::{CallError, IceCandidate, MediaConstraints, SessionDescription};
use tokio::sync::Notify;

use crate::backend::{LocalMedia, PeerEventSink, PeerSession, RtcBackend};

#[derive(Default)]
pub struct FakeLog {
    pub captures: usize,
    pub opens: usize,
    pub closes: usize,
    pub remote_descriptions: Vec<SessionDescription>,
    pub candidates: Vec<IceCandidate>,
    pub media: Vec<Arc<FakeMedia>>,
    pub sinks: Vec<PeerEventSink>,
}

#[derive(Default)]
pub struct FakeBackend {
    log: Arc<Mutex<FakeLog>>,
    fail_capture: bool,
    capture_gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_capture() -> Self {
        Self { fail_capture: true, ..Self::default() }
    }

    /// Capture blocks until the returned gate is notified.
    pub fn gated_capture() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (Self { capture_gate: Some(gate.clone()), ..Self::default() }, gate)
    }

    pub fn log(&self) -> MutexGuard<'_, FakeLog> {
        self.log.lock().unwrap()
    }
}

#[async_trait]
impl RtcBackend for FakeBackend {
    type Media = FakeMedia;
    type Peer = FakePeer;

    async fn capture(&self, _constraints: &MediaConstraints) -> Result<Arc<FakeMedia>, CallError> {
        if let Some(gate) = &self.capture_gate {
            gate.notified().await;
        }
        let mut log = self.log();
        log.captures += 1;
        if self.fail_capture {
            return Err(CallError::PermissionDenied { device: "camera".into() });
        }
        let media = Arc::new(FakeMedia {
            id: format!("local-{}", log.captures),
            stopped: AtomicBool::new(false),
        });
        log.media.push(media.clone());
        Ok(media)
    }

    async fn open_peer(&self, _media: Arc<FakeMedia>, events: PeerEventSink) -> Result<Arc<FakePeer>, CallError> {
        let mut log = self.log();
        log.opens += 1;
        log.sinks.push(events);
        Ok(Arc::new(FakePeer { log: self.log.clone() }))
    }
}

pub struct FakeMedia {
    id: String,
    stopped: AtomicBool,
}

impl FakeMedia {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl LocalMedia for FakeMedia {
    fn stream_id(&self) -> &str {
        &self.id
    }

    fn track_count(&self) -> usize {
        2
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct FakePeer {
    log: Arc<Mutex<FakeLog>>,
}

#[async_trait]
impl PeerSession for FakePeer {
    async fn create_offer(&self) -> Result<SessionDescription, CallError> {
        Ok(SessionDescription::offer("fake-offer"))
    }

    async fn create_answer(&self) -> Result<SessionDescription, CallError> {
        Ok(SessionDescription::answer("fake-answer"))
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), CallError> {
        self.log.lock().unwrap().remote_descriptions.push(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), CallError> {
        self.log.lock().unwrap().candidates.push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<(), CallError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
