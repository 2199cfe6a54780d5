//! tagcall-call: the call controller.
//!
//! [`CallMachine`] is the pure state machine: events in, commands out, no
//! I/O. [`CallController`] owns the session (local media, peer connection),
//! runs the single dispatch loop, and executes commands against an
//! [`RtcBackend`], a [`RelaySender`](tagcall_signaling::RelaySender) and a
//! [`CallView`].

pub mod backend;
pub mod controller;
pub mod machine;
pub mod session;
pub mod view;

pub use backend::{LocalMedia, PeerEventSink, PeerSession, RtcBackend, TaggedEvent};
pub use controller::{CallController, UserAction};
pub use machine::{
    BackendEvent, CallEvent, CallMachine, CallPhase, Command, Negotiation,
    CALL_ACTIVE_ALERT, EMPTY_TAG_ALERT,
};
pub use session::CallSession;
pub use view::{CallView, ChatLog, ViewSnapshot, ViewState};

#[cfg(test)]
mod fake;
