//! WebSocket relay **client**.
//!
//! # Lifecycle
//!
//! ```text
//! 1. RelayClient::connect(url)
//! 2. let (sender, inbound) = client.start()
//!       ├─ sender: RelaySender, cloneable, fire-and-forget
//!       └─ inbound: channel of decoded InboundEnvelopes
//! 3. sender.send(envelope)      ← dropped silently once the socket is gone
//! 4. inbound.recv() == None     ← relay closed the connection
//! ```

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tagcall_core::{InboundEnvelope, OutboundEnvelope, RelayError};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{error::ProtocolError, Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound envelopes buffered between the reader task and the consumer.
pub const INBOUND_CAPACITY: usize = 256;

// ── RelayClient ───────────────────────────────────────────────────────────────

/// An open WebSocket to the relay server.
///
/// Use [`RelayClient::connect`] to open the connection, then
/// [`start`](RelayClient::start) to obtain a [`RelaySender`] and the inbound
/// envelope stream.
pub struct RelayClient {
    stream: RelayStream,
    url: String,
}

impl RelayClient {
    /// Connect to `url` (`ws://` or `wss://`).
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        let (stream, response) = connect_async(url).await.map_err(|e| RelayError::Connect {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        info!("Relay connected to {} (HTTP {})", url, response.status());
        Ok(Self { stream, url: url.to_owned() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Consume the client, spawning the writer and reader tasks.
    ///
    /// Returns:
    /// - [`RelaySender`]: queues envelopes for the writer task
    /// - `Receiver<InboundEnvelope>`: decoded frames, in arrival order
    pub fn start(self) -> (RelaySender, mpsc::Receiver<InboundEnvelope>) {
        let (sender, out_rx) = RelaySender::channel();
        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (sink, source) = self.stream.split();

        tokio::spawn(write_loop(sink, out_rx, self.url.clone()));
        tokio::spawn(read_loop(source, in_tx, self.url));

        (sender, in_rx)
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

async fn write_loop(
    mut sink: SplitSink<RelayStream, Message>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundEnvelope>,
    url: String,
) {
    while let Some(envelope) = out_rx.recv().await {
        let text = match envelope.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {} envelope: {}", envelope.kind(), e);
                continue;
            }
        };
        let len = text.len();
        if let Err(e) = sink.send(Message::Text(text)).await {
            debug!("Relay write to {} failed: {}; dropping further sends", url, e);
            break;
        }
        debug!("Sent {} ({} bytes)", envelope.kind(), len);
    }
    let _ = sink.close().await;
    debug!("Relay writer for {} exiting", url);
}

async fn read_loop(
    mut source: SplitStream<RelayStream>,
    in_tx: mpsc::Sender<InboundEnvelope>,
    url: String,
) {
    while let Some(frame) = source.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    debug!("Ignoring non-UTF-8 binary frame from {}", url);
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                info!("Relay {} closed the connection: {:?}", url, frame);
                break;
            }
            Ok(_) => continue,
            Err(err) => {
                match &err {
                    WsError::ConnectionClosed
                    | WsError::AlreadyClosed
                    | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                        debug!("Relay {} closed: {}", url, err);
                    }
                    _ => warn!("Relay {} receive error: {}", url, err),
                }
                break;
            }
        };

        let Some(envelope) = InboundEnvelope::decode(&text) else {
            continue;
        };
        debug!("Received {} ({} bytes)", envelope.kind(), text.len());
        if in_tx.send(envelope).await.is_err() {
            debug!("Inbound channel closed; stopping relay reader for {}", url);
            return;
        }
    }
    debug!("Relay reader for {} exiting", url);
}

// ── RelaySender ───────────────────────────────────────────────────────────────

/// Fire-and-forget handle to the relay writer. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RelaySender {
    tx: mpsc::UnboundedSender<OutboundEnvelope>,
}

impl RelaySender {
    /// A sender wired to a plain channel instead of a socket.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `envelope`; silently dropped if the connection is gone.
    pub fn send(&self, envelope: OutboundEnvelope) {
        if let Err(e) = self.try_send(envelope) {
            debug!("{}; envelope dropped", e);
        }
    }

    pub fn try_send(&self, envelope: OutboundEnvelope) -> Result<(), RelayError> {
        self.tx.send(envelope).map_err(|_| RelayError::Closed)
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
