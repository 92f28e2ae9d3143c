//! The transport collaborator: the [`SessionTransport`] trait the
//! session engine drives, and its TCP implementation.
//!
//! [`TcpTransport`] owns the socket lifecycle: it frames packets with
//! [`TetherCodec`], splits the stream into background reader/writer
//! tasks bridged by mpsc channels, and runs its own bounded background
//! re-dial when the engine escalates a liveness failure. The engine
//! only ever observes descriptor validity (`is_connected`) — it never
//! touches the socket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::TetherCodec;
use crate::error::TetherError;
use crate::packet::Packet;

/// Depth of the per-direction packet channels.
const CHANNEL_CAPACITY: usize = 128;

/// Background re-dial attempts after a liveness failure.
const RECONNECT_ATTEMPTS: u32 = 3;

/// Pause between background re-dial attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

// ── Endpoint & Identity ──────────────────────────────────────────

/// Remote endpoint identity (host, port).
#[derive(Debug, Clone)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Session identity presented to the server when a link is dialed.
///
/// The secret itself never goes on the wire — only its blake3 digest,
/// inside the attach preamble written before framed traffic begins.
#[derive(Debug, Clone)]
pub struct Identity {
    pub session_id: String,
    pub secret: String,
}

impl Identity {
    pub fn new(session_id: String, secret: String) -> Self {
        Self { session_id, secret }
    }

    /// Attach preamble layout: `id_len: u8`, id bytes, 32-byte
    /// blake3 digest of the secret.
    pub fn attach_preamble(&self) -> Vec<u8> {
        let id = self.session_id.as_bytes();
        let mut buf = Vec::with_capacity(1 + id.len() + blake3::OUT_LEN);
        buf.push(id.len() as u8);
        buf.extend_from_slice(id);
        buf.extend_from_slice(blake3::hash(self.secret.as_bytes()).as_bytes());
        buf
    }
}

// ── SessionTransport trait ───────────────────────────────────────

/// The capability the session engine drives.
///
/// Exclusively owned by one engine for its lifetime; the engine
/// requests shutdown exactly once, on loop exit. Implementations are
/// responsible for framing, authentication, and their own reconnect
/// policy — the engine only reacts to validity and liveness signals.
#[async_trait]
pub trait SessionTransport: Send {
    /// Establish the link. Returns `false` on failure (no panic).
    async fn connect(&mut self) -> bool;

    /// Queue a packet for delivery, in send-call order.
    async fn send(&mut self, packet: Packet) -> Result<(), TetherError>;

    /// Receive the next packet. Must be cancel-safe: the engine races
    /// this against other event sources. `None` means the link is
    /// gone for good (runtime transport fault or closure).
    async fn recv(&mut self) -> Option<Packet>;

    /// Pop an already-buffered packet without blocking.
    fn try_recv(&mut self) -> Option<Packet>;

    /// Whether the transport descriptor is currently valid. Takes
    /// `&mut self` so an implementation may promote a finished
    /// background reconnect here.
    fn is_connected(&mut self) -> bool;

    /// Whether the transport has reached a terminal state: shutdown
    /// was requested, or reconnection was abandoned for good.
    fn is_terminating(&self) -> bool;

    /// Request shutdown. Idempotent.
    fn request_shutdown(&mut self);

    /// Drop the current link and attempt to re-establish it in the
    /// background. The descriptor reads invalid until that completes.
    async fn close_and_reconnect(&mut self);
}

// ── TcpTransport ─────────────────────────────────────────────────

/// One live link: channel halves bridging the engine to the
/// background reader/writer tasks. Dropping it tears both tasks down.
#[derive(Debug)]
struct Link {
    tx: mpsc::Sender<Packet>,
    rx: mpsc::Receiver<Packet>,
}

/// TCP implementation of [`SessionTransport`].
#[derive(Debug)]
pub struct TcpTransport {
    endpoint: Endpoint,
    identity: Identity,
    link: Option<Link>,
    /// Pending background re-dial, if one is in flight.
    redial: Option<oneshot::Receiver<Option<Link>>>,
    /// Packets queued while a re-dial is in flight; flushed on promotion.
    backlog: Vec<Packet>,
    terminating: bool,
}

impl TcpTransport {
    pub fn new(endpoint: Endpoint, identity: Identity) -> Self {
        Self {
            endpoint,
            identity,
            link: None,
            redial: None,
            backlog: Vec::new(),
            terminating: false,
        }
    }

    /// Dial the endpoint, write the attach preamble, and spin up the
    /// reader/writer tasks.
    async fn dial(endpoint: &Endpoint, identity: &Identity) -> Result<Link, TetherError> {
        let mut stream = TcpStream::connect(endpoint.to_string()).await?;
        stream.write_all(&identity.attach_preamble()).await?;
        Ok(Self::spawn_link(stream))
    }

    fn spawn_link(stream: TcpStream) -> Link {
        let (mut net_writer, mut net_reader) = Framed::new(stream, TetherCodec).split();

        // Engine -> Network
        let (user_tx, mut outbound_rx) = mpsc::channel::<Packet>(CHANNEL_CAPACITY);

        // Network -> Engine
        let (inbound_tx, user_rx) = mpsc::channel::<Packet>(CHANNEL_CAPACITY);

        // Writer task: Engine -> Network
        tokio::spawn(async move {
            while let Some(packet) = outbound_rx.recv().await {
                if let Err(e) = net_writer.send(packet).await {
                    warn!("transport write error: {e}");
                    break;
                }
            }
        });

        // Reader task: Network -> Engine
        tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(packet) => {
                        if inbound_tx.send(packet).await.is_err() {
                            // Engine dropped its half; stop reading.
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("transport read error: {e}");
                        break;
                    }
                }
            }
        });

        Link {
            tx: user_tx,
            rx: user_rx,
        }
    }

    /// Claim the result of a finished background re-dial, if any.
    fn promote_redial(&mut self) {
        let Some(rx) = self.redial.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(Some(link)) => {
                self.redial = None;
                for packet in self.backlog.drain(..) {
                    if link.tx.try_send(packet).is_err() {
                        warn!("dropped backlogged packet during reconnect flush");
                    }
                }
                self.link = Some(link);
                info!("transport link re-established to {}", self.endpoint);
            }
            Ok(None) => {
                // No link and no further attempts coming: the session
                // is over, and the engine must observe that and exit
                // instead of idling on a dead descriptor.
                self.redial = None;
                self.terminating = true;
                warn!("transport reconnect to {} gave up", self.endpoint);
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                self.redial = None;
                self.terminating = true;
            }
        }
    }
}

#[async_trait]
impl SessionTransport for TcpTransport {
    async fn connect(&mut self) -> bool {
        match Self::dial(&self.endpoint, &self.identity).await {
            Ok(link) => {
                self.link = Some(link);
                debug!("connected to {}", self.endpoint);
                true
            }
            Err(e) => {
                warn!("connect to {} failed: {e}", self.endpoint);
                false
            }
        }
    }

    async fn send(&mut self, packet: Packet) -> Result<(), TetherError> {
        self.promote_redial();
        if let Some(link) = &self.link {
            link.tx.send(packet).await?;
            Ok(())
        } else if self.redial.is_some() {
            // Link is down but coming back; queue for the flush.
            self.backlog.push(packet);
            Ok(())
        } else {
            Err(TetherError::ChannelClosed)
        }
    }

    async fn recv(&mut self) -> Option<Packet> {
        match self.link.as_mut() {
            Some(link) => link.rx.recv().await,
            None => None,
        }
    }

    fn try_recv(&mut self) -> Option<Packet> {
        self.link.as_mut().and_then(|link| link.rx.try_recv().ok())
    }

    fn is_connected(&mut self) -> bool {
        self.promote_redial();
        self.link.is_some()
    }

    fn is_terminating(&self) -> bool {
        self.terminating
    }

    fn request_shutdown(&mut self) {
        self.terminating = true;
        self.link = None;
        self.redial = None;
        self.backlog.clear();
    }

    async fn close_and_reconnect(&mut self) {
        self.link = None;
        if self.terminating || self.redial.is_some() {
            return;
        }

        let endpoint = self.endpoint.clone();
        let identity = self.identity.clone();
        let (tx, rx) = oneshot::channel();
        self.redial = Some(rx);

        tokio::spawn(async move {
            for attempt in 1..=RECONNECT_ATTEMPTS {
                match TcpTransport::dial(&endpoint, &identity).await {
                    Ok(link) => {
                        let _ = tx.send(Some(link));
                        return;
                    }
                    Err(e) => {
                        warn!("reconnect attempt {attempt}/{RECONNECT_ATTEMPTS} to {endpoint} failed: {e}");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
            let _ = tx.send(None);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_display() {
        let endpoint = Endpoint::new("example.com".to_string(), 2022);
        assert_eq!(endpoint.to_string(), "example.com:2022");
        assert_eq!(endpoint.host(), "example.com");
        assert_eq!(endpoint.port(), 2022);
    }

    #[test]
    fn attach_preamble_layout() {
        let identity = Identity::new("sess-1".to_string(), "hunter2".to_string());
        let preamble = identity.attach_preamble();
        assert_eq!(preamble[0] as usize, "sess-1".len());
        assert_eq!(&preamble[1..7], b"sess-1");
        assert_eq!(preamble.len(), 1 + 6 + blake3::OUT_LEN);
        // The raw secret must not appear in the preamble.
        assert!(
            !preamble
                .windows("hunter2".len())
                .any(|w| w == b"hunter2")
        );
    }
}
