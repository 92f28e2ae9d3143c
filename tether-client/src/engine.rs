//! Session engine: handshake with bounded retry, the multiplexed main
//! loop, and the packet dispatcher.
//!
//! The engine is the single thread of control. Each loop iteration
//! waits on exactly one suspension point — local input, transport
//! receive, or a 10 ms poll tick — then runs a fixed sequence: input
//! first, then a full drain of buffered transport packets, then the
//! keepalive watchdog, then the resize detector. The bounded tick is
//! what lets the two tick functions make progress when no I/O event
//! occurs; it blocks in the interval, so there is no busy-waiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use tether_core::{
    Packet, PacketKind, SessionHello, SessionPhase, SessionTransport, SessionWelcome,
    TcpTransport, TetherError, decode_payload, encode_payload,
};

use crate::config::ClientConfig;
use crate::keepalive::{DEFAULT_KEEPALIVE, KeepaliveAction, KeepaliveWatchdog};
use crate::resize::{GeometrySource, LocalTerminal, ResizeDetector};

/// Upper bound on one readiness wait; sets the tick granularity for
/// the watchdog and resize detector.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Local input read buffer size.
pub const READ_BUF_SIZE: usize = 16 * 1024;

/// Whole-connect attempts before the handshake fails terminally.
const HANDSHAKE_ATTEMPTS: u32 = 3;

/// Response waits per connect attempt.
const RESPONSE_WAITS: u32 = 3;

/// Length of one response wait.
const RESPONSE_WAIT: Duration = Duration::from_secs(1);

// ── Status & options ─────────────────────────────────────────────

/// The entire observable outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Clean termination: the local input closed, shutdown was
    /// requested, or the established session hit a runtime transport
    /// fault after delivering useful work.
    Clean,
    /// Invalid arguments, handshake failure, or rejection.
    Failed,
}

impl SessionStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            SessionStatus::Clean => 0,
            SessionStatus::Failed => 1,
        }
    }
}

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub keepalive_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE,
        }
    }
}

/// Outcome of one whole connect-and-greet attempt.
enum Attempt {
    /// The server welcomed the session.
    Established,
    /// Transient failure (connect refused, response timeout,
    /// transport fault mid-handshake): retry the whole sequence.
    Failed,
    /// Protocol violation or server rejection: never retried.
    Rejected,
}

/// What woke the loop this iteration.
enum Wake {
    Input(std::io::Result<usize>),
    Transport(Option<Packet>),
    Poll,
}

// ── SessionEngine ────────────────────────────────────────────────

/// One persistent session with the remote terminal host.
///
/// Exclusively owns the transport handle for its lifetime; shutdown
/// is requested exactly once, on main-loop exit.
pub struct SessionEngine<T, R, W, G> {
    transport: T,
    input: R,
    output: W,
    geometry: G,
    keepalive: KeepaliveWatchdog,
    resize: ResizeDetector,
    phase: SessionPhase,
    stop: Arc<AtomicBool>,
}

impl<T, R, W, G> SessionEngine<T, R, W, G>
where
    T: SessionTransport,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    G: GeometrySource,
{
    pub fn new(transport: T, input: R, output: W, geometry: G, options: SessionOptions) -> Self {
        Self {
            transport,
            input,
            output,
            geometry,
            keepalive: KeepaliveWatchdog::new(options.keepalive_interval, Instant::now()),
            resize: ResizeDetector::new(),
            phase: SessionPhase::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A cloneable handle that stops the loop at its next iteration.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run the session to completion: handshake, main loop, shutdown.
    pub async fn run(mut self) -> SessionStatus {
        if let Err(e) = self.handshake().await {
            warn!("session handshake failed: {e}");
            return SessionStatus::Failed;
        }
        info!("session established");

        // Any fault past this point is a graceful termination: the
        // session may already have delivered useful work.
        if let Err(e) = self.main_loop().await {
            debug!("session loop terminated on transport fault: {e}");
        }

        let uptime = self.phase.established_duration();
        if let Err(e) = self.phase.begin_close() {
            debug!("close transition: {e}");
        }
        self.transport.request_shutdown();
        if let Err(e) = self.phase.finish_close() {
            debug!("close transition: {e}");
        }
        match uptime {
            Some(elapsed) => info!("session closed after {elapsed:?}"),
            None => info!("session closed"),
        }
        SessionStatus::Clean
    }

    // ── Handshake ────────────────────────────────────────────────

    /// Connect-with-bounded-retry. Transient failures are absorbed up
    /// to [`HANDSHAKE_ATTEMPTS`] times; protocol violations and server
    /// rejections fail immediately.
    async fn handshake(&mut self) -> Result<(), TetherError> {
        let mut failures = 0u32;
        loop {
            self.phase.force_reset();
            self.phase.begin_connect()?;

            match self.handshake_attempt().await? {
                Attempt::Established => {
                    self.phase.complete_handshake()?;
                    return Ok(());
                }
                Attempt::Rejected => {
                    self.phase.force_reset();
                    return Err(TetherError::ProtocolViolation(
                        "server rejected the session",
                    ));
                }
                Attempt::Failed => {
                    self.phase.force_reset();
                    failures += 1;
                    debug!("handshake attempt {failures}/{HANDSHAKE_ATTEMPTS} failed");
                    if failures >= HANDSHAKE_ATTEMPTS {
                        return Err(TetherError::Timeout(
                            RESPONSE_WAIT * RESPONSE_WAITS * HANDSHAKE_ATTEMPTS,
                        ));
                    }
                }
            }
        }
    }

    /// One connect attempt: dial, send the hello, wait for the welcome.
    async fn handshake_attempt(&mut self) -> Result<Attempt, TetherError> {
        if !self.transport.connect().await {
            return Ok(Attempt::Failed);
        }
        self.phase.begin_handshake()?;

        let hello = SessionHello {
            auxiliary_tunnels: false,
        };
        let packet = match encode_payload(&hello)
            .and_then(|payload| Packet::new(PacketKind::Hello, payload))
        {
            Ok(packet) => packet,
            Err(_) => return Ok(Attempt::Failed),
        };
        if self.transport.send(packet).await.is_err() {
            return Ok(Attempt::Failed);
        }

        for _ in 0..RESPONSE_WAITS {
            if !self.transport.is_connected() {
                // Descriptor transiently invalid; give it one window.
                tokio::time::sleep(RESPONSE_WAIT).await;
                continue;
            }
            match tokio::time::timeout(RESPONSE_WAIT, self.transport.recv()).await {
                Err(_) => continue, // window elapsed, wait again
                Ok(None) => return Ok(Attempt::Failed),
                Ok(Some(packet)) => {
                    if packet.kind_raw() != PacketKind::Welcome as u8 {
                        warn!(
                            "expected Welcome, got kind {:#04x}",
                            packet.kind_raw()
                        );
                        return Ok(Attempt::Rejected);
                    }
                    return match decode_payload::<SessionWelcome>(packet.payload()) {
                        Ok(welcome) => match welcome.error {
                            None => Ok(Attempt::Established),
                            Some(reason) => {
                                warn!("server refused session: {reason}");
                                Ok(Attempt::Rejected)
                            }
                        },
                        Err(_) => Ok(Attempt::Rejected),
                    };
                }
            }
        }
        Ok(Attempt::Failed)
    }

    // ── Main loop ────────────────────────────────────────────────

    /// The multiplexed event loop. An `Err` return is a runtime
    /// transport fault; the caller still treats the session as having
    /// terminated cleanly.
    async fn main_loop(&mut self) -> Result<(), TetherError> {
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buf = vec![0u8; READ_BUF_SIZE];

        loop {
            if self.transport.is_terminating() || self.stop.load(Ordering::SeqCst) {
                break;
            }
            let transport_ready = self.transport.is_connected();

            let wake = tokio::select! {
                biased;
                read = self.input.read(&mut buf) => Wake::Input(read),
                packet = self.transport.recv(), if transport_ready => Wake::Transport(packet),
                _ = poll.tick() => Wake::Poll,
            };

            match wake {
                // Input closed (or errored): normal termination.
                Wake::Input(Ok(0)) | Wake::Input(Err(_)) => break,

                Wake::Input(Ok(n)) => {
                    let packet = Packet::new(PacketKind::TerminalBuffer, buf[..n].to_vec())?;
                    self.transport.send(packet).await?;
                    self.keepalive.note_activity(Instant::now());
                }

                // The transport is gone for good: runtime fault.
                Wake::Transport(None) => return Err(TetherError::ChannelClosed),

                Wake::Transport(Some(packet)) => self.dispatch(packet).await?,

                Wake::Poll => {}
            }

            // Drain everything already buffered before waiting again:
            // a burst never straddles iterations, and sustained local
            // input cannot starve remote output or keepalive replies.
            while let Some(next) = self.transport.try_recv() {
                self.dispatch(next).await?;
            }

            self.keepalive_tick().await?;
            self.resize_tick().await?;
        }
        Ok(())
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Route one received packet. Unrecognized kinds are dropped
    /// silently: newer servers may speak kinds this build predates.
    async fn dispatch(&mut self, packet: Packet) -> Result<(), TetherError> {
        match PacketKind::try_from(packet.kind_raw()) {
            Ok(PacketKind::TerminalBuffer) => {
                self.output.write_all(packet.payload()).await?;
                self.output.flush().await?;
                self.keepalive.note_activity(Instant::now());
            }
            Ok(PacketKind::Keepalive) => self.keepalive.reply_received(),
            Ok(other) => trace!("ignoring {other} packet"),
            Err(_) => trace!("ignoring unknown packet kind {:#04x}", packet.kind_raw()),
        }
        Ok(())
    }

    // ── Ticks ────────────────────────────────────────────────────

    async fn keepalive_tick(&mut self) -> Result<(), TetherError> {
        let connected = self.transport.is_connected();
        match self.keepalive.tick(Instant::now(), connected) {
            KeepaliveAction::Idle => {}
            KeepaliveAction::SendProbe => {
                self.transport.send(Packet::keepalive()).await?;
            }
            KeepaliveAction::Reconnect => {
                warn!("keepalive reply missed; requesting transport reconnect");
                self.transport.close_and_reconnect().await;
            }
        }
        Ok(())
    }

    async fn resize_tick(&mut self) -> Result<(), TetherError> {
        let Some(current) = self.geometry.current() else {
            return Ok(());
        };
        if let Some(size) = self.resize.check(current) {
            debug!(rows = size.rows, cols = size.cols, "terminal geometry changed");
            let payload = encode_payload(&size)?;
            self.transport
                .send(Packet::new(PacketKind::TerminalInfo, payload)?)
                .await?;
        }
        Ok(())
    }
}

// ── Entry points ─────────────────────────────────────────────────

/// Run one session over the given collaborators. This is the entire
/// observable contract: the returned status maps to exit code 0
/// (clean) or 1 (failure); there is no other output channel.
pub async fn run_session<T, R, W, G>(
    transport: T,
    input: R,
    output: W,
    geometry: G,
    options: SessionOptions,
) -> SessionStatus
where
    T: SessionTransport,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    G: GeometrySource,
{
    SessionEngine::new(transport, input, output, geometry, options)
        .run()
        .await
}

/// Wire the production collaborators — stdin/stdout, the local
/// terminal, a TCP transport — and run one session.
pub async fn run_with_config(config: &ClientConfig) -> SessionStatus {
    // Fail fast on unusable arguments, before any I/O.
    if config.network.host.is_empty() || config.network.port == 0 {
        warn!("no remote endpoint configured");
        return SessionStatus::Failed;
    }
    if config.session.id.is_empty() || config.session.id.len() > u8::MAX as usize {
        warn!("missing or oversized session id");
        return SessionStatus::Failed;
    }

    let transport = TcpTransport::new(config.endpoint(), config.identity());
    let engine = SessionEngine::new(
        transport,
        tokio::io::stdin(),
        tokio::io::stdout(),
        LocalTerminal,
        SessionOptions {
            keepalive_interval: config.keepalive_interval(),
        },
    );

    // Ctrl-C stops the loop at its next iteration.
    let stop = engine.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received — shutting down");
            stop.store(true, Ordering::SeqCst);
        }
    });

    engine.run().await
}
