//! Keepalive liveness watchdog.
//!
//! Tracks the time-to-next-probe and a one-shot "awaiting reply"
//! flag. At most one probe is ever in flight, so slow links never see
//! probe storms; missing a single reply window is enough to declare
//! the link dead, which bounds detection latency to one interval.

use std::time::Duration;

use tokio::time::Instant;

/// Default probe interval, also used when a configured interval is
/// out of range.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(5);

/// What the engine must do after a watchdog tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveAction {
    /// Nothing due.
    Idle,
    /// Send an empty-payload probe packet.
    SendProbe,
    /// The last probe went unanswered: escalate to the transport.
    Reconnect,
}

/// Watchdog state. Mutated only through its own methods; reset
/// whenever terminal data moves in either direction.
#[derive(Debug)]
pub struct KeepaliveWatchdog {
    interval: Duration,
    deadline: Instant,
    awaiting_reply: bool,
}

impl KeepaliveWatchdog {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            deadline: now + interval,
            awaiting_reply: false,
        }
    }

    /// Terminal traffic counts as liveness proof: push the deadline out.
    pub fn note_activity(&mut self, now: Instant) {
        self.deadline = now + self.interval;
    }

    /// The peer echoed our probe.
    pub fn reply_received(&mut self) {
        self.awaiting_reply = false;
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Advance the watchdog. Runs every loop iteration; only acts when
    /// the deadline has passed, and never probes an invalid transport.
    pub fn tick(&mut self, now: Instant, transport_valid: bool) -> KeepaliveAction {
        if !transport_valid {
            // No probe is meaningful without a transport.
            self.awaiting_reply = false;
            return KeepaliveAction::Idle;
        }
        if now < self.deadline {
            return KeepaliveAction::Idle;
        }

        self.deadline = now + self.interval;
        if self.awaiting_reply {
            self.awaiting_reply = false;
            KeepaliveAction::Reconnect
        } else {
            self.awaiting_reply = true;
            KeepaliveAction::SendProbe
        }
    }
}
