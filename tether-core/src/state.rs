//! Session lifecycle state machine.
//!
//! Tracks one client session from dial to teardown. Transitions are
//! validated and return `Result`; an abandoned handshake attempt uses
//! [`SessionPhase::force_reset`] to start a fresh cycle.

use std::time::Instant;

use crate::error::TetherError;

/// The current phase of a tether session.
///
/// ```text
///  Disconnected ──► Connecting ──► Handshaking ──► Established
///       ▲                │               │              │
///       │                ▼               ▼              ▼
///       └─────────── Closing ◄───────────┴──────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No active session; both the initial and the final state.
    #[default]
    Disconnected,

    /// Dial in progress; no link yet.
    Connecting,

    /// TCP link is up; performing the Hello / Welcome exchange.
    Handshaking,

    /// Handshake complete; steady-state terminal traffic.
    Established {
        /// When the session entered the `Established` state.
        since: Instant,
    },

    /// Shutdown in progress.
    Closing,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Established { .. } => write!(f, "Established"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

impl SessionPhase {
    /// Returns `true` when the session is ready for terminal traffic.
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established { .. })
    }

    /// Returns `true` when the session is in a terminal or idle state.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the session has been in the `Established` state.
    ///
    /// Returns `None` for any other phase.
    pub fn established_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Established { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`. Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), TetherError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(TetherError::ProtocolViolation(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Transition to `Handshaking`. Valid from: `Connecting`.
    pub fn begin_handshake(&mut self) -> Result<(), TetherError> {
        match self {
            Self::Connecting => {
                *self = Self::Handshaking;
                Ok(())
            }
            _ => Err(TetherError::ProtocolViolation(
                "cannot handshake: not in Connecting state",
            )),
        }
    }

    /// Transition to `Established`. Valid from: `Handshaking`.
    pub fn complete_handshake(&mut self) -> Result<(), TetherError> {
        match self {
            Self::Handshaking => {
                *self = Self::Established {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(TetherError::ProtocolViolation(
                "cannot complete handshake: not in Handshaking state",
            )),
        }
    }

    /// Transition to `Closing`. Valid from: `Handshaking`, `Established`.
    pub fn begin_close(&mut self) -> Result<(), TetherError> {
        match self {
            Self::Handshaking | Self::Established { .. } => {
                *self = Self::Closing;
                Ok(())
            }
            _ => Err(TetherError::ProtocolViolation(
                "cannot close: not in Handshaking or Established state",
            )),
        }
    }

    /// Transition to `Disconnected`. Valid from: `Closing`,
    /// `Connecting` (timeout/failure), `Handshaking` (failure).
    pub fn finish_close(&mut self) -> Result<(), TetherError> {
        match self {
            Self::Closing | Self::Connecting | Self::Handshaking => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(TetherError::ProtocolViolation(
                "cannot finish close: not in a closable state",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    ///
    /// Use this when a handshake attempt is abandoned mid-flight.
    pub fn force_reset(&mut self) {
        *self = Self::Disconnected;
    }
}
