//! # tether-client
//!
//! The client engine for a persistent remote-terminal session:
//! session handshake with bounded retry, the multiplexed main loop,
//! the packet dispatcher, the keepalive liveness watchdog, and the
//! terminal-geometry change detector.

pub mod config;
pub mod engine;
pub mod keepalive;
pub mod resize;

pub use config::ClientConfig;
pub use engine::{SessionEngine, SessionOptions, SessionStatus, run_session, run_with_config};
pub use keepalive::{KeepaliveAction, KeepaliveWatchdog};
pub use resize::{GeometrySource, LocalTerminal, ResizeDetector};
