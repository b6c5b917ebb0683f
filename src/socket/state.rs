//! Connection state machine.
//!
//! ```text
//! Unconnected ──► Connecting ──► Connected ──► Disconnected
//!      │               │                            ▲
//!      └───────────────┴────────────────────────────┘
//! ```
//!
//! `Disconnected` is terminal. There is no path back to `Connected`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};

// ============================================================================
// SocketState
// ============================================================================

/// Lifecycle state of a [`Socket`](crate::Socket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SocketState {
    /// Constructed, `connect` not yet called.
    Unconnected = 0,
    /// Handshake in flight.
    Connecting = 1,
    /// Handshake succeeded and no fatal error seen yet.
    Connected = 2,
    /// Closed, failed to connect, or hit a fatal error.
    Disconnected = 3,
}

impl SocketState {
    /// Returns the state name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// Atomic holder for [`SocketState`] with checked transitions.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    /// Creates a cell in `Unconnected`.
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(SocketState::Unconnected as u8))
    }

    /// Returns the current state.
    #[inline]
    pub(crate) fn get(&self) -> SocketState {
        SocketState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Unconnected → Connecting`.
    pub(crate) fn begin_connect(&self) -> Result<()> {
        self.transition(SocketState::Unconnected, SocketState::Connecting)
            .map_err(|actual| {
                Error::invalid_state(format!("connect called while {actual}"))
            })
    }

    /// `Connecting → Connected`.
    ///
    /// Fails if the socket was closed while the handshake was in flight.
    pub(crate) fn finish_connect(&self) -> Result<()> {
        self.transition(SocketState::Connecting, SocketState::Connected)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Moves to `Disconnected`, returning the previous state.
    pub(crate) fn disconnect(&self) -> SocketState {
        SocketState::from_u8(
            self.0
                .swap(SocketState::Disconnected as u8, Ordering::AcqRel),
        )
    }

    fn transition(
        &self,
        from: SocketState,
        to: SocketState,
    ) -> std::result::Result<(), SocketState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(SocketState::from_u8)
    }
}

// ============================================================================
// Tests
// ============================================================================
