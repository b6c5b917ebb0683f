//! Error types for the WebSocket socket handle.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_socket::{Result, Socket};
//!
//! async fn example(socket: &Socket) -> Result<()> {
//!     socket.send_text("hello").await?;
//!     socket.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidState`], [`Error::InvalidArgument`] |
//! | Connect | [`Error::InvalidUrl`], [`Error::InvalidHeader`], [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::Proxy`], [`Error::Handshake`] |
//! | Read | [`Error::ClosedByPeer`], [`Error::ReadTimeout`], [`Error::ConnectionClosed`] |
//! | Write | [`Error::NotConnected`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Tls`], [`Error::WebSocket`] |
//!
//! `Error` is `Clone` so that the same value can be handed to a callback
//! and returned to the caller.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Operation not allowed in the current socket state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Connect Errors
    // ========================================================================
    /// Target URL is malformed or uses an unsupported scheme.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why the URL was rejected.
        message: String,
    },

    /// Request header name or value is not valid HTTP.
    #[error("Invalid header {name}: {message}")]
    InvalidHeader {
        /// The rejected header name.
        name: String,
        /// Why the header was rejected.
        message: String,
    },

    /// TCP dial failed.
    ///
    /// Returned when the server (or proxy) cannot be reached.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Handshake did not complete within the configured timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Proxy refused or failed to establish the tunnel.
    #[error("Proxy error: {message}")]
    Proxy {
        /// Description of the proxy failure.
        message: String,
    },

    /// Server answered the upgrade request with a non-101 status.
    #[error("Handshake rejected with HTTP status {status}")]
    Handshake {
        /// HTTP status code returned by the server.
        status: u16,
    },

    // ========================================================================
    // Read Errors
    // ========================================================================
    /// Peer sent a close frame.
    #[error("Connection closed by peer (code {code}): {reason}")]
    ClosedByPeer {
        /// Close status code (1005 when the frame carried none).
        code: u16,
        /// Close reason text.
        reason: String,
    },

    /// No frame arrived within the configured read timeout.
    #[error("Read timeout after {timeout_ms}ms")]
    ReadTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection is closed.
    ///
    /// Returned when the transport is gone, either on read or write.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Write Errors
    // ========================================================================
    /// Operation requires a connected socket.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(Arc<IoError>),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(Arc<WsError>),
}

// ============================================================================
// Conversions
// ============================================================================

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<WsError> for Error {
    fn from(err: WsError) -> Self {
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::ConnectionClosed,
            WsError::Http(ref response) => Self::Handshake {
                status: response.status().as_u16(),
            },
            other => Self::WebSocket(Arc::new(other)),
        }
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid header error.
    #[inline]
    pub fn invalid_header(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a proxy error.
    #[inline]
    pub fn proxy(message: impl Into<String>) -> Self {
        Self::Proxy {
            message: message.into(),
        }
    }

    /// Creates a closed-by-peer error.
    #[inline]
    pub fn closed_by_peer(code: u16, reason: impl Into<String>) -> Self {
        Self::ClosedByPeer {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a read timeout error.
    #[inline]
    pub fn read_timeout(timeout_ms: u64) -> Self {
        Self::ReadTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::ReadTimeout { .. }
        )
    }

    /// Returns `true` if this error can only arise while connecting.
    #[inline]
    #[must_use]
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. }
                | Self::InvalidHeader { .. }
                | Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::Proxy { .. }
                | Self::Handshake { .. }
                | Self::Tls(_)
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ClosedByPeer { .. }
                | Self::ReadTimeout { .. }
                | Self::NotConnected
                | Self::Io(_)
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the connection is known to be gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::ClosedByPeer { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("connection refused");
        assert_eq!(err.to_string(), "Connection failed: connection refused");
    }

    #[test]
    fn test_closed_by_peer_display() {
        let err = Error::closed_by_peer(1000, "bye");
        assert_eq!(
            err.to_string(),
            "Connection closed by peer (code 1000): bye"
        );
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::read_timeout(250).is_timeout());
        assert!(Error::connection_timeout(1000).is_timeout());
        assert!(!Error::connection("test").is_timeout());
    }

    #[test]
    fn test_is_connect_error() {
        assert!(Error::invalid_url("http://x", "bad scheme").is_connect_error());
        assert!(Error::Handshake { status: 404 }.is_connect_error());
        assert!(!Error::ConnectionClosed.is_connect_error());
        assert!(!Error::read_timeout(10).is_connect_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::NotConnected.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_closed() {
        assert!(Error::ConnectionClosed.is_closed());
        assert!(Error::closed_by_peer(1001, "").is_closed());
        assert!(!Error::NotConnected.is_closed());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_ws_connection_closed() {
        let err: Error = WsError::ConnectionClosed.into();
        assert!(matches!(err, Error::ConnectionClosed));

        let err: Error = WsError::AlreadyClosed.into();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn test_error_is_clone() {
        let err: Error = IoError::new(ErrorKind::BrokenPipe, "pipe").into();
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
