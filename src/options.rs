//! Dial options for a [`Socket`](crate::Socket).
//!
//! Provides a type-safe interface for configuring how the handshake is
//! performed: TLS verification, compression, subprotocols, proxy and timeouts.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ws_socket::ConnectionOptions;
//!
//! let options = ConnectionOptions::new()
//!     .with_subprotocol("chat.v1")
//!     .with_read_timeout(Duration::from_secs(30));
//!
//! assert!(options.tls_verification);
//! assert_eq!(options.subprotocols, vec!["chat.v1".to_string()]);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;

use crate::transport::ProxyResolver;

// ============================================================================
// Constants
// ============================================================================

/// Default bound on dial + proxy + TLS + upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Handshake and read configuration.
///
/// Options are read once when [`Socket::connect`](crate::Socket::connect)
/// runs. Changing them afterwards has no effect on the live connection.
#[derive(Clone)]
pub struct ConnectionOptions {
    /// Validate the server certificate chain and hostname (`wss://` only).
    ///
    /// Defaults to `true`. Turning it off accepts any certificate.
    pub tls_verification: bool,

    /// Request per-message compression.
    pub compression: bool,

    /// Subprotocols offered during the handshake, in preference order.
    pub subprotocols: Vec<String>,

    /// Resolves the proxy to tunnel through for a target URL.
    pub proxy: Option<ProxyResolver>,

    /// Deadline for each individual read. `None` or zero blocks indefinitely.
    pub read_timeout: Option<Duration>,

    /// Deadline for the whole handshake. `None` waits indefinitely.
    pub handshake_timeout: Option<Duration>,

    /// Fully custom TLS client configuration.
    ///
    /// When set, `tls_verification` is ignored.
    pub tls_config: Option<Arc<ClientConfig>>,
}

// ============================================================================
// Constructors
// ============================================================================

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionOptions {
    /// Creates options with secure defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            tls_verification: true,
            compression: false,
            subprotocols: Vec::new(),
            proxy: None,
            read_timeout: None,
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            tls_config: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionOptions {
    /// Enables or disables certificate verification.
    #[inline]
    #[must_use]
    pub fn with_tls_verification(mut self, enabled: bool) -> Self {
        self.tls_verification = enabled;
        self
    }

    /// Enables or disables per-message compression.
    #[inline]
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Appends a subprotocol to the offer list.
    #[inline]
    #[must_use]
    pub fn with_subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocols.push(protocol.into());
        self
    }

    /// Replaces the subprotocol offer list.
    #[must_use]
    pub fn with_subprotocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subprotocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the proxy resolver.
    #[inline]
    #[must_use]
    pub fn with_proxy(mut self, resolver: ProxyResolver) -> Self {
        self.proxy = Some(resolver);
        self
    }

    /// Sets the per-read deadline.
    #[inline]
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Removes the handshake deadline.
    #[inline]
    #[must_use]
    pub fn without_handshake_timeout(mut self) -> Self {
        self.handshake_timeout = None;
        self
    }

    /// Uses a caller-provided TLS configuration.
    #[inline]
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ConnectionOptions {
    /// Returns the read deadline, treating zero as "none".
    #[inline]
    #[must_use]
    pub fn effective_read_timeout(&self) -> Option<Duration> {
        self.read_timeout.filter(|timeout| !timeout.is_zero())
    }

    /// Returns the `Sec-WebSocket-Protocol` header value, if any.
    #[must_use]
    pub fn subprotocol_header(&self) -> Option<String> {
        if self.subprotocols.is_empty() {
            None
        } else {
            Some(self.subprotocols.join(", "))
        }
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("tls_verification", &self.tls_verification)
            .field("compression", &self.compression)
            .field("subprotocols", &self.subprotocols)
            .field("proxy", &self.proxy.as_ref().map(|_| "<resolver>"))
            .field("read_timeout", &self.read_timeout)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("tls_config", &self.tls_config.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
