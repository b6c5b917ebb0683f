//! Builder pattern for socket configuration.
//!
//! Provides a fluent API for configuring and creating [`Socket`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ws_socket::Socket;
//!
//! let socket = Socket::builder("wss://stream.example.com/feed")
//!     .header("Authorization", "Bearer token")
//!     .subprotocol("feed.v1")
//!     .read_timeout(Duration::from_secs(60))
//!     .build();
//!
//! assert!(!socket.is_connected());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use tracing::Span;

use crate::options::ConnectionOptions;
use crate::transport::ProxyResolver;

use super::Socket;

// ============================================================================
// SocketBuilder
// ============================================================================

/// Builder for configuring a [`Socket`] instance.
///
/// Use [`Socket::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct SocketBuilder {
    /// Target URL.
    url: String,
    /// Dial options.
    options: ConnectionOptions,
    /// Ordered request headers.
    headers: Vec<(String, String)>,
    /// Span to record events under.
    span: Option<Span>,
}

// ============================================================================
// SocketBuilder Implementation
// ============================================================================

impl SocketBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: ConnectionOptions::new(),
            headers: Vec::new(),
            span: None,
        }
    }

    /// Replaces all dial options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Appends a request header. Repeated names are all sent.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Enables or disables certificate verification.
    #[inline]
    #[must_use]
    pub fn tls_verification(mut self, enabled: bool) -> Self {
        self.options.tls_verification = enabled;
        self
    }

    /// Uses a caller-provided TLS configuration.
    #[inline]
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.options.tls_config = Some(config);
        self
    }

    /// Enables or disables per-message compression.
    #[inline]
    #[must_use]
    pub fn compression(mut self, enabled: bool) -> Self {
        self.options.compression = enabled;
        self
    }

    /// Appends a subprotocol to the offer list.
    #[inline]
    #[must_use]
    pub fn subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.options.subprotocols.push(protocol.into());
        self
    }

    /// Sets the proxy resolver.
    ///
    /// Use [`build_proxy`](crate::build_proxy) for a fixed proxy URL.
    #[inline]
    #[must_use]
    pub fn proxy(mut self, resolver: ProxyResolver) -> Self {
        self.options.proxy = Some(resolver);
        self
    }

    /// Sets the per-read deadline.
    #[inline]
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = Some(timeout);
        self
    }

    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.options.handshake_timeout = Some(timeout);
        self
    }

    /// Records socket events under `span` instead of the default
    /// `websocket` span.
    #[inline]
    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Builds the socket. Performs no I/O.
    #[must_use]
    pub fn build(self) -> Socket {
        Socket::from_parts(self.url, self.options, self.headers, self.span)
    }
}

// ============================================================================
// Tests
// ============================================================================
