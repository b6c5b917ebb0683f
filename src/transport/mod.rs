//! WebSocket transport layer.
//!
//! This module turns a URL plus [`ConnectionOptions`](crate::ConnectionOptions)
//! into an upgraded WebSocket stream. Framing, masking, ping replies and
//! close echo are handled by `tokio-tungstenite`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐        optional         ┌─────────────────┐
//! │  Socket (Rust)  │      CONNECT tunnel     │  WebSocket      │
//! │                 │ ──────► proxy ────────► │  Server         │
//! │  dial()         │◄───────────────────────►│                 │
//! │  → WsStream     │    ws:// or wss://      │                 │
//! └─────────────────┘                         └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dial` | TCP dial, tunnel and handshake |
//! | `proxy` | Proxy resolver and `CONNECT` tunnelling |
//! | `tls` | rustls client configuration |

// ============================================================================
// Submodules
// ============================================================================

/// TCP dial, tunnel and handshake.
pub(crate) mod dial;

/// HTTP proxy support.
pub mod proxy;

/// TLS client configuration.
pub(crate) mod tls;

// ============================================================================
// Re-exports
// ============================================================================

pub use proxy::{ProxyResolver, build_proxy};
