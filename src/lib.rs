//! WS Socket - callback-driven WebSocket client handle.
//!
//! This library wraps one outbound WebSocket connection behind a cloneable
//! [`Socket`] handle with callback hooks for every lifecycle event.
//!
//! # Architecture
//!
//! - **Handshake**: `ws://` or `wss://`, custom headers, subprotocols,
//!   optional HTTP proxy tunnel, TLS verified by default
//! - **Read loop**: one background task per connection, dispatching frames
//!   to callbacks in arrival order
//! - **Writes**: any number of callers, serialized by a write lock
//!
//! Key design principles:
//!
//! - No reconnection: `Disconnected` is terminal
//! - Protocol housekeeping (pong replies, close echo) always runs; ping and
//!   pong callbacks only observe
//! - Every event is recorded under a per-socket `tracing` span
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_socket::{Result, Socket};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let socket = Socket::builder("wss://echo.example.com")
//!         .header("User-Agent", "ws-socket")
//!         .build();
//!
//!     socket.on_text_message(|socket, text| async move {
//!         println!("echo: {text}");
//!         let _ = socket.close().await;
//!     });
//!     socket.on_disconnected(|_socket, error| async move {
//!         println!("disconnected: {error:?}");
//!     });
//!
//!     socket.connect().await?;
//!     socket.send_text("ping").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`socket`] | [`Socket`] handle, builder, callbacks, state |
//! | [`options`] | [`ConnectionOptions`] dial configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`transport`] | Dial, proxy tunnelling and TLS |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Dial options.
pub mod options;

/// The socket handle.
///
/// Use [`Socket::new()`] or [`Socket::builder()`] to create one.
pub mod socket;

/// WebSocket transport layer.
///
/// Dialing, proxy tunnelling and TLS configuration.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Configuration types
pub use options::ConnectionOptions;

// Socket types
pub use socket::{Callback, Socket, SocketBuilder, SocketState};

// Transport types
pub use transport::{ProxyResolver, build_proxy};
