//! The socket handle and its lifecycle.
//!
//! # Lifecycle
//!
//! 1. `Socket::new` / `Socket::builder` - configure, no I/O
//! 2. `Socket::connect` - handshake, `on_connected`, spawn read loop
//! 3. Read loop - dispatch frames to callbacks until an error
//! 4. `Socket::close` or a read error - `on_disconnected`, terminal
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Socket`] handle |
//! | `builder` | [`SocketBuilder`] |
//! | `callbacks` | Callback slots and dispatch |
//! | `reader` | Background read loop |
//! | `state` | [`SocketState`] machine |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent socket construction.
pub mod builder;

/// Callback slots.
pub mod callbacks;

/// The socket handle.
pub mod core;

/// Background read loop.
mod reader;

/// Connection state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SocketBuilder;
pub use callbacks::Callback;
pub use self::core::Socket;
pub use state::SocketState;
