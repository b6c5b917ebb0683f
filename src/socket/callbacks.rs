//! Callback slots.
//!
//! Every lifecycle event has one optional slot. Callbacks are async
//! closures that receive a clone of the live [`Socket`] handle, so they can
//! send or close from inside the callback. An empty slot drops the event.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{error, trace};

use crate::error::Error;

use super::Socket;

// ============================================================================
// Types
// ============================================================================

/// A registered callback.
///
/// Receives the socket handle and the event payload.
pub type Callback<T> = Arc<dyn Fn(Socket, T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`Callback`].
pub(crate) fn callback<T, F, Fut>(f: F) -> Callback<T>
where
    F: Fn(Socket, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |socket, value| f(socket, value).boxed())
}

// ============================================================================
// Callbacks
// ============================================================================

/// The full set of callback slots.
#[derive(Default, Clone)]
pub(crate) struct Callbacks {
    pub connected: Option<Callback<()>>,
    pub connect_error: Option<Callback<Error>>,
    pub disconnected: Option<Callback<Option<Error>>>,
    pub text_message: Option<Callback<String>>,
    pub binary_message: Option<Callback<Vec<u8>>>,
    pub ping_received: Option<Callback<Vec<u8>>>,
    pub pong_received: Option<Callback<Vec<u8>>>,
}

// ============================================================================
// Dispatch
// ============================================================================

/// Runs a callback if one is registered.
///
/// A panic inside the callback is logged and swallowed.
pub(crate) async fn dispatch<T>(
    slot: Option<Callback<T>>,
    event: &'static str,
    socket: &Socket,
    value: T,
) {
    let Some(callback) = slot else {
        trace!(event, "No callback registered, event dropped");
        return;
    };

    if AssertUnwindSafe(callback(socket.clone(), value))
        .catch_unwind()
        .await
        .is_err()
    {
        error!(event, "Callback panicked");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_dispatch_runs_callback() {
        let socket = Socket::new("ws://127.0.0.1:1");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let cb: Callback<String> = callback(move |_socket, text: String| {
            let counter = Arc::clone(&counter);
            async move {
                assert_eq!(text, "hello");
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        dispatch(Some(cb), "text", &socket, "hello".to_string()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_empty_slot_is_noop() {
        let socket = Socket::new("ws://127.0.0.1:1");
        dispatch::<Vec<u8>>(None, "binary", &socket, vec![1, 2, 3]).await;
    }

    #[tokio::test]
    async fn test_dispatch_survives_panic() {
        let socket = Socket::new("ws://127.0.0.1:1");
        let cb: Callback<()> = callback(|_socket, ()| async move {
            panic!("callback failure");
        });

        dispatch(Some(cb), "connected", &socket, ()).await;
    }

    #[test]
    fn test_default_is_empty() {
        let callbacks = Callbacks::default();
        assert!(callbacks.connected.is_none());
        assert!(callbacks.disconnected.is_none());
        assert!(callbacks.text_message.is_none());
    }
}
