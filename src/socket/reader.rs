//! Background read loop.
//!
//! Exactly one read loop runs per connected [`Socket`]. It owns nothing but a
//! handle clone; the read half lives behind the socket's read lock, which the
//! loop holds only for the duration of a single read.
//!
//! # Termination
//!
//! - Any read error (peer close, timeout, transport failure) ends the loop
//!   permanently and fires `on_disconnected` once.
//! - A shutdown signal from [`Socket::close`] ends the loop silently; the
//!   close path fires `on_disconnected` itself. Frames or errors observed
//!   once close has begun (the close echo, say) are not reported either.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::Ordering;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::transport::dial::millis;

use super::Socket;
use super::callbacks::dispatch;
use super::core::WsSource;

// ============================================================================
// Constants
// ============================================================================

/// How long to keep reading after a peer close so the echo gets flushed.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Read Loop
// ============================================================================

/// Reads frames until an error or shutdown, dispatching each to its callback.
pub(super) async fn run(socket: Socket, read_timeout: Option<Duration>) {
    debug!(?read_timeout, "Read loop started");

    let error = loop {
        let message = match next_message(&socket, read_timeout).await {
            Some(Ok(message)) => message,
            Some(Err(e)) => break e,
            None => {
                debug!("Read loop cancelled");
                return;
            }
        };

        let callbacks = socket.callbacks();

        match message {
            Message::Text(text) => {
                trace!(bytes = text.len(), "Text frame received");
                dispatch(
                    callbacks.text_message,
                    "text_message",
                    &socket,
                    text.as_str().to_owned(),
                )
                .await;
            }

            Message::Binary(data) => {
                trace!(bytes = data.len(), "Binary frame received");
                dispatch(
                    callbacks.binary_message,
                    "binary_message",
                    &socket,
                    data.to_vec(),
                )
                .await;
            }

            // The protocol layer has already queued the pong reply.
            Message::Ping(payload) => {
                trace!(bytes = payload.len(), "Ping received");
                dispatch(
                    callbacks.ping_received,
                    "ping_received",
                    &socket,
                    payload.to_vec(),
                )
                .await;
            }

            Message::Pong(payload) => {
                trace!(bytes = payload.len(), "Pong received");
                dispatch(
                    callbacks.pong_received,
                    "pong_received",
                    &socket,
                    payload.to_vec(),
                )
                .await;
            }

            Message::Close(frame) => {
                let (code, reason) = match frame {
                    Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
                    None => (u16::from(CloseCode::Status), String::new()),
                };
                if socket.inner.closing.load(Ordering::Acquire) {
                    debug!(code, "Close echo received");
                    return;
                }
                debug!(code, %reason, "WebSocket closed by remote");
                socket.inner.state.disconnect();
                drain_after_close(&socket).await;
                break Error::closed_by_peer(code, reason);
            }

            // Raw frames are never yielded while reading messages.
            Message::Frame(_) => {}
        }
    };

    // A local close owns teardown and reports the disconnect itself, unless
    // the peer's close frame arrived first.
    let peer_closed = matches!(error, Error::ClosedByPeer { .. });
    if !peer_closed && socket.inner.closing.load(Ordering::Acquire) {
        debug!(error = %error, "Read loop stopped during close");
        return;
    }

    socket.release_transport().await;
    socket.finish(Some(error)).await;

    debug!("Read loop terminated");
}

/// Waits for the next message, the read deadline, or shutdown.
///
/// Returns `None` on shutdown or when the read half has been released.
async fn next_message(socket: &Socket, read_timeout: Option<Duration>) -> Option<Result<Message>> {
    let mut reader = socket.inner.reader.lock().await;
    let stream = reader.as_mut()?;

    tokio::select! {
        biased;

        () = socket.inner.shutdown.notified() => None,

        message = read_one(stream, read_timeout) => Some(message),
    }
}

/// Performs one read, bounded by the deadline if set.
async fn read_one(stream: &mut WsSource, read_timeout: Option<Duration>) -> Result<Message> {
    let next = match read_timeout {
        Some(limit) => timeout(limit, stream.next())
            .await
            .map_err(|_| Error::read_timeout(millis(limit)))?,
        None => stream.next().await,
    };

    match next {
        Some(Ok(message)) => Ok(message),
        Some(Err(e)) => Err(e.into()),
        None => Err(Error::ConnectionClosed),
    }
}

/// Gives the protocol layer one more read to flush the close echo.
async fn drain_after_close(socket: &Socket) {
    let mut reader = socket.inner.reader.lock().await;
    if let Some(stream) = reader.as_mut() {
        let _ = timeout(CLOSE_DRAIN_TIMEOUT, stream.next()).await;
    }
}
