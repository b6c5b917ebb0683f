//! The [`Socket`] connection handle.
//!
//! A `Socket` owns one outbound WebSocket connection. It performs the
//! handshake, runs a single background read loop that dispatches frames to
//! registered callbacks, and serializes writes from any number of callers.
//!
//! # Locks
//!
//! The transport supports one concurrent reader and one concurrent writer,
//! so the read half and write half each sit behind their own async mutex.
//! A read and a write may proceed at the same time; two writes never do.
//!
//! # Example
//!
//! ```no_run
//! use ws_socket::Socket;
//!
//! # async fn example() -> ws_socket::Result<()> {
//! let socket = Socket::new("wss://echo.example.com/ws");
//!
//! socket.on_connected(|socket| async move {
//!     let _ = socket.send_text("hello").await;
//! });
//! socket.on_text_message(|_socket, text| async move {
//!     println!("received: {text}");
//! });
//!
//! socket.connect().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{Instrument, Span, debug, debug_span, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::options::ConnectionOptions;
use crate::transport::dial::{WsStream, dial};

use super::builder::SocketBuilder;
use super::callbacks::{Callbacks, callback, dispatch};
use super::reader;
use super::state::{SocketState, StateCell};

// ============================================================================
// Constants
// ============================================================================

/// Largest payload a control frame may carry.
const MAX_CONTROL_PAYLOAD: usize = 125;

// ============================================================================
// Types
// ============================================================================

/// Write half of the connection.
pub(crate) type WsSink = SplitSink<WsStream, Message>;

/// Read half of the connection.
pub(crate) type WsSource = SplitStream<WsStream>;

// ============================================================================
// Inner
// ============================================================================

/// State shared by every clone of a [`Socket`].
pub(crate) struct Inner {
    /// Target URL.
    pub(crate) url: String,
    /// Dial options, frozen once connect starts.
    pub(crate) options: RwLock<ConnectionOptions>,
    /// Ordered request headers.
    pub(crate) headers: RwLock<Vec<(String, String)>>,
    /// Lifecycle state.
    pub(crate) state: StateCell,
    /// Set by the first `close` call.
    pub(crate) closing: AtomicBool,
    /// Armed on connect, disarmed when `on_disconnected` fires.
    pub(crate) disconnect_pending: AtomicBool,
    /// Registered callbacks.
    pub(crate) callbacks: RwLock<Callbacks>,
    /// Write lock around the write half.
    pub(crate) writer: AsyncMutex<Option<WsSink>>,
    /// Read lock around the read half.
    pub(crate) reader: AsyncMutex<Option<WsSource>>,
    /// Background read loop.
    pub(crate) read_task: Mutex<Option<JoinHandle<()>>>,
    /// Wakes the read loop for shutdown.
    pub(crate) shutdown: Notify,
    /// Aborts an in-flight handshake.
    pub(crate) connect_abort: Notify,
    /// Subprotocol selected by the server.
    pub(crate) subprotocol: RwLock<Option<String>>,
    /// Span all socket events are recorded under.
    pub(crate) span: Span,
}

// ============================================================================
// Socket
// ============================================================================

/// Handle to one outbound WebSocket connection.
///
/// Cloning is cheap and every clone refers to the same connection. Callbacks
/// receive such a clone, so state observed inside a callback is always live.
///
/// # Thread Safety
///
/// `Socket` is `Send + Sync`. Sends, close and option changes may be called
/// from any task, concurrently with each other and with the read loop.
///
/// Dropping every handle does not close the connection; call
/// [`close`](Self::close).
#[derive(Clone)]
pub struct Socket {
    pub(crate) inner: Arc<Inner>,
}

// ============================================================================
// Socket - Constructors
// ============================================================================

impl Socket {
    /// Creates an unconnected socket for `url` with default options.
    ///
    /// Performs no I/O. The URL is validated by [`connect`](Self::connect).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        SocketBuilder::new(url).build()
    }

    /// Returns a builder for configuring a socket.
    #[inline]
    #[must_use]
    pub fn builder(url: impl Into<String>) -> SocketBuilder {
        SocketBuilder::new(url)
    }

    /// Assembles a socket from builder parts.
    pub(crate) fn from_parts(
        url: String,
        options: ConnectionOptions,
        headers: Vec<(String, String)>,
        span: Option<Span>,
    ) -> Self {
        let span = span.unwrap_or_else(|| debug_span!("websocket", url = %url));

        Self {
            inner: Arc::new(Inner {
                url,
                options: RwLock::new(options),
                headers: RwLock::new(headers),
                state: StateCell::new(),
                closing: AtomicBool::new(false),
                disconnect_pending: AtomicBool::new(false),
                callbacks: RwLock::new(Callbacks::default()),
                writer: AsyncMutex::new(None),
                reader: AsyncMutex::new(None),
                read_task: Mutex::new(None),
                shutdown: Notify::new(),
                connect_abort: Notify::new(),
                subprotocol: RwLock::new(None),
                span,
            }),
        }
    }
}

// ============================================================================
// Socket - Accessors
// ============================================================================

impl Socket {
    /// Returns the target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SocketState {
        self.inner.state.get()
    }

    /// Returns `true` between a successful handshake and the first fatal
    /// error or close.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SocketState::Connected
    }

    /// Returns the subprotocol the server selected, if any.
    #[must_use]
    pub fn subprotocol(&self) -> Option<String> {
        self.inner.subprotocol.read().clone()
    }

    /// Returns a copy of the dial options.
    #[must_use]
    pub fn options(&self) -> ConnectionOptions {
        self.inner.options.read().clone()
    }

    /// Returns a copy of the request headers.
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        self.inner.headers.read().clone()
    }

    /// Returns the span socket events are recorded under.
    #[inline]
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    /// Snapshot of the callback slots.
    pub(crate) fn callbacks(&self) -> Callbacks {
        self.inner.callbacks.read().clone()
    }
}

// ============================================================================
// Socket - Configuration
// ============================================================================

impl Socket {
    /// Replaces the dial options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once `connect` has been called.
    pub fn set_options(&self, options: ConnectionOptions) -> Result<()> {
        self.ensure_unconnected("options")?;
        *self.inner.options.write() = options;
        Ok(())
    }

    /// Appends a request header. Repeated names are all sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once `connect` has been called.
    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.ensure_unconnected("headers")?;
        self.inner.headers.write().push((name.into(), value.into()));
        Ok(())
    }

    fn ensure_unconnected(&self, what: &str) -> Result<()> {
        match self.state() {
            SocketState::Unconnected => Ok(()),
            state => Err(Error::invalid_state(format!(
                "cannot change {what} while {state}"
            ))),
        }
    }
}

// ============================================================================
// Socket - Callback Registration
// ============================================================================

impl Socket {
    /// Called once after a successful handshake, before any message callback.
    pub fn on_connected<F, Fut>(&self, f: F)
    where
        F: Fn(Socket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.callbacks.write().connected = Some(callback(move |socket, ()| f(socket)));
    }

    /// Called once if the handshake fails.
    pub fn on_connect_error<F, Fut>(&self, f: F)
    where
        F: Fn(Socket, Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.callbacks.write().connect_error = Some(callback(f));
    }

    /// Called once when a connected socket goes down.
    ///
    /// Receives the read error, or the close-frame write error for an
    /// explicit [`close`](Self::close) (`None` if that write succeeded).
    pub fn on_disconnected<F, Fut>(&self, f: F)
    where
        F: Fn(Socket, Option<Error>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.callbacks.write().disconnected = Some(callback(f));
    }

    /// Called for each text frame, in arrival order.
    pub fn on_text_message<F, Fut>(&self, f: F)
    where
        F: Fn(Socket, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.callbacks.write().text_message = Some(callback(f));
    }

    /// Called for each binary frame, in arrival order.
    pub fn on_binary_message<F, Fut>(&self, f: F)
    where
        F: Fn(Socket, Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.callbacks.write().binary_message = Some(callback(f));
    }

    /// Called for each ping. The pong reply is sent regardless.
    pub fn on_ping_received<F, Fut>(&self, f: F)
    where
        F: Fn(Socket, Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.callbacks.write().ping_received = Some(callback(f));
    }

    /// Called for each pong.
    pub fn on_pong_received<F, Fut>(&self, f: F)
    where
        F: Fn(Socket, Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.callbacks.write().pong_received = Some(callback(f));
    }

    /// Removes every registered callback.
    pub fn clear_callbacks(&self) {
        *self.inner.callbacks.write() = Callbacks::default();
    }
}

// ============================================================================
// Socket - Connect
// ============================================================================

impl Socket {
    /// Performs the handshake and starts the read loop.
    ///
    /// On failure `on_connect_error` fires and the socket becomes
    /// [`SocketState::Disconnected`]. On success `on_connected` fires and
    /// completes before the read loop starts. There is no retry.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if called more than once (no callback fires)
    /// - [`Error::ConnectionClosed`] if [`close`](Self::close) interrupts the
    ///   handshake, also delivered to `on_connect_error`
    /// - any connect error, also delivered to `on_connect_error`
    pub async fn connect(&self) -> Result<()> {
        self.inner.state.begin_connect()?;
        let span = self.inner.span.clone();
        self.connect_inner().instrument(span).await
    }

    async fn connect_inner(&self) -> Result<()> {
        let options = self.options();
        let headers = self.headers();

        debug!("Connecting to server");

        let dialed = tokio::select! {
            biased;

            () = self.inner.connect_abort.notified() => Err(Error::ConnectionClosed),

            result = dial(&self.inner.url, &headers, &options) => result,
        };

        let dialed = match dialed {
            Ok(dialed) => dialed,
            Err(e) => return self.fail_connect(e).await,
        };

        let (sink, stream) = dialed.stream.split();
        *self.inner.writer.lock().await = Some(sink);
        *self.inner.reader.lock().await = Some(stream);
        *self.inner.subprotocol.write() = dialed.subprotocol;

        if let Err(e) = self.inner.state.finish_connect() {
            self.release_transport().await;
            return self.fail_connect(e).await;
        }
        self.inner.disconnect_pending.store(true, Ordering::Release);

        info!("Connected to server");

        dispatch(self.callbacks().connected, "connected", self, ()).await;

        // `on_connected` may have closed the socket already.
        // A close that raced the arming above has not fired `on_disconnected`.
        if self.inner.closing.load(Ordering::Acquire) {
            self.finish(None).await;
            return Ok(());
        }

        let read_loop = reader::run(self.clone(), options.effective_read_timeout())
            .instrument(self.inner.span.clone());
        *self.inner.read_task.lock() = Some(tokio::spawn(read_loop));

        Ok(())
    }

    /// Reports a failed or aborted connect through `on_connect_error`.
    async fn fail_connect(&self, e: Error) -> Result<()> {
        if self.inner.closing.load(Ordering::Acquire) {
            debug!("Connect aborted by close");
        } else {
            error!(error = %e, "Error while connecting to server");
        }

        self.inner.state.disconnect();
        dispatch(
            self.callbacks().connect_error,
            "connect_error",
            self,
            e.clone(),
        )
        .await;
        Err(e)
    }
}

// ============================================================================
// Socket - Send
// ============================================================================

impl Socket {
    /// Sends one text frame.
    ///
    /// Concurrent sends are serialized; the caller waits for the write lock.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] before a successful connect
    /// - [`Error::ConnectionClosed`] after disconnect or close
    /// - [`Error::WebSocket`] / [`Error::Io`] if the write fails
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let text: String = text.into();
        self.write(Message::Text(text.into())).await
    }

    /// Sends one binary frame.
    ///
    /// # Errors
    ///
    /// Same as [`send_text`](Self::send_text).
    pub async fn send_binary(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        let data: Vec<u8> = data.into();
        self.write(Message::Binary(data.into())).await
    }

    /// Sends a ping control frame.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the payload exceeds 125 bytes
    /// - otherwise same as [`send_text`](Self::send_text)
    pub async fn send_ping(&self, payload: impl Into<Vec<u8>>) -> Result<()> {
        let payload = control_payload(payload.into())?;
        self.write(Message::Ping(payload.into())).await
    }

    /// Sends an unsolicited pong control frame.
    ///
    /// # Errors
    ///
    /// Same as [`send_ping`](Self::send_ping).
    pub async fn send_pong(&self, payload: impl Into<Vec<u8>>) -> Result<()> {
        let payload = control_payload(payload.into())?;
        self.write(Message::Pong(payload.into())).await
    }

    /// Writes one frame under the write lock.
    ///
    /// A failed write marks the socket disconnected but leaves the read loop
    /// to report the disconnect.
    async fn write(&self, message: Message) -> Result<()> {
        match self.state() {
            SocketState::Connected => {}
            SocketState::Unconnected | SocketState::Connecting => return Err(Error::NotConnected),
            SocketState::Disconnected => return Err(Error::ConnectionClosed),
        }

        let len = message.len();
        let mut writer = self.inner.writer.lock().await;
        let sink = writer.as_mut().ok_or(Error::ConnectionClosed)?;

        if let Err(e) = sink.send(message).await {
            let err = Error::from(e);
            warn!(parent: &self.inner.span, error = %err, "Write failed");
            self.inner.state.disconnect();
            return Err(err);
        }

        trace!(parent: &self.inner.span, bytes = len, "Frame sent");
        Ok(())
    }
}

// ============================================================================
// Socket - Close
// ============================================================================

impl Socket {
    /// Closes the connection.
    ///
    /// Writes a normal-closure frame (best effort), stops the read loop,
    /// drops the transport and fires `on_disconnected`. Waits for the read
    /// loop to finish unless called from one of its callbacks.
    ///
    /// Idempotent: later calls return `Ok(())` and do nothing. Closing a
    /// socket that never connected fires no callback. Closing during the
    /// handshake aborts it; `connect` then fails with
    /// [`Error::ConnectionClosed`] through `on_connect_error`.
    ///
    /// # Errors
    ///
    /// Returns the close-frame write error, after teardown has completed.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closing.swap(true, Ordering::AcqRel) {
            trace!(parent: &self.inner.span, "Close already requested");
            return Ok(());
        }
        let span = self.inner.span.clone();
        self.close_inner().instrument(span).await
    }

    async fn close_inner(&self) -> Result<()> {
        let previous = self.inner.state.disconnect();
        debug!(%previous, "Closing");

        // Wake the read loop before the close frame goes out so it never
        // mistakes the echo for a peer-initiated close.
        self.inner.shutdown.notify_one();

        let write_result = match previous {
            SocketState::Connected => self.write_close_frame().await,
            SocketState::Connecting => {
                self.inner.connect_abort.notify_one();
                Ok(())
            }
            SocketState::Unconnected | SocketState::Disconnected => Ok(()),
        };

        self.join_read_loop().await;
        self.release_transport().await;
        self.finish(write_result.as_ref().err().cloned()).await;

        write_result
    }

    async fn write_close_frame(&self) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };

        let mut writer = self.inner.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Ok(());
        };

        sink.send(Message::Close(Some(frame))).await.map_err(|e| {
            let err = Error::from(e);
            warn!(error = %err, "Failed to write close frame");
            err
        })
    }

    /// Waits for the read loop, unless running on it.
    async fn join_read_loop(&self) {
        let Some(handle) = self.inner.read_task.lock().take() else {
            return;
        };

        if tokio::task::try_id() == Some(handle.id()) {
            debug!("Close called from read loop, not waiting");
            return;
        }

        if let Err(e) = handle.await
            && e.is_panic()
        {
            error!("Read loop panicked");
        }
    }
}

// ============================================================================
// Socket - Teardown
// ============================================================================

impl Socket {
    /// Drops both halves, closing the underlying transport.
    pub(crate) async fn release_transport(&self) {
        let sink = self.inner.writer.lock().await.take();
        let stream = self.inner.reader.lock().await.take();

        if sink.is_some() || stream.is_some() {
            debug!(parent: &self.inner.span, "Transport released");
        }
    }

    /// Marks the socket disconnected and fires `on_disconnected` once.
    pub(crate) async fn finish(&self, error: Option<Error>) {
        self.inner.state.disconnect();

        if !self.inner.disconnect_pending.swap(false, Ordering::AcqRel) {
            return;
        }

        match &error {
            Some(e) => warn!(parent: &self.inner.span, error = %e, "Disconnected from server"),
            None => info!(parent: &self.inner.span, "Disconnected from server"),
        }

        dispatch(self.callbacks().disconnected, "disconnected", self, error).await;
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Validates a control-frame payload.
fn control_payload(payload: Vec<u8>) -> Result<Vec<u8>> {
    if payload.len() > MAX_CONTROL_PAYLOAD {
        return Err(Error::invalid_argument(format!(
            "control frame payload is {} bytes, limit is {MAX_CONTROL_PAYLOAD}",
            payload.len()
        )));
    }
    Ok(payload)
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("subprotocol", &self.subprotocol())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
