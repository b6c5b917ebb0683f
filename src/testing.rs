//! In-process servers for tests.
//!
//! [`TestServer`] binds to `127.0.0.1:0`, accepts any number of connections
//! and runs one scripted [`Behavior`] per connection. Handshake headers and
//! every frame the server reads are recorded for assertions.
//!
//! [`TestProxy`] is a minimal HTTP `CONNECT` proxy that records each request
//! head and splices bytes between client and upstream.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, copy_bidirectional};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::debug;

// ============================================================================
// Behavior
// ============================================================================

/// What the server does with each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    /// Echo text and binary frames back.
    Echo,
    /// Read and record, never send.
    Silent,
    /// Send a normal close frame with reason "bye" right after the handshake.
    CloseImmediately,
    /// Send a ping with payload "heartbeat", then echo.
    PingFirst,
    /// Send a normal close frame, then hold the stream open without reading.
    CloseAndHold,
    /// Send text "last", then drop the TCP stream without a close frame.
    DropAbruptly,
}

// ============================================================================
// TestServer
// ============================================================================

#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<HeaderMap>>,
    frames: Mutex<Vec<Message>>,
}

/// A WebSocket server bound to a random local port.
pub(crate) struct TestServer {
    port: u16,
    recorded: Arc<Recorded>,
}

impl TestServer {
    /// Binds and starts accepting connections.
    pub(crate) async fn start(behavior: Behavior) -> Self {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind test server");
        let port = listener.local_addr().expect("local addr").port();
        let recorded = Arc::new(Recorded::default());

        let shared = Arc::clone(&recorded);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, behavior, Arc::clone(&shared)));
            }
        });

        debug!(port, ?behavior, "Test server bound");
        Self { port, recorded }
    }

    /// Returns `ws://127.0.0.1:{port}`.
    pub(crate) fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Headers of the most recent upgrade request.
    pub(crate) fn last_request(&self) -> Option<HeaderMap> {
        self.recorded.requests.lock().last().cloned()
    }

    /// Number of close frames the server has read.
    pub(crate) fn close_frames(&self) -> usize {
        self.count(|m| matches!(m, Message::Close(_)))
    }

    /// Number of pongs the server has read.
    pub(crate) fn pongs(&self) -> usize {
        self.count(|m| matches!(m, Message::Pong(_)))
    }

    fn count(&self, predicate: impl Fn(&Message) -> bool) -> usize {
        self.recorded
            .frames
            .lock()
            .iter()
            .filter(|m| predicate(m))
            .count()
    }
}

/// Runs one connection.
async fn serve(stream: TcpStream, behavior: Behavior, recorded: Arc<Recorded>) {
    let capture = Arc::clone(&recorded);
    let on_request = move |request: &Request,
                           mut response: Response|
          -> Result<Response, ErrorResponse> {
        capture.requests.lock().push(request.headers().clone());

        let chosen = request
            .headers()
            .get("sec-websocket-protocol")
            .and_then(|v| v.to_str().ok())
            .and_then(|offer| offer.split(',').next())
            .map(str::trim)
            .and_then(|first| HeaderValue::from_str(first).ok());
        if let Some(chosen) = chosen {
            response
                .headers_mut()
                .insert("sec-websocket-protocol", chosen);
        }

        Ok(response)
    };

    let Ok(mut ws) = accept_hdr_async(stream, on_request).await else {
        return;
    };

    match behavior {
        Behavior::CloseImmediately => {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            };
            let _ = ws.send(Message::Close(Some(frame))).await;
        }
        Behavior::PingFirst => {
            let _ = ws.send(Message::Ping(b"heartbeat".to_vec().into())).await;
        }
        Behavior::CloseAndHold => {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "hold".into(),
            };
            let _ = ws.send(Message::Close(Some(frame))).await;
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            return;
        }
        Behavior::DropAbruptly => {
            let _ = ws.send(Message::text("last")).await;
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            return;
        }
        Behavior::Echo | Behavior::Silent => {}
    }

    while let Some(Ok(message)) = ws.next().await {
        recorded.frames.lock().push(message.clone());

        let echo = matches!(behavior, Behavior::Echo | Behavior::PingFirst)
            && (message.is_text() || message.is_binary());
        if echo && ws.send(message).await.is_err() {
            break;
        }
    }
}

// ============================================================================
// TestProxy
// ============================================================================

/// A `CONNECT` proxy bound to a random local port.
pub(crate) struct TestProxy {
    port: u16,
    heads: Arc<Mutex<Vec<String>>>,
}

impl TestProxy {
    /// Binds and starts accepting tunnels.
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test proxy");
        let port = listener.local_addr().expect("local addr").port();
        let heads = Arc::new(Mutex::new(Vec::new()));

        let shared = Arc::clone(&heads);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(tunnel(stream, Arc::clone(&shared)));
            }
        });

        Self { port, heads }
    }

    /// Returns `http://{userinfo}127.0.0.1:{port}`.
    pub(crate) fn url(&self, userinfo: Option<&str>) -> String {
        match userinfo {
            Some(userinfo) => format!("http://{userinfo}@127.0.0.1:{}", self.port),
            None => format!("http://127.0.0.1:{}", self.port),
        }
    }

    /// Request heads received so far.
    pub(crate) fn heads(&self) -> Vec<String> {
        self.heads.lock().clone()
    }
}

/// Serves one `CONNECT` request.
async fn tunnel(mut client: TcpStream, heads: Arc<Mutex<Vec<String>>>) {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        match client.read_u8().await {
            Ok(byte) => head.push(byte),
            Err(_) => return,
        }
    }

    let head = String::from_utf8_lossy(&head).into_owned();
    let authority = head.split_whitespace().nth(1).unwrap_or_default().to_string();
    heads.lock().push(head);

    let Ok(mut upstream) = TcpStream::connect(authority.as_str()).await else {
        let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
        return;
    };

    if client
        .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
        .await
        .is_err()
    {
        return;
    }

    let _ = copy_bidirectional(&mut client, &mut upstream).await;
}
