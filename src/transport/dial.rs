//! Dialing and the WebSocket handshake.
//!
//! # Connection Flow
//!
//! 1. Validate the target URL (`ws://` or `wss://`)
//! 2. Build the upgrade request with user headers and subprotocol offer
//! 3. Resolve the proxy and open a TCP connection (to the proxy or target)
//! 4. Open a `CONNECT` tunnel when proxied
//! 5. Run TLS (for `wss://`) and the HTTP upgrade
//!
//! Steps 3-5 are bounded by the handshake timeout.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, client_async_tls_with_config};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::options::ConnectionOptions;

use super::proxy::{open_tunnel, proxy_authority, strip_brackets, validate_proxy};
use super::tls;

// ============================================================================
// Types
// ============================================================================

/// The WebSocket stream type produced by [`dial`].
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Result of a successful handshake.
pub(crate) struct Dialed {
    /// The upgraded stream.
    pub stream: WsStream,
    /// Subprotocol the server selected.
    pub subprotocol: Option<String>,
}

// ============================================================================
// Functions
// ============================================================================

/// Dials `url` and performs the WebSocket handshake.
///
/// # Errors
///
/// - [`Error::InvalidUrl`] for malformed or non-WebSocket URLs
/// - [`Error::InvalidHeader`] for invalid request headers
/// - [`Error::ConnectionTimeout`] if the handshake timeout elapses
/// - [`Error::Connection`] / [`Error::Proxy`] on dial failure
/// - [`Error::Handshake`] if the server rejects the upgrade
pub(crate) async fn dial(
    url: &str,
    headers: &[(String, String)],
    options: &ConnectionOptions,
) -> Result<Dialed> {
    let target = parse_target(url)?;
    let request = build_request(&target, headers, options)?;

    if options.compression {
        warn!("Per-message compression requested but not negotiated; continuing uncompressed");
    }

    let handshake = handshake(target, request, options);

    match options.handshake_timeout {
        Some(limit) => timeout(limit, handshake)
            .await
            .map_err(|_| Error::connection_timeout(millis(limit)))?,
        None => handshake.await,
    }
}

/// Parses and validates a WebSocket URL.
pub(crate) fn parse_target(url: &str) -> Result<Url> {
    let target = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;

    match target.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::invalid_url(
                url,
                format!("unsupported scheme {other}, expected ws or wss"),
            ));
        }
    }

    if target.host_str().is_none() {
        return Err(Error::invalid_url(url, "missing host"));
    }

    Ok(target)
}

/// Builds the upgrade request.
///
/// User headers are appended in order, so repeated names are all sent.
fn build_request(
    target: &Url,
    headers: &[(String, String)],
    options: &ConnectionOptions,
) -> Result<Request> {
    let mut request = target.as_str().into_client_request()?;
    let request_headers = request.headers_mut();

    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_header(name, e.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| Error::invalid_header(name, e.to_string()))?;
        request_headers.append(header_name, header_value);
    }

    if let Some(protocols) = options.subprotocol_header() {
        let value = HeaderValue::from_str(&protocols)
            .map_err(|e| Error::invalid_header("Sec-WebSocket-Protocol", e.to_string()))?;
        request_headers.append("sec-websocket-protocol", value);
    }

    Ok(request)
}

/// Dials (directly or through a proxy) and upgrades.
async fn handshake(target: Url, request: Request, options: &ConnectionOptions) -> Result<Dialed> {
    let host = target
        .host_str()
        .ok_or_else(|| Error::invalid_url(target.as_str(), "missing host"))?;
    let port = target.port_or_known_default().unwrap_or(80);
    let authority = format!("{host}:{port}");

    let proxy = options.proxy.as_ref().and_then(|resolve| resolve(&target));

    let mut tcp = match &proxy {
        Some(proxy) => {
            validate_proxy(proxy)?;
            let (proxy_host, proxy_port) = proxy_authority(proxy)?;
            debug!(proxy = %proxy_host, proxy_port, "Dialing through proxy");
            connect_tcp(&proxy_host, proxy_port).await?
        }
        None => connect_tcp(strip_brackets(host), port).await?,
    };

    if let Some(proxy) = &proxy {
        open_tunnel(&mut tcp, proxy, &authority).await?;
    }

    let connector = if target.scheme() == "wss" {
        tls::connector(options)?
    } else {
        Connector::Plain
    };

    let (stream, response) = client_async_tls_with_config(request, tcp, None, Some(connector))
        .await
        .map_err(|e| {
            let err = Error::from(e);
            if let Error::Handshake { status } = &err {
                error!(status, "Server rejected WebSocket upgrade");
            }
            err
        })?;

    let subprotocol = response
        .headers()
        .get("Sec-WebSocket-Protocol")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    info!(%authority, ?subprotocol, "WebSocket handshake completed");

    Ok(Dialed {
        stream,
        subprotocol,
    })
}

/// Opens a TCP connection.
async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::connection(format!("{host}:{port}: {e}")))
}

/// Duration in whole milliseconds, saturating.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
